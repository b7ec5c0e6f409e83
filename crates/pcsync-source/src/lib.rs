pub mod client;
pub mod error;
pub mod range;
pub(crate) mod retry;
pub mod token;
pub mod types;

pub use client::SourceClient;
pub use error::SourceError;
pub use range::DateRange;
pub use types::{
    Availability, ExtraData, ImageVariation, SourceCategory, SourceImage, SourcePrice,
    SourceProduct,
};

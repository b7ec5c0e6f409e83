pub mod client;
pub mod error;
pub mod gid;
pub mod graphql;
pub(crate) mod rate_limit;
pub mod rest;
pub mod types;

pub use client::ShopifyClient;
pub use error::ShopifyError;
pub use gid::{numeric_id, to_gid};
pub use graphql::CatalogPage;
pub use types::{
    CatalogProduct, CatalogVariant, CreatedProduct, CreatedVariant, Location, NewImage,
    NewProduct, NewVariant, ProductStatus, ProductUpdate, VariantUpdate,
};

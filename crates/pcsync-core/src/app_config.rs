use std::net::SocketAddr;
use std::path::PathBuf;

use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// SMTP settings for the sync report. Present only when both the sender
/// address and its app password are configured.
#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub password: String,
    pub recipients: Vec<String>,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("from_address", &self.from_address)
            .field("password", &"[redacted]")
            .field("recipients", &self.recipients)
            .finish()
    }
}

/// Credentials accepted by the admin login endpoint.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub staging_dir: PathBuf,
    pub source_base_url: String,
    pub source_username: String,
    pub source_password: String,
    pub source_token_ttl_secs: u64,
    pub shop_name: String,
    pub shopify_access_token: String,
    pub shopify_api_version: String,
    pub shopify_location_id: Option<u64>,
    pub shopify_request_delay_ms: u64,
    /// Multiplier applied to the source cost to obtain the storefront price.
    pub product_margin: Decimal,
    pub supplier_name: String,
    pub create_missing: bool,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub http_backoff_base_secs: u64,
    pub sync_cron: Option<String>,
    pub mail: Option<MailConfig>,
    pub admin: Option<AdminCredentials>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("staging_dir", &self.staging_dir)
            .field("source_base_url", &self.source_base_url)
            .field("source_username", &self.source_username)
            .field("source_password", &"[redacted]")
            .field("source_token_ttl_secs", &self.source_token_ttl_secs)
            .field("shop_name", &self.shop_name)
            .field("shopify_access_token", &"[redacted]")
            .field("shopify_api_version", &self.shopify_api_version)
            .field("shopify_location_id", &self.shopify_location_id)
            .field("shopify_request_delay_ms", &self.shopify_request_delay_ms)
            .field("product_margin", &self.product_margin)
            .field("supplier_name", &self.supplier_name)
            .field("create_missing", &self.create_missing)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_backoff_base_secs", &self.http_backoff_base_secs)
            .field("sync_cron", &self.sync_cron)
            .field("mail", &self.mail)
            .field("admin", &self.admin)
            .finish()
    }
}

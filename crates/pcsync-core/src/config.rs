use std::str::FromStr;

use rust_decimal::Decimal;

use crate::app_config::{AdminCredentials, AppConfig, Environment, MailConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let source_base_url = require("API_BASE_URL")?;
    let source_username = require("API_USERNAME")?;
    let source_password = require("API_PASSWORD")?;
    let shop_name = require("SHOP_NAME")?;
    let shopify_access_token = require("SHOPIFY_ACCESS_TOKEN")?;

    let margin_raw = require("PC_SERVICE_PRODUCT_MARGIN")?;
    let product_margin = Decimal::from_str(margin_raw.trim())
        .map_err(|e| invalid("PC_SERVICE_PRODUCT_MARGIN", e.to_string()))?;
    if product_margin <= Decimal::ZERO {
        return Err(invalid(
            "PC_SERVICE_PRODUCT_MARGIN",
            format!("margin must be positive, got {product_margin}"),
        ));
    }

    let env = parse_environment(&or_default("PCSYNC_ENV", "development"))?;

    let bind_addr = or_default("PCSYNC_BIND_ADDR", "0.0.0.0:5001")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PCSYNC_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("PCSYNC_LOG_LEVEL", "info");
    let staging_dir = PathBuf::from(or_default("PCSYNC_STAGING_DIR", "./updates_products_csv"));

    let shopify_api_version = or_default("SHOPIFY_API_VERSION", "2024-10");
    let shopify_location_id = optional("SHOPIFY_LOCATION_ID")
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|e| invalid("SHOPIFY_LOCATION_ID", e.to_string()))
        })
        .transpose()?;
    let shopify_request_delay_ms = parse_u64("PCSYNC_SHOPIFY_REQUEST_DELAY_MS", "500")?;

    let source_token_ttl_secs = parse_u64("PCSYNC_SOURCE_TOKEN_TTL_SECS", "600")?;
    let http_timeout_secs = parse_u64("PCSYNC_HTTP_TIMEOUT_SECS", "30")?;
    let http_max_retries = parse_u32("PCSYNC_HTTP_MAX_RETRIES", "3")?;
    let http_backoff_base_secs = parse_u64("PCSYNC_HTTP_BACKOFF_BASE_SECS", "2")?;

    let supplier_name = or_default("PCSYNC_SUPPLIER_NAME", "PC Service");
    let create_missing = parse_bool(
        "PCSYNC_CREATE_MISSING",
        &or_default("PCSYNC_CREATE_MISSING", "true"),
    )?;
    let sync_cron = optional("PCSYNC_SYNC_CRON");

    let mail = match (
        optional("REPORT_MAIL_ADDRESS"),
        optional("REPORT_MAIL_APP_PASSWORD"),
    ) {
        (Some(from_address), Some(password)) => {
            let recipients = optional("REPORT_MAIL_RECIPIENTS")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|| vec![from_address.clone()]);
            let smtp_port = or_default("REPORT_SMTP_PORT", "587")
                .parse::<u16>()
                .map_err(|e| invalid("REPORT_SMTP_PORT", e.to_string()))?;
            Some(MailConfig {
                smtp_host: or_default("REPORT_SMTP_HOST", "smtp.gmail.com"),
                smtp_port,
                from_address,
                password,
                recipients,
            })
        }
        (None, None) => None,
        (Some(_), None) => {
            return Err(ConfigError::MissingEnvVar("REPORT_MAIL_APP_PASSWORD".into()))
        }
        (None, Some(_)) => return Err(ConfigError::MissingEnvVar("REPORT_MAIL_ADDRESS".into())),
    };

    let admin = match (optional("ADMIN_USERNAME"), optional("ADMIN_PASSWORD")) {
        (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
        _ => None,
    };

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        staging_dir,
        source_base_url,
        source_username,
        source_password,
        source_token_ttl_secs,
        shop_name,
        shopify_access_token,
        shopify_api_version,
        shopify_location_id,
        shopify_request_delay_ms,
        product_margin,
        supplier_name,
        create_missing,
        http_timeout_secs,
        http_max_retries,
        http_backoff_base_secs,
        sync_cron,
        mail,
        admin,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PCSYNC_ENV".to_string(),
            reason: format!("expected development, test, or production; got \"{other}\""),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

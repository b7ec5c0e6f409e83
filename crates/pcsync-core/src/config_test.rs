use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("API_BASE_URL", "https://pcservice.example.com/api");
    m.insert("API_USERNAME", "sync-user");
    m.insert("API_PASSWORD", "sync-pass");
    m.insert("SHOP_NAME", "tiendalibre");
    m.insert("SHOPIFY_ACCESS_TOKEN", "shpat_test");
    m.insert("PC_SERVICE_PRODUCT_MARGIN", "1.35");
    m
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "PCSYNC_ENV"));
}

#[test]
fn build_app_config_fails_without_source_base_url() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "API_BASE_URL"),
        "expected MissingEnvVar(API_BASE_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_value_as_missing() {
    let mut map = full_env();
    map.insert("SHOPIFY_ACCESS_TOKEN", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SHOPIFY_ACCESS_TOKEN"),
        "expected MissingEnvVar(SHOPIFY_ACCESS_TOKEN), got: {result:?}"
    );
}

#[test]
fn build_app_config_succeeds_with_all_required_vars() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).expect("config should build");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:5001");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(
        cfg.staging_dir,
        std::path::PathBuf::from("./updates_products_csv")
    );
    assert_eq!(cfg.shopify_api_version, "2024-10");
    assert_eq!(cfg.product_margin, Decimal::new(135, 2));
    assert!(cfg.shopify_location_id.is_none());
    assert_eq!(cfg.shopify_request_delay_ms, 500);
    assert_eq!(cfg.source_token_ttl_secs, 600);
    assert_eq!(cfg.http_timeout_secs, 30);
    assert_eq!(cfg.http_max_retries, 3);
    assert_eq!(cfg.http_backoff_base_secs, 2);
    assert_eq!(cfg.supplier_name, "PC Service");
    assert!(cfg.create_missing);
    assert!(cfg.sync_cron.is_none());
    assert!(cfg.mail.is_none());
    assert!(cfg.admin.is_none());
}

#[test]
fn build_app_config_rejects_non_positive_margin() {
    let mut map = full_env();
    map.insert("PC_SERVICE_PRODUCT_MARGIN", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PC_SERVICE_PRODUCT_MARGIN"),
        "expected InvalidEnvVar(PC_SERVICE_PRODUCT_MARGIN), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_unparseable_margin() {
    let mut map = full_env();
    map.insert("PC_SERVICE_PRODUCT_MARGIN", "thirty percent");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PC_SERVICE_PRODUCT_MARGIN"
    ));
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = full_env();
    map.insert("PCSYNC_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PCSYNC_BIND_ADDR"),
        "expected InvalidEnvVar(PCSYNC_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_parses_location_id() {
    let mut map = full_env();
    map.insert("SHOPIFY_LOCATION_ID", "70192627918");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.shopify_location_id, Some(70_192_627_918));
}

#[test]
fn build_app_config_rejects_invalid_location_id() {
    let mut map = full_env();
    map.insert("SHOPIFY_LOCATION_ID", "gid://shopify/Location/1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SHOPIFY_LOCATION_ID"
    ));
}

#[test]
fn build_app_config_parses_create_missing_flag() {
    let mut map = full_env();
    map.insert("PCSYNC_CREATE_MISSING", "no");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(!cfg.create_missing);

    map.insert("PCSYNC_CREATE_MISSING", "maybe");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PCSYNC_CREATE_MISSING"
    ));
}

#[test]
fn build_app_config_builds_mail_config_with_recipients() {
    let mut map = full_env();
    map.insert("REPORT_MAIL_ADDRESS", "reports@example.com");
    map.insert("REPORT_MAIL_APP_PASSWORD", "app-pass");
    map.insert(
        "REPORT_MAIL_RECIPIENTS",
        "ops@example.com, buyer@example.com,",
    );
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let mail = cfg.mail.expect("mail config should be present");
    assert_eq!(mail.smtp_host, "smtp.gmail.com");
    assert_eq!(mail.smtp_port, 587);
    assert_eq!(mail.from_address, "reports@example.com");
    assert_eq!(
        mail.recipients,
        vec!["ops@example.com".to_string(), "buyer@example.com".to_string()]
    );
}

#[test]
fn build_app_config_mail_recipients_default_to_sender() {
    let mut map = full_env();
    map.insert("REPORT_MAIL_ADDRESS", "reports@example.com");
    map.insert("REPORT_MAIL_APP_PASSWORD", "app-pass");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.mail.unwrap().recipients,
        vec!["reports@example.com".to_string()]
    );
}

#[test]
fn build_app_config_rejects_half_configured_mail() {
    let mut map = full_env();
    map.insert("REPORT_MAIL_ADDRESS", "reports@example.com");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "REPORT_MAIL_APP_PASSWORD"),
        "expected MissingEnvVar(REPORT_MAIL_APP_PASSWORD), got: {result:?}"
    );
}

#[test]
fn build_app_config_admin_requires_both_values() {
    let mut map = full_env();
    map.insert("ADMIN_USERNAME", "admin");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.admin.is_none());

    map.insert("ADMIN_PASSWORD", "secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.admin.unwrap().username, "admin");
}

#[test]
fn debug_output_redacts_secrets() {
    let mut map = full_env();
    map.insert("ADMIN_USERNAME", "admin");
    map.insert("ADMIN_PASSWORD", "hunter2");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("sync-pass"));
    assert!(!rendered.contains("shpat_test"));
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("[redacted]"));
}

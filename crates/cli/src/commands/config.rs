use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use stairbooks_core::config::{AppConfig, LoadOptions, LogFormat};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let format = match config.logging.format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    };
    let cis_percent = (config.tax.cis_rate * Decimal::ONE_HUNDRED).normalize();

    let entries: Vec<(&str, String, Option<&str>)> = vec![
        ("database.url", config.database.url.clone(), Some("STAIRBOOKS_DATABASE_URL")),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            Some("STAIRBOOKS_DATABASE_MAX_CONNECTIONS"),
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            Some("STAIRBOOKS_DATABASE_TIMEOUT_SECS"),
        ),
        (
            "tax.cis_rate",
            format!("{} ({cis_percent}%)", config.tax.cis_rate),
            Some("STAIRBOOKS_CIS_RATE"),
        ),
        ("tax.vat_rate", config.tax.vat_rate.to_string(), Some("STAIRBOOKS_VAT_RATE")),
        ("tax.vat_enabled", config.tax.vat_enabled.to_string(), Some("STAIRBOOKS_VAT_ENABLED")),
        ("company.name", config.company.name.clone(), Some("STAIRBOOKS_COMPANY_NAME")),
        (
            "company.default_markup",
            config.company.default_markup.to_string(),
            Some("STAIRBOOKS_DEFAULT_MARKUP"),
        ),
        ("logging.level", config.logging.level.clone(), Some("STAIRBOOKS_LOGGING_LEVEL")),
        ("logging.format", format.to_string(), Some("STAIRBOOKS_LOGGING_FORMAT")),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in entries {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("  {key} = {value}  [{source}]")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("stairbooks.toml"), PathBuf::from("config/stairbooks.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key: &str,
    env_key: Option<&str>,
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var(env_key).map(|value| !value.trim().is_empty()).unwrap_or(false) {
            return format!("env {env_key}");
        }
    }

    if let (Some(doc), Some(path)) = (file_doc, file_path) {
        if file_contains_key(doc, key) {
            return format!("file {}", path.display());
        }
    }

    "default".to_string()
}

fn file_contains_key(doc: &Value, dotted_key: &str) -> bool {
    let mut current = doc;
    for part in dotted_key.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}

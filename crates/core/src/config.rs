use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cis::DEFAULT_CIS_RATE;
use crate::domain::quote::VatSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub tax: TaxConfig,
    pub company: CompanyConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Statutory rates, resolved here once and passed into calculations
/// explicitly — calculation code never reads defaults of its own.
#[derive(Clone, Debug)]
pub struct TaxConfig {
    /// CIS deduction rate as a fraction, e.g. 0.20.
    pub cis_rate: Decimal,
    /// VAT rate as a percentage, e.g. 20.
    pub vat_rate: Decimal,
    pub vat_enabled: bool,
}

impl TaxConfig {
    pub fn vat_settings(&self) -> VatSettings {
        VatSettings { enabled: self.vat_enabled, rate: self.vat_rate }
    }
}

#[derive(Clone, Debug)]
pub struct CompanyConfig {
    pub name: String,
    /// Default markup percentage for quotes that don't set their own.
    pub default_markup: Decimal,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub cis_rate: Option<Decimal>,
    pub vat_rate: Option<Decimal>,
    pub vat_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://stairbooks.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            tax: TaxConfig {
                cis_rate: DEFAULT_CIS_RATE,
                vat_rate: Decimal::from(20),
                vat_enabled: false,
            },
            company: CompanyConfig { name: String::new(), default_markup: Decimal::from(20) },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("stairbooks.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(tax) = patch.tax {
            if let Some(cis_rate) = tax.cis_rate {
                self.tax.cis_rate = cis_rate;
            }
            if let Some(vat_rate) = tax.vat_rate {
                self.tax.vat_rate = vat_rate;
            }
            if let Some(vat_enabled) = tax.vat_enabled {
                self.tax.vat_enabled = vat_enabled;
            }
        }

        if let Some(company) = patch.company {
            if let Some(name) = company.name {
                self.company.name = name;
            }
            if let Some(default_markup) = company.default_markup {
                self.company.default_markup = default_markup;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STAIRBOOKS_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("STAIRBOOKS_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("STAIRBOOKS_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("STAIRBOOKS_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("STAIRBOOKS_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STAIRBOOKS_CIS_RATE") {
            self.tax.cis_rate = parse_decimal("STAIRBOOKS_CIS_RATE", &value)?;
        }
        if let Some(value) = read_env("STAIRBOOKS_VAT_RATE") {
            self.tax.vat_rate = parse_decimal("STAIRBOOKS_VAT_RATE", &value)?;
        }
        if let Some(value) = read_env("STAIRBOOKS_VAT_ENABLED") {
            self.tax.vat_enabled = parse_bool("STAIRBOOKS_VAT_ENABLED", &value)?;
        }

        if let Some(value) = read_env("STAIRBOOKS_COMPANY_NAME") {
            self.company.name = value;
        }
        if let Some(value) = read_env("STAIRBOOKS_DEFAULT_MARKUP") {
            self.company.default_markup = parse_decimal("STAIRBOOKS_DEFAULT_MARKUP", &value)?;
        }

        let log_level =
            read_env("STAIRBOOKS_LOGGING_LEVEL").or_else(|| read_env("STAIRBOOKS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STAIRBOOKS_LOGGING_FORMAT").or_else(|| read_env("STAIRBOOKS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(cis_rate) = overrides.cis_rate {
            self.tax.cis_rate = cis_rate;
        }
        if let Some(vat_rate) = overrides.vat_rate {
            self.tax.vat_rate = vat_rate;
        }
        if let Some(vat_enabled) = overrides.vat_enabled {
            self.tax.vat_enabled = vat_enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_tax(&self.tax)?;
        validate_company(&self.company)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("stairbooks.toml"), PathBuf::from("config/stairbooks.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_tax(tax: &TaxConfig) -> Result<(), ConfigError> {
    if tax.cis_rate <= Decimal::ZERO || tax.cis_rate > Decimal::ONE {
        return Err(ConfigError::Validation(
            "tax.cis_rate must be a fraction in range (0, 1], e.g. 0.20".to_string(),
        ));
    }

    if tax.vat_rate < Decimal::ZERO || tax.vat_rate > Decimal::ONE_HUNDRED {
        return Err(ConfigError::Validation(
            "tax.vat_rate must be a percentage in range 0..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_company(company: &CompanyConfig) -> Result<(), ConfigError> {
    if company.default_markup < Decimal::ZERO || company.default_markup > Decimal::ONE_HUNDRED {
        return Err(ConfigError::Validation(
            "company.default_markup must be a percentage in range 0..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    tax: Option<TaxPatch>,
    company: Option<CompanyPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TaxPatch {
    cis_rate: Option<Decimal>,
    vat_rate: Option<Decimal>,
    vat_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct CompanyPatch {
    name: Option<String>,
    default_markup: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

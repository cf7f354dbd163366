use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::{FeeComponent, PricingRule};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub supplier: SupplierConfig,
    pub payment: PaymentConfig,
    pub pricing: PricingConfig,
    pub tax: TaxConfig,
    pub approvals: ApprovalsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SupplierConfig {
    pub mode: SupplierMode,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub api_secret: Option<SecretString>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub enabled: bool,
    pub base_url: String,
    pub key_id: Option<String>,
    pub key_secret: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub markup_mode: FeeMode,
    pub markup_value: Decimal,
    pub markup_cap: Option<Decimal>,
    pub service_fee_mode: FeeMode,
    pub service_fee_value: Decimal,
    pub min_total_fee: Decimal,
}

impl PricingConfig {
    pub fn rule(&self) -> PricingRule {
        let component = |mode: FeeMode, value: Decimal| match mode {
            FeeMode::Percent => FeeComponent::Percent(value),
            FeeMode::Fixed => FeeComponent::Fixed(value),
        };
        PricingRule {
            markup: component(self.markup_mode, self.markup_value),
            markup_cap: self.markup_cap,
            service_fee: component(self.service_fee_mode, self.service_fee_value),
            min_total_fee: self.min_total_fee,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TaxConfig {
    /// GST as a fraction of the base amount, e.g. 0.05 for 5%.
    pub gst_rate: Decimal,
    /// The organization's registered GST state, compared against the origin
    /// airport's state to pick intra- vs inter-state treatment.
    pub registered_state: String,
}

#[derive(Clone, Debug)]
pub struct ApprovalsConfig {
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierMode {
    Live,
    Sandbox,
}

impl SupplierMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Sandbox => "sandbox",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeMode {
    Percent,
    Fixed,
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
    pub supplier_mode: Option<SupplierMode>,
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
                url: "sqlite://tripdesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            supplier: SupplierConfig {
                mode: SupplierMode::Sandbox,
                base_url: None,
                api_key: None,
                api_secret: None,
                timeout_secs: 20,
                max_retries: 2,
                backoff_base_ms: 250,
            },
            payment: PaymentConfig {
                enabled: false,
                base_url: "https://api.razorpay.com".to_string(),
                key_id: None,
                key_secret: None,
                timeout_secs: 15,
            },
            pricing: PricingConfig {
                markup_mode: FeeMode::Percent,
                markup_value: Decimal::new(35, 1),
                markup_cap: Some(Decimal::new(1_500_00, 2)),
                service_fee_mode: FeeMode::Percent,
                service_fee_value: Decimal::new(15, 1),
                min_total_fee: Decimal::new(150_00, 2),
            },
            tax: TaxConfig {
                gst_rate: Decimal::new(5, 2),
                registered_state: "Karnataka".to_string(),
            },
            approvals: ApprovalsConfig { sweep_interval_secs: 300 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for SupplierMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "sandbox" => Ok(Self::Sandbox),
            other => Err(ConfigError::Validation(format!(
                "unsupported supplier mode `{other}` (expected live|sandbox)"
            ))),
        }
    }
}

impl FromStr for FeeMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "percent" => Ok(Self::Percent),
            "fixed" => Ok(Self::Fixed),
            other => Err(ConfigError::Validation(format!(
                "unsupported fee mode `{other}` (expected percent|fixed)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tripdesk.toml"));
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

        if let Some(supplier) = patch.supplier {
            if let Some(mode) = supplier.mode {
                self.supplier.mode = mode;
            }
            if let Some(base_url) = supplier.base_url {
                self.supplier.base_url = Some(base_url);
            }
            if let Some(api_key_value) = supplier.api_key {
                self.supplier.api_key = Some(secret_value(api_key_value));
            }
            if let Some(api_secret_value) = supplier.api_secret {
                self.supplier.api_secret = Some(secret_value(api_secret_value));
            }
            if let Some(timeout_secs) = supplier.timeout_secs {
                self.supplier.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = supplier.max_retries {
                self.supplier.max_retries = max_retries;
            }
            if let Some(backoff_base_ms) = supplier.backoff_base_ms {
                self.supplier.backoff_base_ms = backoff_base_ms;
            }
        }

        if let Some(payment) = patch.payment {
            if let Some(enabled) = payment.enabled {
                self.payment.enabled = enabled;
            }
            if let Some(base_url) = payment.base_url {
                self.payment.base_url = base_url;
            }
            if let Some(key_id) = payment.key_id {
                self.payment.key_id = Some(key_id);
            }
            if let Some(key_secret_value) = payment.key_secret {
                self.payment.key_secret = Some(secret_value(key_secret_value));
            }
            if let Some(timeout_secs) = payment.timeout_secs {
                self.payment.timeout_secs = timeout_secs;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(markup_mode) = pricing.markup_mode {
                self.pricing.markup_mode = markup_mode;
            }
            if let Some(markup_value) = pricing.markup_value {
                self.pricing.markup_value = markup_value;
            }
            if let Some(markup_cap) = pricing.markup_cap {
                self.pricing.markup_cap = Some(markup_cap);
            }
            if let Some(service_fee_mode) = pricing.service_fee_mode {
                self.pricing.service_fee_mode = service_fee_mode;
            }
            if let Some(service_fee_value) = pricing.service_fee_value {
                self.pricing.service_fee_value = service_fee_value;
            }
            if let Some(min_total_fee) = pricing.min_total_fee {
                self.pricing.min_total_fee = min_total_fee;
            }
        }

        if let Some(tax) = patch.tax {
            if let Some(gst_rate) = tax.gst_rate {
                self.tax.gst_rate = gst_rate;
            }
            if let Some(registered_state) = tax.registered_state {
                self.tax.registered_state = registered_state;
            }
        }

        if let Some(approvals) = patch.approvals {
            if let Some(sweep_interval_secs) = approvals.sweep_interval_secs {
                self.approvals.sweep_interval_secs = sweep_interval_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        if let Some(value) = read_env("TRIPDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TRIPDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("TRIPDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TRIPDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TRIPDESK_SUPPLIER_MODE") {
            self.supplier.mode = value.parse()?;
        }
        if let Some(value) = read_env("TRIPDESK_SUPPLIER_BASE_URL") {
            self.supplier.base_url = Some(value);
        }
        if let Some(value) = read_env("TRIPDESK_SUPPLIER_API_KEY") {
            self.supplier.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TRIPDESK_SUPPLIER_API_SECRET") {
            self.supplier.api_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("TRIPDESK_SUPPLIER_TIMEOUT_SECS") {
            self.supplier.timeout_secs = parse_u64("TRIPDESK_SUPPLIER_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_SUPPLIER_MAX_RETRIES") {
            self.supplier.max_retries = parse_u32("TRIPDESK_SUPPLIER_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_SUPPLIER_BACKOFF_BASE_MS") {
            self.supplier.backoff_base_ms =
                parse_u64("TRIPDESK_SUPPLIER_BACKOFF_BASE_MS", &value)?;
        }

        if let Some(value) = read_env("TRIPDESK_PAYMENT_ENABLED") {
            self.payment.enabled = parse_bool("TRIPDESK_PAYMENT_ENABLED", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_PAYMENT_BASE_URL") {
            self.payment.base_url = value;
        }
        if let Some(value) = read_env("TRIPDESK_PAYMENT_KEY_ID") {
            self.payment.key_id = Some(value);
        }
        if let Some(value) = read_env("TRIPDESK_PAYMENT_KEY_SECRET") {
            self.payment.key_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("TRIPDESK_PAYMENT_TIMEOUT_SECS") {
            self.payment.timeout_secs = parse_u64("TRIPDESK_PAYMENT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TRIPDESK_PRICING_MARKUP_MODE") {
            self.pricing.markup_mode = value.parse()?;
        }
        if let Some(value) = read_env("TRIPDESK_PRICING_MARKUP_VALUE") {
            self.pricing.markup_value = parse_decimal("TRIPDESK_PRICING_MARKUP_VALUE", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_PRICING_MARKUP_CAP") {
            self.pricing.markup_cap = Some(parse_decimal("TRIPDESK_PRICING_MARKUP_CAP", &value)?);
        }
        if let Some(value) = read_env("TRIPDESK_PRICING_SERVICE_FEE_MODE") {
            self.pricing.service_fee_mode = value.parse()?;
        }
        if let Some(value) = read_env("TRIPDESK_PRICING_SERVICE_FEE_VALUE") {
            self.pricing.service_fee_value =
                parse_decimal("TRIPDESK_PRICING_SERVICE_FEE_VALUE", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_PRICING_MIN_TOTAL_FEE") {
            self.pricing.min_total_fee = parse_decimal("TRIPDESK_PRICING_MIN_TOTAL_FEE", &value)?;
        }

        if let Some(value) = read_env("TRIPDESK_TAX_GST_RATE") {
            self.tax.gst_rate = parse_decimal("TRIPDESK_TAX_GST_RATE", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_TAX_REGISTERED_STATE") {
            self.tax.registered_state = value;
        }

        if let Some(value) = read_env("TRIPDESK_APPROVALS_SWEEP_INTERVAL_SECS") {
            self.approvals.sweep_interval_secs =
                parse_u64("TRIPDESK_APPROVALS_SWEEP_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("TRIPDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TRIPDESK_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("TRIPDESK_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TRIPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("TRIPDESK_LOGGING_LEVEL").or_else(|| read_env("TRIPDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TRIPDESK_LOGGING_FORMAT").or_else(|| read_env("TRIPDESK_LOG_FORMAT"));
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
        if let Some(supplier_mode) = overrides.supplier_mode {
            self.supplier.mode = supplier_mode;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_supplier(&self.supplier)?;
        validate_payment(&self.payment)?;
        validate_pricing(&self.pricing)?;
        validate_tax(&self.tax)?;
        validate_approvals(&self.approvals)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tripdesk.toml"), PathBuf::from("config/tripdesk.toml")]
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

fn validate_supplier(supplier: &SupplierConfig) -> Result<(), ConfigError> {
    if supplier.timeout_secs == 0 || supplier.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "supplier.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if supplier.max_retries > 5 {
        return Err(ConfigError::Validation(
            "supplier.max_retries must be at most 5".to_string(),
        ));
    }

    if supplier.backoff_base_ms == 0 {
        return Err(ConfigError::Validation(
            "supplier.backoff_base_ms must be greater than zero".to_string(),
        ));
    }

    if supplier.mode == SupplierMode::Live {
        let base_url_ok = supplier
            .base_url
            .as_deref()
            .map(|url| url.starts_with("http://") || url.starts_with("https://"))
            .unwrap_or(false);
        if !base_url_ok {
            return Err(ConfigError::Validation(
                "supplier.base_url must be an http(s) URL when supplier.mode is `live`"
                    .to_string(),
            ));
        }

        let key_missing = supplier
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if key_missing {
            return Err(ConfigError::Validation(
                "supplier.api_key is required when supplier.mode is `live`".to_string(),
            ));
        }

        let secret_missing = supplier
            .api_secret
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if secret_missing {
            return Err(ConfigError::Validation(
                "supplier.api_secret is required when supplier.mode is `live`".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_payment(payment: &PaymentConfig) -> Result<(), ConfigError> {
    if payment.timeout_secs == 0 || payment.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "payment.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if !payment.base_url.starts_with("http://") && !payment.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "payment.base_url must start with http:// or https://".to_string(),
        ));
    }

    if payment.enabled {
        let key_id_missing =
            payment.key_id.as_deref().map(|value| value.trim().is_empty()).unwrap_or(true);
        if key_id_missing {
            return Err(ConfigError::Validation(
                "payment.key_id is required when payment.enabled is true".to_string(),
            ));
        }

        let key_secret_missing = payment
            .key_secret
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if key_secret_missing {
            return Err(ConfigError::Validation(
                "payment.key_secret is required when payment.enabled is true".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.markup_value < Decimal::ZERO || pricing.service_fee_value < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing values must not be negative".to_string(),
        ));
    }

    if pricing.markup_mode == FeeMode::Percent && pricing.markup_value > Decimal::ONE_HUNDRED {
        return Err(ConfigError::Validation(
            "pricing.markup_value is a percentage and must be at most 100".to_string(),
        ));
    }

    if pricing.service_fee_mode == FeeMode::Percent
        && pricing.service_fee_value > Decimal::ONE_HUNDRED
    {
        return Err(ConfigError::Validation(
            "pricing.service_fee_value is a percentage and must be at most 100".to_string(),
        ));
    }

    if let Some(cap) = pricing.markup_cap {
        if cap <= Decimal::ZERO {
            return Err(ConfigError::Validation(
                "pricing.markup_cap must be greater than zero when set".to_string(),
            ));
        }
    }

    if pricing.min_total_fee < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.min_total_fee must not be negative".to_string(),
        ));
    }

    Ok(())
}

fn validate_tax(tax: &TaxConfig) -> Result<(), ConfigError> {
    if tax.gst_rate <= Decimal::ZERO || tax.gst_rate >= Decimal::ONE {
        return Err(ConfigError::Validation(
            "tax.gst_rate must be a fraction between 0 and 1 (e.g. 0.05 for 5%)".to_string(),
        ));
    }

    if tax.registered_state.trim().is_empty() {
        return Err(ConfigError::Validation(
            "tax.registered_state must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_approvals(approvals: &ApprovalsConfig) -> Result<(), ConfigError> {
    if approvals.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "approvals.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
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

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
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
    Decimal::from_str(value).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    supplier: Option<SupplierPatch>,
    payment: Option<PaymentPatch>,
    pricing: Option<PricingPatch>,
    tax: Option<TaxPatch>,
    approvals: Option<ApprovalsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SupplierPatch {
    mode: Option<SupplierMode>,
    base_url: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    backoff_base_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    key_id: Option<String>,
    key_secret: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    markup_mode: Option<FeeMode>,
    markup_value: Option<Decimal>,
    markup_cap: Option<Decimal>,
    service_fee_mode: Option<FeeMode>,
    service_fee_value: Option<Decimal>,
    min_total_fee: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct TaxPatch {
    gst_rate: Option<Decimal>,
    registered_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApprovalsPatch {
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use crate::pricing::FeeComponent;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, SupplierMode};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_any_input() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            matches!(config.supplier.mode, SupplierMode::Sandbox),
            "default supplier mode should be sandbox",
        )?;
        ensure(!config.payment.enabled, "payment should default to disabled")?;
        ensure(config.tax.registered_state == "Karnataka", "default registered state")?;
        Ok(())
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SUPPLIER_API_KEY", "ak-from-env");
        env::set_var("TEST_SUPPLIER_API_SECRET", "as-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tripdesk.toml");
            fs::write(
                &path,
                r#"
[supplier]
mode = "live"
base_url = "https://api.aerohub.example"
api_key = "${TEST_SUPPLIER_API_KEY}"
api_secret = "${TEST_SUPPLIER_API_SECRET}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config.supplier.api_key.as_ref().map(|s| s.expose_secret().to_string());
            ensure(
                api_key.as_deref() == Some("ak-from-env"),
                "api key should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SUPPLIER_API_KEY", "TEST_SUPPLIER_API_SECRET"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIPDESK_DATABASE_URL", "sqlite://from-env.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tripdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "programmatic override should win over env and file",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["TRIPDESK_DATABASE_URL"]);
        result
    }

    #[test]
    fn live_supplier_mode_requires_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIPDESK_SUPPLIER_MODE", "live");
        env::set_var("TRIPDESK_SUPPLIER_BASE_URL", "https://api.aerohub.example");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("supplier.api_key")
            );
            ensure(has_message, "validation failure should mention supplier.api_key")
        })();

        clear_vars(&["TRIPDESK_SUPPLIER_MODE", "TRIPDESK_SUPPLIER_BASE_URL"]);
        result
    }

    #[test]
    fn pricing_section_builds_the_expected_rule() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("tripdesk.toml");
        fs::write(
            &path,
            r#"
[pricing]
markup_mode = "fixed"
markup_value = "250.00"
service_fee_mode = "percent"
service_fee_value = "2.0"
min_total_fee = "99.00"
"#,
        )
        .map_err(|err| err.to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        let rule = config.pricing.rule();
        ensure(
            rule.markup == FeeComponent::Fixed(Decimal::new(250_00, 2)),
            "markup should be the fixed amount from the file",
        )?;
        ensure(
            rule.service_fee == FeeComponent::Percent(Decimal::new(2, 0)),
            "service fee should be the percentage from the file",
        )?;
        ensure(rule.min_total_fee == Decimal::new(99_00, 2), "floor should come from the file")?;
        Ok(())
    }

    #[test]
    fn gst_rate_outside_unit_interval_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIPDESK_TAX_GST_RATE", "5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected gst rate validation failure".to_string()),
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("tax.gst_rate")
            );
            ensure(has_message, "validation failure should mention tax.gst_rate")
        })();

        clear_vars(&["TRIPDESK_TAX_GST_RATE"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIPDESK_SUPPLIER_API_KEY", "ak-secret-value");
        env::set_var("TRIPDESK_PAYMENT_KEY_SECRET", "rzp-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("ak-secret-value"),
                "debug output should not contain the supplier api key",
            )?;
            ensure(
                !debug.contains("rzp-secret-value"),
                "debug output should not contain the payment key secret",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["TRIPDESK_SUPPLIER_API_KEY", "TRIPDESK_PAYMENT_KEY_SECRET"]);
        result
    }
}

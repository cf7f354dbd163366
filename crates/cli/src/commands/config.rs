use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use tripdesk_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", "TRIPDESK_DATABASE_URL"),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", "TRIPDESK_DATABASE_MAX_CONNECTIONS"),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", "TRIPDESK_DATABASE_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "supplier.mode",
        config.supplier.mode.as_str(),
        source("supplier.mode", "TRIPDESK_SUPPLIER_MODE"),
    ));
    lines.push(render_line(
        "supplier.base_url",
        config.supplier.base_url.as_deref().unwrap_or("<unset>"),
        source("supplier.base_url", "TRIPDESK_SUPPLIER_BASE_URL"),
    ));
    let supplier_key = config
        .supplier
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "supplier.api_key",
        &supplier_key,
        source("supplier.api_key", "TRIPDESK_SUPPLIER_API_KEY"),
    ));
    let supplier_secret = if config.supplier.api_secret.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "supplier.api_secret",
        supplier_secret,
        source("supplier.api_secret", "TRIPDESK_SUPPLIER_API_SECRET"),
    ));
    lines.push(render_line(
        "supplier.timeout_secs",
        &config.supplier.timeout_secs.to_string(),
        source("supplier.timeout_secs", "TRIPDESK_SUPPLIER_TIMEOUT_SECS"),
    ));
    lines.push(render_line(
        "supplier.max_retries",
        &config.supplier.max_retries.to_string(),
        source("supplier.max_retries", "TRIPDESK_SUPPLIER_MAX_RETRIES"),
    ));

    lines.push(render_line(
        "payment.enabled",
        &config.payment.enabled.to_string(),
        source("payment.enabled", "TRIPDESK_PAYMENT_ENABLED"),
    ));
    let payment_key = config
        .payment
        .key_id
        .as_deref()
        .map(redact_token)
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "payment.key_id",
        &payment_key,
        source("payment.key_id", "TRIPDESK_PAYMENT_KEY_ID"),
    ));
    let payment_secret = if config.payment.key_secret.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "payment.key_secret",
        payment_secret,
        source("payment.key_secret", "TRIPDESK_PAYMENT_KEY_SECRET"),
    ));

    lines.push(render_line(
        "tax.gst_rate",
        &config.tax.gst_rate.to_string(),
        source("tax.gst_rate", "TRIPDESK_TAX_GST_RATE"),
    ));
    lines.push(render_line(
        "tax.registered_state",
        &config.tax.registered_state,
        source("tax.registered_state", "TRIPDESK_TAX_REGISTERED_STATE"),
    ));

    lines.push(render_line(
        "approvals.sweep_interval_secs",
        &config.approvals.sweep_interval_secs.to_string(),
        source("approvals.sweep_interval_secs", "TRIPDESK_APPROVALS_SWEEP_INTERVAL_SECS"),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "TRIPDESK_SERVER_BIND_ADDRESS"),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        source("server.health_check_port", "TRIPDESK_SERVER_HEALTH_CHECK_PORT"),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "TRIPDESK_LOGGING_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "TRIPDESK_LOGGING_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("tripdesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/tripdesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keys keep their vendor prefix up to the first separator so an operator
/// can tell live from test credentials; everything after is hidden.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('_') {
        return format!("{prefix}_***");
    }
    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::redact_token;

    #[test]
    fn redaction_keeps_only_the_vendor_prefix() {
        assert_eq!(redact_token("rzp_test_4fZ29aKqX1"), "rzp_***");
        assert_eq!(redact_token("ah-live-8842hjk1"), "ah-***");
        assert_eq!(redact_token("plainsecret"), "<redacted>");
        assert_eq!(redact_token("   "), "<empty>");
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::default_config;
use super::paths::AppPaths;
use super::types::AppConfig;
use super::validation::validate_config;
use crate::core::errors::RagError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 10] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "access_key",
    "access_token",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 5] = [
    "max_tokens",
    "token_budget",
    "chunk_token_limit",
    "token_count",
    "tokenizer_path",
];

/// Environment variables applied over the file configuration, as
/// (variable, config path, is numeric).
const ENV_OVERRIDES: [(&str, &[&str], bool); 6] = [
    ("OPENAI_API_KEY", &["provider", "api_key"], false),
    ("OPENAI_BASE_URL", &["provider", "base_url"], false),
    ("SLACK_TOKEN", &["slack", "bot_token"], false),
    ("SLACK_SIGNING_SECRET", &["slack", "signing_secret"], false),
    ("GLOSSARY_QA_TOKENIZER", &["tokenizer_path"], false),
    ("PORT", &["server", "port"], true),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("GLOSSARY_QA_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Defaults, then `config.yml`, then `secrets.yaml`, then the environment.
    pub fn load_config(&self) -> Result<Value, RagError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.paths.secrets_path)?;
        let merged = deep_merge(&default_config(), &public_config);
        let mut merged = deep_merge(&merged, &secrets_config);
        apply_env_overrides(&mut merged, |key| env::var(key).ok());
        Ok(merged)
    }

    /// Loads, validates and converts the configuration. Startup fails here on
    /// any invalid value.
    pub fn load_app_config(&self) -> Result<AppConfig, RagError> {
        let merged = self.load_config()?;
        let config = parse_app_config(&merged)?;
        tracing::debug!(
            "Effective configuration: {}",
            redact_sensitive_values(&merged)
        );
        Ok(config)
    }
}

/// Validates a merged configuration tree and converts it into `AppConfig`.
pub fn parse_app_config(merged: &Value) -> Result<AppConfig, RagError> {
    validate_config(merged)?;
    let config: AppConfig = serde_json::from_value(merged.clone())
        .map_err(|err| RagError::InvalidConfiguration(err.to_string()))?;
    config.pipeline.validate()?;
    Ok(config)
}

fn load_yaml_file(path: &Path) -> Result<Value, RagError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path)?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|err| {
        RagError::InvalidConfiguration(format!("{}: {}", path.display(), err))
    })?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(RagError::InvalidConfiguration(format!(
            "{}: top level must be a mapping",
            path.display()
        ))),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (variable, path, numeric) in ENV_OVERRIDES {
        let Some(raw) = lookup(variable).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let value = if numeric {
            match raw.trim().parse::<u64>() {
                Ok(number) => Value::from(number),
                Err(_) => {
                    tracing::warn!("Ignoring non-numeric {}={}", variable, raw);
                    continue;
                }
            }
        } else {
            Value::String(raw)
        };
        ensure_object_path(config, path, value);
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() && !val.is_object() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

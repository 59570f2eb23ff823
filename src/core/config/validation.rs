use serde_json::{Map, Value};

use crate::core::errors::RagError;

/// Checks the merged configuration tree before it is turned into typed values.
pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(pipeline) = expect_optional_object(root, "pipeline")? {
        validate_u64_field(
            pipeline,
            "pipeline.token_budget",
            "token_budget",
            1,
            1_000_000,
        )?;
        validate_u64_field(
            pipeline,
            "pipeline.chunk_token_limit",
            "chunk_token_limit",
            1,
            1_000_000,
        )?;
        validate_u64_field(
            pipeline,
            "pipeline.vector_dimension",
            "vector_dimension",
            1,
            65_536,
        )?;
    }

    if let Some(provider) = expect_optional_object(root, "provider")? {
        validate_required_string_field(provider, "provider.base_url", "base_url")?;
        validate_required_string_field(provider, "provider.embedding_model", "embedding_model")?;
        validate_optional_string_field(provider, "provider.api_key", "api_key")?;
        validate_u64_field(
            provider,
            "provider.embedding_batch_size",
            "embedding_batch_size",
            1,
            2048,
        )?;
        validate_u64_field(provider, "provider.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_u64_field(provider, "provider.max_retries", "max_retries", 0, 10)?;
    }

    if let Some(completion) = expect_optional_object(root, "completion")? {
        validate_required_string_field(completion, "completion.model", "model")?;
        validate_required_string_field(completion, "completion.instruction", "instruction")?;
        validate_u64_field(completion, "completion.max_tokens", "max_tokens", 1, 100_000)?;
        validate_u64_field(completion, "completion.best_of", "best_of", 1, 20)?;
        validate_f64_field(completion, "completion.temperature", "temperature", 0.0, 2.0)?;
        validate_f64_field(
            completion,
            "completion.presence_penalty",
            "presence_penalty",
            -2.0,
            2.0,
        )?;
        validate_f64_field(
            completion,
            "completion.frequency_penalty",
            "frequency_penalty",
            -2.0,
            2.0,
        )?;
    }

    if let Some(slack) = expect_optional_object(root, "slack")? {
        validate_optional_string_field(slack, "slack.bot_token", "bot_token")?;
        validate_optional_string_field(slack, "slack.signing_secret", "signing_secret")?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
    }

    if let Some(value) = root.get("tokenizer_path") {
        if !value.is_null() && value.as_str().is_none() {
            return Err(config_type_error("tokenizer_path", "string"));
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "non-negative integer"));
    };
    if number < min || number > max {
        return Err(RagError::InvalidConfiguration(format!(
            "'{}' must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(RagError::InvalidConfiguration(format!(
            "'{}' must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let value = section.get(key).ok_or_else(|| {
        RagError::InvalidConfiguration(format!("'{}' is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(RagError::InvalidConfiguration(format!(
            "'{}' cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if !value.is_null() && value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::InvalidConfiguration(format!("'{}' must be a {}", path, expected))
}

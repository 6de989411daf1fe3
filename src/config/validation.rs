use super::ServerConfig;

/// Temperatures the realtime model accepts.
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.6..=1.2;

pub(super) fn validate_api_key(api_key: &Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err("Missing OpenAI API key. Set OPENAI_API_KEY or openai.api_key".into()),
    }
}

pub(super) fn validate_port(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    if port == 0 {
        return Err("Invalid port: must be between 1 and 65535".into());
    }
    Ok(())
}

pub(super) fn validate_temperature(temperature: f32) -> Result<(), Box<dyn std::error::Error>> {
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(format!(
            "Invalid temperature {temperature}: must be between {} and {}",
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end()
        )
        .into());
    }
    Ok(())
}

pub(super) fn validate_sentinel(sentinel: &str) -> Result<(), Box<dyn std::error::Error>> {
    if sentinel.trim().is_empty() {
        return Err("End-of-call sentinel must not be empty".into());
    }
    Ok(())
}

/// Run every check against a loaded configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_api_key(&config.openai_api_key)?;
    validate_port(config.port)?;
    validate_temperature(config.temperature)?;
    validate_sentinel(&config.end_call_sentinel)?;
    Ok(())
}

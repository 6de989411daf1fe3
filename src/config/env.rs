//! Environment variable loading.

use std::env;
use std::str::FromStr;

use super::{
    DEFAULT_HOST, DEFAULT_INTRO_MESSAGE, DEFAULT_PORT, DEFAULT_TEMPERATURE, ServerConfig,
};
use crate::core::bridge::{DEFAULT_END_CALL_SENTINEL, DEFAULT_HANGUP_GRACE, DEFAULT_LOG_EVENT_TYPES};
use crate::core::realtime::{OPENAI_REALTIME_URL, OpenAIRealtimeModel, OpenAIRealtimeVoice};

/// Read a variable, treating empty values as unset.
pub(super) fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a variable.
pub(super) fn env_parse<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name}: {e}").into()),
        None => Ok(None),
    }
}

/// Read a boolean flag (`true`/`false`, `1`/`0`, `yes`/`no`).
pub(super) fn env_bool(name: &str) -> Result<Option<bool>, Box<dyn std::error::Error>> {
    match env_var(name) {
        Some(value) => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| format!("Invalid value for {name}: expected a boolean, got {value}").into()),
        None => Ok(None),
    }
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma separated list, dropping empty entries.
pub(super) fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build a configuration from environment variables and defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    Ok(ServerConfig {
        host: env_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env_parse("PORT")?.unwrap_or(DEFAULT_PORT),
        public_host: env_var("PUBLIC_HOST"),
        openai_api_key: env_var("OPENAI_API_KEY"),
        realtime_url: env_var("OPENAI_REALTIME_URL")
            .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
        realtime_model: env_parse::<OpenAIRealtimeModel>("OPENAI_REALTIME_MODEL")?
            .unwrap_or_default(),
        voice: env_parse::<OpenAIRealtimeVoice>("OPENAI_VOICE")?.unwrap_or_default(),
        temperature: env_parse("OPENAI_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE),
        instructions: env_var("SYSTEM_MESSAGE"),
        greeting: env_var("ASSISTANT_GREETING"),
        intro_message: env_var("INTRO_MESSAGE")
            .unwrap_or_else(|| DEFAULT_INTRO_MESSAGE.to_string()),
        end_call_sentinel: env_var("END_CALL_SENTINEL")
            .unwrap_or_else(|| DEFAULT_END_CALL_SENTINEL.to_string()),
        end_call_tool: env_bool("END_CALL_TOOL")?.unwrap_or(false),
        hangup_grace_ms: env_parse("HANGUP_GRACE_MS")?
            .unwrap_or(DEFAULT_HANGUP_GRACE.as_millis() as u64),
        show_timing_math: env_bool("SHOW_TIMING_MATH")?.unwrap_or(false),
        log_event_types: env_var("LOG_EVENT_TYPES")
            .map(|v| parse_list(&v))
            .unwrap_or_else(|| DEFAULT_LOG_EVENT_TYPES.iter().map(|s| s.to_string()).collect()),
    })
}

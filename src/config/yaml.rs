use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5050
///   public_host: "bridge.example.com"
///
/// openai:
///   api_key: "sk-..."
///   realtime_url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-4o-realtime-preview"
///   voice: "alloy"
///   temperature: 0.8
///
/// assistant:
///   instructions: "You are a helpful assistant."
///   greeting: "Greet the caller and ask how you can help."
///   intro_message: "Please wait while we connect your call."
///
/// call:
///   end_call_sentinel: "[END_CALL]"
///   end_call_tool: false
///   hangup_grace_ms: 5000
///   show_timing_math: false
///   log_event_types:
///     - error
///     - response.done
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub assistant: Option<AssistantYaml>,
    pub call: Option<CallYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Host name Twilio should use to reach the media stream endpoint
    pub public_host: Option<String>,
}

/// OpenAI Realtime settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub realtime_url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f32>,
}

/// Assistant behaviour from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AssistantYaml {
    pub instructions: Option<String>,
    pub greeting: Option<String>,
    pub intro_message: Option<String>,
}

/// Per-call bridge settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallYaml {
    pub end_call_sentinel: Option<String>,
    pub end_call_tool: Option<bool>,
    pub hangup_grace_ms: Option<u64>,
    pub show_timing_math: Option<bool>,
    pub log_event_types: Option<Vec<String>>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  public_host: "bridge.example.com"

openai:
  api_key: "sk-yaml"
  model: "gpt-4o-mini-realtime-preview"
  voice: "shimmer"
  temperature: 0.7

assistant:
  instructions: "Be brief."
  greeting: "Say hello."

call:
  end_call_sentinel: "<<bye>>"
  end_call_tool: true
  hangup_grace_ms: 2500
  show_timing_math: true
  log_event_types: ["error", "response.done"]
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.public_host.as_deref(), Some("bridge.example.com"));

        let openai = config.openai.unwrap();
        assert_eq!(openai.api_key.as_deref(), Some("sk-yaml"));
        assert_eq!(openai.voice.as_deref(), Some("shimmer"));
        assert_eq!(openai.temperature, Some(0.7));
        assert!(openai.realtime_url.is_none());

        let assistant = config.assistant.unwrap();
        assert_eq!(assistant.greeting.as_deref(), Some("Say hello."));
        assert!(assistant.intro_message.is_none());

        let call = config.call.unwrap();
        assert_eq!(call.end_call_sentinel.as_deref(), Some("<<bye>>"));
        assert_eq!(call.end_call_tool, Some(true));
        assert_eq!(call.hangup_grace_ms, Some(2500));
        assert_eq!(
            call.log_event_types,
            Some(vec!["error".to_string(), "response.done".to_string()])
        );
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.openai.is_none());
        assert!(config.assistant.is_none());
        assert!(config.call.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "server:\n  port: 3000\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(config.server.as_ref().unwrap().port, Some(3000));
        assert!(config.server.as_ref().unwrap().host.is_none());
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}

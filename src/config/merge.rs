use super::ServerConfig;
use super::env::load_from_env;
use super::yaml::YamlConfig;

/// Build the configuration from the environment, then apply YAML overrides.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if server.public_host.is_some() {
            config.public_host = server.public_host;
        }
    }

    if let Some(openai) = yaml.openai {
        if openai.api_key.is_some() {
            config.openai_api_key = openai.api_key;
        }
        if let Some(url) = openai.realtime_url {
            config.realtime_url = url;
        }
        if let Some(model) = openai.model {
            config.realtime_model = model.parse()?;
        }
        if let Some(voice) = openai.voice {
            config.voice = voice.parse()?;
        }
        if let Some(temperature) = openai.temperature {
            config.temperature = temperature;
        }
    }

    if let Some(assistant) = yaml.assistant {
        if assistant.instructions.is_some() {
            config.instructions = assistant.instructions;
        }
        if assistant.greeting.is_some() {
            config.greeting = assistant.greeting;
        }
        if let Some(intro) = assistant.intro_message {
            config.intro_message = intro;
        }
    }

    if let Some(call) = yaml.call {
        if let Some(sentinel) = call.end_call_sentinel {
            config.end_call_sentinel = sentinel;
        }
        if let Some(enabled) = call.end_call_tool {
            config.end_call_tool = enabled;
        }
        if let Some(grace) = call.hangup_grace_ms {
            config.hangup_grace_ms = grace;
        }
        if let Some(enabled) = call.show_timing_math {
            config.show_timing_math = enabled;
        }
        if let Some(types) = call.log_event_types {
            config.log_event_types = types;
        }
    }

    Ok(config)
}

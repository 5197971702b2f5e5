//! Configuration parsing
//!
//! Supports TOML (primary) and JSON.

use contracts::{ContractError, RunBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<RunBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<RunBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<RunBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DrainPolicy, SinkType};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[connections]]
source_id = 1
destination_id = 11
source = "rndtxt1.txt"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.connections.len(), 1);
        assert_eq!(bp.buffer.capacity, 1024);
        assert_eq!(bp.dispatch.workers, 4);
    }

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[buffer]
capacity = 4096
wait_timeout_ms = 20

[dispatch]
workers = 2
drain_window_ms = 1500
drain_policy = "until_idle"
max_payload = 64
pacing = false

[sinks]
kind = "log"
output_dir = "out"

[[connections]]
source_id = 1
destination_id = 11
source = "a.txt"

[[connections]]
source_id = 2
destination_id = 12
source = "b.txt"
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.buffer.capacity, 4096);
        assert_eq!(bp.buffer.wait_timeout_ms, 20);
        assert_eq!(bp.dispatch.workers, 2);
        assert_eq!(bp.dispatch.drain_policy, DrainPolicy::UntilIdle);
        assert_eq!(bp.dispatch.max_payload, 64);
        assert!(!bp.dispatch.pacing);
        assert_eq!(bp.sinks.kind, SinkType::Log);
        assert_eq!(bp.connections[1].destination_id, 12);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "buffer": { "capacity": 2048 },
            "connections": [
                { "source_id": 3, "destination_id": 13, "source": "c.txt" }
            ]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().buffer.capacity, 2048);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_negative_id_rejected() {
        let content = r#"
[[connections]]
source_id = -1
destination_id = 11
source = "a.txt"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}

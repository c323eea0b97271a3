use serde::Deserialize;
use std::path::Path;

use crate::lorawan::version::MacVersion;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub codec: CodecConfig,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct CodecConfig {
    /// MAC version assumed when interpreting FOpts; from 1.1 on they are
    /// encrypted and not decoded as MAC commands.
    #[serde(default = "default_mac_version")]
    pub mac_version: MacVersion,
    /// Encoding of frames given on the command line
    #[serde(default)]
    pub default_format: InputFormat,
}

/// Text encoding of a raw frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Hex,
    Base64,
}

impl InputFormat {
    pub fn decode(&self, input: &str) -> anyhow::Result<Vec<u8>> {
        use base64::Engine;
        let input = input.trim();
        match self {
            InputFormat::Hex => hex::decode(input.replace([' ', ':'], ""))
                .map_err(|e| anyhow::anyhow!("Invalid hex frame: {}", e)),
            InputFormat::Base64 => base64::engine::general_purpose::STANDARD
                .decode(input)
                .map_err(|e| anyhow::anyhow!("Invalid base64 frame: {}", e)),
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        use base64::Engine;
        match self {
            InputFormat::Hex => hex::encode_upper(bytes),
            InputFormat::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

fn default_mac_version() -> MacVersion {
    MacVersion::V1_0_3
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            mac_version: default_mac_version(),
            default_format: InputFormat::Hex,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
            [logging]
            level = "debug"

            [codec]
            mac_version = "1.1.0"
            default_format = "base64"
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.codec.mac_version, MacVersion::V1_1);
        assert_eq!(config.codec.default_format, InputFormat::Base64);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.codec.mac_version, MacVersion::V1_0_3);
        assert_eq!(config.codec.default_format, InputFormat::Hex);
    }

    #[test]
    fn test_unknown_mac_version_rejected() {
        let res: Result<Config, _> = toml::from_str("[codec]\nmac_version = \"2.0\"\n");
        assert!(res.is_err());
    }

    #[test]
    fn test_input_formats() {
        assert_eq!(
            InputFormat::Hex.decode("40 11 22").unwrap(),
            vec![0x40, 0x11, 0x22]
        );
        assert_eq!(
            InputFormat::Base64.decode("QBEi").unwrap(),
            vec![0x40, 0x11, 0x22]
        );
        assert_eq!(InputFormat::Base64.encode(&[0x40, 0x11, 0x22]), "QBEi");
        assert!(InputFormat::Hex.decode("4").is_err());
    }
}

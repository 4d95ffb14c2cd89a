use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::cache::CacheConfig;
use crate::converter::ConverterConfig;
use crate::processor::ProcessorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Config as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub processor: ProcessorConfig,
    pub cache: SanitizedCacheConfig,
    pub converter: SanitizedConverterConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCacheConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub max_size_bytes: u64,
    pub max_age_ms: u64,
}

/// Converter settings without the scratch layout
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConverterConfig {
    pub tool_timeout_ms: u64,
    pub ocr_language: String,
    pub libreoffice_path: PathBuf,
    pub imagemagick_path: PathBuf,
    pub ghostscript_path: PathBuf,
    pub tesseract_path: PathBuf,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            processor: config.processor.clone(),
            cache: SanitizedCacheConfig {
                enabled: config.cache.enabled,
                directory: config.cache.directory.clone(),
                max_size_bytes: config.cache.max_size_bytes,
                max_age_ms: config.cache.max_age_ms,
            },
            converter: SanitizedConverterConfig {
                tool_timeout_ms: config.converter.tool_timeout_ms,
                ocr_language: config.converter.ocr_language.clone(),
                libreoffice_path: config.converter.libreoffice_path.clone(),
                imagemagick_path: config.converter.imagemagick_path.clone(),
                ghostscript_path: config.converter.ghostscript_path.clone(),
                tesseract_path: config.converter.tesseract_path.clone(),
            },
        }
    }
}

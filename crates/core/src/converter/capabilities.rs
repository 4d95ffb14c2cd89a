//! Detection of the external tools installed on the host.

use futures::future::join_all;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::config::ConverterConfig;
use super::types::ToolKind;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub tool: ToolKind,
    pub path: PathBuf,
    pub available: bool,
    /// Version parsed from the tool's banner, when recognisable.
    pub version: Option<String>,
}

/// Which tools can be run on this host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolAvailability {
    pub tools: Vec<ToolStatus>,
}

impl ToolAvailability {
    /// Probes every configured tool concurrently.
    pub async fn detect(config: &ConverterConfig) -> Self {
        let probes = ToolKind::ALL.iter().map(|&tool| probe(config, tool));
        Self {
            tools: join_all(probes).await,
        }
    }

    /// Whether every tool was found.
    pub fn all_available(&self) -> bool {
        !self.tools.is_empty() && self.tools.iter().all(|t| t.available)
    }

    /// Whether a specific tool was found.
    pub fn is_available(&self, tool: ToolKind) -> bool {
        self.tools.iter().any(|t| t.tool == tool && t.available)
    }

    pub fn missing(&self) -> Vec<ToolKind> {
        self.tools
            .iter()
            .filter(|t| !t.available)
            .map(|t| t.tool)
            .collect()
    }
}

/// Argument that makes a tool print its version and exit.
pub(crate) fn version_flag(tool: ToolKind) -> &'static str {
    match tool {
        ToolKind::ImageMagick => "-version",
        ToolKind::LibreOffice | ToolKind::Ghostscript | ToolKind::Tesseract => "--version",
    }
}

async fn probe(config: &ConverterConfig, tool: ToolKind) -> ToolStatus {
    let path = config.tool_path(tool).to_path_buf();
    let output = timeout(
        PROBE_TIMEOUT,
        Command::new(&path)
            .arg(version_flag(tool))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await;

    let (available, version) = match output {
        Ok(Ok(o)) if o.status.success() => {
            // Tesseract prints its banner on stderr in older releases
            let mut banner = String::from_utf8_lossy(&o.stdout).to_string();
            banner.push_str(&String::from_utf8_lossy(&o.stderr));
            (true, parse_version(&banner))
        }
        _ => (false, None),
    };

    ToolStatus {
        tool,
        path,
        available,
        version,
    }
}

/// Extracts the first dotted version number from a banner.
fn parse_version(banner: &str) -> Option<String> {
    let re = Regex::new(r"(\d+\.\d+(?:\.\d+)*(?:-\d+)?)").ok()?;
    re.captures(banner)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_banners() {
        assert_eq!(
            parse_version("LibreOffice 7.6.4.1 60(Build:1)").as_deref(),
            Some("7.6.4.1")
        );
        assert_eq!(
            parse_version("Version: ImageMagick 6.9.11-60 Q16 x86_64").as_deref(),
            Some("6.9.11-60")
        );
        assert_eq!(parse_version("10.02.1\n").as_deref(), Some("10.02.1"));
        assert_eq!(
            parse_version("tesseract 5.3.4\n leptonica-1.84.1").as_deref(),
            Some("5.3.4")
        );
        assert_eq!(parse_version("no digits here"), None);
    }

    #[test]
    fn test_availability_queries() {
        let availability = ToolAvailability {
            tools: vec![
                ToolStatus {
                    tool: ToolKind::Ghostscript,
                    path: PathBuf::from("gs"),
                    available: true,
                    version: Some("10.02.1".to_string()),
                },
                ToolStatus {
                    tool: ToolKind::Tesseract,
                    path: PathBuf::from("tesseract"),
                    available: false,
                    version: None,
                },
            ],
        };
        assert!(availability.is_available(ToolKind::Ghostscript));
        assert!(!availability.is_available(ToolKind::Tesseract));
        assert!(!availability.is_available(ToolKind::LibreOffice));
        assert!(!availability.all_available());
        assert_eq!(availability.missing(), vec![ToolKind::Tesseract]);
    }

    #[test]
    fn test_default_is_not_available() {
        assert!(!ToolAvailability::default().all_available());
    }

    #[tokio::test]
    async fn test_detect_missing_tools() {
        let mut config = ConverterConfig::default();
        for tool in ToolKind::ALL {
            config = config.with_tool_path(tool, format!("/nonexistent/{}", tool));
        }
        let availability = ToolAvailability::detect(&config).await;
        assert_eq!(availability.tools.len(), 4);
        assert_eq!(availability.missing().len(), 4);
    }
}

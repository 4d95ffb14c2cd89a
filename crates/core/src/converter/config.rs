//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::types::ToolKind;

/// Configuration for the external tool converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to the LibreOffice binary.
    #[serde(default = "default_libreoffice_path")]
    pub libreoffice_path: PathBuf,

    /// Path to the ImageMagick `convert` binary.
    #[serde(default = "default_imagemagick_path")]
    pub imagemagick_path: PathBuf,

    /// Path to the Ghostscript binary.
    #[serde(default = "default_ghostscript_path")]
    pub ghostscript_path: PathBuf,

    /// Path to the Tesseract binary.
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: PathBuf,

    /// Directory for freshly produced output files.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Timeout for a single tool run in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub tool_timeout_ms: u64,

    /// Tesseract language code.
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    /// Resolution used when rasterising PDF/PostScript pages.
    #[serde(default = "default_raster_dpi")]
    pub raster_dpi: u32,

    /// Maximum bytes of stdout/stderr kept per stream for diagnostics.
    #[serde(default = "default_max_diagnostic_bytes")]
    pub max_diagnostic_bytes: usize,
}

fn default_libreoffice_path() -> PathBuf {
    PathBuf::from("soffice")
}

fn default_imagemagick_path() -> PathBuf {
    PathBuf::from("convert")
}

fn default_ghostscript_path() -> PathBuf {
    PathBuf::from("gs")
}

fn default_tesseract_path() -> PathBuf {
    PathBuf::from("tesseract")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("filemill-work")
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_raster_dpi() -> u32 {
    150
}

fn default_max_diagnostic_bytes() -> usize {
    64 * 1024
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            libreoffice_path: default_libreoffice_path(),
            imagemagick_path: default_imagemagick_path(),
            ghostscript_path: default_ghostscript_path(),
            tesseract_path: default_tesseract_path(),
            work_dir: default_work_dir(),
            tool_timeout_ms: default_timeout_ms(),
            ocr_language: default_ocr_language(),
            raster_dpi: default_raster_dpi(),
            max_diagnostic_bytes: default_max_diagnostic_bytes(),
        }
    }
}

impl ConverterConfig {
    /// Returns the configured binary for a tool.
    pub fn tool_path(&self, tool: ToolKind) -> &Path {
        match tool {
            ToolKind::LibreOffice => &self.libreoffice_path,
            ToolKind::ImageMagick => &self.imagemagick_path,
            ToolKind::Ghostscript => &self.ghostscript_path,
            ToolKind::Tesseract => &self.tesseract_path,
        }
    }

    /// Overrides the binary for a tool.
    pub fn with_tool_path(mut self, tool: ToolKind, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match tool {
            ToolKind::LibreOffice => self.libreoffice_path = path,
            ToolKind::ImageMagick => self.imagemagick_path = path,
            ToolKind::Ghostscript => self.ghostscript_path = path,
            ToolKind::Tesseract => self.tesseract_path = path,
        }
        self
    }

    /// Sets the work directory.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Sets the timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.tool_timeout_ms = timeout_ms;
        self
    }

    /// Sets the OCR language.
    pub fn with_ocr_language(mut self, language: impl Into<String>) -> Self {
        self.ocr_language = language.into();
        self
    }
}

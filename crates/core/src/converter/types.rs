//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::ConverterError;

/// A file format the service knows how to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Microsoft Word 97-2003
    Doc,
    /// Office Open XML document
    Docx,
    /// OpenDocument text
    Odt,
    /// Rich Text Format
    Rtf,
    /// Plain text
    Txt,
    /// HTML
    Html,
    /// Portable Document Format
    Pdf,
    /// PostScript
    Ps,
    /// Encapsulated PostScript
    Eps,
    /// JPEG
    Jpg,
    /// PNG
    Png,
    /// GIF
    Gif,
    /// Windows bitmap
    Bmp,
    /// TIFF
    Tiff,
    /// WebP
    Webp,
}

/// Broad grouping used to pick a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatFamily {
    Document,
    Pdf,
    PostScript,
    Image,
}

impl Format {
    /// Every known format.
    pub const ALL: [Format; 15] = [
        Format::Doc,
        Format::Docx,
        Format::Odt,
        Format::Rtf,
        Format::Txt,
        Format::Html,
        Format::Pdf,
        Format::Ps,
        Format::Eps,
        Format::Jpg,
        Format::Png,
        Format::Gif,
        Format::Bmp,
        Format::Tiff,
        Format::Webp,
    ];

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Odt => "odt",
            Self::Rtf => "rtf",
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Ps => "ps",
            Self::Eps => "eps",
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
        }
    }

    /// Returns the family this format belongs to.
    pub fn family(&self) -> FormatFamily {
        match self {
            Self::Doc | Self::Docx | Self::Odt | Self::Rtf | Self::Txt | Self::Html => {
                FormatFamily::Document
            }
            Self::Pdf => FormatFamily::Pdf,
            Self::Ps | Self::Eps => FormatFamily::PostScript,
            Self::Jpg | Self::Png | Self::Gif | Self::Bmp | Self::Tiff | Self::Webp => {
                FormatFamily::Image
            }
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        let format = match mime {
            "application/msword" => Self::Doc,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Self::Docx
            }
            "application/vnd.oasis.opendocument.text" => Self::Odt,
            "application/rtf" | "text/rtf" => Self::Rtf,
            "text/plain" => Self::Txt,
            "text/html" => Self::Html,
            "application/pdf" => Self::Pdf,
            "application/postscript" => Self::Ps,
            "image/x-eps" | "application/eps" => Self::Eps,
            "image/jpeg" | "image/jpg" => Self::Jpg,
            "image/png" => Self::Png,
            "image/gif" => Self::Gif,
            "image/bmp" | "image/x-ms-bmp" => Self::Bmp,
            "image/tiff" => Self::Tiff,
            "image/webp" => Self::Webp,
            _ => return None,
        };
        Some(format)
    }
}

impl FromStr for Format {
    type Err = ConverterError;

    /// Parses an extension (`docx`, `.JPEG`) or a MIME type (`image/png`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();

        if normalized.contains('/') {
            return Self::from_mime(&normalized).ok_or_else(|| ConverterError::UnknownFormat {
                format: s.to_string(),
            });
        }

        let format = match normalized.as_str() {
            "doc" => Self::Doc,
            "docx" => Self::Docx,
            "odt" => Self::Odt,
            "rtf" => Self::Rtf,
            "txt" | "text" => Self::Txt,
            "html" | "htm" => Self::Html,
            "pdf" => Self::Pdf,
            "ps" => Self::Ps,
            "eps" => Self::Eps,
            "jpg" | "jpeg" => Self::Jpg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            _ => {
                return Err(ConverterError::UnknownFormat {
                    format: s.to_string(),
                })
            }
        };
        Ok(format)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Kind of conversion, used to tag tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionKind {
    Document,
    Image,
    Pdf,
    Ocr,
}

impl ConversionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Ocr => "ocr",
        }
    }
}

/// External programs the converter drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    LibreOffice,
    ImageMagick,
    Ghostscript,
    Tesseract,
}

impl ToolKind {
    /// Every supported tool.
    pub const ALL: [ToolKind; 4] = [
        ToolKind::LibreOffice,
        ToolKind::ImageMagick,
        ToolKind::Ghostscript,
        ToolKind::Tesseract,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LibreOffice => "libreoffice",
            Self::ImageMagick => "imagemagick",
            Self::Ghostscript => "ghostscript",
            Self::Tesseract => "tesseract",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single conversion to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    /// Identifier used in logs (the task id when run from the queue).
    pub job_id: String,
    /// Source file path.
    pub input_path: PathBuf,
    /// Where the converted file must end up.
    pub output_path: PathBuf,
    /// Format of the source file.
    pub source_format: Format,
    /// Format to produce.
    pub target_format: Format,
}

/// Result of a successful tool run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Job ID.
    pub job_id: String,
    /// Path of the produced file.
    pub output_path: PathBuf,
    /// Size of the produced file in bytes.
    pub output_size_bytes: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Tool that produced the file.
    pub tool: ToolKind,
}

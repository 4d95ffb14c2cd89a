//! Converter module: runs external tools to turn one file format into another.
//!
//! Conversions are routed through a closed table keyed on the source and
//! target [`Format`]:
//!
//! - Documents (doc, docx, odt, rtf, txt, html) go through LibreOffice
//! - Images go through ImageMagick, or Tesseract when the target is text
//! - PDF and PostScript go through Ghostscript
//!
//! # Example
//!
//! ```ignore
//! use filemill_core::converter::{Converter, ConversionJob, ExternalToolConverter, Format};
//!
//! let converter = ExternalToolConverter::with_defaults();
//!
//! let job = ConversionJob {
//!     job_id: "job-1".to_string(),
//!     input_path: PathBuf::from("/path/to/report.docx"),
//!     output_path: PathBuf::from("/path/to/report.pdf"),
//!     source_format: Format::Docx,
//!     target_format: Format::Pdf,
//! };
//!
//! let outcome = converter.convert(job).await?;
//! println!("Converted in {} ms", outcome.duration_ms);
//! ```

mod capabilities;
mod config;
mod error;
mod external;
mod routes;
mod traits;
mod types;

pub use capabilities::{ToolAvailability, ToolStatus};
pub use config::ConverterConfig;
pub use error::{ConverterError, ErrorKind};
pub use external::ExternalToolConverter;
pub use routes::{supported_conversions, OutputLayout, ToolRoute};
pub use traits::Converter;
pub use types::{
    ConversionJob, ConversionKind, Format, FormatFamily, ToolKind, ToolOutcome,
};

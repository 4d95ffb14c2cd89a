//! Mapping from format pairs to the tool and arguments that perform them.
//!
//! The table is a single exhaustive `match` over format families, so adding a
//! format forces a decision here instead of silently falling through.

use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::types::{ConversionKind, Format, FormatFamily, ToolKind};

/// Where a tool leaves its output relative to the path we ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// The tool writes exactly the requested output path.
    Exact,
    /// The tool writes `<input stem>.<ext>` into a given directory.
    OutDir,
    /// The tool takes a base name and appends the extension itself.
    AppendsExtension,
}

/// A resolved conversion: which tool turns `source` into `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolRoute {
    pub source: Format,
    pub target: Format,
    pub tool: ToolKind,
    pub kind: ConversionKind,
}

impl ToolRoute {
    /// Resolves the route for a format pair.
    pub fn resolve(source: Format, target: Format) -> Result<Self, ConverterError> {
        use FormatFamily::*;

        let route = match (source.family(), target.family()) {
            (Document, Document) if source != target => {
                Some((ToolKind::LibreOffice, ConversionKind::Document))
            }
            (Document, Pdf) => Some((ToolKind::LibreOffice, ConversionKind::Document)),
            (Document, _) => None,

            (Image, Image) if source != target => {
                Some((ToolKind::ImageMagick, ConversionKind::Image))
            }
            (Image, Pdf) => Some((ToolKind::ImageMagick, ConversionKind::Image)),
            (Image, Document) if target == Format::Txt => {
                Some((ToolKind::Tesseract, ConversionKind::Ocr))
            }
            (Image, _) => None,

            (Pdf | PostScript, Pdf) => Some((ToolKind::Ghostscript, ConversionKind::Pdf)),
            (Pdf | PostScript, PostScript) if source != target => {
                Some((ToolKind::Ghostscript, ConversionKind::Pdf))
            }
            (Pdf | PostScript, Image) if raster_device(target).is_some() => {
                Some((ToolKind::Ghostscript, ConversionKind::Pdf))
            }
            (Pdf | PostScript, _) => None,
        };

        route
            .map(|(tool, kind)| Self {
                source,
                target,
                tool,
                kind,
            })
            .ok_or_else(|| ConverterError::unsupported(source, target))
    }

    /// How the tool lays out its output.
    pub fn layout(&self) -> OutputLayout {
        match self.tool {
            ToolKind::LibreOffice => OutputLayout::OutDir,
            ToolKind::Tesseract => OutputLayout::AppendsExtension,
            ToolKind::ImageMagick | ToolKind::Ghostscript => OutputLayout::Exact,
        }
    }

    /// Builds the argument vector for the tool.
    ///
    /// `scratch` is a directory private to this run.
    pub fn build_args(
        &self,
        config: &ConverterConfig,
        input: &Path,
        output: &Path,
        scratch: &Path,
    ) -> Vec<OsString> {
        match self.tool {
            ToolKind::LibreOffice => {
                // A private profile lets several instances run side by side
                let profile = format!(
                    "-env:UserInstallation=file://{}",
                    scratch.join("profile").display()
                );
                vec![
                    "--headless".into(),
                    profile.into(),
                    "--convert-to".into(),
                    libreoffice_filter(self.target).into(),
                    "--outdir".into(),
                    scratch.into(),
                    input.into(),
                ]
            }
            ToolKind::ImageMagick => {
                let mut source: OsString = input.into();
                if self.target.family() == FormatFamily::Image {
                    // First frame only for single-image targets
                    source.push("[0]");
                }
                vec![source, output.into()]
            }
            ToolKind::Ghostscript => {
                let mut args: Vec<OsString> = vec![
                    "-dNOPAUSE".into(),
                    "-dBATCH".into(),
                    "-dSAFER".into(),
                    "-dQUIET".into(),
                ];
                match self.target.family() {
                    FormatFamily::Image => {
                        let device = raster_device(self.target).unwrap_or("png16m");
                        args.push(format!("-sDEVICE={}", device).into());
                        args.push(format!("-r{}", config.raster_dpi).into());
                        args.push("-dFirstPage=1".into());
                        args.push("-dLastPage=1".into());
                    }
                    _ => {
                        let device = match self.target {
                            Format::Ps => "ps2write",
                            Format::Eps => "eps2write",
                            _ => "pdfwrite",
                        };
                        args.push(format!("-sDEVICE={}", device).into());
                    }
                }
                let mut output_arg = OsString::from("-sOutputFile=");
                output_arg.push(escape_ghostscript_path(output));
                args.push(output_arg);
                args.push(input.into());
                args
            }
            ToolKind::Tesseract => vec![
                input.into(),
                output.with_extension("").into(),
                "-l".into(),
                config.ocr_language.clone().into(),
            ],
        }
    }

    /// Where the tool actually writes its product.
    pub fn produced_path(&self, input: &Path, output: &Path, scratch: &Path) -> PathBuf {
        match self.layout() {
            OutputLayout::Exact => output.to_path_buf(),
            OutputLayout::OutDir => {
                let stem = input.file_stem().unwrap_or_default();
                let mut name = stem.to_os_string();
                name.push(".");
                name.push(self.target.extension());
                scratch.join(name)
            }
            OutputLayout::AppendsExtension => output.with_extension(self.target.extension()),
        }
    }
}

/// Every format pair with a route, in table order.
pub fn supported_conversions() -> Vec<ToolRoute> {
    Format::ALL
        .iter()
        .flat_map(|&source| {
            Format::ALL
                .iter()
                .filter_map(move |&target| ToolRoute::resolve(source, target).ok())
        })
        .collect()
}

fn libreoffice_filter(target: Format) -> &'static str {
    match target {
        Format::Txt => "txt:Text",
        other => other.extension(),
    }
}

fn raster_device(target: Format) -> Option<&'static str> {
    match target {
        Format::Png => Some("png16m"),
        Format::Jpg => Some("jpeg"),
        Format::Tiff => Some("tiff24nc"),
        _ => None,
    }
}

/// Ghostscript treats `%` in output names as a page-number template.
fn escape_ghostscript_path(path: &Path) -> OsString {
    let raw = path.to_string_lossy();
    if raw.contains('%') {
        OsString::from(raw.replace('%', "%%"))
    } else {
        path.as_os_str().to_os_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_as_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn test_document_routes_use_libreoffice() {
        let route = ToolRoute::resolve(Format::Docx, Format::Pdf).unwrap();
        assert_eq!(route.tool, ToolKind::LibreOffice);
        assert_eq!(route.kind, ConversionKind::Document);

        let route = ToolRoute::resolve(Format::Odt, Format::Txt).unwrap();
        assert_eq!(route.tool, ToolKind::LibreOffice);
    }

    #[test]
    fn test_image_routes() {
        let route = ToolRoute::resolve(Format::Png, Format::Jpg).unwrap();
        assert_eq!(route.tool, ToolKind::ImageMagick);
        assert_eq!(route.kind, ConversionKind::Image);

        let route = ToolRoute::resolve(Format::Tiff, Format::Pdf).unwrap();
        assert_eq!(route.tool, ToolKind::ImageMagick);

        let route = ToolRoute::resolve(Format::Png, Format::Txt).unwrap();
        assert_eq!(route.tool, ToolKind::Tesseract);
        assert_eq!(route.kind, ConversionKind::Ocr);
    }

    #[test]
    fn test_pdf_routes_use_ghostscript() {
        let route = ToolRoute::resolve(Format::Ps, Format::Pdf).unwrap();
        assert_eq!(route.tool, ToolKind::Ghostscript);
        assert_eq!(route.kind, ConversionKind::Pdf);

        assert!(ToolRoute::resolve(Format::Pdf, Format::Pdf).is_ok());
        assert!(ToolRoute::resolve(Format::Pdf, Format::Png).is_ok());
        assert!(ToolRoute::resolve(Format::Pdf, Format::Eps).is_ok());
    }

    #[test]
    fn test_unsupported_pairs() {
        for (source, target) in [
            (Format::Docx, Format::Docx),
            (Format::Png, Format::Png),
            (Format::Png, Format::Docx),
            (Format::Pdf, Format::Docx),
            (Format::Pdf, Format::Gif),
            (Format::Docx, Format::Png),
            (Format::Eps, Format::Eps),
        ] {
            let err = ToolRoute::resolve(source, target).unwrap_err();
            assert!(
                matches!(err, ConverterError::UnsupportedConversion { .. }),
                "{} -> {} should be unsupported",
                source,
                target
            );
        }
    }

    #[test]
    fn test_supported_conversions_matches_resolve() {
        let routes = supported_conversions();
        assert!(!routes.is_empty());
        for route in &routes {
            assert_eq!(ToolRoute::resolve(route.source, route.target).unwrap(), *route);
        }
        // 6 documents x (5 other documents + pdf)
        let libreoffice = routes
            .iter()
            .filter(|r| r.tool == ToolKind::LibreOffice)
            .count();
        assert_eq!(libreoffice, 36);
    }

    #[test]
    fn test_libreoffice_args() {
        let route = ToolRoute::resolve(Format::Docx, Format::Txt).unwrap();
        let args = args_as_strings(&route.build_args(
            &ConverterConfig::default(),
            Path::new("/in/report.docx"),
            Path::new("/out/abc.txt"),
            Path::new("/out/.abc.scratch"),
        ));

        assert_eq!(args[0], "--headless");
        assert_eq!(
            args[1],
            "-env:UserInstallation=file:///out/.abc.scratch/profile"
        );
        assert!(args.contains(&"txt:Text".to_string()));
        assert!(args.contains(&"/out/.abc.scratch".to_string()));
        assert_eq!(args.last().unwrap(), "/in/report.docx");

        assert_eq!(
            route.produced_path(
                Path::new("/in/report.docx"),
                Path::new("/out/abc.txt"),
                Path::new("/out/.abc.scratch"),
            ),
            PathBuf::from("/out/.abc.scratch/report.txt")
        );
    }

    #[test]
    fn test_imagemagick_args_take_first_frame() {
        let route = ToolRoute::resolve(Format::Gif, Format::Png).unwrap();
        let args = args_as_strings(&route.build_args(
            &ConverterConfig::default(),
            Path::new("/in/anim.gif"),
            Path::new("/out/x.png"),
            Path::new("/scratch"),
        ));
        assert_eq!(args, vec!["/in/anim.gif[0]", "/out/x.png"]);

        let route = ToolRoute::resolve(Format::Tiff, Format::Pdf).unwrap();
        let args = args_as_strings(&route.build_args(
            &ConverterConfig::default(),
            Path::new("/in/scan.tiff"),
            Path::new("/out/x.pdf"),
            Path::new("/scratch"),
        ));
        assert_eq!(args, vec!["/in/scan.tiff", "/out/x.pdf"]);
    }

    #[test]
    fn test_ghostscript_args() {
        let route = ToolRoute::resolve(Format::Pdf, Format::Png).unwrap();
        let args = args_as_strings(&route.build_args(
            &ConverterConfig::default(),
            Path::new("/in/doc.pdf"),
            Path::new("/out/100%.png"),
            Path::new("/scratch"),
        ));
        assert!(args.contains(&"-sDEVICE=png16m".to_string()));
        assert!(args.contains(&"-r150".to_string()));
        assert!(args.contains(&"-dLastPage=1".to_string()));
        assert!(args.contains(&"-sOutputFile=/out/100%%.png".to_string()));
        assert_eq!(args.last().unwrap(), "/in/doc.pdf");

        let route = ToolRoute::resolve(Format::Eps, Format::Pdf).unwrap();
        let args = args_as_strings(&route.build_args(
            &ConverterConfig::default(),
            Path::new("/in/fig.eps"),
            Path::new("/out/fig.pdf"),
            Path::new("/scratch"),
        ));
        assert!(args.contains(&"-sDEVICE=pdfwrite".to_string()));
        assert!(args.contains(&"-sOutputFile=/out/fig.pdf".to_string()));
    }

    #[test]
    fn test_tesseract_args() {
        let route = ToolRoute::resolve(Format::Png, Format::Txt).unwrap();
        let config = ConverterConfig::default().with_ocr_language("deu");
        let args = args_as_strings(&route.build_args(
            &config,
            Path::new("/in/scan.png"),
            Path::new("/out/task.txt"),
            Path::new("/scratch"),
        ));
        assert_eq!(args, vec!["/in/scan.png", "/out/task", "-l", "deu"]);
        assert_eq!(
            route.produced_path(
                Path::new("/in/scan.png"),
                Path::new("/out/task.txt"),
                Path::new("/scratch")
            ),
            PathBuf::from("/out/task.txt")
        );
    }
}

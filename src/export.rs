//! PDF export and printing. The renderer and the print flow are external
//! tools; this module only prepares the page, checks its images and hands
//! it over.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use slug::slugify;
use tracing::{debug, warn};

static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]*\ssrc="([^"]*)""#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
}

impl Orientation {
    fn as_arg(self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub margin_mm: u32,
    pub filename: String,
    pub image_quality: f32,
    pub scale: u32,
    pub paper: &'static str,
    pub orientation: Orientation,
}

impl ExportOptions {
    pub fn for_number(number: &str) -> Self {
        Self {
            margin_mm: 8,
            filename: export_filename(number),
            image_quality: 0.98,
            scale: 2,
            paper: "A4",
            orientation: Orientation::Portrait,
        }
    }
}

/// `<number>.pdf`, or `invoice.pdf` when the number is blank.
pub fn export_filename(number: &str) -> String {
    let stem = slugify(number.trim());
    if stem.is_empty() {
        "invoice.pdf".to_string()
    } else {
        format!("{}.pdf", stem)
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct ImageReport {
    pub ready: usize,
    pub failed: Vec<String>,
}

/// Resolves every `<img src>` in the page (attribute entities decoded first):
/// data URLs must decode, anything else must exist relative to `base_dir`.
/// Failed images are reported, not fatal.
pub fn wait_images_loaded(html: &str, base_dir: &Path) -> ImageReport {
    let mut report = ImageReport::default();

    for cap in IMG_SRC.captures_iter(html) {
        let src = htmlize::unescape(&cap[1]);
        let src: &str = &src;
        let ok = match src.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(";base64,")
                .map(|(_, payload)| STANDARD.decode(payload).is_ok())
                .unwrap_or(false),
            None => base_dir.join(src).exists(),
        };
        if ok {
            report.ready += 1;
        } else {
            let shown: String = src.chars().take(48).collect();
            debug!(src = %shown, "image did not load");
            report.failed.push(shown);
        }
    }
    report
}

#[derive(Debug, PartialEq)]
pub enum ExportOutcome {
    Written(PathBuf),
    RendererMissing,
    Failed(String),
}

pub trait PdfExporter {
    fn export(&self, html: &str, options: &ExportOptions) -> ExportOutcome;
}

/// Shells out to an HTML-to-PDF tool (`wkhtmltopdf` compatible flags).
pub struct CommandExporter {
    program: String,
    output_dir: PathBuf,
}

impl CommandExporter {
    pub fn new(program: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
        }
    }

    fn available(&self) -> bool {
        Command::new(&self.program).arg("--version").output().is_ok()
    }
}

impl PdfExporter for CommandExporter {
    fn export(&self, html: &str, options: &ExportOptions) -> ExportOutcome {
        if !self.available() {
            return ExportOutcome::RendererMissing;
        }
        if let Err(e) = fs::create_dir_all(&self.output_dir) {
            return ExportOutcome::Failed(e.to_string());
        }

        let pdf_path = self.output_dir.join(&options.filename);
        let html_path = pdf_path.with_extension("html");
        if let Err(e) = fs::write(&html_path, html) {
            return ExportOutcome::Failed(e.to_string());
        }

        let margin = format!("{}mm", options.margin_mm);
        let quality = ((options.image_quality * 100.0).round() as u32).to_string();
        let status = Command::new(&self.program)
            .args(["--margin-top", &margin, "--margin-bottom", &margin])
            .args(["--margin-left", &margin, "--margin-right", &margin])
            .args(["--page-size", options.paper])
            .args(["--orientation", options.orientation.as_arg()])
            .args(["--image-quality", &quality])
            .args(["--dpi", &(96 * options.scale).to_string()])
            .arg("--enable-local-file-access")
            .arg(&html_path)
            .arg(&pdf_path)
            .status();

        match status {
            Ok(s) if s.success() => ExportOutcome::Written(pdf_path),
            Ok(s) => ExportOutcome::Failed(format!("{} exited with {}", self.program, s)),
            Err(e) => ExportOutcome::Failed(e.to_string()),
        }
    }
}

/// Waits for the page's images, then hands it to the exporter once.
pub fn export_pdf(
    html: &str,
    number: &str,
    base_dir: &Path,
    exporter: &dyn PdfExporter,
) -> ExportOutcome {
    let report = wait_images_loaded(html, base_dir);
    if !report.failed.is_empty() {
        warn!("{} image(s) failed to load, exporting anyway", report.failed.len());
    }
    exporter.export(html, &ExportOptions::for_number(number))
}

pub trait Printer {
    fn print(&self, page: &Path);
}

/// Opens the page with the system's default handler, where the user prints it.
pub struct SystemPrinter;

impl Printer for SystemPrinter {
    fn print(&self, page: &Path) {
        #[cfg(target_os = "macos")]
        Command::new("open").arg(page).spawn().ok();

        #[cfg(target_os = "windows")]
        Command::new("explorer").arg(page).spawn().ok();

        #[cfg(target_os = "linux")]
        Command::new("xdg-open").arg(page).spawn().ok();
    }
}

/// Writes the page for printing next to the exports.
pub fn write_print_page(html: &str, output_dir: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("print.html");
    fs::write(&path, html)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct Recorder {
        calls: RefCell<Vec<ExportOptions>>,
    }

    impl PdfExporter for Recorder {
        fn export(&self, _html: &str, options: &ExportOptions) -> ExportOutcome {
            self.calls.borrow_mut().push(options.clone());
            ExportOutcome::Written(PathBuf::from(&options.filename))
        }
    }

    #[test]
    fn filename_comes_from_number() {
        assert_eq!(export_filename("318"), "318.pdf");
        assert_eq!(export_filename("INV-20240517-4821"), "inv-20240517-4821.pdf");
        assert_eq!(export_filename("   "), "invoice.pdf");
    }

    #[test]
    fn images_are_checked_before_export() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.png"), b"x").unwrap();
        let html = r#"<img src="data:image/png;base64,cG5n" alt="a">
            <img alt="b" src="logo.png">
            <img src="missing.png">
            <img src="data:image/png;base64,@@@">"#;

        let report = wait_images_loaded(html, dir.path());
        assert_eq!(report.ready, 2);
        assert_eq!(report.failed, vec!["missing.png", "data:image/png;base64,@@@"]);
    }

    #[test]
    fn escaped_attribute_values_are_decoded() {
        let html = r#"<img src="data:image/png;base64,cG5n&#x2F;w==">"#;
        let report = wait_images_loaded(html, Path::new("."));
        assert_eq!(report.ready, 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn export_uses_fixed_options() {
        let recorder = Recorder {
            calls: RefCell::new(Vec::new()),
        };
        let outcome = export_pdf("<p>hi</p>", "", Path::new("."), &recorder);
        assert_eq!(outcome, ExportOutcome::Written(PathBuf::from("invoice.pdf")));

        let calls = recorder.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].margin_mm, 8);
        assert_eq!(calls[0].scale, 2);
        assert_eq!(calls[0].paper, "A4");
        assert_eq!(calls[0].orientation, Orientation::Portrait);
    }

    #[test]
    fn missing_renderer_is_reported() {
        let dir = TempDir::new().unwrap();
        let exporter = CommandExporter::new("definitely-not-a-pdf-tool-xyz", dir.path());
        let outcome = exporter.export("<p></p>", &ExportOptions::for_number("1"));
        assert_eq!(outcome, ExportOutcome::RendererMissing);
    }
}

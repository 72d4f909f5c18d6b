//! Console output for lms-mirror - labels, colors, spinners and the report table.
//!
//! # No-color detection (in priority order):
//! 1. `--no-color` CLI flag (highest priority)
//! 2. `NO_COLOR` environment variable (any value)
//! 3. `TERM=dumb` environment variable
//! 4. Non-TTY stdout (detected via anstream)

use anstream::{eprintln, println};
use anstyle::{AnsiColor, Color, Style};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::io::IsTerminal;
use std::time::Duration;

use crate::replace::{FileKind, ReplacementReport};

/// Color mode for output
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Always,
    #[default]
    Auto,
    Never,
}

impl std::str::FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "auto" => Ok(Self::Auto),
            "never" => Ok(Self::Never),
            _ => Err(format!("invalid color mode: {}", s)),
        }
    }
}

/// Where human-readable lines go
#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    /// Keeps stdout free for machine-readable output
    Stderr,
    #[cfg(test)]
    Buffer(std::sync::Arc<std::sync::Mutex<Vec<String>>>),
}

/// Resolved display settings
#[derive(Debug, Clone)]
pub struct Ui {
    pub color_enabled: bool,
    /// Spinners need both a TTY and color
    pub spinner_enabled: bool,
    sink: Sink,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new(ColorMode::Auto, false)
    }
}

impl Ui {
    pub fn new(mode: ColorMode, force_no_color: bool) -> Self {
        let color_enabled = Self::resolve_color(mode, force_no_color);
        let spinner_enabled = color_enabled && std::io::stdout().is_terminal();

        if !color_enabled {
            anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
        }

        Self {
            color_enabled,
            spinner_enabled,
            sink: Sink::Stdout,
        }
    }

    /// Send every human-readable line to stderr (used with `--json`)
    pub fn to_stderr(mut self) -> Self {
        self.sink = Sink::Stderr;
        self.spinner_enabled = self.color_enabled && std::io::stderr().is_terminal();
        self
    }

    /// Plain UI that records lines instead of printing them
    #[cfg(test)]
    pub fn buffered() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
        let lines = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let ui = Self {
            color_enabled: false,
            spinner_enabled: false,
            sink: Sink::Buffer(lines.clone()),
        };
        (ui, lines)
    }

    fn resolve_color(mode: ColorMode, force_no_color: bool) -> bool {
        if force_no_color || std::env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if std::env::var("TERM").is_ok_and(|t| t == "dumb") {
            return false;
        }

        match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }

    fn emit(&self, line: String) {
        match &self.sink {
            Sink::Stdout => println!("{}", line),
            Sink::Stderr => eprintln!("{}", line),
            #[cfg(test)]
            Sink::Buffer(lines) => lines.lock().unwrap().push(line),
        }
    }

    fn style(&self, color: AnsiColor) -> Style {
        if self.color_enabled {
            Style::new().fg_color(Some(Color::Ansi(color)))
        } else {
            Style::new()
        }
    }

    fn label(&self, color: AnsiColor) -> Style {
        if self.color_enabled {
            self.style(color).bold()
        } else {
            Style::new()
        }
    }

    /// Print OK label (green) with message
    pub fn ok(&self, msg: impl AsRef<str>) {
        let label = self.label(AnsiColor::Green);
        self.emit(format!("{label}OK{label:#} {}", msg.as_ref()));
    }

    /// Print WARN label (yellow) with message
    pub fn warn(&self, msg: impl AsRef<str>) {
        let label = self.label(AnsiColor::Yellow);
        self.emit(format!("{label}WARN{label:#} {}", msg.as_ref()));
    }

    /// Print ERROR label (red) with message to stderr
    pub fn err(&self, msg: impl AsRef<str>) {
        let label = self.label(AnsiColor::Red);
        let line = format!("{label}ERROR{label:#} {}", msg.as_ref());
        #[cfg(test)]
        if let Sink::Buffer(_) = self.sink {
            self.emit(line);
            return;
        }
        eprintln!("{}", line);
    }

    /// Print INFO label (cyan) with message
    pub fn info(&self, msg: impl AsRef<str>) {
        let label = self.label(AnsiColor::Cyan);
        self.emit(format!("{label}INFO{label:#} {}", msg.as_ref()));
    }

    pub fn dim(&self, s: impl AsRef<str>) -> String {
        let st = self.style(AnsiColor::BrightBlack);
        format!("{st}{}{st:#}", s.as_ref())
    }

    pub fn bold(&self, s: impl AsRef<str>) -> String {
        if self.color_enabled {
            let st = Style::new().bold();
            format!("{st}{}{st:#}", s.as_ref())
        } else {
            s.as_ref().to_string()
        }
    }

    pub fn println(&self, msg: impl AsRef<str>) {
        self.emit(msg.as_ref().to_string());
    }

    pub fn newline(&self) {
        self.emit(String::new());
    }

    pub fn section(&self, title: impl AsRef<str>) {
        let st = self.label(AnsiColor::Cyan);
        self.emit(format!("{st}{}{st:#}", title.as_ref()));
    }

    /// Opening lines shown once per run
    pub fn banner(&self, source: &str, mirror: &str) {
        self.section("===== LM Studio mirror switch =====");
        self.println(self.dim(format!("Rewrites {} to {}", source, mirror)));
        self.newline();
    }

    // -------------------------------------------------------------------------
    // Report table (comfy-table)
    // -------------------------------------------------------------------------

    /// One row per changed file with its match counts
    pub fn report_table(&self, report: &ReplacementReport) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        if self.color_enabled {
            table.load_preset(presets::UTF8_FULL_CONDENSED);
        } else {
            table.load_preset(presets::ASCII_MARKDOWN);
        }

        table.set_header(vec![
            self.header_cell("File"),
            self.header_cell("Kind"),
            self.header_cell("URL"),
            self.header_cell("Domain"),
            self.header_cell("Total"),
        ]);

        for file in &report.files {
            let kind = match file.kind {
                FileKind::Code => "code",
                FileKind::Other => "other",
            };
            table.add_row(vec![
                Cell::new(file.path.display().to_string()),
                Cell::new(kind),
                count_cell(file.url_replacements),
                count_cell(file.domain_replacements),
                count_cell(file.total()),
            ]);
        }

        table
    }

    fn header_cell(&self, content: &str) -> Cell {
        let cell = Cell::new(content);
        if self.color_enabled {
            cell.add_attribute(comfy_table::Attribute::Bold)
        } else {
            cell
        }
    }

    // -------------------------------------------------------------------------
    // Spinners (indicatif)
    // -------------------------------------------------------------------------

    /// Spinner for a long filesystem operation; hidden when disabled
    pub fn spinner(&self, message: impl Into<Cow<'static, str>>) -> ProgressBar {
        if !self.spinner_enabled {
            let pb = ProgressBar::hidden();
            pb.set_message(message);
            return pb;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    pub fn spinner_finish_ok(&self, pb: &ProgressBar, msg: impl Into<Cow<'static, str>>) {
        self.finish_spinner(pb, msg.into(), true);
    }

    pub fn spinner_finish_err(&self, pb: &ProgressBar, msg: impl Into<Cow<'static, str>>) {
        self.finish_spinner(pb, msg.into(), false);
    }

    fn finish_spinner(&self, pb: &ProgressBar, msg: Cow<'static, str>, ok: bool) {
        if !self.spinner_enabled {
            pb.finish_and_clear();
            if ok {
                self.ok(msg);
            } else {
                self.err(msg);
            }
            return;
        }

        if let Ok(style) = ProgressStyle::default_spinner().template("{msg}") {
            pb.set_style(style);
        }
        let (icon, color) = if ok {
            ("✓", AnsiColor::Green)
        } else {
            ("✗", AnsiColor::Red)
        };
        let st = self.style(color);
        pb.finish_with_message(format!("{st}{icon}{st:#} {}", msg));
    }
}

fn count_cell(n: usize) -> Cell {
    Cell::new(n).set_alignment(CellAlignment::Right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::FileResult;
    use serial_test::serial;
    use std::path::PathBuf;

    #[test]
    fn test_color_mode_parse() {
        assert_eq!("always".parse::<ColorMode>().unwrap(), ColorMode::Always);
        assert_eq!("AUTO".parse::<ColorMode>().unwrap(), ColorMode::Auto);
        assert_eq!("never".parse::<ColorMode>().unwrap(), ColorMode::Never);
        assert!("sometimes".parse::<ColorMode>().is_err());
    }

    #[test]
    fn test_force_no_color_wins() {
        let ui = Ui::new(ColorMode::Always, true);
        assert!(!ui.color_enabled);
        assert!(!ui.spinner_enabled);
    }

    #[test]
    #[serial]
    fn test_no_color_env() {
        // SAFETY: serialized with every other test touching the environment
        unsafe { std::env::set_var("NO_COLOR", "1") };
        let ui = Ui::new(ColorMode::Always, false);
        unsafe { std::env::remove_var("NO_COLOR") };
        assert!(!ui.color_enabled);
    }

    #[test]
    fn test_plain_styles_without_color() {
        let ui = Ui::new(ColorMode::Never, false);
        assert_eq!(ui.dim("path"), "path");
        assert_eq!(ui.bold("path"), "path");
    }

    #[test]
    fn test_report_table_rows() {
        let ui = Ui::new(ColorMode::Never, false);
        let report = ReplacementReport {
            code_files: 1,
            other_files: 1,
            files: vec![
                FileResult {
                    path: PathBuf::from("dist/main.js"),
                    kind: FileKind::Code,
                    url_replacements: 2,
                    domain_replacements: 1,
                },
                FileResult {
                    path: PathBuf::from("index.html"),
                    kind: FileKind::Other,
                    url_replacements: 1,
                    domain_replacements: 0,
                },
            ],
            skipped: Vec::new(),
        };

        let rendered = ui.report_table(&report).to_string();
        assert!(rendered.contains("dist/main.js"));
        assert!(rendered.contains("index.html"));
        assert!(rendered.contains("Domain"));
    }

    #[test]
    fn test_buffered_ui_records_plain_lines() {
        let (ui, lines) = Ui::buffered();
        ui.warn("careful");
        ui.err("broken");
        ui.newline();
        ui.section("Title");

        assert_eq!(*lines.lock().unwrap(), vec!["WARN careful", "ERROR broken", "", "Title"]);
    }

    #[test]
    fn test_stderr_sink_keeps_color_choice() {
        let ui = Ui::new(ColorMode::Never, false).to_stderr();
        assert!(matches!(ui.sink, Sink::Stderr));
        assert!(!ui.color_enabled);
        assert!(!ui.spinner_enabled);
    }

    #[test]
    fn test_hidden_spinner() {
        let ui = Ui::new(ColorMode::Never, false);
        let pb = ui.spinner("copying");
        assert!(pb.is_hidden());
        ui.spinner_finish_ok(&pb, "done");
    }
}

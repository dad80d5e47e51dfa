//! Terminal styling for `vcompare` output
//!
//! Colors carry meaning: added elements and finished jobs are green,
//! modified elements and running jobs yellow, deleted elements and failures
//! red. Whether ANSI codes are emitted is decided per stream by `owo-colors`
//! (`NO_COLOR`, `CLICOLOR_FORCE` and TTY detection).

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Style};
use std::fmt::{self, Display};
use std::sync::OnceLock;
use version_compare::types::{ComparisonJobStatus, Opcode};

pub use owo_colors::Stream;

const ACCENT: Style = Style::new().cyan();
const SUCCESS: Style = Style::new().green();
const ERROR: Style = Style::new().red();
const WARN: Style = Style::new().yellow();
const MUTED: Style = Style::new().dimmed();
const EMPHASIS: Style = Style::new().bold();

/// A value rendered with a palette style when its stream supports color
#[derive(Clone, Debug)]
pub struct Styled<T> {
    value: T,
    style: Style,
    stream: Stream,
}

impl<T> Styled<T> {
    const fn paint(value: T, style: Style, stream: Stream) -> Self {
        Self {
            value,
            style,
            stream,
        }
    }

    /// Detect color support on stdout instead of stderr
    #[must_use]
    pub const fn for_stdout(mut self) -> Self {
        self.stream = Stream::Stdout;
        self
    }
}

impl<T: Display> Display for Styled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = self.style;
        write!(
            f,
            "{}",
            self.value.if_supports_color(self.stream, |v| v.style(style))
        )
    }
}

/// Palette methods for anything printable
///
/// `error` and `warn` check stderr by default; call
/// [`Styled::for_stdout`] when printing them with `println!`.
pub trait Stylize: Display {
    /// Cyan: version names, job IDs, counts
    fn accent(&self) -> Styled<&Self> {
        Styled::paint(self, ACCENT, Stream::Stdout)
    }

    /// Green
    fn success(&self) -> Styled<&Self> {
        Styled::paint(self, SUCCESS, Stream::Stdout)
    }

    /// Red
    fn error(&self) -> Styled<&Self> {
        Styled::paint(self, ERROR, Stream::Stderr)
    }

    /// Yellow
    fn warn(&self) -> Styled<&Self> {
        Styled::paint(self, WARN, Stream::Stderr)
    }

    /// Dim: changeset IDs, dates, hints
    fn muted(&self) -> Styled<&Self> {
        Styled::paint(self, MUTED, Stream::Stdout)
    }

    /// Bold: section headers
    fn emphasis(&self) -> Styled<&Self> {
        Styled::paint(self, EMPHASIS, Stream::Stdout)
    }
}

impl<T: Display + ?Sized> Stylize for T {}

/// Green check mark
pub const fn check() -> Styled<&'static str> {
    Styled::paint("✓", SUCCESS, Stream::Stdout)
}

/// Red cross
pub const fn cross() -> Styled<&'static str> {
    Styled::paint("✗", ERROR, Stream::Stderr)
}

/// Cyan arrow in front of result rows
pub const fn arrow() -> Styled<&'static str> {
    Styled::paint("→", ACCENT, Stream::Stdout)
}

/// Dim bullet in front of list items
pub const fn bullet() -> Styled<&'static str> {
    Styled::paint("○", MUTED, Stream::Stdout)
}

/// `url` as an OSC 8 link where the terminal supports it, plain otherwise
pub fn hyperlink_url(stream: Stream, url: &str) -> String {
    let stream = match stream {
        Stream::Stdout => supports_hyperlinks::Stream::Stdout,
        Stream::Stderr => supports_hyperlinks::Stream::Stderr,
    };
    if supports_hyperlinks::on(stream) {
        terminal_link::Link::new(url, url).to_string()
    } else {
        url.to_string()
    }
}

/// Spinner shown while a comparison job runs
pub fn spinner_style() -> ProgressStyle {
    static STYLE: OnceLock<ProgressStyle> = OnceLock::new();
    STYLE
        .get_or_init(|| {
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        })
        .clone()
}

/// Opcode colored by kind of change
pub fn styled_opcode(opcode: Opcode) -> String {
    match opcode {
        Opcode::Insert => opcode.success().to_string(),
        Opcode::Update => opcode.warn().for_stdout().to_string(),
        Opcode::Delete => opcode.error().for_stdout().to_string(),
    }
}

/// Job status colored by state
pub fn styled_status(status: &ComparisonJobStatus) -> String {
    match status {
        ComparisonJobStatus::NotStarted => status.muted().to_string(),
        ComparisonJobStatus::Queued { .. } | ComparisonJobStatus::Started { .. } => {
            status.warn().for_stdout().to_string()
        }
        ComparisonJobStatus::Completed { .. } => status.success().to_string(),
        ComparisonJobStatus::Failed { .. } => status.error().for_stdout().to_string(),
    }
}

//! Coloured terminal logging.
//!
//! [`log`] writes one message to stdout, optionally prefixed by the local
//! date and wrapped in an ANSI colour or style from [`CC`]. This serves
//! human-facing console output; diagnostics go through `tracing`.

use chrono::Local;
use std::fmt::{self, Debug, Display};
use std::io::{self, Write};

/// ANSI escape codes for colours, backgrounds and text styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CC {
    End,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
    BackgroundBlack,
    BackgroundRed,
    BackgroundGreen,
    BackgroundYellow,
    BackgroundBlue,
    BackgroundMagenta,
    BackgroundCyan,
    BackgroundWhite,
    BackgroundBrightBlack,
    BackgroundBrightRed,
    BackgroundBrightGreen,
    BackgroundBrightYellow,
    BackgroundBrightBlue,
    BackgroundBrightMagenta,
    BackgroundBrightCyan,
    BackgroundBrightWhite,
    Bold,
    CrossedOut,
    Italic,
    Underline,
    SlowBlink,
    RapidBlink,
    Reversed,
    Framed,
    Encircled,
    OverLined,
}

impl CC {
    pub const fn code(self) -> &'static str {
        match self {
            CC::End => "\x1b[0m",
            CC::Black => "\x1b[30m",
            CC::Red => "\x1b[31m",
            CC::Green => "\x1b[32m",
            CC::Yellow => "\x1b[33m",
            CC::Blue => "\x1b[34m",
            CC::Magenta => "\x1b[35m",
            CC::Cyan => "\x1b[36m",
            CC::White => "\x1b[37m",
            CC::BrightBlack => "\x1b[90m",
            CC::BrightRed => "\x1b[91m",
            CC::BrightGreen => "\x1b[92m",
            CC::BrightYellow => "\x1b[93m",
            CC::BrightBlue => "\x1b[94m",
            CC::BrightMagenta => "\x1b[95m",
            CC::BrightCyan => "\x1b[96m",
            CC::BrightWhite => "\x1b[97m",
            CC::BackgroundBlack => "\x1b[40m",
            CC::BackgroundRed => "\x1b[41m",
            CC::BackgroundGreen => "\x1b[42m",
            CC::BackgroundYellow => "\x1b[43m",
            CC::BackgroundBlue => "\x1b[44m",
            CC::BackgroundMagenta => "\x1b[45m",
            CC::BackgroundCyan => "\x1b[46m",
            CC::BackgroundWhite => "\x1b[47m",
            CC::BackgroundBrightBlack => "\x1b[100m",
            CC::BackgroundBrightRed => "\x1b[101m",
            CC::BackgroundBrightGreen => "\x1b[102m",
            CC::BackgroundBrightYellow => "\x1b[103m",
            CC::BackgroundBrightBlue => "\x1b[104m",
            CC::BackgroundBrightMagenta => "\x1b[105m",
            CC::BackgroundBrightCyan => "\x1b[106m",
            CC::BackgroundBrightWhite => "\x1b[107m",
            CC::Bold => "\x1b[1m",
            CC::CrossedOut => "\x1b[9m",
            CC::Italic => "\x1b[3m",
            CC::Underline => "\x1b[4m",
            CC::SlowBlink => "\x1b[5m",
            CC::RapidBlink => "\x1b[6m",
            CC::Reversed => "\x1b[7m",
            CC::Framed => "\x1b[51m",
            CC::Encircled => "\x1b[52m",
            CC::OverLined => "\x1b[53m",
        }
    }
}

impl Display for CC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Order used by [`log_all_colors`].
const COLOR_DEMO: &[CC] = &[
    CC::Bold,
    CC::Underline,
    CC::Black,
    CC::Red,
    CC::Green,
    CC::Yellow,
    CC::Blue,
    CC::Magenta,
    CC::Cyan,
    CC::White,
    CC::BrightBlack,
    CC::BrightRed,
    CC::BrightGreen,
    CC::BrightYellow,
    CC::BrightBlue,
    CC::BrightMagenta,
    CC::BrightCyan,
    CC::BrightWhite,
    CC::BackgroundBlack,
    CC::BackgroundRed,
    CC::BackgroundGreen,
    CC::BackgroundYellow,
    CC::BackgroundBlue,
    CC::BackgroundMagenta,
    CC::BackgroundCyan,
    CC::BackgroundWhite,
    CC::BackgroundBrightBlack,
    CC::BackgroundBrightRed,
    CC::BackgroundBrightGreen,
    CC::BackgroundBrightYellow,
    CC::BackgroundBrightBlue,
    CC::BackgroundBrightMagenta,
    CC::BackgroundBrightCyan,
    CC::BackgroundBrightWhite,
    CC::Bold,
    CC::CrossedOut,
    CC::Italic,
    CC::Underline,
    CC::SlowBlink,
    CC::RapidBlink,
    CC::Reversed,
    CC::Framed,
    CC::Encircled,
    CC::OverLined,
];

const RULE: &str = "========================================================================";

/// Writes every colour and style, each rendered in itself.
pub fn write_all_colors<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Begin {RULE}")?;
    for cc in COLOR_DEMO {
        writeln!(out, "{cc}This is {cc:?}{}", CC::End)?;
    }
    writeln!(out, "End {RULE}")
}

/// Prints every colour and style to stdout.
pub fn log_all_colors() -> io::Result<()> {
    write_all_colors(&mut io::stdout().lock())
}

/// Formatting options for [`log`].
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Escape sequence written before the message: a [`CC`] code or any custom sequence.
    pub color: Option<String>,
    /// Surround the message with blank lines.
    pub give_space: bool,
    /// Omit the `[date] ` prefix.
    pub suppress_date: bool,
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn cc(self, cc: CC) -> Self {
        self.color(cc.code())
    }

    pub fn give_space(mut self, give_space: bool) -> Self {
        self.give_space = give_space;
        self
    }

    pub fn suppress_date(mut self, suppress_date: bool) -> Self {
        self.suppress_date = suppress_date;
        self
    }
}

/// The message body of a log line.
pub enum Message<'a> {
    Text(&'a dyn Display),
    Value(&'a dyn Debug),
}

/// Writes one log entry to `out`, stamped with `date`.
///
/// Text messages get the closing [`CC::End`] on the same line; values are
/// pretty-printed with `{:#?}`.
pub fn write_log<W: Write>(
    out: &mut W,
    message: Message<'_>,
    options: &LogOptions,
    date: &str,
) -> io::Result<()> {
    let color = options.color.as_deref().unwrap_or("");
    let end = if color.is_empty() { "" } else { CC::End.code() };

    write!(out, "{color}")?;
    if !options.suppress_date {
        write!(out, "[{date}] ")?;
    }
    if options.give_space {
        write!(out, "\n\n")?;
    }

    match message {
        Message::Text(text) => writeln!(out, "{text}{end}")?,
        Message::Value(value) => writeln!(out, "{value:#?}")?,
    }

    write!(out, "{end}")?;
    if options.give_space {
        writeln!(out)?;
    }
    out.flush()
}

/// Local date in the `M/D/YYYY, H:MM:SS AM` style used as the log prefix.
pub fn locale_date() -> String {
    Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Logs a text message to stdout.
pub fn log(message: impl Display, options: &LogOptions) -> io::Result<()> {
    write_log(
        &mut io::stdout().lock(),
        Message::Text(&message),
        options,
        &locale_date(),
    )
}

/// Logs any debuggable value to stdout.
pub fn log_value(value: &impl Debug, options: &LogOptions) -> io::Result<()> {
    write_log(
        &mut io::stdout().lock(),
        Message::Value(value),
        options,
        &locale_date(),
    )
}

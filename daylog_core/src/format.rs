//! Line formatting: positional substitution, value inspection and the
//! canonical line layout.
//!
//! Every line has the shape
//!
//! ```text
//! <tag> <timestamp> [<namespace>]: <body>
//! ```
//!
//! where the `[<namespace>]` segment is left out for the `default`
//! namespace. Timestamps are RFC 3339 in UTC with millisecond precision.

use crate::Level;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::fmt;

/// Namespace whose lines carry no `[namespace]` segment
pub const DEFAULT_NAMESPACE: &str = "default";

/// Extension of the per-day files
pub const LOG_EXTENSION: &str = "log";

/// A single formatted line, built once per `log` call
#[derive(Clone, Debug)]
pub struct LogLine<'a> {
    pub level: Level,
    pub timestamp: DateTime<Utc>,
    pub namespace: &'a str,
    pub body: String,
}

impl LogLine<'_> {
    /// Plain (uncolored) text, without trailing newline
    pub fn render(&self) -> String {
        let stamp = iso_timestamp(self.timestamp);
        if self.namespace == DEFAULT_NAMESPACE {
            format!("{} {}: {}", self.level.tag(), stamp, self.body)
        } else {
            format!(
                "{} {} [{}]: {}",
                self.level.tag(),
                stamp,
                self.namespace,
                self.body
            )
        }
    }

    /// Name of the file this line belongs in
    pub fn file_name(&self) -> String {
        log_file_name(self.timestamp.date_naive())
    }
}

/// `2026-10-19T08:15:30.123Z`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `2026-10-19.log`
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}.{}", date.format("%Y-%m-%d"), LOG_EXTENSION)
}

/// Escape line breaks so a body always occupies exactly one line
pub fn single_line(body: &str) -> String {
    if !body.contains(['\n', '\r']) {
        return body.to_string();
    }

    let mut out = String::with_capacity(body.len() + 8);
    for c in body.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Render any value through its `Debug` output, kept on a single line
pub fn inspect<T: fmt::Debug + ?Sized>(value: &T) -> String {
    format!("{:?}", value)
}

/// Adapter that lets non-string values be logged as content
///
/// ```
/// use daylog_core::format::Inspect;
///
/// let shown = Inspect(&vec![1, 2]).to_string();
/// assert_eq!(shown, "[1, 2]");
/// ```
pub struct Inspect<'a, T: fmt::Debug + ?Sized>(pub &'a T);

impl<T: fmt::Debug + ?Sized> fmt::Display for Inspect<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// printf-style positional substitution over string arguments
///
/// Supported directives: `%s`, `%d`, `%i`, `%f`, `%j`, `%o`, `%O` and `%%`.
/// Directives without a matching argument, and unknown directives, are
/// kept verbatim. Arguments left over are appended separated by spaces.
pub fn printf<S: AsRef<str>>(content: &str, args: &[S]) -> String {
    let mut out = String::with_capacity(content.len());
    let mut remaining = args.iter().map(|a| a.as_ref());
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let Some(&directive) = chars.peek() else {
            out.push('%');
            break;
        };

        if directive == '%' {
            chars.next();
            out.push('%');
            continue;
        }

        if !matches!(directive, 's' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O') {
            out.push('%');
            continue;
        }

        chars.next();
        match remaining.next() {
            Some(arg) => out.push_str(&substitute(directive, arg)),
            None => {
                out.push('%');
                out.push(directive);
            }
        }
    }

    for extra in remaining {
        out.push(' ');
        out.push_str(extra);
    }

    out
}

fn substitute(directive: char, arg: &str) -> String {
    match directive {
        's' => arg.to_string(),
        'd' => match arg.trim().parse::<f64>() {
            Ok(n) if n.is_finite() && n.fract() == 0.0 => format!("{}", n as i64),
            Ok(n) => n.to_string(),
            Err(_) => "NaN".to_string(),
        },
        'i' => match arg.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => format!("{}", n.trunc() as i64),
            _ => "NaN".to_string(),
        },
        'f' => match arg.trim().parse::<f64>() {
            Ok(n) => n.to_string(),
            Err(_) => "NaN".to_string(),
        },
        'j' => serde_json::Value::String(arg.to_string()).to_string(),
        _ => inspect(arg),
    }
}

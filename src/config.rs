//! Parser for the traffic configuration micro-language.
//!
//! A configuration file is a sequence of blocks. A block is a maximal run of lines starting with
//! a letter, each holding one `Parameter=value` pair. Any other line (blank, indented, comment)
//! separates blocks. Every block describes one traffic pattern.
//!
//! ```text
//! TrafficPercentage=60
//! Name=/example/A
//! MustBeFresh=yes
//!
//! TrafficPercentage=40
//! Name=/example/B
//! ```
//!
//! A value is a non-empty run of alphanumeric characters and `:/+._-%`, and must extend to the
//! end of the line: trailing characters outside that set make the whole line malformed. A block
//! containing a malformed line is dropped entirely; unknown parameters are only reported.

use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ValueError};

const ALLOWED_CHARACTERS: &str = ":/+._-%";

/// A pattern record that can be filled from configuration lines. `Display` must render the
/// canonical `Parameter=value, Parameter=value` form.
pub trait TrafficPattern: Default + Display {
    /// Apply one parameter. Returns `Ok(false)` when the parameter is unknown.
    fn set_parameter(&mut self, parameter: &str, value: &str) -> Result<bool, ValueError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// The line is not a well-formed `Parameter=value` pair, or its value cannot be converted.
    /// The enclosing block is dropped.
    MalformedLine { line: String, reason: String },
    /// The parameter is not known. The block is kept.
    UnknownParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub line_number: usize,
    pub kind: WarningKind,
}

impl ConfigWarning {
    pub fn is_malformed(&self) -> bool {
        matches!(self.kind, WarningKind::MalformedLine { .. })
    }
}

impl Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::MalformedLine { line, reason } => write!(
                f,
                "Line {} - Improper traffic configuration line ({reason}): {line}",
                self.line_number
            ),
            WarningKind::UnknownParameter(p) => {
                write!(f, "Line {} - Invalid parameter '{p}'", self.line_number)
            }
        }
    }
}

#[derive(Debug)]
pub struct ParsedConfiguration<T> {
    pub patterns: Vec<T>,
    pub warnings: Vec<ConfigWarning>,
}

impl<T> ParsedConfiguration<T> {
    pub fn malformed_count(&self) -> usize {
        self.warnings.iter().filter(|w| w.is_malformed()).count()
    }
}

/// Split a line into its parameter and value. Returns `None` if there is no `=`, if either side
/// is empty, or if the value contains a character outside the allowed set.
pub fn extract_parameter_and_value(line: &str) -> Option<(&str, &str)> {
    let (parameter, value) = line.split_once('=')?;
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ALLOWED_CHARACTERS.contains(c));
    if parameter.is_empty() || value.is_empty() || !valid {
        None
    } else {
        Some((parameter, value))
    }
}

/// Case-insensitive `yes/on/true/1` and `no/off/false/0`
pub fn parse_boolean(value: &str) -> Result<bool, ValueError> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "on" | "true" | "1" => Ok(true),
        "no" | "off" | "false" | "0" => Ok(false),
        _ => Err(ValueError::Boolean(value.to_string())),
    }
}

pub fn parse_integer(value: &str) -> Result<u64, ValueError> {
    value
        .parse()
        .map_err(|_| ValueError::Integer(value.to_string()))
}

pub fn parse_bounded(value: &str, max: u64) -> Result<u64, ValueError> {
    let v = parse_integer(value)?;
    if v > max {
        Err(ValueError::OutOfRange {
            value: value.to_string(),
            max,
        })
    } else {
        Ok(v)
    }
}

pub fn parse_percentage(value: &str) -> Result<u8, ValueError> {
    parse_bounded(value, 100).map(|v| v as u8)
}

pub fn parse_milliseconds(value: &str) -> Result<Duration, ValueError> {
    parse_integer(value).map(Duration::from_millis)
}

/// One line of the file. Bytes that are not UTF-8 are replaced and the line is marked invalid.
struct RawLine {
    number: usize,
    text: String,
    valid: bool,
}

impl RawLine {
    fn decode(number: usize, mut bytes: Vec<u8>) -> Self {
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        match String::from_utf8(bytes) {
            Ok(text) => RawLine {
                number,
                text,
                valid: true,
            },
            Err(e) => RawLine {
                number,
                text: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                valid: false,
            },
        }
    }

    fn starts_with_letter(&self) -> bool {
        self.text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
    }
}

/// Parse one block of lines into a pattern, or `None` if any line is malformed
fn parse_block<T: TrafficPattern>(
    block: &[RawLine],
    warnings: &mut Vec<ConfigWarning>,
) -> Option<T> {
    let mut pattern = T::default();
    for RawLine {
        number: line_number,
        text: line,
        valid,
    } in block
    {
        let result = match extract_parameter_and_value(line) {
            _ if !valid => Err("not valid UTF-8".to_string()),
            None => Err("expected Parameter=value".to_string()),
            Some((parameter, value)) => pattern
                .set_parameter(parameter, value)
                .map(|known| (parameter, known))
                .map_err(|e| e.to_string()),
        };
        match result {
            Ok((_, true)) => (),
            Ok((parameter, false)) => {
                let w = ConfigWarning {
                    line_number: *line_number,
                    kind: WarningKind::UnknownParameter(parameter.to_string()),
                };
                log::warn!("{w}");
                warnings.push(w);
            }
            Err(reason) => {
                let w = ConfigWarning {
                    line_number: *line_number,
                    kind: WarningKind::MalformedLine {
                        line: line.clone(),
                        reason,
                    },
                };
                log::warn!("{w}");
                warnings.push(w);
                return None;
            }
        }
    }
    Some(pattern)
}

/// Parse a configuration from any line source. Only I/O failures are errors: a line that is not
/// UTF-8 is malformed like any other bad line.
pub fn parse_configuration<T: TrafficPattern>(
    reader: impl BufRead,
) -> std::io::Result<ParsedConfiguration<T>> {
    let mut patterns: Vec<T> = vec![];
    let mut warnings = vec![];
    let mut block: Vec<RawLine> = vec![];

    for (index, bytes) in reader.split(b'\n').enumerate() {
        let line = RawLine::decode(index + 1, bytes?);
        if line.starts_with_letter() {
            block.push(line);
        } else if !block.is_empty() {
            patterns.extend(parse_block::<T>(&block, &mut warnings));
            block.clear();
        }
    }
    if !block.is_empty() {
        patterns.extend(parse_block::<T>(&block, &mut warnings));
    }

    Ok(ParsedConfiguration { patterns, warnings })
}

/// Read and parse a configuration file, then log every accepted pattern
pub fn read_configuration_file<T: TrafficPattern>(
    path: &Path,
) -> Result<ParsedConfiguration<T>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(ConfigError::NotAFile(path.to_path_buf()));
    }
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    log::info!("Reading traffic configuration file: {}", path.display());
    let file = File::open(path).map_err(io_error)?;
    let parsed = parse_configuration(BufReader::new(file)).map_err(io_error)?;

    log::info!("Traffic configuration file processing completed");
    for (pattern_id, pattern) in parsed.patterns.iter().enumerate() {
        log::info!("Traffic Pattern Type #{}: {pattern}", pattern_id + 1);
    }
    Ok(parsed)
}

/// Helper for `Display` implementations: joins the present fields with `, `
#[derive(Default)]
pub(crate) struct FieldList(Vec<String>);

impl FieldList {
    pub(crate) fn push(&mut self, key: &str, value: impl Display) {
        self.0.push(format!("{key}={value}"));
    }

    pub(crate) fn push_opt<V: Display>(&mut self, key: &str, value: Option<V>) {
        if let Some(v) = value {
            self.push(key, v);
        }
    }
}

impl Display for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

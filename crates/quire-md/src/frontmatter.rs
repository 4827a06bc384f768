//! Front matter extraction.
//!
//! Two block shapes are accepted at the top of a source file:
//!
//! ```text
//! Title: Hello                 ---
//! Date: 2024-01-01             Title: Hello
//!                              Date: 2024-01-01
//! # Body starts here           ---
//!                              # Body starts here
//! ```
//!
//! The plain form ends at the first blank line (or a `---` line), the
//! delimited form is a YAML mapping closed by `---`. Either way the reader is
//! left positioned at the first body line.

use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const DELIMITER: &str = "---";

static PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_][A-Za-z0-9_.-]*)\s*:\s*(.*)$").expect("static pattern")
});

/// Page metadata: unique keys mapped to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert a value, replacing any previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Errors that can occur when reading front matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    #[error("No front matter block at start of file")]
    Absent,

    #[error("Malformed front matter at line {line}: {content:?}")]
    Malformed { line: usize, content: String },

    #[error("Unclosed front matter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in front matter: {0}")]
    InvalidYaml(String),

    #[error("Front matter key {0:?} must have a scalar value")]
    InvalidValue(String),

    #[error("Failed to read front matter: {0}")]
    Io(#[from] io::Error),
}

/// Read the leading metadata block from `reader`.
///
/// On success the reader is positioned at the first line of the body.
pub fn read_front_matter<R: BufRead>(reader: &mut R) -> Result<Metadata, FrontMatterError> {
    let Some(first) = next_line(reader)? else {
        return Err(FrontMatterError::Absent);
    };

    if first.trim_end() == DELIMITER {
        return read_yaml_block(reader);
    }

    let mut meta = Metadata::new();
    let Some((key, value)) = parse_pair(&first) else {
        return Err(FrontMatterError::Absent);
    };
    meta.insert(key, value);

    let mut line_no = 1;
    while let Some(line) = next_line(reader)? {
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed == DELIMITER {
            break;
        }
        match parse_pair(&line) {
            Some((key, value)) => meta.insert(key, value),
            None => {
                return Err(FrontMatterError::Malformed {
                    line: line_no,
                    content: line,
                })
            }
        }
    }

    Ok(meta)
}

/// Read everything left in `reader` as the raw page body.
///
/// Bytes are kept as they are, only line endings are normalized to a single
/// `\n` per line.
pub fn read_body<R: BufRead>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(line) = next_raw_line(reader)? {
        body.extend_from_slice(&line);
        body.push(b'\n');
    }
    Ok(body)
}

fn read_yaml_block<R: BufRead>(reader: &mut R) -> Result<Metadata, FrontMatterError> {
    let mut yaml = String::new();
    loop {
        let Some(line) = next_line(reader)? else {
            return Err(FrontMatterError::Unclosed);
        };
        if line.trim_end() == DELIMITER {
            break;
        }
        yaml.push_str(&line);
        yaml.push('\n');
    }

    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }

    let value: serde_yaml::Value =
        serde_yaml::from_str(&yaml).map_err(|e| FrontMatterError::InvalidYaml(e.to_string()))?;

    let mapping = match value {
        serde_yaml::Value::Null => return Ok(Metadata::new()),
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => {
            return Err(FrontMatterError::InvalidYaml(
                "expected a mapping of keys to values".to_string(),
            ))
        }
    };

    let mut meta = Metadata::new();
    for (key, value) in mapping {
        let key = scalar_to_string(&key)
            .ok_or_else(|| FrontMatterError::InvalidYaml(format!("non-scalar key {key:?}")))?;
        let value = scalar_to_string(&value)
            .ok_or_else(|| FrontMatterError::InvalidValue(key.clone()))?;
        meta.insert(key, value);
    }
    Ok(meta)
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;

    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn parse_pair(line: &str) -> Option<(String, String)> {
    let caps = PAIR.captures(line.trim())?;
    Some((caps[1].to_string(), caps[2].trim().to_string()))
}

/// Next metadata line, decoded lossily.
fn next_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    Ok(next_raw_line(reader)?.map(|line| String::from_utf8_lossy(&line).into_owned()))
}

/// Next line without its terminator, or `None` at end of input.
fn next_raw_line<R: BufRead>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    if line.ends_with(b"\n") {
        line.pop();
        if line.ends_with(b"\r") {
            line.pop();
        }
    }
    Ok(Some(line))
}

// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Issue record layout.
//!
//! An issue is stored as a single plain text __record__ made up of an ordered
//! list of uniquely keyed fields. A field is either short or long-text.
//!
//! # Record Grammar
//!
//! Short fields fit on a single line:
//!
//! ```text
//! status: open
//! ```
//!
//! Long-text fields place their key on its own line, followed by a block of
//! indented lines. Indentation is one tab, or up to four spaces:
//!
//! ```text
//! description:
//!     Crashes on startup.
//!
//!     Happens on every machine we tried.
//! ```
//!
//! Blank lines between fields are ignored, and lines starting with "#" are
//! comments. A key must be non-empty, and cannot contain whitespace or ":".
//!
//! A long-text field with an empty body cannot be told apart from an empty
//! short field, so it reads back as a short field. Assigning a value that
//! spans multiple lines to a short field turns it into a long-text field.
//!
//! Whitespace is not significant at the end of a line, nor around a short
//! value, and trailing blank lines of a long-text body are dropped. Values
//! assigned through [`Record::set`] are normalized accordingly, so what gets
//! stored is exactly what reads back.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Value of a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Single line value.
    Short(String),

    /// Multi-line block of text.
    Long(String),
}

impl FieldValue {
    /// Treat value as string slice regardless of its kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Short(value) | Self::Long(value) => value.as_str(),
        }
    }

    /// Check if value is long-text.
    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long(_))
    }
}

/// Single keyed entry of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    key: String,
    value: FieldValue,
}

impl Field {
    /// Construct new short field.
    pub fn short(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Short(value.into()),
        }
    }

    /// Construct new long-text field.
    pub fn long(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Long(value.into()),
        }
    }

    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

/// Ordered set of uniquely keyed fields.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// Construct new empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every new issue starts out with.
    ///
    /// Contains "summary", "type", "status", "assigned", and a long-text
    /// "description", all of them empty.
    pub fn default_issue() -> Self {
        Self {
            fields: vec![
                Field::short("summary", ""),
                Field::short("type", ""),
                Field::short("status", ""),
                Field::short("assigned", ""),
                Field::long("description", ""),
            ],
        }
    }

    /// Append field to end of record.
    ///
    /// # Errors
    ///
    /// - Return [`RecordError::InvalidKey`] if key is malformed.
    /// - Return [`RecordError::DuplicateKey`] if key is already taken.
    pub fn push(&mut self, field: Field) -> Result<()> {
        if !is_valid_key(field.key()) {
            return Err(RecordError::InvalidKey(field.key));
        }

        if self.contains_key(field.key()) {
            return Err(RecordError::DuplicateKey(field.key));
        }

        self.fields.push(field);
        Ok(())
    }

    /// Look up value of field by key.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.field(key).map(|field| field.value.as_str())
    }

    /// Look up field by key.
    pub fn field(&self, key: impl AsRef<str>) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.key == key.as_ref())
    }

    /// Check if record has field with given key.
    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        self.field(key).is_some()
    }

    /// Replace value of existing field.
    ///
    /// Keeps the kind of the field, except that a short field receiving a
    /// multi-line value becomes long-text. The value is normalized the same
    /// way the record grammar reads it back, see [`normalize`].
    ///
    /// # Errors
    ///
    /// - Return [`RecordError::NoSuchField`] if no field has the given key.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Result<()> {
        let key = key.as_ref();
        let field = self
            .fields
            .iter_mut()
            .find(|field| field.key == key)
            .ok_or_else(|| RecordError::NoSuchField(key.to_string()))?;

        let value = normalize(&value.into());
        field.value = if field.value.is_long() || value.contains('\n') {
            FieldValue::Long(value)
        } else {
            FieldValue::Short(value)
        };

        Ok(())
    }

    /// Iterate through fields in order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromStr for Record {
    type Err = RecordError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut record = Record::new();
        let mut lines = text.lines().enumerate().peekable();

        while let Some((index, line)) = lines.next() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            if strip_indent(line).is_some() {
                return Err(RecordError::Malformed {
                    line: index + 1,
                    reason: "indented line outside of long-text field".into(),
                });
            }

            let (key, rest) = line.split_once(':').ok_or_else(|| RecordError::Malformed {
                line: index + 1,
                reason: "expected \"key: value\"".into(),
            })?;
            let key = key.trim_end();
            let rest = rest.trim();

            if !rest.is_empty() {
                record.push(Field::short(key, rest))?;
                continue;
            }

            // INVARIANT: Blank lines only belong to a body if more indented lines follow.
            let mut body = Vec::new();
            let mut blanks = 0;
            while let Some(&(_, next)) = lines.peek() {
                if next.trim().is_empty() {
                    blanks += 1;
                    lines.next();
                    continue;
                }

                match strip_indent(next) {
                    Some(content) => {
                        body.extend(std::iter::repeat_n("", blanks));
                        blanks = 0;
                        body.push(content);
                        lines.next();
                    }
                    None => break,
                }
            }

            if body.is_empty() {
                record.push(Field::short(key, ""))?;
            } else {
                record.push(Field::long(key, body.join("\n")))?;
            }
        }

        Ok(record)
    }
}

impl Display for Record {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for field in &self.fields {
            match &field.value {
                FieldValue::Short(value) if value.is_empty() => writeln!(fmt, "{}:", field.key)?,
                FieldValue::Short(value) => writeln!(fmt, "{}: {value}", field.key)?,
                FieldValue::Long(value) => {
                    writeln!(fmt, "{}:", field.key)?;
                    for line in value.lines() {
                        if line.is_empty() {
                            writeln!(fmt)?;
                        } else {
                            writeln!(fmt, "\t{line}")?;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Look up value of field directly from serialized record text.
///
/// # Errors
///
/// - Return [`RecordError`] if text is not a valid record.
pub fn read_field(text: impl AsRef<str>, key: impl AsRef<str>) -> Result<Option<String>> {
    let record: Record = text.as_ref().parse()?;
    Ok(record.get(key).map(ToString::to_string))
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(':') && !key.contains(char::is_whitespace)
}

/// Shape value the way it survives a write and read of the record.
///
/// Trailing whitespace of each line and trailing blank lines are dropped.
/// Single line values also lose leading whitespace.
pub fn normalize(value: &str) -> String {
    let mut lines = value.lines().map(str::trim_end).collect::<Vec<_>>();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    match lines.as_slice() {
        [line] => line.trim_start().to_string(),
        _ => lines.join("\n"),
    }
}

fn strip_indent(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix('\t') {
        return Some(rest);
    }

    let spaces = line.bytes().take(4).take_while(|byte| *byte == b' ').count();
    (spaces > 0).then(|| &line[spaces..])
}

/// Record error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Text does not follow record grammar.
    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Key cannot be used for a field.
    #[error("invalid field key {0:?}")]
    InvalidKey(String),

    /// Key appears more than once.
    #[error("duplicate field {0:?}")]
    DuplicateKey(String),

    /// No field has the requested key.
    #[error("no field named {0:?}")]
    NoSuchField(String),
}

/// Friendly result alias :3
type Result<T, E = RecordError> = std::result::Result<T, E>;

//! Layouts turn a log event into the value stored under one field.
//!
//! Any `Fn(&LogEvent) -> FieldValue` closure is a layout. [`StandardLayout`]
//! covers the layouts that can be named in a configuration file:
//!
//! | name              | value                                   |
//! |-------------------|-----------------------------------------|
//! | `timestamp`       | event time (BSON date)                  |
//! | `level`           | `INFO`, `WARN`, ...                     |
//! | `message`         | rendered message                        |
//! | `logger`          | logger / target name                    |
//! | `thread`          | thread name or id                       |
//! | `exception`       | exception sub-document or null          |
//! | `properties`      | all event properties as a sub-document  |
//! | `location`        | file, line and module                   |
//! | `hostname`        | host name                               |
//! | `process`         | process name                            |
//! | `user`            | user name                               |
//! | `property:<key>`  | a single property                       |
//! | `literal:<text>`  | fixed text                              |
//! | `pattern:<text>`  | text with `%token` substitution         |

use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::event::{LogEvent, ProcessContext};
use crate::document::value::FieldValue;

/// Formats one value out of a log event.
pub trait Layout: Send + Sync {
    fn format(&self, event: &LogEvent) -> FieldValue;

    /// Format with the appender's host and process facts at hand.
    fn format_with(&self, event: &LogEvent, _context: &ProcessContext) -> FieldValue {
        self.format(event)
    }
}

impl<F> Layout for F
where
    F: Fn(&LogEvent) -> FieldValue + Send + Sync,
{
    fn format(&self, event: &LogEvent) -> FieldValue {
        self(event)
    }
}

/// A layout name that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("unknown layout {0:?}")]
    UnknownLayout(String),

    #[error("unknown pattern token %{0}")]
    UnknownToken(String),

    #[error("unterminated property key in pattern {0:?}")]
    UnterminatedProperty(String),

    #[error("property layout needs a key")]
    EmptyPropertyKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Timestamp,
    Level,
    Logger,
    Thread,
    Message,
    Exception,
    Newline,
    Property(String),
}

/// Text with `%token` substitutions.
///
/// Tokens: `%timestamp`, `%level`, `%logger`, `%thread`, `%message`,
/// `%exception`, `%newline`, `%property{key}` and `%%` for a literal percent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternLayout {
    source: String,
    segments: Vec<Segment>,
}

impl PatternLayout {
    pub fn parse(source: &str) -> Result<Self, LayoutError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                text.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                text.push('%');
                continue;
            }

            let mut token = String::new();
            while let Some(&next) = chars.peek() {
                if !next.is_ascii_alphabetic() {
                    break;
                }
                token.push(next);
                chars.next();
            }

            let segment = match token.as_str() {
                "timestamp" | "date" => Segment::Timestamp,
                "level" => Segment::Level,
                "logger" => Segment::Logger,
                "thread" => Segment::Thread,
                "message" => Segment::Message,
                "exception" => Segment::Exception,
                "newline" => Segment::Newline,
                "property" => {
                    if chars.peek() != Some(&'{') {
                        return Err(LayoutError::UnterminatedProperty(source.to_string()));
                    }
                    chars.next();
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(k) => key.push(k),
                            None => {
                                return Err(LayoutError::UnterminatedProperty(source.to_string()))
                            }
                        }
                    }
                    Segment::Property(key)
                }
                _ => return Err(LayoutError::UnknownToken(token)),
            };

            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(segment);
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn render(&self, event: &LogEvent) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Timestamp => {
                    out.push_str(&event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
                }
                Segment::Level => out.push_str(event.level.as_str()),
                Segment::Logger => out.push_str(&event.logger_name),
                Segment::Thread => out.push_str(&event.thread),
                Segment::Message => out.push_str(&event.message),
                Segment::Exception => {
                    if let Some(exception) = &event.exception {
                        out.push_str(&exception.message);
                    }
                }
                Segment::Newline => out.push('\n'),
                Segment::Property(key) => {
                    if let Some(value) = event.properties.get(key) {
                        out.push_str(&value.render());
                    }
                }
            }
        }
        out
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Layouts that can be named in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StandardLayout {
    Timestamp,
    Level,
    Message,
    Logger,
    Thread,
    Exception,
    Properties,
    Location,
    Hostname,
    Process,
    User,
    Property(String),
    Literal(String),
    Pattern(PatternLayout),
}

impl Layout for StandardLayout {
    fn format(&self, event: &LogEvent) -> FieldValue {
        self.format_with(event, ProcessContext::current())
    }

    fn format_with(&self, event: &LogEvent, context: &ProcessContext) -> FieldValue {
        match self {
            StandardLayout::Timestamp => FieldValue::Timestamp(event.timestamp),
            StandardLayout::Level => FieldValue::from(event.level.as_str()),
            StandardLayout::Message => FieldValue::from(event.message.as_str()),
            StandardLayout::Logger => FieldValue::from(event.logger_name.as_str()),
            StandardLayout::Thread => FieldValue::from(event.thread.as_str()),
            StandardLayout::Exception => event
                .exception
                .as_ref()
                .map_or(FieldValue::Null, |e| e.to_value()),
            StandardLayout::Properties => event.properties_value(),
            StandardLayout::Location => event
                .location
                .as_ref()
                .map_or(FieldValue::Null, |l| l.to_value()),
            StandardLayout::Hostname => FieldValue::from(context.machine_name.as_str()),
            StandardLayout::Process => FieldValue::from(context.domain.as_str()),
            StandardLayout::User => FieldValue::from(
                event
                    .user_name
                    .clone()
                    .or_else(|| context.user_name.clone()),
            ),
            StandardLayout::Property(key) => {
                event.properties.get(key).cloned().unwrap_or(FieldValue::Null)
            }
            StandardLayout::Literal(text) => FieldValue::from(text.as_str()),
            StandardLayout::Pattern(pattern) => FieldValue::Text(pattern.render(event)),
        }
    }
}

impl FromStr for StandardLayout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(key) = s.strip_prefix("property:") {
            if key.is_empty() {
                return Err(LayoutError::EmptyPropertyKey);
            }
            return Ok(StandardLayout::Property(key.to_string()));
        }
        if let Some(text) = s.strip_prefix("literal:") {
            return Ok(StandardLayout::Literal(text.to_string()));
        }
        if let Some(pattern) = s.strip_prefix("pattern:") {
            return PatternLayout::parse(pattern).map(StandardLayout::Pattern);
        }

        match s {
            "timestamp" => Ok(StandardLayout::Timestamp),
            "level" => Ok(StandardLayout::Level),
            "message" => Ok(StandardLayout::Message),
            "logger" => Ok(StandardLayout::Logger),
            "thread" => Ok(StandardLayout::Thread),
            "exception" => Ok(StandardLayout::Exception),
            "properties" => Ok(StandardLayout::Properties),
            "location" => Ok(StandardLayout::Location),
            "hostname" => Ok(StandardLayout::Hostname),
            "process" => Ok(StandardLayout::Process),
            "user" => Ok(StandardLayout::User),
            other => Err(LayoutError::UnknownLayout(other.to_string())),
        }
    }
}

impl TryFrom<String> for StandardLayout {
    type Error = LayoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for StandardLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandardLayout::Timestamp => write!(f, "timestamp"),
            StandardLayout::Level => write!(f, "level"),
            StandardLayout::Message => write!(f, "message"),
            StandardLayout::Logger => write!(f, "logger"),
            StandardLayout::Thread => write!(f, "thread"),
            StandardLayout::Exception => write!(f, "exception"),
            StandardLayout::Properties => write!(f, "properties"),
            StandardLayout::Location => write!(f, "location"),
            StandardLayout::Hostname => write!(f, "hostname"),
            StandardLayout::Process => write!(f, "process"),
            StandardLayout::User => write!(f, "user"),
            StandardLayout::Property(key) => write!(f, "property:{key}"),
            StandardLayout::Literal(text) => write!(f, "literal:{text}"),
            StandardLayout::Pattern(pattern) => write!(f, "pattern:{}", pattern.source()),
        }
    }
}

impl From<StandardLayout> for String {
    fn from(layout: StandardLayout) -> Self {
        layout.to_string()
    }
}

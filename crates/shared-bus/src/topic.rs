//! # Topics and Patterns
//!
//! Topics are dot-separated segment strings, most general first
//! (`txReceipts.DAO.new`). Patterns select topics hierarchically:
//!
//! | Pattern | Matches |
//! |---------|---------|
//! | `txReceipts.DAO` | `txReceipts.DAO` only |
//! | `txReceipts.DAO.*` | every descendant of `txReceipts.DAO` |
//! | `*` | every topic |
//!
//! Displaying a pattern yields the string it parses from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Segment separator.
pub const SEPARATOR: char = '.';

/// Wildcard segment.
pub const WILDCARD: &str = "*";

/// Errors from topic and pattern parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// The topic string was empty.
    #[error("topic is empty")]
    Empty,

    /// A segment between separators was empty.
    #[error("topic {topic:?} has an empty segment at position {position}")]
    EmptySegment { topic: String, position: usize },

    /// A segment contained a character outside `[A-Za-z0-9_-]`.
    #[error("topic {topic:?} has invalid character {character:?} in segment {segment:?}")]
    InvalidCharacter {
        topic: String,
        segment: String,
        character: char,
    },

    /// A wildcard appeared somewhere other than the final segment of a pattern.
    #[error("pattern {pattern:?} may only use '*' as its final segment")]
    MisplacedWildcard { pattern: String },
}

fn validate_segment(topic: &str, segment: &str, position: usize) -> Result<(), TopicError> {
    if segment.is_empty() {
        return Err(TopicError::EmptySegment {
            topic: topic.to_string(),
            position,
        });
    }
    if let Some(character) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(TopicError::InvalidCharacter {
            topic: topic.to_string(),
            segment: segment.to_string(),
            character,
        });
    }
    Ok(())
}

// =============================================================================
// TOPIC
// =============================================================================

/// A validated, hierarchical topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Parse and validate a topic string.
    ///
    /// # Errors
    ///
    /// Returns `TopicError` if the string is empty, has an empty segment,
    /// or contains characters outside `[A-Za-z0-9_-]` (wildcards included).
    pub fn parse(topic: &str) -> Result<Self, TopicError> {
        if topic.is_empty() {
            return Err(TopicError::Empty);
        }
        for (position, segment) in topic.split(SEPARATOR).enumerate() {
            validate_segment(topic, segment, position)?;
        }
        Ok(Self(topic.to_string()))
    }

    /// Root topic for transaction lifecycle notifications.
    #[must_use]
    pub fn tx_receipts() -> Self {
        Self(crate::TX_RECEIPTS_ROOT.to_string())
    }

    /// Append one or more segments (`"registerScheme"` or `"Scheme.register"`).
    ///
    /// # Errors
    ///
    /// Returns `TopicError` if `suffix` is not itself a valid topic.
    pub fn child(&self, suffix: &str) -> Result<Self, TopicError> {
        let suffix = Self::parse(suffix)?;
        Ok(Self(format!("{}{SEPARATOR}{}", self.0, suffix.0)))
    }

    /// The parent topic, `None` for a root segment.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// The first segment (the broad category, e.g. `txReceipts`).
    #[must_use]
    pub fn root(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }

    /// Iterate over the segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// True if `self` lies strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Topic) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0[ancestor.0.len()..].starts_with(SEPARATOR)
    }

    /// The raw topic string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

// =============================================================================
// PATTERN
// =============================================================================

/// Subscription pattern over topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicPattern {
    /// Every topic.
    All,
    /// Strict descendants only.
    Descendants(Topic),
    /// The topic alone.
    Exact(Topic),
}

impl TopicPattern {
    /// Parse a pattern string (see module docs for the syntax).
    ///
    /// # Errors
    ///
    /// Returns `TopicError` for malformed segments or a wildcard that is not
    /// the final segment.
    pub fn parse(pattern: &str) -> Result<Self, TopicError> {
        if pattern == WILDCARD {
            return Ok(Self::All);
        }
        if let Some(prefix) = pattern.strip_suffix(".*") {
            return Self::parse_topic(pattern, prefix).map(Self::Descendants);
        }
        Self::parse_topic(pattern, pattern).map(Self::Exact)
    }

    fn parse_topic(pattern: &str, topic: &str) -> Result<Topic, TopicError> {
        if topic.split(SEPARATOR).any(|segment| segment == WILDCARD) {
            return Err(TopicError::MisplacedWildcard {
                pattern: pattern.to_string(),
            });
        }
        Topic::parse(topic)
    }

    /// Pattern matching exactly `topic`.
    #[must_use]
    pub fn exact(topic: &Topic) -> Self {
        Self::Exact(topic.clone())
    }

    /// Check if `topic` is selected by this pattern.
    #[must_use]
    pub fn matches(&self, topic: &Topic) -> bool {
        match self {
            Self::All => true,
            Self::Descendants(base) => topic.is_descendant_of(base),
            Self::Exact(base) => topic == base,
        }
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(WILDCARD),
            Self::Descendants(topic) => write!(f, "{topic}.*"),
            Self::Exact(topic) => write!(f, "{topic}"),
        }
    }
}

impl FromStr for TopicPattern {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Topic> for TopicPattern {
    fn from(topic: Topic) -> Self {
        Self::Exact(topic)
    }
}

impl From<&Topic> for TopicPattern {
    fn from(topic: &Topic) -> Self {
        Self::Exact(topic.clone())
    }
}

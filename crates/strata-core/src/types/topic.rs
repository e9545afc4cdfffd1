//! Topic, depth and dataset split identifiers

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Nesting level of a table relative to the root entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Depth {
    /// Flat table, one row per entity with no group index
    Flat = 0,
    /// One row per entity and group index 1
    Entity = 1,
    /// One row per entity, group index 1 and group index 2
    Nested = 2,
}

impl Depth {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Name of the group index column introduced at this depth, if any.
    pub fn group_index_column(&self) -> Option<String> {
        match self {
            Depth::Flat => None,
            depth => Some(format!("num_group{}", depth.as_u8())),
        }
    }
}

impl TryFrom<u8> for Depth {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Depth::Flat),
            1 => Ok(Depth::Entity),
            2 => Ok(Depth::Nested),
            other => Err(CoreError::InvalidDepth(other.to_string())),
        }
    }
}

impl From<Depth> for u8 {
    fn from(depth: Depth) -> Self {
        depth.as_u8()
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Dataset split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    /// Only the training split carries the target column.
    pub fn has_target(&self) -> bool {
        matches!(self, Split::Train)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            other => Err(CoreError::InvalidSplit(other.to_string())),
        }
    }
}

/// One logical source table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TopicRecord")]
pub struct Topic {
    name: String,
    depth: Depth,
}

#[derive(Deserialize)]
struct TopicRecord {
    name: String,
    depth: Depth,
}

impl TryFrom<TopicRecord> for Topic {
    type Error = CoreError;

    fn try_from(record: TopicRecord) -> Result<Self> {
        Topic::new(record.name, record.depth)
    }
}

impl Topic {
    /// Create a topic, checking that the name is a plain identifier.
    pub fn new(name: impl Into<String>, depth: Depth) -> Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(CoreError::InvalidTopic(name));
        }
        Ok(Self { name, depth })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.depth)
    }
}

/// The closed set of topics a dataset is made of, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicSet {
    topics: Vec<Topic>,
}

impl TopicSet {
    pub fn new(topics: Vec<Topic>) -> Self {
        Self { topics }
    }

    /// Topic set of the Home Credit default-risk dataset.
    pub fn home_credit() -> Self {
        const TOPICS: &[(&str, Depth)] = &[
            ("applprev", Depth::Entity),
            ("applprev", Depth::Nested),
            ("credit_bureau_a", Depth::Entity),
            ("credit_bureau_a", Depth::Nested),
            ("credit_bureau_b", Depth::Entity),
            ("credit_bureau_b", Depth::Nested),
            ("person", Depth::Entity),
            ("person", Depth::Nested),
            ("debitcard", Depth::Entity),
            ("deposit", Depth::Entity),
            ("other", Depth::Entity),
            ("tax_registry_a", Depth::Entity),
            ("tax_registry_b", Depth::Entity),
            ("tax_registry_c", Depth::Entity),
            ("static", Depth::Flat),
            ("static_cb", Depth::Flat),
        ];

        Self {
            topics: TOPICS
                .iter()
                .map(|(name, depth)| Topic {
                    name: (*name).to_string(),
                    depth: *depth,
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.topics.iter().any(|t| t.name == name)
    }

    /// Look up a topic by name and depth, rejecting names outside the set.
    pub fn resolve(&self, name: &str, depth: Depth) -> Result<&Topic> {
        self.topics
            .iter()
            .find(|t| t.name == name && t.depth == depth)
            .ok_or_else(|| {
                CoreError::InvalidTopic(format!(
                    "{}_{} (available: {})",
                    name,
                    depth,
                    self.names().join(", ")
                ))
            })
    }

    /// Distinct topic names in first-appearance order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for topic in &self.topics {
            if !names.contains(&topic.name.as_str()) {
                names.push(&topic.name);
            }
        }
        names
    }

    /// Topics at one depth.
    pub fn at_depth(&self, depth: Depth) -> impl Iterator<Item = &Topic> {
        self.topics.iter().filter(move |t| t.depth == depth)
    }
}

//! Tracked work items and tag filtering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, StatsError};
use crate::status::StatusId;

/// Wildcard tag value meaning "no filtering".
pub const TAG_WILDCARD: &str = "*";

/// A user story as read from the tracker. Read-only from here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Item {
    /// Tracker-internal id, used to fetch attribute values
    pub id: i64,
    /// Project-visible reference number (`#ref`)
    pub reference: i64,
    pub subject: String,
    pub status: StatusId,
    pub is_closed: bool,
    pub total_points: Option<f64>,
    pub tags: BTreeSet<String>,
    /// Custom attribute id → raw value
    pub custom_attribute_values: BTreeMap<i64, String>,
}

/// Selects the subset of items a command operates on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TagFilter {
    #[default]
    All,
    Tag(String),
}

impl TagFilter {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == TAG_WILDCARD {
            Self::All
        } else {
            Self::Tag(raw.to_string())
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::All => true,
            Self::Tag(tag) => item.tags.contains(tag),
        }
    }

    /// File-name stem component, distinct for every filter.
    ///
    /// Tags get a `tag_` prefix so no tag can collide with the wildcard key,
    /// and are percent-encoded so they are safe as a path component.
    pub fn file_key(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Tag(tag) => format!("tag_{}", urlencoding::encode(tag)),
        }
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(TAG_WILDCARD),
            Self::Tag(tag) => f.write_str(tag),
        }
    }
}

/// Items matching `filter`, in input order.
///
/// An empty result is an error: every command that filters by tag needs at
/// least one item to say anything meaningful.
pub fn select_items<'a>(items: &'a [Item], filter: &TagFilter) -> Result<Vec<&'a Item>> {
    let selected: Vec<&Item> = items.iter().filter(|i| filter.matches(i)).collect();
    if selected.is_empty() {
        return Err(StatsError::EmptySelection {
            tag: filter.to_string(),
        });
    }
    Ok(selected)
}

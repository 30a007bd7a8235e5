//! Wire shapes of the Taiga REST API and their conversion to core types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use taiga_stats_core::{AttributeDef, Item, Status};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStatus {
    id: i64,
    name: String,
    order: i64,
}

impl From<WireStatus> for Status {
    fn from(s: WireStatus) -> Self {
        Status::new(s.id, s.name, s.order)
    }
}

/// Tags arrive either as plain names or as `[name, color]` pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTag {
    Name(String),
    Pair(Vec<Option<String>>),
}

impl WireTag {
    fn into_name(self) -> Option<String> {
        match self {
            Self::Name(name) => Some(name),
            Self::Pair(parts) => parts.into_iter().next().flatten(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStory {
    id: i64,
    #[serde(rename = "ref")]
    reference: i64,
    #[serde(default)]
    subject: String,
    status: i64,
    #[serde(default)]
    is_closed: bool,
    #[serde(default)]
    total_points: Option<f64>,
    #[serde(default)]
    tags: Option<Vec<WireTag>>,
}

impl From<WireStory> for Item {
    fn from(s: WireStory) -> Self {
        Item {
            id: s.id,
            reference: s.reference,
            subject: s.subject,
            status: s.status,
            is_closed: s.is_closed,
            total_points: s.total_points,
            tags: s
                .tags
                .unwrap_or_default()
                .into_iter()
                .filter_map(WireTag::into_name)
                .collect(),
            custom_attribute_values: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAttribute {
    id: i64,
    name: String,
}

impl From<WireAttribute> for AttributeDef {
    fn from(a: WireAttribute) -> Self {
        AttributeDef {
            id: a.id,
            name: a.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAttributeValues {
    #[serde(default)]
    attributes_values: BTreeMap<String, serde_json::Value>,
}

impl WireAttributeValues {
    /// Attribute id → value as text. Nulls and non-numeric keys are dropped.
    pub(crate) fn into_map(self) -> BTreeMap<i64, String> {
        self.attributes_values
            .into_iter()
            .filter_map(|(key, value)| {
                let id = key.parse::<i64>().ok()?;
                let text = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((id, text))
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthRequest<'a> {
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub(crate) auth_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(rename = "_error_message", default)]
    pub(crate) error_message: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
}

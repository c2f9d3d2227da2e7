//! Status record types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StatusError;
use crate::item::ItemId;

/// Lifecycle state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    #[serde(alias = "que", alias = "queued")]
    Pending,
    Processed,
    Failed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Pending => "pending",
            ItemState::Processed => "processed",
            ItemState::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemState {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" | "que" | "queued" => Ok(ItemState::Pending),
            "processed" => Ok(ItemState::Processed),
            "failed" => Ok(ItemState::Failed),
            other => Err(StatusError::UnknownState(other.to_string())),
        }
    }
}

/// Stored status of one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Older status files store `null` for ids that were not numeric.
    #[serde(deserialize_with = "null_id_as_empty")]
    pub id: ItemId,
    /// Older status files call this field `status`.
    #[serde(alias = "status")]
    pub state: ItemState,
}

fn null_id_as_empty<'de, D>(deserializer: D) -> Result<ItemId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let id = Option::<ItemId>::deserialize(deserializer)?;
    Ok(id.unwrap_or_else(|| ItemId::Text(String::new())))
}

impl ItemRecord {
    pub fn new(id: impl Into<ItemId>, state: ItemState) -> Self {
        Self {
            id: id.into(),
            state,
        }
    }
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::TransitSystem;

/// A station or platform in the compiled index, keyed by its unique key.
///
/// The linkage sets (`child_original_stop_ids`, `served_by_original_route_ids`,
/// `realtime_feed_urls`) are populated by the later compiler phases; after
/// publication the record is immutable. A stop with a `parent_station_key`
/// always appears in the parent's `child_original_stop_ids`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopInfo {
    pub original_stop_id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub system: TransitSystem,
    /// Unique key of the parent station, already re-prefixed.
    pub parent_station_key: Option<String>,
    pub location_type: Option<u8>,
    #[serde(default)]
    pub child_original_stop_ids: BTreeSet<String>,
    #[serde(default)]
    pub served_by_original_route_ids: BTreeSet<String>,
    #[serde(default)]
    pub realtime_feed_urls: BTreeSet<String>,
    pub borough: Option<String>,
    pub is_terminal: bool,
    /// Rider-facing label of the `N` platform direction. Subway only.
    pub north_label: Option<String>,
    /// Rider-facing label of the `S` platform direction. Subway only.
    pub south_label: Option<String>,
    pub ada_status: Option<u8>,
    pub ada_notes: Option<String>,
    pub wheelchair_boarding: Option<u8>,
}

impl StopInfo {
    pub fn unique_key(&self) -> String {
        self.system.compose(&self.original_stop_id)
    }

    /// Original ids the resolver matches realtime stop-time updates against:
    /// the children of a parent station, or the stop itself when it has no
    /// children (typical for commuter rail).
    pub fn candidate_original_ids(&self) -> Vec<String> {
        if self.child_original_stop_ids.is_empty() {
            vec![self.original_stop_id.clone()]
        } else {
            self.child_original_stop_ids.iter().cloned().collect()
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::TransitSystem;

/// A scheduled trip, keyed by its raw trip id.
///
/// Raw trip ids are globally unique across the three operators in practice,
/// but the record carries its system so a collision is detectable.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripInfo {
    pub original_route_id: String,
    pub service_id: String,
    pub direction_id: Option<u8>,
    pub headsign: Option<String>,
    /// The "train number" for commuter rail; realtime feeds reference it.
    pub short_name: Option<String>,
    /// Fare-class flag carried on commuter-rail trips: `"1"` peak, `"0"`
    /// off-peak.
    pub peak_offpeak: Option<String>,
    /// Original id of the trip's final stop, derived from the row with the
    /// highest stop sequence.
    pub destination_original_stop_id: Option<String>,
    pub system: TransitSystem,
}

impl TripInfo {
    pub fn route_key(&self) -> String {
        self.system.compose(&self.original_route_id)
    }

    pub fn service_key(&self) -> String {
        self.system.compose(&self.service_id)
    }
}

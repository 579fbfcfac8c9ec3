use serde::Deserialize;
use utility::serde::deserialize_non_empty;

/// One row of the curated station CSV that enriches subway stops with
/// borough, rider-facing platform direction labels and accessibility
/// metadata. Keyed by the original stop id; not every stop has a row.
#[derive(Debug, Clone, Deserialize)]
pub struct StationRow {
    #[serde(rename = "GTFS Stop ID")]
    pub stop_id: String,

    #[serde(rename = "Borough", default, deserialize_with = "deserialize_non_empty")]
    pub borough: Option<String>,

    #[serde(rename = "North Direction Label", default, deserialize_with = "deserialize_non_empty")]
    pub north_label: Option<String>,

    #[serde(rename = "South Direction Label", default, deserialize_with = "deserialize_non_empty")]
    pub south_label: Option<String>,

    /// `0` not accessible, `1` fully accessible, `2` partially accessible.
    #[serde(rename = "ADA", default)]
    pub ada: Option<u8>,

    #[serde(rename = "ADA Notes", default, deserialize_with = "deserialize_non_empty")]
    pub ada_notes: Option<String>,
}

use serde::Deserialize;
use utility::serde::deserialize_non_empty;

/// One row of `trips.txt`.
/// See <https://gtfs.org/schedule/reference/#tripstxt>
#[derive(Debug, Clone, Deserialize)]
pub struct TripRow {
    #[serde(rename = "trip_id")]
    pub id: String,

    pub route_id: String,

    pub service_id: String,

    /// `0`/`1`; the rider-facing meaning is operator-specific.
    #[serde(default)]
    pub direction_id: Option<u8>,

    #[serde(rename = "trip_headsign", default, deserialize_with = "deserialize_non_empty")]
    pub headsign: Option<String>,

    /// The rider-facing "train number" on the railroads.
    #[serde(rename = "trip_short_name", default, deserialize_with = "deserialize_non_empty")]
    pub short_name: Option<String>,

    /// Commuter-rail fare-class column: `"1"` peak, `"0"` off-peak.
    #[serde(default, deserialize_with = "deserialize_non_empty")]
    pub peak_offpeak: Option<String>,
}

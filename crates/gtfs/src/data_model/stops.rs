use serde::Deserialize;
use utility::serde::deserialize_non_empty;

/// One row of `stops.txt`. Stations and their directional platforms both
/// live here; a platform names its station through `parent_station`.
/// See <https://gtfs.org/schedule/reference/#stopstxt>
#[derive(Debug, Clone, Deserialize)]
pub struct StopRow {
    #[serde(rename = "stop_id")]
    pub id: String,

    #[serde(rename = "stop_name", default, deserialize_with = "deserialize_non_empty")]
    pub name: Option<String>,

    #[serde(rename = "stop_lat", default)]
    pub latitude: Option<f64>,

    #[serde(rename = "stop_lon", default)]
    pub longitude: Option<f64>,

    /// `0`/empty: stop or platform, `1`: station, `2`: entrance/exit.
    #[serde(default)]
    pub location_type: Option<u8>,

    #[serde(default, deserialize_with = "deserialize_non_empty")]
    pub parent_station: Option<String>,

    /// `1`: some accessible boarding, `2`: none, `0`/empty: unknown.
    #[serde(default)]
    pub wheelchair_boarding: Option<u8>,
}

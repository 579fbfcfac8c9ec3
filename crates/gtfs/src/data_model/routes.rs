use serde::Deserialize;
use utility::serde::deserialize_non_empty;

/// One row of `routes.txt`.
/// See <https://gtfs.org/schedule/reference/#routestxt>
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRow {
    #[serde(rename = "route_id")]
    pub id: String,

    #[serde(rename = "route_short_name", default, deserialize_with = "deserialize_non_empty")]
    pub short_name: Option<String>,

    #[serde(rename = "route_long_name", default, deserialize_with = "deserialize_non_empty")]
    pub long_name: Option<String>,

    /// Route color as a six-digit hexadecimal number without the leading `#`.
    #[serde(rename = "route_color", default, deserialize_with = "deserialize_non_empty")]
    pub color: Option<String>,

    #[serde(rename = "route_text_color", default, deserialize_with = "deserialize_non_empty")]
    pub text_color: Option<String>,

    #[serde(rename = "route_type", default)]
    pub route_type: Option<u16>,
}

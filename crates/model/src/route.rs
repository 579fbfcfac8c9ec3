use serde::{Deserialize, Serialize};

use crate::TransitSystem;

/// A route in the compiled index, keyed by its unique key.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfo {
    pub original_route_id: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub route_type: Option<u16>,
    pub system: TransitSystem,
}

impl RouteInfo {
    pub fn unique_key(&self) -> String {
        self.system.compose(&self.original_route_id)
    }
}

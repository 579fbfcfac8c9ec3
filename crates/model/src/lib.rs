use std::fmt;

use serde::{Deserialize, Serialize};

pub mod departure;
pub mod route;
pub mod stop;
pub mod stop_time;
pub mod system;
pub mod trip;

pub use departure::{Departure, DepartureSource, Direction, PeakStatus};
pub use route::RouteInfo;
pub use stop::StopInfo;
pub use stop_time::{Note, StopTime};
pub use system::SystemConfig;
pub use trip::TripInfo;

/// One of the three operators indexed together: the rapid-transit subway and
/// the two commuter railroads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitSystem {
    Subway,
    Lirr,
    Mnr,
}

impl TransitSystem {
    pub const ALL: [TransitSystem; 3] =
        [TransitSystem::Subway, TransitSystem::Lirr, TransitSystem::Mnr];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Subway => "SUBWAY",
            Self::Lirr => "LIRR",
            Self::Mnr => "MNR",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SUBWAY" => Some(Self::Subway),
            "LIRR" => Some(Self::Lirr),
            "MNR" => Some(Self::Mnr),
            _ => None,
        }
    }

    /// Cross-system primary key: `"{SYSTEM}-{originalId}"`. Raw feed
    /// identifiers are not unique across operators; every map keyed by stop,
    /// route, trip or service uses this form.
    pub fn compose(&self, original_id: &str) -> String {
        format!("{}-{}", self.tag(), original_id)
    }

    /// Splits a unique key back into operator and original identifier.
    /// Original ids may themselves contain dashes, so only the first one
    /// separates the system tag.
    pub fn split(key: &str) -> Option<(TransitSystem, &str)> {
        let (tag, original_id) = key.split_once('-')?;
        Some((Self::from_tag(tag)?, original_id))
    }

    pub fn is_commuter_rail(&self) -> bool {
        matches!(self, Self::Lirr | Self::Mnr)
    }
}

impl fmt::Display for TransitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::TransitSystem;

    #[test]
    fn unique_key_round_trip() {
        for system in TransitSystem::ALL {
            let key = system.compose("635");
            assert_eq!(TransitSystem::split(&key), Some((system, "635")));
        }
        // original ids may contain the separator themselves
        let key = TransitSystem::Mnr.compose("AM_8412_GCT-X");
        assert_eq!(TransitSystem::split(&key), Some((TransitSystem::Mnr, "AM_8412_GCT-X")));
    }

    #[test]
    fn unknown_tags_do_not_resolve() {
        assert_eq!(TransitSystem::split("PATH-123"), None);
        assert_eq!(TransitSystem::split("635"), None);
    }

    #[test]
    fn commuter_rail_classification() {
        assert!(!TransitSystem::Subway.is_commuter_rail());
        assert!(TransitSystem::Lirr.is_commuter_rail());
        assert!(TransitSystem::Mnr.is_commuter_rail());
    }
}

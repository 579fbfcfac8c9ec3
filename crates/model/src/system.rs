use crate::TransitSystem;

/// Rider-facing direction convention of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionStyle {
    /// Directional platforms carry a trailing `N`/`S` letter on their stop
    /// ids; the parent station supplies the rider-facing labels.
    PlatformLetter,
    /// Trips run inbound towards the terminal or outbound away from it.
    InboundOutbound,
}

/// How realtime trip references are matched against the static trip table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripLookup {
    /// The realtime trip id is the static trip id.
    Direct,
    /// Prefer the vehicle label, then the train-number table, then the trip
    /// id itself.
    TrainNumber,
}

/// Behaviour table for one operator, consumed by the static compiler and the
/// departure resolver. Per-system differences are expressed as flags on this
/// record rather than as a type hierarchy; a new operator is a new row.
pub struct SystemConfig {
    pub system: TransitSystem,
    pub direction_style: DirectionStyle,
    pub trip_lookup: TripLookup,
    /// Realtime trip ids reference the static `trip_short_name` ("train
    /// number") instead of the full trip id.
    pub uses_trip_short_name: bool,
    /// The realtime vehicle label carries the same token as the static trip
    /// short name and is the preferred lookup key.
    pub matches_vehicle_label: bool,
    /// The realtime feed's `direction_id` sense is inverted relative to the
    /// static tables.
    pub inverted_direction_id: bool,
    /// Realtime trip ids are zero-padded relative to the static tables.
    pub strips_leading_zeros: bool,
    /// Original stop ids that mark a terminal of this operator.
    pub terminal_stop_ids: &'static [&'static str],
    /// Stop-name fragments that mark a terminal of this operator.
    pub terminal_name_fragments: &'static [&'static str],
}

impl SystemConfig {
    pub fn of(system: TransitSystem) -> &'static SystemConfig {
        match system {
            TransitSystem::Subway => &SUBWAY,
            TransitSystem::Lirr => &LIRR,
            TransitSystem::Mnr => &MNR,
        }
    }

    /// Whether a stop of this operator is a terminal, judged by its original
    /// id or by a name fragment.
    pub fn is_terminal(&self, original_stop_id: &str, stop_name: &str) -> bool {
        self.terminal_stop_ids.contains(&original_stop_id)
            || self
                .terminal_name_fragments
                .iter()
                .any(|fragment| stop_name.contains(fragment))
    }
}

static SUBWAY: SystemConfig = SystemConfig {
    system: TransitSystem::Subway,
    direction_style: DirectionStyle::PlatformLetter,
    trip_lookup: TripLookup::Direct,
    uses_trip_short_name: false,
    matches_vehicle_label: false,
    inverted_direction_id: false,
    strips_leading_zeros: false,
    terminal_stop_ids: &[],
    terminal_name_fragments: &[],
};

static LIRR: SystemConfig = SystemConfig {
    system: TransitSystem::Lirr,
    direction_style: DirectionStyle::InboundOutbound,
    trip_lookup: TripLookup::Direct,
    uses_trip_short_name: true,
    matches_vehicle_label: false,
    inverted_direction_id: false,
    strips_leading_zeros: true,
    terminal_stop_ids: &["237", "241", "349"],
    terminal_name_fragments: &["Penn Station", "Atlantic Terminal", "Grand Central"],
};

static MNR: SystemConfig = SystemConfig {
    system: TransitSystem::Mnr,
    direction_style: DirectionStyle::InboundOutbound,
    trip_lookup: TripLookup::TrainNumber,
    uses_trip_short_name: true,
    matches_vehicle_label: true,
    inverted_direction_id: true,
    strips_leading_zeros: true,
    terminal_stop_ids: &["1"],
    terminal_name_fragments: &["Grand Central"],
};

const SUBWAY_FEED_BASE: &str =
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs";
const LIRR_FEED: &str =
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/lirr%2Fgtfs-lirr";
const MNR_FEED: &str =
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/mnr%2Fgtfs-mnr";

/// Realtime endpoint serving a route. The subway splits its realtime stream
/// across per-line-group endpoints; each railroad publishes a single feed.
pub fn feed_url_for_route(system: TransitSystem, original_route_id: &str) -> Option<String> {
    match system {
        TransitSystem::Lirr => Some(LIRR_FEED.to_owned()),
        TransitSystem::Mnr => Some(MNR_FEED.to_owned()),
        TransitSystem::Subway => {
            let suffix = match original_route_id {
                "A" | "C" | "E" | "H" | "FS" | "SR" => "-ace",
                "B" | "D" | "F" | "M" | "SF" => "-bdfm",
                "G" => "-g",
                "J" | "Z" => "-jz",
                "N" | "Q" | "R" | "W" => "-nqrw",
                "L" => "-l",
                "SI" => "-si",
                "1" | "2" | "3" | "4" | "5" | "6" | "6X" | "7" | "7X" | "S" | "GS" => "",
                _ => return None,
            };
            Some(format!("{}{}", SUBWAY_FEED_BASE, suffix))
        }
    }
}

/// Operator implied by a realtime feed URL. Feeds emit original ids; the
/// resolver re-prefixes them with the system derived here.
pub fn system_for_feed_url(url: &str) -> Option<TransitSystem> {
    if url.contains("lirr") {
        Some(TransitSystem::Lirr)
    } else if url.contains("mnr") {
        Some(TransitSystem::Mnr)
    } else if url.contains("nyct") {
        Some(TransitSystem::Subway)
    } else {
        None
    }
}

/// The full set of realtime endpoints declared by this table. Every stop's
/// `realtime_feed_urls` is a subset of this set.
pub fn declared_feed_urls() -> Vec<String> {
    let mut urls = vec![
        SUBWAY_FEED_BASE.to_owned(),
        format!("{}-ace", SUBWAY_FEED_BASE),
        format!("{}-bdfm", SUBWAY_FEED_BASE),
        format!("{}-g", SUBWAY_FEED_BASE),
        format!("{}-jz", SUBWAY_FEED_BASE),
        format!("{}-nqrw", SUBWAY_FEED_BASE),
        format!("{}-l", SUBWAY_FEED_BASE),
        format!("{}-si", SUBWAY_FEED_BASE),
    ];
    urls.push(LIRR_FEED.to_owned());
    urls.push(MNR_FEED.to_owned());
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_to_feed_mapping() {
        assert_eq!(
            feed_url_for_route(TransitSystem::Subway, "L").as_deref(),
            Some("https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-l")
        );
        assert_eq!(
            feed_url_for_route(TransitSystem::Subway, "4").as_deref(),
            Some(SUBWAY_FEED_BASE)
        );
        assert_eq!(feed_url_for_route(TransitSystem::Subway, "XX"), None);
        assert_eq!(feed_url_for_route(TransitSystem::Mnr, "1").as_deref(), Some(MNR_FEED));
    }

    #[test]
    fn feed_urls_resolve_back_to_their_system() {
        for url in declared_feed_urls() {
            let system = system_for_feed_url(&url).unwrap();
            match system {
                TransitSystem::Subway => assert!(url.contains("nyct")),
                TransitSystem::Lirr => assert!(url.contains("lirr")),
                TransitSystem::Mnr => assert!(url.contains("mnr")),
            }
        }
    }

    #[test]
    fn terminal_rules() {
        let mnr = SystemConfig::of(TransitSystem::Mnr);
        assert!(mnr.is_terminal("1", "Grand Central Terminal"));
        assert!(mnr.is_terminal("999", "Grand Central Terminal"));
        assert!(!mnr.is_terminal("83", "Harlem-125 St"));

        let subway = SystemConfig::of(TransitSystem::Subway);
        assert!(!subway.is_terminal("L11", "Graham Av"));
    }
}

use gtfs::index::StaticIndex;
use model::{Direction, TransitSystem};

/// Swaps the trailing `N`/`S` of a platform id whose base is on the flipped
/// list. Ids off the list (or without a directional letter) pass through as
/// `None`, so an empty list turns the whole rewrite into a no-op.
pub(crate) fn swap_platform_suffix(flipped: &[String], stop_id: &str) -> Option<String> {
    if let Some(base) = stop_id.strip_suffix('N') {
        if flipped.iter().any(|id| id == base) {
            return Some(format!("{}S", base));
        }
    } else if let Some(base) = stop_id.strip_suffix('S') {
        if flipped.iter().any(|id| id == base) {
            return Some(format!("{}N", base));
        }
    }
    None
}

/// Normalizes one realtime stop id: subway ids on the flipped corridor get
/// their platform letter corrected before any lookup.
pub(crate) fn normalize_stop_id(
    flipped: &[String],
    system: TransitSystem,
    stop_id: &str,
) -> String {
    if system == TransitSystem::Subway {
        if let Some(swapped) = swap_platform_suffix(flipped, stop_id) {
            return swapped;
        }
    }
    stop_id.to_owned()
}

/// Applies the same correction to a requested station key.
pub(crate) fn rewrite_station_key(flipped: &[String], station_key: &str) -> String {
    if let Some((system, original_id)) = TransitSystem::split(station_key) {
        if system == TransitSystem::Subway {
            if let Some(swapped) = swap_platform_suffix(flipped, original_id) {
                return system.compose(&swapped);
            }
        }
    }
    station_key.to_owned()
}

/// Direction of a directional platform, labelled by its parent station's
/// north/south labels when they exist.
pub(crate) fn platform_direction(
    index: &StaticIndex,
    system: TransitSystem,
    platform_id: &str,
) -> Option<Direction> {
    let parent = index
        .stop(&system.compose(platform_id))
        .and_then(|stop| stop.parent_station_key.as_deref())
        .and_then(|parent_key| index.stop(parent_key));

    if platform_id.ends_with('N') {
        Some(Direction::North(
            parent.and_then(|parent| parent.north_label.clone()),
        ))
    } else if platform_id.ends_with('S') {
        Some(Direction::South(
            parent.and_then(|parent| parent.south_label.clone()),
        ))
    } else {
        None
    }
}

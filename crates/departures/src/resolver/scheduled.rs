use std::collections::HashSet;

use chrono::{DateTime, Local};
use gtfs::index::StaticIndex;
use model::system::{DirectionStyle, SystemConfig};
use model::{
    Departure, DepartureSource, Direction, PeakStatus, RouteInfo, StopInfo, TransitSystem,
    TripInfo,
};

use super::{compose_service_time, platform, Window};

/// Synthesizes departures from the timetable for every candidate platform,
/// filtered by today's active services. Trips already covered by realtime
/// output (by trip id or train number) are suppressed.
pub(crate) fn append_scheduled(
    index: &StaticIndex,
    station: &StopInfo,
    candidates: &HashSet<String>,
    processed: &HashSet<String>,
    window: &Window,
    now: DateTime<Local>,
    out: &mut Vec<Departure>,
) {
    let active = index.calendar.active_services_on(now.date_naive());

    for original_id in candidates {
        let Some(trips_here) = index.stop_times_by_original_stop_id.get(original_id)
        else {
            continue;
        };
        for (trip_id, stop_time) in trips_here {
            if processed.contains(trip_id) {
                continue;
            }
            let Some(trip) = index.trips.get(trip_id) else {
                continue;
            };
            if trip.system != station.system {
                continue;
            }
            if trip
                .short_name
                .as_deref()
                .map_or(false, |short_name| processed.contains(short_name))
            {
                continue;
            }
            if !active.contains(&trip.service_key()) {
                continue;
            }
            if !stop_time.allows_pickup() {
                continue;
            }
            let Some(offset) = stop_time
                .scheduled_departure
                .or(stop_time.scheduled_arrival)
            else {
                continue;
            };
            let Some(when) = compose_service_time(now.date_naive(), offset) else {
                continue;
            };
            if !window.contains(when) {
                continue;
            }

            let route_key = trip.route_key();
            let route = index.route(&route_key);
            let (destination, destination_borough) =
                destination_from_static(index, trip, route);
            let direction = scheduled_direction(index, station.system, trip, original_id);
            let note_text = stop_time
                .note_id
                .as_deref()
                .and_then(|id| index.note_text(id))
                .map(str::to_owned);

            out.push(Departure {
                trip_id: trip_id.clone(),
                route_id: Some(route_key),
                route_short_name: route.and_then(|route| route.short_name.clone()),
                route_long_name: route.and_then(|route| route.long_name.clone()),
                route_color: route.and_then(|route| route.color.clone()),
                destination,
                destination_borough,
                direction,
                departure_time: Some(when),
                estimated_departure_time: Some(when),
                delay_minutes: None,
                track: stop_time.track.clone(),
                status: "Scheduled".to_owned(),
                peak_status: PeakStatus::from_flag(trip.peak_offpeak.as_deref()),
                system: station.system,
                is_terminal_arrival: station.is_terminal
                    || (station.system.is_commuter_rail() && trip.direction_id == Some(1)),
                source: DepartureSource::Scheduled,
                train_status: None,
                pickup_type: stop_time.pickup_type,
                drop_off_type: stop_time.drop_off_type,
                note_id: stop_time.note_id.clone(),
                note_text,
            });
        }
    }
}

fn destination_from_static(
    index: &StaticIndex,
    trip: &TripInfo,
    route: Option<&RouteInfo>,
) -> (Option<String>, Option<String>) {
    let dest_stop = trip
        .destination_original_stop_id
        .as_deref()
        .and_then(|id| index.stop(&trip.system.compose(id)));
    // a subway destination is a directional platform; name its station
    let named = dest_stop
        .and_then(|stop| stop.parent_station_key.as_deref())
        .and_then(|parent_key| index.stop(parent_key))
        .or(dest_stop);
    let name = trip
        .headsign
        .clone()
        .or_else(|| named.map(|stop| stop.name.clone()))
        .or_else(|| route.and_then(|route| route.long_name.clone()));
    (name, named.and_then(|stop| stop.borough.clone()))
}

fn scheduled_direction(
    index: &StaticIndex,
    system: TransitSystem,
    trip: &TripInfo,
    original_stop_id: &str,
) -> Direction {
    match SystemConfig::of(system).direction_style {
        DirectionStyle::PlatformLetter => {
            platform::platform_direction(index, system, original_stop_id)
                .unwrap_or(Direction::Unknown)
        }
        DirectionStyle::InboundOutbound => match trip.direction_id {
            Some(1) => Direction::Inbound,
            Some(_) => Direction::Outbound,
            None => Direction::Unknown,
        },
    }
}

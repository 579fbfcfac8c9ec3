use std::collections::HashSet;

use chrono::{DateTime, Duration as TimeDelta, Local, TimeZone};
use gtfs::index::StaticIndex;
use gtfs::realtime::feed::{
    FeedMessage, StopTimeEvent, StopTimeUpdate, TripDescriptor, NYCT_DIRECTION_NORTH,
    NYCT_DIRECTION_SOUTH,
};
use model::system::{DirectionStyle, SystemConfig, TripLookup};
use model::{
    Departure, DepartureSource, Direction, PeakStatus, RouteInfo, StopInfo, TransitSystem,
    TripInfo,
};

use super::{compose_service_time, platform, status_string, Window};

pub(crate) struct FeedContext<'a> {
    pub index: &'a StaticIndex,
    pub station: &'a StopInfo,
    pub candidates: &'a HashSet<String>,
    pub window: &'a Window,
    pub now: DateTime<Local>,
    pub flipped: &'a [String],
}

/// One stop-time update with its stop id normalized (platform-letter
/// correction applied), so all matching happens on corrected ids.
struct Update<'a> {
    stop_id: String,
    raw: &'a StopTimeUpdate,
}

impl Update<'_> {
    fn sequence(&self) -> u32 {
        self.raw.stop_sequence.unwrap_or(0)
    }
}

/// Turns one realtime feed into departures for the requested station.
/// Every processed trip id (and train number) is recorded so the scheduled
/// fallback does not emit the same trip twice.
pub(crate) fn process_feed(
    ctx: &FeedContext<'_>,
    feed: &FeedMessage,
    system: TransitSystem,
    processed: &mut HashSet<String>,
    out: &mut Vec<Departure>,
) {
    let config = SystemConfig::of(system);

    for entity in &feed.entity {
        let Some(trip_update) = &entity.trip_update else {
            continue;
        };
        if trip_update.stop_time_update.is_empty() {
            continue;
        }
        let Some(descriptor) = &trip_update.trip else {
            continue;
        };
        let Some(raw_trip_id) = descriptor.trip_id.as_deref() else {
            continue;
        };

        // the railroads zero-pad realtime trip ids relative to the timetable
        let trip_id = if config.strips_leading_zeros {
            raw_trip_id.trim_start_matches('0').to_owned()
        } else {
            raw_trip_id.to_owned()
        };
        if trip_id.is_empty() {
            continue;
        }
        processed.insert(trip_id.clone());

        let vehicle_label = trip_update
            .vehicle
            .as_ref()
            .and_then(|vehicle| vehicle.label.as_deref());
        if config.matches_vehicle_label {
            if let Some(label) = vehicle_label {
                processed.insert(label.to_owned());
            }
        }

        let updates: Vec<Update<'_>> = trip_update
            .stop_time_update
            .iter()
            .map(|raw| Update {
                stop_id: raw
                    .stop_id
                    .as_deref()
                    .map(|id| platform::normalize_stop_id(ctx.flipped, system, id))
                    .unwrap_or_default(),
                raw,
            })
            .collect();

        let Some(current) = updates
            .iter()
            .find(|update| ctx.candidates.contains(&update.stop_id))
        else {
            continue;
        };

        let static_lookup = lookup_static_trip(ctx.index, config, &trip_id, vehicle_label);
        let static_trip_id = static_lookup.map(|(id, _)| id.as_str());
        let static_trip = static_lookup.map(|(_, trip)| trip);

        if let Some(departure) = assemble_departure(
            ctx,
            system,
            config,
            &trip_id,
            static_trip_id,
            static_trip,
            descriptor,
            current,
            &updates,
        ) {
            out.push(departure);
        }
    }
}

/// Resolves the realtime trip reference against the static trip table using
/// the operator's lookup strategy.
fn lookup_static_trip<'a>(
    index: &'a StaticIndex,
    config: &SystemConfig,
    trip_id: &str,
    vehicle_label: Option<&str>,
) -> Option<(&'a String, &'a TripInfo)> {
    if config.trip_lookup == TripLookup::TrainNumber {
        if let Some(label) = vehicle_label {
            if let Some(static_id) = index.vehicle_trips.get(label) {
                if let Some(trip) = index.trips.get(static_id) {
                    return Some((static_id, trip));
                }
            }
        }
        if let Some(static_id) = index.trips_by_short_name.get(trip_id) {
            if let Some(trip) = index.trips.get(static_id) {
                return Some((static_id, trip));
            }
        }
    }
    index.trips.get_key_value(trip_id)
}

#[allow(clippy::too_many_arguments)]
fn assemble_departure(
    ctx: &FeedContext<'_>,
    system: TransitSystem,
    config: &SystemConfig,
    trip_id: &str,
    static_trip_id: Option<&str>,
    static_trip: Option<&TripInfo>,
    descriptor: &TripDescriptor,
    current: &Update<'_>,
    updates: &[Update<'_>],
) -> Option<Departure> {
    // prefer the departure prediction; the railroads substitute the arrival
    // at a trip's terminal and wherever a departure is simply absent
    let departure_event = current.raw.departure.as_ref();
    let arrival_event = current.raw.arrival.as_ref();
    let (event, used_arrival) = match departure_event.and_then(|event| event.time) {
        Some(_) => (departure_event, false),
        None if system.is_commuter_rail() => {
            (arrival_event.filter(|event| event.time.is_some()), true)
        }
        None => (None, false),
    };
    let event = event?;
    let predicted = Local.timestamp_opt(event.time?, 0).earliest()?;
    if !ctx.window.contains(predicted) {
        return None;
    }

    let last_by_sequence = updates.iter().max_by_key(|update| update.sequence());
    let is_last_stop = last_by_sequence
        .map_or(false, |last| std::ptr::eq(last.raw, current.raw));
    let is_terminal_arrival = ctx.station.is_terminal || (used_arrival && is_last_stop);

    let static_stop_time =
        static_trip_id.and_then(|id| ctx.index.stop_time(&current.stop_id, id));

    let scheduled_time = static_stop_time
        .and_then(|stop_time| {
            stop_time
                .scheduled_departure
                .or(stop_time.scheduled_arrival)
        })
        .and_then(|offset| compose_service_time(ctx.now.date_naive(), offset));
    let delay_minutes = event
        .delay
        .map(|seconds| (f64::from(seconds) / 60.0).round() as i64);

    let departure_time = scheduled_time.unwrap_or(predicted);
    let estimated_departure_time = match delay_minutes {
        Some(minutes) => departure_time + TimeDelta::minutes(minutes),
        None => departure_time,
    };
    let status = status_string(delay_minutes, Some(predicted), ctx.now);

    let route_key = static_trip
        .map(TripInfo::route_key)
        .or_else(|| descriptor.route_id.as_deref().map(|id| system.compose(id)));
    let route = route_key.as_deref().and_then(|key| ctx.index.route(key));

    let (destination, destination_borough) =
        resolve_destination(ctx.index, system, static_trip, route, updates);
    let direction = resolve_direction(ctx, system, config, static_trip, descriptor, current, updates);
    let track = resolve_track(system, current.raw);
    let train_status = current
        .raw
        .mta_railroad_stop_time_update
        .as_ref()
        .and_then(|ext| ext.train_status.clone());

    let note_id = static_stop_time.and_then(|stop_time| stop_time.note_id.clone());
    let note_text = note_id
        .as_deref()
        .and_then(|id| ctx.index.note_text(id))
        .map(str::to_owned);

    Some(Departure {
        trip_id: trip_id.to_owned(),
        route_id: route_key,
        route_short_name: route.and_then(|route| route.short_name.clone()),
        route_long_name: route.and_then(|route| route.long_name.clone()),
        route_color: route.and_then(|route| route.color.clone()),
        destination,
        destination_borough,
        direction,
        departure_time: Some(departure_time),
        estimated_departure_time: Some(estimated_departure_time),
        delay_minutes,
        track,
        status,
        peak_status: PeakStatus::from_flag(
            static_trip.and_then(|trip| trip.peak_offpeak.as_deref()),
        ),
        system,
        is_terminal_arrival,
        source: DepartureSource::Realtime,
        train_status,
        pickup_type: static_stop_time.and_then(|stop_time| stop_time.pickup_type),
        drop_off_type: static_stop_time.and_then(|stop_time| stop_time.drop_off_type),
        note_id,
        note_text,
    })
}

fn resolve_destination(
    index: &StaticIndex,
    system: TransitSystem,
    static_trip: Option<&TripInfo>,
    route: Option<&RouteInfo>,
    updates: &[Update<'_>],
) -> (Option<String>, Option<String>) {
    let stop_by_id = |id: &str| index.stop(&system.compose(id));
    let static_dest_stop = static_trip
        .and_then(|trip| trip.destination_original_stop_id.as_deref())
        .and_then(stop_by_id);
    let headsign = static_trip.and_then(|trip| trip.headsign.clone());
    let long_name = route.and_then(|route| route.long_name.clone());
    let max_seq_stop = updates
        .iter()
        .max_by_key(|update| update.sequence())
        .and_then(|update| stop_by_id(&update.stop_id));

    match system {
        TransitSystem::Mnr => {
            let dest_stop = static_dest_stop.or(max_seq_stop);
            let name = headsign
                .or_else(|| static_dest_stop.map(|stop| stop.name.clone()))
                .or_else(|| max_seq_stop.map(|stop| stop.name.clone()))
                .or(long_name);
            (name, dest_stop.and_then(|stop| stop.borough.clone()))
        }
        TransitSystem::Subway => {
            // the subway feed lists updates in travel order; the destination
            // is the last element by position, not by sequence number
            let last_stop = updates.last().and_then(|update| stop_by_id(&update.stop_id));
            let parent = last_stop
                .and_then(|stop| stop.parent_station_key.as_deref())
                .and_then(|parent_key| index.stop(parent_key));
            let named_stop = parent.or(last_stop);
            let name = named_stop
                .map(|stop| stop.name.clone())
                .or(headsign)
                .or_else(|| static_dest_stop.map(|stop| stop.name.clone()))
                .or(long_name);
            (
                name,
                named_stop
                    .or(static_dest_stop)
                    .and_then(|stop| stop.borough.clone()),
            )
        }
        TransitSystem::Lirr => {
            let dest_stop = max_seq_stop.or(static_dest_stop);
            let name = dest_stop
                .map(|stop| stop.name.clone())
                .or(headsign)
                .or(long_name);
            (name, dest_stop.and_then(|stop| stop.borough.clone()))
        }
    }
}

fn resolve_direction(
    ctx: &FeedContext<'_>,
    system: TransitSystem,
    config: &SystemConfig,
    static_trip: Option<&TripInfo>,
    descriptor: &TripDescriptor,
    current: &Update<'_>,
    updates: &[Update<'_>],
) -> Direction {
    match config.direction_style {
        DirectionStyle::PlatformLetter => {
            if let Some(direction) =
                platform::platform_direction(ctx.index, system, &current.stop_id)
            {
                return direction;
            }
            match descriptor
                .nyct_trip_descriptor
                .as_ref()
                .and_then(|ext| ext.direction)
            {
                Some(NYCT_DIRECTION_NORTH) => Direction::North(None),
                Some(NYCT_DIRECTION_SOUTH) => Direction::South(None),
                _ => Direction::Unknown,
            }
        }
        DirectionStyle::InboundOutbound => {
            if let Some(direction_id) = static_trip.and_then(|trip| trip.direction_id) {
                return if direction_id == 1 {
                    Direction::Inbound
                } else {
                    Direction::Outbound
                };
            }

            if system == TransitSystem::Mnr {
                // no static trip: a terminal at the head of the update list
                // means the trip is leaving it, a terminal at the tail means
                // the trip is heading in
                let is_terminal = |update: &Update<'_>| {
                    ctx.index
                        .stop(&system.compose(&update.stop_id))
                        .map_or(false, |stop| stop.is_terminal)
                };
                let first = updates.iter().min_by_key(|update| update.sequence());
                let last = updates.iter().max_by_key(|update| update.sequence());
                if first.map_or(false, |update| is_terminal(update)) {
                    return Direction::Outbound;
                }
                if last.map_or(false, |update| is_terminal(update)) {
                    return Direction::Inbound;
                }
            }

            match descriptor.direction_id {
                Some(direction_id) => {
                    let inbound = if config.inverted_direction_id {
                        direction_id == 0
                    } else {
                        direction_id == 1
                    };
                    if inbound {
                        Direction::Inbound
                    } else {
                        Direction::Outbound
                    }
                }
                None => Direction::Unknown,
            }
        }
    }
}

fn resolve_track(system: TransitSystem, update: &StopTimeUpdate) -> Option<String> {
    let railroad_track = update
        .mta_railroad_stop_time_update
        .as_ref()
        .and_then(|ext| ext.track.clone())
        .filter(|track| !track.is_empty());

    match system {
        TransitSystem::Subway => update
            .nyct_stop_time_update
            .as_ref()
            .and_then(|ext| ext.actual_track.clone())
            .filter(|track| !track.is_empty())
            .or_else(|| event_track(update)),
        // only the extension value counts here; an empty one stays empty
        TransitSystem::Lirr => railroad_track,
        TransitSystem::Mnr => railroad_track.or_else(|| event_track(update)),
    }
}

fn event_track(update: &StopTimeUpdate) -> Option<String> {
    let from_event = |event: Option<&StopTimeEvent>| {
        event
            .and_then(|event| event.track.clone())
            .filter(|track| !track.is_empty())
    };
    from_event(update.departure.as_ref()).or_else(|| from_event(update.arrival.as_ref()))
}

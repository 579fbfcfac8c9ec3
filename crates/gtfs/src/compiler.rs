use std::collections::{BTreeSet, HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::time::Instant;

use chrono::Local;
use model::system::{self, SystemConfig};
use model::{Note, RouteInfo, StopInfo, StopTime, TransitSystem, TripInfo};
use utility::geo::RegionLocator;

use crate::calendar::ServiceCalendar;
use crate::data_model::{
    CalendarDateRow, CalendarRow, NoteRow, RouteRow, StationRow, StopRow,
    StopTimeRow, TripRow,
};
use crate::index::StaticIndex;
use crate::read::{self, IngestError};
use crate::BundlePaths;

#[derive(Debug)]
pub enum BuildError {
    Ingest(IngestError),
    Invariant(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest(why) => write!(f, "{}", why),
            Self::Invariant(why) => write!(f, "index invariant violated: {}", why),
        }
    }
}

impl Error for BuildError {}

impl From<IngestError> for BuildError {
    fn from(why: IngestError) -> Self {
        Self::Ingest(why)
    }
}

/// Compiles the three on-disk bundles into a fresh [`StaticIndex`].
///
/// The build is phased: curated station details first, then one sequential
/// ingest per operator (with a streaming pass over `stop_times.txt` so the
/// largest table is never materialized), then parent linkage, then a second
/// streaming pass wiring routes and realtime feed URLs onto stops, then the
/// railroad footnotes. Any error leaves the caller's live index untouched;
/// publication is the caller's single handoff of the returned value.
pub fn build_index(
    bundles: &BundlePaths,
    boroughs: Option<&RegionLocator>,
) -> Result<StaticIndex, BuildError> {
    let started = Instant::now();
    let mut builder = IndexBuilder::new();

    let station_details = load_station_details(bundles);

    for system in TransitSystem::ALL {
        builder.ingest_system(bundles, system, &station_details, boroughs)?;
    }

    builder.link_parents();

    for system in TransitSystem::ALL {
        builder.link_routes_and_feeds(bundles, system)?;
    }

    for system in [TransitSystem::Lirr, TransitSystem::Mnr] {
        builder.load_notes(bundles, system)?;
    }

    let index = builder.finish()?;
    log::info!(
        "compiled static index in {:.1?}: {} stops, {} routes, {} trips",
        started.elapsed(),
        index.stops.len(),
        index.routes.len(),
        index.trips.len(),
    );
    Ok(index)
}

fn load_station_details(bundles: &BundlePaths) -> HashMap<String, StationRow> {
    let Some(path) = &bundles.stations_file else {
        return HashMap::new();
    };
    match read::read_rows::<StationRow>(path) {
        Ok(rows) => rows
            .into_iter()
            .map(|row| (row.stop_id.clone(), row))
            .collect(),
        Err(why) => {
            log::warn!("station details unavailable, stops stay unenriched: {}", why);
            HashMap::new()
        }
    }
}

/// Mutable view of the index under construction. All phase mutation happens
/// here; [`IndexBuilder::finish`] is the freeze point.
struct IndexBuilder {
    stops: HashMap<String, StopInfo>,
    routes: HashMap<String, RouteInfo>,
    trips: HashMap<String, TripInfo>,
    stop_times_by_original_stop_id: HashMap<String, HashMap<String, StopTime>>,
    trips_by_short_name: HashMap<String, String>,
    vehicle_trips: HashMap<String, String>,
    notes: HashMap<String, Note>,
    calendar: ServiceCalendar,
}

impl IndexBuilder {
    fn new() -> Self {
        Self {
            stops: HashMap::new(),
            routes: HashMap::new(),
            trips: HashMap::new(),
            stop_times_by_original_stop_id: HashMap::new(),
            trips_by_short_name: HashMap::new(),
            vehicle_trips: HashMap::new(),
            notes: HashMap::new(),
            calendar: ServiceCalendar::new(),
        }
    }

    /// Phase 1 for one operator: routes, stops, a streaming pass over
    /// `stop_times.txt`, trips, service calendar.
    fn ingest_system(
        &mut self,
        bundles: &BundlePaths,
        system: TransitSystem,
        station_details: &HashMap<String, StationRow>,
        boroughs: Option<&RegionLocator>,
    ) -> Result<(), BuildError> {
        let dir = bundles.dir_for(system);
        let config = SystemConfig::of(system);

        let route_rows: Vec<RouteRow> = read::read_rows(&dir.join("routes.txt"))?;
        for row in route_rows {
            let route = RouteInfo {
                original_route_id: row.id,
                short_name: row.short_name,
                long_name: row.long_name,
                color: row.color,
                text_color: row.text_color,
                route_type: row.route_type,
                system,
            };
            self.routes.insert(route.unique_key(), route);
        }

        let stop_rows: Vec<StopRow> = read::read_rows(&dir.join("stops.txt"))?;
        for row in stop_rows {
            let name = row.name.unwrap_or_default();
            let details = match system {
                TransitSystem::Subway => station_details.get(&row.id),
                _ => None,
            };
            let borough = details
                .and_then(|details| details.borough.clone())
                .or_else(|| match (row.latitude, row.longitude, boroughs) {
                    (Some(latitude), Some(longitude), Some(locator)) => locator
                        .locate(latitude, longitude)
                        .map(str::to_owned),
                    _ => None,
                });
            let stop = StopInfo {
                is_terminal: config.is_terminal(&row.id, &name),
                original_stop_id: row.id,
                name,
                latitude: row.latitude,
                longitude: row.longitude,
                system,
                parent_station_key: row
                    .parent_station
                    .map(|parent| system.compose(&parent)),
                location_type: row.location_type,
                child_original_stop_ids: BTreeSet::new(),
                served_by_original_route_ids: BTreeSet::new(),
                realtime_feed_urls: BTreeSet::new(),
                borough,
                north_label: details.and_then(|details| details.north_label.clone()),
                south_label: details.and_then(|details| details.south_label.clone()),
                ada_status: details.and_then(|details| details.ada),
                ada_notes: details.and_then(|details| details.ada_notes.clone()),
                wheelchair_boarding: row.wheelchair_boarding,
            };
            self.stops.insert(stop.unique_key(), stop);
        }

        // Streaming pass: the trip's destination is the row with the highest
        // stop sequence, which must be known before trips are enriched.
        let mut max_seq_by_trip: HashMap<String, u32> = HashMap::new();
        let mut dest_by_trip: HashMap<String, String> = HashMap::new();
        let stop_times = &mut self.stop_times_by_original_stop_id;
        let row_count = read::for_each_row::<StopTimeRow, _>(
            &dir.join("stop_times.txt"),
            |row| {
                let is_new_max = max_seq_by_trip
                    .get(&row.trip_id)
                    .map_or(true, |max| row.stop_sequence > *max);
                if is_new_max {
                    max_seq_by_trip.insert(row.trip_id.clone(), row.stop_sequence);
                    dest_by_trip.insert(row.trip_id.clone(), row.stop_id.clone());
                }
                stop_times.entry(row.stop_id).or_default().insert(
                    row.trip_id,
                    StopTime {
                        scheduled_arrival: row.arrival_time,
                        scheduled_departure: row.departure_time,
                        stop_sequence: row.stop_sequence,
                        track: row.track,
                        pickup_type: row.pickup_type,
                        drop_off_type: row.drop_off_type,
                        note_id: row.note_id,
                    },
                );
            },
        )?;
        log::debug!("{}: {} stop-time rows", system, row_count);

        let trip_rows: Vec<TripRow> = read::read_rows(&dir.join("trips.txt"))?;
        for row in trip_rows {
            let trip = TripInfo {
                original_route_id: row.route_id,
                service_id: row.service_id,
                direction_id: row.direction_id,
                headsign: row.headsign,
                short_name: row.short_name,
                peak_offpeak: row.peak_offpeak,
                destination_original_stop_id: dest_by_trip.remove(&row.id),
                system,
            };
            if let Some(previous) = self.trips.insert(row.id.clone(), trip) {
                if previous.system != system {
                    log::warn!(
                        "trip id {} collides across {} and {}",
                        row.id,
                        previous.system,
                        system
                    );
                }
            }
        }

        let calendar_rows: Vec<CalendarRow> = read::read_rows(&dir.join("calendar.txt"))?;
        let exception_rows: Vec<CalendarDateRow> =
            read::read_rows_optional(&dir.join("calendar_dates.txt"))?;
        self.calendar.add_rows(system, &calendar_rows, &exception_rows);

        Ok(())
    }

    /// Phase 2: record every platform on its parent station. The link count
    /// is a consistency signal; a dangling parent reference is cleared so
    /// the parent/child symmetry invariant holds.
    fn link_parents(&mut self) {
        let links: Vec<(String, String)> = self
            .stops
            .values()
            .filter_map(|stop| {
                stop.parent_station_key
                    .clone()
                    .map(|parent| (parent, stop.original_stop_id.clone()))
            })
            .collect();

        let mut linked = 0usize;
        let mut dangling: Vec<String> = Vec::new();
        for (parent_key, child_original_id) in links {
            match self.stops.get_mut(&parent_key) {
                Some(parent) => {
                    parent.child_original_stop_ids.insert(child_original_id);
                    linked += 1;
                }
                None => dangling.push(child_original_id),
            }
        }
        log::info!("linked {} platforms to their parent stations", linked);

        if !dangling.is_empty() {
            log::warn!("{} stops reference an unknown parent station", dangling.len());
            for stop in self.stops.values_mut() {
                if dangling.contains(&stop.original_stop_id) {
                    stop.parent_station_key = None;
                }
            }
        }
    }

    /// Phase 3 for one operator: a second, read-only streaming pass over
    /// `stop_times.txt` wiring serving routes and realtime feed URLs onto
    /// each stop and its parent, plus the railroad train-number lookups.
    fn link_routes_and_feeds(
        &mut self,
        bundles: &BundlePaths,
        system: TransitSystem,
    ) -> Result<(), BuildError> {
        let dir = bundles.dir_for(system);
        let config = SystemConfig::of(system);

        let trips = &self.trips;
        let stops = &mut self.stops;
        read::for_each_row::<StopTimeRow, _>(&dir.join("stop_times.txt"), |row| {
            let Some(trip) = trips.get(&row.trip_id) else {
                return;
            };
            if trip.system != system {
                return;
            }
            let route_id = trip.original_route_id.clone();
            let feed_url = system::feed_url_for_route(system, &route_id);

            let stop_key = system.compose(&row.stop_id);
            let parent_key = stops
                .get(&stop_key)
                .and_then(|stop| stop.parent_station_key.clone());
            if let Some(stop) = stops.get_mut(&stop_key) {
                stop.served_by_original_route_ids.insert(route_id.clone());
                if let Some(url) = &feed_url {
                    stop.realtime_feed_urls.insert(url.clone());
                }
            }
            if let Some(parent_key) = parent_key {
                if let Some(parent) = stops.get_mut(&parent_key) {
                    parent.served_by_original_route_ids.insert(route_id);
                    if let Some(url) = feed_url {
                        parent.realtime_feed_urls.insert(url);
                    }
                }
            }
        })?;

        if config.uses_trip_short_name {
            for (trip_id, trip) in &self.trips {
                if trip.system != system {
                    continue;
                }
                if let Some(short_name) = &trip.short_name {
                    self.trips_by_short_name
                        .insert(short_name.clone(), trip_id.clone());
                    if config.matches_vehicle_label {
                        self.vehicle_trips
                            .insert(short_name.clone(), trip_id.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Phase 4: railroad timetable footnotes; the table is optional.
    fn load_notes(
        &mut self,
        bundles: &BundlePaths,
        system: TransitSystem,
    ) -> Result<(), BuildError> {
        let rows: Vec<NoteRow> =
            read::read_rows_optional(&bundles.dir_for(system).join("notes.txt"))?;
        for row in rows {
            self.notes.insert(
                row.id,
                Note {
                    mark: row.mark,
                    title: row.title,
                    description: row.description,
                },
            );
        }
        Ok(())
    }

    /// Phase 5: freeze. Verifies the cross-phase invariants, then hands the
    /// finished graph off as an immutable index.
    fn finish(mut self) -> Result<StaticIndex, BuildError> {
        let declared: HashSet<String> = system::declared_feed_urls().into_iter().collect();
        for stop in self.stops.values() {
            for url in &stop.realtime_feed_urls {
                if !declared.contains(url) {
                    return Err(BuildError::Invariant(format!(
                        "stop {} carries undeclared feed url {}",
                        stop.unique_key(),
                        url
                    )));
                }
            }
        }

        // a destination must name a stop of the same operator; clear it when
        // the bundle's stop_times reference a stop absent from stops.txt
        let stops = &self.stops;
        for (trip_id, trip) in self.trips.iter_mut() {
            let known = trip
                .destination_original_stop_id
                .as_ref()
                .map_or(true, |dest| stops.contains_key(&trip.system.compose(dest)));
            if !known {
                log::warn!("trip {} has an unknown destination stop, dropped", trip_id);
                trip.destination_original_stop_id = None;
            }
        }

        Ok(StaticIndex {
            stops: self.stops,
            routes: self.routes,
            trips: self.trips,
            stop_times_by_original_stop_id: self.stop_times_by_original_stop_id,
            trips_by_short_name: self.trips_by_short_name,
            vehicle_trips: self.vehicle_trips,
            notes: self.notes,
            calendar: self.calendar,
            last_refreshed: Local::now(),
        })
    }
}

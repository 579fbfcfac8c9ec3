use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as TimeDelta, Local, NaiveDate, TimeZone};
use gtfs::data_model::calendar::ServiceAvailability;
use gtfs::data_model::CalendarRow;
use gtfs::index::{IndexHandle, StaticIndex};
use gtfs::realtime::feed::{
    FeedEntity, FeedMessage, MtaRailroadStopTimeUpdate, StopTimeEvent, StopTimeUpdate,
    TripDescriptor, TripUpdate, VehicleDescriptor,
};
use model::{system, DepartureSource, StopInfo, StopTime, TransitSystem, TripInfo};

use crate::analytics::{AnalyticsSink, NoopAnalytics};
use crate::resolver::{Departures, RealtimeSource, SourceFilter};

fn fixed_now() -> DateTime<Local> {
    // a Monday at noon
    Local.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
}

fn offset(hours: i64, minutes: i64) -> TimeDelta {
    TimeDelta::hours(hours) + TimeDelta::minutes(minutes)
}

fn base_stop(system: TransitSystem, id: &str, name: &str) -> StopInfo {
    StopInfo {
        original_stop_id: id.to_owned(),
        name: name.to_owned(),
        latitude: None,
        longitude: None,
        system,
        parent_station_key: None,
        location_type: None,
        child_original_stop_ids: BTreeSet::new(),
        served_by_original_route_ids: BTreeSet::new(),
        realtime_feed_urls: BTreeSet::new(),
        borough: None,
        is_terminal: false,
        north_label: None,
        south_label: None,
        ada_status: None,
        ada_notes: None,
        wheelchair_boarding: None,
    }
}

fn trip(
    system: TransitSystem,
    route_id: &str,
    direction_id: Option<u8>,
    headsign: Option<&str>,
    short_name: Option<&str>,
    peak: Option<&str>,
    destination: Option<&str>,
) -> TripInfo {
    TripInfo {
        original_route_id: route_id.to_owned(),
        service_id: "WD".to_owned(),
        direction_id,
        headsign: headsign.map(str::to_owned),
        short_name: short_name.map(str::to_owned),
        peak_offpeak: peak.map(str::to_owned),
        destination_original_stop_id: destination.map(str::to_owned),
        system,
    }
}

fn all_days_service(service_id: &str) -> CalendarRow {
    let yes = ServiceAvailability::Available;
    CalendarRow {
        service_id: service_id.to_owned(),
        monday: yes,
        tuesday: yes,
        wednesday: yes,
        thursday: yes,
        friday: yes,
        saturday: yes,
        sunday: yes,
        start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
    }
}

fn l_feed() -> String {
    system::feed_url_for_route(TransitSystem::Subway, "L").unwrap()
}

fn m_feed() -> String {
    system::feed_url_for_route(TransitSystem::Subway, "M").unwrap()
}

fn lirr_feed() -> String {
    system::feed_url_for_route(TransitSystem::Lirr, "9").unwrap()
}

fn mnr_feed() -> String {
    system::feed_url_for_route(TransitSystem::Mnr, "H").unwrap()
}

/// A station (parent + `N`/`S` platforms) wired to one realtime feed.
fn add_subway_station(
    index: &mut StaticIndex,
    base: &str,
    name: &str,
    labels: (&str, &str),
    feed_url: &str,
) {
    let system = TransitSystem::Subway;
    let mut parent = base_stop(system, base, name);
    parent.north_label = Some(labels.0.to_owned());
    parent.south_label = Some(labels.1.to_owned());
    parent.location_type = Some(1);
    parent.realtime_feed_urls.insert(feed_url.to_owned());
    for suffix in ["N", "S"] {
        let platform_id = format!("{}{}", base, suffix);
        parent.child_original_stop_ids.insert(platform_id.clone());
        let mut platform = base_stop(system, &platform_id, name);
        platform.parent_station_key = Some(system.compose(base));
        platform.realtime_feed_urls.insert(feed_url.to_owned());
        index.stops.insert(platform.unique_key(), platform);
    }
    index.stops.insert(parent.unique_key(), parent);
}

fn test_index() -> StaticIndex {
    let mut index = StaticIndex::empty();

    // subway: the Canarsie line and the flipped corridor
    add_subway_station(&mut index, "L11", "Graham Av", ("Uptown", "Downtown"), &l_feed());
    add_subway_station(&mut index, "L10", "Lorimer St", ("Uptown", "Downtown"), &l_feed());
    add_subway_station(
        &mut index,
        "M13",
        "Fresh Pond Rd",
        ("Manhattan", "Middle Village"),
        &m_feed(),
    );
    add_subway_station(
        &mut index,
        "M11",
        "Myrtle Av",
        ("Manhattan", "Middle Village"),
        &m_feed(),
    );
    index.routes.insert(
        "SUBWAY-L".to_owned(),
        model::RouteInfo {
            original_route_id: "L".to_owned(),
            short_name: Some("L".to_owned()),
            long_name: Some("14 St-Canarsie Local".to_owned()),
            color: Some("A7A9AC".to_owned()),
            text_color: None,
            route_type: Some(1),
            system: TransitSystem::Subway,
        },
    );
    index.routes.insert(
        "SUBWAY-M".to_owned(),
        model::RouteInfo {
            original_route_id: "M".to_owned(),
            short_name: Some("M".to_owned()),
            long_name: Some("QNS Blvd-6th Av/Myrtle Local".to_owned()),
            color: Some("FF6319".to_owned()),
            text_color: None,
            route_type: Some(1),
            system: TransitSystem::Subway,
        },
    );
    index.trips.insert(
        "L-1200-N".to_owned(),
        trip(TransitSystem::Subway, "L", Some(0), Some("8 Av"), None, None, Some("L10N")),
    );
    index.trips.insert(
        "L-PASS".to_owned(),
        trip(TransitSystem::Subway, "L", Some(0), Some("8 Av"), None, None, None),
    );
    index.trips.insert(
        "L-SUN".to_owned(),
        TripInfo {
            service_id: "SU".to_owned(),
            ..trip(TransitSystem::Subway, "L", Some(0), Some("8 Av"), None, None, None)
        },
    );
    let l11n_times: &mut HashMap<String, StopTime> = index
        .stop_times_by_original_stop_id
        .entry("L11N".to_owned())
        .or_default();
    l11n_times.insert(
        "L-1200-N".to_owned(),
        StopTime {
            scheduled_arrival: Some(offset(12, 10)),
            scheduled_departure: Some(offset(12, 10)),
            stop_sequence: 1,
            track: None,
            pickup_type: Some(0),
            drop_off_type: Some(0),
            note_id: None,
        },
    );
    l11n_times.insert(
        "L-PASS".to_owned(),
        StopTime {
            scheduled_arrival: Some(offset(12, 15)),
            scheduled_departure: Some(offset(12, 15)),
            stop_sequence: 1,
            track: None,
            pickup_type: Some(1),
            drop_off_type: Some(0),
            note_id: None,
        },
    );
    l11n_times.insert(
        "L-SUN".to_owned(),
        StopTime {
            scheduled_arrival: Some(offset(12, 20)),
            scheduled_departure: Some(offset(12, 20)),
            stop_sequence: 1,
            track: None,
            pickup_type: Some(0),
            drop_off_type: Some(0),
            note_id: None,
        },
    );

    // lirr: Penn Station terminal
    let mut penn = base_stop(TransitSystem::Lirr, "237", "Penn Station");
    penn.is_terminal = true;
    penn.borough = Some("Manhattan".to_owned());
    penn.realtime_feed_urls.insert(lirr_feed());
    index.stops.insert(penn.unique_key(), penn);
    let mut great_neck = base_stop(TransitSystem::Lirr, "102", "Great Neck");
    great_neck.realtime_feed_urls.insert(lirr_feed());
    index.stops.insert(great_neck.unique_key(), great_neck);
    index.routes.insert(
        "LIRR-9".to_owned(),
        model::RouteInfo {
            original_route_id: "9".to_owned(),
            short_name: None,
            long_name: Some("Port Washington Branch".to_owned()),
            color: Some("808183".to_owned()),
            text_color: None,
            route_type: Some(2),
            system: TransitSystem::Lirr,
        },
    );
    index.trips.insert(
        "AM_8412_GCT".to_owned(),
        trip(
            TransitSystem::Lirr,
            "9",
            Some(1),
            Some("Penn Station"),
            Some("8412"),
            Some("1"),
            Some("237"),
        ),
    );
    index.trips.insert(
        "PM_9900_NYK".to_owned(),
        trip(
            TransitSystem::Lirr,
            "9",
            Some(0),
            Some("Great Neck"),
            Some("9900"),
            Some("0"),
            Some("102"),
        ),
    );
    index
        .trips_by_short_name
        .insert("8412".to_owned(), "AM_8412_GCT".to_owned());
    index
        .trips_by_short_name
        .insert("9900".to_owned(), "PM_9900_NYK".to_owned());
    let penn_times = index
        .stop_times_by_original_stop_id
        .entry("237".to_owned())
        .or_default();
    penn_times.insert(
        "AM_8412_GCT".to_owned(),
        StopTime {
            scheduled_arrival: Some(offset(12, 25)),
            scheduled_departure: None,
            stop_sequence: 10,
            track: Some("15".to_owned()),
            pickup_type: Some(0),
            drop_off_type: Some(0),
            note_id: Some("A".to_owned()),
        },
    );
    penn_times.insert(
        "PM_9900_NYK".to_owned(),
        StopTime {
            scheduled_arrival: Some(offset(12, 30)),
            scheduled_departure: Some(offset(12, 30)),
            stop_sequence: 1,
            track: Some("18".to_owned()),
            pickup_type: Some(0),
            drop_off_type: Some(0),
            note_id: None,
        },
    );
    index.notes.insert(
        "A".to_owned(),
        model::Note {
            mark: "*".to_owned(),
            title: "Peak".to_owned(),
            description: "Peak fares apply".to_owned(),
        },
    );

    // mnr: Grand Central terminal and Harlem-125 St
    let mut grand_central = base_stop(TransitSystem::Mnr, "1", "Grand Central");
    grand_central.is_terminal = true;
    grand_central.borough = Some("Manhattan".to_owned());
    grand_central.realtime_feed_urls.insert(mnr_feed());
    index.stops.insert(grand_central.unique_key(), grand_central);
    let mut harlem = base_stop(TransitSystem::Mnr, "4", "Harlem-125 St");
    harlem.realtime_feed_urls.insert(mnr_feed());
    index.stops.insert(harlem.unique_key(), harlem);
    index.routes.insert(
        "MNR-H".to_owned(),
        model::RouteInfo {
            original_route_id: "H".to_owned(),
            short_name: None,
            long_name: Some("Hudson".to_owned()),
            color: Some("009B3A".to_owned()),
            text_color: None,
            route_type: Some(2),
            system: TransitSystem::Mnr,
        },
    );
    index.trips.insert(
        "MNR_A".to_owned(),
        trip(
            TransitSystem::Mnr,
            "H",
            Some(1),
            Some("Grand Central"),
            Some("6500"),
            Some("1"),
            Some("1"),
        ),
    );
    index
        .trips_by_short_name
        .insert("6500".to_owned(), "MNR_A".to_owned());
    index
        .vehicle_trips
        .insert("6500".to_owned(), "MNR_A".to_owned());
    index
        .stop_times_by_original_stop_id
        .entry("1".to_owned())
        .or_default()
        .insert(
            "MNR_A".to_owned(),
            StopTime {
                scheduled_arrival: Some(offset(12, 30)),
                scheduled_departure: None,
                stop_sequence: 2,
                track: None,
                pickup_type: Some(0),
                drop_off_type: Some(0),
                note_id: None,
            },
        );

    for system in TransitSystem::ALL {
        index.calendar.add_rows(system, &[all_days_service("WD")], &[]);
    }

    index
}

struct StubSource {
    feeds: HashMap<String, Arc<FeedMessage>>,
}

#[async_trait]
impl RealtimeSource for StubSource {
    async fn fetch(&self, url: &str) -> Option<Arc<FeedMessage>> {
        self.feeds.get(url).cloned()
    }
}

fn service(index: StaticIndex, feeds: Vec<(String, FeedMessage)>) -> Departures {
    Departures::new(
        Arc::new(IndexHandle::new(index)),
        Arc::new(StubSource {
            feeds: feeds
                .into_iter()
                .map(|(url, feed)| (url, Arc::new(feed)))
                .collect(),
        }),
        Arc::new(NoopAnalytics),
    )
}

fn departure_event(time: DateTime<Local>) -> StopTimeEvent {
    StopTimeEvent {
        time: Some(time.timestamp()),
        ..Default::default()
    }
}

fn stu(stop_id: &str, sequence: u32, departure: Option<StopTimeEvent>, arrival: Option<StopTimeEvent>) -> StopTimeUpdate {
    StopTimeUpdate {
        stop_sequence: Some(sequence),
        stop_id: Some(stop_id.to_owned()),
        departure,
        arrival,
        ..Default::default()
    }
}

fn entity(
    trip_id: &str,
    route_id: &str,
    vehicle_label: Option<&str>,
    updates: Vec<StopTimeUpdate>,
) -> FeedEntity {
    FeedEntity {
        id: Some(trip_id.to_owned()),
        trip_update: Some(TripUpdate {
            trip: Some(TripDescriptor {
                trip_id: Some(trip_id.to_owned()),
                route_id: Some(route_id.to_owned()),
                ..Default::default()
            }),
            vehicle: vehicle_label.map(|label| VehicleDescriptor {
                id: None,
                label: Some(label.to_owned()),
            }),
            stop_time_update: updates,
            ..Default::default()
        }),
    }
}

fn feed(entities: Vec<FeedEntity>) -> FeedMessage {
    FeedMessage {
        header: None,
        entity: entities,
    }
}

// Scenario: subway station, live feed, limit window.
#[tokio::test]
async fn subway_realtime_is_windowed_sorted_and_labelled() {
    let now = fixed_now();
    let at = |seconds: i64| now + TimeDelta::seconds(seconds);

    let l_trains = feed(vec![
        entity(
            "L-A",
            "L",
            None,
            vec![
                stu("L11N", 1, Some(departure_event(at(120))), None),
                stu("L10N", 2, Some(departure_event(at(240))), None),
            ],
        ),
        entity(
            "L-B",
            "L",
            None,
            vec![
                stu("L11N", 1, Some(departure_event(at(720))), None),
                stu("L10N", 2, Some(departure_event(at(840))), None),
            ],
        ),
        entity(
            "L-C",
            "L",
            None,
            vec![
                stu("L11N", 1, Some(departure_event(at(2400))), None),
                stu("L10N", 2, Some(departure_event(at(2520))), None),
            ],
        ),
    ]);

    let resolver = service(test_index(), vec![(l_feed(), l_trains)]);
    let departures = resolver
        .departures_at("SUBWAY-L11", Some(30), None, now)
        .await;

    // the third trip is outside the 30-minute window
    assert_eq!(departures.len(), 2);
    assert!(departures
        .iter()
        .all(|d| d.source == DepartureSource::Realtime));
    // realtime output suppressed the scheduled fallback entirely
    assert!(departures.iter().all(|d| d.trip_id != "L-1200-N"));

    for departure in &departures {
        assert_eq!(departure.direction.label(), "Uptown");
        assert_eq!(departure.destination.as_deref(), Some("Lorimer St"));
        assert_eq!(departure.route_long_name.as_deref(), Some("14 St-Canarsie Local"));
        let when = departure.departure_time.unwrap();
        assert!(when >= now - TimeDelta::seconds(60));
        assert!(when <= now + TimeDelta::minutes(30));
    }
    assert!(departures[0].departure_time < departures[1].departure_time);
    assert_eq!(departures[0].status, "Approaching");
    assert_eq!(departures[1].status, "Scheduled");
}

// Scenario: a railroad terminal where the last stop has only an arrival.
#[tokio::test]
async fn railroad_terminal_arrival_substitutes_for_departure() {
    let now = fixed_now();
    let arrival = StopTimeEvent {
        time: Some((now + TimeDelta::minutes(20)).timestamp()),
        ..Default::default()
    };
    let mut terminal_update = stu("237", 10, None, Some(arrival));
    terminal_update.mta_railroad_stop_time_update = Some(MtaRailroadStopTimeUpdate {
        track: Some("15".to_owned()),
        train_status: Some("On Time".to_owned()),
    });

    let lirr_trains = feed(vec![entity(
        "08412",
        "9",
        None,
        vec![
            stu(
                "102",
                1,
                Some(departure_event(now + TimeDelta::minutes(5))),
                None,
            ),
            terminal_update,
        ],
    )]);

    let resolver = service(test_index(), vec![(lirr_feed(), lirr_trains)]);
    let departures = resolver
        .departures_at("LIRR-237", Some(60), None, now)
        .await;

    // the realtime trip id is normalized ("08412" → "8412"), and the static
    // trip with that train number is suppressed from the scheduled fallback
    assert_eq!(
        departures
            .iter()
            .filter(|d| d.trip_id == "AM_8412_GCT")
            .count(),
        0
    );
    let arrival_departure = departures
        .iter()
        .find(|d| d.trip_id == "8412")
        .expect("terminal arrival should be present");
    assert!(arrival_departure.is_terminal_arrival);
    assert_eq!(arrival_departure.source, DepartureSource::Realtime);
    assert_eq!(arrival_departure.track.as_deref(), Some("15"));
    assert_eq!(arrival_departure.train_status.as_deref(), Some("On Time"));
    assert_eq!(arrival_departure.destination.as_deref(), Some("Penn Station"));
    assert_eq!(
        arrival_departure.destination_borough.as_deref(),
        Some("Manhattan")
    );
}

// Scenario: Grand Central; one trip matched via the vehicle label, one with
// no static record at all, both inbound.
#[tokio::test]
async fn mnr_directions_from_static_and_terminal_inference() {
    let now = fixed_now();
    let at = |minutes: i64| now + TimeDelta::minutes(minutes);

    let arrival_with_delay = StopTimeEvent {
        time: Some(at(32).timestamp()),
        delay: Some(120),
        ..Default::default()
    };
    let mnr_trains = feed(vec![
        entity(
            "06500",
            "H",
            Some("6500"),
            vec![
                stu("4", 1, Some(departure_event(at(10))), None),
                stu("1", 2, None, Some(arrival_with_delay)),
            ],
        ),
        entity(
            "6600",
            "H",
            None,
            vec![
                stu("4", 1, Some(departure_event(at(5))), None),
                stu("1", 2, None, Some(StopTimeEvent {
                    time: Some(at(15).timestamp()),
                    ..Default::default()
                })),
            ],
        ),
    ]);

    let resolver = service(test_index(), vec![(mnr_feed(), mnr_trains)]);
    let departures = resolver.departures_at("MNR-1", Some(60), None, now).await;

    assert_eq!(departures.len(), 2);
    assert!(departures.iter().all(|d| d.direction.label() == "Inbound"));
    assert!(departures.iter().all(|d| d.is_terminal_arrival));
    // same direction, so ordered by time: the unmatched trip comes first
    assert_eq!(departures[0].trip_id, "6600");
    assert_eq!(departures[1].trip_id, "6500");

    let matched = &departures[1];
    // static match via the vehicle label: peak flag, schedule and delay
    assert_eq!(matched.peak_status.map(|p| p.as_str()), Some("Peak"));
    assert_eq!(matched.delay_minutes, Some(2));
    assert_eq!(matched.status, "Delayed 2 min");
    let scheduled = matched.departure_time.unwrap();
    assert_eq!(
        scheduled,
        now.date_naive()
            .and_hms_opt(12, 30, 0)
            .map(|naive| Local.from_local_datetime(&naive).unwrap())
            .unwrap()
    );
    assert_eq!(
        matched.estimated_departure_time.unwrap(),
        scheduled + TimeDelta::minutes(2)
    );

    let inferred = &departures[0];
    assert_eq!(inferred.delay_minutes, None);
    // destination falls back to the last stop by sequence
    assert_eq!(inferred.destination.as_deref(), Some("Grand Central"));
}

// Scenario: every feed is dark; the subway falls back to the timetable.
#[tokio::test]
async fn subway_scheduled_fallback_when_feeds_are_dark() {
    let now = fixed_now();
    let resolver = service(test_index(), Vec::new());
    let departures = resolver
        .departures_at("SUBWAY-L11", Some(30), None, now)
        .await;

    // pickup_type=1 and inactive services are filtered out
    assert_eq!(departures.len(), 1);
    let departure = &departures[0];
    assert_eq!(departure.trip_id, "L-1200-N");
    assert_eq!(departure.source, DepartureSource::Scheduled);
    assert_eq!(departure.status, "Scheduled");
    assert_eq!(departure.delay_minutes, None);
    assert_eq!(departure.direction.label(), "Uptown");
    assert_eq!(departure.destination.as_deref(), Some("8 Av"));
    assert_eq!(departure.departure_time, departure.estimated_departure_time);
}

// Scenario: the flipped corridor. The requested key, every update stop id
// and the derived direction all go through the platform-letter correction.
#[tokio::test]
async fn flipped_platform_rewrites_key_updates_and_direction() {
    let now = fixed_now();
    let at = |minutes: i64| now + TimeDelta::minutes(minutes);
    let m_trains = feed(vec![entity(
        "M-1",
        "M",
        None,
        vec![
            stu("M13N", 1, Some(departure_event(at(5))), None),
            stu("M11N", 2, Some(departure_event(at(10))), None),
        ],
    )]);

    let resolver = service(test_index(), vec![(m_feed(), m_trains)]);
    let departures = resolver
        .departures_at("SUBWAY-M13N", None, None, now)
        .await;

    assert_eq!(departures.len(), 1);
    let departure = &departures[0];
    // direction comes from the corrected platform, labelled by the parent's
    // south label
    assert_eq!(departure.direction.label(), "Middle Village");
    // destination is the last update by position, corrected, named by its
    // parent station
    assert_eq!(departure.destination.as_deref(), Some("Myrtle Av"));
}

#[tokio::test]
async fn an_empty_flip_list_disables_the_rewrite() {
    let now = fixed_now();
    let at = |minutes: i64| now + TimeDelta::minutes(minutes);
    let m_trains = feed(vec![entity(
        "M-1",
        "M",
        None,
        vec![stu("M13N", 1, Some(departure_event(at(5))), None)],
    )]);

    let resolver = service(test_index(), vec![(m_feed(), m_trains)])
        .with_flipped_platforms(Vec::new());
    let departures = resolver
        .departures_at("SUBWAY-M13N", None, None, now)
        .await;

    assert_eq!(departures.len(), 1);
    assert_eq!(departures[0].direction.label(), "Manhattan");
}

#[tokio::test]
async fn source_filter_and_direction_ordering() {
    let now = fixed_now();
    let arrival = StopTimeEvent {
        time: Some((now + TimeDelta::minutes(20)).timestamp()),
        ..Default::default()
    };
    let lirr_trains = feed(vec![entity(
        "08412",
        "9",
        None,
        vec![stu("237", 10, None, Some(arrival))],
    )]);

    let resolver = service(test_index(), vec![(lirr_feed(), lirr_trains)]);

    let merged = resolver.departures_at("LIRR-237", Some(60), None, now).await;
    assert_eq!(merged.len(), 2);
    // outbound scheduled sorts before the unmatched (unknown-direction)
    // realtime trip even though it departs later
    assert_eq!(merged[0].trip_id, "PM_9900_NYK");
    assert_eq!(merged[0].direction.label(), "Outbound");
    assert_eq!(merged[1].trip_id, "8412");

    let realtime_only = resolver
        .departures_at("LIRR-237", Some(60), Some(SourceFilter::Realtime), now)
        .await;
    assert_eq!(realtime_only.len(), 1);
    assert_eq!(realtime_only[0].trip_id, "8412");

    let scheduled_only = resolver
        .departures_at("LIRR-237", Some(60), Some(SourceFilter::Scheduled), now)
        .await;
    assert_eq!(scheduled_only.len(), 1);
    assert_eq!(scheduled_only[0].trip_id, "PM_9900_NYK");
    assert_eq!(scheduled_only[0].track.as_deref(), Some("18"));
    assert_eq!(scheduled_only[0].peak_status.map(|p| p.as_str()), Some("Off-Peak"));
}

#[tokio::test]
async fn a_departure_on_the_limit_boundary_is_kept() {
    let now = fixed_now();
    let l_trains = feed(vec![entity(
        "L-EDGE",
        "L",
        None,
        vec![stu(
            "L11N",
            1,
            Some(departure_event(now + TimeDelta::minutes(30))),
            None,
        )],
    )]);

    let resolver = service(test_index(), vec![(l_feed(), l_trains)]);
    let departures = resolver
        .departures_at("SUBWAY-L11", Some(30), None, now)
        .await;

    // the window is closed: landing exactly on the limit is still valid
    assert_eq!(departures.len(), 1);
    assert_eq!(departures[0].trip_id, "L-EDGE");
}

/// Stub that never answers for one URL, standing in for a stalled upstream.
struct SlowSource {
    feeds: HashMap<String, Arc<FeedMessage>>,
    stalled: String,
}

#[async_trait]
impl RealtimeSource for SlowSource {
    async fn fetch(&self, url: &str) -> Option<Arc<FeedMessage>> {
        if url == self.stalled {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.feeds.get(url).cloned()
    }
}

#[tokio::test]
async fn a_stalled_feed_does_not_discard_the_ones_that_answered() {
    let now = fixed_now();
    let at = |minutes: i64| now + TimeDelta::minutes(minutes);

    // a second feed serves the same station
    let mut index = test_index();
    let g_feed = system::feed_url_for_route(TransitSystem::Subway, "G").unwrap();
    for key in ["SUBWAY-L11", "SUBWAY-L11N", "SUBWAY-L11S"] {
        index
            .stops
            .get_mut(key)
            .unwrap()
            .realtime_feed_urls
            .insert(g_feed.clone());
    }

    let l_trains = feed(vec![entity(
        "L-A",
        "L",
        None,
        vec![
            stu("L11N", 1, Some(departure_event(at(5))), None),
            stu("L10N", 2, Some(departure_event(at(7))), None),
        ],
    )]);
    let g_trains = feed(vec![entity(
        "G-A",
        "G",
        None,
        vec![stu("L11N", 1, Some(departure_event(at(9))), None)],
    )]);

    let resolver = Departures::new(
        Arc::new(IndexHandle::new(index)),
        Arc::new(SlowSource {
            feeds: [
                (l_feed(), Arc::new(l_trains)),
                (g_feed.clone(), Arc::new(g_trains)),
            ]
            .into_iter()
            .collect(),
            stalled: g_feed,
        }),
        Arc::new(NoopAnalytics),
    )
    .with_request_deadline(Duration::from_millis(50));

    let departures = resolver
        .departures_at("SUBWAY-L11", Some(30), None, now)
        .await;

    // the stalled feed contributes nothing; the one that answered within the
    // deadline still does
    assert_eq!(departures.len(), 1);
    assert_eq!(departures[0].trip_id, "L-A");
    assert_eq!(departures[0].source, DepartureSource::Realtime);
}

#[tokio::test]
async fn unknown_station_yields_an_empty_list() {
    let resolver = service(test_index(), Vec::new());
    let departures = resolver
        .departures_at("SUBWAY-Z99", None, None, fixed_now())
        .await;
    assert!(departures.is_empty());
}

struct RecordingSink {
    lookups: Mutex<Vec<(TransitSystem, String, String)>>,
}

impl AnalyticsSink for RecordingSink {
    fn track_station_lookup(&self, system: TransitSystem, unique_key: &str, name: &str) {
        self.lookups.lock().unwrap().push((
            system,
            unique_key.to_owned(),
            name.to_owned(),
        ));
    }
}

#[tokio::test]
async fn every_lookup_reaches_the_analytics_sink() {
    let sink = Arc::new(RecordingSink {
        lookups: Mutex::new(Vec::new()),
    });
    let resolver = Departures::new(
        Arc::new(IndexHandle::new(test_index())),
        Arc::new(StubSource {
            feeds: HashMap::new(),
        }),
        Arc::clone(&sink) as Arc<dyn AnalyticsSink>,
    );

    resolver
        .departures_at("SUBWAY-L11", Some(10), None, fixed_now())
        .await;

    let lookups = sink.lookups.lock().unwrap();
    assert_eq!(lookups.len(), 1);
    assert_eq!(
        *lookups,
        vec![(
            TransitSystem::Subway,
            "SUBWAY-L11".to_owned(),
            "Graham Av".to_owned()
        )]
    );
}

#[tokio::test]
async fn station_directory_lists_and_searches_parents() {
    let resolver = service(test_index(), Vec::new());
    let stations = resolver.stations();
    assert!(stations.iter().all(|stop| stop.parent_station_key.is_none()));
    assert!(stations.iter().any(|stop| stop.name == "Grand Central"));

    let matches = resolver.find_stations_by_name("grand");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].unique_key(), "MNR-1");
}

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as TimeDelta, Local, NaiveDate, TimeZone};
use gtfs::index::IndexHandle;
use gtfs::realtime::{FeedFetcher, FeedMessage};
use model::{system, Departure, DepartureSource, StopInfo};

use crate::analytics::AnalyticsSink;
use crate::config::DEFAULT_FLIPPED_PLATFORM_STOPS;

mod platform;
mod realtime;
mod scheduled;

#[cfg(test)]
mod tests;

/// Restricts the output to one side of the realtime/scheduled merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFilter {
    Realtime,
    Scheduled,
}

impl FromStr for SourceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "realtime" => Ok(Self::Realtime),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(format!("unknown source filter \"{}\"", other)),
        }
    }
}

/// Where realtime feeds come from. The production implementation is the
/// cached HTTP fetcher; tests substitute canned messages.
#[async_trait]
pub trait RealtimeSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<Arc<FeedMessage>>;
}

#[async_trait]
impl RealtimeSource for FeedFetcher {
    async fn fetch(&self, url: &str) -> Option<Arc<FeedMessage>> {
        FeedFetcher::fetch(self, url).await
    }
}

/// The validity window for departure instants:
/// `[now − 60 s, now + limit·60 s]`, closed on both ends and unbounded above
/// without a limit.
pub(crate) struct Window {
    earliest: DateTime<Local>,
    latest: Option<DateTime<Local>>,
}

impl Window {
    pub(crate) fn new(now: DateTime<Local>, limit_minutes: Option<u32>) -> Self {
        Self {
            earliest: now - TimeDelta::seconds(60),
            latest: limit_minutes
                .map(|minutes| now + TimeDelta::seconds(i64::from(minutes) * 60)),
        }
    }

    pub(crate) fn contains(&self, when: DateTime<Local>) -> bool {
        when >= self.earliest && self.latest.map_or(true, |latest| when <= latest)
    }
}

/// Combines a civil date with a service-day clock offset. Offsets of 24
/// hours and more land on the next day.
pub(crate) fn compose_service_time(
    date: NaiveDate,
    offset: TimeDelta,
) -> Option<DateTime<Local>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local.from_local_datetime(&(midnight + offset)).earliest()
}

/// Rider-facing status line. A known delay wins; otherwise proximity of the
/// realtime prediction decides.
pub(crate) fn status_string(
    delay_minutes: Option<i64>,
    predicted: Option<DateTime<Local>>,
    now: DateTime<Local>,
) -> String {
    if let Some(delay) = delay_minutes {
        if delay.abs() <= 1 {
            "On Time".to_owned()
        } else if delay > 1 {
            format!("Delayed {} min", delay)
        } else {
            format!("Early {} min", -delay)
        }
    } else if let Some(predicted) = predicted {
        let seconds = (predicted - now).num_seconds();
        if (-30..=30).contains(&seconds) {
            "Due".to_owned()
        } else if (30..=120).contains(&seconds) {
            "Approaching".to_owned()
        } else {
            "Scheduled".to_owned()
        }
    } else {
        "Scheduled".to_owned()
    }
}

/// The departure resolver: merges realtime trip updates with the scheduled
/// timetable for one station per request.
pub struct Departures {
    index: Arc<IndexHandle>,
    realtime: Arc<dyn RealtimeSource>,
    analytics: Arc<dyn AnalyticsSink>,
    request_deadline: Duration,
    flipped_platform_stops: Vec<String>,
}

impl Departures {
    pub fn new(
        index: Arc<IndexHandle>,
        realtime: Arc<dyn RealtimeSource>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            index,
            realtime,
            analytics,
            request_deadline: Duration::from_secs(30),
            flipped_platform_stops: DEFAULT_FLIPPED_PLATFORM_STOPS
                .iter()
                .map(|id| (*id).to_owned())
                .collect(),
        }
    }

    pub fn with_request_deadline(mut self, deadline: Duration) -> Self {
        self.request_deadline = deadline;
        self
    }

    pub fn with_flipped_platforms(mut self, stops: Vec<String>) -> Self {
        self.flipped_platform_stops = stops;
        self
    }

    /// Upcoming departures from the station named by `station_key`, ordered
    /// by direction and departure time. An unknown key yields an empty list.
    pub async fn departures_for_station(
        &self,
        station_key: &str,
        limit_minutes: Option<u32>,
        source_filter: Option<SourceFilter>,
    ) -> Vec<Departure> {
        self.departures_at(station_key, limit_minutes, source_filter, Local::now())
            .await
    }

    pub(crate) async fn departures_at(
        &self,
        station_key: &str,
        limit_minutes: Option<u32>,
        source_filter: Option<SourceFilter>,
        now: DateTime<Local>,
    ) -> Vec<Departure> {
        let index = self.index.load();

        // platform-letter workaround prelude: the requested key itself may
        // name a flipped platform
        let station_key =
            platform::rewrite_station_key(&self.flipped_platform_stops, station_key);
        let Some(station) = index.stop(&station_key) else {
            log::warn!("station {} is not in the index", station_key);
            return Vec::new();
        };
        self.analytics
            .track_station_lookup(station.system, &station_key, &station.name);

        let candidates: HashSet<String> =
            station.candidate_original_ids().into_iter().collect();
        let window = Window::new(now, limit_minutes);

        // each fetch races the request deadline on its own, so one stalled
        // feed cannot discard the ones that already answered
        let deadline = self.request_deadline;
        let fetches = station.realtime_feed_urls.iter().map(|url| {
            let source = Arc::clone(&self.realtime);
            async move {
                let feed = match tokio::time::timeout(deadline, source.fetch(url)).await {
                    Ok(feed) => feed,
                    Err(_) => {
                        log::warn!("request deadline expired fetching feed {}", url);
                        None
                    }
                };
                (url.clone(), feed)
            }
        });
        let feeds = futures::future::join_all(fetches).await;

        let mut processed: HashSet<String> = HashSet::new();
        let mut departures: Vec<Departure> = Vec::new();
        for (url, feed) in feeds {
            let Some(feed) = feed else { continue };
            let Some(feed_system) = system::system_for_feed_url(&url) else {
                log::warn!("cannot derive a system from feed url {}", url);
                continue;
            };
            realtime::process_feed(
                &realtime::FeedContext {
                    index: &index,
                    station,
                    candidates: &candidates,
                    window: &window,
                    now,
                    flipped: &self.flipped_platform_stops,
                },
                &feed,
                feed_system,
                &mut processed,
                &mut departures,
            );
        }

        // the railroads always merge the timetable in; the subway falls back
        // to it only when realtime produced nothing
        if station.system.is_commuter_rail() || departures.is_empty() {
            scheduled::append_scheduled(
                &index,
                station,
                &candidates,
                &processed,
                &window,
                now,
                &mut departures,
            );
        }

        if let Some(filter) = source_filter {
            departures.retain(|departure| match filter {
                SourceFilter::Realtime => departure.source == DepartureSource::Realtime,
                SourceFilter::Scheduled => departure.source == DepartureSource::Scheduled,
            });
        }
        departures.sort_by(Departure::cmp_for_output);
        departures
    }

    /// All parent-level stations of the index.
    pub fn stations(&self) -> Vec<StopInfo> {
        let index = self.index.load();
        let mut stations: Vec<StopInfo> = index
            .stops
            .values()
            .filter(|stop| stop.parent_station_key.is_none())
            .cloned()
            .collect();
        stations.sort_by(|a, b| a.name.cmp(&b.name));
        stations
    }

    /// Case-insensitive substring search over station names.
    pub fn find_stations_by_name(&self, pattern: &str) -> Vec<StopInfo> {
        let needle = pattern.to_lowercase();
        self.stations()
            .into_iter()
            .filter(|stop| stop.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn last_refreshed(&self) -> DateTime<Local> {
        self.index.load().last_refreshed
    }
}

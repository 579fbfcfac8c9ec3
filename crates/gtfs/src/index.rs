use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Local};
use model::{Note, RouteInfo, StopInfo, StopTime, TripInfo};

use crate::calendar::ServiceCalendar;

/// The compiled cross-system graph. Immutable after publication; readers
/// share it freely for the duration of one request.
pub struct StaticIndex {
    /// Stops keyed by unique key.
    pub stops: HashMap<String, StopInfo>,
    /// Routes keyed by unique key.
    pub routes: HashMap<String, RouteInfo>,
    /// Trips keyed by raw trip id.
    pub trips: HashMap<String, TripInfo>,
    /// Two-level inverted index: original stop id → trip id → stop time.
    pub stop_times_by_original_stop_id: HashMap<String, HashMap<String, StopTime>>,
    /// Train number → trip id; railroads only.
    pub trips_by_short_name: HashMap<String, String>,
    /// Realtime vehicle label → trip id, for the railroad whose vehicle
    /// labels carry the train number.
    pub vehicle_trips: HashMap<String, String>,
    /// Timetable footnotes keyed by note id.
    pub notes: HashMap<String, Note>,
    pub calendar: ServiceCalendar,
    pub last_refreshed: DateTime<Local>,
}

impl StaticIndex {
    pub fn empty() -> Self {
        Self {
            stops: HashMap::new(),
            routes: HashMap::new(),
            trips: HashMap::new(),
            stop_times_by_original_stop_id: HashMap::new(),
            trips_by_short_name: HashMap::new(),
            vehicle_trips: HashMap::new(),
            notes: HashMap::new(),
            calendar: ServiceCalendar::new(),
            last_refreshed: Local::now(),
        }
    }

    pub fn stop(&self, unique_key: &str) -> Option<&StopInfo> {
        self.stops.get(unique_key)
    }

    pub fn route(&self, unique_key: &str) -> Option<&RouteInfo> {
        self.routes.get(unique_key)
    }

    /// Static stop time for a (stop, trip) pair, matched by original id.
    pub fn stop_time(&self, original_stop_id: &str, trip_id: &str) -> Option<&StopTime> {
        self.stop_times_by_original_stop_id
            .get(original_stop_id)?
            .get(trip_id)
    }

    pub fn note_text(&self, note_id: &str) -> Option<&str> {
        self.notes.get(note_id).map(|note| note.description.as_str())
    }
}

/// Shared handle to the live index. Publication is a single pointer swap;
/// a rebuild that fails never reaches [`IndexHandle::publish`], so readers
/// keep the previous index.
pub struct IndexHandle {
    inner: RwLock<Arc<StaticIndex>>,
}

impl IndexHandle {
    pub fn new(index: StaticIndex) -> Self {
        Self {
            inner: RwLock::new(Arc::new(index)),
        }
    }

    /// The currently published index. The returned reference stays valid for
    /// the whole request even if a rebuild publishes a newer one meanwhile.
    pub fn load(&self) -> Arc<StaticIndex> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn publish(&self, index: StaticIndex) {
        let index = Arc::new(index);
        match self.inner.write() {
            Ok(mut guard) => *guard = index,
            Err(poisoned) => *poisoned.into_inner() = index,
        }
    }
}

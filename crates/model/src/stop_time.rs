use chrono::Duration;

/// One scheduled stop of a trip, held in the two-level index
/// `stop_times_by_original_stop_id[original_stop_id][trip_id]`.
///
/// Clock values are offsets from the start of the service day; hours may
/// exceed 24 to denote the next civil day.
#[derive(Debug, Clone)]
pub struct StopTime {
    pub scheduled_arrival: Option<Duration>,
    pub scheduled_departure: Option<Duration>,
    pub stop_sequence: u32,
    pub track: Option<String>,
    pub pickup_type: Option<u8>,
    pub drop_off_type: Option<u8>,
    pub note_id: Option<String>,
}

impl StopTime {
    /// `pickup_type == 1` marks a stop a trip passes without boarding.
    pub fn allows_pickup(&self) -> bool {
        self.pickup_type != Some(1)
    }
}

/// Timetable footnote, commuter rail only.
#[derive(Debug, Clone)]
pub struct Note {
    pub mark: String,
    pub title: String,
    pub description: String,
}

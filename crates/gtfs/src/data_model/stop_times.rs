use chrono::Duration;
use serde::Deserialize;
use utility::serde::{clock_time, deserialize_non_empty};

/// One row of `stop_times.txt`.
///
/// This is by far the largest table; it is only ever read in streaming
/// passes so peak memory stays bounded. Clock values may exceed `24:00:00`
/// to denote the next civil day.
/// See <https://gtfs.org/schedule/reference/#stop_timestxt>
#[derive(Debug, Clone, Deserialize)]
pub struct StopTimeRow {
    pub trip_id: String,

    pub stop_id: String,

    #[serde(default, deserialize_with = "clock_time::deserialize_option")]
    pub arrival_time: Option<Duration>,

    #[serde(default, deserialize_with = "clock_time::deserialize_option")]
    pub departure_time: Option<Duration>,

    pub stop_sequence: u32,

    /// Scheduled track; railroad bundles only.
    #[serde(default, deserialize_with = "deserialize_non_empty")]
    pub track: Option<String>,

    /// `1` means the trip passes without boarding.
    #[serde(default)]
    pub pickup_type: Option<u8>,

    #[serde(default)]
    pub drop_off_type: Option<u8>,

    /// Timetable footnote reference; railroad bundles only.
    #[serde(default, deserialize_with = "deserialize_non_empty")]
    pub note_id: Option<String>,
}

use chrono::NaiveDate;
use serde::Deserialize;
use serde_repr::Deserialize_repr;
use utility::serde::date::deserialize_yyyymmdd;

/// Whether a calendar exception adds or removes service on its date.
#[derive(Deserialize_repr, PartialEq, Debug, Clone, Copy)]
#[repr(u8)]
pub enum ExceptionType {
    ServiceAdded = 1,
    ServiceRemoved = 2,
}

/// One row of `calendar_dates.txt`: a per-date exception to the weekly
/// patterns of `calendar.txt`.
/// See <https://gtfs.org/schedule/reference/#calendar_datestxt>
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarDateRow {
    pub service_id: String,

    #[serde(deserialize_with = "deserialize_yyyymmdd")]
    pub date: NaiveDate,

    pub exception_type: ExceptionType,
}

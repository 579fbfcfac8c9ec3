use chrono::NaiveDate;
use serde::Deserialize;
use serde_repr::Deserialize_repr;
use utility::serde::date::deserialize_yyyymmdd;

/// Whether a service runs on a given weekday of its date range.
#[derive(Deserialize_repr, PartialEq, Debug, Clone, Copy)]
#[repr(u8)]
pub enum ServiceAvailability {
    Unavailable = 0,
    Available = 1,
}

impl ServiceAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// One row of `calendar.txt`: a weekly service pattern with a date range.
/// See <https://gtfs.org/schedule/reference/#calendartxt>
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarRow {
    pub service_id: String,

    pub monday: ServiceAvailability,
    pub tuesday: ServiceAvailability,
    pub wednesday: ServiceAvailability,
    pub thursday: ServiceAvailability,
    pub friday: ServiceAvailability,
    pub saturday: ServiceAvailability,
    pub sunday: ServiceAvailability,

    #[serde(deserialize_with = "deserialize_yyyymmdd")]
    pub start_date: NaiveDate,

    /// Inclusive end of the service interval.
    #[serde(deserialize_with = "deserialize_yyyymmdd")]
    pub end_date: NaiveDate,
}

impl CalendarRow {
    /// Weekday availability indexed Monday..Sunday.
    pub fn weekdays(&self) -> [bool; 7] {
        [
            self.monday.is_available(),
            self.tuesday.is_available(),
            self.wednesday.is_available(),
            self.thursday.is_available(),
            self.friday.is_available(),
            self.saturday.is_available(),
            self.sunday.is_available(),
        ]
    }
}

//! Typed rows of the static feed tables. Field names follow the
//! transit-feed-spec column names via serde renames; optional columns
//! default to `None` so bundles with differing column sets all parse.

pub mod calendar;
pub mod calendar_dates;
pub mod notes;
pub mod routes;
pub mod stations;
pub mod stop_times;
pub mod stops;
pub mod trips;

pub use calendar::CalendarRow;
pub use calendar_dates::{CalendarDateRow, ExceptionType};
pub use notes::NoteRow;
pub use routes::RouteRow;
pub use stations::StationRow;
pub use stop_times::StopTimeRow;
pub use stops::StopRow;
pub use trips::TripRow;

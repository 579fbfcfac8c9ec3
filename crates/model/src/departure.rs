use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

use crate::TransitSystem;

/// Which side of the merge a departure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepartureSource {
    Realtime,
    Scheduled,
}

/// Fare-class flag on commuter-rail trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakStatus {
    Peak,
    OffPeak,
}

impl PeakStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Peak => "Peak",
            Self::OffPeak => "Off-Peak",
        }
    }

    /// Maps the static table's `"1"`/`"0"` flag.
    pub fn from_flag(flag: Option<&str>) -> Option<PeakStatus> {
        match flag {
            Some("1") => Some(Self::Peak),
            Some("0") => Some(Self::OffPeak),
            _ => None,
        }
    }
}

impl Serialize for PeakStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Travel direction of a departure.
///
/// Carries both the rider-facing label and the semantic kind; output is the
/// label alone, while ordering ranks by kind so that e.g. "Uptown" and "N"
/// group together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Northbound platform; the label is the parent station's north label
    /// when one exists (e.g. "Uptown").
    North(Option<String>),
    /// Southbound platform, labelled by the parent's south label.
    South(Option<String>),
    Inbound,
    Outbound,
    Unknown,
    Other(String),
}

impl Direction {
    pub fn label(&self) -> &str {
        match self {
            Self::North(label) => label.as_deref().unwrap_or("N"),
            Self::South(label) => label.as_deref().unwrap_or("S"),
            Self::Inbound => "Inbound",
            Self::Outbound => "Outbound",
            Self::Unknown => "Unknown",
            Self::Other(label) => label,
        }
    }

    /// Output ordering: N/Uptown, S/Downtown, Inbound, Outbound, Unknown,
    /// anything else.
    pub fn rank(&self) -> u8 {
        match self {
            Self::North(_) => 0,
            Self::South(_) => 1,
            Self::Inbound => 2,
            Self::Outbound => 3,
            Self::Unknown => 4,
            Self::Other(_) => 5,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One upcoming departure from a station, assembled per request.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    pub trip_id: String,
    /// Unique route key.
    pub route_id: Option<String>,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub route_color: Option<String>,
    pub destination: Option<String>,
    pub destination_borough: Option<String>,
    pub direction: Direction,
    /// Scheduled departure instant.
    pub departure_time: Option<DateTime<Local>>,
    /// Scheduled instant shifted by the reported delay.
    pub estimated_departure_time: Option<DateTime<Local>>,
    pub delay_minutes: Option<i64>,
    pub track: Option<String>,
    pub status: String,
    pub peak_status: Option<PeakStatus>,
    pub system: TransitSystem,
    pub is_terminal_arrival: bool,
    pub source: DepartureSource,
    /// Commuter-rail extension status string, verbatim from the feed.
    pub train_status: Option<String>,
    pub pickup_type: Option<u8>,
    pub drop_off_type: Option<u8>,
    pub note_id: Option<String>,
    pub note_text: Option<String>,
}

impl Departure {
    /// Stable output order: direction rank, then departure time ascending
    /// with missing times last.
    pub fn cmp_for_output(&self, other: &Departure) -> Ordering {
        self.direction
            .rank()
            .cmp(&other.direction.rank())
            .then_with(|| match (&self.departure_time, &other.departure_time) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}

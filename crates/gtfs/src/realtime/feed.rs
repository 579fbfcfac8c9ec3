//! Realtime message model: the transit-realtime trip-update subset plus the
//! two operator extension namespaces, vendored as `prost::Message` derives
//! so decoding needs no build-time code generation.
//!
//! Extension fields of the upstream schema appear here as optional nested
//! records on their extended message (tags 1001 and 1005), so consumers
//! reach them as ordinary optional fields. Unknown fields are skipped by
//! the decoder, which keeps this subset forward-compatible with the full
//! upstream schema.

/// Trip-level direction values of the rapid-transit extension.
pub const NYCT_DIRECTION_NORTH: u32 = 1;
pub const NYCT_DIRECTION_SOUTH: u32 = 3;

#[derive(Clone, PartialEq, prost::Message)]
pub struct FeedMessage {
    #[prost(message, optional, tag = "1")]
    pub header: Option<FeedHeader>,
    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FeedHeader {
    #[prost(string, optional, tag = "1")]
    pub gtfs_realtime_version: Option<String>,
    #[prost(uint64, optional, tag = "3")]
    pub timestamp: Option<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FeedEntity {
    #[prost(string, optional, tag = "1")]
    pub id: Option<String>,
    #[prost(message, optional, tag = "3")]
    pub trip_update: Option<TripUpdate>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TripUpdate {
    #[prost(message, optional, tag = "1")]
    pub trip: Option<TripDescriptor>,
    #[prost(message, repeated, tag = "2")]
    pub stop_time_update: Vec<StopTimeUpdate>,
    #[prost(message, optional, tag = "3")]
    pub vehicle: Option<VehicleDescriptor>,
    #[prost(uint64, optional, tag = "4")]
    pub timestamp: Option<u64>,
    #[prost(int32, optional, tag = "5")]
    pub delay: Option<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TripDescriptor {
    #[prost(string, optional, tag = "1")]
    pub trip_id: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub start_time: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub start_date: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub route_id: Option<String>,
    #[prost(uint32, optional, tag = "6")]
    pub direction_id: Option<u32>,
    /// Rapid-transit extension on the trip descriptor.
    #[prost(message, optional, tag = "1001")]
    pub nyct_trip_descriptor: Option<NyctTripDescriptor>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NyctTripDescriptor {
    /// Operator-internal train identifier.
    #[prost(string, optional, tag = "1")]
    pub train_id: Option<String>,
    #[prost(bool, optional, tag = "2")]
    pub is_assigned: Option<bool>,
    /// `1` north, `3` south; see the direction constants above.
    #[prost(uint32, optional, tag = "3")]
    pub direction: Option<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct VehicleDescriptor {
    #[prost(string, optional, tag = "1")]
    pub id: Option<String>,
    /// Rider-visible label; on one railroad this is the train number.
    #[prost(string, optional, tag = "2")]
    pub label: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StopTimeUpdate {
    #[prost(uint32, optional, tag = "1")]
    pub stop_sequence: Option<u32>,
    #[prost(message, optional, tag = "2")]
    pub arrival: Option<StopTimeEvent>,
    #[prost(message, optional, tag = "3")]
    pub departure: Option<StopTimeEvent>,
    #[prost(string, optional, tag = "4")]
    pub stop_id: Option<String>,
    /// Rapid-transit extension carrying the worked track.
    #[prost(message, optional, tag = "1001")]
    pub nyct_stop_time_update: Option<NyctStopTimeUpdate>,
    /// Railroad extension carrying track and train status.
    #[prost(message, optional, tag = "1005")]
    pub mta_railroad_stop_time_update: Option<MtaRailroadStopTimeUpdate>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StopTimeEvent {
    #[prost(int32, optional, tag = "1")]
    pub delay: Option<i32>,
    /// POSIX timestamp of the predicted event.
    #[prost(int64, optional, tag = "2")]
    pub time: Option<i64>,
    #[prost(int32, optional, tag = "3")]
    pub uncertainty: Option<i32>,
    /// Nonstandard field some railroad feeds emit on the event itself;
    /// only used as a last-resort track fallback.
    #[prost(string, optional, tag = "4")]
    pub track: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NyctStopTimeUpdate {
    #[prost(string, optional, tag = "1")]
    pub scheduled_track: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub actual_track: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MtaRailroadStopTimeUpdate {
    #[prost(string, optional, tag = "1")]
    pub track: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub train_status: Option<String>,
}

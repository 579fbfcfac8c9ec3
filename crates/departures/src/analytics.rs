use model::TransitSystem;

/// Station-lookup counter hook, invoked on every departures request. The
/// real sink (a metrics pipeline, a usage dashboard) lives outside this
/// crate; it must never block the request path.
pub trait AnalyticsSink: Send + Sync {
    fn track_station_lookup(&self, system: TransitSystem, unique_key: &str, name: &str);
}

/// Drops every event.
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn track_station_lookup(&self, _system: TransitSystem, _unique_key: &str, _name: &str) {}
}

/// Writes lookups to the log; the binary's default sink.
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn track_station_lookup(&self, system: TransitSystem, unique_key: &str, name: &str) {
        log::debug!("station lookup: {} {} ({})", system, unique_key, name);
    }
}

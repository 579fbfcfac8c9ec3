pub mod analytics;
pub mod config;
pub mod resolver;

pub use analytics::{AnalyticsSink, LogAnalytics, NoopAnalytics};
pub use config::Config;
pub use resolver::{Departures, RealtimeSource, SourceFilter};

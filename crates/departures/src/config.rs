use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use gtfs::BundlePaths;
use model::TransitSystem;

/// Subway platforms on the corridor whose directional letters are inverted
/// in the upstream feed. Overridable (including to empty, once the upstream
/// bug is fixed) via `DEPARTURES_FLIPPED_PLATFORMS`.
pub const DEFAULT_FLIPPED_PLATFORM_STOPS: [&str; 6] =
    ["M11", "M12", "M13", "M14", "M16", "M18"];

const DEFAULT_SUBWAY_ZIP: &str = "https://rrgtfsfeeds.s3.amazonaws.com/gtfs_subway.zip";
const DEFAULT_LIRR_ZIP: &str = "https://rrgtfsfeeds.s3.amazonaws.com/gtfslirr.zip";
const DEFAULT_MNR_ZIP: &str = "https://rrgtfsfeeds.s3.amazonaws.com/gtfsmnr.zip";

#[derive(Debug)]
pub enum ConfigError {
    Invalid { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { variable, value } => {
                write!(f, "invalid value \"{}\" for {}", value, variable)
            }
        }
    }
}

impl Error for ConfigError {}

/// Process configuration, read once from the environment at startup. There
/// is no mutable configuration at runtime; changes take a restart or a
/// bundle refresh.
#[derive(Debug, Clone)]
pub struct Config {
    pub bundles: BundlePaths,
    /// Static archive per operator, fetched by the refresh orchestrator.
    pub zip_urls: Vec<(TransitSystem, String)>,
    pub refresh_schedule: String,
    pub geo_file: Option<PathBuf>,
    /// Feature property carrying the borough name in the geodata.
    pub borough_property: String,
    pub feed_cache_ttl: Duration,
    pub feed_cache_max_entries: usize,
    pub request_deadline: Duration,
    pub flipped_platform_stops: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(var_or("DEPARTURES_DATA_DIR", "./data"));

        let bundles = BundlePaths {
            subway_dir: data_dir.join("subway"),
            lirr_dir: data_dir.join("lirr"),
            mnr_dir: data_dir.join("mnr"),
            stations_file: Some(PathBuf::from(var_or(
                "DEPARTURES_STATIONS_FILE",
                data_dir.join("stations.csv").to_string_lossy().as_ref(),
            ))),
        };

        let zip_urls = vec![
            (
                TransitSystem::Subway,
                var_or("DEPARTURES_SUBWAY_ZIP_URL", DEFAULT_SUBWAY_ZIP),
            ),
            (
                TransitSystem::Lirr,
                var_or("DEPARTURES_LIRR_ZIP_URL", DEFAULT_LIRR_ZIP),
            ),
            (
                TransitSystem::Mnr,
                var_or("DEPARTURES_MNR_ZIP_URL", DEFAULT_MNR_ZIP),
            ),
        ];

        Ok(Self {
            bundles,
            zip_urls,
            // daily, in the small hours
            refresh_schedule: var_or("DEPARTURES_REFRESH_CRON", "0 30 3 * * *"),
            geo_file: std::env::var("DEPARTURES_GEO_FILE").ok().map(PathBuf::from),
            borough_property: var_or("DEPARTURES_BOROUGH_PROPERTY", "boro_name"),
            feed_cache_ttl: Duration::from_secs(parse_var(
                "DEPARTURES_FEED_TTL_SECS",
                30,
            )?),
            feed_cache_max_entries: parse_var("DEPARTURES_FEED_CACHE_MAX", 16)? as usize,
            request_deadline: Duration::from_secs(parse_var(
                "DEPARTURES_REQUEST_DEADLINE_SECS",
                30,
            )?),
            flipped_platform_stops: flipped_platforms_from_env(),
        })
    }
}

fn var_or(variable: &str, default: &str) -> String {
    std::env::var(variable).unwrap_or_else(|_| default.to_owned())
}

fn parse_var(variable: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(variable) {
        Err(_) => Ok(default),
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
            variable,
            value,
        }),
    }
}

fn flipped_platforms_from_env() -> Vec<String> {
    match std::env::var("DEPARTURES_FLIPPED_PLATFORMS") {
        Err(_) => DEFAULT_FLIPPED_PLATFORM_STOPS
            .iter()
            .map(|id| (*id).to_owned())
            .collect(),
        // an empty override turns the rewrite off entirely
        Ok(value) => value
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .collect(),
    }
}

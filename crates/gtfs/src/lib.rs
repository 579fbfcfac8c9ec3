use std::path::{Path, PathBuf};

use model::TransitSystem;

pub mod calendar;
pub mod compiler;
pub mod data_model;
pub mod index;
pub mod read;
pub mod realtime;
pub mod refresh;

pub use compiler::{build_index, BuildError};
pub use index::{IndexHandle, StaticIndex};

/// On-disk layout of the three static feed bundles plus the curated station
/// CSV. Each bundle directory holds the standard transit-feed tables
/// (`routes.txt`, `stops.txt`, `trips.txt`, `stop_times.txt`, `calendar.txt`,
/// `calendar_dates.txt`, optionally `notes.txt`).
#[derive(Debug, Clone)]
pub struct BundlePaths {
    pub subway_dir: PathBuf,
    pub lirr_dir: PathBuf,
    pub mnr_dir: PathBuf,
    /// Curated station metadata enriching subway stops; optional.
    pub stations_file: Option<PathBuf>,
}

impl BundlePaths {
    pub fn dir_for(&self, system: TransitSystem) -> &Path {
        match system {
            TransitSystem::Subway => &self.subway_dir,
            TransitSystem::Lirr => &self.lirr_dir,
            TransitSystem::Mnr => &self.mnr_dir,
        }
    }
}

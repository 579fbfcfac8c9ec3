use std::error::Error;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, copy, Cursor};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use cron::Schedule;
use model::TransitSystem;
use utility::geo::RegionLocator;

use crate::compiler::{build_index, BuildError};
use crate::index::IndexHandle;
use crate::BundlePaths;

#[derive(Debug)]
pub enum RefreshError {
    /// A refresh is already running; concurrent invocations are rejected.
    AlreadyRunning,
    BadSchedule(cron::error::Error),
    Http(reqwest::Error),
    Io(io::Error),
    Zip(zip::result::ZipError),
    Build(BuildError),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "a bundle refresh is already running"),
            Self::BadSchedule(why) => write!(f, "invalid refresh schedule: {}", why),
            Self::Http(why) => write!(f, "bundle download failed: {}", why),
            Self::Io(why) => write!(f, "bundle refresh io error: {}", why),
            Self::Zip(why) => write!(f, "bundle archive unreadable: {}", why),
            Self::Build(why) => write!(f, "index rebuild failed: {}", why),
        }
    }
}

impl Error for RefreshError {}

impl From<reqwest::Error> for RefreshError {
    fn from(why: reqwest::Error) -> Self {
        Self::Http(why)
    }
}

impl From<io::Error> for RefreshError {
    fn from(why: io::Error) -> Self {
        Self::Io(why)
    }
}

impl From<zip::result::ZipError> for RefreshError {
    fn from(why: zip::result::ZipError) -> Self {
        Self::Zip(why)
    }
}

impl From<BuildError> for RefreshError {
    fn from(why: BuildError) -> Self {
        Self::Build(why)
    }
}

/// Periodic download, unpack and rebuild of the static bundles.
///
/// All three archives are downloaded into a scratch directory before any
/// target directory is touched, and the rebuilt index is published only when
/// everything succeeded; any failure on the way leaves the live index (and
/// as much of the on-disk state as possible) as it was.
/// Outcome of the most recent refresh attempt.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub finished_at: chrono::DateTime<Local>,
    /// `None` on success, otherwise the rendered failure.
    pub failure: Option<String>,
}

pub struct RefreshOrchestrator {
    bundles: BundlePaths,
    zip_urls: Vec<(TransitSystem, String)>,
    handle: Arc<IndexHandle>,
    boroughs: Option<Arc<RegionLocator>>,
    client: reqwest::Client,
    in_progress: AtomicBool,
    last_outcome: std::sync::Mutex<Option<RefreshOutcome>>,
}

impl RefreshOrchestrator {
    pub fn new(
        bundles: BundlePaths,
        zip_urls: Vec<(TransitSystem, String)>,
        handle: Arc<IndexHandle>,
        boroughs: Option<Arc<RegionLocator>>,
    ) -> Result<Self, RefreshError> {
        Ok(Self {
            bundles,
            zip_urls,
            handle,
            boroughs,
            client: reqwest::Client::builder().build()?,
            in_progress: AtomicBool::new(false),
            last_outcome: std::sync::Mutex::new(None),
        })
    }

    /// Runs one full refresh cycle. Returns [`RefreshError::AlreadyRunning`]
    /// immediately when another cycle holds the guard.
    pub async fn refresh_once(&self) -> Result<(), RefreshError> {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            return Err(RefreshError::AlreadyRunning);
        }
        let result = self.refresh_inner().await;
        let outcome = RefreshOutcome {
            finished_at: Local::now(),
            failure: result.as_ref().err().map(|why| why.to_string()),
        };
        if let Ok(mut last) = self.last_outcome.lock() {
            *last = Some(outcome);
        }
        self.in_progress.store(false, Ordering::SeqCst);
        result
    }

    pub fn last_outcome(&self) -> Option<RefreshOutcome> {
        self.last_outcome
            .lock()
            .map(|outcome| outcome.clone())
            .unwrap_or(None)
    }

    async fn refresh_inner(&self) -> Result<(), RefreshError> {
        let scratch = std::env::temp_dir().join(format!(
            "bundle-refresh-{}-{}",
            std::process::id(),
            Local::now().timestamp()
        ));
        fs::create_dir_all(&scratch)?;

        // download everything first so a dead endpoint cannot leave a
        // half-replaced bundle set on disk
        let mut archives = Vec::new();
        for (system, url) in &self.zip_urls {
            let path = scratch.join(format!("{}.zip", system.tag().to_lowercase()));
            log::info!("downloading {} bundle", system);
            self.download(url, &path).await?;
            archives.push((*system, path));
        }

        for (system, archive) in &archives {
            let target = self.bundles.dir_for(*system);
            log::info!("unpacking {} bundle into {}", system, target.display());
            wipe_dir(target)?;
            extract_zip(archive, target)?;
        }

        let _ = fs::remove_dir_all(&scratch);

        let index = build_index(&self.bundles, self.boroughs.as_deref())?;
        self.handle.publish(index);
        log::info!("bundle refresh complete, new index published");
        Ok(())
    }

    async fn download(&self, url: &str, target: &Path) -> Result<(), RefreshError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let mut file = File::create(target)?;
        let mut content = Cursor::new(response.bytes().await?);
        copy(&mut content, &mut file)?;
        Ok(())
    }

    /// Spawns the cron-driven refresh loop on the runtime.
    pub fn spawn(
        self: Arc<Self>,
        schedule: &str,
    ) -> Result<tokio::task::JoinHandle<()>, RefreshError> {
        let schedule = Schedule::from_str(schedule).map_err(RefreshError::BadSchedule)?;
        Ok(tokio::spawn(async move {
            loop {
                let Some(next) = schedule.upcoming(Local).next() else {
                    log::warn!("refresh schedule has no upcoming fire time, stopping");
                    return;
                };
                let wait = (next - Local::now())
                    .to_std()
                    .unwrap_or_default();
                tokio::time::sleep(wait).await;
                match self.refresh_once().await {
                    Ok(()) => {}
                    Err(RefreshError::AlreadyRunning) => {
                        log::warn!("skipping scheduled refresh, previous one still running")
                    }
                    Err(why) => log::error!("bundle refresh failed: {}", why),
                }
            }
        }))
    }
}

fn wipe_dir(dir: &Path) -> Result<(), io::Error> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

fn extract_zip(archive_path: &Path, target: &Path) -> Result<(), RefreshError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;

        // enclosed_name rejects entries escaping the target directory
        let relative: PathBuf = match file.enclosed_name() {
            Some(path) => path.to_owned(),
            None => continue,
        };
        let outpath = target.join(relative);

        if file.name().ends_with('/') {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            let mut outfile = File::create(&outpath)?;
            copy(&mut file, &mut outfile)?;
            log::debug!("extracted {} ({} bytes)", outpath.display(), file.size());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write as _;
    use std::path::PathBuf;

    use super::{extract_zip, wipe_dir};

    fn scratch(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "refresh-test-{}-{}",
            tag,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn extracts_an_archive_into_a_wiped_target() {
        let dir = scratch("extract");
        let archive_path = dir.join("bundle.zip");

        let file = fs::File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("routes.txt", options).unwrap();
        writer.write_all(b"route_id\nL\n").unwrap();
        writer.start_file("stops.txt", options).unwrap();
        writer.write_all(b"stop_id\nL11\n").unwrap();
        writer.finish().unwrap();

        let target = dir.join("bundle");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.txt"), "old").unwrap();

        wipe_dir(&target).unwrap();
        extract_zip(&archive_path, &target).unwrap();

        assert!(!target.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(target.join("routes.txt")).unwrap(), "route_id\nL\n");
        assert_eq!(fs::read_to_string(target.join("stops.txt")).unwrap(), "stop_id\nL11\n");
    }

    #[test]
    fn wipe_creates_missing_directories() {
        let dir = scratch("wipe");
        let target = dir.join("never-existed");
        wipe_dir(&target).unwrap();
        assert!(target.exists());
    }
}

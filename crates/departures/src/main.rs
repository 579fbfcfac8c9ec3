use std::error::Error;
use std::sync::Arc;

use departures::{Config, Departures, LogAnalytics, SourceFilter};
use gtfs::realtime::FeedFetcher;
use gtfs::refresh::RefreshOrchestrator;
use gtfs::{build_index, IndexHandle};
use utility::geo::RegionLocator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(station_key) = args.next() else {
        eprintln!("usage: departures <SYSTEM-stopId> [limit-minutes] [realtime|scheduled]");
        std::process::exit(2);
    };
    let limit_minutes = args.next().map(|raw| raw.parse::<u32>()).transpose()?;
    let source_filter = args
        .next()
        .map(|raw| raw.parse::<SourceFilter>())
        .transpose()?;

    let config = Config::from_env()?;
    log::info!("starting with {:?}", config);

    let boroughs = match &config.geo_file {
        Some(path) => Some(Arc::new(RegionLocator::from_file(
            path,
            &config.borough_property,
        )?)),
        None => None,
    };

    let index = build_index(&config.bundles, boroughs.as_deref())?;
    let handle = Arc::new(IndexHandle::new(index));

    let orchestrator = Arc::new(RefreshOrchestrator::new(
        config.bundles.clone(),
        config.zip_urls.clone(),
        Arc::clone(&handle),
        boroughs,
    )?);
    let _refresh_loop = orchestrator.spawn(&config.refresh_schedule)?;

    let fetcher = Arc::new(FeedFetcher::new(
        config.feed_cache_ttl,
        config.feed_cache_max_entries,
    )?);
    let resolver = Departures::new(Arc::clone(&handle), fetcher, Arc::new(LogAnalytics))
        .with_request_deadline(config.request_deadline)
        .with_flipped_platforms(config.flipped_platform_stops.clone());

    let departures = resolver
        .departures_for_station(&station_key, limit_minutes, source_filter)
        .await;
    println!("{}", serde_json::to_string_pretty(&departures)?);
    Ok(())
}

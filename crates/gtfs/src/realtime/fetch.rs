use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use prost::Message as _;
use reqwest::header::CONTENT_TYPE;

use super::feed::FeedMessage;

/// Per-fetch timeout. A request deadline shorter than this wins; the caller
/// enforces it around the fan-out.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(25);

struct CacheEntry {
    message: Arc<FeedMessage>,
    fetched_at: Instant,
}

/// Cached HTTP access to the realtime feeds.
///
/// Entries live for a short TTL keyed by feed name. A cached feed with zero
/// entities is served to nobody: the next call bypasses it and fetches once
/// more, so one empty upstream response cannot poison a whole TTL window.
/// Every failure mode folds to `None` plus a warning; the resolver proceeds
/// with whatever arrived.
pub struct FeedFetcher {
    client: reqwest::Client,
    ttl: Duration,
    max_entries: usize,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl FeedFetcher {
    pub fn new(ttl: Duration, max_entries: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            ttl,
            max_entries,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Fetches and decodes one feed, consulting the cache first.
    pub async fn fetch(&self, url: &str) -> Option<Arc<FeedMessage>> {
        let name = feed_name(url);
        if let Some(cached) = self.cached(&name) {
            return Some(cached);
        }

        let message = Arc::new(self.fetch_remote(url, &name).await?);
        if message.entity.is_empty() {
            log::warn!("feed {} decoded to zero entities", name);
        }
        self.store(name, Arc::clone(&message));
        Some(message)
    }

    fn cached(&self, name: &str) -> Option<Arc<FeedMessage>> {
        let cache = self.lock_cache();
        let entry = cache.get(name)?;
        if entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        // an empty result is never served from cache
        if entry.message.entity.is_empty() {
            return None;
        }
        Some(Arc::clone(&entry.message))
    }

    fn store(&self, name: String, message: Arc<FeedMessage>) {
        let mut cache = self.lock_cache();
        if !cache.contains_key(&name) && cache.len() >= self.max_entries {
            let oldest = cache
                .iter()
                .min_by_key(|(_, entry)| entry.fetched_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                cache.remove(&oldest);
            }
        }
        cache.insert(
            name,
            CacheEntry {
                message,
                fetched_at: Instant::now(),
            },
        );
    }

    async fn fetch_remote(&self, url: &str, name: &str) -> Option<FeedMessage> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(why) => {
                log::warn!("feed {} unreachable: {}", name, why);
                return None;
            }
        };
        if !response.status().is_success() {
            log::warn!("feed {} answered {}", name, response.status());
            return None;
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_owned();
        if content_type.contains("text/html") || content_type.contains("application/json") {
            // the upstream serves its error pages with a 200
            log::warn!("feed {} returned an error page ({})", name, content_type);
            return None;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(why) => {
                log::warn!("feed {} body unreadable: {}", name, why);
                return None;
            }
        };
        decode_feed(name, &bytes)
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Cache key of a feed, derived from the last path segment of its URL.
pub fn feed_name(url: &str) -> String {
    url.rsplit('/')
        .next()
        .unwrap_or(url)
        .replace("%2F", "/")
        .replace("%2f", "/")
}

fn decode_feed(name: &str, bytes: &[u8]) -> Option<FeedMessage> {
    if bytes.is_empty() {
        log::warn!("feed {} returned an empty body", name);
        return None;
    }
    match FeedMessage::decode(bytes) {
        Ok(message) => Some(message),
        Err(why) => {
            log::warn!("feed {} is not a decodable message: {}", name, why);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use prost::Message as _;

    use super::super::feed::{FeedEntity, FeedMessage};
    use super::{decode_feed, feed_name, FeedFetcher};

    #[test]
    fn feed_names_come_from_the_url_path() {
        assert_eq!(
            feed_name("https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-l"),
            "nyct/gtfs-l"
        );
        assert_eq!(
            feed_name("https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/lirr%2Fgtfs-lirr"),
            "lirr/gtfs-lirr"
        );
    }

    #[test]
    fn decode_rejects_empty_and_garbage_bodies() {
        assert!(decode_feed("test", &[]).is_none());
        assert!(decode_feed("test", &[0xff, 0xff, 0xff, 0xff]).is_none());

        let message = FeedMessage {
            header: None,
            entity: vec![FeedEntity::default()],
        };
        let decoded = decode_feed("test", &message.encode_to_vec()).unwrap();
        assert_eq!(decoded.entity.len(), 1);
    }

    fn one_entity() -> Arc<FeedMessage> {
        Arc::new(FeedMessage {
            header: None,
            entity: vec![FeedEntity::default()],
        })
    }

    #[test]
    fn fresh_entries_are_served_from_cache() {
        let fetcher = FeedFetcher::new(Duration::from_secs(60), 4).unwrap();
        fetcher.store("nyct/gtfs-l".to_owned(), one_entity());
        assert!(fetcher.cached("nyct/gtfs-l").is_some());
        assert!(fetcher.cached("nyct/gtfs-g").is_none());
    }

    #[test]
    fn empty_results_poison_their_entry() {
        let fetcher = FeedFetcher::new(Duration::from_secs(60), 4).unwrap();
        fetcher.store("lirr/gtfs-lirr".to_owned(), Arc::new(FeedMessage::default()));
        // cached but never served: the next fetch goes upstream again
        assert!(fetcher.cached("lirr/gtfs-lirr").is_none());
    }

    #[test]
    fn expired_entries_are_not_served() {
        let fetcher = FeedFetcher::new(Duration::ZERO, 4).unwrap();
        fetcher.store("mnr/gtfs-mnr".to_owned(), one_entity());
        assert!(fetcher.cached("mnr/gtfs-mnr").is_none());
    }

    #[test]
    fn cache_is_bounded() {
        let fetcher = FeedFetcher::new(Duration::from_secs(60), 2).unwrap();
        fetcher.store("a".to_owned(), one_entity());
        fetcher.store("b".to_owned(), one_entity());
        fetcher.store("c".to_owned(), one_entity());
        let cached = [
            fetcher.cached("a").is_some(),
            fetcher.cached("b").is_some(),
            fetcher.cached("c").is_some(),
        ];
        assert_eq!(cached.iter().filter(|hit| **hit).count(), 2);
        assert!(cached[2]);
    }
}

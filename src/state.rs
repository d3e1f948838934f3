use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::Config;
use crate::pipeline::batch::ReadStatus;
use crate::types::route::RouteCollection;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    http: reqwest::Client,
    batches: Arc<DashMap<Uuid, Cached<ReadStatus>>>,
    views: Arc<DashMap<Uuid, Cached<RouteCollection>>>,
}

struct Cached<T> {
    value: T,
    inserted_at: Instant,
}

impl<T> Cached<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            config: Arc::new(config),
            http,
            batches: Arc::new(DashMap::new()),
            views: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn insert_batch(&self, status: ReadStatus) -> Uuid {
        let id = Uuid::new_v4();
        self.batches.insert(id, Cached::new(status));
        id
    }

    pub fn batch(&self, id: &Uuid) -> Option<ReadStatus> {
        self.batches.get(id).map(|entry| entry.value.clone())
    }

    pub fn remove_batch(&self, id: &Uuid) -> bool {
        self.batches.remove(id).is_some()
    }

    pub fn insert_view(&self, route: RouteCollection) -> Uuid {
        let id = Uuid::new_v4();
        self.views.insert(id, Cached::new(route));
        id
    }

    /// Runs `f` against a cached route while holding its entry lock.
    pub fn with_view<R>(&self, id: &Uuid, f: impl FnOnce(&mut RouteCollection) -> R) -> Option<R> {
        self.views.get_mut(id).map(|mut entry| f(&mut entry.value))
    }

    pub fn evict_expired(&self, ttl: Duration) {
        let now = Instant::now();
        self.batches
            .retain(|_, cached| now.duration_since(cached.inserted_at) < ttl);
        self.views
            .retain(|_, cached| now.duration_since(cached.inserted_at) < ttl);
        tracing::info!(
            "Cache eviction complete. {} batches, {} views",
            self.batches.len(),
            self.views.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_drops_entries_older_than_ttl() {
        let state = AppState::new(Config::default());
        let batch = state.insert_batch(ReadStatus::default());
        let view = state.insert_view(RouteCollection::default());

        state.evict_expired(Duration::from_secs(60));
        assert!(state.batch(&batch).is_some());
        assert!(state.with_view(&view, |_| ()).is_some());

        state.evict_expired(Duration::ZERO);
        assert!(state.batch(&batch).is_none());
        assert!(state.with_view(&view, |_| ()).is_none());
    }
}

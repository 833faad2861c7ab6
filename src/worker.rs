//! The cache worker: install, activate and fetch interception.
//!
//! Strategy is network-first with cache fallback: the install handler
//! snapshots the core assets into the current partition, activation purges
//! stale partitions, and every intercepted GET tries the network before
//! consulting the snapshot. Successful network responses are not written
//! back; the cache stays exactly the install snapshot.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use futures::future;
use tracing::{error, info, warn};

use crate::cache::{CachePartition, CacheStorage};
use crate::config::WorkerConfig;
use crate::host::HostController;
use crate::lifecycle::{Lifecycle, LifecycleEvent, Phase, Signal};
use crate::models::{Request, Response};
use crate::net::{NetError, Network};

pub struct CacheWorker {
    config: WorkerConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    host: Arc<dyn HostController>,
    lifecycle: Mutex<Lifecycle>,
}

impl CacheWorker {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        host: Arc<dyn HostController>,
    ) -> Self {
        Self {
            config,
            storage,
            network,
            host,
            lifecycle: Mutex::new(Lifecycle::new()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        match self.lifecycle.lock() {
            Ok(lifecycle) => lifecycle.phase(),
            Err(poisoned) => poisoned.into_inner().phase(),
        }
    }

    fn apply(&self, event: LifecycleEvent) {
        let signals = match self.lifecycle.lock() {
            Ok(mut lifecycle) => lifecycle.apply(event),
            Err(poisoned) => poisoned.into_inner().apply(event),
        };
        for signal in signals {
            match signal {
                Signal::SkipWaiting => self.host.skip_waiting(),
                Signal::ClaimClients => self.host.claim_clients(),
            }
        }
    }

    /// Install handler: populate the current partition with every core
    /// asset. All-or-nothing: nothing is committed unless every asset
    /// fetches successfully, and the lifecycle only advances on success.
    pub async fn install(&self) -> Result<()> {
        info!(cache = %self.config.cache_name, "installing worker version");
        self.apply(LifecycleEvent::InstallStarted);

        match self.populate().await {
            Ok(count) => {
                info!(cache = %self.config.cache_name, assets = count, "core assets cached");
                self.apply(LifecycleEvent::InstallSucceeded);
                Ok(())
            }
            Err(e) => {
                error!(cache = %self.config.cache_name, error = %e, "failed to cache core assets");
                self.apply(LifecycleEvent::InstallFailed);
                Err(e)
            }
        }
    }

    async fn populate(&self) -> Result<usize> {
        let fetches: Vec<_> = self
            .config
            .core_assets
            .iter()
            .map(|url| {
                // Bypass any intermediate cache so a new version never
                // snapshots stale bodies.
                let request = Request::get(url).with_header("cache-control", "no-cache");
                async move {
                    let response = self
                        .fetch_from_network(&request)
                        .await
                        .with_context(|| format!("failed to fetch core asset {}", request.url()))?;
                    if !response.is_success() {
                        bail!(
                            "core asset {} returned status {}",
                            request.url(),
                            response.status
                        );
                    }
                    Ok((request, response))
                }
            })
            .collect();

        let entries = future::try_join_all(fetches).await?;
        let count = entries.len();

        let partition = self.storage.open(&self.config.cache_name).await?;
        partition.put_all(entries).await?;
        Ok(count)
    }

    /// Activation handler: delete every partition whose name differs from
    /// the current tag, then claim open clients. A failed delete of one
    /// partition does not abort the others.
    pub async fn activate(&self) -> Result<()> {
        info!(cache = %self.config.cache_name, "activating worker version");

        let names = self.storage.partition_names().await?;
        for name in names {
            if name == self.config.cache_name {
                continue;
            }
            match self.storage.delete_partition(&name).await {
                Ok(true) => info!(partition = %name, "deleted stale cache partition"),
                Ok(false) => {}
                Err(e) => {
                    warn!(partition = %name, error = %e, "failed to delete stale cache partition")
                }
            }
        }

        self.apply(LifecycleEvent::Activated);
        Ok(())
    }

    /// Fetch interception: network first, then cache, then offline page for
    /// HTML-preferring requests, then a synthetic not-available response.
    /// Non-GET requests bypass interception entirely; their network errors
    /// propagate. The GET path always resolves to a response.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, NetError> {
        if !request.method().is_get() {
            return self.fetch_from_network(request).await;
        }

        match self.fetch_from_network(request).await {
            // No write-back: the partition stays exactly the install snapshot.
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(url = %request.url(), error = %e, "network failed, falling back to cache");
                Ok(self.respond_from_cache(request).await)
            }
        }
    }

    async fn fetch_from_network(&self, request: &Request) -> Result<Response, NetError> {
        match self.config.network_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.network.fetch(request))
                .await
                .map_err(|_| NetError::Timeout(limit))?,
            None => self.network.fetch(request).await,
        }
    }

    async fn respond_from_cache(&self, request: &Request) -> Response {
        // A cache hit beats the offline fallback, navigations included.
        if let Some(cached) = self.lookup(request).await {
            return cached;
        }

        if request.wants_html() {
            let fallback = Request::get(&self.config.offline_fallback);
            if let Some(page) = self.lookup(&fallback).await {
                info!(url = %request.url(), "serving offline fallback page");
                return page;
            }
            warn!(
                fallback = %self.config.offline_fallback,
                "offline fallback page missing from cache"
            );
        }

        Response::not_available(request.url())
    }

    /// Cache lookup that degrades storage errors to a miss.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        let partition = match self.storage.open(&self.config.cache_name).await {
            Ok(partition) => partition,
            Err(e) => {
                warn!(cache = %self.config.cache_name, error = %e, "failed to open cache partition");
                return None;
            }
        };
        match partition.match_request(request).await {
            Ok(Some(entry)) => {
                info!(
                    url = %request.url(),
                    age_minutes = entry.age_minutes(),
                    "serving cached response"
                );
                Some(entry.response)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(url = %request.url(), error = %e, "cache lookup failed");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::cache::MemoryStorage;
    use crate::models::Method;

    /// Scriptable network: per-URL responses, a global offline switch and a
    /// log of every request that reached the network.
    #[derive(Default)]
    struct FakeNetwork {
        routes: Mutex<HashMap<String, Response>>,
        offline: AtomicBool,
        log: Mutex<Vec<Request>>,
    }

    impl FakeNetwork {
        fn new() -> Self {
            Self::default()
        }

        fn route(&self, url: &str, response: Response) {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), response);
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn requests(&self) -> Vec<Request> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Network for FakeNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, NetError> {
            self.log.lock().unwrap().push(request.clone());
            if self.offline.load(Ordering::SeqCst) {
                return Err(NetError::Unreachable);
            }
            match self.routes.lock().unwrap().get(request.url()) {
                Some(response) => Ok(response.clone()),
                None => Ok(Response::new(404, "no such route")),
            }
        }
    }

    /// Network that never responds; exercises the bounded wait.
    struct HangingNetwork;

    #[async_trait::async_trait]
    impl Network for HangingNetwork {
        async fn fetch(&self, _request: &Request) -> Result<Response, NetError> {
            future::pending().await
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        skip_waiting_calls: Mutex<u32>,
        claim_clients_calls: Mutex<u32>,
    }

    impl HostController for RecordingHost {
        fn skip_waiting(&self) {
            *self.skip_waiting_calls.lock().unwrap() += 1;
        }

        fn claim_clients(&self) {
            *self.claim_clients_calls.lock().unwrap() += 1;
        }
    }

    fn test_config() -> WorkerConfig {
        WorkerConfig::new(
            "offline-cache-v1",
            vec![
                "/".to_string(),
                "/static/index.html".to_string(),
                "/static/offline.html".to_string(),
                "/icon.png".to_string(),
            ],
        )
    }

    fn online_network(config: &WorkerConfig) -> Arc<FakeNetwork> {
        let network = Arc::new(FakeNetwork::new());
        for url in &config.core_assets {
            network.route(url, Response::ok(format!("body of {}", url)));
        }
        network
    }

    struct Fixture {
        worker: CacheWorker,
        storage: MemoryStorage,
        network: Arc<FakeNetwork>,
        host: Arc<RecordingHost>,
    }

    fn fixture() -> Fixture {
        let config = test_config();
        let storage = MemoryStorage::new();
        let network = online_network(&config);
        let host = Arc::new(RecordingHost::default());
        let worker = CacheWorker::new(
            config,
            Arc::new(storage.clone()),
            network.clone(),
            host.clone(),
        );
        Fixture {
            worker,
            storage,
            network,
            host,
        }
    }

    async fn cached_keys(storage: &MemoryStorage, name: &str) -> Vec<String> {
        let partition = storage.open(name).await.unwrap();
        let mut keys = partition.keys().await.unwrap();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_install_populates_all_core_assets() {
        let f = fixture();
        f.worker.install().await.unwrap();

        let partition = f.storage.open("offline-cache-v1").await.unwrap();
        for url in &f.worker.config().core_assets {
            let found = partition.match_request(&Request::get(url)).await.unwrap();
            assert!(found.is_some(), "missing cached asset {}", url);
        }
        assert_eq!(f.worker.phase(), Phase::Waiting);
        assert_eq!(*f.host.skip_waiting_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_install_bypasses_intermediate_caches() {
        let f = fixture();
        f.worker.install().await.unwrap();

        // Every install fetch must carry the revalidation header so a new
        // version never snapshots stale bodies.
        let requests = f.network.requests();
        assert_eq!(requests.len(), f.worker.config().core_assets.len());
        for request in &requests {
            assert!(request.method().is_get());
            assert_eq!(request.header("cache-control"), Some("no-cache"));
        }
    }

    #[tokio::test]
    async fn test_install_failure_commits_nothing() {
        let f = fixture();
        f.network.set_offline(true);

        assert!(f.worker.install().await.is_err());

        assert!(cached_keys(&f.storage, "offline-cache-v1").await.is_empty());
        assert_eq!(f.worker.phase(), Phase::Redundant);
        assert_eq!(*f.host.skip_waiting_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_fails_on_unfetchable_asset() {
        let f = fixture();
        // One asset answers with an error status; population must not commit.
        f.network.route("/icon.png", Response::new(500, "boom"));

        assert!(f.worker.install().await.is_err());
        assert!(cached_keys(&f.storage, "offline-cache-v1").await.is_empty());
    }

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let f = fixture();
        f.worker.install().await.unwrap();
        let first = cached_keys(&f.storage, "offline-cache-v1").await;

        f.worker.install().await.unwrap();
        let second = cached_keys(&f.storage, "offline-cache-v1").await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_activate_purges_stale_partitions() {
        let f = fixture();
        // A previous version left a partition behind.
        f.storage.open("offline-cache-v0").await.unwrap();

        f.worker.install().await.unwrap();
        f.worker.activate().await.unwrap();

        let names = f.storage.partition_names().await.unwrap();
        assert_eq!(names, vec!["offline-cache-v1".to_string()]);
        assert_eq!(f.worker.phase(), Phase::Active);
        assert_eq!(*f.host.claim_clients_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_get_bypasses_cache_entirely() {
        let f = fixture();
        f.worker.install().await.unwrap();

        // Seed a cache entry under the POST identity; it must never be read.
        let post = Request::new(Method::Post, "/api/update");
        let partition = f.storage.open("offline-cache-v1").await.unwrap();
        partition.put(&post, Response::ok("cached")).await.unwrap();

        f.network.set_offline(true);
        let result = f.worker.handle_fetch(&post).await;
        assert!(matches!(result, Err(NetError::Unreachable)));
        assert!(f
            .network
            .requests()
            .iter()
            .any(|r| r.cache_key() == "POST /api/update"));
    }

    #[tokio::test]
    async fn test_network_error_status_passes_through() {
        // A 404 from the network is a resolved response, not a failure;
        // the cached copy is not consulted.
        let f = fixture();
        f.worker.install().await.unwrap();

        let response = f
            .worker
            .handle_fetch(&Request::get("/unrouted.json"))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body.as_ref(), b"no such route");
    }

    #[tokio::test]
    async fn test_network_success_returns_network_response_without_write_back() {
        let f = fixture();
        f.worker.install().await.unwrap();
        let before = cached_keys(&f.storage, "offline-cache-v1").await;

        f.network.route("/fresh.json", Response::ok("fresh"));
        let response = f
            .worker
            .handle_fetch(&Request::get("/fresh.json"))
            .await
            .unwrap();
        assert_eq!(response.body.as_ref(), b"fresh");

        // Cache contents are identical before and after.
        assert_eq!(before, cached_keys(&f.storage, "offline-cache-v1").await);
    }

    #[tokio::test]
    async fn test_cache_hit_beats_offline_fallback() {
        // Install online, then force the network offline: a navigation to a
        // cached URL gets the cached body, not the offline page.
        let f = fixture();
        f.worker.install().await.unwrap();
        f.worker.activate().await.unwrap();
        f.network.set_offline(true);

        let response = f
            .worker
            .handle_fetch(&Request::navigation("/"))
            .await
            .unwrap();
        assert_eq!(response.body.as_ref(), b"body of /");
    }

    #[tokio::test]
    async fn test_uncached_navigation_gets_offline_page() {
        let f = fixture();
        f.worker.install().await.unwrap();
        f.network.set_offline(true);

        let response = f
            .worker
            .handle_fetch(&Request::navigation("/some/deep/page"))
            .await
            .unwrap();
        assert_eq!(response.body.as_ref(), b"body of /static/offline.html");
    }

    #[tokio::test]
    async fn test_html_accept_header_gets_offline_page() {
        let f = fixture();
        f.worker.install().await.unwrap();
        f.network.set_offline(true);

        let request = Request::get("/other").with_header("accept", "text/html,*/*;q=0.8");
        let response = f.worker.handle_fetch(&request).await.unwrap();
        assert_eq!(response.body.as_ref(), b"body of /static/offline.html");
    }

    #[tokio::test]
    async fn test_uncached_subresource_gets_synthetic_not_available() {
        let f = fixture();
        f.worker.install().await.unwrap();
        f.network.set_offline(true);

        let request = Request::get("/missing.png").with_header("accept", "image/png");
        let response = f.worker.handle_fetch(&request).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.body.is_empty());
    }

    #[tokio::test]
    async fn test_missing_accept_header_does_not_fault() {
        let f = fixture();
        f.worker.install().await.unwrap();
        f.network.set_offline(true);

        // No Accept header at all: treated as not preferring HTML.
        let response = f
            .worker
            .handle_fetch(&Request::get("/missing.bin"))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_fetch_before_install_degrades_to_not_available() {
        let f = fixture();
        f.network.set_offline(true);

        // Nothing cached yet, fallback page included.
        let response = f
            .worker
            .handle_fetch(&Request::navigation("/"))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.body.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_wait_times_out_to_cache_fallback() {
        let mut config = test_config();
        config.network_timeout_secs = Some(2);

        let storage = MemoryStorage::new();
        let host = Arc::new(RecordingHost::default());

        // Install through a responsive network first.
        let online = online_network(&config);
        let installer = CacheWorker::new(
            config.clone(),
            Arc::new(storage.clone()),
            online,
            host.clone(),
        );
        installer.install().await.unwrap();

        // Then serve fetches through a network that never answers.
        let worker = CacheWorker::new(
            config,
            Arc::new(storage),
            Arc::new(HangingNetwork),
            host,
        );
        let response = worker.handle_fetch(&Request::get("/")).await.unwrap();
        assert_eq!(response.body.as_ref(), b"body of /");
    }

    #[tokio::test]
    async fn test_concurrent_fetches_are_independent() {
        let f = fixture();
        f.worker.install().await.unwrap();
        f.network.set_offline(true);

        let worker = Arc::new(f.worker);
        let mut handles = Vec::new();
        for url in ["/", "/static/index.html", "/icon.png"] {
            let worker = worker.clone();
            handles.push(tokio::spawn(async move {
                worker.handle_fetch(&Request::get(url)).await.unwrap()
            }));
        }
        for handle in handles {
            let response = handle.await.unwrap();
            assert_eq!(response.status, 200);
        }
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_explicit_outcome() {
        let mut config = test_config();
        config.network_timeout_secs = Some(1);
        let worker = CacheWorker::new(
            config,
            Arc::new(MemoryStorage::new()),
            Arc::new(HangingNetwork),
            Arc::new(RecordingHost::default()),
        );

        // Non-GET requests surface the timeout instead of falling back.
        tokio::time::pause();
        let result = worker
            .handle_fetch(&Request::new(Method::Post, "/api/update"))
            .await;
        assert!(matches!(result, Err(NetError::Timeout(d)) if d == Duration::from_secs(1)));
    }
}

//! Two-tier image cache orchestrator.
//!
//! Lookups go Memory -> Disk -> Network. On-demand requests download inline;
//! bulk prewarm requests go through the worker pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{Span, debug, info, trace, warn};

use crate::domain::entities::{
    AssetOrigin, CacheKey, CachedAsset, ImageRole, LOCAL_REFERENCE_PREFIX, MapEntry,
    local_reference,
};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::AssetFetcher;

use super::asset_store::AssetStore;
use super::downloader::Downloader;
use super::extension;
use super::memory_index::MemoryIndex;
use super::worker_pool::{
    Batch, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, DownloadHandler, DownloadTask, WorkerPool,
    WorkerPoolConfig,
};

/// Default upper bound on waiting for a prewarm batch.
pub const DEFAULT_PREWARM_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the image cache.
#[derive(Debug, Clone, Copy)]
pub struct ImageCacheConfig {
    /// Background download workers.
    pub workers: usize,
    /// Prewarm queue capacity.
    pub queue_capacity: usize,
    /// Maximum time a prewarm call waits for its downloads.
    pub prewarm_timeout: Duration,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            prewarm_timeout: DEFAULT_PREWARM_TIMEOUT,
        }
    }
}

/// Outcome of a completed prewarm call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrewarmReport {
    /// Keys passed in.
    pub requested: usize,
    /// Keys already in memory or on disk.
    pub already_cached: usize,
    /// Keys handed to the worker pool.
    pub queued: usize,
    /// Queued downloads that failed.
    pub failed: usize,
}

impl std::fmt::Display for PrewarmReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Prewarm: {} requested, {} already cached, {} downloaded, {} failed",
            self.requested,
            self.already_cached,
            self.queued.saturating_sub(self.failed),
            self.failed
        )
    }
}

/// Lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by the memory index.
    pub memory_hits: u64,
    /// Lookups answered by the asset store.
    pub disk_hits: u64,
    /// Successful downloads.
    pub downloads: u64,
    /// Failed downloads.
    pub failures: u64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} memory hits, {} disk hits, {} downloads, {} failures",
            self.memory_hits, self.disk_hits, self.downloads, self.failures
        )
    }
}

#[derive(Debug, Default)]
struct StatsCounters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    downloads: AtomicU64,
    failures: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// State shared between callers and background workers.
#[derive(Debug)]
struct CacheCore {
    index: MemoryIndex,
    store: Arc<AssetStore>,
    downloader: Downloader,
    stats: StatsCounters,
}

impl CacheCore {
    /// Memory then disk lookup, indexing disk hits.
    async fn resolve(&self, url: &str, key: &CacheKey) -> Option<CachedAsset> {
        if let Some(path) = self.index.get(key) {
            StatsCounters::bump(&self.stats.memory_hits);
            return Some(CachedAsset::new(key.clone(), path, AssetOrigin::Memory));
        }

        let hint = extension::from_url(url);
        let path = self.store.locate(key, hint.as_deref()).await?;

        trace!(key = %key, path = %path.display(), "Disk cache hit");
        StatsCounters::bump(&self.stats.disk_hits);
        self.index.insert(key.clone(), path.clone());
        Some(CachedAsset::new(key.clone(), path, AssetOrigin::Disk))
    }

    async fn get_or_download(&self, url: &str, key: &CacheKey) -> CacheResult<CachedAsset> {
        if let Some(asset) = self.resolve(url, key).await {
            return Ok(asset);
        }

        debug!(key = %key, url = %url, "Cache miss, downloading");
        match self.downloader.download(url, key).await {
            Ok(asset) => {
                StatsCounters::bump(&self.stats.downloads);
                self.index.insert(key.clone(), asset.path.clone());
                Ok(asset)
            }
            Err(e) => {
                StatsCounters::bump(&self.stats.failures);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl DownloadHandler for CacheCore {
    async fn handle(&self, url: &str, key: &CacheKey) -> CacheResult<PathBuf> {
        self.get_or_download(url, key).await.map(|asset| asset.path)
    }
}

/// Memory + filesystem cache for remote catalog images.
///
/// Concurrent requests for the same key are not coalesced; both download and
/// write identical bytes to the same file.
#[derive(Debug)]
pub struct ImageCache {
    core: Arc<CacheCore>,
    pool: WorkerPool,
    config: ImageCacheConfig,
}

impl ImageCache {
    /// Creates the cache and starts its download workers.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(
        store: Arc<AssetStore>,
        fetcher: Arc<dyn AssetFetcher>,
        config: ImageCacheConfig,
    ) -> Self {
        let core = Arc::new(CacheCore {
            index: MemoryIndex::new(),
            downloader: Downloader::new(fetcher, store.clone()),
            store,
            stats: StatsCounters::default(),
        });

        let pool = WorkerPool::spawn(
            WorkerPoolConfig {
                workers: config.workers,
                queue_capacity: config.queue_capacity,
            },
            core.clone(),
        );

        let sizing = pool.config();
        let config = ImageCacheConfig {
            workers: sizing.workers,
            queue_capacity: sizing.queue_capacity,
            ..config
        };

        Self { core, pool, config }
    }

    /// Opens the asset store at `root` and creates the cache over it.
    ///
    /// # Errors
    /// Returns `CacheError::Io` if the cache root cannot be prepared.
    pub async fn open(
        root: impl AsRef<Path>,
        fetcher: Arc<dyn AssetFetcher>,
        config: ImageCacheConfig,
    ) -> CacheResult<Self> {
        let store = Arc::new(AssetStore::open(root).await?);
        Ok(Self::new(store, fetcher, config))
    }

    /// Returns the backing asset store.
    #[must_use]
    pub fn store(&self) -> &AssetStore {
        &self.core.store
    }

    /// Returns the active configuration, with pool sizing as clamped.
    #[must_use]
    pub const fn config(&self) -> &ImageCacheConfig {
        &self.config
    }

    /// Number of keys in the memory index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.index.len()
    }

    /// Returns true if the memory index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.index.is_empty()
    }

    /// Returns lookup counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.core.stats.snapshot()
    }

    /// Returns the stored path for `key`, downloading `url` inline on a miss.
    ///
    /// # Errors
    /// Returns the download error unchanged when the asset is not cached and
    /// cannot be fetched or stored.
    pub async fn get_or_download(&self, url: &str, key: &CacheKey) -> CacheResult<PathBuf> {
        self.fetch_asset(url, key).await.map(|asset| asset.path)
    }

    /// Like [`Self::get_or_download`] but reports where the asset came from.
    ///
    /// # Errors
    /// See [`Self::get_or_download`].
    pub async fn fetch_asset(&self, url: &str, key: &CacheKey) -> CacheResult<CachedAsset> {
        self.core.get_or_download(url, key).await
    }

    /// Downloads every uncached `(key, url)` pair in the background and waits
    /// for them, up to the configured prewarm timeout.
    ///
    /// Every uncached pair is queued, waiting on a full queue as needed; the
    /// timeout bounds only the wait. Individual failures are logged and
    /// counted, not returned. On timeout finished downloads stay cached and
    /// the rest keep being queued and downloaded in the background.
    ///
    /// # Errors
    /// Returns `CacheError::Timeout` when the deadline passes first, or
    /// `CacheError::QueueClosed` after shutdown.
    pub async fn prewarm(&self, urls: HashMap<CacheKey, String>) -> CacheResult<PrewarmReport> {
        let batch = Batch::new();
        let span = Span::current();
        let mut report = PrewarmReport {
            requested: urls.len(),
            ..PrewarmReport::default()
        };

        debug!(requested = report.requested, "Starting prewarm");

        let mut tasks = Vec::with_capacity(urls.len());
        for (key, url) in urls {
            if self.core.resolve(&url, &key).await.is_some() {
                report.already_cached += 1;
                continue;
            }
            tasks.push(DownloadTask::new(url, key, &batch, span.clone()));
        }
        report.queued = tasks.len();

        self.pool.submit_all(tasks)?;

        if tokio::time::timeout(self.config.prewarm_timeout, batch.wait())
            .await
            .is_err()
        {
            let pending = batch.pending();
            warn!(
                pending,
                queued = report.queued,
                timeout_secs = self.config.prewarm_timeout.as_secs_f64(),
                "Prewarm timed out, downloads continue in background"
            );
            return Err(CacheError::Timeout {
                pending,
                total: report.queued,
            });
        }

        report.failed = batch.failed();
        info!(%report, "Prewarm complete");
        Ok(report)
    }

    /// Caches the splash and icon of every entry and rewrites them to local
    /// references.
    ///
    /// Failures leave the original URL in place and are only logged. Entries
    /// without a valid identity are returned untouched.
    pub async fn cache_map_images(&self, mut entries: Vec<MapEntry>) -> Vec<MapEntry> {
        let (mut cached, mut downloaded) = (0usize, 0usize);
        let (mut failed, mut skipped) = (0usize, 0usize);

        for entry in &mut entries {
            let Some(id) = entry.valid_identity().map(str::to_owned) else {
                debug!(uuid = %entry.uuid, name = %entry.display_name, "Skipping entry without identity");
                skipped += 1;
                continue;
            };

            for role in [ImageRole::Splash, ImageRole::Icon] {
                let Some(url) = entry
                    .image_url(role)
                    .filter(|url| !url.starts_with(LOCAL_REFERENCE_PREFIX))
                    .map(str::to_owned)
                else {
                    continue;
                };

                let key = CacheKey::for_map(&id, role);
                match self.fetch_asset(&url, &key).await {
                    Ok(asset) => match asset.basename() {
                        Some(name) => {
                            entry.set_image_url(role, local_reference(name));
                            cached += 1;
                            if asset.was_downloaded() {
                                downloaded += 1;
                            }
                        }
                        None => {
                            warn!(key = %key, path = %asset.path.display(), "Cached path has no file name");
                            failed += 1;
                        }
                    },
                    Err(e) => {
                        warn!(
                            key = %key,
                            url = %url,
                            role = %role,
                            error = %e,
                            recoverable = e.is_recoverable(),
                            "Failed to cache map image"
                        );
                        failed += 1;
                    }
                }
            }
        }

        info!(
            entries = entries.len(),
            cached, downloaded, failed, skipped, "Rewrote map image references"
        );
        entries
    }

    /// Closes the download queue and waits for queued work to finish.
    ///
    /// Later prewarm calls fail with `CacheError::QueueClosed`.
    pub async fn shutdown(&self) {
        info!("Shutting down image cache");
        self.pool.shutdown().await;
        debug!(stats = %self.stats(), "Image cache stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::MockAssetFetcher;
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn create_cache(fetcher: Arc<MockAssetFetcher>) -> (ImageCache, TempDir) {
        create_cache_with(fetcher, ImageCacheConfig::default()).await
    }

    async fn create_cache_with(
        fetcher: Arc<MockAssetFetcher>,
        config: ImageCacheConfig,
    ) -> (ImageCache, TempDir) {
        let temp = TempDir::new().unwrap();
        let cache = ImageCache::open(temp.path(), fetcher, config)
            .await
            .unwrap();
        (cache, temp)
    }

    fn url(i: usize) -> String {
        format!("https://media.example.com/maps/{i}/splash.png")
    }

    #[tokio::test]
    async fn test_config_reports_clamped_sizing() {
        let config = ImageCacheConfig {
            workers: 0,
            queue_capacity: 0,
            ..ImageCacheConfig::default()
        };
        let (cache, _temp) = create_cache_with(Arc::new(MockAssetFetcher::new()), config).await;

        assert_eq!(cache.config().workers, 1);
        assert_eq!(cache.config().queue_capacity, 1);
        assert_eq!(cache.config().prewarm_timeout, DEFAULT_PREWARM_TIMEOUT);
    }

    #[tokio::test]
    async fn test_second_lookup_hits_memory() {
        let fetcher = Arc::new(MockAssetFetcher::new());
        let (cache, _temp) = create_cache(fetcher.clone()).await;
        let key = CacheKey::new("map_a_splash");

        let first = cache.fetch_asset(&url(1), &key).await.unwrap();
        let second = cache.fetch_asset(&url(1), &key).await.unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(first.origin, AssetOrigin::Network);
        assert_eq!(second.origin, AssetOrigin::Memory);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.stats().memory_hits, 1);
    }

    #[tokio::test]
    async fn test_existing_file_is_used_without_network() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("map_b_splash.png"), b"old").unwrap();

        let fetcher = Arc::new(MockAssetFetcher::new());
        let cache = ImageCache::open(temp.path(), fetcher.clone(), ImageCacheConfig::default())
            .await
            .unwrap();
        let key = CacheKey::new("map_b_splash");
        assert!(cache.is_empty());

        let path = cache.get_or_download(&url(2), &key).await.unwrap();

        assert_eq!(path, cache.store().root().join("map_b_splash.png"));
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().disk_hits, 1);
    }

    #[tokio::test]
    async fn test_extensionless_url_finds_stored_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("map_c_icon.webp"), b"old").unwrap();

        let fetcher = Arc::new(MockAssetFetcher::new());
        let cache = ImageCache::open(temp.path(), fetcher.clone(), ImageCacheConfig::default())
            .await
            .unwrap();

        let path = cache
            .get_or_download("https://media.example.com/icon", &CacheKey::new("map_c_icon"))
            .await
            .unwrap();

        assert!(path.ends_with("map_c_icon.webp"));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_download_error_is_returned_unchanged_and_not_remembered() {
        let bad = "https://media.example.com/broken.png";
        let fetcher = Arc::new(MockAssetFetcher::new().status(bad, 404));
        let (cache, _temp) = create_cache(fetcher.clone()).await;
        let key = CacheKey::new("broken");

        let first = cache.get_or_download(bad, &key).await;
        let second = cache.get_or_download(bad, &key).await;

        assert!(matches!(first, Err(CacheError::BadStatus { status: 404, .. })));
        assert!(second.is_err());
        assert_eq!(fetcher.calls_for(bad), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_prewarm_populates_every_key() {
        let fetcher = Arc::new(MockAssetFetcher::new().with_delay(Duration::from_millis(5)));
        let (cache, _temp) = create_cache(fetcher.clone()).await;

        let urls: HashMap<CacheKey, String> = (0..25)
            .map(|i| (CacheKey::new(format!("map_{i}_splash")), url(i)))
            .collect();

        let report = cache.prewarm(urls).await.unwrap();

        assert_eq!(report.queued, 25);
        assert_eq!(report.failed, 0);
        assert_eq!(cache.len(), 25);
        assert_eq!(fetcher.calls(), 25);
    }

    #[tokio::test]
    async fn test_prewarm_skips_cached_keys() {
        let fetcher = Arc::new(MockAssetFetcher::new());
        let (cache, _temp) = create_cache(fetcher.clone()).await;
        let key = CacheKey::new("map_0_splash");
        cache.get_or_download(&url(0), &key).await.unwrap();

        let mut urls = HashMap::new();
        urls.insert(key, url(0));
        urls.insert(CacheKey::new("map_1_splash"), url(1));

        let report = cache.prewarm(urls).await.unwrap();

        assert_eq!(report.already_cached, 1);
        assert_eq!(report.queued, 1);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_prewarm_failures_are_counted_not_returned() {
        let bad = url(1);
        let fetcher = Arc::new(MockAssetFetcher::new().fail(&bad));
        let (cache, _temp) = create_cache(fetcher).await;

        let mut urls = HashMap::new();
        urls.insert(CacheKey::new("ok"), url(0));
        urls.insert(CacheKey::new("bad"), bad);

        let report = cache.prewarm(urls).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_prewarm_timeout_keeps_completed_downloads() {
        let stuck = url(99);
        let fetcher = Arc::new(MockAssetFetcher::new().hang(&stuck));
        let config = ImageCacheConfig {
            prewarm_timeout: Duration::from_millis(300),
            ..ImageCacheConfig::default()
        };
        let (cache, _temp) = create_cache_with(fetcher, config).await;

        let mut urls: HashMap<CacheKey, String> = (0..4)
            .map(|i| (CacheKey::new(format!("done_{i}")), url(i)))
            .collect();
        urls.insert(CacheKey::new("stuck"), stuck);

        let result = cache.prewarm(urls).await;

        assert!(matches!(
            result,
            Err(CacheError::Timeout {
                pending: 1,
                total: 5
            })
        ));
        for i in 0..4 {
            assert!(
                cache
                    .store()
                    .exists(&CacheKey::new(format!("done_{i}")), Some(".png"))
                    .await
            );
        }
        assert_eq!(cache.len(), 4);
    }

    #[tokio::test]
    async fn test_prewarm_after_shutdown_is_rejected() {
        let fetcher = Arc::new(MockAssetFetcher::new());
        let (cache, _temp) = create_cache(fetcher.clone()).await;
        cache.shutdown().await;

        let mut urls = HashMap::new();
        urls.insert(CacheKey::new("late"), url(7));

        let result = cache.prewarm(urls).await;

        assert!(matches!(result, Err(CacheError::QueueClosed)));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timed_out_downloads_finish_before_shutdown_returns() {
        let fetcher = Arc::new(MockAssetFetcher::new().with_delay(Duration::from_millis(400)));
        let config = ImageCacheConfig {
            prewarm_timeout: Duration::from_millis(150),
            ..ImageCacheConfig::default()
        };
        let (cache, _temp) = create_cache_with(fetcher.clone(), config).await;

        let urls: HashMap<CacheKey, String> = (0..6)
            .map(|i| (CacheKey::new(format!("k{i}")), url(i)))
            .collect();

        let result = cache.prewarm(urls).await;
        assert!(matches!(result, Err(CacheError::Timeout { total: 6, .. })));

        cache.shutdown().await;

        assert_eq!(fetcher.calls(), 6);
        assert_eq!(cache.len(), 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timeout_with_full_queue_still_downloads_every_key() {
        let fetcher = Arc::new(MockAssetFetcher::new().with_delay(Duration::from_millis(100)));
        let config = ImageCacheConfig {
            workers: 1,
            queue_capacity: 1,
            prewarm_timeout: Duration::from_millis(150),
        };
        let (cache, _temp) = create_cache_with(fetcher.clone(), config).await;

        let urls: HashMap<CacheKey, String> = (0..10)
            .map(|i| (CacheKey::new(format!("slow_{i}")), url(i)))
            .collect();

        let result = cache.prewarm(urls).await;
        assert!(matches!(result, Err(CacheError::Timeout { total: 10, .. })));

        cache.shutdown().await;

        assert_eq!(fetcher.calls(), 10);
        assert_eq!(cache.len(), 10);
    }

    #[tokio::test]
    async fn test_cache_map_images_partial_failure() {
        let uuid = Uuid::new_v4();
        let splash = "https://unreachable.example.com/splash.png";
        let icon = "https://media.example.com/maps/x/displayicon";
        let fetcher = Arc::new(
            MockAssetFetcher::new()
                .fail(splash)
                .serve(icon, Some("image/png")),
        );
        let (cache, _temp) = create_cache(fetcher).await;

        let entry = MapEntry::new(uuid.to_string(), "Ascent")
            .with_splash(splash)
            .with_display_icon(icon);

        let rewritten = cache.cache_map_images(vec![entry]).await;

        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten[0].splash.as_deref(), Some(splash));
        assert_eq!(
            rewritten[0].display_icon,
            Some(format!("/cache/map_{uuid}_icon.png"))
        );
    }

    #[tokio::test]
    async fn test_cache_map_images_skips_invalid_identity() {
        let fetcher = Arc::new(MockAssetFetcher::new());
        let (cache, _temp) = create_cache(fetcher.clone()).await;

        let entries = vec![
            MapEntry::new("", "Range").with_splash(url(1)),
            MapEntry::new("garbage", "Lobby").with_display_icon(url(2)),
        ];

        let rewritten = cache.cache_map_images(entries.clone()).await;

        assert_eq!(rewritten, entries);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_map_images_keeps_identity_text_in_key() {
        let fetcher = Arc::new(MockAssetFetcher::new());
        let (cache, _temp) = create_cache(fetcher).await;
        let upper = Uuid::new_v4().to_string().to_uppercase();
        let entry = MapEntry::new(upper.as_str(), "Lotus").with_display_icon(url(4));

        let rewritten = cache.cache_map_images(vec![entry]).await;

        assert_eq!(
            rewritten[0].display_icon,
            Some(format!("/cache/map_{upper}_icon.png"))
        );
    }

    #[tokio::test]
    async fn test_cache_map_images_leaves_local_references() {
        let fetcher = Arc::new(MockAssetFetcher::new());
        let (cache, _temp) = create_cache(fetcher.clone()).await;
        let entry = MapEntry::new(Uuid::new_v4().to_string(), "Bind").with_splash(url(3));

        let once = cache.cache_map_images(vec![entry]).await;
        let twice = cache.cache_map_images(once.clone()).await;

        assert_eq!(once, twice);
        assert_eq!(fetcher.calls(), 1);
    }
}

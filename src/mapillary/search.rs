//! Search orchestration
//!
//! Composes identifier queries (fanned out over regions when there are
//! several) with a bounded parallel map of image fetches. The id stage
//! always completes before the first fetch starts.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::config::StreetScoutConfig;
use crate::error::Result;
use crate::mapillary::{ImageFetcher, MetadataClient};
use crate::models::{BoundingBox, ImageRecord};

/// Callback invoked after each completed fetch with (completed, total)
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Options controlling a search-and-download run
#[derive(Clone)]
pub struct SearchOptions {
    /// Cap on ids taken from each metadata query; unbounded when `None`
    pub maximum_results: Option<usize>,
    /// Concurrent image fetches; available parallelism when `None`
    pub parallel_fetches: Option<usize>,
    /// Concurrent region searches; available parallelism when `None`
    pub parallel_searches: Option<usize>,
    /// Minimum unit of work handed to one worker at a time
    pub batch_size: usize,
    /// When true, results keep the input id order instead of completion order
    pub preserve_order: bool,
    /// Progress callback; silent when `None`
    pub progress: Option<ProgressFn>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            maximum_results: None,
            parallel_fetches: None,
            parallel_searches: None,
            batch_size: 1,
            preserve_order: false,
            progress: None,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_maximum_results(mut self, maximum: usize) -> Self {
        self.maximum_results = Some(maximum);
        self
    }

    #[must_use]
    pub fn with_parallel_fetches(mut self, parallels: usize) -> Self {
        self.parallel_fetches = Some(parallels);
        self
    }

    #[must_use]
    pub fn with_parallel_searches(mut self, parallels: usize) -> Self {
        self.parallel_searches = Some(parallels);
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_preserved_order(mut self) -> Self {
        self.preserve_order = true;
        self
    }

    #[must_use]
    pub fn with_progress(
        mut self,
        progress: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("maximum_results", &self.maximum_results)
            .field("parallel_fetches", &self.parallel_fetches)
            .field("parallel_searches", &self.parallel_searches)
            .field("batch_size", &self.batch_size)
            .field("preserve_order", &self.preserve_order)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Default worker count for both stages
fn default_parallelism() -> usize {
    thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

/// Service composing identifier search and image download
pub struct ImageSearchService {
    metadata: MetadataClient,
    fetcher: ImageFetcher,
}

impl ImageSearchService {
    /// Create the service from configuration
    pub fn new(config: &StreetScoutConfig) -> Result<Self> {
        Ok(Self {
            metadata: MetadataClient::new(config)?,
            fetcher: ImageFetcher::new(config)?,
        })
    }

    /// Assemble the service from already-built clients
    #[must_use]
    pub fn from_parts(metadata: MetadataClient, fetcher: ImageFetcher) -> Self {
        Self { metadata, fetcher }
    }

    /// Search one region and download every matching image
    pub async fn search(
        &self,
        region: &BoundingBox,
        options: &SearchOptions,
    ) -> Result<Vec<ImageRecord>> {
        let ids = self
            .metadata
            .search_ids(region, options.maximum_results)
            .await?;
        self.download_images(ids, options).await
    }

    /// Search several regions concurrently, flatten the id lists in region
    /// order, and download every matching image.
    ///
    /// Ids found in more than one region are not deduplicated, and
    /// `maximum_results` caps each region's query independently.
    pub async fn search_many(
        &self,
        regions: &[BoundingBox],
        options: &SearchOptions,
    ) -> Result<Vec<ImageRecord>> {
        let parallels = options.parallel_searches.unwrap_or_else(default_parallelism);
        info!(
            "Searching {} regions with {} parallel queries",
            regions.len(),
            parallels
        );

        let id_lists = run_batched(
            regions.to_vec(),
            parallels,
            options.batch_size,
            true,
            |region| async move {
                self.metadata
                    .search_ids(&region, options.maximum_results)
                    .await
            },
        )
        .await?;

        let ids: Vec<String> = id_lists.into_iter().flatten().collect();
        self.download_images(ids, options).await
    }

    /// Download images for the given ids through a bounded worker pool.
    ///
    /// With `preserve_order` the result order matches `ids`; otherwise
    /// records arrive in completion order. The first failed fetch fails
    /// the whole call.
    pub async fn download_images(
        &self,
        ids: Vec<String>,
        options: &SearchOptions,
    ) -> Result<Vec<ImageRecord>> {
        let total = ids.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let parallels = options.parallel_fetches.unwrap_or_else(default_parallelism);
        info!(
            "Downloading {} images with {} parallel fetches",
            total, parallels
        );

        let completed = AtomicUsize::new(0);
        let completed = &completed;
        let progress = options.progress.as_ref();

        run_batched(
            ids,
            parallels,
            options.batch_size,
            options.preserve_order,
            move |id| async move {
                let record = self.fetcher.fetch(&id).await?;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Fetched image {} ({}/{})", record.id, done, total);
                if let Some(progress) = progress {
                    progress(done, total);
                }
                Ok(record)
            },
        )
        .await
    }
}

/// Split `items` into batches of `batch_size` and run them through `task`
/// with at most `parallels` batches in flight.
///
/// Items inside a batch run sequentially on one worker. With
/// `preserve_order` the output order matches the input order; otherwise
/// batches are collected as they complete. The first task error aborts
/// the run.
async fn run_batched<T, R, F, Fut>(
    items: Vec<T>,
    parallels: usize,
    batch_size: usize,
    preserve_order: bool,
    task: F,
) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let parallels = parallels.max(1);
    let task = &task;

    let batch_stream = stream::iter(into_batches(items, batch_size).into_iter().map(
        |batch| async move {
            let mut results = Vec::with_capacity(batch.len());
            for item in batch {
                results.push(task(item).await?);
            }
            Ok::<_, crate::error::StreetScoutError>(results)
        },
    ));

    let collected: Vec<Vec<R>> = if preserve_order {
        batch_stream.buffered(parallels).try_collect().await?
    } else {
        batch_stream.buffer_unordered(parallels).try_collect().await?
    };

    Ok(collected.into_iter().flatten().collect())
}

/// Split a list into chunks of `batch_size` without cloning items
fn into_batches<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size);
    for item in items {
        current.push(item);
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreetScoutError;
    use std::time::Duration;

    #[test]
    fn test_options_defaults() {
        let options = SearchOptions::default();
        assert!(options.maximum_results.is_none());
        assert!(options.parallel_fetches.is_none());
        assert!(options.parallel_searches.is_none());
        assert_eq!(options.batch_size, 1);
        assert!(!options.preserve_order);
        assert!(options.progress.is_none());
    }

    #[test]
    fn test_options_builders() {
        let options = SearchOptions::new()
            .with_maximum_results(50)
            .with_parallel_fetches(8)
            .with_parallel_searches(2)
            .with_batch_size(4)
            .with_preserved_order()
            .with_progress(|_, _| {});

        assert_eq!(options.maximum_results, Some(50));
        assert_eq!(options.parallel_fetches, Some(8));
        assert_eq!(options.parallel_searches, Some(2));
        assert_eq!(options.batch_size, 4);
        assert!(options.preserve_order);
        assert!(options.progress.is_some());
    }

    #[tokio::test]
    async fn test_download_images_with_no_ids_is_empty() {
        let mut config = StreetScoutConfig::default();
        config.api.token = Some("test-token".to_string());
        let service = ImageSearchService::new(&config).expect("service should build");

        let records = service
            .download_images(Vec::new(), &SearchOptions::default())
            .await
            .expect("an empty id list cannot fail");
        assert!(records.is_empty());
    }

    #[test]
    fn test_into_batches() {
        let batches = into_batches(vec![1, 2, 3, 4, 5, 6, 7], 3);
        assert_eq!(batches, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }

    #[test]
    fn test_into_batches_treats_zero_as_one() {
        let batches = into_batches(vec![1, 2], 0);
        assert_eq!(batches, vec![vec![1], vec![2]]);
    }

    #[tokio::test]
    async fn test_run_batched_preserves_input_order() {
        // Earlier items are slower, so completion order is reversed
        let delays: Vec<(usize, u64)> = vec![(0, 40), (1, 20), (2, 10), (3, 0)];

        let results = run_batched(delays, 4, 1, true, |(index, delay)| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(index)
        })
        .await
        .expect("run should succeed");

        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_run_batched_unordered_returns_everything() {
        let items: Vec<usize> = (0..20).collect();

        let results = run_batched(items, 4, 3, false, |value| async move { Ok(value * 2) })
            .await
            .expect("run should succeed");

        assert_eq!(results.len(), 20);
        let mut sorted = results;
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).map(|v| v * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_run_batched_single_failure_fails_run() {
        let items: Vec<usize> = (0..10).collect();

        let result = run_batched(items, 4, 1, false, |value| async move {
            if value == 7 {
                Err(StreetScoutError::Network("connection reset".to_string()))
            } else {
                Ok(value)
            }
        })
        .await;

        assert!(matches!(result, Err(StreetScoutError::Network(_))));
    }

    #[tokio::test]
    async fn test_run_batched_caps_concurrency() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let active = &active;
        let peak = &peak;

        let items: Vec<usize> = (0..16).collect();
        run_batched(items, 2, 1, false, move |_| async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .expect("run should succeed");

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_run_batched_keeps_batch_items_sequential() {
        // One worker per batch: item order inside a batch must hold even
        // when the batch runs alongside others
        let items: Vec<usize> = (0..6).collect();

        let results = run_batched(items, 3, 2, true, |value| async move {
            tokio::time::sleep(Duration::from_millis((6 - value as u64) * 5)).await;
            Ok(value)
        })
        .await
        .expect("run should succeed");

        assert_eq!(results, vec![0, 1, 2, 3, 4, 5]);
    }
}

//! Concurrent section classification.
//!
//! [`ElevationClassifier`] accepts sections and classifies them in the
//! background. Work flows through two bounded pools:
//!
//! - the dispatch pool runs one task per submitted section; each task asks the
//!   [`ElevationCache`] for its column's elevation range and applies
//!   [`classify_range`]
//! - the compute pool, owned by the cache, samples each column at most once
//!
//! Sections stacked in the same column therefore share a single sampling pass.
//!
//! # Example
//!
//! ```ignore
//! use terraclean::{ElevationClassifierBuilder, Section, WorldSettings};
//!
//! let classifier = ElevationClassifierBuilder::new()
//!     .sampling_step(16)
//!     .workers(4)
//!     .build(&WorldSettings::default())?;
//!
//! let class = classifier.classify(Section::new(0, -2, 0)).wait()?;
//! println!("{}", class);
//! classifier.terminate();
//! ```

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::sync::oneshot;

use crate::cache::{CacheStats, ElevationCache};
use crate::decision::{classify_range, Classification, Thresholds};
use crate::error::{Error, Result};
use crate::position::Section;
use crate::projection::Projection;
use crate::sampler::RangeSampler;
use crate::settings::WorldSettings;
use crate::source::ElevationSource;

/// Default spacing between elevation samples, in blocks.
pub const DEFAULT_SAMPLING_STEP: i64 = 8;

/// Default depth below the ground where deep underground starts.
pub const DEFAULT_DEEP_BELOW: i64 = 500;

/// Default height above the ground where the high sky starts.
pub const DEFAULT_HIGH_ABOVE: i64 = 500;

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Builder for creating an [`ElevationClassifier`].
///
/// # Example
///
/// ```ignore
/// use terraclean::{ElevationClassifierBuilder, WorldSettings};
///
/// let classifier = ElevationClassifierBuilder::new()
///     .deep_below(200)
///     .high_above(300)
///     .build(&WorldSettings::from_file("world.json")?)?;
/// ```
#[derive(Debug, Clone)]
pub struct ElevationClassifierBuilder {
    sampling_step: i64,
    deep_below: i64,
    high_above: i64,
    workers: usize,
}

impl Default for ElevationClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElevationClassifierBuilder {
    /// Create a builder with default parameters.
    pub fn new() -> Self {
        Self {
            sampling_step: DEFAULT_SAMPLING_STEP,
            deep_below: DEFAULT_DEEP_BELOW,
            high_above: DEFAULT_HIGH_ABOVE,
            workers: default_workers(),
        }
    }

    /// Spacing between elevation samples, in blocks.
    pub fn sampling_step(mut self, step: i64) -> Self {
        self.sampling_step = step;
        self
    }

    /// Depth below the lowest ground where deep underground starts.
    pub fn deep_below(mut self, blocks: i64) -> Self {
        self.deep_below = blocks;
        self
    }

    /// Height above the highest ground where the high sky starts.
    pub fn high_above(mut self, blocks: i64) -> Self {
        self.high_above = blocks;
        self
    }

    /// Number of threads in each of the dispatch and compute pools.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Build a classifier for the world described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSettings`] if a parameter is out of range or
    /// the settings select an unusable projection or elevation source.
    pub fn build(self, settings: &WorldSettings) -> Result<ElevationClassifier> {
        let projection = settings.projection()?;
        let source = settings.elevation_source()?;
        self.build_with(projection, source)
    }

    /// Build a classifier from an explicit projection and elevation source.
    pub fn build_with(
        self,
        projection: Arc<dyn Projection>,
        source: Arc<dyn ElevationSource>,
    ) -> Result<ElevationClassifier> {
        if self.workers == 0 {
            return Err(Error::InvalidSettings(
                "worker count must be at least 1".into(),
            ));
        }
        let thresholds = Thresholds::new(self.high_above, self.deep_below)?;

        let terminated = Arc::new(AtomicBool::new(false));
        let sampler = RangeSampler::new(projection, source, self.sampling_step)?
            .with_cancel_flag(terminated.clone());
        let cache = ElevationCache::new(Arc::new(sampler), self.workers)?;

        let dispatch = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("terraclean-dispatch-{}", i))
            .build()?;

        tracing::info!(
            workers = self.workers,
            sampling_step = self.sampling_step,
            deep_below = self.deep_below,
            high_above = self.high_above,
            "Elevation classifier started"
        );

        Ok(ElevationClassifier {
            inner: Arc::new(Inner {
                dispatch,
                cache,
                thresholds,
                sampling_step: self.sampling_step,
                workers: self.workers,
                queued: AtomicUsize::new(0),
                terminated,
            }),
        })
    }
}

struct Inner {
    dispatch: ThreadPool,
    cache: ElevationCache,
    thresholds: Thresholds,
    sampling_step: i64,
    workers: usize,
    queued: AtomicUsize,
    terminated: Arc<AtomicBool>,
}

impl Inner {
    fn lookup(&self, section: Section) -> Result<Classification> {
        let elevation = self.cache.get_range(section.column())?;
        classify_range(&section.range_y(), elevation, &self.thresholds)
    }

    /// Classify `section`, mapping every unexpected failure to
    /// [`Classification::Failed`]. `None` once terminated.
    fn resolve(&self, section: Section) -> Option<Classification> {
        if self.terminated.load(Ordering::Acquire) {
            return None;
        }
        match panic::catch_unwind(AssertUnwindSafe(|| self.lookup(section))) {
            Ok(Ok(class)) => Some(class),
            Ok(Err(Error::Terminated)) => None,
            Ok(Err(e)) => {
                tracing::error!(section = %section, error = %e, "Classification failed");
                Some(Classification::Failed)
            }
            Err(_) => {
                tracing::error!(section = %section, "Classification panicked");
                Some(Classification::Failed)
            }
        }
    }
}

/// Decrements the outstanding-work counter when a dispatch task ends.
struct QueueGuard<'a>(&'a AtomicUsize);

impl Drop for QueueGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Classifies sections against the ground elevation of the world.
///
/// Cloning is cheap and clones share the same pools and cache.
#[derive(Clone)]
pub struct ElevationClassifier {
    inner: Arc<Inner>,
}

impl ElevationClassifier {
    /// Create a builder with default parameters.
    pub fn builder() -> ElevationClassifierBuilder {
        ElevationClassifierBuilder::new()
    }

    /// Classify `section` in the background.
    ///
    /// Returns immediately. The handle resolves to the classification, or to
    /// [`Error::Terminated`] if the classifier is terminated first.
    pub fn classify(&self, section: Section) -> ClassificationHandle {
        let (sender, receiver) = oneshot::channel();
        self.classify_then(section, move |class| {
            // The requester may have dropped its handle
            let _ = sender.send(class);
        });
        ClassificationHandle { receiver }
    }

    /// Classify `section` in the background and pass the result to `callback`.
    ///
    /// The callback runs on a dispatch thread. It is never called for work
    /// discarded by [`terminate`](Self::terminate), and the section stays
    /// counted in [`queue_size`](Self::queue_size) until the callback returns.
    pub fn classify_then<F>(&self, section: Section, callback: F)
    where
        F: FnOnce(Classification) + Send + 'static,
    {
        if self.is_terminated() {
            tracing::debug!(section = %section, "Classifier terminated, request dropped");
            return;
        }

        self.inner.queued.fetch_add(1, Ordering::AcqRel);
        let inner = self.inner.clone();
        self.inner.dispatch.spawn(move || {
            let _guard = QueueGuard(&inner.queued);
            let Some(class) = inner.resolve(section) else {
                return;
            };
            if panic::catch_unwind(AssertUnwindSafe(|| callback(class))).is_err() {
                tracing::error!(section = %section, "Classification callback panicked");
            }
        });
    }

    /// Number of submitted sections not yet classified.
    pub fn queue_size(&self) -> usize {
        self.inner.queued.load(Ordering::Acquire)
    }

    /// Number of columns known to the elevation cache.
    pub fn cache_count(&self) -> usize {
        self.inner.cache.count()
    }

    /// Forget every cached column elevation range.
    ///
    /// Sections already waiting on a column still get classified.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Get elevation cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.inner.thresholds
    }

    pub fn sampling_step(&self) -> i64 {
        self.inner.sampling_step
    }

    pub fn workers(&self) -> usize {
        self.inner.workers
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::Acquire)
    }

    /// Stop accepting work and discard everything not yet classified.
    ///
    /// Pending handles resolve to [`Error::Terminated`] and the elevation
    /// cache is released. Calling this more than once has no further effect.
    pub fn terminate(&self) {
        if self.inner.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.cache.close();
        tracing::info!(discarded = self.queue_size(), "Elevation classifier terminated");
    }
}

/// The pending result of [`ElevationClassifier::classify`].
///
/// Either block on it with [`wait`](Self::wait) or `.await` it.
#[derive(Debug)]
pub struct ClassificationHandle {
    receiver: oneshot::Receiver<Classification>,
}

impl ClassificationHandle {
    /// Block until the classification is known.
    ///
    /// Must not be called from within an async runtime; `.await` the handle
    /// there instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminated`] if the work was discarded.
    pub fn wait(self) -> Result<Classification> {
        self.receiver.blocking_recv().map_err(|_| Error::Terminated)
    }

    /// The classification if already known, `Ok(None)` while pending.
    pub fn try_get(&mut self) -> Result<Option<Classification>> {
        match self.receiver.try_recv() {
            Ok(class) => Ok(Some(class)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(Error::Terminated),
        }
    }
}

impl Future for ClassificationHandle {
    type Output = Result<Classification>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| Error::Terminated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{EquirectangularProjection, GeoPoint};
    use crate::source::FlatElevation;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn flat_classifier(elevation: f64) -> ElevationClassifier {
        ElevationClassifierBuilder::new()
            .workers(2)
            .build_with(
                Arc::new(EquirectangularProjection::default()),
                Arc::new(FlatElevation::new(elevation)),
            )
            .unwrap()
    }

    /// Sleeps on every sample so work is still in flight when inspected.
    struct SlowSource;

    impl ElevationSource for SlowSource {
        fn elevation_at(&self, _point: GeoPoint) -> Result<f64> {
            thread::sleep(Duration::from_millis(20));
            Ok(0.0)
        }
    }

    fn wait_idle(classifier: &ElevationClassifier) {
        let start = Instant::now();
        while classifier.queue_size() > 0 {
            assert!(start.elapsed() < Duration::from_secs(10), "classifier stuck");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ElevationClassifierBuilder::default();
        assert_eq!(builder.sampling_step, 8);
        assert_eq!(builder.deep_below, 500);
        assert_eq!(builder.high_above, 500);
        assert!(builder.workers >= 1);
    }

    #[test]
    fn test_builder_validation() {
        let settings = WorldSettings::default();
        assert!(matches!(
            ElevationClassifierBuilder::new().workers(0).build(&settings),
            Err(Error::InvalidSettings(_))
        ));
        assert!(matches!(
            ElevationClassifierBuilder::new().sampling_step(0).build(&settings),
            Err(Error::InvalidSettings(_))
        ));
        assert!(matches!(
            ElevationClassifierBuilder::new().deep_below(-1).build(&settings),
            Err(Error::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_classify_wait() {
        let classifier = flat_classifier(0.0);
        assert_eq!(
            classifier.classify(Section::new(0, 0, 0)).wait().unwrap(),
            Classification::Surface
        );
        assert_eq!(
            classifier.classify(Section::new(0, 1, 0)).wait().unwrap(),
            Classification::Sky
        );
        assert_eq!(classifier.cache_count(), 1);
    }

    #[test]
    fn test_classify_then() {
        let classifier = flat_classifier(0.0);
        let (sender, receiver) = mpsc::channel();

        for y in -3..=3 {
            let sender = sender.clone();
            classifier.classify_then(Section::new(1, y, 1), move |class| {
                sender.send((y, class)).unwrap();
            });
        }
        drop(sender);

        let mut results: Vec<_> = receiver.iter().collect();
        results.sort();
        assert_eq!(results.len(), 7);
        assert_eq!(results[3], (0, Classification::Surface));
        assert_eq!(results[0], (-3, Classification::UndergroundDeep));
        assert_eq!(results[6], (3, Classification::SkyHigh));

        wait_idle(&classifier);
        assert_eq!(classifier.queue_size(), 0);
    }

    #[test]
    fn test_clear_cache() {
        let classifier = flat_classifier(0.0);
        classifier.classify(Section::new(0, 0, 0)).wait().unwrap();
        classifier.classify(Section::new(1, 0, 0)).wait().unwrap();
        assert_eq!(classifier.cache_count(), 2);

        classifier.clear_cache();
        assert_eq!(classifier.cache_count(), 0);

        classifier.classify(Section::new(0, 0, 0)).wait().unwrap();
        assert_eq!(classifier.cache_count(), 1);
        assert_eq!(classifier.cache_stats().miss_count, 3);
    }

    #[test]
    fn test_try_get() {
        let classifier = flat_classifier(0.0);
        let mut handle = classifier.classify(Section::new(0, 0, 0));

        let start = Instant::now();
        loop {
            if let Some(class) = handle.try_get().unwrap() {
                assert_eq!(class, Classification::Surface);
                break;
            }
            assert!(start.elapsed() < Duration::from_secs(10));
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_terminate_discards_work() {
        let classifier = ElevationClassifierBuilder::new()
            .workers(1)
            .sampling_step(1)
            .build_with(
                Arc::new(EquirectangularProjection::default()),
                Arc::new(SlowSource),
            )
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|x| classifier.classify(Section::new(x, 0, 0)))
            .collect();
        classifier.terminate();
        classifier.terminate();

        for handle in handles {
            assert!(matches!(handle.wait(), Err(Error::Terminated)));
        }
        wait_idle(&classifier);
        assert_eq!(classifier.cache_count(), 0);

        // Nothing is accepted afterwards
        assert!(classifier.is_terminated());
        assert!(matches!(
            classifier.classify(Section::new(0, 0, 0)).wait(),
            Err(Error::Terminated)
        ));
        assert_eq!(classifier.queue_size(), 0);
    }

    #[test]
    fn test_clear_cache_during_computation() {
        let classifier = ElevationClassifierBuilder::new()
            .workers(2)
            .sampling_step(128)
            .build_with(
                Arc::new(EquirectangularProjection::default()),
                Arc::new(SlowSource),
            )
            .unwrap();
        let (sender, receiver) = mpsc::channel();

        classifier.classify_then(Section::new(5, 0, 5), move |class| {
            sender.send(class).unwrap();
        });
        let handle = classifier.classify(Section::new(5, 1, 5));
        thread::sleep(Duration::from_millis(20));
        classifier.clear_cache();

        assert_eq!(handle.wait().unwrap(), Classification::Sky);
        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(10)).unwrap(),
            Classification::Surface
        );
        assert!(!classifier.is_terminated());
    }

    #[test]
    fn test_callback_panic_is_contained() {
        let classifier = flat_classifier(0.0);
        classifier.classify_then(Section::new(0, 0, 0), |_| panic!("callback"));
        wait_idle(&classifier);

        assert_eq!(
            classifier.classify(Section::new(0, 0, 0)).wait().unwrap(),
            Classification::Surface
        );
    }
}

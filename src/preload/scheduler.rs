//! Priority-aware image preloading.
//!
//! Priority images are hinted and warmed first, in batches with no delay in
//! between. Everything else waits for the host to go idle (bounded by
//! `idle_timeout`, or a short fixed delay when there is no idle signal) and
//! then goes out in smaller batches with a pause between them. A failed
//! preload is logged and never cancels the rest of its batch.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rustc_hash::FxHashSet;
use tokio::time::{Instant, sleep, timeout};
use url::Url;

use super::document::Document;
use super::hint::{ResourceHint, external_origin};
use crate::debug;
use crate::image::{ImageRequest, ImageSource};

/// Resolves when the host has spare capacity for background work.
#[async_trait]
pub trait IdleSignal: Send + Sync {
    async fn idle(&self);
}

#[derive(Debug, Clone)]
pub struct PreloadOptions {
    pub priority_batch: usize,
    pub idle_batch: usize,
    /// Pause between non-priority batches.
    pub batch_delay: Duration,
    /// Upper bound on waiting for an [`IdleSignal`].
    pub idle_timeout: Duration,
    /// Wait used instead of an idle signal when none is available.
    pub fallback_delay: Duration,
    /// Site origin; sources on other hosts get a preconnect hint.
    pub site: Option<Url>,
}

impl Default for PreloadOptions {
    fn default() -> Self {
        Self {
            priority_batch: 6,
            idle_batch: 3,
            batch_delay: Duration::from_millis(100),
            idle_timeout: Duration::from_millis(2000),
            fallback_delay: Duration::from_millis(100),
            site: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub priority: bool,
    /// Time from the start of scheduling to the start of this batch.
    pub offset: Duration,
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.loaded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreloadReport {
    pub batches: Vec<BatchReport>,
    /// Sources skipped because the document already had them.
    pub skipped: Vec<String>,
}

impl PreloadReport {
    pub fn loaded(&self) -> usize {
        self.batches.iter().map(|b| b.loaded.len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.batches.iter().map(|b| b.failed.len()).sum()
    }
}

pub struct PreloadScheduler<'a> {
    source: &'a dyn ImageSource,
    idle: Option<&'a dyn IdleSignal>,
    options: PreloadOptions,
}

impl<'a> PreloadScheduler<'a> {
    pub fn new(source: &'a dyn ImageSource, options: PreloadOptions) -> Self {
        Self {
            source,
            idle: None,
            options,
        }
    }

    pub fn with_idle(mut self, idle: &'a dyn IdleSignal) -> Self {
        self.idle = Some(idle);
        self
    }

    /// Hint and warm every image in `images`, priority ones first.
    pub async fn schedule(&self, images: &[ImageRequest], doc: &mut dyn Document) -> PreloadReport {
        let start = Instant::now();
        let mut report = PreloadReport::default();

        let mut seen = FxHashSet::default();
        let (priority, deferred): (Vec<_>, Vec<_>) = images
            .iter()
            .filter(|req| seen.insert(req.canonical_path.as_str()))
            .partition(|req| req.is_priority);

        let priority = self.pending(priority, doc, &mut report);
        if !priority.is_empty() {
            self.preconnect(&priority, doc);
            for req in &priority {
                doc.insert_hint(ResourceHint::preload(&req.canonical_path));
            }
            self.run(&priority, true, start, doc, &mut report).await;
        }

        if deferred.is_empty() {
            return report;
        }
        self.wait_idle().await;

        // Re-check: a priority load may have covered the same source.
        let deferred = self.pending(deferred, doc, &mut report);
        if !deferred.is_empty() {
            self.preconnect(&deferred, doc);
            for req in &deferred {
                doc.insert_hint(ResourceHint::prefetch(&req.canonical_path));
            }
            self.run(&deferred, false, start, doc, &mut report).await;
        }

        report
    }

    fn pending<'r>(
        &self,
        requests: Vec<&'r ImageRequest>,
        doc: &dyn Document,
        report: &mut PreloadReport,
    ) -> Vec<&'r ImageRequest> {
        requests
            .into_iter()
            .filter(|req| {
                let loaded = doc.is_loaded(&req.canonical_path);
                if loaded {
                    report.skipped.push(req.canonical_path.clone());
                }
                !loaded
            })
            .collect()
    }

    fn preconnect(&self, requests: &[&ImageRequest], doc: &mut dyn Document) {
        for req in requests {
            if let Some(origin) = external_origin(&req.canonical_path, self.options.site.as_ref())
                && doc.insert_hint(ResourceHint::preconnect(&origin))
            {
                debug!("preload"; "preconnect {}", origin);
            }
        }
    }

    async fn wait_idle(&self) {
        match self.idle {
            Some(idle) => {
                if timeout(self.options.idle_timeout, idle.idle()).await.is_err() {
                    debug!("preload"; "idle signal timed out");
                }
            }
            None => sleep(self.options.fallback_delay).await,
        }
    }

    async fn run(
        &self,
        requests: &[&ImageRequest],
        priority: bool,
        start: Instant,
        doc: &mut dyn Document,
        report: &mut PreloadReport,
    ) {
        let (size, delay) = if priority {
            (self.options.priority_batch.max(1), None)
        } else {
            (self.options.idle_batch.max(1), Some(self.options.batch_delay))
        };

        for (index, chunk) in requests.chunks(size).enumerate() {
            if index > 0
                && let Some(delay) = delay
            {
                sleep(delay).await;
            }

            let offset = start.elapsed();
            let results = join_all(chunk.iter().map(|req| async move {
                (req, self.source.load(&req.canonical_path).await)
            }))
            .await;

            let mut batch = BatchReport {
                priority,
                offset,
                loaded: Vec::new(),
                failed: Vec::new(),
            };
            for (req, result) in results {
                let src = req.canonical_path.clone();
                match result {
                    Ok(()) => {
                        doc.mark_loaded(&src);
                        batch.loaded.push(src);
                    }
                    Err(e) => {
                        debug!("preload"; "failed to preload {}: {}", src, e);
                        batch.failed.push(src);
                    }
                }
            }
            report.batches.push(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::LoadError;
    use crate::preload::HtmlDocument;
    use crate::preload::hint::HintRel;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recording {
        loads: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        latency: Duration,
        failing: FxHashSet<String>,
    }

    #[async_trait]
    impl ImageSource for Recording {
        async fn load(&self, src: &str) -> Result<(), LoadError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.latency.is_zero() {
                sleep(self.latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.loads.lock().push(src.to_string());
            if self.failing.contains(src) {
                return Err(LoadError::NotFound(src.to_string()));
            }
            Ok(())
        }
    }

    struct Immediate;

    #[async_trait]
    impl IdleSignal for Immediate {
        async fn idle(&self) {}
    }

    struct Never;

    #[async_trait]
    impl IdleSignal for Never {
        async fn idle(&self) {
            std::future::pending::<()>().await
        }
    }

    fn images(count: usize, priority: bool) -> Vec<ImageRequest> {
        (0..count)
            .map(|i| ImageRequest::new(format!("/images/{i}.jpg")).priority(priority))
            .collect()
    }

    fn sizes(report: &PreloadReport) -> Vec<usize> {
        report.batches.iter().map(BatchReport::len).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_images_go_out_in_delayed_batches_of_three() {
        let source = Recording::default();
        let scheduler = PreloadScheduler::new(&source, PreloadOptions::default());
        let mut doc = HtmlDocument::default();

        let report = scheduler.schedule(&images(10, false), &mut doc).await;

        assert_eq!(sizes(&report), vec![3, 3, 3, 1]);
        let offsets: Vec<_> = report.batches.iter().map(|b| b.offset.as_millis()).collect();
        // fallback delay, then 100ms between batches
        assert_eq!(offsets, vec![100, 200, 300, 400]);
        assert_eq!(source.loads.lock().len(), 10);
        assert!(doc.added().iter().all(|h| h.rel == HintRel::Prefetch));
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_images_go_out_back_to_back_in_batches_of_six() {
        let source = Recording::default();
        let scheduler = PreloadScheduler::new(&source, PreloadOptions::default());
        let mut doc = HtmlDocument::default();

        let report = scheduler.schedule(&images(10, true), &mut doc).await;

        assert_eq!(sizes(&report), vec![6, 4]);
        assert!(report.batches.iter().all(|b| b.priority && b.offset.is_zero()));
        assert!(doc.added().iter().all(|h| h.rel == HintRel::Preload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_bound_concurrency() {
        let source = Recording {
            latency: Duration::from_millis(30),
            ..Recording::default()
        };
        let scheduler = PreloadScheduler::new(&source, PreloadOptions::default());

        scheduler
            .schedule(&images(13, true), &mut HtmlDocument::default())
            .await;
        assert_eq!(source.peak.load(Ordering::SeqCst), 6);

        source.peak.store(0, Ordering::SeqCst);
        let mut deferred = images(7, false);
        for req in &mut deferred {
            req.canonical_path.push_str("?later");
        }
        scheduler.schedule(&deferred, &mut HtmlDocument::default()).await;
        assert_eq!(source.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_runs_before_deferred() {
        let source = Recording::default();
        let scheduler = PreloadScheduler::new(&source, PreloadOptions::default());
        let mut requests = images(2, false);
        requests.push(ImageRequest::new("/images/hero.jpg").priority(true));

        let report = scheduler.schedule(&requests, &mut HtmlDocument::default()).await;

        assert_eq!(source.loads.lock()[0], "/images/hero.jpg");
        assert!(report.batches[0].priority);
        assert!(!report.batches[1].priority);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaded_images_are_skipped() {
        let source = Recording::default();
        let scheduler = PreloadScheduler::new(&source, PreloadOptions::default());
        let mut doc = HtmlDocument::default();
        doc.mark_loaded("/images/1.jpg");

        let report = scheduler.schedule(&images(3, false), &mut doc).await;

        assert_eq!(report.skipped, vec!["/images/1.jpg".to_string()]);
        assert_eq!(report.loaded(), 2);
        assert!(!source.loads.lock().contains(&"/images/1.jpg".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_cancel_batch() {
        let mut failing = FxHashSet::default();
        failing.insert("/images/1.jpg".to_string());
        let source = Recording {
            failing,
            ..Recording::default()
        };
        let scheduler = PreloadScheduler::new(&source, PreloadOptions::default());

        let report = scheduler
            .schedule(&images(3, true), &mut HtmlDocument::default())
            .await;

        assert_eq!(report.failed(), 1);
        assert_eq!(report.loaded(), 2);
        assert_eq!(source.loads.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preconnect_once_per_external_host() {
        let source = Recording::default();
        let options = PreloadOptions {
            site: Url::parse("https://me.dev").ok(),
            ..PreloadOptions::default()
        };
        let scheduler = PreloadScheduler::new(&source, options);
        let mut doc = HtmlDocument::default();
        let requests = vec![
            ImageRequest::new("https://cdn.example.com/a.jpg").priority(true),
            ImageRequest::new("https://cdn.example.com/b.jpg"),
            ImageRequest::new("https://me.dev/c.jpg"),
            ImageRequest::new("/d.jpg"),
        ];

        scheduler.schedule(&requests, &mut doc).await;

        let preconnects: Vec<_> = doc
            .added()
            .iter()
            .filter(|h| h.rel == HintRel::Preconnect)
            .map(|h| h.href.as_str())
            .collect();
        assert_eq!(preconnects, vec!["https://cdn.example.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_signal_starts_deferred_work() {
        let source = Recording::default();

        let ready = Immediate;
        let scheduler = PreloadScheduler::new(&source, PreloadOptions::default()).with_idle(&ready);
        let report = scheduler
            .schedule(&images(1, false), &mut HtmlDocument::default())
            .await;
        assert!(report.batches[0].offset.is_zero());

        let never = Never;
        let scheduler = PreloadScheduler::new(&source, PreloadOptions::default()).with_idle(&never);
        let report = scheduler
            .schedule(&images(1, false), &mut HtmlDocument::default())
            .await;
        assert_eq!(report.batches[0].offset, Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_sources_load_once() {
        let source = Recording::default();
        let scheduler = PreloadScheduler::new(&source, PreloadOptions::default());
        let requests = vec![
            ImageRequest::new("/a.jpg").priority(true),
            ImageRequest::new("/a.jpg"),
        ];

        scheduler.schedule(&requests, &mut HtmlDocument::default()).await;
        assert_eq!(source.loads.lock().len(), 1);
    }
}

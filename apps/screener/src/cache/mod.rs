//! Content-addressed extraction cache.
//!
//! Keyed by the SHA-256 fingerprint of the document bytes, so a cached entry is
//! valid forever. Each fingerprint owns a `OnceCell`: the first caller checks
//! the durable store and, on a miss, runs the computation; concurrent callers
//! for the same fingerprint wait on the same cell (single-flight). Failed
//! computations leave the cell empty so the next caller retries.
//! There is no eviction.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::extraction::ExtractedText;
use crate::models::document::{Document, Fingerprint};

pub mod store;

use store::{CacheStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Served from memory, including callers that waited on an in-flight computation.
    pub memory_hits: u64,
    /// Served from the durable store.
    pub store_hits: u64,
    /// Times the compute function actually ran.
    pub computations: u64,
    pub entries: usize,
}

pub struct ExtractionCache {
    store: Arc<dyn CacheStore>,
    cells: DashMap<Fingerprint, Arc<OnceCell<ExtractedText>>>,
    memory_hits: AtomicU64,
    store_hits: AtomicU64,
    computations: AtomicU64,
}

impl ExtractionCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            cells: DashMap::new(),
            memory_hits: AtomicU64::new(0),
            store_hits: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// Returns the cached text for `document`, running `compute` at most once
    /// per fingerprint across concurrent callers.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        document: &Document,
        compute: F,
    ) -> Result<ExtractedText, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExtractedText, E>>,
    {
        let fingerprint = document.fingerprint();
        let cell = self.cells.entry(fingerprint.clone()).or_default().clone();

        let initialized_here = AtomicBool::new(false);
        let text = cell
            .get_or_try_init(|| async {
                initialized_here.store(true, Ordering::Relaxed);

                match self.store.get(&fingerprint).await {
                    Ok(Some(text)) => {
                        self.store_hits.fetch_add(1, Ordering::Relaxed);
                        debug!("{}: extraction served from durable cache", document.id());
                        return Ok(text);
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Cache read failed for {fingerprint}: {e}; recomputing"),
                }

                self.computations.fetch_add(1, Ordering::Relaxed);
                let text = compute().await?;

                if let Err(e) = self.store.put(&fingerprint, &text).await {
                    warn!("Cache write failed for {fingerprint}: {e}");
                }
                Ok::<_, E>(text)
            })
            .await?;

        if !initialized_here.load(Ordering::Relaxed) {
            self.memory_hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(text.clone())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            entries: self.cells.iter().filter(|c| c.value().initialized()).count(),
        }
    }

    /// Flushes the durable store. Call once at shutdown.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.store.flush().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::models::document::DocumentFormat;
    use store::testing::MemoryStore;
    use store::FsCacheStore;

    fn doc(id: &str, body: &str) -> Document {
        Document::new(id, DocumentFormat::Txt, body.as_bytes().to_vec())
    }

    async fn counted(counter: &AtomicUsize, text: &str) -> Result<ExtractedText, String> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(ExtractedText::direct(text.to_string()))
    }

    #[tokio::test]
    async fn test_second_lookup_does_not_recompute() {
        let cache = ExtractionCache::new(Arc::new(MemoryStore::default()));
        let calls = AtomicUsize::new(0);
        let document = doc("a.txt", "same bytes");

        let first = cache
            .get_or_compute(&document, || counted(&calls, "same bytes"))
            .await
            .unwrap();
        let second = cache
            .get_or_compute(&document, || counted(&calls, "same bytes"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_same_bytes_different_name_share_entry() {
        let cache = ExtractionCache::new(Arc::new(MemoryStore::default()));
        let calls = AtomicUsize::new(0);

        cache
            .get_or_compute(&doc("a.txt", "identical"), || counted(&calls, "identical"))
            .await
            .unwrap();
        cache
            .get_or_compute(&doc("copy-of-a.txt", "identical"), || {
                counted(&calls, "identical")
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_single_flight() {
        let cache = Arc::new(ExtractionCache::new(Arc::new(MemoryStore::default())));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                let document = doc(&format!("copy-{i}.txt"), "slow ocr document");
                cache
                    .get_or_compute(&document, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(ExtractedText::direct("slow ocr document".to_string()))
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().text, "slow ocr document");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().memory_hits, 7);
    }

    #[tokio::test]
    async fn test_failed_computation_is_not_cached() {
        let store = Arc::new(MemoryStore::default());
        let cache = ExtractionCache::new(store.clone());
        let document = doc("a.txt", "flaky");

        let err = cache
            .get_or_compute(&document, || async { Err::<ExtractedText, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);

        let text = cache
            .get_or_compute(&document, || async {
                Ok::<_, &str>(ExtractedText::direct("flaky".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(text.text, "flaky");
        assert_eq!(cache.stats().computations, 2);
    }

    #[tokio::test]
    async fn test_persisted_store_skips_extraction_in_a_new_process() {
        let dir = tempfile::tempdir().unwrap();
        let document = doc("a.txt", "persist me");
        let calls = AtomicUsize::new(0);

        {
            let store = Arc::new(FsCacheStore::open(dir.path()).await.unwrap());
            let cache = ExtractionCache::new(store);
            cache
                .get_or_compute(&document, || counted(&calls, "persist me"))
                .await
                .unwrap();
            cache.flush().await.unwrap();
        }

        let store = Arc::new(FsCacheStore::open(dir.path()).await.unwrap());
        let cache = ExtractionCache::new(store);
        let text = cache
            .get_or_compute(&document, || counted(&calls, "persist me"))
            .await
            .unwrap();

        assert_eq!(text.text, "persist me");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().store_hits, 1);
    }
}

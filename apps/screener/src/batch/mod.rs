//! Batch orchestration: one job description, many resumes.
//!
//! Requirements are extracted once, then a fixed pool of workers pulls
//! documents from a shared queue and runs extract → parse → score for each,
//! under a per-document timeout. Failures are collected, never propagated;
//! ranking happens after every worker has finished.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::ExtractionCache;
use crate::extraction::{ExtractionError, TextExtractor};
use crate::models::batch::{BatchResult, DocumentPhase, DocumentState, FailureRecord, ScoreResult};
use crate::models::document::{Document, Submission};
use crate::models::profile::RequirementSet;
use crate::parsing::profile::ProfileParser;
use crate::parsing::requirements::RequirementExtractor;
use crate::parsing::{ParseError, StructuredParser};
use crate::scoring::{FitScorer, ScoringError};

pub mod report;

const MAX_DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Job description is empty")]
    EmptyJobDescription,

    #[error("Requirement extraction failed: {0}")]
    Requirements(#[source] ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub workers: usize,
    /// Covers extraction, parsing and scoring of one document.
    pub document_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            document_timeout: Duration::from_secs(300),
        }
    }
}

/// min(8, available parallelism).
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_WORKERS)
}

/// Everything a worker needs, shared read-only across the pool.
struct Pipeline {
    extractor: TextExtractor,
    cache: Arc<ExtractionCache>,
    profiles: ProfileParser,
    scorer: Arc<dyn FitScorer>,
    requirements: RequirementSet,
    document_timeout: Duration,
}

#[derive(Debug, Error)]
enum DocumentError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl DocumentError {
    fn phase(&self) -> DocumentPhase {
        match self {
            DocumentError::Extraction(_) => DocumentPhase::Extracting,
            DocumentError::Parse(_) => DocumentPhase::Parsing,
            DocumentError::Scoring(_) => DocumentPhase::Scoring,
        }
    }
}

enum Outcome {
    Scored(ScoreResult),
    Failed(FailureRecord),
}

struct Job {
    index: usize,
    document: Document,
}

pub struct BatchOrchestrator {
    extractor: TextExtractor,
    cache: Arc<ExtractionCache>,
    profiles: ProfileParser,
    requirements: RequirementExtractor,
    scorer: Arc<dyn FitScorer>,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(
        extractor: TextExtractor,
        cache: Arc<ExtractionCache>,
        parser: StructuredParser,
        scorer: Arc<dyn FitScorer>,
        config: BatchConfig,
    ) -> Self {
        Self {
            extractor,
            cache,
            profiles: ProfileParser::new(parser.clone()),
            requirements: RequirementExtractor::new(parser),
            scorer,
            config,
        }
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    pub async fn run(
        &self,
        submissions: Vec<Submission>,
        job_description: &str,
    ) -> Result<BatchResult, BatchError> {
        if job_description.trim().is_empty() {
            return Err(BatchError::EmptyJobDescription);
        }

        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();

        let requirements = self
            .requirements
            .extract(job_description)
            .await
            .map_err(BatchError::Requirements)?;
        if requirements.is_empty() {
            warn!("Batch {batch_id}: no scorable requirements found; every candidate will score 0");
        }

        let ids: Vec<String> = submissions.iter().map(|s| s.id().to_string()).collect();
        let mut failures: Vec<(usize, FailureRecord)> = Vec::new();
        let (job_tx, job_rx) = async_channel::unbounded::<Job>();

        for (index, submission) in submissions.into_iter().enumerate() {
            match submission {
                Submission::Accepted(document) => {
                    let _ = job_tx.send(Job { index, document }).await;
                }
                Submission::Rejected { id, reason } => {
                    warn!("{id}: rejected at submission: {reason}");
                    failures.push((
                        index,
                        FailureRecord {
                            document_id: id,
                            phase: DocumentPhase::Submission,
                            reason,
                        },
                    ));
                }
            }
        }
        // Workers exit once the queue is drained.
        job_tx.close();

        let queued = job_rx.len();
        let workers = self.config.workers.max(1).min(queued.max(1));
        info!(
            "Batch {batch_id}: {queued} documents queued, {} rejected, {workers} workers",
            failures.len()
        );

        let pipeline = Arc::new(Pipeline {
            extractor: self.extractor.clone(),
            cache: self.cache.clone(),
            profiles: self.profiles.clone(),
            scorer: self.scorer.clone(),
            requirements: requirements.clone(),
            document_timeout: self.config.document_timeout,
        });

        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, Outcome)>();
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            handles.push(tokio::spawn(worker_loop(
                worker,
                job_rx.clone(),
                pipeline.clone(),
                result_tx.clone(),
            )));
        }
        drop(job_rx);
        drop(result_tx);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Batch {batch_id}: worker task failed: {e}");
            }
        }

        let mut ranked: Vec<(usize, ScoreResult)> = Vec::new();
        let mut reported = vec![false; ids.len()];
        for (index, _) in &failures {
            reported[*index] = true;
        }
        while let Some((index, outcome)) = result_rx.recv().await {
            reported[index] = true;
            match outcome {
                Outcome::Scored(result) => ranked.push((index, result)),
                Outcome::Failed(failure) => failures.push((index, failure)),
            }
        }

        // A document whose worker died mid-flight produced no outcome.
        for (index, done) in reported.iter().enumerate() {
            if !done {
                failures.push((
                    index,
                    FailureRecord {
                        document_id: ids[index].clone(),
                        phase: DocumentPhase::Extracting,
                        reason: "worker task aborted before finishing".to_string(),
                    },
                ));
            }
        }

        let ranked = rank(ranked);
        failures.sort_by_key(|(index, _)| *index);
        let failures: Vec<FailureRecord> = failures.into_iter().map(|(_, f)| f).collect();

        info!(
            "Batch {batch_id}: {} scored, {} failed",
            ranked.len(),
            failures.len()
        );

        Ok(BatchResult {
            batch_id,
            ranked,
            failures,
            requirements,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Descending by score; equal scores keep submission order.
fn rank(mut scored: Vec<(usize, ScoreResult)>) -> Vec<ScoreResult> {
    scored.sort_by(|(ia, a), (ib, b)| b.score.total_cmp(&a.score).then(ia.cmp(ib)));
    scored.into_iter().map(|(_, result)| result).collect()
}

async fn worker_loop(
    worker: usize,
    jobs: async_channel::Receiver<Job>,
    pipeline: Arc<Pipeline>,
    results: mpsc::UnboundedSender<(usize, Outcome)>,
) {
    while let Ok(Job { index, document }) = jobs.recv().await {
        let outcome = pipeline.run_document(&document).await;
        if results.send((index, outcome)).is_err() {
            break;
        }
    }
    debug!("Worker {worker} finished");
}

impl Pipeline {
    async fn run_document(&self, document: &Document) -> Outcome {
        let (state_tx, state_rx) = watch::channel(DocumentState::Pending);

        match tokio::time::timeout(self.document_timeout, self.process(document, &state_tx)).await {
            Ok(Ok(result)) => {
                state_tx.send_replace(DocumentState::Done);
                debug!("{}: scored {}", document.id(), result.score);
                Outcome::Scored(result)
            }
            Ok(Err(e)) => {
                let reason = e.to_string();
                warn!("{}: failed while {}: {reason}", document.id(), e.phase());
                state_tx.send_replace(DocumentState::Failed(reason.clone()));
                Outcome::Failed(FailureRecord {
                    document_id: document.id().to_string(),
                    phase: e.phase(),
                    reason,
                })
            }
            Err(_) => {
                let phase = state_rx.borrow().phase();
                let reason = format!("timed out after {:?}", self.document_timeout);
                warn!("{}: {reason} while {phase}", document.id());
                state_tx.send_replace(DocumentState::Failed(reason.clone()));
                Outcome::Failed(FailureRecord {
                    document_id: document.id().to_string(),
                    phase,
                    reason,
                })
            }
        }
    }

    async fn process(
        &self,
        document: &Document,
        state: &watch::Sender<DocumentState>,
    ) -> Result<ScoreResult, DocumentError> {
        state.send_replace(DocumentState::Extracting);
        debug!("{}: extracting ({})", document.id(), document.format());
        let extracted = self
            .cache
            .get_or_compute(document, || self.extractor.extract(document))
            .await?;
        if extracted.is_blank() {
            return Err(ExtractionError::EmptyText.into());
        }
        if extracted.ocr_page_count() > 0 {
            debug!(
                "{}: {} page(s) needed OCR",
                document.id(),
                extracted.ocr_page_count()
            );
        }

        state.send_replace(DocumentState::Parsing);
        let profile = self.profiles.parse(&extracted.text).await?;

        state.send_replace(DocumentState::Scoring);
        let fit = self.scorer.score(&profile, &self.requirements).await?;

        Ok(ScoreResult::new(document.id(), profile, fit))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

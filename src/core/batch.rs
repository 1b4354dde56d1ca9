//! Per-item batch accounting
//!
//! Batch mapping and batch submission run each episode independently: a
//! failing item is recorded and the rest continue. Results keep the input
//! order regardless of completion order.

use crate::domain::errors::IvrError;
use crate::domain::ids::EpisodeId;
use crate::domain::Result;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;

/// Counts of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self) {
        self.total += 1;
        self.successful += 1;
    }

    pub fn add_failure(&mut self) {
        self.total += 1;
        self.failed += 1;
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: BatchSummary) {
        self.total += other.total;
        self.successful += other.successful;
        self.failed += other.failed;
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Outcome of one batch item
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem<T> {
    pub episode_id: EpisodeId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ordered item outcomes plus their summary
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome<T> {
    pub results: Vec<BatchItem<T>>,
    pub summary: BatchSummary,
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            summary: BatchSummary::new(),
        }
    }

    pub fn add_success(&mut self, episode_id: EpisodeId, value: T) {
        self.summary.add_success();
        self.results.push(BatchItem {
            episode_id,
            success: true,
            result: Some(value),
            error: None,
        });
    }

    pub fn add_failure(&mut self, episode_id: EpisodeId, error: &IvrError) {
        self.summary.add_failure();
        self.results.push(BatchItem {
            episode_id,
            success: false,
            result: None,
            error: Some(error.to_string()),
        });
    }

    /// Record one item result
    pub fn record(&mut self, episode_id: EpisodeId, result: Result<T>) {
        match result {
            Ok(value) => self.add_success(episode_id, value),
            Err(e) => self.add_failure(episode_id, &e),
        }
    }

    /// Transforms the successful values, keeping order and summary
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> BatchOutcome<U> {
        BatchOutcome {
            results: self
                .results
                .into_iter()
                .map(|item| BatchItem {
                    episode_id: item.episode_id,
                    success: item.success,
                    result: item.result.map(&mut f),
                    error: item.error,
                })
                .collect(),
            summary: self.summary,
        }
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `task` for every episode with at most `concurrency` in flight
///
/// Failures are logged and recorded per item; output order follows input
/// order.
pub async fn run_batch<T, F, Fut>(
    episode_ids: &[EpisodeId],
    concurrency: usize,
    task: F,
) -> BatchOutcome<T>
where
    F: Fn(EpisodeId) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let results: Vec<(EpisodeId, Result<T>)> = stream::iter(episode_ids.iter().copied())
        .map(|episode_id| {
            let fut = task(episode_id);
            async move { (episode_id, fut.await) }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut outcome = BatchOutcome::new();
    for (episode_id, result) in results {
        if let Err(ref e) = result {
            tracing::warn!(episode_id = %episode_id, error = %e, "Batch item failed");
        }
        outcome.record(episode_id, result);
    }

    tracing::info!(
        total = outcome.summary.total,
        successful = outcome.summary.successful,
        failed = outcome.summary.failed,
        "Batch completed"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ids(values: &[u64]) -> Vec<EpisodeId> {
        values.iter().map(|v| EpisodeId::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_summary_merge() {
        let mut first = BatchSummary::new();
        first.add_success();
        first.add_failure();

        let mut second = BatchSummary::new();
        second.add_success();

        first.merge(second);
        assert_eq!(
            first,
            BatchSummary {
                total: 3,
                successful: 2,
                failed: 1
            }
        );
        assert!(!first.is_complete_success());
    }

    #[tokio::test]
    async fn test_run_batch_isolates_failures_and_keeps_order() {
        let episodes = ids(&[1, 2, 3, 4]);
        let outcome = run_batch(&episodes, 2, |id| async move {
            // later items finish first
            tokio::time::sleep(Duration::from_millis(20 / id.value())).await;
            if id.value() == 3 {
                Err(IvrError::NotFound(format!("Episode {id} not found")))
            } else {
                Ok(id.value() * 10)
            }
        })
        .await;

        assert_eq!(outcome.summary.total, 4);
        assert_eq!(outcome.summary.successful, 3);
        assert_eq!(outcome.summary.failed, 1);

        let order: Vec<u64> = outcome.results.iter().map(|r| r.episode_id.value()).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
        assert_eq!(outcome.results[1].result, Some(20));
        assert!(outcome.results[2].error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_run_batch_empty() {
        let outcome: BatchOutcome<()> = run_batch(&[], 4, |_| async { Ok(()) }).await;
        assert_eq!(outcome.summary, BatchSummary::default());
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn test_map_keeps_failures() {
        let mut outcome = BatchOutcome::new();
        outcome.add_success(EpisodeId::new(1).unwrap(), 2);
        outcome.add_failure(
            EpisodeId::new(2).unwrap(),
            &IvrError::MalformedInput("bad".to_string()),
        );
        let mapped = outcome.map(|v| v.to_string());
        assert_eq!(mapped.results[0].result.as_deref(), Some("2"));
        assert!(mapped.results[1].result.is_none());
        assert_eq!(mapped.summary.failed, 1);
    }
}

//! Context transfer protocol.
//!
//! `initiate` canonicalises the context, compresses it at the quality tied to
//! the request priority, and stores it under a fresh handoff id. `complete`
//! consumes the artifact exactly once on behalf of the addressed target.
//!
//! Status progression: `pending(0) → transferring(50) → transferring(75) →
//! completed(100)`, or `failed(0)` with an error. A failed artifact stays in
//! the store for inspection until the process exits or it is cancelled.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use swarm_state::{
    ArtifactRecord, ArtifactStore, ContentDigest, MemoryArtifactStore, MemoryRegistry,
    StorageError,
};
use tokio::time::Instant;
use tracing::warn;

use crate::compression::{CompressionOptions, Compressor, DeflateCompressor};
use crate::domain::error::{Result, SwarmError, ValidationError};
use crate::domain::handoff::{HandoffReceipt, HandoffRequest, HandoffState, HandoffStatus};
use crate::events::{EventBus, SwarmEvent};
use crate::metrics::Metrics;
use crate::obs;

/// Handoff artifact lifecycle over an [`ArtifactStore`].
pub struct ContextTransfer {
    compressor: Arc<dyn Compressor>,
    artifacts: Arc<dyn ArtifactStore>,
    statuses: MemoryRegistry<HandoffStatus>,
    events: EventBus,
    metrics: Arc<Metrics>,
    last_stamp_ms: AtomicI64,
}

impl std::fmt::Debug for ContextTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextTransfer")
            .field("statuses", &self.statuses)
            .finish_non_exhaustive()
    }
}

impl Default for ContextTransfer {
    fn default() -> Self {
        Self::new(
            Arc::new(DeflateCompressor::new()),
            Arc::new(MemoryArtifactStore::new()),
        )
    }
}

impl ContextTransfer {
    pub fn new(compressor: Arc<dyn Compressor>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            compressor,
            artifacts,
            statuses: MemoryRegistry::new(),
            events: EventBus::default(),
            metrics: Arc::new(Metrics::new()),
            last_stamp_ms: AtomicI64::new(0),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Compress and store `request.context`, returning the new handoff id.
    ///
    /// On compression failure the status is set to `failed` and the error is
    /// returned.
    pub async fn initiate(&self, request: HandoffRequest) -> Result<HandoffReceipt> {
        validate_request(&request)?;
        let started = Instant::now();
        let handoff_id = self.next_handoff_id(&request.source_agent_id, &request.target_agent_id);
        self.statuses
            .insert(handoff_id.clone(), HandoffStatus::pending(&handoff_id))
            .await?;

        self.events.publish(SwarmEvent::HandoffStarted {
            handoff_id: handoff_id.clone(),
            source_agent_id: request.source_agent_id.clone(),
            target_agent_id: request.target_agent_id.clone(),
            task_id: request.task_id.clone(),
        });

        let record = match self.pack(&handoff_id, &request) {
            Ok(record) => record,
            Err(e) => {
                self.mark_failed(&handoff_id, &e).await;
                return Err(e);
            }
        };
        let compressed_size = record.compressed_size();
        let original_size = record.original_size;
        if let Err(e) = self.artifacts.put(record).await {
            let e = SwarmError::from(e);
            self.mark_failed(&handoff_id, &e).await;
            return Err(e);
        }

        self.advance(&handoff_id, HandoffState::Transferring, 50).await;
        obs::emit_handoff_initiated(
            &handoff_id,
            &request.source_agent_id,
            &request.target_agent_id,
            compressed_size,
        );

        Ok(HandoffReceipt {
            handoff_id,
            compressed_size,
            original_size,
            transfer_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Consume the artifact for `handoff_id` on behalf of `target_agent_id`
    /// and return the original context.
    ///
    /// `NotFound` for an unknown, cancelled, failed or already completed id;
    /// `Unauthorized` when `target_agent_id` is not the addressed target.
    /// Rejections only read the store, so the artifact is never out of place
    /// while the real target completes.
    pub async fn complete(
        &self,
        handoff_id: &str,
        target_agent_id: &str,
    ) -> Result<serde_json::Value> {
        let stored = self
            .artifacts
            .get(handoff_id)
            .await
            .map_err(|e| handoff_error(e, handoff_id))?;

        let failed = self
            .statuses
            .get(handoff_id)
            .await
            .is_some_and(|s| s.state == HandoffState::Failed);
        if failed {
            return Err(SwarmError::not_found("handoff", handoff_id));
        }

        if stored.target_agent_id != target_agent_id {
            warn!(
                event = "handoff.unauthorized",
                handoff_id = %handoff_id,
                expected = %stored.target_agent_id,
                actual = %target_agent_id,
            );
            return Err(SwarmError::Unauthorized {
                handoff_id: handoff_id.to_string(),
                expected: stored.target_agent_id,
                actual: target_agent_id.to_string(),
            });
        }

        let record = self
            .artifacts
            .take(handoff_id)
            .await
            .map_err(|e| handoff_error(e, handoff_id))?;

        self.advance(handoff_id, HandoffState::Transferring, 75).await;

        match self.unpack(&record) {
            Ok(context) => {
                self.advance(handoff_id, HandoffState::Completed, 100).await;
                self.metrics.inc_handoffs_completed();
                obs::emit_handoff_completed(handoff_id, target_agent_id);
                self.events.publish(SwarmEvent::HandoffCompleted {
                    handoff_id: handoff_id.to_string(),
                    target_agent_id: target_agent_id.to_string(),
                });
                Ok(context)
            }
            Err(e) => {
                self.mark_failed(handoff_id, &e).await;
                self.artifacts.restore(record).await?;
                Err(e)
            }
        }
    }

    /// Discard a pending handoff. Returns `false` for an unknown or already
    /// consumed id. Never fails.
    pub async fn cancel(&self, handoff_id: &str) -> bool {
        let removed = match self.artifacts.remove(handoff_id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(event = "handoff.cancel_failed", handoff_id = %handoff_id, error = %e);
                false
            }
        };
        if removed {
            let _ = self
                .statuses
                .update(handoff_id, |s| s.fail("cancelled"))
                .await;
            self.events.publish(SwarmEvent::HandoffFailed {
                handoff_id: handoff_id.to_string(),
                error: "cancelled".to_string(),
            });
        }
        removed
    }

    /// Latest status snapshot. `NotFound` for an unknown id.
    pub async fn status(&self, handoff_id: &str) -> Result<HandoffStatus> {
        self.statuses
            .get(handoff_id)
            .await
            .ok_or_else(|| SwarmError::not_found("handoff", handoff_id))
    }

    /// Copy of a stored artifact without consuming it.
    pub async fn inspect(&self, handoff_id: &str) -> Result<ArtifactRecord> {
        self.artifacts
            .get(handoff_id)
            .await
            .map_err(|e| handoff_error(e, handoff_id))
    }

    /// Number of artifacts still awaiting consumption.
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.artifacts.len().await?)
    }

    fn pack(&self, handoff_id: &str, request: &HandoffRequest) -> Result<ArtifactRecord> {
        let canonical = serde_json::to_string(&request.context)?;
        let quality = request.priority.compression_quality();
        let payload = self
            .compressor
            .compress(&canonical, CompressionOptions::with_quality(quality))?;
        Ok(ArtifactRecord {
            handoff_id: handoff_id.to_string(),
            source_agent_id: request.source_agent_id.clone(),
            target_agent_id: request.target_agent_id.clone(),
            task_id: request.task_id.clone(),
            quality,
            payload,
            original_size: canonical.len(),
            digest: ContentDigest::from_bytes(canonical.as_bytes()),
            created_at: Utc::now(),
        })
    }

    fn unpack(&self, record: &ArtifactRecord) -> Result<serde_json::Value> {
        let canonical = self.compressor.decompress(&record.payload)?;
        let actual = ContentDigest::from_bytes(canonical.as_bytes());
        if actual != record.digest {
            return Err(SwarmError::DigestMismatch {
                expected: record.digest.short().to_string(),
                actual: actual.short().to_string(),
            });
        }
        Ok(serde_json::from_str(&canonical)?)
    }

    async fn advance(&self, handoff_id: &str, state: HandoffState, progress: u8) {
        let _ = self
            .statuses
            .update(handoff_id, |s| s.advance(state, progress))
            .await;
    }

    async fn mark_failed(&self, handoff_id: &str, error: &SwarmError) {
        let message = error.to_string();
        let _ = self
            .statuses
            .update(handoff_id, |s| s.fail(message.clone()))
            .await;
        obs::emit_handoff_failed(handoff_id, error);
        self.events.publish(SwarmEvent::HandoffFailed {
            handoff_id: handoff_id.to_string(),
            error: message,
        });
    }

    /// `handoff-{source}-{target}-{ms}-{salt}`. The millisecond stamp is
    /// strictly increasing per instance; the salt keeps ids unique across
    /// instances.
    fn next_handoff_id(&self, source: &str, target: &str) -> String {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_stamp_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        let stamp = now.max(previous + 1);
        let salt = uuid::Uuid::new_v4().simple().to_string();
        format!("handoff-{source}-{target}-{stamp}-{}", &salt[..8])
    }
}

fn handoff_error(error: StorageError, handoff_id: &str) -> SwarmError {
    match error {
        StorageError::NotFound { .. } => SwarmError::not_found("handoff", handoff_id),
        other => other.into(),
    }
}

fn validate_request(request: &HandoffRequest) -> Result<()> {
    let mut violations = Vec::new();
    if request.source_agent_id.trim().is_empty() {
        violations.push("source_agent_id must not be empty".to_string());
    }
    if request.target_agent_id.trim().is_empty() {
        violations.push("target_agent_id must not be empty".to_string());
    }
    if request.task_id.trim().is_empty() {
        violations.push("task_id must not be empty".to_string());
    }
    Ok(ValidationError::check(violations)?)
}

//! Test utilities: subscription doubles for asserting scan behavior.
//!
//! Public when the `test-util` feature is enabled, internal for this crate's
//! own tests otherwise.

use crate::{chunk::Chunk, error::StoreError, subscription::Subscription};

/// Subscription double that records the full callback lifecycle.
///
/// Optionally stops or fails after a fixed number of deliveries, so tests
/// can exercise the `stopped` and `on_error` terminal paths.
#[derive(Debug, Default)]
pub struct Recorder {
    /// Start bounds observed, in call order. A well-behaved scan produces
    /// exactly one entry.
    pub starts: Vec<i64>,
    /// Chunks delivered, in delivery order.
    pub chunks: Vec<Chunk>,
    /// Terminal `completed` bound, when the scan ran to the end.
    pub completed: Option<i64>,
    /// Terminal `stopped` bound, when this recorder requested a stop.
    pub stopped: Option<i64>,
    /// Terminal error bound and message, when the scan failed.
    pub error: Option<(i64, String)>,
    stop_after: Option<usize>,
    fail_after: Option<usize>,
}

impl Recorder {
    /// Recorder that consumes every delivery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that returns `false` from `on_next` once `count` chunks have
    /// been delivered.
    #[must_use]
    pub fn stopping_after(count: usize) -> Self {
        Self {
            stop_after: Some(count),
            ..Self::default()
        }
    }

    /// Recorder whose `on_next` fails after `count` successful deliveries.
    #[must_use]
    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::default()
        }
    }

    /// Indices of the delivered chunks, in delivery order.
    #[must_use]
    pub fn indices(&self) -> Vec<i64> {
        self.chunks.iter().map(|c| c.index).collect()
    }

    /// Positions of the delivered chunks, in delivery order.
    #[must_use]
    pub fn positions(&self) -> Vec<i64> {
        self.chunks.iter().map(|c| c.position).collect()
    }

    /// Payloads rendered as JSON strings, `"null"` for payload-less chunks.
    #[must_use]
    pub fn payloads(&self) -> Vec<String> {
        self.chunks
            .iter()
            .map(|c| {
                c.payload
                    .as_ref()
                    .map_or_else(|| "null".to_string(), |p| p.to_string())
            })
            .collect()
    }

    /// Whether exactly one terminal callback was observed.
    #[must_use]
    pub fn terminated_once(&self) -> bool {
        [
            self.completed.is_some(),
            self.stopped.is_some(),
            self.error.is_some(),
        ]
        .into_iter()
        .filter(|seen| *seen)
        .count()
            == 1
    }
}

impl Subscription for Recorder {
    async fn on_start(&mut self, position: i64) -> Result<(), StoreError> {
        self.starts.push(position);
        Ok(())
    }

    async fn on_next(&mut self, chunk: Chunk) -> Result<bool, StoreError> {
        if self.fail_after == Some(self.chunks.len()) {
            return Err(StoreError::persistence("recorder failure injected"));
        }
        self.chunks.push(chunk);
        Ok(self.stop_after != Some(self.chunks.len()))
    }

    async fn completed(&mut self, position: i64) -> Result<(), StoreError> {
        self.completed = Some(position);
        Ok(())
    }

    async fn stopped(&mut self, position: i64) -> Result<(), StoreError> {
        self.stopped = Some(position);
        Ok(())
    }

    async fn on_error(&mut self, position: i64, error: &StoreError) -> Result<(), StoreError> {
        self.error = Some((position, error.to_string()));
        Ok(())
    }
}

//! The push-based scan protocol.
//!
//! Scans deliver chunks one at a time to a [`Subscription`], a callback
//! bundle with a strict lifecycle:
//!
//! ```text
//! on_start(start)
//!    -> zero or more: on_next(chunk) -> bool
//!    -> exactly one terminal:
//!         completed(last)
//!       | stopped(last)          // on_next returned false
//!       | on_error(last, error)  // read or callback failed
//! ```
//!
//! `last` is the index of the last delivered chunk for per-partition scans
//! and the position for global scans, or the start bound when nothing was
//! delivered. Failures during the read or inside a callback terminate the
//! scan through `on_error` and are **not** rethrown from the scan method;
//! cancellation, by contrast, makes the scan method return
//! [`StoreError::Cancelled`] and skips any remaining callbacks.
//!
//! Both backends drive the lifecycle through [`pump`] so their observable
//! behavior is identical.

use std::future::Future;

use crate::{cancel::CancellationToken, chunk::Chunk, error::StoreError};

/// Push-style consumer of a scan.
///
/// All callbacks are awaited before the next action proceeds; delivery is
/// single-producer and strictly sequential.
pub trait Subscription: Send {
    /// Called once, before any delivery, with the scan's start bound.
    fn on_start(&mut self, position: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Called once per chunk, in scan order. Return `false` to stop early.
    fn on_next(&mut self, chunk: Chunk) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Terminal: the scan ran to the end of the range.
    fn completed(&mut self, position: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Terminal: [`on_next`](Subscription::on_next) returned `false`.
    fn stopped(&mut self, position: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Terminal: the read or a callback failed.
    fn on_error(
        &mut self,
        position: i64,
        error: &StoreError,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Drive the full subscription lifecycle over a materialized batch.
///
/// `batch` is the outcome of the backend's read: chunks to deliver, or the
/// error that prevented the read (delivered through `on_error` after
/// `on_start`). `key` extracts the index-or-position flavor of `last` for
/// this scan.
///
/// # Errors
///
/// Returns [`StoreError::Cancelled`] when the token is cancelled between
/// callbacks. All other failures are routed to `on_error` and the pump
/// returns `Ok(())`.
pub async fn pump<S, K>(
    subscription: &mut S,
    start: i64,
    batch: Result<Vec<Chunk>, StoreError>,
    key: K,
    token: &CancellationToken,
) -> Result<(), StoreError>
where
    S: Subscription,
    K: Fn(&Chunk) -> i64 + Send,
{
    token.check()?;
    if let Err(error) = subscription.on_start(start).await {
        return fail(subscription, start, &error).await;
    }

    let chunks = match batch {
        Ok(chunks) => chunks,
        Err(error) => return fail(subscription, start, &error).await,
    };

    let mut last = start;
    for chunk in chunks {
        token.check()?;
        let at = key(&chunk);
        match subscription.on_next(chunk).await {
            Ok(true) => last = at,
            Ok(false) => {
                tracing::trace!(at, "subscription requested stop");
                token.check()?;
                if let Err(error) = subscription.stopped(at).await {
                    return fail(subscription, at, &error).await;
                }
                return Ok(());
            }
            Err(error) => return fail(subscription, at, &error).await,
        }
    }

    token.check()?;
    if let Err(error) = subscription.completed(last).await {
        return fail(subscription, last, &error).await;
    }
    Ok(())
}

/// Route a failure to the terminal `on_error` callback.
///
/// A failure inside `on_error` itself has nowhere left to go; it is logged
/// and swallowed so the scan method still returns normally.
async fn fail<S: Subscription>(
    subscription: &mut S,
    at: i64,
    error: &StoreError,
) -> Result<(), StoreError> {
    tracing::debug!(at, %error, "scan terminated with error");
    if let Err(inner) = subscription.on_error(at, error).await {
        tracing::warn!(%inner, "subscription error callback failed");
    }
    Ok(())
}

/// Subscription that accumulates every delivered chunk and never stops.
///
/// Convenience consumer for straightforward reads; the `test` module (behind
/// the `test-util` feature) provides a `Recorder` that captures the full
/// lifecycle.
#[derive(Debug, Default)]
pub struct Collector {
    chunks: Vec<Chunk>,
}

impl Collector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The chunks delivered so far, in delivery order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Consume the collector, yielding the delivered chunks.
    #[must_use]
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
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
}

impl Subscription for Collector {
    async fn on_start(&mut self, _position: i64) -> Result<(), StoreError> {
        Ok(())
    }

    async fn on_next(&mut self, chunk: Chunk) -> Result<bool, StoreError> {
        self.chunks.push(chunk);
        Ok(true)
    }

    async fn completed(&mut self, _position: i64) -> Result<(), StoreError> {
        Ok(())
    }

    async fn stopped(&mut self, _position: i64) -> Result<(), StoreError> {
        Ok(())
    }

    async fn on_error(&mut self, _position: i64, _error: &StoreError) -> Result<(), StoreError> {
        Ok(())
    }
}

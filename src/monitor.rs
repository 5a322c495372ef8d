//! Periodic detection loop.
//!
//! The loop ticks on a fixed interval. Ticks missed while a cycle is still
//! running are skipped, not queued. The CPU-bound capture and scan run on the
//! blocking pool. After the scan the loop checks for cancellation once more,
//! so a cycle that finishes after `stop` is neither committed nor accepted
//! into the session's face cache.

use crate::frame::FrameSource;
use crate::model::ClassId;
use crate::session::{CommitSummary, CycleOutcome, DetectionSession};
use crate::store::Backend;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Result of one committed detection cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub class_id: ClassId,
    /// 1-based count of ticks handled by this loop
    pub cycle: u64,
    pub completed_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub commit: CommitSummary,
}

/// Owns the background detection loop of one class
pub struct Monitor {
    handle: Option<JoinHandle<Result<DetectionSession>>>,
    cancel_token: Option<CancellationToken>,
    latest_tx: watch::Sender<Option<CycleReport>>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    #[must_use]
    pub fn new() -> Self {
        let (latest_tx, _) = watch::channel(None);
        Self {
            handle: None,
            cancel_token: None,
            latest_tx,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawn the detection loop on the current tokio runtime
    ///
    /// # Errors
    ///
    /// Returns `SessionState` if a loop is already running. A loop that has
    /// already exited on its own is released so monitoring can start again.
    pub fn start(
        &mut self,
        session: DetectionSession,
        source: Box<dyn FrameSource>,
        backend: Arc<dyn Backend>,
        interval: Duration,
    ) -> Result<()> {
        if self.is_running() {
            return Err(Error::SessionState("monitoring already active".to_string()));
        }
        if self.handle.take().is_some() {
            warn!("previous detection loop exited without stop; starting a new one");
            self.cancel_token = None;
        }

        info!(
            "Monitoring class {} from {} source every {:?}",
            session.class().id,
            source.name(),
            interval
        );

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(detection_loop(
            session,
            source,
            backend,
            interval,
            cancel_token.clone(),
            self.latest_tx.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Stop the loop and hand back its session. Results of a cycle still in
    /// flight are discarded.
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the loop task failed.
    pub async fn stop(&mut self) -> Result<Option<DetectionSession>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => {
                let session = handle
                    .await
                    .map_err(|e| Error::Runtime(format!("detection loop failed to join: {e}")))??;
                info!("Stopped monitoring class {}", session.class().id);
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Most recent committed cycle
    #[must_use]
    pub fn latest(&self) -> Option<CycleReport> {
        self.latest_tx.borrow().clone()
    }

    /// Receiver notified after every committed cycle
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<CycleReport>> {
        self.latest_tx.subscribe()
    }
}

async fn detection_loop(
    mut session: DetectionSession,
    mut source: Box<dyn FrameSource>,
    backend: Arc<dyn Backend>,
    interval: Duration,
    cancel_token: CancellationToken,
    latest_tx: watch::Sender<Option<CycleReport>>,
) -> Result<DetectionSession> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycle = 0u64;

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => {
                debug!("detection loop shutting down");
                break;
            }
            _ = ticker.tick() => {}
        }
        cycle += 1;

        let (returned_session, returned_source, analyzed) = tokio::task::spawn_blocking(move || {
            let analyzed = source.capture().and_then(|frame| session.analyze(&frame));
            (session, source, analyzed)
        })
        .await
        .map_err(|e| Error::Runtime(format!("detection cycle {cycle} panicked: {e}")))?;
        session = returned_session;
        source = returned_source;

        if cancel_token.is_cancelled() {
            debug!("discarding cycle {cycle} finished after stop");
            break;
        }

        let outcome = match analyzed {
            Ok(outcome) => outcome,
            Err(e) if e.is_transient() => {
                debug!("skipping cycle {cycle}: {e}");
                continue;
            }
            Err(e) => {
                warn!("detection cycle {cycle} failed: {e}");
                continue;
            }
        };

        session.accept(&outcome);
        let now = Utc::now();
        let commit = session.commit(&outcome, backend.as_ref(), now);
        if commit.failures > 0 {
            error!("cycle {cycle}: {} collaborator failures", commit.failures);
        }

        latest_tx.send_replace(Some(CycleReport {
            class_id: session.class().id,
            cycle,
            completed_at: now,
            outcome,
            commit,
        }));
    }

    Ok(session)
}

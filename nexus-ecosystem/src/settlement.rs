//! Simulated teleport settlement.
//!
//! A real deployment would wait for the Teleporter message to be delivered
//! and executed on the destination chain. Here the wait is a fixed timer: the
//! callback fires once the delay elapses and the returned [`Settlement`]
//! resolves after the callback has run.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

/// Delay used by the subscribe and approve flows
pub const DEFAULT_TELEPORT_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("settlement callback panicked: {0}")]
    CallbackPanicked(String),

    #[error("settlement task was aborted")]
    Aborted,
}

/// Phase of a single settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementPhase {
    /// Timer armed, callback not yet run
    Scheduled,
    /// Callback running
    Settling,
    /// Callback completed
    Settled,
    /// Callback panicked
    Failed,
}

/// Handle to a scheduled settlement.
///
/// Awaiting it yields `Ok(())` once the callback has completed. Dropping it
/// does not cancel the timer.
#[derive(Debug)]
pub struct Settlement {
    handle: JoinHandle<()>,
    phase: watch::Receiver<SettlementPhase>,
}

impl Settlement {
    /// Current phase
    pub fn phase(&self) -> SettlementPhase {
        *self.phase.borrow()
    }
}

impl Future for Settlement {
    type Output = Result<(), SettlementError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => Poll::Ready(Ok(())),
            Poll::Ready(Err(err)) if err.is_panic() => {
                Poll::Ready(Err(SettlementError::CallbackPanicked(panic_message(err.into_panic()))))
            }
            Poll::Ready(Err(_)) => Poll::Ready(Err(SettlementError::Aborted)),
        }
    }
}

/// Schedule `on_settle` to run after `delay` and return a future that
/// resolves once it has run.
///
/// The deadline is fixed when this function is called, so concurrent
/// settlements race independently of when they are first polled. Must be
/// called from within a Tokio runtime.
pub fn simulate_teleport<F>(delay: Duration, on_settle: F) -> Settlement
where
    F: FnOnce() + Send + 'static,
{
    let settles_at = Instant::now() + delay;
    let (phase_tx, phase_rx) = watch::channel(SettlementPhase::Scheduled);

    debug!(delay_ms = delay.as_millis() as u64, "teleport scheduled");

    let handle = tokio::spawn(async move {
        tokio::time::sleep_until(settles_at).await;
        phase_tx.send_replace(SettlementPhase::Settling);

        // Record the failure before the panic resumes and tears down the task.
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(on_settle));
        match outcome {
            Ok(()) => {
                phase_tx.send_replace(SettlementPhase::Settled);
                debug!("teleport settled");
            }
            Err(payload) => {
                phase_tx.send_replace(SettlementPhase::Failed);
                error!("teleport callback panicked");
                std::panic::resume_unwind(payload);
            }
        }
    });

    Settlement {
        handle,
        phase: phase_rx,
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

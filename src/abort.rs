//! Cooperative cancellation
//!
//! An [`AbortController`] owns the cancel switch; any number of cloned
//! [`AbortSignal`]s observe it. Long-running operations check the signal
//! before each request and race it against timers, so an abort stops them
//! at the next suspension point.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Owner side of a cancellation switch
#[derive(Debug, Clone)]
pub struct AbortController {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortController {
    /// Create a controller that has not been aborted
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Get a signal observing this controller
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Abort every operation holding one of this controller's signals
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`abort`](Self::abort) was called
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation switch
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl AbortSignal {
    /// A signal that is never aborted
    pub const fn never() -> Self {
        Self { rx: None }
    }

    /// Whether the owning controller has aborted
    pub fn is_aborted(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fail with [`Error::Aborted`] if the signal fired
    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(Error::Aborted)
        } else {
            Ok(())
        }
    }

    /// Resolve once the signal fires. Never resolves for [`never`](Self::never)
    /// or when the controller was dropped without aborting.
    pub async fn aborted(&self) {
        if let Some(rx) = &self.rx {
            let mut rx = rx.clone();
            if rx.wait_for(|aborted| *aborted).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

/// Sleep for `duration` unless `signal` fires first
pub async fn sleep(duration: Duration, signal: &AbortSignal) -> Result<()> {
    signal.check()?;
    tokio::select! {
        () = tokio::time::sleep(duration) => Ok(()),
        () = signal.aborted() => Err(Error::Aborted),
    }
}

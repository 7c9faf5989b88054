//! Ctrl+C latch shared by every stage of a run
//!
//! The first [`InterruptLatch::wait`] starts a listener task that stays
//! registered until the runtime shuts down. An interrupt that arrives while
//! no stage is waiting is remembered instead of lost.

use std::sync::{Arc, Once};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Level-triggered record of a user interrupt
#[derive(Debug, Clone)]
pub struct InterruptLatch {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    fired: watch::Sender<bool>,
    listener: Once,
}

impl Default for InterruptLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptLatch {
    /// A latch that has not fired
    pub fn new() -> Self {
        let (fired, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                fired,
                listener: Once::new(),
            }),
        }
    }

    /// Whether the user has interrupted the run
    pub fn is_triggered(&self) -> bool {
        *self.inner.fired.borrow()
    }

    pub(crate) fn trigger(&self) {
        self.inner.fired.send_replace(true);
    }

    /// Resolves once the user has interrupted the run, immediately if they already have
    ///
    /// Must be called from within a tokio runtime.
    pub async fn wait(&self) {
        self.listen();
        let mut fired = self.inner.fired.subscribe();
        let closed = fired.wait_for(|fired| *fired).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    fn listen(&self) {
        self.inner.listener.call_once(|| {
            let latch = self.clone();
            tokio::spawn(async move {
                loop {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            debug!("Interrupt received");
                            latch.trigger();
                        }
                        Err(e) => {
                            warn!("Unable to listen for Ctrl+C: {}", e);
                            return;
                        }
                    }
                }
            });
        });
    }
}

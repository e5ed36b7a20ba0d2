use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::utils::CannonResult;

/// Periodic fetch bound to the lifetime of a view
///
/// The first fetch happens one period after spawning; the caller is expected
/// to have loaded the initial data itself. Once [`Poller::cancel`] returns (or
/// the poller is dropped) the sink is never called again, even if a fetch was
/// in flight at that moment.
pub struct Poller {
    cancel: watch::Sender<bool>,
    closed: Arc<Mutex<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<T, F, Fut, S>(period: Duration, mut fetch: F, mut sink: S) -> Self
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = CannonResult<T>> + Send + 'static,
        S: FnMut(T) + Send + 'static,
    {
        let (cancel, mut cancelled) = watch::channel(false);
        let closed = Arc::new(Mutex::new(false));
        let gate = closed.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; skip that tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancelled.changed() => break,
                    _ = ticker.tick() => {}
                }

                let result = tokio::select! {
                    _ = cancelled.changed() => break,
                    result = fetch() => result,
                };

                {
                    let closed = gate.lock();
                    if *closed {
                        debug!("poll result arrived after cancellation; discarded");
                        break;
                    }
                    match result {
                        Ok(value) => sink(value),
                        Err(e) => warn!("poll failed, will retry next tick: {}", e),
                    }
                }
            }
        });

        Self {
            cancel,
            closed,
            handle: Some(handle),
        }
    }

    /// Stop polling; no further results are delivered after this returns
    pub fn cancel(&mut self) {
        *self.closed.lock() = true;
        let _ = self.cancel.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel();
    }
}

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use super::route::{AccessState, MainTab, Screen};
use crate::session::Session;

/// Navigation refused by the gate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Session is still loading")]
    Loading,

    #[error("{target} is not reachable while {state}")]
    NotAllowed { target: Screen, state: AccessState },
}

/// Derives the reachable screen group from the live session
///
/// Holds only a read handle to the session; all mutation goes through the
/// session provider.
#[derive(Debug, Clone)]
pub struct GateRouter {
    session: watch::Receiver<Session>,
}

impl GateRouter {
    pub fn new(session: watch::Receiver<Session>) -> Self {
        Self { session }
    }

    /// Evaluate the gate against the current session
    pub fn state(&self) -> AccessState {
        AccessState::evaluate(&self.session.borrow())
    }

    /// The screen stack rebuilt from the current state
    pub fn stack(&self) -> Vec<Screen> {
        self.state().allowed_targets().to_vec()
    }

    /// Check that `target` may be navigated to right now
    pub fn navigate(&self, target: Screen) -> Result<Screen, GateError> {
        let state = self.state();
        if state.is_loading() {
            return Err(GateError::Loading);
        }
        if !state.allows(target) {
            debug!("gate refused {} in state {}", target, state);
            return Err(GateError::NotAllowed { target, state });
        }
        Ok(target)
    }

    /// Check that a main-app tab may be opened
    pub fn open_tab(&self, tab: MainTab) -> Result<MainTab, GateError> {
        self.navigate(Screen::MainApp)?;
        self.navigate(tab.target())?;
        Ok(tab)
    }

    /// Wait for the next session change and return the re-evaluated state
    ///
    /// Returns `None` once the session provider is gone.
    pub async fn changed(&mut self) -> Option<AccessState> {
        self.session.changed().await.ok()?;
        Some(self.state())
    }

    /// Stream of gate states, starting with the current one
    ///
    /// Consecutive duplicates are dropped, so a session change that leaves the
    /// gate where it was yields nothing.
    pub fn transitions(&self) -> impl Stream<Item = AccessState> {
        let mut last: Option<AccessState> = None;
        WatchStream::new(self.session.clone())
            .map(|session| AccessState::evaluate(&session))
            .filter(move |state| {
                let fresh = last != Some(*state);
                last = Some(*state);
                futures::future::ready(fresh)
            })
    }
}

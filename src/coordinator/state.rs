use serde::Serialize;
use tokio::sync::watch;

/// Install, update and connectivity state shown to the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PwaState {
    pub installable: bool,
    pub installed: bool,
    pub online: bool,
    pub update_available: bool,
}

/// Live view of [`PwaState`]
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`])
/// stops delivery.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<PwaState>,
}

impl Subscription {
    pub(crate) fn new(rx: watch::Receiver<PwaState>) -> Self {
        Self { rx }
    }

    pub fn current(&self) -> PwaState {
        *self.rx.borrow()
    }

    /// Wait for the next change; `None` once the coordinator is gone
    pub async fn changed(&mut self) -> Option<PwaState> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    pub fn unsubscribe(self) {}
}

//! PWA coordinator
//!
//! Turns platform events into [`PwaState`] and exposes the three user
//! actions: install, update and share. All events enter through
//! [`PwaCoordinator::dispatch`]; lifecycle events from the registration are
//! forwarded there by a background task.

mod host;
mod platform;
mod state;

pub use host::HostPlatform;
pub use platform::{
    InstallChoice, InstallPrompt, Platform, PlatformEvent, ShareError, ShareOutcome, SharePayload,
};
pub use state::{PwaState, Subscription};

use crate::controller::{ControlMessage, WorkerState};
use crate::registration::{LifecycleEvent, Registration};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct PwaCoordinator<P: Platform> {
    this: Weak<Self>,
    platform: Arc<P>,
    state: watch::Sender<PwaState>,
    prompt: Mutex<Option<Arc<dyn InstallPrompt>>>,
    registration: Mutex<Option<Arc<Registration>>>,
    registering: tokio::sync::Mutex<()>,
    lifecycle_task: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<P: Platform> PwaCoordinator<P> {
    pub fn new(platform: Arc<P>) -> Arc<Self> {
        let (state, _) = watch::channel(PwaState::default());
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            platform,
            state,
            prompt: Mutex::new(None),
            registration: Mutex::new(None),
            registering: tokio::sync::Mutex::new(()),
            lifecycle_task: Mutex::new(None),
        })
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// Read the initial platform state and register the controller
    ///
    /// A registration failure is logged and the coordinator carries on
    /// without offline support; registration is tried again when the
    /// platform comes back online.
    pub async fn start(&self) {
        let installed = self.platform.is_standalone();
        let online = self.platform.is_online();
        self.update_state(|state| {
            state.installed = installed;
            state.online = online;
        });
        self.ensure_registered().await;
    }

    async fn ensure_registered(&self) {
        let _guard = self.registering.lock().await;
        if self.registration().is_some() {
            return;
        }

        let registration = match self.platform.register_controller().await {
            Ok(registration) => registration,
            Err(e) => {
                warn!("Continuing without offline support: {}", e);
                return;
            }
        };

        let events = registration.subscribe();
        if registration.waiting().is_some() && registration.active().is_some() {
            self.update_state(|state| state.update_available = true);
        }
        *lock(&self.registration) = Some(registration);

        let task = tokio::spawn(Self::forward_lifecycle(self.this.clone(), events));
        if let Some(previous) = lock(&self.lifecycle_task).replace(task) {
            previous.abort();
        }
    }

    async fn forward_lifecycle(
        coordinator: Weak<Self>,
        mut events: broadcast::Receiver<LifecycleEvent>,
    ) {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Missed {} lifecycle events", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let Some(coordinator) = coordinator.upgrade() else {
                break;
            };
            coordinator.on_lifecycle(event);
        }
    }

    fn update_state(&self, apply: impl FnOnce(&mut PwaState)) {
        self.state.send_if_modified(|state| {
            let before = *state;
            apply(state);
            *state != before
        });
    }

    /// Single entry point for platform events
    pub async fn dispatch(&self, event: PlatformEvent) {
        debug!("Platform event: {:?}", event);
        match event {
            PlatformEvent::BeforeInstallPrompt(prompt) => {
                *lock(&self.prompt) = Some(prompt);
                self.update_state(|state| state.installable = true);
            }
            PlatformEvent::AppInstalled => {
                lock(&self.prompt).take();
                self.update_state(|state| {
                    state.installed = true;
                    state.installable = false;
                });
            }
            PlatformEvent::Online => {
                let was_online = self.state().online;
                self.update_state(|state| state.online = true);
                if !was_online {
                    self.ensure_registered().await;
                    self.replay_queued().await;
                }
            }
            PlatformEvent::Offline => self.update_state(|state| state.online = false),
            PlatformEvent::Lifecycle(event) => self.on_lifecycle(event),
        }
    }

    fn on_lifecycle(&self, event: LifecycleEvent) {
        if let LifecycleEvent::StateChanged {
            state: WorkerState::Installed,
            has_active: true,
            version,
        } = event
        {
            info!("Controller {} is ready; refresh to use it", version);
            self.update_state(|state| state.update_available = true);
        }
    }

    async fn replay_queued(&self) {
        let Some(registration) = self.registration() else {
            return;
        };
        match registration.replay_pending().await {
            Ok(Some(outcome)) if outcome.remaining > 0 => {
                debug!("{} requests still queued after reconnect", outcome.remaining);
            }
            Ok(_) => {}
            Err(e) => warn!("Replay after reconnect failed: {}", e),
        }
    }

    pub fn state(&self) -> PwaState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.state.subscribe())
    }

    pub fn registration(&self) -> Option<Arc<Registration>> {
        lock(&self.registration).clone()
    }

    /// Show the captured install prompt
    ///
    /// The prompt is consumed on first use; later calls return `false`
    /// without prompting.
    pub async fn install(&self) -> bool {
        let captured = lock(&self.prompt).take();
        let Some(prompt) = captured else {
            debug!("No install prompt available");
            return false;
        };

        let choice = prompt.prompt().await;
        self.update_state(|state| state.installable = false);
        match choice {
            Ok(InstallChoice::Accepted) => true,
            Ok(InstallChoice::Dismissed) => false,
            Err(e) => {
                warn!("Install prompt failed: {}", e);
                false
            }
        }
    }

    /// Ask the waiting controller to take over
    ///
    /// Nothing is reloaded; clients pick up the new version on their next
    /// navigation. Returns whether a waiting controller was signalled.
    pub fn update(&self) -> bool {
        let Some(registration) = self.registration() else {
            return false;
        };
        if registration.waiting().is_none() {
            return false;
        }
        match registration.post_message(ControlMessage::SkipWaiting) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not signal waiting controller: {}", e);
                false
            }
        }
    }

    /// Share natively, falling back to copying the URL
    pub async fn share(&self, payload: &SharePayload) -> ShareOutcome {
        match self.platform.share(payload).await {
            Ok(()) => return ShareOutcome::Shared,
            Err(ShareError::Cancelled) => return ShareOutcome::Cancelled,
            Err(ShareError::Unsupported) => {}
            Err(ShareError::Failed(reason)) => warn!("Share failed: {}", reason),
        }

        match self.platform.write_clipboard(&payload.url).await {
            Ok(()) => ShareOutcome::Copied,
            Err(e) => {
                warn!("Clipboard fallback failed: {}", e);
                ShareOutcome::Failed
            }
        }
    }
}

impl<P: Platform> Drop for PwaCoordinator<P> {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.lifecycle_task).take() {
            task.abort();
        }
    }
}

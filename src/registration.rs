//! Controller registration
//!
//! A [`Registration`] owns the controller versions for one scope: at most one
//! installing, one waiting and one active. Lifecycle changes are broadcast to
//! subscribers; clients talk to controllers only by posting a
//! [`ControlMessage`], which a background loop delivers.

use crate::controller::{CacheController, ControlMessage, WorkerState};
use crate::error::{TilawahError, TilawahResult};
use crate::fetch::{Fetcher, Request, Response};
use crate::sync::ReplayOutcome;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// Change in the set of controllers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A new version started installing
    UpdateFound { version: String },
    /// A controller changed state; `has_active` tells whether another
    /// version was already serving at that moment
    StateChanged {
        version: String,
        state: WorkerState,
        has_active: bool,
    },
    /// Requests are now routed to this version
    ControllerChanged { version: String },
}

#[derive(Default)]
struct Slots {
    installing: Option<Arc<CacheController>>,
    waiting: Option<Arc<CacheController>>,
    active: Option<Arc<CacheController>>,
}

pub struct Registration {
    scope: String,
    slots: Mutex<Slots>,
    events: broadcast::Sender<LifecycleEvent>,
    messages: mpsc::UnboundedSender<ControlMessage>,
    /// Used for requests while nothing is active
    fallback: Arc<dyn Fetcher>,
    activation: tokio::sync::Mutex<()>,
}

impl Registration {
    /// Create a registration and start its message loop
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(scope: impl Into<String>, fallback: Arc<dyn Fetcher>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (messages, inbox) = mpsc::unbounded_channel();

        let registration = Arc::new(Self {
            scope: scope.into(),
            slots: Mutex::new(Slots::default()),
            events,
            messages,
            fallback,
            activation: tokio::sync::Mutex::new(()),
        });

        tokio::spawn(Self::message_loop(Arc::downgrade(&registration), inbox));
        registration
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn installing(&self) -> Option<Arc<CacheController>> {
        self.slots().installing.clone()
    }

    pub fn waiting(&self) -> Option<Arc<CacheController>> {
        self.slots().waiting.clone()
    }

    pub fn active(&self) -> Option<Arc<CacheController>> {
        self.slots().active.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: LifecycleEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_state(&self, controller: &CacheController) {
        let has_active = self.slots().active.is_some();
        self.emit(LifecycleEvent::StateChanged {
            version: controller.version().to_string(),
            state: controller.state(),
            has_active,
        });
    }

    /// Install a controller and move it to waiting
    ///
    /// It is activated right away when nothing is active yet or when it
    /// asked to skip waiting. A failed install leaves the active controller
    /// in place.
    pub async fn register(&self, controller: Arc<CacheController>) -> TilawahResult<()> {
        info!(
            "Registering controller {} for scope {}",
            controller.version(),
            self.scope
        );
        self.emit(LifecycleEvent::UpdateFound {
            version: controller.version().to_string(),
        });

        let superseded = self.slots().installing.replace(controller.clone());
        if let Some(previous) = superseded {
            previous.mark_redundant();
        }

        let installed = controller.install().await;
        self.release_installing(&controller);
        if let Err(err) = installed {
            self.emit_state(&controller);
            return Err(err);
        }

        let superseded = self.slots().waiting.replace(controller.clone());
        if let Some(previous) = superseded {
            previous.mark_redundant();
            self.emit_state(&previous);
        }
        self.emit_state(&controller);

        let has_active = self.active().is_some();
        if has_active && !controller.skip_waiting_requested() {
            info!("Controller {} installed and waiting", controller.version());
            return Ok(());
        }
        match self.activate_waiting().await {
            // the message loop promoted it first
            Err(TilawahError::NoWaitingController) if self.is_active(&controller) => Ok(()),
            result => result,
        }
    }

    /// Adopt a version whose stores survived from an earlier run
    ///
    /// Used when the upstream cannot be reached to precache. Returns `false`
    /// and leaves the registration untouched if the static store is missing.
    pub async fn restore(&self, controller: Arc<CacheController>) -> TilawahResult<bool> {
        if !controller.restore().await? {
            return Ok(false);
        }
        info!(
            "Restored controller {} for scope {} from existing stores",
            controller.version(),
            self.scope
        );

        let superseded = self.slots().waiting.replace(controller.clone());
        if let Some(previous) = superseded {
            previous.mark_redundant();
            self.emit_state(&previous);
        }
        self.emit_state(&controller);
        self.activate_waiting().await?;
        Ok(true)
    }

    fn is_active(&self, controller: &Arc<CacheController>) -> bool {
        self.slots()
            .active
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, controller))
    }

    /// Clear the installing slot if it still holds `controller`
    fn release_installing(&self, controller: &Arc<CacheController>) {
        let mut slots = self.slots();
        if slots
            .installing
            .as_ref()
            .is_some_and(|installing| Arc::ptr_eq(installing, controller))
        {
            slots.installing = None;
        }
    }

    /// Promote the waiting controller and retire the previous active one
    pub async fn activate_waiting(&self) -> TilawahResult<()> {
        let _guard = self.activation.lock().await;

        let waiting = self.slots().waiting.take();
        let Some(next) = waiting else {
            return Err(TilawahError::NoWaitingController);
        };

        if let Err(err) = next.activate().await {
            warn!("Activation of controller {} failed: {}", next.version(), err);
            next.mark_redundant();
            self.emit_state(&next);
            return Err(err);
        }

        let previous = self.slots().active.replace(next.clone());
        if let Some(previous) = previous {
            previous.mark_redundant();
            self.emit_state(&previous);
        }
        self.emit_state(&next);
        self.emit(LifecycleEvent::ControllerChanged {
            version: next.version().to_string(),
        });
        Ok(())
    }

    /// Queue a message for the waiting controller
    pub fn post_message(&self, message: ControlMessage) -> TilawahResult<()> {
        self.messages
            .send(message)
            .map_err(|_| TilawahError::Internal("registration message loop stopped".to_string()))
    }

    async fn message_loop(
        registration: Weak<Registration>,
        mut inbox: mpsc::UnboundedReceiver<ControlMessage>,
    ) {
        while let Some(message) = inbox.recv().await {
            let Some(registration) = registration.upgrade() else {
                break;
            };
            registration.deliver(message).await;
        }
        debug!("Registration message loop stopped");
    }

    async fn deliver(&self, message: ControlMessage) {
        let Some(waiting) = self.waiting() else {
            debug!("Dropping {:?}: no waiting controller", message);
            return;
        };

        waiting.handle_message(message);
        if waiting.skip_waiting_requested() {
            if let Err(e) = self.activate_waiting().await {
                warn!("Skip waiting failed: {}", e);
            }
        }
    }

    /// Route a request through the active controller, or straight to the
    /// network when nothing is active
    pub async fn handle_fetch(&self, request: &Request) -> TilawahResult<Response> {
        match self.active() {
            Some(controller) if controller.clients_claimed() => {
                controller.handle_fetch(request).await
            }
            _ => self.fallback.fetch(request).await,
        }
    }

    /// Fire a sync event at the active controller
    pub async fn sync(&self, tag: &str) -> TilawahResult<Option<ReplayOutcome>> {
        match self.active() {
            Some(controller) => controller.handle_sync(tag).await,
            None => Ok(None),
        }
    }

    /// Replay queued requests, as after connectivity returns
    pub async fn replay_pending(&self) -> TilawahResult<Option<ReplayOutcome>> {
        let Some(controller) = self.active() else {
            return Ok(None);
        };
        let tag = controller.settings().sync_tag.clone();
        controller.handle_sync(&tag).await
    }
}

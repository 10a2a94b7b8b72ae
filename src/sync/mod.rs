//! Background sync: failed API requests are queued on disk and replayed when
//! connectivity returns or the `sync-data` event fires.

pub mod queue;

pub use queue::{Delivered, Enqueued, QueuedRequest, ReplayOutcome, SyncQueue};

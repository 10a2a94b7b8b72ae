//! Tilawah - offline caching front for the IndoQuran web app
//!
//! A versioned dual cache (static assets and API responses) sits in front
//! of the upstream origin. Installing a controller precaches the app shell,
//! activating it deletes stores from older versions, and API requests that
//! fail while offline are queued and replayed by background sync. The
//! [`coordinator`] exposes install, update, connectivity and share state to
//! the app.

pub mod cli;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod factory;
pub mod fetch;
pub mod registration;
pub mod server;
pub mod store;
pub mod sync;
pub mod ui;

pub use error::{TilawahError, TilawahResult};

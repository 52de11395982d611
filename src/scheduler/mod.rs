// src/scheduler/mod.rs

//! Hand-off to the external task scheduler.
//!
//! The runtime never launches tools itself. It gives each compiled graph to a
//! [`SchedulerBackend`] and waits for `TaskFinished` notifications.
//!
//! - [`backend`] provides the `SchedulerBackend` trait and
//!   `ChannelSchedulerBackend`, which forwards requests to the surrounding
//!   service over an mpsc channel. Tests substitute a recording backend.

pub mod backend;

pub use backend::{ChannelSchedulerBackend, SchedulerBackend, SchedulerRequest};

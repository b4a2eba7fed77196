//! Watches namespace creation and gives every new namespace a default NetworkPolicy that only
//! admits ingress from pods in the same namespace.
//!
//! A [`WatchController`] lists and watches namespaces, relisting when its watch position
//! expires, and pushes added namespaces into a bounded [`EventChannel`]. A [`Reconciler`] pops
//! them one by one and creates the policy.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod policy;
pub mod reconciler;
pub mod utils;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use channel::{EventChannel, EventReceiver, EventSender};
pub use client::{ClusterClient, NamespaceSource, PolicyClient};
pub use error::{Error, Recovery};
pub use reconciler::{Outcome, Reconciler};
pub use watcher::{WatchConfig, WatchController, WatchSession};

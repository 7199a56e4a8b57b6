//! # homedash-app
//!
//! Application layer: the reactive [`DeviceStore`](store::DeviceStore) and
//! the **port definitions** (traits) it depends on.
//!
//! ## Responsibilities
//! - Define the **port trait** storage adapters implement:
//!   - `StateStorage`, a local durable key-value slot
//! - Hold the authoritative in-memory copy of devices and rooms and mutate it
//!   only through the store's commands
//! - Persist the durable subset after every applied command
//! - Notify subscribed observers synchronously after every applied command
//! - Provide **in-process infrastructure** (change bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `homedash-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod change;
pub mod change_bus;
pub mod observer;
pub mod persistence;
pub mod ports;
pub mod state;
pub mod store;

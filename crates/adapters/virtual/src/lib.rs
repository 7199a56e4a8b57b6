//! # homedash-adapter-virtual
//!
//! Virtual home used for demos and local development.
//!
//! ## Provided pieces
//!
//! | Item | Behaviour |
//! |------|-----------|
//! | [`seed_demo_home`] | Adds four rooms and one device of every type |
//! | [`Simulator`] | Periodically updates sensors, climate and batteries |
//!
//! Everything goes through `DeviceStore` commands, so observers and
//! persistence see simulated activity exactly like user actions.
//!
//! ## Dependency rule
//!
//! Depends on `homedash-app` and `homedash-domain` only.

mod demo;
mod simulator;

pub use demo::{demo_devices, demo_rooms, seed_demo_home};
pub use simulator::Simulator;

//! # homedash-domain
//!
//! Pure domain model for the homedash smart-home dashboard.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Devices** (lights, sensors, cameras, …) and their typed state
//! - Define **Rooms** (the grouping every device belongs to)
//! - Define the informational **connection status**
//! - Derived projections: dashboard **stats** and the **consistency** report
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod connection;
pub mod consistency;
pub mod device;
pub mod room;
pub mod stats;

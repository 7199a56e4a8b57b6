//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`HomeDashError`] via `#[from]` (no `String` variants).

use crate::device::DeviceType;

/// Top-level error for every fallible operation in homedash.
#[derive(Debug, thiserror::Error)]
pub enum HomeDashError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The referenced record does not exist.
    ///
    /// Store commands return this for missing ids; callers are free to
    /// ignore it.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A storage adapter failed.
    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

impl HomeDashError {
    /// Whether this is the benign "nothing to act on" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Invariant violations detected by `validate()` methods.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("identifier must not be empty")]
    EmptyId,

    #[error("battery level {0}% is above 100%")]
    BatteryOutOfRange(u8),

    #[error("brightness {0}% is above 100%")]
    BrightnessOutOfRange(u8),

    #[error("volume {0}% is above 100%")]
    VolumeOutOfRange(u8),

    #[error("device state is required")]
    MissingState,

    /// The new state payload belongs to another device type.
    #[error("cannot replace {expected} state with {found} state")]
    StateTypeMismatch {
        expected: DeviceType,
        found: DeviceType,
    },
}

/// A lookup by id found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

//! Operating-state reconciliation and zone composition for thermozone.
//!
//! The reconciler resolves the single authoritative operating state from a
//! requested state and a fixed, ordered list of override sources (central
//! building mode, safety, open windows, the auto-shutdown decision). The
//! [`ZoneController`] composes the reconciler, regulator and scheduler into
//! one evaluation tick.

pub mod error;
pub mod profile;
pub mod reconciler;
pub mod signals;
pub mod state;
pub mod zone;

pub use error::{StateError, StateResult};
pub use profile::{WindowAction, ZoneProfile};
pub use reconciler::{OverrideReason, StateReconciler};
pub use signals::OverrideSignals;
pub use state::{OperatingState, StateChanges};
pub use zone::{TickOutcome, ZoneController};

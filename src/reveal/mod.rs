//! Scroll-triggered reveal of page sections and the numeric counters inside them.
//!
//! The coordinator is headless: it tracks per-element and per-counter state
//! and answers every event with a list of [`Effect`]s. The [`dom`] driver is
//! the only part that talks to the browser.

pub mod coordinator;
pub mod counter;
pub mod dom;
pub mod error;

pub use coordinator::{Detection, IntersectionEntry, ViewportRevealCoordinator};
pub use error::RevealError;

/// Index of a revealable section, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// Index of a numeric counter, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterId(pub usize);

/// A host action requested by the coordinator, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Observe(ElementId),
    Unobserve(ElementId),
    MarkVisible(ElementId),
    SetText(CounterId, String),
    RequestFrame(CounterId),
    ArmSafetyTimer(u32),
}

pub type RevealResult<T> = Result<T, RevealError>;

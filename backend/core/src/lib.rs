//! Core value types shared by the Herald crates.
//!
//! Listeners exchange `serde_json::Value` argument sequences; what they return
//! is tagged through [`Reply`] so deferred results are recognized by type
//! instead of by inspection.

pub mod args;
pub mod error;
pub mod outcome;
pub mod reply;

pub use args::Args;
pub use error::{HeraldError, Rejection};
pub use outcome::{ListenerId, ListenerOutcome, Resolution};
pub use reply::{Deferred, Reply};

//! Pre- and post-model checks wrapped around each turn.

pub mod disclaimer;
pub mod fact_check;
pub mod persona;
pub mod phi;
pub mod rules;

pub use disclaimer::{apply_disclaimer, DISCLAIMER};
pub use fact_check::{fact_check, FactCheckOutcome, FACT_CHECK_NOTICE};
pub use persona::{PersonaGuard, PersonaVerdict, REFUSAL_MESSAGE};
pub use phi::redact_phi;

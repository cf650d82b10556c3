//! HTTP handlers, grouped per surface and merged in [`crate::server`].

pub mod chat;
pub mod feedback;
pub mod health;
pub mod sms;

use std::sync::Arc;

use crate::state::AppState;

pub type AppStateArc = Arc<AppState>;

//! Guardrailed healthcare assistant: an LLM agent over deterministic clinical
//! lookup tools, with PHI redaction, a persona lock, a fact-check against tool
//! output and a safety disclaimer around every turn.

pub mod agents;
pub mod config;
pub mod error;
pub mod eval;
pub mod guardrails;
pub mod llm;
pub mod models;
pub mod orchestration;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;
pub mod tools;

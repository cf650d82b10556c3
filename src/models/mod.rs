pub mod chat;
pub mod clinical;
pub mod common;
pub mod llm;
pub mod records;

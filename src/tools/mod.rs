pub mod builtin;
pub mod data;
pub mod definition;
pub mod executor;

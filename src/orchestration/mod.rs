pub mod pipeline;
pub mod tool_events;

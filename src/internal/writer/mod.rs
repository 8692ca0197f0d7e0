pub mod event_writer;

// Re-export main types
pub use event_writer::{
    auto_id_range, format_error_message, random_event_id, ArgumentError, EventWriter,
    LINE_ENDING, STACK_TRACE_SEPARATOR,
};

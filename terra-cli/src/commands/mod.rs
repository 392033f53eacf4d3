//! CLI command implementations.

pub mod check_condition;
pub mod handlers;
pub mod send_event;

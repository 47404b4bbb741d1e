//! Small utilities shared by the lifecycle, auth and web layers.

use std::any::Any;

pub mod system;
pub mod watch;

/// Extracts the message of a caught panic payload.
pub fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

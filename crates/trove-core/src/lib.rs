//! Core shared helpers for Trove.
//!
//! This crate is intentionally small and dependency-free.

use std::any::Any;

pub mod fs;

/// Version string embedded into every persisted Trove document.
pub const TROVE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Best-effort conversion of a panic payload into a printable message.
pub fn panic_payload_to_str(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message;
    }
    match payload.downcast_ref::<String>() {
        Some(message) => message.as_str(),
        None => "<non-string panic payload>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_rendered() {
        let payload = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_payload_to_str(&*payload), "static message");

        let value = 7;
        let payload = std::panic::catch_unwind(|| panic!("formatted {value}")).unwrap_err();
        assert_eq!(panic_payload_to_str(&*payload), "formatted 7");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(panic_payload_to_str(&*payload), "<non-string panic payload>");
    }
}

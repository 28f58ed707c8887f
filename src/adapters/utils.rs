//! Shared utilities for adapter-layer validation.
//!
//! Used by the WiFi credential checks and the NVS config validator.

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
///
/// SSIDs, passphrases and client id prefixes must pass this.
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

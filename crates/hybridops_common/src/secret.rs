//! Timing-safe comparison for shared secrets and signatures.

/// Constant-time byte comparison. Only the length check short-circuits.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Compare a presented secret against the configured one.
/// An unconfigured (empty) secret never matches.
pub fn secrets_match(presented: &str, configured: &str) -> bool {
    if configured.is_empty() {
        return false;
    }
    constant_time_eq(presented.as_bytes(), configured.as_bytes())
}

//! Verify token comparison for the subscription handshake.

/// Check a provided `hub.verify_token` against the configured secret.
///
/// Runs in time independent of where the two tokens first differ.
pub fn verify_token_matches(expected: &str, provided: &str) -> bool {
    expected.len() == provided.len()
        && expected
            .bytes()
            .zip(provided.bytes())
            .fold(0u8, |diff, (e, p)| diff | (e ^ p))
            == 0
}

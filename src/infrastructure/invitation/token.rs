//! Opaque invitation token generation
//!
//! Tokens are 256 bits of OS randomness, URL-safe base64 encoded. They carry
//! no embedded claims and cannot be parsed; the only way to learn anything
//! from one is to look it up.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

const TOKEN_BYTES: usize = 32;

/// Generate a fresh invitation token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

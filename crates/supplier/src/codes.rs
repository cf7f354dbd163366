use sha2::{Digest, Sha256};

const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

/// Generate a random 6-character confirmation code for the manual path.
pub fn generate_confirmation_code() -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Derive a stable 6-character confirmation code from a seed string. The
/// sandbox backend uses this so repeated runs over the same inputs produce
/// the same codes.
pub fn derive_confirmation_code(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    digest
        .iter()
        .take(CODE_LEN)
        .map(|byte| CHARSET[*byte as usize % CHARSET.len()] as char)
        .collect()
}

use rand::{rngs::OsRng, RngCore};

/// 8-character uppercase hex join code: 32 bits of CSPRNG randomness.
/// Collisions are handled by the caller regenerating on a unique
/// constraint violation.
pub fn generate_invite_code() -> String {
    let mut bytes = [0u8; 4];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_eight_uppercase_hex_chars() {
        for _ in 0..100 {
            let code = generate_invite_code();
            assert_eq!(code.len(), 8);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }

    #[test]
    fn codes_vary() {
        let codes: std::collections::HashSet<String> =
            (0..50).map(|_| generate_invite_code()).collect();
        assert!(codes.len() > 1);
    }
}

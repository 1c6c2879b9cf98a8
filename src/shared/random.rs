use getrandom::getrandom;

const UPPERCASE_ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Returns `count` random uppercase ASCII symbols for generated object names.
pub fn random_uppercase_symbols(count: usize) -> Result<String, String> {
    let mut bytes = vec![0_u8; count];
    getrandom(&mut bytes).map_err(|err| format!("failed to gather randomness: {err}"))?;
    Ok(bytes
        .iter()
        .map(|byte| UPPERCASE_ALPHABET[(*byte as usize) % UPPERCASE_ALPHABET.len()] as char)
        .collect())
}

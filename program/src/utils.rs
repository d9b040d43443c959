use solana_program::clock::UnixTimestamp;

/// Reads the first 8 bytes of `seed` as a little-endian u64, zero padded
pub fn word_from_bytes(seed: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    let len = std::cmp::min(seed.len(), 8);
    bytes[..len].copy_from_slice(&seed[..len]);

    u64::from_le_bytes(bytes)
}

/// Maps a random word onto an entrant index
pub fn winner_index(random_word: u64, entrant_count: usize) -> Option<usize> {
    if entrant_count == 0 {
        return None;
    }
    Some((random_word % entrant_count as u64) as usize)
}

/// Seconds elapsed between `since` and `now`, zero if the clock went backwards
pub fn elapsed_seconds(since: UnixTimestamp, now: UnixTimestamp) -> u64 {
    u64::try_from(now.saturating_sub(since)).unwrap_or(0)
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

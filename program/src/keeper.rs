//! Off-chain keeper helpers: decide from a fetched raffle account whether
//! upkeep should be sent and when it next becomes due.

use crate::{instruction, state::{Raffle, RaffleStatus}};
use solana_program::{clock::UnixTimestamp, instruction::Instruction, pubkey::Pubkey};

/// The perform_upkeep instruction to send, if upkeep is needed at `now`
pub fn upkeep_instruction(
    program_id: &Pubkey,
    raffle_account: &Pubkey,
    raffle: &Raffle,
    now: UnixTimestamp,
    coordinator_state: &Pubkey,
) -> Option<Instruction> {
    if !raffle.check_upkeep(now) {
        return None;
    }
    Some(instruction::perform_upkeep(
        program_id,
        raffle_account,
        &raffle.config.coordinator,
        coordinator_state,
    ))
}

/// Earliest time upkeep can succeed, `None` while waiting alone cannot make it
/// eligible (no players yet, or a draw is in flight)
pub fn next_upkeep_at(raffle: &Raffle) -> Option<UnixTimestamp> {
    if raffle.status != RaffleStatus::Open || raffle.entrants.is_empty() || raffle.pool_balance == 0 {
        return None;
    }
    let interval = UnixTimestamp::try_from(raffle.config.interval).ok()?;
    raffle.last_timestamp.checked_add(interval)
}

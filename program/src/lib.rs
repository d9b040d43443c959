// Keeper-driven raffle on Solana.
//
// Players buy tickets while the raffle is open; once the interval has passed a
// keeper performs upkeep, which asks a randomness coordinator for a word. The
// coordinator's callback picks the winner and pays out the whole pool.

pub mod error;
pub mod events;
pub mod instruction;
pub mod keeper;
pub mod processor;
pub mod state;
pub mod utils;
pub mod vrf;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}

// Local randomness coordinator used on development clusters and in tests.
//
// Requests are recorded per consumer and answered on demand by whoever sends
// `FulfillRandomWords`, with either caller-chosen words or words derived from
// the request id. Never deploy it where real value is at stake.

pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::process(program_id, accounts, instruction_data)
}

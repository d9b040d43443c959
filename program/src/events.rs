//! Events emitted by the raffle program for off-chain observers (keepers,
//! indexers, front ends).
//!
//! Each event is written with `sol_log_data` as two fields: an 8 byte
//! discriminator (`sha256("event:<Name>")[..8]`) followed by the Borsh payload.
use arrayref::array_ref;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{entrypoint::ProgramResult, hash::hashv, log::sol_log_data, pubkey::Pubkey};

pub trait Event: BorshSerialize {
    const NAME: &'static str;

    fn discriminator() -> [u8; 8] {
        let hash = hashv(&[b"event:", Self::NAME.as_bytes()]).to_bytes();
        *array_ref![hash, 0, 8]
    }
}

/// Emitted when a ticket is bought
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct EnteredRaffle {
    pub raffle: Pubkey,
    pub player: Pubkey,
    pub amount: u64,
}

impl Event for EnteredRaffle {
    const NAME: &'static str = "EnteredRaffle";
}

/// Emitted when upkeep closes entries and randomness is requested
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RequestedRaffleWinner {
    pub raffle: Pubkey,
    pub request_id: u64,
}

impl Event for RequestedRaffleWinner {
    const NAME: &'static str = "RequestedRaffleWinner";
}

/// Emitted once the winner has been paid and the raffle reopened
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct WinnerPicked {
    pub raffle: Pubkey,
    pub winner: Pubkey,
    pub amount: u64,
}

impl Event for WinnerPicked {
    const NAME: &'static str = "WinnerPicked";
}

pub fn emit<E: Event>(event: &E) -> ProgramResult {
    let payload = event.try_to_vec()?;
    sol_log_data(&[&E::discriminator()[..], &payload[..]]);
    Ok(())
}

/// Decode an event from the fields of a `Program data:` log line
pub fn decode<E: Event + BorshDeserialize>(fields: &[&[u8]]) -> Option<E> {
    match fields {
        [discriminator, payload] if discriminator[..] == E::discriminator()[..] => {
            E::try_from_slice(payload).ok()
        }
        _ => None,
    }
}

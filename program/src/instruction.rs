use crate::{
    error::RaffleError,
    state::RaffleConfig,
    vrf::{self, FULFILL_RANDOM_WORDS_TAG},
};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;
use std::mem::size_of;

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Initialize a raffle with its immutable configuration
    ///
    /// Accounts expected:
    /// 0. `[signer]` The authority initializing the raffle
    /// 1. `[writable]` The raffle account, pre-allocated with `Raffle::LEN` bytes and owned by this program
    /// 2. `[]` The randomness coordinator program
    InitializeRaffle {
        /// Minimum payment in lamports to enter
        entrance_fee: u64,
        /// Seconds a cycle runs before upkeep is eligible
        interval: u64,
        /// Coordinator gas lane
        key_hash: [u8; 32],
        /// Coordinator subscription
        subscription_id: u64,
        /// Compute units reserved for the fulfillment callback
        callback_compute_limit: u32,
        /// Confirmations the coordinator waits before answering
        request_confirmations: u16,
    },

    /// Buy one ticket
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player paying the entrance fee
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Evaluate the upkeep predicate; the answer is set as return data (`[0]` or `[1]`)
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep,

    /// Close entries and request randomness (anyone may call, usually a keeper)
    ///
    /// Accounts expected:
    /// 0. `[writable]` The raffle account
    /// 1. `[]` The randomness coordinator program
    /// 2. `[writable]` The coordinator state account
    PerformUpkeep,

    /// Coordinator callback delivering the random words
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator authority PDA
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winner
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<u64>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_u64(rest)?;
                let (key_hash, rest) = Self::unpack_fixed_bytes::<32>(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (callback_compute_limit, rest) = Self::unpack_u32(rest)?;
                let (request_confirmations, _) = Self::unpack_u16(rest)?;
                Self::InitializeRaffle {
                    entrance_fee,
                    interval,
                    key_hash,
                    subscription_id,
                    callback_compute_limit,
                    request_confirmations,
                }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            2 => Self::CheckUpkeep,
            3 => Self::PerformUpkeep,
            FULFILL_RANDOM_WORDS_TAG => {
                let (request_id, random_words) =
                    vrf::unpack_fulfillment(rest).map_err(|_| RaffleError::InvalidInstructionData)?;
                Self::FulfillRandomWords {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(RaffleError::InvalidInstructionData.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::InitializeRaffle {
                entrance_fee,
                interval,
                key_hash,
                subscription_id,
                callback_compute_limit,
                request_confirmations,
            } => {
                buf.push(0);
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(key_hash);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(&callback_compute_limit.to_le_bytes());
                buf.extend_from_slice(&request_confirmations.to_le_bytes());
            }
            Self::EnterRaffle { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep => buf.push(2),
            Self::PerformUpkeep => buf.push(3),
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => buf = vrf::pack_fulfillment(*request_id, random_words),
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((u64::from_le_bytes(bytes), rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<4>(input)?;
        Ok((u32::from_le_bytes(bytes), rest))
    }

    fn unpack_u16(input: &[u8]) -> Result<(u16, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<2>(input)?;
        Ok((u16::from_le_bytes(bytes), rest))
    }

    fn unpack_fixed_bytes<const N: usize>(input: &[u8]) -> Result<([u8; N], &[u8]), ProgramError> {
        if input.len() < N {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (bytes, rest) = input.split_at(N);
        let bytes: [u8; N] = bytes
            .try_into()
            .map_err(|_| RaffleError::InvalidInstructionData)?;
        Ok((bytes, rest))
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    raffle_account: &Pubkey,
    config: &RaffleConfig,
) -> Instruction {
    let data = RaffleInstruction::InitializeRaffle {
        entrance_fee: config.entrance_fee,
        interval: config.interval,
        key_hash: config.key_hash,
        subscription_id: config.subscription_id,
        callback_compute_limit: config.callback_compute_limit,
        request_confirmations: config.request_confirmations,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(config.coordinator, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    player: &Pubkey,
    raffle_account: &Pubkey,
    amount: u64,
) -> Instruction {
    let data = RaffleInstruction::EnterRaffle { amount }.pack();

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle_account: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle_account, false)],
        data: RaffleInstruction::CheckUpkeep.pack(),
    }
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    raffle_account: &Pubkey,
    coordinator_program: &Pubkey,
    coordinator_state: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*coordinator_program, false),
        AccountMeta::new(*coordinator_state, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::PerformUpkeep.pack(),
    }
}

/// Create a fulfill_random_words callback addressed to the raffle.
///
/// Normally built and signed by the coordinator program.
pub fn fulfill_random_words(
    program_id: &Pubkey,
    coordinator_authority: &Pubkey,
    raffle_account: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: &[u64],
) -> Instruction {
    vrf::fulfill_random_words(
        program_id,
        coordinator_authority,
        raffle_account,
        request_id,
        random_words,
        &[AccountMeta::new(*winner, false)],
    )
}

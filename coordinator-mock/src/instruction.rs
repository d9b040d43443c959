use keeper_raffle::vrf::{self, RandomnessRequest, REQUEST_RANDOM_WORDS_TAG};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
};
use std::convert::TryInto;

#[derive(Clone, Debug, PartialEq)]
pub enum CoordinatorInstruction {
    /// Accounts expected:
    /// 0. `[writable]` The coordinator state account, owned by the coordinator program
    InitializeCoordinator,

    /// Accounts expected:
    /// 0. `[writable]` The coordinator state account
    /// 1. `[]` The consumer account
    RequestRandomWords(RandomnessRequest),

    /// Answer a pending request
    ///
    /// Accounts expected:
    /// 0. `[signer]` The fulfiller
    /// 1. `[writable]` The coordinator state account
    /// 2. `[]` The coordinator authority PDA
    /// 3. `[]` The consumer program
    /// 4. `[writable]` The consumer account
    /// Followed by accounts forwarded to the consumer callback
    FulfillRandomWords {
        request_id: u64,
        /// Words to deliver instead of the derived ones
        override_words: Option<Vec<u64>>,
    },
}

impl CoordinatorInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => Self::InitializeCoordinator,
            REQUEST_RANDOM_WORDS_TAG => Self::RequestRandomWords(RandomnessRequest::unpack(rest)?),
            2 => {
                let request_id = rest
                    .get(..8)
                    .and_then(|slice| slice.try_into().ok())
                    .map(u64::from_le_bytes)
                    .ok_or(ProgramError::InvalidInstructionData)?;
                let override_words = match rest.get(8) {
                    Some(0) => None,
                    Some(1) => Some(vrf::unpack_words(&rest[9..])?),
                    _ => return Err(ProgramError::InvalidInstructionData),
                };
                Self::FulfillRandomWords {
                    request_id,
                    override_words,
                }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    pub fn pack(&self) -> Vec<u8> {
        match self {
            Self::InitializeCoordinator => vec![0],
            Self::RequestRandomWords(request) => {
                let mut buf = vec![0u8; 1 + RandomnessRequest::LEN];
                buf[0] = REQUEST_RANDOM_WORDS_TAG;
                request.pack_into_slice(&mut buf[1..]);
                buf
            }
            Self::FulfillRandomWords {
                request_id,
                override_words,
            } => {
                let mut buf = vec![2];
                buf.extend_from_slice(&request_id.to_le_bytes());
                match override_words {
                    None => buf.push(0),
                    Some(words) => {
                        buf.push(1);
                        buf.extend_from_slice(&(words.len() as u32).to_le_bytes());
                        for word in words {
                            buf.extend_from_slice(&word.to_le_bytes());
                        }
                    }
                }
                buf
            }
        }
    }
}

/// Create initialize_coordinator instruction
pub fn initialize_coordinator(coordinator_program: &Pubkey, state: &Pubkey) -> Instruction {
    Instruction {
        program_id: *coordinator_program,
        accounts: vec![AccountMeta::new(*state, false)],
        data: CoordinatorInstruction::InitializeCoordinator.pack(),
    }
}

/// Create fulfill_random_words instruction
#[allow(clippy::too_many_arguments)]
pub fn fulfill_random_words(
    coordinator_program: &Pubkey,
    fulfiller: &Pubkey,
    state: &Pubkey,
    consumer_program: &Pubkey,
    consumer: &Pubkey,
    request_id: u64,
    override_words: Option<Vec<u64>>,
    forwarded: &[AccountMeta],
) -> Instruction {
    let (authority, _) = vrf::coordinator_authority(coordinator_program);
    let mut accounts = vec![
        AccountMeta::new_readonly(*fulfiller, true),
        AccountMeta::new(*state, false),
        AccountMeta::new_readonly(authority, false),
        AccountMeta::new_readonly(*consumer_program, false),
        AccountMeta::new(*consumer, false),
    ];
    accounts.extend_from_slice(forwarded);

    Instruction {
        program_id: *coordinator_program,
        accounts,
        data: CoordinatorInstruction::FulfillRandomWords {
            request_id,
            override_words,
        }
        .pack(),
    }
}

// Randomness coordinator interface: the outbound request a consumer sends and
// the inbound callback a coordinator delivers.
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke},
    program_error::ProgramError,
    pubkey::Pubkey,
};
use std::convert::TryInto;

/// Seed of the PDA a coordinator signs consumer callbacks with
pub const COORDINATOR_AUTHORITY_SEED: &[u8] = b"coordinator";

/// Coordinator instruction tag for a randomness request
pub const REQUEST_RANDOM_WORDS_TAG: u8 = 1;

/// Consumer instruction tag for the fulfillment callback
pub const FULFILL_RANDOM_WORDS_TAG: u8 = 4;

pub const MAX_NUM_WORDS: u32 = 500;
pub const MAX_REQUEST_CONFIRMATIONS: u16 = 200;

/// Parameters of a single randomness request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    /// Gas lane selecting the oracle key
    pub key_hash: [u8; 32],
    /// Subscription billed for the request
    pub subscription_id: u64,
    /// Confirmations the oracle waits before answering
    pub request_confirmations: u16,
    /// Compute units reserved for the consumer callback
    pub callback_compute_limit: u32,
    /// Number of random words to deliver
    pub num_words: u32,
}

impl RandomnessRequest {
    pub const LEN: usize = 32 + 8 + 2 + 4 + 4;

    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        if input.len() < Self::LEN {
            return Err(ProgramError::InvalidInstructionData);
        }
        let src = array_ref![input, 0, RandomnessRequest::LEN];
        let (key_hash, subscription_id, request_confirmations, callback_compute_limit, num_words) =
            array_refs![src, 32, 8, 2, 4, 4];

        Ok(Self {
            key_hash: *key_hash,
            subscription_id: u64::from_le_bytes(*subscription_id),
            request_confirmations: u16::from_le_bytes(*request_confirmations),
            callback_compute_limit: u32::from_le_bytes(*callback_compute_limit),
            num_words: u32::from_le_bytes(*num_words),
        })
    }

    pub fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, RandomnessRequest::LEN];
        let (
            key_hash_dst,
            subscription_id_dst,
            request_confirmations_dst,
            callback_compute_limit_dst,
            num_words_dst,
        ) = mut_array_refs![dst, 32, 8, 2, 4, 4];

        key_hash_dst.copy_from_slice(&self.key_hash);
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        *request_confirmations_dst = self.request_confirmations.to_le_bytes();
        *callback_compute_limit_dst = self.callback_compute_limit.to_le_bytes();
        *num_words_dst = self.num_words.to_le_bytes();
    }
}

/// Anything able to accept a randomness request and hand back its id.
///
/// The answer never arrives through this call; it comes back later as a
/// separate fulfillment instruction carrying the same id.
pub trait RandomnessOracle {
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError>;
}

/// Derive the coordinator's callback signing authority
pub fn coordinator_authority(coordinator_program: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[COORDINATOR_AUTHORITY_SEED], coordinator_program)
}

/// Create a request_random_words instruction for a coordinator
///
/// Accounts expected:
/// 0. `[writable]` The coordinator state account
/// 1. `[]` The consumer account the answer is delivered to
pub fn request_random_words(
    coordinator_program: &Pubkey,
    coordinator_state: &Pubkey,
    consumer: &Pubkey,
    request: &RandomnessRequest,
) -> Instruction {
    let mut data = vec![0u8; 1 + RandomnessRequest::LEN];
    data[0] = REQUEST_RANDOM_WORDS_TAG;
    request.pack_into_slice(&mut data[1..]);

    Instruction {
        program_id: *coordinator_program,
        accounts: vec![
            AccountMeta::new(*coordinator_state, false),
            AccountMeta::new_readonly(*consumer, false),
        ],
        data,
    }
}

/// Encode the fulfillment callback payload (tag included)
pub fn pack_fulfillment(request_id: u64, random_words: &[u64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 8 + 4 + random_words.len() * 8);
    buf.push(FULFILL_RANDOM_WORDS_TAG);
    buf.extend_from_slice(&request_id.to_le_bytes());
    buf.extend_from_slice(&(random_words.len() as u32).to_le_bytes());
    for word in random_words {
        buf.extend_from_slice(&word.to_le_bytes());
    }
    buf
}

/// Decode the fulfillment callback payload (tag already stripped)
pub fn unpack_fulfillment(input: &[u8]) -> Result<(u64, Vec<u64>), ProgramError> {
    let request_id = input
        .get(..8)
        .and_then(|slice| slice.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(ProgramError::InvalidInstructionData)?;
    let random_words = unpack_words(input.get(8..).ok_or(ProgramError::InvalidInstructionData)?)?;

    Ok((request_id, random_words))
}

/// Decode a `u32` count followed by exactly that many `u64` words
pub fn unpack_words(input: &[u8]) -> Result<Vec<u64>, ProgramError> {
    let count = input
        .get(..4)
        .and_then(|slice| slice.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(ProgramError::InvalidInstructionData)? as usize;

    let words = &input[4..];
    if words.len() != count * 8 {
        return Err(ProgramError::InvalidInstructionData);
    }
    Ok(words
        .chunks_exact(8)
        .map(|chunk| u64::from_le_bytes(*array_ref![chunk, 0, 8]))
        .collect())
}

/// Create the consumer callback instruction a coordinator invokes
///
/// Accounts expected:
/// 0. `[signer]` The coordinator authority PDA
/// 1. `[writable]` The consumer account
/// Followed by the accounts forwarded by the fulfiller
pub fn fulfill_random_words(
    consumer_program: &Pubkey,
    coordinator_authority: &Pubkey,
    consumer: &Pubkey,
    request_id: u64,
    random_words: &[u64],
    forwarded: &[AccountMeta],
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new_readonly(*coordinator_authority, true),
        AccountMeta::new(*consumer, false),
    ];
    accounts.extend_from_slice(forwarded);

    Instruction {
        program_id: *consumer_program,
        accounts,
        data: pack_fulfillment(request_id, random_words),
    }
}

/// Requests randomness from a coordinator program through CPI
pub struct CoordinatorClient<'a, 'b> {
    pub coordinator_program: &'a AccountInfo<'b>,
    pub coordinator_state: &'a AccountInfo<'b>,
    pub consumer: &'a AccountInfo<'b>,
}

impl<'a, 'b> RandomnessOracle for CoordinatorClient<'a, 'b> {
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError> {
        invoke(
            &request_random_words(
                self.coordinator_program.key,
                self.coordinator_state.key,
                self.consumer.key,
                request,
            ),
            &[
                self.coordinator_state.clone(),
                self.consumer.clone(),
                self.coordinator_program.clone(),
            ],
        )?;

        match get_return_data() {
            Some((program_id, data)) if program_id == *self.coordinator_program.key => data
                .get(..8)
                .and_then(|slice| slice.try_into().ok())
                .map(u64::from_le_bytes)
                .ok_or(ProgramError::InvalidAccountData),
            _ => {
                msg!("Coordinator returned no request id");
                Err(ProgramError::InvalidAccountData)
            }
        }
    }
}

use crate::error::CoordinatorError;
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use keeper_raffle::{
    utils,
    vrf::{RandomnessRequest, MAX_NUM_WORDS, MAX_REQUEST_CONFIRMATIONS},
};
use solana_program::{
    keccak, msg,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

/// Requests the coordinator keeps open at once
pub const MAX_PENDING_REQUESTS: usize = 16;

/// A request waiting for its answer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_id: u64,
    /// Program the answer is delivered to
    pub consumer_program: Pubkey,
    /// Account the answer is delivered for
    pub consumer: Pubkey,
    pub params: RandomnessRequest,
}

impl PendingRequest {
    const LEN: usize = 8 + 32 + 32 + RandomnessRequest::LEN;

    fn unpack_from_slice(src: &[u8; PendingRequest::LEN]) -> Result<Self, ProgramError> {
        let (request_id, consumer_program, consumer, params) =
            array_refs![src, 8, 32, 32, RandomnessRequest::LEN];
        Ok(Self {
            request_id: u64::from_le_bytes(*request_id),
            consumer_program: Pubkey::new_from_array(*consumer_program),
            consumer: Pubkey::new_from_array(*consumer),
            params: RandomnessRequest::unpack(params)?,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8; PendingRequest::LEN]) {
        let (request_id_dst, consumer_program_dst, consumer_dst, params_dst) =
            mut_array_refs![dst, 8, 32, 32, RandomnessRequest::LEN];
        *request_id_dst = self.request_id.to_le_bytes();
        consumer_program_dst.copy_from_slice(self.consumer_program.as_ref());
        consumer_dst.copy_from_slice(self.consumer.as_ref());
        self.params.pack_into_slice(params_dst);
    }
}

const PENDING_LEN: usize = MAX_PENDING_REQUESTS * PendingRequest::LEN;

/// Coordinator state account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coordinator {
    pub is_initialized: bool,
    /// Id handed to the next request, starting at 1
    pub next_request_id: u64,
    pub pending: Vec<PendingRequest>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            is_initialized: true,
            next_request_id: 1,
            pending: Vec::new(),
        }
    }

    pub fn request(&self, request_id: u64) -> Option<&PendingRequest> {
        self.pending.iter().find(|r| r.request_id == request_id)
    }

    /// Record a request and return its id
    pub fn record(
        &mut self,
        consumer_program: Pubkey,
        consumer: Pubkey,
        params: RandomnessRequest,
    ) -> Result<u64, ProgramError> {
        if params.num_words == 0 || params.num_words > MAX_NUM_WORDS {
            msg!("Requested {} words, allowed 1..={}", params.num_words, MAX_NUM_WORDS);
            return Err(CoordinatorError::InvalidNumWords.into());
        }
        if params.request_confirmations > MAX_REQUEST_CONFIRMATIONS {
            msg!(
                "Requested {} confirmations, allowed up to {}",
                params.request_confirmations,
                MAX_REQUEST_CONFIRMATIONS
            );
            return Err(CoordinatorError::InvalidRequestConfirmations.into());
        }
        if self.pending.len() >= MAX_PENDING_REQUESTS {
            return Err(CoordinatorError::TooManyPendingRequests.into());
        }

        let request_id = self.next_request_id;
        self.next_request_id = request_id.checked_add(1).ok_or(ProgramError::InvalidAccountData)?;
        self.pending.push(PendingRequest {
            request_id,
            consumer_program,
            consumer,
            params,
        });
        Ok(request_id)
    }

    /// Remove a request so it can be answered exactly once
    pub fn take(&mut self, request_id: u64) -> Result<PendingRequest, ProgramError> {
        let position = self
            .pending
            .iter()
            .position(|r| r.request_id == request_id)
            .ok_or(CoordinatorError::NonexistentRequest)?;
        Ok(self.pending.remove(position))
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Sealed for Coordinator {}

impl IsInitialized for Coordinator {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Coordinator {
    const LEN: usize = 1 + 8 + 1 + PENDING_LEN;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Coordinator::LEN];
        let (is_initialized, next_request_id, pending_count, pending) =
            array_refs![src, 1, 8, 1, PENDING_LEN];

        let pending_count = pending_count[0] as usize;
        if pending_count > MAX_PENDING_REQUESTS {
            return Err(ProgramError::InvalidAccountData);
        }
        let pending = (0..pending_count)
            .map(|i| {
                PendingRequest::unpack_from_slice(array_ref![
                    pending,
                    i * PendingRequest::LEN,
                    PendingRequest::LEN
                ])
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Coordinator {
            is_initialized: is_initialized[0] != 0,
            next_request_id: u64::from_le_bytes(*next_request_id),
            pending,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Coordinator::LEN];
        let (is_initialized_dst, next_request_id_dst, pending_count_dst, pending_dst) =
            mut_array_refs![dst, 1, 8, 1, PENDING_LEN];

        is_initialized_dst[0] = self.is_initialized as u8;
        *next_request_id_dst = self.next_request_id.to_le_bytes();
        pending_count_dst[0] = self.pending.len() as u8;
        pending_dst.fill(0);
        for (i, request) in self.pending.iter().enumerate() {
            request.pack_into_slice(array_mut_ref![
                pending_dst,
                i * PendingRequest::LEN,
                PendingRequest::LEN
            ]);
        }
    }
}

/// Words the coordinator derives for a request when none are supplied
pub fn derive_words(request_id: u64, num_words: u32) -> Vec<u64> {
    (0..num_words as u64)
        .map(|i| {
            let hash = keccak::hashv(&[&request_id.to_le_bytes()[..], &i.to_le_bytes()[..]]);
            utils::word_from_bytes(&hash.to_bytes())
        })
        .collect()
}

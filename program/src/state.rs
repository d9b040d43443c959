use crate::{
    error::RaffleError,
    utils,
    vrf::{RandomnessOracle, RandomnessRequest, MAX_REQUEST_CONFIRMATIONS},
};
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    clock::UnixTimestamp,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::{Pubkey, PUBKEY_BYTES},
};
use std::{convert::TryFrom, fmt};

/// Maximum number of tickets a single cycle can hold
pub const MAX_ENTRANTS: usize = 128;

/// Random words requested per draw
pub const NUM_WORDS: u32 = 1;

const ENTRANTS_LEN: usize = MAX_ENTRANTS * PUBKEY_BYTES;

/// Status of a raffle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleStatus {
    /// Raffle is open for entries
    Open,
    /// Upkeep performed, waiting for the coordinator to answer
    Calculating,
}

impl TryFrom<u8> for RaffleStatus {
    type Error = &'static str;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RaffleStatus::Open),
            1 => Ok(RaffleStatus::Calculating),
            _ => Err("Invalid raffle status"),
        }
    }
}

impl From<RaffleStatus> for u8 {
    fn from(status: RaffleStatus) -> Self {
        match status {
            RaffleStatus::Open => 0,
            RaffleStatus::Calculating => 1,
        }
    }
}

/// Settings fixed when the raffle is initialized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum payment in lamports to enter
    pub entrance_fee: u64,
    /// Seconds a cycle must run before upkeep is eligible
    pub interval: u64,
    /// Program id of the randomness coordinator
    pub coordinator: Pubkey,
    /// Coordinator gas lane
    pub key_hash: [u8; 32],
    /// Coordinator subscription paying for requests
    pub subscription_id: u64,
    /// Compute units the coordinator reserves for our callback
    pub callback_compute_limit: u32,
    /// Confirmations the coordinator waits before answering
    pub request_confirmations: u16,
}

impl RaffleConfig {
    /// Values used on local and development clusters
    pub fn development(coordinator: Pubkey) -> Self {
        Self {
            entrance_fee: 10_000_000, // 0.01 SOL
            interval: 30,
            coordinator,
            key_hash: [0u8; 32],
            subscription_id: 1,
            callback_compute_limit: 500_000,
            request_confirmations: 3,
        }
    }

    pub fn validate(&self) -> ProgramResult {
        if self.entrance_fee == 0 {
            msg!("Entrance fee must be greater than zero");
            return Err(RaffleError::InvalidConfig.into());
        }
        if self.request_confirmations > MAX_REQUEST_CONFIRMATIONS {
            msg!(
                "Request confirmations cannot exceed {}",
                MAX_REQUEST_CONFIRMATIONS
            );
            return Err(RaffleError::InvalidConfig.into());
        }
        if self.coordinator == Pubkey::default() {
            msg!("Coordinator program must be set");
            return Err(RaffleError::InvalidConfig.into());
        }
        Ok(())
    }
}

/// Credits the pool to a drawn winner
pub trait PrizePayout {
    fn pay(&mut self, winner: &Pubkey, amount: u64) -> ProgramResult;
}

/// What upkeep eligibility was judged on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepSnapshot {
    pub status: RaffleStatus,
    pub elapsed: u64,
    pub interval: u64,
    pub players: usize,
    pub balance: u64,
}

impl UpkeepSnapshot {
    pub fn is_needed(&self) -> bool {
        self.status == RaffleStatus::Open
            && self.elapsed >= self.interval
            && self.players > 0
            && self.balance > 0
    }
}

impl fmt::Display for UpkeepSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "balance={} players={} status={:?} elapsed={}s interval={}s",
            self.balance, self.players, self.status, self.elapsed, self.interval
        )
    }
}

/// Raffle account data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Account that initialized the raffle
    pub authority: Pubkey,
    pub config: RaffleConfig,
    pub status: RaffleStatus,
    /// Start of the current cycle
    pub last_timestamp: UnixTimestamp,
    /// Lamports collected since the last payout
    pub pool_balance: u64,
    /// Request id awaiting fulfillment, only while calculating
    pub pending_request: Option<u64>,
    /// Last paid winner, default until the first draw
    pub recent_winner: Pubkey,
    /// One entry per ticket, in entry order
    pub entrants: Vec<Pubkey>,
}

impl Raffle {
    pub fn new(authority: Pubkey, config: RaffleConfig, now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            authority,
            config,
            status: RaffleStatus::Open,
            last_timestamp: now,
            pool_balance: 0,
            pending_request: None,
            recent_winner: Pubkey::default(),
            entrants: Vec::new(),
        }
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.config.interval
    }

    pub fn num_players(&self) -> usize {
        self.entrants.len()
    }

    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }

    pub fn request_confirmations(&self) -> u16 {
        self.config.request_confirmations
    }

    pub fn player(&self, index: usize) -> Result<Pubkey, ProgramError> {
        self.entrants
            .get(index)
            .copied()
            .ok_or_else(|| RaffleError::PlayerIndexOutOfBounds.into())
    }

    /// Add one ticket for `player`
    pub fn enter(&mut self, player: Pubkey, payment: u64) -> ProgramResult {
        if self.status != RaffleStatus::Open {
            msg!("Raffle is calculating a winner");
            return Err(RaffleError::NotOpen.into());
        }
        if payment < self.config.entrance_fee {
            msg!(
                "Payment of {} lamports is below the entrance fee of {}",
                payment,
                self.config.entrance_fee
            );
            return Err(RaffleError::NotEnoughEntered.into());
        }
        if self.entrants.len() >= MAX_ENTRANTS {
            msg!("Raffle already holds {} entrants", MAX_ENTRANTS);
            return Err(RaffleError::RaffleFull.into());
        }
        let pool_balance = self
            .pool_balance
            .checked_add(payment)
            .ok_or(RaffleError::Overflow)?;

        self.entrants.push(player);
        self.pool_balance = pool_balance;
        Ok(())
    }

    pub fn upkeep_snapshot(&self, now: UnixTimestamp) -> UpkeepSnapshot {
        UpkeepSnapshot {
            status: self.status,
            elapsed: utils::elapsed_seconds(self.last_timestamp, now),
            interval: self.config.interval,
            players: self.entrants.len(),
            balance: self.pool_balance,
        }
    }

    pub fn check_upkeep(&self, now: UnixTimestamp) -> bool {
        self.upkeep_snapshot(now).is_needed()
    }

    /// Parameters sent to the coordinator on upkeep
    pub fn randomness_request(&self) -> RandomnessRequest {
        RandomnessRequest {
            key_hash: self.config.key_hash,
            subscription_id: self.config.subscription_id,
            request_confirmations: self.config.request_confirmations,
            callback_compute_limit: self.config.callback_compute_limit,
            num_words: NUM_WORDS,
        }
    }

    /// Close entries and ask the oracle for randomness.
    ///
    /// Eligibility is re-checked here no matter what the caller saw when it
    /// polled. Returns the id of the now pending request.
    pub fn perform_upkeep<O: RandomnessOracle>(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut O,
    ) -> Result<u64, ProgramError> {
        let snapshot = self.upkeep_snapshot(now);
        if !snapshot.is_needed() {
            msg!("Upkeep not needed: {}", snapshot);
            return Err(RaffleError::UpkeepNotNeeded.into());
        }

        let request_id = oracle.request_random_words(&self.randomness_request())?;

        self.status = RaffleStatus::Calculating;
        self.pending_request = Some(request_id);
        Ok(request_id)
    }

    /// Winner for a fulfillment of the pending request, without touching state
    pub fn draw_winner(&self, request_id: u64, random_words: &[u64]) -> Result<Pubkey, ProgramError> {
        if self.status != RaffleStatus::Calculating || self.pending_request != Some(request_id) {
            msg!("Request {} is not pending", request_id);
            return Err(RaffleError::UnrecognizedRequest.into());
        }
        let random_word = random_words
            .first()
            .copied()
            .ok_or(RaffleError::InvalidRandomWords)?;
        let index = match utils::winner_index(random_word, self.entrants.len()) {
            Some(index) => index,
            None => {
                msg!("Calculating with no entrants, raffle account is corrupt");
                return Err(ProgramError::InvalidAccountData);
            }
        };

        msg!("Random winner index: {}", index);
        Ok(self.entrants[index])
    }

    /// Pay the drawn winner and start a new cycle.
    ///
    /// The payout runs before any field changes; if it fails the raffle is
    /// left exactly as it was and the error is reported as `TransferFailed`
    /// (or the payout's own `RaffleError`).
    pub fn fulfill_random_words<P: PrizePayout>(
        &mut self,
        request_id: u64,
        random_words: &[u64],
        now: UnixTimestamp,
        payout: &mut P,
    ) -> Result<Pubkey, ProgramError> {
        let winner = self.draw_winner(request_id, random_words)?;

        payout
            .pay(&winner, self.pool_balance)
            .map_err(|err| match err {
                ProgramError::Custom(_) => err,
                _ => RaffleError::TransferFailed.into(),
            })?;

        self.recent_winner = winner;
        self.entrants.clear();
        self.pool_balance = 0;
        self.last_timestamp = now;
        self.pending_request = None;
        self.status = RaffleStatus::Open;
        Ok(winner)
    }
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Raffle {
    const LEN: usize =
        1 + 32 + 8 + 8 + 32 + 32 + 8 + 4 + 2 + 1 + 8 + 8 + 1 + 8 + 32 + 4 + ENTRANTS_LEN;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Raffle::LEN];
        let (
            is_initialized,
            authority,
            entrance_fee,
            interval,
            coordinator,
            key_hash,
            subscription_id,
            callback_compute_limit,
            request_confirmations,
            status,
            last_timestamp,
            pool_balance,
            has_pending_request,
            pending_request,
            recent_winner,
            entrant_count,
            entrants,
        ) = array_refs![src, 1, 32, 8, 8, 32, 32, 8, 4, 2, 1, 8, 8, 1, 8, 32, 4, ENTRANTS_LEN];

        let status = RaffleStatus::try_from(status[0]).map_err(|_| ProgramError::InvalidAccountData)?;
        let entrant_count = u32::from_le_bytes(*entrant_count) as usize;
        if entrant_count > MAX_ENTRANTS {
            return Err(ProgramError::InvalidAccountData);
        }
        let entrants = (0..entrant_count)
            .map(|i| Pubkey::new_from_array(*array_ref![entrants, i * PUBKEY_BYTES, PUBKEY_BYTES]))
            .collect();
        let pending_request = match has_pending_request[0] {
            0 => None,
            1 => Some(u64::from_le_bytes(*pending_request)),
            _ => return Err(ProgramError::InvalidAccountData),
        };

        Ok(Raffle {
            is_initialized: is_initialized[0] != 0,
            authority: Pubkey::new_from_array(*authority),
            config: RaffleConfig {
                entrance_fee: u64::from_le_bytes(*entrance_fee),
                interval: u64::from_le_bytes(*interval),
                coordinator: Pubkey::new_from_array(*coordinator),
                key_hash: *key_hash,
                subscription_id: u64::from_le_bytes(*subscription_id),
                callback_compute_limit: u32::from_le_bytes(*callback_compute_limit),
                request_confirmations: u16::from_le_bytes(*request_confirmations),
            },
            status,
            last_timestamp: UnixTimestamp::from_le_bytes(*last_timestamp),
            pool_balance: u64::from_le_bytes(*pool_balance),
            pending_request,
            recent_winner: Pubkey::new_from_array(*recent_winner),
            entrants,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Raffle::LEN];
        let (
            is_initialized_dst,
            authority_dst,
            entrance_fee_dst,
            interval_dst,
            coordinator_dst,
            key_hash_dst,
            subscription_id_dst,
            callback_compute_limit_dst,
            request_confirmations_dst,
            status_dst,
            last_timestamp_dst,
            pool_balance_dst,
            has_pending_request_dst,
            pending_request_dst,
            recent_winner_dst,
            entrant_count_dst,
            entrants_dst,
        ) = mut_array_refs![dst, 1, 32, 8, 8, 32, 32, 8, 4, 2, 1, 8, 8, 1, 8, 32, 4, ENTRANTS_LEN];

        is_initialized_dst[0] = self.is_initialized as u8;
        authority_dst.copy_from_slice(self.authority.as_ref());
        *entrance_fee_dst = self.config.entrance_fee.to_le_bytes();
        *interval_dst = self.config.interval.to_le_bytes();
        coordinator_dst.copy_from_slice(self.config.coordinator.as_ref());
        key_hash_dst.copy_from_slice(&self.config.key_hash);
        *subscription_id_dst = self.config.subscription_id.to_le_bytes();
        *callback_compute_limit_dst = self.config.callback_compute_limit.to_le_bytes();
        *request_confirmations_dst = self.config.request_confirmations.to_le_bytes();
        status_dst[0] = self.status.into();
        *last_timestamp_dst = self.last_timestamp.to_le_bytes();
        *pool_balance_dst = self.pool_balance.to_le_bytes();
        has_pending_request_dst[0] = self.pending_request.is_some() as u8;
        *pending_request_dst = self.pending_request.unwrap_or_default().to_le_bytes();
        recent_winner_dst.copy_from_slice(self.recent_winner.as_ref());
        *entrant_count_dst = (self.entrants.len() as u32).to_le_bytes();

        entrants_dst.fill(0);
        for (slot, entrant) in entrants_dst
            .chunks_exact_mut(PUBKEY_BYTES)
            .zip(self.entrants.iter())
        {
            slot.copy_from_slice(entrant.as_ref());
        }
    }
}

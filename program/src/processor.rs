use crate::{
    error::RaffleError,
    events::{self, EnteredRaffle, RequestedRaffleWinner, WinnerPicked},
    instruction::RaffleInstruction,
    state::{PrizePayout, Raffle, RaffleConfig},
    utils,
    vrf::{self, CoordinatorClient},
};

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle {
                entrance_fee,
                interval,
                key_hash,
                subscription_id,
                callback_compute_limit,
                request_confirmations,
            } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(
                    program_id,
                    accounts,
                    entrance_fee,
                    interval,
                    key_hash,
                    subscription_id,
                    callback_compute_limit,
                    request_confirmations,
                )
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(program_id, accounts, amount)
            }
            RaffleInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            RaffleInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, &random_words)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_initialize_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        entrance_fee: u64,
        interval: u64,
        key_hash: [u8; 32],
        subscription_id: u64,
        callback_compute_limit: u32,
        request_confirmations: u16,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let rent = Rent::get()?;
        if !rent.is_exempt(raffle_info.lamports(), raffle_info.data_len()) {
            msg!("Raffle account is not rent exempt");
            return Err(ProgramError::AccountNotRentExempt);
        }

        if Raffle::unpack_unchecked(&raffle_info.data.borrow())?.is_initialized {
            msg!("Raffle account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }
        if !coordinator_info.executable {
            msg!("Coordinator {} is not a program", coordinator_info.key);
            return Err(RaffleError::InvalidConfig.into());
        }

        let config = RaffleConfig {
            entrance_fee,
            interval,
            coordinator: *coordinator_info.key,
            key_hash,
            subscription_id,
            callback_compute_limit,
            request_confirmations,
        };
        config.validate()?;

        let now = Clock::get()?.unix_timestamp;
        let raffle = Raffle::new(*authority_info.key, config, now);
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: fee={} lamports ({} SOL) interval={}s coordinator={}",
            entrance_fee,
            utils::lamports_to_sol(entrance_fee),
            interval,
            coordinator_info.key
        );
        Ok(())
    }

    fn process_enter_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Raffle::unpack(&raffle_info.data.borrow())?;
        raffle.enter(*player_info.key, amount)?;

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, amount),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        let players = raffle.num_players();
        let pool_balance = raffle.pool_balance;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        msg!(
            "Player {} entered with {} lamports; players={} pool={}",
            player_info.key,
            amount,
            players,
            pool_balance
        );
        events::emit(&EnteredRaffle {
            raffle: *raffle_info.key,
            player: *player_info.key,
            amount,
        })
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let raffle = Raffle::unpack(&raffle_info.data.borrow())?;

        let snapshot = raffle.upkeep_snapshot(Clock::get()?.unix_timestamp);
        let upkeep_needed = snapshot.is_needed();
        msg!("Upkeep needed: {} ({})", upkeep_needed, snapshot);
        set_return_data(&[upkeep_needed as u8]);
        Ok(())
    }

    fn process_perform_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let coordinator_state_info = next_account_info(account_info_iter)?;

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let mut raffle = Raffle::unpack(&raffle_info.data.borrow())?;

        if *coordinator_program_info.key != raffle.config.coordinator {
            msg!("Coordinator {} is not the configured one", coordinator_program_info.key);
            return Err(ProgramError::IncorrectProgramId);
        }

        let now = Clock::get()?.unix_timestamp;
        let mut coordinator = CoordinatorClient {
            coordinator_program: coordinator_program_info,
            coordinator_state: coordinator_state_info,
            consumer: raffle_info,
        };
        let request_id = raffle.perform_upkeep(now, &mut coordinator)?;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        msg!("Requested raffle winner, request id {}", request_id);
        events::emit(&RequestedRaffleWinner {
            raffle: *raffle_info.key,
            request_id,
        })
    }

    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let mut raffle = Raffle::unpack(&raffle_info.data.borrow())?;

        let (expected_authority, _) = vrf::coordinator_authority(&raffle.config.coordinator);
        if !authority_info.is_signer || *authority_info.key != expected_authority {
            msg!("Only the coordinator can fulfill random words");
            return Err(RaffleError::UnauthorizedFulfiller.into());
        }

        let amount = raffle.pool_balance;
        let now = Clock::get()?.unix_timestamp;
        let winner = raffle.fulfill_random_words(
            request_id,
            random_words,
            now,
            &mut LamportPayout {
                pool: raffle_info,
                winner: winner_info,
            },
        )?;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        msg!(
            "Winner picked: {} receives {} lamports ({} SOL)",
            winner,
            amount,
            utils::lamports_to_sol(amount)
        );
        events::emit(&WinnerPicked {
            raffle: *raffle_info.key,
            winner,
            amount,
        })
    }
}

/// Moves the prize out of the program owned raffle account
struct LamportPayout<'a, 'b> {
    pool: &'a AccountInfo<'b>,
    winner: &'a AccountInfo<'b>,
}

impl<'a, 'b> PrizePayout for LamportPayout<'a, 'b> {
    fn pay(&mut self, winner: &Pubkey, amount: u64) -> ProgramResult {
        if self.winner.key != winner {
            msg!("Drawn winner {} but account {} was supplied", winner, self.winner.key);
            return Err(RaffleError::WinnerAccountMismatch.into());
        }
        if !self.winner.is_writable || self.winner.executable {
            msg!("Winner account {} cannot receive lamports", self.winner.key);
            return Err(RaffleError::TransferFailed.into());
        }

        let pool_lamports = self
            .pool
            .lamports()
            .checked_sub(amount)
            .ok_or(RaffleError::TransferFailed)?;
        let winner_lamports = self
            .winner
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::TransferFailed)?;
        if !Rent::get()?.is_exempt(winner_lamports, self.winner.data_len()) {
            msg!(
                "Winner account {} would hold {} lamports, below rent exemption",
                self.winner.key,
                winner_lamports
            );
            return Err(RaffleError::TransferFailed.into());
        }

        **self.pool.try_borrow_mut_lamports()? = pool_lamports;
        **self.winner.try_borrow_mut_lamports()? = winner_lamports;
        Ok(())
    }
}

use crate::{
    error::CoordinatorError,
    instruction::CoordinatorInstruction,
    state::{derive_words, Coordinator},
};
use keeper_raffle::vrf::{self, RandomnessRequest, COORDINATOR_AUTHORITY_SEED};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    instruction::AccountMeta,
    msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
};

pub fn process(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    match CoordinatorInstruction::unpack(instruction_data)? {
        CoordinatorInstruction::InitializeCoordinator => {
            msg!("Instruction: Initialize Coordinator");
            process_initialize(program_id, accounts)
        }
        CoordinatorInstruction::RequestRandomWords(request) => {
            msg!("Instruction: Request Random Words");
            process_request(program_id, accounts, request)
        }
        CoordinatorInstruction::FulfillRandomWords {
            request_id,
            override_words,
        } => {
            msg!("Instruction: Fulfill Random Words");
            process_fulfill(program_id, accounts, request_id, override_words)
        }
    }
}

fn process_initialize(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let state_info = next_account_info(account_info_iter)?;

    if state_info.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }
    if Coordinator::unpack_unchecked(&state_info.data.borrow())?.is_initialized {
        return Err(ProgramError::AccountAlreadyInitialized);
    }

    Coordinator::pack(Coordinator::new(), &mut state_info.data.borrow_mut())?;
    msg!("Coordinator initialized: {}", state_info.key);
    Ok(())
}

fn process_request(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    request: RandomnessRequest,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let state_info = next_account_info(account_info_iter)?;
    let consumer_info = next_account_info(account_info_iter)?;

    if state_info.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }
    let mut coordinator = Coordinator::unpack(&state_info.data.borrow())?;

    let request_id = coordinator.record(*consumer_info.owner, *consumer_info.key, request)?;
    Coordinator::pack(coordinator, &mut state_info.data.borrow_mut())?;

    set_return_data(&request_id.to_le_bytes());
    msg!(
        "Random words requested: id={} consumer={} words={} confirmations={} compute_limit={}",
        request_id,
        consumer_info.key,
        request.num_words,
        request.request_confirmations,
        request.callback_compute_limit
    );
    Ok(())
}

fn process_fulfill(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    request_id: u64,
    override_words: Option<Vec<u64>>,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let fulfiller_info = next_account_info(account_info_iter)?;
    let state_info = next_account_info(account_info_iter)?;
    let authority_info = next_account_info(account_info_iter)?;
    let consumer_program_info = next_account_info(account_info_iter)?;
    let consumer_info = next_account_info(account_info_iter)?;
    let forwarded: Vec<AccountInfo> = account_info_iter.cloned().collect();

    if !fulfiller_info.is_signer {
        msg!("Fulfiller must sign the transaction");
        return Err(ProgramError::MissingRequiredSignature);
    }
    if state_info.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }
    let (authority, bump_seed) = vrf::coordinator_authority(program_id);
    if *authority_info.key != authority {
        return Err(CoordinatorError::InvalidAuthority.into());
    }

    let mut coordinator = Coordinator::unpack(&state_info.data.borrow())?;
    let request = coordinator.take(request_id)?;
    if request.consumer_program != *consumer_program_info.key || request.consumer != *consumer_info.key {
        msg!("Request {} belongs to consumer {}", request_id, request.consumer);
        return Err(CoordinatorError::ConsumerMismatch.into());
    }
    Coordinator::pack(coordinator, &mut state_info.data.borrow_mut())?;

    let random_words =
        override_words.unwrap_or_else(|| derive_words(request_id, request.params.num_words));
    let callback = vrf::fulfill_random_words(
        consumer_program_info.key,
        authority_info.key,
        consumer_info.key,
        request_id,
        &random_words,
        &forwarded_metas(&forwarded),
    );

    let mut callback_accounts = vec![authority_info.clone(), consumer_info.clone()];
    callback_accounts.extend(forwarded);
    callback_accounts.push(consumer_program_info.clone());

    invoke_signed(
        &callback,
        &callback_accounts,
        &[&[COORDINATOR_AUTHORITY_SEED, &[bump_seed]]],
    )?;

    msg!("Random words fulfilled: id={} consumer={}", request_id, consumer_info.key);
    Ok(())
}

fn forwarded_metas(accounts: &[AccountInfo]) -> Vec<AccountMeta> {
    accounts
        .iter()
        .map(|acc| AccountMeta {
            pubkey: *acc.key,
            is_signer: acc.is_signer,
            is_writable: acc.is_writable,
        })
        .collect()
}

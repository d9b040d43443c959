use borsh::BorshDeserialize;
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    instruction::AccountMeta,
    program_pack::Pack,
    program_stubs::{self, SyscallStubs},
};
use solana_program_test::*;
use solana_sdk::{
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    sysvar::clock::Clock,
    transaction::{Transaction, TransactionError},
};
use std::sync::{Arc, Mutex, Once, RwLock};

use keeper_raffle::{
    error::RaffleError,
    events::{self, EnteredRaffle, Event, RequestedRaffleWinner, WinnerPicked},
    instruction, process_instruction,
    state::{Raffle, RaffleConfig, RaffleStatus},
    vrf,
};
use vrf_coordinator_mock::{
    error::CoordinatorError, instruction as coordinator_instruction, state::Coordinator,
};

const PLAYER_FUNDS: u64 = 1_000_000_000;

struct Deployment {
    program_id: Pubkey,
    coordinator_id: Pubkey,
    coordinator_state: Pubkey,
    raffle: Pubkey,
    config: RaffleConfig,
}

// Every `sol_log_data` call made by a program in this test binary
static EMITTED: Mutex<Vec<Vec<Vec<u8>>>> = Mutex::new(Vec::new());

// Native programs send event data to stdout instead of the transaction logs,
// so the stubs installed by program-test are wrapped to keep a copy of it
struct EventRecorder {
    inner: Arc<RwLock<Option<Box<dyn SyscallStubs>>>>,
}

impl EventRecorder {
    fn delegate<R>(&self, call: impl FnOnce(&dyn SyscallStubs) -> R) -> R {
        let inner = self.inner.read().unwrap();
        call(inner.as_deref().unwrap())
    }
}

impl SyscallStubs for EventRecorder {
    fn sol_log(&self, message: &str) {
        self.delegate(|stubs| stubs.sol_log(message))
    }
    fn sol_log_compute_units(&self) {
        self.delegate(|stubs| stubs.sol_log_compute_units())
    }
    fn sol_invoke_signed(
        &self,
        instruction: &Instruction,
        account_infos: &[AccountInfo],
        signers_seeds: &[&[&[u8]]],
    ) -> ProgramResult {
        self.delegate(|stubs| stubs.sol_invoke_signed(instruction, account_infos, signers_seeds))
    }
    fn sol_get_clock_sysvar(&self, var_addr: *mut u8) -> u64 {
        self.delegate(|stubs| stubs.sol_get_clock_sysvar(var_addr))
    }
    fn sol_get_epoch_schedule_sysvar(&self, var_addr: *mut u8) -> u64 {
        self.delegate(|stubs| stubs.sol_get_epoch_schedule_sysvar(var_addr))
    }
    fn sol_get_fees_sysvar(&self, var_addr: *mut u8) -> u64 {
        self.delegate(|stubs| stubs.sol_get_fees_sysvar(var_addr))
    }
    fn sol_get_rent_sysvar(&self, var_addr: *mut u8) -> u64 {
        self.delegate(|stubs| stubs.sol_get_rent_sysvar(var_addr))
    }
    fn sol_get_return_data(&self) -> Option<(Pubkey, Vec<u8>)> {
        self.delegate(|stubs| stubs.sol_get_return_data())
    }
    fn sol_set_return_data(&self, data: &[u8]) {
        self.delegate(|stubs| stubs.sol_set_return_data(data))
    }
    fn sol_log_data(&self, fields: &[&[u8]]) {
        EMITTED
            .lock()
            .unwrap()
            .push(fields.iter().map(|field| field.to_vec()).collect());
        self.delegate(|stubs| stubs.sol_log_data(fields))
    }
    fn sol_get_processed_sibling_instruction(&self, index: usize) -> Option<Instruction> {
        self.delegate(|stubs| stubs.sol_get_processed_sibling_instruction(index))
    }
    fn sol_get_stack_height(&self) -> u64 {
        self.delegate(|stubs| stubs.sol_get_stack_height())
    }
}

// Must run after program-test installed its stubs and before any program executes.
// The slot stays write-locked until the wrapped stubs are in place.
fn record_events() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let inner = Arc::new(RwLock::new(None));
        let mut slot = inner.write().unwrap();
        let recorder = EventRecorder {
            inner: Arc::clone(&inner),
        };
        *slot = Some(program_stubs::set_syscall_stubs(Box::new(recorder)));
    });
}

// Decode the recorded events of one type, keeping those `belongs` accepts
fn emitted<E: Event + BorshDeserialize>(belongs: impl Fn(&E) -> bool) -> Vec<E> {
    EMITTED
        .lock()
        .unwrap()
        .iter()
        .filter_map(|fields| {
            let fields: Vec<&[u8]> = fields.iter().map(Vec::as_slice).collect();
            events::decode::<E>(&fields)
        })
        .filter(|event| belongs(event))
        .collect()
}

// Setup program test with the raffle and a local coordinator
async fn setup() -> (ProgramTestContext, Pubkey, Pubkey) {
    let program_id = Pubkey::new_unique();
    let coordinator_id = Pubkey::new_unique();

    let mut program_test = ProgramTest::new(
        "keeper_raffle",
        program_id,
        processor!(process_instruction),
    );
    program_test.add_program(
        "vrf_coordinator_mock",
        coordinator_id,
        processor!(vrf_coordinator_mock::process_instruction),
    );

    let context = program_test.start_with_context().await;
    record_events();
    (context, program_id, coordinator_id)
}

async fn send(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    context.last_blockhash = context
        .banks_client
        .get_new_latest_blockhash(&context.last_blockhash)
        .await
        .unwrap();
    let blockhash = context.last_blockhash;
    let mut all_signers = vec![&context.payer];
    all_signers.extend_from_slice(signers);

    let transaction = Transaction::new_signed_with_payer(
        instructions,
        Some(&context.payer.pubkey()),
        &all_signers,
        blockhash,
    );
    context.banks_client.process_transaction(transaction).await
}

fn assert_custom_error(result: Result<(), BanksClientError>, code: u32) {
    assert_eq!(
        result.unwrap_err().unwrap(),
        TransactionError::InstructionError(0, InstructionError::Custom(code))
    );
}

fn assert_raffle_error(result: Result<(), BanksClientError>, error: RaffleError) {
    assert_custom_error(result, error as u32);
}

async fn create_program_account(
    context: &mut ProgramTestContext,
    owner: &Pubkey,
    space: usize,
) -> Keypair {
    let account = Keypair::new();
    let rent = context.banks_client.get_rent().await.unwrap();
    let payer = context.payer.pubkey();

    send(
        context,
        &[system_instruction::create_account(
            &payer,
            &account.pubkey(),
            rent.minimum_balance(space),
            space as u64,
            owner,
        )],
        &[&account],
    )
    .await
    .unwrap();
    account
}

// Deploy the local coordinator and its state account
async fn deploy_mocks(context: &mut ProgramTestContext, coordinator_id: &Pubkey) -> Pubkey {
    let state = create_program_account(context, coordinator_id, Coordinator::LEN).await;
    send(
        context,
        &[coordinator_instruction::initialize_coordinator(coordinator_id, &state.pubkey())],
        &[],
    )
    .await
    .unwrap();
    state.pubkey()
}

async fn deploy_raffle() -> (ProgramTestContext, Deployment) {
    deploy_raffle_with(|config| config).await
}

async fn deploy_raffle_with(
    configure: impl FnOnce(RaffleConfig) -> RaffleConfig,
) -> (ProgramTestContext, Deployment) {
    let (mut context, program_id, coordinator_id) = setup().await;
    let coordinator_state = deploy_mocks(&mut context, &coordinator_id).await;

    let raffle = create_program_account(&mut context, &program_id, Raffle::LEN).await;
    let config = configure(RaffleConfig {
        key_hash: [3u8; 32],
        ..RaffleConfig::development(coordinator_id)
    });
    let authority = context.payer.pubkey();
    send(
        &mut context,
        &[instruction::initialize_raffle(
            &program_id,
            &authority,
            &raffle.pubkey(),
            &config,
        )],
        &[],
    )
    .await
    .unwrap();

    let deployment = Deployment {
        program_id,
        coordinator_id,
        coordinator_state,
        raffle: raffle.pubkey(),
        config,
    };
    (context, deployment)
}

async fn funded_player(context: &mut ProgramTestContext) -> Keypair {
    let player = Keypair::new();
    let payer = context.payer.pubkey();
    send(
        context,
        &[system_instruction::transfer(&payer, &player.pubkey(), PLAYER_FUNDS)],
        &[],
    )
    .await
    .unwrap();
    player
}

async fn enter(
    context: &mut ProgramTestContext,
    deployment: &Deployment,
    player: &Keypair,
    amount: u64,
) -> Result<(), BanksClientError> {
    send(
        context,
        &[instruction::enter_raffle(
            &deployment.program_id,
            &player.pubkey(),
            &deployment.raffle,
            amount,
        )],
        &[player],
    )
    .await
}

async fn perform_upkeep(
    context: &mut ProgramTestContext,
    deployment: &Deployment,
) -> Result<(), BanksClientError> {
    send(
        context,
        &[instruction::perform_upkeep(
            &deployment.program_id,
            &deployment.raffle,
            &deployment.coordinator_id,
            &deployment.coordinator_state,
        )],
        &[],
    )
    .await
}

async fn fulfill(
    context: &mut ProgramTestContext,
    deployment: &Deployment,
    request_id: u64,
    override_words: Option<Vec<u64>>,
    winner: AccountMeta,
) -> Result<(), BanksClientError> {
    let fulfiller = context.payer.pubkey();
    send(
        context,
        &[coordinator_instruction::fulfill_random_words(
            &deployment.coordinator_id,
            &fulfiller,
            &deployment.coordinator_state,
            &deployment.program_id,
            &deployment.raffle,
            request_id,
            override_words,
            &[winner],
        )],
        &[],
    )
    .await
}

// Simulate check_upkeep and read the answer back from the return data
async fn upkeep_needed(context: &mut ProgramTestContext, deployment: &Deployment) -> bool {
    context.last_blockhash = context
        .banks_client
        .get_new_latest_blockhash(&context.last_blockhash)
        .await
        .unwrap();
    let blockhash = context.last_blockhash;
    let transaction = Transaction::new_signed_with_payer(
        &[instruction::check_upkeep(&deployment.program_id, &deployment.raffle)],
        Some(&context.payer.pubkey()),
        &[&context.payer],
        blockhash,
    );
    let simulation = context
        .banks_client
        .simulate_transaction(transaction)
        .await
        .unwrap();
    assert_eq!(simulation.result, Some(Ok(())));

    // The bank trims trailing zero bytes, so `[0]` comes back as no return data
    match simulation.simulation_details.unwrap().return_data {
        None => false,
        Some(return_data) => {
            assert_eq!(return_data.program_id, deployment.program_id);
            assert_eq!(return_data.data, vec![1]);
            true
        }
    }
}

async fn warp_seconds(context: &mut ProgramTestContext, seconds: i64) {
    let mut clock = context.banks_client.get_sysvar::<Clock>().await.unwrap();
    clock.unix_timestamp += seconds;
    context.set_sysvar(&clock);
}

async fn raffle_state(context: &mut ProgramTestContext, deployment: &Deployment) -> Raffle {
    let account = context
        .banks_client
        .get_account(deployment.raffle)
        .await
        .unwrap()
        .unwrap();
    Raffle::unpack(&account.data).unwrap()
}

async fn balance(context: &mut ProgramTestContext, account: Pubkey) -> u64 {
    context.banks_client.get_balance(account).await.unwrap()
}

// Enter every player, let the interval pass and perform upkeep; returns the request id
async fn start_drawing(
    context: &mut ProgramTestContext,
    deployment: &Deployment,
    players: &[&Keypair],
) -> u64 {
    for player in players {
        enter(context, deployment, player, deployment.config.entrance_fee)
            .await
            .unwrap();
    }
    warp_seconds(context, deployment.config.interval as i64 + 1).await;
    perform_upkeep(context, deployment).await.unwrap();

    raffle_state(context, deployment)
        .await
        .pending_request
        .unwrap()
}

#[tokio::test]
async fn test_initializes_open_with_config() {
    let (mut context, deployment) = deploy_raffle().await;
    let raffle = raffle_state(&mut context, &deployment).await;

    assert!(raffle.is_initialized);
    assert_eq!(raffle.status, RaffleStatus::Open);
    assert_eq!(raffle.entrance_fee(), deployment.config.entrance_fee);
    assert_eq!(raffle.interval(), deployment.config.interval);
    assert_eq!(raffle.num_players(), 0);
    assert_eq!(raffle.num_words(), 1);
    assert_eq!(raffle.request_confirmations(), 3);
    assert_eq!(raffle.recent_winner, Pubkey::default());
    assert_eq!(raffle.config.coordinator, deployment.coordinator_id);
}

#[tokio::test]
async fn test_initialize_twice_fails() {
    let (mut context, deployment) = deploy_raffle().await;
    let authority = context.payer.pubkey();

    let result = send(
        &mut context,
        &[instruction::initialize_raffle(
            &deployment.program_id,
            &authority,
            &deployment.raffle,
            &deployment.config,
        )],
        &[],
    )
    .await;
    assert_eq!(
        result.unwrap_err().unwrap(),
        TransactionError::InstructionError(0, InstructionError::AccountAlreadyInitialized)
    );
}

#[tokio::test]
async fn test_initialize_rejects_a_coordinator_that_is_not_a_program() {
    let (mut context, program_id, _) = setup().await;
    let raffle = create_program_account(&mut context, &program_id, Raffle::LEN).await;
    let config = RaffleConfig::development(Keypair::new().pubkey());
    let authority = context.payer.pubkey();

    let result = send(
        &mut context,
        &[instruction::initialize_raffle(
            &program_id,
            &authority,
            &raffle.pubkey(),
            &config,
        )],
        &[],
    )
    .await;
    assert_raffle_error(result, RaffleError::InvalidConfig);

    let account = context
        .banks_client
        .get_account(raffle.pubkey())
        .await
        .unwrap()
        .unwrap();
    assert!(!Raffle::unpack_unchecked(&account.data).unwrap().is_initialized);
}

#[tokio::test]
async fn test_enter_reverts_when_not_paying_enough() {
    let (mut context, deployment) = deploy_raffle().await;
    let player = funded_player(&mut context).await;

    let result = enter(
        &mut context,
        &deployment,
        &player,
        deployment.config.entrance_fee - 1,
    )
    .await;
    assert_raffle_error(result, RaffleError::NotEnoughEntered);
    assert_eq!(balance(&mut context, player.pubkey()).await, PLAYER_FUNDS);
}

#[tokio::test]
async fn test_enter_records_players() {
    let (mut context, deployment) = deploy_raffle().await;
    let player = funded_player(&mut context).await;
    let pool_before = balance(&mut context, deployment.raffle).await;

    enter(&mut context, &deployment, &player, deployment.config.entrance_fee)
        .await
        .unwrap();

    let raffle = raffle_state(&mut context, &deployment).await;
    assert_eq!(raffle.player(0).unwrap(), player.pubkey());
    assert_eq!(raffle.pool_balance, deployment.config.entrance_fee);
    assert_eq!(
        balance(&mut context, deployment.raffle).await,
        pool_before + deployment.config.entrance_fee
    );
    assert_eq!(
        balance(&mut context, player.pubkey()).await,
        PLAYER_FUNDS - deployment.config.entrance_fee
    );
}

#[tokio::test]
async fn test_no_entry_while_calculating() {
    let (mut context, deployment) = deploy_raffle().await;
    let player = funded_player(&mut context).await;
    start_drawing(&mut context, &deployment, &[&player]).await;

    let result = enter(&mut context, &deployment, &player, deployment.config.entrance_fee).await;
    assert_raffle_error(result, RaffleError::NotOpen);
}

#[tokio::test]
async fn test_check_upkeep_reports_eligibility() {
    let (mut context, deployment) = deploy_raffle().await;
    assert!(!upkeep_needed(&mut context, &deployment).await);

    let player = funded_player(&mut context).await;
    enter(&mut context, &deployment, &player, deployment.config.entrance_fee)
        .await
        .unwrap();
    assert!(!upkeep_needed(&mut context, &deployment).await);

    warp_seconds(&mut context, deployment.config.interval as i64 + 1).await;
    assert!(upkeep_needed(&mut context, &deployment).await);

    perform_upkeep(&mut context, &deployment).await.unwrap();
    assert!(!upkeep_needed(&mut context, &deployment).await);
}

#[tokio::test]
async fn test_events_trace_a_full_cycle() {
    let (mut context, deployment) = deploy_raffle().await;
    let first = funded_player(&mut context).await;
    let second = funded_player(&mut context).await;
    let request_id = start_drawing(&mut context, &deployment, &[&first, &second]).await;
    let fee = deployment.config.entrance_fee;

    assert_eq!(
        emitted::<EnteredRaffle>(|event| event.raffle == deployment.raffle),
        vec![
            EnteredRaffle {
                raffle: deployment.raffle,
                player: first.pubkey(),
                amount: fee,
            },
            EnteredRaffle {
                raffle: deployment.raffle,
                player: second.pubkey(),
                amount: fee,
            },
        ]
    );
    assert!(request_id > 0);
    assert_eq!(
        emitted::<RequestedRaffleWinner>(|event| event.raffle == deployment.raffle),
        vec![RequestedRaffleWinner {
            raffle: deployment.raffle,
            request_id,
        }]
    );
    assert!(emitted::<WinnerPicked>(|event| event.raffle == deployment.raffle).is_empty());

    // 1 % 2 picks the second entrant
    fulfill(
        &mut context,
        &deployment,
        request_id,
        Some(vec![1]),
        AccountMeta::new(second.pubkey(), false),
    )
    .await
    .unwrap();
    assert_eq!(
        emitted::<WinnerPicked>(|event| event.raffle == deployment.raffle),
        vec![WinnerPicked {
            raffle: deployment.raffle,
            winner: second.pubkey(),
            amount: fee * 2,
        }]
    );
}

#[tokio::test]
async fn test_perform_upkeep_fails_without_players() {
    let (mut context, deployment) = deploy_raffle().await;
    warp_seconds(&mut context, deployment.config.interval as i64 + 1).await;

    let result = perform_upkeep(&mut context, &deployment).await;
    assert_raffle_error(result, RaffleError::UpkeepNotNeeded);
}

#[tokio::test]
async fn test_perform_upkeep_fails_before_interval() {
    let (mut context, deployment) = deploy_raffle().await;
    let player = funded_player(&mut context).await;
    enter(&mut context, &deployment, &player, deployment.config.entrance_fee)
        .await
        .unwrap();

    let result = perform_upkeep(&mut context, &deployment).await;
    assert_raffle_error(result, RaffleError::UpkeepNotNeeded);
    assert_eq!(
        raffle_state(&mut context, &deployment).await.status,
        RaffleStatus::Open
    );
}

#[tokio::test]
async fn test_perform_upkeep_requests_a_winner() {
    let (mut context, deployment) = deploy_raffle().await;
    let player = funded_player(&mut context).await;
    let request_id = start_drawing(&mut context, &deployment, &[&player]).await;
    assert!(request_id > 0);

    let raffle = raffle_state(&mut context, &deployment).await;
    assert_eq!(raffle.status, RaffleStatus::Calculating);

    let state = context
        .banks_client
        .get_account(deployment.coordinator_state)
        .await
        .unwrap()
        .unwrap();
    let coordinator = Coordinator::unpack(&state.data).unwrap();
    let request = coordinator.request(request_id).unwrap();
    assert_eq!(request.consumer, deployment.raffle);
    assert_eq!(request.consumer_program, deployment.program_id);
    assert_eq!(request.params, raffle.randomness_request());

    // Calculating blocks a second draw
    let result = perform_upkeep(&mut context, &deployment).await;
    assert_raffle_error(result, RaffleError::UpkeepNotNeeded);
}

#[tokio::test]
async fn test_fulfill_only_after_perform_upkeep() {
    let (mut context, deployment) = deploy_raffle().await;
    let player = funded_player(&mut context).await;
    enter(&mut context, &deployment, &player, deployment.config.entrance_fee)
        .await
        .unwrap();

    for request_id in [0, 1] {
        let result = fulfill(
            &mut context,
            &deployment,
            request_id,
            None,
            AccountMeta::new(player.pubkey(), false),
        )
        .await;
        assert_custom_error(result, CoordinatorError::NonexistentRequest as u32);
    }
}

#[tokio::test]
async fn test_fulfill_picks_winner_resets_and_pays() {
    let (mut context, deployment) = deploy_raffle().await;
    let mut players = Vec::new();
    for _ in 0..4 {
        players.push(funded_player(&mut context).await);
    }
    let refs: Vec<&Keypair> = players.iter().collect();
    let started = raffle_state(&mut context, &deployment).await.last_timestamp;
    let request_id = start_drawing(&mut context, &deployment, &refs).await;

    // 6 % 4 picks the third entrant
    let winner = &players[2];
    let mut before = Vec::new();
    for player in &players {
        before.push(balance(&mut context, player.pubkey()).await);
    }
    let pool = deployment.config.entrance_fee * 4;

    fulfill(
        &mut context,
        &deployment,
        request_id,
        Some(vec![6]),
        AccountMeta::new(winner.pubkey(), false),
    )
    .await
    .unwrap();

    let raffle = raffle_state(&mut context, &deployment).await;
    assert_eq!(raffle.recent_winner, winner.pubkey());
    assert_eq!(raffle.status, RaffleStatus::Open);
    assert_eq!(raffle.num_players(), 0);
    assert_eq!(raffle.pool_balance, 0);
    assert_eq!(raffle.pending_request, None);
    assert!(raffle.last_timestamp > started);

    for (i, player) in players.iter().enumerate() {
        let expected = if i == 2 { before[i] + pool } else { before[i] };
        assert_eq!(balance(&mut context, player.pubkey()).await, expected);
    }

    // Answered requests are gone
    let result = fulfill(
        &mut context,
        &deployment,
        request_id,
        Some(vec![6]),
        AccountMeta::new(winner.pubkey(), false),
    )
    .await;
    assert_custom_error(result, CoordinatorError::NonexistentRequest as u32);
}

#[tokio::test]
async fn test_fulfill_with_derived_words_starts_next_cycle() {
    let (mut context, deployment) = deploy_raffle().await;
    let player = funded_player(&mut context).await;
    let request_id = start_drawing(&mut context, &deployment, &[&player]).await;

    fulfill(
        &mut context,
        &deployment,
        request_id,
        None,
        AccountMeta::new(player.pubkey(), false),
    )
    .await
    .unwrap();
    assert_eq!(
        raffle_state(&mut context, &deployment).await.recent_winner,
        player.pubkey()
    );

    let next_id = start_drawing(&mut context, &deployment, &[&player]).await;
    assert!(next_id > request_id);
}

#[tokio::test]
async fn test_forged_fulfillment_is_rejected() {
    let (mut context, deployment) = deploy_raffle().await;
    let player = funded_player(&mut context).await;
    let request_id = start_drawing(&mut context, &deployment, &[&player]).await;

    let forger = Keypair::new();
    let result = send(
        &mut context,
        &[instruction::fulfill_random_words(
            &deployment.program_id,
            &forger.pubkey(),
            &deployment.raffle,
            &player.pubkey(),
            request_id,
            &[0],
        )],
        &[&forger],
    )
    .await;
    assert_raffle_error(result, RaffleError::UnauthorizedFulfiller);

    let (authority, _) = vrf::coordinator_authority(&deployment.coordinator_id);
    assert_ne!(authority, forger.pubkey());
    assert_eq!(
        raffle_state(&mut context, &deployment).await.status,
        RaffleStatus::Calculating
    );
}

#[tokio::test]
async fn test_failed_payout_leaves_raffle_untouched() {
    let (mut context, deployment) = deploy_raffle().await;
    let player = funded_player(&mut context).await;
    let request_id = start_drawing(&mut context, &deployment, &[&player]).await;
    let before = raffle_state(&mut context, &deployment).await;
    let pool_lamports = balance(&mut context, deployment.raffle).await;

    let result = fulfill(
        &mut context,
        &deployment,
        request_id,
        Some(vec![0]),
        AccountMeta::new_readonly(player.pubkey(), false),
    )
    .await;
    assert_raffle_error(result, RaffleError::TransferFailed);
    assert_eq!(raffle_state(&mut context, &deployment).await, before);
    assert_eq!(balance(&mut context, deployment.raffle).await, pool_lamports);
    assert!(emitted::<WinnerPicked>(|event| event.raffle == deployment.raffle).is_empty());

    // The request is still pending and can be answered again
    fulfill(
        &mut context,
        &deployment,
        request_id,
        Some(vec![0]),
        AccountMeta::new(player.pubkey(), false),
    )
    .await
    .unwrap();
    assert_eq!(
        raffle_state(&mut context, &deployment).await.recent_winner,
        player.pubkey()
    );
    assert_eq!(
        emitted::<WinnerPicked>(|event| event.raffle == deployment.raffle).len(),
        1
    );
}

#[tokio::test]
async fn test_payout_below_rent_exemption_fails_until_the_winner_is_funded() {
    let (mut context, deployment) = deploy_raffle_with(|config| RaffleConfig {
        entrance_fee: 1_000,
        ..config
    })
    .await;
    let player = funded_player(&mut context).await;
    enter(&mut context, &deployment, &player, 1_000).await.unwrap();

    // The player empties their account after entering
    let payer = context.payer.pubkey();
    let remaining = balance(&mut context, player.pubkey()).await;
    send(
        &mut context,
        &[system_instruction::transfer(&player.pubkey(), &payer, remaining)],
        &[&player],
    )
    .await
    .unwrap();
    let request_id = start_drawing(&mut context, &deployment, &[]).await;
    let before = raffle_state(&mut context, &deployment).await;

    let result = fulfill(
        &mut context,
        &deployment,
        request_id,
        Some(vec![0]),
        AccountMeta::new(player.pubkey(), false),
    )
    .await;
    assert_raffle_error(result, RaffleError::TransferFailed);
    assert_eq!(raffle_state(&mut context, &deployment).await, before);
    assert_eq!(balance(&mut context, player.pubkey()).await, 0);

    let minimum = context
        .banks_client
        .get_rent()
        .await
        .unwrap()
        .minimum_balance(0);
    send(
        &mut context,
        &[system_instruction::transfer(&payer, &player.pubkey(), minimum)],
        &[],
    )
    .await
    .unwrap();

    fulfill(
        &mut context,
        &deployment,
        request_id,
        Some(vec![0]),
        AccountMeta::new(player.pubkey(), false),
    )
    .await
    .unwrap();
    assert_eq!(balance(&mut context, player.pubkey()).await, minimum + 1_000);
    assert_eq!(
        raffle_state(&mut context, &deployment).await.status,
        RaffleStatus::Open
    );
}

#[tokio::test]
async fn test_fulfill_requires_the_drawn_winner_account() {
    let (mut context, deployment) = deploy_raffle().await;
    let first = funded_player(&mut context).await;
    let second = funded_player(&mut context).await;
    let request_id = start_drawing(&mut context, &deployment, &[&first, &second]).await;

    // 1 % 2 picks the second entrant
    let result = fulfill(
        &mut context,
        &deployment,
        request_id,
        Some(vec![1]),
        AccountMeta::new(first.pubkey(), false),
    )
    .await;
    assert_raffle_error(result, RaffleError::WinnerAccountMismatch);
}

use kaia_reward::{MemoryGovModule, ParamSet, ProposerPolicy, RewardEngine, RewardError, RewardSummary, RewardSummarySource};
use kaia_staking::MemoryStakingModule;
use kaia_storage::{MemoryStorage, SupplyCheckpoint, SupplyStore};
use kaia_supply::*;
use kaia_types::*;
use std::sync::Arc;
use std::time::Duration;

const GENESIS_SUPPLY: Kei = 10_000_000_000 * KEI_PER_KAIA;

fn root_of(num: u64) -> Hash {
    Hash::from_low_u64(1_000_000 + num)
}

fn header(num: u64, branch: u64) -> Header {
    Header {
        hash: Hash::from_low_u64(num * 10 + branch + 1),
        number: num,
        root: root_of(num),
        gas_used: 21_000 * (num % 5 + branch),
        base_fee: Some(25_000_000_000),
        rewardbase: Address::from_low_u8(1),
        time: 1_600_000_000 + num,
        ..Default::default()
    }
}

fn chain_config() -> ChainConfig {
    ChainConfig {
        magma_compatible_block: Some(100),
        kore_compatible_block: Some(200),
        kip103: RebalanceConfig {
            compatible_block: Some(150),
            contract: Some(Address::from_low_u8(0x03)),
        },
        kip160: RebalanceConfig {
            compatible_block: Some(10_000),
            contract: Some(Address::from_low_u8(0x60)),
        },
        ..Default::default()
    }
}

fn build_chain(config: ChainConfig, head: u64) -> Arc<MemoryChain> {
    let chain = Arc::new(MemoryChain::new(config));
    chain.insert_state(
        root_of(0),
        MemoryState::new([
            (Address::from_low_u8(0xaa), GENESIS_SUPPLY - 5),
            (Address::DEAD, 5),
        ]),
    );
    extend(&chain, 0, head, 0);
    chain
}

fn extend(chain: &MemoryChain, from: u64, to: u64, branch: u64) {
    for num in from..=to {
        chain.insert_block(Block::new(header(num, branch), vec![]), vec![]);
    }
}

fn engine(chain: Arc<MemoryChain>) -> Arc<RewardEngine> {
    Arc::new(RewardEngine::new(
        chain,
        Arc::new(MemoryGovModule::new(ParamSet {
            proposer_policy: ProposerPolicy::RoundRobin,
            ..Default::default()
        })),
        Arc::new(MemoryStakingModule::new()),
    ))
}

struct Harness {
    chain: Arc<MemoryChain>,
    engine: Arc<RewardEngine>,
    store: Arc<MemoryStorage>,
    caller: Arc<MemoryContractCaller>,
    manager: SupplyManager,
}

impl Harness {
    fn new(head: u64) -> Self {
        let chain = build_chain(chain_config(), head);
        let store = Arc::new(MemoryStorage::new());
        Self::with_store(chain, store)
    }

    fn with_store(chain: Arc<MemoryChain>, store: Arc<MemoryStorage>) -> Self {
        let engine = engine(chain.clone());
        let caller = Arc::new(MemoryContractCaller::new());
        let manager = SupplyManager::new(
            chain.clone(),
            engine.clone(),
            store.clone(),
            caller.clone(),
            SupplyConfig::default(),
        )
        .unwrap();
        Self {
            chain,
            engine,
            store,
            caller,
            manager,
        }
    }

    fn expected(&self, num: u64) -> SupplyCheckpoint {
        let mut checkpoint = SupplyCheckpoint::new(GENESIS_SUPPLY, 0);
        for n in 1..=num {
            let summary = self.engine.reward_summary(n).unwrap();
            checkpoint = accumulate_checkpoint(&checkpoint, &summary).unwrap();
        }
        checkpoint
    }
}

async fn wait_for_catch_up(manager: &SupplyManager) {
    tokio::time::timeout(Duration::from_secs(30), async {
        while manager.is_catching_up() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("catch-up did not finish");
}

#[tokio::test]
async fn bootstraps_genesis_and_catches_up_to_head() {
    let h = Harness::new(300);
    assert_eq!(h.manager.state(), SupplyState::Stopped);
    assert!(matches!(h.manager.checkpoint(0), Err(SupplyError::NotRunning)));

    h.manager.start().await.unwrap();
    assert_eq!(h.manager.state(), SupplyState::Running);
    wait_for_catch_up(&h.manager).await;

    assert_eq!(h.manager.last_number(), Some(300));
    assert_eq!(h.store.checkpoint_numbers(), vec![0, 128, 256]);
    assert_eq!(h.store.read_last_supply_checkpoint_number().unwrap(), Some(256));
    assert_eq!(
        h.store.read_supply_checkpoint(0).unwrap(),
        Some(SupplyCheckpoint::new(GENESIS_SUPPLY, 0))
    );
    assert_eq!(h.manager.checkpoint(300).unwrap(), h.expected(300));

    h.manager.stop().await;
    assert_eq!(h.manager.state(), SupplyState::Stopped);
    h.manager.stop().await;
}

#[tokio::test]
async fn historical_checkpoints_match_block_by_block_accumulation() {
    let h = Harness::new(300);
    h.manager.start().await.unwrap();
    wait_for_catch_up(&h.manager).await;

    for num in [0, 1, 99, 100, 127, 128, 129, 200, 255, 256, 257, 299, 300] {
        assert_eq!(h.manager.checkpoint(num).unwrap(), h.expected(num), "block {num}");
    }
    // Served from the replay cache the second time.
    assert_eq!(h.manager.checkpoint(200).unwrap(), h.expected(200));

    assert!(matches!(
        h.manager.checkpoint(301),
        Err(SupplyError::BeyondFrontier { num: 301, last: 300 })
    ));
    h.manager.stop().await;
}

#[tokio::test]
async fn insertions_advance_one_block_at_a_time_and_fill_gaps() {
    let h = Harness::new(10);
    h.manager.start().await.unwrap();
    wait_for_catch_up(&h.manager).await;
    assert_eq!(h.manager.last_number(), Some(10));

    extend(&h.chain, 11, 11, 0);
    h.manager.on_block_inserted(11).unwrap();
    assert_eq!(h.manager.last_number(), Some(11));

    h.manager.on_block_inserted(5).unwrap();
    h.manager.on_block_inserted(11).unwrap();
    assert_eq!(h.manager.last_number(), Some(11));

    extend(&h.chain, 12, 140, 0);
    h.manager.on_block_inserted(140).unwrap();
    assert_eq!(h.manager.last_number(), Some(140));
    assert_eq!(h.manager.checkpoint(140).unwrap(), h.expected(140));
    assert_eq!(h.store.read_last_supply_checkpoint_number().unwrap(), Some(128));
    h.manager.stop().await;
}

#[tokio::test]
async fn restart_resumes_from_persisted_frontier() {
    let chain = build_chain(chain_config(), 200);
    let store = Arc::new(MemoryStorage::new());

    let first = Harness::with_store(chain.clone(), store.clone());
    first.manager.start().await.unwrap();
    wait_for_catch_up(&first.manager).await;
    first.manager.stop().await;
    assert_eq!(store.read_last_supply_checkpoint_number().unwrap(), Some(128));

    extend(&chain, 201, 400, 0);
    let second = Harness::with_store(chain, store.clone());
    second.manager.start().await.unwrap();
    assert!(second.manager.last_number().unwrap() >= 128);
    wait_for_catch_up(&second.manager).await;

    assert_eq!(second.manager.last_number(), Some(400));
    assert_eq!(second.manager.checkpoint(400).unwrap(), second.expected(400));
    assert_eq!(store.checkpoint_numbers(), vec![0, 128, 256, 384]);
    second.manager.stop().await;
}

#[tokio::test]
async fn rewind_falls_back_to_boundary_and_replays_new_branch() {
    let h = Harness::new(300);
    h.manager.start().await.unwrap();
    wait_for_catch_up(&h.manager).await;

    h.chain.truncate_above(200);
    h.manager.on_rewind(200).unwrap();
    assert_eq!(h.store.read_last_supply_checkpoint_number().unwrap(), Some(128));
    assert_eq!(h.manager.last_number(), Some(128));
    assert!(matches!(
        h.manager.checkpoint(150),
        Err(SupplyError::BeyondFrontier { num: 150, last: 128 })
    ));
    // The stale record above the pointer is still on disk.
    assert!(h.store.read_supply_checkpoint(256).unwrap().is_some());

    extend(&h.chain, 201, 260, 1);
    h.manager.on_block_inserted(260).unwrap();
    assert_eq!(h.manager.last_number(), Some(260));
    assert_eq!(h.manager.checkpoint(260).unwrap(), h.expected(260));
    assert_eq!(h.manager.checkpoint(256).unwrap(), h.expected(256));
    assert_eq!(h.store.read_supply_checkpoint(256).unwrap(), Some(h.expected(256)));
    h.manager.stop().await;
}

#[tokio::test]
async fn total_supply_resolves_every_component() {
    let h = Harness::new(160);
    h.chain.insert_state(
        root_of(160),
        MemoryState::new([(Address::ZERO, 7), (Address::DEAD, 11)]),
    );
    h.caller.set_result(
        Address::from_low_u8(0x03),
        MEMO_METHOD,
        r#"{"retirees":[],"newbies":[],"burnt":1000,"success":true}"#,
    );
    h.manager.start().await.unwrap();
    wait_for_catch_up(&h.manager).await;

    let expected = h.expected(160);
    let supply = h.manager.total_supply(160).unwrap();
    let total_burnt = expected.burnt_fee + 7 + 11 + 1000;
    assert_eq!(supply.total_minted, expected.minted);
    assert_eq!(supply.burnt_fee, expected.burnt_fee);
    assert_eq!(supply.kip160_burn, Some(0));
    assert_eq!(supply.total_burnt, Some(total_burnt));
    assert_eq!(supply.total_supply, Some(expected.minted - total_burnt));

    let response = h.manager.get_total_supply(BlockNumber::Latest, false).unwrap();
    assert_eq!(response.number, 160);
    assert_eq!(response.kip103_burn.as_deref(), Some("1000"));
    assert_eq!(response.error, None);
    h.manager.stop().await;
}

#[tokio::test]
async fn unresolved_rebalance_memo_yields_partial_supply() {
    let h = Harness::new(160);
    h.chain.insert_state(root_of(160), MemoryState::new([(Address::ZERO, 7)]));
    h.caller.set_result(Address::from_low_u8(0x03), MEMO_METHOD, "");
    h.manager.start().await.unwrap();
    wait_for_catch_up(&h.manager).await;

    let err = h.manager.get_total_supply(BlockNumber::Number(160), false).unwrap_err();
    assert!(matches!(err, SupplyError::Partial { .. }));

    let response = h.manager.get_total_supply(BlockNumber::Number(160), true).unwrap();
    assert_eq!(response.total_supply, None);
    assert_eq!(response.total_burnt, None);
    assert_eq!(response.kip103_burn, None);
    assert_eq!(response.zero_burn.as_deref(), Some("7"));
    assert_eq!(response.dead_burn.as_deref(), Some("0"));
    assert!(response.error.unwrap().contains("not finalized"));

    // Missing state for the block joins a second error.
    h.chain.prune_state(&root_of(160));
    let err = h.manager.total_supply(160).unwrap_err();
    let SupplyError::Partial { errors, .. } = err else {
        panic!("expected partial result");
    };
    assert_eq!(errors.0.len(), 2);
    h.manager.stop().await;
}

/// Fixed per-block summary, optionally slowed down.
struct FixedRewards {
    delay: Duration,
}

impl RewardSummarySource for FixedRewards {
    fn reward_summary(&self, _num: u64) -> Result<RewardSummary, RewardError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(RewardSummary {
            minted: 10,
            total_fee: 4,
            burnt_fee: 2,
        })
    }
}

fn sparse_chain(head: u64) -> Arc<MemoryChain> {
    let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
    chain.insert_state(root_of(0), MemoryState::new([(Address::from_low_u8(1), 100)]));
    chain.insert_block(Block::new(header(0, 0), vec![]), vec![]);
    chain.insert_block(Block::new(header(head, 0), vec![]), vec![]);
    chain
}

fn fixed_manager(chain: Arc<MemoryChain>, store: Arc<MemoryStorage>, delay: Duration) -> SupplyManager {
    SupplyManager::new(
        chain,
        Arc::new(FixedRewards { delay }),
        store,
        Arc::new(MemoryContractCaller::new()),
        SupplyConfig {
            shutdown_timeout_ms: 2_000,
            ..Default::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn stop_interrupts_catch_up() {
    let store = Arc::new(MemoryStorage::new());
    let manager = fixed_manager(sparse_chain(1_000_000), store, Duration::from_millis(1));
    manager.start().await.unwrap();
    assert!(manager.is_catching_up());
    tokio::time::sleep(Duration::from_millis(20)).await;

    tokio::time::timeout(Duration::from_secs(5), manager.stop())
        .await
        .expect("stop must not hang");
    assert_eq!(manager.state(), SupplyState::Stopped);
    assert!(!manager.is_catching_up());
    assert!(manager.last_number().unwrap() < 1_000_000);
}

#[tokio::test]
async fn failed_write_keeps_frontier_in_place() {
    let store = Arc::new(MemoryStorage::new());
    let chain = sparse_chain(100);
    let manager = fixed_manager(chain.clone(), store.clone(), Duration::ZERO);
    manager.start().await.unwrap();
    wait_for_catch_up(&manager).await;
    assert_eq!(manager.last_number(), Some(100));
    assert_eq!(manager.checkpoint(100).unwrap(), SupplyCheckpoint::new(100 + 100 * 10, 200));

    store.set_read_only(true);
    chain.insert_block(Block::new(header(128, 0), vec![]), vec![]);
    assert!(matches!(manager.on_block_inserted(128), Err(SupplyError::Storage(_))));
    assert_eq!(manager.last_number(), Some(127));

    store.set_read_only(false);
    manager.on_block_inserted(128).unwrap();
    assert_eq!(manager.last_number(), Some(128));
    assert_eq!(store.read_last_supply_checkpoint_number().unwrap(), Some(128));
    manager.stop().await;
}

#[tokio::test]
async fn start_fails_without_genesis_state() {
    let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
    chain.insert_block(Block::new(header(0, 0), vec![]), vec![]);
    let manager = fixed_manager(chain, Arc::new(MemoryStorage::new()), Duration::ZERO);

    assert!(matches!(
        manager.start().await,
        Err(SupplyError::MissingState { num: 0, .. })
    ));
    assert_eq!(manager.state(), SupplyState::Stopped);
}

//! Node orchestrator: proposer-cadence block production and the
//! longest-valid-chain sync loop.
//!
//! Holds the other components and runs the two periodic background tasks
//! described by the node orchestrator component: every
//! `block_interval_target` seconds this node checks whether it is the
//! current proposer and, if so, composes and appends a block; every
//! `sync_interval_secs` seconds it polls peers for a longer valid chain.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chain::{Address, Block, Transaction, TxType, network};

use crate::state::SharedState;

fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

/// Runs forever, attempting a block production cycle every
/// `interval_secs` seconds. Non-proposers simply wait.
pub async fn run_block_producer(state: SharedState, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs.max(1));
    tracing::info!(interval_secs = interval.as_secs(), "block producer running");

    loop {
        tokio::time::sleep(interval).await;
        if let Err(e) = try_produce_block(&state).await {
            tracing::debug!("skipped block production: {e}");
        }
    }
}

async fn try_produce_block(state: &SharedState) -> Result<(), String> {
    let own_address = state.keypair.address();
    let now = current_unix_timestamp();

    let (expected, next_index, previous_hash, reward_amount) = {
        let chain = state.chain.read().await;
        let expected = chain
            .expected_next_proposer()
            .map_err(|e| format!("proposer election failed: {e}"))?;
        let tip = chain.tip();
        let next_index = tip.index + 1;
        let reward_amount = chain.ledger().block_reward(next_index);
        (expected, next_index, tip.hash, reward_amount)
    };

    if expected != own_address {
        return Err("not the elected proposer for this slot".to_string());
    }

    let start = std::time::Instant::now();
    let max_txs = state.config.consensus.max_block_txs.saturating_sub(1);
    let mut drained = {
        let mut mempool = state.mempool.lock().await;
        mempool.drain(max_txs)
    };

    let drained_tx_ids: Vec<chain::Hash256> = drained.iter().map(|tx| tx.tx_id).collect();

    let reward_tx = Transaction::new(
        TxType::Reward,
        Address::system(),
        own_address.clone(),
        reward_amount,
        0,
        now,
        None,
    )
    .map_err(|e| format!("failed to build reward transaction: {e}"))?;
    drained.push(reward_tx);

    let block = Block::new(next_index, previous_hash, now, drained.clone(), own_address)
        .map_err(|e| format!("failed to assemble candidate block: {e}"))?;

    {
        let mut chain = state.chain.write().await;
        chain
            .append(block.clone(), now)
            .map_err(|e| format!("failed to append own block: {e}"))?;
    }

    snapshot_chain(state).await;
    if let Err(e) = state.storage.drop_pending(&drained_tx_ids) {
        tracing::warn!("failed to drop included transactions from the persisted pending pool: {e}");
    }

    let elapsed = start.elapsed().as_secs_f64();
    state.metrics.node.block_production_seconds.observe(elapsed);
    state.metrics.node.chain_height.set(next_index as f64);
    tracing::info!(index = next_index, hash = %block.hash, "produced block");

    let peers = state.peers.lock().await.urls();
    let results = network::broadcast_block(&state.http_client, &peers, &block).await;
    for (peer, result) in results {
        if let Err(e) = result {
            tracing::warn!(%peer, "block gossip failed: {e}");
        }
    }

    Ok(())
}

/// Persists the current chain state, serialized against other writers.
pub async fn snapshot_chain(state: &SharedState) {
    let _guard = state.storage_write_lock.lock().await;
    let chain = state.chain.read().await;
    if let Err(e) = state.storage.save_snapshot(&chain) {
        tracing::error!("failed to persist chain snapshot: {e}");
    }
}

/// Runs forever, polling peers for a longer valid chain every
/// `interval_secs` seconds and adopting it if found.
pub async fn run_sync_loop(state: SharedState, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs.max(1));
    tracing::info!(interval_secs = interval.as_secs(), "sync loop running");

    loop {
        tokio::time::sleep(interval).await;
        let peers = state.peers.lock().await.urls();
        if peers.is_empty() {
            continue;
        }

        let now = current_unix_timestamp();
        let cfg = state.config.consensus.clone();
        let candidate = network::poll_peers(&state.http_client, &peers, &cfg, now).await;

        let Some(candidate) = candidate else { continue };

        let should_adopt = {
            let chain = state.chain.read().await;
            chain::is_better_chain(&chain, &candidate)
        };

        if should_adopt {
            let candidate_len = candidate.len();
            let mut chain = state.chain.write().await;
            match chain.replace(candidate.blocks().to_vec(), now) {
                Ok(()) => {
                    tracing::info!(new_length = candidate_len, "adopted longer peer chain");
                }
                Err(e) => {
                    tracing::warn!("rejected candidate chain from sync: {e}");
                    continue;
                }
            }
            drop(chain);
            snapshot_chain(&state).await;
        }
    }
}

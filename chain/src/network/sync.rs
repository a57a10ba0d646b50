//! Longest-valid-chain synchronization.
//!
//! Runs periodically (every `sync_interval_secs`, 60 s by default per the
//! orchestrator). Polls every known peer's `/blocks`, re-validates each
//! response from genesis, and hands the best valid candidate back to the
//! caller, which adopts it via `Chain::replace` if it's strictly longer
//! than the local chain. Gossiped single blocks are handled separately via
//! `Chain::append` and are not this module's concern.

use reqwest::Client;

use super::dto::BlocksResponse;
use super::error::NetworkError;
use crate::chain::{Chain, is_better_chain};
use crate::consensus::ConsensusConfig;
use crate::types::Block;

const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Fetches a peer's full chain via `GET /blocks`.
pub async fn fetch_peer_chain(client: &Client, peer: &str) -> Result<Vec<Block>, NetworkError> {
    let url = format!("{peer}/blocks");
    let resp = client
        .get(&url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| NetworkError::from_reqwest(peer, e))?;
    let parsed: BlocksResponse = resp
        .json()
        .await
        .map_err(|_| NetworkError::MalformedMessage(peer.to_string()))?;
    Ok(parsed.blocks)
}

/// Re-validates a candidate chain from genesis, replaying every block
/// through the same rules `Chain::append` uses. Returns `None` if any
/// block fails validation or the chain is empty.
///
/// `now` bounds each block's clock-skew check; for a historical chain
/// fetched from a peer this is simply the current wall clock, since every
/// block's timestamp is expected to already be in the past.
pub fn validate_candidate_chain(blocks: Vec<Block>, cfg: ConsensusConfig, now: u64) -> Option<Chain> {
    let mut iter = blocks.into_iter();
    let genesis = iter.next()?;
    let mut chain = Chain::new(genesis, cfg).ok()?;
    for block in iter {
        chain.append(block, now).ok()?;
    }
    Some(chain)
}

/// Picks the best valid chain among `candidates`, per the same fork-choice
/// rule `Chain::replace` enforces (longest, then cumulative proposer
/// stake, then lexicographically-lowest tip hash).
pub fn best_candidate(candidates: Vec<Chain>) -> Option<Chain> {
    candidates
        .into_iter()
        .fold(None, |best, candidate| match best {
            None => Some(candidate),
            Some(current) => {
                if is_better_chain(&current, &candidate) {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        })
}

/// Fetches every peer's chain concurrently, validates each, and returns the
/// single best candidate (if any peer offered a valid one).
pub async fn poll_peers(client: &Client, peers: &[String], cfg: &ConsensusConfig, now: u64) -> Option<Chain> {
    let mut tasks = tokio::task::JoinSet::new();
    for peer in peers {
        let client = client.clone();
        let peer = peer.clone();
        tasks.spawn(async move { fetch_peer_chain(&client, &peer).await });
    }

    let mut candidates = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let Ok(Ok(blocks)) = joined else { continue };
        if let Some(chain) = validate_candidate_chain(blocks, cfg.clone(), now) {
            candidates.push(chain);
        }
    }

    best_candidate(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    #[test]
    fn validate_candidate_chain_rejects_empty_input() {
        let cfg = ConsensusConfig::testnet();
        assert!(validate_candidate_chain(Vec::new(), cfg, 1).is_none());
    }

    #[test]
    fn validate_candidate_chain_accepts_genesis_only() {
        let genesis = Block::genesis(Address::from_raw("GRS_founder"), 1_000_000, 1_700_000_000).unwrap();
        let cfg = ConsensusConfig::testnet();
        let chain = validate_candidate_chain(vec![genesis], cfg, 1_700_000_100).unwrap();
        assert_eq!(chain.height(), 0);
    }
}

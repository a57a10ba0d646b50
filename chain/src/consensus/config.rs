/// Proof-of-Stake consensus parameters.
///
/// These govern validator-set membership and the pacing of block
/// production; they are distinct from storage/network configuration.
#[derive(Clone, Debug)]
pub struct ConsensusConfig {
    /// Minimum stake amount, in minimal units, for an address to be a
    /// validator candidate.
    pub min_stake: u64,
    /// Maximum number of validators considered, ranked by stake descending.
    pub validator_cap: usize,
    /// Target spacing between blocks, in seconds.
    pub block_interval_target: u64,
    /// Maximum allowed difference between a candidate block's timestamp and
    /// the local clock, in seconds.
    pub max_clock_skew: u64,
    /// Soft limit on the number of transactions per block.
    pub max_block_txs: usize,
    /// Soft limit on the total serialized size of a block, in bytes.
    pub max_block_size_bytes: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_stake: crate::ledger::MIN_STAKE,
            validator_cap: 100,
            block_interval_target: 15,
            max_clock_skew: 120,
            max_block_txs: 10_000,
            max_block_size_bytes: 1_000_000,
        }
    }
}

impl ConsensusConfig {
    /// A lighter profile for local/integration testing: lower stake floor
    /// and a faster block cadence, per `--testnet`.
    pub fn testnet() -> Self {
        Self {
            min_stake: 10 * 100_000_000,
            block_interval_target: 2,
            ..Self::default()
        }
    }
}

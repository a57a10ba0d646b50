use thiserror::Error;

/// Errors raised by validator-set derivation and proposer election.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConsensusError {
    /// The validator set is empty; block production is suspended.
    #[error("no validators meet the minimum stake; block production is suspended")]
    NoValidators,
}

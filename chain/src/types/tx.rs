//! Transaction type and content-addressed identifier.

use serde::{Deserialize, Serialize};

use super::{Address, Hash256};
use crate::crypto::{self, CryptoError};

/// Transaction variant tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxType {
    Transfer,
    Stake,
    Unstake,
    Reward,
    Genesis,
    Fee,
}

/// A signed transaction.
///
/// `tx_id` is a function of every other field (content-addressed); callers
/// construct a transaction via [`Transaction::new`], which computes both the
/// id and, where a signing key is supplied, the signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: Hash256,
    pub tx_type: TxType,
    pub sender: Address,
    pub recipient: Address,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: u64,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

/// The subset of a transaction's fields covered by its hash and signature:
/// everything except `tx_id` and `signature` themselves.
#[derive(Serialize)]
struct SigningPayload<'a> {
    tx_type: TxType,
    sender: &'a Address,
    recipient: &'a Address,
    amount: u64,
    fee: u64,
    timestamp: u64,
}

impl Transaction {
    /// Builds an unsigned-then-signed transaction from its logical fields.
    ///
    /// `sign_with` is `None` for system transactions (GENESIS, REWARD, FEE),
    /// which carry no signature, and `Some(secret_key)` otherwise.
    pub fn new(
        tx_type: TxType,
        sender: Address,
        recipient: Address,
        amount: u64,
        fee: u64,
        timestamp: u64,
        sign_with: Option<&secp256k1::SecretKey>,
    ) -> Result<Self, CryptoError> {
        let payload = SigningPayload {
            tx_type,
            sender: &sender,
            recipient: &recipient,
            amount,
            fee,
            timestamp,
        };
        let bytes = crypto::canonical_serialize(&payload)?;
        let tx_id = Hash256::compute(&bytes);
        let signature = match sign_with {
            Some(sk) => crypto::sign(sk, &bytes),
            None => Vec::new(),
        };

        Ok(Transaction {
            tx_id,
            tx_type,
            sender,
            recipient,
            amount,
            fee,
            timestamp,
            signature,
        })
    }

    /// Recomputes the canonical signing bytes for this transaction.
    fn signing_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        let payload = SigningPayload {
            tx_type: self.tx_type,
            sender: &self.sender,
            recipient: &self.recipient,
            amount: self.amount,
            fee: self.fee,
            timestamp: self.timestamp,
        };
        crypto::canonical_serialize(&payload)
    }

    /// Recomputes `tx_id` from the current fields.
    pub fn compute_tx_id(&self) -> Result<Hash256, CryptoError> {
        Ok(Hash256::compute(&self.signing_bytes()?))
    }

    /// Returns `true` if the carried `tx_id` matches the recomputed hash.
    pub fn has_valid_id(&self) -> bool {
        matches!(self.compute_tx_id(), Ok(id) if id.as_bytes() == self.tx_id.as_bytes())
    }

    /// Verifies that `signature` recovers to `sender`. Returns `Ok(false)`
    /// (not an error) when the recovered address doesn't match; system
    /// transactions carry no signature and should be checked via
    /// [`Transaction::is_system_tx`] instead of this method.
    pub fn verify_signature(&self) -> Result<bool, CryptoError> {
        let bytes = self.signing_bytes()?;
        crypto::verify(&bytes, &self.signature, &self.sender)
    }

    /// Returns `true` if this transaction type is one of the system-minted
    /// kinds (`GENESIS`, `REWARD`, `FEE`) which carry `sender = system` and
    /// no signature.
    pub fn is_system_tx(&self) -> bool {
        matches!(self.tx_type, TxType::Genesis | TxType::Reward | TxType::Fee)
    }
}

/// Serializes a byte vector as a hex string in JSON, matching the wire
/// format used throughout the peer network (§6: ASCII-only canonical form).
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transfer_has_valid_id_and_signature() {
        let kp = crate::crypto::Keypair::generate();
        let recipient = Address::from_raw("GRS_recipient");
        let tx = Transaction::new(
            TxType::Transfer,
            kp.address(),
            recipient,
            100,
            1,
            1_700_000_000,
            Some(&kp.secret_key),
        )
        .unwrap();

        assert!(tx.has_valid_id());
        assert!(tx.verify_signature().unwrap());
    }

    #[test]
    fn tampering_with_amount_invalidates_id() {
        let kp = crate::crypto::Keypair::generate();
        let mut tx = Transaction::new(
            TxType::Transfer,
            kp.address(),
            Address::from_raw("GRS_recipient"),
            100,
            1,
            1_700_000_000,
            Some(&kp.secret_key),
        )
        .unwrap();

        tx.amount = 999;
        assert!(!tx.has_valid_id());
    }

    #[test]
    fn system_tx_has_no_signature() {
        let tx = Transaction::new(
            TxType::Genesis,
            Address::system(),
            Address::from_raw("GRS_founder"),
            10_000_000_000_000_000,
            0,
            1_700_000_000,
            None,
        )
        .unwrap();
        assert!(tx.signature.is_empty());
        assert!(tx.is_system_tx());
    }
}

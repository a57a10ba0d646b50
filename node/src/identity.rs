//! Node identity: the keypair this node signs REWARD-eligible blocks with.
//!
//! Persisted as a single file under the data directory so a node's address
//! is stable across restarts.

use std::fs;
use std::path::Path;

use chain::Keypair;
use secp256k1::SecretKey;

const IDENTITY_FILE: &str = "node.key";

/// Loads this node's keypair from `<data_dir>/node.key`, or generates and
/// persists a new one if the file doesn't exist.
pub fn load_or_create(data_dir: &Path) -> std::io::Result<Keypair> {
    let path = data_dir.join(IDENTITY_FILE);

    if let Ok(bytes) = fs::read(&path) {
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let secp = secp256k1::Secp256k1::new();
        let public_key = secp256k1::PublicKey::from_secret_key(&secp, &secret_key);
        return Ok(Keypair { secret_key, public_key });
    }

    fs::create_dir_all(data_dir)?;
    let keypair = Keypair::generate();
    fs::write(&path, keypair.secret_key.secret_bytes())?;
    Ok(keypair)
}

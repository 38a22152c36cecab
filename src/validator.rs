//! Structural and identity checks for global chain-config documents.
//!
//! A document is accepted when it is a `config.global` JSON object with at
//! least one lite server and a masterchain zero state. The identity rule ties
//! the reserved `mainnet` chain name to the well-known mainnet zero state:
//! `mainnet` requires it, every other chain name must not carry it.

use crate::collaborators::ConfigValidator;
use crate::config::MAINNET_CHAIN_NAME;
use crate::error::ValidationError;
use async_trait::async_trait;
use serde::Deserialize;

const GLOBAL_CONFIG_TYPE: &str = "config.global";
const MASTERCHAIN_ID: i32 = -1;

/// File hash of the mainnet masterchain zero state.
pub const MAINNET_ZERO_STATE_FILE_HASH: &str = "XplPz01CXAps5qeSWUtxcyBfdAo5zVb1N979KLSKD24=";

#[derive(Debug, Deserialize)]
struct GlobalConfig {
    #[serde(rename = "@type")]
    kind: String,
    #[serde(default)]
    liteservers: Vec<LiteServer>,
    validator: ValidatorSection,
}

#[derive(Debug, Deserialize)]
struct LiteServer {
    #[allow(dead_code)]
    ip: i64,
    port: u16,
    id: LiteServerKey,
}

#[derive(Debug, Deserialize)]
struct LiteServerKey {
    key: String,
}

#[derive(Debug, Deserialize)]
struct ValidatorSection {
    zero_state: BlockId,
}

#[derive(Debug, Deserialize)]
struct BlockId {
    workchain: i32,
    #[allow(dead_code)]
    shard: i64,
    seqno: u32,
    root_hash: String,
    file_hash: String,
}

/// Validate `document` for the chain called `chain_name`.
pub fn validate_document(document: &str, chain_name: &str) -> Result<(), ValidationError> {
    let config: GlobalConfig =
        serde_json::from_str(document).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    if config.kind != GLOBAL_CONFIG_TYPE {
        return Err(ValidationError::WrongType(config.kind));
    }
    if config.liteservers.is_empty() {
        return Err(ValidationError::NoLiteServers);
    }
    if let Some(bad) = config.liteservers.iter().find(|s| s.port == 0 || s.id.key.is_empty()) {
        return Err(ValidationError::Malformed(format!(
            "lite server on port {} has no usable key or port",
            bad.port
        )));
    }

    let zero_state = &config.validator.zero_state;
    if zero_state.workchain != MASTERCHAIN_ID || zero_state.seqno != 0 {
        return Err(ValidationError::Malformed(
            "zero state must be masterchain block 0".to_string(),
        ));
    }
    if zero_state.root_hash.is_empty() || zero_state.file_hash.is_empty() {
        return Err(ValidationError::Malformed("zero state hashes are missing".to_string()));
    }

    let is_mainnet_state = zero_state.file_hash == MAINNET_ZERO_STATE_FILE_HASH;
    let wants_mainnet = chain_name == MAINNET_CHAIN_NAME;
    if is_mainnet_state != wants_mainnet {
        return Err(ValidationError::IdentityMismatch {
            expected: chain_name.to_string(),
        });
    }
    Ok(())
}

/// Default [`ConfigValidator`] backed by [`validate_document`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalConfigValidator;

#[async_trait]
impl ConfigValidator for GlobalConfigValidator {
    async fn validate(&self, document: &str, chain_name: &str) -> Result<(), ValidationError> {
        validate_document(document, chain_name)
    }
}

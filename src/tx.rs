//! Transaction submission
//!
//! Sends a contract call from an (impersonated) account, waits for the mined
//! receipt, and recovers the revert reason when the transaction fails.
//!
//! Nodes surface reverts two ways: Hardhat rejects `eth_sendTransaction` with
//! the reason in the error message, Anvil mines the transaction with status 0.
//! For the latter the call is replayed with `eth_call` against the parent
//! block to read the reason.

use crate::error::HarnessError;
use alloy::contract::{CallDecoder, CallBuilder};
use alloy::eips::BlockId;
use alloy::network::{Ethereum, ReceiptResponse};
use alloy::primitives::TxHash;
use alloy::providers::Provider;
use alloy::rpc::types::TransactionReceipt;
use alloy::sol_types::decode_revert_reason;
use tracing::{debug, info, warn};

/// Why a submitted transaction did not succeed
#[derive(Debug)]
pub enum TxFailure {
    /// Rejected by the EVM, with the best reason string available
    Reverted {
        tx_hash: Option<TxHash>,
        reason: String,
    },
    /// Transport or node failure unrelated to contract logic
    Transport(HarnessError),
}

/// Best-effort revert reason from a contract error
pub fn revert_reason(err: &alloy::contract::Error) -> String {
    err.as_revert_data()
        .and_then(|data| decode_revert_reason(&data))
        .unwrap_or_else(|| err.to_string())
}

/// True when the error text describes an EVM revert rather than a transport problem
pub fn looks_like_revert(err: &alloy::contract::Error) -> bool {
    if err.as_revert_data().is_some() {
        return true;
    }
    let msg = err.to_string().to_lowercase();
    msg.contains("revert") || msg.contains("vm exception")
}

/// Send `call` with a fixed gas limit and wait for its receipt.
pub async fn send_confirmed<P, D>(
    call: CallBuilder<P, D, Ethereum>,
    gas_limit: u64,
    label: &str,
) -> Result<TransactionReceipt, TxFailure>
where
    P: Provider<Ethereum> + Clone,
    D: CallDecoder + Clone,
{
    let call = call.gas(gas_limit);
    let replay = call.clone();

    let pending = match call.send().await {
        Ok(pending) => pending,
        Err(e) if looks_like_revert(&e) => {
            let reason = revert_reason(&e);
            warn!("{} rejected at submission: {}", label, reason);
            return Err(TxFailure::Reverted {
                tx_hash: None,
                reason,
            });
        }
        Err(e) => {
            return Err(TxFailure::Transport(HarnessError::contract(
                format!("{} send failed", label),
                e,
            )))
        }
    };

    let tx_hash = *pending.tx_hash();
    debug!("{} tx submitted: {:?}", label, tx_hash);

    let receipt = pending.get_receipt().await.map_err(|e| {
        TxFailure::Transport(HarnessError::contract(
            format!("{} confirmation failed", label),
            e,
        ))
    })?;

    if receipt.status() {
        info!(
            "{} confirmed: {:?} (block {:?}, gas {})",
            label,
            tx_hash,
            receipt.block_number(),
            receipt.gas_used()
        );
        return Ok(receipt);
    }

    // Mined but reverted: replay against the state it executed on
    let reason = match receipt.block_number() {
        Some(block) => match replay.block(BlockId::number(block.saturating_sub(1))).call().await {
            Err(e) => revert_reason(&e),
            Ok(_) => "reverted without reason (replay succeeded)".to_string(),
        },
        None => "reverted without reason".to_string(),
    };
    warn!("{} reverted: {:?}: {}", label, tx_hash, reason);

    Err(TxFailure::Reverted {
        tx_hash: Some(tx_hash),
        reason,
    })
}

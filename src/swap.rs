//! Swap Executor
//!
//! Dumps an exact input amount of one token into a V2 router for another.
//! Each step is its own failure boundary:
//!
//! 1. decimal string → smallest-unit integer (exact, via `units`)
//! 2. balance pre-check, so an oversized order fails before any approval
//! 3. `approve(router, amount)`, confirmed before the swap is sent
//! 4. `swapExactTokensForTokens` with `amountOutMin = 0`, a two-hop path and
//!    a deadline 20 minutes out
//!
//! `amountOutMin = 0` accepts unlimited slippage. That is the point here (the
//! goal is to move the pool price, not get a fair fill) but it is unsafe on
//! any network where someone else can trade against the order.

use crate::bindings::ContractBindings;
use crate::error::{HarnessError, Result};
use crate::tx::{send_confirmed, TxFailure};
use crate::units::to_smallest_unit;
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::Provider;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Swap deadline offset from submission time
pub const SWAP_DEADLINE_SECS: u64 = 20 * 60;

/// Gas limit used when the configuration does not override it
pub const DEFAULT_GAS_LIMIT: u64 = 450_000;

/// Current unix time in seconds
pub fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

/// An exact-input swap request. Applied atomically by the router or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapOrder {
    pub input_token: Address,
    pub output_token: Address,
    /// Smallest-unit amount of `input_token`
    pub input_amount: U256,
    pub min_output_amount: U256,
    pub recipient: Address,
    /// Unix timestamp after which the router must reject the swap
    pub deadline: u64,
}

impl SwapOrder {
    /// Price-moving order: unlimited slippage, deadline `SWAP_DEADLINE_SECS` after `now`
    pub fn dump(
        input_token: Address,
        output_token: Address,
        input_amount: U256,
        recipient: Address,
        now: u64,
    ) -> Self {
        Self {
            input_token,
            output_token,
            input_amount,
            min_output_amount: U256::ZERO,
            recipient,
            deadline: now + SWAP_DEADLINE_SECS,
        }
    }

    pub fn path(&self) -> Vec<Address> {
        vec![self.input_token, self.output_token]
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.deadline < now
    }
}

/// A swap that the chain applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapReceipt {
    pub approval_tx: TxHash,
    pub swap_tx: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Output-token balance delta of the recipient across the swap
    pub amount_out: U256,
}

/// Category of a router / token revert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertKind {
    DeadlineExceeded,
    InsufficientAllowance,
    InsufficientBalance,
    InsufficientLiquidity,
    Other,
}

/// Classify a revert reason emitted by the V2 router, library or token.
pub fn classify_revert(reason: &str) -> RevertKind {
    let upper = reason.to_uppercase();

    if upper.contains("EXPIRED") {
        RevertKind::DeadlineExceeded
    } else if upper.contains("INSUFFICIENT ALLOWANCE")
        || upper.contains("EXCEEDS ALLOWANCE")
        || upper.contains("TRANSFER_FROM_FAILED")
    {
        // TransferHelper hides the token's own reason; balance was checked
        // before submission, so a failed transferFrom is an allowance problem
        RevertKind::InsufficientAllowance
    } else if upper.contains("EXCEEDS BALANCE")
        || upper.contains("INSUFFICIENT BALANCE")
        || upper.contains("DS-MATH-SUB-UNDERFLOW")
    {
        RevertKind::InsufficientBalance
    } else if upper.contains("INSUFFICIENT_LIQUIDITY")
        || upper.contains("INSUFFICIENT_OUTPUT_AMOUNT")
        || upper.contains("INSUFFICIENT_INPUT_AMOUNT")
        || upper.contains("INVALID_PATH")
        || upper.contains("IDENTICAL_ADDRESSES")
    {
        RevertKind::InsufficientLiquidity
    } else {
        RevertKind::Other
    }
}

/// Map a swap revert reason onto the error taxonomy
pub fn swap_revert_error(order: &SwapOrder, router: Address, holder: Address, reason: String) -> HarnessError {
    match classify_revert(&reason) {
        RevertKind::DeadlineExceeded => HarnessError::DeadlineExceeded {
            deadline: order.deadline,
            reason,
        },
        RevertKind::InsufficientAllowance => HarnessError::InsufficientAllowance {
            token: order.input_token,
            spender: router,
            reason,
        },
        RevertKind::InsufficientBalance => HarnessError::InsufficientBalance {
            token: order.input_token,
            holder,
            detail: reason,
            reverted: true,
        },
        RevertKind::InsufficientLiquidity => HarnessError::InsufficientLiquidity {
            path: order.path(),
            reason,
        },
        RevertKind::Other => HarnessError::Reverted { to: router, reason },
    }
}

/// Submits approval + swap transactions through the bound router
pub struct SwapExecutor<'a, P> {
    bindings: &'a ContractBindings<P>,
    gas_limit: u64,
}

impl<'a, P: Provider + Clone> SwapExecutor<'a, P> {
    pub fn new(bindings: &'a ContractBindings<P>, gas_limit: u64) -> Self {
        Self {
            bindings,
            gas_limit,
        }
    }

    /// Dump `amount` (whole-token decimal string) of `input_token` for
    /// `output_token`, sending the output to `recipient`.
    pub async fn execute(
        &self,
        input_token: Address,
        output_token: Address,
        recipient: Address,
        amount: &str,
    ) -> Result<SwapReceipt> {
        let token = self.bindings.token(input_token);
        let symbol = token.symbol().call().await.unwrap_or_else(|_| format!("{:?}", input_token));
        let decimals = token
            .decimals()
            .call()
            .await
            .map_err(|e| HarnessError::contract("decimals() of input token", e))?;

        let input_amount = to_smallest_unit(amount, decimals)?;
        info!("🔻 Beginning swap: {} {} → {:?}", amount, symbol, output_token);

        let order = SwapOrder::dump(input_token, output_token, input_amount, recipient, unix_now());
        self.submit(&order).await
    }

    /// Submit a prepared order: balance check, approval, swap.
    pub async fn submit(&self, order: &SwapOrder) -> Result<SwapReceipt> {
        let signer = self.bindings.signer();
        let router_address = self.bindings.dex().router;
        let input = self.bindings.token(order.input_token);
        let output = self.bindings.token(order.output_token);

        // Step 1: reject oversized orders before anything is approved
        let balance = input
            .balanceOf(signer)
            .call()
            .await
            .map_err(|e| HarnessError::contract("balanceOf(signer)", e))?;
        if balance < order.input_amount {
            return Err(HarnessError::InsufficientBalance {
                token: order.input_token,
                holder: signer,
                detail: format!("balance {} < required {}", balance, order.input_amount),
                reverted: false,
            });
        }

        // Step 2: approval, mined before the swap is sent
        let approval = send_confirmed(
            input.approve(router_address, order.input_amount).from(signer),
            self.gas_limit,
            "approve",
        )
        .await
        .map_err(|failure| match failure {
            TxFailure::Reverted { reason, .. } => HarnessError::Reverted {
                to: order.input_token,
                reason,
            },
            TxFailure::Transport(e) => e,
        })?;

        // Step 3: swap
        if order.min_output_amount.is_zero() {
            warn!("⚠️ amountOutMin = 0: unlimited slippage, only acceptable on an ephemeral fork");
        }
        debug!(
            "Swap: {} of {:?} via path {:?} → {:?}, deadline {}",
            order.input_amount,
            order.input_token,
            order.path(),
            order.recipient,
            order.deadline
        );

        let router = self.bindings.router();
        match router.getAmountsOut(order.input_amount, order.path()).call().await {
            Ok(amounts) => debug!("Router quote: {:?}", amounts),
            Err(e) => debug!("Router quote unavailable: {}", e),
        }

        let output_before = output
            .balanceOf(order.recipient)
            .call()
            .await
            .map_err(|e| HarnessError::contract("balanceOf(recipient) before swap", e))?;

        let swap = send_confirmed(
            router
                .swapExactTokensForTokens(
                    order.input_amount,
                    order.min_output_amount,
                    order.path(),
                    order.recipient,
                    U256::from(order.deadline),
                )
                .from(signer),
            self.gas_limit,
            "swapExactTokensForTokens",
        )
        .await
        .map_err(|failure| match failure {
            TxFailure::Reverted { reason, .. } => swap_revert_error(order, router_address, signer, reason),
            TxFailure::Transport(e) => e,
        })?;

        let output_after = output
            .balanceOf(order.recipient)
            .call()
            .await
            .map_err(|e| HarnessError::contract("balanceOf(recipient) after swap", e))?;

        let receipt = SwapReceipt {
            approval_tx: approval.transaction_hash(),
            swap_tx: swap.transaction_hash(),
            block_number: swap.block_number(),
            gas_used: swap.gas_used(),
            amount_out: output_after.saturating_sub(output_before),
        };

        info!("✅ Swap complete: {:?} | received {}", receipt.swap_tx, receipt.amount_out);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::testing::{mocked, pending, push_return};
    use crate::types::DexAddresses;

    fn order() -> SwapOrder {
        SwapOrder::dump(
            Address::repeat_byte(0x95),
            Address::repeat_byte(0xC0),
            U256::from(1000u64),
            Address::repeat_byte(0x72),
            1_700_000_000,
        )
    }

    #[test]
    fn test_dump_order_shape() {
        let order = order();
        assert_eq!(order.min_output_amount, U256::ZERO);
        assert_eq!(order.deadline, 1_700_000_000 + 1200);
        assert_eq!(order.path(), vec![Address::repeat_byte(0x95), Address::repeat_byte(0xC0)]);
        assert!(!order.is_expired_at(1_700_000_000 + 1200));
        assert!(order.is_expired_at(1_700_000_000 + 1201));
    }

    #[test]
    fn test_classify_router_reasons() {
        assert_eq!(classify_revert("UniswapV2Router: EXPIRED"), RevertKind::DeadlineExceeded);
        assert_eq!(
            classify_revert("TransferHelper: TRANSFER_FROM_FAILED"),
            RevertKind::InsufficientAllowance
        );
        assert_eq!(
            classify_revert("ERC20: insufficient allowance"),
            RevertKind::InsufficientAllowance
        );
        assert_eq!(
            classify_revert("ERC20: transfer amount exceeds balance"),
            RevertKind::InsufficientBalance
        );
        assert_eq!(
            classify_revert("UniswapV2Library: INSUFFICIENT_LIQUIDITY"),
            RevertKind::InsufficientLiquidity
        );
        assert_eq!(classify_revert("UniswapV2: K"), RevertKind::Other);
    }

    #[test]
    fn test_classify_hardhat_wrapped_message() {
        let msg = "server returned an error response: error code -32603: Error: VM Exception while processing transaction: reverted with reason string 'UniswapV2Router: EXPIRED'";
        assert_eq!(classify_revert(msg), RevertKind::DeadlineExceeded);
    }

    #[test]
    fn test_revert_error_carries_context() {
        let order = order();
        let router = Address::repeat_byte(0x7a);

        match swap_revert_error(&order, router, order.recipient, "UniswapV2Router: EXPIRED".into()) {
            HarnessError::DeadlineExceeded { deadline, reason } => {
                assert_eq!(deadline, order.deadline);
                assert!(reason.contains("EXPIRED"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        match swap_revert_error(&order, router, order.recipient, "UniswapV2: K".into()) {
            HarnessError::Reverted { to, .. } => assert_eq!(to, router),
            other => panic!("unexpected: {:?}", other),
        }

        let err = swap_revert_error(
            &order,
            router,
            order.recipient,
            "ds-math-sub-underflow".into(),
        );
        assert!(err.is_revert());
    }

    #[tokio::test]
    async fn test_oversized_order_rejected_before_approval() {
        let (provider, asserter) = mocked();
        let order = order();
        let dex = DexAddresses {
            router: Address::repeat_byte(0x7a),
            factory: Address::repeat_byte(0x5c),
        };
        let bindings = ContractBindings::new(provider, order.recipient, dex);

        // balanceOf(signer) one unit short of the order
        push_return(&asserter, order.input_amount - U256::from(1u64));
        // Would answer the approval if one were sent
        push_return(&asserter, U256::MAX);

        let err = SwapExecutor::new(&bindings, DEFAULT_GAS_LIMIT)
            .submit(&order)
            .await
            .unwrap_err();

        match err {
            HarnessError::InsufficientBalance {
                token,
                holder,
                reverted,
                ..
            } => {
                assert_eq!(token, order.input_token);
                assert_eq!(holder, order.recipient);
                assert!(!reverted);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(pending(&asserter), 1, "nothing beyond the balance read was requested");
    }
}

//! Account Impersonation
//!
//! Acquires signing authority for an address without its private key via
//! node-level impersonation, and releases it afterwards.
//!
//! Impersonation is global node state, so it is modelled as a scoped
//! resource: one `ImpersonationSession` at a time, released explicitly or by
//! `AccountImpersonator::scoped`, which releases on every exit path.

use crate::error::{HarnessError, Result};
use crate::node::DevNode;
use alloy::primitives::Address;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{error, info};

/// An active impersonation of `address`. Obtain with `acquire`, hand back to `release`.
#[derive(Debug)]
#[must_use = "an impersonation session must be released"]
pub struct ImpersonationSession {
    address: Address,
    active: bool,
}

impl ImpersonationSession {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for ImpersonationSession {
    fn drop(&mut self) {
        if self.active {
            error!(
                address = ?self.address,
                "impersonation session dropped without release, node keeps the account unlocked"
            );
        }
    }
}

/// Serializes impersonation sessions against a single node
pub struct AccountImpersonator<N> {
    node: N,
    /// Address of the active session, if any. Held across node calls so
    /// acquire/release never interleave.
    active: Mutex<Option<Address>>,
}

impl<N: DevNode> AccountImpersonator<N> {
    pub fn new(node: N) -> Self {
        Self {
            node,
            active: Mutex::new(None),
        }
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    /// Address currently impersonated, if any
    pub async fn active(&self) -> Option<Address> {
        *self.active.lock().await
    }

    /// Start impersonating `address`. Fails if any session is still open.
    pub async fn acquire(&self, address: Address) -> Result<ImpersonationSession> {
        let mut active = self.active.lock().await;

        if let Some(current) = *active {
            return Err(HarnessError::StaleImpersonation(format!(
                "session for {:?} still active, release it before acquiring {:?}",
                current, address
            )));
        }

        self.node.impersonate(address).await?;
        *active = Some(address);
        info!("🎭 Impersonating {:?}", address);

        Ok(ImpersonationSession {
            address,
            active: true,
        })
    }

    /// Stop impersonating the session's address.
    ///
    /// Local state is cleared even if the node call fails; the error is
    /// still returned so the caller knows the node may retain the unlock.
    pub async fn release(&self, mut session: ImpersonationSession) -> Result<()> {
        let mut active = self.active.lock().await;
        session.active = false;

        match *active {
            Some(current) if current == session.address => {
                *active = None;
                self.node.stop_impersonating(session.address).await?;
                info!("Stopped impersonating {:?}", session.address);
                Ok(())
            }
            Some(current) => Err(HarnessError::StaleImpersonation(format!(
                "release of {:?} while {:?} is the active session",
                session.address, current
            ))),
            None => Err(HarnessError::StaleImpersonation(format!(
                "release of {:?} without a matching acquire",
                session.address
            ))),
        }
    }

    /// Run `scenario` as `address`, releasing the impersonation whether the
    /// scenario succeeds or fails. A scenario error takes precedence over a
    /// release error.
    pub async fn scoped<F, Fut, T>(&self, address: Address, scenario: F) -> Result<T>
    where
        F: FnOnce(Address) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = self.acquire(address).await?;
        let outcome = scenario(session.address()).await;
        let released = self.release(session).await;

        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                error!("Failed to release impersonation after scenario error: {}", release_err);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::testing::RecordingNode;

    fn whale() -> Address {
        Address::repeat_byte(0x72)
    }

    fn other() -> Address {
        Address::repeat_byte(0x42)
    }

    #[tokio::test]
    async fn test_acquire_release_then_acquire_other() {
        let imp = AccountImpersonator::new(RecordingNode::hardhat());

        let session = imp.acquire(whale()).await.unwrap();
        assert!(session.is_active());
        imp.release(session).await.unwrap();
        assert_eq!(imp.active().await, None);

        // No leftover state: a different address can be acquired
        let session = imp.acquire(other()).await.unwrap();
        assert_eq!(imp.node().impersonated(), vec![other()]);
        imp.release(session).await.unwrap();
        assert!(imp.node().impersonated().is_empty());
    }

    #[tokio::test]
    async fn test_second_acquire_rejected_without_node_call() {
        let imp = AccountImpersonator::new(RecordingNode::hardhat());
        let session = imp.acquire(whale()).await.unwrap();

        let err = imp.acquire(other()).await.unwrap_err();
        assert!(matches!(err, HarnessError::StaleImpersonation(_)));
        assert_eq!(imp.node().calls().len(), 1, "only the first impersonate reached the node");

        imp.release(session).await.unwrap();
    }

    #[tokio::test]
    async fn test_release_on_foreign_impersonator_is_stale() {
        let a = AccountImpersonator::new(RecordingNode::hardhat());
        let b = AccountImpersonator::new(RecordingNode::hardhat());

        let session = a.acquire(whale()).await.unwrap();
        let err = b.release(session).await.unwrap_err();
        assert!(matches!(err, HarnessError::StaleImpersonation(_)));
        assert!(b.node().calls().is_empty());

        // `a` still holds the session; nothing was released on its node
        assert_eq!(a.active().await, Some(whale()));
    }

    #[tokio::test]
    async fn test_scoped_releases_on_success() {
        let imp = AccountImpersonator::new(RecordingNode::hardhat());
        let value = imp.scoped(whale(), |signer| async move { Ok(signer) }).await.unwrap();

        assert_eq!(value, whale());
        assert_eq!(imp.active().await, None);
        assert_eq!(
            imp.node().calls(),
            vec![format!("impersonate {:?}", whale()), format!("stop {:?}", whale())]
        );
    }

    #[tokio::test]
    async fn test_scoped_releases_on_scenario_error() {
        let imp = AccountImpersonator::new(RecordingNode::hardhat());
        let result: Result<()> = imp
            .scoped(whale(), |_| async {
                Err(HarnessError::DeadlineExceeded {
                    deadline: 0,
                    reason: "UniswapV2Router: EXPIRED".into(),
                })
            })
            .await;

        assert!(matches!(result, Err(HarnessError::DeadlineExceeded { .. })));
        assert_eq!(imp.active().await, None);
        assert!(imp.node().impersonated().is_empty());
    }

    #[tokio::test]
    async fn test_scoped_scenario_error_wins_over_release_error() {
        let mut node = RecordingNode::hardhat();
        node.fail_stop = true;
        let imp = AccountImpersonator::new(node);

        let result: Result<()> = imp
            .scoped(whale(), |_| async { Err(HarnessError::Config("boom".into())) })
            .await;

        match result {
            Err(HarnessError::Config(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected result: {:?}", other),
        }
        // Local state cleared so the next scenario is not blocked
        assert_eq!(imp.active().await, None);
    }
}

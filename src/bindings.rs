//! Contract Bindings
//!
//! Signer-bound handles for the ERC20, router, factory and pair contracts of
//! one V2 exchange. Building a handle is a pure address + ABI association;
//! calls only happen when an operation is invoked on it.

use crate::contracts::{
    IERC20::{self, IERC20Instance},
    IUniswapV2Factory::{self, IUniswapV2FactoryInstance},
    IUniswapV2Pair::{self, IUniswapV2PairInstance},
    IUniswapV2Router02::{self, IUniswapV2Router02Instance},
};
use crate::error::{HarnessError, Result};
use crate::types::DexAddresses;
use alloy::primitives::Address;
use alloy::providers::Provider;
use serde::Serialize;
use tracing::debug;

/// ERC20 metadata needed for unit conversion and reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMeta {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// Pair contract resolved from the factory, with the caller's base/quote roles attached
#[derive(Debug, Clone)]
pub struct PairHandle<P> {
    pub address: Address,
    pub base: TokenMeta,
    pub quote: TokenMeta,
    contract: IUniswapV2PairInstance<P>,
}

impl<P: Provider> PairHandle<P> {
    pub fn new(address: Address, base: TokenMeta, quote: TokenMeta, provider: P) -> Self {
        Self {
            address,
            base,
            quote,
            contract: IUniswapV2Pair::new(address, provider),
        }
    }

    pub fn contract(&self) -> &IUniswapV2PairInstance<P> {
        &self.contract
    }
}

/// Callable contract handles for one exchange, bound to `signer`
#[derive(Debug, Clone)]
pub struct ContractBindings<P> {
    provider: P,
    signer: Address,
    dex: DexAddresses,
}

impl<P: Provider + Clone> ContractBindings<P> {
    pub fn new(provider: P, signer: Address, dex: DexAddresses) -> Self {
        Self {
            provider,
            signer,
            dex,
        }
    }

    /// Address every state-changing call is sent from
    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn dex(&self) -> DexAddresses {
        self.dex
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn token(&self, address: Address) -> IERC20Instance<P> {
        IERC20::new(address, self.provider.clone())
    }

    pub fn router(&self) -> IUniswapV2Router02Instance<P> {
        IUniswapV2Router02::new(self.dex.router, self.provider.clone())
    }

    pub fn factory(&self) -> IUniswapV2FactoryInstance<P> {
        IUniswapV2Factory::new(self.dex.factory, self.provider.clone())
    }

    /// Read symbol and decimals of an ERC20
    pub async fn token_meta(&self, address: Address) -> Result<TokenMeta> {
        let token = self.token(address);
        let symbol = token
            .symbol()
            .call()
            .await
            .map_err(|e| HarnessError::contract(format!("symbol() of {:?}", address), e))?;
        let decimals = token
            .decimals()
            .call()
            .await
            .map_err(|e| HarnessError::contract(format!("decimals() of {:?}", address), e))?;

        Ok(TokenMeta {
            address,
            symbol,
            decimals,
        })
    }

    /// Look up the pool for `base`/`quote` on this exchange's factory.
    ///
    /// A zero address from `getPair` means no pool exists and surfaces as
    /// `PoolNotFound`.
    pub async fn resolve_pair(&self, base: Address, quote: Address) -> Result<PairHandle<P>> {
        let pair_address = self
            .factory()
            .getPair(base, quote)
            .call()
            .await
            .map_err(|e| HarnessError::contract("getPair", e))?;

        if pair_address == Address::ZERO {
            return Err(HarnessError::PoolNotFound {
                factory: self.dex.factory,
                token_a: base,
                token_b: quote,
            });
        }

        let base = self.token_meta(base).await?;
        let quote = self.token_meta(quote).await?;

        debug!(
            "Resolved pair {:?}: {} ({} dec) / {} ({} dec) on factory {:?}",
            pair_address, base.symbol, base.decimals, quote.symbol, quote.decimals, self.dex.factory
        );

        Ok(PairHandle::new(pair_address, base, quote, self.provider.clone()))
    }
}

/// Providers answering from a queue of canned responses
#[cfg(test)]
pub(crate) mod testing {
    use alloy::primitives::Bytes;
    use alloy::providers::mock::Asserter;
    use alloy::providers::{Provider, ProviderBuilder};
    use alloy::sol_types::SolValue;

    pub(crate) fn mocked() -> (impl Provider + Clone + std::fmt::Debug, Asserter) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        (provider, asserter)
    }

    /// Queue the ABI-encoded return data of the next `eth_call`
    pub(crate) fn push_return<T: SolValue>(asserter: &Asserter, value: T) {
        asserter.push_success(&Bytes::from(value.abi_encode()));
    }

    /// Responses still waiting to be requested
    pub(crate) fn pending(asserter: &Asserter) -> usize {
        asserter.read_q().len()
    }
}

//! Contract Definitions
//!
//! Solidity interfaces consumed by the harness, defined with alloy's `sol!`
//! macro. Each interface is annotated with `#[sol(rpc)]` so it generates an
//! instance type that can make calls through any alloy Provider.
//!
//! Only the surface the harness actually touches is declared: the rest of
//! the Uniswap V2 / OpenZeppelin ABIs is irrelevant here.

use alloy::sol;

// ── ERC20 ─────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

// ── Uniswap V2 (and forks: Sushiswap shares the ABI) ─────────────────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }
}

// ── Flash-loan arbitrage contract (deployed externally) ──────────────

sol! {
    #[sol(rpc)]
    interface IFlashArbitrage {
        function executeTrade(bool startOnExchangeA, address token0, address token1, uint256 flashAmount) external;
        function getMarketId(address token) external view returns (uint256);
    }
}

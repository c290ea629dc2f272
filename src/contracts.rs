//! Minimal contract interfaces for the payment flow.
//!
//! Only the functions the client actually calls are declared: the ERC-20
//! subset used for balance reads, approvals and transfers, and the Mento
//! broker's swap entry point.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

sol! {
    #[sol(rpc)]
    interface IBroker {
        function swapIn(address tokenIn, address tokenOut, uint256 amountIn, uint256 minAmountOut) external returns (uint256);
    }
}

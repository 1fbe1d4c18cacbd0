//! Solidity bindings for the registry, lottery, entropy oracle and Multicall3

use alloy::sol;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface ILotteryRegistry {
        function getAllLotteriesCount() external view returns (uint256);

        function getAllLotteries(uint256 start, uint256 limit) external view returns (address[]);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface ILottery {
        function status() external view returns (uint8);
        function paused() external view returns (bool);
        function deadline() external view returns (uint64);
        function getSold() external view returns (uint256);
        function maxTickets() external view returns (uint64);
        function entropy() external view returns (address);
        function entropyProvider() external view returns (address);

        /// Settle an expired or sold-out lottery; value pays the randomness fee
        function finalize() external payable;
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IEntropy {
        function getFee(address provider) external view returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct CallResult {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (CallResult[] memory returnData);
    }
}

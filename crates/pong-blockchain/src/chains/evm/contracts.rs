use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    contract PingPong {
        event Ping();
        event Pong(bytes32 txHash);

        function ping() external;
        function pinger() external view returns (address);
        function pong(bytes32 _txHash) external;
    }
}

use alloy::sol;

// Codegen for the deployed chat contract. The fragment is the whole
// surface: two writes, one read, one event.
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract ParleyChat {
        function registerSession(string memory sessionPubKey, address burnerAddress) external payable;
        function sendMessage(address to, string memory encryptedContent) external;
        function userSessionKeys(address user) external view returns (string memory);
        event MessageSent(address indexed from, address indexed to, string encryptedContent, uint256 timestamp);
    }
}

/// Parley Chain Gateway
///
/// Everything that touches the chain lives here: provider construction,
/// the typed contract surface, registration and send writes, and the
/// event-log inbox. The contract ABI is fixed; the endpoint is not.
pub mod contract;
pub mod gateway;
pub mod inbox;

pub use gateway::ChainGateway;

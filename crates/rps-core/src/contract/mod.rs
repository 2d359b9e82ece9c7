//! Game contract client abstraction.

pub mod abi;
mod mock;
mod rpc;
mod traits;

pub use mock::{MockRpsContract, WriteCall};
pub use rpc::RpcRpsContract;
pub use traits::{ContractError, RpsContract};

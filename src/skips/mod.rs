pub mod ledger;
pub mod storage;

pub use ledger::*;
pub use storage::*;

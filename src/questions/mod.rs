pub mod filter;
pub mod pack_info;
pub mod source;

pub use filter::*;
pub use pack_info::*;
pub use source::*;

pub mod countdown;
pub mod limits;
pub mod status;

pub use countdown::*;
pub use limits::*;
pub use status::*;

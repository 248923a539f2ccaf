pub mod analytics;
pub mod background;
pub mod identity;
pub mod session;
pub mod state;

pub use analytics::*;
pub use background::*;
pub use identity::*;
pub use session::*;
pub use state::*;

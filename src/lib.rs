//! Question delivery for the couples swipe screen: feeds, gating, skips and answers.

pub mod config;
pub mod gating;
pub mod media;
pub mod questions;
pub mod skips;
pub mod store;
pub mod swipe;

pub use config::{AppConfig, ConfigError};
pub use store::{RemoteStore, StoreError, SupabaseStore};
pub use swipe::{
    AnalyticsSink, Identity, IdentitySource, LogAnalytics, ScreenState, SessionParams, SessionSnapshot,
    SharedIdentity, SwipeAction, SwipeDeps, SwipeSession,
};

/// Sets up env_logger at `info` unless `RUST_LOG` says otherwise. Safe to call twice.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

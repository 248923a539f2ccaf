pub mod models;
pub mod supabase;

pub use models::*;
pub use supabase::SupabaseStore;

use std::collections::HashSet;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Local I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Operations the swipe core consumes from the remote data store.
///
/// Every method is a single round trip. Callers own the retry and
/// fail-open policy; implementations just report what happened.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Server-ordered recommendation feed, optionally scoped to one pack.
    async fn recommended_questions(&self, pack_id: Option<&str>) -> Result<Vec<CandidateQuestion>>;

    /// The other member of the couple, if paired.
    async fn partner_id(&self, user_id: &str, couple_id: &str) -> Result<Option<String>>;

    async fn answered_question_ids(&self, user_id: &str, couple_id: &str) -> Result<HashSet<String>>;

    /// Partner responses with joined question and pack, oldest first.
    async fn partner_responses(&self, partner_id: &str, couple_id: &str) -> Result<Vec<PartnerResponse>>;

    /// `None` when the couple isn't fully formed.
    async fn answer_gap_status(&self) -> Result<Option<GapStatus>>;

    async fn daily_limit_status(&self) -> Result<Option<DailyLimitStatus>>;

    async fn submit_response(&self, submission: &ResponseSubmission) -> Result<SubmitOutcome>;

    /// Stores `bytes` at `path` and returns the durable reference.
    async fn upload_media(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    async fn enabled_pack_ids(&self, couple_id: &str) -> Result<Vec<String>>;

    async fn pack_context(&self, pack_id: &str) -> Result<Option<PackContext>>;
}

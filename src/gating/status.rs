use std::sync::Arc;
use log::error;
use serde::{Deserialize, Serialize};

use crate::store::{DailyLimitStatus, GapStatus, RemoteStore, Result};

/// Gap numbers worth showing. Only present when gating is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapInfo {
    pub unanswered: u32,
    pub threshold: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapCheck {
    pub is_blocked: bool,
    pub info: Option<GapInfo>,
}

impl GapCheck {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn from_status(status: Option<GapStatus>) -> Self {
        match status {
            Some(status) => GapCheck {
                is_blocked: status.is_blocked,
                info: (status.threshold > 0).then(|| GapInfo {
                    unanswered: status.unanswered_by_partner,
                    threshold: status.threshold,
                }),
            },
            None => GapCheck::open(),
        }
    }
}

/// Result of reading both throughput limits together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatingSnapshot {
    pub gap: GapCheck,
    pub daily: Option<DailyLimitStatus>,
}

/// Read-only queries for the couple's throughput state.
///
/// The raw `fetch_*` calls surface errors. The `check_*` calls apply the
/// fail-open policy: any error reads as "not blocked".
#[derive(Clone)]
pub struct GatingFetcher {
    store: Arc<dyn RemoteStore>,
}

impl GatingFetcher {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn fetch_answer_gap_status(&self) -> Result<Option<GapStatus>> {
        self.store.answer_gap_status().await
    }

    pub async fn fetch_daily_limit_status(&self) -> Result<Option<DailyLimitStatus>> {
        self.store.daily_limit_status().await
    }

    /// Gap gating needs a formed couple; without one it is simply off.
    pub async fn check_answer_gap(&self, paired: bool) -> GapCheck {
        if !paired {
            return GapCheck::open();
        }

        match self.fetch_answer_gap_status().await {
            Ok(status) => GapCheck::from_status(status),
            Err(e) => {
                error!("Failed to check answer gap: {}", e);
                GapCheck::open()
            }
        }
    }

    pub async fn check_daily_limit(&self) -> Option<DailyLimitStatus> {
        match self.fetch_daily_limit_status().await {
            Ok(status) => status,
            Err(e) => {
                error!("Failed to check daily limit: {}", e);
                None
            }
        }
    }

    /// Both reads run concurrently.
    pub async fn check_all(&self, paired: bool) -> GatingSnapshot {
        let (gap, daily) = tokio::join!(self.check_answer_gap(paired), self.check_daily_limit());
        GatingSnapshot { gap, daily }
    }
}

use std::sync::Arc;
use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::skips::SkipLedger;

/// Side effects the screen fires without waiting on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundTask {
    RecordSkip { question_id: String, skipped_at_ms: i64 },
}

#[derive(Clone)]
pub struct BackgroundQueue {
    tx: mpsc::UnboundedSender<BackgroundTask>,
}

impl BackgroundQueue {
    pub fn record_skip(&self, question_id: &str) {
        let task = BackgroundTask::RecordSkip {
            question_id: question_id.to_string(),
            skipped_at_ms: Utc::now().timestamp_millis(),
        };
        if self.tx.send(task).is_err() {
            warn!("Background worker stopped, skip of {} not recorded", question_id);
        }
    }
}

/// Single consumer for queued side effects, so ledger writes never interleave.
pub struct BackgroundWorker {
    rx: mpsc::UnboundedReceiver<BackgroundTask>,
    ledger: Arc<SkipLedger>,
}

pub fn background_channel(ledger: Arc<SkipLedger>) -> (BackgroundQueue, BackgroundWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BackgroundQueue { tx }, BackgroundWorker { rx, ledger })
}

impl BackgroundWorker {
    /// Runs until every queue handle is dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.rx.recv().await {
            self.execute(task).await;
        }
        info!("Background worker stopped");
    }

    /// Executes whatever is queued right now and returns how many tasks ran.
    pub async fn drain(&mut self) -> usize {
        let mut executed = 0;
        while let Ok(task) = self.rx.try_recv() {
            self.execute(task).await;
            executed += 1;
        }
        executed
    }

    async fn execute(&self, task: BackgroundTask) {
        debug!("Running background task {:?}", task);
        match task {
            BackgroundTask::RecordSkip { question_id, skipped_at_ms } => {
                self.ledger.skip_at(&question_id, skipped_at_ms).await;
            }
        }
    }
}

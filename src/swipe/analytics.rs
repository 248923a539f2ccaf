use log::info;

use crate::store::Answer;

/// Product analytics emitted by the swipe screen.
pub trait AnalyticsSink: Send + Sync {
    fn question_skipped(&self);
    fn question_answered(&self, answer: Answer, pack_id: Option<&str>);
    fn all_questions_exhausted(&self);
}

/// Default sink: just logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn question_skipped(&self) {
        info!("[analytics] question_skipped");
    }

    fn question_answered(&self, answer: Answer, pack_id: Option<&str>) {
        info!("[analytics] question_answered answer={} pack={}", answer.as_str(), pack_id.unwrap_or("-"));
    }

    fn all_questions_exhausted(&self) {
        info!("[analytics] all_questions_exhausted");
    }
}

use std::sync::Arc;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::store::{CandidateQuestion, RemoteStore, Result};
use super::filter::{filter_supported, promote_question};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Server recommendations, optionally scoped to one pack.
    #[default]
    Recommended,
    /// Questions the partner answered that the user hasn't.
    Pending,
}

/// Produces the candidate queue for either feed.
#[derive(Clone)]
pub struct QuestionSource {
    store: Arc<dyn RemoteStore>,
}

impl QuestionSource {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn recommended(&self, pack_id: Option<&str>) -> Result<Vec<CandidateQuestion>> {
        let questions = self.store.recommended_questions(pack_id).await?;
        debug!("Recommendation feed returned {} questions (pack: {:?})", questions.len(), pack_id);
        Ok(filter_supported(questions))
    }

    /// Rebuilds the pending queue from the partner's responses, oldest first.
    /// `start_question_id` (e.g. from a notification) is moved to the front.
    pub async fn pending(
        &self,
        user_id: &str,
        couple_id: &str,
        start_question_id: Option<&str>,
    ) -> Result<Vec<CandidateQuestion>> {
        let partner_id = match self.store.partner_id(user_id, couple_id).await? {
            Some(id) => id,
            None => {
                info!("No partner in couple {}, pending queue is empty", couple_id);
                return Ok(Vec::new());
            }
        };

        let answered = self.store.answered_question_ids(user_id, couple_id).await?;
        let mut responses = self.store.partner_responses(&partner_id, couple_id).await?;
        responses.sort_by_key(|r| r.created_at);

        let pending: Vec<CandidateQuestion> = responses
            .into_iter()
            .filter(|r| !answered.contains(&r.question_id))
            .filter_map(|r| r.question)
            .filter(|joined| joined.question.deleted_at.is_none())
            .map(|joined| {
                let mut question = joined.question;
                if let Some(pack) = joined.pack {
                    question.pack_id = Some(pack.id);
                    question.pack_name = Some(pack.name);
                    question.pack_icon = pack.icon;
                }
                question
            })
            .collect();

        let ordered = match start_question_id {
            Some(start) => promote_question(pending, start),
            None => pending,
        };

        info!("Pending queue has {} questions", ordered.len());
        Ok(filter_supported(ordered))
    }
}

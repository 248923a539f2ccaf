use std::collections::HashSet;
use log::debug;

use crate::store::CandidateQuestion;

pub fn filter_supported(questions: Vec<CandidateQuestion>) -> Vec<CandidateQuestion> {
    questions.into_iter().filter(|q| q.is_supported()).collect()
}

/// Drops recently skipped questions, unless that would leave nothing.
/// A feed that is entirely skips is shown as-is rather than as a blank screen.
pub fn filter_skipped(questions: Vec<CandidateQuestion>, skipped: &HashSet<String>) -> Vec<CandidateQuestion> {
    if skipped.is_empty() {
        return questions;
    }

    let remaining: Vec<CandidateQuestion> = questions
        .iter()
        .filter(|q| !skipped.contains(&q.id))
        .cloned()
        .collect();

    if remaining.is_empty() && !questions.is_empty() {
        debug!("All {} candidates were skipped recently, showing them anyway", questions.len());
        return questions;
    }

    remaining
}

/// Keeps questions from the couple's enabled packs. An empty enabled set
/// means "not loaded" and filters nothing.
pub fn filter_enabled_packs(questions: Vec<CandidateQuestion>, enabled: &[String]) -> Vec<CandidateQuestion> {
    if enabled.is_empty() {
        return questions;
    }

    let enabled: HashSet<&str> = enabled.iter().map(String::as_str).collect();
    questions
        .into_iter()
        .filter(|q| q.pack_id.as_deref().map_or(false, |id| enabled.contains(id)))
        .collect()
}

/// Moves `start_id` to the front, leaving everything else in order.
pub fn promote_question(mut questions: Vec<CandidateQuestion>, start_id: &str) -> Vec<CandidateQuestion> {
    if let Some(pos) = questions.iter().position(|q| q.id == start_id) {
        let tapped = questions.remove(pos);
        questions.insert(0, tapped);
    }
    questions
}

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use pairdeck_lib::skips::{MemoryKeyValueStore, SkipLedger};
use pairdeck_lib::store::{
    Answer, CandidateQuestion, DailyLimitStatus, GapStatus, MatchSignal, PackContext, PartnerResponse,
    RemoteStore, ResponseSubmission, Result, StoreError, SubmitOutcome,
};
use pairdeck_lib::swipe::{
    AnalyticsSink, BackgroundWorker, Identity, SessionParams, SharedIdentity, SwipeDeps, SwipeSession,
};

/// Holds a store call open until the test releases it.
struct Gate {
    entered: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

pub struct GateHandle {
    entered: Option<oneshot::Receiver<()>>,
    release: Option<oneshot::Sender<()>>,
}

impl GateHandle {
    pub async fn entered(&mut self) {
        if let Some(rx) = self.entered.take() {
            rx.await.expect("gated call never started");
        }
    }

    pub fn release(&mut self) {
        if let Some(tx) = self.release.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub path: String,
    pub size: usize,
    pub content_type: String,
}

#[derive(Default)]
pub struct FakeStore {
    recommended_script: Mutex<VecDeque<Result<Vec<CandidateQuestion>>>>,
    pub recommended: Mutex<Vec<CandidateQuestion>>,
    pub partner: Mutex<Option<String>>,
    pub answered: Mutex<HashSet<String>>,
    pub partner_responses: Mutex<Vec<PartnerResponse>>,
    pub gap: Mutex<Option<GapStatus>>,
    pub daily: Mutex<Option<DailyLimitStatus>>,
    pub enabled_packs: Mutex<Vec<String>>,
    pub pack_contexts: Mutex<HashMap<String, PackContext>>,
    pub match_on: Mutex<HashSet<String>>,
    pub fail_gating: AtomicBool,
    pub fail_submit: AtomicBool,
    pub fail_upload: AtomicBool,
    pub fail_pending: AtomicBool,
    pub submissions: Mutex<Vec<ResponseSubmission>>,
    pub uploads: Mutex<Vec<Upload>>,
    calls: Mutex<Vec<&'static str>>,
    gates: Mutex<HashMap<&'static str, VecDeque<Gate>>>,
}

fn server_error(body: &str) -> StoreError {
    StoreError::Status { status: 500, body: body.to_string() }
}

impl FakeStore {
    pub fn new() -> Self {
        let store = Self::default();
        *store.partner.lock() = Some("u2".to_string());
        *store.enabled_packs.lock() = vec!["p1".to_string()];
        store
    }

    /// Responses for the next recommendation calls, consumed in call order.
    /// Once exhausted, `recommended` is served.
    pub fn script_recommended(&self, responses: Vec<Result<Vec<CandidateQuestion>>>) {
        self.recommended_script.lock().extend(responses);
    }

    /// The next call to `method` blocks until the handle is released.
    pub fn gate(&self, method: &'static str) -> GateHandle {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.gates
            .lock()
            .entry(method)
            .or_default()
            .push_back(Gate { entered: entered_tx, release: release_rx });
        GateHandle { entered: Some(entered_rx), release: Some(release_tx) }
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == method).count()
    }

    pub fn submissions(&self) -> Vec<ResponseSubmission> {
        self.submissions.lock().clone()
    }

    async fn enter(&self, method: &'static str) {
        self.calls.lock().push(method);
        let gate = self.gates.lock().get_mut(method).and_then(|q| q.pop_front());
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.release.await;
        }
    }

    fn gating_result<T: Clone>(&self, value: &Mutex<Option<T>>) -> Result<Option<T>> {
        if self.fail_gating.load(Ordering::SeqCst) {
            return Err(server_error("gating unavailable"));
        }
        Ok(value.lock().clone())
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn recommended_questions(&self, _pack_id: Option<&str>) -> Result<Vec<CandidateQuestion>> {
        let scripted = self.recommended_script.lock().pop_front();
        self.enter("recommended_questions").await;
        match scripted {
            Some(response) => response,
            None => Ok(self.recommended.lock().clone()),
        }
    }

    async fn partner_id(&self, _user_id: &str, _couple_id: &str) -> Result<Option<String>> {
        self.enter("partner_id").await;
        Ok(self.partner.lock().clone())
    }

    async fn answered_question_ids(&self, _user_id: &str, _couple_id: &str) -> Result<HashSet<String>> {
        self.enter("answered_question_ids").await;
        Ok(self.answered.lock().clone())
    }

    async fn partner_responses(&self, _partner_id: &str, _couple_id: &str) -> Result<Vec<PartnerResponse>> {
        self.enter("partner_responses").await;
        if self.fail_pending.load(Ordering::SeqCst) {
            return Err(server_error("responses unavailable"));
        }
        Ok(self.partner_responses.lock().clone())
    }

    async fn answer_gap_status(&self) -> Result<Option<GapStatus>> {
        self.enter("answer_gap_status").await;
        self.gating_result(&self.gap)
    }

    async fn daily_limit_status(&self) -> Result<Option<DailyLimitStatus>> {
        self.enter("daily_limit_status").await;
        self.gating_result(&self.daily)
    }

    async fn submit_response(&self, submission: &ResponseSubmission) -> Result<SubmitOutcome> {
        self.enter("submit_response").await;
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(server_error("submit failed"));
        }
        self.submissions.lock().push(submission.clone());

        let matched = (submission.answer != Answer::No && self.match_on.lock().contains(&submission.question_id))
            .then(|| MatchSignal {
                id: Some(format!("m-{}", submission.question_id)),
                question_id: Some(submission.question_id.clone()),
                match_type: None,
            });
        Ok(SubmitOutcome { matched })
    }

    async fn upload_media(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.enter("upload_media").await;
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(server_error("bucket full"));
        }
        self.uploads.lock().push(Upload {
            path: path.to_string(),
            size: bytes.len(),
            content_type: content_type.to_string(),
        });
        Ok(path.to_string())
    }

    async fn enabled_pack_ids(&self, _couple_id: &str) -> Result<Vec<String>> {
        self.enter("enabled_pack_ids").await;
        Ok(self.enabled_packs.lock().clone())
    }

    async fn pack_context(&self, pack_id: &str) -> Result<Option<PackContext>> {
        self.enter("pack_context").await;
        Ok(self.pack_contexts.lock().get(pack_id).cloned())
    }
}

#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<String>>,
}

impl RecordingAnalytics {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.starts_with(name)).count()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn question_skipped(&self) {
        self.events.lock().push("question_skipped".to_string());
    }

    fn question_answered(&self, answer: Answer, pack_id: Option<&str>) {
        self.events
            .lock()
            .push(format!("question_answered:{}:{}", answer.as_str(), pack_id.unwrap_or("-")));
    }

    fn all_questions_exhausted(&self) {
        self.events.lock().push("all_questions_exhausted".to_string());
    }
}

pub fn paired_identity() -> Identity {
    Identity {
        user_id: Some("u1".to_string()),
        couple_id: Some("c1".to_string()),
        partner_id: Some("u2".to_string()),
    }
}

pub struct Harness {
    pub store: Arc<FakeStore>,
    pub ledger: Arc<SkipLedger>,
    pub analytics: Arc<RecordingAnalytics>,
    pub identity: Arc<SharedIdentity>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(FakeStore::new()),
            ledger: Arc::new(SkipLedger::new(Arc::new(MemoryKeyValueStore::new()))),
            analytics: Arc::new(RecordingAnalytics::default()),
            identity: Arc::new(SharedIdentity::new(paired_identity())),
        }
    }

    pub fn session(&self, params: SessionParams) -> (Arc<SwipeSession>, BackgroundWorker) {
        let (session, worker) = SwipeSession::new(
            SwipeDeps {
                store: self.store.clone(),
                identity: self.identity.clone(),
                ledger: self.ledger.clone(),
                analytics: self.analytics.clone(),
            },
            params,
        );
        (Arc::new(session), worker)
    }
}

pub fn question(id: &str) -> CandidateQuestion {
    question_in_pack(id, "p1")
}

pub fn question_in_pack(id: &str, pack_id: &str) -> CandidateQuestion {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "pack_id": pack_id,
        "text": format!("Question {}", id),
    }))
    .unwrap()
}

pub fn questions(ids: &[&str]) -> Vec<CandidateQuestion> {
    ids.iter().map(|id| question(id)).collect()
}

pub fn daily(responses_today: u32, limit_value: u32, reset_at: Option<DateTime<Utc>>) -> DailyLimitStatus {
    DailyLimitStatus {
        responses_today,
        limit_value,
        remaining: limit_value.saturating_sub(responses_today),
        reset_at,
        is_blocked: limit_value > 0 && responses_today >= limit_value,
    }
}

pub fn partner_response(question_id: &str, created_at: &str, deleted: bool) -> PartnerResponse {
    let deleted_at: Option<&str> = if deleted { Some("2024-01-01T00:00:00Z") } else { None };
    serde_json::from_value(serde_json::json!({
        "id": format!("r-{}", question_id),
        "question_id": question_id,
        "created_at": created_at,
        "question": {
            "id": question_id,
            "text": format!("Question {}", question_id),
            "deleted_at": deleted_at,
            "pack": { "id": "p1", "name": "Romance", "icon": "heart" }
        }
    }))
    .unwrap()
}

pub fn ids(questions: &[CandidateQuestion]) -> Vec<String> {
    questions.iter().map(|q| q.id.clone()).collect()
}

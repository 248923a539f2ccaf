use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::gating::{countdown_state, GatingFetcher};
use crate::media::{MediaKind, MediaUploader};
use crate::questions::{build_pack_info, filter_enabled_packs, filter_skipped, FeedMode, PackInfo, QuestionSource};
use crate::skips::SkipLedger;
use crate::store::{Answer, CandidateQuestion, RemoteStore, ResponseData, ResponseSubmission};
use super::analytics::AnalyticsSink;
use super::background::{background_channel, BackgroundQueue, BackgroundWorker};
use super::identity::{Identity, IdentitySource};
use super::state::{reduce, GatingUpdate, ScreenState, SessionEvent, SessionSnapshot, SessionState};

/// Seconds between refetches while the reset time has passed but the server still blocks.
const EXPIRED_RETRY_SECS: i64 = 5;

/// Which feed the screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    pub pack_id: Option<String>,
    pub mode: FeedMode,
    /// Pending mode only: question to show first.
    pub start_question_id: Option<String>,
}

pub struct SwipeDeps {
    pub store: Arc<dyn RemoteStore>,
    pub identity: Arc<dyn IdentitySource>,
    pub ledger: Arc<SkipLedger>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeAction {
    Answer(Answer),
    Skip,
}

/// Drives the swipe screen: fetching, gating, answering and skipping.
///
/// All mutable state lives behind one lock and changes only through
/// [`reduce`]. The lock is never held across an await.
pub struct SwipeSession {
    store: Arc<dyn RemoteStore>,
    identity: Arc<dyn IdentitySource>,
    ledger: Arc<SkipLedger>,
    analytics: Arc<dyn AnalyticsSink>,
    source: QuestionSource,
    gating: GatingFetcher,
    uploader: MediaUploader,
    background: BackgroundQueue,
    params: Mutex<SessionParams>,
    state: Mutex<SessionState>,
    focused_once: AtomicBool,
    /// Mode of the last completed context load; `None` while one is running.
    loaded_mode: Mutex<Option<FeedMode>>,
    /// Reset time seen by the last expiry refetch and when that refetch started.
    last_reset_refetch: Mutex<Option<(DateTime<Utc>, DateTime<Utc>)>>,
    countdown_refetching: AtomicBool,
}

impl SwipeSession {
    /// The returned worker must be run (or drained) for skips to be persisted.
    pub fn new(deps: SwipeDeps, params: SessionParams) -> (Self, BackgroundWorker) {
        let (background, worker) = background_channel(deps.ledger.clone());
        let state = SessionState::new(params.pack_id.clone(), params.mode);

        let session = SwipeSession {
            source: QuestionSource::new(deps.store.clone()),
            gating: GatingFetcher::new(deps.store.clone()),
            uploader: MediaUploader::new(deps.store.clone()),
            store: deps.store,
            identity: deps.identity,
            ledger: deps.ledger,
            analytics: deps.analytics,
            background,
            params: Mutex::new(params),
            state: Mutex::new(state),
            focused_once: AtomicBool::new(false),
            loaded_mode: Mutex::new(None),
            last_reset_refetch: Mutex::new(None),
            countdown_refetching: AtomicBool::new(false),
        };
        (session, worker)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().snapshot()
    }

    pub fn screen(&self) -> ScreenState {
        self.state.lock().screen.clone()
    }

    /// The filtered queue behind the deck.
    pub fn queue(&self) -> Vec<CandidateQuestion> {
        self.state.lock().questions.clone()
    }

    pub fn current_question(&self) -> Option<CandidateQuestion> {
        self.state.lock().current_question().cloned()
    }

    pub fn pack_info(&self, question: &CandidateQuestion) -> Option<PackInfo> {
        let state = self.state.lock();
        build_pack_info(state.pack_id.as_deref(), state.pack_context.as_ref(), question)
    }

    pub fn params(&self) -> SessionParams {
        self.params.lock().clone()
    }

    fn mode(&self) -> FeedMode {
        self.params.lock().mode
    }

    /// Reduces one event; fires exhaustion analytics when it is the one that ran the queue dry.
    fn apply(&self, event: SessionEvent) -> bool {
        let (applied, exhausted) = {
            let mut state = self.state.lock();
            let applied = reduce(&mut state, event);
            (applied, applied && state.take_exhaustion_report())
        };
        if exhausted {
            self.analytics.all_questions_exhausted();
        }
        applied
    }

    fn begin_fetch(&self, identity: &Identity) -> u64 {
        let mut state = self.state.lock();
        reduce(&mut state, SessionEvent::FetchStarted { pairing: identity.pairing() });
        state.fetch_epoch
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.state.lock().fetch_epoch == epoch
    }

    pub async fn mount(&self) {
        info!("🃏 Swipe session mounted");
        self.load_context().await;
    }

    /// Re-fetches on every focus except the one that comes with mounting,
    /// and except while a context load for another mode is still running.
    pub async fn on_focus(&self) {
        if !self.focused_once.swap(true, Ordering::SeqCst) {
            debug!("First focus, fetch already issued by mount");
            return;
        }
        let mode = self.mode();
        if *self.loaded_mode.lock() != Some(mode) {
            debug!("Focus during {:?} context load, fetch already issued", mode);
            return;
        }
        self.refresh().await;
    }

    /// Switches pack or mode. Resets the cursor and gating before fetching.
    pub async fn change_context(&self, params: SessionParams) {
        info!("🔀 Swipe context changed: pack={:?} mode={:?}", params.pack_id, params.mode);
        *self.params.lock() = params;
        self.load_context().await;
    }

    async fn load_context(&self) {
        let params = self.params();
        let identity = self.identity.identity();

        *self.loaded_mode.lock() = None;
        self.apply(SessionEvent::ContextReset {
            pack_id: params.pack_id.clone(),
            mode: params.mode,
        });
        tokio::join!(
            self.ensure_enabled_packs(&identity),
            self.load_pack_context(params.pack_id.as_deref()),
        );
        self.refresh().await;

        if self.mode() == params.mode {
            *self.loaded_mode.lock() = Some(params.mode);
        }
    }

    async fn ensure_enabled_packs(&self, identity: &Identity) {
        let Some(couple_id) = identity.couple_id.as_deref() else {
            return;
        };
        let known = self
            .state
            .lock()
            .enabled_packs
            .as_ref()
            .map_or(false, |ids| !ids.is_empty());
        if known {
            return;
        }

        match self.store.enabled_pack_ids(couple_id).await {
            Ok(ids) => {
                debug!("Couple {} has {} enabled packs", couple_id, ids.len());
                self.apply(SessionEvent::EnabledPacksLoaded(ids));
            }
            Err(e) => error!("Failed to load enabled packs: {}", e),
        }
    }

    async fn load_pack_context(&self, pack_id: Option<&str>) {
        let Some(pack_id) = pack_id else {
            return;
        };
        let context = match self.store.pack_context(pack_id).await {
            Ok(context) => context,
            Err(e) => {
                error!("Failed to load pack {}: {}", pack_id, e);
                None
            }
        };
        self.apply(SessionEvent::PackContextLoaded {
            pack_id: pack_id.to_string(),
            context,
        });
    }

    /// Re-issues the fetch for the current mode.
    pub async fn refresh(&self) {
        match self.mode() {
            FeedMode::Recommended => self.fetch_questions().await,
            FeedMode::Pending => self.fetch_pending().await,
        }
    }

    /// Loads the recommendation feed. Only the most recently started fetch commits.
    pub async fn fetch_questions(&self) {
        let identity = self.identity.identity();
        let pack_id = self.params.lock().pack_id.clone();
        let epoch = self.begin_fetch(&identity);

        let (fetched, skipped) = tokio::join!(
            self.source.recommended(pack_id.as_deref()),
            self.ledger.active_skipped_ids(),
        );

        let questions = match fetched {
            Ok(questions) => questions,
            Err(e) => {
                error!("Failed to fetch questions: {}", e);
                self.apply(SessionEvent::FetchFailed { epoch });
                return;
            }
        };

        if !self.is_current(epoch) {
            debug!("Dropping superseded question fetch #{}", epoch);
            return;
        }

        let questions = if pack_id.is_none() {
            let enabled = self.state.lock().enabled_packs.clone().unwrap_or_default();
            filter_enabled_packs(questions, &enabled)
        } else {
            questions
        };
        let questions = filter_skipped(questions, &skipped);

        let gating = if identity.has_partner() && pack_id.is_none() {
            GatingUpdate::Checked(self.gating.check_all(identity.is_paired()).await)
        } else {
            GatingUpdate::Cleared
        };

        let count = questions.len();
        if self.apply(SessionEvent::QueueLoaded { epoch, questions, gating }) {
            info!("📥 Loaded {} questions (fetch #{})", count, epoch);
        } else {
            debug!("Dropping superseded question fetch #{}", epoch);
        }
    }

    /// Loads questions the partner answered first. Errors leave an empty queue.
    pub async fn fetch_pending(&self) {
        let identity = self.identity.identity();
        let start = self.params.lock().start_question_id.clone();
        let epoch = self.begin_fetch(&identity);

        let questions = match (identity.user_id.as_deref(), identity.couple_id.as_deref()) {
            (Some(user_id), Some(couple_id)) => {
                match self.source.pending(user_id, couple_id, start.as_deref()).await {
                    Ok(questions) => questions,
                    Err(e) => {
                        error!("Failed to fetch pending questions: {}", e);
                        Vec::new()
                    }
                }
            }
            _ => {
                debug!("No user or couple, pending queue is empty");
                Vec::new()
            }
        };

        let count = questions.len();
        let event = SessionEvent::QueueLoaded { epoch, questions, gating: GatingUpdate::Cleared };
        if self.apply(event) {
            info!("📥 Loaded {} pending questions (fetch #{})", count, epoch);
        } else {
            debug!("Dropping superseded pending fetch #{}", epoch);
        }
    }

    /// Handles a swipe on `question_id`.
    ///
    /// Skips advance immediately and are persisted in the background. Answers
    /// upload any media, submit, then advance (or celebrate a match first).
    /// A failed submission still advances so the user is never stuck.
    /// Nothing moves the cursor if a newer fetch replaced the queue meanwhile.
    pub async fn handle_answer(&self, question_id: &str, action: SwipeAction, response_data: Option<ResponseData>) {
        let epoch = self.state.lock().fetch_epoch;
        let answer = match action {
            SwipeAction::Skip => {
                self.apply(SessionEvent::Advanced { epoch });
                self.background.record_skip(question_id);
                self.analytics.question_skipped();
                return;
            }
            SwipeAction::Answer(answer) => answer,
        };

        let identity = self.identity.identity();
        let response_data = self
            .resolve_response_data(response_data, question_id, identity.user_id.as_deref())
            .await;
        let submission = ResponseSubmission {
            question_id: question_id.to_string(),
            answer,
            response_data,
        };

        let outcome = match self.store.submit_response(&submission).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Submit response error for {}: {}", question_id, e);
                self.apply(SessionEvent::Advanced { epoch });
                return;
            }
        };

        let pack_id = self
            .state
            .lock()
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .and_then(|q| q.pack_id.clone());
        self.analytics.question_answered(answer, pack_id.as_deref());

        let advanced = if outcome.matched.is_some() {
            info!("💞 Match on question {}", question_id);
            self.apply(SessionEvent::MatchFound { epoch })
        } else {
            self.apply(SessionEvent::Advanced { epoch })
        };
        if !advanced {
            debug!("Answer to {} landed after the queue was replaced", question_id);
            return;
        }

        if self.mode() == FeedMode::Pending {
            return;
        }

        self.apply(SessionEvent::ResponseRecorded { epoch });
        let gating = self.gating.check_all(identity.is_paired()).await;
        if !self.apply(SessionEvent::GatingRefreshed { epoch, gating }) {
            debug!("Dropping gating refresh, a newer fetch owns the state");
        }
    }

    /// Swaps a local photo/audio path for its uploaded reference.
    /// Any upload problem drops the payload but keeps the answer.
    async fn resolve_response_data(
        &self,
        data: Option<ResponseData>,
        question_id: &str,
        user_id: Option<&str>,
    ) -> Option<ResponseData> {
        let data = data?;
        let (kind, local) = match &data {
            ResponseData::Photo { media_path } => (MediaKind::Photo, media_path.clone()),
            ResponseData::Audio { media_path, .. } => (MediaKind::Audio, media_path.clone()),
            _ => return Some(data),
        };
        if local.is_empty() {
            return Some(data);
        }
        let Some(user_id) = user_id else {
            warn!("No user id to namespace {} upload, submitting answer without it", kind.label());
            return None;
        };

        self.apply(SessionEvent::UploadStarted);
        let uploaded = self.uploader.upload(&local, question_id, kind, user_id).await;
        self.apply(SessionEvent::UploadFinished);

        let Some(media_path) = uploaded else {
            warn!("Submitting answer to {} without its {}", question_id, kind.label());
            return None;
        };
        match data {
            ResponseData::Audio { duration_seconds, .. } => Some(ResponseData::Audio { media_path, duration_seconds }),
            _ => Some(ResponseData::Photo { media_path }),
        }
    }

    /// Called when the match animation ends. Advances exactly once.
    pub fn complete_match_celebration(&self) {
        self.apply(SessionEvent::CelebrationFinished);
    }

    /// Re-reads the gap gate on demand. Returns whether the user is blocked.
    pub async fn check_answer_gap(&self) -> bool {
        let identity = self.identity.identity();
        let check = self.gating.check_answer_gap(identity.is_paired()).await;
        self.apply(SessionEvent::GapChecked(check));
        check.is_blocked
    }

    /// Updates the daily-limit countdown. Once the reset time passes, the
    /// feed is re-fetched. While the server keeps reporting the same reset
    /// time, further refetches wait `EXPIRED_RETRY_SECS` and never overlap.
    pub async fn tick_countdown(&self, now: DateTime<Utc>) {
        let reset_at = {
            let state = self.state.lock();
            state
                .daily_limit
                .as_ref()
                .filter(|d| d.is_blocked)
                .and_then(|d| d.reset_at)
        };
        let Some(reset_at) = reset_at else {
            return;
        };

        let countdown = countdown_state(reset_at, now);
        self.apply(SessionEvent::CountdownTicked(countdown.text));
        if !countdown.expired {
            return;
        }

        let due = {
            let mut last = self.last_reset_refetch.lock();
            let due = match *last {
                Some((seen, at)) => seen != reset_at || now - at >= chrono::Duration::seconds(EXPIRED_RETRY_SECS),
                None => true,
            };
            if due && !self.countdown_refetching.swap(true, Ordering::SeqCst) {
                *last = Some((reset_at, now));
                true
            } else {
                false
            }
        };
        if due {
            info!("⏰ Daily limit reset reached, refreshing questions");
            self.fetch_questions().await;
            self.countdown_refetching.store(false, Ordering::SeqCst);
        }
    }

    /// Ticks the countdown once a second until the handle is aborted.
    pub fn spawn_countdown(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                session.tick_countdown(Utc::now()).await;
            }
        })
    }
}

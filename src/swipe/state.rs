use serde::Serialize;

use crate::gating::{effective_total, GapCheck, GapInfo, GatingSnapshot};
use crate::questions::FeedMode;
use crate::store::{CandidateQuestion, DailyLimitStatus, PackContext};
use super::identity::Pairing;

/// What the screen shows. Exactly one at a time, derived from [`SessionState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScreenState {
    #[default]
    Loading,
    NoPartner { has_couple: bool },
    DailyLimitBlocked { limit: DailyLimitStatus, countdown: String },
    GapBlocked { unanswered: u32, threshold: u32 },
    NoPacks,
    Exhausted { pending_mode: bool, pack_scoped: bool },
    Active {
        index: usize,
        question: CandidateQuestion,
        effective_total: usize,
        total: usize,
        celebrating: bool,
    },
}

/// Gating outcome attached to a queue commit.
#[derive(Debug, Clone, PartialEq)]
pub enum GatingUpdate {
    /// Gating does not apply to this feed (pending, pack-scoped, unpaired).
    Cleared,
    Checked(GatingSnapshot),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ContextReset { pack_id: Option<String>, mode: FeedMode },
    EnabledPacksLoaded(Vec<String>),
    PackContextLoaded { pack_id: String, context: Option<PackContext> },
    FetchStarted { pairing: Pairing },
    QueueLoaded { epoch: u64, questions: Vec<CandidateQuestion>, gating: GatingUpdate },
    FetchFailed { epoch: u64 },
    GatingRefreshed { epoch: u64, gating: GatingSnapshot },
    GapChecked(GapCheck),
    /// Events tagged with an epoch belong to the queue that was live when the
    /// swipe started and are dropped once a newer fetch has begun.
    Advanced { epoch: u64 },
    MatchFound { epoch: u64 },
    CelebrationFinished,
    UploadStarted,
    UploadFinished,
    ResponseRecorded { epoch: u64 },
    CountdownTicked(String),
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub pack_id: Option<String>,
    pub mode: FeedMode,
    pub pairing: Pairing,
    /// Already filtered for support, skips and enabled packs.
    pub questions: Vec<CandidateQuestion>,
    pub current_index: usize,
    pub is_loading: bool,
    pub is_uploading: bool,
    pub gap: GapCheck,
    pub daily_limit: Option<DailyLimitStatus>,
    /// `None` until the couple's packs were read successfully.
    pub enabled_packs: Option<Vec<String>>,
    pub pack_context: Option<PackContext>,
    pub show_confetti: bool,
    pub advance_after_celebration: bool,
    pub countdown: String,
    pub fetch_epoch: u64,
    pub exhaustion_reported: bool,
    pub screen: ScreenState,
}

impl SessionState {
    pub fn new(pack_id: Option<String>, mode: FeedMode) -> Self {
        let mut state = SessionState {
            pack_id,
            mode,
            is_loading: true,
            ..Default::default()
        };
        state.screen = classify(&state);
        state
    }

    pub fn current_question(&self) -> Option<&CandidateQuestion> {
        self.questions.get(self.current_index)
    }

    pub fn effective_total(&self) -> usize {
        effective_total(
            self.questions.len(),
            self.gap.info.as_ref(),
            self.daily_limit.as_ref(),
            self.current_index,
        )
    }

    /// True exactly once per context, the first time a non-empty queue runs out.
    pub fn take_exhaustion_report(&mut self) -> bool {
        let exhausted = matches!(self.screen, ScreenState::Exhausted { .. });
        if exhausted && !self.questions.is_empty() && !self.exhaustion_reported {
            self.exhaustion_reported = true;
            return true;
        }
        false
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            screen: self.screen.clone(),
            mode: self.mode,
            pack_id: self.pack_id.clone(),
            current_index: self.current_index,
            total: self.questions.len(),
            effective_total: self.effective_total(),
            is_loading: self.is_loading,
            is_uploading: self.is_uploading,
            show_confetti: self.show_confetti,
            is_gap_blocked: self.gap.is_blocked,
            gap_info: self.gap.info,
            daily_limit: self.daily_limit.clone(),
            countdown: self.countdown.clone(),
            pack_context: self.pack_context.clone(),
        }
    }
}

/// Serializable view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub screen: ScreenState,
    pub mode: FeedMode,
    pub pack_id: Option<String>,
    pub current_index: usize,
    pub total: usize,
    pub effective_total: usize,
    pub is_loading: bool,
    pub is_uploading: bool,
    pub show_confetti: bool,
    pub is_gap_blocked: bool,
    pub gap_info: Option<GapInfo>,
    pub daily_limit: Option<DailyLimitStatus>,
    pub countdown: String,
    pub pack_context: Option<PackContext>,
}

/// Applies one event and re-derives the screen.
///
/// Returns `false` when the event was ignored, which only happens for results
/// of a fetch that is no longer the latest one.
pub fn reduce(state: &mut SessionState, event: SessionEvent) -> bool {
    match event {
        SessionEvent::ContextReset { pack_id, mode } => {
            state.pack_id = pack_id;
            state.mode = mode;
            state.questions.clear();
            state.current_index = 0;
            state.is_loading = true;
            state.gap = GapCheck::open();
            state.daily_limit = None;
            state.pack_context = None;
            state.show_confetti = false;
            state.advance_after_celebration = false;
            state.countdown.clear();
            state.exhaustion_reported = false;
        }
        SessionEvent::EnabledPacksLoaded(ids) => {
            state.enabled_packs = Some(ids);
        }
        SessionEvent::PackContextLoaded { pack_id, context } => {
            if state.pack_id.as_deref() != Some(pack_id.as_str()) {
                return false;
            }
            state.pack_context = context;
        }
        SessionEvent::FetchStarted { pairing } => {
            state.fetch_epoch += 1;
            state.pairing = pairing;
        }
        SessionEvent::QueueLoaded { epoch, questions, gating } => {
            if epoch != state.fetch_epoch {
                return false;
            }
            state.questions = questions;
            state.current_index = 0;
            state.advance_after_celebration = false;
            state.is_loading = false;
            apply_gating(state, gating);
        }
        SessionEvent::FetchFailed { epoch } => {
            if epoch != state.fetch_epoch {
                return false;
            }
            state.is_loading = false;
        }
        SessionEvent::GatingRefreshed { epoch, gating } => {
            if epoch != state.fetch_epoch {
                return false;
            }
            apply_gating(state, GatingUpdate::Checked(gating));
        }
        SessionEvent::GapChecked(gap) => {
            state.gap = gap;
        }
        SessionEvent::Advanced { epoch } => {
            if epoch != state.fetch_epoch {
                return false;
            }
            advance(state);
        }
        SessionEvent::MatchFound { epoch } => {
            if epoch != state.fetch_epoch {
                return false;
            }
            state.show_confetti = true;
            state.advance_after_celebration = true;
        }
        SessionEvent::CelebrationFinished => {
            if !state.show_confetti {
                return false;
            }
            state.show_confetti = false;
            if state.advance_after_celebration {
                advance(state);
            }
            state.advance_after_celebration = false;
        }
        SessionEvent::UploadStarted => state.is_uploading = true,
        SessionEvent::UploadFinished => state.is_uploading = false,
        SessionEvent::ResponseRecorded { epoch } => {
            if epoch != state.fetch_epoch {
                return false;
            }
            if let Some(daily) = state.daily_limit.as_mut() {
                daily.record_response();
            }
        }
        SessionEvent::CountdownTicked(text) => {
            state.countdown = text;
        }
    }

    state.screen = classify(state);
    true
}

/// Moves the cursor one card on, stopping just past the last card.
fn advance(state: &mut SessionState) {
    state.current_index = (state.current_index + 1).min(state.questions.len());
}

fn apply_gating(state: &mut SessionState, gating: GatingUpdate) {
    match gating {
        GatingUpdate::Cleared => {
            state.gap = GapCheck::open();
            state.daily_limit = None;
        }
        GatingUpdate::Checked(snapshot) => {
            state.gap = snapshot.gap;
            state.daily_limit = snapshot.daily;
        }
    }
    if !state.daily_limit.as_ref().map_or(false, |d| d.is_blocked) {
        state.countdown.clear();
    }
}

/// Precedence: loading, pairing, daily limit, gap, packs, exhaustion.
pub fn classify(state: &SessionState) -> ScreenState {
    if state.is_loading {
        return ScreenState::Loading;
    }

    if !state.pairing.has_partner {
        return ScreenState::NoPartner { has_couple: state.pairing.has_couple };
    }

    if let Some(daily) = state.daily_limit.as_ref().filter(|d| d.is_blocked) {
        return ScreenState::DailyLimitBlocked {
            limit: daily.clone(),
            countdown: state.countdown.clone(),
        };
    }

    if state.gap.is_blocked {
        if let Some(info) = state.gap.info {
            return ScreenState::GapBlocked {
                unanswered: info.unanswered,
                threshold: info.threshold,
            };
        }
    }

    let no_packs = state.enabled_packs.as_ref().map_or(false, |ids| ids.is_empty());
    if state.pack_id.is_none() && no_packs {
        return ScreenState::NoPacks;
    }

    match state.current_question() {
        Some(question) => ScreenState::Active {
            index: state.current_index,
            question: question.clone(),
            effective_total: state.effective_total(),
            total: state.questions.len(),
            celebrating: state.show_confetti,
        },
        None => ScreenState::Exhausted {
            pending_mode: state.mode == FeedMode::Pending,
            pack_scoped: state.pack_id.is_some(),
        },
    }
}

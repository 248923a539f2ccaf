use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Question types the swipe screen knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Swipe,
    TextAnswer,
    Audio,
    Photo,
    WhoLikely,
    /// Anything newer than this client.
    #[serde(other)]
    Unsupported,
}

impl QuestionType {
    pub fn is_supported(&self) -> bool {
        !matches!(self, QuestionType::Unsupported)
    }
}

fn default_intensity() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuestion {
    pub id: String,
    #[serde(default)]
    pub pack_id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub partner_text: Option<String>,
    #[serde(default = "default_intensity")]
    pub intensity: u8, // 1-5
    #[serde(default)]
    pub allowed_couple_genders: Option<Vec<String>>,
    #[serde(default)]
    pub target_user_genders: Option<Vec<String>>,
    #[serde(default)]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pack_name: Option<String>,
    #[serde(default)]
    pub pack_icon: Option<String>,
}

impl CandidateQuestion {
    /// Untyped legacy rows are plain swipe cards.
    pub fn is_supported(&self) -> bool {
        self.question_type.map_or(true, |t| t.is_supported())
    }

    pub fn max_audio_duration_seconds(&self) -> Option<u64> {
        self.config
            .as_ref()
            .and_then(|c| c.get("max_duration_seconds"))
            .and_then(|v| v.as_u64())
    }
}

/// Pack columns joined onto a partner response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedQuestion {
    #[serde(flatten)]
    pub question: CandidateQuestion,
    #[serde(default)]
    pub pack: Option<PackRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerResponse {
    pub id: String,
    pub question_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub question: Option<JoinedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackContext {
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapStatus {
    pub is_blocked: bool,
    pub unanswered_by_partner: u32,
    pub threshold: u32, // 0 = gating disabled
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLimitStatus {
    pub responses_today: u32,
    pub limit_value: u32, // 0 = unlimited
    pub remaining: u32,
    #[serde(default)]
    pub reset_at: Option<DateTime<Utc>>,
    pub is_blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Yes,
    No,
    Maybe,
}

impl Answer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
            Answer::Maybe => "maybe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    YesYes,
    YesMaybe,
    MaybeMaybe,
}

/// Type-specific payload attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseData {
    TextAnswer { text: String },
    Photo { media_path: String },
    Audio { media_path: String, duration_seconds: f64 },
    WhoLikely { chosen_user_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSubmission {
    pub question_id: String,
    pub answer: Answer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_data: Option<ResponseData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSignal {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub match_type: Option<MatchType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    #[serde(default, rename = "match")]
    pub matched: Option<MatchSignal>,
}

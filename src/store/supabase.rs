use std::collections::HashSet;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::config::AppConfig;
use crate::questions::DEFAULT_PACK_ICON;
use super::{
    CandidateQuestion, DailyLimitStatus, GapStatus, PackContext, PartnerResponse, RemoteStore,
    ResponseSubmission, Result, StoreError, SubmitOutcome,
};

const PARTNER_RESPONSE_SELECT: &str =
    "id,question_id,created_at,question:questions(*,pack:question_packs(id,name,icon))";

#[derive(Deserialize)]
struct IdRow {
    id: String,
}

#[derive(Deserialize)]
struct QuestionIdRow {
    question_id: String,
}

#[derive(Deserialize)]
struct PackIdRow {
    pack_id: String,
}

#[derive(Deserialize)]
struct PackRow {
    name: String,
    #[serde(default)]
    icon: Option<String>,
}

/// HTTP client for the hosted store: PostgREST tables and RPCs, the
/// `submit-response` edge function and object storage.
pub struct SupabaseStore {
    client: Client,
    base_url: Url,
    api_key: String,
    access_token: RwLock<Option<String>>,
    media_bucket: String,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.supabase_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        info!("Remote store client ready for {}", base_url);

        Ok(Self {
            client,
            base_url,
            api_key: config.supabase_anon_key.clone(),
            access_token: RwLock::new(config.access_token.clone()),
            media_bucket: config.media_bucket.clone(),
        })
    }

    /// Swaps the user session token after a refresh.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write() = token;
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .access_token
            .read()
            .clone()
            .unwrap_or_else(|| self.api_key.clone());
        request.header("apikey", &self.api_key).bearer_auth(token)
    }

    async fn read_body(response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status { status: status.as_u16(), body });
        }
        Ok(body)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn rpc<T: DeserializeOwned>(&self, function: &str, args: serde_json::Value) -> Result<T> {
        let url = self.endpoint(&format!("rest/v1/rpc/{}", function))?;
        debug!("RPC {}", function);
        let response = self.authorize(self.client.post(url)).json(&args).send().await?;
        Self::read_json(response).await
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;
        debug!("SELECT {} {:?}", table, query);
        let response = self.authorize(self.client.get(url)).query(query).send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl RemoteStore for SupabaseStore {
    async fn recommended_questions(&self, pack_id: Option<&str>) -> Result<Vec<CandidateQuestion>> {
        let rows: Option<Vec<CandidateQuestion>> = self
            .rpc("get_recommended_questions", json!({ "target_pack_id": pack_id }))
            .await?;
        Ok(rows.unwrap_or_default())
    }

    async fn partner_id(&self, user_id: &str, couple_id: &str) -> Result<Option<String>> {
        let rows: Vec<IdRow> = self
            .select(
                "profiles",
                &[
                    ("select", "id".to_string()),
                    ("couple_id", format!("eq.{}", couple_id)),
                    ("id", format!("neq.{}", user_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| row.id))
    }

    async fn answered_question_ids(&self, user_id: &str, couple_id: &str) -> Result<HashSet<String>> {
        let rows: Vec<QuestionIdRow> = self
            .select(
                "responses",
                &[
                    ("select", "question_id".to_string()),
                    ("user_id", format!("eq.{}", user_id)),
                    ("couple_id", format!("eq.{}", couple_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.question_id).collect())
    }

    async fn partner_responses(&self, partner_id: &str, couple_id: &str) -> Result<Vec<PartnerResponse>> {
        self.select(
            "responses",
            &[
                ("select", PARTNER_RESPONSE_SELECT.to_string()),
                ("user_id", format!("eq.{}", partner_id)),
                ("couple_id", format!("eq.{}", couple_id)),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn answer_gap_status(&self) -> Result<Option<GapStatus>> {
        let rows: Option<Vec<GapStatus>> = self.rpc("get_answer_gap_status", json!({})).await?;
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }

    async fn daily_limit_status(&self) -> Result<Option<DailyLimitStatus>> {
        let rows: Option<Vec<DailyLimitStatus>> = self
            .rpc("get_daily_response_limit_status", json!({}))
            .await?;
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }

    async fn submit_response(&self, submission: &ResponseSubmission) -> Result<SubmitOutcome> {
        let url = self.endpoint("functions/v1/submit-response")?;
        debug!("Submitting {} for question {}", submission.answer.as_str(), submission.question_id);
        let response = self
            .authorize(self.client.post(url))
            .json(submission)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn upload_media(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let url = self.endpoint(&format!("storage/v1/object/{}/{}", self.media_bucket, path))?;
        let size = bytes.len();
        let response = self
            .authorize(self.client.post(url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::read_body(response).await?;
        info!("Uploaded {} bytes to {}/{}", size, self.media_bucket, path);
        Ok(path.to_string())
    }

    async fn enabled_pack_ids(&self, couple_id: &str) -> Result<Vec<String>> {
        let rows: Vec<PackIdRow> = self
            .select(
                "couple_packs",
                &[
                    ("select", "pack_id".to_string()),
                    ("couple_id", format!("eq.{}", couple_id)),
                    ("enabled", "eq.true".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.pack_id).collect())
    }

    async fn pack_context(&self, pack_id: &str) -> Result<Option<PackContext>> {
        let rows: Vec<PackRow> = self
            .select(
                "question_packs",
                &[
                    ("select", "name,icon".to_string()),
                    ("id", format!("eq.{}", pack_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| PackContext {
            name: row.name,
            icon: row.icon.unwrap_or_else(|| DEFAULT_PACK_ICON.to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> AppConfig {
        AppConfig {
            supabase_url: url.to_string(),
            supabase_anon_key: "anon".to_string(),
            access_token: None,
            media_bucket: "response-media".to_string(),
            request_timeout_secs: 15,
            connect_timeout_secs: 5,
            storage_dir: ".pairdeck".into(),
            user_id: None,
            couple_id: None,
            partner_id: None,
        }
    }

    #[test]
    fn endpoints_keep_base_path() {
        let store = SupabaseStore::new(&config("https://proj.supabase.co/base")).unwrap();
        assert_eq!(
            store.endpoint("rest/v1/rpc/get_answer_gap_status").unwrap().as_str(),
            "https://proj.supabase.co/base/rest/v1/rpc/get_answer_gap_status"
        );
    }

    #[test]
    fn rejects_malformed_base_url() {
        assert!(matches!(
            SupabaseStore::new(&config("not a url")),
            Err(StoreError::InvalidUrl(_))
        ));
    }
}

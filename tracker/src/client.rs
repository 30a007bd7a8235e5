use std::collections::BTreeMap;
use std::time::Instant;

use reqwest::Url;
use serde::de::DeserializeOwned;
use taiga_stats_core::{AttributeDef, Item, StatusCatalog};

use crate::wire::{
    ApiErrorBody, AuthRequest, AuthResponse, Project, WireAttribute, WireAttributeValues,
    WireStatus, WireStory,
};
use crate::{Result, TrackerError};

const API_PREFIX: &str = "api/v1";
const USER_AGENT: &str = concat!("taiga-stats/", env!("CARGO_PKG_VERSION"));

/// Read-only Taiga REST client.
///
/// Calls are plain sequential requests; list endpoints are fetched unpaged.
#[derive(Debug, Clone)]
pub struct TaigaClient {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl TaigaClient {
    /// Create a client for the tracker at `base_url` (e.g. `https://api.taiga.io`).
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|e| TrackerError::InvalidConfig(format!("bad tracker url {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(TrackerError::InvalidConfig(format!(
                "tracker url {base_url:?} cannot be used as a base"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Exchange username and password for an auth token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let url = self.endpoint("auth")?;
        let body = AuthRequest {
            kind: "normal",
            username,
            password,
        };
        let response = self.http.post(url.clone()).json(&body).send().await?;
        let auth: AuthResponse = decode(url, response).await?;
        tracing::info!(username, "authenticated against tracker");
        Ok(auth.auth_token)
    }

    pub async fn projects(&self) -> Result<Vec<Project>> {
        self.get_json("projects", &[]).await
    }

    pub async fn project(&self, project_id: i64) -> Result<Project> {
        self.get_json(&format!("projects/{project_id}"), &[]).await
    }

    /// The project's story statuses, ordered.
    pub async fn statuses(&self, project_id: i64) -> Result<StatusCatalog> {
        let statuses: Vec<WireStatus> = self
            .get_json("userstory-statuses", &[("project", project_id.to_string())])
            .await?;
        Ok(StatusCatalog::new(
            statuses.into_iter().map(Into::into).collect(),
        ))
    }

    /// All user stories of the project. Custom attribute values are not
    /// included; see [`Self::attribute_values`].
    pub async fn stories(&self, project_id: i64) -> Result<Vec<Item>> {
        let stories: Vec<WireStory> = self
            .get_json("userstories", &[("project", project_id.to_string())])
            .await?;
        Ok(stories.into_iter().map(Into::into).collect())
    }

    pub async fn custom_attributes(&self, project_id: i64) -> Result<Vec<AttributeDef>> {
        let attrs: Vec<WireAttribute> = self
            .get_json(
                "userstory-custom-attributes",
                &[("project", project_id.to_string())],
            )
            .await?;
        Ok(attrs.into_iter().map(Into::into).collect())
    }

    /// Custom attribute values of one story, keyed by attribute id.
    pub async fn attribute_values(&self, story_id: i64) -> Result<BTreeMap<i64, String>> {
        let values: WireAttributeValues = self
            .get_json(
                &format!("userstories/custom-attributes-values/{story_id}"),
                &[],
            )
            .await?;
        Ok(values.into_map())
    }

    /// Fill in custom attribute values for each story, one request at a time.
    pub async fn load_attribute_values(&self, items: &mut [Item]) -> Result<()> {
        for item in items.iter_mut() {
            item.custom_attribute_values = self.attribute_values(item.id).await?;
        }
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("{API_PREFIX}/{path}"))
            .map_err(|e| TrackerError::InvalidConfig(format!("bad endpoint {path:?}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.endpoint(path)?;
        let mut request = self
            .http
            .get(url.clone())
            .query(query)
            .header("x-disable-pagination", "True");
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let response = request.send().await?;
        tracing::debug!(
            url = %url,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tracker request"
        );
        decode(url, response).await
    }
}

async fn decode<T: DeserializeOwned>(url: Url, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.error_message.or(b.detail))
            .unwrap_or(body);
        return Err(TrackerError::Api {
            status: status.as_u16(),
            url: url.to_string(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| TrackerError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path() {
        let client = TaigaClient::new("https://tracker.example/taiga", None).unwrap();
        assert_eq!(
            client.endpoint("projects").unwrap().as_str(),
            "https://tracker.example/taiga/api/v1/projects"
        );
    }

    #[test]
    fn rejects_invalid_url() {
        let err = TaigaClient::new("not a url", None).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidConfig(_)));
    }

    #[test]
    fn empty_token_is_ignored() {
        let client = TaigaClient::new("https://api.taiga.io", Some(String::new())).unwrap();
        assert!(client.auth_token.is_none());
    }
}

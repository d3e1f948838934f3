use reqwest::header::{ACCEPT, COOKIE};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::error::UploadError;
use crate::pipeline::batch::ReadStatus;
use crate::types::activity::ActivityRecord;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub key: String,
    pub name: String,
    pub ok: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// Posts parsed runs to the fitness backend's activity endpoint.
#[derive(Clone)]
pub struct Uploader {
    client: reqwest::Client,
    endpoint: String,
    csrf_token: Option<String>,
}

impl Uploader {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, csrf_token: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            csrf_token,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn upload(&self, activity: &ActivityRecord) -> Result<u16, UploadError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(activity);
        if let Some(token) = &self.csrf_token {
            request = request
                .header(CSRF_HEADER, token)
                .header(COOKIE, format!("{}={}", CSRF_COOKIE, token));
        }

        let response = request.send().await.map_err(|e| UploadError::Transport {
            url: self.endpoint.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(status.as_u16())
    }

    /// Posts every run of the batch concurrently. Requests are independent:
    /// one failure does not stop the others, and nothing is retried.
    pub async fn upload_all(&self, status: &ReadStatus) -> Vec<UploadOutcome> {
        let mut pending = JoinSet::new();
        for (key, activity) in &status.activities {
            let uploader = self.clone();
            let key = key.clone();
            let activity = activity.clone();
            tracing::debug!("Posting {} ({} points)", key, activity.points.len());
            pending.spawn(async move {
                let result = uploader.upload(&activity).await;
                outcome(key, activity.name, result)
            });
        }

        let mut outcomes = Vec::with_capacity(status.activities.len());
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Upload task failed: {}", e),
            }
        }
        outcomes.sort_by(|a, b| a.key.cmp(&b.key));
        outcomes
    }
}

fn outcome(key: String, name: String, result: Result<u16, UploadError>) -> UploadOutcome {
    match result {
        Ok(status) => {
            tracing::info!("Uploaded {} ({})", key, status);
            UploadOutcome {
                key,
                name,
                ok: true,
                status: Some(status),
                error: None,
            }
        }
        Err(e) => {
            tracing::error!("Upload of {} failed: {}", key, e);
            let status = match &e {
                UploadError::Rejected { status, .. } => Some(*status),
                UploadError::Transport { .. } => None,
            };
            UploadOutcome {
                key,
                name,
                ok: false,
                status,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Value of the `csrftoken` cookie in a `Cookie` header.
pub fn csrf_token_from_cookie(cookie_header: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_csrf_cookie_among_others() {
        assert_eq!(
            csrf_token_from_cookie("sessionid=abc; csrftoken=tok123; theme=dark").as_deref(),
            Some("tok123")
        );
        assert_eq!(csrf_token_from_cookie("csrftoken=").as_deref(), None);
        assert_eq!(csrf_token_from_cookie("sessionid=abc").as_deref(), None);
        assert_eq!(csrf_token_from_cookie("xcsrftoken=nope").as_deref(), None);
    }

    #[tokio::test]
    async fn unreachable_backend_reports_transport_failures() {
        let uploader = Uploader::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/fitness/api/activities/",
            None,
        );
        let mut status = ReadStatus::default();
        status.activities.insert(
            "2017-01-01T00:00:00Z".to_string(),
            ActivityRecord {
                name: "Run".to_string(),
                time: "2017-01-01T00:00:00Z".to_string(),
                points: Vec::new(),
            },
        );
        let outcomes = uploader.upload_all(&status).await;
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].ok);
        assert_eq!(outcomes[0].status, None);
        assert!(outcomes[0].error.is_some());
    }
}

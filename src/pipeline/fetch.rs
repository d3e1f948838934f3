use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;

use crate::error::FetchError;
use crate::types::route::RouteCollection;

#[derive(Debug, Deserialize)]
struct ActivityDetail {
    geo_json: RouteCollection,
}

/// Resolves an activity URL against the backend and adds `format=json`,
/// keeping any other query. Relative links resolve against `backend_url`;
/// absolute links must share its origin.
pub fn detail_url(backend_url: &str, activity_url: &str) -> Result<Url, FetchError> {
    let base =
        Url::parse(backend_url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", backend_url, e)))?;
    let mut url = base
        .join(activity_url)
        .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", activity_url, e)))?;
    if url.origin() != base.origin() {
        return Err(FetchError::InvalidUrl(format!(
            "{} is not served by {}",
            activity_url, backend_url
        )));
    }
    let others: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "format")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(others)
        .append_pair("format", "json");
    Ok(url)
}

/// Fetches the route description of an uploaded activity.
pub async fn fetch_route(
    client: &reqwest::Client,
    backend_url: &str,
    activity_url: &str,
) -> Result<RouteCollection, FetchError> {
    let url = detail_url(backend_url, activity_url)?;
    tracing::info!("Loading activity route from {}", url);

    let response = client
        .get(url.clone())
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let detail: ActivityDetail = response
        .json()
        .await
        .map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(detail.geo_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKEND: &str = "http://localhost:8000";

    #[test]
    fn detail_url_requests_json() {
        let url = detail_url(BACKEND, "http://localhost:8000/fitness/activities/7/").expect("url");
        assert_eq!(url.as_str(), "http://localhost:8000/fitness/activities/7/?format=json");

        let url = detail_url(BACKEND, "/fitness/activities/7/?format=api&tab=map").expect("url");
        assert_eq!(url.path(), "/fitness/activities/7/");
        assert_eq!(url.query(), Some("tab=map&format=json"));
    }

    #[test]
    fn relative_links_resolve_against_backend() {
        let url = detail_url("https://fitness.example.org", "/fitness/activities/7/").expect("url");
        assert_eq!(
            url.as_str(),
            "https://fitness.example.org/fitness/activities/7/?format=json"
        );
    }

    #[test]
    fn detail_url_refuses_other_origins() {
        for foreign in [
            "http://169.254.169.254/latest/meta-data/",
            "http://localhost:9000/fitness/activities/7/",
            "https://localhost:8000/fitness/activities/7/",
            "ftp://localhost:8000/a",
            "//evil.example.org/a",
        ] {
            assert!(
                matches!(detail_url(BACKEND, foreign), Err(FetchError::InvalidUrl(_))),
                "{} was accepted",
                foreign
            );
        }
        assert!(matches!(
            detail_url("not a url", "/a"),
            Err(FetchError::InvalidUrl(_))
        ));
    }
}

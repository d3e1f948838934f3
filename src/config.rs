use std::time::Duration;

use crate::pipeline::summary::HeartRateZones;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_file_size: usize,
    pub cache_ttl: Duration,
    /// Base URL of the fitness backend, without trailing slash.
    pub backend_url: String,
    pub activities_path: String,
    /// Used when the incoming request carries no `csrftoken` cookie.
    pub csrf_token: Option<String>,
    pub http_timeout: Duration,
    pub heart_rate: HeartRateZones,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            max_file_size: 25 * 1024 * 1024,
            cache_ttl: Duration::from_secs(3600),
            backend_url: "http://localhost:8000".to_string(),
            activities_path: "/fitness/api/activities/".to_string(),
            csrf_token: None,
            http_timeout: Duration::from_secs(30),
            heart_rate: HeartRateZones::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);

        let max_file_size_mb: usize = env_parse("MAX_FILE_SIZE_MB").unwrap_or(25);

        let cache_ttl_seconds = env_parse("CACHE_TTL_SECONDS").unwrap_or(3600);

        let backend_url = env_string("FITNESS_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.backend_url);

        let activities_path = env_string("FITNESS_ACTIVITIES_PATH").unwrap_or(defaults.activities_path);

        let http_timeout_seconds = env_parse("HTTP_TIMEOUT_SECONDS").unwrap_or(30);

        let heart_rate = HeartRateZones {
            resting: env_parse("RESTING_HEART_RATE").unwrap_or(defaults.heart_rate.resting),
            maximum: env_parse("MAX_HEART_RATE").unwrap_or(defaults.heart_rate.maximum),
            male: env_parse("TRIMP_MALE").unwrap_or(defaults.heart_rate.male),
        };

        Self {
            port,
            max_file_size: max_file_size_mb * 1024 * 1024,
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            backend_url,
            activities_path,
            csrf_token: env_string("CSRF_TOKEN"),
            http_timeout: Duration::from_secs(http_timeout_seconds),
            heart_rate,
        }
    }

    pub fn activities_endpoint(&self) -> String {
        format!("{}{}", self.backend_url, self.activities_path)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_points_at_activity_api() {
        let config = Config::default();
        assert_eq!(
            config.activities_endpoint(),
            "http://localhost:8000/fitness/api/activities/"
        );
    }
}

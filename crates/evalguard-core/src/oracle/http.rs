//! reqwest client for the portal's timer and session endpoints.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{SessionGrant, SessionStatus, StartOutcome, TimeCheck, TimeOracle, TimeStatus};
use crate::error::OracleError;
use crate::storage::ServerConfig;

const START_PATH: &str = "api/evaluation/start";
const CHECK_TIME_PATH: &str = "api/evaluation/check-time";
const MARK_EXPIRED_PATH: &str = "api/evaluation/mark-expired";
const SESSION_STATUS_PATH: &str = "api/session-status";
const REFRESH_SESSION_PATH: &str = "api/refresh-session";

#[derive(Debug, Deserialize)]
struct StartResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    timer_enabled: Option<bool>,
    #[serde(default)]
    session_id: Option<serde_json::Value>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    time_limit: Option<f64>,
    #[serde(default)]
    resumed: bool,
    #[serde(default)]
    expired: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckTimeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    remaining_seconds: f64,
    #[serde(default)]
    elapsed_seconds: f64,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionStatusResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    logged_in: bool,
    #[serde(default)]
    remaining_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Production [`TimeOracle`] speaking JSON over HTTP.
///
/// The client keeps a cookie store so the portal session cookie set by one
/// call is replayed on the next. No request timeouts are configured: a hung
/// call only delays its own cycle.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    base_url: Url,
    client: Client,
    cookie: Option<String>,
}

impl HttpOracle {
    /// Create a client rooted at `base_url` (e.g. `https://portal.example.edu`).
    pub fn new(base_url: &str) -> Result<Self, OracleError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)?;
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|source| OracleError::Transport {
                endpoint: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            base_url,
            client,
            cookie: None,
        })
    }

    pub fn from_config(server: &ServerConfig) -> Result<Self, OracleError> {
        let oracle = Self::new(&server.base_url)?;
        Ok(match &server.cookie {
            Some(cookie) => oracle.with_cookie(cookie.clone()),
            None => oracle,
        })
    }

    /// Send a fixed `Cookie` header with every request.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, OracleError> {
        Ok(self.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.cookie {
            Some(cookie) => builder.header(reqwest::header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&self, endpoint: &str, builder: RequestBuilder) -> Result<Response, OracleError> {
        builder.send().await.map_err(|source| OracleError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

async fn read_json<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T, OracleError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|source| OracleError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|e| {
        if status.is_success() {
            OracleError::Malformed {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        } else {
            OracleError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }
        }
    })
}

fn whole_secs(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

/// Accepts RFC 3339, RFC 2822 (Flask's default datetime encoding) and naive
/// ISO-8601 timestamps. The portal stamps naive times in its local zone, so
/// they are read as local time.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

fn session_id_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl StartResponse {
    fn into_outcome(self, endpoint: &str) -> Result<StartOutcome, OracleError> {
        let malformed = |message: &str| OracleError::Malformed {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        };

        if !self.success {
            if self.expired {
                return Ok(StartOutcome::AlreadyExpired);
            }
            let message = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "Failed to start evaluation".to_string());
            return Ok(StartOutcome::Failed { message });
        }

        if self.timer_enabled == Some(false) {
            return Ok(StartOutcome::Untimed {
                message: self.message,
            });
        }

        let session_id = self
            .session_id
            .as_ref()
            .and_then(session_id_text)
            .ok_or_else(|| malformed("missing session_id"))?;
        let start_time = self
            .start_time
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or_else(|| malformed("missing or unparsable start_time"))?;
        let time_limit_minutes = self
            .time_limit
            .ok_or_else(|| malformed("missing time_limit"))?;

        Ok(StartOutcome::Started(SessionGrant {
            session_id,
            start_time,
            time_limit_minutes,
            resumed: self.resumed,
        }))
    }
}

impl TimeOracle for HttpOracle {
    async fn start_evaluation(&self, evaluation_id: u64) -> Result<StartOutcome, OracleError> {
        let url = self.url(START_PATH)?;
        let builder = self
            .request(Method::POST, url)
            .json(&json!({ "evaluation_id": evaluation_id }));
        let resp = self.send(START_PATH, builder).await?;
        let parsed: StartResponse = read_json(START_PATH, resp).await?;
        parsed.into_outcome(START_PATH)
    }

    async fn check_time(&self, session_id: &str) -> Result<TimeCheck, OracleError> {
        let mut url = self.url(CHECK_TIME_PATH)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(session_id);
        let resp = self.send(CHECK_TIME_PATH, self.request(Method::GET, url)).await?;
        if !resp.status().is_success() {
            return Err(OracleError::Status {
                endpoint: CHECK_TIME_PATH.to_string(),
                status: resp.status().as_u16(),
            });
        }
        let parsed: CheckTimeResponse = read_json(CHECK_TIME_PATH, resp).await?;
        if !parsed.success {
            return Err(OracleError::Rejected {
                endpoint: CHECK_TIME_PATH.to_string(),
                message: parsed.message.unwrap_or_default(),
            });
        }

        let status = match parsed.status.as_deref() {
            Some("expired") => TimeStatus::Expired,
            _ => TimeStatus::Ok,
        };
        Ok(TimeCheck {
            status,
            remaining_seconds: whole_secs(parsed.remaining_seconds),
            elapsed_seconds: whole_secs(parsed.elapsed_seconds),
        })
    }

    async fn mark_expired(&self, session_id: &str) -> Result<(), OracleError> {
        let url = self.url(MARK_EXPIRED_PATH)?;
        let builder = self
            .request(Method::POST, url)
            .json(&json!({ "session_id": session_id }));
        let resp = self.send(MARK_EXPIRED_PATH, builder).await?;
        let parsed: AckResponse = read_json(MARK_EXPIRED_PATH, resp).await?;
        if parsed.success {
            Ok(())
        } else {
            Err(OracleError::Rejected {
                endpoint: MARK_EXPIRED_PATH.to_string(),
                message: parsed.message.unwrap_or_default(),
            })
        }
    }

    async fn session_status(&self) -> Result<SessionStatus, OracleError> {
        let url = self.url(SESSION_STATUS_PATH)?;
        let resp = self
            .send(SESSION_STATUS_PATH, self.request(Method::GET, url))
            .await?;
        if !resp.status().is_success() {
            return Ok(SessionStatus::Rejected {
                status: resp.status().as_u16(),
            });
        }
        let parsed: SessionStatusResponse = read_json(SESSION_STATUS_PATH, resp).await?;
        if parsed.success && parsed.logged_in {
            Ok(SessionStatus::Active {
                remaining_secs: whole_secs(parsed.remaining_seconds),
            })
        } else {
            Ok(SessionStatus::LoggedOut)
        }
    }

    async fn refresh_session(&self) -> Result<(), OracleError> {
        let url = self.url(REFRESH_SESSION_PATH)?;
        let resp = self
            .send(REFRESH_SESSION_PATH, self.request(Method::POST, url))
            .await?;
        let parsed: AckResponse = read_json(REFRESH_SESSION_PATH, resp).await?;
        if parsed.success {
            Ok(())
        } else {
            Err(OracleError::Rejected {
                endpoint: REFRESH_SESSION_PATH.to_string(),
                message: parsed.message.unwrap_or_default(),
            })
        }
    }
}

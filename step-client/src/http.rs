use crate::api::Result;
use crate::api::StepBackend;
use crate::api::StepError;
use crate::api::StepOutcome;
use crate::types::ServerResponse;
use crate::types::SessionId;
use crate::types::StartRequest;
use crate::types::StepAction;
use crate::types::StepRequest;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::USER_AGENT;
use serde::Serialize;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStyle {
    Direct,   // /game/...
    WebProxy, // /api/game/...
}

impl std::str::FromStr for PathStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "direct" => Ok(PathStyle::Direct),
            "web-proxy" | "web_proxy" => Ok(PathStyle::WebProxy),
            other => Err(format!(
                "unknown path style `{other}` (expected direct or web-proxy)"
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    base_url: String,
    http: reqwest::Client,
    user_agent: Option<HeaderValue>,
    path_style: PathStyle,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        // A base pointing at the web front-end's `/api` prefix goes through
        // the pass-through routes; keep the host part only.
        let path_style = if let Some(stripped) = base_url.strip_suffix("/api") {
            base_url = stripped.to_string();
            PathStyle::WebProxy
        } else {
            PathStyle::Direct
        };
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StepError::Http(e.to_string()))?;
        Ok(Self {
            base_url,
            http,
            user_agent: None,
            path_style,
        })
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        if let Ok(hv) = HeaderValue::from_str(&ua.into()) {
            self.user_agent = Some(hv);
        }
        self
    }

    pub fn with_path_style(mut self, style: PathStyle) -> Self {
        self.path_style = style;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path_style(&self) -> PathStyle {
        self.path_style
    }

    fn url(&self, endpoint: &str) -> String {
        match self.path_style {
            PathStyle::Direct => format!("{}/game/{endpoint}", self.base_url),
            PathStyle::WebProxy => format!("{}/api/game/{endpoint}", self.base_url),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(ua) = &self.user_agent {
            h.insert(USER_AGENT, ua.clone());
        } else {
            h.insert(USER_AGENT, HeaderValue::from_static("liar-play"));
        }
        h
    }

    /// POST `body` and hand back the status and raw text. Transport failures
    /// are errors; status interpretation is left to the caller.
    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<(StatusCode, String, String)> {
        let res = self
            .http
            .post(url)
            .headers(self.headers())
            .json(body)
            .send()
            .await
            .map_err(|e| StepError::Http(format!("POST {url}: {e}")))?;
        let status = res.status();
        let ct = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = res
            .text()
            .await
            .map_err(|e| StepError::Http(format!("POST {url}: reading body: {e}")))?;
        Ok((status, ct, body))
    }
}

fn decode_response(url: &str, ct: &str, body: &str) -> Result<ServerResponse> {
    serde_json::from_str::<ServerResponse>(body).map_err(|e| {
        // Include the full response body to aid debugging rather than truncating.
        StepError::Decode(format!("{url}: {e}; content-type={ct}; body={body}"))
    })
}

#[async_trait::async_trait]
impl StepBackend for HttpClient {
    async fn start(&self, req: &StartRequest) -> Result<ServerResponse> {
        let url = self.url("start");
        let (status, ct, body) = self.post(&url, req).await?;
        if !status.is_success() {
            return Err(StepError::Status {
                endpoint: format!("POST {url}"),
                status: status.as_u16(),
                body,
            });
        }
        decode_response(&url, &ct, &body)
    }

    async fn step(&self, session_id: &SessionId, action: &StepAction) -> Result<StepOutcome> {
        let url = self.url("step");
        let req = StepRequest { session_id, action };
        let (status, ct, body) = self.post(&url, &req).await?;
        if status == StatusCode::CONFLICT {
            debug!(action = action.kind(), %body, "step rejected with conflict");
            return Ok(StepOutcome::Conflict { body });
        }
        if !status.is_success() {
            return Err(StepError::Status {
                endpoint: format!("POST {url}"),
                status: status.as_u16(),
                body,
            });
        }
        let parsed = decode_response(&url, &ct, &body)?;
        Ok(StepOutcome::Applied(Box::new(parsed)))
    }
}

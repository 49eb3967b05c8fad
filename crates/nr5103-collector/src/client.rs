//! NR5103 web API client.
//!
//! Just enough of the modem's HTTP interface for the collector:
//!
//! - `POST /UserLogin`: session login (password base64-encoded)
//! - `GET /cgi-bin/UserLogout?sessionkey=…`
//! - `GET /getBasicInformation`, `GET /UserLoginCheck`: reachability
//! - `GET /cgi-bin/DAL?oid=…`: data objects (`cellwan_status`)
//!
//! The session lives in cookies. They are kept as a name → value map, read
//! from each login response, so they can be persisted to a JSON file between
//! runs.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use nr5103_radio::RawStatus;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::ModemConfig;

/// DAL object holding radio state.
pub const CELLWAN_STATUS_OID: &str = "cellwan_status";

const ZCFG_SUCCESS: &str = "ZCFG_SUCCESS";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("building HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: StatusCode },
    #[error("{0}")]
    Api(String),
    #[error("cookie file {path}: {source}")]
    CookieFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding JSON: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

/// Anything that can produce one status snapshot per poll.
///
/// Failures are logged by the implementation and surface as `None`.
pub trait StatusSource: Send + Sync {
    fn fetch_status(&self) -> impl Future<Output = Option<RawStatus>> + Send;
}

// ── Wire structures ─────────────────────────────────────────────

#[derive(Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "Input_Account")]
    account: &'a str,
    #[serde(rename = "Input_Passwd")]
    password: &'a str,
    #[serde(rename = "currLang")]
    lang: &'static str,
    #[serde(rename = "RememberPassword")]
    remember: u8,
    #[serde(rename = "SHA512_password")]
    sha512: bool,
}

#[derive(Deserialize)]
struct LoginResponse {
    sessionkey: Option<String>,
}

#[derive(Deserialize)]
struct ResultResponse {
    result: Option<String>,
}

#[derive(Deserialize)]
struct DalResponse {
    result: Option<String>,
    #[serde(rename = "Object", default)]
    object: Vec<serde_json::Value>,
}

// ── Client ──────────────────────────────────────────────────────

pub struct Nr5103Client {
    http: reqwest::Client,
    url: String,
    username: String,
    password_b64: String,
    status_retries: u32,
    cookies: Mutex<BTreeMap<String, String>>,
}

impl Nr5103Client {
    pub fn new(cfg: &ModemConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .danger_accept_invalid_certs(!cfg.verify_tls)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            url: cfg.url.clone(),
            username: cfg.username.clone(),
            password_b64: BASE64.encode(cfg.password.as_bytes()),
            status_retries: cfg.status_retries.max(1),
            cookies: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    // ── Cookies ─────────────────────────────────────────────────────

    /// Load cookies saved by [`store_cookies`](Self::store_cookies). A missing
    /// or unreadable file is not an error; the next login replaces them.
    pub async fn load_cookies(&self, path: &Path) {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "cookie file does not exist, ignoring");
                return;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read cookie file, ignoring");
                return;
            }
        };
        match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
            Ok(cookies) => {
                tracing::debug!(count = cookies.len(), "cookies loaded");
                *self.cookies.lock().await = cookies;
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring invalid cookie file"),
        }
    }

    /// Persist the current session cookies. Writes nothing when there are
    /// none.
    pub async fn store_cookies(&self, path: &Path) -> Result<(), ClientError> {
        let json = {
            let cookies = self.cookies.lock().await;
            if cookies.is_empty() {
                tracing::warn!("no cookie to write");
                return Ok(());
            }
            serde_json::to_string(&*cookies)?
        };
        tokio::fs::write(path, json)
            .await
            .map_err(|source| ClientError::CookieFile {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "cookies saved");
        Ok(())
    }

    async fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies.lock().await;
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    // ── Requests ────────────────────────────────────────────────────

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, ClientError> {
        let mut request = self.http.get(format!("{}{}", self.url, path)).query(query);
        if let Some(cookie) = self.cookie_header().await {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        let response = request.send().await.map_err(|source| ClientError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                path: path.to_string(),
                status,
            });
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        self.get(path, query)
            .await?
            .json()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.to_string(),
                source,
            })
    }

    /// Log in and return the session key, or `None` when the modem refuses.
    pub async fn login(&self) -> Result<Option<String>, ClientError> {
        let path = "/UserLogin";
        let body = serde_json::to_string(&LoginRequest {
            account: &self.username,
            password: &self.password_b64,
            lang: "en",
            remember: 0,
            sha512: false,
        })?;

        let response = self
            .http
            .post(format!("{}{}", self.url, path))
            .body(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.to_string(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            tracing::error!(status = %response.status(), "unauthorized");
            return Ok(None);
        }

        let cookies: BTreeMap<String, String> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        *self.cookies.lock().await = cookies;

        let payload: LoginResponse = response.json().await.map_err(|source| ClientError::Transport {
            path: path.to_string(),
            source,
        })?;
        Ok(payload.sessionkey)
    }

    pub async fn logout(&self, session_key: &str) -> Result<(), ClientError> {
        self.get("/cgi-bin/UserLogout", &[("sessionkey", session_key)])
            .await?;
        Ok(())
    }

    /// Check that the web API answers before logging in.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let info: ResultResponse = self.get_json("/getBasicInformation", &[]).await?;
        if info.result.as_deref() != Some(ZCFG_SUCCESS) {
            return Err(ClientError::Api("connection failure".into()));
        }
        self.get("/UserLoginCheck", &[]).await?;
        Ok(())
    }

    /// First entry of a DAL object.
    pub async fn get_json_object(&self, oid: &str) -> Result<serde_json::Value, ClientError> {
        let payload: DalResponse = self.get_json("/cgi-bin/DAL", &[("oid", oid)]).await?;
        if payload.result.as_deref() != Some(ZCFG_SUCCESS) {
            return Err(ClientError::Api(format!("request for {oid} failed")));
        }
        payload
            .object
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Api(format!("no object data for oid {oid}")))
    }

    /// Fetch `cellwan_status`.
    ///
    /// A 401 triggers one re-login and a retry without using up an attempt.
    /// Other HTTP and transport errors each consume one attempt; `Ok(None)`
    /// once they are all used.
    pub async fn get_status(&self) -> Result<Option<RawStatus>, ClientError> {
        let mut attempts = self.status_retries;
        let mut relogged = false;

        while attempts > 0 {
            match self.get_json_object(CELLWAN_STATUS_OID).await {
                Ok(object) => {
                    return RawStatus::from_value(object).map(Some).ok_or_else(|| {
                        ClientError::Api(format!("{CELLWAN_STATUS_OID} is not an object"))
                    });
                }
                Err(e) if e.is_unauthorized() && !relogged => {
                    tracing::info!("login required, retrying");
                    relogged = true;
                    self.login().await?;
                }
                Err(e @ (ClientError::Status { .. } | ClientError::Transport { .. })) => {
                    tracing::warn!(error = %e, attempts_left = attempts - 1, "status request failed");
                    attempts -= 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

impl StatusSource for Nr5103Client {
    async fn fetch_status(&self) -> Option<RawStatus> {
        match self.get_status().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch NR5103 status");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use axum::Json;
    use axum::Router;
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus, header};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use serde_json::json;

    /// Fake modem. `unauthorized_first` 401s that many DAL requests; the
    /// session cookie must be presented afterwards.
    #[derive(Default)]
    struct Modem {
        logins: AtomicU32,
        logouts: AtomicU32,
        dal_calls: AtomicU32,
        unauthorized_first: u32,
        dal_result: Option<&'static str>,
        login_bodies: tokio::sync::Mutex<Vec<serde_json::Value>>,
        logout_keys: tokio::sync::Mutex<Vec<String>>,
        last_cookie: tokio::sync::Mutex<Option<String>>,
    }

    async fn login(State(m): State<Arc<Modem>>, body: String) -> Response {
        m.logins.fetch_add(1, Ordering::SeqCst);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        let ok = parsed["Input_Passwd"] == "c2VjcmV0";
        m.login_bodies.lock().await.push(parsed);
        if !ok {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        (
            [(header::SET_COOKIE, "Session=abc123; Path=/; HttpOnly")],
            Json(json!({ "result": "ZCFG_SUCCESS", "sessionkey": "sk-1" })),
        )
            .into_response()
    }

    async fn logout(
        State(m): State<Arc<Modem>>,
        Query(q): Query<std::collections::HashMap<String, String>>,
    ) -> AxumStatus {
        let key = q.get("sessionkey").cloned().unwrap_or_default();
        m.logout_keys.lock().await.push(key.clone());
        if key == "sk-1" {
            m.logouts.fetch_add(1, Ordering::SeqCst);
            AxumStatus::OK
        } else {
            AxumStatus::BAD_REQUEST
        }
    }

    async fn basic_info() -> Json<serde_json::Value> {
        Json(json!({ "result": "ZCFG_SUCCESS", "ModelName": "NR5103" }))
    }

    async fn login_check() -> AxumStatus {
        AxumStatus::OK
    }

    async fn dal(
        State(m): State<Arc<Modem>>,
        Query(q): Query<std::collections::HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Response {
        let call = m.dal_calls.fetch_add(1, Ordering::SeqCst);
        *m.last_cookie.lock().await = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if call < m.unauthorized_first {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        if q.get("oid").map(String::as_str) != Some("cellwan_status") {
            return Json(json!({ "result": "ZCFG_INVALID_OBJECT", "Object": [] })).into_response();
        }
        Json(json!({
            "result": m.dal_result.unwrap_or("ZCFG_SUCCESS"),
            "Object": [{
                "INTF_Current_Band": "B20,B32",
                "INTF_RFCN": "1300,9410",
                "INTF_PhyCell_ID": 123,
                "INTF_RSRP": -95.0,
            }],
        }))
        .into_response()
    }

    async fn spawn_modem(modem: Arc<Modem>) -> String {
        let app = Router::new()
            .route("/UserLogin", post(login))
            .route("/cgi-bin/UserLogout", get(logout))
            .route("/getBasicInformation", get(basic_info))
            .route("/UserLoginCheck", get(login_check))
            .route("/cgi-bin/DAL", get(dal))
            .with_state(modem);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn client(url: String, password: &str) -> Nr5103Client {
        Nr5103Client::new(&ModemConfig {
            url,
            username: "admin".into(),
            password: password.into(),
            verify_tls: false,
            timeout: Duration::from_secs(2),
            status_retries: 1,
            cookie_file: None,
        })
        .unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("nr5103-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn login_sends_base64_password_and_keeps_cookie() {
        let modem = Arc::new(Modem::default());
        let c = client(spawn_modem(modem.clone()).await, "secret");

        let key = c.login().await.unwrap();
        assert_eq!(key.as_deref(), Some("sk-1"));

        let bodies = modem.login_bodies.lock().await;
        assert_eq!(bodies[0]["Input_Account"], "admin");
        assert_eq!(bodies[0]["currLang"], "en");
        assert_eq!(bodies[0]["RememberPassword"], 0);
        assert_eq!(bodies[0]["SHA512_password"], false);
        drop(bodies);

        c.get_status().await.unwrap();
        assert_eq!(modem.last_cookie.lock().await.as_deref(), Some("Session=abc123"));
    }

    #[tokio::test]
    async fn bad_credentials_yield_none() {
        let modem = Arc::new(Modem::default());
        let c = client(spawn_modem(modem.clone()).await, "wrong");
        assert_eq!(c.login().await.unwrap(), None);
    }

    #[tokio::test]
    async fn connect_and_logout() {
        let modem = Arc::new(Modem::default());
        let c = client(spawn_modem(modem.clone()).await, "secret");
        c.connect().await.unwrap();
        c.logout("sk-1").await.unwrap();
        assert_eq!(modem.logouts.load(Ordering::SeqCst), 1);
        assert!(matches!(c.logout("other").await, Err(ClientError::Status { .. })));
    }

    #[tokio::test]
    async fn logout_key_sent_as_encoded_query() {
        let modem = Arc::new(Modem::default());
        let c = client(spawn_modem(modem.clone()).await, "secret");
        let _ = c.logout("k&y=1 2").await;
        assert_eq!(modem.logout_keys.lock().await.as_slice(), &["k&y=1 2".to_string()]);
    }

    #[tokio::test]
    async fn status_snapshot_parsed() {
        let modem = Arc::new(Modem::default());
        let c = client(spawn_modem(modem.clone()).await, "secret");
        let status = c.fetch_status().await.unwrap();
        assert_eq!(status.band_list().as_deref(), Some("B20,B32"));
        assert_eq!(status.lte_rsrp(), Some(-95.0));
    }

    #[tokio::test]
    async fn unauthorized_status_relogs_once() {
        let modem = Arc::new(Modem {
            unauthorized_first: 1,
            ..Default::default()
        });
        let c = client(spawn_modem(modem.clone()).await, "secret");
        assert!(c.get_status().await.unwrap().is_some());
        assert_eq!(modem.logins.load(Ordering::SeqCst), 1);
        assert_eq!(modem.dal_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_unauthorized_exhausts_attempts() {
        let modem = Arc::new(Modem {
            unauthorized_first: u32::MAX,
            ..Default::default()
        });
        let c = client(spawn_modem(modem.clone()).await, "secret");
        assert!(c.get_status().await.unwrap().is_none());
        assert!(c.fetch_status().await.is_none());
    }

    #[tokio::test]
    async fn api_failure_is_error() {
        let modem = Arc::new(Modem {
            dal_result: Some("ZCFG_INTERNAL_ERROR"),
            ..Default::default()
        });
        let c = client(spawn_modem(modem.clone()).await, "secret");
        assert!(matches!(c.get_status().await, Err(ClientError::Api(_))));
        assert!(c.fetch_status().await.is_none());
    }

    #[tokio::test]
    async fn unreachable_modem_is_silent() {
        // Port from a listener that has already been dropped.
        let addr = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap()
        };
        let c = client(format!("http://{addr}"), "secret");
        assert!(c.fetch_status().await.is_none());
    }

    #[tokio::test]
    async fn cookies_round_trip_through_file() {
        let modem = Arc::new(Modem::default());
        let c = client(spawn_modem(modem.clone()).await, "secret");
        let path = temp_path("cookies.json");

        c.store_cookies(&path).await.unwrap();
        assert!(!path.exists(), "nothing written without cookies");

        c.login().await.unwrap();
        c.store_cookies(&path).await.unwrap();

        let fresh = client(c.url().to_string(), "secret");
        fresh.load_cookies(&path).await;
        assert_eq!(fresh.cookie_header().await.as_deref(), Some("Session=abc123"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn invalid_or_missing_cookie_file_ignored() {
        let c = client("http://127.0.0.1:9".into(), "secret");
        c.load_cookies(&temp_path("missing.json")).await;
        assert!(c.cookie_header().await.is_none());

        let path = temp_path("invalid.json");
        std::fs::write(&path, "{not json").unwrap();
        c.load_cookies(&path).await;
        assert!(c.cookie_header().await.is_none());
        let _ = std::fs::remove_file(&path);
    }
}

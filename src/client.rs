//! Blocking HTTP client for the evohome EMEA v1 API.
//!
//! - Blocking client using `ureq` (no async); every request carries a global
//!   deadline so a slow service cannot pile up refresh ticks.
//! - Covers exactly the endpoints the sync engine needs: account, installation
//!   tree, location status, zone schedule, heat setpoint write.
//!
//! Authentication
//! - OAuth2 password grant against the Honeywell token endpoint. The tokens
//!   live in a `Session` owned by the client; the access token is refreshed
//!   shortly before expiry, and a 401/403 forces one refresh and one retry.

use http::{Method, StatusCode};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

use crate::error::{EvohomeError, Result};
use crate::models::evohome::*;
use crate::source::RemoteDataSource;

const BASE_URL: &str = "https://tccna.honeywell.com/WebAPI/emea/api/v1";
const OAUTH_TOKEN_URL: &str = "https://tccna.honeywell.com/Auth/OAuth/Token";
const OAUTH_BASIC_AUTH: &str = "Basic YjAxM2FhMjYtOTcyNC00ZGJkLTg4OTctMDQ4YjlhYWRhMjQ5OnRlc3Q=";
const OAUTH_SCOPE: &str = "EMEA-V1-Basic EMEA-V1-Anonymous EMEA-V1-Get-Current-User-Account";
const APPLICATION_ID: &str = "b013aa26-9724-4dbd-8897-048b9aada249";
const REFRESH_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct OAuthToken {
    access_token: String,
    expires_at: Instant,
    refresh_token: Option<String>,
}

impl OAuthToken {
    fn parse(body: &str, now: Instant) -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct R {
            access_token: String,
            expires_in: u64,
            #[serde(default)]
            refresh_token: Option<String>,
        }
        let R {
            access_token,
            expires_in,
            refresh_token,
        } = decode(body)?;
        Ok(OAuthToken {
            access_token,
            expires_at: now + Duration::from_secs(expires_in),
            refresh_token,
        })
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now + REFRESH_MARGIN < self.expires_at
    }
}

/// Login credentials plus the tokens issued for them.
#[derive(Debug)]
pub struct Session {
    username: String,
    password: String,
    token: Option<OAuthToken>,
}

impl Session {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Session {
            username: username.into(),
            password: password.into(),
            token: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

pub struct EvohomeClient {
    agent: ureq::Agent,
    base_url: String,
    token_url: String,
    session: Mutex<Session>,
}

impl EvohomeClient {
    /// Log in and keep the session for later calls. `timeout` bounds every request.
    pub fn new(session: Session, timeout: Duration) -> Result<Self> {
        Self::with_endpoints(session, timeout, BASE_URL, OAUTH_TOKEN_URL)
    }

    /// Like `new`, against a different API root and token endpoint.
    pub fn with_endpoints(
        session: Session,
        timeout: Duration,
        base_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self> {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        let client = EvohomeClient {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_url: token_url.into(),
            session: Mutex::new(session),
        };

        {
            let mut session = client.session.lock();
            let token = client.password_grant(&session)?;
            session.token = Some(token);
            info!("Authenticated as {}", session.username);
        }
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn password_grant(&self, session: &Session) -> Result<OAuthToken> {
        self.token_request(&[
            ("grant_type", "password"),
            ("scope", OAUTH_SCOPE),
            ("Username", session.username.as_str()),
            ("Password", session.password.as_str()),
        ])
    }

    fn refresh_grant(&self, refresh_token: &str) -> Result<OAuthToken> {
        self.token_request(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
    }

    fn token_request(&self, form: &[(&str, &str)]) -> Result<OAuthToken> {
        let mut resp = self
            .agent
            .post(&self.token_url)
            .header("Authorization", OAUTH_BASIC_AUTH)
            .header("Accept", "application/json")
            .send_form(form.iter().copied())
            .map_err(|e| EvohomeError::transport(e.to_string()))?;
        let status = resp.status();
        let body = read_body(&mut resp);
        if !status.is_success() {
            return Err(token_error(status, &body));
        }
        OAuthToken::parse(&body, Instant::now())
    }

    /// Obtain a new access token, preferring the refresh token and falling back
    /// to the stored credentials when the refresh is rejected.
    fn renew(&self, session: &mut Session) -> Result<String> {
        let refreshed = match session.token.as_ref().and_then(|t| t.refresh_token.clone()) {
            Some(r) => match self.refresh_grant(&r) {
                Ok(t) => Ok(t),
                Err(EvohomeError::Auth(e)) => {
                    warn!("Token refresh rejected, logging in again: {}", e);
                    self.password_grant(session)
                }
                Err(e) => Err(e),
            },
            None => self.password_grant(session),
        }?;
        let access = refreshed.access_token.clone();
        session.token = Some(refreshed);
        debug!("Access token renewed");
        Ok(access)
    }

    fn get_bearer(&self) -> Result<String> {
        let mut session = self.session.lock();
        if let Some(t) = session.token.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(t.access_token.clone());
        }
        self.renew(&mut session)
    }

    /// Renew after the service rejected `stale`, unless another thread already did.
    fn force_refresh(&self, stale: &str) -> Result<String> {
        let mut session = self.session.lock();
        if let Some(t) = session.token.as_ref().filter(|t| t.access_token != stale) {
            return Ok(t.access_token.clone());
        }
        self.renew(&mut session)
    }

    fn send(
        &self,
        method: &Method,
        url: &str,
        token: &str,
        body: Option<&str>,
    ) -> Result<http::Response<ureq::Body>> {
        let auth = format!("bearer {}", token);
        let resp = if *method == Method::PUT {
            self.agent
                .put(url)
                .header("Authorization", auth.as_str())
                .header("applicationId", APPLICATION_ID)
                .header("Accept", "application/json")
                .header("Content-Type", "application/json")
                .send(body.unwrap_or_default())
        } else {
            self.agent
                .get(url)
                .header("Authorization", auth.as_str())
                .header("applicationId", APPLICATION_ID)
                .header("Accept", "application/json")
                .call()
        };
        resp.map_err(|e| EvohomeError::transport(format!("{} {}: {}", method, url, e)))
    }

    fn request(&self, method: Method, path: &str, body: Option<&str>) -> Result<String> {
        let url = self.url(path);
        let token = self.get_bearer()?;
        let mut resp = self.send(&method, &url, &token, body)?;

        // Retry once on 401/403 after forcing refresh
        if is_auth_rejection(resp.status()) {
            debug!("{} {} rejected with {}, refreshing token", method, url, resp.status());
            let token = self.force_refresh(&token)?;
            resp = self.send(&method, &url, &token, body)?;
            if is_auth_rejection(resp.status()) {
                let status = resp.status();
                return Err(EvohomeError::Auth(format!(
                    "http {} after token refresh: {}",
                    status.as_u16(),
                    read_body(&mut resp)
                )));
            }
        }

        let status = resp.status();
        let text = resp
            .body_mut()
            .read_to_string()
            .map_err(|e| EvohomeError::transport(format!("reading {} body: {}", url, e)))?;
        if !status.is_success() {
            return Err(EvohomeError::Remote {
                status: Some(status.as_u16()),
                message: format!("{} {}: {}", method, url, text),
            });
        }
        Ok(text)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let text = self.request(Method::GET, path, None)?;
        decode(&text)
    }

    pub fn get_location_status(&self, location_id: &LocationId) -> Result<LocationStatus> {
        self.get_json(&format!(
            "/location/{}/status?includeTemperatureControlSystems=True",
            location_id
        ))
    }
}

impl RemoteDataSource for EvohomeClient {
    fn get_account(&self) -> Result<Account> {
        self.get_json("/userAccount")
    }

    fn get_installations(&self, user_id: &UserId) -> Result<Vec<Installation>> {
        self.get_json(&format!(
            "/location/installationInfo?userId={}&includeTemperatureControlSystems=True",
            user_id
        ))
    }

    fn get_zone_statuses(&self, location_id: &LocationId, system_id: &SystemId) -> Result<Vec<ZoneStatus>> {
        let status = self.get_location_status(location_id)?;
        status
            .zones_of(system_id)
            .map(<[ZoneStatus]>::to_vec)
            .ok_or_else(|| EvohomeError::Decode {
                path: "gateways".to_string(),
                message: format!("control system {} missing from location {} status", system_id, location_id),
            })
    }

    fn get_zone_schedule(&self, zone_id: &ZoneId) -> Result<Schedule> {
        self.get_json(&format!("/temperatureZone/{}/schedule", zone_id))
    }

    fn put_heat_setpoint(&self, zone_id: &ZoneId, request: &HeatSetpointRequest) -> Result<()> {
        let body = serde_json::to_string(request).map_err(|e| EvohomeError::Decode {
            path: String::new(),
            message: e.to_string(),
        })?;
        debug!("PUT heatSetpoint for zone {}: {}", zone_id, body);
        self.request(Method::PUT, &format!("/temperatureZone/{}/heatSetpoint", zone_id), Some(&body))?;
        Ok(())
    }
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Rejected grants and credentials are auth failures; anything else from the
/// token endpoint is an ordinary remote failure.
fn token_error(status: StatusCode, body: &str) -> EvohomeError {
    let message = format!("token endpoint http {}: {}", status.as_u16(), body);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EvohomeError::Auth(message),
        _ => EvohomeError::Remote {
            status: Some(status.as_u16()),
            message,
        },
    }
}

fn read_body(resp: &mut http::Response<ureq::Body>) -> String {
    resp.body_mut()
        .read_to_string()
        .unwrap_or_else(|_| String::from("<no body>"))
}

/// Decode a JSON body, reporting the path of the first mismatching field.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(text);
    Ok(serde_path_to_error::deserialize(de)?)
}

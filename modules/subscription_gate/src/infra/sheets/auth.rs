//! Service-account authentication for the spreadsheet API.
//!
//! A signed RS256 assertion is exchanged at the token endpoint for a
//! short-lived bearer token, which is reused until shortly before it expires.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::ServiceAccountCredentials;
use crate::contract::LedgerError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before the endpoint says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens for spreadsheet requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, LedgerError>;
}

/// Fields of a service-account key that matter for the token exchange.
#[derive(Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"***")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Deserialize, Default)]
struct KeyFile {
    client_email: Option<String>,
    private_key: Option<String>,
    private_key_id: Option<String>,
    token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Build the key from a JSON key file and/or inline fields. Inline fields
    /// win over the file.
    pub fn resolve(
        file: Option<&Path>,
        inline: Option<&ServiceAccountCredentials>,
    ) -> Result<Self, LedgerError> {
        let mut base = match file {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    LedgerError::credentials(format!("cannot read {}: {e}", path.display()))
                })?;
                serde_json::from_str::<KeyFile>(&raw).map_err(|e| {
                    LedgerError::credentials(format!("cannot parse {}: {e}", path.display()))
                })?
            }
            None => KeyFile::default(),
        };

        if let Some(inline) = inline {
            merge(&mut base.client_email, &inline.client_email);
            merge(&mut base.private_key, &inline.private_key);
            merge(&mut base.private_key_id, &inline.private_key_id);
            merge(&mut base.token_uri, &inline.token_uri);
        }

        let client_email = base
            .client_email
            .ok_or_else(|| LedgerError::credentials("client_email is not set"))?;
        let private_key = base
            .private_key
            .map(|k| normalize_pem(&k))
            .ok_or_else(|| LedgerError::credentials("private_key is not set"))?;

        Ok(Self {
            client_email,
            private_key,
            private_key_id: base.private_key_id,
            token_uri: base
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }
}

fn merge(target: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        *target = Some(v.to_string());
    }
}

/// Keys passed through environment variables often carry escaped newlines.
fn normalize_pem(key: &str) -> String {
    key.replace("\\n", "\n")
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self, LedgerError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| LedgerError::credentials(format!("invalid private key: {e}")))?;
        Ok(Self {
            key,
            encoding_key,
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn assertion(&self) -> Result<String, LedgerError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| LedgerError::credentials(format!("cannot sign assertion: {e}")))
    }

    fn cached_token(&self) -> Option<String> {
        self.cached
            .lock()
            .as_ref()
            .filter(|t| Instant::now() < t.refresh_at)
            .map(|t| t.value.clone())
    }

    #[instrument(name = "subscription_gate.sheets.auth.exchange", skip(self), fields(client = %self.key.client_email))]
    async fn exchange(&self) -> Result<String, LedgerError> {
        let assertion = self.assertion()?;
        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| LedgerError::transport(format!("token endpoint: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::auth(format!(
                "token endpoint returned {}: {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::malformed(format!("token response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *self.cached.lock() = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        debug!(expires_in = token.expires_in, "access token refreshed");

        Ok(token.access_token)
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, LedgerError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        self.exchange().await
    }
}

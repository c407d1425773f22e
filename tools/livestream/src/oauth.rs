//! OAuth 2.0 credentials for the Live Stream API.
//!
//! Two sources are supported: a bearer token handed to us directly (for example the output of
//! `gcloud auth print-access-token`), or an `authorized_user` Application Default Credentials
//! file as written by `gcloud auth application-default login`, whose refresh token is exchanged
//! for short-lived access tokens as needed.

use eyre::Context;
use oauth2::basic::{BasicClient, BasicTokenResponse, BasicTokenType};
use oauth2::{
    AccessToken, ClientId, ClientSecret, EmptyExtraTokenFields, RefreshToken, StandardTokenResponse,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

/// Google OAuth2 token endpoint used for refresh-token exchange.
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens are treated as expired this long before the server says they are.
const EXPIRY_BUFFER: Duration = Duration::from_secs(300);

/// Where credentials come from, as chosen on the command line.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A ready-to-use bearer token. Never refreshed.
    AccessToken(String),
    /// A user refresh token from an ADC file.
    AuthorizedUser(AuthorizedUser),
}

/// The `authorized_user` flavour of an Application Default Credentials file.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Project billed for quota, sent as `x-goog-user-project`.
    #[serde(default)]
    pub quota_project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    rest: serde_json::Value,
}

impl Credentials {
    /// Picks the credential source.
    ///
    /// An explicit access token wins. Otherwise the ADC file at `path` is used, falling back to
    /// gcloud's well-known location.
    pub fn resolve(access_token: Option<String>, path: Option<&Path>) -> eyre::Result<Self> {
        if let Some(token) = access_token.filter(|t| !t.trim().is_empty()) {
            tracing::debug!("using access token supplied on the command line");
            return Ok(Self::AccessToken(token.trim().to_string()));
        }

        let path = match path {
            Some(path) => path.to_path_buf(),
            None => well_known_adc_path().ok_or_else(|| {
                eyre::eyre!(
                    "no credentials found: pass --access-token, set GOOGLE_APPLICATION_CREDENTIALS, \
                     or run `gcloud auth application-default login`"
                )
            })?,
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("read credentials file {}", path.display()))?;
        let creds = Self::from_json(&raw)
            .with_context(|| format!("parse credentials file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded application default credentials");
        Ok(creds)
    }

    /// Parses the contents of an ADC file.
    pub fn from_json(raw: &str) -> eyre::Result<Self> {
        let file: CredentialsFile = serde_json::from_str(raw).context("parse credentials JSON")?;
        match file.kind.as_str() {
            "authorized_user" => {
                let user: AuthorizedUser = serde_json::from_value(file.rest)
                    .context("parse authorized_user credentials")?;
                Ok(Self::AuthorizedUser(user))
            }
            other => eyre::bail!(
                "unsupported credentials type {other:?}; use `gcloud auth application-default login` \
                 or pass --access-token"
            ),
        }
    }

    pub fn quota_project(&self) -> Option<&str> {
        match self {
            Self::AccessToken(_) => None,
            Self::AuthorizedUser(user) => user.quota_project_id.as_deref(),
        }
    }
}

fn well_known_adc_path() -> Option<PathBuf> {
    let config_dir = if cfg!(windows) {
        PathBuf::from(std::env::var_os("APPDATA")?)
    } else {
        PathBuf::from(std::env::var_os("HOME")?).join(".config")
    };
    let path = config_dir
        .join("gcloud")
        .join("application_default_credentials.json");
    path.exists().then_some(path)
}

/// An OAuth2 token together with the time it should be considered stale.
#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Wraps a token that is already expired, forcing a refresh before first use.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// An expired token holding only `refresh_token`.
    pub fn from_refresh_token(refresh_token: &str) -> Self {
        let mut token = StandardTokenResponse::new(
            AccessToken::new(String::new()),
            BasicTokenType::Bearer,
            EmptyExtraTokenFields {},
        );
        token.set_refresh_token(Some(RefreshToken::new(refresh_token.to_string())));
        Self::expired(token)
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    pub fn access_token(&self) -> &str {
        self.token.access_token().secret()
    }

    /// Refreshes this token, keeping the old refresh token if the server does not send a new one.
    ///
    /// Returns `Ok(false)` if the refresh grant was rejected.
    pub async fn refresh(&mut self, oauth_manager: &OAuthManager) -> eyre::Result<bool> {
        tracing::trace!("refreshing token");
        let Some(new_token) = oauth_manager
            .refresh_token(&self.token)
            .await
            .context("refresh OAuth token")?
        else {
            return Ok(false);
        };

        let old_token = std::mem::replace(&mut self.token, new_token);
        if self.token.refresh_token().is_none() {
            self.token
                .set_refresh_token(old_token.refresh_token().cloned());
        }
        self.expires_at = expiry_of(&self.token, SystemTime::now());
        Ok(true)
    }
}

/// When `token` should be refreshed, counting from `now`.
///
/// Without an `expires_in` the token is assumed to live for the usual hour.
fn expiry_of(token: &BasicTokenResponse, now: SystemTime) -> SystemTime {
    let lifetime = token.expires_in().unwrap_or(Duration::from_secs(3600));
    now + lifetime.saturating_sub(EXPIRY_BUFFER)
}

/// Exchanges refresh tokens for access tokens.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl OAuthManager {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Attempts to refresh `token` using its refresh token.
    ///
    /// * `Ok(Some(new_token))` - refresh succeeded
    /// * `Ok(None)` - no refresh token, or the grant was rejected as invalid
    /// * `Err(_)` - network or other failure
    pub async fn refresh_token(
        &self,
        token: &BasicTokenResponse,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        let Some(refresh_token) = token.refresh_token() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(None);
        };

        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_token_uri(TokenUrl::new(self.token_url.clone()).context("parse token URL")?);

        let http_client = oauth2::reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(oauth2::reqwest::redirect::Policy::none())
            .build()
            .context("build OAuth HTTP client")?;

        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&http_client)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(Some(new_token))
            }
            Err(ref e @ oauth2::RequestTokenError::ServerResponse(ref sr))
                if matches!(
                    sr.error(),
                    oauth2::basic::BasicErrorResponseType::InvalidGrant
                ) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }
}

/// Hands out bearer tokens for API requests, refreshing them when they go stale.
#[derive(Debug)]
pub(crate) enum TokenSource {
    Static(String),
    Refreshing {
        token: Mutex<TimeBoundAccessToken>,
        oauth_manager: OAuthManager,
    },
}

impl TokenSource {
    pub(crate) fn new(credentials: &Credentials) -> Self {
        match credentials {
            Credentials::AccessToken(token) => Self::Static(token.clone()),
            Credentials::AuthorizedUser(user) => Self::Refreshing {
                token: Mutex::new(TimeBoundAccessToken::from_refresh_token(&user.refresh_token)),
                oauth_manager: OAuthManager::new(&user.client_id, &user.client_secret),
            },
        }
    }

    /// Returns a bearer token that is valid for at least a few more minutes.
    pub(crate) async fn access_token(&self) -> eyre::Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Refreshing {
                token,
                oauth_manager,
            } => {
                let mut token = token.lock().await;
                if token.is_expired() {
                    tracing::debug!("access token expired, attempting refresh");
                    if !token.refresh(oauth_manager).await? {
                        eyre::bail!(
                            "refresh token was rejected; run `gcloud auth application-default login` again"
                        );
                    }
                }
                Ok(token.access_token().to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADC: &str = r#"{
        "client_id": "123.apps.googleusercontent.com",
        "client_secret": "shh",
        "refresh_token": "1//refresh",
        "quota_project_id": "my-project",
        "type": "authorized_user"
    }"#;

    #[test]
    fn parses_authorized_user() {
        let creds = Credentials::from_json(ADC).unwrap();
        let Credentials::AuthorizedUser(user) = &creds else {
            panic!("expected authorized user, got {creds:?}");
        };
        assert_eq!(user.refresh_token, "1//refresh");
        assert_eq!(creds.quota_project(), Some("my-project"));
    }

    #[test]
    fn rejects_service_accounts() {
        let err = Credentials::from_json(r#"{"type": "service_account", "private_key": "k"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("service_account"), "{err}");
    }

    #[test]
    fn explicit_token_wins() {
        let creds = Credentials::resolve(Some(" ya29.token \n".to_string()), None).unwrap();
        assert!(matches!(creds, Credentials::AccessToken(t) if t == "ya29.token"));
    }

    #[test]
    fn refresh_token_placeholder_starts_expired() {
        let token = TimeBoundAccessToken::from_refresh_token("1//refresh");
        assert!(token.is_expired());
        assert_eq!(
            token.token.refresh_token().map(|t| t.secret().as_str()),
            Some("1//refresh")
        );
    }

    #[test]
    fn expiry_keeps_a_safety_buffer() {
        let mut token = StandardTokenResponse::new(
            AccessToken::new("a".to_string()),
            BasicTokenType::Bearer,
            EmptyExtraTokenFields {},
        );
        token.set_expires_in(Some(&Duration::from_secs(3599)));
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        assert_eq!(expiry_of(&token, now), now + Duration::from_secs(3299));
    }

    #[tokio::test]
    async fn static_source_hands_out_token() {
        let source = TokenSource::new(&Credentials::AccessToken("ya29.x".to_string()));
        assert_eq!(source.access_token().await.unwrap(), "ya29.x");
    }
}

use analytics_core::FetchError;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use std::fmt;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub const REDDIT_AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";

/// Tokens are renewed once they get this close to expiring.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Reddit issues one-hour tokens when it does not say otherwise.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Script-app credentials for the password grant.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    pub fn expires_within(&self, margin: Duration) -> bool {
        SystemTime::now() + margin >= self.expires_at
    }

    fn from_response(response: &BasicTokenResponse) -> Self {
        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        Self {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope,
        }
    }
}

/// Obtains and caches bearer tokens for the OAuth API.
pub struct TokenProvider {
    oauth: BasicClient,
    credentials: RedditCredentials,
    http: reqwest::Client,
    token: Mutex<Option<RedditToken>>,
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    pub fn new(
        credentials: RedditCredentials,
        token_url: &Url,
        http: reqwest::Client,
    ) -> Result<Self, FetchError> {
        let auth_url = AuthUrl::new(REDDIT_AUTHORIZE_URL.to_string()).map_err(|e| {
            FetchError::AuthenticationFailed {
                reason: format!("invalid authorize URL: {}", e),
            }
        })?;
        let token_url = TokenUrl::new(token_url.to_string()).map_err(|e| {
            FetchError::AuthenticationFailed {
                reason: format!("invalid token URL: {}", e),
            }
        })?;

        let oauth = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            oauth,
            credentials,
            http,
            token: Mutex::new(None),
        })
    }

    pub fn required_scopes() -> Vec<&'static str> {
        vec!["read"]
    }

    /// Return a valid access token, requesting a new one if needed.
    pub async fn access_token(&self) -> Result<String, FetchError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if !token.expires_within(REFRESH_MARGIN) {
                return Ok(token.access_token.clone());
            }
            debug!("Cached Reddit token is about to expire, requesting a new one");
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token so the next call authenticates again.
    pub async fn invalidate(&self) {
        let mut guard = self.token.lock().await;
        if guard.take().is_some() {
            warn!("Discarding rejected Reddit token");
        }
    }

    pub async fn cached_token(&self) -> Option<RedditToken> {
        self.token.lock().await.clone()
    }

    async fn request_token(&self) -> Result<RedditToken, FetchError> {
        let username = ResourceOwnerUsername::new(self.credentials.username.clone());
        let password = ResourceOwnerPassword::new(self.credentials.password.clone());
        let http = self.http.clone();

        let mut request = self.oauth.exchange_password(&username, &password);
        for scope in Self::required_scopes() {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let response = request
            .request_async(move |req| send_token_request(http, req))
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(response) => FetchError::AuthenticationFailed {
                    reason: response.to_string(),
                },
                RequestTokenError::Request(e) if e.is_timeout() => FetchError::RequestTimeout,
                RequestTokenError::Request(e) => FetchError::Network {
                    reason: e.to_string(),
                },
                // Reddit answers bad credentials with 200 and an error body.
                RequestTokenError::Parse(e, _) => FetchError::AuthenticationFailed {
                    reason: format!("unexpected token response: {}", e),
                },
                RequestTokenError::Other(reason) => FetchError::AuthenticationFailed { reason },
            })?;

        let token = RedditToken::from_response(&response);
        info!(
            "Authenticated with Reddit as {} (scopes: {:?})",
            self.credentials.username, token.scope
        );
        Ok(token)
    }
}

/// Sends the token request with the shared client so the configured user agent is used.
async fn send_token_request(
    http: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

use std::time::Duration;

use http::{Method, Request, header};
use url::Url;

use crate::auth_code::AuthorizationCodeGrant;
use crate::client_credentials::ClientCredentialsGrant;
use crate::error::{Error, Result};
use crate::http_client::{HttpClient, RequestTimeout};
use crate::types::{RefreshRequestParameters, TokenGrantType, join_scopes};

pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Begin building a [`Client`].
///
/// ```
/// let client = treadle::client("oauth-client-id")
///     .with_token_endpoint(url::Url::parse("https://login.example.com/oauth2/token").unwrap())
///     .unwrap();
/// ```
pub fn client(client_id: impl Into<String>) -> ClientBuilder {
    ClientBuilder {
        client_id: client_id.into(),
    }
}

/// A [`Client`] missing its token endpoint.
#[derive(Debug)]
pub struct ClientBuilder {
    client_id: String,
}

impl ClientBuilder {
    /// Finish the client with the token endpoint it will exchange codes and
    /// refresh tokens against (RFC 6749 §3.2).
    pub fn with_token_endpoint(self, token_endpoint: Url) -> Result<Client> {
        if self.client_id.is_empty() {
            return Err(Error::Config("client id must not be empty".into()));
        }
        Ok(Client {
            client_id: self.client_id,
            token_endpoint,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

/// An OAuth 2.0 public client (RFC 6749 §2.1) capable of making requests to
/// a token endpoint.
///
/// Immutable and cheap to clone; share it freely between flows. The actual
/// transport is an injected [`HttpClient`], so the client itself never opens
/// outbound connections.
#[derive(Debug, Clone)]
pub struct Client {
    client_id: String,
    token_endpoint: Url,
    request_timeout: Duration,
}

impl Client {
    /// The public client identifier (RFC 6749 §2.2).
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// Timeout applied to each token endpoint request. Defaults to 30 s.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// A copy of this client with a different request timeout.
    pub fn with_request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    /// Begin an authorization code grant with PKCE against `auth_endpoint`
    /// (RFC 6749 §4.1, RFC 7636, RFC 8252).
    ///
    /// A fresh PKCE pair is generated per grant.
    pub fn authorization_code_grant(&self, auth_endpoint: Url) -> AuthorizationCodeGrant {
        AuthorizationCodeGrant::new(self.clone(), auth_endpoint)
    }

    /// Begin a client credentials grant with a pre-shared secret
    /// (RFC 6749 §4.4).
    pub fn client_credentials_grant(&self, client_secret: &str) -> ClientCredentialsGrant {
        ClientCredentialsGrant::new(self.clone(), client_secret)
    }

    /// Refresh an access token (RFC 6749 §6).
    ///
    /// The token endpoint's response is returned verbatim, whatever its
    /// status; inspect it to decide whether the refresh succeeded.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(client_id = %self.client_id))
    )]
    pub fn refresh<C: HttpClient>(
        &self,
        http: &C,
        refresh_token: &str,
        scopes: &[&str],
    ) -> Result<http::Response<Vec<u8>>> {
        let request = self.build_refresh_request(refresh_token, scopes)?;
        http.send_http(request).map_err(Error::http)
    }

    /// Like [`refresh`](Self::refresh), but run on a blocking worker of the
    /// current tokio runtime.
    #[cfg(feature = "tokio")]
    pub async fn refresh_async<C>(
        &self,
        http: C,
        refresh_token: &str,
        scopes: &[&str],
    ) -> Result<http::Response<Vec<u8>>>
    where
        C: HttpClient + Send + Sync + 'static,
    {
        let client = self.clone();
        let refresh_token = refresh_token.to_owned();
        let scopes: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
        tokio::task::spawn_blocking(move || {
            let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();
            client.refresh(&http, &refresh_token, &scopes)
        })
        .await
        .map_err(Error::Worker)?
    }

    pub(crate) fn build_refresh_request(
        &self,
        refresh_token: &str,
        scopes: &[&str],
    ) -> Result<Request<Vec<u8>>> {
        let body = serde_html_form::to_string(RefreshRequestParameters {
            grant_type: TokenGrantType::RefreshToken,
            refresh_token,
            client_id: &self.client_id,
            scope: join_scopes(scopes),
        })?;
        self.build_token_request(body)
    }

    /// POST to the token endpoint with a urlencoded `body` and the
    /// per-request timeout attached. Shared by all grants.
    pub(crate) fn build_token_request(&self, body: String) -> Result<Request<Vec<u8>>> {
        Ok(Request::builder()
            .method(Method::POST)
            .uri(self.token_endpoint.as_str())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .extension(RequestTimeout(self.request_timeout))
            .body(body.into_bytes())?)
    }
}

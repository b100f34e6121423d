use std::thread;

use url::Url;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http_client::HttpClient;
use crate::listener::RedirectListener;
use crate::pkce::Pkce;
use crate::response::{Response, Status};
use crate::types::{TokenGrantType, TokenRequestParameters, join_scopes};
use crate::utils::random_token;

/// Authorization code grant with PKCE over a loopback redirect
/// (RFC 6749 §4.1, RFC 7636, RFC 8252).
///
/// Configure the redirect and the pages shown to the user, then call
/// [`authorize`](Self::authorize): it spins up the one-shot listener, sends
/// the user agent to the authorization endpoint, waits for the redirect and
/// exchanges the received code for tokens.
///
/// A grant is single-use: `authorize` consumes it, along with the PKCE pair
/// generated for it.
pub struct AuthorizationCodeGrant {
    client: Client,
    auth_endpoint: Url,
    pkce: Pkce,
    redirect_path: String,
    redirect_ports: Vec<u16>,
    success_response: Response,
    error_response: Response,
}

impl AuthorizationCodeGrant {
    pub(crate) fn new(client: Client, auth_endpoint: Url) -> Self {
        Self {
            client,
            auth_endpoint,
            pkce: Pkce::new(),
            // A random default path, which not every authorization server
            // accepts as a registered redirect.
            redirect_path: format!("/{}", random_token(16)),
            redirect_ports: vec![0],
            success_response: Response::html(Status::Ok, "<html><body>Success</body></html>"),
            error_response: Response::html(Status::Ok, "<html><body>Error</body></html>"),
        }
    }

    /// The PKCE pair bound to this grant.
    pub fn pkce(&self) -> &Pkce {
        &self.pkce
    }

    /// Path component of the redirect URI. Must be absolute.
    ///
    /// Defaults to a random token path.
    pub fn set_redirect_path(mut self, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(Error::Config("redirect path must be absolute".into()));
        }
        self.redirect_path = path;
        Ok(self)
    }

    /// Ports to attempt to bind, in order; later entries are fallbacks for
    /// ports already in use.
    ///
    /// Defaults to `[0]`, a system-assigned port — unpredictable, which not
    /// every authorization server accepts.
    pub fn set_redirect_ports(mut self, ports: &[u16]) -> Self {
        self.redirect_ports = ports.to_vec();
        self
    }

    /// Page shown to the resource owner after successful authorization.
    pub fn set_success_response(mut self, response: Response) -> Self {
        self.success_response = response;
        self
    }

    /// Page shown to the resource owner after failed authorization.
    pub fn set_error_response(mut self, response: Response) -> Self {
        self.error_response = response;
        self
    }

    /// Run the full flow: listen, hand `browser` the authorization URI, wait
    /// for the redirect, then exchange the code at the token endpoint.
    ///
    /// `browser` runs on its own thread — the calling thread is busy blocking
    /// on the redirect before the callback even fires. Its failures are not
    /// observed; launching the user agent is best-effort.
    ///
    /// The token endpoint's response is returned verbatim, whatever its
    /// status. The listener socket is released on every path out of here.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(client_id = %self.client.client_id()))
    )]
    pub fn authorize<C, B>(
        self,
        http: &C,
        browser: B,
        scopes: &[&str],
    ) -> Result<http::Response<Vec<u8>>>
    where
        C: HttpClient,
        B: FnOnce(Url) + Send + 'static,
    {
        self.request_auth_code(browser, scopes)?.access_token(http)
    }

    /// Like [`authorize`](Self::authorize), but run on a blocking worker of
    /// the current tokio runtime.
    #[cfg(feature = "tokio")]
    pub async fn authorize_async<C, B>(
        self,
        http: C,
        browser: B,
        scopes: &[&str],
    ) -> Result<http::Response<Vec<u8>>>
    where
        C: HttpClient + Send + Sync + 'static,
        B: FnOnce(Url) + Send + 'static,
    {
        let scopes: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
        tokio::task::spawn_blocking(move || {
            let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();
            self.authorize(&http, browser, &scopes)
        })
        .await
        .map_err(Error::Worker)?
    }

    /// Drive the user-agent half of the flow and return the code-obtained
    /// stage, ready for the token exchange.
    fn request_auth_code<B>(self, browser: B, scopes: &[&str]) -> Result<CodeGrant>
    where
        B: FnOnce(Url) + Send + 'static,
    {
        let mut listener = RedirectListener::start(&self.redirect_path, &self.redirect_ports)?;
        let auth_uri = self.build_auth_uri(listener.redirect_uri(), listener.csrf_token(), scopes);
        let redirect_uri = listener.redirect_uri().to_string();

        let Self {
            client,
            pkce,
            success_response,
            error_response,
            ..
        } = self;
        listener.set_success_response(success_response);
        listener.set_error_response(error_response);

        // The listener is fully started before the user agent learns the
        // URI, and the launch must not run on the thread about to block in
        // receive.
        thread::spawn(move || browser(auth_uri));

        let code = listener.receive()?;
        Ok(CodeGrant {
            client,
            pkce,
            redirect_uri,
            code,
        })
    }

    /// Assemble the authorization URI (RFC 6749 §4.1.1).
    ///
    /// Query parameters already present on the endpoint are retained, as
    /// RFC 6749 §3.1 requires, with the grant's parameters appended.
    fn build_auth_uri(&self, redirect_uri: &Url, csrf_token: &str, scopes: &[&str]) -> Url {
        let mut auth_uri = self.auth_endpoint.clone();
        auth_uri.set_fragment(None);
        {
            let mut pairs = auth_uri.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("client_id", self.client.client_id());
            pairs.append_pair("state", csrf_token);
            pairs.append_pair("code_challenge", self.pkce.challenge());
            pairs.append_pair("code_challenge_method", Pkce::METHOD);
            pairs.append_pair("redirect_uri", redirect_uri.as_str());
            if let Some(scope) = join_scopes(scopes) {
                pairs.append_pair("scope", &scope);
            }
        }
        auth_uri
    }
}

/// The flow after the redirect delivered an authorization code. Its only
/// operation is the token exchange (RFC 6749 §4.1.3).
struct CodeGrant {
    client: Client,
    pkce: Pkce,
    redirect_uri: String,
    code: String,
}

impl CodeGrant {
    fn build_token_request(&self) -> Result<http::Request<Vec<u8>>> {
        let body = serde_html_form::to_string(TokenRequestParameters {
            grant_type: TokenGrantType::AuthorizationCode,
            client_id: self.client.client_id(),
            code_verifier: self.pkce.verifier(),
            code: &self.code,
            redirect_uri: &self.redirect_uri,
        })?;
        self.client.build_token_request(body)
    }

    fn access_token<C: HttpClient>(&self, http: &C) -> Result<http::Response<Vec<u8>>> {
        let request = self.build_token_request()?;
        http.send_http(request).map_err(Error::http)
    }
}

/// Browser callback that opens the system web browser.
#[cfg(feature = "browser-open")]
pub fn open_system_browser(uri: Url) {
    let _ = webbrowser::open(uri.as_str());
}

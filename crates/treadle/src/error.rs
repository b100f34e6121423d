use miette::Diagnostic;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors emitted while configuring or driving a grant.
///
/// A token endpoint answering with a non-2xx status is *not* an error: the
/// response is handed back verbatim so callers can inspect status and body.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration supplied by the caller.
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(treadle::config))]
    Config(String),

    /// None of the configured redirect ports could be bound.
    #[error("could not bind a loopback port")]
    #[diagnostic(
        code(treadle::bind),
        help("free one of the configured ports or pass 0 for a system-assigned port")
    )]
    Bind(#[source] std::io::Error),

    /// The redirect listener rejected the callback request.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Listener(#[from] ListenerError),

    /// Assembling the token request failed.
    #[error("could not assemble token request")]
    #[diagnostic(code(treadle::request))]
    Request(#[from] http::Error),

    /// Form serialization of a token request body failed.
    #[error(transparent)]
    #[diagnostic(code(treadle::urlencode))]
    UrlEncoding(#[from] serde_html_form::ser::Error),

    /// The injected HTTP client failed to reach the token endpoint.
    #[error("token endpoint request failed")]
    #[diagnostic(
        code(treadle::http),
        help("transport-level failure; the token endpoint was never reached or the connection died")
    )]
    Http(#[source] BoxError),

    /// The worker running a blocking stage terminated abnormally.
    #[cfg(feature = "tokio")]
    #[error("blocking worker terminated abnormally")]
    #[diagnostic(code(treadle::worker))]
    Worker(#[source] tokio::task::JoinError),
}

impl Error {
    /// Wrap a transport error reported by an injected [`HttpClient`].
    ///
    /// [`HttpClient`]: crate::http_client::HttpClient
    pub(crate) fn http(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Http(Box::new(source))
    }
}

/// Why a [`RedirectListener`] receive failed.
///
/// For every protocol rejection the listener has already written the
/// corresponding HTTP reply to the user agent before the error surfaces here.
///
/// [`RedirectListener`]: crate::listener::RedirectListener
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ListenerError {
    /// The request line could not be parsed as HTTP.
    #[error("malformed request line: {0:?}")]
    #[diagnostic(code(treadle::listener::malformed_request))]
    MalformedRequest(String),

    /// Any method other than GET. Answered with 405.
    #[error("unsupported method {0:?}")]
    #[diagnostic(code(treadle::listener::method_not_allowed))]
    WrongMethod(String),

    /// The request path did not match the registered redirect path. Answered with 404.
    #[error("requested invalid path {0:?}")]
    #[diagnostic(code(treadle::listener::wrong_path))]
    WrongPath(String),

    /// The `state` parameter was missing or did not echo the CSRF token.
    #[error("missing or invalid state token")]
    #[diagnostic(
        code(treadle::listener::bad_state),
        help("the redirect did not carry the state parameter minted for this flow")
    )]
    BadState,

    /// The redirect carried neither `code` nor `error`.
    #[error("missing authorization code")]
    #[diagnostic(code(treadle::listener::missing_code))]
    MissingCode,

    /// The authorization server reported an error code.
    #[error("authorization denied: {0}")]
    #[diagnostic(
        code(treadle::listener::denied),
        help("see RFC 6749 section 4.1.2.1 for the error code registry")
    )]
    Denied(String),

    /// The listener was closed while waiting for the redirect.
    #[error("listener closed while waiting for the redirect")]
    #[diagnostic(code(treadle::listener::interrupted))]
    Interrupted,

    /// Transport error on the listening or client socket.
    #[error(transparent)]
    #[diagnostic(code(treadle::listener::io))]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

//! One-shot loopback server receiving the authorization redirect.
//!
//! We only listen for the single expected response, discarding everything
//! else. This looks like reinventing the wheel, but it sidesteps the attack
//! surface of a general HTTP server: no charsets, no compression, no request
//! bodies, no transfer encodings, no protocol upgrades, no header handling.
//! Certificates for localhost are unobtainable anyway, so HTTP/2 and TLS are
//! off the table and a text parser for the request line is all that is
//! needed.

use std::io::{BufRead, BufReader, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use url::Url;

use crate::error::{Error, ListenerError};
use crate::query;
use crate::response::{Response, Status};
use crate::utils::random_token;

/// Listens on `127.0.0.1` for the authorization server's redirect.
///
/// The listener accepts exactly one request: [`receive`](Self::receive)
/// consumes it, and the listening socket is released when the value is
/// dropped, on every exit path.
#[derive(Debug)]
pub struct RedirectListener {
    socket: TcpListener,
    addr: SocketAddr,
    redirect_uri: Url,
    csrf_token: String,
    success_response: Response,
    error_response: Response,
    closed: Arc<AtomicBool>,
}

impl RedirectListener {
    /// Bind a listener on the loopback interface, ready to accept.
    ///
    /// `path` must be absolute. Each entry of `ports` is tried in order and
    /// the first bindable one wins; a port taken by someone else falls
    /// through to the next candidate. An empty list (or `[0]`) asks the
    /// system for an ephemeral port. A fresh CSRF token is minted per
    /// listener.
    pub fn start(path: &str, ports: &[u16]) -> Result<Self, Error> {
        if !path.starts_with('/') {
            return Err(Error::Config("redirect path must be absolute".into()));
        }
        let socket = try_bind(ports)?;
        let addr = socket.local_addr().map_err(Error::Bind)?;
        // The literal address, not "localhost", per RFC 8252 §8.3.
        let redirect_uri = Url::parse(&format!("http://127.0.0.1:{}{}", addr.port(), path))
            .map_err(|_| Error::Config(format!("redirect path {path:?} is not valid in a URI")))?;
        Ok(Self {
            socket,
            addr,
            redirect_uri,
            csrf_token: random_token(16),
            success_response: Response::html(Status::Ok, "<html><body>Success</body></html>"),
            error_response: Response::html(Status::BadRequest, "<html><body>Error</body></html>"),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The URI the authorization server should redirect to: always
    /// `http://127.0.0.1:<port><path>`.
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// The `state` value the redirect must echo.
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Replace the reply sent after a successful redirect.
    pub fn set_success_response(&mut self, response: Response) {
        self.success_response = response;
    }

    /// Replace the reply sent when the authorization server reports an error.
    pub fn set_error_response(&mut self, response: Response) {
        self.error_response = response;
    }

    /// A handle that can interrupt a pending [`receive`](Self::receive) from
    /// another thread.
    pub fn closer(&self) -> ListenerCloser {
        ListenerCloser {
            closed: self.closed.clone(),
            addr: self.addr,
        }
    }

    /// Release the listening socket without waiting for a request.
    pub fn close(self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Block until one client connects, validate its request and extract the
    /// authorization code.
    ///
    /// The matching HTTP reply is written and flushed before this returns,
    /// on the failure paths too. Consumes the listener: the socket is
    /// released no matter the outcome.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(path = %self.redirect_uri.path()))
    )]
    pub fn receive(self) -> Result<String, ListenerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ListenerError::Interrupted);
        }
        let (stream, _) = self.socket.accept()?;
        if self.closed.load(Ordering::SeqCst) {
            return Err(ListenerError::Interrupted);
        }
        self.handle_client(stream)
    }

    fn handle_client(&self, stream: TcpStream) -> Result<String, ListenerError> {
        let mut line = Vec::new();
        {
            let mut reader = BufReader::new(&stream);
            reader.read_until(b'\n', &mut line)?;
        }
        let request_line = String::from_utf8_lossy(&line);
        let mut sink = &stream;
        match self.evaluate(request_line.trim_end_matches(['\r', '\n'])) {
            Ok(code) => {
                self.success_response.write_to(&mut sink)?;
                Ok(code)
            }
            Err(rejection) => {
                rejection.reply.write_to(&mut sink)?;
                Err(rejection.error)
            }
        }
    }

    /// Steps 2–7 of the receive algorithm: request line, path, state, then
    /// `error` before `code`.
    fn evaluate(&self, request_line: &str) -> Result<String, Rejection> {
        let request_uri = parse_request_line(request_line)?;
        if !paths_match(self.redirect_uri.path(), request_uri.path()) {
            return Err(Rejection::new(
                Response::empty(Status::NotFound),
                ListenerError::WrongPath(request_uri.path().to_owned()),
            ));
        }
        let mut params = query::parse(request_uri.query());
        if params.get("state").map(String::as_str) != Some(self.csrf_token.as_str()) {
            return Err(Rejection::new(
                Response::empty(Status::BadRequest),
                ListenerError::BadState,
            ));
        }
        if let Some(error) = params.remove("error") {
            return Err(Rejection {
                reply: self.error_response.clone(),
                error: ListenerError::Denied(error),
            });
        }
        match params.remove("code") {
            Some(code) => Ok(code),
            None => Err(Rejection::new(
                Response::empty(Status::BadRequest),
                ListenerError::MissingCode,
            )),
        }
    }
}

/// Interrupts a listener blocked in accept.
///
/// Cheap to clone and safe to use from any thread. Closing is idempotent;
/// the first call wakes the accept loop with a throwaway connection so the
/// listener can observe the flag and fail with
/// [`ListenerError::Interrupted`].
#[derive(Debug, Clone)]
pub struct ListenerCloser {
    closed: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ListenerCloser {
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = TcpStream::connect(self.addr);
        }
    }
}

/// A protocol rejection: the reply owed to the user agent plus the error
/// owed to the caller.
#[derive(Debug)]
struct Rejection {
    reply: Response,
    error: ListenerError,
}

impl Rejection {
    fn new(reply: Response, error: ListenerError) -> Self {
        Self { reply, error }
    }
}

fn try_bind(ports: &[u16]) -> Result<TcpListener, Error> {
    if ports.is_empty() {
        return TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(Error::Bind);
    }
    let mut last_in_use = None;
    for &port in ports {
        match TcpListener::bind((Ipv4Addr::LOCALHOST, port)) {
            Ok(socket) => return Ok(socket),
            Err(e) if e.kind() == ErrorKind::AddrInUse => last_in_use = Some(e),
            Err(e) => return Err(Error::Bind(e)),
        }
    }
    Err(Error::Bind(last_in_use.unwrap_or_else(|| {
        ErrorKind::AddrInUse.into()
    })))
}

/// Extract the request URI from an HTTP/1.1 request line
/// (RFC 9112 §3: method, target, version, separated by single spaces).
fn parse_request_line(request_line: &str) -> Result<Url, Rejection> {
    let words: Vec<&str> = request_line.split(' ').collect();
    if words.len() < 3 {
        return Err(Rejection::new(
            Response::empty(Status::BadRequest),
            ListenerError::MalformedRequest(request_line.to_owned()),
        ));
    }
    if words[0] != "GET" {
        return Err(Rejection::new(
            Response::empty(Status::MethodNotAllowed),
            ListenerError::WrongMethod(words[0].to_owned()),
        ));
    }
    // Targets arrive in origin-form; resolving against a synthetic loopback
    // base also normalizes dot segments.
    Url::parse("http://127.0.0.1/")
        .and_then(|base| base.join(words[1]))
        .map_err(|_| {
            Rejection::new(
                Response::empty(Status::BadRequest),
                ListenerError::MalformedRequest(request_line.to_owned()),
            )
        })
}

/// Path equality over the path component only: normalized string comparison,
/// insensitive to a single trailing slash. Query and fragment never
/// participate.
fn paths_match(expected: &str, requested: &str) -> bool {
    fn normalize(path: &str) -> &str {
        if path.len() > 1 {
            path.strip_suffix('/').unwrap_or(path)
        } else {
            path
        }
    }
    normalize(expected) == normalize(requested)
}

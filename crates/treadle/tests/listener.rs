//! Socket-level behavior of the one-shot redirect listener.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use treadle::listener::RedirectListener;
use treadle::{Error, ListenerError, Response, Status};
use url::Url;

/// Run `receive` on its own thread while the given request is played against
/// the listener; returns the receive outcome and the raw HTTP reply.
fn drive(listener: RedirectListener, request: &str) -> (Result<String, ListenerError>, String) {
    let port = listener.redirect_uri().port().unwrap();
    let request = request.to_owned();
    let handle = thread::spawn(move || listener.receive());

    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).unwrap();

    (handle.join().unwrap(), reply)
}

/// With the listening socket gone, a fresh SYN to the port is refused.
/// (Rebinding instead would race against TIME_WAIT leftovers of the served
/// connection.)
fn assert_port_released(port: u16) {
    assert!(TcpStream::connect(("127.0.0.1", port)).is_err());
}

fn start(path: &str) -> (RedirectListener, String, String) {
    let listener = RedirectListener::start(path, &[]).unwrap();
    let path = listener.redirect_uri().path().to_owned();
    let csrf = listener.csrf_token().to_owned();
    (listener, path, csrf)
}

#[test]
fn valid_redirect_yields_code_and_success_page() {
    let (listener, path, csrf) = start("/callback");
    let (result, reply) = drive(
        listener,
        &format!("GET {path}?code=foobar&state={csrf} HTTP/1.1\r\n\r\n"),
    );
    assert_eq!(result.unwrap(), "foobar");
    assert!(reply.starts_with("HTTP/1.1 200 OK\n"));
    assert!(reply.contains("Connection: Close\n"));
    assert!(reply.contains("<html><body>Success</body></html>"));
}

#[test]
fn query_order_does_not_matter() {
    let (listener, path, csrf) = start("/callback");
    let (result, _) = drive(
        listener,
        &format!("GET {path}?state={csrf}&code=foobar HTTP/1.1\r\n\r\n"),
    );
    assert_eq!(result.unwrap(), "foobar");
}

#[test]
fn wrong_state_is_rejected_with_400() {
    let (listener, path, _) = start("/callback");
    let (result, reply) = drive(
        listener,
        &format!("GET {path}?code=foobar&state=wrong HTTP/1.1\r\n\r\n"),
    );
    assert!(matches!(result.unwrap_err(), ListenerError::BadState));
    assert_eq!(reply, "HTTP/1.1 400 Bad Request\nConnection: Close\n\n");
}

#[test]
fn missing_state_is_rejected_with_400() {
    let (listener, path, _) = start("/callback");
    let (result, reply) = drive(listener, &format!("GET {path}?code=foobar HTTP/1.1\r\n\r\n"));
    assert!(matches!(result.unwrap_err(), ListenerError::BadState));
    assert!(reply.starts_with("HTTP/1.1 400 Bad Request\n"));
}

#[test]
fn wrong_path_is_rejected_with_404() {
    let (listener, _, csrf) = start("/callback");
    let (result, reply) = drive(
        listener,
        &format!("GET /elsewhere?code=foobar&state={csrf} HTTP/1.1\r\n\r\n"),
    );
    assert!(matches!(result.unwrap_err(), ListenerError::WrongPath(p) if p == "/elsewhere"));
    assert_eq!(reply, "HTTP/1.1 404 Not Found\nConnection: Close\n\n");
}

#[test]
fn trailing_slash_still_matches() {
    let (listener, path, csrf) = start("/callback");
    let (result, _) = drive(
        listener,
        &format!("GET {path}/?code=foobar&state={csrf} HTTP/1.1\r\n\r\n"),
    );
    assert_eq!(result.unwrap(), "foobar");
}

#[test]
fn authorization_error_gets_error_page() {
    let (listener, path, csrf) = start("/callback");
    let (result, reply) = drive(
        listener,
        &format!("GET {path}?error=access_denied&state={csrf} HTTP/1.1\r\n\r\n"),
    );
    assert!(matches!(result.unwrap_err(), ListenerError::Denied(code) if code == "access_denied"));
    assert!(reply.starts_with("HTTP/1.1 400 Bad Request\n"));
    assert!(reply.contains("<html><body>Error</body></html>"));
}

#[test]
fn neither_code_nor_error_is_rejected_with_400() {
    let (listener, path, csrf) = start("/callback");
    let (result, reply) = drive(listener, &format!("GET {path}?state={csrf} HTTP/1.1\r\n\r\n"));
    assert!(matches!(result.unwrap_err(), ListenerError::MissingCode));
    assert!(reply.starts_with("HTTP/1.1 400 Bad Request\n"));
}

#[test]
fn post_is_rejected_with_405() {
    let (listener, path, csrf) = start("/callback");
    let (result, reply) = drive(
        listener,
        &format!("POST {path}?code=foobar&state={csrf} HTTP/1.1\r\n\r\n"),
    );
    assert!(matches!(result.unwrap_err(), ListenerError::WrongMethod(m) if m == "POST"));
    assert_eq!(reply, "HTTP/1.1 405 Method Not Allowed\nConnection: Close\n\n");
}

#[test]
fn garbage_request_line_is_rejected_with_400() {
    let (listener, _, _) = start("/callback");
    let (result, reply) = drive(listener, "EHLO LOCALHOST\r\n\r\n");
    assert!(matches!(result.unwrap_err(), ListenerError::MalformedRequest(_)));
    assert!(reply.starts_with("HTTP/1.1 400 Bad Request\n"));
}

#[test]
fn configured_responses_replace_defaults() {
    let (mut listener, path, csrf) = start("/callback");
    listener.set_success_response(Response::redirect(
        Url::parse("https://example.com/signed-in").unwrap(),
    ));
    let (result, reply) = drive(
        listener,
        &format!("GET {path}?code=ok&state={csrf} HTTP/1.1\r\n\r\n"),
    );
    assert_eq!(result.unwrap(), "ok");
    assert_eq!(
        reply,
        "HTTP/1.1 303 See Other\nConnection: Close\nLocation: https://example.com/signed-in\n\n"
    );

    let (mut listener, path, csrf) = start("/callback");
    listener.set_error_response(Response::html(Status::Ok, "<html><body>denied</body></html>"));
    let (result, reply) = drive(
        listener,
        &format!("GET {path}?error=access_denied&state={csrf} HTTP/1.1\r\n\r\n"),
    );
    assert!(result.is_err());
    assert!(reply.starts_with("HTTP/1.1 200 OK\n"));
    assert!(reply.contains("denied"));
}

#[test]
fn close_interrupts_blocked_receive_and_releases_port() {
    let (listener, _, _) = start("/callback");
    let port = listener.redirect_uri().port().unwrap();
    let closer = listener.closer();

    let handle = thread::spawn(move || listener.receive());
    thread::sleep(Duration::from_millis(50));
    closer.close();

    let result = handle.join().unwrap();
    assert!(matches!(result.unwrap_err(), ListenerError::Interrupted));
    assert_port_released(port);
}

#[test]
fn close_before_receive_interrupts_immediately() {
    let (listener, _, _) = start("/callback");
    listener.closer().close();
    assert!(matches!(
        listener.receive().unwrap_err(),
        ListenerError::Interrupted
    ));
}

#[test]
fn closer_is_idempotent() {
    let (listener, _, _) = start("/callback");
    let closer = listener.closer();
    let handle = thread::spawn(move || listener.receive());
    closer.close();
    closer.close();
    closer.close();
    assert!(matches!(
        handle.join().unwrap().unwrap_err(),
        ListenerError::Interrupted
    ));
}

#[test]
fn port_is_released_after_receive() {
    let (listener, path, csrf) = start("/callback");
    let port = listener.redirect_uri().port().unwrap();
    let (result, _) = drive(
        listener,
        &format!("GET {path}?code=x&state={csrf} HTTP/1.1\r\n\r\n"),
    );
    assert!(result.is_ok());
    assert_port_released(port);
}

#[test]
fn port_is_released_after_protocol_error() {
    let (listener, _, _) = start("/callback");
    let port = listener.redirect_uri().port().unwrap();
    let (result, _) = drive(listener, "EHLO LOCALHOST\r\n\r\n");
    assert!(result.is_err());
    assert_port_released(port);
}

#[test]
fn explicit_close_releases_port() {
    let (listener, _, _) = start("/callback");
    let port = listener.redirect_uri().port().unwrap();
    listener.close();
    // nothing ever connected, so rebinding is also safe here
    TcpListener::bind(("127.0.0.1", port)).unwrap();
}

#[test]
fn empty_port_list_means_system_assigned() {
    let listener = RedirectListener::start("/cb", &[]).unwrap();
    assert!(listener.redirect_uri().port().unwrap() > 0);
}

#[test]
fn port_zero_means_system_assigned() {
    let listener = RedirectListener::start("/cb", &[0]).unwrap();
    assert!(listener.redirect_uri().port().unwrap() > 0);
}

#[test]
fn bind_falls_through_taken_ports() {
    let taken: Vec<TcpListener> = (0..3)
        .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    let taken_ports: Vec<u16> = taken
        .iter()
        .map(|l| l.local_addr().unwrap().port())
        .collect();
    let free_port = {
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };

    let ports = [taken_ports[0], taken_ports[1], taken_ports[2], free_port];
    let listener = RedirectListener::start("/cb", &ports).unwrap();
    assert_eq!(listener.redirect_uri().port(), Some(free_port));
}

#[test]
fn bind_fails_when_all_ports_taken() {
    let taken: Vec<TcpListener> = (0..3)
        .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    let ports: Vec<u16> = taken
        .iter()
        .map(|l| l.local_addr().unwrap().port())
        .collect();

    let err = RedirectListener::start("/cb", &ports).unwrap_err();
    assert!(matches!(err, Error::Bind(_)));
}

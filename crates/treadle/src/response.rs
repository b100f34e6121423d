//! Replies the loopback listener can send to the resource owner's user agent.

use std::io::{self, Write};

use url::Url;

/// Status lines the listener may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    SeeOther,
    BadRequest,
    NotFound,
    MethodNotAllowed,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::SeeOther => 303,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::SeeOther => "See Other",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

/// A minimal HTTP/1.1 reply.
///
/// Every variant closes the connection; the listener serves exactly one
/// request per flow. Headers are US-ASCII, HTML bodies are UTF-8 with an
/// explicit `Content-Length` in bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Status line and `Connection: Close` only.
    Empty { status: Status },
    /// An HTML page served as `text/html; charset=UTF-8`.
    Html { status: Status, body: String },
    /// A `303 See Other` pointing the user agent at `target`.
    Redirect { target: Url },
}

impl Response {
    pub fn empty(status: Status) -> Self {
        Response::Empty { status }
    }

    pub fn html(status: Status, body: impl Into<String>) -> Self {
        Response::Html {
            status,
            body: body.into(),
        }
    }

    pub fn redirect(target: Url) -> Self {
        Response::Redirect { target }
    }

    pub fn status(&self) -> Status {
        match self {
            Response::Empty { status } => *status,
            Response::Html { status, .. } => *status,
            Response::Redirect { .. } => Status::SeeOther,
        }
    }

    /// Write the full reply to `sink` and flush it.
    pub fn write_to<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        let status = self.status();
        write!(sink, "HTTP/1.1 {} {}\n", status.code(), status.reason())?;
        write!(sink, "Connection: Close\n")?;
        match self {
            Response::Empty { .. } => {}
            Response::Html { body, .. } => {
                write!(sink, "Content-Type: text/html; charset=UTF-8\n")?;
                write!(sink, "Content-Length: {}\n", body.len())?;
            }
            Response::Redirect { target } => {
                write!(sink, "Location: {}\n", target)?;
            }
        }
        write!(sink, "\n")?;
        if let Response::Html { body, .. } = self {
            write!(sink, "{}\n", body)?;
        }
        sink.flush()
    }
}

mod v1;

use crate::config::BindAddr;
use crate::signal::ShutdownListener;
use crate::{Error, State, StatusCodeError};

use std::convert::Infallible;
use std::net::SocketAddr;
use std::str::FromStr;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use hyper::header::{
    HeaderValue, IntoHeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN,
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE,
};
use hyper::http::request::Parts;
use hyper::server::conn::Http;
use hyper::service::Service;
use hyper::{Body, HeaderMap, Method, StatusCode, Uri};
use knockout_core::Caller;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket};
use tokio::time::Instant;

/// The maximum accepted size of a request body in bytes.
const MAX_BODY_SIZE: u64 = 16384;

/// The time a client has to transmit the request body.
const BODY_TIMEOUT: Duration = Duration::new(30, 0);

pub type Result = std::result::Result<Response, Error>;

pub async fn bind(addr: BindAddr, state: State) -> std::result::Result<(), Error> {
    let service = RootService {
        state: state.clone(),
    };
    let mut shutdown = state.shutdown.listen();

    match addr {
        BindAddr::Tcp(addr) => {
            let listener = tcp_listener(addr)?;
            log::info!("Listening on {}", addr);

            loop {
                tokio::select! {
                    res = listener.accept() => match res {
                        Ok((stream, addr)) => {
                            log::debug!("Accepting new connection from {:?}", addr);
                            serve(stream, service.clone(), shutdown.clone());
                        }
                        Err(err) => log::warn!("Failed to accept connection: {}", err),
                    },
                    _ = shutdown.recv() => break,
                }
            }
        }
        #[cfg(unix)]
        BindAddr::Unix(path) => {
            let listener = tokio::net::UnixListener::bind(&path)?;
            log::info!("Listening on {:?}", path);

            loop {
                tokio::select! {
                    res = listener.accept() => match res {
                        Ok((stream, _)) => serve(stream, service.clone(), shutdown.clone()),
                        Err(err) => log::warn!("Failed to accept connection: {}", err),
                    },
                    _ = shutdown.recv() => break,
                }
            }

            if let Err(err) = std::fs::remove_file(&path) {
                log::warn!("Failed to remove socket {:?}: {}", path, err);
            }
        }
        #[cfg(not(unix))]
        BindAddr::Unix(path) => {
            log::error!("Cannot bind to {:?}: unix sockets are not supported", path);
            return Err(std::io::Error::from(std::io::ErrorKind::Unsupported).into());
        }
    }

    log::debug!("Shutting down http server");
    Ok(())
}

fn tcp_listener(addr: SocketAddr) -> std::result::Result<TcpListener, Error> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };

    if let Err(err) = socket.set_reuseaddr(true) {
        log::warn!("Failed to set SO_REUSEADDR flag: {}", err);
    }

    socket.bind(addr)?;
    Ok(socket.listen(1024)?)
}

/// Serves a single connection until it is closed or the server shuts down.
fn serve<S>(stream: S, service: RootService, mut shutdown: ShutdownListener)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::task::spawn(async move {
        let conn = Http::new()
            .http1_keep_alive(true)
            .serve_connection(stream, service);
        tokio::pin!(conn);

        tokio::select! {
            res = &mut conn => {
                if let Err(err) = res {
                    log::warn!("Http error: {:?}", err);
                }
            }
            _ = shutdown.recv() => {
                log::debug!("Shutting down connection");
                conn.as_mut().graceful_shutdown();

                if let Err(err) = conn.await {
                    log::warn!("Http error: {:?}", err);
                }
            }
        }
    });
}

#[derive(Clone, Debug)]
struct RootService {
    state: State,
}

impl Service<hyper::Request<Body>> for RootService {
    type Response = hyper::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    #[inline]
    fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
        Box::pin(service_root(req, self.state.clone()))
    }
}

async fn service_root(
    req: hyper::Request<Body>,
    state: State,
) -> std::result::Result<hyper::Response<Body>, Infallible> {
    log::trace!("Received Request:");
    log::trace!("Head: {} {}", req.method(), req.uri());
    log::trace!("Headers: {:?}", req.headers());

    let req = Request::new(req, state);

    let origin = req.headers().get("Origin").cloned();

    let res = route(req).await;

    let mut resp = match res {
        Ok(resp) => resp,
        Err(err) => error_response(err),
    };

    log::debug!("Setting CORS for origin: {:?}", origin);
    if let Some(origin) = origin {
        resp = resp.header(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }

    resp = resp.header(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type,authorization"),
    );

    Ok(resp.build())
}

async fn route(req: Request) -> Result {
    if req.method() == Method::POST || req.method() == Method::PATCH {
        let length = req.content_length()?;
        if length > MAX_BODY_SIZE {
            return Err(StatusCodeError::payload_too_large().into());
        }
    }

    let path = req.uri().path().to_owned();
    let mut uri = RequestUri::new(&path);

    match uri.take_str() {
        Some("v1") => v1::route(req, uri).await,
        _ => Err(StatusCodeError::not_found().into()),
    }
}

/// Converts an [`enum@Error`] into the response returned to the client.
fn error_response(err: Error) -> Response {
    let err = match err {
        Error::StatusCodeError(err) => err,
        Error::Core(err) => {
            let code = match err {
                knockout_core::Error::MatchNotFound { .. }
                | knockout_core::Error::TeamNotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };

            StatusCodeError::new(code, err)
        }
        Error::Conflict => StatusCodeError::conflict().message(Error::Conflict),
        Error::InvalidToken | Error::Jwt(_) => StatusCodeError::unauthorized(),
        err => {
            log::error!("{:?}", err);
            StatusCodeError::internal_server_error()
        }
    };

    Response::ok().status(err.code).json(&ErrorResponse {
        code: err.code.as_u16(),
        message: err.message,
    })
}

#[derive(Debug)]
pub struct Request {
    pub parts: Parts,
    pub body: Option<Body>,
    state: State,
}

impl Request {
    #[inline]
    fn new(req: hyper::Request<Body>, state: State) -> Self {
        let (parts, body) = req.into_parts();

        Self {
            parts,
            body: Some(body),
            state,
        }
    }

    #[inline]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.parts.headers
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Reads the request body and deserializes it from json.
    pub async fn json<T>(&mut self) -> std::result::Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let bytes = self.bytes().await?;

        serde_json::from_slice(&bytes)
            .map_err(|err| StatusCodeError::new(StatusCode::BAD_REQUEST, err).into())
    }

    /// Same as [`json`], but returns the default value if the request has no body.
    ///
    /// [`json`]: Self::json
    pub async fn json_or_default<T>(&mut self) -> std::result::Result<T, Error>
    where
        T: DeserializeOwned + Default,
    {
        let bytes = self.bytes().await?;
        if bytes.is_empty() {
            return Ok(T::default());
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| StatusCodeError::new(StatusCode::BAD_REQUEST, err).into())
    }

    async fn bytes(&mut self) -> std::result::Result<hyper::body::Bytes, Error> {
        let body = match self.body.take() {
            Some(body) => body,
            None => return Err(StatusCodeError::internal_server_error().into()),
        };

        let deadline = Instant::now() + BODY_TIMEOUT;

        tokio::select! {
            res = hyper::body::to_bytes(body) => {
                Ok(res?)
            }
            _ = tokio::time::sleep_until(deadline) => {
                log::info!(
                    "Client failed to transmit body in {}s, dropping connection",
                    BODY_TIMEOUT.as_secs()
                );

                Err(StatusCodeError::request_timeout().into())
            }
        }
    }

    /// Returns the value of the "Content-Length" header. If the header is not present or has an
    /// invalid value an error is returned.
    pub fn content_length(&self) -> std::result::Result<u64, Error> {
        match self.headers().get(CONTENT_LENGTH) {
            Some(value) => match value.to_str().ok().and_then(|s| s.parse().ok()) {
                Some(value) => Ok(value),
                None => {
                    log::debug!("Failed to parse \"Content-Length\" header: {:?}", value);

                    Err(StatusCodeError::bad_request().into())
                }
            },
            None => Err(StatusCodeError::length_required().into()),
        }
    }

    /// Returns the authorization context of the request. A request without an `Authorization`
    /// header is anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is present, but does not contain a valid bearer token.
    pub fn caller(&self) -> std::result::Result<Caller, Error> {
        let header = match self.headers().get(AUTHORIZATION) {
            Some(header) => header,
            None => return Ok(Caller::anonymous()),
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(StatusCodeError::unauthorized)?;

        let claims = self.state.auth.validate_token(token)?;

        Ok(claims.caller())
    }

    /// Returns the caller if it is an admin.
    ///
    /// # Errors
    ///
    /// Returns `401 Unauthorized` if the request carries no valid token and `403 Forbidden` if
    /// the caller is not an admin.
    pub fn require_admin(&self) -> std::result::Result<Caller, Error> {
        if !self.headers().contains_key(AUTHORIZATION) {
            return Err(StatusCodeError::unauthorized().into());
        }

        let caller = self.caller()?;
        if !caller.is_admin() {
            return Err(StatusCodeError::forbidden().into());
        }

        Ok(caller)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct RequestUri<'a> {
    path: &'a str,
}

impl<'a> RequestUri<'a> {
    pub fn new(mut path: &'a str) -> Self {
        if path.starts_with('/') {
            path = &path[1..];
        }

        Self { path }
    }

    pub fn take(&mut self) -> Option<UriPart<'a>> {
        let part = self.take_str()?;

        Some(UriPart { part })
    }

    pub fn take_str(&mut self) -> Option<&'a str> {
        if self.path.is_empty() {
            None
        } else {
            Some(match self.path.split_once('/') {
                Some((part, rem)) => {
                    self.path = rem;
                    part
                }
                None => {
                    let path = self.path;
                    self.path = "";
                    path
                }
            })
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct UriPart<'a> {
    part: &'a str,
}

impl<'a> UriPart<'a> {
    pub fn parse<T>(&self) -> std::result::Result<T, Error>
    where
        T: FromStr,
    {
        match self.part.parse() {
            Ok(v) => Ok(v),
            Err(_) => Err(StatusCodeError::bad_request()
                .message(format!("invalid path segment: {:?}", self.part))
                .into()),
        }
    }

    /// Returns the percent-decoded segment.
    pub fn decode(&self) -> std::result::Result<String, Error> {
        percent_decode(self.part).ok_or_else(|| {
            StatusCodeError::bad_request()
                .message("invalid percent-encoding")
                .into()
        })
    }
}

/// Decodes a percent-encoded string. Returns `None` if the input contains an invalid escape or
/// does not decode to valid UTF-8.
fn percent_decode(input: &str) -> Option<String> {
    let mut buf = Vec::with_capacity(input.len());

    let mut bytes = input.bytes();
    while let Some(byte) = bytes.next() {
        if byte == b'%' {
            let hi = (bytes.next()? as char).to_digit(16)?;
            let lo = (bytes.next()? as char).to_digit(16)?;
            buf.push((hi * 16 + lo) as u8);
        } else {
            buf.push(byte);
        }
    }

    String::from_utf8(buf).ok()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// 200 OK
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// 201 Created
    pub fn created() -> Self {
        Self::ok().status(StatusCode::CREATED)
    }

    /// 204 No Content
    pub fn no_content() -> Self {
        Self::ok().status(StatusCode::NO_CONTENT)
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn json<T>(mut self, body: &T) -> Self
    where
        T: Serialize,
    {
        match serde_json::to_vec(body) {
            Ok(buf) => {
                self.body = Body::from(buf);
                self.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            }
            Err(err) => {
                log::error!("Failed to serialize response body: {}", err);
                self.status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn header<K>(mut self, key: K, value: HeaderValue) -> Self
    where
        K: IntoHeaderName,
    {
        self.headers.append(key, value);
        self
    }

    fn build(self) -> hyper::Response<Body> {
        let mut resp = hyper::Response::new(self.body);
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers;
        resp
    }
}

/// Checks the request method and runs the specified path. If no matching method is found
/// an method_not_allowed error is returned.
#[macro_export]
macro_rules! method {
    ($req:expr, {$($method:expr => $branch:expr),* $(,)?}) => {
        match $req.method() {
            $(
                method if method == $method => $branch,
            )*
            method if method == hyper::Method::OPTIONS => {
                use $crate::http::Response;
                use hyper::header::{HeaderValue, ALLOW, ACCESS_CONTROL_ALLOW_METHODS};

                let allow = [$($method.as_str()),*].join(",");
                match HeaderValue::from_str(&allow) {
                    Ok(allow) => Ok(Response::no_content()
                        .header(ALLOW, allow.clone())
                        .header(ACCESS_CONTROL_ALLOW_METHODS, allow)),
                    Err(_) => Err($crate::StatusCodeError::internal_server_error().into()),
                }
            }
            _ => Err($crate::StatusCodeError::method_not_allowed().into()),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::{percent_decode, RequestUri};

    #[test]
    fn test_request_uri_take() {
        let mut uri = RequestUri::new("/v1/tournaments/1");
        assert_eq!(uri.take_str(), Some("v1"));
        assert_eq!(uri.take_str(), Some("tournaments"));
        assert_eq!(uri.take().unwrap().parse::<u64>().unwrap(), 1);
        assert_eq!(uri.take_str(), None);

        let mut uri = RequestUri::new("/v1/");
        assert_eq!(uri.take_str(), Some("v1"));
        assert_eq!(uri.take_str(), None);

        let mut uri = RequestUri::new("/");
        assert_eq!(uri.take_str(), None);
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("Team").as_deref(), Some("Team"));
        assert_eq!(percent_decode("Team%20A").as_deref(), Some("Team A"));
        assert_eq!(percent_decode("%C3%A4").as_deref(), Some("ä"));
        assert_eq!(percent_decode("%2"), None);
        assert_eq!(percent_decode("%zz"), None);
        assert_eq!(percent_decode("%FF"), None);
    }
}

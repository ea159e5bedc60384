//! HTTP adapter
//!
//! Serves an [`Interceptor`] over hyper. The adapter is the end of the
//! chain: requests the interceptor delegates get `404 Not Found`.

use crate::error::ServerError;
use crate::interceptor::Interceptor;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

/// Answer one request
pub async fn respond(interceptor: &Interceptor, request: Request<Body>) -> Response<Body> {
    let path = percent_decode(request.uri().path());
    match interceptor.handle(&path).await.into_reply() {
        Some(reply) => reply.into_response(),
        None => status_only(StatusCode::NOT_FOUND),
    }
}

/// Bind `addr` and serve until `shutdown` resolves
///
/// # Errors
/// Returns error if the address cannot be bound or the server fails
pub async fn serve<F>(interceptor: Arc<Interceptor>, addr: SocketAddr, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    serve_listener(interceptor, listener, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// Background cache writes are flushed before returning.
///
/// # Errors
/// Returns error if the listener cannot be used or the server fails
pub async fn serve_listener<F>(
    interceptor: Arc<Interceptor>,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_or_else(|_| "<unknown>".to_string(), |a| a.to_string());
    listener.set_nonblocking(true).map_err(|source| ServerError::Bind {
        addr: addr.clone(),
        source,
    })?;

    let service_interceptor = Arc::clone(&interceptor);
    let make_svc = make_service_fn(move |_conn| {
        let interceptor = Arc::clone(&service_interceptor);
        async move {
            Ok::<_, Infallible>(service_fn(move |request| {
                let interceptor = Arc::clone(&interceptor);
                async move { Ok::<_, Infallible>(respond(&interceptor, request).await) }
            }))
        }
    });

    let server = Server::from_tcp(listener)?
        .serve(make_svc)
        .with_graceful_shutdown(shutdown);

    tracing::info!("Listening on http://{}", addr);
    let result = server.await;

    interceptor.cache().flush().await;
    tracing::info!("Server stopped");
    result.map_err(ServerError::from)
}

fn status_only(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

/// Decode `%XX` escapes in a request path.
///
/// Invalid escapes are kept literally, as are decoded bytes that do not
/// form UTF-8.
fn percent_decode(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(decoded).unwrap_or_else(|_| path.to_string())
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

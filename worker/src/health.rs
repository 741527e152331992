use crate::state::WorkerState;
use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::{server::conn::http1, service::service_fn, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{debug, error, info};
use serde::Serialize;
use std::{convert::Infallible, net::SocketAddr};
use tokio::{net::TcpListener, sync::watch};

/// Empty response
pub fn empty() -> BoxBody<Bytes, hyper::Error> {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

/// Full response
pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Quick response
pub struct QuickResponse;

impl QuickResponse {
    /// Status 200 with a JSON body, 500 if the value can not be serialized
    pub fn json<J: ?Sized + Serialize>(value: &J) -> Response<BoxBody<Bytes, hyper::Error>> {
        match serde_json::to_string(value) {
            Ok(body) => Self::with_status(StatusCode::OK, full(body)),
            Err(_) => Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, empty()),
        }
    }

    /// Status 404 with an empty body
    pub fn not_found() -> Response<BoxBody<Bytes, hyper::Error>> {
        Self::with_status(StatusCode::NOT_FOUND, empty())
    }

    fn with_status(
        status: StatusCode,
        body: BoxBody<Bytes, hyper::Error>,
    ) -> Response<BoxBody<Bytes, hyper::Error>> {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        if status == StatusCode::OK {
            response.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("application/json"),
            );
        }
        response
    }
}

/// Route a request against the latest published state
pub fn route(
    method: &Method,
    path: &str,
    state: &WorkerState,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    match (method, path) {
        (&Method::GET, "/health") => QuickResponse::json(&state.snapshot()),
        _ => QuickResponse::not_found(),
    }
}

async fn health(
    req: Request<hyper::body::Incoming>,
    state: watch::Receiver<WorkerState>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
    let snapshot = state.borrow().clone();
    Ok(route(req.method(), req.uri().path(), &snapshot))
}

/// Bind the health endpoint
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Health server listening on port {}", port);
    Ok(listener)
}

/// Serve health requests until the task is dropped
pub async fn serve(listener: TcpListener, state: watch::Receiver<WorkerState>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                error!("Unable to accept health connection: {}", err);
                continue;
            }
        };
        debug!("Health request from {}", peer);
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, service_fn(move |req| health(req, state.clone())))
                .await
            {
                debug!("Error serving health connection: {:?}", err);
            }
        });
    }
}

//! In-process stand-in for the WireMock admin API.
//!
//! Serves `/__admin/mappings`, `/__admin/settings` and the reset endpoints
//! from memory, and records every request so tests can assert on traffic.

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use tokio::net::TcpListener;

static TRACING: Once = Once::new();

/// Install a test subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
            .with_test_writer()
            .try_init();
    });
}

#[derive(Default)]
struct State {
    /// Mappings restored by `POST /__admin/mappings/reset`
    seed: Vec<Value>,
    mappings: Vec<Value>,
    next_id: u64,
    settings: Map<String, Value>,
    requests: Vec<(Method, String)>,
    failing_updates: HashSet<String>,
}

impl State {
    fn position(&self, id: &str) -> Option<usize> {
        self.mappings.iter().position(|m| id_of(m).as_deref() == Some(id))
    }

    fn assign_id(&mut self, mapping: &mut Value) {
        if id_of(mapping).is_none() {
            self.next_id += 1;
            mapping["id"] = json!(format!("generated-{}", self.next_id));
        }
    }
}

fn id_of(mapping: &Value) -> Option<String> {
    match mapping.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A running fake admin server bound to a random local port
#[derive(Clone)]
pub struct FakeWiremock {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl FakeWiremock {
    pub async fn start(mappings: Vec<Value>) -> Self {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut state = State::default();
        for mut mapping in mappings {
            state.assign_id(&mut mapping);
            state.mappings.push(mapping);
        }
        state.seed = state.mappings.clone();
        let state = Arc::new(Mutex::new(state));

        let server_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let io = TokioIo::new(stream);
                let state = Arc::clone(&server_state);

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { route(req, state).await }
                    });
                    let _ = http1::Builder::new().serve_connection(io, service).await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn mappings(&self) -> Vec<Value> {
        self.state.lock().mappings.clone()
    }

    pub fn mapping(&self, id: &str) -> Option<Value> {
        let state = self.state.lock();
        state.position(id).map(|i| state.mappings[i].clone())
    }

    pub fn settings(&self) -> Map<String, Value> {
        self.state.lock().settings.clone()
    }

    /// Every request received, as `(method, path)`
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state.lock().requests.clone()
    }

    /// Requests other than GET
    pub fn writes(&self) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(method, _)| *method != Method::GET)
            .count()
    }

    /// Answer `PUT /__admin/mappings/{id}` with 500
    pub fn fail_updates_for(&self, id: &str) {
        self.state.lock().failing_updates.insert(id.to_string());
    }
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

async fn route(
    req: Request<Incoming>,
    state: Arc<Mutex<State>>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body = req.into_body().collect().await?.to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let mut state = state.lock();
    state.requests.push((method.clone(), path.clone()));

    let segments: Vec<&str> = path
        .trim_start_matches("/__admin/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::GET, ["mappings"]) => json_response(
            StatusCode::OK,
            &json!({
                "mappings": state.mappings,
                "meta": {"total": state.mappings.len()}
            }),
        ),
        (&Method::POST, ["mappings"]) => {
            let mut mapping = body;
            state.assign_id(&mut mapping);
            state.mappings.push(mapping.clone());
            json_response(StatusCode::CREATED, &mapping)
        }
        (&Method::DELETE, ["mappings"]) => {
            state.mappings.clear();
            empty_response(StatusCode::OK)
        }
        (&Method::POST, ["mappings", "reset"]) => {
            state.mappings = state.seed.clone();
            empty_response(StatusCode::OK)
        }
        (&Method::GET, ["mappings", id]) => match state.position(id) {
            Some(i) => json_response(StatusCode::OK, &state.mappings[i]),
            None => empty_response(StatusCode::NOT_FOUND),
        },
        (&Method::PUT, ["mappings", id]) => {
            if state.failing_updates.contains(*id) {
                json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &json!({"errors": [{"title": "update rejected"}]}),
                )
            } else {
                match state.position(id) {
                    Some(i) => {
                        let mut mapping = body;
                        mapping["id"] = state.mappings[i]["id"].clone();
                        state.mappings[i] = mapping.clone();
                        json_response(StatusCode::OK, &mapping)
                    }
                    None => empty_response(StatusCode::NOT_FOUND),
                }
            }
        }
        (&Method::DELETE, ["mappings", id]) => match state.position(id) {
            Some(i) => {
                state.mappings.remove(i);
                empty_response(StatusCode::OK)
            }
            None => empty_response(StatusCode::NOT_FOUND),
        },
        (&Method::POST, ["settings"]) => {
            if let Value::Object(fields) = body {
                state.settings.extend(fields);
            }
            empty_response(StatusCode::OK)
        }
        (&Method::POST, ["reset"]) => {
            state.mappings.clear();
            state.settings.clear();
            empty_response(StatusCode::OK)
        }
        _ => empty_response(StatusCode::NOT_FOUND),
    };
    Ok(response)
}

//! Non-blocking leaderboard client for the frame loop. Requests run on a worker thread
//! with its own tokio runtime; results come back through a channel polled once per frame.

use super::Entry;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode, Uri, header};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use serde_json::json;
use std::sync::mpsc as std_mpsc;
use std::thread;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid leaderboard url {0:?}")]
    BadUrl(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server answered {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("unreadable response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug)]
enum Command {
    FetchTop,
    Submit { name: String, score: i64 },
}

/// What the frame loop sees.
#[derive(Debug)]
pub enum ClientEvent {
    Loaded(Vec<Entry>),
    LoadFailed(String),
    Submitted,
    SubmitFailed(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct LeaderboardClient {
    tx: mpsc::UnboundedSender<Command>,
    rx: std_mpsc::Receiver<ClientEvent>,
}

impl LeaderboardClient {
    /// Start the worker. `base_url` is the server root, e.g. `http://127.0.0.1:4000`.
    pub fn spawn(base_url: &str) -> Result<Self, ClientError> {
        let endpoint = endpoint(base_url)?;
        let (tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (event_tx, rx) = std_mpsc::channel::<ClientEvent>();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        thread::spawn(move || {
            runtime.block_on(async move {
                let client: Client<HttpConnector, Full<Bytes>> =
                    Client::builder(TokioExecutor::new()).build_http();
                // Commands are handled one at a time; the frame loop never waits on them.
                while let Some(cmd) = cmd_rx.recv().await {
                    let event = match cmd {
                        Command::FetchTop => match fetch_top(&client, &endpoint).await {
                            Ok(entries) => ClientEvent::Loaded(entries),
                            Err(err) => {
                                warn!("leaderboard fetch failed: {err}");
                                ClientEvent::LoadFailed(err.to_string())
                            }
                        },
                        Command::Submit { name, score } => {
                            match submit(&client, &endpoint, &name, score).await {
                                Ok(()) => ClientEvent::Submitted,
                                Err(err) => {
                                    warn!("leaderboard submit failed: {err}");
                                    ClientEvent::SubmitFailed(err.to_string())
                                }
                            }
                        }
                    };
                    if event_tx.send(event).is_err() {
                        break;
                    }
                }
                debug!("leaderboard worker stopped");
            });
        });

        Ok(Self { tx, rx })
    }

    pub fn fetch_top(&self) {
        let _ = self.tx.send(Command::FetchTop);
    }

    pub fn submit(&self, name: String, score: i64) {
        let _ = self.tx.send(Command::Submit { name, score });
    }

    /// Next finished request, if any. Never blocks.
    pub fn try_poll(&self) -> Option<ClientEvent> {
        self.rx.try_recv().ok()
    }
}

fn endpoint(base_url: &str) -> Result<Uri, ClientError> {
    let url = format!("{}/api/leaderboard", base_url.trim_end_matches('/'));
    let uri: Uri = url.parse().map_err(|_| ClientError::BadUrl(base_url.to_string()))?;
    if uri.scheme_str() != Some("http") || uri.host().is_none() {
        return Err(ClientError::BadUrl(base_url.to_string()));
    }
    Ok(uri)
}

async fn send(
    client: &Client<HttpConnector, Full<Bytes>>,
    req: Request<Full<Bytes>>,
) -> Result<Bytes, ClientError> {
    let resp = client
        .request(req)
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?
        .to_bytes();
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
        return Err(ClientError::Status { status, message });
    }
    Ok(body)
}

async fn fetch_top(
    client: &Client<HttpConnector, Full<Bytes>>,
    endpoint: &Uri,
) -> Result<Vec<Entry>, ClientError> {
    let req = Request::builder()
        .method(Method::GET)
        .uri(endpoint.clone())
        .body(Full::new(Bytes::new()))
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    let body = send(client, req).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn submit(
    client: &Client<HttpConnector, Full<Bytes>>,
    endpoint: &Uri,
    name: &str,
    score: i64,
) -> Result<(), ClientError> {
    let payload = serde_json::to_vec(&json!({ "name": name, "score": score }))?;
    let req = Request::builder()
        .method(Method::POST)
        .uri(endpoint.clone())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(payload)))
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    send(client, req).await?;
    Ok(())
}

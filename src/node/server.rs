//! Node HTTP server.
//!
//! Serves exactly the mutated surface described by the loaded artifact.
//! The dispatch table is swapped wholesale when a newer generation is
//! published, so in-flight requests finish against the table they
//! started with.

use crate::config::Config;
use crate::mutation::routes::RouteArtifact;
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Immutable method+path dispatch table built from one artifact.
pub struct DispatchTable {
    generation: u64,
    routes: HashMap<(String, String), (serde_json::Value, u16)>,
}

impl DispatchTable {
    #[must_use]
    pub fn from_artifact(artifact: &RouteArtifact) -> Self {
        let routes = artifact
            .routes
            .iter()
            .map(|r| {
                (
                    (r.method.to_uppercase(), r.path.clone()),
                    (r.response.clone(), r.status),
                )
            })
            .collect();
        Self {
            generation: artifact.generation,
            routes,
        }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn lookup(&self, method: &str, path: &str) -> Option<&(serde_json::Value, u16)> {
        self.routes
            .get(&(method.to_uppercase(), path.to_string()))
    }
}

/// Node service state: the current dispatch table behind an atomic swap.
pub struct NodeService {
    table: RwLock<Arc<DispatchTable>>,
}

impl NodeService {
    #[must_use]
    pub fn new(artifact: &RouteArtifact) -> Self {
        Self {
            table: RwLock::new(Arc::new(DispatchTable::from_artifact(artifact))),
        }
    }

    #[must_use]
    pub fn table(&self) -> Arc<DispatchTable> {
        self.table
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Replaces the dispatch table with one built from a newer artifact.
    pub fn swap(&self, artifact: &RouteArtifact) {
        *self
            .table
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) =
            Arc::new(DispatchTable::from_artifact(artifact));
    }

    /// Answers one request against the current table.
    #[must_use]
    pub fn handle(&self, method: &str, path: &str) -> hyper::Response<Full<Bytes>> {
        let table = self.table();
        match table.lookup(method, path) {
            Some((response, status)) => {
                debug!(http_path = %path, status, generation = table.generation(), "Route served");
                json_response(*status, response.to_string())
            }
            None => {
                debug!(http_path = %path, "No such route in current generation");
                json_response(404, serde_json::json!({"detail": "Not Found"}).to_string())
            }
        }
    }
}

fn json_response(status: u16, body: String) -> hyper::Response<Full<Bytes>> {
    hyper::Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| hyper::Response::new(Full::new(Bytes::new())))
}

/// Polls the artifact path and swaps the dispatch table when the
/// published generation changes.
pub async fn run_reload_loop(
    config: Arc<Config>,
    service: Arc<NodeService>,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = Duration::from_millis(config.loader_backoff_ms);
    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }

        match RouteArtifact::load(&config.artifact_path).await {
            Ok(artifact) if artifact.generation != service.table().generation() => {
                info!(
                    generation = artifact.generation,
                    routes = artifact.routes.len(),
                    "Surface regenerated, swapping dispatch table"
                );
                service.swap(&artifact);
            }
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "Artifact poll failed, keeping current table");
            }
        }
    }
}

/// Accept loop serving the mutated surface over HTTP/1.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn serve(
    addr: SocketAddr,
    service: Arc<NodeService>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Node serving mutated surface");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        continue;
                    }
                };
                debug!(%peer, "Connection accepted");
                let service = service.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let handler = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                        let service = service.clone();
                        async move {
                            Ok::<_, Infallible>(
                                service.handle(req.method().as_str(), req.uri().path()),
                            )
                        }
                    });
                    if let Err(e) = http1::Builder::new().serve_connection(io, handler).await {
                        debug!(error = %e, "Connection error");
                    }
                });
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("Node server stopping");
                    return Ok(());
                }
            }
        }
    }
}

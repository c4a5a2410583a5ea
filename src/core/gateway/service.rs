//! Gateway proxy service.
//!
//! The single ingress point. Requests whose path matches the current
//! mapping snapshot are forwarded to the active node under the mutated
//! path; everything else is treated as a security event and answered
//! with the deception payload while the source's reputation score
//! grows.

use crate::config::Config;
use crate::core::gateway::response::{serve_json, sync_error_body};
use crate::core::gateway::state::GatewayState;
use crate::features::webhook::{EventType, WebhookNotifier, WebhookPayload, epoch_timestamp};
use crate::mutation::routes::MappingSnapshot;
use crate::mutation::store::MappingStore;
use crate::security::deception::DeceptionPayload;
use crate::security::reputation::ReputationLedger;
use async_trait::async_trait;
use pingora::Result;
use pingora::proxy::{FailToProxy, ProxyHttp, Session};
use pingora::upstreams::peer::HttpPeer;
use rand::Rng;
use rand::rngs::OsRng;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Context for a single request.
#[derive(Default)]
pub struct RequestCtx {
    pub client_ip: Option<IpAddr>,
    /// Node captured at filter time so peer selection and header
    /// rewriting agree even if a rotation lands mid-request.
    pub node_index: usize,
    pub mutated_path: Option<String>,
    pub generation: u64,
    pub attempts: u32,
    pub is_error: bool,
}

/// Main gateway service implementing `ProxyHttp`.
pub struct ChameleonGateway {
    config: Arc<Config>,
    state: Arc<GatewayState>,
    reputation: Arc<ReputationLedger>,
    webhook: Arc<WebhookNotifier>,
    store: MappingStore,
    deception_body: String,
}

impl ChameleonGateway {
    /// Creates a new gateway service.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        state: Arc<GatewayState>,
        reputation: Arc<ReputationLedger>,
        webhook: Arc<WebhookNotifier>,
    ) -> Self {
        let store = MappingStore::new(config.mapping_state_path.clone());
        let deception_body = DeceptionPayload::from_config(&config).to_json();
        Self {
            config,
            state,
            reputation,
            webhook,
            store,
            deception_body,
        }
    }

    fn client_ip(session: &Session) -> Option<IpAddr> {
        session.client_addr().and_then(|addr| {
            if let pingora::protocols::l4::socket::SocketAddr::Inet(inet) = addr {
                Some(inet.ip())
            } else {
                None
            }
        })
    }

    /// Randomized delay for sources with a non-zero reputation score.
    /// A cheap deterrent against automated probing, not a rate limit.
    async fn apply_reputation_delay(&self, ctx: &RequestCtx) {
        let Some(ip) = ctx.client_ip else { return };
        let score = self.reputation.score(ip);
        if score == 0 {
            return;
        }

        let jitter = {
            let mut rng = OsRng;
            rng.gen_range(0..=self.config.reputation_max_delay_ms)
        };
        debug!(source_ip = %ip, score, delay_ms = jitter, "Throttling flagged source");
        tokio::time::sleep(Duration::from_millis(jitter)).await;
    }

    /// Falls back to the mapping store when the in-memory snapshot is
    /// still empty (the rotation task may not have published yet at
    /// boot).
    async fn refresh_snapshot(&self, snapshot: Arc<MappingSnapshot>) -> Arc<MappingSnapshot> {
        if !snapshot.is_empty() {
            return snapshot;
        }

        match self.store.load().await {
            Ok(Some(entries)) => {
                let refreshed = Arc::new(MappingSnapshot::new(snapshot.generation, entries));
                self.state.publish(refreshed.clone());
                refreshed
            }
            Ok(None) => snapshot,
            Err(e) => {
                warn!(error = %e, "Mapping state read failed");
                snapshot
            }
        }
    }

    async fn serve_deception(&self, session: &mut Session, path: &str, ctx: &RequestCtx) -> Result<bool> {
        let score = ctx
            .client_ip
            .map(|ip| self.reputation.record_miss(ip))
            .unwrap_or(0);

        warn!(
            http_path = %path,
            source_ip = ?ctx.client_ip,
            score,
            action = "DECEIVE",
            "Intrusion detected: unmapped route"
        );

        self.webhook.notify(WebhookPayload {
            event_type: EventType::IntrusionDetected,
            timestamp: epoch_timestamp(),
            source_ip: ctx.client_ip.map(|ip| ip.to_string()),
            severity: 4,
            message: format!("Unmapped route probed: {path}"),
        });

        tokio::time::sleep(Duration::from_millis(self.config.miss_penalty_ms)).await;
        serve_json(session, 200, self.deception_body.clone()).await
    }
}

#[async_trait]
impl ProxyHttp for ChameleonGateway {
    type CTX = RequestCtx;

    fn new_ctx(&self) -> Self::CTX {
        RequestCtx::default()
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let path = session.req_header().uri.path().to_string();
        ctx.client_ip = Self::client_ip(session);

        self.apply_reputation_delay(ctx).await;

        let snapshot = self.refresh_snapshot(self.state.current_snapshot()).await;

        if let Some(mutated) = snapshot.resolve(&path) {
            ctx.mutated_path = Some(mutated.to_string());
            ctx.generation = snapshot.generation;
            ctx.node_index = self.state.active_index();
            debug!(
                http_path = %path,
                mutated_path = %mutated,
                generation = snapshot.generation,
                "Forwarding to active node"
            );
            return Ok(false);
        }

        self.serve_deception(session, &path, ctx).await
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        let node = self.state.node(ctx.node_index);
        let mut peer = Box::new(HttpPeer::new(node.authority(), false, String::new()));

        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        peer.options.connection_timeout = Some(timeout);
        peer.options.total_connection_timeout = Some(timeout);
        peer.options.read_timeout = Some(timeout);
        peer.options.write_timeout = Some(timeout);
        Ok(peer)
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut pingora::http::RequestHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        if let Some(mutated) = &ctx.mutated_path {
            let path_and_query = match upstream_request.uri.query() {
                Some(query) => format!("{mutated}?{query}"),
                None => mutated.clone(),
            };
            let uri = path_and_query.parse::<http::Uri>().map_err(|e| {
                pingora::Error::because(
                    pingora::ErrorType::InternalError,
                    "mutated path is not a valid uri",
                    e,
                )
            })?;
            upstream_request.set_uri(uri);
        }

        let node = self.state.node(ctx.node_index);
        upstream_request.insert_header("Host", node.authority())?;
        upstream_request.remove_header("X-Forwarded-For");
        Ok(())
    }

    fn fail_to_connect(
        &self,
        _session: &mut Session,
        _peer: &HttpPeer,
        ctx: &mut Self::CTX,
        mut e: Box<pingora::Error>,
    ) -> Box<pingora::Error> {
        ctx.attempts += 1;
        if ctx.attempts <= self.config.forward_retries {
            e.set_retry(true);
        }
        e
    }

    async fn fail_to_proxy(
        &self,
        session: &mut Session,
        e: &pingora::Error,
        ctx: &mut Self::CTX,
    ) -> FailToProxy {
        ctx.is_error = true;
        let node = self.state.node(ctx.node_index);
        warn!(
            error = %e,
            attempts = ctx.attempts,
            node = %node.name,
            "Forwarding failed, surfacing sync error"
        );

        self.webhook.notify(WebhookPayload {
            event_type: EventType::ForwardingFailed,
            timestamp: epoch_timestamp(),
            source_ip: ctx.client_ip.map(|ip| ip.to_string()),
            severity: 4,
            message: format!("Forwarding to node {} failed: {e}", node.name),
        });

        if let Err(write_err) = serve_json(session, 503, sync_error_body()).await {
            warn!(error = %write_err, "Failed to write sync error response");
        }

        FailToProxy {
            error_code: 503,
            can_reuse_downstream: false,
        }
    }

    async fn logging(
        &self,
        session: &mut Session,
        _e: Option<&pingora::Error>,
        ctx: &mut Self::CTX,
    ) {
        let status = session.response_written().map_or(0, |r| r.status.as_u16());
        let path = session.req_header().uri.path();

        if ctx.is_error {
            warn!(http_path = %path, status, generation = ctx.generation, "Request failed");
        } else {
            debug!(http_path = %path, status, generation = ctx.generation, "Request completed");
        }
    }
}

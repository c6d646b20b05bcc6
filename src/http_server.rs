//! HTTP front-end: the single lookup endpoint plus a health check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use hickory_proto::rr::Record;
use serde::Serialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::dnssec::{ChainValidator, PublishedKeys};

pub struct HttpServer {
    validator: Arc<ChainValidator>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(validator: Arc<ChainValidator>, bind_addr: SocketAddr) -> Self {
        Self {
            validator,
            bind_addr,
        }
    }

    /// Start the HTTP server
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = router(self.validator);

        info!("Starting HTTP server on {}", self.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

pub fn router(validator: Arc<ChainValidator>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/domain/{domain}", get(check_domain))
        .with_state(AppState { validator })
        .layer(CorsLayer::permissive())
}

#[derive(Clone)]
struct AppState {
    validator: Arc<ChainValidator>,
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

/// Resolve and validate the key-publication records for a domain. Lookup
/// failures (no reachable nameserver, NXDOMAIN, depth exceeded) become 500s;
/// a domain whose chain does not validate still returns 200 with an empty
/// `delegation` list.
async fn check_domain(State(state): State<AppState>, Path(domain): Path<String>) -> Response {
    match state.validator.domain_keys(&domain).await {
        Ok(keys) => (StatusCode::OK, Json(PublishedKeysBody::from(&keys))).into_response(),
        Err(e) => {
            warn!("domain check for {} failed: {}", domain, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[derive(Serialize)]
struct RecordBody {
    name: String,
    ttl: u32,
    rdata: String,
}

impl From<&Record> for RecordBody {
    fn from(rr: &Record) -> Self {
        Self {
            name: rr.name().to_string(),
            ttl: rr.ttl(),
            rdata: rr.data().to_string(),
        }
    }
}

#[derive(Serialize)]
struct PublishedKeysBody {
    delegation: Vec<String>,
    #[serde(rename = "DNSKEY")]
    dnskey: Vec<RecordBody>,
    #[serde(rename = "CDS")]
    cds: Vec<RecordBody>,
    #[serde(rename = "CDNSKEY")]
    cdnskey: Vec<RecordBody>,
}

impl From<&PublishedKeys> for PublishedKeysBody {
    fn from(keys: &PublishedKeys) -> Self {
        Self {
            delegation: keys.signers.clone(),
            dnskey: keys.dnskey.iter().map(RecordBody::from).collect(),
            cds: keys.cds.iter().map(RecordBody::from).collect(),
            cdnskey: keys.cdnskey.iter().map(RecordBody::from).collect(),
        }
    }
}

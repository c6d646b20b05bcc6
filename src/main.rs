use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hickory_proto::rr::rdata::NS;
use hickory_proto::rr::{Name, RData, Record};
use mimir::cache::ReferralCache;
use mimir::config::MimirConfig;
use mimir::dnssec::{load_anchor_dir, ChainValidator, TrustAnchorSet};
use mimir::http_server::HttpServer;
use mimir::query::QueryClient;
use mimir::resolver::Resolver;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first to get runtime settings
    let config = MimirConfig::from_env()?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    if config.worker_threads > 0 {
        runtime_builder.worker_threads(config.worker_threads);
    }
    let runtime = runtime_builder
        .enable_all()
        .thread_name("mimir-worker")
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: MimirConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mimir=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Mimir DNSSEC validator starting up");
    info!(
        "Configuration: http_bind_addr={}, referral_ttl={:?}, query_timeout={:?}, root_hint={}",
        config.http_bind_addr, config.referral_ttl, config.query_timeout, config.root_hint
    );

    let root_hint = Record::from_rdata(
        Name::root(),
        3600,
        RData::NS(NS(Name::from_str(&config.root_hint)?)),
    );
    let cache = Arc::new(ReferralCache::new(config.referral_ttl, root_hint));

    let mut anchors = TrustAnchorSet::new();
    if let Some(ref dir) = config.anchor_dir {
        load_anchor_dir(Path::new(dir), &mut anchors, &cache)?;
        info!("Loaded {} trusted keys from {}", anchors.len(), dir);
    }
    if anchors.is_empty() {
        info!("No trust anchors configured; no chain will validate");
    }

    let client = QueryClient::new(config.query_timeout, config.query_port);
    let resolver = Arc::new(Resolver::new(cache, client));
    let validator = Arc::new(ChainValidator::new(resolver, Arc::new(anchors)));

    let server = HttpServer::new(validator, config.http_bind_addr);
    let server_task = tokio::spawn(server.start());

    tokio::select! {
        result = server_task => {
            error!("HTTP server exited: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Mimir shutting down gracefully");
        }
    }

    Ok(())
}

mod error;
mod handlers;
mod state;

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use ofz_oracle::cache::{PriceCache, RegisteredBondsCache};
use ofz_oracle::chain::ChainClient;
use ofz_oracle::config::ProviderConfig;
use ofz_oracle::exchange::MoexClient;
use ofz_oracle::nonce::NonceStore;
use ofz_oracle::resolver::PriceResolver;
use ofz_oracle::signing::Signer;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    simple_logger::init_with_level(log::Level::Info)?;

    let config = ProviderConfig::from_env()?;
    log::info!("starting OFZ oracle Provider on {}:{}", config.host, config.port);

    let exchange: Arc<dyn ofz_oracle::exchange::ExchangeClient> =
        Arc::new(MoexClient::new(config.moex_api_base.clone(), config.moex_api_timeout)?);
    let resolver = PriceResolver::new(exchange.clone());

    let signer = Signer::new(&config.eth_private_key, config.chain_id, config.bond_oracle_address)?;
    log::info!("signer address: {}", signer.address());

    // The Provider has no configurable ABI path of its own (the original
    // service only ever queried `secidToBond` through a hand-written
    // inline snippet); it validates against the same bundled fixture the
    // `sol!` binding in `chain.rs` is generated from.
    let chain = ChainClient::connect(
        &config.eth_rpc_url,
        &config.eth_private_key,
        config.bond_oracle_address,
        std::path::Path::new("abi/BondOracle.json"),
    )
    .await?;

    let nonce_store = NonceStore::load(config.nonce_file.clone()).await?;
    let price_cache = PriceCache::new(config.cache_dir.join("price_cache.json"), config.cache_ttl);
    let bond_cache = RegisteredBondsCache::new(config.registered_bonds_cache_ttl);

    let state = Arc::new(AppState {
        config: config.clone(),
        exchange,
        resolver,
        price_cache,
        bond_cache,
        nonce_store,
        signer,
        chain,
    });

    let app = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/prices", get(handlers::get_all_prices))
        .route("/api/prices/:secid", get(handlers::get_price_for_secid))
        .route("/api/bonds", get(handlers::get_all_bonds))
        .route("/api/details", get(handlers::get_all_details))
        .route("/api/details/:secid", get(handlers::get_details_for_secid))
        .layer(middleware::from_fn(log_requests))
        .with_state(state);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    log::info!("listening on {}:{}", config.host, config.port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    log::info!("{method} {path} -> {}", response.status());
    response
}

use std::path::Path;

use tokio::time::{interval, MissedTickBehavior};

use ofz_oracle::chain::ChainClient;
use ofz_oracle::config::PublisherConfig;
use ofz_oracle::publish_cycle::PublishCycle;
use ofz_oracle::tx_service::TxService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = PublisherConfig::from_env()?;
    simple_logger::init_with_level(parse_log_level(&config.log_level))?;

    log::info!(
        "starting OFZ oracle Publisher: polling {} every {}s",
        config.offchain_provider_base_url,
        config.poll_interval.as_secs()
    );

    let chain = ChainClient::connect(
        &config.ethereum_rpc_url,
        &config.publisher_private_key,
        config.bond_oracle_address,
        Path::new(&config.bond_oracle_abi_path),
    )
    .await?;
    log::info!("publisher account: {}", chain.account());

    let http = reqwest::Client::builder().build()?;
    let tx_service = TxService::new(&chain, config.gas_limit_update_price, config.tx_receipt_timeout);
    let cycle = PublishCycle::new(
        http,
        config.offchain_provider_base_url.clone(),
        &chain,
        tx_service,
        config.price_change_threshold_percent,
        config.requests_timeout,
    );

    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            deadline = ticker.tick() => {
                let lateness = tokio::time::Instant::now().saturating_duration_since(deadline);
                if lateness > config.scheduler_misfire_grace_time {
                    log::warn!(
                        "update cycle missed its grace window ({}s late, grace is {}s), skipping this tick",
                        lateness.as_secs(),
                        config.scheduler_misfire_grace_time.as_secs()
                    );
                    continue;
                }
                let updated = cycle.run().await;
                log::info!("update cycle complete: {updated} bond(s) updated");
            }
            _ = &mut shutdown => {
                log::info!("shutdown signal received, stopping publisher");
                break;
            }
        }
    }

    Ok(())
}

fn parse_log_level(level: &str) -> log::Level {
    level.parse().unwrap_or(log::Level::Info)
}

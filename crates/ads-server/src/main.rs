use ads_core::AdsConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AdsConfig::from_env()?;
    ads_server::telemetry::init_tracing(config.environment);
    ads_server::run(config).await
}

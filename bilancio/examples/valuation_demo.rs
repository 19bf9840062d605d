use std::sync::Arc;

use bilancio::{
    Bilancio, CacheConfig, ChannelProgress, LoadParams, NoProgress, Period, ResourceKind,
};
use bilancio_mock::MockProvider;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,bilancio=debug,bilancio_cache=debug
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    let bilancio = Bilancio::builder()
        .with_provider(Arc::new(MockProvider::new()))
        .cache_config(CacheConfig::default())
        .with_default_profiles()
        .build()?;

    let (sink, mut rx) = ChannelProgress::new();
    let printer = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            println!("[{:>5.1}%] {:<16} {}", ev.percent, ev.stage, ev.message);
        }
    });

    let params = LoadParams::new("abc").period(Period::Annual);
    let result = bilancio.load("valuation", &params, &sink).await?;
    drop(sink);
    printer.await?;

    println!("status: {:?}", result.overall_status);
    for warning in result.warnings() {
        println!("warning: {warning}");
    }
    if let Some(bs) = result.dataset(ResourceKind::BalanceSheet) {
        for row in bs.rows() {
            let key = row.key().map(|k| k.to_string()).unwrap_or_default();
            let assets = row
                .get("total_assets")
                .map(ToString::to_string)
                .unwrap_or_default();
            println!("{key:>8}  total_assets={assets}");
        }
    }

    // A second view on the same entity is served from the cache.
    let again = bilancio.load("technical", &params, &NoProgress).await?;
    let cached = again.outcomes.values().filter(|o| o.from_cache).count();
    println!("technical: {cached}/{} from cache", again.outcomes.len());
    println!("cache stats: {:?}", bilancio.cache().stats());

    Ok(())
}

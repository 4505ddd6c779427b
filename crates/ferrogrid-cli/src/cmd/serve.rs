use super::load_config;
use anyhow::Context;
use std::path::Path;

pub fn run(
    explicit: Option<&Path>,
    bind: Option<String>,
    port: Option<u16>,
    open: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(explicit)?;
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    for w in config.validate() {
        tracing::warn!("config: {}", w.message);
    }
    config.ensure_valid().context("refusing to start")?;

    tracing::info!(
        actuators = config.layout.count(),
        tick_ms = config.timing.tick_period_ms,
        "starting grid"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(ferrogrid_server::serve(config, open, async {
        let _ = tokio::signal::ctrl_c().await;
    }))
}

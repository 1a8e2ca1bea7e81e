use tokenpair::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "tokenpair=debug,warp=info".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!("application trace log");
    debug!(sub = "u1", "application debug log");
    info!("application info log");

    Ok(())
}

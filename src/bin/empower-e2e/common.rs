use tracing_subscriber::{filter::Targets, prelude::*};

use empower_e2e::core::config::LoggingConfig;

pub fn setup_tracing(config: &LoggingConfig) -> miette::Result<()> {
    let level = config.max_level;

    let mut filter = Targets::new()
        .with_target("empower_e2e", level)
        .with_target("empower_e2e_core", level);

    if config.include_http {
        filter = filter
            .with_target("reqwest", level)
            .with_target("hyper", level);
    }

    tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish()
        .with(filter)
        .init();

    Ok(())
}

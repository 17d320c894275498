use clap::Parser;
use health_monitor::{
    alerts::AlertManager,
    config::{MonitorConfig, read_config_file},
    monitors::host::HostMonitor,
    samplers::{AuthLogSampler, SystemSampler},
    util::{get_default_log_directives, get_log_directives, get_webhook_url, interrupt_signal},
};
use tracing::{info, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Optional JSON config file overriding thresholds and intervals
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    dotenv::dotenv().ok();

    let directives = get_log_directives();
    let filter = directives.parse::<filter::Targets>().unwrap_or_else(|e| {
        eprintln!("invalid log directives '{directives}': {e}");
        get_default_log_directives()
            .parse()
            .unwrap_or_else(|_| filter::Targets::new())
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => MonitorConfig::default(),
    };
    config.validate()?;

    let shutdown = interrupt_signal()?;

    let webhook_url = get_webhook_url();
    if webhook_url.is_none() {
        warn!("DISCORD_WEBHOOK_URL is not set, alerts will only be logged");
    }

    info!("Starting system monitoring...");
    for spec in config.thresholds.specs() {
        info!("{} Threshold: {}%", spec.category, spec.limit);
    }
    info!(
        "Cooldown: {:?}, tick interval: {:?}, auth log: {}",
        config.cooldown(),
        config.tick_interval(),
        config.auth_log.path.display()
    );

    let resources = SystemSampler::new(config.cpu_window(), config.disk_mount.clone());
    let events = AuthLogSampler::new(&config.auth_log)?;
    let notifier = AlertManager::new(webhook_url, config.webhook_timeout())?;

    HostMonitor::new(&config, resources, events, notifier)
        .run(shutdown)
        .await;

    Ok(())
}

const DISCORD_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";

/// Webhook endpoint alerts are posted to. Unset or blank means alerts are
/// only logged locally.
pub fn get_webhook_url() -> Option<String> {
    let url_from_env = std::env::var(DISCORD_WEBHOOK_URL);
    url_from_env.ok().filter(|url| !url.trim().is_empty())
}

const HEALTH_MONITOR_LOG: &str = "HEALTH_MONITOR_LOG";

const DEFAULT_LOG_DIRECTIVES: &str = "health_monitor=debug";

pub fn get_log_directives() -> String {
    std::env::var(HEALTH_MONITOR_LOG).unwrap_or_else(|_| DEFAULT_LOG_DIRECTIVES.to_string())
}

pub fn get_default_log_directives() -> &'static str {
    DEFAULT_LOG_DIRECTIVES
}

/// Resolves on the first interrupt (Ctrl-C). The handler is installed when
/// this is called, not when the future is first polled, so an interrupt that
/// arrives before the monitor loop starts is still observed.
#[cfg(unix)]
pub fn interrupt_signal() -> std::io::Result<impl std::future::Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    Ok(async move {
        interrupt.recv().await;
    })
}

#[cfg(not(unix))]
pub fn interrupt_signal() -> std::io::Result<impl std::future::Future<Output = ()>> {
    Ok(async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    })
}

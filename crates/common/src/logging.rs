use tracing_core::Level;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize console logging with the provided default level.
///
/// HTTP client internals are capped at WARN to keep deployment output
/// readable even when verbose diagnostics are requested.
pub fn init(default_level: Level) {
    let fmt = fmt::format().with_target(false).compact();

    let target_filters = Targets::new()
        .with_target("reqwest", Level::WARN)
        .with_target("hyper", Level::WARN)
        .with_default(default_level);

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(fmt))
        .with(target_filters)
        .init();
}

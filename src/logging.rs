use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Install the global subscriber: timestamped events on stderr, filtered by
/// `RUST_LOG` with `info` as the default.
///
/// stdout is left to the commands, which print step outputs there.
pub fn setup_logging(span_events: FmtSpan) -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).try_init()?;
    Ok(())
}

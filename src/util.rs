use tracing_subscriber::EnvFilter;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`). Later calls,
/// or a subscriber installed by the host application, win silently.
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    });
}

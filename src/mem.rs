use parking_lot::Mutex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use sysinfo::{System, SystemExt};

/// Cached, low-overhead memory watcher.
/// - Refreshes at most every `REFRESH_EVERY`.
/// - Uses available/total RAM to decide when to back off.
struct MemState {
    sys: System,
    last_check: Option<Instant>,
    last_frac: f64, // available / total (0.0..1.0)
}

static STATE: OnceLock<Mutex<MemState>> = OnceLock::new();
const REFRESH_EVERY: Duration = Duration::from_millis(500);
const BACKOFF: Duration = Duration::from_millis(25);

/// Returns a recent estimate of available memory fraction (0.0..1.0).
pub fn available_memory_fraction() -> f64 {
    let state = STATE.get_or_init(|| Mutex::new(MemState { sys: System::new(), last_check: None, last_frac: 1.0 }));
    let mut st = state.lock();
    let now = Instant::now();
    if st.last_check.map_or(true, |t| now.duration_since(t) >= REFRESH_EVERY) {
        st.sys.refresh_memory();
        let total = st.sys.total_memory() as f64;
        let avail = st.sys.available_memory() as f64;
        st.last_frac = if total > 0.0 { (avail / total).clamp(0.0, 1.0) } else { 1.0 };
        st.last_check = Some(now);
    }
    st.last_frac
}

pub fn is_low_memory(threshold: f64) -> bool {
    available_memory_fraction() < threshold
}

/// Yields briefly when available memory is under `threshold`. Returns whether it slept.
/// A threshold of 0 disables the check.
pub fn maybe_throttle_low_memory(threshold: f64) -> bool {
    if threshold <= 0.0 || !is_low_memory(threshold) {
        return false;
    }
    tracing::warn!(available = available_memory_fraction(), threshold, "low memory; backing off");
    std::thread::sleep(BACKOFF);
    true
}

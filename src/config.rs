use std::path::{Path, PathBuf};

/// Unit of the raw `created` fields found in the dump. Records are normalized to
/// seconds when they are constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimestampUnit {
    #[default]
    Seconds,
    Millis,
}

impl TimestampUnit {
    #[inline]
    pub fn to_seconds(self, raw: i64) -> i64 {
        match self {
            TimestampUnit::Seconds => raw,
            TimestampUnit::Millis => raw.div_euclid(1000),
        }
    }
}

/// What the directory reader does with a row that fails to decode or validate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Yield the error to the consumer (default).
    #[default]
    Fail,
    /// Log a warning and continue with the next row.
    Skip,
}

/// How records are built from raw JSON rows.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordOptions {
    pub timestamp_unit: TimestampUnit,
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct DatasetOptions {
    pub root: PathBuf,
    pub records: RecordOptions,
    pub on_malformed: MalformedPolicy,
    pub progress: bool,                 // show a per-file progress bar while iterating
    pub progress_label: Option<String>, // optional label for progress bar

    // IO tuning
    pub read_buffer_bytes: usize,       // BufReader capacity

    // back off between files while available memory is below this fraction
    pub low_memory_threshold: f64,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data"),
            records: RecordOptions::default(),
            on_malformed: MalformedPolicy::Fail,
            progress: false,
            progress_label: None,
            read_buffer_bytes: 256 * 1024,
            low_memory_threshold: 0.10,
        }
    }
}

impl DatasetOptions {
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }
    pub fn with_timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.records.timestamp_unit = unit;
        self
    }
    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_low_memory_threshold(mut self, fraction: f64) -> Self {
        self.low_memory_threshold = fraction.clamp(0.0, 1.0);
        self
    }
}

pub mod config;
pub mod dispatch;
pub mod item;
pub mod metrics;
pub mod progress;
pub mod sink;
pub mod sizer;
pub mod source;
pub mod status;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config, ConfigError,
    SanitizedConfig, StatusBackendKind,
};
pub use dispatch::{
    DispatchConfig, DispatchEngine, DispatchError, DispatchEvent, EventCallback, RunCounters,
    RunSummary, StopReason,
};
pub use item::{Item, ItemId};
pub use progress::{format_duration, progress, Eta, ProgressReport};
pub use sink::{create_sink, RequestSink, SinkConfig, SinkKind, SubmissionError};
pub use sizer::{BatchSizer, SizerError};
pub use source::{CsvDirectorySource, ItemSource, SourceError};
pub use status::{
    open_store, ItemRecord, ItemState, JsonFileBackend, SqliteBackend, StatusBackend, StatusError,
    StatusStore,
};

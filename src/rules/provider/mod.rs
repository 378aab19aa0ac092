//! Rule-set providers.
//!
//! A provider owns the I/O of its source and hands parsed rule sets to the
//! reconciler as [`RuleSetChangedEvent`](crate::rules::RuleSetChangedEvent)s.
//! Unparsable input is logged and counted, never forwarded.

pub mod file;
pub mod parser;

use std::path::PathBuf;

use thiserror::Error;

pub use file::FileProvider;
pub use parser::{Format, ParseError, RuleSetDocument};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("{0} is not a rule-set file (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("failed to watch rule files: {0}")]
    Watch(#[from] notify::Error),

    #[error("rule set event queue is closed")]
    QueueClosed,
}

//! Stream resolution port.
//!
//! # Responsibilities
//! - Define the blocking `Resolver` interface the pipeline calls
//! - Define the session handle the pool hands out
//! - Classify resolver failures into domain outcomes
//!
//! # Design Decisions
//! - Resolution is synchronous and may block for seconds; callers run it on
//!   the blocking thread pool
//! - The shipped implementation shells out to the `streamlink` CLI; tests
//!   substitute their own `Resolver`

pub mod classify;
pub mod session;
pub mod streamlink;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use classify::{classify, is_automation_barrier, ResolveFailure};
pub use session::{OptionValue, ResolverSession, SessionError};
pub use streamlink::StreamlinkCli;

/// One playable variant of a stream (e.g. "720p60").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamVariant {
    /// Transport kind as reported by the resolver: "hls", "http", "dash", ...
    pub kind: String,
    pub url: String,
}

/// What a successful resolution returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMetadata {
    /// Name of the handler that accepted the URL.
    pub handler: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub id: Option<String>,
    pub thumbnail: Option<String>,
    /// Quality name -> variant. Empty when the target is offline.
    pub streams: BTreeMap<String, StreamVariant>,
}

/// Typed failures of a resolution attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No handler recognizes the URL.
    #[error("No plugin can handle URL: {0}")]
    NoHandler(String),

    /// The handler ran but found nothing to play.
    #[error("No playable streams found")]
    NoContent,

    /// The handler failed with a message.
    #[error("{0}")]
    Handler(String),

    /// Anything else: process failures, unparsable output, panics.
    #[error("{0}")]
    Unexpected(String),
}

/// A blocking, I/O-bound stream resolver keyed by URL.
pub trait Resolver: Send + Sync + 'static {
    fn resolve(&self, session: &ResolverSession, url: &str) -> Result<StreamMetadata, ResolveError>;
}

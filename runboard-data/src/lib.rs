//! Shared data layer for runboard
//!
//! Run types, the backend client seam, the TTL cache and the generic poller.
//! The terminal UI in `runboard-monitor` is built on top of this crate.

pub mod cache;
pub mod client;
pub mod error;
pub mod http;
pub mod poller;
pub mod repository;
pub mod session;
pub mod types;

#[doc(hidden)]
pub mod fake;

pub use cache::{default_snapshot_path, hash_token, CacheConfig, CacheStats, CacheStore, RunLookup};
pub use client::{ApiResult, BoxFuture, BulkRunClient, RunClient};
pub use error::{ApiError, ValidationError};
pub use http::HttpRunClient;
pub use poller::{FetchError, PollConfig, PollError, PollState, Poller};
pub use repository::RunRepository;
pub use session::{authenticate, Session};
pub use types::{
    format_duration, BulkFailure, BulkRunRequest, BulkRunResult, CreateRunRequest, Run, RunPage,
    RunStatus, RunType, UserIdentity,
};

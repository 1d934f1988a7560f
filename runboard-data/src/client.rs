//! Backend client seam.
//!
//! The TUI only ever talks to the remote API through [`RunClient`]. The HTTP
//! implementation lives in [`crate::http`]; tests use [`crate::fake`].

use std::future::Future;
use std::pin::Pin;

use crate::error::ApiError;
use crate::types::{BulkRunRequest, BulkRunResult, CreateRunRequest, Run, RunPage, UserIdentity};

/// Boxed, sendable future returned by client methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations every backend supports.
pub trait RunClient: Send + Sync {
    fn create_run<'a>(&'a self, request: &'a CreateRunRequest) -> BoxFuture<'a, ApiResult<Run>>;

    fn get_run<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Run>>;

    fn list_runs(&self, limit: usize, offset: usize) -> BoxFuture<'_, ApiResult<RunPage>>;

    fn get_current_user(&self) -> BoxFuture<'_, ApiResult<UserIdentity>>;

    /// Where this client points, for the status screen.
    fn endpoint(&self) -> String;

    /// Bulk operations, when the backend offers them.
    fn bulk(&self) -> Option<&dyn BulkRunClient> {
        None
    }
}

/// Optional capability: fan one request out to many repositories.
pub trait BulkRunClient: Send + Sync {
    fn create_runs<'a>(
        &'a self,
        request: &'a BulkRunRequest,
    ) -> BoxFuture<'a, ApiResult<BulkRunResult>>;
}

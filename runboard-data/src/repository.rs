//! Read-through access to runs: the client plus the cache policy.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::{CacheStore, RunLookup};
use crate::client::{ApiResult, RunClient};
use crate::error::ApiError;
use crate::poller::{FetchError, PollConfig, PollError, Poller};
use crate::types::{BulkRunRequest, BulkRunResult, CreateRunRequest, Run, RunPage, UserIdentity};

/// Client + cache, applying the freshness rules in one place.
#[derive(Clone)]
pub struct RunRepository {
    client: Arc<dyn RunClient>,
    cache: Arc<CacheStore>,
}

impl RunRepository {
    pub fn new(client: Arc<dyn RunClient>, cache: Arc<CacheStore>) -> Self {
        Self { client, cache }
    }

    pub fn client(&self) -> &Arc<dyn RunClient> {
        &self.client
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn supports_bulk(&self) -> bool {
        self.client.bulk().is_some()
    }

    /// Terminal cached runs are returned as-is; anything else is fetched and
    /// the fetched value replaces the cache entry.
    pub async fn get_run(&self, id: &str) -> ApiResult<Run> {
        if let RunLookup::Fresh(run) = self.cache.lookup_run(id) {
            debug!(run_id = %id, "serving terminal run from cache");
            return Ok(run);
        }
        self.refresh_run(id).await
    }

    /// Always fetch, then replace the cache entry.
    pub async fn refresh_run(&self, id: &str) -> ApiResult<Run> {
        let run = self.client.get_run(id).await?;
        self.cache.set_run(run.clone());
        Ok(run)
    }

    pub async fn list_runs(&self, limit: usize, offset: usize) -> ApiResult<RunPage> {
        if let Some(page) = self.cache.get_run_list(limit, offset) {
            return Ok(page);
        }
        let page = self.client.list_runs(limit, offset).await?;
        self.cache.set_run_list(limit, offset, page.clone());
        Ok(page)
    }

    /// Create a run. Validation happens before the request is sent; success
    /// invalidates the list cache.
    pub async fn create_run(&self, request: &CreateRunRequest) -> ApiResult<Run> {
        request.validate()?;
        let run = self.client.create_run(request).await?;
        self.cache.set_run(run.clone());
        self.cache.invalidate_run_list();
        self.cache.record_repository(&request.repository);
        Ok(run)
    }

    pub async fn create_runs(&self, request: &BulkRunRequest) -> ApiResult<BulkRunResult> {
        let bulk = self
            .client
            .bulk()
            .ok_or(ApiError::Unsupported("bulk run creation"))?;
        request.validate()?;
        let result = bulk.create_runs(request).await?;
        if !result.created.is_empty() {
            self.cache.invalidate_run_list();
        }
        for run in &result.created {
            self.cache.set_run(run.clone());
            self.cache.record_repository(&run.repository);
        }
        Ok(result)
    }

    pub async fn current_user(&self) -> ApiResult<UserIdentity> {
        self.client.get_current_user().await
    }

    /// Poll a run until it reaches a terminal status.
    ///
    /// Every fetched value is written to the cache before `on_update` sees it.
    /// Transient API errors back off; anything else ends the poll.
    pub async fn poll_run<U, R>(
        &self,
        id: &str,
        config: PollConfig,
        cancel: CancellationToken,
        on_update: U,
        on_retry: R,
    ) -> Result<Run, PollError<ApiError>>
    where
        U: FnMut(&Run),
        R: FnMut(&ApiError, std::time::Duration),
    {
        let poller = Poller::new(config, cancel);
        poller
            .poll_with_retry_hook(
                || async move {
                    self.refresh_run(id).await.map_err(|e| {
                        if e.is_transient() {
                            FetchError::Transient(e)
                        } else {
                            FetchError::Fatal(e)
                        }
                    })
                },
                Run::is_terminal,
                on_update,
                on_retry,
            )
            .await
    }
}

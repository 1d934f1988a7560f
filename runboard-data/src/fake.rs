//! In-memory [`RunClient`] for tests.
//!
//! `get_run` answers from a scripted queue first and falls back to the
//! stored runs; anything unknown is a 404. Every call is counted.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use crate::client::{ApiResult, BoxFuture, BulkRunClient, RunClient};
use crate::error::ApiError;
use crate::types::{
    BulkFailure, BulkRunRequest, BulkRunResult, CreateRunRequest, Run, RunPage, RunStatus,
    UserIdentity,
};

pub const FAKE_ENDPOINT: &str = "fake://runboard";

#[derive(Default)]
struct FakeState {
    scripted: VecDeque<ApiResult<Run>>,
    runs: HashMap<String, Run>,
    list: Vec<Run>,
    user: Option<ApiResult<UserIdentity>>,
    create_error: Option<ApiError>,
    bulk_failures: Vec<String>,
    next_id: usize,
}

#[derive(Default)]
pub struct FakeClient {
    state: Mutex<FakeState>,
    bulk_enabled: bool,
    latency: Duration,
    get_run_calls: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    bulk_calls: AtomicUsize,
    user_calls: AtomicUsize,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bulk(mut self) -> Self {
        self.bulk_enabled = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a `get_run` response.
    pub fn push_run(&self, run: Run) {
        self.state().scripted.push_back(Ok(run));
    }

    pub fn push_error(&self, error: ApiError) {
        self.state().scripted.push_back(Err(error));
    }

    /// Store a run served whenever the scripted queue is empty.
    pub fn insert_run(&self, run: Run) {
        self.state().runs.insert(run.id.clone(), run);
    }

    pub fn set_list(&self, runs: Vec<Run>) {
        self.state().list = runs;
    }

    pub fn set_user(&self, user: ApiResult<UserIdentity>) {
        self.state().user = Some(user);
    }

    pub fn fail_create(&self, error: ApiError) {
        self.state().create_error = Some(error);
    }

    /// Repositories the bulk endpoint reports as failed.
    pub fn fail_bulk_for(&self, repository: &str) {
        self.state().bulk_failures.push(repository.to_string());
    }

    pub fn get_run_calls(&self) -> usize {
        self.get_run_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn next_run(&self, repository: &str, title: &str, prompt: &str) -> Run {
        let mut state = self.state();
        state.next_id += 1;
        let mut run = make_run(&format!("run-{}", state.next_id), RunStatus::Queued);
        run.repository = repository.to_string();
        run.title = title.to_string();
        run.prompt = prompt.to_string();
        state.runs.insert(run.id.clone(), run.clone());
        run
    }
}

impl RunClient for FakeClient {
    fn create_run<'a>(&'a self, request: &'a CreateRunRequest) -> BoxFuture<'a, ApiResult<Run>> {
        Box::pin(async move {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.delay().await;
            request.validate()?;
            if let Some(err) = self.state().create_error.clone() {
                return Err(err);
            }
            let mut run = self.next_run(&request.repository, &request.title, &request.prompt);
            run.run_type = request.run_type;
            Ok(run)
        })
    }

    fn get_run<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Run>> {
        Box::pin(async move {
            self.get_run_calls.fetch_add(1, Ordering::SeqCst);
            self.delay().await;
            let mut state = self.state();
            if let Some(result) = state.scripted.pop_front() {
                return result;
            }
            state.runs.get(id).cloned().ok_or_else(|| ApiError::Api {
                status: 404,
                message: format!("run {} not found", id),
            })
        })
    }

    fn list_runs(&self, limit: usize, offset: usize) -> BoxFuture<'_, ApiResult<RunPage>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.delay().await;
            let state = self.state();
            Ok(RunPage {
                runs: state.list.iter().skip(offset).take(limit).cloned().collect(),
                total: state.list.len(),
            })
        })
    }

    fn get_current_user(&self) -> BoxFuture<'_, ApiResult<UserIdentity>> {
        Box::pin(async move {
            self.user_calls.fetch_add(1, Ordering::SeqCst);
            self.delay().await;
            self.state().user.clone().unwrap_or(Err(ApiError::Api {
                status: 401,
                message: "no user configured".to_string(),
            }))
        })
    }

    fn endpoint(&self) -> String {
        FAKE_ENDPOINT.to_string()
    }

    fn bulk(&self) -> Option<&dyn BulkRunClient> {
        if self.bulk_enabled {
            Some(self)
        } else {
            None
        }
    }
}

impl BulkRunClient for FakeClient {
    fn create_runs<'a>(
        &'a self,
        request: &'a BulkRunRequest,
    ) -> BoxFuture<'a, ApiResult<BulkRunResult>> {
        Box::pin(async move {
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            self.delay().await;
            request.validate()?;
            let failing = self.state().bulk_failures.clone();
            let mut result = BulkRunResult::default();
            for repository in &request.repositories {
                if failing.contains(repository) {
                    result.failed.push(BulkFailure {
                        repository: repository.clone(),
                        message: "repository not accessible".to_string(),
                    });
                } else {
                    result
                        .created
                        .push(self.next_run(repository, &request.title, &request.prompt));
                }
            }
            Ok(result)
        })
    }
}

/// A run with fixed timestamps, handy for assertions.
pub fn make_run(id: &str, status: RunStatus) -> Run {
    let created = Utc
        .with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_default();
    Run {
        id: id.to_string(),
        repository: "acme/widgets".to_string(),
        title: format!("Run {}", id),
        prompt: "do the thing".to_string(),
        source_branch: None,
        target_branch: Some("main".to_string()),
        run_type: Default::default(),
        status,
        created_at: created,
        updated_at: created,
        completed_at: status.is_terminal().then_some(created + chrono::Duration::seconds(90)),
        pr_url: None,
        error: (status == RunStatus::Failed).then(|| "build failed".to_string()),
        result: None,
    }
}

pub fn make_user(username: &str) -> UserIdentity {
    UserIdentity {
        id: format!("user-{}", username),
        username: username.to_string(),
        email: Some(format!("{}@example.com", username)),
    }
}

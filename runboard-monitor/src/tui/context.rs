//! Shared state handed to every view.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use runboard_data::{CacheStore, PollConfig, RunRepository, Session};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::event::Event;

pub struct AppContext {
    pub repo: RunRepository,
    pub session: Session,
    /// Channel back into the event loop, for messages produced mid-task.
    pub events: UnboundedSender<Event>,
    pub poll_config: PollConfig,
    pub page_size: usize,
    pub polls: PollRegistry,
    /// Root token; every poll runs under a child of it.
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(
        repo: RunRepository,
        session: Session,
        events: UnboundedSender<Event>,
        poll_config: PollConfig,
        page_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            repo,
            session,
            events,
            poll_config,
            page_size: page_size.max(1),
            polls: PollRegistry::default(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        self.repo.cache()
    }
}

/// Tracks the one live poll per run.
#[derive(Default)]
pub struct PollRegistry {
    active: Mutex<HashMap<String, (u64, CancellationToken)>>,
    next_id: AtomicU64,
}

impl PollRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, (u64, CancellationToken)>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new poll for `run_id`, cancelling any poll already running
    /// for it. Returns the poll id and its cancellation token.
    pub fn start(&self, run_id: &str, parent: &CancellationToken) -> (u64, CancellationToken) {
        let poll_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = parent.child_token();
        if let Some((old_id, old)) = self
            .lock()
            .insert(run_id.to_string(), (poll_id, token.clone()))
        {
            debug!(run_id, old_id, poll_id, "superseding running poll");
            old.cancel();
        }
        (poll_id, token)
    }

    /// Whether `poll_id` is still the live poll for `run_id`.
    pub fn is_current(&self, run_id: &str, poll_id: u64) -> bool {
        self.lock()
            .get(run_id)
            .is_some_and(|(id, token)| *id == poll_id && !token.is_cancelled())
    }

    /// Cancel `poll_id` if it is still the live poll for `run_id`.
    pub fn cancel(&self, run_id: &str, poll_id: u64) -> bool {
        let mut active = self.lock();
        match active.get(run_id) {
            Some((id, _)) if *id == poll_id => {
                if let Some((_, token)) = active.remove(run_id) {
                    token.cancel();
                }
                true
            }
            _ => false,
        }
    }

    /// Forget a poll that ended on its own.
    pub fn finish(&self, run_id: &str, poll_id: u64) {
        let mut active = self.lock();
        if active.get(run_id).is_some_and(|(id, _)| *id == poll_id) {
            active.remove(run_id);
        }
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}

#[doc(hidden)]
pub mod testing {
    //! Context builders for tests.

    use super::*;
    use runboard_data::fake::FakeClient;
    use runboard_data::RunClient;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    pub struct TestContext {
        pub ctx: Arc<AppContext>,
        pub client: Arc<FakeClient>,
        pub cache: Arc<CacheStore>,
        pub events: UnboundedReceiver<Event>,
    }

    pub fn context_with(client: FakeClient) -> TestContext {
        let client = Arc::new(client);
        let cache = Arc::new(CacheStore::in_memory());
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = AppContext::new(
            RunRepository::new(client.clone(), cache.clone()),
            Session::anonymous(client.endpoint()),
            tx,
            PollConfig::default(),
            20,
        );
        TestContext {
            ctx,
            client,
            cache,
            events: rx,
        }
    }

    pub fn context() -> TestContext {
        context_with(FakeClient::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_supersedes_previous_poll() {
        let registry = PollRegistry::default();
        let root = CancellationToken::new();

        let (first, first_token) = registry.start("r1", &root);
        let (second, second_token) = registry.start("r1", &root);

        assert_ne!(first, second);
        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());
        assert!(!registry.is_current("r1", first));
        assert!(registry.is_current("r1", second));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_finish_ignores_stale_ids() {
        let registry = PollRegistry::default();
        let root = CancellationToken::new();
        let (first, _) = registry.start("r1", &root);
        let (second, _) = registry.start("r1", &root);

        registry.finish("r1", first);
        assert!(registry.is_current("r1", second));

        registry.finish("r1", second);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_cancel_and_root_shutdown() {
        let registry = PollRegistry::default();
        let root = CancellationToken::new();
        let (a, a_token) = registry.start("a", &root);
        let (_, b_token) = registry.start("b", &root);

        assert!(registry.cancel("a", a));
        assert!(a_token.is_cancelled());
        assert!(!registry.cancel("a", a));

        root.cancel();
        assert!(b_token.is_cancelled());
    }
}

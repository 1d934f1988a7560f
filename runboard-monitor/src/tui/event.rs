//! Messages delivered to the navigation controller and the active view.

use std::time::Duration;

use crossterm::event::KeyEvent;
use runboard_data::{ApiError, BulkRunResult, PollError, Run, RunPage};

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    /// Periodic tick from the event loop (spinners, elapsed clocks).
    Tick,
    Poll(PollMessage),
    RunsLoaded {
        limit: usize,
        offset: usize,
        result: Result<RunPage, ApiError>,
    },
    RunCreated(Result<Run, ApiError>),
    BulkCreated(Result<BulkRunResult, ApiError>),
    /// A signal asked the process to stop.
    Shutdown,
}

/// Progress of one background poll, tagged with the poll that produced it.
#[derive(Debug)]
pub enum PollMessage {
    /// A fetch succeeded. `next_in` is the wait before the next fetch, or
    /// `None` when the run is terminal.
    Tick {
        poll_id: u64,
        run: Run,
        next_in: Option<Duration>,
    },
    /// A transient failure; the poller will try again after `next_in`.
    Retrying {
        poll_id: u64,
        error: String,
        next_in: Duration,
    },
    Finished {
        poll_id: u64,
        result: Result<Run, PollError<ApiError>>,
    },
}

impl PollMessage {
    pub fn poll_id(&self) -> u64 {
        match self {
            Self::Tick { poll_id, .. }
            | Self::Retrying { poll_id, .. }
            | Self::Finished { poll_id, .. } => *poll_id,
        }
    }
}

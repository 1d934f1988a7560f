//! End-to-end navigation scenarios against the in-memory client.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use runboard_data::fake::{make_run, FakeClient};
use runboard_data::RunStatus;
use runboard_monitor::tui::command::Command;
use runboard_monitor::tui::context::testing::{context, context_with, TestContext};
use runboard_monitor::tui::event::{Event, PollMessage};
use runboard_monitor::tui::{App, NavigationIntent, Navigator};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.handle_event(key(KeyCode::Char(c)));
    }
}

fn app_for(t: &TestContext) -> App {
    // Background results land on the test context's receiver.
    let (_, rx) = mpsc::unbounded_channel();
    App::new(
        Navigator::new(t.ctx.clone()),
        rx,
        Handle::current(),
        Duration::from_millis(50),
    )
}

async fn next_event(t: &mut TestContext) -> Event {
    tokio::time::timeout(Duration::from_secs(5), t.events.recv())
        .await
        .expect("background event in time")
        .expect("event channel open")
}

#[tokio::test]
async fn test_create_then_details_fetches_immediately() {
    let mut t = context();
    let mut app = app_for(&t);
    app.start(None);
    let loaded = next_event(&mut t).await;
    app.handle_event(loaded);

    app.handle_event(key(KeyCode::Char('n')));
    assert_eq!(app.navigator().current_name(), "create");
    type_text(&mut app, "acme/widgets");
    app.handle_event(key(KeyCode::Tab));
    app.handle_event(key(KeyCode::Tab));
    type_text(&mut app, "fix the flaky test");
    app.handle_event(key(KeyCode::Enter));

    let created = next_event(&mut t).await;
    assert!(matches!(created, Event::RunCreated(Ok(_))));
    app.handle_event(created);
    assert_eq!(app.navigator().current_name(), "details");
    assert_eq!(app.navigator().depth(), 1, "details replaced the form in place");

    match next_event(&mut t).await {
        Event::Poll(PollMessage::Tick { run, next_in, .. }) => {
            assert_eq!(run.status, RunStatus::Queued);
            assert_eq!(next_in, Some(Duration::from_secs(5)));
        }
        other => panic!("expected a poll tick, got {:?}", other),
    }
    assert_eq!(t.client.create_calls(), 1);
    assert_eq!(t.client.get_run_calls(), 1);
    assert_eq!(t.ctx.polls.active_count(), 1, "queued run keeps polling");

    app.shutdown();
    assert!(t.ctx.shutdown.is_cancelled());
}

#[test]
fn test_details_with_terminal_snapshot_never_fetches() {
    let t = context();
    let mut navigator = Navigator::new(t.ctx.clone());

    let command = navigator.navigate(NavigationIntent::ToDetails {
        run_id: "r1".to_string(),
        snapshot: Some(make_run("r1", RunStatus::Done)),
    });

    assert!(command.is_none());
    assert_eq!(navigator.current_name(), "details");
    assert_eq!(t.client.get_run_calls(), 0);
    assert_eq!(t.ctx.polls.active_count(), 0);
}

#[test]
fn test_hundred_navigations_then_home_clears_everything() {
    let t = context();
    t.cache
        .set_navigation_context("scratch", serde_json::json!({ "draft": true }));
    let mut navigator = Navigator::new(t.ctx.clone());

    for i in 0..100 {
        navigator.navigate(NavigationIntent::ToDetails {
            run_id: format!("run-{}", i),
            snapshot: Some(make_run(&format!("run-{}", i), RunStatus::Failed)),
        });
    }
    assert_eq!(navigator.depth(), 100);

    navigator.navigate(NavigationIntent::ToDashboard);

    assert_eq!(navigator.depth(), 0);
    assert_eq!(navigator.current_name(), "dashboard");
    assert_eq!(t.cache.navigation_context_len(), 0);
}

#[test]
fn test_disabled_keys_never_navigate() {
    let t = context();
    let mut navigator = Navigator::new(t.ctx.clone());
    navigator.navigate(NavigationIntent::ToCreate);

    for c in ['q', 'b', '?', 'n', 'r', 'B'] {
        navigator.handle_event(key(KeyCode::Char(c)));
        assert_eq!(navigator.current_name(), "create", "'{}' was typed, not dispatched", c);
        assert_eq!(navigator.depth(), 1);
    }
    navigator.handle_event(key(KeyCode::Backspace));
    assert_eq!(navigator.current_name(), "create");

    // Esc is not text: the form hands it back as Back.
    match navigator.handle_event(key(KeyCode::Esc)) {
        Some(Command::Navigate(intent)) => {
            assert!(matches!(intent, NavigationIntent::Back));
            navigator.navigate(intent);
        }
        _ => panic!("esc should ask to go back"),
    }
    assert_eq!(navigator.current_name(), "dashboard");
}

#[tokio::test]
async fn test_typed_keys_stay_in_form_until_esc_through_app() {
    let t = context();
    let mut app = app_for(&t);
    app.start(None);

    app.handle_event(key(KeyCode::Char('n')));
    type_text(&mut app, "qb?");
    assert_eq!(app.navigator().current_name(), "create");

    app.handle_event(key(KeyCode::Esc));
    assert_eq!(app.navigator().current_name(), "dashboard");
    assert_eq!(app.navigator().depth(), 0);
}

#[tokio::test]
async fn test_missing_run_ends_on_fatal_error_then_dashboard() {
    let mut t = context_with(FakeClient::new());
    let mut app = app_for(&t);
    app.start(Some(NavigationIntent::ToDetails {
        run_id: "gone".to_string(),
        snapshot: None,
    }));

    // Dashboard load and the failed poll, in either order.
    for _ in 0..2 {
        let event = next_event(&mut t).await;
        app.handle_event(event);
    }

    assert_eq!(app.navigator().current_name(), "error");
    assert_eq!(app.navigator().depth(), 0, "404 is not recoverable");
    assert_eq!(t.ctx.polls.active_count(), 0);

    app.handle_event(key(KeyCode::Enter));
    assert_eq!(app.navigator().current_name(), "dashboard");
}

#[tokio::test]
async fn test_terminal_poll_result_stops_polling() {
    let client = FakeClient::new();
    client.insert_run(make_run("r1", RunStatus::Done));
    let mut t = context_with(client);
    let mut app = app_for(&t);
    app.start(None);
    app.handle_event(Event::Resize {
        width: 100,
        height: 30,
    });

    app.execute(Some(Command::Navigate(NavigationIntent::ToDetails {
        run_id: "r1".to_string(),
        snapshot: Some(make_run("r1", RunStatus::Processing)),
    })));

    let mut finished = false;
    for _ in 0..3 {
        let event = next_event(&mut t).await;
        if let Event::Poll(PollMessage::Finished { result, .. }) = &event {
            assert_eq!(result.as_ref().map(|r| r.status), Ok(RunStatus::Done));
            finished = true;
        }
        app.handle_event(event);
        if finished {
            break;
        }
    }

    assert!(finished, "poll finished with the terminal run");
    assert_eq!(app.navigator().current_name(), "details");
    assert_eq!(t.ctx.polls.active_count(), 0);
    assert_eq!(
        t.cache.get_run("r1").map(|r| r.status),
        Some(RunStatus::Done),
        "poll results are written through to the cache"
    );
}

//! TUI event loop: terminal input, ticks and background results feed the
//! navigator; commands it returns are executed here.

use std::collections::VecDeque;
use std::time::Duration;

use crossterm::event::{self, Event as TermEvent, KeyEventKind};
use ratatui::{backend::Backend, Terminal};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use super::command::Command;
use super::event::Event;
use super::navigation::{NavigationIntent, Navigator};
use super::ui;

pub struct App {
    navigator: Navigator,
    events: UnboundedReceiver<Event>,
    runtime: Handle,
    tick_rate: Duration,
    should_quit: bool,
}

impl App {
    pub fn new(
        navigator: Navigator,
        events: UnboundedReceiver<Event>,
        runtime: Handle,
        tick_rate: Duration,
    ) -> Self {
        Self {
            navigator,
            events,
            runtime,
            tick_rate,
            should_quit: false,
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Initialise the root view, then optionally jump straight to `initial`.
    pub fn start(&mut self, initial: Option<NavigationIntent>) {
        let command = self.navigator.start();
        self.execute(command);
        if let Some(intent) = initial {
            let command = self.navigator.navigate(intent);
            self.execute(command);
        }
    }

    /// Run a command tree to completion. Futures are spawned; everything else
    /// is applied in order.
    pub fn execute(&mut self, command: Option<Command>) {
        let mut queue: VecDeque<Command> = command.into_iter().collect();
        while let Some(command) = queue.pop_front() {
            match command {
                Command::Batch(commands) => queue.extend(commands),
                Command::Navigate(intent) => queue.extend(self.navigator.navigate(intent)),
                Command::Quit => {
                    debug!("quit requested");
                    self.should_quit = true;
                }
                Command::Emit(event) => queue.extend(self.navigator.handle_event(event)),
                Command::Perform(future) => {
                    let events = self.navigator.context().events.clone();
                    self.runtime.spawn(async move {
                        let event = future.await;
                        if events.send(event).is_err() {
                            debug!("event loop gone, dropping background result");
                        }
                    });
                }
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        if let Event::Shutdown = event {
            info!("shutdown requested");
            self.should_quit = true;
            return;
        }
        let command = self.navigator.handle_event(event);
        self.execute(command);
    }

    /// Apply every background message already waiting. Returns how many.
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Run the application event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let size = terminal.size()?;
        self.handle_event(Event::Resize {
            width: size.width,
            height: size.height,
        });

        while !self.should_quit {
            terminal.draw(|frame| ui::render(frame, &self.navigator))?;

            self.drain_events();
            if self.should_quit {
                break;
            }

            if event::poll(self.tick_rate)? {
                match event::read()? {
                    TermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_event(Event::Key(key))
                    }
                    TermEvent::Resize(width, height) => {
                        self.handle_event(Event::Resize { width, height })
                    }
                    _ => {}
                }
            } else {
                self.handle_event(Event::Tick);
            }
        }
        Ok(())
    }

    /// Stop every poll and flush the cache snapshot.
    pub fn shutdown(&mut self) {
        let ctx = self.navigator.context();
        ctx.shutdown.cancel();
        ctx.cache().save_to_disk();
        info!(depth = self.navigator.depth(), "tui stopped");
    }
}

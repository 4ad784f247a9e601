//! Automation engine: owns the worker thread and the control surface.
//!
//! [`Engine`] starts and stops a single background worker that runs the
//! loop in [`worker`]. While the worker runs it owns the task and account
//! collections; edits reach it as [`EngineCommand`]s over a channel.
//! Progress is reported as [`EngineEvent`]s on a tokio channel.

mod events;
mod stores;
mod worker;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::clock::{Clock, SystemClock};
use crate::config::AutomationConfig;
use crate::error::{AutomationError, Result};
use crate::executor::ExecutorRegistry;
use crate::platform::{self, InputDriver, InputService, NullVision, WindowDriver};
use crate::popup::{PopupResolver, PopupSettings};
use crate::vision::{TemplateMatcher, TextReader, Vision};

pub use events::{EngineEvent, EventSink, LogLevel};
pub use stores::{EngineCommand, Stores};

use stores::StorePaths;
pub use worker::{IdleReason, Iteration};

use worker::{Control, LoopSettings, Runner};

/// The external collaborators the engine drives.
#[derive(Clone)]
pub struct Backends {
    pub window: Arc<dyn WindowDriver>,
    pub input: Arc<dyn InputDriver>,
    pub matcher: Arc<dyn TemplateMatcher>,
    pub reader: Arc<dyn TextReader>,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Backends for this host, or `None` when it has no desktop backend.
    pub fn detect() -> Option<Self> {
        let (window, input) = platform::create_desktop()?;
        Some(Self::with_desktop(window, input))
    }

    /// Backends for a host without a desktop. The engine refuses to run
    /// tasks over these.
    pub fn headless() -> Self {
        let (window, input) = platform::headless_desktop();
        Self::with_desktop(window, input)
    }

    fn with_desktop(window: Arc<dyn WindowDriver>, input: Arc<dyn InputDriver>) -> Self {
        let vision = Arc::new(NullVision);
        Self {
            window,
            input,
            matcher: vision.clone(),
            reader: vision,
            clock: Arc::new(SystemClock),
        }
    }
}

/// What happened to a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Applied and persisted.
    Applied,
    /// Applied, but the record it names does not exist.
    NotFound,
    /// Handed to the running worker.
    Queued,
}

enum EngineState {
    Stopped(Stores),
    Running {
        control_tx: Sender<Control>,
        done_rx: Receiver<Stores>,
        handle: JoinHandle<()>,
        paths: StorePaths,
    },
    /// Stop timed out; the worker still holds the stores.
    Detaching {
        done_rx: Receiver<Stores>,
        handle: JoinHandle<()>,
        paths: StorePaths,
    },
    /// Only observable while a transition is in progress.
    Transitioning,
}

/// Start/stop control over the automation loop.
pub struct Engine {
    runner: Arc<Runner>,
    state: EngineState,
    events: EventSink,
    stop_timeout: Duration,
}

impl Engine {
    /// Wire the engine. Stores are used as given; call
    /// [`Engine::load_data`] to read them from disk.
    pub fn new(
        config: &AutomationConfig,
        backends: Backends,
        executors: ExecutorRegistry,
        stores: Stores,
        events_tx: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let events = EventSink::new(events_tx);
        let vision = Vision::new(
            backends.matcher.clone(),
            backends.reader.clone(),
            &config.vision,
        );
        let input = InputService::new(
            backends.window.clone(),
            backends.input.clone(),
            backends.clock.clone(),
            &config.input,
        );
        let popups = PopupResolver::new(
            PopupSettings::from(&config.popup),
            vision.clone(),
            input.clone(),
            backends.window.clone(),
            backends.clock.clone(),
        );
        let settings = LoopSettings {
            idle_poll: config.engine.idle_poll(),
            error_cooldown: config.engine.error_cooldown(),
            settle_delay: config.engine.settle_delay(),
            debug_screenshots: config
                .debug
                .enabled
                .then(|| config.debug.screenshot_root()),
        };

        let runner = Runner {
            settings,
            window: backends.window,
            clock: backends.clock,
            vision,
            input,
            popups,
            executors,
            events: events.clone(),
        };

        Self {
            runner: Arc::new(runner),
            state: EngineState::Stopped(stores),
            events,
            stop_timeout: config.engine.stop_timeout(),
        }
    }

    /// Reload tasks and accounts from disk.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Engine`] while the worker owns the stores.
    pub fn load_data(&mut self) -> Result<()> {
        self.reclaim();
        let EngineState::Stopped(stores) = &mut self.state else {
            return Err(AutomationError::Engine(
                "cannot reload data while the engine is running".to_owned(),
            ));
        };
        stores.load_all();
        self.events.info(format!(
            "data loaded: {} tasks, {} accounts",
            stores.scheduler.tasks().len(),
            stores.rotator.accounts().len()
        ));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, EngineState::Running { .. })
    }

    /// Fail when the window driver cannot reach any window, before a task
    /// is attempted and marked failed.
    fn ensure_desktop(&self) -> Result<()> {
        if self.runner.window.is_available() {
            Ok(())
        } else {
            Err(AutomationError::Engine(
                "no desktop backend is available on this host".to_owned(),
            ))
        }
    }

    /// Spawn the worker. Starting a running engine is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Engine`] when there is no desktop to
    /// drive, a previous worker has not exited yet, or the thread cannot be
    /// spawned.
    pub fn start(&mut self) -> Result<()> {
        self.reclaim();
        match std::mem::replace(&mut self.state, EngineState::Transitioning) {
            EngineState::Stopped(stores) => {
                if let Err(e) = self.ensure_desktop() {
                    self.state = EngineState::Stopped(stores);
                    return Err(e);
                }
                self.spawn_worker(stores)
            }
            other => {
                let detaching = matches!(other, EngineState::Detaching { .. });
                self.state = other;
                if detaching {
                    Err(AutomationError::Engine(
                        "previous worker is still shutting down".to_owned(),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn spawn_worker(&mut self, stores: Stores) -> Result<()> {
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let (handoff_tx, handoff_rx) = crossbeam_channel::bounded::<Stores>(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<Stores>(1);
        let runner = Arc::clone(&self.runner);
        let paths = stores.paths();

        let spawned = std::thread::Builder::new()
            .name("autogame-engine".to_owned())
            .spawn(move || {
                let Ok(stores) = handoff_rx.recv() else {
                    return;
                };
                let stores = worker::run_worker(runner, stores, control_rx);
                let _ = done_tx.send(stores);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.state = EngineState::Stopped(stores);
                return Err(AutomationError::Engine(format!(
                    "cannot spawn engine worker: {e}"
                )));
            }
        };

        if let Err(e) = handoff_tx.send(stores) {
            self.state = EngineState::Stopped(e.into_inner());
            let _ = handle.join();
            return Err(AutomationError::Channel(
                "engine worker exited before start".to_owned(),
            ));
        }

        self.state = EngineState::Running {
            control_tx,
            done_rx,
            handle,
            paths,
        };
        self.events.info("automation engine started");
        Ok(())
    }

    /// Ask the worker to stop and wait up to the stop timeout for it.
    ///
    /// In-flight native calls are never interrupted: when the timeout
    /// elapses the engine stops waiting and reclaims the stores later.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.state, EngineState::Transitioning) {
            EngineState::Running {
                control_tx,
                done_rx,
                handle,
                paths,
            } => {
                let _ = control_tx.send(Control::Stop);
                match done_rx.recv_timeout(self.stop_timeout) {
                    Ok(stores) => {
                        let _ = handle.join();
                        self.state = EngineState::Stopped(stores);
                        self.events.info("automation engine stopped");
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        self.state = EngineState::Detaching {
                            done_rx,
                            handle,
                            paths,
                        };
                        self.events.warn(format!(
                            "engine worker did not stop within {}ms; detaching",
                            self.stop_timeout.as_millis()
                        ));
                    }
                    Err(RecvTimeoutError::Disconnected) => self.recover(handle, &paths),
                }
            }
            other => {
                self.state = other;
                self.reclaim();
            }
        }
    }

    /// Take the stores back from a worker that finished after a timed-out
    /// stop.
    fn reclaim(&mut self) {
        if !matches!(self.state, EngineState::Detaching { .. }) {
            return;
        }
        let EngineState::Detaching {
            done_rx,
            handle,
            paths,
        } = std::mem::replace(&mut self.state, EngineState::Transitioning)
        else {
            return;
        };
        match done_rx.try_recv() {
            Ok(stores) => {
                let _ = handle.join();
                self.state = EngineState::Stopped(stores);
                self.events.info("automation engine stopped");
            }
            Err(TryRecvError::Empty) => {
                self.state = EngineState::Detaching {
                    done_rx,
                    handle,
                    paths,
                };
            }
            Err(TryRecvError::Disconnected) => self.recover(handle, &paths),
        }
    }

    /// The worker exited without handing the stores back. Everything it
    /// applied was persisted as it went, so reload from disk.
    fn recover(&mut self, handle: JoinHandle<()>, paths: &StorePaths) {
        let cause = match handle.join() {
            Ok(()) => "exited without returning its data".to_owned(),
            Err(payload) => format!("panicked: {}", worker::panic_message(payload.as_ref())),
        };
        self.events
            .error(format!("engine worker {cause}; reloading data from disk"));
        self.state = EngineState::Stopped(paths.reopen());
    }

    /// Apply an edit to the tasks or accounts.
    ///
    /// Applied immediately while stopped; queued for the worker while
    /// running.
    ///
    /// # Errors
    ///
    /// Returns the persistence error when applied directly, or
    /// [`AutomationError::Engine`] while a stop is still pending.
    pub fn submit(&mut self, command: EngineCommand) -> Result<CommandStatus> {
        self.reclaim();
        match &mut self.state {
            EngineState::Stopped(stores) => Ok(if stores.apply(command)? {
                CommandStatus::Applied
            } else {
                CommandStatus::NotFound
            }),
            EngineState::Running { control_tx, .. } => {
                control_tx
                    .send(Control::Command(command))
                    .map_err(|_| AutomationError::Channel("engine worker is gone".to_owned()))?;
                Ok(CommandStatus::Queued)
            }
            EngineState::Detaching { .. } | EngineState::Transitioning => Err(
                AutomationError::Engine("engine worker is still shutting down".to_owned()),
            ),
        }
    }

    /// Run a single iteration on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Engine`] while the worker runs or when
    /// there is no desktop to drive, or the iteration's own error.
    pub fn run_once(&mut self) -> Result<Iteration> {
        self.reclaim();
        self.ensure_desktop()?;
        let EngineState::Stopped(stores) = &mut self.state else {
            return Err(AutomationError::Engine(
                "cannot run a single iteration while the engine is running".to_owned(),
            ));
        };
        self.runner.run_iteration(stores)
    }

    /// The collections, while the engine is stopped.
    pub fn stores(&self) -> Option<&Stores> {
        match &self.state {
            EngineState::Stopped(stores) => Some(stores),
            _ => None,
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Startup sequencing.
//!
//! One sequencer drives one session through
//! `Idle -> ConfigLoading -> StylesLoading -> ModulesLoading ->
//! [AwaitingDeferralSignal] -> [Typesetting] -> Ready`.
//! A stage starts only after every operation of the previous stage has
//! completed. A failing stage leaves the sequencer parked in that state.

use super::host::{StartupHost, TypesetRequest};
use super::state::StartupState;
use crate::config::{
    ConfigTree, DeferralCondition, Defaults, StartupOptions, bundles, merge,
};
use crate::environment::EnvironmentIdentity;
use crate::error::StartupError;
use crate::modules::{LoadPlan, ModuleRegistry, resolve};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// External signals that deferred startup can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadySignal {
    /// The hosting page finished loading.
    PageLoaded,
    /// The host declared its own configuration complete.
    Configured,
}

#[derive(Debug, Clone, Copy, Default)]
struct SignalLatch {
    page_loaded: bool,
    configured: bool,
}

impl SignalLatch {
    fn satisfies(&self, condition: DeferralCondition) -> bool {
        match condition {
            DeferralCondition::None => true,
            DeferralCondition::OnLoad => self.page_loaded,
            DeferralCondition::Configured => self.configured,
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    config: Option<Arc<ConfigTree>>,
    options: Option<Arc<StartupOptions>>,
    plan: Option<Arc<LoadPlan>>,
    /// Stylesheets that finished loading; a retry resumes after them.
    sheets_loaded: usize,
    /// Plan entries that finished loading; a retry resumes after them.
    modules_loaded: usize,
    running: bool,
    last_error: Option<String>,
}

/// Drives the startup sequence of one document session.
pub struct StartupSequencer<H> {
    host: H,
    defaults: Defaults,
    caller_override: ConfigTree,
    registry: ModuleRegistry,
    environment: EnvironmentIdentity,
    state: watch::Sender<StartupState>,
    signals: watch::Sender<SignalLatch>,
    abort: watch::Sender<bool>,
    session: Mutex<Session>,
}

impl<H: StartupHost> StartupSequencer<H> {
    pub fn new(host: H, defaults: Defaults, caller_override: ConfigTree) -> Self {
        Self {
            host,
            defaults,
            caller_override,
            registry: ModuleRegistry::builtin(),
            environment: EnvironmentIdentity::default(),
            state: watch::Sender::new(StartupState::Idle),
            signals: watch::Sender::new(SignalLatch::default()),
            abort: watch::Sender::new(false),
            session: Mutex::new(Session::default()),
        }
    }

    /// Replace the module registry used to resolve the load plan.
    pub fn with_registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the environment identity consulted by config bundles.
    pub fn with_environment(mut self, environment: EnvironmentIdentity) -> Self {
        self.environment = environment;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn state(&self) -> StartupState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<StartupState> {
        self.state.subscribe()
    }

    /// The resolved configuration, once ConfigLoading has completed.
    pub fn config(&self) -> Option<Arc<ConfigTree>> {
        self.session().config.clone()
    }

    pub fn options(&self) -> Option<Arc<StartupOptions>> {
        self.session().options.clone()
    }

    /// The load plan, once ModulesLoading has resolved it.
    pub fn plan(&self) -> Option<Arc<LoadPlan>> {
        self.session().plan.clone()
    }

    pub fn modules_loaded(&self) -> usize {
        self.session().modules_loaded
    }

    /// Message of the failure the sequencer is parked on, if any.
    pub fn last_error(&self) -> Option<String> {
        self.session().last_error.clone()
    }

    /// Start the session.
    ///
    /// Outside `Idle` this does nothing and returns the current state.
    pub async fn start(&self) -> Result<StartupState, StartupError> {
        {
            let mut session = self.session();
            let current = self.state();
            if current != StartupState::Idle {
                debug!(state = %current, "Startup already begun");
                return Ok(current);
            }
            session.running = true;
            session.last_error = None;
            self.abort.send_replace(false);
            self.transition(StartupState::ConfigLoading);
        }
        self.run().await
    }

    /// Re-run the stage the sequencer is parked on after a failure.
    ///
    /// Stylesheet and module loading resume after the last item that
    /// loaded; config loading re-runs in full. Without a recorded failure this does nothing and returns the current
    /// state.
    pub async fn retry(&self) -> Result<StartupState, StartupError> {
        {
            let mut session = self.session();
            if session.running || session.last_error.is_none() {
                return Ok(self.state());
            }
            session.running = true;
            session.last_error = None;
            info!(stage = %self.state(), "Retrying startup stage");
        }
        self.run().await
    }

    /// Abort the session and return it to `Idle`.
    ///
    /// Only possible before module loading has begun.
    pub fn abort(&self) -> Result<(), StartupError> {
        let mut session = self.session();
        let state = self.state();
        if !state.is_cancellable() {
            return Err(StartupError::NotCancellable { state });
        }
        if session.running {
            // The running stage observes the flag and unwinds.
            self.abort.send_replace(true);
        } else {
            *session = Session::default();
            self.transition(StartupState::Idle);
        }
        info!(stage = %state, "Startup abort requested");
        Ok(())
    }

    /// Raise an external ready signal. Signals are latched, so raising one
    /// before startup reaches the deferral wait is not lost.
    pub fn signal(&self, signal: ReadySignal) {
        debug!(?signal, "Ready signal raised");
        self.signals.send_modify(|latch| match signal {
            ReadySignal::PageLoaded => latch.page_loaded = true,
            ReadySignal::Configured => latch.configured = true,
        });
    }

    /// Typeset again after startup, without re-running the sequence.
    pub async fn retypeset(&self, elements: Vec<String>) -> Result<(), StartupError> {
        let state = self.state();
        if state != StartupState::Ready {
            return Err(StartupError::InvalidState {
                expected: StartupState::Ready,
                actual: state,
            });
        }
        let config = self.resolved(StartupState::Ready)?.0;
        let request = TypesetRequest { elements };
        self.host
            .typeset(&request, &config)
            .await
            .map_err(|e| StartupError::stage(StartupState::Typesetting, e))
    }

    async fn run(&self) -> Result<StartupState, StartupError> {
        loop {
            let stage = self.state();
            let outcome = match stage {
                StartupState::ConfigLoading => self.abortable(stage, self.load_config()).await,
                StartupState::StylesLoading => self.abortable(stage, self.load_styles()).await,
                StartupState::ModulesLoading => self.load_modules().await,
                StartupState::AwaitingDeferralSignal => self.await_deferral().await,
                StartupState::Typesetting => self.typeset_initial().await,
                StartupState::Idle | StartupState::Ready => {
                    self.session().running = false;
                    return Ok(stage);
                }
            };

            match outcome {
                Ok(next) => {
                    // An abort accepted while the stage was finishing still wins.
                    let aborted = {
                        let _session = self.session();
                        let aborted = stage.is_cancellable() && *self.abort.borrow();
                        if !aborted {
                            self.transition(next);
                        }
                        aborted
                    };
                    if aborted {
                        return Err(self.unwind_abort(stage));
                    }
                }
                Err(StartupError::Aborted { stage }) => return Err(self.unwind_abort(stage)),
                Err(err) => {
                    error!(stage = %stage, error = %err, "Startup stage failed");
                    let mut session = self.session();
                    session.running = false;
                    session.last_error = Some(err.to_string());
                    return Err(err);
                }
            }
        }
    }

    /// Discard the session and return to `Idle`.
    fn unwind_abort(&self, stage: StartupState) -> StartupError {
        *self.session() = Session::default();
        self.abort.send_replace(false);
        self.transition(StartupState::Idle);
        warn!(stage = %stage, "Startup aborted");
        StartupError::Aborted { stage }
    }

    /// Race a cancellable stage against the abort flag.
    async fn abortable<F>(&self, stage: StartupState, work: F) -> Result<StartupState, StartupError>
    where
        F: Future<Output = Result<StartupState, StartupError>>,
    {
        let mut abort = self.abort.subscribe();
        tokio::select! {
            biased;
            Ok(_) = abort.wait_for(|requested| *requested) => Err(StartupError::Aborted { stage }),
            result = work => result,
        }
    }

    async fn load_config(&self) -> Result<StartupState, StartupError> {
        let stage = StartupState::ConfigLoading;
        let fail = |e: crate::error::ConfigError| StartupError::stage(stage, e);

        let mut resolved = merge(self.defaults.tree(), &self.caller_override).map_err(fail)?;
        let names = StartupOptions::from_tree(&resolved).map_err(fail)?.config;
        for name in &names {
            let layer = match bundles::apply_builtin(name, &resolved, &self.environment) {
                Some(layer) => layer,
                None => {
                    debug!(bundle = %name, "Fetching config bundle from host");
                    self.host
                        .load_config(name)
                        .await
                        .map_err(|e| StartupError::stage(stage, e))?
                }
            };
            resolved = merge(&resolved, &layer).map_err(fail)?;
            debug!(bundle = %name, "Applied config bundle");
        }
        let options = StartupOptions::from_tree(&resolved).map_err(fail)?;

        info!(
            jax = ?options.jax,
            extensions = ?options.extensions,
            deferral = ?options.delay_startup_until,
            "Configuration resolved"
        );
        let mut session = self.session();
        session.config = Some(Arc::new(resolved));
        session.options = Some(Arc::new(options));
        Ok(StartupState::StylesLoading)
    }

    async fn load_styles(&self) -> Result<StartupState, StartupError> {
        let stage = StartupState::StylesLoading;
        let (_, options) = self.resolved(stage)?;
        let start = self.session().sheets_loaded;
        for (idx, sheet) in options.style_sheets.iter().enumerate().skip(start) {
            debug!(stylesheet = %sheet, "Loading stylesheet");
            self.host
                .load_stylesheet(sheet)
                .await
                .map_err(|e| StartupError::stage(stage, e))?;
            self.session().sheets_loaded = idx + 1;
        }
        self.host
            .apply_styles(&options.styles)
            .await
            .map_err(|e| StartupError::stage(stage, e))?;
        Ok(StartupState::ModulesLoading)
    }

    async fn load_modules(&self) -> Result<StartupState, StartupError> {
        let stage = StartupState::ModulesLoading;
        let (config, options) = self.resolved(stage)?;

        let cached = self.session().plan.clone();
        let plan = match cached {
            Some(plan) => plan,
            None => {
                // Resolve fully before any module side effect.
                let registry = self.registry.clone().with_configured(&options.modules);
                let plan = Arc::new(
                    resolve(&options.requested_modules(), &registry)
                        .map_err(|e| StartupError::stage(stage, e))?,
                );
                self.session().plan = Some(Arc::clone(&plan));
                plan
            }
        };

        let start = self.session().modules_loaded;
        for (idx, module) in plan.iter().enumerate().skip(start) {
            let location = module.source_location(&options.root);
            debug!(module = %module.name, location = %location, "Loading module");
            self.host
                .load_module(module, &location, &config)
                .await
                .map_err(|e| StartupError::stage(stage, e))?;
            self.session().modules_loaded = idx + 1;
        }
        info!(modules = plan.len(), "Modules loaded");

        Ok(if options.delay_startup_until != DeferralCondition::None {
            StartupState::AwaitingDeferralSignal
        } else {
            after_deferral(&options)
        })
    }

    async fn await_deferral(&self) -> Result<StartupState, StartupError> {
        let stage = StartupState::AwaitingDeferralSignal;
        let (_, options) = self.resolved(stage)?;
        let condition = options.delay_startup_until;
        info!(?condition, "Waiting for ready signal");
        let mut signals = self.signals.subscribe();
        signals
            .wait_for(|latch| latch.satisfies(condition))
            .await
            .map_err(|e| StartupError::stage(stage, e))?;
        Ok(after_deferral(&options))
    }

    async fn typeset_initial(&self) -> Result<StartupState, StartupError> {
        let stage = StartupState::Typesetting;
        let (config, options) = self.resolved(stage)?;
        let request = TypesetRequest {
            elements: options.elements.clone(),
        };
        self.host
            .typeset(&request, &config)
            .await
            .map_err(|e| StartupError::stage(stage, e))?;
        Ok(StartupState::Ready)
    }

    fn resolved(
        &self,
        stage: StartupState,
    ) -> Result<(Arc<ConfigTree>, Arc<StartupOptions>), StartupError> {
        let session = self.session();
        match (&session.config, &session.options) {
            (Some(config), Some(options)) => Ok((Arc::clone(config), Arc::clone(options))),
            _ => Err(StartupError::stage(stage, "configuration has not been resolved")),
        }
    }

    fn transition(&self, next: StartupState) {
        let previous = self.state.send_replace(next);
        if previous != next && !previous.is_valid_transition(next) {
            warn!(from = %previous, to = %next, "Unexpected startup transition");
        }
        info!(from = %previous, to = %next, "Startup state changed");
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn after_deferral(options: &StartupOptions) -> StartupState {
    if options.skip_startup_typeset {
        StartupState::Ready
    } else {
        StartupState::Typesetting
    }
}

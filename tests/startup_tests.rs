//! Integration tests for the startup sequencer.

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::{RecordingHost, tree};
use jax_startup::config::{ConfigTree, Defaults};
use jax_startup::environment::{Browser, EnvironmentIdentity};
use jax_startup::error::{ConfigError, ResolveError, StartupError};
use jax_startup::modules::{ModuleDescriptor, ModuleRegistry};
use jax_startup::startup::{
    ReadySignal, StartupHost, StartupSequencer, StartupState, TypesetRequest,
};
use serde_json::json;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tokio::sync::Notify;

/// Sequencer over the builtin defaults with the given override.
fn sequencer(host: RecordingHost, caller_override: ConfigTree) -> StartupSequencer<RecordingHost> {
    let defaults = Defaults::builtin().expect("builtin defaults parse");
    StartupSequencer::new(host, defaults, caller_override)
}

/// Override with no config bundles and a small module set.
fn basic_override() -> serde_json::Value {
    json!({
        "config": [],
        "jax": ["input/MathML", "output/HTML-CSS"],
        "extensions": ["MathMenu.js"]
    })
}

fn with(mut base: serde_json::Value, extra: serde_json::Value) -> ConfigTree {
    if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    tree(base)
}

#[tokio::test]
async fn startup_without_deferral_runs_to_ready() {
    let seq = sequencer(RecordingHost::new(), tree(basic_override()));
    assert_eq!(seq.state(), StartupState::Idle);

    let state = seq.start().await.expect("startup succeeds");

    assert_eq!(state, StartupState::Ready);
    assert_eq!(seq.state(), StartupState::Ready);
    assert_eq!(
        seq.host().calls(),
        vec![
            "styles",
            "module:input/MathML",
            "module:output/HTML-CSS",
            "module:MathMenu.js",
            "typeset:"
        ]
    );
}

#[tokio::test]
async fn stylesheets_load_before_styles_and_modules() {
    let overrides = with(basic_override(), json!({"styleSheets": ["a.css", "b.css"]}));
    let seq = sequencer(RecordingHost::new(), overrides);
    seq.start().await.unwrap();

    let calls = seq.host().calls();
    assert_eq!(&calls[..3], &["stylesheet:a.css", "stylesheet:b.css", "styles"]);
    assert_eq!(calls[3], "module:input/MathML");
}

#[tokio::test]
async fn deferral_waits_for_page_loaded_signal() {
    let overrides = with(basic_override(), json!({"delayStartupUntil": "onload"}));
    let seq = Arc::new(sequencer(RecordingHost::new(), overrides));
    let mut states = seq.subscribe();

    let runner = Arc::clone(&seq);
    let handle = tokio::spawn(async move { runner.start().await });

    states
        .wait_for(|s| *s == StartupState::AwaitingDeferralSignal)
        .await
        .unwrap();
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(seq.state(), StartupState::AwaitingDeferralSignal);
    assert_eq!(seq.host().loaded_modules().len(), 3);
    assert!(!seq.host().calls().iter().any(|c| c.starts_with("typeset")));

    // The wrong signal does not release the wait.
    seq.signal(ReadySignal::Configured);
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(seq.state(), StartupState::AwaitingDeferralSignal);

    seq.signal(ReadySignal::PageLoaded);
    let state = handle.await.unwrap().unwrap();
    assert_eq!(state, StartupState::Ready);
    assert_eq!(seq.host().calls().last().map(String::as_str), Some("typeset:"));
}

#[tokio::test]
async fn deferral_signal_raised_early_is_latched() {
    let overrides = with(basic_override(), json!({"delayStartupUntil": "configured"}));
    let seq = sequencer(RecordingHost::new(), overrides);
    seq.signal(ReadySignal::Configured);

    assert_eq!(seq.start().await.unwrap(), StartupState::Ready);
}

#[tokio::test]
async fn skip_startup_typeset_goes_straight_to_ready() {
    let overrides = with(basic_override(), json!({"skipStartupTypeset": true}));
    let seq = sequencer(RecordingHost::new(), overrides);

    assert_eq!(seq.start().await.unwrap(), StartupState::Ready);
    assert!(!seq.host().calls().iter().any(|c| c.starts_with("typeset")));

    seq.retypeset(vec!["eq1".into(), "eq2".into()]).await.unwrap();
    assert_eq!(seq.host().calls().last().map(String::as_str), Some("typeset:eq1,eq2"));
}

#[tokio::test]
async fn initial_typeset_uses_configured_elements() {
    let overrides = with(basic_override(), json!({"elements": ["main"]}));
    let seq = sequencer(RecordingHost::new(), overrides);
    seq.start().await.unwrap();
    assert_eq!(seq.host().calls().last().map(String::as_str), Some("typeset:main"));
}

#[tokio::test]
async fn retypeset_requires_ready() {
    let seq = sequencer(RecordingHost::new(), tree(basic_override()));
    let err = seq.retypeset(Vec::new()).await.unwrap_err();
    assert!(matches!(
        err,
        StartupError::InvalidState {
            expected: StartupState::Ready,
            actual: StartupState::Idle
        }
    ));
}

#[tokio::test]
async fn start_outside_idle_returns_current_state() {
    let overrides = with(basic_override(), json!({"delayStartupUntil": "onload"}));
    let seq = Arc::new(sequencer(RecordingHost::new(), overrides));
    let mut states = seq.subscribe();

    let runner = Arc::clone(&seq);
    let handle = tokio::spawn(async move { runner.start().await });
    states
        .wait_for(|s| *s == StartupState::AwaitingDeferralSignal)
        .await
        .unwrap();

    assert_eq!(seq.start().await.unwrap(), StartupState::AwaitingDeferralSignal);

    seq.signal(ReadySignal::PageLoaded);
    handle.await.unwrap().unwrap();
    let calls_after_ready = seq.host().calls();

    assert_eq!(seq.start().await.unwrap(), StartupState::Ready);
    assert_eq!(seq.host().calls(), calls_after_ready);
    assert_eq!(seq.host().loaded_modules().len(), 3);
}

#[tokio::test]
async fn invalid_override_parks_in_config_loading() {
    let overrides = with(basic_override(), json!({"HTML-CSS": 5}));
    let seq = sequencer(RecordingHost::new(), overrides);

    let err = seq.start().await.unwrap_err();

    assert_eq!(err.failed_stage(), Some(StartupState::ConfigLoading));
    match err.cause::<ConfigError>() {
        Some(ConfigError::InvalidConfig { path, .. }) => assert_eq!(path, "HTML-CSS"),
        other => panic!("expected InvalidConfig cause, got {:?}", other),
    }
    assert_eq!(seq.state(), StartupState::ConfigLoading);
    assert!(seq.config().is_none());
    assert!(seq.last_error().is_some());
    assert!(seq.host().calls().is_empty());

    // A parked, cancellable session can be aborted back to idle.
    seq.abort().unwrap();
    assert_eq!(seq.state(), StartupState::Idle);
    assert!(seq.last_error().is_none());
}

#[tokio::test]
async fn unknown_module_loads_nothing() {
    let overrides = with(basic_override(), json!({"extensions": ["MathMenu.js", "Nope.js"]}));
    let seq = sequencer(RecordingHost::new(), overrides);

    let err = seq.start().await.unwrap_err();

    assert_eq!(err.failed_stage(), Some(StartupState::ModulesLoading));
    assert_eq!(err.cause::<ResolveError>(), Some(&ResolveError::unknown("Nope.js")));
    assert_eq!(seq.state(), StartupState::ModulesLoading);
    assert!(seq.host().loaded_modules().is_empty());
    assert!(seq.plan().is_none());
}

#[tokio::test]
async fn dependency_cycle_loads_nothing() {
    let registry: ModuleRegistry = [
        ModuleDescriptor::extension("A.js").with_dependency("B.js"),
        ModuleDescriptor::extension("B.js").with_dependency("A.js"),
    ]
    .into_iter()
    .collect();
    let overrides = tree(json!({"config": [], "jax": [], "extensions": ["A.js"]}));
    let seq = sequencer(RecordingHost::new(), overrides).with_registry(registry);

    let err = seq.start().await.unwrap_err();

    assert!(matches!(
        err.cause::<ResolveError>(),
        Some(ResolveError::CyclicDependency { .. })
    ));
    assert!(seq.host().loaded_modules().is_empty());
}

#[tokio::test]
async fn module_failure_parks_and_retry_resumes() {
    let host = RecordingHost::new();
    host.fail_on("module:output/HTML-CSS");
    let seq = sequencer(host, tree(basic_override()));

    let err = seq.start().await.unwrap_err();
    assert_eq!(err.failed_stage(), Some(StartupState::ModulesLoading));
    assert_eq!(seq.state(), StartupState::ModulesLoading);
    assert_eq!(seq.host().loaded_modules(), vec!["input/MathML"]);
    assert_eq!(seq.modules_loaded(), 1);

    // Still failing: retry parks again without advancing.
    assert!(seq.retry().await.is_err());
    assert_eq!(seq.state(), StartupState::ModulesLoading);

    seq.host().clear_failures();
    assert_eq!(seq.retry().await.unwrap(), StartupState::Ready);
    assert_eq!(
        seq.host().loaded_modules(),
        vec!["input/MathML", "output/HTML-CSS", "MathMenu.js"]
    );
}

#[tokio::test]
async fn retry_without_failure_is_a_no_op() {
    let seq = sequencer(RecordingHost::new(), tree(basic_override()));
    assert_eq!(seq.retry().await.unwrap(), StartupState::Idle);
    seq.start().await.unwrap();
    assert_eq!(seq.retry().await.unwrap(), StartupState::Ready);
}

#[tokio::test]
async fn abort_during_styles_loading_returns_to_idle() {
    let gate = Arc::new(Notify::new());
    let host = RecordingHost::new().with_stylesheet_gate(Arc::clone(&gate));
    let overrides = with(basic_override(), json!({"styleSheets": ["site.css"]}));
    let seq = Arc::new(sequencer(host, overrides));
    let mut states = seq.subscribe();

    let runner = Arc::clone(&seq);
    let handle = tokio::spawn(async move { runner.start().await });
    states
        .wait_for(|s| *s == StartupState::StylesLoading)
        .await
        .unwrap();

    seq.abort().unwrap();
    let err = handle.await.unwrap().unwrap_err();

    assert!(matches!(
        err,
        StartupError::Aborted {
            stage: StartupState::StylesLoading
        }
    ));
    assert_eq!(seq.state(), StartupState::Idle);
    assert!(seq.config().is_none());
    assert!(seq.host().loaded_modules().is_empty());

    // A fresh start runs the whole sequence again.
    gate.notify_one();
    assert_eq!(seq.start().await.unwrap(), StartupState::Ready);
    assert_eq!(seq.host().loaded_modules().len(), 3);
}

#[tokio::test]
async fn abort_after_modules_began_is_rejected() {
    let overrides = with(basic_override(), json!({"delayStartupUntil": "onload"}));
    let seq = Arc::new(sequencer(RecordingHost::new(), overrides));
    let mut states = seq.subscribe();

    let runner = Arc::clone(&seq);
    let handle = tokio::spawn(async move { runner.start().await });
    states
        .wait_for(|s| *s == StartupState::AwaitingDeferralSignal)
        .await
        .unwrap();

    let err = seq.abort().unwrap_err();
    assert!(matches!(
        err,
        StartupError::NotCancellable {
            state: StartupState::AwaitingDeferralSignal
        }
    ));

    seq.signal(ReadySignal::PageLoaded);
    assert_eq!(handle.await.unwrap().unwrap(), StartupState::Ready);
    assert!(matches!(seq.abort(), Err(StartupError::NotCancellable { .. })));
}

#[tokio::test]
async fn mml_or_html_bundle_follows_environment() {
    let overrides = tree(json!({"extensions": []}));
    let seq = sequencer(RecordingHost::new(), overrides)
        .with_environment(EnvironmentIdentity::for_browser(Browser::Firefox));
    seq.start().await.unwrap();
    assert_eq!(
        seq.host().loaded_modules(),
        vec!["input/MathML", "output/NativeMML"]
    );

    let overrides = tree(json!({"extensions": []}));
    let seq = sequencer(RecordingHost::new(), overrides)
        .with_environment(EnvironmentIdentity::for_browser(Browser::Opera));
    seq.start().await.unwrap();
    assert_eq!(
        seq.host().loaded_modules(),
        vec!["input/MathML", "output/HTML-CSS"]
    );
}

#[tokio::test]
async fn host_config_bundle_is_merged() {
    let bundle = tree(json!({"extensions": ["MathZoom.js"], "HTML-CSS": {"scale": 120}}));
    let host = RecordingHost::new().with_bundle("local/site.js", bundle);
    let overrides = with(basic_override(), json!({"config": ["local/site.js"]}));
    let seq = sequencer(host, overrides);

    seq.start().await.unwrap();

    assert_eq!(seq.host().calls()[0], "config:local/site.js");
    assert_eq!(
        seq.host().loaded_modules(),
        vec!["input/MathML", "output/HTML-CSS", "MathZoom.js"]
    );
    let config = seq.config().unwrap();
    assert_eq!(
        config.get_path("HTML-CSS.scale").and_then(|v| v.as_i64()),
        Some(120)
    );
    assert_eq!(
        config.get_path("HTML-CSS.webFont").and_then(|v| v.as_str()),
        Some("TeX")
    );
}

#[tokio::test]
async fn missing_host_bundle_fails_config_stage() {
    let overrides = with(basic_override(), json!({"config": ["missing.js"]}));
    let seq = sequencer(RecordingHost::new(), overrides);
    let err = seq.start().await.unwrap_err();
    assert_eq!(err.failed_stage(), Some(StartupState::ConfigLoading));
    assert!(seq.config().is_none());
}

#[tokio::test]
async fn configured_module_dependencies_are_honored() {
    let overrides = tree(json!({
        "config": [],
        "jax": ["input/MathML"],
        "extensions": ["local/menu.js"],
        "modules": {
            "local/menu.js": {
                "kind": "extension",
                "path": "local/menu.js",
                "dependencies": ["output/HTML-CSS"]
            }
        }
    }));
    let seq = sequencer(RecordingHost::new(), overrides);
    seq.start().await.unwrap();

    assert_eq!(
        seq.plan().unwrap().names(),
        vec!["input/MathML", "output/HTML-CSS", "local/menu.js"]
    );
}

#[tokio::test]
async fn custom_registry_orders_menu_after_output() {
    let mut registry = ModuleRegistry::builtin();
    registry.upsert(ModuleDescriptor::extension("MathMenu.js").with_dependency("output/HTML-CSS"));
    let overrides = tree(json!({"config": [], "jax": [], "extensions": ["MathMenu.js"]}));
    let seq = sequencer(RecordingHost::new(), overrides).with_registry(registry);

    seq.start().await.unwrap();

    assert_eq!(seq.host().loaded_modules(), vec!["output/HTML-CSS", "MathMenu.js"]);
}

/// Host that requests an abort from inside `apply_styles` and then lets the
/// stage complete normally.
#[derive(Default)]
struct AbortingHost {
    inner: RecordingHost,
    sequencer: OnceLock<Weak<StartupSequencer<AbortingHost>>>,
    accepted: Mutex<Option<bool>>,
}

#[async_trait]
impl StartupHost for AbortingHost {
    async fn load_stylesheet(&self, location: &str) -> Result<()> {
        self.inner.load_stylesheet(location).await
    }

    async fn apply_styles(&self, styles: &ConfigTree) -> Result<()> {
        if let Some(seq) = self.sequencer.get().and_then(Weak::upgrade) {
            *self.accepted.lock().unwrap() = Some(seq.abort().is_ok());
        }
        self.inner.apply_styles(styles).await
    }

    async fn load_module(
        &self,
        module: &ModuleDescriptor,
        location: &str,
        config: &ConfigTree,
    ) -> Result<()> {
        self.inner.load_module(module, location, config).await
    }

    async fn typeset(&self, request: &TypesetRequest, config: &ConfigTree) -> Result<()> {
        self.inner.typeset(request, config).await
    }
}

#[tokio::test]
async fn abort_accepted_as_stage_completes_is_honored() {
    let defaults = Defaults::builtin().unwrap();
    let seq = Arc::new(StartupSequencer::new(
        AbortingHost::default(),
        defaults,
        tree(basic_override()),
    ));
    seq.host().sequencer.set(Arc::downgrade(&seq)).unwrap();

    let err = seq.start().await.unwrap_err();

    assert_eq!(*seq.host().accepted.lock().unwrap(), Some(true));
    assert!(matches!(
        err,
        StartupError::Aborted {
            stage: StartupState::StylesLoading
        }
    ));
    assert_eq!(seq.state(), StartupState::Idle);
    assert!(seq.host().inner.loaded_modules().is_empty());
    assert!(seq.config().is_none());
}

#[tokio::test]
async fn stylesheet_failure_retry_resumes_after_loaded_sheets() {
    let host = RecordingHost::new();
    host.fail_on("stylesheet:b.css");
    let overrides = with(basic_override(), json!({"styleSheets": ["a.css", "b.css", "c.css"]}));
    let seq = sequencer(host, overrides);

    let err = seq.start().await.unwrap_err();
    assert_eq!(err.failed_stage(), Some(StartupState::StylesLoading));
    assert_eq!(seq.state(), StartupState::StylesLoading);

    seq.host().clear_failures();
    assert_eq!(seq.retry().await.unwrap(), StartupState::Ready);

    let sheets: Vec<String> = seq
        .host()
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("stylesheet:"))
        .collect();
    assert_eq!(sheets, vec!["stylesheet:a.css", "stylesheet:b.css", "stylesheet:c.css"]);
}

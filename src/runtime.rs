//! Wiring of the focus session, its observers and the remote sync tasks

use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::Config,
    engine::{SystemClock, TimerEngine, DEFAULT_LONG_BREAK_EVERY},
    services::{
        AmbientAudioPlayer, AudioPort, SessionService, TabTitlePresenter, TimeBlockService,
        WatchTitle,
    },
    state::{AppState, FocusSession, Storage, StorageBus, StoreSet},
    tasks::{
        ambient_audio_task, session_poller::POLL_INTERVAL, session_poller_task, session_sync_task,
        settings_follower_task, store_listener_task, title_presenter_task, AudioInputs,
        SessionSync,
    },
};

/// Store context used by HTTP handlers
pub const API_CONTEXT: &str = "api";
/// Store context followed by the running session and its observers
pub const ENGINE_CONTEXT: &str = "engine";

/// Tunables for a runtime instance
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub host: String,
    pub port: u16,
    pub product_name: String,
    pub assets_dir: PathBuf,
    pub long_break_every: u32,
    pub poll_period: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            product_name: "StudyDash".to_string(),
            assets_dir: PathBuf::from("assets/sounds"),
            long_break_every: DEFAULT_LONG_BREAK_EVERY,
            poll_period: POLL_INTERVAL,
        }
    }
}

impl RuntimeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            product_name: config.product_name.clone(),
            assets_dir: config.assets_dir.clone(),
            long_break_every: config.long_break_every,
            poll_period: config.poll_period(),
        }
    }
}

/// Capabilities the runtime is built from
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub audio: Arc<dyn AudioPort>,
    pub sessions: Option<Arc<dyn SessionService>>,
    pub blocks: Option<Arc<dyn TimeBlockService>>,
}

/// A running focus session with its background tasks
pub struct Runtime {
    state: Arc<AppState>,
    token: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Runtime {
    /// Build the session and spawn every observer task. Must be called from
    /// within a tokio runtime.
    pub fn launch(collaborators: Collaborators, options: RuntimeOptions) -> Self {
        let Collaborators {
            storage,
            audio,
            sessions,
            blocks,
        } = collaborators;

        let bus = StorageBus::default();
        let engine_stores = StoreSet::open(storage.clone(), &bus, ENGINE_CONTEXT);
        let api_stores = StoreSet::open(storage, &bus, API_CONTEXT);

        let engine = TimerEngine::new(engine_stores.settings.current(), Arc::new(SystemClock))
            .with_long_break_every(options.long_break_every);
        let session = FocusSession::new(engine);
        let title = WatchTitle::new(options.product_name.clone());

        let token = CancellationToken::new();
        let mut tasks = Vec::new();

        tasks.push((
            "store listener",
            tokio::spawn(store_listener_task(
                engine_stores.clone(),
                bus.subscribe(),
                token.child_token(),
            )),
        ));
        tasks.push((
            "settings follower",
            tokio::spawn(settings_follower_task(
                session.clone(),
                engine_stores.settings.subscribe(),
                token.child_token(),
            )),
        ));
        tasks.push((
            "title presenter",
            tokio::spawn(title_presenter_task(
                TabTitlePresenter::new(Arc::new(title.clone()), options.product_name.clone()),
                session.subscribe_state(),
                token.child_token(),
            )),
        ));
        tasks.push((
            "ambient audio",
            tokio::spawn(ambient_audio_task(
                AmbientAudioPlayer::new(audio, options.assets_dir.clone()),
                AudioInputs {
                    state: session.subscribe_state(),
                    preset: engine_stores.ambient.subscribe(),
                    preferences: engine_stores.preferences.subscribe(),
                    events: session.subscribe_events(),
                },
                token.child_token(),
            )),
        ));

        let (active_tx, active_rx) = watch::channel(None);
        let (local_id_tx, local_id_rx) = watch::channel(None);
        match &sessions {
            Some(service) => {
                tasks.push((
                    "session sync",
                    tokio::spawn(session_sync_task(
                        SessionSync::new(service.clone(), blocks, local_id_tx),
                        session.subscribe_events(),
                        token.child_token(),
                    )),
                ));
                tasks.push((
                    "session poller",
                    tokio::spawn(session_poller_task(
                        service.clone(),
                        active_tx,
                        options.poll_period,
                        token.child_token(),
                    )),
                ));
            }
            None => info!("No session service configured, remote sync disabled"),
        }

        let state = Arc::new(AppState::new(
            session,
            api_stores,
            title,
            sessions,
            active_rx,
            local_id_rx,
            options.host,
            options.port,
            options.product_name,
        ));

        info!("Focus session runtime started with {} tasks", tasks.len());
        Self {
            state,
            token,
            tasks,
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Halt the countdown, stop every task and wait for them to finish.
    /// The title is restored and audio released on the way out.
    pub async fn shutdown(self) {
        info!("Shutting down focus session runtime");
        self.state.session.shutdown();
        self.token.cancel();

        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                warn!("Task '{}' ended abnormally: {}", name, e);
            }
        }
        info!("Focus session runtime stopped");
    }
}

//! Observer tasks that turn countdown state into side effects

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    engine::TimerEvent,
    services::{audio::AmbientAudioPlayer, title::TabTitlePresenter},
    state::{SelectedPreset, TimerPreferences, TimerState},
};

/// Mirror the countdown into the title until cancelled; the original title
/// is restored on the way out.
pub async fn title_presenter_task(
    mut presenter: TabTitlePresenter,
    mut state_rx: watch::Receiver<TimerState>,
    token: CancellationToken,
) {
    info!("Starting title presenter task");
    presenter.render(&state_rx.borrow_and_update().clone());

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                presenter.render(&state);
            }
        }
    }

    presenter.deactivate();
    info!("Title presenter task stopped");
}

/// Inputs the audio task listens to
pub struct AudioInputs {
    pub state: watch::Receiver<TimerState>,
    pub preset: watch::Receiver<SelectedPreset>,
    pub preferences: watch::Receiver<TimerPreferences>,
    pub events: broadcast::Receiver<TimerEvent>,
}

/// Keep ambient playback in line with (preset, running) and play the chime
/// on completion when sounds are enabled.
pub async fn ambient_audio_task(
    mut player: AmbientAudioPlayer,
    mut inputs: AudioInputs,
    token: CancellationToken,
) {
    info!("Starting ambient audio task");
    refresh(&mut player, &mut inputs);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            changed = inputs.state.changed() => {
                if changed.is_err() {
                    break;
                }
                refresh(&mut player, &mut inputs);
            }
            changed = inputs.preset.changed() => {
                if changed.is_err() {
                    break;
                }
                refresh(&mut player, &mut inputs);
            }
            received = inputs.events.recv() => match received {
                Ok(TimerEvent::Completed { mode, .. }) => {
                    if inputs.preferences.borrow().sound_enabled {
                        debug!("Chime for completed {}", mode);
                        player.play_chime();
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Audio task lagged, {} timer events missed", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    player.shutdown();
    info!("Ambient audio task stopped");
}

fn refresh(player: &mut AmbientAudioPlayer, inputs: &mut AudioInputs) {
    let running = inputs.state.borrow_and_update().is_running;
    let preset = inputs.preset.borrow_and_update().clone();
    player.update(preset.id(), running);
}

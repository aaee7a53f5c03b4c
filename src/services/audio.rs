//! Ambient sound: preset table, audio capability and the single-stream player

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use serde::Serialize;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{FocusError, Result};

/// Fixed ambient volume, 0.0..=1.0
pub const AMBIENT_VOLUME: f32 = 0.4;

/// Volume of the completion chime
pub const CHIME_VOLUME: f32 = 0.7;

const CHIME_FILE: &str = "chime.mp3";

/// Known ambient sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbientPreset {
    Rain,
    Forest,
    Ocean,
    Cafe,
    WhiteNoise,
    Fireplace,
}

impl AmbientPreset {
    pub const ALL: [AmbientPreset; 6] = [
        Self::Rain,
        Self::Forest,
        Self::Ocean,
        Self::Cafe,
        Self::WhiteNoise,
        Self::Fireplace,
    ];

    /// Resolve a stored id; unknown ids mean "no sound"
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.id() == id)
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Rain => "rain",
            Self::Forest => "forest",
            Self::Ocean => "ocean",
            Self::Cafe => "cafe",
            Self::WhiteNoise => "white_noise",
            Self::Fireplace => "fireplace",
        }
    }

    pub fn asset_file(self) -> &'static str {
        match self {
            Self::Rain => "rain.mp3",
            Self::Forest => "forest.mp3",
            Self::Ocean => "ocean.mp3",
            Self::Cafe => "cafe.mp3",
            Self::WhiteNoise => "white_noise.mp3",
            Self::Fireplace => "fireplace.mp3",
        }
    }
}

/// A started audio stream. `stop` must be idempotent.
pub trait AudioStream: Send {
    fn stop(&mut self);
}

/// Audio output capability
pub trait AudioPort: Send + Sync {
    /// Start a continuously looping stream
    fn play_loop(&self, asset: &Path, volume: f32) -> Result<Box<dyn AudioStream>>;

    /// Fire-and-forget one-shot sound
    fn play_once(&self, asset: &Path, volume: f32) -> Result<()>;
}

/// Owns at most one looping ambient stream, driven by (preset, running)
pub struct AmbientAudioPlayer {
    port: Arc<dyn AudioPort>,
    assets_dir: PathBuf,
    current: Option<(AmbientPreset, Box<dyn AudioStream>)>,
    last_inputs: Option<(Option<AmbientPreset>, bool)>,
}

impl AmbientAudioPlayer {
    pub fn new(port: Arc<dyn AudioPort>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            port,
            assets_dir: assets_dir.into(),
            current: None,
            last_inputs: None,
        }
    }

    /// Preset currently playing, if any
    pub fn playing(&self) -> Option<AmbientPreset> {
        self.current.as_ref().map(|(preset, _)| *preset)
    }

    /// Re-evaluate playback for new inputs. The previous stream is always
    /// released before a new one starts. Identical inputs are a no-op.
    pub fn update(&mut self, preset_id: Option<&str>, is_running: bool) {
        let preset = preset_id.and_then(AmbientPreset::from_id);
        if let Some(id) = preset_id.filter(|_| preset.is_none()) {
            debug!("Unknown ambient preset '{}', treating as silence", id);
        }

        let inputs = (preset, is_running);
        if self.last_inputs == Some(inputs) {
            return;
        }
        self.last_inputs = Some(inputs);

        self.stop();
        let Some(preset) = preset.filter(|_| is_running) else {
            return;
        };

        let asset = self.assets_dir.join(preset.asset_file());
        match self.port.play_loop(&asset, AMBIENT_VOLUME) {
            Ok(stream) => {
                info!("Ambient sound '{}' started", preset.id());
                self.current = Some((preset, stream));
            }
            Err(e) => warn!("Ambient sound '{}' unavailable: {}", preset.id(), e),
        }
    }

    /// Stop and release the current stream; no-op when silent
    pub fn stop(&mut self) {
        if let Some((preset, mut stream)) = self.current.take() {
            stream.stop();
            debug!("Ambient sound '{}' stopped", preset.id());
        }
    }

    /// Release everything and forget the last inputs (unmount)
    pub fn shutdown(&mut self) {
        self.stop();
        self.last_inputs = None;
    }

    /// One-shot completion chime; failures are logged only
    pub fn play_chime(&self) {
        let asset = self.assets_dir.join(CHIME_FILE);
        if let Err(e) = self.port.play_once(&asset, CHIME_VOLUME) {
            warn!("Completion chime unavailable: {}", e);
        }
    }
}

impl Drop for AmbientAudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Plays assets through an external command-line player (mpv by default)
#[derive(Debug, Clone)]
pub struct CommandAudioPort {
    program: String,
}

impl CommandAudioPort {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, asset: &Path, volume: f32, looping: bool) -> Result<Command> {
        if !asset.exists() {
            return Err(FocusError::PlaybackUnavailable(format!(
                "missing asset {}",
                asset.display()
            )));
        }
        let mut command = Command::new(&self.program);
        command
            .arg("--no-video")
            .arg("--really-quiet")
            .arg(format!("--volume={}", (volume.clamp(0.0, 1.0) * 100.0).round() as u32));
        if looping {
            command.arg("--loop=inf");
        }
        command
            .arg(asset)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Ok(command)
    }

    fn spawn(&self, mut command: Command) -> Result<Child> {
        command.spawn().map_err(|e| {
            FocusError::PlaybackUnavailable(format!("failed to launch {}: {}", self.program, e))
        })
    }
}

impl AudioPort for CommandAudioPort {
    fn play_loop(&self, asset: &Path, volume: f32) -> Result<Box<dyn AudioStream>> {
        let mut command = self.command(asset, volume, true)?;
        command.kill_on_drop(true);
        let child = self.spawn(command)?;
        Ok(Box::new(ChildStream { child: Some(child) }))
    }

    fn play_once(&self, asset: &Path, volume: f32) -> Result<()> {
        let command = self.command(asset, volume, false)?;
        self.spawn(command).map(|_| ())
    }
}

struct ChildStream {
    child: Option<Child>,
}

impl AudioStream for ChildStream {
    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!("Audio player already exited: {}", e);
            }
        }
    }
}

impl Drop for ChildStream {
    fn drop(&mut self) {
        self.stop();
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeAudioPort;
    use super::*;

    fn player() -> (AmbientAudioPlayer, Arc<FakeAudioPort>) {
        let port = Arc::new(FakeAudioPort::default());
        (AmbientAudioPlayer::new(port.clone(), "/sounds"), port)
    }

    #[test]
    fn plays_only_when_running_with_known_preset() {
        let (mut player, port) = player();
        player.update(Some("rain"), false);
        assert_eq!(port.active_streams(), 0);

        player.update(Some("rain"), true);
        assert_eq!(port.active_streams(), 1);
        assert_eq!(player.playing(), Some(AmbientPreset::Rain));
        assert_eq!(port.started.lock().unwrap()[0], PathBuf::from("/sounds/rain.mp3"));

        player.update(Some("rain"), false);
        assert_eq!(port.active_streams(), 0);
    }

    #[test]
    fn switching_presets_keeps_a_single_stream() {
        let (mut player, port) = player();
        player.update(Some("rain"), true);
        player.update(Some("ocean"), true);
        assert_eq!(port.active_streams(), 1);
        assert_eq!(player.playing(), Some(AmbientPreset::Ocean));

        player.update(None, true);
        assert_eq!(port.active_streams(), 0);
    }

    #[test]
    fn unknown_preset_is_silence() {
        let (mut player, port) = player();
        player.update(Some("thunderstorm-deluxe"), true);
        assert_eq!(port.active_streams(), 0);
        assert!(player.playing().is_none());
    }

    #[test]
    fn repeated_inputs_do_not_restart_stream() {
        let (mut player, port) = player();
        player.update(Some("cafe"), true);
        player.update(Some("cafe"), true);
        assert_eq!(port.started.lock().unwrap().len(), 1);
    }

    #[test]
    fn playback_failure_is_swallowed() {
        let (mut player, port) = player();
        port.set_failing(true);
        player.update(Some("forest"), true);
        assert!(player.playing().is_none());
        player.stop();
        player.stop();
    }

    #[test]
    fn drop_releases_stream() {
        let (mut player, port) = player();
        player.update(Some("fireplace"), true);
        drop(player);
        assert_eq!(port.active_streams(), 0);
    }

    #[test]
    fn preset_ids_round_trip_through_table() {
        for preset in AmbientPreset::ALL {
            assert_eq!(AmbientPreset::from_id(preset.id()), Some(preset));
        }
        assert_eq!(AmbientPreset::from_id("Rain"), None);
    }

    #[test]
    fn missing_asset_is_playback_unavailable() {
        let port = CommandAudioPort::new("mpv");
        let err = port
            .play_once(Path::new("/definitely/not/here.mp3"), 0.5)
            .unwrap_err();
        assert!(matches!(err, FocusError::PlaybackUnavailable(_)));
    }
}

//! Title mirroring: shows the running countdown in the window/tab title

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::state::TimerState;

/// Read/write access to the displayed title
pub trait TitlePort: Send + Sync {
    fn title(&self) -> String;
    fn set_title(&self, title: &str);
}

/// Title held in a watch channel; views poll or subscribe to it
#[derive(Debug, Clone)]
pub struct WatchTitle {
    tx: Arc<watch::Sender<String>>,
}

impl WatchTitle {
    pub fn new(initial: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(initial.into());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}

impl TitlePort for WatchTitle {
    fn title(&self) -> String {
        self.tx.borrow().clone()
    }

    fn set_title(&self, title: &str) {
        self.tx.send_if_modified(|current| {
            if current == title {
                false
            } else {
                *current = title.to_string();
                true
            }
        });
    }
}

/// Writes `MM:SS — <product>` while the countdown runs and restores the
/// title captured at activation as soon as it stops
pub struct TabTitlePresenter {
    port: Arc<dyn TitlePort>,
    product_name: String,
    captured: Option<String>,
}

impl TabTitlePresenter {
    pub fn new(port: Arc<dyn TitlePort>, product_name: impl Into<String>) -> Self {
        Self {
            port,
            product_name: product_name.into(),
            captured: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.captured.is_some()
    }

    pub fn render(&mut self, state: &TimerState) {
        if state.is_running {
            if self.captured.is_none() {
                let original = self.port.title();
                debug!("Title presenter activated, captured '{}'", original);
                self.captured = Some(original);
            }
            self.port
                .set_title(&format!("{} — {}", state.display(), self.product_name));
        } else {
            self.deactivate();
        }
    }

    /// Restore the captured title, if any
    pub fn deactivate(&mut self) {
        if let Some(original) = self.captured.take() {
            self.port.set_title(&original);
            debug!("Title presenter restored '{}'", original);
        }
    }
}

impl Drop for TabTitlePresenter {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{TimerMode, TimerSettings};

    fn running(remaining: u64) -> TimerState {
        let mut state = TimerState::initial(&TimerSettings::default());
        state.is_running = true;
        state.remaining_seconds = remaining;
        state
    }

    #[test]
    fn running_countdown_is_mirrored_then_restored() {
        let title = Arc::new(WatchTitle::new("Courses | Dashboard"));
        let mut presenter = TabTitlePresenter::new(title.clone(), "StudyDash");

        presenter.render(&running(1500));
        assert_eq!(title.title(), "25:00 — StudyDash");
        presenter.render(&running(1499));
        assert_eq!(title.title(), "24:59 — StudyDash");

        let mut paused = running(1499);
        paused.is_running = false;
        presenter.render(&paused);
        assert_eq!(title.title(), "Courses | Dashboard");
    }

    #[test]
    fn capture_is_taken_fresh_on_each_activation() {
        let title = Arc::new(WatchTitle::new("Courses"));
        let mut presenter = TabTitlePresenter::new(title.clone(), "StudyDash");
        presenter.render(&running(10));
        presenter.deactivate();

        title.set_title("Events");
        presenter.render(&running(9));
        presenter.deactivate();
        assert_eq!(title.title(), "Events");
    }

    #[test]
    fn drop_restores_title() {
        let title = Arc::new(WatchTitle::new("Profile"));
        {
            let mut presenter = TabTitlePresenter::new(title.clone(), "StudyDash");
            let mut state = running(300);
            state.mode = TimerMode::Break;
            presenter.render(&state);
            assert!(presenter.is_active());
        }
        assert_eq!(title.title(), "Profile");
    }

    #[test]
    fn idle_render_leaves_title_alone() {
        let title = Arc::new(WatchTitle::new("Feedback"));
        let mut presenter = TabTitlePresenter::new(title.clone(), "StudyDash");
        presenter.render(&TimerState::initial(&TimerSettings::default()));
        assert_eq!(title.title(), "Feedback");
    }
}

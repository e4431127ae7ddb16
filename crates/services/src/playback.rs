//! Playback adapter surface.
//!
//! The embedded player is an external collaborator reached through
//! [`PlayerHandle`]. Players without a native time-update event are driven by
//! [`PlaybackPoller`], which samples the handle on a fixed cadence and
//! synthesizes the event stream the lesson engines consume.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Coarse player state as reported by the embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Playing,
    Paused,
    Ended,
}

/// Events flowing from the playback adapter into a lesson engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Player became ready; carries the embed's initial position hint.
    Ready { initial_seek_hint: f64 },
    /// Current playback position, in seconds. May arrive out of order
    /// relative to seeks and may carry transient garbage during seeking.
    TimeUpdate(f64),
    Play,
    Pause,
    Ended,
}

/// Handle to the embedded video player.
pub trait PlayerHandle: Send + Sync {
    fn state(&self) -> PlayerState;
    /// Current position in seconds.
    fn position(&self) -> f64;
    /// Media duration in seconds, when the embed knows it.
    fn duration(&self) -> Option<f64>;
    fn seek_to(&self, seconds: f64);
}

//
// ─── POLLER ────────────────────────────────────────────────────────────────────
//

/// Cancellable poll loop turning a [`PlayerHandle`] into [`PlaybackEvent`]s.
///
/// Emits `Play`/`Pause`/`Ended` on state transitions and a `TimeUpdate` for
/// every sample taken while playing. The loop stops on `Ended` or when the
/// poller is stopped/dropped, so no event outlives the lesson view that
/// created it.
pub struct PlaybackPoller {
    task: JoinHandle<()>,
}

impl PlaybackPoller {
    /// Starts polling; events are delivered on `tx` until `Ended` or stop.
    #[must_use]
    pub fn spawn(
        player: Arc<dyn PlayerHandle>,
        poll_interval: Duration,
        tx: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut last_state = PlayerState::Unstarted;
            loop {
                tokio::time::sleep(poll_interval).await;
                let state = player.state();

                if state != last_state {
                    let event = match state {
                        PlayerState::Playing => Some(PlaybackEvent::Play),
                        PlayerState::Paused => Some(PlaybackEvent::Pause),
                        PlayerState::Ended => Some(PlaybackEvent::Ended),
                        PlayerState::Unstarted => None,
                    };
                    if let Some(event) = event {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                    if state == PlayerState::Ended {
                        return;
                    }
                    last_state = state;
                }

                if state == PlayerState::Playing
                    && tx.send(PlaybackEvent::TimeUpdate(player.position())).is_err()
                {
                    return;
                }
            }
        });
        Self { task }
    }

    /// Stops the poll loop. Safe to call more than once.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for PlaybackPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted player: a fixed sequence of (state, position) samples.
    struct ScriptedPlayer {
        samples: Mutex<Vec<(PlayerState, f64)>>,
        last: Mutex<(PlayerState, f64)>,
    }

    impl ScriptedPlayer {
        fn new(samples: Vec<(PlayerState, f64)>) -> Self {
            Self {
                samples: Mutex::new(samples),
                last: Mutex::new((PlayerState::Unstarted, 0.0)),
            }
        }

        fn advance(&self) -> (PlayerState, f64) {
            let mut samples = self.samples.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if !samples.is_empty() {
                *last = samples.remove(0);
            }
            *last
        }
    }

    impl PlayerHandle for ScriptedPlayer {
        fn state(&self) -> PlayerState {
            self.advance().0
        }

        fn position(&self) -> f64 {
            self.last.lock().unwrap().1
        }

        fn duration(&self) -> Option<f64> {
            Some(600.0)
        }

        fn seek_to(&self, _seconds: f64) {}
    }

    #[tokio::test(start_paused = true)]
    async fn poller_synthesizes_transitions_and_time_updates() {
        let player = Arc::new(ScriptedPlayer::new(vec![
            (PlayerState::Playing, 1.0),
            (PlayerState::Playing, 2.0),
            (PlayerState::Paused, 2.0),
            (PlayerState::Playing, 3.0),
            (PlayerState::Ended, 600.0),
        ]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _poller = PlaybackPoller::spawn(player, Duration::from_secs(1), tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                PlaybackEvent::Play,
                PlaybackEvent::TimeUpdate(1.0),
                PlaybackEvent::TimeUpdate(2.0),
                PlaybackEvent::Pause,
                PlaybackEvent::Play,
                PlaybackEvent::TimeUpdate(3.0),
                PlaybackEvent::Ended,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_poller_emits_nothing_further() {
        let player = Arc::new(ScriptedPlayer::new(vec![(PlayerState::Playing, 1.0)]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = PlaybackPoller::spawn(player, Duration::from_secs(1), tx);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        poller.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![PlaybackEvent::Play, PlaybackEvent::TimeUpdate(1.0)]
        );
    }
}

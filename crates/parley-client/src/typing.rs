//! Local typing signal.
//!
//! The first keystroke of a burst emits `typing_start`.  Each keystroke
//! re-arms an idle timer; when it fires, `typing_stop` is emitted.  Sending,
//! clearing the input or switching channel stops the signal immediately.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use parley_net::Transport;
use parley_shared::protocol::ClientEvent;
use parley_shared::types::ChannelId;

#[derive(Default)]
struct TypingState {
    /// Channel the signal is currently raised in.
    channel: Option<ChannelId>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the timer is re-armed or cancelled, so a timer that
    /// already woke up cannot stop a newer burst.
    epoch: u64,
}

#[derive(Clone)]
pub struct TypingNotifier {
    transport: Arc<dyn Transport>,
    idle: Duration,
    state: Arc<Mutex<TypingState>>,
}

impl TypingNotifier {
    pub fn new(transport: Arc<dyn Transport>, idle: Duration) -> Self {
        Self {
            transport,
            idle,
            state: Arc::new(Mutex::new(TypingState::default())),
        }
    }

    /// Record a keystroke in `channel`.
    pub fn keystroke(&self, channel: &ChannelId) {
        let mut state = self.lock();

        if state.channel.as_ref() != Some(channel) {
            if let Some(previous) = state.channel.take() {
                self.transport.emit(ClientEvent::TypingStop(previous));
            }
            debug!(channel = %channel, "Typing started");
            self.transport.emit(ClientEvent::TypingStart(channel.clone()));
            state.channel = Some(channel.clone());
        }

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.epoch += 1;
        let epoch = state.epoch;

        let notifier = self.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(notifier.idle).await;
            notifier.expire(epoch);
        }));
    }

    /// Stop the signal now, if raised.
    pub fn stop(&self) {
        let mut state = self.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.epoch += 1;
        if let Some(channel) = state.channel.take() {
            debug!(channel = %channel, "Typing stopped");
            self.transport.emit(ClientEvent::TypingStop(channel));
        }
    }

    pub fn is_typing(&self) -> bool {
        self.lock().channel.is_some()
    }

    fn expire(&self, epoch: u64) {
        let mut state = self.lock();
        if state.epoch != epoch {
            return;
        }
        state.timer = None;
        if let Some(channel) = state.channel.take() {
            debug!(channel = %channel, "Typing idle");
            self.transport.emit(ClientEvent::TypingStop(channel));
        }
    }

    fn lock(&self) -> MutexGuard<'_, TypingState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TYPING_TICK: Duration = Duration::from_millis(30);

/// How a reveal run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingEnd {
    Completed,
    Cancelled,
}

/// Time-sliced reveal of an already complete reply, one character per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingSimulator {
    tick: Duration,
}

impl Default for TypingSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_TICK)
    }
}

impl TypingSimulator {
    /// A zero tick falls back to [`DEFAULT_TYPING_TICK`].
    pub fn new(tick: Duration) -> Self {
        let tick = if tick.is_zero() {
            DEFAULT_TYPING_TICK
        } else {
            tick
        };
        Self { tick }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Starts an independent reveal of `full_text`.
    ///
    /// `on_chunk` receives the growing prefixes, one more character per tick,
    /// starting one tick after the call. `on_done` runs exactly once after the
    /// last prefix. Missing or empty text completes at once with no chunks.
    /// Once the returned handle is cancelled neither callback runs again.
    ///
    /// Must be called from within a tokio runtime.
    pub fn simulate<C, D>(
        &self,
        full_text: impl Into<Option<String>>,
        mut on_chunk: C,
        on_done: D,
    ) -> TypingHandle
    where
        C: FnMut(&str) + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        let full_text = full_text.into().unwrap_or_default();
        let tick = self.tick;
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            if full_text.is_empty() {
                if task_token.is_cancelled() {
                    return TypingEnd::Cancelled;
                }
                on_done();
                return TypingEnd::Completed;
            }

            let mut interval = time::interval_at(Instant::now() + tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let prefix_ends = full_text
                .char_indices()
                .map(|(start, ch)| start + ch.len_utf8());

            for end in prefix_ends {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => return TypingEnd::Cancelled,
                    _ = interval.tick() => {}
                }

                if task_token.is_cancelled() {
                    return TypingEnd::Cancelled;
                }
                on_chunk(&full_text[..end]);
            }

            if task_token.is_cancelled() {
                return TypingEnd::Cancelled;
            }
            on_done();
            TypingEnd::Completed
        });

        TypingHandle {
            canceller: TypingCanceller(token),
            task,
        }
    }
}

/// Clonable stop switch for one reveal run.
#[derive(Debug, Clone)]
pub struct TypingCanceller(CancellationToken);

impl TypingCanceller {
    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Handle to a running reveal. Dropping it does not stop the run.
#[derive(Debug)]
pub struct TypingHandle {
    canceller: TypingCanceller,
    task: JoinHandle<TypingEnd>,
}

impl TypingHandle {
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn canceller(&self) -> TypingCanceller {
        self.canceller.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> TypingEnd {
        match self.task.await {
            Ok(end) => end,
            Err(error) => {
                tracing::warn!("typing task ended abnormally: {error}");
                TypingEnd::Cancelled
            }
        }
    }
}

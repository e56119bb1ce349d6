//! Playback scheduler: one repeating timer per playback target.
//!
//! A target is one (node path, stream buffer) pair; an announcement for
//! `"sub1:n5"` starts two targets, `"sub1"` and `"sub1:n5"`, sharing one
//! buffer. Each target runs its own ticker thread cycling the buffer at the
//! effective rate and drawing into the node's preview widget.
//!
//! Lifecycle per target id: Starting → Running → Stopped. Stopped is
//! terminal; a fresh `start` builds a new Running instance. At most one live
//! timer exists per id: `start` replaces the map entry, and dropping the old
//! entry's cancel channel is what terminates the old thread, so supersede is
//! atomic under the map lock. A generation counter keeps a stopping timer
//! from removing the entry of a newer timer with the same id.
//!
//! A tick re-resolves its node from scratch every time. The graph mutates
//! under us (deletion, undo, navigation), and the set of stop conditions is
//! exactly: node unresolvable, progress indicator cleared, node's root graph
//! no longer on the canvas.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, select, tick};
use log::{debug, info};

use crate::config::DEFAULT_PREVIEW_RATE;
use crate::core::registry::StreamBuffer;
use crate::entities::graph::Workspace;
use crate::entities::path::StreamPath;
use crate::widgets::preview::InputSink;

/// Result of one animation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Frame drawn, display index advanced.
    Drawn,
    /// Current slot empty (or buffer empty): hold, do not advance.
    Held,
    /// Target is gone; timer must stop.
    Stopped(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    NodeGone,
    ProgressCleared,
    RootChanged,
}

/// One animation step for a target. Free function so tests can drive a
/// target deterministically without a timer thread.
pub(crate) fn run_tick(
    workspace: &Workspace,
    path: &StreamPath,
    buffer: &StreamBuffer,
    input: &Arc<dyn InputSink>,
    display_index: &mut usize,
) -> TickOutcome {
    let node = match workspace.resolve(path) {
        Ok(node) => node,
        Err(_) => return TickOutcome::Stopped(StopReason::NodeGone),
    };
    if node.progress().is_none() {
        return TickOutcome::Stopped(StopReason::ProgressCleared);
    }
    if node.root_uuid() != workspace.current().root_uuid() {
        return TickOutcome::Stopped(StopReason::RootChanged);
    }

    let Some(frame) = buffer.get(*display_index) else {
        return TickOutcome::Held;
    };
    node.draw_preview(&frame, input);
    // get() returned a frame, so the buffer is non-empty here.
    *display_index = (*display_index + 1) % buffer.len();
    TickOutcome::Drawn
}

struct TimerEntry {
    // Dropping the sender disconnects the timer thread's cancel channel,
    // which doubles as the cancellation signal.
    _cancel: Sender<()>,
    generation: u64,
}

/// Timer registry for all live playback targets.
pub struct PlaybackScheduler {
    workspace: Arc<Workspace>,
    input: Arc<dyn InputSink>,
    timers: Arc<Mutex<HashMap<String, TimerEntry>>>,
    next_generation: AtomicU64,
}

impl PlaybackScheduler {
    pub fn new(workspace: Arc<Workspace>, input: Arc<dyn InputSink>) -> Self {
        Self {
            workspace,
            input,
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Start (or restart) playback for one target. Any prior timer for the
    /// same id is cancelled first. Returns false when the target does not
    /// resolve, in which case no new timer is started.
    pub fn start(&self, path: &StreamPath, buffer: Arc<StreamBuffer>, rate: f32) -> bool {
        let key = path.to_string();
        self.stop(&key);

        let node = match self.workspace.resolve(path) {
            Ok(node) => node,
            Err(e) => {
                debug!("Not starting target '{}': {}", key, e);
                return false;
            }
        };

        // The host clears progress when execution completes; seeding it here
        // closes the race where the first tick could land before the first
        // progress report and read "no progress" as completion.
        node.set_progress(0.0);

        let effective = if rate > 0.0 { rate } else { DEFAULT_PREVIEW_RATE };
        let period = Duration::from_secs_f64(1.0 / f64::from(effective));
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = bounded::<()>(0);

        let workspace = Arc::clone(&self.workspace);
        let input = Arc::clone(&self.input);
        let timers = Arc::clone(&self.timers);
        let thread_path = path.clone();
        let thread_key = key.clone();

        // Track before spawning so the timer finds its own entry even if it
        // stops on the very first tick.
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                key.clone(),
                TimerEntry {
                    _cancel: cancel_tx,
                    generation,
                },
            );

        thread::Builder::new()
            .name(format!("glimpse-play-{}", key))
            .spawn(move || {
                let ticker = tick(period);
                let mut display_index = 0usize;
                loop {
                    select! {
                        recv(cancel_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let outcome = run_tick(
                                &workspace,
                                &thread_path,
                                &buffer,
                                &input,
                                &mut display_index,
                            );
                            if let TickOutcome::Stopped(reason) = outcome {
                                debug!("Target '{}' stopped: {:?}", thread_key, reason);
                                let mut timers =
                                    timers.lock().unwrap_or_else(|e| e.into_inner());
                                if timers.get(&thread_key).map(|e| e.generation)
                                    == Some(generation)
                                {
                                    timers.remove(&thread_key);
                                }
                                break;
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn playback timer thread");

        info!("Target '{}' playing at {} fps", key, effective);
        true
    }

    /// Cancel one target's timer. Returns whether one was tracked.
    pub fn stop(&self, id: &str) -> bool {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .is_some()
    }

    /// Cancel every timer.
    pub fn stop_all(&self) {
        let drained: Vec<String> = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            let keys = timers.keys().cloned().collect();
            timers.clear();
            keys
        };
        if !drained.is_empty() {
            info!("Stopped {} playback targets", drained.len());
        }
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.timers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

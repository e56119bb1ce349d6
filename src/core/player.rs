//! Preview player: subsystem facade and stream announcement handling.
//!
//! `PreviewPlayer::attach` wires the whole pipeline onto a host event bus:
//! announcements create a frame buffer and start one playback target per
//! ancestor level of the composite id; binary frame messages are claimed
//! (exclusively, but only while at least one timer runs), header-parsed
//! inline and image-decoded on the pool. Owns the two user settings and the
//! global teardown path.
//!
//! The player is explicit process state: construct it at subsystem start,
//! drop (or `detach`) it at teardown. Nothing here lives in globals.

use std::sync::{Arc, Mutex, Weak};

use indexmap::IndexSet;
use log::{debug, info};
use serde_json::Value;

use crate::config::{PreviewSettings, REQUEST_EXTRA_ENABLED, REQUEST_EXTRA_RATE};
use crate::core::event_bus::{EventBus, Handled, Subscription};
use crate::core::registry::FrameRegistry;
use crate::core::scheduler::PlaybackScheduler;
use crate::core::wire;
use crate::core::workers::DecodePool;
use crate::entities::frame::PreviewFrame;
use crate::entities::graph::Workspace;
use crate::entities::path::StreamPath;
use crate::events::{BusEvent, FRAME_DATA, STREAM_ANNOUNCE, StreamAnnounce};
use crate::widgets::preview::InputSink;

/// Decode threads; previews are small, two keep up with any producer.
const DECODE_THREADS: usize = 2;

/// The preview stream player service.
pub struct PreviewPlayer {
    workspace: Arc<Workspace>,
    bus: EventBus,
    registry: Arc<FrameRegistry>,
    scheduler: Arc<PlaybackScheduler>,
    pool: Arc<DecodePool>,
    settings: Mutex<PreviewSettings>,
    /// Target ids that received a preview widget; drained on disable to
    /// strip surfaces from their nodes.
    tracked: Mutex<IndexSet<String>>,
    subs: Mutex<Vec<Subscription>>,
}

impl PreviewPlayer {
    /// Build the player and subscribe it to `bus`. Handlers hold the player
    /// weakly, so dropping the returned `Arc` deactivates them.
    pub fn attach(
        workspace: Arc<Workspace>,
        bus: &EventBus,
        settings: PreviewSettings,
        input: Arc<dyn InputSink>,
    ) -> Arc<Self> {
        let scheduler = Arc::new(PlaybackScheduler::new(Arc::clone(&workspace), input));
        let player = Arc::new(Self {
            workspace,
            bus: bus.clone(),
            registry: Arc::new(FrameRegistry::new()),
            scheduler,
            pool: Arc::new(DecodePool::new(DECODE_THREADS)),
            settings: Mutex::new(settings.sanitized()),
            tracked: Mutex::new(IndexSet::new()),
            subs: Mutex::new(Vec::new()),
        });

        let announce_sub = {
            let weak = Arc::downgrade(&player);
            bus.subscribe(STREAM_ANNOUNCE, move |ev| {
                if let (Some(player), BusEvent::Announce(announce)) = (weak.upgrade(), ev) {
                    player.handle_announce(announce);
                }
                Handled::Pass
            })
        };
        let frame_sub = {
            let weak: Weak<PreviewPlayer> = Arc::downgrade(&player);
            bus.subscribe(FRAME_DATA, move |ev| match (weak.upgrade(), ev) {
                (Some(player), BusEvent::Binary(payload)) => player.handle_frame_data(payload),
                _ => Handled::Pass,
            })
        };
        *player.subs.lock().unwrap_or_else(|e| e.into_inner()) = vec![announce_sub, frame_sub];

        info!("Preview player attached");
        player
    }

    /// New stream announced: build its buffer and start a playback target
    /// for every scope level that embeds the producer.
    fn handle_announce(&self, announce: &StreamAnnounce) {
        let settings = self.settings();
        if !settings.enabled {
            debug!("Announce for '{}' ignored: previews disabled", announce.id);
            return;
        }
        let Some(path) = StreamPath::parse(&announce.id) else {
            debug!("Announce without stream id ignored");
            return;
        };

        let buffer = self.registry.start_stream(&announce.id, announce.length);
        let rate = if settings.rate_override > 0.0 {
            settings.rate_override
        } else {
            announce.rate
        };
        info!(
            "Stream '{}' announced: {} frames, rate {}",
            announce.id, announce.length, announce.rate
        );

        for prefix in path.prefixes() {
            self.tracked
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(prefix.to_string());
            self.scheduler.start(&prefix, Arc::clone(&buffer), rate);
        }
    }

    /// Binary frame message. Declined while no timer runs so other bus
    /// consumers still see the event; claimed otherwise, and from that point
    /// every failure just drops the message.
    fn handle_frame_data(&self, payload: &Arc<[u8]>) -> Handled {
        if self.scheduler.active_count() == 0 {
            return Handled::Pass;
        }

        match wire::decode_frame_message(payload) {
            Ok(msg) => {
                let id = msg.stream_id.to_string();
                let index = msg.frame_index as usize;
                let payload = Arc::clone(payload);
                let registry = Arc::clone(&self.registry);
                self.pool
                    .execute_with_epoch(self.pool.current_epoch(), move || {
                        match PreviewFrame::decode(&payload[wire::HEADER_LEN..]) {
                            Ok(frame) => registry.put_frame(&id, index, frame),
                            Err(e) => debug!("Frame {} for '{}' dropped: {}", index, id, e),
                        }
                    });
            }
            Err(e) => debug!("Malformed frame message dropped: {}", e),
        }
        Handled::Claim
    }

    // --- settings ---

    pub fn settings(&self) -> PreviewSettings {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Toggle the feature. Turning it off cancels every timer, invalidates
    /// queued decodes and strips the preview widget from every tracked node.
    pub fn set_enabled(&self, enabled: bool) {
        {
            let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
            if settings.enabled == enabled {
                return;
            }
            settings.enabled = enabled;
        }
        if enabled {
            info!("Previews enabled");
            return;
        }

        self.scheduler.stop_all();
        self.pool.bump_epoch();
        let tracked: Vec<String> = self
            .tracked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for id in tracked {
            if let Some(path) = StreamPath::parse(&id)
                && let Ok(node) = self.workspace.resolve(&path)
            {
                node.remove_preview();
            }
        }
        info!("Previews disabled: timers cancelled, surfaces removed");
    }

    pub fn set_rate_override(&self, rate: f32) {
        let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        *settings = PreviewSettings {
            rate_override: rate,
            ..*settings
        }
        .sanitized();
    }

    /// Extension point for the host's "graph → executable request" step:
    /// attaches both settings to the request's metadata map so the producer
    /// knows whether and how fast to stream previews back.
    pub fn annotate_request(&self, extra: &mut serde_json::Map<String, Value>) {
        let settings = self.settings();
        extra.insert(REQUEST_EXTRA_ENABLED.to_string(), Value::Bool(settings.enabled));
        extra.insert(
            REQUEST_EXTRA_RATE.to_string(),
            serde_json::json!(settings.rate_override),
        );
    }

    // --- introspection ---

    pub fn active_targets(&self) -> usize {
        self.scheduler.active_count()
    }

    pub fn is_target_active(&self, id: &str) -> bool {
        self.scheduler.is_active(id)
    }

    pub fn registry(&self) -> Arc<FrameRegistry> {
        Arc::clone(&self.registry)
    }

    /// Unsubscribe from the bus and stop all playback. Idempotent; also run
    /// by `Drop`.
    pub fn detach(&self) {
        let subs: Vec<Subscription> = self
            .subs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for sub in &subs {
            self.bus.unsubscribe(sub);
        }
        self.scheduler.stop_all();
        self.pool.bump_epoch();
        if !subs.is_empty() {
            info!("Preview player detached");
        }
    }
}

impl Drop for PreviewPlayer {
    fn drop(&mut self) {
        self.detach();
    }
}

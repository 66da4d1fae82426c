//! Per-layer frame slots.
//!
//! Each layer has one slot holding the currently published frame behind an
//! `ArcSwapOption`. Readers load it wait-free and keep the `Arc` as long as
//! they draw; publishing swaps the pointer and never touches a frame a
//! reader holds. Superseded frames are freed when the last reader drops
//! them.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use metrics::counter;
use radar_common::LayerId;
use renderer::{FrameId, RenderFrame};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};

/// Where a layer's latest update is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Nothing published yet
    Empty,
    /// An update is fetching or decoding
    Decoding,
    /// A frame was built and is being published
    Built,
    /// The current frame is up to date
    Published,
}

/// Observable state of one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotStatus {
    pub state: SlotState,
    pub current_frame: Option<FrameId>,
    pub valid_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    /// Updates started and not yet finished
    pub in_flight: usize,
    pub published_count: u64,
}

impl Default for SlotStatus {
    fn default() -> Self {
        Self {
            state: SlotState::Empty,
            current_frame: None,
            valid_time: None,
            last_error: None,
            last_error_at: None,
            in_flight: 0,
            published_count: 0,
        }
    }
}

/// Result of a publish attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// The frame is now current, replacing `superseded` if there was one.
    Published { superseded: Option<FrameId> },
    /// The frame was already current.
    Unchanged,
}

struct LayerSlot {
    current: ArcSwapOption<RenderFrame>,
    generation: watch::Sender<u64>,
    status: watch::Sender<SlotStatus>,
}

impl LayerSlot {
    fn new() -> Self {
        let (generation, _) = watch::channel(0);
        let (status, _) = watch::channel(SlotStatus::default());
        Self {
            current: ArcSwapOption::const_empty(),
            generation,
            status,
        }
    }

    /// Finish an update that leaves the current frame in place.
    fn settle(&self) {
        let settled = self.settled_state();
        self.status.send_modify(|status| {
            status.in_flight = status.in_flight.saturating_sub(1);
            if status.in_flight == 0 {
                status.state = settled;
            }
        });
    }

    /// State to fall back to when an update ends without publishing.
    fn settled_state(&self) -> SlotState {
        if self.current.load().is_some() {
            SlotState::Published
        } else {
            SlotState::Empty
        }
    }
}

/// Current frames of a fixed set of layers.
pub struct FrameStore {
    slots: HashMap<LayerId, LayerSlot>,
}

enum Decision {
    Publish(Option<FrameId>),
    Unchanged,
    Stale(DateTime<Utc>),
}

impl FrameStore {
    pub fn new(layers: impl IntoIterator<Item = LayerId>) -> Self {
        let slots = layers
            .into_iter()
            .map(|layer| (layer, LayerSlot::new()))
            .collect();
        Self { slots }
    }

    /// Configured layers, sorted.
    pub fn layers(&self) -> Vec<LayerId> {
        let mut layers: Vec<LayerId> = self.slots.keys().cloned().collect();
        layers.sort_by(|a, b| (&a.site, a.product).cmp(&(&b.site, b.product)));
        layers
    }

    pub fn contains(&self, layer: &LayerId) -> bool {
        self.slots.contains_key(layer)
    }

    fn slot(&self, layer: &LayerId) -> PipelineResult<&LayerSlot> {
        self.slots
            .get(layer)
            .ok_or_else(|| PipelineError::UnknownLayer(layer.clone()))
    }

    /// The published frame of a layer. Never blocks.
    pub fn current_frame(&self, layer: &LayerId) -> Option<Arc<RenderFrame>> {
        self.slots.get(layer)?.current.load_full()
    }

    /// Generation counter bumped on every publish.
    pub fn subscribe(&self, layer: &LayerId) -> Option<watch::Receiver<u64>> {
        Some(self.slots.get(layer)?.generation.subscribe())
    }

    pub fn status(&self, layer: &LayerId) -> Option<SlotStatus> {
        Some(self.slots.get(layer)?.status.borrow().clone())
    }

    pub fn watch_status(&self, layer: &LayerId) -> Option<watch::Receiver<SlotStatus>> {
        Some(self.slots.get(layer)?.status.subscribe())
    }

    /// Record that an update for the layer started.
    pub fn begin_update(&self, layer: &LayerId) -> PipelineResult<()> {
        let slot = self.slot(layer)?;
        slot.status.send_modify(|status| {
            status.in_flight += 1;
            status.state = SlotState::Decoding;
        });
        Ok(())
    }

    /// Record that a frame was built and is about to be published.
    pub fn mark_built(&self, layer: &LayerId) -> PipelineResult<()> {
        self.slot(layer)?
            .status
            .send_modify(|status| status.state = SlotState::Built);
        Ok(())
    }

    /// Record a failed update. The published frame stays current.
    pub fn record_failure(&self, layer: &LayerId, error: &PipelineError) -> PipelineResult<()> {
        let slot = self.slot(layer)?;
        let settled = slot.settled_state();
        slot.status.send_modify(|status| {
            status.in_flight = status.in_flight.saturating_sub(1);
            if status.in_flight == 0 {
                status.state = settled;
            }
            status.last_error = Some(error.to_string());
            status.last_error_at = Some(Utc::now());
        });
        Ok(())
    }

    /// Make a frame the layer's current frame.
    ///
    /// Publishing the current frame again changes nothing. A frame whose
    /// valid time is not after the current frame's is rejected as stale.
    pub fn publish(
        &self,
        layer: &LayerId,
        frame: Arc<RenderFrame>,
    ) -> PipelineResult<PublishOutcome> {
        let slot = self.slot(layer)?;

        let mut decision = Decision::Unchanged;
        slot.current.rcu(|current| match current {
            Some(cur) if cur.id == frame.id => {
                decision = Decision::Unchanged;
                Some(Arc::clone(cur))
            }
            Some(cur) if !frame.is_newer_than(cur) => {
                decision = Decision::Stale(cur.valid_time);
                Some(Arc::clone(cur))
            }
            _ => {
                decision = Decision::Publish(current.as_ref().map(|c| c.id));
                Some(Arc::clone(&frame))
            }
        });

        match decision {
            Decision::Publish(superseded) => {
                slot.generation.send_modify(|g| *g += 1);
                slot.status.send_modify(|status| {
                    status.in_flight = status.in_flight.saturating_sub(1);
                    status.state = SlotState::Published;
                    status.current_frame = Some(frame.id);
                    status.valid_time = Some(frame.valid_time);
                    status.last_error = None;
                    status.published_count += 1;
                });
                counter!("radar_frames_published_total").increment(1);
                info!(
                    layer = %layer,
                    frame = %frame.id,
                    valid_time = %frame.valid_time,
                    kind = ?frame.kind(),
                    superseded = ?superseded,
                    "Published frame"
                );
                Ok(PublishOutcome::Published { superseded })
            }
            Decision::Unchanged => {
                slot.settle();
                debug!(layer = %layer, frame = %frame.id, "Frame already current");
                Ok(PublishOutcome::Unchanged)
            }
            Decision::Stale(current) => Err(self.reject_stale(layer, frame.valid_time, current)),
        }
    }

    /// Finish an update whose product is not newer than the current frame
    /// and return the matching [`PipelineError::Stale`].
    pub fn reject_stale(
        &self,
        layer: &LayerId,
        candidate: DateTime<Utc>,
        current: DateTime<Utc>,
    ) -> PipelineError {
        let slot = match self.slot(layer) {
            Ok(slot) => slot,
            Err(e) => return e,
        };
        slot.settle();
        counter!("radar_frames_stale_total").increment(1);
        debug!(
            layer = %layer,
            candidate = %candidate,
            current = %current,
            "Product is not newer than current frame"
        );
        PipelineError::Stale {
            layer: layer.clone(),
            candidate,
            current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use level3_parser::decode;
    use projection::Georeferencer;
    use radar_common::SiteInfo;
    use renderer::{build_frame, BuildOptions, PaletteRegistry};
    use test_utils::level3::Level3Builder;
    use test_utils::times;

    fn frame_at(time: (u16, u32)) -> Arc<RenderFrame> {
        let bytes = Level3Builder::new_digital()
            .with_volume_time(time)
            .with_uniform_levels(&[100; 10])
            .build();
        let product = decode(&bytes).unwrap();
        let georef =
            Georeferencer::new(&SiteInfo::new("KTLX", 35.3331, -97.2778, 370.0)).unwrap();
        let registry = PaletteRegistry::builtin().unwrap();
        Arc::new(build_frame(product, &georef, &registry, &BuildOptions::default()).unwrap())
    }

    fn layer() -> LayerId {
        LayerId::new("KTLX", 94)
    }

    #[test]
    fn test_empty_store() {
        let store = FrameStore::new([layer()]);
        assert!(store.current_frame(&layer()).is_none());
        assert_eq!(store.status(&layer()).unwrap().state, SlotState::Empty);
        assert_eq!(*store.subscribe(&layer()).unwrap().borrow(), 0);
        assert!(store.current_frame(&LayerId::new("KAMX", 94)).is_none());
        assert!(matches!(
            store.begin_update(&LayerId::new("KAMX", 94)),
            Err(PipelineError::UnknownLayer(_))
        ));
    }

    #[test]
    fn test_publish_twice_is_idempotent() {
        let store = FrameStore::new([layer()]);
        let frame = frame_at(times::T1);

        let outcome = store.publish(&layer(), Arc::clone(&frame)).unwrap();
        assert_eq!(outcome, PublishOutcome::Published { superseded: None });
        let outcome = store.publish(&layer(), Arc::clone(&frame)).unwrap();
        assert_eq!(outcome, PublishOutcome::Unchanged);

        let current = store.current_frame(&layer()).unwrap();
        assert!(Arc::ptr_eq(&current, &frame));
        assert_eq!(*store.subscribe(&layer()).unwrap().borrow(), 1);
        assert_eq!(store.status(&layer()).unwrap().published_count, 1);
    }

    #[test]
    fn test_out_of_order_keeps_newest() {
        let store = FrameStore::new([layer()]);
        let t1 = frame_at(times::T1);
        let t2 = frame_at(times::T2);

        store.publish(&layer(), Arc::clone(&t2)).unwrap();
        let err = store.publish(&layer(), Arc::clone(&t1)).unwrap_err();
        assert!(matches!(err, PipelineError::Stale { .. }));
        assert_eq!(err.kind(), "stale");

        let current = store.current_frame(&layer()).unwrap();
        assert_eq!(current.id, t2.id);
        assert_eq!(
            current.valid_time,
            Utc.with_ymd_and_hms(2024, 5, 6, 22, 6, 0).unwrap()
        );
        let status = store.status(&layer()).unwrap();
        assert_eq!(status.state, SlotState::Published);
        assert_eq!(status.current_frame, Some(t2.id));
    }

    #[test]
    fn test_reader_keeps_superseded_frame() {
        let store = FrameStore::new([layer()]);
        let t1 = frame_at(times::T1);
        store.publish(&layer(), Arc::clone(&t1)).unwrap();

        let held = store.current_frame(&layer()).unwrap();
        let outcome = store.publish(&layer(), frame_at(times::T2)).unwrap();
        assert_eq!(
            outcome,
            PublishOutcome::Published {
                superseded: Some(t1.id)
            }
        );
        assert_eq!(held.id, t1.id);
        assert_ne!(store.current_frame(&layer()).unwrap().id, t1.id);
    }

    #[test]
    fn test_failure_keeps_prior_frame() {
        let store = FrameStore::new([layer()]);
        let t1 = frame_at(times::T1);
        store.publish(&layer(), Arc::clone(&t1)).unwrap();

        store.begin_update(&layer()).unwrap();
        assert_eq!(store.status(&layer()).unwrap().state, SlotState::Decoding);
        store
            .record_failure(&layer(), &PipelineError::WorkerGone)
            .unwrap();

        let status = store.status(&layer()).unwrap();
        assert_eq!(status.state, SlotState::Published);
        assert_eq!(status.in_flight, 0);
        assert!(status.last_error.unwrap().contains("worker"));
        assert_eq!(store.current_frame(&layer()).unwrap().id, t1.id);
    }

    #[test]
    fn test_reject_stale_settles_update() {
        let store = FrameStore::new([layer()]);
        let t2 = frame_at(times::T2);
        store.publish(&layer(), Arc::clone(&t2)).unwrap();

        store.begin_update(&layer()).unwrap();
        let candidate = Utc.with_ymd_and_hms(2024, 5, 6, 22, 1, 0).unwrap();
        let err = store.reject_stale(&layer(), candidate, t2.valid_time);
        assert!(matches!(err, PipelineError::Stale { .. }));

        let status = store.status(&layer()).unwrap();
        assert_eq!(status.state, SlotState::Published);
        assert_eq!(status.in_flight, 0);
        assert!(status.last_error.is_none());
        assert_eq!(status.published_count, 1);

        let unknown = store.reject_stale(&LayerId::new("KAMX", 94), candidate, candidate);
        assert!(matches!(unknown, PipelineError::UnknownLayer(_)));
    }
}

//! Scroll-position preservation for a transcript that grows at either end.
//!
//! Work is split in two phases: [`ScrollController::commit`] runs right after the
//! message list changed, [`ScrollController::reconcile`] runs once the view has laid
//! out the new content and can report its geometry.

/// Distance from the bottom edge that still counts as "at the bottom".
pub const NEAR_BOTTOM_THRESHOLD: f32 = 150.0;

/// Live geometry of the scroll container, read after layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollGeometry {
    pub scroll_top: f32,
    pub scroll_height: f32,
    pub client_height: f32,
}

/// Decision produced by [`ScrollController::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollAdjustment {
    /// Jump to the bottom: `scroll_top = scroll_height`.
    AnchorBottom { scroll_top: f32 },
    /// Keep the same content visible by shifting by the height delta.
    PreservePosition { scroll_top: f32 },
    /// Leave the container alone.
    Unchanged,
}

impl ScrollAdjustment {
    /// New `scroll_top`, when one should be applied.
    pub fn scroll_top(self) -> Option<f32> {
        match self {
            Self::AnchorBottom { scroll_top } | Self::PreservePosition { scroll_top } => {
                Some(scroll_top)
            }
            Self::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingScroll {
    AnchorBottom,
    Growth,
}

/// Tracks message count and baseline height between renders.
#[derive(Debug, Clone, Default)]
pub struct ScrollController {
    tracked_len: usize,
    baseline_height: f32,
    pending: Option<PendingScroll>,
}

impl ScrollController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget tracking state after the conversation (or acting user) changed and
    /// request a jump to the bottom on the next reconcile.
    pub fn reset(&mut self) {
        self.tracked_len = 0;
        self.baseline_height = 0.0;
        self.pending = Some(PendingScroll::AnchorBottom);
    }

    pub fn tracked_len(&self) -> usize {
        self.tracked_len
    }

    pub fn baseline_height(&self) -> f32 {
        self.baseline_height
    }

    /// Data-commit phase. Returns `true` when a reconcile is pending.
    pub fn commit(&mut self, message_count: usize) -> bool {
        if message_count == 0 {
            return self.pending.is_some();
        }

        if self.tracked_len == 0 {
            self.pending = Some(PendingScroll::AnchorBottom);
        } else if message_count > self.tracked_len && self.pending.is_none() {
            self.pending = Some(PendingScroll::Growth);
        }
        self.tracked_len = message_count;
        self.pending.is_some()
    }

    /// View-reconciliation phase, fed with post-layout geometry.
    pub fn reconcile(&mut self, geometry: ScrollGeometry) -> ScrollAdjustment {
        let Some(pending) = self.pending.take() else {
            return ScrollAdjustment::Unchanged;
        };

        let previous_height = self.baseline_height;
        self.baseline_height = geometry.scroll_height;

        match pending {
            PendingScroll::AnchorBottom => ScrollAdjustment::AnchorBottom {
                scroll_top: geometry.scroll_height,
            },
            PendingScroll::Growth => {
                let height_delta = geometry.scroll_height - previous_height;
                let was_near_bottom = geometry.scroll_top + geometry.client_height
                    >= previous_height - NEAR_BOTTOM_THRESHOLD;

                if was_near_bottom {
                    ScrollAdjustment::AnchorBottom {
                        scroll_top: geometry.scroll_height,
                    }
                } else if height_delta > 0.0 {
                    ScrollAdjustment::PreservePosition {
                        scroll_top: geometry.scroll_top + height_delta,
                    }
                } else {
                    ScrollAdjustment::Unchanged
                }
            }
        }
    }
}

//! Overlay-state snapshot consumed by the (out-of-scope) display renderer.
//!
//! Four independent countdown timers, decremented once per block; priority
//! order sampler > skipback > set-page > shift-knob.

#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayState {
 pub sampler_timeout: u32,
 pub skipback_timeout: u32,
 pub set_page_timeout: u32,
 pub shift_knob_timeout: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
 Sampler,
 Skipback,
 SetPage,
 ShiftKnob,
}

impl OverlayState {
 pub fn tick_block(&mut self) {
 self.sampler_timeout = self.sampler_timeout.saturating_sub(1);
 self.skipback_timeout = self.skipback_timeout.saturating_sub(1);
 self.set_page_timeout = self.set_page_timeout.saturating_sub(1);
 self.shift_knob_timeout = self.shift_knob_timeout.saturating_sub(1);
 }

 pub fn trigger(&mut self, kind: OverlayKind, blocks: u32) {
 match kind {
 OverlayKind::Sampler => self.sampler_timeout = blocks,
 OverlayKind::Skipback => self.skipback_timeout = blocks,
 OverlayKind::SetPage => self.set_page_timeout = blocks,
 OverlayKind::ShiftKnob => self.shift_knob_timeout = blocks,
 }
 }

 /// The overlay that should currently be visible, per the fixed
 /// priority order, or `None` if nothing is active.
 pub fn active(&self) -> Option<OverlayKind> {
 if self.sampler_timeout > 0 {
 Some(OverlayKind::Sampler)
 } else if self.skipback_timeout > 0 {
 Some(OverlayKind::Skipback)
 } else if self.set_page_timeout > 0 {
 Some(OverlayKind::SetPage)
 } else if self.shift_knob_timeout > 0 {
 Some(OverlayKind::ShiftKnob)
 } else {
 None
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn priority_order_favors_sampler_over_all() {
 let mut state = OverlayState::default();
 state.trigger(OverlayKind::ShiftKnob, 10);
 state.trigger(OverlayKind::SetPage, 10);
 state.trigger(OverlayKind::Skipback, 10);
 state.trigger(OverlayKind::Sampler, 10);
 assert_eq!(state.active(), Some(OverlayKind::Sampler));
 }

 #[test]
 fn timeout_decrements_and_expires() {
 let mut state = OverlayState::default();
 state.trigger(OverlayKind::Skipback, 2);
 assert_eq!(state.active(), Some(OverlayKind::Skipback));
 state.tick_block();
 assert_eq!(state.active(), Some(OverlayKind::Skipback));
 state.tick_block();
 assert_eq!(state.active(), None);
 }
}

//! The top-level per-block scheduler: MIDI routing, four parallel slot
//! renders, volume/mute/solo mixdown, master FX, and the sampler/skipback
//! taps. Grounded on `tutti-engine`'s block-processing loop,
//! generalized from a single voice graph to four independent chains plus
//! a shared master bus.

use crate::chain::{ChainSlot, NUM_SLOTS};
use crate::master::MasterChain;
use crate::overlay::OverlayState;
use std::path::PathBuf;

/// A consumer of the post-master mixed bus; implemented by the sampler and
/// skipback recorder in their own crates so this crate need not depend on
/// them.
pub trait AudioSink {
 fn push_block(&mut self, interleaved: &[i16], frames: u32);
}

/// An `AudioSink` that discards everything; used where no sampler or
/// skipback tap is wired up (e.g. unit tests).
pub struct NullSink;

impl AudioSink for NullSink {
 fn push_block(&mut self, _interleaved: &[i16], _frames: u32) {}
}

pub struct BlockScheduler {
 pub slots: [ChainSlot; NUM_SLOTS],
 pub master: MasterChain,
 pub overlay: OverlayState,
 mix_buf: Vec<i16>,
}

impl BlockScheduler {
 pub fn new(frames_per_block: u32, module_dirs: [PathBuf; NUM_SLOTS]) -> Self {
 let [d0, d1, d2, d3] = module_dirs;
 Self {
 slots: [
 ChainSlot::new(d0, frames_per_block),
 ChainSlot::new(d1, frames_per_block),
 ChainSlot::new(d2, frames_per_block),
 ChainSlot::new(d3, frames_per_block),
 ],
 master: MasterChain::new(),
 overlay: OverlayState::default(),
 mix_buf: vec![0i16; frames_per_block as usize * 2],
 }
 }

 /// Routes one hardware MIDI message to every slot whose receive
 /// channel accepts it. Each slot applies its own
 /// source/note-range filtering inside `handle_midi_in`.
 pub fn route_midi(&mut self, msg: [u8; 3], channel: u8, source: i32) {
 for slot in self.slots.iter_mut() {
 if slot.accepts_channel(channel) {
 slot.chain.handle_midi_in(msg, source);
 }
 }
 }

 /// Phase 1: renders every slot into its own scratch buffer.
 pub fn render_slots(&mut self, frames: u32, sample_rate: f64, source: i32) {
 for slot in self.slots.iter_mut() {
 slot.chain.render_block(frames, sample_rate, source);
 }
 }

 /// Phase 2:
 /// call after the host has injected audio into those slots via
 /// `SignalChainInstance::set_injection`.
 pub fn finish_external_fx(&mut self, frames: u32) {
 for slot in self.slots.iter_mut() {
 if slot.chain.external_fx_mode {
 slot.chain.process_fx(frames);
 }
 }
 }

 /// Phase 3: sum all slot outputs respecting volume/mute/solo, run the
 /// master-FX chain, and push the result to the sampler and skipback
 /// taps. Returns the mixed output, ready to be
 /// written to the mailbox.
 pub fn mix_and_master(
 &mut self,
 frames: u32,
 sampler: &mut dyn AudioSink,
 skipback: &mut dyn AudioSink,
 sampler_recording: bool,
 skipback_saving: bool,
 ) -> &[i16] {
 self.overlay.tick_block();
 self.mix_buf.fill(0);

 let any_solo = self.slots.iter().any(|s| s.solo);
 for slot in self.slots.iter_mut() {
 if !slot.audible(any_solo) {
 continue;
 }
 let volume = slot.volume;
 let out = slot.chain.output();
 let n = self.mix_buf.len().min(out.len());
 for i in 0..n {
 let contribution = (out[i] as f32 * volume) as i32;
 self.mix_buf[i] =
 (self.mix_buf[i] as i32 + contribution).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
 }
 }

 self.master.process_block(&mut self.mix_buf, frames);

 if sampler_recording {
 sampler.push_block(&self.mix_buf, frames);
 }
 if !skipback_saving {
 skipback.push_block(&self.mix_buf, frames);
 }

 &self.mix_buf
 }

 /// Convenience wrapper for the common case where no slot is in
 /// external-FX mode and no cross-slot injection is needed this block.
 pub fn render_block(
 &mut self,
 frames: u32,
 sample_rate: f64,
 source: i32,
 sampler: &mut dyn AudioSink,
 skipback: &mut dyn AudioSink,
 sampler_recording: bool,
 skipback_saving: bool,
 ) -> &[i16] {
 self.render_slots(frames, sample_rate, source);
 self.finish_external_fx(frames);
 self.mix_and_master(frames, sampler, skipback, sampler_recording, skipback_saving)
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 fn scheduler() -> BlockScheduler {
 BlockScheduler::new(
 4,
 [
 PathBuf::from("/tmp/a"),
 PathBuf::from("/tmp/b"),
 PathBuf::from("/tmp/c"),
 PathBuf::from("/tmp/d"),
 ],
 )
 }

 #[test]
 fn silent_chains_mix_to_silence() {
 let mut sched = scheduler();
 let mut sampler = NullSink;
 let mut skipback = NullSink;
 let out = sched.render_block(4, 44100.0, 0, &mut sampler, &mut skipback, false, false);
 assert!(out.iter().all(|&s| s == 0));
 }

 #[test]
 fn solo_excludes_non_soloed_slots() {
 let mut sched = scheduler();
 sched.slots[1].solo = true;
 sched.slots[0].chain.set_injection(vec![1000, 1000, 1000, 1000, 1000, 1000, 1000, 1000]);
 let mut sampler = NullSink;
 let mut skipback = NullSink;
 let any_solo = sched.slots.iter().any(|s| s.solo);
 assert!(!sched.slots[0].audible(any_solo));
 assert!(sched.slots[1].audible(any_solo));
 let _ = sched.render_block(4, 44100.0, 0, &mut sampler, &mut skipback, false, false);
 }

 #[test]
 fn skipback_is_skipped_while_saving() {
 struct CountingSink(u32);
 impl AudioSink for CountingSink {
 fn push_block(&mut self, _interleaved: &[i16], _frames: u32) {
 self.0 += 1;
 }
 }
 let mut sched = scheduler();
 let mut sampler = CountingSink(0);
 let mut skipback = CountingSink(0);
 let _ = sched.render_block(4, 44100.0, 0, &mut sampler, &mut skipback, true, true);
 assert_eq!(sampler.0, 1);
 assert_eq!(skipback.0, 0);
 }
}

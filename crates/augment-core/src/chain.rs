//! Per-slot signal chain: MIDI routing through an optional MIDI source and
//! up to two MIDI-FX stages, synth render, injection, and up to three
//! audio-FX stages, as a fixed six-stage block pipeline.

use crate::capture::{CaptureRules, NoteGroup};
use crate::error::{Error, Result};
use augment_plugin::{LoadedAudioFx, LoadedGenerator, LoadedMidiFx, MAX_MIDI_FANOUT};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::path::PathBuf;

use augment_param::SmoothingState;

/// Post-switch declick window, in blocks (≈23 ms at 128 frames / 44.1 kHz).
pub const MUTE_WINDOW_BLOCKS: u32 = 8;
pub const MAX_AUDIO_FX: usize = 3;
pub const MAX_MIDI_FX: usize = 2;
pub const NUM_SLOTS: usize = 4;

type MidiMsg = [u8; 3];
type MidiBurst = SmallVec<[MidiMsg; MAX_MIDI_FANOUT]>;

/// Which hardware source a slot accepts MIDI from (patch `input` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFilter {
 Pads,
 External,
 Both,
}

impl Default for InputFilter {
 fn default() -> Self {
 InputFilter::Both
 }
}

impl InputFilter {
 /// Parses the patch `input` field; unrecognized values default to
 /// `Both` per ("`input` defaults to \"both\"").
 pub fn parse(value: &str) -> Self {
 match value {
 "pads" => InputFilter::Pads,
 "external" => InputFilter::External,
 _ => InputFilter::Both,
 }
 }
}

/// Logical MIDI source tag, carried alongside every message so plugins can
/// distinguish pad-originated from externally-originated events.
pub const SOURCE_PADS: i32 = 0;
pub const SOURCE_EXTERNAL: i32 = 1;
/// Host-generated events (panic, CC1 reset on patch load) that don't
/// originate from either input path.
pub const SOURCE_HOST: i32 = 2;

fn note_number(msg: &MidiMsg) -> Option<u8> {
 match msg[0] & 0xF0 {
 0x80 | 0x90 => Some(msg[1]),
 _ => None,
 }
}

/// Feeds `input` through every stage in order, stage k's outputs becoming
/// stage k+1's inputs, capping fan-out at `MAX_MIDI_FANOUT` at every
/// boundary.
fn run_midi_fx_chain(stages: &mut [LoadedMidiFx], seed: MidiBurst) -> MidiBurst {
 let mut current = seed;
 for stage in stages.iter_mut() {
 let mut next = MidiBurst::new();
 for msg in current.iter() {
 for out in stage.process_midi(&msg[..]) {
 if next.len() < MAX_MIDI_FANOUT {
 next.push(out);
 }
 }
 }
 current = next;
 }
 current
}

/// One of the four per-slot signal chains.
pub struct SignalChainInstance {
 pub module_dir: PathBuf,
 pub generator: Option<LoadedGenerator>,
 /// A MIDI-source module (e.g. a pad sequencer) implements the same
 /// MIDI-FX v1 ABI: `process_midi` transforms hardware events before the
 /// MIDI-FX array sees them, `tick` generates events of its own. The
 /// plugin ABIs in name three kinds; "MIDI source" in the data
 /// model is not a fourth ABI, just a distinguished slot in this chain.
 pub midi_source: Option<LoadedMidiFx>,
 pub midi_fx: Vec<LoadedMidiFx>,
 pub audio_fx: Vec<LoadedAudioFx>,
 pub mute_countdown: u32,
 injected_audio: Option<Vec<i16>>,
 pub external_fx_mode: bool,
 pub input_filter: InputFilter,
 pub pad_ui_active: bool,
 /// Per-instance smoothing, keyed by routing target label ("synth",
 /// "fx1", "fx2", "fx3", "midi_fx1", "midi_fx2").
 pub smoothing: HashMap<String, SmoothingState>,
 pub knob_mappings: Vec<augment_param::KnobMapping>,
 pub patch_index: i32,
 pub default_forward_channel: Option<u8>,
 /// Set, keyed by the same routing target label as `smoothing`, when a
 /// `"*:module"` hot-swap's load call fails; cleared on the next
 /// successful load for that same target. Surfaced read-only through
 /// the parameter bus as `get_param("synth_error", ...)` and friends
 /// rather than propagated as a hard error.
 pub load_error: HashMap<String, String>,
 scratch: Vec<i16>,
}

impl SignalChainInstance {
 pub fn new(module_dir: PathBuf, frames_per_block: u32) -> Self {
 Self {
 module_dir,
 generator: None,
 midi_source: None,
 midi_fx: Vec::with_capacity(MAX_MIDI_FX),
 audio_fx: Vec::with_capacity(MAX_AUDIO_FX),
 mute_countdown: 0,
 injected_audio: None,
 external_fx_mode: false,
 input_filter: InputFilter::Both,
 pad_ui_active: false,
 smoothing: HashMap::new(),
 knob_mappings: Vec::new(),
 patch_index: -1,
 default_forward_channel: None,
 load_error: HashMap::new(),
 scratch: vec![0i16; frames_per_block as usize * 2],
 }
 }

 pub fn push_midi_fx(&mut self, fx: LoadedMidiFx) -> Result<()> {
 if self.midi_fx.len() >= MAX_MIDI_FX {
 return Err(Error::InvalidConfig("midi_fx chain already has two stages".into()));
 }
 self.midi_fx.push(fx);
 Ok(())
 }

 pub fn push_audio_fx(&mut self, fx: LoadedAudioFx) -> Result<()> {
 if self.audio_fx.len() >= MAX_AUDIO_FX {
 return Err(Error::InvalidConfig("audio_fx chain already has three stages".into()));
 }
 self.audio_fx.push(fx);
 Ok(())
 }

 pub fn trigger_mute(&mut self) {
 self.mute_countdown = MUTE_WINDOW_BLOCKS;
 }

 /// Sets the pending injection buffer; consumed and cleared on the next
 /// `process_fx` call.
 pub fn set_injection(&mut self, audio: Vec<i16>) {
 self.injected_audio = Some(audio);
 }

 fn source_allowed(&self, source: i32) -> bool {
 match self.input_filter {
 InputFilter::Both => true,
 InputFilter::Pads => source == SOURCE_PADS,
 InputFilter::External => source == SOURCE_EXTERNAL,
 }
 }

 fn blocked_by_note_range(&self, msg: &MidiMsg) -> bool {
 let Some(note) = note_number(msg) else {
 return false;
 };
 let (steps_lo, steps_hi) = NoteGroup::Steps.range();
 if (steps_lo..=steps_hi).contains(&note) {
 return true;
 }
 if self.pad_ui_active {
 let (pads_lo, pads_hi) = NoteGroup::Pads.range();
 if (pads_lo..=pads_hi).contains(&note) {
 return true;
 }
 }
 false
 }

 /// Routes one incoming hardware MIDI message through the filters, the
 /// MIDI source, and the MIDI-FX chain, then delivers the result to the
 /// synth and every audio-FX stage with a MIDI handler.
 /// Returns `true` if the message was delivered past the filters.
 pub fn handle_midi_in(&mut self, msg: MidiMsg, source: i32) -> bool {
 if !self.source_allowed(source) || self.blocked_by_note_range(&msg) {
 return false;
 }

 let seed: MidiBurst = match &mut self.midi_source {
 Some(src) => src.process_midi(&msg[..]).into_iter().collect(),
 None => {
 let mut v = MidiBurst::new();
 v.push(msg);
 v
 }
 };

 let outgoing = run_midi_fx_chain(&mut self.midi_fx, seed);
 for out in &outgoing {
 if let Some(gen) = &mut self.generator {
 gen.on_midi(&out[..], source);
 }
 for fx in &mut self.audio_fx {
 if fx.has_midi_handler() {
 fx.on_midi(&out[..], source);
 }
 }
 }
 true
 }

 /// Harvests per-block generated messages from the MIDI source and
 /// every MIDI-FX stage and delivers them straight to the synth,
 /// unprocessed by later stages.
 fn tick_midi_fx(&mut self, frames: u32, sample_rate: f64, source: i32) {
 let mut harvested = MidiBurst::new();
 if let Some(src) = &mut self.midi_source {
 harvested.extend(src.tick(frames, sample_rate));
 }
 for stage in self.midi_fx.iter_mut() {
 harvested.extend(stage.tick(frames, sample_rate));
 }
 if let Some(gen) = &mut self.generator {
 for msg in &harvested {
 gen.on_midi(&msg[..], source);
 }
 }
 }

 /// Advances every tracked smoothing target by one block and pushes the
 /// interpolated value back through the owning plugin's `set_param`
 /// (spec §4.4: smoothing is a per-block one-pole applied to the value
 /// driven into the plugin, not to what a reader observes).
 fn tick_smoothing(&mut self) {
 for (target, state) in self.smoothing.iter_mut() {
 let updates = state.tick_block();
 if updates.is_empty() {
 continue;
 }
 match target.as_str() {
 "synth" => {
 if let Some(gen) = &mut self.generator {
 for (key, value) in &updates {
 gen.set_param(key, &format!("{value}"));
 }
 }
 }
 "fx1" | "fx2" | "fx3" => {
 let idx: usize = target[2..].parse().unwrap_or(1);
 if let Some(fx) = self.audio_fx.get_mut(idx.saturating_sub(1)) {
 for (key, value) in &updates {
 fx.set_param(key, &format!("{value}"));
 }
 }
 }
 "midi_fx1" | "midi_fx2" => {
 let idx: usize = target[7..].parse().unwrap_or(1);
 if let Some(fx) = self.midi_fx.get_mut(idx.saturating_sub(1)) {
 for (key, value) in &updates {
 fx.set_param(key, &format!("{value}"));
 }
 }
 }
 _ => {}
 }
 }
 }

 /// Runs one block: smoothing tick, MIDI-FX tick, synth render, and —
 /// unless the slot is in external-FX mode — injection, audio-FX chain,
 /// and mute. In external-FX mode the caller must follow up with
 /// `process_fx` later in the same block, after injecting more audio.
 pub fn render_block(&mut self, frames: u32, sample_rate: f64, source: i32) -> &mut [i16] {
 self.tick_smoothing();
 self.tick_midi_fx(frames, sample_rate, source);

 if let Some(gen) = &mut self.generator {
 gen.render_block(&mut self.scratch, frames);
 } else {
 self.scratch.fill(0);
 }

 if self.external_fx_mode {
 return &mut self.scratch;
 }

 self.process_fx(frames);
 &mut self.scratch
 }

 /// Injection, audio-FX chain, and mute countdown.
 /// Public so the scheduler can call it as a second pass for slots in
 /// external-FX mode.
 pub fn process_fx(&mut self, frames: u32) {
 if let Some(injected) = self.injected_audio.take() {
 let n = injected.len().min(self.scratch.len());
 for i in 0..n {
 self.scratch[i] = (self.scratch[i] as i32 + injected[i] as i32)
.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
 }
 }

 for fx in self.audio_fx.iter_mut() {
 fx.process_block(&mut self.scratch, frames);
 }

 if self.mute_countdown > 0 {
 self.scratch.fill(0);
 self.mute_countdown -= 1;
 }
 }

 pub fn output(&self) -> &[i16] {
 &self.scratch
 }
}

/// One of the four global per-slot wrappers.
pub struct ChainSlot {
 pub chain: SignalChainInstance,
 pub active: bool,
 /// -1 means all channels, else 0..15.
 pub receive_channel: i8,
 /// -2 passthrough, -1 auto, 0..15 specific.
 pub forward_channel: i8,
 pub volume: f32,
 pub mute: bool,
 pub solo: bool,
 pub patch_name: Option<String>,
 pub capture_rules: CaptureRules,
}

impl ChainSlot {
 pub fn new(module_dir: PathBuf, frames_per_block: u32) -> Self {
 Self {
 chain: SignalChainInstance::new(module_dir, frames_per_block),
 active: true,
 receive_channel: -1,
 forward_channel: -1,
 volume: 1.0,
 mute: false,
 solo: false,
 patch_name: None,
 capture_rules: CaptureRules::empty(),
 }
 }

 /// Whether this slot's mixed output should be audible this block, given
 /// whether any slot is soloed.
 pub fn audible(&self, any_solo_active: bool) -> bool {
 if self.mute || !self.active {
 return false;
 }
 if any_solo_active {
 return self.solo;
 }
 true
 }

 /// Whether a channel number (0..15) matches this slot's receive filter.
 pub fn accepts_channel(&self, channel: u8) -> bool {
 self.receive_channel < 0 || self.receive_channel as u8 == channel
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn input_filter_parses_with_both_as_default() {
 assert_eq!(InputFilter::parse("pads"), InputFilter::Pads);
 assert_eq!(InputFilter::parse("external"), InputFilter::External);
 assert_eq!(InputFilter::parse("both"), InputFilter::Both);
 assert_eq!(InputFilter::parse("garbage"), InputFilter::Both);
 }

 #[test]
 fn step_button_range_is_always_blocked() {
 let chain = SignalChainInstance::new(PathBuf::from("/tmp"), 128);
 assert!(chain.blocked_by_note_range(&[0x90, 16, 100]));
 assert!(chain.blocked_by_note_range(&[0x90, 31, 100]));
 assert!(!chain.blocked_by_note_range(&[0x90, 32, 100]));
 }

 #[test]
 fn pad_range_blocked_only_when_pad_ui_active() {
 let mut chain = SignalChainInstance::new(PathBuf::from("/tmp"), 128);
 assert!(!chain.blocked_by_note_range(&[0x90, 40, 100]));
 chain.pad_ui_active = true;
 assert!(chain.blocked_by_note_range(&[0x90, 40, 100]));
 }

 #[test]
 fn control_change_is_never_blocked_by_note_range() {
 let chain = SignalChainInstance::new(PathBuf::from("/tmp"), 128);
 assert!(!chain.blocked_by_note_range(&[0xB0, 20, 64]));
 }

 #[test]
 fn no_generator_renders_silence() {
 let mut chain = SignalChainInstance::new(PathBuf::from("/tmp"), 4);
 let out = chain.render_block(4, 44100.0, SOURCE_PADS);
 assert!(out.iter().all(|&s| s == 0));
 }

 #[test]
 fn mute_window_silences_output_and_counts_down() {
 let mut chain = SignalChainInstance::new(PathBuf::from("/tmp"), 4);
 chain.scratch.iter_mut().for_each(|s| *s = 123);
 chain.trigger_mute();
 chain.process_fx(4);
 assert!(chain.output().iter().all(|&s| s == 0));
 assert_eq!(chain.mute_countdown, MUTE_WINDOW_BLOCKS - 1);
 }

 #[test]
 fn injection_mixes_and_is_consumed_once() {
 let mut chain = SignalChainInstance::new(PathBuf::from("/tmp"), 2);
 chain.set_injection(vec![100, 200, -100, -200]);
 chain.process_fx(2);
 assert_eq!(chain.output(), &[100, 200, -100, -200]);
 chain.process_fx(2);
 assert_eq!(chain.output(), &[100, 200, -100, -200]);
 }

 #[test]
 fn injection_clamps_to_i16_range() {
 let mut chain = SignalChainInstance::new(PathBuf::from("/tmp"), 1);
 chain.scratch[0] = i16::MAX;
 chain.scratch[1] = i16::MIN;
 chain.set_injection(vec![1000, -1000]);
 chain.process_fx(1);
 assert_eq!(chain.output(), &[i16::MAX, i16::MIN]);
 }

 #[test]
 fn audible_respects_mute_and_solo() {
 let mut slot = ChainSlot::new(PathBuf::from("/tmp"), 4);
 assert!(slot.audible(false));
 slot.mute = true;
 assert!(!slot.audible(false));
 slot.mute = false;
 assert!(!slot.audible(true));
 slot.solo = true;
 assert!(slot.audible(true));
 }

 #[test]
 fn accepts_channel_honors_omni_and_specific() {
 let mut slot = ChainSlot::new(PathBuf::from("/tmp"), 4);
 assert!(slot.accepts_channel(3));
 slot.receive_channel = 2;
 assert!(slot.accepts_channel(2));
 assert!(!slot.accepts_channel(3));
 }
}

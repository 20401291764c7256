//! Top-level engine that coordinates all augment-audio subsystems.

use crate::error::{Error, Result};
use augment_core::{AnnounceQueue, AudioMailbox, AudioSink, AugmentConfig, BlockScheduler};
use augment_patch::{ChainBody, MasterPresetStore, PatchStore, SaveNameHints};
use augment_sampler::{sampler::SamplerEngine, skipback::SkipbackRecorder};
use augment_setpage::SetPageState;
use std::path::PathBuf;
use std::sync::Arc;

/// Coordinates the four-slot signal chain scheduler, the patch and master
/// preset stores, the quantized sampler, the skipback recorder, and the
/// set-page multiplexer behind a single per-block entry point.
pub struct AugmentEngine {
 pub(crate) config: AugmentConfig,
 pub(crate) scheduler: BlockScheduler,
 pub(crate) patch_store: PatchStore,
 pub(crate) master_preset_store: MasterPresetStore,
 pub(crate) sampler: SamplerEngine,
 pub(crate) skipback: Arc<SkipbackRecorder>,
 pub(crate) set_page: SetPageState,
 pub(crate) announce: AnnounceQueue,
 /// Non-empty while an on-device component editor owns knob motion;
 /// when set, the knob macro engine is bypassed entirely (spec §4.4,
 /// §4.5's `component_ui_mode` command).
 pub(crate) component_ui_mode: Option<String>,
 /// Shared-memory handoff read/written once per block (spec §6.1).
 pub(crate) mailbox: AudioMailbox,
 /// Scratch buffer for the mailbox's input region, reused across blocks
 /// rather than allocated on the audio path.
 mailbox_input: Vec<i16>,
}

impl AugmentEngine {
 pub fn builder() -> crate::AugmentEngineBuilder {
 crate::AugmentEngineBuilder::default()
 }

 pub fn config(&self) -> &AugmentConfig {
 &self.config
 }

 pub(crate) fn host_caps(&self) -> augment_plugin::HostCapabilities {
 augment_plugin::default_host_capabilities(
 self.config.sample_rate,
 self.config.frames_per_block as u32,
 )
 }

 /// Tears down whatever is loaded in `slot` and loads every module named
 /// by `chain` in its place: the synth, the optional MIDI-source module,
 /// up to two MIDI-FX stages, and up to three audio-FX stages (spec
 /// §4.1, §4.2, §4.6's load algorithm). Replaces the slot's routing
 /// fields (input filter, receive/forward channel, knob mappings) from
 /// the patch body too, and ends with a mute window so the render
 /// thread drains the outgoing plugin instances before they're dropped.
 pub fn load_patch_into_slot(&mut self, slot_index: usize, chain: &ChainBody) -> Result<()> {
 chain.validate().map_err(augment_patch::PatchError::InvalidPatch)?;
 let caps = self.host_caps();
 let modules_dir = self.config.modules_dir.clone();
 let slot = self
.scheduler
.slots
.get_mut(slot_index)
.ok_or(Error::NoSuchSlot(slot_index))?;

 // Panic: release any notes the outgoing synth is still holding
 // before its instance is torn down.
 if let Some(generator) = slot.chain.generator.as_mut() {
 send_all_notes_off(generator);
 }
 slot.chain.generator = None;
 slot.chain.midi_source = None;
 slot.chain.midi_fx.clear();
 slot.chain.audio_fx.clear();

 let (synth_config, synth_state) = split_state_object(chain.synth.config.as_ref());
 let mut generator = augment_plugin::LoadedGenerator::load(
 &modules_dir,
 &chain.synth.module,
 &synth_config,
 caps,
 )?;
 generator.set_param("preset", &chain.synth.preset.to_string());
 // Mod wheel (CC1) reset must land before the state blob below so a
 // saved value that happens to be mapped to CC1 isn't clobbered.
 for channel in 0..16u8 {
 generator.on_midi(&[0xB0 | channel, 1, 0], augment_core::SOURCE_HOST);
 }
 if let Some(state) = synth_state {
 generator.set_param("state", &state);
 }
 slot.chain.generator = Some(generator);

 slot.chain.midi_source = match &chain.midi_source_module {
 Some(name) => Some(augment_plugin::LoadedMidiFx::load(&modules_dir, name, "{}", caps)?),
 None => None,
 };

 let mut audio_fx = Vec::with_capacity(chain.audio_fx.len());
 for stage in &chain.audio_fx {
 let (config, state) = split_state_object(stage.params.as_ref());
 let mut fx = augment_plugin::LoadedAudioFx::load(&modules_dir, &stage.module, &config, caps)?;
 if let Some(state) = state {
 fx.set_param("state", &state);
 }
 audio_fx.push(fx);
 }
 slot.chain.audio_fx = audio_fx;

 let mut midi_fx = Vec::with_capacity(chain.midi_fx.len());
 for stage in &chain.midi_fx {
 let mut scalar = stage.params.clone();
 let state = scalar.remove("state").map(|v| v.to_string());
 let config = serde_json::Value::Object(scalar).to_string();
 let mut fx = augment_plugin::LoadedMidiFx::load(&modules_dir, &stage.module, &config, caps)?;
 if let Some(state) = state {
 fx.set_param("state", &state);
 }
 midi_fx.push(fx);
 }
 slot.chain.midi_fx = midi_fx;

 slot.chain.input_filter = augment_core::InputFilter::parse(&chain.input);
 slot.chain.patch_index = chain.synth.preset;
 slot.chain.knob_mappings = chain
.knob_mappings
.iter()
.map(|entry| {
 // A missing saved value is the sentinel for "unset": read
 // the just-loaded module's live DSP value instead of
 // defaulting to 0.0. A present value is used as saved, clamped on
 // its first knob turn rather than at load time.
 let value = entry
.value
.unwrap_or_else(|| Self::read_live_knob_value(slot, &entry.target, &entry.param));
 augment_param::KnobMapping::new(entry.cc, entry.target.clone(), entry.param.clone(), value)
 })
.collect();
 slot.receive_channel = chain.receive_channel.unwrap_or(-1);
 slot.forward_channel = chain.forward_channel.unwrap_or(-1);
 slot.chain.trigger_mute();
 Ok(())
 }

 /// Reads the live DSP value for a knob mapping's sentinel "unset" case
 /// from whichever module the mapping's target
 /// selector addresses.
 fn read_live_knob_value(slot: &mut augment_core::ChainSlot, target: &str, param: &str) -> f64 {
 let raw = if target == "synth" {
 slot.chain.generator.as_mut().and_then(|g| g.get_param(param))
 } else if let Some(n) = target.strip_prefix("fx") {
 let idx: usize = n.parse().unwrap_or(0);
 slot.chain.audio_fx.get_mut(idx.wrapping_sub(1)).and_then(|fx| fx.get_param(param))
 } else if let Some(n) = target.strip_prefix("midi_fx") {
 let idx: usize = n.parse().unwrap_or(0);
 slot.chain.midi_fx.get_mut(idx.wrapping_sub(1)).and_then(|fx| fx.get_param(param))
 } else {
 None
 };
 raw.map(|v| augment_param::dsp_value_to_float(&v, None, 0.0)).unwrap_or(0.0)
 }

 pub fn unload_slot(&mut self, slot_index: usize) -> Result<()> {
 let slot = self
.scheduler
.slots
.get_mut(slot_index)
.ok_or(Error::NoSuchSlot(slot_index))?;
 slot.chain.generator = None;
 slot.chain.midi_source = None;
 slot.chain.midi_fx.clear();
 slot.chain.audio_fx.clear();
 slot.patch_name = None;
 Ok(())
 }

 pub fn handle_midi_in(&mut self, msg: [u8; 3], channel: u8, source: i32) {
 self.scheduler.route_midi(msg, channel, source);
 }

 /// Runs one audio block end to end (spec §4.11): reads the mailbox's
 /// input region and feeds it to every external-FX-mode slot, renders
 /// and mixes all four slots, runs master FX and the sampler/skipback
 /// taps, then writes the mixed result back to the mailbox's output
 /// region before returning it.
 pub fn process_block(&mut self, frames: u32, sample_rate: f64, source: i32) -> &[i16] {
 let sampler_recording = self.sampler.is_recording();
 let skipback_saving = self.skipback.is_saving();

 self.mailbox.read_input(&mut self.mailbox_input);
 for slot in self.scheduler.slots.iter_mut() {
 if slot.chain.external_fx_mode {
 slot.chain.set_injection(self.mailbox_input.clone());
 }
 }

 self.scheduler.render_slots(frames, sample_rate, source);
 self.scheduler.finish_external_fx(frames);

 let mut skipback_sink = SkipbackSink(&self.skipback);
 let out = self.scheduler.mix_and_master(
 frames,
 &mut self.sampler,
 &mut skipback_sink,
 sampler_recording,
 skipback_saving,
 );
 self.mailbox.write_output(out);
 out
 }

 pub fn patch_store(&self) -> &PatchStore {
 &self.patch_store
 }

 pub fn save_patch(&mut self, chain: ChainBody, hints: &SaveNameHints) -> Result<()> {
 self.patch_store.save(chain, hints)?;
 Ok(())
 }

 pub fn master_preset_store(&self) -> &MasterPresetStore {
 &self.master_preset_store
 }

 pub fn sampler(&mut self) -> &mut SamplerEngine {
 &mut self.sampler
 }

 pub fn skipback(&self) -> &Arc<SkipbackRecorder> {
 &self.skipback
 }

 pub fn set_page(&mut self) -> &mut SetPageState {
 &mut self.set_page
 }

 pub(crate) fn from_parts(
 config: AugmentConfig,
 module_dirs: [PathBuf; augment_core::NUM_SLOTS],
 patch_store: PatchStore,
 master_preset_store: MasterPresetStore,
 sampler: SamplerEngine,
 skipback: Arc<SkipbackRecorder>,
 set_page: SetPageState,
 mailbox: AudioMailbox,
 ) -> Self {
 let scheduler = BlockScheduler::new(config.frames_per_block as u32, module_dirs);
 let mailbox_input = vec![0i16; config.frames_per_block * 2];
 Self {
 config,
 scheduler,
 patch_store,
 master_preset_store,
 sampler,
 skipback,
 set_page,
 announce: AnnounceQueue::new(),
 component_ui_mode: None,
 mailbox,
 mailbox_input,
 }
 }

 /// Pops the oldest pending screen-reader announcement, if any (spec
 /// §7: bounded FIFO of at most four pending messages).
 pub fn pop_announcement(&mut self) -> Option<String> {
 self.announce.pop()
 }
}

/// All Notes Off (CC 123, value 0) on every MIDI channel — the panic step
/// at the start of a patch load, so nothing stays stuck when the outgoing
/// synth instance is dropped underneath it.
fn send_all_notes_off(generator: &mut augment_plugin::LoadedGenerator) {
 for channel in 0..16u8 {
 generator.on_midi(&[0xB0 | channel, 123, 0], augment_core::SOURCE_HOST);
 }
}

/// Splits a saved module config object into its scalar-params JSON (to
/// pass at load time) and its opaque `state` sub-key, if present (to
/// apply afterward via a dedicated `set_param("state", ...)` call, per
/// spec §4.6).
fn split_state_object(value: Option<&serde_json::Value>) -> (String, Option<String>) {
 match value {
 Some(serde_json::Value::Object(map)) => {
 let mut scalar = map.clone();
 let state = scalar.remove("state").map(|v| v.to_string());
 (serde_json::Value::Object(scalar).to_string(), state)
 }
 Some(other) => (other.to_string(), None),
 None => ("{}".to_string(), None),
 }
}

struct SkipbackSink<'a>(&'a Arc<SkipbackRecorder>);
impl AudioSink for SkipbackSink<'_> {
 fn push_block(&mut self, interleaved: &[i16], _frames: u32) {
 self.0.capture_block(interleaved);
 }
}

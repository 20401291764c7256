//! The prefix-routed parameter bus dispatcher (spec §4.4): wires
//! `augment_param::bus::route` against the live per-slot chain state,
//! including the unprefixed chain-level command table, the knob macro
//! engine's CC-to-`set_param` path, and module hot-swap.

use crate::engine::AugmentEngine;
use crate::error::{Error, Result};
use augment_param::bus::{dsp_value_to_float, parse_numeric_target, route, ParamTarget};
use augment_patch::{ChainBody, MasterFxSlots, MasterPreset, SaveNameHints};
use augment_plugin::{LoadedAudioFx, LoadedGenerator, LoadedMidiFx, ParameterDescriptor};
use serde::Deserialize;
use std::time::Instant;

/// The smoothing-map / set_param-routing label for a prefix target, or
/// `None` for targets the spec doesn't smooth (`source`, chain-level).
fn smoothing_label(target: &ParamTarget) -> Option<&'static str> {
 match target {
 ParamTarget::Synth => Some("synth"),
 ParamTarget::AudioFx(1) => Some("fx1"),
 ParamTarget::AudioFx(2) => Some("fx2"),
 ParamTarget::AudioFx(3) => Some("fx3"),
 ParamTarget::MidiFx(1) => Some("midi_fx1"),
 ParamTarget::MidiFx(2) => Some("midi_fx2"),
 _ => None,
 }
}

#[derive(Deserialize)]
struct SavePatchRequest {
 #[serde(flatten)]
 chain: ChainBody,
 #[serde(default)]
 custom_name: Option<String>,
}

impl AugmentEngine {
 /// Writes one `"prefix:KEY"` (or unprefixed command) parameter string
 /// against the slot's live state, per the routing table in §4.4.
 pub fn set_param(&mut self, slot_index: usize, param: &str, value: &str) -> Result<()> {
 let (target, key) = route(param);
 let key = key.to_string();
 match target {
 ParamTarget::Chain => self.handle_chain_command(slot_index, &key, value),
 ParamTarget::Slot => self.handle_slot_param(slot_index, &key, value),
 ParamTarget::Patch | ParamTarget::Sampler => Ok(()),
 _ => self.handle_plugin_param(slot_index, target, &key, value),
 }
 }

 /// Reads one parameter string, converting the plugin's (or the local
 /// state's) raw value to a float per §4.4 "Reading parameters".
 pub fn get_param(&mut self, slot_index: usize, param: &str, fallback: f64) -> Result<f64> {
 let (target, key) = route(param);
 let slot = self
.scheduler
.slots
.get_mut(slot_index)
.ok_or(Error::NoSuchSlot(slot_index))?;
 let raw = match &target {
 ParamTarget::Synth => slot.chain.generator.as_mut().and_then(|g| g.get_param(key)),
 ParamTarget::AudioFx(n) => slot
.chain
.audio_fx
.get_mut((*n as usize).saturating_sub(1))
.and_then(|fx| fx.get_param(key)),
 ParamTarget::MidiFx(n) => slot
.chain
.midi_fx
.get_mut((*n as usize).saturating_sub(1))
.and_then(|fx| fx.get_param(key)),
 ParamTarget::Source => slot.chain.midi_source.as_mut().and_then(|s| s.get_param(key)),
 ParamTarget::Slot => {
 return Ok(match key {
 "volume" => slot.volume as f64,
 "muted" => slot.mute as u8 as f64,
 "soloed" => slot.solo as u8 as f64,
 "receive_channel" => slot.receive_channel as f64,
 "forward_channel" => slot.forward_channel as f64,
 _ => fallback,
 });
 }
 ParamTarget::Sampler => return Ok(
 self.sampler
.get_param(key, self.config.tempo_bpm)
.and_then(|s| s.parse::<f64>().ok())
.unwrap_or(fallback),
 ),
 ParamTarget::Patch => return Ok(fallback),
 ParamTarget::Chain => {
 return Ok(match error_label_key(key) {
 Some(label) if slot.chain.load_error.contains_key(label) => 1.0,
 Some(_) => 0.0,
 None => fallback,
 });
 }
 };
 let descriptor = descriptor_for(slot, &target, key);
 Ok(raw.map(|v| dsp_value_to_float(&v, descriptor, fallback)).unwrap_or(fallback))
 }

 fn handle_plugin_param(
 &mut self,
 slot_index: usize,
 target: ParamTarget,
 key: &str,
 value: &str,
 ) -> Result<()> {
 if key == "module" {
 return self.replace_module(slot_index, &target, value);
 }

 let slot = self
.scheduler
.slots
.get_mut(slot_index)
.ok_or(Error::NoSuchSlot(slot_index))?;

 // Float-looking writes become smoothing targets; the raw value is
 // still passed straight through so the plugin can validate it
 // (spec §4.4 "Writing parameters").
 if let (Some(label), Some(numeric)) = (smoothing_label(&target), parse_numeric_target(value)) {
 slot.chain
.smoothing
.entry(label.to_string())
.or_default()
.set_target(key, numeric);
 }

 match target {
 ParamTarget::Synth => {
 if let Some(g) = slot.chain.generator.as_mut() {
 g.set_param(key, value);
 }
 }
 ParamTarget::AudioFx(n) => {
 if let Some(fx) = slot.chain.audio_fx.get_mut((n as usize).saturating_sub(1)) {
 fx.set_param(key, value);
 }
 }
 ParamTarget::MidiFx(n) => {
 if let Some(fx) = slot.chain.midi_fx.get_mut((n as usize).saturating_sub(1)) {
 fx.set_param(key, value);
 }
 }
 ParamTarget::Source => {
 if let Some(src) = slot.chain.midi_source.as_mut() {
 src.set_param(key, value);
 }
 }
 _ => unreachable!("routed target is a plugin prefix"),
 }
 Ok(())
 }

 /// `synth:module`, `fx1:module`..`fx3:module`, `midi_fx1:module`,
 /// `midi_fx2:module`: triggers a mute window, resets that target's
 /// smoother, and hot-swaps the module. `""`/`"none"` unloads without
 /// loading a replacement. Load failure is recorded on the chain rather
 /// than propagated, surfaced through `get_param("synth_error", ...)`.
 fn replace_module(&mut self, slot_index: usize, target: &ParamTarget, value: &str) -> Result<()> {
 if slot_index >= self.scheduler.slots.len() {
 return Err(Error::NoSuchSlot(slot_index));
 }
 let caps = self.host_caps();
 let modules_dir = self.config.modules_dir.clone();
 let label = smoothing_label(target).expect("plugin-prefixed target always has a label");

 self.scheduler.slots[slot_index].chain.trigger_mute();
 if let Some(state) = self.scheduler.slots[slot_index].chain.smoothing.get_mut(label) {
 state.reset();
 }

 let fresh = !value.is_empty() && value != "none";

 match target {
 ParamTarget::Synth => {
 self.scheduler.slots[slot_index].chain.generator = None;
 if fresh {
 match LoadedGenerator::load(&modules_dir, value, "{}", caps) {
 Ok(g) => {
 let slot = &mut self.scheduler.slots[slot_index];
 slot.chain.load_error.remove(label);
 slot.chain.generator = Some(g);
 self.resolve_default_forward_channel(slot_index);
 }
 Err(e) => {
 self.scheduler.slots[slot_index].chain.load_error.insert(label.to_string(), e.to_string());
 }
 }
 }
 }
 ParamTarget::AudioFx(n) => {
 let idx = (*n as usize).saturating_sub(1);
 if idx < self.scheduler.slots[slot_index].chain.audio_fx.len() {
 self.scheduler.slots[slot_index].chain.audio_fx.remove(idx);
 }
 if fresh {
 match LoadedAudioFx::load(&modules_dir, value, "{}", caps) {
 Ok(fx) => {
 let slot = &mut self.scheduler.slots[slot_index];
 slot.chain.load_error.remove(label);
 if idx <= slot.chain.audio_fx.len() {
 slot.chain.audio_fx.insert(idx, fx);
 }
 }
 Err(e) => {
 self.scheduler.slots[slot_index].chain.load_error.insert(label.to_string(), e.to_string());
 }
 }
 }
 }
 ParamTarget::MidiFx(n) => {
 let idx = (*n as usize).saturating_sub(1);
 if idx < self.scheduler.slots[slot_index].chain.midi_fx.len() {
 self.scheduler.slots[slot_index].chain.midi_fx.remove(idx);
 }
 if fresh {
 match LoadedMidiFx::load(&modules_dir, value, "{}", caps) {
 Ok(fx) => {
 let slot = &mut self.scheduler.slots[slot_index];
 slot.chain.load_error.remove(label);
 if idx <= slot.chain.midi_fx.len() {
 slot.chain.midi_fx.insert(idx, fx);
 }
 }
 Err(e) => {
 self.scheduler.slots[slot_index].chain.load_error.insert(label.to_string(), e.to_string());
 }
 }
 }
 }
 _ => unreachable!("replace_module only called for plugin-prefixed targets"),
 }
 Ok(())
 }

 /// §4.6 "Default forward channel resolution": when the slot's forward
 /// channel is still auto (-1), adopt the freshly-loaded synth's
 /// declared `default_forward_channel` if it has one.
 fn resolve_default_forward_channel(&mut self, slot_index: usize) {
 let slot = &mut self.scheduler.slots[slot_index];
 if slot.forward_channel != -1 {
 return;
 }
 let declared = slot
.chain
.generator
.as_ref()
.and_then(|g| g.descriptor.as_ref())
.and_then(|d| d.capabilities.default_forward_channel);
 if let Some(ch) = declared {
 if (1..=16).contains(&ch) {
 slot.forward_channel = (ch - 1) as i8;
 }
 }
 }

 fn handle_slot_param(&mut self, slot_index: usize, key: &str, value: &str) -> Result<()> {
 let slot = self
.scheduler
.slots
.get_mut(slot_index)
.ok_or(Error::NoSuchSlot(slot_index))?;
 match key {
 "volume" => slot.volume = value.parse().unwrap_or(slot.volume),
 "muted" => slot.mute = value == "1" || value.eq_ignore_ascii_case("true"),
 "soloed" => slot.solo = value == "1" || value.eq_ignore_ascii_case("true"),
 "receive_channel" => slot.receive_channel = value.parse().unwrap_or(slot.receive_channel),
 "forward_channel" => slot.forward_channel = value.parse().unwrap_or(slot.forward_channel),
 _ => {}
 }
 Ok(())
 }

 /// The unprefixed chain-level command table (§4.4): patch navigation
 /// and save/update/delete, master-preset save/update/delete, sampler
 /// arm/disarm, and the on-device-editor-ownership gate.
 fn handle_chain_command(&mut self, slot_index: usize, command: &str, value: &str) -> Result<()> {
 match command {
 "patch" => self.dispatch_patch_load(slot_index, value.trim().parse().unwrap_or(-1)),
 "next_patch" => self.dispatch_patch_step(slot_index, 1),
 "prev_patch" => self.dispatch_patch_step(slot_index, -1),
 "save_patch" => self.dispatch_save_patch(slot_index, value),
 "update_patch" => self.dispatch_update_patch(value),
 "delete_patch" => self.dispatch_delete_patch(value),
 "save_master_preset" => self.dispatch_save_master_preset(value, None),
 "update_master_preset" => self.dispatch_update_master_preset(value),
 "delete_master_preset" => self.dispatch_delete_master_preset(value),
 "recording" => self.dispatch_recording(value),
 "component_ui_mode" => {
 self.component_ui_mode = if value.is_empty() || value == "none" {
 None
 } else {
 Some(value.to_string())
 };
 Ok(())
 }
 _ => Ok(()),
 }
 }

 fn dispatch_patch_load(&mut self, slot_index: usize, index: i32) -> Result<()> {
 if index < 0 {
 return self.unload_slot(slot_index);
 }
 let entries = self.patch_store.scan()?;
 if let Some(entry) = entries.get(index as usize) {
 let name = entry.patch.name.clone();
 self.load_patch_into_slot(slot_index, &entry.patch.chain)?;
 let slot = &mut self.scheduler.slots[slot_index];
 slot.patch_name = Some(name);
 slot.chain.patch_index = index;
 }
 Ok(())
 }

 fn dispatch_patch_step(&mut self, slot_index: usize, step: i32) -> Result<()> {
 let entries = self.patch_store.scan()?;
 if entries.is_empty() {
 return Ok(());
 }
 let len = entries.len() as i32;
 let current = self
.scheduler
.slots
.get(slot_index)
.map(|s| s.chain.patch_index)
.unwrap_or(-1);
 let next = ((current + step).rem_euclid(len)).max(0);
 self.dispatch_patch_load(slot_index, next)
 }

 /// §4.6's default-name components: `preset_name` is read live off the
 /// slot's currently-loaded synth (the module being saved is presumed to
 /// already be loaded there), `fx1_name`/`fx2_name` come straight off
 /// the saved chain body's first two audio-FX stages.
 fn dispatch_save_patch(&mut self, slot_index: usize, payload: &str) -> Result<()> {
 let request: SavePatchRequest =
 serde_json::from_str(payload).map_err(augment_patch::PatchError::from)?;
 let preset_name = self
.scheduler
.slots
.get_mut(slot_index)
.and_then(|slot| slot.chain.generator.as_mut())
.and_then(|g| g.get_param("preset_name"))
.filter(|s| !s.is_empty());
 let fx1_name = request.chain.audio_fx.first().map(|fx| fx.module.clone());
 let fx2_name = request.chain.audio_fx.get(1).map(|fx| fx.module.clone());
 let hints = SaveNameHints {
 preset_name,
 fx1_name,
 fx2_name,
 custom_name: request.custom_name,
 };
 self.patch_store.save(request.chain, &hints)?;
 Ok(())
 }

 /// Payload shape `"index:json"`; the patch keeps its prior `name`
 /// unless the json body carries a `custom_name` field (round-trip law:
 /// "For every patch update with custom_name absent: the resulting name
 /// equals the prior patch's name").
 fn dispatch_update_patch(&mut self, payload: &str) -> Result<()> {
 let Some((index_str, json)) = payload.split_once(':') else {
 return Ok(());
 };
 let Ok(index) = index_str.trim().parse::<usize>() else {
 return Ok(());
 };
 let entries = self.patch_store.scan()?;
 let Some(entry) = entries.get(index) else {
 return Ok(());
 };
 let request: SavePatchRequest =
 serde_json::from_str(json).map_err(augment_patch::PatchError::from)?;
 let name = request.custom_name.unwrap_or_else(|| entry.patch.name.clone());
 self.patch_store.update(&entry.path, request.chain, name)?;
 Ok(())
 }

 fn dispatch_delete_patch(&mut self, payload: &str) -> Result<()> {
 let Ok(index) = payload.trim().parse::<usize>() else {
 return Ok(());
 };
 let entries = self.patch_store.scan()?;
 if let Some(entry) = entries.get(index) {
 self.patch_store.delete(&entry.path)?;
 }
 Ok(())
 }

 fn dispatch_save_master_preset(&mut self, payload: &str, filename: Option<&str>) -> Result<()> {
 let slots: MasterFxSlots =
 serde_json::from_str(payload).map_err(augment_patch::PatchError::from)?;
 let name = filename.unwrap_or("master").to_string();
 let preset = MasterPreset { name: name.clone(), version: 1, master_fx: slots };
 self.master_preset_store.save(&name, &preset)?;
 Ok(())
 }

 fn dispatch_update_master_preset(&mut self, payload: &str) -> Result<()> {
 let Some((name, json)) = payload.split_once(':') else {
 return Ok(());
 };
 self.dispatch_save_master_preset(json, Some(name))
 }

 fn dispatch_delete_master_preset(&mut self, name: &str) -> Result<()> {
 let path = self.config.master_presets_dir.join(format!("{name}.json"));
 if path.exists() {
 self.master_preset_store.delete(&path)?;
 }
 Ok(())
 }

 /// `"1"` arms the sampler off the resample bus; a second `"1"` while
 /// already armed is the user's second gesture and starts recording
 /// immediately (§4.7's `ARMED --[gesture, preroll=off]--> RECORDING`).
 /// Anything else stops it. A failure at either step (e.g. recordings
 /// dir unwritable) announces "Recording failed" rather than
 /// propagating, per §7.
 fn dispatch_recording(&mut self, value: &str) -> Result<()> {
 if value == "1" {
 let result = if self.sampler.phase() == augment_sampler::sampler::Phase::Armed {
 self.sampler.start_now(self.config.tempo_bpm)
 } else {
 self.sampler.arm(augment_sampler::sampler::SampleSource::Resample)
 };
 if let Err(e) = result {
 tracing::warn!(error = %e, "sampler recording failed");
 self.announce.push("Recording failed");
 }
 } else {
 let _ = self.sampler.stop();
 }
 Ok(())
 }

 /// Applies one relative-encoder knob-macro CC event to whichever
 /// mapping on this slot claims `cc`, writing the result through the
 /// target plugin's `set_param`. Bypassed entirely while
 /// `component_ui_mode` is set (§4.5).
 pub fn handle_knob_cc(&mut self, slot_index: usize, cc: u8, cc_value: u8, now: Instant) -> Result<()> {
 if self.component_ui_mode.is_some() {
 return Ok(());
 }
 let slot = self
.scheduler
.slots
.get_mut(slot_index)
.ok_or(Error::NoSuchSlot(slot_index))?;
 let Some(mapping_idx) = slot.chain.knob_mappings.iter().position(|m| m.cc == cc) else {
 return Ok(());
 };
 let (target, param) = {
 let mapping = &slot.chain.knob_mappings[mapping_idx];
 (mapping.target.clone(), mapping.param.clone())
 };
 let Some(descriptor) = descriptor_for_label(slot, &target, &param).cloned() else {
 return Ok(());
 };
 let formatted = slot.chain.knob_mappings[mapping_idx].apply_cc(cc_value, &descriptor, now);
 let Some(formatted) = formatted else {
 return Ok(());
 };
 match target.as_str() {
 "synth" => {
 if let Some(g) = slot.chain.generator.as_mut() {
 g.set_param(&param, &formatted);
 }
 }
 "fx1" | "fx2" | "fx3" => {
 let idx: usize = target[2..].parse().unwrap_or(1);
 if let Some(fx) = slot.chain.audio_fx.get_mut(idx.saturating_sub(1)) {
 fx.set_param(&param, &formatted);
 }
 }
 "midi_fx1" | "midi_fx2" => {
 let idx: usize = target[7..].parse().unwrap_or(1);
 if let Some(fx) = slot.chain.midi_fx.get_mut(idx.saturating_sub(1)) {
 fx.set_param(&param, &formatted);
 }
 }
 _ => {}
 }
 Ok(())
 }
}

/// Maps a `"*_error"` chain-level read key to the routing-target label
/// `replace_module` files its load failures under, or `None` if `key`
/// isn't one of the recognized error keys.
fn error_label_key(key: &str) -> Option<&'static str> {
 match key {
 "synth_error" => Some("synth"),
 "fx1_error" => Some("fx1"),
 "fx2_error" => Some("fx2"),
 "fx3_error" => Some("fx3"),
 "midi_fx1_error" => Some("midi_fx1"),
 "midi_fx2_error" => Some("midi_fx2"),
 _ => None,
 }
}

/// Looks up the `ParameterDescriptor` for `key` on whichever plugin a
/// routed prefix target addresses.
fn descriptor_for<'a>(
 slot: &'a augment_core::ChainSlot,
 target: &ParamTarget,
 key: &str,
) -> Option<&'a ParameterDescriptor> {
 match target {
 ParamTarget::Synth => slot.chain.generator.as_ref()?.descriptor.as_ref()?.get(key),
 ParamTarget::AudioFx(n) => slot
.chain
.audio_fx
.get((*n as usize).saturating_sub(1))?
.descriptor
.as_ref()?
.get(key),
 ParamTarget::MidiFx(n) => slot
.chain
.midi_fx
.get((*n as usize).saturating_sub(1))?
.descriptor
.as_ref()?
.get(key),
 ParamTarget::Source => slot.chain.midi_source.as_ref()?.descriptor.as_ref()?.get(key),
 _ => None,
 }
}

/// Same lookup keyed by the knob mapping's string target selector
/// ("synth", "fx1".."fx3", "midi_fx1", "midi_fx2") rather than a
/// `ParamTarget`.
fn descriptor_for_label<'a>(
 slot: &'a augment_core::ChainSlot,
 target: &str,
 key: &str,
) -> Option<&'a ParameterDescriptor> {
 match target {
 "synth" => slot.chain.generator.as_ref()?.descriptor.as_ref()?.get(key),
 "fx1" | "fx2" | "fx3" => {
 let idx: usize = target[2..].parse().ok()?;
 slot.chain
.audio_fx
.get(idx.saturating_sub(1))?
.descriptor
.as_ref()?
.get(key)
 }
 "midi_fx1" | "midi_fx2" => {
 let idx: usize = target[7..].parse().ok()?;
 slot.chain
.midi_fx
.get(idx.saturating_sub(1))?
.descriptor
.as_ref()?
.get(key)
 }
 _ => None,
 }
}

//! Master-FX chain: up to four audio-FX-v2 instances applied in order to
//! the post-slot-sum bus. Grounded on `tutti-engine`'s master
//! bus processor, generalized from a fixed DSP graph to loaded modules.

use augment_plugin::{LoadedAudioFx, ModuleDescriptor};

pub const MAX_MASTER_SLOTS: usize = 4;

/// One master-FX slot. `None` when empty; master presets persist all four
/// slots, with unset ones written as `null`.
#[derive(Default)]
pub struct MasterFxSlot {
 pub module_id: Option<String>,
 pub fx: Option<LoadedAudioFx>,
 /// Parsed once at load time; satisfies UI parameter-list queries when
 /// the module itself has no live descriptor getter.
 pub cached_descriptor: Option<ModuleDescriptor>,
}

impl MasterFxSlot {
 pub fn is_loaded(&self) -> bool {
 self.fx.is_some()
 }

 pub fn load(&mut self, module_id: String, fx: LoadedAudioFx, descriptor: Option<ModuleDescriptor>) {
 self.module_id = Some(module_id);
 self.fx = Some(fx);
 self.cached_descriptor = descriptor;
 }

 pub fn unload(&mut self) {
 self.module_id = None;
 self.fx = None;
 self.cached_descriptor = None;
 }
}

/// The fixed four-slot master chain.
pub struct MasterChain {
 pub slots: [MasterFxSlot; MAX_MASTER_SLOTS],
}

impl Default for MasterChain {
 fn default() -> Self {
 Self {
 slots: [
 MasterFxSlot::default(),
 MasterFxSlot::default(),
 MasterFxSlot::default(),
 MasterFxSlot::default(),
 ],
 }
 }
}

impl MasterChain {
 pub fn new() -> Self {
 Self::default()
 }

 /// Runs every loaded slot in index order, in place, on the mixed bus
 ///.
 pub fn process_block(&mut self, interleaved: &mut [i16], frames: u32) {
 for slot in self.slots.iter_mut() {
 if let Some(fx) = &mut slot.fx {
 fx.process_block(interleaved, frames);
 }
 }
 }

 /// Fans one outgoing MIDI message to every master slot that declared a
 /// MIDI handler.
 pub fn dispatch_midi(&mut self, bytes: &[u8], source: i32) {
 for slot in self.slots.iter_mut() {
 if let Some(fx) = &mut slot.fx {
 if fx.has_midi_handler() {
 fx.on_midi(bytes, source);
 }
 }
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn empty_chain_processes_without_panicking() {
 let mut chain = MasterChain::new();
 let mut buf = vec![0i16; 8];
 chain.process_block(&mut buf, 4);
 assert_eq!(buf, vec![0i16; 8]);
 }

 #[test]
 fn unloaded_slots_report_not_loaded() {
 let chain = MasterChain::new();
 assert!(chain.slots.iter().all(|s| !s.is_loaded()));
 }
}

//! Builder for configuring and constructing an `AugmentEngine`.

use crate::{AugmentEngine, Result};
use augment_core::{AudioMailbox, AugmentConfig, MailboxLayout};
use augment_patch::{MasterPresetStore, PatchStore};
use augment_sampler::sampler::SamplerEngine;
use augment_sampler::skipback::SkipbackRecorder;
use augment_setpage::SetPageState;
use std::path::PathBuf;
use std::sync::Arc;

/// Every per-slot module directory defaults to the config's shared
/// `modules_dir`; slots differ only in their loaded patch, not where
/// modules are resolved from, so the builder does not expose per-slot
/// overrides.
#[derive(Default)]
pub struct AugmentEngineBuilder {
 config: AugmentConfig,
}

impl AugmentEngineBuilder {
 pub fn sample_rate(mut self, sample_rate: f64) -> Self {
 self.config.sample_rate = sample_rate;
 self
 }

 pub fn frames_per_block(mut self, frames: usize) -> Self {
 self.config.frames_per_block = frames;
 self
 }

 pub fn patches_dir(mut self, dir: impl Into<PathBuf>) -> Self {
 self.config.patches_dir = dir.into();
 self
 }

 pub fn master_presets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
 self.config.master_presets_dir = dir.into();
 self
 }

 pub fn recordings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
 self.config.recordings_dir = dir.into();
 self
 }

 pub fn library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
 self.config.library_dir = dir.into();
 self
 }

 pub fn set_pages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
 self.config.set_pages_dir = dir.into();
 self
 }

 pub fn skipback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
 self.config.skipback_dir = dir.into();
 self
 }

 pub fn modules_dir(mut self, dir: impl Into<PathBuf>) -> Self {
 self.config.modules_dir = dir.into();
 self
 }

 pub fn tempo_bpm(mut self, bpm: f64) -> Self {
 self.config.tempo_bpm = bpm;
 self
 }

 pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
 self.config.settings_path = path.into();
 self
 }

 pub fn restart_script(mut self, path: impl Into<PathBuf>) -> Self {
 self.config.restart_script = path.into();
 self
 }

 pub fn mailbox_path(mut self, path: impl Into<PathBuf>) -> Self {
 self.config.mailbox_path = path.into();
 self
 }

 pub fn build(self) -> Result<AugmentEngine> {
 self.config.validate()?;

 let module_dirs = [
 self.config.modules_dir.clone(),
 self.config.modules_dir.clone(),
 self.config.modules_dir.clone(),
 self.config.modules_dir.clone(),
 ];

 let patch_store = PatchStore::new(self.config.patches_dir.clone());
 let master_preset_store = MasterPresetStore::new(self.config.master_presets_dir.clone());
 let sampler = SamplerEngine::new(
 self.config.sample_rate,
 self.config.frames_per_block as u32,
 self.config.recordings_dir.clone(),
 );
 let skipback = Arc::new(SkipbackRecorder::new(self.config.sample_rate));
 let set_page = SetPageState::load(self.config.set_pages_dir.join("current_page.txt"));
 let mailbox = AudioMailbox::open(
 &self.config.mailbox_path,
 MailboxLayout::standard(self.config.frames_per_block),
 )?;

 Ok(AugmentEngine::from_parts(
 self.config,
 module_dirs,
 patch_store,
 master_preset_store,
 sampler,
 skipback,
 set_page,
 mailbox,
 ))
 }
}

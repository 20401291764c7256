//! Engine-wide configuration.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Configuration for the augment engine.
///
/// Mirrors the fixed quantities the host firmware negotiates at startup:
/// the audio mailbox's block cadence and the on-disk locations the core
/// reads and writes (patches, recordings, skipback captures, set pages).
#[derive(Debug, Clone)]
pub struct AugmentConfig {
 pub sample_rate: f64,
 pub frames_per_block: usize,
 pub patches_dir: PathBuf,
 pub master_presets_dir: PathBuf,
 pub recordings_dir: PathBuf,
 pub skipback_dir: PathBuf,
 pub set_pages_dir: PathBuf,
 pub library_dir: PathBuf,
 pub modules_dir: PathBuf,
 /// Process-wide settings-file fallback tempo, consulted last in the
 /// sampler's tempo-fallback chain.
 pub tempo_bpm: f64,
 /// Firmware settings JSON polled/edited for `currentSongIndex` (spec
 /// §4.10's settings poll and step 7's reset-to-zero).
 pub settings_path: PathBuf,
 /// Script invoked to restart the firmware after a page swap lands
 /// (spec §4.10 step 8).
 pub restart_script: PathBuf,
 /// Backing file for the shared-memory audio mailbox (spec §6.1).
 pub mailbox_path: PathBuf,
}

impl Default for AugmentConfig {
 fn default() -> Self {
 Self {
 sample_rate: 44100.0,
 frames_per_block: 128,
 patches_dir: PathBuf::from("patches"),
 master_presets_dir: PathBuf::from("master_presets"),
 recordings_dir: PathBuf::from("recordings"),
 skipback_dir: PathBuf::from("skipback"),
 set_pages_dir: PathBuf::from("set_pages"),
 library_dir: PathBuf::from("library"),
 modules_dir: PathBuf::from("modules"),
 tempo_bpm: 120.0,
 settings_path: PathBuf::from("settings.json"),
 restart_script: PathBuf::from("restart.sh"),
 mailbox_path: PathBuf::from("mailbox.bin"),
 }
 }
}

impl AugmentConfig {
 pub fn validate(&self) -> Result<()> {
 if self.sample_rate < 8000.0 || self.sample_rate > 384_000.0 {
 return Err(Error::InvalidConfig(format!(
 "sample_rate {} out of range (8000-384000 Hz)",
 self.sample_rate
 )));
 }
 if self.frames_per_block == 0 || self.frames_per_block > 8192 {
 return Err(Error::InvalidConfig(format!(
 "frames_per_block {} out of range (1-8192)",
 self.frames_per_block
 )));
 }
 if self.tempo_bpm < 20.0 || self.tempo_bpm > 999.0 {
 return Err(Error::InvalidConfig(format!(
 "tempo_bpm {} out of range (20-999 BPM)",
 self.tempo_bpm
 )));
 }
 Ok(())
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn default_config_is_valid() {
 let config = AugmentConfig::default();
 assert!(config.validate().is_ok());
 }

 #[test]
 fn rejects_out_of_range_sample_rate() {
 let mut config = AugmentConfig::default();
 config.sample_rate = 1000.0;
 assert!(config.validate().is_err());
 }

 #[test]
 fn rejects_zero_frames_per_block() {
 let mut config = AugmentConfig::default();
 config.frames_per_block = 0;
 assert!(config.validate().is_err());
 }
}

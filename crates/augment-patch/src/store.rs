//! Patch store: scan, parse, save, update, delete, with auto-numbered
//! save names and collision avoidance.

use crate::error::{PatchError, Result};
use crate::schema::{ChainBody, Patch};
use std::fs;
use std::path::{Path, PathBuf};

pub const MAX_TRACKED_PATCHES: usize = 32;

#[derive(Debug, Clone)]
pub struct PatchEntry {
 pub path: PathBuf,
 pub patch: Patch,
}

/// Parameters used only to generate a default display name; not persisted
/// verbatim in the patch file itself.
#[derive(Debug, Clone, Default)]
pub struct SaveNameHints {
 pub preset_name: Option<String>,
 pub fx1_name: Option<String>,
 pub fx2_name: Option<String>,
 pub custom_name: Option<String>,
}

pub struct PatchStore {
 dir: PathBuf,
}

impl PatchStore {
 pub fn new(dir: impl Into<PathBuf>) -> Self {
 Self { dir: dir.into() }
 }

 /// Reads every `.json` file, parses it, and sorts alphabetically by
 /// `name` (case-insensitive). Stops tracking after
 /// `MAX_TRACKED_PATCHES`; later entries (in directory-iteration order)
 /// are silently ignored.
 pub fn scan(&self) -> Result<Vec<PatchEntry>> {
 let mut entries = Vec::new();
 let read_dir = match fs::read_dir(&self.dir) {
 Ok(rd) => rd,
 Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
 Err(e) => return Err(e.into()),
 };

 for item in read_dir {
 let item = item?;
 let path = item.path();
 if path.extension().and_then(|e| e.to_str()) != Some("json") {
 continue;
 }
 let body = fs::read_to_string(&path)?;
 match Patch::parse(&body) {
 Ok(patch) => entries.push(PatchEntry { path, patch }),
 Err(e) => {
 tracing::warn!(path = %path.display(), error = %e, "skipping unparsable patch file");
 }
 }
 }

 entries.sort_by(|a, b| a.patch.name.to_lowercase().cmp(&b.patch.name.to_lowercase()));
 entries.truncate(MAX_TRACKED_PATCHES);
 Ok(entries)
 }

 /// Lowercases, keeps alphanumerics, replaces space/hyphen with
 /// underscore, and drops everything else.
 fn sanitize_filename(name: &str) -> String {
 let mut out = String::with_capacity(name.len());
 for ch in name.chars() {
 if ch.is_ascii_alphanumeric() {
 out.push(ch.to_ascii_lowercase());
 } else if ch == ' ' || ch == '-' {
 out.push('_');
 }
 }
 out
 }

 fn default_display_name(synth: &str, preset: i32, hints: &SaveNameHints) -> String {
 let mut name = format!("{synth} {preset:02}");
 if let Some(preset_name) = &hints.preset_name {
 name.push(' ');
 name.push_str(preset_name);
 }
 if let Some(fx1) = &hints.fx1_name {
 name.push_str(" + ");
 name.push_str(fx1);
 }
 if let Some(fx2) = &hints.fx2_name {
 name.push_str(" + ");
 name.push_str(fx2);
 }
 name
 }

 /// Finds a free `<base>[_NN].json` path, trying `_02` through `_99`
 /// after the bare base name.
 fn free_path(&self, base: &str) -> Result<(PathBuf, String)> {
 let candidate = self.dir.join(format!("{base}.json"));
 if !candidate.exists() {
 return Ok((candidate, base.to_string()));
 }
 for n in 2..=99u32 {
 let stem = format!("{base}_{n:02}");
 let candidate = self.dir.join(format!("{stem}.json"));
 if !candidate.exists() {
 return Ok((candidate, stem));
 }
 }
 Err(PatchError::NoFreeFilename(base.to_string()))
 }

 /// Saves a new patch, generating a default display name (overridable
 /// via `hints.custom_name`) and a collision-free filename whose suffix
 /// mirrors the display name's own disambiguation.
 pub fn save(&self, chain: ChainBody, hints: &SaveNameHints) -> Result<PatchEntry> {
 fs::create_dir_all(&self.dir)?;
 chain
.validate()
.map_err(PatchError::InvalidPatch)?;

 let default_name = Self::default_display_name(&chain.synth.module, chain.synth.preset, hints);
 let display_name = hints.custom_name.clone().unwrap_or(default_name);
 let base = Self::sanitize_filename(&display_name);
 let (path, disambiguated_stem) = self.free_path(&base)?;

 let final_name = if disambiguated_stem == base {
 display_name
 } else {
 let suffix = disambiguated_stem.rsplit('_').next().unwrap_or("");
 format!("{display_name}_{suffix}")
 };

 let patch = Patch { name: final_name, version: 1, chain };
 fs::write(&path, patch.to_json_pretty()?)?;
 Ok(PatchEntry { path, patch })
 }

 pub fn update(&self, path: &Path, chain: ChainBody, name: String) -> Result<()> {
 chain
.validate()
.map_err(PatchError::InvalidPatch)?;
 let patch = Patch { name, version: 1, chain };
 fs::write(path, patch.to_json_pretty()?)?;
 Ok(())
 }

 pub fn delete(&self, path: &Path) -> Result<()> {
 fs::remove_file(path)?;
 Ok(())
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::schema::SynthSlot;

 fn chain(module: &str, preset: i32) -> ChainBody {
 ChainBody {
 synth: SynthSlot { module: module.into(), preset, config: None },
 audio_fx: vec![],
 midi_fx: vec![],
 midi_fx_js: vec![],
 midi_source_module: None,
 input: "both".into(),
 knob_mappings: vec![],
 receive_channel: None,
 forward_channel: None,
 }
 }

 #[test]
 fn sanitize_replaces_space_and_hyphen_and_drops_punctuation() {
 assert_eq!(PatchStore::sanitize_filename("Lead Synth - Wobble!"), "lead_synth_wobble");
 }

 #[test]
 fn save_generates_default_name_and_filename() {
 let dir = tempfile::tempdir().unwrap();
 let store = PatchStore::new(dir.path());
 let entry = store.save(chain("synth_a", 3), &SaveNameHints::default()).unwrap();
 assert_eq!(entry.patch.name, "synth_a 03");
 assert_eq!(entry.path.file_name().unwrap().to_str().unwrap(), "synth_a_03.json");
 }

 #[test]
 fn save_disambiguates_colliding_filenames() {
 let dir = tempfile::tempdir().unwrap();
 let store = PatchStore::new(dir.path());
 let mut hints = SaveNameHints::default();
 hints.custom_name = Some("lead".into());
 let first = store.save(chain("synth_a", 0), &hints).unwrap();
 let second = store.save(chain("synth_a", 0), &hints).unwrap();
 assert_eq!(first.path.file_name().unwrap().to_str().unwrap(), "lead.json");
 assert_eq!(second.path.file_name().unwrap().to_str().unwrap(), "lead_02.json");
 assert_eq!(second.patch.name, "lead_02");
 }

 #[test]
 fn scan_sorts_alphabetically_case_insensitive() {
 let dir = tempfile::tempdir().unwrap();
 let store = PatchStore::new(dir.path());
 let mut hints = SaveNameHints::default();
 hints.custom_name = Some("Zebra".into());
 store.save(chain("a", 0), &hints).unwrap();
 hints.custom_name = Some("apple".into());
 store.save(chain("a", 0), &hints).unwrap();
 let entries = store.scan().unwrap();
 assert_eq!(entries[0].patch.name, "apple");
 assert_eq!(entries[1].patch.name, "Zebra");
 }

 #[test]
 fn unparsable_files_are_skipped_not_fatal() {
 let dir = tempfile::tempdir().unwrap();
 fs::write(dir.path().join("broken.json"), "not json").unwrap();
 let store = PatchStore::new(dir.path());
 assert!(store.scan().unwrap().is_empty());
 }

 #[test]
 fn delete_removes_file() {
 let dir = tempfile::tempdir().unwrap();
 let store = PatchStore::new(dir.path());
 let entry = store.save(chain("a", 0), &SaveNameHints::default()).unwrap();
 store.delete(&entry.path).unwrap();
 assert!(store.scan().unwrap().is_empty());
 }
}

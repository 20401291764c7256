//! Master-preset file format and store: four named
//! audio-FX slots, unset slots written as `null`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterFxSlotEntry {
 #[serde(rename = "type")]
 pub module: String,
 #[serde(default, skip_serializing_if = "Option::is_none")]
 pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterPreset {
 pub name: String,
 pub version: u32,
 pub master_fx: MasterFxSlots,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterFxSlots {
 pub fx1: Option<MasterFxSlotEntry>,
 pub fx2: Option<MasterFxSlotEntry>,
 pub fx3: Option<MasterFxSlotEntry>,
 pub fx4: Option<MasterFxSlotEntry>,
}

impl MasterPreset {
 pub fn parse(json: &str) -> serde_json::Result<Self> {
 serde_json::from_str(json)
 }

 pub fn to_json_pretty(&self) -> serde_json::Result<String> {
 serde_json::to_string_pretty(self)
 }
}

pub struct MasterPresetStore {
 dir: PathBuf,
}

impl MasterPresetStore {
 pub fn new(dir: impl Into<PathBuf>) -> Self {
 Self { dir: dir.into() }
 }

 pub fn save(&self, filename: &str, preset: &MasterPreset) -> Result<PathBuf> {
 fs::create_dir_all(&self.dir)?;
 let path = self.dir.join(format!("{filename}.json"));
 fs::write(&path, preset.to_json_pretty()?)?;
 Ok(path)
 }

 pub fn load(&self, path: &Path) -> Result<MasterPreset> {
 let body = fs::read_to_string(path)?;
 Ok(MasterPreset::parse(&body)?)
 }

 pub fn delete(&self, path: &Path) -> Result<()> {
 fs::remove_file(path)?;
 Ok(())
 }
}

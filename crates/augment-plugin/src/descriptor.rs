//! `module.json` parsing: the per-module parameter descriptor table.
//!
//! Spec §6.4: `chain_params` is the legacy flat fallback, used when
//! `ui_hierarchy` yields no inline params. Either shape feeds the same
//! in-memory descriptor table built once at load time.

use crate::error::{PluginError, Result};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
 Float,
 Int,
 Enum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterDescriptor {
 pub key: String,
 #[serde(default)]
 pub name: Option<String>,
 #[serde(rename = "type")]
 pub param_type: ParamType,
 #[serde(default)]
 pub min: Option<f64>,
 #[serde(default)]
 pub max: Option<f64>,
 #[serde(default)]
 pub default: f64,
 #[serde(default)]
 pub step: Option<f64>,
 #[serde(default)]
 pub unit: Option<String>,
 #[serde(default)]
 pub display_format: Option<String>,
 #[serde(default)]
 pub max_param: Option<String>,
 #[serde(default)]
 pub options: Vec<String>,
}

impl ParameterDescriptor {
 /// Default acceleration step for the knob macro engine when the
 /// descriptor doesn't specify one.
 pub fn base_step(&self) -> f64 {
 self.step.unwrap_or(match self.param_type {
 ParamType::Float => 0.0015,
 ParamType::Int | ParamType::Enum => 1.0,
 })
 }

 pub fn option_count(&self) -> usize {
 self.options.len()
 }

 /// Resolve the dynamic max: the referenced param's current value when
 /// `max_param` is set, otherwise the descriptor's own `max` (or the
 /// enum option count minus one, or `f64::MAX` for an unbounded float).
 pub fn resolve_max(&self, current_values: &HashMap<String, f64>) -> f64 {
 if let Some(ref max_param) = self.max_param {
 if let Some(v) = current_values.get(max_param) {
 return *v;
 }
 }
 if let Some(max) = self.max {
 return max;
 }
 if self.param_type == ParamType::Enum && !self.options.is_empty() {
 return (self.options.len() - 1) as f64;
 }
 f64::MAX
 }

 pub fn resolve_min(&self) -> f64 {
 self.min.unwrap_or(0.0)
 }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Capabilities {
 #[serde(default)]
 pub default_forward_channel: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct UiLevel {
 #[serde(default)]
 params: Vec<ParameterDescriptor>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct UiHierarchy {
 #[serde(default)]
 shared_params: Vec<ParameterDescriptor>,
 #[serde(default)]
 levels: HashMap<String, UiLevel>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawModuleDescriptor {
 #[serde(default)]
 capabilities: Capabilities,
 #[serde(default)]
 raw_midi: bool,
 #[serde(default)]
 ui_hierarchy: Option<UiHierarchy>,
 #[serde(default)]
 chain_params: Vec<ParameterDescriptor>,
}

/// The parsed `module.json`, with a flat, validated parameter table
/// regardless of whether the source used `ui_hierarchy` or `chain_params`.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
 pub capabilities: Capabilities,
 pub raw_midi: bool,
 pub params: Vec<ParameterDescriptor>,
 by_key: HashMap<String, usize>,
}

impl ModuleDescriptor {
 pub fn parse(json: &str) -> Result<Self> {
 let raw: RawModuleDescriptor = serde_json::from_str(json)?;

 let mut params = Vec::new();
 if let Some(hierarchy) = &raw.ui_hierarchy {
 params.extend(hierarchy.shared_params.iter().cloned());
 for level in hierarchy.levels.values() {
 params.extend(level.params.iter().cloned());
 }
 }
 if params.is_empty() {
 params.extend(raw.chain_params.iter().cloned());
 }

 let mut by_key = HashMap::with_capacity(params.len());
 for (idx, param) in params.iter().enumerate() {
 if by_key.insert(param.key.clone(), idx).is_some() {
 return Err(PluginError::DuplicateKey(param.key.clone()));
 }
 }

 Ok(Self {
 capabilities: raw.capabilities,
 raw_midi: raw.raw_midi,
 params,
 by_key,
 })
 }

 pub fn get(&self, key: &str) -> Option<&ParameterDescriptor> {
 self.by_key.get(key).map(|&idx| &self.params[idx])
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn parses_legacy_chain_params() {
 let json = r#"{
 "capabilities": { "default_forward_channel": 1 },
 "chain_params": [
 { "key": "gain", "type": "float", "min": 0.0, "max": 1.0, "default": 0.5, "step": 0.01 }
 ]
 }"#;
 let desc = ModuleDescriptor::parse(json).unwrap();
 assert_eq!(desc.params.len(), 1);
 assert_eq!(desc.get("gain").unwrap().base_step(), 0.01);
 assert_eq!(desc.capabilities.default_forward_channel, Some(1));
 }

 #[test]
 fn prefers_ui_hierarchy_over_legacy() {
 let json = r#"{
 "capabilities": {},
 "ui_hierarchy": {
 "shared_params": [{ "key": "cutoff", "type": "float", "default": 1000.0 }],
 "levels": { "main": { "params": [{ "key": "res", "type": "float", "default": 0.1 }] } }
 },
 "chain_params": [{ "key": "unused", "type": "int", "default": 0 }]
 }"#;
 let desc = ModuleDescriptor::parse(json).unwrap();
 let keys: Vec<_> = desc.params.iter().map(|p| p.key.as_str()).collect();
 assert!(keys.contains(&"cutoff"));
 assert!(keys.contains(&"res"));
 assert!(!keys.contains(&"unused"));
 }

 #[test]
 fn rejects_duplicate_keys() {
 let json = r#"{
 "capabilities": {},
 "chain_params": [
 { "key": "gain", "type": "float", "default": 0.0 },
 { "key": "gain", "type": "float", "default": 1.0 }
 ]
 }"#;
 assert!(matches!(
 ModuleDescriptor::parse(json),
 Err(PluginError::DuplicateKey(_))
 ));
 }

 #[test]
 fn default_step_depends_on_type() {
 let float_param = ParameterDescriptor {
 key: "f".into(),
 name: None,
 param_type: ParamType::Float,
 min: None,
 max: None,
 default: 0.0,
 step: None,
 unit: None,
 display_format: None,
 max_param: None,
 options: Vec::new(),
 };
 assert_eq!(float_param.base_step(), 0.0015);

 let mut int_param = float_param.clone();
 int_param.param_type = ParamType::Int;
 assert_eq!(int_param.base_step(), 1.0);
 }

 #[test]
 fn dynamic_max_reads_referenced_param() {
 let param = ParameterDescriptor {
 key: "cutoff".into(),
 name: None,
 param_type: ParamType::Float,
 min: Some(0.0),
 max: Some(20000.0),
 default: 0.0,
 step: None,
 unit: None,
 display_format: None,
 max_param: Some("nyquist".into()),
 options: Vec::new(),
 };
 let mut current = HashMap::new();
 current.insert("nyquist".to_string(), 22050.0);
 assert_eq!(param.resolve_max(&current), 22050.0);
 }

 #[test]
 fn enum_option_count_bounds_max_without_explicit_max() {
 let param = ParameterDescriptor {
 key: "wave".into(),
 name: None,
 param_type: ParamType::Enum,
 min: None,
 max: None,
 default: 0.0,
 step: None,
 unit: None,
 display_format: None,
 max_param: None,
 options: vec!["sine".into(), "saw".into(), "square".into()],
 };
 assert_eq!(param.resolve_max(&HashMap::new()), 2.0);
 }
}

//! The on-disk patch JSON schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_input() -> String {
 "both".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
 pub name: String,
 pub version: u32,
 pub chain: ChainBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainBody {
 pub synth: SynthSlot,
 #[serde(default)]
 pub audio_fx: Vec<AudioFxSlot>,
 #[serde(default)]
 pub midi_fx: Vec<MidiFxSlot>,
 #[serde(default, skip_serializing_if = "Vec::is_empty")]
 pub midi_fx_js: Vec<String>,
 #[serde(default, skip_serializing_if = "Option::is_none")]
 pub midi_source_module: Option<String>,
 #[serde(default = "default_input")]
 pub input: String,
 #[serde(default)]
 pub knob_mappings: Vec<KnobMappingEntry>,
 #[serde(default, skip_serializing_if = "Option::is_none")]
 pub receive_channel: Option<i8>,
 #[serde(default, skip_serializing_if = "Option::is_none")]
 pub forward_channel: Option<i8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthSlot {
 pub module: String,
 #[serde(default)]
 pub preset: i32,
 #[serde(default, skip_serializing_if = "Option::is_none")]
 pub config: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFxSlot {
 #[serde(rename = "type")]
 pub module: String,
 #[serde(default, skip_serializing_if = "Option::is_none")]
 pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiFxSlot {
 #[serde(rename = "type")]
 pub module: String,
 #[serde(flatten)]
 pub params: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnobMappingEntry {
 pub cc: u8,
 pub target: String,
 pub param: String,
 #[serde(default, skip_serializing_if = "Option::is_none")]
 pub value: Option<f64>,
}

impl ChainBody {
 /// `cc ∈ [71,78]`, `target` one of the six known selectors.
 pub fn validate(&self) -> Result<(), String> {
 const VALID_TARGETS: &[&str] =
 &["synth", "fx1", "fx2", "fx3", "midi_fx1", "midi_fx2"];
 for mapping in &self.knob_mappings {
 if !(71..=78).contains(&mapping.cc) {
 return Err(format!("knob mapping cc {} out of range [71,78]", mapping.cc));
 }
 if !VALID_TARGETS.contains(&mapping.target.as_str()) {
 return Err(format!("knob mapping target {:?} is not a known selector", mapping.target));
 }
 }
 if self.audio_fx.len() > 3 {
 return Err("at most three audio_fx entries allowed".into());
 }
 if self.midi_fx.len() > 2 {
 return Err("at most two midi_fx entries allowed".into());
 }
 Ok(())
 }
}

impl Patch {
 pub fn parse(json: &str) -> serde_json::Result<Self> {
 serde_json::from_str(json)
 }

 pub fn to_json_pretty(&self) -> serde_json::Result<String> {
 serde_json::to_string_pretty(self)
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn input_defaults_to_both_when_absent() {
 let json = r#"{
 "name": "lead",
 "version": 1,
 "chain": { "synth": { "module": "synth_a", "preset": 0 } }
 }"#;
 let patch = Patch::parse(json).unwrap();
 assert_eq!(patch.chain.input, "both");
 }

 #[test]
 fn rejects_knob_mapping_cc_out_of_range() {
 let mut chain = ChainBody {
 synth: SynthSlot { module: "a".into(), preset: 0, config: None },
 audio_fx: vec![],
 midi_fx: vec![],
 midi_fx_js: vec![],
 midi_source_module: None,
 input: "both".into(),
 knob_mappings: vec![KnobMappingEntry { cc: 90, target: "synth".into(), param: "cutoff".into(), value: None }],
 receive_channel: None,
 forward_channel: None,
 };
 assert!(chain.validate().is_err());
 chain.knob_mappings[0].cc = 71;
 assert!(chain.validate().is_ok());
 }

 #[test]
 fn round_trips_through_json() {
 let json = r#"{
 "name": "pad stack",
 "version": 1,
 "chain": {
 "synth": { "module": "synth_a", "preset": 3, "config": { "state": { "cutoff": 0.5 } } },
 "audio_fx": [ { "type": "reverb", "params": { "wet": 0.3, "state": {} } } ],
 "midi_fx": [ { "type": "arp", "rate": "1/16" } ],
 "midi_source_module": "pad_seq",
 "input": "pads",
 "knob_mappings": [ { "cc": 71, "target": "synth", "param": "cutoff" } ]
 }
 }"#;
 let patch = Patch::parse(json).unwrap();
 assert_eq!(patch.chain.audio_fx.len(), 1);
 assert_eq!(patch.chain.midi_fx[0].params.get("rate").unwrap(), "1/16");
 let reserialized = patch.to_json_pretty().unwrap();
 let roundtrip = Patch::parse(&reserialized).unwrap();
 assert_eq!(roundtrip.name, patch.name);
 }
}

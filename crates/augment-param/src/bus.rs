//! The prefix-routed parameter bus.

use augment_plugin::ParameterDescriptor;

/// Which part of a chain a parameter string addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamTarget {
 Synth,
 AudioFx(u8),
 MidiFx(u8),
 Source,
 Slot,
 Patch,
 /// The quantized sampler's read-only state surface (`sampler:state`,
 /// `sampler:source`, `sampler:duration_index`, `sampler:bpm`), queried
 /// through this bus rather than a separate channel.
 Sampler,
 /// Unprefixed chain-level command.
 Chain,
}

/// Split a `"prefix:KEY"` string into its routing target and key, per the
/// prefix table in. Unprefixed strings route to `Chain` with the
/// whole string as the key (these are parsed further by the chain-command
/// dispatcher, not here).
pub fn route(param: &str) -> (ParamTarget, &str) {
 if let Some(rest) = param.strip_prefix("synth:") {
 return (ParamTarget::Synth, rest);
 }
 if let Some(rest) = param.strip_prefix("source:") {
 return (ParamTarget::Source, rest);
 }
 if let Some(rest) = param.strip_prefix("slot:") {
 return (ParamTarget::Slot, rest);
 }
 if let Some(rest) = param.strip_prefix("patch:") {
 return (ParamTarget::Patch, rest);
 }
 if let Some(rest) = param.strip_prefix("sampler:") {
 return (ParamTarget::Sampler, rest);
 }
 for n in 1..=3u8 {
 let prefix = format!("fx{n}:");
 if let Some(rest) = param.strip_prefix(prefix.as_str()) {
 return (ParamTarget::AudioFx(n), rest);
 }
 }
 for n in 1..=2u8 {
 let prefix = format!("midi_fx{n}:");
 if let Some(rest) = param.strip_prefix(prefix.as_str()) {
 return (ParamTarget::MidiFx(n), rest);
 }
 }
 (ParamTarget::Chain, param)
}

/// Strict float parse used to decide whether a written value should become
/// a smoothing target: a bare integer-looking string (`"3"`) is *not*
/// treated as numeric for smoothing purposes, only a value that actually
/// carries a fractional form (`"3.0"`, `"3.5"`) is").
pub fn parse_numeric_target(value: &str) -> Option<f64> {
 let trimmed = value.trim();
 if trimmed.is_empty() {
 return None;
 }
 if !trimmed.contains('.') && !trimmed.contains('e') && !trimmed.contains('E') {
 return None;
 }
 trimmed.parse::<f64>().ok()
}

/// Convert a plugin `get_param` return value to a float per 's
/// read contract: numeric strings parse directly; enum-valued strings are
/// looked up by position in the descriptor's `options`; anything else
/// falls back to `fallback`.
pub fn dsp_value_to_float(raw: &str, descriptor: Option<&ParameterDescriptor>, fallback: f64) -> f64 {
 if let Ok(v) = raw.trim().parse::<f64>() {
 return v;
 }
 if let Some(descriptor) = descriptor {
 if let Some(idx) = descriptor.options.iter().position(|opt| opt == raw) {
 return idx as f64;
 }
 }
 fallback
}

#[cfg(test)]
mod tests {
 use super::*;
 use augment_plugin::ParamType;

 #[test]
 fn routes_known_prefixes() {
 assert_eq!(route("synth:cutoff"), (ParamTarget::Synth, "cutoff"));
 assert_eq!(route("fx1:wet"), (ParamTarget::AudioFx(1), "wet"));
 assert_eq!(route("fx3:wet"), (ParamTarget::AudioFx(3), "wet"));
 assert_eq!(route("midi_fx2:rate"), (ParamTarget::MidiFx(2), "rate"));
 assert_eq!(route("slot:volume"), (ParamTarget::Slot, "volume"));
 assert_eq!(route("patch:name"), (ParamTarget::Patch, "name"));
 assert_eq!(route("source:channel"), (ParamTarget::Source, "channel"));
 assert_eq!(route("sampler:bpm"), (ParamTarget::Sampler, "bpm"));
 }

 #[test]
 fn unprefixed_routes_to_chain() {
 assert_eq!(route("next_patch"), (ParamTarget::Chain, "next_patch"));
 }

 #[test]
 fn numeric_target_requires_fractional_form() {
 assert_eq!(parse_numeric_target("3"), None);
 assert_eq!(parse_numeric_target("3.0"), Some(3.0));
 assert_eq!(parse_numeric_target("3.5"), Some(3.5));
 assert_eq!(parse_numeric_target("abc"), None);
 assert_eq!(parse_numeric_target("1e3"), Some(1000.0));
 }

 #[test]
 fn dsp_value_parses_numeric_strings() {
 assert_eq!(dsp_value_to_float("0.75", None, -1.0), 0.75);
 }

 #[test]
 fn dsp_value_resolves_enum_option_index() {
 let descriptor = ParameterDescriptor {
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
 assert_eq!(dsp_value_to_float("saw", Some(&descriptor), -1.0), 1.0);
 assert_eq!(dsp_value_to_float("triangle", Some(&descriptor), -1.0), -1.0);
 }
}

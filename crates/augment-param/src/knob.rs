//! Knob macro engine: relative-encoder CC events mapped to parameter
//! deltas with velocity-proportional acceleration.
//!
//! Grounded on `tutti-midi-io::cc_mapping::CCMapping` (CC-number-to-target
//! mapping with a `matches`/`map_value` shape), generalized here to the
//! the design's relative-encoder (+1/-1) semantics and timing-based acceleration
//! instead of the teacher's absolute 0..127-to-range linear map.

use augment_plugin::{ParamType, ParameterDescriptor};
use std::time::{Duration, Instant};

pub const KNOB_CC_MIN: u8 = 71;
pub const KNOB_CC_MAX: u8 = 78;

const ACCEL_MIN_MULT: f64 = 1.0;
const ACCEL_MAX_MULT_FLOAT: f64 = 8.0;
const ACCEL_MAX_MULT_INT: f64 = 3.0;
const SLOW_MS: f64 = 150.0;
const FAST_MS: f64 = 25.0;

/// +1 for CC value 1, -1 for CC value 127, `None` for anything else
/// (spec: "Value 1 means +1 step; value 127 means −1; other values are
/// ignored").
pub fn direction_for_cc_value(value: u8) -> Option<i8> {
 match value {
 1 => Some(1),
 127 => Some(-1),
 _ => None,
 }
}

fn accel_max_mult(param_type: ParamType) -> f64 {
 match param_type {
 ParamType::Float => ACCEL_MAX_MULT_FLOAT,
 ParamType::Int | ParamType::Enum => ACCEL_MAX_MULT_INT,
 }
}

/// Velocity-proportional acceleration multiplier for the elapsed time
/// since the previous knob tick on this mapping.
pub fn acceleration(elapsed: Duration, param_type: ParamType) -> f64 {
 let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
 let max_mult = accel_max_mult(param_type);

 if elapsed_ms >= SLOW_MS {
 return ACCEL_MIN_MULT;
 }
 if elapsed_ms <= FAST_MS {
 return max_mult;
 }

 let t = (SLOW_MS - elapsed_ms) / (SLOW_MS - FAST_MS);
 ACCEL_MIN_MULT + t * (max_mult - ACCEL_MIN_MULT)
}

fn format_value(value: f64, param_type: ParamType) -> String {
 match param_type {
 ParamType::Float => format!("{:.3}", value),
 ParamType::Int | ParamType::Enum => format!("{}", value.round() as i64),
 }
}

/// A CC mapping table entry. `last_tick` is kept
/// for acceleration but is never persisted (spec: "A per-mapping timestamp
/// is kept for acceleration but is not persisted").
#[derive(Debug, Clone)]
pub struct KnobMapping {
 pub cc: u8,
 pub target: String,
 pub param: String,
 pub current_value: f64,
 last_tick: Option<Instant>,
}

impl KnobMapping {
 pub fn new(cc: u8, target: impl Into<String>, param: impl Into<String>, value: f64) -> Self {
 Self {
 cc,
 target: target.into(),
 param: param.into(),
 current_value: value,
 last_tick: None,
 }
 }

 /// Apply one relative-encoder CC event, returning the new formatted
 /// value to push through `set_param`, or `None` if the CC value isn't
 /// a relative-encoder tick or the descriptor lookup failed (the caller
 /// is expected to have already failed the lookup before calling this).
 pub fn apply_cc(&mut self, cc_value: u8, descriptor: &ParameterDescriptor, now: Instant) -> Option<String> {
 let direction = direction_for_cc_value(cc_value)?;

 let elapsed = match self.last_tick {
 Some(prev) => now.saturating_duration_since(prev),
 None => Duration::from_millis(SLOW_MS as u64),
 };
 self.last_tick = Some(now);

 let accel = acceleration(elapsed, descriptor.param_type);
 let base_step = descriptor.base_step();
 let delta = direction as f64 * base_step * accel;

 let min = descriptor.resolve_min();
 let max = descriptor.resolve_max(&std::collections::HashMap::new());
 let mut new_value = self.current_value + delta;
 new_value = new_value.clamp(min, max);

 if matches!(descriptor.param_type, ParamType::Int | ParamType::Enum) {
 new_value = new_value.round();
 }

 self.current_value = new_value;
 Some(format_value(new_value, descriptor.param_type))
 }
}

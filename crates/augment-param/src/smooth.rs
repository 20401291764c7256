//! Per-parameter one-pole smoothing, advanced once per audio block.
//!
//! Grounded on `tutti-core::smooth::SmoothedValue`, but deliberately
//! different in one respect the design calls out explicitly (§9,
//! "Smoothing interaction with hierarchy read-modify-write"): the
//! *readable* value must jump to a new target immediately so a UI that
//! reads right after writing never observes a lagged value. Only the
//! value driven into the plugin between block boundaries interpolates.
//! The teacher's per-sample linear ramp is replaced with a per-block
//! one-pole IIR at a fixed coefficient, matching 's
//! "coefficient ≈0.15 per block".

const SMOOTH_COEFF: f64 = 0.15;
const SNAP_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct SmoothedParam {
 /// The last value written — what a read observes immediately.
 target: f64,
 /// The interpolated value actually pushed into the plugin each block.
 output: f64,
 active: bool,
}

impl SmoothedParam {
 pub fn new(initial: f64) -> Self {
 Self {
 target: initial,
 output: initial,
 active: false,
 }
 }

 /// Commit a new target. The caller is responsible for also passing the
 /// raw value straight through to the plugin: this only
 /// arms the cosmetic interpolation that follows.
 pub fn set_target(&mut self, target: f64) {
 self.target = target;
 if (self.target - self.output).abs() < SNAP_EPSILON {
 self.output = self.target;
 self.active = false;
 } else {
 self.active = true;
 }
 }

 /// What a `get_param`-style read should report: always the latest
 /// write, never the lagged interpolated value.
 pub fn current_for_read(&self) -> f64 {
 self.target
 }

 /// Advance the one-pole filter by one block and return the value to
 /// push into the plugin this block. Idle (non-active) smoothers just
 /// return the settled value without doing any work.
 pub fn tick_block(&mut self) -> f64 {
 if !self.active {
 return self.output;
 }
 self.output += SMOOTH_COEFF * (self.target - self.output);
 if (self.target - self.output).abs() < SNAP_EPSILON {
 self.output = self.target;
 self.active = false;
 }
 self.output
 }

 pub fn is_active(&self) -> bool {
 self.active
 }
}

/// Per-instance smoothing state: up to 16 float-typed parameter targets
/// smoothed independently.
#[derive(Debug, Clone, Default)]
pub struct SmoothingState {
 targets: std::collections::HashMap<String, SmoothedParam>,
}

const MAX_SMOOTHED_TARGETS: usize = 16;

impl SmoothingState {
 pub fn new() -> Self {
 Self::default()
 }

 /// Register or retarget a smoothing target for `key`. No-ops once 16
 /// distinct keys are already tracked (spec: "up to 16 targets per
 /// instance").
 pub fn set_target(&mut self, key: &str, value: f64) {
 if let Some(existing) = self.targets.get_mut(key) {
 existing.set_target(value);
 return;
 }
 if self.targets.len() >= MAX_SMOOTHED_TARGETS {
 return;
 }
 let mut param = SmoothedParam::new(value);
 param.set_target(value);
 self.targets.insert(key.to_string(), param);
 }

 pub fn current_for_read(&self, key: &str) -> Option<f64> {
 self.targets.get(key).map(|p| p.current_for_read())
 }

 /// Advance every tracked target by one block, returning `(key, value)`
 /// pairs to push back through the plugin's `set_param`.
 pub fn tick_block(&mut self) -> Vec<(String, f64)> {
 self.targets
.iter_mut()
.filter(|(_, p)| p.is_active())
.map(|(k, p)| (k.clone(), p.tick_block()))
.collect()
 }

 pub fn is_idle(&self) -> bool {
 self.targets.values().all(|p| !p.is_active())
 }

 pub fn reset(&mut self) {
 self.targets.clear();
 }
}

//! Tempo-fallback chain and MIDI-clock BPM measurement.
//! Grounded on `tutti-core`'s transport/clock types, generalized from a
//! single authoritative clock to a prioritized fallback chain.

const TICKS_PER_BEAT: u32 = 24;
const DEFAULT_BPM: f64 = 120.0;

/// Ticks a freshly started clock must see before it is trusted, rather
/// than a newly resumed clock's first, possibly jittery, beat.
const CONFIDENCE_WINDOW_TICKS: u32 = 24;

/// Tracks a running MIDI clock: counts ticks into 24-tick beats and
/// recomputes BPM from the wall-clock time of each beat boundary. A
/// rolling average over the last beat's inter-tick intervals smooths the
/// measurement, and the clock is not trusted (`is_confident`) until it
/// has seen a full confidence window of ticks since the last start.
pub struct MidiClockTracker {
 running: bool,
 has_run: bool,
 ticks_in_beat: u32,
 ticks_since_start: u32,
 last_beat_at: Option<std::time::Instant>,
 last_tick_at: Option<std::time::Instant>,
 interval_sum: f64,
 interval_count: u32,
 measured_bpm: f64,
 last_known_bpm: f64,
}

impl Default for MidiClockTracker {
 fn default() -> Self {
 Self {
 running: false,
 has_run: false,
 ticks_in_beat: 0,
 ticks_since_start: 0,
 last_beat_at: None,
 last_tick_at: None,
 interval_sum: 0.0,
 interval_count: 0,
 measured_bpm: DEFAULT_BPM,
 last_known_bpm: DEFAULT_BPM,
 }
 }
}

impl MidiClockTracker {
 pub fn new() -> Self {
 Self::default()
 }

 pub fn is_running(&self) -> bool {
 self.running
 }

 /// Whether enough ticks have elapsed since the last start for
 /// `measured_bpm` to be trusted rather than a single jittery beat.
 pub fn is_confident(&self) -> bool {
 self.running && self.ticks_since_start >= CONFIDENCE_WINDOW_TICKS
 }

 pub fn measured_bpm(&self) -> f64 {
 self.measured_bpm
 }

 pub fn last_known_bpm(&self) -> f64 {
 self.last_known_bpm
 }

 /// MIDI Start (0xFA): begins the running clock and resets counters.
 pub fn start(&mut self, now: std::time::Instant) {
 self.running = true;
 self.has_run = true;
 self.ticks_in_beat = 0;
 self.ticks_since_start = 0;
 self.last_beat_at = Some(now);
 self.last_tick_at = None;
 self.interval_sum = 0.0;
 self.interval_count = 0;
 }

 /// MIDI Stop (0xFC): the clock is no longer running; the last measured
 /// BPM is retained as `last_known_bpm` for the fallback chain.
 pub fn stop(&mut self) {
 self.running = false;
 self.last_known_bpm = self.measured_bpm;
 }

 /// MIDI clock tick (0xF8): accumulates a rolling average of inter-tick
 /// intervals over the current beat and, every 24 ticks, recomputes BPM
 /// from that average rather than from a single elapsed span.
 pub fn tick(&mut self, now: std::time::Instant) {
 if !self.running {
 return;
 }
 self.ticks_since_start = self.ticks_since_start.saturating_add(1);

 if let Some(last_tick) = self.last_tick_at {
 let interval = now.duration_since(last_tick).as_secs_f64();
 if interval > 0.0 {
 self.interval_sum += interval;
 self.interval_count += 1;
 }
 }
 self.last_tick_at = Some(now);

 self.ticks_in_beat += 1;
 if self.ticks_in_beat >= TICKS_PER_BEAT {
 self.ticks_in_beat = 0;
 if self.interval_count > 0 {
 let avg_tick_interval = self.interval_sum / self.interval_count as f64;
 self.measured_bpm = 60.0 / (avg_tick_interval * TICKS_PER_BEAT as f64);
 self.last_known_bpm = self.measured_bpm;
 } else if let Some(last) = self.last_beat_at {
 let elapsed = now.duration_since(last).as_secs_f64();
 if elapsed > 0.0 {
 self.measured_bpm = 60.0 / elapsed;
 self.last_known_bpm = self.measured_bpm;
 }
 }
 self.interval_sum = 0.0;
 self.interval_count = 0;
 self.last_beat_at = Some(now);
 }
 }
}

/// The tempo sources consulted in order, first match wins.
/// A running clock that has not yet cleared its confidence window is not
/// trusted ahead of an explicitly set tempo, matching the original's
/// reluctance to jump to a freshly started clock's first reading.
pub struct TempoFallback<'a> {
 pub clock: &'a MidiClockTracker,
 pub set_tempo_bpm: Option<f64>,
 pub settings_tempo_bpm: Option<f64>,
}

impl<'a> TempoFallback<'a> {
 pub fn resolve(&self) -> f64 {
 if self.clock.is_confident() {
 return self.clock.measured_bpm();
 }
 if let Some(bpm) = self.set_tempo_bpm {
 return bpm;
 }
 if self.clock.is_running() {
 return self.clock.measured_bpm();
 }
 if self.clock.has_run {
 return self.clock.last_known_bpm();
 }
 if let Some(bpm) = self.settings_tempo_bpm {
 return bpm;
 }
 DEFAULT_BPM
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use approx::assert_relative_eq;
 use std::time::{Duration, Instant};

 #[test]
 fn running_clock_takes_priority() {
 let mut clock = MidiClockTracker::new();
 let t0 = Instant::now();
 clock.start(t0);
 for i in 1..=24 {
 clock.tick(t0 + Duration::from_millis(i * 20));
 }
 assert!(clock.is_running());
 let fallback = TempoFallback { clock: &clock, set_tempo_bpm: Some(90.0), settings_tempo_bpm: Some(80.0) };
 assert_relative_eq!(fallback.resolve(), clock.measured_bpm());
 }

 #[test]
 fn stopped_clock_falls_back_to_set_tempo() {
 let mut clock = MidiClockTracker::new();
 clock.start(Instant::now());
 clock.stop();
 let fallback = TempoFallback { clock: &clock, set_tempo_bpm: Some(140.0), settings_tempo_bpm: Some(80.0) };
 assert_relative_eq!(fallback.resolve(), 140.0);
 }

 #[test]
 fn never_started_falls_back_to_settings_then_default() {
 let clock = MidiClockTracker::new();
 let fallback = TempoFallback { clock: &clock, set_tempo_bpm: None, settings_tempo_bpm: Some(99.0) };
 assert_relative_eq!(fallback.resolve(), 99.0);

 let fallback_none = TempoFallback { clock: &clock, set_tempo_bpm: None, settings_tempo_bpm: None };
 assert_relative_eq!(fallback_none.resolve(), DEFAULT_BPM);
 }

 #[test]
 fn freshly_started_clock_is_not_confident_before_the_window_clears() {
 let mut clock = MidiClockTracker::new();
 let t0 = Instant::now();
 clock.start(t0);
 for i in 1..=10 {
 clock.tick(t0 + Duration::from_millis(i * 20));
 }
 assert!(clock.is_running());
 assert!(!clock.is_confident());
 }

 #[test]
 fn unconfident_running_clock_prefers_an_explicit_set_tempo() {
 let mut clock = MidiClockTracker::new();
 let t0 = Instant::now();
 clock.start(t0);
 clock.tick(t0 + Duration::from_millis(20));
 let fallback = TempoFallback { clock: &clock, set_tempo_bpm: Some(100.0), settings_tempo_bpm: None };
 assert_relative_eq!(fallback.resolve(), 100.0);
 }

 #[test]
 fn confidence_clears_exactly_at_the_window_boundary() {
 let mut clock = MidiClockTracker::new();
 let t0 = Instant::now();
 clock.start(t0);
 for i in 1..24 {
 clock.tick(t0 + Duration::from_millis(i * 20));
 }
 assert!(!clock.is_confident());
 clock.tick(t0 + Duration::from_millis(24 * 20));
 assert!(clock.is_confident());
 }
}

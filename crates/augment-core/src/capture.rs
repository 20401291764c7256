//! Capture rules: the 128-bit note and CC bitmaps a patch declares it
//! consumes when focused, with named-group expansion.

/// A 128-bit note bitmap plus a 128-bit CC bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureRules {
 notes: u128,
 ccs: u128,
}

/// Named ranges that expand into a `CaptureRules` note range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteGroup {
 Pads,
 Steps,
 Tracks,
 Jog,
}

impl NoteGroup {
 /// Inclusive `(low, high)` note range for the group.
 pub const fn range(self) -> (u8, u8) {
 match self {
 NoteGroup::Pads => (36, 67),
 NoteGroup::Steps => (16, 31),
 NoteGroup::Tracks => (0, 7),
 NoteGroup::Jog => (8, 15),
 }
 }
}

/// Named group for a CC bitmap (the engine's own knob macros occupy 71..=78;
/// "knobs" names that range so a patch can opt out of intercepting them).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcGroup {
 Knobs,
}

impl CcGroup {
 pub const fn range(self) -> (u8, u8) {
 match self {
 CcGroup::Knobs => (71, 78),
 }
 }
}

impl CaptureRules {
 pub const fn empty() -> Self {
 Self { notes: 0, ccs: 0 }
 }

 pub fn with_note(mut self, note: u8) -> Self {
 self.set_note(note);
 self
 }

 pub fn with_note_group(mut self, group: NoteGroup) -> Self {
 self.add_note_group(group);
 self
 }

 pub fn with_cc_group(mut self, group: CcGroup) -> Self {
 self.add_cc_group(group);
 self
 }

 pub fn set_note(&mut self, note: u8) {
 if note < 128 {
 self.notes |= 1u128 << note;
 }
 }

 pub fn set_cc(&mut self, cc: u8) {
 if cc < 128 {
 self.ccs |= 1u128 << cc;
 }
 }

 pub fn add_note_group(&mut self, group: NoteGroup) {
 let (low, high) = group.range();
 for note in low..=high {
 self.set_note(note);
 }
 }

 pub fn add_cc_group(&mut self, group: CcGroup) {
 let (low, high) = group.range();
 for cc in low..=high {
 self.set_cc(cc);
 }
 }

 pub fn captures_note(&self, note: u8) -> bool {
 note < 128 && (self.notes & (1u128 << note)) != 0
 }

 pub fn captures_cc(&self, cc: u8) -> bool {
 cc < 128 && (self.ccs & (1u128 << cc)) != 0
 }

 pub fn note_bits(&self) -> u128 {
 self.notes
 }

 pub fn cc_bits(&self) -> u128 {
 self.ccs
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn single_note_round_trips() {
 let rules = CaptureRules::empty().with_note(60);
 assert!(rules.captures_note(60));
 assert!(!rules.captures_note(61));
 }

 #[test]
 fn note_group_expands_to_named_range() {
 let rules = CaptureRules::empty().with_note_group(NoteGroup::Steps);
 assert!(rules.captures_note(16));
 assert!(rules.captures_note(31));
 assert!(!rules.captures_note(32));
 assert!(!rules.captures_note(15));
 }

 #[test]
 fn cc_group_expands_to_knob_range() {
 let rules = CaptureRules::empty().with_cc_group(CcGroup::Knobs);
 for cc in 71..=78 {
 assert!(rules.captures_cc(cc));
 }
 assert!(!rules.captures_cc(70));
 assert!(!rules.captures_cc(79));
 }

 #[test]
 fn out_of_range_values_are_ignored() {
 let mut rules = CaptureRules::empty();
 rules.set_note(200);
 rules.set_cc(200);
 assert_eq!(rules.note_bits(), 0);
 assert_eq!(rules.cc_bits(), 0);
 }
}

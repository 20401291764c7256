//! The audio mailbox: a fixed-size shared byte region the host firmware and
//! the augmentation layer both read and write once per audio block.
//!
//! Layout: a control header, a stereo interleaved i16 *output* region at a
//! fixed byte offset, and a stereo interleaved i16 *input* region at a
//! different fixed byte offset. Grounded on `tutti-plugin`'s
//! `SharedAudioBuffer` (`shared_memory.rs`): an `UnsafeCell`-wrapped
//! `memmap2::MmapMut`, since the mapped region is written from one side and
//! read from the other at the OS level and the normal aliasing rules do not
//! apply to hardware-shared memory.

use crate::error::{Error, Result};
use memmap2::MmapMut;
use std::cell::UnsafeCell;
use std::fs::OpenOptions;
use std::path::Path;

/// Byte layout of the mailbox region.
#[derive(Debug, Clone, Copy)]
pub struct MailboxLayout {
 pub control_bytes: usize,
 pub output_offset: usize,
 pub input_offset: usize,
 pub frames_per_block: usize,
}

impl MailboxLayout {
 /// Standard layout: a 64-byte control header immediately followed by
 /// the output region, then the input region, each `frames_per_block`
 /// stereo i16 frames (4 bytes/frame).
 pub fn standard(frames_per_block: usize) -> Self {
 let control_bytes = 64;
 let region_bytes = frames_per_block * 4;
 Self {
 control_bytes,
 output_offset: control_bytes,
 input_offset: control_bytes + region_bytes,
 frames_per_block,
 }
 }

 pub fn total_bytes(&self) -> usize {
 self.input_offset + self.frames_per_block * 4
 }

 fn region_bytes(&self) -> usize {
 self.frames_per_block * 4
 }
}

pub struct AudioMailbox {
 mmap: UnsafeCell<MmapMut>,
 layout: MailboxLayout,
}

// Safety: the audio thread is the sole writer of the output region and
// sole reader of the input region each block; the firmware side owns the
// opposite directions. No two augment-side call sites touch the mapping
// concurrently (enforced by the scheduler owning the single `AudioMailbox`).
unsafe impl Send for AudioMailbox {}
unsafe impl Sync for AudioMailbox {}

impl AudioMailbox {
 /// Open (and size, if newly created) a mailbox file backing the shared
 /// mapping. In production this path is a device node or tmpfs file the
 /// firmware also maps; in tests it is an ordinary file.
 pub fn open(path: &Path, layout: MailboxLayout) -> Result<Self> {
 let file = OpenOptions::new()
.read(true)
.write(true)
.create(true)
.open(path)
.map_err(Error::Io)?;
 file.set_len(layout.total_bytes() as u64).map_err(Error::Io)?;
 let mmap = unsafe { MmapMut::map_mut(&file) }
.map_err(|e| Error::Mailbox(format!("mmap failed: {e}")))?;
 Ok(Self {
 mmap: UnsafeCell::new(mmap),
 layout,
 })
 }

 fn bytes(&self) -> &[u8] {
 unsafe { &*self.mmap.get() }
 }

 #[allow(clippy::mut_from_ref)]
 fn bytes_mut(&self) -> &mut [u8] {
 unsafe { &mut *self.mmap.get() }
 }

 pub fn layout(&self) -> MailboxLayout {
 self.layout
 }

 /// Read one block of interleaved stereo i16 input samples into `out`.
 /// `out.len()` must equal `frames_per_block * 2`.
 pub fn read_input(&self, out: &mut [i16]) {
 let region = self.layout.region_bytes();
 let start = self.layout.input_offset;
 let src = &self.bytes()[start..start + region];
 for (i, chunk) in src.chunks_exact(2).enumerate() {
 out[i] = i16::from_le_bytes([chunk[0], chunk[1]]);
 }
 }

 /// Write one block of interleaved stereo i16 output samples from `src`.
 /// `src.len()` must equal `frames_per_block * 2`.
 pub fn write_output(&self, src: &[i16]) {
 let region = self.layout.region_bytes();
 let start = self.layout.output_offset;
 let dst = &mut self.bytes_mut()[start..start + region];
 for (i, sample) in src.iter().enumerate() {
 let bytes = sample.to_le_bytes();
 dst[i * 2] = bytes[0];
 dst[i * 2 + 1] = bytes[1];
 }
 }

 pub fn control_header(&self) -> &[u8] {
 &self.bytes()[..self.layout.control_bytes]
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn round_trips_a_block_of_samples() {
 let dir = tempfile::tempdir().unwrap();
 let path = dir.path().join("mailbox.bin");
 let layout = MailboxLayout::standard(4);
 let mailbox = AudioMailbox::open(&path, layout).unwrap();

 let input_block = [1i16, -1, 2, -2, 3, -3, 4, -4];
 // Simulate the firmware writing into the input region directly.
 {
 let region_start = layout.input_offset;
 let bytes = mailbox.bytes_mut();
 for (i, sample) in input_block.iter().enumerate() {
 let b = sample.to_le_bytes();
 bytes[region_start + i * 2] = b[0];
 bytes[region_start + i * 2 + 1] = b[1];
 }
 }

 let mut read_back = [0i16; 8];
 mailbox.read_input(&mut read_back);
 assert_eq!(read_back, input_block);

 let output_block = [10i16, -10, 20, -20, 30, -30, 40, -40];
 mailbox.write_output(&output_block);

 let region_start = layout.output_offset;
 let bytes = mailbox.bytes();
 for (i, expected) in output_block.iter().enumerate() {
 let got = i16::from_le_bytes([
 bytes[region_start + i * 2],
 bytes[region_start + i * 2 + 1],
 ]);
 assert_eq!(got, *expected);
 }
 }

 #[test]
 fn standard_layout_sizes_regions_by_frame_count() {
 let layout = MailboxLayout::standard(128);
 assert_eq!(layout.output_offset, 64);
 assert_eq!(layout.input_offset, 64 + 128 * 4);
 assert_eq!(layout.total_bytes(), 64 + 128 * 4 * 2);
 }
}

//! WAV file writing for captured i16 stereo audio. `hound` owns header
//! bookkeeping (placeholder sizes on create, rewritten on `finalize`),
//! which is the Rust-idiomatic equivalent of the manual header-rewrite
//! pass the design describes.

use crate::error::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub fn stereo_spec(sample_rate: u32) -> WavSpec {
 WavSpec {
 channels: 2,
 sample_rate,
 bits_per_sample: 16,
 sample_format: SampleFormat::Int,
 }
}

pub fn create_writer(path: &Path, sample_rate: u32) -> Result<WavWriter<BufWriter<File>>> {
 Ok(WavWriter::create(path, stereo_spec(sample_rate))?)
}

pub fn write_interleaved(writer: &mut WavWriter<BufWriter<File>>, samples: &[i16]) -> Result<()> {
 for &s in samples {
 writer.write_sample(s)?;
 }
 Ok(())
}

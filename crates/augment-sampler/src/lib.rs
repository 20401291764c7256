//! Quantized sampler and 30-second skipback recorder.

pub mod error;
pub mod ring;
pub mod sampler;
pub mod skipback;
pub mod tempo;
pub mod wav;

pub use error::{Result, SamplerError};
pub use ring::{stereo_ring, AudioRingConsumer, AudioRingProducer};
pub use sampler::{Phase, SampleSource, SamplerEngine, DEFAULT_DURATION_INDEX, DURATION_BARS};
pub use skipback::{SaveOutcome, SkipbackRecorder, SKIPBACK_SECONDS};
pub use tempo::{MidiClockTracker, TempoFallback};

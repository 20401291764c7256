//! Lock-free SPSC ring buffer carrying interleaved stereo i16 samples
//! between the audio thread (producer) and a writer thread (consumer).
//! Grounded on `tutti-sampler`'s capture/prefetch ring-buffer pair, swapped
//! from f32 mono-or-stereo frames to raw interleaved i16.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

pub struct AudioRingProducer {
 inner: HeapProd<i16>,
}

pub struct AudioRingConsumer {
 inner: HeapCons<i16>,
}

/// Builds a ring sized for `seconds` of interleaved stereo i16 audio at
/// `sample_rate`.
pub fn stereo_ring(sample_rate: f64, seconds: f64) -> (AudioRingProducer, AudioRingConsumer) {
 let capacity = ((sample_rate * seconds) as usize * 2).max(2);
 let rb = HeapRb::<i16>::new(capacity);
 let (prod, cons) = rb.split();
 (AudioRingProducer { inner: prod }, AudioRingConsumer { inner: cons })
}

impl AudioRingProducer {
 /// Pushes as many samples as there is room for; returns the count
 /// actually written.
 pub fn push_slice(&mut self, samples: &[i16]) -> usize {
 self.inner.push_slice(samples)
 }

 pub fn vacant_len(&self) -> usize {
 self.inner.vacant_len()
 }
}

impl AudioRingConsumer {
 pub fn pop_slice(&mut self, out: &mut [i16]) -> usize {
 self.inner.pop_slice(out)
 }

 pub fn occupied_len(&self) -> usize {
 self.inner.occupied_len()
 }
}

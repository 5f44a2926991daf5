//! Gapless playback scheduling for streamed audio chunks.
//!
//! Chunks arrive as raw 24 kHz mono PCM in arbitrary bursts; each one is
//! scheduled behind everything already queued via the `next_start` watermark,
//! so playback order always equals arrival order regardless of decode jitter.
//! A barge-in from the remote peer flushes everything at once.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::codec;

/// Sample rate of audio produced by the remote model.
pub const OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Most devices refuse 24 kHz mono; play stereo at 48 kHz and duplicate.
const DEVICE_SAMPLE_RATE: u32 = 48000;

/// Monotonic clock seam so scheduling stays testable without a device.
pub trait Clock: Send {
    /// Seconds since an arbitrary origin, never decreasing.
    fn now(&self) -> f64;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// One scheduled playback unit. Removed from the active set exactly once:
/// either pruned after its window passes or stopped by an interruption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledSource {
    pub start: f64,
    pub end: f64,
}

pub struct AudioScheduler {
    clock: Box<dyn Clock>,
    next_start: f64,
    active: Vec<ScheduledSource>,
    sink: Option<DeviceSink>,
}

impl AudioScheduler {
    /// Scheduler wired to the default output device. A machine with no
    /// playback device still gets correct bookkeeping; audio is
    /// supplementary, so sink failures are swallowed here once.
    pub fn with_device() -> Self {
        Self::new(Box::new(MonotonicClock::new()), DeviceSink::open())
    }

    pub fn new(clock: Box<dyn Clock>, sink: Option<DeviceSink>) -> Self {
        Self {
            clock,
            next_start: 0.0,
            active: Vec::new(),
            sink,
        }
    }

    /// Schedule one decoded PCM chunk to begin at `max(next_start, now)` and
    /// advance the watermark past it. Returns the scheduled start time.
    pub fn enqueue(&mut self, pcm: &[u8]) -> f64 {
        self.prune();
        let samples = codec::pcm16_samples(pcm);
        if samples.is_empty() {
            return self.next_start;
        }
        let duration = samples.len() as f64 / OUTPUT_SAMPLE_RATE as f64;
        let start = self.next_start.max(self.clock.now());
        self.active.push(ScheduledSource {
            start,
            end: start + duration,
        });
        self.next_start = start + duration;
        if let Some(sink) = &self.sink {
            sink.push(pcm);
        }
        start
    }

    /// Barge-in: stop every active source immediately and rewind the
    /// watermark so the next chunk starts at the current clock time rather
    /// than a stale future offset.
    pub fn interrupt(&mut self) {
        if let Some(sink) = &self.sink {
            sink.flush();
        }
        self.active.clear();
        self.next_start = 0.0;
    }

    /// Sources whose playback window has passed complete naturally.
    fn prune(&mut self) {
        let now = self.clock.now();
        self.active.retain(|s| s.end > now);
    }

    pub fn active_count(&mut self) -> usize {
        self.prune();
        self.active.len()
    }

    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    #[cfg(test)]
    fn active_sources(&self) -> &[ScheduledSource] {
        &self.active
    }
}

/// Device sink: a cpal output stream pulling from a shared queue of
/// normalized samples.
pub struct DeviceSink {
    _stream: cpal::Stream,
    queue: Arc<Mutex<VecDeque<f32>>>,
}

impl DeviceSink {
    /// Open the default output device, preferring f32 with an i16 fallback.
    /// Returns None when no usable device exists.
    pub fn open() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;

        let queue: Arc<Mutex<VecDeque<f32>>> = Arc::new(Mutex::new(VecDeque::new()));
        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: DEVICE_SAMPLE_RATE,
            buffer_size: cpal::BufferSize::Default,
        };

        let queue_f32 = queue.clone();
        let stream = match device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut buf = queue_f32.lock().unwrap();
                for frame in data.chunks_mut(2) {
                    let sample = buf.pop_front().unwrap_or(0.0);
                    for out in frame {
                        *out = sample;
                    }
                }
            },
            |err| eprintln!("[Playback] Stream error: {}", err),
            None,
        ) {
            Ok(stream) => Some(stream),
            Err(e) => {
                eprintln!("[Playback] f32 stream unavailable: {}", e);
                let queue_i16 = queue.clone();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            let mut buf = queue_i16.lock().unwrap();
                            for frame in data.chunks_mut(2) {
                                let sample = (buf.pop_front().unwrap_or(0.0) * 32768.0)
                                    .clamp(i16::MIN as f32, i16::MAX as f32)
                                    as i16;
                                for out in frame {
                                    *out = sample;
                                }
                            }
                        },
                        |err| eprintln!("[Playback] Stream error: {}", err),
                        None,
                    )
                    .ok()
            }
        }?;

        if let Err(e) = stream.play() {
            eprintln!("[Playback] Failed to start output stream: {}", e);
            return None;
        }

        Some(Self {
            _stream: stream,
            queue,
        })
    }

    /// Append one raw 24 kHz mono chunk, normalized and duplicated for the
    /// 48 kHz device rate.
    fn push(&self, pcm: &[u8]) {
        let channels = codec::pcm16_to_f32(pcm, 1);
        if let (Some(mono), Ok(mut buf)) = (channels.first(), self.queue.lock()) {
            for &s in mono {
                buf.push_back(s);
                buf.push_back(s);
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut buf) = self.queue.lock() {
            buf.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock(Arc<Mutex<f64>>);

    impl Clock for ManualClock {
        fn now(&self) -> f64 {
            *self.0.lock().unwrap()
        }
    }

    fn scheduler() -> (AudioScheduler, Arc<Mutex<f64>>) {
        let time = Arc::new(Mutex::new(0.0));
        let sched = AudioScheduler::new(Box::new(ManualClock(time.clone())), None);
        (sched, time)
    }

    /// 1200 samples = 50 ms at 24 kHz.
    fn chunk_50ms() -> Vec<u8> {
        vec![0u8; 2400]
    }

    #[test]
    fn chunks_play_in_arrival_order_without_overlap() {
        let (mut sched, _) = scheduler();
        let s1 = sched.enqueue(&chunk_50ms());
        let s2 = sched.enqueue(&chunk_50ms());
        let s3 = sched.enqueue(&chunk_50ms());
        assert!(s1 < s2 && s2 < s3);
        let sources = sched.active_sources().to_vec();
        for pair in sources.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-9);
        }
        assert!((sched.next_start() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn gapless_while_arrival_keeps_pace() {
        let (mut sched, time) = scheduler();
        sched.enqueue(&chunk_50ms());
        // Second chunk arrives mid-playback of the first.
        *time.lock().unwrap() = 0.02;
        let s2 = sched.enqueue(&chunk_50ms());
        assert!((s2 - 0.05).abs() < 1e-9);
    }

    #[test]
    fn lagging_arrival_starts_at_the_clock_not_the_watermark() {
        let (mut sched, time) = scheduler();
        sched.enqueue(&chunk_50ms());
        // Arrival lags well past the end of the first chunk.
        *time.lock().unwrap() = 1.0;
        let start = sched.enqueue(&chunk_50ms());
        assert!((start - 1.0).abs() < 1e-9);
    }

    #[test]
    fn natural_completion_removes_sources_exactly_once() {
        let (mut sched, time) = scheduler();
        sched.enqueue(&chunk_50ms());
        sched.enqueue(&chunk_50ms());
        assert_eq!(sched.active_count(), 2);
        *time.lock().unwrap() = 0.06;
        assert_eq!(sched.active_count(), 1);
        *time.lock().unwrap() = 0.2;
        assert_eq!(sched.active_count(), 0);
        assert_eq!(sched.active_count(), 0);
    }

    #[test]
    fn interrupt_clears_active_set_and_resets_watermark() {
        let (mut sched, time) = scheduler();
        for _ in 0..4 {
            sched.enqueue(&chunk_50ms());
        }
        *time.lock().unwrap() = 0.01;
        sched.interrupt();
        assert_eq!(sched.active_count(), 0);
        assert_eq!(sched.next_start(), 0.0);
        // Next chunk starts at the current clock, not the stale watermark.
        let start = sched.enqueue(&chunk_50ms());
        assert!((start - 0.01).abs() < 1e-9);
    }

    #[test]
    fn empty_chunk_is_ignored() {
        let (mut sched, _) = scheduler();
        sched.enqueue(&[]);
        sched.enqueue(&[0x01]); // single stray byte, no full sample
        assert_eq!(sched.active_count(), 0);
        assert_eq!(sched.next_start(), 0.0);
    }
}

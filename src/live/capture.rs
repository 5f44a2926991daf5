//! Fixed-cadence frame capture feeding the live uplink.
//!
//! A dedicated thread grabs frames at FRAME_RATE, compresses them to JPEG
//! and hands them to the delivery callback. Cadence is wall-clock anchored,
//! so a slow grab or encode skips ticks instead of accumulating a backlog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage};

/// Frames per second pushed over the uplink.
pub const FRAME_RATE: u32 = 3;

/// JPEG quality on a 1..=100 scale.
pub const JPEG_QUALITY: u8 = 50;

/// Anything that can produce RGBA frames on demand. Grabbing happens on the
/// capture thread, so implementations must be Send.
pub trait FrameSource: Send {
    fn grab(&mut self) -> Result<RgbaImage>;
}

/// Procedurally generated feed standing in for a camera. Renders a moving
/// bright block over a dark field so consecutive frames differ.
pub struct SyntheticFeed {
    width: u32,
    height: u32,
    tick: u32,
}

impl SyntheticFeed {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }
}

impl FrameSource for SyntheticFeed {
    fn grab(&mut self) -> Result<RgbaImage> {
        self.tick = self.tick.wrapping_add(1);
        let phase = (self.tick * 7) % self.width.max(1);
        let img = RgbaImage::from_fn(self.width, self.height, |x, y| {
            let dx = x.abs_diff(phase);
            if dx < 40 && y > self.height / 4 && y < 3 * self.height / 4 {
                image::Rgba([220, 220, 220, 255])
            } else {
                image::Rgba([12, 16, 12, 255])
            }
        });
        Ok(img)
    }
}

/// Compress an RGBA frame to JPEG, dropping the alpha channel first.
pub fn encode_jpeg(frame: &RgbaImage) -> Result<Vec<u8>> {
    let rgb = RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y);
        image::Rgb([p[0], p[1], p[2]])
    });
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(out)
}

pub struct CapturePipeline {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CapturePipeline {
    /// Start the capture thread. `deliver` receives each encoded frame and
    /// returns false to shut the pipeline down from the consumer side.
    pub fn start<S, F>(mut source: S, mut deliver: F) -> Self
    where
        S: FrameSource + 'static,
        F: FnMut(Vec<u8>) -> bool + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let worker = std::thread::spawn(move || {
            let interval = Duration::from_secs_f64(1.0 / FRAME_RATE as f64);
            let started = Instant::now();
            let mut next_tick = 0u64;
            while !stop_flag.load(Ordering::SeqCst) {
                let target = interval * next_tick as u32;
                let elapsed = started.elapsed();
                if elapsed < target {
                    std::thread::sleep((target - elapsed).min(interval));
                    continue;
                }
                // Skip any ticks a slow grab or encode burned through.
                next_tick = (elapsed.as_secs_f64() / interval.as_secs_f64()) as u64 + 1;

                let frame = match source.grab() {
                    Ok(frame) => frame,
                    Err(e) => {
                        eprintln!("[Capture] Frame grab failed: {}", e);
                        continue;
                    }
                };
                match encode_jpeg(&frame) {
                    Ok(jpeg) => {
                        if !deliver(jpeg) {
                            break;
                        }
                    }
                    Err(e) => eprintln!("[Capture] JPEG encode failed: {}", e),
                }
            }
        });
        Self {
            stop,
            worker: Some(worker),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn synthetic_frames_encode_to_jpeg() {
        let mut feed = SyntheticFeed::new(160, 120);
        let frame = feed.grab().unwrap();
        let jpeg = encode_jpeg(&frame).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert!(jpeg.len() > 100);
    }

    #[test]
    fn pipeline_delivers_frames_then_stops() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        let mut pipeline = CapturePipeline::start(SyntheticFeed::new(64, 64), move |jpeg| {
            sink.lock().unwrap().push(jpeg);
            true
        });
        std::thread::sleep(Duration::from_millis(900));
        pipeline.stop();
        let count_at_stop = delivered.lock().unwrap().len();
        assert!(count_at_stop >= 1);
        for jpeg in delivered.lock().unwrap().iter() {
            assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        }
        // No further delivery once stopped.
        std::thread::sleep(Duration::from_millis(500));
        assert_eq!(delivered.lock().unwrap().len(), count_at_stop);
    }

    #[test]
    fn consumer_can_end_the_pipeline() {
        let delivered = Arc::new(Mutex::new(0usize));
        let sink = delivered.clone();
        let mut pipeline = CapturePipeline::start(SyntheticFeed::new(64, 64), move |_| {
            *sink.lock().unwrap() += 1;
            false
        });
        std::thread::sleep(Duration::from_millis(900));
        pipeline.stop();
        assert_eq!(*delivered.lock().unwrap(), 1);
    }
}

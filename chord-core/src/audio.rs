//! # Audio Capture Module
//!
//! Real-time microphone capture behind a single [`CaptureSource`] trait
//! with two interchangeable backends, chosen once at startup:
//!
//! - **cpal**: the default input device of the default host.
//! - **arecord**: an ALSA `arecord` subprocess streaming raw S16LE, for
//!   small Linux boxes where cpal has no usable device.
//!
//! Both backends forward mono f32 chunks over a crossbeam channel with
//! `try_send`, so the capture side never blocks on a slow consumer; a full
//! channel simply drops the chunk in favor of fresher audio.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

use crate::error::CaptureError;

/// Which capture backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Try cpal first, fall back to arecord.
    Auto,
    Cpal,
    Arecord,
}

/// A running capture stream. Dropping or calling [`stop`](Self::stop)
/// ends capture; there is no pause/resume.
pub trait CaptureSource {
    fn name(&self) -> &'static str;
    /// The rate the stream actually runs at. May differ from the requested
    /// rate when the device does not support it; callers must build the
    /// recognizer against this value.
    fn sample_rate(&self) -> u32;
    fn stop(&mut self);
}

/// Opens a capture source and starts streaming into `sender`.
///
/// With [`Backend::Auto`], cpal is tried first and arecord is the
/// fallback; an explicit choice is honored without fallback. All failures
/// surface as [`CaptureError::Unavailable`].
pub fn open_capture(
    backend: Backend,
    sample_rate: u32,
    sender: Sender<Vec<f32>>,
) -> Result<Box<dyn CaptureSource>, CaptureError> {
    match backend {
        Backend::Cpal => CpalCapture::start(sample_rate, sender)
            .map(|source| Box::new(source) as Box<dyn CaptureSource>),
        Backend::Arecord => ArecordCapture::start(sample_rate, sender)
            .map(|source| Box::new(source) as Box<dyn CaptureSource>),
        Backend::Auto => match CpalCapture::start(sample_rate, sender.clone()) {
            Ok(source) => Ok(Box::new(source)),
            Err(cpal_err) => {
                log::warn!("cpal capture failed ({cpal_err}), falling back to arecord");
                ArecordCapture::start(sample_rate, sender)
                    .map(|source| Box::new(source) as Box<dyn CaptureSource>)
                    .map_err(|arecord_err| {
                        CaptureError::Unavailable(format!(
                            "no capture backend available (cpal: {cpal_err}; arecord: {arecord_err})"
                        ))
                    })
            }
        },
    }
}

/// Capture through cpal's default input device.
pub struct CpalCapture {
    stream: Option<cpal::Stream>,
    sample_rate: u32,
}

impl CpalCapture {
    pub fn start(sample_rate: u32, sender: Sender<Vec<f32>>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::Unavailable("no input device available".into()))?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "<unnamed device>".to_string());

        let configs = device
            .supported_input_configs()
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?
            .collect::<Vec<_>>();
        let supported = find_supported_config(configs, sample_rate)
            .ok_or_else(|| CaptureError::Unavailable("no suitable f32 input format found".into()))?;

        // Clamp the requested rate into the device's supported range
        // instead of failing; the caller rebuilds its math on the actual
        // rate we report back.
        let rate = sample_rate
            .clamp(supported.min_sample_rate().0, supported.max_sample_rate().0);
        let config = supported.with_sample_rate(cpal::SampleRate(rate));
        let channels = config.channels() as usize;
        let config: cpal::StreamConfig = config.into();

        log::info!("capturing from \"{device_name}\" at {rate} Hz via cpal");
        if rate != sample_rate {
            log::warn!("device does not support {sample_rate} Hz, using {rate} Hz");
        }

        let err_fn = |err| log::error!("audio stream error: {err}");

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Keep channel 0 of interleaved frames; recognition is mono.
                    let chunk: Vec<f32> = data.iter().step_by(channels).copied().collect();
                    // A full channel means the consumer is behind; drop the
                    // chunk rather than stall the audio callback.
                    let _ = sender.try_send(chunk);
                },
                err_fn,
                None,
            )
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        Ok(Self {
            stream: Some(stream),
            sample_rate: rate,
        })
    }
}

impl CaptureSource for CpalCapture {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("error pausing stream: {e}");
            }
            drop(stream);
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Selects the closest mono f32 configuration to the target sample rate.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    let rate_distance = |c: &SupportedStreamConfigRange| {
        let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
        let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
        min_diff.min(max_diff)
    };
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        // Mono first, then closest rate; stereo devices still work because
        // the callback keeps only channel 0.
        .min_by_key(|c| (c.channels(), rate_distance(c)))
}

/// Read size for the arecord pipe: 1024 S16LE frames.
const ARECORD_CHUNK_BYTES: usize = 2048;

/// Capture through an `arecord` subprocess producing raw S16LE mono.
pub struct ArecordCapture {
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
    sample_rate: u32,
}

impl ArecordCapture {
    pub fn start(sample_rate: u32, sender: Sender<Vec<f32>>) -> Result<Self, CaptureError> {
        let mut child = Command::new("arecord")
            .args([
                "-q",
                "-t",
                "raw",
                "-f",
                "S16_LE",
                "-c",
                "1",
                "-r",
                &sample_rate.to_string(),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Unavailable(format!("failed to spawn arecord: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Unavailable("arecord produced no stdout".into()))?;

        log::info!("capturing via arecord at {sample_rate} Hz");

        let reader = std::thread::spawn(move || {
            let mut bytes = [0u8; ARECORD_CHUNK_BYTES];
            loop {
                match stdout.read_exact(&mut bytes) {
                    Ok(()) => {
                        let chunk: Vec<f32> = bytes
                            .chunks_exact(2)
                            .map(|pair| {
                                i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32_768.0
                            })
                            .collect();
                        match sender.try_send(chunk) {
                            Ok(()) => {}
                            // Consumer is behind; fresher audio wins.
                            Err(crossbeam_channel::TrySendError::Full(_)) => {}
                            Err(crossbeam_channel::TrySendError::Disconnected(_)) => return,
                        }
                    }
                    Err(_) => {
                        log::info!("arecord stream ended");
                        return;
                    }
                }
            }
        });

        Ok(Self {
            child: Some(child),
            reader: Some(reader),
            sample_rate,
        })
    }
}

impl CaptureSource for ArecordCapture {
    fn name(&self) -> &'static str {
        "arecord"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for ArecordCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

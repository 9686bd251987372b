use super::monitor::MicrophoneSource;
use crate::error::CaptureError;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

const RING_CAPACITY: usize = 4096;

/// Microphone input through the system audio host.
///
/// `cpal::Stream` is not `Send`, so the stream lives on its own thread for
/// as long as the source is open.
pub struct CpalMicrophone {
    name: String,
    device_name: Option<String>,
    samples: Arc<Mutex<VecDeque<f32>>>,
    running: Arc<AtomicBool>,
}

impl CpalMicrophone {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            name: device_name
                .clone()
                .unwrap_or_else(|| "default input".to_string()),
            device_name,
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(RING_CAPACITY))),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn find_device(device_name: Option<&str>) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        match device_name {
            None => host.default_input_device().ok_or(CaptureError::NotFound),
            Some(wanted) => host
                .input_devices()
                .map_err(|e| CaptureError::Other(e.to_string()))?
                .find(|device| device.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or(CaptureError::NotFound),
        }
    }

    fn push_mono(samples: &Mutex<VecDeque<f32>>, data: impl Iterator<Item = f32>, channels: usize) {
        let mut ring = samples.lock();
        let mut frame_sum = 0.0;
        let mut in_frame = 0;
        for sample in data {
            frame_sum += sample;
            in_frame += 1;
            if in_frame == channels {
                ring.push_back(frame_sum / channels as f32);
                frame_sum = 0.0;
                in_frame = 0;
            }
        }
        while ring.len() > RING_CAPACITY {
            ring.pop_front();
        }
    }

    fn build_stream(
        device: &cpal::Device,
        samples: Arc<Mutex<VecDeque<f32>>>,
    ) -> Result<cpal::Stream, CaptureError> {
        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::NotReadable {
                device: "microphone".to_string(),
                details: e.to_string(),
            })?;
        let channels = supported.channels().max(1) as usize;
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let on_error = |err: cpal::StreamError| error!("Microphone stream error: {}", err);

        let stream = match format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    Self::push_mono(&samples, data.iter().copied(), channels)
                },
                on_error,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    Self::push_mono(&samples, data.iter().map(|&s| s as f32 / 32768.0), channels)
                },
                on_error,
                None,
            ),
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    Self::push_mono(
                        &samples,
                        data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0),
                        channels,
                    )
                },
                on_error,
                None,
            ),
            other => {
                return Err(CaptureError::Overconstrained {
                    constraint: format!("sample format {:?}", other),
                })
            }
        }
        .map_err(|e| CaptureError::NotReadable {
            device: "microphone".to_string(),
            details: e.to_string(),
        })?;

        stream.play().map_err(|e| CaptureError::NotReadable {
            device: "microphone".to_string(),
            details: e.to_string(),
        })?;
        Ok(stream)
    }
}

#[async_trait]
impl MicrophoneSource for CpalMicrophone {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<(), CaptureError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let device_name = self.device_name.clone();
        let samples = Arc::clone(&self.samples);
        let running = Arc::clone(&self.running);

        thread::spawn(move || {
            let stream = Self::find_device(device_name.as_deref())
                .and_then(|device| Self::build_stream(&device, samples));
            match stream {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    while running.load(Ordering::SeqCst) {
                        thread::sleep(Duration::from_millis(50));
                    }
                    drop(stream);
                    info!("Microphone stream closed");
                }
                Err(e) => {
                    running.store(false, Ordering::SeqCst);
                    let _ = ready_tx.send(Err(e));
                }
            }
        });

        match ready_rx.await {
            Ok(result) => result,
            Err(_) => {
                warn!("Microphone thread exited before reporting");
                self.running.store(false, Ordering::SeqCst);
                Err(CaptureError::Other("microphone thread exited".to_string()))
            }
        }
    }

    fn read_latest(&self, buf: &mut [f32]) -> usize {
        let ring = self.samples.lock();
        let count = ring.len().min(buf.len());
        let start = buf.len() - count;
        for (slot, sample) in buf[start..].iter_mut().zip(ring.iter().skip(ring.len() - count)) {
            *slot = *sample;
        }
        count
    }

    fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.samples.lock().clear();
    }

    fn is_open(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

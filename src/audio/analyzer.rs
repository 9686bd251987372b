//! Frequency-domain amplitude analysis
//!
//! Mirrors the byte spectrum of a browser analyser node: Blackman window,
//! magnitude normalised by the transform size, exponential smoothing across
//! calls, then decibels mapped linearly onto 0-255.

use crate::config::AudioConfig;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use tracing::debug;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl SpectrumAnalyzer {
    pub fn new(config: &AudioConfig) -> Self {
        let fft_size = config.fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let t = 2.0 * std::f32::consts::PI * i as f32 / fft_size as f32;
                0.42 - 0.5 * t.cos() + 0.08 * (2.0 * t).cos()
            })
            .collect();

        let bins = fft_size / 2;
        debug!("Spectrum analyzer: fft_size={}, bins={}", fft_size, bins);

        Self {
            fft,
            fft_size,
            window,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
            smoothing: config.smoothing.clamp(0.0, 1.0),
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Analyse the most recent `fft_size` samples. Shorter input is
    /// zero-padded at the front.
    pub fn byte_frequency_data(&mut self, samples: &[f32]) -> &[u8] {
        let take = samples.len().min(self.fft_size);
        let offset = self.fft_size - take;
        let recent = &samples[samples.len() - take..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < offset { 0.0 } else { recent[i - offset] };
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let norm = 1.0 / self.fft_size as f32;
        let range = self.max_decibels - self.min_decibels;
        for k in 0..self.smoothed.len() {
            let magnitude = self.buffer[k].norm() * norm;
            self.smoothed[k] = self.smoothing * self.smoothed[k] + (1.0 - self.smoothing) * magnitude;

            let decibels = if self.smoothed[k] > 0.0 {
                20.0 * self.smoothed[k].log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (decibels - self.min_decibels) / range;
            self.bytes[k] = scaled.clamp(0.0, 255.0) as u8;
        }

        &self.bytes
    }

    /// Mean byte magnitude of the last analysis
    pub fn average(&self) -> f32 {
        average(&self.bytes)
    }

    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
        self.bytes.iter_mut().for_each(|v| *v = 0);
    }
}

pub fn average(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    bins.iter().map(|&b| b as f32).sum::<f32>() / bins.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> SpectrumAnalyzer {
        SpectrumAnalyzer::new(&AudioConfig::default())
    }

    fn tone(freq_bin: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq_bin * i as f32 / 256.0).sin()
            })
            .collect()
    }

    #[test]
    fn test_bin_count() {
        let analyzer = analyzer();
        assert_eq!(analyzer.fft_size(), 256);
        assert_eq!(analyzer.bin_count(), 128);
    }

    #[test]
    fn test_silence_is_zero() {
        let mut analyzer = analyzer();
        let bins = analyzer.byte_frequency_data(&vec![0.0; 256]).to_vec();
        assert!(bins.iter().all(|&b| b == 0));
        assert_eq!(analyzer.average(), 0.0);
    }

    #[test]
    fn test_tone_lights_its_bin() {
        let mut analyzer = analyzer();
        let mut bins = Vec::new();
        for _ in 0..20 {
            bins = analyzer.byte_frequency_data(&tone(32.0, 0.8, 256)).to_vec();
        }
        // Blackman main lobe spans two bins either side
        assert_eq!(bins[32], 255);
        assert!(bins[30..=34].iter().all(|&b| b > 200));
        assert_eq!(bins[100], 0);
        assert_eq!(bins[5], 0);
    }

    #[test]
    fn test_louder_input_raises_average() {
        let mut quiet = analyzer();
        let mut loud = analyzer();
        for _ in 0..20 {
            quiet.byte_frequency_data(&tone(10.0, 0.001, 256));
            loud.byte_frequency_data(&tone(10.0, 0.9, 256));
        }
        assert!(loud.average() > quiet.average());
    }

    #[test]
    fn test_smoothing_decays() {
        let mut analyzer = analyzer();
        for _ in 0..20 {
            analyzer.byte_frequency_data(&tone(32.0, 0.8, 256));
        }
        let loud = analyzer.average();
        analyzer.byte_frequency_data(&vec![0.0; 256]);
        let decaying = analyzer.average();
        assert!(decaying > 0.0 && decaying <= loud);

        analyzer.reset();
        assert_eq!(analyzer.average(), 0.0);
    }

    #[test]
    fn test_short_and_non_finite_input() {
        let mut analyzer = analyzer();
        let bins = analyzer
            .byte_frequency_data(&[f32::NAN, f32::INFINITY, 0.0])
            .to_vec();
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_average_helper() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[0, 90, 90, 0]), 45.0);
    }
}

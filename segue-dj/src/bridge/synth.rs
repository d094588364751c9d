//! Minimal percussion and bass voices
//!
//! Best-effort synthetic filler, not a real drum machine: each voice is a
//! handful of oscillator/noise samples with exponential envelopes, cheap
//! enough to run inside the audio callback. Intensity brightens timbre at
//! trigger time; it never restarts a running voice.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Sine kick with a fast downward pitch sweep
pub struct KickVoice {
    sample_rate: f32,
    phase: f32,
    freq: f32,
    amp: f32,
}

impl KickVoice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            phase: 0.0,
            freq: 0.0,
            amp: 0.0,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.phase = 0.0;
        self.freq = 130.0;
        self.amp = velocity;
    }

    pub fn render(&mut self) -> f32 {
        if self.amp < 1e-4 {
            return 0.0;
        }
        let out = (self.phase * TAU).sin() * self.amp;
        self.phase = (self.phase + self.freq / self.sample_rate).fract();
        // Pitch falls toward 45 Hz, amplitude decays over ~300 ms
        self.freq = 45.0 + (self.freq - 45.0) * decay(self.sample_rate, 0.06);
        self.amp *= decay(self.sample_rate, 0.3);
        out
    }
}

/// Noise burst plus a short body tone
pub struct SnareVoice {
    sample_rate: f32,
    rng: SmallRng,
    phase: f32,
    noise_amp: f32,
    tone_amp: f32,
}

impl SnareVoice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            rng: SmallRng::seed_from_u64(0x5eed_5a1e),
            phase: 0.0,
            noise_amp: 0.0,
            tone_amp: 0.0,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.phase = 0.0;
        self.noise_amp = velocity;
        self.tone_amp = velocity * 0.5;
    }

    pub fn render(&mut self) -> f32 {
        if self.noise_amp < 1e-4 && self.tone_amp < 1e-4 {
            return 0.0;
        }
        let noise: f32 = self.rng.gen_range(-1.0..1.0) * self.noise_amp;
        let tone = (self.phase * TAU).sin() * self.tone_amp;
        self.phase = (self.phase + 185.0 / self.sample_rate).fract();
        self.noise_amp *= decay(self.sample_rate, 0.12);
        self.tone_amp *= decay(self.sample_rate, 0.08);
        noise + tone
    }
}

/// Closed hi-hat: high-passed noise with a very fast decay
pub struct HihatVoice {
    sample_rate: f32,
    rng: SmallRng,
    amp: f32,
    lowpass: f32,
}

impl HihatVoice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            rng: SmallRng::seed_from_u64(0x1417_a71e),
            amp: 0.0,
            lowpass: 0.0,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.amp = velocity;
    }

    pub fn render(&mut self) -> f32 {
        if self.amp < 1e-4 {
            return 0.0;
        }
        let noise: f32 = self.rng.gen_range(-1.0..1.0);
        // One-pole highpass: subtract the smoothed signal
        self.lowpass += 0.15 * (noise - self.lowpass);
        let out = (noise - self.lowpass) * self.amp;
        self.amp *= decay(self.sample_rate, 0.05);
        out
    }
}

/// Sustained sub bass note
pub struct BassVoice {
    sample_rate: f32,
    phase: f32,
    amp: f32,
    target_amp: f32,
}

impl BassVoice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            phase: 0.0,
            amp: 0.0,
            target_amp: 0.0,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.target_amp = velocity;
    }

    /// Release toward silence (called when the held note should end).
    pub fn release(&mut self) {
        self.target_amp = 0.0;
    }

    pub fn render(&mut self) -> f32 {
        // Smooth attack/release to avoid clicks on the sub
        self.amp += 0.002 * (self.target_amp - self.amp);
        if self.amp < 1e-4 && self.target_amp == 0.0 {
            return 0.0;
        }
        let out = (self.phase * TAU).sin() * self.amp;
        self.phase = (self.phase + 55.0 / self.sample_rate).fract();
        out
    }
}

/// One-shot riser: noise and a sweeping tone swelling over the whole
/// transition, silenced when the transition resolves.
pub struct RiserVoice {
    sample_rate: f32,
    rng: SmallRng,
    phase: f32,
    total_samples: f32,
    elapsed: f32,
    active: bool,
    velocity: f32,
}

impl RiserVoice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            rng: SmallRng::seed_from_u64(0x0051_c0de),
            phase: 0.0,
            total_samples: 0.0,
            elapsed: 0.0,
            active: false,
            velocity: 0.0,
        }
    }

    pub fn trigger(&mut self, velocity: f32, duration_secs: f32) {
        self.total_samples = (duration_secs * self.sample_rate).max(1.0);
        self.elapsed = 0.0;
        self.velocity = velocity;
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn render(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }
        let t = self.elapsed / self.total_samples;
        if t >= 1.0 {
            self.active = false;
            return 0.0;
        }
        self.elapsed += 1.0;

        let swell = t * t * self.velocity;
        let noise: f32 = self.rng.gen_range(-1.0..1.0) * 0.6;
        let freq = 180.0 + 1000.0 * t;
        let tone = (self.phase * TAU).sin() * 0.4;
        self.phase = (self.phase + freq / self.sample_rate).fract();
        (noise + tone) * swell
    }
}

/// Per-sample decay factor for an exponential envelope with time constant
/// `tau_secs` (amplitude falls to ~37% after tau).
fn decay(sample_rate: f32, tau_secs: f32) -> f32 {
    (-1.0 / (sample_rate * tau_secs)).exp()
}

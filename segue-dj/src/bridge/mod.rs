//! Bridge generator: synthetic filler audio for transitions
//!
//! Produces percussive/harmonic filler locked to a musical clock, used to
//! mask the silent gap while the remote player switches tracks. The
//! renderer ([`BridgeCore`]) is plain sample code with no device coupling;
//! [`output`] feeds it to a local audio device when one exists.
//!
//! Failure semantics: bridge audio is cosmetic. Every public method on
//! [`BridgeGenerator`] is infallible from the caller's point of view;
//! device problems degrade to silence and are only logged.

pub mod clock;
pub mod output;
pub mod patterns;
pub mod synth;

use clock::BeatClock;
use patterns::{trigger_velocity, Layer, STEPS_PER_BAR};
use segue_common::types::{GeneratedElements, TransitionPlan};
use std::sync::{Arc, Mutex};
use synth::{BassVoice, HihatVoice, KickVoice, RiserVoice, SnareVoice};
use tracing::{debug, warn};

const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Fixed layer levels relative to the master gain
const KICK_GAIN: f32 = 0.5;
const SNARE_GAIN: f32 = 0.35;
const HIHAT_GAIN: f32 = 0.25;
const BASS_GAIN: f32 = 0.4;
const RISER_GAIN: f32 = 0.35;

/// Device-independent bridge renderer.
///
/// Owned behind a mutex shared with the audio output callback; every
/// method is synchronous and allocation-free so the callback can call
/// `render` directly.
pub struct BridgeCore {
    sample_rate: u32,
    clock: BeatClock,
    kick: KickVoice,
    snare: SnareVoice,
    hihat: HihatVoice,
    bass: BassVoice,
    riser: RiserVoice,
    layers: GeneratedElements,
    intensity: f32,
    playing: bool,
    master: f32,
    master_target: f32,
    master_step: f32,
}

impl BridgeCore {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            clock: BeatClock::new(sample_rate, 120.0),
            kick: KickVoice::new(sample_rate),
            snare: SnareVoice::new(sample_rate),
            hihat: HihatVoice::new(sample_rate),
            bass: BassVoice::new(sample_rate),
            riser: RiserVoice::new(sample_rate),
            layers: GeneratedElements::default(),
            intensity: 0.5,
            playing: false,
            master: 0.8,
            master_target: 0.8,
            master_step: 0.0,
        }
    }

    /// Rebuild for the device's actual sample rate. Called by the output
    /// thread after the stream is negotiated, before anything plays.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == self.sample_rate {
            return;
        }
        let master = self.master;
        *self = Self::new(sample_rate);
        self.master = master;
        self.master_target = master;
    }

    /// Start generation for a plan: reset the clock to the outgoing tempo,
    /// ramp to the incoming tempo over the plan duration, enable the
    /// flagged layers, and fire the riser one-shot if requested.
    pub fn start(&mut self, elements: GeneratedElements, from_bpm: f64, to_bpm: f64, duration_secs: f64) {
        self.stop();
        self.layers = elements;
        self.clock.reset(from_bpm);
        if (from_bpm - to_bpm).abs() > f64::EPSILON {
            self.clock.ramp_to(to_bpm, duration_secs);
        }
        if self.layers.riser {
            self.riser.trigger(1.0, duration_secs as f32);
        }
        self.playing = self.layers.any();
    }

    /// Halt pattern triggering. Voice tails ring out naturally; safe to
    /// call when already stopped.
    pub fn stop(&mut self) {
        self.playing = false;
        self.riser.stop();
        self.bass.release();
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Reshape layer loudness/timbre without restarting patterns.
    pub fn set_intensity(&mut self, intensity: f64) {
        self.intensity = intensity.clamp(0.0, 1.0) as f32;
    }

    /// Jump the master level immediately.
    pub fn set_master(&mut self, volume: f64) {
        self.master = volume.clamp(0.0, 1.0) as f32;
        self.master_target = self.master;
        self.master_step = 0.0;
    }

    /// Ramp the master level over a duration (per-sample smoothing).
    pub fn fade_master_to(&mut self, volume: f64, duration_secs: f64) {
        self.master_target = volume.clamp(0.0, 1.0) as f32;
        let samples = (duration_secs * self.sample_rate as f64).max(1.0) as f32;
        self.master_step = (self.master_target - self.master) / samples;
    }

    pub fn master(&self) -> f32 {
        self.master
    }

    fn trigger_step(&mut self, absolute_step: u64) {
        let step = absolute_step % STEPS_PER_BAR;

        if self.layers.kick {
            if let Some(v) = trigger_velocity(Layer::Kick, step, self.intensity) {
                self.kick.trigger(v);
            }
        }
        if self.layers.snare {
            if let Some(v) = trigger_velocity(Layer::Snare, step, self.intensity) {
                self.snare.trigger(v);
            }
        }
        if self.layers.hihat {
            if let Some(v) = trigger_velocity(Layer::Hihat, step, self.intensity) {
                self.hihat.trigger(v);
            }
        }
        if self.layers.bass {
            if let Some(v) = trigger_velocity(Layer::Bass, step, self.intensity) {
                self.bass.trigger(v * self.intensity.max(0.3));
            }
            // Two-beat hold: release shortly before the next trigger
            if step == 6 || step == 14 {
                self.bass.release();
            }
        }
    }

    /// Render interleaved frames into `out`. Always writes every sample;
    /// stopped generation renders decaying tails, then silence.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            if self.playing {
                if let Some(step) = self.clock.tick() {
                    self.trigger_step(step);
                }
            }

            // Smooth master toward its target
            if self.master_step != 0.0 {
                self.master += self.master_step;
                let overshot = (self.master_step > 0.0 && self.master >= self.master_target)
                    || (self.master_step < 0.0 && self.master <= self.master_target);
                if overshot {
                    self.master = self.master_target;
                    self.master_step = 0.0;
                }
            }

            let mut sample = self.kick.render() * KICK_GAIN
                + self.snare.render() * SNARE_GAIN
                + self.hihat.render() * HIHAT_GAIN
                + self.bass.render() * BASS_GAIN
                + self.riser.render() * RISER_GAIN;
            sample *= self.master;

            for channel in frame.iter_mut() {
                *channel = sample;
            }
        }
    }
}

/// Handle to the bridge generator shared between the engine and the audio
/// output stream.
pub struct BridgeGenerator {
    core: Arc<Mutex<BridgeCore>>,
    _output: Option<output::OutputHandle>,
}

impl BridgeGenerator {
    /// Create a generator and try to open the configured output device.
    /// A missing or failing device yields a silent generator.
    pub fn new(config: &segue_common::config::BridgeConfig) -> Self {
        let core = Arc::new(Mutex::new(BridgeCore::new(DEFAULT_SAMPLE_RATE)));
        let output = if config.enabled {
            output::spawn(Arc::clone(&core), config.device.clone())
        } else {
            debug!("bridge output disabled by config");
            None
        };
        Self {
            core,
            _output: output,
        }
    }

    /// Generator with no audio device at all (tests, headless hosts).
    pub fn silent() -> Self {
        Self {
            core: Arc::new(Mutex::new(BridgeCore::new(DEFAULT_SAMPLE_RATE))),
            _output: None,
        }
    }

    fn with_core(&self, f: impl FnOnce(&mut BridgeCore)) {
        match self.core.lock() {
            Ok(mut core) => f(&mut core),
            Err(e) => warn!("bridge state lock poisoned: {}", e),
        }
    }

    /// Start filler for a plan, ramping tempo from the outgoing to the
    /// incoming track over the plan duration.
    pub fn generate_from(&self, plan: &TransitionPlan, from_bpm: f64, to_bpm: f64) {
        debug!(
            "bridge start: {:?} {} -> {} bpm over {}s",
            plan.generated_elements, from_bpm, to_bpm, plan.duration_secs
        );
        self.with_core(|core| {
            core.start(
                plan.generated_elements,
                from_bpm,
                to_bpm,
                plan.duration_secs,
            )
        });
    }

    pub fn set_intensity(&self, intensity: f64) {
        self.with_core(|core| core.set_intensity(intensity));
    }

    pub fn set_volume(&self, volume: f64) {
        self.with_core(|core| core.set_master(volume));
    }

    pub fn fade_to(&self, volume: f64, duration_ms: u64) {
        self.with_core(|core| core.fade_master_to(volume, duration_ms as f64 / 1000.0));
    }

    /// Stop all layers and one-shots. No-op when already stopped.
    pub fn stop(&self) {
        self.with_core(|core| core.stop());
    }

    pub fn is_playing(&self) -> bool {
        self.core
            .lock()
            .map(|core| core.is_playing())
            .unwrap_or(false)
    }
}

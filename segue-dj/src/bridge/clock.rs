//! Musical clock for the bridge generator
//!
//! Advances beat phase per audio sample so every pattern layer stays
//! locked to musical subdivisions through tempo ramps. The unit of
//! scheduling is the sixteenth step (4 per beat, 16 per bar).

/// Sixteenth steps per beat
const STEPS_PER_BEAT: f64 = 4.0;

/// Linear tempo ramp in progress
#[derive(Debug, Clone, Copy)]
struct TempoRamp {
    from_bpm: f64,
    to_bpm: f64,
    total_samples: f64,
    elapsed_samples: f64,
}

/// Sample-driven beat clock with linear tempo ramping
#[derive(Debug)]
pub struct BeatClock {
    sample_rate: f64,
    bpm: f64,
    ramp: Option<TempoRamp>,
    /// Continuous phase in sixteenth steps since start
    phase_steps: f64,
    /// Last whole step that was reported
    last_step: Option<u64>,
}

impl BeatClock {
    pub fn new(sample_rate: u32, bpm: f64) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            bpm,
            ramp: None,
            phase_steps: 0.0,
            last_step: None,
        }
    }

    /// Reset phase and set a fixed tempo.
    pub fn reset(&mut self, bpm: f64) {
        self.bpm = bpm;
        self.ramp = None;
        self.phase_steps = 0.0;
        self.last_step = None;
    }

    /// Ramp linearly from the current tempo to `to_bpm` over `secs`.
    pub fn ramp_to(&mut self, to_bpm: f64, secs: f64) {
        if secs <= 0.0 {
            self.bpm = to_bpm;
            self.ramp = None;
            return;
        }
        self.ramp = Some(TempoRamp {
            from_bpm: self.bpm,
            to_bpm,
            total_samples: secs * self.sample_rate,
            elapsed_samples: 0.0,
        });
    }

    /// Current tempo in bpm (mid-ramp value while ramping).
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Advance by one sample. Returns the absolute sixteenth-step index
    /// when the phase crosses into a new step.
    pub fn tick(&mut self) -> Option<u64> {
        if let Some(ramp) = &mut self.ramp {
            ramp.elapsed_samples += 1.0;
            let t = (ramp.elapsed_samples / ramp.total_samples).min(1.0);
            self.bpm = ramp.from_bpm + (ramp.to_bpm - ramp.from_bpm) * t;
            if t >= 1.0 {
                self.ramp = None;
            }
        }

        self.phase_steps += self.bpm * STEPS_PER_BEAT / 60.0 / self.sample_rate;

        let step = self.phase_steps.floor() as u64;
        if self.last_step != Some(step) {
            self.last_step = Some(step);
            Some(step)
        } else {
            None
        }
    }
}

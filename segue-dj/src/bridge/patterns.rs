//! Step patterns for bridge filler layers
//!
//! One 16-step bar (4/4, sixteenth resolution) per repeating layer. The
//! riser is a one-shot spanning the whole transition and has no step
//! pattern. Velocities are shaped by the intensity control at trigger
//! time; patterns themselves never change mid-run, which keeps layers
//! phase-locked through tempo ramps.

/// Repeating bridge layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Kick,
    Snare,
    Hihat,
    Bass,
}

/// Steps per bar at sixteenth resolution
pub const STEPS_PER_BAR: u64 = 16;

/// Trigger velocity for `layer` at a bar position, or None when silent.
///
/// `intensity` (0-1) opens up the quieter layers: hi-hats get louder and
/// the backbeat snare only appears at all above half intensity.
pub fn trigger_velocity(layer: Layer, step_in_bar: u64, intensity: f32) -> Option<f32> {
    match layer {
        // Four-on-the-floor kick
        Layer::Kick => match step_in_bar {
            0 | 4 | 8 | 12 => Some(1.0),
            _ => None,
        },
        // Backbeat, felt only once intensity passes half
        Layer::Snare => match step_in_bar {
            4 | 12 if intensity > 0.5 => Some(0.4 + 0.6 * intensity),
            4 | 12 => Some(0.3),
            _ => None,
        },
        // Off-beat eighths
        Layer::Hihat => match step_in_bar {
            2 | 6 | 10 | 14 => Some(0.3 + 0.7 * intensity),
            _ => None,
        },
        // Root note on beats 1 and 3, held for two beats
        Layer::Bass => match step_in_bar {
            0 | 8 => Some(0.8),
            _ => None,
        },
    }
}

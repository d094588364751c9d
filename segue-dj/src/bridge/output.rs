//! Local audio output for bridge filler
//!
//! Opens a cpal output device and renders [`BridgeCore`](super::BridgeCore)
//! from the stream callback. The cpal stream is not `Send` on every
//! backend, so a dedicated thread owns it for its whole lifetime; the rest
//! of the daemon only ever touches the shared core.
//!
//! Any failure here (no device, unsupported format, stream error) leaves
//! the generator silent: bridge audio is cosmetic and must never take the
//! transition down with it.

use super::BridgeCore;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Handle keeping the output thread alive; dropping it stops the stream.
pub struct OutputHandle {
    stop: Arc<AtomicBool>,
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Spawn the output thread. Returns None when no usable device exists.
///
/// The thread adjusts the core's sample rate to whatever the device
/// negotiated before any generation starts.
pub fn spawn(core: Arc<Mutex<BridgeCore>>, device_name: Option<String>) -> Option<OutputHandle> {
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);

    std::thread::Builder::new()
        .name("bridge-output".to_string())
        .spawn(move || {
            if let Err(e) = run_stream(core, device_name, thread_stop) {
                warn!("bridge audio output unavailable: {}", e);
            }
        })
        .ok()?;

    Some(OutputHandle { stop })
}

fn run_stream(
    core: Arc<Mutex<BridgeCore>>,
    device_name: Option<String>,
    stop: Arc<AtomicBool>,
) -> Result<(), String> {
    let host = cpal::default_host();

    let device = match device_name.as_deref() {
        Some(name) => {
            let found = host
                .output_devices()
                .map_err(|e| format!("cannot enumerate devices: {}", e))?
                .find(|d| d.name().ok().as_deref() == Some(name));
            match found {
                Some(d) => d,
                None => {
                    warn!("bridge device '{}' not found, using default", name);
                    host.default_output_device()
                        .ok_or("no default output device")?
                }
            }
        }
        None => host
            .default_output_device()
            .ok_or("no default output device")?,
    };

    let supported = device
        .default_output_config()
        .map_err(|e| format!("no output config: {}", e))?;
    if supported.sample_format() != SampleFormat::F32 {
        return Err(format!(
            "unsupported sample format {:?}",
            supported.sample_format()
        ));
    }

    let config = supported.config();
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;

    if let Ok(mut core) = core.lock() {
        core.set_sample_rate(sample_rate);
    }

    info!(
        "bridge output: {} @ {} Hz, {} ch",
        device.name().unwrap_or_else(|_| "<unknown>".to_string()),
        sample_rate,
        channels
    );

    let callback_core = Arc::clone(&core);
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                match callback_core.lock() {
                    Ok(mut core) => core.render(data, channels),
                    // Poisoned lock: output silence rather than panic the audio thread
                    Err(_) => data.fill(0.0),
                }
                for sample in data.iter_mut() {
                    *sample = sample.clamp(-1.0, 1.0);
                }
            },
            |err| warn!("bridge stream error: {}", err),
            None,
        )
        .map_err(|e| format!("failed to build stream: {}", e))?;

    stream
        .play()
        .map_err(|e| format!("failed to start stream: {}", e))?;

    // The stream lives as long as this thread does
    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }
    Ok(())
}

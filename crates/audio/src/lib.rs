//! leon-audio – Audio-Schicht der Live-Session
//!
//! - Mikrofon-Capture via cpal, Fenster zu 4096 Samples bei 16 kHz
//! - PCM16/base64-Kodierung fuer den Realtime-Kanal
//! - Lueckenloses Playback bei 24 kHz mit sofortigem Barge-in
//! - Geraete laufen mit nativer Rate, gewandelt wird in [`resample`]

pub mod capture;
pub mod device;
pub mod error;
pub mod frame;
pub mod pcm;
pub mod playback;
pub mod resample;

// Bequeme Re-Exporte der wichtigsten Typen
pub use capture::{CaptureConfig, CaptureEncoder, CaptureWorker};
pub use device::{list_devices, AudioDevice, Richtung};
pub use error::{AudioError, AudioResult};
pub use frame::{AudioFrame, RealtimeInput, AUSGANG_SAMPLE_RATE, EINGANG_SAMPLE_RATE};
pub use playback::{Eingeplant, PlaybackConfig, PlaybackScheduler, PlaybackWorker};
pub use resample::{Umtaster, ZiehUmtaster};

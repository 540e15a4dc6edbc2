//! Zugriff auf Mikrofon, Kamera und Lautsprecher
//!
//! `MediaDevices` entkoppelt den Controller von der Hardware. Die cpal-
//! Implementierung liefert Mikrofon und Lautsprecher. Eine Kamera ist
//! ueber cpal nicht ansprechbar, Video-Sessions werden dort schon vor dem
//! Verbindungsaufbau abgelehnt.

use tokio::sync::mpsc;

use leon_audio::{CaptureConfig, CaptureWorker, PlaybackConfig, PlaybackScheduler, PlaybackWorker};
use leon_audio::RealtimeInput;

use crate::error::{LiveError, LiveResult};

/// Laufender Geraetezugriff, wird beim Session-Ende gestoppt
pub trait MediaHandle: Send {
    /// Blockiert bis das Geraet freigegeben ist
    fn stoppen(self: Box<Self>);
}

pub trait MediaDevices: Send + Sync + 'static {
    /// Mikrofon oeffnen, kodierte Fenster gehen an `ziel`
    fn mikrofon_oeffnen(
        &self,
        ziel: mpsc::UnboundedSender<RealtimeInput>,
    ) -> LiveResult<Box<dyn MediaHandle>>;

    /// Gibt false zurueck wenn `kamera_oeffnen` nie gelingen kann
    fn kamera_verfuegbar(&self) -> bool {
        true
    }

    /// Kamera oeffnen, Einzelbilder gehen an `ziel`
    fn kamera_oeffnen(
        &self,
        ziel: mpsc::UnboundedSender<RealtimeInput>,
    ) -> LiveResult<Box<dyn MediaHandle>>;

    /// Lautsprecher oeffnen, der die Zeitleiste des Schedulers abspielt
    fn lautsprecher_oeffnen(&self, scheduler: PlaybackScheduler)
        -> LiveResult<Box<dyn MediaHandle>>;
}

impl MediaHandle for CaptureWorker {
    fn stoppen(self: Box<Self>) {
        CaptureWorker::stoppen(*self);
    }
}

impl MediaHandle for PlaybackWorker {
    fn stoppen(self: Box<Self>) {
        PlaybackWorker::stoppen(*self);
    }
}

/// Geraete des Standard-cpal-Hosts
#[derive(Debug, Clone, Default)]
pub struct CpalMediaDevices {
    pub capture: CaptureConfig,
    pub playback: PlaybackConfig,
}

impl CpalMediaDevices {
    pub fn new(capture: CaptureConfig, playback: PlaybackConfig) -> Self {
        Self { capture, playback }
    }
}

fn geraetefehler(e: leon_audio::AudioError) -> LiveError {
    LiveError::GeraetNichtVerfuegbar(e.to_string())
}

impl MediaDevices for CpalMediaDevices {
    fn mikrofon_oeffnen(
        &self,
        ziel: mpsc::UnboundedSender<RealtimeInput>,
    ) -> LiveResult<Box<dyn MediaHandle>> {
        let worker = CaptureWorker::starten(self.capture.clone(), ziel).map_err(geraetefehler)?;
        Ok(Box::new(worker))
    }

    fn kamera_verfuegbar(&self) -> bool {
        false
    }

    fn kamera_oeffnen(
        &self,
        _ziel: mpsc::UnboundedSender<RealtimeInput>,
    ) -> LiveResult<Box<dyn MediaHandle>> {
        Err(LiveError::VideoNichtUnterstuetzt)
    }

    fn lautsprecher_oeffnen(
        &self,
        scheduler: PlaybackScheduler,
    ) -> LiveResult<Box<dyn MediaHandle>> {
        let worker =
            PlaybackWorker::starten(self.playback.clone(), scheduler).map_err(geraetefehler)?;
        Ok(Box::new(worker))
    }
}

//! Mikrofon-Capture via cpal
//!
//! Oeffnet einen cpal InputStream mit der nativen Rate des Geraets und
//! schreibt Samples in einen lock-free Ring-Buffer. Ein dedizierter Thread
//! liest den Puffer, mischt auf Mono, tastet auf die Uplink-Rate um und
//! verschickt Fenster fester Groesse als [`RealtimeInput`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::device::{load_cpal_input_device, stream_config_waehlen, Richtung};
use crate::error::{AudioError, AudioResult};
use crate::frame::{AudioFrame, RealtimeInput, EINGANG_SAMPLE_RATE};
use crate::pcm;
use crate::resample::Umtaster;

/// Standard-Fenstergroesse in Samples
pub const STANDARD_FENSTER: usize = 4096;

/// Kapazitaet des Ring-Buffers in Sekunden Geraete-Audio
const PUFFER_SEKUNDEN: usize = 2;

/// Konfiguration fuer den Audio-Capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Abtastrate des Uplinks in Hz
    pub sample_rate: u32,
    /// Bevorzugte Rate des Geraets (`None` = Uplink-Rate falls unterstuetzt)
    pub geraete_rate: Option<u32>,
    /// Samples pro ausgehendem Fenster (Mono)
    pub window_size: usize,
    /// Name des Eingabegeraets (`None` = Standardgeraet)
    pub device_name: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: EINGANG_SAMPLE_RATE,
            geraete_rate: None,
            window_size: STANDARD_FENSTER,
            device_name: None,
        }
    }
}

impl CaptureConfig {
    fn bevorzugte_raten(&self) -> Vec<u32> {
        self.geraete_rate
            .into_iter()
            .chain(std::iter::once(self.sample_rate))
            .collect()
    }
}

/// Konsumiert interleavte Geraete-Samples
pub type CaptureConsumer = HeapCons<f32>;

/// Audio-Capture-Stream
///
/// Haelt den cpal-Stream am Leben. Wird der CaptureStream gedroppt,
/// stoppt die Aufnahme automatisch.
pub struct CaptureStream {
    _stream: Stream,
    geraete_rate: u32,
    geraete_kanaele: u16,
}

impl CaptureStream {
    pub fn geraete_rate(&self) -> u32 {
        self.geraete_rate
    }

    pub fn geraete_kanaele(&self) -> u16 {
        self.geraete_kanaele
    }
}

/// Oeffnet einen Capture-Stream auf dem gegebenen Geraet.
///
/// Gibt den Stream und den Ring-Buffer Consumer zurueck.
/// Der Producer laeuft im cpal-Callback-Thread und alloziert nicht.
pub fn open_capture_stream(
    device: &Device,
    config: &CaptureConfig,
) -> AudioResult<(CaptureStream, CaptureConsumer)> {
    let supported = stream_config_waehlen(device, Richtung::Eingabe, &config.bevorzugte_raten())?;
    let sample_format = supported.sample_format();
    let stream_config = supported.config();
    let geraete_rate = stream_config.sample_rate.0;
    let geraete_kanaele = stream_config.channels.max(1);

    let rb = HeapRb::<f32>::new(geraete_rate as usize * geraete_kanaele as usize * PUFFER_SEKUNDEN);
    let (mut producer, consumer) = rb.split();

    let err_fn = |err| error!("Capture-Fehler: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    let written = producer.push_slice(data);
                    if written < data.len() {
                        warn!(
                            "Capture Ring-Buffer voll, {} Samples verworfen",
                            data.len() - written
                        );
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let written = producer.push_iter(data.iter().map(|&s| pcm::i16_zu_sample(s)));
                    if written < data.len() {
                        warn!("Capture Ring-Buffer voll");
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        _ => {
            return Err(AudioError::StreamFehler(format!(
                "Nicht unterstuetztes Sample-Format: {:?}",
                sample_format
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    debug!(
        "Capture-Stream geoeffnet: {}Hz {}ch {:?}, Uplink {}Hz",
        geraete_rate, geraete_kanaele, sample_format, config.sample_rate
    );

    Ok((
        CaptureStream {
            _stream: stream,
            geraete_rate,
            geraete_kanaele,
        },
        consumer,
    ))
}

// ---------------------------------------------------------------------------
// CaptureEncoder
// ---------------------------------------------------------------------------

/// Sammelt Samples und erzeugt Fenster fester Groesse
///
/// Mehrkanalige Eingaben werden auf Mono gemittelt und danach von der
/// Geraeterate auf die Uplink-Rate umgetastet. Unvollstaendige Reste
/// bleiben bis zum naechsten Aufruf im Puffer.
pub struct CaptureEncoder {
    sample_rate: u32,
    channels: usize,
    window_size: usize,
    umtaster: Umtaster,
    /// Mono-Samples in Geraeterate
    mono: Vec<f32>,
    /// Mono-Samples in Uplink-Rate
    puffer: Vec<f32>,
    /// Unvollstaendiger Mehrkanal-Frame aus dem letzten Aufruf
    rest: Vec<f32>,
}

impl CaptureEncoder {
    /// Encoder fuer Mono-Eingaben in Uplink-Rate
    pub fn new(config: &CaptureConfig) -> Self {
        Self::mit_umtaster(config, 1, Umtaster::durchreichend())
    }

    /// Encoder fuer ein Geraet mit eigener Rate und Kanalanzahl
    pub fn fuer_geraet(
        config: &CaptureConfig,
        geraete_rate: u32,
        geraete_kanaele: u16,
    ) -> AudioResult<Self> {
        let umtaster = Umtaster::neu(geraete_rate, config.sample_rate)?;
        Ok(Self::mit_umtaster(config, geraete_kanaele, umtaster))
    }

    fn mit_umtaster(config: &CaptureConfig, kanaele: u16, umtaster: Umtaster) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: kanaele.max(1) as usize,
            window_size: config.window_size.max(1),
            umtaster,
            mono: Vec::new(),
            puffer: Vec::with_capacity(config.window_size * 2),
            rest: Vec::new(),
        }
    }

    /// Interleavte Samples aufnehmen, vollstaendige Fenster kodieren
    pub fn verarbeiten(&mut self, samples: &[f32]) -> Vec<RealtimeInput> {
        self.mono.clear();
        if self.channels == 1 {
            self.mono.extend_from_slice(samples);
        } else {
            self.rest.extend_from_slice(samples);
            let vollstaendig = self.rest.len() / self.channels * self.channels;
            for frame in self.rest[..vollstaendig].chunks_exact(self.channels) {
                self.mono
                    .push(frame.iter().sum::<f32>() / self.channels as f32);
            }
            self.rest.drain(..vollstaendig);
        }
        if let Err(e) = self.umtaster.verarbeiten(&self.mono, &mut self.puffer) {
            warn!("Capture-Block nicht umgetastet, verworfen: {}", e);
        }

        let mut fenster = Vec::new();
        while self.puffer.len() >= self.window_size {
            let samples: Vec<f32> = self.puffer.drain(..self.window_size).collect();
            let frame = AudioFrame::new(samples, self.sample_rate, 1);
            fenster.push(RealtimeInput::aus_frame(&frame));
        }
        fenster
    }

    /// Anzahl gepufferter Mono-Samples
    pub fn gepuffert(&self) -> usize {
        self.puffer.len()
    }
}

// ---------------------------------------------------------------------------
// CaptureWorker
// ---------------------------------------------------------------------------

/// Laufende Mikrofon-Aufnahme
///
/// cpal::Stream ist !Send, daher lebt der Stream in einem dedizierten
/// std::thread, der auch den Ringpuffer ausliest und die Fenster in den
/// Kanal schreibt. Der Kanal ist unbegrenzt: es gibt keinen Rueckstau.
pub struct CaptureWorker {
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CaptureWorker {
    /// Oeffnet das Mikrofon und startet den Sende-Loop
    ///
    /// Kehrt erst zurueck wenn der Stream laeuft oder das Oeffnen
    /// fehlgeschlagen ist.
    pub fn starten(
        config: CaptureConfig,
        ziel: mpsc::UnboundedSender<RealtimeInput>,
    ) -> AudioResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let (init_tx, init_rx) = std::sync::mpsc::sync_channel::<AudioResult<()>>(1);

        let thread = std::thread::Builder::new()
            .name("leon-capture".to_string())
            .spawn(move || {
                let geoeffnet = load_cpal_input_device(config.device_name.as_deref())
                    .and_then(|device| open_capture_stream(&device, &config))
                    .and_then(|(stream, consumer)| {
                        let encoder = CaptureEncoder::fuer_geraet(
                            &config,
                            stream.geraete_rate(),
                            stream.geraete_kanaele(),
                        )?;
                        Ok((stream, consumer, encoder))
                    });
                let (_stream, consumer, encoder) = match geoeffnet {
                    Ok(s) => {
                        let _ = init_tx.send(Ok(()));
                        s
                    }
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };

                sende_loop(consumer, encoder, ziel, thread_running);
                debug!("Capture-Thread beendet, cpal-Stream wird gedroppt");
            })
            .map_err(|e| AudioError::StreamFehler(format!("Capture-Thread: {e}")))?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                info!("Mikrofon-Aufnahme gestartet");
                Ok(Self {
                    running,
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::StreamFehler(
                    "Capture-Thread ohne Rueckmeldung beendet".to_string(),
                ))
            }
        }
    }

    pub fn laeuft(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stoppt die Aufnahme und wartet auf den Thread
    pub fn stoppen(mut self) {
        self.beenden();
    }

    fn beenden(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
            info!("Mikrofon-Aufnahme gestoppt");
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.beenden();
    }
}

/// Liest den Ring-Buffer bis `running` false wird oder der Empfaenger weg ist
fn sende_loop(
    mut consumer: CaptureConsumer,
    mut encoder: CaptureEncoder,
    ziel: mpsc::UnboundedSender<RealtimeInput>,
    running: Arc<AtomicBool>,
) {
    let mut temp_buf = vec![0.0f32; encoder.window_size * encoder.channels];

    while running.load(Ordering::Relaxed) {
        let gelesen = consumer.pop_slice(&mut temp_buf);
        if gelesen == 0 {
            std::thread::sleep(Duration::from_millis(5));
            continue;
        }

        for input in encoder.verarbeiten(&temp_buf[..gelesen]) {
            trace!(bytes = input.data.len(), "Capture-Fenster kodiert");
            if ziel.send(input).is_err() {
                debug!("Capture-Empfaenger geschlossen, Sende-Loop endet");
                running.store(false, Ordering::Relaxed);
                return;
            }
        }
    }
}

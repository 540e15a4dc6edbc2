//! Lueckenloses Playback mit Barge-in
//!
//! Eingehende Frames werden auf eine gemeinsame Zeitleiste gelegt:
//! `start = max(naechster_start, jetzt)`, danach `naechster_start += dauer`.
//! Der cpal-Callback (oder ein Test ueber [`PlaybackScheduler::render`])
//! mischt die Zeitleiste in den Ausgabepuffer, schiebt die Uhr vor und
//! entfernt abgespielte Quellen. Ein Interrupt verwirft alle Quellen und
//! setzt `naechster_start` auf null.
//!
//! Die Zeitleiste laeuft immer mit der Rate des Modell-Audios. Das
//! Ausgabegeraet laeuft mit seiner nativen Rate; der Callback tastet um.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

use crate::device::{load_cpal_output_device, stream_config_waehlen, Richtung};
use crate::error::{AudioError, AudioResult};
use crate::frame::AudioFrame;
use crate::pcm;
use crate::resample::ZiehUmtaster;

/// Konfiguration fuer den Audio-Playback
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackConfig {
    /// Bevorzugte Rate des Geraets (`None` = Rate der Zeitleiste falls unterstuetzt)
    pub geraete_rate: Option<u32>,
    /// Name des Ausgabegeraets (`None` = Standardgeraet)
    pub device_name: Option<String>,
}

/// Ergebnis von [`PlaybackScheduler::schedule`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eingeplant {
    /// Startzeit auf der Playback-Uhr in Sekunden
    pub start: f64,
    /// Dauer in Sekunden
    pub dauer: f64,
}

struct Quelle {
    /// Start auf der Uhr in Samples
    start: u64,
    samples: Arc<[f32]>,
}

impl Quelle {
    fn ende(&self) -> u64 {
        self.start + self.samples.len() as u64
    }
}

struct Zeitleiste {
    quellen: Vec<Quelle>,
    /// Bereits gerenderte Samples
    uhr: u64,
    /// Naechster Startzeitpunkt in Sekunden
    naechster_start: f64,
}

/// Gemeinsame Playback-Zeitleiste
///
/// Klone teilen dieselbe Zeitleiste. Alle Zeiten sind Sekunden auf der
/// Playback-Uhr, die ausschliesslich durch `render` vorangeschoben wird.
#[derive(Clone)]
pub struct PlaybackScheduler {
    sample_rate: u32,
    inner: Arc<Mutex<Zeitleiste>>,
}

impl PlaybackScheduler {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            inner: Arc::new(Mutex::new(Zeitleiste {
                quellen: Vec::new(),
                uhr: 0,
                naechster_start: 0.0,
            })),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frame lueckenlos hinter den zuletzt eingeplanten legen
    ///
    /// Der Frame muss Mono sein und die Abtastrate des Schedulers haben.
    pub fn schedule(&self, frame: &AudioFrame) -> AudioResult<Eingeplant> {
        if frame.sample_rate() != self.sample_rate || frame.channels() != 1 {
            return Err(AudioError::Konfiguration(format!(
                "Playback erwartet {} Hz Mono, erhalten {} Hz {}ch",
                self.sample_rate,
                frame.sample_rate(),
                frame.channels()
            )));
        }

        let rate = self.sample_rate as f64;
        let dauer = frame.dauer();
        let mut zeitleiste = self.inner.lock();

        let jetzt = zeitleiste.uhr as f64 / rate;
        let start = zeitleiste.naechster_start.max(jetzt);
        zeitleiste.naechster_start = start + dauer;

        if !frame.ist_leer() {
            let start_sample = (start * rate).round() as u64;
            let uhr = zeitleiste.uhr;
            zeitleiste.quellen.push(Quelle {
                start: start_sample.max(uhr),
                samples: frame.samples_arc(),
            });
        }

        trace!(start, dauer, ausstehend = zeitleiste.quellen.len(), "Frame eingeplant");
        Ok(Eingeplant { start, dauer })
    }

    /// Barge-in: alle laufenden und geplanten Quellen verwerfen
    ///
    /// Gibt die Anzahl verworfener Quellen zurueck.
    pub fn interrupt(&self) -> usize {
        let mut zeitleiste = self.inner.lock();
        let verworfen = zeitleiste.quellen.len();
        zeitleiste.quellen.clear();
        zeitleiste.naechster_start = 0.0;
        verworfen
    }

    /// Naechster Startzeitpunkt in Sekunden
    pub fn next_start_time(&self) -> f64 {
        self.inner.lock().naechster_start
    }

    /// Anzahl laufender oder geplanter Quellen
    pub fn pending_count(&self) -> usize {
        self.inner.lock().quellen.len()
    }

    /// Aktuelle Zeit der Playback-Uhr in Sekunden
    pub fn current_time(&self) -> f64 {
        self.inner.lock().uhr as f64 / self.sample_rate as f64
    }

    /// Mono-Ausgabe rendern und die Uhr um `ausgabe.len()` Samples vorschieben
    ///
    /// Sich ueberlappende Quellen werden addiert und auf [-1, 1] begrenzt.
    /// Vollstaendig abgespielte Quellen werden entfernt.
    pub fn render(&self, ausgabe: &mut [f32]) {
        ausgabe.fill(0.0);
        let mut zeitleiste = self.inner.lock();
        let von = zeitleiste.uhr;
        let bis = von + ausgabe.len() as u64;

        for quelle in &zeitleiste.quellen {
            let anfang = quelle.start.max(von);
            let ende = quelle.ende().min(bis);
            if anfang >= ende {
                continue;
            }
            let quell_offset = (anfang - quelle.start) as usize;
            let ziel_offset = (anfang - von) as usize;
            let laenge = (ende - anfang) as usize;
            for (out, s) in ausgabe[ziel_offset..ziel_offset + laenge]
                .iter_mut()
                .zip(&quelle.samples[quell_offset..quell_offset + laenge])
            {
                *out += *s;
            }
        }

        if zeitleiste.quellen.len() > 1 {
            for s in ausgabe.iter_mut() {
                *s = s.clamp(-1.0, 1.0);
            }
        }

        zeitleiste.uhr = bis;
        zeitleiste.quellen.retain(|q| q.ende() > bis);
    }
}

// ---------------------------------------------------------------------------
// cpal OutputStream
// ---------------------------------------------------------------------------

/// Rendert die Zeitleiste in Rate und Kanalanzahl des Geraets
///
/// Lebt im cpal-Callback. Alle Puffer werden beim Anlegen reserviert.
struct GeraeteAusgabe {
    scheduler: PlaybackScheduler,
    umtaster: ZiehUmtaster,
    mono: Vec<f32>,
    kanaele: usize,
}

impl GeraeteAusgabe {
    fn neu(scheduler: PlaybackScheduler, geraete_rate: u32, kanaele: u16) -> AudioResult<Self> {
        Ok(Self {
            umtaster: ZiehUmtaster::neu(scheduler.sample_rate(), geraete_rate)?,
            scheduler,
            // Eine Sekunde reicht fuer jede uebliche Callback-Groesse
            mono: vec![0.0; geraete_rate as usize],
            kanaele: kanaele.max(1) as usize,
        })
    }

    /// Mono-Block fuer `frames` Geraete-Frames
    fn rendern(&mut self, frames: usize) -> &[f32] {
        if self.mono.len() < frames {
            self.mono.resize(frames, 0.0);
        }
        let block = &mut self.mono[..frames];
        let scheduler = &self.scheduler;
        if let Err(e) = self.umtaster.fuellen(block, |puffer| scheduler.render(puffer)) {
            block.fill(0.0);
            error!("Playback-Block nicht umgetastet: {}", e);
        }
        &self.mono[..frames]
    }
}

/// Audio-Playback-Stream
pub struct PlaybackStream {
    _stream: Stream,
    geraete_rate: u32,
}

impl PlaybackStream {
    pub fn geraete_rate(&self) -> u32 {
        self.geraete_rate
    }
}

/// Oeffnet einen Playback-Stream, der die Zeitleiste im cpal-Callback rendert
pub fn open_playback_stream(
    device: &Device,
    config: &PlaybackConfig,
    scheduler: PlaybackScheduler,
) -> AudioResult<PlaybackStream> {
    let bevorzugt: Vec<u32> = config
        .geraete_rate
        .into_iter()
        .chain(std::iter::once(scheduler.sample_rate()))
        .collect();
    let supported = stream_config_waehlen(device, Richtung::Ausgabe, &bevorzugt)?;
    let sample_format = supported.sample_format();
    let stream_config = supported.config();
    let geraete_rate = stream_config.sample_rate.0;
    let zeitleiste_rate = scheduler.sample_rate();

    let mut ausgabe = GeraeteAusgabe::neu(scheduler, geraete_rate, stream_config.channels)?;
    let err_fn = |err| error!("Playback-Fehler: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| {
                    let kanaele = ausgabe.kanaele;
                    let mono = ausgabe.rendern(data.len() / kanaele);
                    for (frame, s) in data.chunks_exact_mut(kanaele).zip(mono) {
                        frame.fill(*s);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        SampleFormat::I16 => device
            .build_output_stream(
                &stream_config,
                move |data: &mut [i16], _| {
                    let kanaele = ausgabe.kanaele;
                    let mono = ausgabe.rendern(data.len() / kanaele);
                    for (frame, s) in data.chunks_exact_mut(kanaele).zip(mono) {
                        frame.fill(pcm::sample_zu_i16(*s));
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
        "Playback-Stream geoeffnet: {}Hz {}ch {:?}, Zeitleiste {}Hz",
        geraete_rate, stream_config.channels, sample_format, zeitleiste_rate
    );

    Ok(PlaybackStream {
        _stream: stream,
        geraete_rate,
    })
}

/// Laufende Lautsprecher-Ausgabe
///
/// Haelt den (!Send) cpal-Stream in einem eigenen Thread, bis
/// [`PlaybackWorker::stoppen`] aufgerufen oder der Worker gedroppt wird.
pub struct PlaybackWorker {
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl PlaybackWorker {
    pub fn starten(config: PlaybackConfig, scheduler: PlaybackScheduler) -> AudioResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let (init_tx, init_rx) = std::sync::mpsc::sync_channel::<AudioResult<()>>(1);

        let thread = std::thread::Builder::new()
            .name("leon-playback".to_string())
            .spawn(move || {
                let geoeffnet = load_cpal_output_device(config.device_name.as_deref())
                    .and_then(|device| open_playback_stream(&device, &config, scheduler));
                let _stream = match geoeffnet {
                    Ok(s) => {
                        let _ = init_tx.send(Ok(()));
                        s
                    }
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                while thread_running.load(Ordering::Relaxed) {
                    std::thread::sleep(Duration::from_millis(20));
                }
                debug!("Playback-Thread beendet, cpal-Stream wird gedroppt");
            })
            .map_err(|e| AudioError::StreamFehler(format!("Playback-Thread: {e}")))?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                info!("Lautsprecher-Ausgabe gestartet");
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
                    "Playback-Thread ohne Rueckmeldung beendet".to_string(),
                ))
            }
        }
    }

    pub fn stoppen(mut self) {
        self.beenden();
    }

    fn beenden(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
            info!("Lautsprecher-Ausgabe gestoppt");
        }
    }
}

impl Drop for PlaybackWorker {
    fn drop(&mut self) {
        self.beenden();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::traits::HostTrait;

    const RATE: u32 = 24_000;

    fn frame(samples: usize, wert: f32) -> AudioFrame {
        AudioFrame::new(vec![wert; samples], RATE, 1)
    }

    #[test]
    fn playback_config_default() {
        let config = PlaybackConfig::default();
        assert_eq!(config.geraete_rate, None);
        assert_eq!(config.device_name, None);
    }

    #[test]
    fn geraet_mit_48k_spielt_24k_zeitleiste() {
        let scheduler = PlaybackScheduler::new(RATE);
        scheduler.schedule(&frame(24_000, 0.5)).unwrap();
        let mut ausgabe = GeraeteAusgabe::neu(scheduler.clone(), 48_000, 2).unwrap();

        // 10-ms-Callbacks
        for _ in 0..10 {
            ausgabe.rendern(480);
        }
        assert!(ausgabe.rendern(480).iter().all(|s| (s - 0.5).abs() < 0.01));
        let uhr = scheduler.current_time();
        assert!((0.1..0.2).contains(&uhr), "Uhr {uhr}");

        scheduler.interrupt();
        ausgabe.rendern(2 * 480);
        assert!(
            ausgabe.rendern(480).iter().all(|&s| s == 0.0),
            "nach Interrupt hoechstens ein Resampler-Block Nachlauf"
        );
    }

    #[test]
    fn gleiche_rate_ohne_umtastung() {
        let scheduler = PlaybackScheduler::new(RATE);
        scheduler.schedule(&frame(100, 0.25)).unwrap();
        let mut ausgabe = GeraeteAusgabe::neu(scheduler.clone(), RATE, 1).unwrap();

        let block = ausgabe.rendern(200).to_vec();
        assert!(block[..100].iter().all(|&s| s == 0.25));
        assert!(block[100..].iter().all(|&s| s == 0.0));
        assert_eq!(scheduler.current_time(), 200.0 / RATE as f64);
    }

    #[test]
    fn schnelle_frames_liegen_lueckenlos_hintereinander() {
        let scheduler = PlaybackScheduler::new(RATE);
        let laengen = [2400usize, 1200, 4800, 240];
        let mut summe = 0.0;
        for n in laengen {
            let geplant = scheduler.schedule(&frame(n, 0.1)).unwrap();
            assert!((geplant.start - summe).abs() < 1e-9);
            summe += n as f64 / RATE as f64;
        }
        assert!((scheduler.next_start_time() - summe).abs() < 1e-9);
        assert_eq!(scheduler.pending_count(), laengen.len());
    }

    #[test]
    fn rendern_ohne_luecke() {
        let scheduler = PlaybackScheduler::new(RATE);
        scheduler.schedule(&frame(100, 0.25)).unwrap();
        scheduler.schedule(&frame(100, 0.5)).unwrap();

        let mut out = vec![0.0; 250];
        scheduler.render(&mut out);
        assert!(out[..100].iter().all(|&s| s == 0.25));
        assert!(out[100..200].iter().all(|&s| s == 0.5));
        assert!(out[200..].iter().all(|&s| s == 0.0));
        assert_eq!(scheduler.pending_count(), 0, "abgespielte Quellen entfernen sich");
    }

    #[test]
    fn spaeter_frame_startet_jetzt() {
        let scheduler = PlaybackScheduler::new(RATE);
        scheduler.schedule(&frame(240, 0.1)).unwrap();
        let mut out = vec![0.0; 2400];
        scheduler.render(&mut out);

        let geplant = scheduler.schedule(&frame(240, 0.1)).unwrap();
        assert!((geplant.start - 0.1).abs() < 1e-9);
        assert!(scheduler.next_start_time() >= geplant.start);
    }

    #[test]
    fn interrupt_verwirft_alles() {
        let scheduler = PlaybackScheduler::new(RATE);
        for _ in 0..3 {
            scheduler.schedule(&frame(2400, 0.8)).unwrap();
        }
        let mut out = vec![0.0; 100];
        scheduler.render(&mut out);
        assert!(out.iter().all(|&s| s != 0.0));

        assert_eq!(scheduler.interrupt(), 3);
        assert_eq!(scheduler.next_start_time(), 0.0);
        assert_eq!(scheduler.pending_count(), 0);

        let mut rest = vec![1.0; 24_000];
        scheduler.render(&mut rest);
        assert!(rest.iter().all(|&s| s == 0.0), "nach Interrupt kein Ton mehr");
    }

    #[test]
    fn nach_interrupt_beginnt_neue_kette_bei_jetzt() {
        let scheduler = PlaybackScheduler::new(RATE);
        scheduler.schedule(&frame(24_000, 0.5)).unwrap();
        let mut out = vec![0.0; 12_000];
        scheduler.render(&mut out);
        scheduler.interrupt();

        let geplant = scheduler.schedule(&frame(240, 0.5)).unwrap();
        assert!((geplant.start - 0.5).abs() < 1e-9);
    }

    #[test]
    fn falsche_rate_abgelehnt() {
        let scheduler = PlaybackScheduler::new(RATE);
        let result = scheduler.schedule(&AudioFrame::new(vec![0.0; 10], 16_000, 1));
        assert!(matches!(result, Err(AudioError::Konfiguration(_))));
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn playback_stream_oeffnen() {
        let host = cpal::default_host();
        if let Some(device) = host.default_output_device() {
            let result = open_playback_stream(
                &device,
                &PlaybackConfig::default(),
                PlaybackScheduler::new(RATE),
            );
            assert!(result.is_ok(), "Playback-Stream sollte oeffenbar sein");
        }
    }
}

//! Abtastratenwandlung zwischen Geraet und Realtime-Kanal
//!
//! Mikrofon und Lautsprecher laufen mit der nativen Rate des Geraets, der
//! Realtime-Kanal mit 16 kHz (Uplink) bzw. 24 kHz (Modell-Audio). Beide
//! Richtungen wandeln Mono-Samples ueber rubato. Bei gleicher Rate wird
//! durchgereicht.
//!
//! - [`Umtaster`] nimmt beliebig grosse Bloecke entgegen (Capture-Thread)
//! - [`ZiehUmtaster`] fuellt einen Ausgabepuffer und zieht dafuer genau so
//!   viele Quell-Samples wie noetig (cpal-Output-Callback). Nach dem
//!   Anlegen wird nicht mehr alloziert.

use rubato::{FastFixedIn, FastFixedOut, PolynomialDegree, Resampler};

use crate::error::{AudioError, AudioResult};

/// Blockgroesse des Resamplers in Samples
const BLOCK: usize = 480;
/// rubato verlangt einen Spielraum fuer Ratenaenderungen, genutzt wird er nicht
const MAX_RELATIV: f64 = 1.1;

fn resampler_fehler(e: impl std::fmt::Display) -> AudioError {
    AudioError::Konfiguration(format!("Resampler: {e}"))
}

/// Wandelt einen Strom von `von` Hz nach `nach` Hz (Push-Betrieb)
pub struct Umtaster {
    resampler: Option<FastFixedIn<f32>>,
    /// Noch nicht verarbeitete Eingangs-Samples
    eingang: Vec<f32>,
    ausgang: Vec<f32>,
}

impl Umtaster {
    pub fn neu(von: u32, nach: u32) -> AudioResult<Self> {
        if von == 0 || nach == 0 {
            return Err(AudioError::Konfiguration(format!(
                "Ungueltige Abtastrate: {von} Hz -> {nach} Hz"
            )));
        }
        if von == nach {
            return Ok(Self::durchreichend());
        }

        let resampler = FastFixedIn::<f32>::new(
            nach as f64 / von as f64,
            MAX_RELATIV,
            PolynomialDegree::Linear,
            BLOCK,
            1,
        )
        .map_err(resampler_fehler)?;
        let ausgang = vec![0.0; resampler.output_frames_max()];
        Ok(Self {
            resampler: Some(resampler),
            eingang: Vec::with_capacity(BLOCK * 2),
            ausgang,
        })
    }

    pub fn durchreichend() -> Self {
        Self {
            resampler: None,
            eingang: Vec::new(),
            ausgang: Vec::new(),
        }
    }

    pub fn ist_durchreichend(&self) -> bool {
        self.resampler.is_none()
    }

    /// Haengt die gewandelten Samples an `ziel` an
    ///
    /// Ein unvollstaendiger Block bleibt bis zum naechsten Aufruf liegen.
    pub fn verarbeiten(&mut self, samples: &[f32], ziel: &mut Vec<f32>) -> AudioResult<()> {
        let Some(resampler) = self.resampler.as_mut() else {
            ziel.extend_from_slice(samples);
            return Ok(());
        };

        self.eingang.extend_from_slice(samples);
        let mut verbraucht = 0;
        loop {
            let benoetigt = resampler.input_frames_next();
            if self.eingang.len() - verbraucht < benoetigt {
                break;
            }
            let eingang: [&[f32]; 1] = [&self.eingang[verbraucht..verbraucht + benoetigt]];
            let mut ausgang: [&mut [f32]; 1] = [&mut self.ausgang[..]];
            let (gelesen, erzeugt) = resampler
                .process_into_buffer(&eingang, &mut ausgang, None)
                .map_err(resampler_fehler)?;
            verbraucht += gelesen;
            ziel.extend_from_slice(&self.ausgang[..erzeugt]);
        }
        self.eingang.drain(..verbraucht);
        Ok(())
    }
}

/// Liefert Samples in `nach` Hz aus einer Quelle mit `von` Hz (Pull-Betrieb)
pub struct ZiehUmtaster {
    resampler: Option<FastFixedOut<f32>>,
    quelle: Vec<f32>,
    ausgang: Vec<f32>,
    /// Lesezeiger in `ausgang`
    position: usize,
    verfuegbar: usize,
}

impl ZiehUmtaster {
    pub fn neu(von: u32, nach: u32) -> AudioResult<Self> {
        if von == 0 || nach == 0 {
            return Err(AudioError::Konfiguration(format!(
                "Ungueltige Abtastrate: {von} Hz -> {nach} Hz"
            )));
        }
        if von == nach {
            return Ok(Self {
                resampler: None,
                quelle: Vec::new(),
                ausgang: Vec::new(),
                position: 0,
                verfuegbar: 0,
            });
        }

        let resampler = FastFixedOut::<f32>::new(
            nach as f64 / von as f64,
            MAX_RELATIV,
            PolynomialDegree::Linear,
            BLOCK,
            1,
        )
        .map_err(resampler_fehler)?;
        Ok(Self {
            quelle: vec![0.0; resampler.input_frames_max()],
            ausgang: vec![0.0; resampler.output_frames_max()],
            resampler: Some(resampler),
            position: 0,
            verfuegbar: 0,
        })
    }

    pub fn ist_durchreichend(&self) -> bool {
        self.resampler.is_none()
    }

    /// Fuellt `ausgabe` vollstaendig
    ///
    /// `quelle` muss den uebergebenen Puffer komplett beschreiben.
    pub fn fuellen<F>(&mut self, ausgabe: &mut [f32], mut quelle: F) -> AudioResult<()>
    where
        F: FnMut(&mut [f32]),
    {
        let Some(resampler) = self.resampler.as_mut() else {
            quelle(ausgabe);
            return Ok(());
        };

        let mut geschrieben = 0;
        while geschrieben < ausgabe.len() {
            if self.position == self.verfuegbar {
                let benoetigt = resampler.input_frames_next();
                quelle(&mut self.quelle[..benoetigt]);
                let eingang: [&[f32]; 1] = [&self.quelle[..benoetigt]];
                let mut ausgang: [&mut [f32]; 1] = [&mut self.ausgang[..]];
                let (_, erzeugt) = resampler
                    .process_into_buffer(&eingang, &mut ausgang, None)
                    .map_err(resampler_fehler)?;
                if erzeugt == 0 {
                    return Err(AudioError::Konfiguration(
                        "Resampler liefert keine Samples".to_string(),
                    ));
                }
                self.position = 0;
                self.verfuegbar = erzeugt;
            }

            let anzahl = (self.verfuegbar - self.position).min(ausgabe.len() - geschrieben);
            ausgabe[geschrieben..geschrieben + anzahl]
                .copy_from_slice(&self.ausgang[self.position..self.position + anzahl]);
            self.position += anzahl;
            geschrieben += anzahl;
        }
        Ok(())
    }
}

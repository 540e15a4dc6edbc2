//! Audio-Geraete-Enumeration und -Auswahl

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};
use tracing::{debug, warn};

use crate::error::{AudioError, AudioResult};

/// Gaengige Abtastraten fuer die Geraeteuebersicht
const GEPRUEFTE_RATEN: [u32; 5] = [8000, 16000, 24000, 44100, 48000];

/// Ein- oder Ausgaberichtung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Richtung {
    Eingabe,
    Ausgabe,
}

/// Repraesentiert ein Audio-Geraet mit seinen Eigenschaften
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
    pub richtung: Richtung,
    /// Unterstuetzte Abtastraten (aus [`GEPRUEFTE_RATEN`])
    pub sample_rates: Vec<u32>,
    /// Maximale Kanalanzahl
    pub channels: u16,
}

impl AudioDevice {
    /// Gibt true zurueck wenn das Geraet die Rate unterstuetzt
    pub fn unterstuetzt(&self, sample_rate: u32) -> bool {
        self.sample_rates.contains(&sample_rate)
    }
}

/// Listet alle Geraete einer Richtung auf
pub fn list_devices(richtung: Richtung) -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let devices: Vec<Device> = match richtung {
        Richtung::Eingabe => host.input_devices().map(|d| d.collect()),
        Richtung::Ausgabe => host.output_devices().map(|d| d.collect()),
    }
    .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let mut result = Vec::new();
    for device in devices {
        match beschreiben(&device, richtung) {
            Ok(ad) => result.push(ad),
            Err(e) => warn!("Geraet ({:?}) konnte nicht gelesen werden: {}", richtung, e),
        }
    }
    debug!("Gefundene Geraete ({:?}): {}", richtung, result.len());
    Ok(result)
}

/// Laedt ein cpal-Device fuer Eingabe (`None` = Standardgeraet)
pub fn load_cpal_input_device(name: Option<&str>) -> AudioResult<Device> {
    laden(Richtung::Eingabe, name)
}

/// Laedt ein cpal-Device fuer Ausgabe (`None` = Standardgeraet)
pub fn load_cpal_output_device(name: Option<&str>) -> AudioResult<Device> {
    laden(Richtung::Ausgabe, name)
}

fn laden(richtung: Richtung, name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    let Some(gesucht) = name else {
        return match richtung {
            Richtung::Eingabe => host
                .default_input_device()
                .ok_or(AudioError::KeinStandardEingabegeraet),
            Richtung::Ausgabe => host
                .default_output_device()
                .ok_or(AudioError::KeinStandardAusgabegeraet),
        };
    };

    let mut devices: Box<dyn Iterator<Item = Device>> = match richtung {
        Richtung::Eingabe => Box::new(
            host.input_devices()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        ),
        Richtung::Ausgabe => Box::new(
            host.output_devices()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        ),
    };
    devices
        .find(|d| d.name().map(|n| n.contains(gesucht)).unwrap_or(false))
        .ok_or_else(|| AudioError::GeraetNichtGefunden(gesucht.to_string()))
}

fn beschreiben(device: &Device, richtung: Richtung) -> AudioResult<AudioDevice> {
    let name = device
        .name()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let bereiche: Vec<(u32, u32, u16)> = match richtung {
        Richtung::Eingabe => device.supported_input_configs().map(|cfgs| {
            cfgs.map(|c| (c.min_sample_rate().0, c.max_sample_rate().0, c.channels()))
                .collect()
        }),
        Richtung::Ausgabe => device.supported_output_configs().map(|cfgs| {
            cfgs.map(|c| (c.min_sample_rate().0, c.max_sample_rate().0, c.channels()))
                .collect()
        }),
    }
    .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    Ok(aus_bereichen(name, richtung, &bereiche))
}

/// Waehlt die Stream-Konfiguration eines Geraets
///
/// Genommen wird die erste Rate aus `bevorzugt`, die das Geraet mit F32 oder
/// I16 anbietet. Sonst gilt die Standardkonfiguration des Geraets, deren
/// Rate dann umgetastet wird.
pub fn stream_config_waehlen(
    device: &Device,
    richtung: Richtung,
    bevorzugt: &[u32],
) -> AudioResult<SupportedStreamConfig> {
    let bereiche: Vec<SupportedStreamConfigRange> = match richtung {
        Richtung::Eingabe => device.supported_input_configs().map(|c| c.collect()),
        Richtung::Ausgabe => device.supported_output_configs().map(|c| c.collect()),
    }
    .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let nutzbar: Vec<&SupportedStreamConfigRange> = bereiche
        .iter()
        .filter(|b| matches!(b.sample_format(), SampleFormat::F32 | SampleFormat::I16))
        .collect();
    let raten: Vec<(u32, u32)> = nutzbar
        .iter()
        .map(|b| (b.min_sample_rate().0, b.max_sample_rate().0))
        .collect();

    if let Some((index, rate)) = bereich_waehlen(&raten, bevorzugt) {
        return Ok(nutzbar[index].clone().with_sample_rate(cpal::SampleRate(rate)));
    }

    let standard = match richtung {
        Richtung::Eingabe => device.default_input_config(),
        Richtung::Ausgabe => device.default_output_config(),
    }
    .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
    debug!(
        rate = standard.sample_rate().0,
        "Keine bevorzugte Rate verfuegbar, verwende Geraete-Standard"
    );
    Ok(standard)
}

/// Index des ersten Bereichs, der eine bevorzugte Rate abdeckt
fn bereich_waehlen(bereiche: &[(u32, u32)], bevorzugt: &[u32]) -> Option<(usize, u32)> {
    bevorzugt.iter().find_map(|&rate| {
        bereiche
            .iter()
            .position(|&(min, max)| min <= rate && rate <= max)
            .map(|index| (index, rate))
    })
}

fn aus_bereichen(name: String, richtung: Richtung, bereiche: &[(u32, u32, u16)]) -> AudioDevice {
    let mut sample_rates: Vec<u32> = GEPRUEFTE_RATEN
        .into_iter()
        .filter(|rate| bereiche.iter().any(|(min, max, _)| rate >= min && rate <= max))
        .collect();
    sample_rates.sort_unstable();

    AudioDevice {
        name,
        richtung,
        sample_rates,
        channels: bereiche.iter().map(|(_, _, ch)| *ch).max().unwrap_or(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn eingabegeraete_auflistbar() {
        let devices = list_devices(Richtung::Eingabe).expect("Liste sollte abrufbar sein");
        println!(
            "Eingabegeraete: {:?}",
            devices.iter().map(|d| &d.name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn raten_aus_bereichen() {
        let dev = aus_bereichen(
            "Test Mikrofon".to_string(),
            Richtung::Eingabe,
            &[(16000, 16000, 1), (44100, 48000, 2)],
        );
        assert_eq!(dev.sample_rates, vec![16000, 44100, 48000]);
        assert_eq!(dev.channels, 2);
        assert!(dev.unterstuetzt(16000));
        assert!(!dev.unterstuetzt(24000));
    }

    #[test]
    fn bevorzugte_rate_vor_standard() {
        let bereiche = [(48_000, 48_000), (8_000, 24_000)];
        assert_eq!(bereich_waehlen(&bereiche, &[16_000]), Some((1, 16_000)));
        assert_eq!(bereich_waehlen(&bereiche, &[48_000, 16_000]), Some((0, 48_000)));
        // Typisches USB-Headset: nur 44.1/48 kHz
        assert_eq!(bereich_waehlen(&[(44_100, 48_000)], &[16_000]), None);
        assert_eq!(bereich_waehlen(&[], &[24_000]), None);
    }

    #[test]
    fn ohne_bereiche_mono() {
        let dev = aus_bereichen("leer".to_string(), Richtung::Ausgabe, &[]);
        assert!(dev.sample_rates.is_empty());
        assert_eq!(dev.channels, 1);
    }
}

//! Tests fuer den LiveSessionController

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use leon_audio::pcm;
use leon_audio::RealtimeInput;
use leon_core::{
    BroadcastBus, Capability, EngineEvent, EventBus, PermissionStatus, SessionState,
    TranscriptQuelle,
};

use super::{Gegenstelle, MockGeraete, MockTransport, TestGate};
use crate::config::LiveConfig;
use crate::error::LiveError;
use crate::session::LiveSessionController;
use crate::transport::{ServerMessage, TransportEvent};

const WARTEZEIT: Duration = Duration::from_secs(2);

struct Aufbau {
    controller: LiveSessionController,
    transport: Arc<MockTransport>,
    geraete: Arc<MockGeraete>,
    gate: Arc<TestGate>,
    bus: BroadcastBus,
}

fn aufbau_mit(gate: TestGate, transport: MockTransport, geraete: MockGeraete) -> Aufbau {
    aufbau_mit_config(LiveConfig::default(), gate, transport, geraete)
}

fn aufbau_mit_config(
    config: LiveConfig,
    gate: TestGate,
    transport: MockTransport,
    geraete: MockGeraete,
) -> Aufbau {
    let transport = Arc::new(transport);
    let geraete = Arc::new(geraete);
    let gate = Arc::new(gate);
    let bus = BroadcastBus::neu();
    let controller = LiveSessionController::neu(
        config,
        transport.clone(),
        gate.clone(),
        geraete.clone(),
        Arc::new(bus.clone()),
    );
    Aufbau {
        controller,
        transport,
        geraete,
        gate,
        bus,
    }
}

fn aufbau(mikrofon: PermissionStatus) -> Aufbau {
    aufbau_mit(
        TestGate::mit(&[(Capability::Microphone, mikrofon)]),
        MockTransport::default(),
        MockGeraete::default(),
    )
}

async fn warte_auf_zustand(controller: &LiveSessionController, ziel: SessionState) {
    let mut rx = controller.zustand_abonnieren();
    timeout(WARTEZEIT, rx.wait_for(|s| *s == ziel))
        .await
        .expect("Zeitueberschreitung beim Warten auf Zustand")
        .expect("Zustandskanal geschlossen");
}

async fn warte_auf<F>(rx: &mut broadcast::Receiver<EngineEvent>, mut passt: F) -> EngineEvent
where
    F: FnMut(&EngineEvent) -> bool,
{
    timeout(WARTEZEIT, async {
        loop {
            let event = rx.recv().await.expect("Event-Bus geschlossen");
            if passt(&event) {
                return event;
            }
        }
    })
    .await
    .expect("Zeitueberschreitung beim Warten auf Ereignis")
}

/// Startet eine Session und wartet bis sie aktiv ist
async fn aktive_session(a: &Aufbau) -> Gegenstelle {
    a.controller.start(false).await.unwrap();
    let gegenstelle = a.transport.gegenstelle();
    gegenstelle.ereignisse.send(TransportEvent::Open).await.unwrap();
    warte_auf_zustand(&a.controller, SessionState::Active).await;
    gegenstelle
}

fn audio_payload(samples: usize) -> String {
    pcm::encode_base64(&vec![0.1; samples])
}

#[tokio::test]
async fn start_ohne_mikrofon_wird_verweigert() {
    let a = aufbau(PermissionStatus::Off);

    let result = a.controller.start(false).await;
    assert!(matches!(
        result,
        Err(LiveError::ZugriffVerweigert(Capability::Microphone))
    ));
    assert_eq!(a.controller.zustand(), SessionState::Idle);
    assert!(a.transport.configs.lock().is_empty(), "keine Verbindung");
    assert!(a.controller.status().letzter_fehler.is_some());
    assert_eq!(a.controller.status().text, "Standby");
}

#[tokio::test]
async fn start_mit_video_ohne_kamera_freigabe() {
    let a = aufbau(PermissionStatus::Permanent);

    let result = a.controller.start(true).await;
    assert!(matches!(
        result,
        Err(LiveError::ZugriffVerweigert(Capability::Camera))
    ));
    assert_eq!(a.controller.zustand(), SessionState::Idle);
    assert!(a.geraete.mikrofon.lock().is_none(), "kein Geraet geoeffnet");
}

#[tokio::test]
async fn open_macht_session_aktiv() {
    let a = aufbau(PermissionStatus::Permanent);

    a.controller.start(false).await.unwrap();
    assert_eq!(a.controller.zustand(), SessionState::Connecting);
    assert_eq!(a.controller.status().text, "Verbindung wird aufgebaut");

    let config = a.transport.configs.lock()[0].clone();
    assert!(config.system_instruction.starts_with("You are LEON"));
    assert!(!config.video);

    let gegenstelle = a.transport.gegenstelle();
    gegenstelle.ereignisse.send(TransportEvent::Open).await.unwrap();
    warte_auf_zustand(&a.controller, SessionState::Active).await;
    assert_eq!(a.controller.status().text, "Verbindung aktiv");
}

#[tokio::test]
async fn zweiter_start_waehrend_aktiv() {
    let a = aufbau(PermissionStatus::Permanent);
    let _gegenstelle = aktive_session(&a).await;

    assert!(matches!(
        a.controller.start(false).await,
        Err(LiveError::SessionAktiv)
    ));
}

#[tokio::test]
async fn mikrofon_fenster_werden_in_reihenfolge_gesendet() {
    let a = aufbau(PermissionStatus::Permanent);
    let mut events = a.bus.abonnieren();
    let mut gegenstelle = aktive_session(&a).await;

    let mikrofon = a.geraete.mikrofon();
    for i in 0..3 {
        mikrofon
            .send(RealtimeInput {
                mime_type: "audio/pcm;rate=16000".to_string(),
                data: format!("fenster-{i}"),
            })
            .unwrap();
    }

    for i in 0..3 {
        let input = timeout(WARTEZEIT, gegenstelle.ausgehend.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(input.data, format!("fenster-{i}"));
    }
    warte_auf(&mut events, |e| matches!(e, EngineEvent::OutboundFrameSent { .. })).await;
}

#[tokio::test]
async fn eingehendes_audio_lueckenlos_eingeplant() {
    let a = aufbau(PermissionStatus::Permanent);
    let mut events = a.bus.abonnieren();
    let gegenstelle = aktive_session(&a).await;

    let nachricht = ServerMessage {
        audio: vec![audio_payload(2400), audio_payload(4800), audio_payload(1200)],
        ..Default::default()
    };
    gegenstelle
        .ereignisse
        .send(TransportEvent::Message(nachricht))
        .await
        .unwrap();

    let mut starts = Vec::new();
    for _ in 0..3 {
        if let EngineEvent::PlaybackScheduled { start, .. } =
            warte_auf(&mut events, |e| matches!(e, EngineEvent::PlaybackScheduled { .. })).await
        {
            starts.push(start);
        }
    }
    let erwartet = [0.0, 0.1, 0.3];
    for (ist, soll) in starts.iter().zip(erwartet) {
        assert!((ist - soll).abs() < 1e-9, "Start {ist} statt {soll}");
    }
    assert_eq!(a.geraete.scheduler().pending_count(), 3);
}

#[tokio::test]
async fn barge_in_leert_playback() {
    let a = aufbau(PermissionStatus::Permanent);
    let mut events = a.bus.abonnieren();
    let gegenstelle = aktive_session(&a).await;

    let nachricht = ServerMessage {
        audio: vec![audio_payload(2400), audio_payload(2400)],
        ..Default::default()
    };
    gegenstelle
        .ereignisse
        .send(TransportEvent::Message(nachricht))
        .await
        .unwrap();
    gegenstelle
        .ereignisse
        .send(TransportEvent::Message(ServerMessage::unterbrochen()))
        .await
        .unwrap();

    let event = warte_auf(&mut events, |e| {
        matches!(e, EngineEvent::SessionInterrupted { .. })
    })
    .await;
    assert!(matches!(
        event,
        EngineEvent::SessionInterrupted { verworfen: 2, .. }
    ));

    let scheduler = a.geraete.scheduler();
    assert_eq!(scheduler.next_start_time(), 0.0);
    assert_eq!(scheduler.pending_count(), 0);
    let mut ausgabe = vec![1.0; 4800];
    scheduler.render(&mut ausgabe);
    assert!(ausgabe.iter().all(|&s| s == 0.0));

    warte_auf(&mut events, |e| {
        matches!(
            e,
            EngineEvent::SessionStateChanged {
                state: SessionState::Active,
                ..
            }
        )
    })
    .await;
    assert_eq!(a.controller.zustand(), SessionState::Active);
}

#[tokio::test]
async fn audio_mit_interrupt_in_derselben_nachricht_bleibt_stumm() {
    let a = aufbau(PermissionStatus::Permanent);
    let mut events = a.bus.abonnieren();
    let gegenstelle = aktive_session(&a).await;

    let nachricht = ServerMessage {
        audio: vec![audio_payload(2400)],
        interrupted: true,
        ..Default::default()
    };
    gegenstelle
        .ereignisse
        .send(TransportEvent::Message(nachricht))
        .await
        .unwrap();

    let event = warte_auf(&mut events, |e| {
        matches!(e, EngineEvent::SessionInterrupted { .. })
    })
    .await;
    assert!(matches!(
        event,
        EngineEvent::SessionInterrupted { verworfen: 1, .. }
    ));

    let scheduler = a.geraete.scheduler();
    assert_eq!(scheduler.pending_count(), 0);
    assert_eq!(scheduler.next_start_time(), 0.0);
    let mut ausgabe = vec![1.0; 4800];
    scheduler.render(&mut ausgabe);
    assert!(ausgabe.iter().all(|&s| s == 0.0));
}

#[tokio::test]
async fn geraeterate_aendert_zeitleiste_nicht() {
    let mut config = LiveConfig::default();
    config.playback.geraete_rate = Some(48_000);
    let a = aufbau_mit_config(
        config,
        TestGate::mit(&[(Capability::Microphone, PermissionStatus::Permanent)]),
        MockTransport::default(),
        MockGeraete::default(),
    );
    let mut events = a.bus.abonnieren();
    let gegenstelle = aktive_session(&a).await;

    let nachricht = ServerMessage {
        audio: vec![audio_payload(2400)],
        ..Default::default()
    };
    gegenstelle
        .ereignisse
        .send(TransportEvent::Message(nachricht))
        .await
        .unwrap();

    let event =
        warte_auf(&mut events, |e| matches!(e, EngineEvent::PlaybackScheduled { .. })).await;
    assert!(matches!(
        event,
        EngineEvent::PlaybackScheduled { dauer, .. } if (dauer - 0.1).abs() < 1e-9
    ));
    let scheduler = a.geraete.scheduler();
    assert_eq!(scheduler.sample_rate(), 24_000);
    assert_eq!(scheduler.pending_count(), 1);
}

#[tokio::test]
async fn fehlerhaftes_audio_wird_uebersprungen() {
    let a = aufbau(PermissionStatus::Permanent);
    let mut events = a.bus.abonnieren();
    let gegenstelle = aktive_session(&a).await;

    // Drei Bytes: ungerade PCM16-Laenge
    let ungerade = "AAAA".to_string();
    let nachricht = ServerMessage {
        audio: vec![ungerade, audio_payload(240)],
        ..Default::default()
    };
    gegenstelle
        .ereignisse
        .send(TransportEvent::Message(nachricht))
        .await
        .unwrap();

    let event =
        warte_auf(&mut events, |e| matches!(e, EngineEvent::PlaybackScheduled { .. })).await;
    assert!(matches!(event, EngineEvent::PlaybackScheduled { start, .. } if start == 0.0));
    assert_eq!(a.geraete.scheduler().pending_count(), 1);
    assert_eq!(a.controller.zustand(), SessionState::Active);
}

#[tokio::test]
async fn transkriptionen_werden_weitergereicht() {
    let a = aufbau(PermissionStatus::Permanent);
    let mut events = a.bus.abonnieren();
    let gegenstelle = aktive_session(&a).await;

    let nachricht = ServerMessage {
        input_transcription: Some("Hallo Leon".to_string()),
        output_transcription: Some("Guten Tag".to_string()),
        ..Default::default()
    };
    gegenstelle
        .ereignisse
        .send(TransportEvent::Message(nachricht))
        .await
        .unwrap();

    let event = warte_auf(&mut events, |e| matches!(e, EngineEvent::Transcript { .. })).await;
    assert!(matches!(
        event,
        EngineEvent::Transcript { quelle: TranscriptQuelle::Input, ref text, .. } if text == "Hallo Leon"
    ));
    let event = warte_auf(&mut events, |e| matches!(e, EngineEvent::Transcript { .. })).await;
    assert!(matches!(
        event,
        EngineEvent::Transcript { quelle: TranscriptQuelle::Output, .. }
    ));
}

#[tokio::test]
async fn stop_schliesst_und_verbraucht_freigabe() {
    let a = aufbau(PermissionStatus::Temporary);
    let mut gegenstelle = aktive_session(&a).await;

    a.controller.stop().await.unwrap();
    assert_eq!(a.controller.zustand(), SessionState::Closed);
    assert_eq!(a.controller.status().text, "Standby");
    assert!(gegenstelle.geschlossen.try_recv().is_ok(), "Verbindung geschlossen");
    assert_eq!(a.geraete.gestoppt(), 2, "Mikrofon und Lautsprecher freigegeben");
    assert_eq!(*a.gate.verbraucht.lock(), vec![Capability::Microphone]);
    assert_eq!(
        a.gate.state.lock().status(Capability::Microphone),
        PermissionStatus::Off
    );

    // Zweites stop() ist wirkungslos
    a.controller.stop().await.unwrap();
    assert_eq!(a.gate.verbraucht.lock().len(), 1);
}

#[tokio::test]
async fn dauerhafte_freigabe_wird_nicht_verbraucht() {
    let a = aufbau(PermissionStatus::Permanent);
    let _gegenstelle = aktive_session(&a).await;
    a.controller.stop().await.unwrap();
    assert!(a.gate.verbraucht.lock().is_empty());
}

#[tokio::test]
async fn entferntes_schliessen_verbraucht_genau_einmal() {
    let a = aufbau(PermissionStatus::Temporary);
    let gegenstelle = aktive_session(&a).await;

    gegenstelle.ereignisse.send(TransportEvent::Close).await.unwrap();
    warte_auf_zustand(&a.controller, SessionState::Closed).await;
    a.controller.stop().await.unwrap();

    assert_eq!(*a.gate.verbraucht.lock(), vec![Capability::Microphone]);
}

#[tokio::test]
async fn transportfehler_fuehrt_zu_failed() {
    let a = aufbau(PermissionStatus::Temporary);
    let gegenstelle = aktive_session(&a).await;

    gegenstelle
        .ereignisse
        .send(TransportEvent::Error("Netz weg".to_string()))
        .await
        .unwrap();
    warte_auf_zustand(&a.controller, SessionState::Failed).await;

    let status = a.controller.status();
    assert_eq!(status.text, "Verbindung fehlgeschlagen: Netz weg");
    assert!(a.gate.verbraucht.lock().is_empty());

    // Neuer Start ist nach einem Fehler moeglich
    a.controller.start(false).await.unwrap();
    assert_eq!(a.controller.zustand(), SessionState::Connecting);
}

#[tokio::test]
async fn verbindungsaufbau_schlaegt_fehl() {
    let a = aufbau_mit(
        TestGate::mit(&[(Capability::Microphone, PermissionStatus::Permanent)]),
        MockTransport::fehlerhaft("Dienst nicht erreichbar"),
        MockGeraete::default(),
    );

    let result = a.controller.start(false).await;
    assert!(matches!(result, Err(LiveError::VerbindungFehlgeschlagen(_))));
    assert_eq!(a.controller.zustand(), SessionState::Failed);
    assert_eq!(a.geraete.gestoppt(), 2, "Geraete wieder freigegeben");
    assert!(a
        .controller
        .status()
        .text
        .starts_with("Verbindung fehlgeschlagen"));
}

#[tokio::test]
async fn fehlende_kamera_ist_geraetefehler() {
    let a = aufbau_mit(
        TestGate::mit(&[
            (Capability::Microphone, PermissionStatus::Permanent),
            (Capability::Camera, PermissionStatus::Permanent),
        ]),
        MockTransport::default(),
        MockGeraete {
            ohne_kamera: true,
            ..Default::default()
        },
    );

    let result = a.controller.start(true).await;
    assert!(matches!(result, Err(LiveError::GeraetNichtVerfuegbar(_))));
    assert_eq!(a.controller.zustand(), SessionState::Failed);
    assert!(a.transport.configs.lock().is_empty());
}

#[tokio::test]
async fn video_ohne_kamera_unterstuetzung_bleibt_idle() {
    let a = aufbau_mit(
        TestGate::mit(&[
            (Capability::Microphone, PermissionStatus::Temporary),
            (Capability::Camera, PermissionStatus::Temporary),
        ]),
        MockTransport::default(),
        MockGeraete {
            ohne_video: true,
            ..Default::default()
        },
    );
    let mut events = a.bus.abonnieren();

    let result = a.controller.start(true).await;
    assert!(matches!(result, Err(LiveError::VideoNichtUnterstuetzt)));
    assert_eq!(a.controller.zustand(), SessionState::Idle);
    assert!(a.controller.status().letzter_fehler.is_some());
    assert!(a.transport.configs.lock().is_empty(), "keine Verbindung");
    assert!(a.geraete.mikrofon.lock().is_none(), "kein Geraet geoeffnet");
    assert!(a.gate.verbraucht.lock().is_empty());
    assert!(events.try_recv().is_err(), "kein Zustandswechsel gemeldet");

    // Ohne Video laeuft die Session auf denselben Geraeten
    a.controller.start(false).await.unwrap();
    assert_eq!(a.controller.zustand(), SessionState::Connecting);
}

#[tokio::test]
async fn video_session_verbraucht_kamera_und_mikrofon() {
    let a = aufbau_mit(
        TestGate::mit(&[
            (Capability::Microphone, PermissionStatus::Temporary),
            (Capability::Camera, PermissionStatus::Temporary),
        ]),
        MockTransport::default(),
        MockGeraete::default(),
    );

    a.controller.start(true).await.unwrap();
    assert!(a.transport.configs.lock()[0].video);
    let gegenstelle = a.transport.gegenstelle();
    gegenstelle.ereignisse.send(TransportEvent::Open).await.unwrap();
    warte_auf_zustand(&a.controller, SessionState::Active).await;

    a.controller.stop().await.unwrap();
    let verbraucht = a.gate.verbraucht.lock().clone();
    assert!(verbraucht.contains(&Capability::Microphone));
    assert!(verbraucht.contains(&Capability::Camera));
    assert_eq!(a.geraete.gestoppt(), 3);
}

//! Beobachter der persistierten Taskliste
//!
//! Liest die Liste im festen Takt (Standard 2 s), veroeffentlicht den
//! aktuellen Stand ueber einen `watch`-Kanal und ermittelt, welche Tasks
//! seit dem letzten Lesen hinzugekommen, verschwunden oder in einen anderen
//! Status gewechselt sind. Beliebig viele Watcher koennen parallel laufen.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{trace, warn};

use leon_core::{TaskId, TaskStatus};
use leon_store::{BackgroundTask, TaskListe};

pub const STANDARD_WATCH_INTERVALL: Duration = Duration::from_secs(2);

/// Aenderung eines einzelnen Tasks zwischen zwei Lesevorgaengen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskAenderung {
    pub task_id: TaskId,
    /// `None`: Task ist neu
    pub vorher: Option<TaskStatus>,
    /// `None`: Task wurde entfernt
    pub nachher: Option<TaskStatus>,
}

/// Stand nach einem Lesevorgang
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub tasks: Vec<BackgroundTask>,
    pub aenderungen: Vec<TaskAenderung>,
    /// `false` solange die Liste nicht gelesen werden kann; `tasks` ist dann
    /// der letzte bekannte Stand
    pub lesbar: bool,
}

impl Default for TaskSnapshot {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            aenderungen: Vec::new(),
            lesbar: true,
        }
    }
}

impl TaskSnapshot {
    pub fn laufend(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Processing)
            .count()
    }
}

/// Vergleicht zwei Staende der Liste
pub fn aenderungen_ermitteln(alt: &[BackgroundTask], neu: &[BackgroundTask]) -> Vec<TaskAenderung> {
    let vorher: HashMap<TaskId, TaskStatus> = alt.iter().map(|t| (t.id, t.status)).collect();
    let mut aenderungen = Vec::new();

    for task in neu {
        match vorher.get(&task.id) {
            Some(status) if *status == task.status => {}
            status => aenderungen.push(TaskAenderung {
                task_id: task.id,
                vorher: status.copied(),
                nachher: Some(task.status),
            }),
        }
    }

    for task in alt {
        if !neu.iter().any(|t| t.id == task.id) {
            aenderungen.push(TaskAenderung {
                task_id: task.id,
                vorher: Some(task.status),
                nachher: None,
            });
        }
    }

    aenderungen
}

pub struct TaskWatcher {
    snapshot: watch::Receiver<TaskSnapshot>,
    handle: JoinHandle<()>,
}

impl TaskWatcher {
    /// Startet den Beobachter; der erste Lesevorgang erfolgt sofort
    pub fn starten(tasks: TaskListe, intervall: Duration) -> Self {
        let (tx, rx) = watch::channel(TaskSnapshot::default());
        let handle = tokio::spawn(beobachten(tasks, intervall, tx));
        Self {
            snapshot: rx,
            handle,
        }
    }

    /// Empfaenger fuer neue Staende (mehrfach klonbar)
    pub fn abonnieren(&self) -> watch::Receiver<TaskSnapshot> {
        self.snapshot.clone()
    }

    pub fn aktuell(&self) -> TaskSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn stoppen(self) {
        self.handle.abort();
    }
}

impl Drop for TaskWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn beobachten(tasks: TaskListe, intervall: Duration, tx: watch::Sender<TaskSnapshot>) {
    let mut takt = tokio::time::interval(intervall);
    takt.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut letzte: Vec<BackgroundTask> = Vec::new();

    loop {
        takt.tick().await;
        let aktuell = match tasks.alle().await {
            Ok(t) => t,
            Err(e) => {
                warn!(key = %tasks.schluessel(), fehler = %e, "Taskliste nicht lesbar");
                tx.send_if_modified(|s| {
                    let geaendert = s.lesbar;
                    s.lesbar = false;
                    s.aenderungen.clear();
                    geaendert
                });
                continue;
            }
        };

        let aenderungen = aenderungen_ermitteln(&letzte, &aktuell);
        if aenderungen.is_empty() && tx.borrow().lesbar {
            trace!("Taskliste unveraendert");
            continue;
        }

        letzte = aktuell.clone();
        let snapshot = TaskSnapshot {
            tasks: aktuell,
            aenderungen,
            lesbar: true,
        };
        if tx.send(snapshot).is_err() {
            // Alle Empfaenger weg
            return;
        }
    }
}

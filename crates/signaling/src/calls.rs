//! Call-Tracker – Anstehende Anrufversuche mit Timeout-Timer
//!
//! Verfolgt pro gerichtetem Paar (Anrufer, Angerufener) hoechstens einen
//! anstehenden Anrufversuch. Jeder Versuch traegt genau einen Timer; wird
//! der Anruf nicht innerhalb des Zeitfensters angenommen, erhalten beide
//! Seiten `callEnded{not_answered}` und der Eintrag verschwindet.
//!
//! ## Schluessel
//! Versuche sind unter dem typisierten, gerichteten `AnrufSchluessel`
//! abgelegt: die Initiierung merkt unter (Anrufer -> Angerufener) vor,
//! die Annahme loescht denselben Schluessel, das Auflegen prueft beide
//! Richtungen.
//!
//! ## Nebenlaeufigkeit
//! Das Ersetzen eines anstehenden Versuchs (cancel-then-arm) laeuft
//! vollstaendig unter dem Entry-Lock des Schluessels. Jeder Versuch
//! traegt eine Generationsnummer; der Timer entfernt seinen Eintrag nur
//! wenn die Generation noch stimmt (`remove_if`). Damit kann ein
//! ueberholter Timer nie feuern und ein gefeuerter Timer nie nachtraeglich
//! "storniert" werden.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use herzfunk_core::types::UserId;
use herzfunk_protocol::events::{AnrufEndeGrund, ServerEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::broadcast::EventBroadcaster;

// ---------------------------------------------------------------------------
// AnrufSchluessel
// ---------------------------------------------------------------------------

/// Gerichteter Schluessel eines Anrufversuchs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnrufSchluessel {
    /// Anrufer
    pub von: UserId,
    /// Angerufener
    pub nach: UserId,
}

impl AnrufSchluessel {
    /// Erstellt den Schluessel fuer einen Versuch von `von` nach `nach`
    pub fn neu(von: UserId, nach: UserId) -> Self {
        Self { von, nach }
    }

    /// Gibt den Schluessel der Gegenrichtung zurueck
    pub fn umgekehrt(&self) -> Self {
        Self {
            von: self.nach.clone(),
            nach: self.von.clone(),
        }
    }

    /// Prueft ob eine Identitaet an diesem Versuch beteiligt ist
    pub fn betrifft(&self, benutzer: &UserId) -> bool {
        self.von == *benutzer || self.nach == *benutzer
    }

    /// Gibt die jeweils andere Partei zurueck
    pub fn gegenseite(&self, benutzer: &UserId) -> &UserId {
        if self.von == *benutzer {
            &self.nach
        } else {
            &self.von
        }
    }
}

impl std::fmt::Display for AnrufSchluessel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.von.als_str(), self.nach.als_str())
    }
}

// ---------------------------------------------------------------------------
// CallTracker
// ---------------------------------------------------------------------------

/// Ein anstehender Anrufversuch
struct AnrufEintrag {
    /// Generationsnummer – stempelt den Timer auf genau diesen Versuch
    generation: u64,
    /// Armierter Timeout-Timer
    timer: JoinHandle<()>,
    /// Zeitpunkt der Vormerkung
    gestartet: Instant,
}

/// Verfolgt alle anstehenden Anrufversuche
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct CallTracker {
    inner: Arc<CallTrackerInner>,
}

struct CallTrackerInner {
    /// Anstehende Versuche, indiziert nach gerichtetem Schluessel
    anrufe: DashMap<AnrufSchluessel, AnrufEintrag>,
    /// Zustellweg fuer Timeout-Benachrichtigungen
    broadcaster: EventBroadcaster,
    /// Annahme-Zeitfenster eines Anrufs
    timeout: Duration,
    /// Monoton steigender Generations-Zaehler
    generation: AtomicU64,
}

impl CallTracker {
    /// Erstellt einen neuen CallTracker
    pub fn neu(broadcaster: EventBroadcaster, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(CallTrackerInner {
                anrufe: DashMap::new(),
                broadcaster,
                timeout,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Merkt einen Anrufversuch vor und armiert dessen Timer
    ///
    /// Ein bereits anstehender Versuch fuer denselben Schluessel wird
    /// ersetzt: sein Timer wird unter dem Entry-Lock verworfen bevor der
    /// neue Eintrag steht, es existiert also nie mehr als ein lebender
    /// Timer pro Schluessel.
    pub fn vormerken(&self, von: UserId, nach: UserId) {
        let schluessel = AnrufSchluessel::neu(von, nach);
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;

        // Der Timer schlaeft zuerst das volle Fenster; der Eintrag steht
        // damit lange vor dem ersten Aufwachen im Tracker.
        let timer = tokio::spawn(Self::timeout_ueberwachen(
            Arc::clone(&self.inner),
            schluessel.clone(),
            generation,
        ));
        let eintrag = AnrufEintrag {
            generation,
            timer,
            gestartet: Instant::now(),
        };

        match self.inner.anrufe.entry(schluessel.clone()) {
            Entry::Occupied(mut belegt) => {
                let alt = belegt.insert(eintrag);
                alt.timer.abort();
                tracing::debug!(
                    anruf = %schluessel,
                    "Anstehender Versuch ersetzt, alter Timer verworfen"
                );
            }
            Entry::Vacant(frei) => {
                frei.insert(eintrag);
            }
        }

        tracing::info!(
            anruf = %schluessel,
            timeout = ?self.inner.timeout,
            "Anrufversuch vorgemerkt"
        );
    }

    /// Timeout-Task eines einzelnen Versuchs
    async fn timeout_ueberwachen(
        inner: Arc<CallTrackerInner>,
        schluessel: AnrufSchluessel,
        generation: u64,
    ) {
        tokio::time::sleep(inner.timeout).await;

        // Nur entfernen wenn der Eintrag noch zu diesem Timer gehoert;
        // ein inzwischen ersetzter oder aufgeloester Versuch bleibt
        // unberuehrt und dieser Task wird zum No-op.
        let entfernt = inner
            .anrufe
            .remove_if(&schluessel, |_, eintrag| eintrag.generation == generation);

        if let Some((_, eintrag)) = entfernt {
            tracing::info!(
                anruf = %schluessel,
                wartezeit = ?eintrag.gestartet.elapsed(),
                "Anruf nicht angenommen"
            );
            inner.broadcaster.an_raum_senden(
                &schluessel.von,
                ServerEvent::anruf_beendet(AnrufEndeGrund::NotAnswered),
            );
            inner.broadcaster.an_raum_senden(
                &schluessel.nach,
                ServerEvent::anruf_beendet(AnrufEndeGrund::NotAnswered),
            );
        }
    }

    /// Loest einen Versuch bei Annahme auf
    ///
    /// Der Versuch wurde unter (Anrufer -> Angerufener) vorgemerkt. Gibt
    /// `false` zurueck wenn kein Eintrag mehr existiert – der Anruf gilt
    /// dann als bereits aufgeloest, nicht als Fehler.
    pub fn annehmen(&self, anrufer: &UserId, angerufener: &UserId) -> bool {
        let schluessel = AnrufSchluessel::neu(anrufer.clone(), angerufener.clone());
        match self.inner.anrufe.remove(&schluessel) {
            Some((_, eintrag)) => {
                eintrag.timer.abort();
                tracing::info!(anruf = %schluessel, "Anruf angenommen, Timer verworfen");
                true
            }
            None => {
                tracing::debug!(anruf = %schluessel, "Annahme ohne anstehenden Versuch");
                false
            }
        }
    }

    /// Loest einen Versuch bei explizitem Auflegen auf
    ///
    /// Prueft beide Schluessel-Richtungen, da jede Partei auflegen kann.
    /// Gibt `true` zurueck wenn mindestens ein Eintrag entfernt wurde.
    pub fn beenden(&self, a: &UserId, b: &UserId) -> bool {
        let hin = AnrufSchluessel::neu(a.clone(), b.clone());
        let mut entfernt = false;
        for schluessel in [hin.clone(), hin.umgekehrt()] {
            if let Some((_, eintrag)) = self.inner.anrufe.remove(&schluessel) {
                eintrag.timer.abort();
                tracing::info!(anruf = %schluessel, "Anruf aufgelegt, Timer verworfen");
                entfernt = true;
            }
        }
        entfernt
    }

    /// Entfernt alle Versuche an denen eine Identitaet beteiligt ist
    ///
    /// Wird beim Schliessen der letzten Verbindung einer Identitaet
    /// aufgerufen. Gibt die entfernten Schluessel zurueck damit der
    /// Dispatcher die jeweilige Gegenseite benachrichtigen kann.
    pub fn benutzer_bereinigen(&self, benutzer: &UserId) -> Vec<AnrufSchluessel> {
        let betroffen: Vec<AnrufSchluessel> = self
            .inner
            .anrufe
            .iter()
            .filter(|eintrag| eintrag.key().betrifft(benutzer))
            .map(|eintrag| eintrag.key().clone())
            .collect();

        let mut entfernt = Vec::new();
        for schluessel in betroffen {
            if let Some((schluessel, eintrag)) = self.inner.anrufe.remove(&schluessel) {
                eintrag.timer.abort();
                tracing::info!(anruf = %schluessel, benutzer = %benutzer, "Anruf bei Verbindungsverlust bereinigt");
                entfernt.push(schluessel);
            }
        }
        entfernt
    }

    /// Prueft ob fuer das gerichtete Paar ein Versuch ansteht
    pub fn ist_anstehend(&self, von: &UserId, nach: &UserId) -> bool {
        self.inner
            .anrufe
            .contains_key(&AnrufSchluessel::neu(von.clone(), nach.clone()))
    }

    /// Gibt die Anzahl der anstehenden Versuche zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.anrufe.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

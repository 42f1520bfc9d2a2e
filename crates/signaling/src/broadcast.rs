//! Event-Broadcaster – Raum-adressierte Zustellung an Verbindungs-Queues
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller offenen
//! Verbindungen und stellt Ereignisse gezielt zu. Ein "Raum" ist die
//! Menge aller Verbindungen die gerade eine Identitaet vertreten.
//!
//! ## Zustellarten
//! - An einen Raum (alle Verbindungen einer Identitaet): `an_raum_senden`
//! - An alle Verbindungen: `an_alle_senden`
//! - An eine einzelne Verbindung: `an_verbindung_senden`
//!
//! Zustellung an einen leeren Raum ist ein stiller Drop – Offline-
//! Zustellung ist best-effort, nicht garantiert. Die Reihenfolge der
//! Ereignisse bleibt pro Verbindung erhalten (eine mpsc-Queue pro
//! Verbindung); ueber Verbindungen hinweg gibt es keine Garantie.

use dashmap::DashMap;
use herzfunk_core::types::{ConnectionId, UserId};
use herzfunk_protocol::events::ServerEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Groesse der Send-Queue pro Verbindung
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer offenen Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub verbindung: ConnectionId,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Reiht ein Ereignis nicht-blockierend in die Queue ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, ereignis: ServerEvent) -> bool {
        match self.tx.try_send(ereignis) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(verbindung = %self.verbindung, "Send-Queue voll – Ereignis verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.verbindung, "Send-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle offenen Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Send-Queues, indiziert nach ConnectionId
    clients: DashMap<ConnectionId, ClientSender>,
    /// Raum-Mitgliedschaft: Identitaet -> Verbindungen
    raeume: DashMap<UserId, Vec<ConnectionId>>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
                raeume: DashMap::new(),
            }),
        }
    }

    /// Registriert eine Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und sendet via TCP.
    pub fn verbindung_registrieren(&self, verbindung: ConnectionId) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner
            .clients
            .insert(verbindung, ClientSender { verbindung, tx });
        tracing::debug!(verbindung = %verbindung, "Verbindung im Broadcaster registriert");
        rx
    }

    /// Entfernt eine Verbindung samt aller Raum-Mitgliedschaften
    pub fn verbindung_entfernen(&self, verbindung: &ConnectionId) {
        self.inner.clients.remove(verbindung);
        self.inner.raeume.iter_mut().for_each(|mut eintrag| {
            eintrag.value_mut().retain(|v| v != verbindung);
        });
        // Leere Raum-Eintraege aufraeumen
        self.inner.raeume.retain(|_, mitglieder| !mitglieder.is_empty());
        tracing::debug!(verbindung = %verbindung, "Verbindung aus Broadcaster entfernt");
    }

    /// Fuegt eine Verbindung dem Raum einer Identitaet hinzu (idempotent)
    pub fn raum_beitreten(&self, benutzer: UserId, verbindung: ConnectionId) {
        let mut mitglieder = self.inner.raeume.entry(benutzer).or_default();
        if !mitglieder.contains(&verbindung) {
            mitglieder.push(verbindung);
        }
    }

    /// Entfernt eine Verbindung aus dem Raum einer Identitaet
    pub fn raum_verlassen(&self, benutzer: &UserId, verbindung: &ConnectionId) {
        if let Some(mut mitglieder) = self.inner.raeume.get_mut(benutzer) {
            mitglieder.retain(|v| v != verbindung);
            let ist_leer = mitglieder.is_empty();
            drop(mitglieder);
            if ist_leer {
                self.inner.raeume.remove_if(benutzer, |_, m| m.is_empty());
            }
        }
    }

    /// Stellt ein Ereignis an alle Verbindungen eines Raums zu
    ///
    /// Gibt die Anzahl der erfolgreichen Einreihungen zurueck. Ein leerer
    /// oder unbekannter Raum ergibt 0 (stiller Drop).
    pub fn an_raum_senden(&self, benutzer: &UserId, ereignis: ServerEvent) -> usize {
        let mitglieder = match self.inner.raeume.get(benutzer) {
            Some(m) => m.clone(),
            None => {
                tracing::debug!(benutzer = %benutzer, "Zustellung an leeren Raum verworfen");
                return 0;
            }
        };

        let mut gesendet = 0;
        for verbindung in &mitglieder {
            if let Some(sender) = self.inner.clients.get(verbindung) {
                if sender.senden(ereignis.clone()) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }

    /// Stellt ein Ereignis an eine einzelne Verbindung zu
    pub fn an_verbindung_senden(&self, verbindung: &ConnectionId, ereignis: ServerEvent) -> bool {
        match self.inner.clients.get(verbindung) {
            Some(sender) => sender.senden(ereignis),
            None => {
                tracing::debug!(verbindung = %verbindung, "Zustellung an unbekannte Verbindung");
                false
            }
        }
    }

    /// Stellt ein Ereignis an alle offenen Verbindungen zu
    ///
    /// Nur fuer globale Presence-Updates verwendet.
    pub fn an_alle_senden(&self, ereignis: ServerEvent) -> usize {
        let mut gesendet = 0;
        self.inner.clients.iter().for_each(|eintrag| {
            if eintrag.value().senden(ereignis.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Gibt die Anzahl der Verbindungen in einem Raum zurueck
    pub fn raum_groesse(&self, benutzer: &UserId) -> usize {
        self.inner
            .raeume
            .get(benutzer)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Gibt die Anzahl der registrierten Verbindungen zurueck
    pub fn client_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, verbindung: &ConnectionId) -> bool {
        self.inner.clients.contains_key(verbindung)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

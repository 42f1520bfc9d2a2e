//! Gemeinsamer Hub-Zustand fuer den Signaling-Service
//!
//! Haelt Konfiguration, Speicher-Referenz und die Zustands-Manager als
//! eine Arc-geteilte Einheit die sicher zwischen tokio-Tasks wandert.
//! Registry und Tracker sind rein prozesslokal: nach einem Neustart ist
//! der Hub leer und Clients registrieren sich neu.

use herzfunk_db::{BenutzerRepository, NachrichtenRepository};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::broadcast::EventBroadcaster;
use crate::calls::CallTracker;
use crate::entitlement::EntitlementGate;
use crate::presence::PresenceRegistry;

/// Konfiguration fuer den Signaling-Hub
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: u32,
    /// Annahme-Zeitfenster eines Anrufs
    pub anruf_timeout: Duration,
    /// Maximale Frame-Groesse auf dem Draht in Bytes
    pub max_frame_bytes: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Herzfunk Hub".to_string(),
            max_clients: 512,
            anruf_timeout: Duration::from_secs(20),
            max_frame_bytes: 1024 * 1024,
        }
    }
}

/// Gemeinsamer Hub-Zustand (thread-safe, Arc-geteilt)
///
/// Generisch ueber den externen Datenspeicher; der Kern kennt nur die
/// Repository-Traits.
pub struct SignalingState<S>
where
    S: BenutzerRepository + NachrichtenRepository + 'static,
{
    /// Hub-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Externer Datenspeicher (Benutzer + Nachrichten)
    pub store: Arc<S>,
    /// Presence-Registry (wer ist mit welchen Verbindungen online)
    pub presence: PresenceRegistry,
    /// Event-Broadcaster (raum-adressierte Zustellung)
    pub broadcaster: EventBroadcaster,
    /// Anstehende Anrufversuche samt Timern
    pub anrufe: CallTracker,
    /// Abo-Pruefung gegen den Speicher
    pub abo_pruefung: EntitlementGate<S>,
    /// Startzeitpunkt (fuer Uptime-Angaben)
    pub start_zeit: Instant,
}

impl<S> SignalingState<S>
where
    S: BenutzerRepository + NachrichtenRepository + 'static,
{
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, store: Arc<S>) -> Arc<Self> {
        let broadcaster = EventBroadcaster::neu();
        let anrufe = CallTracker::neu(broadcaster.clone(), config.anruf_timeout);
        Arc::new(Self {
            config: Arc::new(config),
            abo_pruefung: EntitlementGate::neu(Arc::clone(&store)),
            store,
            presence: PresenceRegistry::neu(),
            broadcaster,
            anrufe,
            start_zeit: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_zeit.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herzfunk_db::MemoryDatenbank;

    #[test]
    fn standard_konfiguration() {
        let config = SignalingConfig::default();
        assert_eq!(config.anruf_timeout, Duration::from_secs(20));
        assert_eq!(config.max_clients, 512);
    }

    #[tokio::test]
    async fn unabhaengige_instanzen_teilen_keinen_zustand() {
        let erste = SignalingState::neu(
            SignalingConfig::default(),
            Arc::new(MemoryDatenbank::neu()),
        );
        let zweite = SignalingState::neu(
            SignalingConfig::default(),
            Arc::new(MemoryDatenbank::neu()),
        );

        erste.presence.registrieren(
            &herzfunk_core::types::UserId::neu("a"),
            herzfunk_core::types::ConnectionId::new(),
        );
        assert_eq!(erste.presence.online_anzahl(), 1);
        assert_eq!(zweite.presence.online_anzahl(), 0);
    }
}

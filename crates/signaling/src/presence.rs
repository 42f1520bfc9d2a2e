//! Presence-Registry – Verwaltet Online-Status pro Identitaet
//!
//! Bildet jede Identitaet auf die Menge ihrer lebenden Verbindungen ab
//! (Multi-Device: eine Identitaet kann mehrere Verbindungen halten).
//! Eine Identitaet gilt als online solange ihre Menge nicht leer ist.
//!
//! Die Registry meldet Uebergaenge (online/offline) an den Aufrufer
//! zurueck; die Broadcasts selbst laufen im Dispatcher ueber den
//! `EventBroadcaster`, damit jede Emission auf dem Router-Pfad bleibt.

use dashmap::DashMap;
use herzfunk_core::types::{ConnectionId, UserId};
use std::collections::HashSet;
use std::sync::Arc;

/// Verwaltet die Verbindungs-Mengen aller Identitaeten
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
/// Mutationen einer Menge laufen vollstaendig unter dem Entry-Lock der
/// betroffenen Identitaet.
#[derive(Clone)]
pub struct PresenceRegistry {
    inner: Arc<PresenceRegistryInner>,
}

struct PresenceRegistryInner {
    /// Identitaet -> Menge der Verbindungen die sie gerade vertreten
    benutzer: DashMap<UserId, HashSet<ConnectionId>>,
    /// Rueckwaerts-Index: Verbindung -> registrierte Identitaet
    verbindungen: DashMap<ConnectionId, UserId>,
}

impl PresenceRegistry {
    /// Erstellt eine neue leere Registry
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(PresenceRegistryInner {
                benutzer: DashMap::new(),
                verbindungen: DashMap::new(),
            }),
        }
    }

    /// Registriert eine Verbindung fuer eine Identitaet
    ///
    /// Idempotent wenn die Verbindung bereits eingetragen ist. Gibt
    /// `true` zurueck wenn die Identitaet durch diese Registrierung
    /// online wurde (erste Verbindung).
    pub fn registrieren(&self, benutzer: &UserId, verbindung: ConnectionId) -> bool {
        if let Some(vorher) = self.inner.verbindungen.get(&verbindung) {
            if *vorher != *benutzer {
                // Eine Verbindung gehoert zu hoechstens einer Identitaet;
                // der Dispatcher meldet vor einem Wechsel explizit ab.
                tracing::warn!(
                    verbindung = %verbindung,
                    alt = %vorher.value(),
                    neu = %benutzer,
                    "Registrierung ohne vorherige Abmeldung"
                );
            }
        }

        let wurde_online = {
            let mut menge = self.inner.benutzer.entry(benutzer.clone()).or_default();
            let war_leer = menge.is_empty();
            menge.insert(verbindung);
            war_leer
        };
        self.inner.verbindungen.insert(verbindung, benutzer.clone());

        if wurde_online {
            tracing::info!(benutzer = %benutzer, "Benutzer online");
        } else {
            tracing::debug!(
                benutzer = %benutzer,
                verbindung = %verbindung,
                "Weitere Verbindung registriert"
            );
        }
        wurde_online
    }

    /// Entfernt eine Verbindung aus der Menge ihrer Identitaet
    ///
    /// Gibt `Some(identitaet)` zurueck wenn deren Menge dadurch leer
    /// wurde (Identitaet ging offline). Unbekannte Verbindungen sind
    /// ein No-op.
    pub fn abmelden(&self, verbindung: &ConnectionId) -> Option<UserId> {
        let (_, benutzer) = self.inner.verbindungen.remove(verbindung)?;

        let wurde_offline = {
            let mut menge = self.inner.benutzer.get_mut(&benutzer)?;
            menge.remove(verbindung);
            menge.is_empty()
        };

        if wurde_offline {
            // Nur entfernen wenn die Menge immer noch leer ist (eine
            // parallele Registrierung darf nicht verloren gehen)
            self.inner.benutzer.remove_if(&benutzer, |_, menge| menge.is_empty());
            tracing::info!(benutzer = %benutzer, "Benutzer offline");
            Some(benutzer)
        } else {
            tracing::debug!(
                benutzer = %benutzer,
                verbindung = %verbindung,
                "Verbindung abgemeldet, weitere bestehen"
            );
            None
        }
    }

    /// Prueft ob eine Identitaet mindestens eine Verbindung hat
    pub fn ist_online(&self, benutzer: &UserId) -> bool {
        self.inner
            .benutzer
            .get(benutzer)
            .map(|menge| !menge.is_empty())
            .unwrap_or(false)
    }

    /// Gibt alle online Identitaeten zurueck, stabil sortiert
    ///
    /// Fuer Clients die nach dem Verbinden den vollen Zustand anfragen.
    pub fn schnappschuss(&self) -> Vec<UserId> {
        let mut online: Vec<UserId> = self
            .inner
            .benutzer
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| e.key().clone())
            .collect();
        online.sort();
        online
    }

    /// Gibt die registrierte Identitaet einer Verbindung zurueck
    pub fn benutzer_von_verbindung(&self, verbindung: &ConnectionId) -> Option<UserId> {
        self.inner.verbindungen.get(verbindung).map(|e| e.clone())
    }

    /// Gibt die Anzahl der Verbindungen einer Identitaet zurueck
    pub fn verbindungs_anzahl(&self, benutzer: &UserId) -> usize {
        self.inner
            .benutzer
            .get(benutzer)
            .map(|menge| menge.len())
            .unwrap_or(0)
    }

    /// Gibt die Anzahl der online Identitaeten zurueck
    pub fn online_anzahl(&self) -> usize {
        self.inner
            .benutzer
            .iter()
            .filter(|e| !e.value().is_empty())
            .count()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrieren_und_abmelden() {
        let registry = PresenceRegistry::neu();
        let benutzer = UserId::neu("a");
        let verbindung = ConnectionId::new();

        assert!(registry.registrieren(&benutzer, verbindung));
        assert!(registry.ist_online(&benutzer));
        assert_eq!(registry.online_anzahl(), 1);

        assert_eq!(registry.abmelden(&verbindung), Some(benutzer.clone()));
        assert!(!registry.ist_online(&benutzer));
        assert_eq!(registry.online_anzahl(), 0);
    }

    #[test]
    fn zweite_verbindung_kein_neuer_uebergang() {
        let registry = PresenceRegistry::neu();
        let benutzer = UserId::neu("a");
        let erste = ConnectionId::new();
        let zweite = ConnectionId::new();

        assert!(registry.registrieren(&benutzer, erste));
        // Zweites Geraet: kein erneuter Online-Uebergang
        assert!(!registry.registrieren(&benutzer, zweite));
        assert_eq!(registry.verbindungs_anzahl(&benutzer), 2);

        // Erste Verbindung weg: Benutzer bleibt online
        assert_eq!(registry.abmelden(&erste), None);
        assert!(registry.ist_online(&benutzer));

        // Letzte Verbindung weg: jetzt offline
        assert_eq!(registry.abmelden(&zweite), Some(benutzer.clone()));
        assert!(!registry.ist_online(&benutzer));
    }

    #[test]
    fn registrieren_idempotent() {
        let registry = PresenceRegistry::neu();
        let benutzer = UserId::neu("a");
        let verbindung = ConnectionId::new();

        assert!(registry.registrieren(&benutzer, verbindung));
        assert!(!registry.registrieren(&benutzer, verbindung));
        assert_eq!(registry.verbindungs_anzahl(&benutzer), 1);

        // Eine einzige Abmeldung reicht
        assert_eq!(registry.abmelden(&verbindung), Some(benutzer));
    }

    #[test]
    fn abmelden_unbekannter_verbindung_ist_noop() {
        let registry = PresenceRegistry::neu();
        assert_eq!(registry.abmelden(&ConnectionId::new()), None);
        assert_eq!(registry.online_anzahl(), 0);
    }

    #[test]
    fn schnappschuss_sortiert() {
        let registry = PresenceRegistry::neu();
        for name in ["c", "a", "b"] {
            registry.registrieren(&UserId::neu(name), ConnectionId::new());
        }

        let online = registry.schnappschuss();
        assert_eq!(online.len(), 3);
        assert_eq!(online[0].als_str(), "a");
        assert_eq!(online[1].als_str(), "b");
        assert_eq!(online[2].als_str(), "c");
    }

    #[test]
    fn benutzer_von_verbindung_lookup() {
        let registry = PresenceRegistry::neu();
        let benutzer = UserId::neu("a");
        let verbindung = ConnectionId::new();

        assert_eq!(registry.benutzer_von_verbindung(&verbindung), None);
        registry.registrieren(&benutzer, verbindung);
        assert_eq!(
            registry.benutzer_von_verbindung(&verbindung),
            Some(benutzer)
        );
    }

    #[test]
    fn clone_teilt_inneren_state() {
        let registry1 = PresenceRegistry::neu();
        let registry2 = registry1.clone();
        let benutzer = UserId::neu("a");

        registry1.registrieren(&benutzer, ConnectionId::new());
        assert!(registry2.ist_online(&benutzer));
    }
}

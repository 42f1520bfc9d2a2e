//! Entitlement-Gate – Abo-Pruefung gegen den externen Datenspeicher
//!
//! Anrufe (und im ausgelagerten HTTP-Layer auch Nachrichten-Endpunkte)
//! stehen nur Benutzern mit aktivem Abo offen. Die Pruefung ist der
//! einzige Schritt der Anruf-Initiierung der auf externe I/O wartet.
//!
//! Ein Abo gilt als aktiv wenn der gespeicherte Status `active` ist, ein
//! Enddatum existiert und der aktuelle Zeitpunkt strikt davor liegt. Ein
//! veralteter `active`-Eintrag mit ueberschrittenem Enddatum wird beim
//! naechsten Lesen als `expired` in den Speicher zurueckgeschrieben bevor
//! das Ergebnis zurueckkommt (lesender Zugriff mit Korrektur-Seiteneffekt).

use chrono::Utc;
use herzfunk_core::types::UserId;
use herzfunk_db::{AboStatus, BenutzerRepository, DbResult};
use std::sync::Arc;

/// Synchrone Abo-Pruefung vor jeder Anruf-Initiierung
pub struct EntitlementGate<S: BenutzerRepository> {
    repo: Arc<S>,
}

impl<S: BenutzerRepository> EntitlementGate<S> {
    /// Erstellt ein neues EntitlementGate
    pub fn neu(repo: Arc<S>) -> Self {
        Self { repo }
    }

    /// Prueft ob ein Benutzer aktuell ein aktives Abo haelt
    ///
    /// Unbekannte Benutzer gelten als nicht berechtigt. Speicherfehler
    /// werden propagiert; der Aufrufer meldet dem Initiator dann einen
    /// generischen Serverfehler.
    pub async fn hat_aktives_abo(&self, benutzer: &UserId) -> DbResult<bool> {
        let Some(record) = self.repo.benutzer_laden(benutzer).await? else {
            tracing::debug!(benutzer = %benutzer, "Abo-Pruefung: Benutzer unbekannt");
            return Ok(false);
        };

        let jetzt = Utc::now();

        if record.abo_status_veraltet(jetzt) {
            // Veralteten Status persistieren bevor das Ergebnis zurueckgeht
            self.repo
                .abo_status_setzen(benutzer, AboStatus::Expired)
                .await?;
            tracing::info!(benutzer = %benutzer, "Abgelaufenes Abo als expired markiert");
            return Ok(false);
        }

        Ok(record.abo_aktiv(jetzt))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

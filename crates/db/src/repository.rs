//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt den Signaling-Kern von der konkreten
//! Speicher-Implementierung. Der Kern konsumiert ausschliesslich diese
//! Traits; welche Datenbank dahinter liegt ist ihm gleichgueltig.
//!
//! Die Traits verwenden `async fn` ohne Send-Garantie (async_fn_in_trait);
//! der Signaling-Server fuehrt Verbindungs-Tasks deshalb in einer
//! `tokio::task::LocalSet` aus.

use herzfunk_core::types::{MessageId, UserId};

use crate::error::DbResult;
use crate::models::{AboStatus, BenutzerRecord, MatchRecord, NachrichtenRecord, NeueNachricht};

/// Repository fuer Benutzer-Datenzugriffe
#[allow(async_fn_in_trait)]
pub trait BenutzerRepository: Send + Sync {
    /// Einen Benutzer anhand seiner ID laden
    async fn benutzer_laden(&self, id: &UserId) -> DbResult<Option<BenutzerRecord>>;

    /// Den Abo-Status eines Benutzers persistieren
    ///
    /// Wird von der Abo-Pruefung fuer die Korrektur veralteter
    /// `active`-Eintraege verwendet. Gibt `false` zurueck wenn der
    /// Benutzer nicht existiert.
    async fn abo_status_setzen(&self, id: &UserId, status: AboStatus) -> DbResult<bool>;
}

/// Repository fuer Match-Datenzugriffe
#[allow(async_fn_in_trait)]
pub trait MatchRepository: Send + Sync {
    /// Laedt den Match-Datensatz eines Benutzers, legt ihn bei Bedarf an
    async fn match_laden_oder_erstellen(&self, benutzer: &UserId) -> DbResult<MatchRecord>;
}

/// Repository fuer Nachrichten-Datenzugriffe
#[allow(async_fn_in_trait)]
pub trait NachrichtenRepository: Send + Sync {
    /// Eine Nachricht anhand ihrer ID laden
    async fn nachricht_laden(&self, id: &MessageId) -> DbResult<Option<NachrichtenRecord>>;

    /// Eine neue Nachricht anlegen
    async fn nachricht_erstellen(&self, neu: NeueNachricht) -> DbResult<NachrichtenRecord>;

    /// Eine bestehende Nachricht vollstaendig ersetzen
    ///
    /// Atomarer Einzel-Datensatz-Schreibzugriff (Edit, Soft-Delete,
    /// Like/Dislike).
    async fn nachricht_aktualisieren(
        &self,
        record: NachrichtenRecord,
    ) -> DbResult<NachrichtenRecord>;

    /// Alle Nachrichten zwischen zwei Benutzern, aelteste zuerst
    async fn nachrichten_zwischen(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> DbResult<Vec<NachrichtenRecord>>;
}

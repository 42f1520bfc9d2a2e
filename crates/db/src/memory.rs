//! In-Memory-Referenzimplementierung der Repository-Traits
//!
//! Haelt alle Datensaetze in DashMaps. Dient als Speicher-Stand-in fuer
//! Betrieb ohne externen Datenspeicher und fuer Tests; Zustand geht beim
//! Prozessende verloren.

use dashmap::DashMap;
use herzfunk_core::types::{MessageId, UserId};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DbFehler, DbResult};
use crate::models::{AboStatus, BenutzerRecord, MatchRecord, NachrichtenRecord, NeueNachricht};
use crate::repository::{BenutzerRepository, MatchRepository, NachrichtenRepository};

/// In-Memory-Datenspeicher
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct MemoryDatenbank {
    inner: Arc<MemoryDatenbankInner>,
}

struct MemoryDatenbankInner {
    benutzer: DashMap<UserId, BenutzerRecord>,
    nachrichten: DashMap<MessageId, NachrichtenRecord>,
    matches: DashMap<UserId, MatchRecord>,
}

impl MemoryDatenbank {
    /// Erstellt eine neue leere Datenbank
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(MemoryDatenbankInner {
                benutzer: DashMap::new(),
                nachrichten: DashMap::new(),
                matches: DashMap::new(),
            }),
        }
    }

    /// Legt einen Benutzer-Datensatz an oder ersetzt ihn
    pub fn benutzer_einfuegen(&self, record: BenutzerRecord) {
        self.inner.benutzer.insert(record.id.clone(), record);
    }

    /// Gibt die Anzahl der gespeicherten Benutzer zurueck
    pub fn benutzer_anzahl(&self) -> usize {
        self.inner.benutzer.len()
    }
}

impl Default for MemoryDatenbank {
    fn default() -> Self {
        Self::neu()
    }
}

impl BenutzerRepository for MemoryDatenbank {
    async fn benutzer_laden(&self, id: &UserId) -> DbResult<Option<BenutzerRecord>> {
        Ok(self.inner.benutzer.get(id).map(|e| e.clone()))
    }

    async fn abo_status_setzen(&self, id: &UserId, status: AboStatus) -> DbResult<bool> {
        match self.inner.benutzer.get_mut(id) {
            Some(mut entry) => {
                entry.abo_status = status;
                tracing::debug!(benutzer = %id, status = ?status, "Abo-Status persistiert");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl MatchRepository for MemoryDatenbank {
    async fn match_laden_oder_erstellen(&self, benutzer: &UserId) -> DbResult<MatchRecord> {
        let entry = self
            .inner
            .matches
            .entry(benutzer.clone())
            .or_insert_with(|| MatchRecord::leer(benutzer.clone()));
        Ok(entry.clone())
    }
}

impl NachrichtenRepository for MemoryDatenbank {
    async fn nachricht_laden(&self, id: &MessageId) -> DbResult<Option<NachrichtenRecord>> {
        Ok(self.inner.nachrichten.get(id).map(|e| e.clone()))
    }

    async fn nachricht_erstellen(&self, neu: NeueNachricht) -> DbResult<NachrichtenRecord> {
        let record = NachrichtenRecord {
            id: MessageId::neu(Uuid::new_v4().to_string()),
            sender: neu.sender,
            empfaenger: neu.empfaenger,
            text: neu.text,
            antwort_auf: neu.antwort_auf,
            liked_von: Vec::new(),
            disliked_von: Vec::new(),
            editiert: false,
            geloescht: false,
            erstellt_am: chrono::Utc::now(),
        };
        self.inner
            .nachrichten
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn nachricht_aktualisieren(
        &self,
        record: NachrichtenRecord,
    ) -> DbResult<NachrichtenRecord> {
        match self.inner.nachrichten.get_mut(&record.id) {
            Some(mut entry) => {
                *entry = record.clone();
                Ok(record)
            }
            None => Err(DbFehler::NichtGefunden(record.id.to_string())),
        }
    }

    async fn nachrichten_zwischen(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> DbResult<Vec<NachrichtenRecord>> {
        let mut ergebnis: Vec<NachrichtenRecord> = self
            .inner
            .nachrichten
            .iter()
            .filter(|e| {
                (e.sender == *a && e.empfaenger == *b) || (e.sender == *b && e.empfaenger == *a)
            })
            .map(|e| e.clone())
            .collect();
        ergebnis.sort_by_key(|n| n.erstellt_am);
        Ok(ergebnis)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

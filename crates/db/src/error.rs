//! Fehlertypen fuer das Datenbank-Crate

use thiserror::Error;

/// Fehlertyp fuer Datenspeicher-Zugriffe
#[derive(Debug, Error)]
pub enum DbFehler {
    /// Datensatz existiert nicht
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    /// Externer Speicher nicht erreichbar oder Anfrage abgebrochen
    #[error("Speicher nicht erreichbar: {0}")]
    NichtErreichbar(String),

    /// Interner Fehler
    #[error("Interner Speicherfehler: {0}")]
    Intern(String),
}

impl DbFehler {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

/// Result-Typ fuer Datenspeicher-Zugriffe
pub type DbResult<T> = Result<T, DbFehler>;

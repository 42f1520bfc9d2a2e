//! Gemeinsame Identifikationstypen fuer Herzfunk
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.
//!
//! `UserId` und `MessageId` sind opake Strings: sie werden vom externen
//! Auth-System bzw. vom externen Datenspeicher vergeben und hier niemals
//! erzeugt oder veraendert. `ConnectionId` wird dagegen beim Accept einer
//! Transportverbindung lokal vergeben.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stabile Anwendungs-Benutzer-ID (vom externen Auth-System vergeben)
///
/// Dient als Adressierungs-Schluessel fuer Raeume und Presence. `Ord`
/// ist abgeleitet damit Online-Listen stabil sortiert werden koennen.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Erstellt eine UserId aus einem vorhandenen externen Bezeichner
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt den inneren Bezeichner als &str zurueck
    pub fn als_str(&self) -> &str {
        &self.0
    }

    /// Prueft ob der Bezeichner leer ist (ungueltige Registrierung)
    pub fn ist_leer(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Eindeutige ID einer physischen Transportverbindung
///
/// Wird beim Accept vergeben und mit der Verbindung zerstoert. Eine
/// Identitaet kann mehrere gleichzeitige Verbindungen besitzen
/// (Multi-Device), eine Verbindung gehoert zu hoechstens einer Identitaet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Opake Nachrichten-ID (vom externen Datenspeicher vergeben)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Erstellt eine MessageId aus einem vorhandenen externen Bezeichner
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt den inneren Bezeichner als &str zurueck
    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

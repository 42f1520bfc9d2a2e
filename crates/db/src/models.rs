//! Datensatz-Modelle des externen Datenspeichers
//!
//! Die Felder spiegeln die Datensaetze die das Produkt im externen
//! Speicher haelt; der Kern liest sie nur (mit Ausnahme der
//! Abo-Status-Korrektur).

use chrono::{DateTime, Utc};
use herzfunk_core::types::{MessageId, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Abo
// ---------------------------------------------------------------------------

/// Abo-Status eines Benutzers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AboStatus {
    Free,
    Active,
    Expired,
}

/// Abo-Laufzeitmodell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AboTyp {
    Monthly,
    Yearly,
}

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz im externen Speicher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub abo_status: AboStatus,
    pub abo_typ: Option<AboTyp>,
    pub abo_beginn: Option<DateTime<Utc>>,
    pub abo_ende: Option<DateTime<Utc>>,
}

impl BenutzerRecord {
    /// Prueft ob das Abo zum Zeitpunkt `jetzt` aktiv ist
    ///
    /// Aktiv heisst: Status `active` UND ein Enddatum existiert UND
    /// `jetzt` liegt strikt davor.
    pub fn abo_aktiv(&self, jetzt: DateTime<Utc>) -> bool {
        if self.abo_status != AboStatus::Active {
            return false;
        }
        match self.abo_ende {
            Some(ende) => jetzt < ende,
            None => false,
        }
    }

    /// Prueft ob der Status `active` veraltet ist (Enddatum ueberschritten)
    pub fn abo_status_veraltet(&self, jetzt: DateTime<Utc>) -> bool {
        self.abo_status == AboStatus::Active
            && matches!(self.abo_ende, Some(ende) if jetzt >= ende)
    }
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Nachrichten-Datensatz im externen Speicher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NachrichtenRecord {
    pub id: MessageId,
    pub sender: UserId,
    pub empfaenger: UserId,
    pub text: String,
    /// Referenz auf eine beantwortete Nachricht
    pub antwort_auf: Option<MessageId>,
    pub liked_von: Vec<UserId>,
    pub disliked_von: Vec<UserId>,
    pub editiert: bool,
    pub geloescht: bool,
    pub erstellt_am: DateTime<Utc>,
}

/// Daten zum Anlegen einer neuen Nachricht
#[derive(Debug, Clone)]
pub struct NeueNachricht {
    pub sender: UserId,
    pub empfaenger: UserId,
    pub text: String,
    pub antwort_auf: Option<MessageId>,
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

/// Match-Datensatz: wen hat ein Benutzer gemocht bzw. abgelehnt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub benutzer: UserId,
    pub gemocht: Vec<UserId>,
    pub abgelehnt: Vec<UserId>,
}

impl MatchRecord {
    /// Erstellt einen leeren Match-Datensatz fuer einen Benutzer
    pub fn leer(benutzer: UserId) -> Self {
        Self {
            benutzer,
            gemocht: Vec::new(),
            abgelehnt: Vec::new(),
        }
    }
}

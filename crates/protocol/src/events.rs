//! Ereignis-Protokoll des Signaling-Hubs
//!
//! Definiert alle eingehenden (`ClientEvent`) und ausgehenden
//! (`ServerEvent`) Ereignisse als getaggte Enums.
//!
//! ## Design
//! - Tagged Enums: jedes Ereignis traegt ein `type`-Feld mit dem
//!   Ereignisnamen den die Clients erwarten (`register`, `callUser`, ...)
//! - Payload-Felder in camelCase, exakt wie auf dem Draht
//! - WebRTC-Signal-Payloads (SDP/ICE) bleiben unstrukturiertes JSON –
//!   der Hub leitet sie nur durch und interpretiert sie nie

use chrono::{DateTime, Utc};
use herzfunk_core::types::{MessageId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Anruf-Ende-Gruende
// ---------------------------------------------------------------------------

/// Standardisierte Gruende fuer ein `callEnded`-Ereignis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnrufEndeGrund {
    /// Anrufer hat kein aktives Abo
    SubscriptionRequired,
    /// Angerufener hat kein aktives Abo
    ReceiverNoSubscription,
    /// Angerufener ist nicht verbunden
    UserOffline,
    /// Anruf wurde innerhalb des Zeitfensters nicht angenommen
    NotAnswered,
    /// Eine der Parteien hat aufgelegt
    EndedByUser,
    /// Downstream-Fehler (Datenspeicher nicht erreichbar o.ae.)
    ServerError,
}

// ---------------------------------------------------------------------------
// Nachrichten-Payload
// ---------------------------------------------------------------------------

/// Eine bereits persistierte Chat-Nachricht (Draht-Format)
///
/// Der Hub persistiert selbst nichts – dieses Objekt kommt vom externen
/// Datenspeicher und wird lediglich an die Raeume von Sender und
/// Empfaenger verteilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NachrichtDaten {
    pub id: MessageId,
    pub sender: UserId,
    pub receiver: UserId,
    #[serde(default)]
    pub text: String,
    /// Referenz auf eine beantwortete Nachricht
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    #[serde(default)]
    pub liked_by: Vec<UserId>,
    #[serde(default)]
    pub disliked_by: Vec<UserId>,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Eingehende Ereignisse (Client -> Hub)
// ---------------------------------------------------------------------------

/// Identitaets-Registrierung einer Verbindung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDaten {
    pub user_id: UserId,
}

/// Anruf-Initiierung mit WebRTC-Offer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnrufDaten {
    /// Angerufener
    pub to: UserId,
    /// SDP-Offer/ICE des Anrufers (wird unveraendert durchgereicht)
    pub signal: Value,
    /// Anrufer
    pub from: UserId,
    /// Anzeigename des Anrufers
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_audio_only: bool,
}

/// Anruf-Annahme mit WebRTC-Answer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntwortDaten {
    /// Urspruenglicher Anrufer (Empfaenger der Answer)
    pub to: UserId,
    pub signal: Value,
    /// Annehmende Partei
    pub from: UserId,
}

/// Explizites Auflegen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuflegenDaten {
    /// Gegenseite die benachrichtigt wird
    pub to: UserId,
    pub from: UserId,
}

/// Tipp-Indikator (start und stop teilen das Payload-Format)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TippDaten {
    pub to: UserId,
    pub user_id: UserId,
}

/// Alle Ereignisse die ein Client an den Hub senden kann
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "register")]
    Register(RegisterDaten),
    #[serde(rename = "send-message")]
    SendMessage(NachrichtDaten),
    #[serde(rename = "callUser")]
    CallUser(AnrufDaten),
    #[serde(rename = "answerCall")]
    AnswerCall(AntwortDaten),
    #[serde(rename = "endCall")]
    EndCall(AuflegenDaten),
    #[serde(rename = "typing-start")]
    TypingStart(TippDaten),
    #[serde(rename = "typing-stop")]
    TypingStop(TippDaten),
}

// ---------------------------------------------------------------------------
// Ausgehende Ereignisse (Hub -> Client)
// ---------------------------------------------------------------------------

/// Anruf-Zustellung an den Angerufenen (Offer des Anrufers)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnrufSignal {
    pub signal: Value,
    pub from: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_audio_only: bool,
}

/// Alle Ereignisse die der Hub an Clients sendet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    // Presence (Broadcast an alle Verbindungen)
    #[serde(rename = "user-connected")]
    #[serde(rename_all = "camelCase")]
    UserConnected { user_id: UserId },
    #[serde(rename = "user-disconnected")]
    #[serde(rename_all = "camelCase")]
    UserDisconnected { user_id: UserId },
    #[serde(rename = "users-online")]
    UsersOnline { users: Vec<UserId> },

    // Anruf-Signalisierung (raum-adressiert)
    #[serde(rename = "callUser")]
    CallUser(AnrufSignal),
    #[serde(rename = "callAccepted")]
    CallAccepted { signal: Value },
    #[serde(rename = "callEnded")]
    CallEnded { reason: AnrufEndeGrund },

    // Tipp-Indikatoren (raum-adressiert)
    #[serde(rename = "typing-start")]
    #[serde(rename_all = "camelCase")]
    TypingStart { user_id: UserId },
    #[serde(rename = "typing-stop")]
    #[serde(rename_all = "camelCase")]
    TypingStop { user_id: UserId },

    // Nachrichten-Zustellung und -Mutation (raum-adressiert an Sender
    // und Empfaenger)
    #[serde(rename = "receive-message")]
    ReceiveMessage(NachrichtDaten),
    #[serde(rename = "update-message")]
    UpdateMessage(NachrichtDaten),
    #[serde(rename = "edit-message")]
    #[serde(rename_all = "camelCase")]
    EditMessage {
        message_id: MessageId,
        new_text: String,
    },
    #[serde(rename = "delete-message")]
    #[serde(rename_all = "camelCase")]
    DeleteMessage { message_id: MessageId },
}

impl ServerEvent {
    /// Erstellt ein `callEnded`-Ereignis mit dem gegebenen Grund
    pub fn anruf_beendet(reason: AnrufEndeGrund) -> Self {
        Self::CallEnded { reason }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

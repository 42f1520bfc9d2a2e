//! herzfunk-signaling – Realtime Presence- und Signaling-Hub
//!
//! Dieser Crate implementiert den Signaling-Kern von Herzfunk: Verbindungs-
//! Registrierung, Presence-Verwaltung, raum-adressierte Zustellung und die
//! WebRTC-Anruf-Vermittlung mit Timeout-Semantik.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |
//!     v
//! EventDispatcher
//!     |
//!     +-- PresenceRegistry  (Identitaet -> Verbindungs-Menge, online/offline)
//!     +-- CallTracker       (anstehende Anrufversuche + Timeout-Timer)
//!     +-- EntitlementGate   (Abo-Pruefung gegen den externen Speicher)
//!     |
//!     v
//! EventBroadcaster – raum-adressierte Zustellung an Verbindungs-Queues
//! ```
//!
//! Jede ausgehende Emission laeuft durch den `EventBroadcaster`; kein
//! Handler schreibt direkt auf einen Transport.

pub mod broadcast;
pub mod calls;
pub mod connection;
pub mod dispatcher;
pub mod entitlement;
pub mod presence;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use calls::{AnrufSchluessel, CallTracker};
pub use connection::ClientConnection;
pub use dispatcher::{EventDispatcher, VerbindungsKontext};
pub use entitlement::EntitlementGate;
pub use presence::PresenceRegistry;
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;

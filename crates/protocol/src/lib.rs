//! herzfunk-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Ereignistypen die zwischen Client und
//! Signaling-Hub ausgetauscht werden, sowie das Frame-Format fuer die
//! TCP-Verbindung. Die JSON-Feldnamen entsprechen exakt dem Draht-Format
//! der Clients (camelCase-Payloads, `type`-getaggte Ereignisse).

pub mod events;
pub mod wire;

pub use events::{AnrufEndeGrund, ClientEvent, NachrichtDaten, ServerEvent};
pub use wire::FrameCodec;

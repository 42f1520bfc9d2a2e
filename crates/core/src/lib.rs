//! herzfunk-core – Gemeinsame Basistypen
//!
//! Dieses Crate definiert die Identifikationstypen die von allen anderen
//! Herzfunk-Crates geteilt werden. Keine Geschaeftslogik, keine I/O.

pub mod types;

// Bequeme Re-Exporte
pub use types::{ConnectionId, MessageId, UserId};

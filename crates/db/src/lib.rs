//! herzfunk-db – Datenspeicher-Schnittstelle
//!
//! Der Herzfunk-Kern persistiert selbst nichts: Benutzer, Nachrichten und
//! Matches liegen in einem externen Datenspeicher. Dieses Crate definiert
//! die Schnittstelle zu diesem Speicher als Repository-Traits und liefert
//! eine In-Memory-Referenzimplementierung fuer Betrieb ohne externen
//! Speicher und fuer Tests.
//!
//! Alle Operationen sind atomare Einzel-Datensatz-Zugriffe; es gibt keine
//! uebergreifenden Transaktionen.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;

// Bequeme Re-Exporte
pub use error::{DbFehler, DbResult};
pub use memory::MemoryDatenbank;
pub use models::{AboStatus, AboTyp, BenutzerRecord, MatchRecord, NachrichtenRecord, NeueNachricht};
pub use repository::{BenutzerRepository, MatchRepository, NachrichtenRepository};

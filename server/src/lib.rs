//! herzfunk-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use herzfunk_db::MemoryDatenbank;
use herzfunk_signaling::{SignalingServer, SignalingState};
use std::net::SocketAddr;
use std::sync::Arc;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Signaling-Hub und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenspeicher aufbauen (In-Memory-Referenz)
    /// 2. Hub-Zustand erstellen
    /// 3. TCP-Listener starten
    /// 4. Auf Ctrl-C warten, dann Shutdown signalisieren
    pub async fn starten(self) -> Result<()> {
        let bind_adresse: SocketAddr = self
            .config
            .tcp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse: {}", self.config.tcp_bind_adresse()))?;

        let store = Arc::new(MemoryDatenbank::neu());
        let state = SignalingState::neu(self.config.signaling_config(), store);

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let hub = SignalingServer::neu(Arc::clone(&state), bind_adresse);

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %bind_adresse,
            anruf_timeout_sek = self.config.signaling.anruf_timeout_sek,
            "Hub startet"
        );

        let hub_lauf = hub.starten(shutdown_rx);
        tokio::pin!(hub_lauf);

        tokio::select! {
            ergebnis = &mut hub_lauf => {
                ergebnis.context("Signaling-Hub beendet mit Fehler")?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown-Signal empfangen, Hub wird beendet");
                let _ = shutdown_tx.send(true);
                // Accept-Loop auslaufen lassen bevor der Prozess endet
                hub_lauf.await.context("Signaling-Hub beendet mit Fehler")?;
            }
        }

        Ok(())
    }
}

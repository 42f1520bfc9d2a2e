//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Die Schleife liest Frames, parst sie zu `ClientEvent`s und
//! reicht sie an den Dispatcher; parallel entleert sie die ausgehende
//! Broadcaster-Queue der Verbindung auf den Socket.
//!
//! ## Fehlertoleranz
//! Ein Frame der gueltiges JSON aber kein bekanntes Ereignis ist wird
//! geloggt und verworfen; die Verbindung lebt weiter. Nur Framing- und
//! IO-Fehler (Protokollkorruption) beenden die Schleife.

use futures_util::{SinkExt, StreamExt};
use herzfunk_db::{BenutzerRepository, NachrichtenRepository};
use herzfunk_protocol::events::ClientEvent;
use herzfunk_protocol::wire::FrameCodec;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::dispatcher::{EventDispatcher, VerbindungsKontext};
use crate::server_state::SignalingState;
use herzfunk_core::types::ConnectionId;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Laeuft in einem eigenen tokio-Task bis der Client trennt, ein
/// IO-Fehler auftritt oder das Shutdown-Signal kommt.
pub struct ClientConnection<S>
where
    S: BenutzerRepository + NachrichtenRepository + 'static,
{
    state: Arc<SignalingState<S>>,
    peer_addr: SocketAddr,
}

impl<S> ClientConnection<S>
where
    S: BenutzerRepository + NachrichtenRepository + 'static,
{
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState<S>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let verbindung = ConnectionId::new();

        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Neue Verbindung");

        let codec = FrameCodec::with_max_size(self.state.config.max_frame_bytes);
        let mut framed = Framed::new(stream, codec);

        // Ausgehende Queue sofort registrieren: die Verbindung kann schon
        // vor ihrer Registrierung globale Presence-Broadcasts empfangen
        let mut sende_rx = self.state.broadcaster.verbindung_registrieren(verbindung);

        let dispatcher = EventDispatcher::neu(Arc::clone(&self.state));
        let mut ctx = VerbindungsKontext::neu(verbindung);

        loop {
            tokio::select! {
                // Eingehendes Frame vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(wert)) => {
                            match serde_json::from_value::<ClientEvent>(wert) {
                                Ok(ereignis) => dispatcher.dispatch(ereignis, &mut ctx).await,
                                Err(fehler) => {
                                    // Fehlgeformtes Ereignis: verwerfen,
                                    // Verbindung behalten
                                    tracing::warn!(
                                        peer = %peer_addr,
                                        fehler = %fehler,
                                        "Ungueltiges Ereignis verworfen"
                                    );
                                }
                            }
                        }
                        Some(Err(fehler)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %fehler,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehendes Ereignis aus dem Broadcaster
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(fehler) = framed.send(ausgehend).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            fehler = %fehler,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende: Registrierung aufloesen,
        // anstehende Anrufe bereinigen, Queue entfernen
        dispatcher.verbindung_geschlossen(&mut ctx);
        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Verbindungs-Task beendet");
    }
}

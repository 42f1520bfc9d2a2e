//! Event-Dispatcher – Routet Client-Ereignisse an die Zustands-Manager
//!
//! Pro Verbindung existiert ein Kontext; der Dispatcher selbst ist
//! zustandslos und teilt nur den `SignalingState`. Jede ausgehende
//! Emission laeuft ueber den `EventBroadcaster`, nie direkt auf einen
//! Transport.
//!
//! ## Fehlerverhalten
//! - Ereignisse ohne gueltige Pflichtfelder werden geloggt und verworfen;
//!   die Verbindung bleibt bestehen
//! - Speicherfehler auf dem Anruf-Pfad melden dem Initiator
//!   `callEnded{server_error}` und werden nicht wiederholt
//! - Nichts propagiert als fataler Zustand nach aussen

use herzfunk_core::types::{ConnectionId, MessageId, UserId};
use herzfunk_db::{BenutzerRepository, DbFehler, NachrichtenRecord, NachrichtenRepository};
use herzfunk_protocol::events::{
    AnrufDaten, AnrufEndeGrund, AnrufSignal, ClientEvent, NachrichtDaten, ServerEvent,
};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verbindungs-Kontext des Dispatchers
///
/// Eine Verbindung gehoert zu hoechstens einer Identitaet; bis zur
/// Registrierung ist sie anonym.
pub struct VerbindungsKontext {
    /// ID der physischen Verbindung
    pub verbindung: ConnectionId,
    /// Registrierte Identitaet (None bis zum `register`-Ereignis)
    pub benutzer: Option<UserId>,
}

impl VerbindungsKontext {
    /// Erstellt einen neuen Kontext fuer eine frische Verbindung
    pub fn neu(verbindung: ConnectionId) -> Self {
        Self {
            verbindung,
            benutzer: None,
        }
    }
}

/// Zentraler Event-Dispatcher
pub struct EventDispatcher<S>
where
    S: BenutzerRepository + NachrichtenRepository + 'static,
{
    state: Arc<SignalingState<S>>,
}

impl<S> EventDispatcher<S>
where
    S: BenutzerRepository + NachrichtenRepository + 'static,
{
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState<S>>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes Client-Ereignis
    pub async fn dispatch(&self, ereignis: ClientEvent, ctx: &mut VerbindungsKontext) {
        match ereignis {
            ClientEvent::Register(daten) => self.registrieren(daten.user_id, ctx),

            ClientEvent::SendMessage(nachricht) => self.nachricht_weiterleiten(nachricht).await,

            ClientEvent::CallUser(daten) => {
                let anrufer = daten.from.clone();
                if let Err(fehler) = self.anruf_initiieren(daten).await {
                    tracing::warn!(
                        anrufer = %anrufer,
                        fehler = %fehler,
                        "Anruf-Initiierung am Speicher gescheitert"
                    );
                    self.state.broadcaster.an_raum_senden(
                        &anrufer,
                        ServerEvent::anruf_beendet(AnrufEndeGrund::ServerError),
                    );
                }
            }

            ClientEvent::AnswerCall(daten) => {
                // Vorgemerkt wurde unter (Anrufer -> Angerufener);
                // `to` ist hier der urspruengliche Anrufer. Ein fehlender
                // Eintrag gilt als bereits aufgeloest, die Answer wird
                // trotzdem zugestellt.
                self.state.anrufe.annehmen(&daten.to, &daten.from);
                self.state.broadcaster.an_raum_senden(
                    &daten.to,
                    ServerEvent::CallAccepted {
                        signal: daten.signal,
                    },
                );
            }

            ClientEvent::EndCall(daten) => {
                self.state.anrufe.beenden(&daten.from, &daten.to);
                // Nur die Gegenseite wird informiert, nie der Ausloeser
                self.state.broadcaster.an_raum_senden(
                    &daten.to,
                    ServerEvent::anruf_beendet(AnrufEndeGrund::EndedByUser),
                );
            }

            // Tipp-Indikatoren sind reine Durchreichung ohne Zustand
            ClientEvent::TypingStart(daten) => {
                self.state.broadcaster.an_raum_senden(
                    &daten.to,
                    ServerEvent::TypingStart {
                        user_id: daten.user_id,
                    },
                );
            }
            ClientEvent::TypingStop(daten) => {
                self.state.broadcaster.an_raum_senden(
                    &daten.to,
                    ServerEvent::TypingStop {
                        user_id: daten.user_id,
                    },
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // Registrierung & Verbindungs-Lebenszyklus
    // -----------------------------------------------------------------------

    /// Verarbeitet ein `register`-Ereignis
    fn registrieren(&self, benutzer: UserId, ctx: &mut VerbindungsKontext) {
        if benutzer.ist_leer() {
            tracing::warn!(
                verbindung = %ctx.verbindung,
                "Registrierung ohne Benutzer-ID verworfen"
            );
            return;
        }

        // Identitaetswechsel: alte Registrierung zuerst sauber aufloesen
        if let Some(alt) = &ctx.benutzer {
            if *alt != benutzer {
                self.verbindung_abmelden(ctx);
            }
        }

        let wurde_online = self.state.presence.registrieren(&benutzer, ctx.verbindung);
        self.state
            .broadcaster
            .raum_beitreten(benutzer.clone(), ctx.verbindung);
        ctx.benutzer = Some(benutzer.clone());

        if wurde_online {
            // Presence-Uebergang: alle Verbindungen informieren
            self.state.broadcaster.an_alle_senden(ServerEvent::UserConnected {
                user_id: benutzer.clone(),
            });
            self.state.broadcaster.an_alle_senden(ServerEvent::UsersOnline {
                users: self.state.presence.schnappschuss(),
            });
        } else {
            // Kein Uebergang (weiteres Geraet): nur dieser Verbindung den
            // aktuellen Stand geben
            self.state.broadcaster.an_verbindung_senden(
                &ctx.verbindung,
                ServerEvent::UsersOnline {
                    users: self.state.presence.schnappschuss(),
                },
            );
        }
    }

    /// Loest die Registrierung einer Verbindung auf
    ///
    /// Geht die Identitaet dadurch offline, werden ihre anstehenden
    /// Anrufe bereinigt (die Gegenseite erhaelt `callEnded{user_offline}`)
    /// und der Presence-Wechsel wird an alle Verbindungen gemeldet.
    fn verbindung_abmelden(&self, ctx: &mut VerbindungsKontext) {
        let Some(benutzer) = ctx.benutzer.take() else {
            return;
        };
        self.state
            .broadcaster
            .raum_verlassen(&benutzer, &ctx.verbindung);

        let Some(offline) = self.state.presence.abmelden(&ctx.verbindung) else {
            return;
        };

        for schluessel in self.state.anrufe.benutzer_bereinigen(&offline) {
            let gegenseite = schluessel.gegenseite(&offline).clone();
            self.state.broadcaster.an_raum_senden(
                &gegenseite,
                ServerEvent::anruf_beendet(AnrufEndeGrund::UserOffline),
            );
        }

        self.state.broadcaster.an_alle_senden(ServerEvent::UserDisconnected {
            user_id: offline.clone(),
        });
        self.state.broadcaster.an_alle_senden(ServerEvent::UsersOnline {
            users: self.state.presence.schnappschuss(),
        });
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    pub fn verbindung_geschlossen(&self, ctx: &mut VerbindungsKontext) {
        self.verbindung_abmelden(ctx);
        self.state.broadcaster.verbindung_entfernen(&ctx.verbindung);
        tracing::debug!(verbindung = %ctx.verbindung, "Verbindungs-Ressourcen bereinigt");
    }

    // -----------------------------------------------------------------------
    // Anrufe
    // -----------------------------------------------------------------------

    /// Fuehrt die Vorbedingungs-Kette der Anruf-Initiierung aus
    ///
    /// Reihenfolge mit Kurzschluss: Abo des Anrufers, Abo des
    /// Angerufenen, Presence des Angerufenen. Ablehnungen gehen nur an
    /// den Raum des Anrufers.
    async fn anruf_initiieren(&self, daten: AnrufDaten) -> Result<(), DbFehler> {
        let AnrufDaten {
            to,
            signal,
            from,
            name,
            is_audio_only,
        } = daten;

        if !self.state.abo_pruefung.hat_aktives_abo(&from).await? {
            tracing::info!(anrufer = %from, "Anruf abgelehnt: kein aktives Abo");
            self.state.broadcaster.an_raum_senden(
                &from,
                ServerEvent::anruf_beendet(AnrufEndeGrund::SubscriptionRequired),
            );
            return Ok(());
        }

        if !self.state.abo_pruefung.hat_aktives_abo(&to).await? {
            tracing::info!(angerufener = %to, "Anruf abgelehnt: Gegenseite ohne Abo");
            self.state.broadcaster.an_raum_senden(
                &from,
                ServerEvent::anruf_beendet(AnrufEndeGrund::ReceiverNoSubscription),
            );
            return Ok(());
        }

        if !self.state.presence.ist_online(&to) {
            tracing::info!(angerufener = %to, "Anruf abgelehnt: Gegenseite offline");
            self.state.broadcaster.an_raum_senden(
                &from,
                ServerEvent::anruf_beendet(AnrufEndeGrund::UserOffline),
            );
            return Ok(());
        }

        self.state.anrufe.vormerken(from.clone(), to.clone());
        self.state.broadcaster.an_raum_senden(
            &to,
            ServerEvent::CallUser(AnrufSignal {
                signal,
                from,
                name,
                is_audio_only,
            }),
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Nachrichten
    // -----------------------------------------------------------------------

    /// Stellt eine frisch persistierte Nachricht live zu
    ///
    /// Bei einer Antwort wird der Datensatz aus dem Speicher nachgeladen
    /// um den Antwort-Kontext mitzunehmen; ein Speicherfehler blockiert
    /// die Zustellung nicht.
    async fn nachricht_weiterleiten(&self, mut nachricht: NachrichtDaten) {
        if nachricht.reply_to.is_some() {
            match self.state.store.nachricht_laden(&nachricht.id).await {
                Ok(Some(record)) => nachricht = nachricht_daten(record),
                Ok(None) => {}
                Err(fehler) => {
                    tracing::warn!(
                        nachricht = %nachricht.id,
                        fehler = %fehler,
                        "Antwort-Kontext nicht ladbar, Original wird zugestellt"
                    );
                }
            }
        }

        let sender = nachricht.sender.clone();
        let empfaenger = nachricht.receiver.clone();
        self.state
            .broadcaster
            .an_raum_senden(&empfaenger, ServerEvent::ReceiveMessage(nachricht.clone()));
        if sender != empfaenger {
            self.state
                .broadcaster
                .an_raum_senden(&sender, ServerEvent::ReceiveMessage(nachricht));
        }
    }

    /// Meldet eine mutierte Nachricht (Like/Dislike) an beide Beteiligte
    ///
    /// Einstiegspunkt fuer den ausgelagerten HTTP-Layer. Zustellung geht
    /// ausschliesslich an die Raeume von Sender und Empfaenger.
    pub fn nachricht_aktualisiert(&self, nachricht: NachrichtDaten) {
        let sender = nachricht.sender.clone();
        let empfaenger = nachricht.receiver.clone();
        self.state
            .broadcaster
            .an_raum_senden(&empfaenger, ServerEvent::UpdateMessage(nachricht.clone()));
        if sender != empfaenger {
            self.state
                .broadcaster
                .an_raum_senden(&sender, ServerEvent::UpdateMessage(nachricht));
        }
    }

    /// Meldet eine editierte Nachricht an beide Beteiligte
    pub fn nachricht_editiert(
        &self,
        sender: &UserId,
        empfaenger: &UserId,
        message_id: MessageId,
        neuer_text: String,
    ) {
        let ereignis = ServerEvent::EditMessage {
            message_id,
            new_text: neuer_text,
        };
        self.state.broadcaster.an_raum_senden(empfaenger, ereignis.clone());
        if sender != empfaenger {
            self.state.broadcaster.an_raum_senden(sender, ereignis);
        }
    }

    /// Meldet eine geloeschte Nachricht an beide Beteiligte
    pub fn nachricht_geloescht(
        &self,
        sender: &UserId,
        empfaenger: &UserId,
        message_id: MessageId,
    ) {
        let ereignis = ServerEvent::DeleteMessage { message_id };
        self.state.broadcaster.an_raum_senden(empfaenger, ereignis.clone());
        if sender != empfaenger {
            self.state.broadcaster.an_raum_senden(sender, ereignis);
        }
    }
}

/// Uebersetzt einen Speicher-Datensatz in das Draht-Format
fn nachricht_daten(record: NachrichtenRecord) -> NachrichtDaten {
    NachrichtDaten {
        id: record.id,
        sender: record.sender,
        receiver: record.empfaenger,
        text: record.text,
        reply_to: record.antwort_auf,
        liked_by: record.liked_von,
        disliked_by: record.disliked_von,
        edited: record.editiert,
        deleted: record.geloescht,
        created_at: Some(record.erstellt_am),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

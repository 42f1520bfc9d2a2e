//! Integration-Tests fuer BenutzerRepository (In-Memory-Referenz)

use chrono::{Duration, Utc};
use herzfunk_core::types::UserId;
use herzfunk_db::{AboStatus, BenutzerRecord, BenutzerRepository, MemoryDatenbank};

fn test_benutzer(id: &str, status: AboStatus) -> BenutzerRecord {
    BenutzerRecord {
        id: UserId::neu(id),
        name: id.to_uppercase(),
        email: format!("{id}@example.com"),
        abo_status: status,
        abo_typ: None,
        abo_beginn: None,
        abo_ende: Some(Utc::now() + Duration::days(30)),
    }
}

#[tokio::test]
async fn benutzer_einfuegen_und_laden() {
    let db = MemoryDatenbank::neu();
    db.benutzer_einfuegen(test_benutzer("a", AboStatus::Active));

    let geladen = db.benutzer_laden(&UserId::neu("a")).await.unwrap();
    assert!(geladen.is_some());
    assert_eq!(geladen.unwrap().name, "A");

    let fehlt = db.benutzer_laden(&UserId::neu("x")).await.unwrap();
    assert!(fehlt.is_none());
}

#[tokio::test]
async fn abo_status_setzen_persistiert() {
    let db = MemoryDatenbank::neu();
    db.benutzer_einfuegen(test_benutzer("a", AboStatus::Active));

    let ok = db
        .abo_status_setzen(&UserId::neu("a"), AboStatus::Expired)
        .await
        .unwrap();
    assert!(ok);

    let geladen = db.benutzer_laden(&UserId::neu("a")).await.unwrap().unwrap();
    assert_eq!(geladen.abo_status, AboStatus::Expired);
}

#[tokio::test]
async fn abo_status_setzen_unbekannter_benutzer() {
    let db = MemoryDatenbank::neu();
    let ok = db
        .abo_status_setzen(&UserId::neu("geist"), AboStatus::Expired)
        .await
        .unwrap();
    assert!(!ok);
}

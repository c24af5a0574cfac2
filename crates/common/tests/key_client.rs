mod common;

use ::common::client::{ClientError, KeyClient};
use ::common::key_format::{ExportedKeyPair, KeyVariant};
use ::common::keystore::{KeyStore, KeyStoreError, KeyValueBackend, MemoryBackend, RenameStatus};
use ::common::kid::Kid;

#[tokio::test]
async fn test_generated_keys_survive_restart() {
    let (client, dir) = common::setup_fs_client();
    let first = common::generate_rsa(&client, "first key").await;
    let second = common::generate_rsa(&client, "second key").await;
    drop(client);

    let restarted = KeyClient::new(common::fs_store(&dir));
    let report = restarted.initialize_from_store().await.unwrap();
    assert_eq!(report.attempted, 4);
    assert_eq!(report.loaded, 4);
    assert!(report.failed.is_empty());

    assert_eq!(restarted.private_key_count(), 2);
    assert!(restarted.contains(KeyVariant::Private, &first));
    assert!(restarted.contains(KeyVariant::Public, &second));
}

#[tokio::test]
async fn test_corrupt_record_is_counted_not_loaded() {
    let (client, dir) = common::setup_fs_client();
    let kid = common::generate_rsa(&client, "good key").await;
    drop(client);

    let broken = Kid::generate();
    let keys = dir.path().join("keys").join("public");
    std::fs::write(
        keys.join(format!("public-key-{}.json", broken)),
        r#"{"name":"broken","kid":"nope"}"#,
    )
    .unwrap();

    let restarted = KeyClient::new(common::fs_store(&dir));
    let report = restarted.initialize_from_store().await.unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.loaded, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, KeyVariant::Public);
    assert_eq!(report.failed[0].1, broken);

    assert!(restarted.contains(KeyVariant::Public, &kid));
    assert!(!restarted.contains(KeyVariant::Public, &broken));
}

#[tokio::test]
async fn test_record_with_unreadable_kid_is_reported() {
    let (client, dir) = common::setup_fs_client();
    common::generate_rsa(&client, "good key").await;
    drop(client);

    let keys = dir.path().join("keys").join("private");
    std::fs::write(keys.join("private-key-not-a-kid.json"), "{}").unwrap();

    let restarted = KeyClient::new(common::fs_store(&dir));
    let report = restarted.initialize_from_store().await.unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.loaded, 2);
    assert!(report.failed.is_empty());
    assert_eq!(
        report.unrecognised,
        vec![(KeyVariant::Private, "private-key-not-a-kid.json".to_string())]
    );
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn test_export_import_moves_a_key_between_devices() {
    let laptop = KeyClient::new(KeyStore::memory());
    let kid = common::generate_rsa(&laptop, "travelling key").await;
    let backup = laptop.export_key_string(&kid).unwrap().unwrap();

    let phone = KeyClient::new(KeyStore::memory());
    let imported = phone.import_key_string(&backup, Some(kid)).await.unwrap();
    assert_eq!(imported, kid);
    assert_eq!(phone.fingerprint(&kid), laptop.fingerprint(&kid));
    assert!(phone.contains(KeyVariant::Private, &kid));
    assert!(phone.store().contains(KeyVariant::Private, &kid).await.unwrap());
}

#[tokio::test]
async fn test_import_rejects_unexpected_kid() {
    let laptop = KeyClient::new(KeyStore::memory());
    let kid = common::generate_rsa(&laptop, "travelling key").await;
    let backup = laptop.export_key_string(&kid).unwrap().unwrap();

    let phone = KeyClient::new(KeyStore::memory());
    let result = phone.import_key_string(&backup, Some(Kid::generate())).await;
    assert!(matches!(result, Err(ClientError::InvalidKey(_))));
    assert!(phone.store().list(KeyVariant::Public).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_is_all_or_nothing() {
    let laptop = KeyClient::new(KeyStore::memory());
    let kid = common::generate_rsa(&laptop, "travelling key").await;
    let backup = laptop.export_key_string(&kid).unwrap().unwrap();

    // Swap in a private exponent that does not belong to the modulus
    let mut pair: ExportedKeyPair = serde_json::from_str(&backup).unwrap();
    pair.private_key.key.d = Some("AQAB".to_string());
    let tampered = serde_json::to_string(&pair).unwrap();

    let phone = KeyClient::new(KeyStore::memory());
    let result = phone.import_key_string(&tampered, None).await;
    assert!(matches!(result, Err(ClientError::InvalidKey(_))));
    assert!(!phone.contains(KeyVariant::Public, &kid));
    assert!(phone.store().list(KeyVariant::Public).await.unwrap().is_empty());
    assert!(phone.store().list(KeyVariant::Private).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_rejects_garbage() {
    let client = KeyClient::new(KeyStore::memory());
    for garbage in ["", "not json", "{}", r#"{"publicKey": 1}"#] {
        let result = client.import_key_string(garbage, None).await;
        assert!(matches!(result, Err(ClientError::InvalidKey(_))), "{}", garbage);
    }
}

#[tokio::test]
async fn test_public_key_import_lands_in_imported() {
    let alice = KeyClient::new(KeyStore::memory());
    let kid = common::generate_rsa(&alice, "alice main").await;
    let public = alice.export_public_key(&kid).unwrap().to_json().unwrap();

    let bob = KeyClient::new(KeyStore::memory());
    bob.import_key_string(&public, None).await.unwrap();
    assert!(bob.contains(KeyVariant::Imported, &kid));
    assert!(!bob.contains(KeyVariant::Public, &kid));
    assert_eq!(bob.fingerprint(&kid), alice.fingerprint(&kid));
    assert!(bob.export_key_string(&kid).unwrap().is_none());
}

#[tokio::test]
async fn test_rename_and_delete() {
    let client = KeyClient::new(KeyStore::memory());
    let kid = common::generate_rsa(&client, "old name").await;

    let outcome = client.rename(&kid, "new name").await.unwrap();
    assert!(outcome.fully_renamed());
    assert_eq!(outcome.public, RenameStatus::Renamed);
    let listed = client.list(KeyVariant::Private);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "new name");

    let report = client.delete(&kid).await;
    assert_eq!(report.removed, vec![KeyVariant::Public, KeyVariant::Private]);
    assert!(!client.contains(KeyVariant::Public, &kid));
    assert_eq!(client.fingerprint(&kid), "?");
}

#[tokio::test]
async fn test_init_counts_are_deterministic() {
    let backend = MemoryBackend::new();
    for _ in 0..5 {
        backend
            .put(KeyVariant::Imported, &Kid::generate(), "{}".to_string())
            .await
            .unwrap();
    }
    let store = KeyStore::new(backend);

    let mut reports = Vec::new();
    for _ in 0..3 {
        let client = KeyClient::new(store.clone());
        reports.push(client.initialize_from_store().await.unwrap());
    }
    assert!(reports.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(reports[0].attempted, 5);
    assert_eq!(reports[0].loaded, 0);
}

#[tokio::test]
async fn test_import_rolls_back_public_half_when_private_write_fails() {
    let laptop = KeyClient::new(KeyStore::memory());
    let kid = common::generate_rsa(&laptop, "travelling key").await;
    let backup = laptop.export_key_string(&kid).unwrap().unwrap();

    let phone = KeyClient::new(KeyStore::new(common::BrokenPrivateBackend::new()));
    let result = phone.import_key_string(&backup, Some(kid)).await;
    assert!(matches!(
        result,
        Err(ClientError::Store(KeyStoreError::Backend(_)))
    ));
    assert!(phone.store().list(KeyVariant::Public).await.unwrap().is_empty());
    assert!(phone.store().list(KeyVariant::Private).await.unwrap().is_empty());
    assert!(!phone.contains(KeyVariant::Public, &kid));

    // Nothing half-registered comes back on the next start either
    let restarted = KeyClient::new(phone.store().clone());
    let report = restarted.initialize_from_store().await.unwrap();
    assert_eq!(report.attempted, 0);
}

#[tokio::test]
async fn test_generation_rolls_back_public_half_when_private_write_fails() {
    let client = KeyClient::new(KeyStore::new(common::BrokenPrivateBackend::new()));
    let params = ::common::crypto::KeyPairParams::rsa_oaep(
        "doomed key",
        Kid::generate(),
        ::common::key_format::HashAlgorithm::Sha256,
    );

    assert!(client.generate_key_pair(params).await.is_err());
    assert!(client.store().list(KeyVariant::Public).await.unwrap().is_empty());
    assert_eq!(client.private_key_count(), 0);
}

#[tokio::test]
async fn test_failed_rollback_is_reported() {
    let laptop = KeyClient::new(KeyStore::memory());
    let kid = common::generate_rsa(&laptop, "travelling key").await;
    let backup = laptop.export_key_string(&kid).unwrap().unwrap();

    let phone = KeyClient::new(KeyStore::new(common::BrokenPrivateBackend::failing_removes()));
    let result = phone.import_key_string(&backup, None).await;
    match result {
        Err(ClientError::Store(KeyStoreError::PartialSave { kid: failed, .. })) => {
            assert_eq!(failed, kid)
        }
        other => panic!("expected a partial save, got {:?}", other),
    }
    assert!(!phone.contains(KeyVariant::Public, &kid));
}

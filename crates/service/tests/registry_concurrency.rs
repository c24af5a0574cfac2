use futures::future::join_all;
use tempfile::TempDir;
use url::Url;

use common::kid::Kid;
use service::{Database, RegistryError};

const RACERS: usize = 8;

/// A migrated database in a file, so the pool really runs connections
///  side by side
async fn setup_file_db() -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let url = Url::parse(&format!("sqlite://{}", dir.path().join("db.sqlite").display())).unwrap();
    let db = Database::connect(&url).await.unwrap();
    (db, dir)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_stay_under_cap() {
    let (db, _dir) = setup_file_db().await;

    let results = join_all((0..20).map(|_| {
        let db = db.clone();
        tokio::spawn(async move { db.reserve_kid("alice", 5).await })
    }))
    .await;

    let reservations: Vec<_> = results
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    assert_eq!(reservations.iter().filter(|r| !r.reused).count(), 5);

    let live = db.list_reservations("alice").await.unwrap();
    assert_eq!(live.len(), 5);
    assert!(reservations.iter().all(|r| live.contains(&r.kid)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_uploads_on_one_kid_yield_one_winner() {
    let (db, _dir) = setup_file_db().await;

    for round in 0..10 {
        let kid = db.reserve_kid("alice", 5).await.unwrap().kid;

        let results = join_all((0..RACERS).map(|i| {
            let db = db.clone();
            tokio::spawn(async move {
                db.upload_public_key(&kid, &format!("racer {}", i), "alice", b"key")
                    .await
            })
        }))
        .await;

        let mut ok = 0;
        let mut conflicts = 0;
        for joined in results {
            match joined.unwrap() {
                Ok(uploaded) => {
                    assert_eq!(uploaded, kid);
                    ok += 1;
                }
                Err(RegistryError::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("round {}: unexpected error {}", round, e),
            }
        }
        assert_eq!(ok, 1, "round {}", round);
        assert_eq!(conflicts, RACERS - 1, "round {}", round);
    }

    assert!(db.list_reservations("alice").await.unwrap().is_empty());
    assert_eq!(db.list_public_keys("alice").await.unwrap().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_retried_completions_apply_once() {
    let (db, _dir) = setup_file_db().await;
    let pubkey = db.reserve_kid("alice", 5).await.unwrap().kid;
    db.upload_public_key(&pubkey, "alice laptop", "alice", b"key")
        .await
        .unwrap();
    let kid = db
        .begin_upload("alice", &pubkey, "notes.txt", &[7u8; 12], b"wrapped")
        .await
        .unwrap();

    let results = join_all((0..RACERS).map(|i| {
        let db = db.clone();
        tokio::spawn(async move {
            let ciphertext = vec![i as u8; 16];
            db.complete_upload(&kid, "alice", &ciphertext)
                .await
                .map(|()| ciphertext)
        })
    }))
    .await;

    let mut winners = Vec::new();
    for joined in results {
        match joined.unwrap() {
            Ok(ciphertext) => winners.push(ciphertext),
            Err(RegistryError::NotFound) => {}
            Err(e) => panic!("unexpected error {}", e),
        }
    }
    assert_eq!(winners.len(), 1);

    let stored = db.fetch_blob(&kid, "alice").await.unwrap();
    assert_eq!(stored.ciphertext, winners[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_begin_uploads_mint_distinct_kids() {
    let (db, _dir) = setup_file_db().await;
    let pubkey = db.reserve_kid("alice", 5).await.unwrap().kid;
    db.upload_public_key(&pubkey, "alice laptop", "alice", b"key")
        .await
        .unwrap();

    let results = join_all((0..RACERS).map(|i| {
        let db = db.clone();
        tokio::spawn(async move {
            db.begin_upload("alice", &pubkey, &format!("file-{}.txt", i), &[1u8; 12], b"wrapped")
                .await
        })
    }))
    .await;

    let mut kids: Vec<Kid> = results
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    kids.sort();
    kids.dedup();
    assert_eq!(kids.len(), RACERS);
    assert_eq!(db.abandoned_uploads(i64::MAX).await.unwrap().len(), RACERS);
}

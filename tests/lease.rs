//! Lease-store behavior through the backend contract.
//!
//! The lease is the only cross-process mutex in the system, so its
//! edge cases get their own suite: bounded waits, TTL self-healing, and
//! the scoped helper releasing on every exit path.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tessera::prelude::*;
use tessera_backend::{with_lease, LeaseStore, MemoryLeaseStore};

fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

#[test]
fn with_lease_releases_on_success_and_failure() {
    let store = MemoryLeaseStore::new();
    store.create_record("r").unwrap();

    with_lease(
        &store,
        "r",
        Duration::from_secs(5),
        far_deadline(),
        |token| store.write(token, b"ok"),
    )
    .unwrap();

    let failed: Result<()> = with_lease(
        &store,
        "r",
        Duration::from_secs(5),
        far_deadline(),
        |_token| Err(Error::BackendUnavailable("boom".into())),
    );
    assert!(failed.is_err());

    // Both paths released: the lease is immediately available again.
    let token = store
        .acquire("r", Duration::from_secs(5), Instant::now())
        .unwrap();
    store.release(token).unwrap();
}

#[test]
fn contended_acquire_fails_at_the_deadline_not_the_ttl() {
    let store = MemoryLeaseStore::new();
    let held = store
        .acquire("r", Duration::from_secs(60), far_deadline())
        .unwrap();

    let start = Instant::now();
    let err = store
        .acquire(
            "r",
            Duration::from_secs(60),
            Instant::now() + Duration::from_millis(80),
        )
        .unwrap_err();
    assert!(err.is_lease_unavailable());
    let waited = start.elapsed();
    assert!(
        waited >= Duration::from_millis(60) && waited < Duration::from_secs(10),
        "wait must be bounded by the caller deadline, waited {waited:?}"
    );
    store.release(held).unwrap();
}

#[test]
fn crashed_holder_self_heals_after_ttl() {
    let store = MemoryLeaseStore::new();
    // "Crash": acquire with a short TTL and never release.
    let crashed = store
        .acquire("r", Duration::from_millis(20), far_deadline())
        .unwrap();
    std::mem::forget(crashed);

    let token = store
        .acquire("r", Duration::from_secs(5), far_deadline())
        .unwrap();
    store.write(&token, b"recovered").unwrap();
    store.release(token).unwrap();
}

#[test]
fn descriptor_mutations_serialize_under_contention() {
    // Many threads incrementing flags on one record through the scoped
    // helper must never lose an update.
    let store = Arc::new(MemoryLeaseStore::new());
    store.create_record("r").unwrap();
    let rounds = 32;

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let store = store.clone();
            scope.spawn(move || {
                for _ in 0..rounds {
                    with_lease(
                        store.as_ref(),
                        "r",
                        Duration::from_secs(5),
                        Instant::now() + Duration::from_secs(10),
                        |token| {
                            let (data, _) = store.read("r")?;
                            let count: u64 = data
                                .as_deref()
                                .map(|b| String::from_utf8_lossy(b).parse().unwrap_or(0))
                                .unwrap_or(0);
                            store.write(token, (count + 1).to_string().as_bytes())
                        },
                    )
                    .unwrap();
                }
            });
        }
    });

    let (data, _) = store.read("r").unwrap();
    let count: u64 = String::from_utf8_lossy(&data.unwrap()).parse().unwrap();
    assert_eq!(count, 4 * rounds, "read-modify-write under lease is atomic");
}

#[test]
fn lease_acquire_timeout_surfaces_through_transactions() {
    // A wedged descriptor record turns into LeaseUnavailable at the
    // transaction surface once the acquire timeout passes.
    let leases = Arc::new(MemoryLeaseStore::new());
    let db = Tessera::builder()
        .lease_store(leases.clone())
        .lease_ttl(Duration::from_secs(60))
        .acquire_timeout(Duration::from_millis(50))
        .open();

    let mut txn = db.begin().unwrap();
    txn.write("k", b"v").unwrap();

    // Wedge this transaction's own descriptor record.
    let held = leases
        .acquire(
            &txn.id().to_string(),
            Duration::from_secs(60),
            far_deadline(),
        )
        .unwrap();

    let err = txn.commit().unwrap_err();
    assert!(err.is_lease_unavailable());
    leases.release(held).unwrap();
}

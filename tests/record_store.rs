use ifthenpay_gateway::domain::payment::{FinalizeOutcome, PaymentStatus};
use ifthenpay_gateway::error::GatewayError;
use ifthenpay_gateway::repo::memory::InMemoryPaymentsRepo;
use ifthenpay_gateway::service::record_store::CachedRecordStore;
use std::sync::Arc;
use std::time::Duration;

fn store() -> (Arc<InMemoryPaymentsRepo>, CachedRecordStore) {
    let repo = Arc::new(InMemoryPaymentsRepo::new());
    let store = CachedRecordStore::new(repo.clone());
    (repo, store)
}

#[tokio::test]
async fn paid_record_is_visible_by_token_and_transaction_id() {
    let (_, store) = store();
    store.create_pending("tok-1", 10, "https://pay.test/1").await.unwrap();

    // warm the token cache with the PENDING row
    let pending = store.get_by_token("tok-1").await.unwrap().unwrap();
    assert_eq!(pending.status, PaymentStatus::Pending);

    let outcome = store
        .finalize("tok-1", PaymentStatus::Paid, Some("TX-1"))
        .await
        .unwrap();
    assert!(matches!(outcome, FinalizeOutcome::Applied(_)));

    let by_token = store.get_by_token("tok-1").await.unwrap().unwrap();
    let by_txid = store.get_by_transaction_id("TX-1").await.unwrap().unwrap();
    assert_eq!(by_token.status, PaymentStatus::Paid);
    assert_eq!(by_txid.status, PaymentStatus::Paid);
    assert_eq!(by_txid.token, "tok-1");
    assert!(by_token.updated_at >= pending.updated_at);
}

#[tokio::test]
async fn repeated_reads_are_served_from_cache() {
    let (repo, store) = store();
    store.create_pending("tok-2", 11, "https://pay.test/2").await.unwrap();

    store.get_by_token("tok-2").await.unwrap();
    store.get_by_token("tok-2").await.unwrap();
    store.get_by_token("tok-2").await.unwrap();
    assert_eq!(repo.lookups(), 1);

    store
        .finalize("tok-2", PaymentStatus::Cancelled, None)
        .await
        .unwrap();
    let after = store.get_by_token("tok-2").await.unwrap().unwrap();
    assert_eq!(after.status, PaymentStatus::Cancelled);
    assert_eq!(repo.lookups(), 2);
}

#[tokio::test]
async fn duplicate_token_is_rejected() {
    let (_, store) = store();
    store.create_pending("tok-3", 12, "https://pay.test/3").await.unwrap();

    let err = store
        .create_pending("tok-3", 99, "https://pay.test/other")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::DuplicateToken(ref t) if t == "tok-3"));
    assert_eq!(store.get_by_token("tok-3").await.unwrap().unwrap().intent_id, 12);
}

#[tokio::test]
async fn terminal_status_is_never_overwritten() {
    let (_, store) = store();
    store.create_pending("tok-4", 13, "https://pay.test/4").await.unwrap();
    store
        .finalize("tok-4", PaymentStatus::Failed, Some("TX-4"))
        .await
        .unwrap();

    let second = store
        .finalize("tok-4", PaymentStatus::Paid, Some("TX-4b"))
        .await
        .unwrap();
    match second {
        FinalizeOutcome::AlreadyFinal(record) => {
            assert_eq!(record.status, PaymentStatus::Failed);
            assert_eq!(record.transaction_id.as_deref(), Some("TX-4"));
        }
        other => panic!("expected AlreadyFinal, got {other:?}"),
    }
    assert!(store.get_by_transaction_id("TX-4b").await.unwrap().is_none());
}

#[tokio::test]
async fn finalizing_unknown_token_reports_not_found() {
    let (_, store) = store();
    let outcome = store
        .finalize("missing", PaymentStatus::Paid, Some("TX"))
        .await
        .unwrap();
    assert_eq!(outcome, FinalizeOutcome::NotFound);
}

#[tokio::test]
async fn delete_invalidates_both_keys() {
    let (_, store) = store();
    store.create_pending("tok-5", 14, "https://pay.test/5").await.unwrap();
    store
        .finalize("tok-5", PaymentStatus::Paid, Some("TX-5"))
        .await
        .unwrap();
    store.get_by_token("tok-5").await.unwrap();
    store.get_by_transaction_id("TX-5").await.unwrap();

    let removed = store.delete("tok-5").await.unwrap().unwrap();
    assert_eq!(removed.token, "tok-5");
    assert!(store.get_by_token("tok-5").await.unwrap().is_none());
    assert!(store.get_by_transaction_id("TX-5").await.unwrap().is_none());
}

#[tokio::test]
async fn writers_on_one_token_are_serialized() {
    let (_, store) = store();
    store.create_pending("tok-6", 15, "https://pay.test/6").await.unwrap();

    let held = store.lock("tok-6").await;
    let contender = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .finalize("tok-6", PaymentStatus::Cancelled, None)
                .await
                .unwrap()
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!contender.is_finished());

    let applied = held.finalize(PaymentStatus::Paid, Some("TX-6")).await.unwrap();
    assert!(matches!(applied, FinalizeOutcome::Applied(_)));
    drop(held);

    let late = contender.await.unwrap();
    assert!(matches!(late, FinalizeOutcome::AlreadyFinal(ref r) if r.status == PaymentStatus::Paid));
}

#[tokio::test]
async fn other_tokens_do_not_wait_on_a_held_lock() {
    let (_, store) = store();
    store.create_pending("tok-7", 16, "https://pay.test/7").await.unwrap();
    store.create_pending("tok-8", 17, "https://pay.test/8").await.unwrap();

    let _held = store.lock("tok-7").await;
    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        store.finalize("tok-8", PaymentStatus::Paid, Some("TX-8")),
    )
    .await
    .expect("tok-8 must not block on tok-7")
    .unwrap();
    assert!(matches!(outcome, FinalizeOutcome::Applied(_)));
}

#[tokio::test]
async fn cache_stays_within_capacity_across_many_reads() {
    let repo = Arc::new(InMemoryPaymentsRepo::new());
    let store = CachedRecordStore::with_capacity(repo.clone(), 64);

    for i in 0..5000 {
        let token = format!("tok-bulk-{i}");
        store.create_pending(&token, i, "https://pay.test/bulk").await.unwrap();
        store.get_by_token(&token).await.unwrap();
    }
    assert_eq!(store.cached_len().await, 64);

    // evicted records are still served from the repository
    let early = store.get_by_token("tok-bulk-0").await.unwrap().unwrap();
    assert_eq!(early.intent_id, 0);
    assert_eq!(store.cached_len().await, 64);
}

//! 编号分配 - 并发、范围隔离、冲突跳号

mod common;

use common::*;
use futures::future::join_all;
use numbering_server::numbering::NumberingError;
use shared::models::DocumentType;

#[tokio::test]
async fn test_first_allocation_is_one() {
    let db = open_db().await;
    let scope = scope(1, Some(7), DocumentType::PurchaseReturn);

    assert_eq!(db.state.allocator.peek(&scope).await.unwrap(), 0);

    let doc = db.state.allocator.allocate(draft(scope.clone())).await.unwrap();
    assert_eq!(doc.document_number, "PR-202510-0001");
    assert_eq!(doc.scope_key, "1:7:PR:202510");
    assert_eq!(doc.partner_id, Some(7));
    assert_eq!(db.state.allocator.peek(&scope).await.unwrap(), 1);

    let next = db.state.allocator.allocate(draft(scope)).await.unwrap();
    assert_eq!(next.document_number, "PR-202510-0002");
}

async fn allocate_concurrently(n: usize) {
    let db = open_db().await;
    let scope = scope(1, Some(7), DocumentType::PurchaseReturn);

    let handles = (0..n).map(|_| {
        let allocator = db.state.allocator.clone();
        let draft = draft(scope.clone());
        tokio::spawn(async move { allocator.allocate(draft).await })
    });
    let numbers: Vec<String> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap().document_number)
        .collect();

    assert_eq!(numbers.len(), n);
    assert_distinct(&numbers);

    // No collisions were possible, so no sequence was burned
    let mut expected: Vec<String> = (1..=n).map(|i| format!("PR-202510-{i:04}")).collect();
    expected.sort();
    assert_eq!(live_numbers(db.pool(), &scope).await, expected);
    assert_eq!(db.state.allocator.peek(&scope).await.unwrap(), n as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocation_two() {
    allocate_concurrently(2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocation_ten() {
    allocate_concurrently(10).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocation_hundred() {
    allocate_concurrently(100).await;
}

#[tokio::test]
async fn test_scopes_are_independent() {
    let db = open_db().await;
    let allocator = &db.state.allocator;

    // Same store, same period, two suppliers: each starts at 0001
    let a = allocator
        .allocate(draft(scope(1, Some(7), DocumentType::PurchaseReturn)))
        .await
        .unwrap();
    let b = allocator
        .allocate(draft(scope(1, Some(8), DocumentType::PurchaseReturn)))
        .await
        .unwrap();
    assert_eq!(a.document_number, "PR-202510-0001");
    assert_eq!(b.document_number, "PR-202510-0001");

    // Orders and returns keep separate counters
    let order = allocator
        .allocate(draft(scope(1, Some(7), DocumentType::PurchaseOrder)))
        .await
        .unwrap();
    assert_eq!(order.document_number, "PO-202510-0001");

    // Documents without a partner share one store-wide scope
    let store_wide = allocator
        .allocate(draft(scope(1, None, DocumentType::PurchaseReturn)))
        .await
        .unwrap();
    assert_eq!(store_wide.document_number, "PR-202510-0001");
    assert_eq!(store_wide.scope_key, "1:*:PR:202510");
}

#[tokio::test]
async fn test_collision_burns_sequence() {
    let db = open_db().await;
    let scope = scope(1, Some(7), DocumentType::PurchaseReturn);

    // A holder of 0001 the counter does not know about
    insert_raw(db.pool(), 42, &scope, "PR-202510-0001", 1_000).await;

    let doc = db.state.allocator.allocate(draft(scope.clone())).await.unwrap();
    assert_eq!(doc.document_number, "PR-202510-0002");
    assert_eq!(db.state.allocator.peek(&scope).await.unwrap(), 2);
    assert_eq!(
        live_numbers(db.pool(), &scope).await,
        vec!["PR-202510-0001", "PR-202510-0002"]
    );
}

#[tokio::test]
async fn test_guard_holds_without_indexes() {
    let db = open_db().await;
    drop_guard(db.pool()).await;
    let scope = scope(1, Some(7), DocumentType::PurchaseReturn);
    insert_raw(db.pool(), 42, &scope, "PR-202510-0001", 1_000).await;

    let doc = db.state.allocator.allocate(draft(scope)).await.unwrap();
    assert_eq!(doc.document_number, "PR-202510-0002");
}

#[tokio::test]
async fn test_width_widens_past_padding() {
    let db = open_db().await;
    let scope = scope(1, Some(7), DocumentType::PurchaseOrder);
    set_counter(db.pool(), &scope, 9_999).await;

    let doc = db.state.allocator.allocate(draft(scope)).await.unwrap();
    assert_eq!(doc.document_number, "PO-202510-10000");
}

#[tokio::test]
async fn test_invalid_scope_rejected() {
    let err = numbering_server::numbering::Scope::new(
        0,
        Some(7),
        DocumentType::PurchaseReturn,
        numbering_server::numbering::PeriodKey::parse(PERIOD).unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, NumberingError::InvalidScope(_)));
}

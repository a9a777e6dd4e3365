//! EventTable interface tests.
//!
//! These tests verify the contract of the EventTable trait.
//! Each storage implementation should run these tests.

use std::collections::HashSet;

use chrono::Utc;
use serde_json::{json, Value};

use keyfan::stamp::{IdGenerator, MonotonicIds, TimeSeededIds};
use keyfan::storage::{EventTable, PageRequest, StoredRow};

/// Unique partition key prefix so runs against a shared table never collide.
pub fn unique(name: &str) -> String {
    let tag = TimeSeededIds.next_id(Utc::now());
    format!("{}::{}", name, tag)
}

/// Create a stored row with a minimal event envelope.
pub fn make_row(pk: &str, sk: &str, n: u64) -> StoredRow {
    StoredRow {
        pk: pk.to_string(),
        sk: sk.to_string(),
        event: make_event(sk, n),
    }
}

pub fn make_event(id: &str, n: u64) -> Value {
    json!({
        "id": id,
        "type": "CREATED",
        "timestamp": "2024-01-01T00:00:00.000Z",
        "data": {"todo_id": "t1", "n": n}
    })
}

/// Create `count` ascending sort keys.
pub fn make_sort_keys(count: usize) -> Vec<String> {
    let mut ids = MonotonicIds::new();
    let now = Utc::now();
    (0..count).map(|_| ids.next_id(now)).collect()
}

pub fn request<'a>(pk: &'a str, after: Option<&'a str>, limit: u32) -> PageRequest<'a> {
    PageRequest {
        partition_key: pk,
        after,
        limit,
        start_key: None,
    }
}

/// Follow continuation keys until the store reports none.
pub async fn read_all<S: EventTable>(
    store: &S,
    table: &str,
    pk: &str,
    after: Option<&str>,
    limit: u32,
) -> Vec<StoredRow> {
    let mut rows = Vec::new();
    let mut start_key = None;
    loop {
        let page = store
            .query_page(
                table,
                PageRequest {
                    partition_key: pk,
                    after,
                    limit,
                    start_key: start_key.take(),
                },
            )
            .await
            .expect("query should succeed");
        rows.extend(page.rows);
        match page.continuation {
            Some(next) => start_key = Some(next),
            None => return rows,
        }
    }
}

// =============================================================================
// EventTable::transact_put tests
// =============================================================================

pub async fn test_put_single_row<S: EventTable>(store: &S, table: &str) {
    let pk = unique("single");
    let row = make_row(&pk, "01", 1);

    store
        .transact_put(table, std::slice::from_ref(&row))
        .await
        .expect("put should succeed");

    let rows = read_all(store, table, &pk, None, 25).await;
    assert_eq!(rows, vec![row], "should read back the written row");
}

pub async fn test_put_rows_across_partitions<S: EventTable>(store: &S, table: &str) {
    let keys = [unique("fan_a"), unique("fan_b"), unique("fan_c")];
    let rows: Vec<_> = keys.iter().map(|pk| make_row(pk, "01", 7)).collect();

    store
        .transact_put(table, &rows)
        .await
        .expect("put should succeed");

    for (pk, row) in keys.iter().zip(&rows) {
        let read = read_all(store, table, pk, None, 25).await;
        assert_eq!(read, vec![row.clone()], "each partition holds its own copy");
    }
}

pub async fn test_put_duplicate_keys_writes_nothing<S: EventTable>(store: &S, table: &str) {
    let pk = unique("duplicate");
    let other = unique("duplicate_other");
    let rows = vec![
        make_row(&other, "01", 1),
        make_row(&pk, "01", 1),
        make_row(&pk, "01", 2),
    ];

    let result = store.transact_put(table, &rows).await;

    assert!(result.is_err(), "duplicate keys should be rejected");
    assert!(read_all(store, table, &pk, None, 25).await.is_empty());
    assert!(
        read_all(store, table, &other, None, 25).await.is_empty(),
        "no row of a rejected transaction is visible"
    );
}

pub async fn test_put_empty_is_rejected<S: EventTable>(store: &S, table: &str) {
    assert!(store.transact_put(table, &[]).await.is_err());
}

// =============================================================================
// EventTable::query_page tests
// =============================================================================

pub async fn test_query_is_ascending<S: EventTable>(store: &S, table: &str) {
    let pk = unique("ascending");
    let sort_keys = make_sort_keys(4);
    for n in [2usize, 0, 3, 1] {
        store
            .transact_put(table, &[make_row(&pk, &sort_keys[n], n as u64)])
            .await
            .expect("put should succeed");
    }

    let rows = read_all(store, table, &pk, None, 25).await;

    let read: Vec<_> = rows.iter().map(|r| r.sk.clone()).collect();
    assert_eq!(read, sort_keys, "rows come back ascending by sort key");
}

pub async fn test_query_after_is_exclusive<S: EventTable>(store: &S, table: &str) {
    let pk = unique("after");
    let sort_keys = make_sort_keys(3);
    let rows: Vec<_> = sort_keys
        .iter()
        .enumerate()
        .map(|(n, sk)| make_row(&pk, sk, n as u64))
        .collect();
    for row in &rows {
        store
            .transact_put(table, std::slice::from_ref(row))
            .await
            .expect("put should succeed");
    }

    let read = read_all(store, table, &pk, Some(&sort_keys[0]), 25).await;
    assert_eq!(read, rows[1..].to_vec());

    let read = read_all(store, table, &pk, Some(&sort_keys[2]), 25).await;
    assert!(read.is_empty(), "nothing after the last row");
}

pub async fn test_query_matches_partition_exactly<S: EventTable>(store: &S, table: &str) {
    let pk = unique("exact");
    let longer = format!("{}::CREATED", pk);
    store
        .transact_put(table, &[make_row(&pk, "01", 1), make_row(&longer, "02", 2)])
        .await
        .expect("put should succeed");

    let rows = read_all(store, table, &pk, None, 25).await;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pk, pk);
}

pub async fn test_query_pages_through_partition<S: EventTable>(store: &S, table: &str) {
    let pk = unique("paging");
    let sort_keys = make_sort_keys(7);
    for (n, sk) in sort_keys.iter().enumerate() {
        store
            .transact_put(table, &[make_row(&pk, sk, n as u64)])
            .await
            .expect("put should succeed");
    }

    let first = store
        .query_page(table, request(&pk, None, 3))
        .await
        .expect("query should succeed");
    assert_eq!(first.rows.len(), 3);
    assert!(first.continuation.is_some(), "a full page has a continuation");

    let rows = read_all(store, table, &pk, None, 3).await;
    let read: Vec<_> = rows.iter().map(|r| r.sk.clone()).collect();
    let unique_keys: HashSet<_> = read.iter().collect();
    assert_eq!(read, sort_keys, "no row dropped across pages");
    assert_eq!(unique_keys.len(), 7, "no row duplicated across pages");
}

pub async fn test_query_missing_partition<S: EventTable>(store: &S, table: &str) {
    let pk = unique("missing");
    let page = store
        .query_page(table, request(&pk, None, 25))
        .await
        .expect("query should succeed");
    assert!(page.rows.is_empty());
    assert!(page.continuation.is_none());
}

pub async fn test_query_preserves_event_document<S: EventTable>(store: &S, table: &str) {
    let pk = unique("document");
    let event = json!({
        "id": "01",
        "type": "ASSIGNED",
        "timestamp": "2024-01-01T00:00:00.000Z",
        "data": {
            "todo_id": "t1",
            "user_id": 42,
            "done": false,
            "tags": ["a", "b"],
            "note": null,
            "meta": {"priority": 1.5}
        }
    });
    let row = StoredRow {
        pk: pk.clone(),
        sk: "01".to_string(),
        event,
    };

    store
        .transact_put(table, std::slice::from_ref(&row))
        .await
        .expect("put should succeed");

    let rows = read_all(store, table, &pk, None, 25).await;
    assert_eq!(rows, vec![row]);
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all EventTable interface tests against a store implementation.
#[macro_export]
macro_rules! run_event_table_tests {
    ($store:expr, $table:expr) => {
        use $crate::storage::event_table_tests::*;

        // transact_put tests
        test_put_single_row($store, $table).await;
        println!("  test_put_single_row: PASSED");

        test_put_rows_across_partitions($store, $table).await;
        println!("  test_put_rows_across_partitions: PASSED");

        test_put_duplicate_keys_writes_nothing($store, $table).await;
        println!("  test_put_duplicate_keys_writes_nothing: PASSED");

        test_put_empty_is_rejected($store, $table).await;
        println!("  test_put_empty_is_rejected: PASSED");

        // query_page tests
        test_query_is_ascending($store, $table).await;
        println!("  test_query_is_ascending: PASSED");

        test_query_after_is_exclusive($store, $table).await;
        println!("  test_query_after_is_exclusive: PASSED");

        test_query_matches_partition_exactly($store, $table).await;
        println!("  test_query_matches_partition_exactly: PASSED");

        test_query_pages_through_partition($store, $table).await;
        println!("  test_query_pages_through_partition: PASSED");

        test_query_missing_partition($store, $table).await;
        println!("  test_query_missing_partition: PASSED");

        test_query_preserves_event_document($store, $table).await;
        println!("  test_query_preserves_event_document: PASSED");
    };
}

//! Tests for M3: All-or-nothing batch execution
//!
//! Run with:
//! cargo test m3_batch_execution -- --nocapture

use serde_json::json;
use snapvault::{batch_op, BatchOperation, BoxError, StoreError, TransactionManager, VersionedStore};
use std::cell::Cell;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Barrier};
use std::thread;

fn setup() -> (Arc<VersionedStore>, TransactionManager) {
    let store = Arc::new(VersionedStore::new());
    store.create_collection("items");
    let mgr = TransactionManager::new(Arc::clone(&store));
    (store, mgr)
}

fn insert_item(sku: &'static str) -> BatchOperation<'static> {
    batch_op(move |s| {
        s.insert("items", json!({"sku": sku}), "clerk")?;
        Ok(())
    })
}

fn fail_with(msg: &'static str) -> BatchOperation<'static> {
    batch_op(move |_| Err(BoxError::from(msg)))
}

#[test]
fn test_failed_batch_leaves_no_trace() {
    let (store, mgr) = setup();
    let before = store.fingerprint();

    let ops = vec![insert_item("A"), fail_with("stock check failed"), insert_item("B")];
    let err = mgr.execute_batch(ops, "B1").unwrap_err();
    println!("[M3] batch error: {}", err);

    match &err {
        StoreError::BatchOperationFailed { batch, step, .. } => {
            assert_eq!(batch, "B1");
            assert_eq!(*step, 1);
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(err.source().unwrap().to_string(), "stock check failed");

    assert!(store.select_all("items").is_empty());
    assert_eq!(store.fingerprint(), before, "state equals the pre-batch state");
    assert!(!mgr.is_in_transaction());
    assert!(store.is_auto_commit());
    assert_eq!(mgr.history_len(), 0);
}

#[test]
fn test_later_operations_never_run() {
    let (store, mgr) = setup();
    let ran = Cell::new(0);

    let ops: Vec<BatchOperation> = vec![
        batch_op(|_| {
            ran.set(ran.get() + 1);
            Ok(())
        }),
        fail_with("boom"),
        batch_op(|_| {
            ran.set(ran.get() + 1);
            Ok(())
        }),
    ];
    assert!(mgr.execute_batch(ops, "B2").is_err());
    assert_eq!(ran.get(), 1);
    assert_eq!(store.count("items"), 0);
}

#[test]
fn test_store_error_aborts_batch() {
    let (store, mgr) = setup();
    store.insert("items", json!({"sku": "seed"}), "clerk").unwrap();
    let before = store.fingerprint();

    let ops = vec![
        insert_item("A"),
        batch_op(|s| {
            s.update("items", "items_99", json!({"qty": 1}), "clerk")?;
            Ok(())
        }),
    ];
    let err = mgr.execute_batch(ops, "B3").unwrap_err();
    let cause = err.source().unwrap().downcast_ref::<StoreError>().unwrap();
    assert!(matches!(cause, StoreError::RecordNotFound { .. }));

    assert_eq!(store.count("items"), 1);
    assert_eq!(store.select_all("items")[0].get("sku"), Some(&json!("seed")));
    assert_eq!(store.fingerprint(), before);
}

#[test]
fn test_successful_batch_commits() {
    let (store, mgr) = setup();

    let ops = vec![
        insert_item("A"),
        insert_item("B"),
        batch_op(|s| {
            s.update("items", "items_1", json!({"qty": 5}), "clerk")?;
            Ok(())
        }),
    ];
    mgr.execute_batch(ops, "B4").unwrap();

    assert_eq!(store.count("items"), 2);
    assert_eq!(store.select("items", "items_1").unwrap().get("qty"), Some(&json!(5)));
    assert_eq!(mgr.history_len(), 1);
    assert_eq!(mgr.history()[0].name, "B4");
}

#[test]
fn test_empty_batch_commits() {
    let (_store, mgr) = setup();
    mgr.execute_batch(Vec::new(), "noop").unwrap();
    assert_eq!(mgr.history_len(), 1);
}

#[test]
fn test_batch_rejected_while_active() {
    let (store, mgr) = setup();
    mgr.begin("outer").unwrap();

    let err = mgr.execute_batch(vec![insert_item("A")], "inner").unwrap_err();
    assert!(err.is_state_violation());
    assert_eq!(store.count("items"), 0, "operations must not run");
    assert_eq!(mgr.current_transaction().as_deref(), Some("outer"));
}

#[test]
fn test_other_callers_cannot_end_a_running_batch() {
    let (store, mgr) = setup();
    let mgr = Arc::new(mgr);
    let barrier = Arc::new(Barrier::new(2));

    let other = {
        let m = Arc::clone(&mgr);
        let b = Arc::clone(&barrier);
        thread::spawn(move || {
            b.wait();
            let commit = m.commit();
            let rollback = m.rollback();
            let begin = m.begin("T2");
            let savepoint = m.create_savepoint("sp");
            b.wait();
            (commit, rollback, begin, savepoint)
        })
    };

    let b = Arc::clone(&barrier);
    let ops = vec![
        batch_op(move |s| {
            s.insert("items", json!({"sku": "A"}), "clerk")?;
            b.wait();
            b.wait();
            Ok(())
        }),
        fail_with("boom"),
    ];
    let err = mgr.execute_batch(ops, "B1").unwrap_err();

    let (commit, rollback, begin, savepoint) = other.join().unwrap();
    assert!(commit.unwrap_err().is_state_violation());
    assert!(rollback.unwrap_err().is_state_violation());
    assert!(begin.unwrap_err().is_state_violation());
    assert!(savepoint.unwrap_err().is_state_violation());

    assert!(matches!(err, StoreError::BatchOperationFailed { step: 1, .. }));
    assert_eq!(store.count("items"), 0);
    assert!(!mgr.is_in_transaction());
    assert_eq!(mgr.history_len(), 0);
}

#[test]
fn test_panicking_operation_rolls_back() {
    let (store, mgr) = setup();
    let before = store.fingerprint();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let ops = vec![
            insert_item("A"),
            batch_op(|_| panic!("operation blew up")),
        ];
        mgr.execute_batch(ops, "B5")
    }));
    assert!(outcome.is_err());

    assert!(!mgr.is_in_transaction());
    assert!(store.is_auto_commit());
    assert_eq!(store.count("items"), 0);
    assert_eq!(store.fingerprint(), before);

    // the manager is usable again
    mgr.execute_batch(vec![insert_item("B")], "B6").unwrap();
    assert_eq!(store.count("items"), 1);
}

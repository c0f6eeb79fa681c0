//! Integration tests for heap files and their scans.

use heapstore::{
    Config, Database, Error, Field, PageId, Permissions, Result, Tuple, TupleDesc, Type,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn people() -> Arc<TupleDesc> {
    Arc::new(
        TupleDesc::new(
            vec![Type::Int, Type::String],
            vec![Some("id".to_string()), Some("name".to_string())],
        )
        .unwrap(),
    )
}

fn person(id: i32, name: &str) -> Tuple {
    Tuple::new(people(), vec![Field::Int(id), Field::string(name)]).unwrap()
}

fn config() -> Config {
    Config::default()
        .with_page_size(512)
        .with_lock_timeout(Duration::from_millis(200))
}

/// 512-byte pages hold three (Int, String) tuples.
#[test]
fn test_scan_yields_every_tuple_once_and_rewinds() {
    let dir = tempdir().unwrap();
    let db = Database::new(config());
    let file = db.open_table(dir.path().join("people.dat"), people(), "people").unwrap();

    let txn = db.begin();
    for i in 0..10 {
        db.buffer_pool()
            .insert_tuple(txn.id(), file.id(), &mut person(i, &format!("p{i}")))
            .unwrap();
    }
    txn.commit().unwrap();
    assert_eq!(file.num_pages().unwrap(), 4);

    let txn = db.begin();
    let mut scan = file.iter(db.buffer_pool(), txn.id());
    let first: Vec<Tuple> = scan.by_ref().collect::<Result<_>>().unwrap();
    assert_eq!(first.len(), 10);
    let ids: Vec<_> = first.iter().map(|t| t.field(0).cloned()).collect();
    let expected: Vec<_> = (0..10).map(|i| Some(Field::Int(i))).collect();
    assert_eq!(ids, expected);

    assert!(scan.next().is_none());
    scan.rewind();
    let second: Vec<Tuple> = scan.collect::<Result<_>>().unwrap();
    assert_eq!(first, second);
    txn.commit().unwrap();
}

#[test]
fn test_scan_of_empty_table() {
    let dir = tempdir().unwrap();
    let db = Database::new(config());
    let file = db.open_table(dir.path().join("people.dat"), people(), "people").unwrap();

    let txn = db.begin();
    assert_eq!(file.iter(db.buffer_pool(), txn.id()).count(), 0);
    txn.commit().unwrap();
}

/// A scan blocked by a writer reports the abort once and then ends.
#[test]
fn test_scan_stops_after_lock_timeout() {
    let dir = tempdir().unwrap();
    let db = Database::new(config());
    let file = db.open_table(dir.path().join("people.dat"), people(), "people").unwrap();
    let pid = file.append_empty_page().unwrap();

    let writer = db.begin();
    db.buffer_pool()
        .get_page(writer.id(), pid, Permissions::ReadWrite)
        .unwrap();

    let reader = db.begin();
    let mut scan = file.iter(db.buffer_pool(), reader.id());
    assert!(matches!(
        scan.next(),
        Some(Err(Error::TransactionAborted { .. }))
    ));
    assert!(scan.next().is_none());
    drop(scan);
    reader.abort().unwrap();
    writer.commit().unwrap();
}

/// Committed rows survive a fresh database over the same file.
#[test]
fn test_rows_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.dat");

    {
        let db = Database::new(config());
        let file = db.open_table(&path, people(), "people").unwrap();
        let txn = db.begin();
        db.buffer_pool()
            .insert_tuple(txn.id(), file.id(), &mut person(1, "ada"))
            .unwrap();
        db.buffer_pool()
            .insert_tuple(txn.id(), file.id(), &mut person(2, "grace"))
            .unwrap();
        txn.commit().unwrap();
    }

    let db = Database::new(config());
    let file = db.open_table(&path, people(), "people").unwrap();
    let txn = db.begin();
    let rows: Vec<Tuple> = file
        .iter(db.buffer_pool(), txn.id())
        .collect::<Result<_>>()
        .unwrap();
    txn.commit().unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].field(1), Some(&Field::string("grace")));
    assert_eq!(
        rows[1].record_id().map(|rid| rid.page_id()),
        Some(PageId::new(file.id(), 0))
    );
}

#[test]
fn test_insert_wrong_schema_rejected() {
    let dir = tempdir().unwrap();
    let db = Database::new(config());
    let file = db.open_table(dir.path().join("people.dat"), people(), "people").unwrap();

    let ints = Arc::new(TupleDesc::from_types(vec![Type::Int, Type::Int]).unwrap());
    let mut wrong = Tuple::new(ints, vec![Field::Int(1), Field::Int(2)]).unwrap();

    let txn = db.begin();
    let result = db.buffer_pool().insert_tuple(txn.id(), file.id(), &mut wrong);
    assert!(matches!(result, Err(Error::SchemaMismatch(_))));
    assert_eq!(wrong.record_id(), None);
    txn.abort().unwrap();
}

#[test]
fn test_delete_twice_is_invalid() {
    let dir = tempdir().unwrap();
    let db = Database::new(config());
    let file = db.open_table(dir.path().join("people.dat"), people(), "people").unwrap();

    let txn = db.begin();
    let mut row = person(1, "ada");
    db.buffer_pool().insert_tuple(txn.id(), file.id(), &mut row).unwrap();
    db.buffer_pool().delete_tuple(txn.id(), &row).unwrap();
    let again = db.buffer_pool().delete_tuple(txn.id(), &row);
    assert!(matches!(again, Err(Error::InvalidRecord { .. })));
    txn.commit().unwrap();
}

/// Two shared holders of a page with room block each other's upgrade; the
/// inserter times out and, once the other side finishes, a retry succeeds.
#[test]
fn test_insert_upgrade_blocked_by_other_reader() {
    let dir = tempdir().unwrap();
    let db = Database::new(config());
    let file = db.open_table(dir.path().join("people.dat"), people(), "people").unwrap();
    let pid = file.append_empty_page().unwrap();
    let pool = db.buffer_pool();

    let reader = db.begin();
    pool.get_page(reader.id(), pid, Permissions::ReadOnly).unwrap();

    let writer = db.begin();
    let result = pool.insert_tuple(writer.id(), file.id(), &mut person(1, "ada"));
    assert!(matches!(result, Err(Error::TransactionAborted { pid: p, .. }) if p == pid));
    assert_eq!(file.num_pages().unwrap(), 1);
    writer.abort().unwrap();
    reader.commit().unwrap();

    let retry = db.begin();
    pool.insert_tuple(retry.id(), file.id(), &mut person(1, "ada")).unwrap();
    retry.commit().unwrap();
    assert_eq!(file.num_pages().unwrap(), 1);
}

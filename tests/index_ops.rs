//! Mutation-path integration tests: put/get/del over composite keys,
//! chain pruning, and the invariants that traversal relies on.

use nestdb::{del, get, put, Cursor, Error, KeyPath, KvTx, MemStore, MemTx};

type Row = (&'static [u8], &'static [&'static [u8]], &'static [u8]);

fn seed(rows: &[Row]) -> (MemStore, MemTx) {
    let store = MemStore::new();
    let mut tx = store.begin_write();
    for &(bucket, keys, data) in rows {
        put(&mut tx, bucket, keys, data).unwrap();
    }
    (store, tx)
}

fn expect_not_found(result: eyre::Result<Vec<u8>>) {
    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::KeyNotFound)
    ));
}

fn drain<T: KvTx>(cur: &mut Cursor<T>) -> Vec<(KeyPath, Vec<u8>)> {
    let mut out = Vec::new();
    let mut hit = cur.first();
    while let Some(found) = hit {
        out.push(found);
        hit = cur.next();
    }
    assert!(cur.err().is_none(), "traversal latched a fault");
    out
}

#[test]
fn mixed_depth_round_trip() {
    const DATA: &[Row] = &[
        (b"test_bucket1", &[b"key1"], b"lorem"),
        (b"test_bucket2", &[b"key1", b"key2"], b"datadatadatadatadata"),
        (b"test_bucket2", &[b"key1", b"key3"], b"3"),
        (b"test_bucket3", &[b"key1", b"key2", b"key3"], b"catoto"),
    ];
    let (_store, mut tx) = seed(DATA);

    for &(bucket, keys, data) in DATA {
        assert_eq!(get(&tx, bucket, keys).unwrap(), data);
    }

    // deleting the flat entry leaves the deeper buckets untouched
    del(&mut tx, DATA[0].0, DATA[0].1).unwrap();
    expect_not_found(get(&tx, DATA[0].0, DATA[0].1));
    for &(bucket, keys, data) in &DATA[1..] {
        assert_eq!(get(&tx, bucket, keys).unwrap(), data);
    }
    assert!(tx.bucket_exists(b"test_bucket1"));
    assert_eq!(tx.key_count(b"test_bucket1").unwrap(), 0);

    // and the rest can go too
    for &(bucket, keys, _) in &DATA[1..] {
        del(&mut tx, bucket, keys).unwrap();
    }
    for &(bucket, keys, _) in &DATA[1..] {
        expect_not_found(get(&tx, bucket, keys));
    }
}

#[test]
fn delete_everything_leaves_only_named_buckets() {
    const DATA: &[Row] = &[
        (b"test_del", &[b"key-a1", b"key-b1", b"key-c1"], b"epson"),
        (b"test_del", &[b"key-a2", b"key-b2", b"key-c2"], b"catoto"),
        (b"test_del", &[b"key-a3", b"key-b3", b"key-c3"], b"catoto"),
    ];
    let (_store, mut tx) = seed(DATA);
    // three disjoint 3-level chains: outer + 3 * 2 sub-buckets
    assert_eq!(tx.bucket_names().len(), 7);

    for &(bucket, keys, _) in DATA {
        del(&mut tx, bucket, keys).unwrap();
    }

    assert_eq!(tx.bucket_names(), vec![b"test_del".to_vec()]);
    assert_eq!(tx.key_count(b"test_del").unwrap(), 0);
}

#[test]
fn no_orphans_after_partial_delete() {
    const DATA: &[Row] = &[
        (b"idx", &[b"a", b"b", b"c1"], b"1"),
        (b"idx", &[b"a", b"b", b"c2"], b"2"),
        (b"idx", &[b"x", b"y", b"z"], b"3"),
    ];
    let (_store, mut tx) = seed(DATA);
    assert_eq!(tx.bucket_names().len(), 5);

    // sibling keeps the shared chain alive
    del(&mut tx, b"idx", DATA[0].1).unwrap();
    assert_eq!(tx.bucket_names().len(), 5);

    // last entry under the prefix takes the chain with it
    del(&mut tx, b"idx", DATA[1].1).unwrap();
    assert_eq!(tx.bucket_names().len(), 3);

    del(&mut tx, b"idx", DATA[2].1).unwrap();
    assert_eq!(tx.bucket_names(), vec![b"idx".to_vec()]);
}

#[test]
fn insertion_order_does_not_matter() {
    // deliberately scrambled insert order
    const SCRAMBLED: &[Row] = &[
        (b"idx", &[b"m", b"2", b"x"], b"m2x"),
        (b"idx", &[b"a", b"9", b"q"], b"a9q"),
        (b"idx", &[b"m", b"1", b"z"], b"m1z"),
        (b"idx", &[b"a", b"1", b"a"], b"a1a"),
        (b"idx", &[b"z", b"0", b"0"], b"z00"),
        (b"idx", &[b"a", b"1", b"b"], b"a1b"),
        (b"idx", &[b"m", b"1", b"a"], b"m1a"),
    ];
    let (_store, tx) = seed(SCRAMBLED);

    let mut cur = Cursor::new(tx, b"idx".as_slice(), 3, false);
    cur.init(&[]).unwrap();
    let payloads: Vec<Vec<u8>> = drain(&mut cur).into_iter().map(|(_, v)| v).collect();
    assert_eq!(
        payloads,
        vec![
            b"a1a".to_vec(),
            b"a1b".to_vec(),
            b"a9q".to_vec(),
            b"m1a".to_vec(),
            b"m1z".to_vec(),
            b"m2x".to_vec(),
            b"z00".to_vec(),
        ]
    );
}

#[test]
fn del_then_put_restores_traversal() {
    const DATA: &[Row] = &[
        (b"idx", &[b"a", b"b", b"c"], b"old"),
        (b"idx", &[b"a", b"b", b"d"], b"other"),
    ];
    let (_store, mut tx) = seed(DATA);

    del(&mut tx, b"idx", DATA[0].1).unwrap();
    put(&mut tx, b"idx", DATA[0].1, b"new").unwrap();
    assert_eq!(get(&tx, b"idx", DATA[0].1).unwrap(), b"new");

    let mut cur = Cursor::new(tx, b"idx".as_slice(), 3, false);
    cur.init(&[]).unwrap();
    let hits = drain(&mut cur);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].1, b"new");
    assert_eq!(hits[1].1, b"other");
}

#[test]
fn deep_chain_rebuilt_after_full_prune() {
    const KEYS: &[&[u8]] = &[b"a", b"b", b"c", b"d", b"e"];
    let store = MemStore::new();
    let mut tx = store.begin_write();

    put(&mut tx, b"idx", KEYS, b"v1").unwrap();
    assert_eq!(tx.bucket_names().len(), 5);

    del(&mut tx, b"idx", KEYS).unwrap();
    assert_eq!(tx.bucket_names(), vec![b"idx".to_vec()]);

    put(&mut tx, b"idx", KEYS, b"v2").unwrap();
    assert_eq!(get(&tx, b"idx", KEYS).unwrap(), b"v2");
    assert_eq!(tx.bucket_names().len(), 5);
}

#[test]
fn committed_index_visible_to_readers() {
    const DATA: &[Row] = &[
        (b"idx", &[b"a", b"b"], b"1"),
        (b"idx", &[b"c", b"d"], b"2"),
    ];
    let (store, mut tx) = seed(DATA);
    tx.commit().unwrap();

    let read = store.begin_read();
    assert_eq!(get(&read, b"idx", DATA[0].1).unwrap(), b"1");

    let mut cur = Cursor::new(read, b"idx".as_slice(), 2, false);
    cur.init(&[]).unwrap();
    assert_eq!(drain(&mut cur).len(), 2);
    cur.commit().unwrap();
}

#[test]
fn uncommitted_index_stays_private() {
    const DATA: &[Row] = &[(b"idx", &[b"a", b"b"], b"1")];
    let (store, mut tx) = seed(DATA);
    tx.rollback().unwrap();

    let read = store.begin_read();
    assert!(!read.bucket_exists(b"idx"));
}

#[test]
fn mutation_through_cursor_transaction() {
    let store = MemStore::new();
    let mut tx = store.begin_write();
    put(&mut tx, b"idx", &[b"a".as_slice(), b"a"], b"1").unwrap();

    let mut cur = Cursor::new(tx, b"idx".as_slice(), 2, false);
    cur.init(&[]).unwrap();

    put(cur.tx_mut(), b"idx", &[b"b".as_slice(), b"b"], b"2").unwrap();

    let hits = drain(&mut cur);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[1].1, b"2");
    cur.commit().unwrap();
}

#[test]
fn borrowed_transactions_host_cursors_too() {
    let store = MemStore::new();
    let mut tx = store.begin_write();
    put(&mut tx, b"idx", &[b"a".as_slice(), b"a"], b"1").unwrap();

    {
        let mut cur = Cursor::new(&mut tx, b"idx".as_slice(), 2, false);
        cur.init(&[]).unwrap();
        assert_eq!(drain(&mut cur).len(), 1);
        // cursor dropped without finalizing; the borrowed tx lives on
    }

    put(&mut tx, b"idx", &[b"b".as_slice(), b"b"], b"2").unwrap();
    assert_eq!(get(&tx, b"idx", &[b"b".as_slice(), b"b"]).unwrap(), b"2");
    tx.commit().unwrap();
}

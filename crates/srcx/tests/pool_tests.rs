use srcx::strpool::{fnv64, StrPool};

#[test]
fn insert_then_read_round_trips() {
    let mut pool = StrPool::new("test");
    let offset = pool.insert(b"hello");
    assert_eq!(pool.read(offset), b"hello");

    let other = pool.insert(b"world");
    assert_ne!(offset, other);
    assert_eq!(pool.read(other), b"world");
    assert_eq!(pool.read(offset), b"hello");
}

#[test]
fn duplicate_insert_returns_same_offset() {
    let mut pool = StrPool::new("test");
    let first = pool.insert(b"symbol_name");
    let len_after_first = pool.len();
    let second = pool.insert(b"symbol_name");
    assert_eq!(first, second);
    // The tentative allocation was rolled back off the tail.
    assert_eq!(pool.len(), len_after_first);
}

#[test]
fn storage_matches_length_prefixed_layout() {
    let mut pool = StrPool::new("test");
    let offset = pool.insert(b"abc");
    let storage = pool.storage();
    let at = offset as usize;
    let len = u32::from_le_bytes(storage[at..at + 4].try_into().unwrap()) as usize;
    assert_eq!(len, 3);
    assert_eq!(&storage[at + 4..at + 4 + len], b"abc");
}

#[test]
fn rollback_only_truncates_the_tail() {
    let mut pool = StrPool::new("test");
    let first = pool.insert(b"aaaa");
    let second = pool.insert(b"bbbb");
    // Not the tail: refused.
    assert!(!pool.rollback_if_last(first, 4 + 4));
    // The tail: accepted.
    assert!(pool.rollback_if_last(second, 4 + 4));
    assert_eq!(pool.len(), first as usize + 8);
}

#[test]
fn empty_string_interns() {
    let mut pool = StrPool::new("test");
    let offset = pool.insert(b"");
    assert_eq!(pool.read(offset), b"");
    assert_eq!(pool.insert(b""), offset);
}

#[test]
fn clear_resets_offsets() {
    let mut pool = StrPool::new("test");
    pool.insert(b"one");
    pool.insert(b"two");
    pool.clear();
    assert!(pool.is_empty());
    let offset = pool.insert(b"three");
    assert_eq!(offset, 0);
}

#[test]
fn fnv_is_stable_and_spreads() {
    let a = fnv64(b"f");
    let b = fnv64(b"g");
    assert_ne!(a, b);
    assert_eq!(a, fnv64(b"f"));
    assert_ne!(fnv64(b""), 0);
}

use super::*;
use incident_core::test_support::session_created_event;
use incident_core::session::SessionId;
use tempfile::tempdir;

#[test]
fn append_assigns_monotonic_seq() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tenant.wal");
    let mut wal = Wal::open(&path, 0).unwrap();

    let session_id = SessionId::new();
    let e1 = session_created_event(session_id, 1);
    let e2 = session_created_event(session_id, 2);
    assert_eq!(wal.append(&e1).unwrap(), 1);
    assert_eq!(wal.append(&e2).unwrap(), 2);
    assert_eq!(wal.write_seq(), 2);
}

#[test]
fn reopen_rescans_write_seq_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tenant.wal");
    let session_id = SessionId::new();
    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&session_created_event(session_id, 1)).unwrap();
        wal.append(&session_created_event(session_id, 2)).unwrap();
        wal.flush().unwrap();
    }
    let reopened = Wal::open(&path, 0).unwrap();
    assert_eq!(reopened.write_seq(), 2);
}

#[test]
fn next_unprocessed_advances_read_cursor() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tenant.wal");
    let session_id = SessionId::new();
    let mut wal = Wal::open(&path, 0).unwrap();
    wal.append(&session_created_event(session_id, 1)).unwrap();
    wal.append(&session_created_event(session_id, 2)).unwrap();
    wal.flush().unwrap();

    let first = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(first.seq, 1);
    let second = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(second.seq, 2);
    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn mark_processed_is_monotonic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tenant.wal");
    let mut wal = Wal::open(&path, 0).unwrap();
    wal.mark_processed(5);
    wal.mark_processed(3);
    assert_eq!(wal.processed_seq(), 5);
}

#[test]
fn replay_all_visits_entries_in_seq_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tenant.wal");
    let session_id = SessionId::new();
    {
        let mut wal = Wal::open(&path, 0).unwrap();
        for i in 1..=5u64 {
            wal.append(&session_created_event(session_id, i)).unwrap();
        }
        wal.flush().unwrap();
    }

    let mut seqs = Vec::new();
    let max_seq = Wal::replay_all(&path, |entry| seqs.push(entry.seq)).unwrap();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    assert_eq!(max_seq, 5);
}

#[test]
fn replay_all_on_missing_file_returns_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("does-not-exist.wal");
    let mut visited = 0;
    let max_seq = Wal::replay_all(&path, |_| visited += 1).unwrap();
    assert_eq!(visited, 0);
    assert_eq!(max_seq, 0);
}

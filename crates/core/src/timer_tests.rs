use super::*;

#[test]
fn approval_sla_roundtrips_through_string() {
    let session_id = SessionId::new();
    let id = TimerId::approval_sla(session_id, 2);
    assert_eq!(id.kind(), Some(TimerKind::ApprovalSla { session_id, step_index: 2 }));
}

#[test]
fn step_timeout_roundtrips_with_attempt() {
    let session_id = SessionId::new();
    let id = TimerId::step_timeout(session_id, 1, 3);
    assert_eq!(id.kind(), Some(TimerKind::StepTimeout { session_id, step_index: 1, attempt: 3 }));
}

#[test]
fn worker_heartbeat_roundtrips() {
    let worker_id = WorkerId::new();
    let id = TimerId::worker_heartbeat(worker_id);
    assert_eq!(id.kind(), Some(TimerKind::WorkerHeartbeat { worker_id }));
}

#[test]
fn unrecognized_prefix_parses_to_none() {
    assert_eq!(TimerKind::parse("bogus:abc"), None);
}

use super::*;

#[test]
fn created_session_is_active() {
    let session = ExecutionSession::builder().build();
    assert!(session.is_active());
    assert_eq!(session.status, SessionStatus::Created);
}

#[test]
fn terminal_statuses_are_not_active() {
    for status in [SessionStatus::Completed, SessionStatus::Failed, SessionStatus::Cancelled] {
        let session = ExecutionSession::builder().status(status).build();
        assert!(!session.is_active(), "{status} should be terminal");
    }
}

#[test]
fn running_and_rolling_back_are_not_terminal() {
    assert!(!SessionStatus::Running.is_terminal());
    assert!(!SessionStatus::RollingBack.is_terminal());
    assert!(!SessionStatus::AwaitingApproval.is_terminal());
}

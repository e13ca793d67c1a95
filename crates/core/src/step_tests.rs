use super::*;

#[test]
fn pending_constructor_has_zero_attempts() {
    let step = ExecutionStep::pending(SessionId::new(), 0, "check-disk");
    assert_eq!(step.attempt, 0);
    assert_eq!(step.status, StepStatus::Pending);
    assert!(step.result.is_none());
}

#[test]
fn terminal_statuses_cover_all_end_states() {
    for status in [
        StepStatus::Completed,
        StepStatus::Failed,
        StepStatus::RolledBack,
        StepStatus::Skipped,
    ] {
        assert!(status.is_terminal());
    }
    for status in [StepStatus::Pending, StepStatus::Dispatched, StepStatus::Running] {
        assert!(!status.is_terminal());
    }
}

use super::*;

#[test]
fn max_blast_radius_ignores_manual_steps() {
    let mut command = CommandStep::test_default("cleanup", "rm -rf {target}");
    command.blast_radius = BlastRadius::High;
    let runbook = RunbookSpec::builder()
        .steps(vec![
            StepDefinition::Command(command),
            StepDefinition::Manual(ManualStep {
                name: "confirm".into(),
                instructions: "check dashboard".into(),
                timeout_seconds: 600,
            }),
        ])
        .build();
    assert_eq!(runbook.max_blast_radius(), BlastRadius::High);
}

#[test]
fn empty_runbook_defaults_to_low_blast_radius() {
    let runbook = RunbookSpec::builder().build();
    assert_eq!(runbook.max_blast_radius(), BlastRadius::Low);
}

#[test]
fn retry_policy_backoff_grows_geometrically() {
    let policy = RetryPolicy { max_attempts: 3, backoff_initial_ms: 100, backoff_multiplier: 2 };
    assert_eq!(policy.delay_for_attempt(1), std::time::Duration::ZERO);
    assert_eq!(policy.delay_for_attempt(2), std::time::Duration::from_millis(200));
    assert_eq!(policy.delay_for_attempt(3), std::time::Duration::from_millis(400));
}

#[test]
fn blast_radius_orders_destructive_highest() {
    assert!(BlastRadius::Destructive > BlastRadius::High);
    assert!(BlastRadius::High > BlastRadius::Medium);
}

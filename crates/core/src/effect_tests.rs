use super::*;
use crate::event::EventKind;
use crate::runbook_spec::BlastRadius;

#[test]
fn emit_event_wraps_execution_event() {
    let event = ExecutionEvent::test_new(SessionId::new(), 1, EventKind::SessionCompleted);
    let effect = Effect::EmitEvent(Box::new(event.clone()));
    match effect {
        Effect::EmitEvent(boxed) => assert_eq!(*boxed, event),
        _ => panic!("expected EmitEvent"),
    }
}

#[test]
fn dispatch_command_carries_connector_and_timeout() {
    let effect = Effect::DispatchCommand {
        session_id: SessionId::new(),
        step_index: 0,
        worker: WorkerId::new(),
        command: "systemctl restart nginx".to_string(),
        connector: "ssh".to_string(),
        timeout_seconds: 60,
        blast_radius: BlastRadius::Low,
        step_marked_destructive: false,
        requires_shell: false,
        approved_by_admin: false,
    };
    match effect {
        Effect::DispatchCommand { connector, timeout_seconds, .. } => {
            assert_eq!(connector, "ssh");
            assert_eq!(timeout_seconds, 60);
        }
        _ => panic!("expected DispatchCommand"),
    }
}

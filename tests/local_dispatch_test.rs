//! End-to-end runs on the in-process worker pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use provflow::catalog::StepCatalog;
use provflow::dispatch::{LocalDispatcher, TaskArgs};
use provflow::handler::{HandlerRegistry, StepEvent};
use provflow::orchestrator::Orchestrator;
use provflow::store::{MemoryBackend, WorkflowStore};
use provflow::workflow::{StepStatus, WorkflowStatus};
use provflow::ProvflowError;

const TIMEOUT: Duration = Duration::from_secs(30);

fn orchestrator(registry: HandlerRegistry) -> (Orchestrator, Receiver<StepEvent>) {
    let catalog = Arc::new(StepCatalog::standard());
    let store = WorkflowStore::new(Arc::new(MemoryBackend::new()), catalog.clone());
    let (dispatcher, events) = LocalDispatcher::new(registry, 2, Duration::ZERO);
    (
        Orchestrator::new(catalog, store, Arc::new(dispatcher)),
        events,
    )
}

#[test]
fn simulated_run_completes() {
    let catalog = StepCatalog::standard();
    let registry = HandlerRegistry::simulated(&catalog, &HashMap::new(), Duration::ZERO);
    let (orch, events) = orchestrator(registry);

    let id = orch.create_workflow("srv-001", "Ubuntu 20.04").unwrap().workflow_id;
    orch.start_workflow(&id).unwrap();
    let rec = orch.run_until_rest(&id, &events, TIMEOUT).unwrap();

    assert_eq!(rec.status, WorkflowStatus::Completed);
    assert!(rec.check_invariants().is_empty());
    assert_eq!(
        rec.step(0).unwrap().result.as_deref(),
        Some("Reinstall OS finished on srv-001 (Ubuntu 20.04)")
    );
}

#[test]
fn failure_then_retry_completes() {
    let catalog = StepCatalog::standard();
    let mut registry = HandlerRegistry::simulated(&catalog, &HashMap::new(), Duration::ZERO);
    let network_calls = Arc::new(AtomicU32::new(0));
    let calls = Arc::clone(&network_calls);
    // Fails every attempt of the first dispatch (budget 2, so 3 calls), then works.
    registry.register("configure_network", move |args: &TaskArgs| -> anyhow::Result<String> {
        if calls.fetch_add(1, Ordering::SeqCst) < 3 {
            anyhow::bail!("link down on {}", args.target_id);
        }
        Ok("network configured".into())
    });
    let (orch, events) = orchestrator(registry);

    let id = orch.create_workflow("srv-001", "Ubuntu 20.04").unwrap().workflow_id;
    orch.start_workflow(&id).unwrap();
    let rec = orch.run_until_rest(&id, &events, TIMEOUT).unwrap();

    assert_eq!(rec.status, WorkflowStatus::Failed);
    assert_eq!(rec.current_step, 3);
    assert_eq!(rec.last_error.as_deref(), Some("link down on srv-001"));
    assert_eq!(network_calls.load(Ordering::SeqCst), 3);
    let before_retry = rec.step_results[..3].to_vec();

    orch.retry_from_step(&id, 3).unwrap();
    let rec = orch.run_until_rest(&id, &events, TIMEOUT).unwrap();

    assert_eq!(rec.status, WorkflowStatus::Completed);
    assert_eq!(&rec.step_results[..3], before_retry.as_slice());
    assert_eq!(rec.step(3).unwrap().result.as_deref(), Some("network configured"));
    assert_eq!(rec.step(3).unwrap().attempts, 2);
}

#[test]
fn runs_on_separate_targets_proceed_independently() {
    let catalog = StepCatalog::standard();
    let failures = HashMap::from([(
        "install_base_env".to_string(),
        "mirror unreachable".to_string(),
    )]);
    let registry = HandlerRegistry::simulated(&catalog, &failures, Duration::from_millis(5));
    let (orch, events) = orchestrator(registry);

    let a = orch.create_workflow("srv-a", "Ubuntu 20.04").unwrap().workflow_id;
    let b = orch.create_workflow("srv-b", "Debian 12").unwrap().workflow_id;
    orch.start_workflow(&a).unwrap();
    orch.start_workflow(&b).unwrap();

    let rec_a = orch.run_until_rest(&a, &events, TIMEOUT).unwrap();
    let rec_b = orch.run_until_rest(&b, &events, TIMEOUT).unwrap();

    for rec in [&rec_a, &rec_b] {
        assert_eq!(rec.status, WorkflowStatus::Failed);
        assert_eq!(rec.current_step, 1);
        assert_eq!(rec.step(0).unwrap().status, StepStatus::Completed);
        assert!(rec.check_invariants().is_empty());
    }
}

#[test]
fn waiting_without_progress_times_out() {
    let catalog = StepCatalog::standard();
    let mut registry = HandlerRegistry::simulated(&catalog, &HashMap::new(), Duration::ZERO);
    registry.register("reinstall_os", |_: &TaskArgs| -> anyhow::Result<String> {
        std::thread::sleep(Duration::from_millis(500));
        Ok("slow".into())
    });
    let (orch, events) = orchestrator(registry);

    let id = orch.create_workflow("srv-001", "Ubuntu 20.04").unwrap().workflow_id;
    orch.start_workflow(&id).unwrap();
    let err = orch
        .run_until_rest(&id, &events, Duration::from_millis(20))
        .unwrap_err();

    assert!(matches!(err, ProvflowError::Timeout { .. }));
}

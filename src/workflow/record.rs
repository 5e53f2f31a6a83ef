//! Workflow record and per-step results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::StepCatalog;
use crate::error::{ProvflowError, Result};

use super::{CorrelationId, StepStatus, WorkflowId, WorkflowStatus};

/// Outcome of one step within the current attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Position in the catalog (0-based).
    pub step_index: usize,
    /// Copy of the catalog step name.
    pub step_name: String,
    /// Status within the current attempt.
    pub status: StepStatus,
    /// Result payload reported by the handler.
    pub result: Option<String>,
    /// Error reported by the handler.
    pub error: Option<String>,
    /// When the step was dispatched.
    pub started_at: Option<DateTime<Utc>>,
    /// When the step completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Correlation id of the dispatch attempt in flight.
    pub correlation_id: Option<CorrelationId>,
    /// Number of times this step has been dispatched, across retries.
    #[serde(default)]
    pub attempts: u32,
}

impl StepResult {
    /// A fresh pending result.
    pub fn pending(step_index: usize, step_name: impl Into<String>) -> Self {
        Self {
            step_index,
            step_name: step_name.into(),
            status: StepStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
            correlation_id: None,
            attempts: 0,
        }
    }

    /// Clear everything belonging to the current attempt.
    fn reset(&mut self) {
        self.status = StepStatus::Pending;
        self.result = None;
        self.error = None;
        self.started_at = None;
        self.completed_at = None;
        self.correlation_id = None;
    }
}

/// Persisted state of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub workflow_id: WorkflowId,
    /// Resource being provisioned (e.g. a server id).
    pub target_id: String,
    /// Run configuration (e.g. target OS type).
    pub config: String,
    pub current_step: usize,
    pub total_steps: usize,
    pub status: WorkflowStatus,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version; bumped by the store on every write.
    #[serde(default)]
    pub revision: u64,
    pub step_results: Vec<StepResult>,
}

impl WorkflowRecord {
    /// Build a pending record with one pending result per catalog step.
    pub fn new(
        workflow_id: WorkflowId,
        target_id: impl Into<String>,
        config: impl Into<String>,
        catalog: &StepCatalog,
    ) -> Self {
        let now = Utc::now();
        let step_results = catalog
            .iter()
            .enumerate()
            .map(|(i, def)| StepResult::pending(i, &def.name))
            .collect();

        Self {
            workflow_id,
            target_id: target_id.into(),
            config: config.into(),
            current_step: 0,
            total_steps: catalog.len(),
            status: WorkflowStatus::Pending,
            last_error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            revision: 0,
            step_results,
        }
    }

    /// Validate a raw step index against this record.
    pub fn check_index(&self, index: i64) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.total_steps)
            .ok_or(ProvflowError::InvalidIndex {
                index,
                total: self.total_steps,
            })
    }

    fn require_index(&self, index: usize) -> Result<usize> {
        self.check_index(index as i64)
    }

    /// Index of the final step.
    pub fn last_index(&self) -> usize {
        self.total_steps.saturating_sub(1)
    }

    /// Whether `index` is the final step.
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.total_steps
    }

    /// Result at a position.
    pub fn step(&self, index: usize) -> Option<&StepResult> {
        self.step_results.get(index)
    }

    /// Result of the step the run is currently on.
    pub fn current(&self) -> Option<&StepResult> {
        self.step_results.get(self.current_step)
    }

    /// Stamp `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Set a step's status and correlation id.
    ///
    /// `Running` also moves the run onto that step. Terminal statuses go
    /// through [`complete_step`](Self::complete_step) and
    /// [`fail_step`](Self::fail_step) so the record-level status follows.
    pub fn set_step_status(
        &mut self,
        index: usize,
        status: StepStatus,
        correlation_id: Option<CorrelationId>,
    ) -> Result<()> {
        let index = self.require_index(index)?;
        match status {
            StepStatus::Running => self.mark_step_running(index, correlation_id)?,
            StepStatus::Completed => {
                self.complete_step(index, None)?;
                self.step_results[index].correlation_id = correlation_id;
            }
            StepStatus::Failed => {
                let error = self.step_results[index]
                    .error
                    .clone()
                    .unwrap_or_else(|| "step failed".to_string());
                self.fail_step(index, error)?;
                self.step_results[index].correlation_id = correlation_id;
            }
            StepStatus::Pending => {
                let step = &mut self.step_results[index];
                step.reset();
                step.correlation_id = correlation_id;
            }
        }
        Ok(())
    }

    /// Mark a step dispatched under `correlation_id`.
    pub fn mark_step_running(
        &mut self,
        index: usize,
        correlation_id: Option<CorrelationId>,
    ) -> Result<()> {
        let index = self.require_index(index)?;
        let step = &mut self.step_results[index];
        step.status = StepStatus::Running;
        step.started_at = Some(Utc::now());
        step.completed_at = None;
        step.correlation_id = correlation_id;
        step.attempts += 1;

        self.status = WorkflowStatus::Running;
        self.current_step = index;
        Ok(())
    }

    /// Mark a step completed. Completing the final step completes the run.
    pub fn complete_step(&mut self, index: usize, result: Option<String>) -> Result<()> {
        let index = self.require_index(index)?;
        let now = Utc::now();
        let step = &mut self.step_results[index];
        step.status = StepStatus::Completed;
        step.result = result;
        step.error = None;
        step.completed_at = Some(now);

        if self.is_last(index) {
            self.status = WorkflowStatus::Completed;
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Move the run onto the next step after `index`.
    pub fn advance_past(&mut self, index: usize) -> Result<()> {
        let index = self.require_index(index)?;
        if !self.is_last(index) {
            self.current_step = index + 1;
        }
        Ok(())
    }

    /// Mark a step and the run failed.
    pub fn fail_step(&mut self, index: usize, error: impl Into<String>) -> Result<()> {
        let index = self.require_index(index)?;
        let error = error.into();
        let step = &mut self.step_results[index];
        step.status = StepStatus::Failed;
        step.error = Some(error.clone());

        self.status = WorkflowStatus::Failed;
        self.last_error = Some(error);
        Ok(())
    }

    /// Whether the run is parked on `index` waiting for that step to be
    /// dispatched: it is the current step, still pending, with no attempt
    /// recorded against it.
    pub fn awaits_dispatch(&self, index: usize) -> bool {
        let Some(step) = self.step(index) else {
            return false;
        };
        self.current_step == index
            && matches!(self.status, WorkflowStatus::Pending | WorkflowStatus::Running)
            && step.status == StepStatus::Pending
            && step.correlation_id.is_none()
    }

    /// Reset every step from `index` onwards to pending and resume there.
    ///
    /// Steps before `index` keep their history untouched.
    pub fn reset_from(&mut self, index: usize) -> Result<()> {
        let index = self.require_index(index)?;
        for step in &mut self.step_results[index..] {
            step.reset();
        }
        self.current_step = index;
        self.status = WorkflowStatus::Running;
        self.last_error = None;
        self.completed_at = None;
        Ok(())
    }

    /// List every violated record invariant. Empty means consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.step_results.len() != self.total_steps {
            violations.push(format!(
                "step_results has {} entries, expected {}",
                self.step_results.len(),
                self.total_steps
            ));
        }
        if self.current_step > self.total_steps {
            violations.push(format!(
                "current_step {} exceeds total_steps {}",
                self.current_step, self.total_steps
            ));
        }
        for (i, step) in self.step_results.iter().enumerate() {
            if step.step_index != i {
                violations.push(format!("step at position {} has index {}", i, step.step_index));
            }
        }

        let last_completed = self
            .step_results
            .last()
            .is_some_and(|s| s.status == StepStatus::Completed);
        if (self.status == WorkflowStatus::Completed) != last_completed {
            violations.push(format!(
                "status is {} but last step completed = {}",
                self.status, last_completed
            ));
        }

        let any_failed = self
            .step_results
            .iter()
            .any(|s| s.status == StepStatus::Failed);
        if (self.status == WorkflowStatus::Failed) != any_failed {
            violations.push(format!(
                "status is {} but a step failed = {}",
                self.status, any_failed
            ));
        }

        for (i, step) in self.step_results.iter().enumerate() {
            if step.status == StepStatus::Running && i != self.current_step {
                violations.push(format!(
                    "step {} is running but the current step is {}",
                    i, self.current_step
                ));
            }
            if i > self.current_step && step.status != StepStatus::Pending {
                violations.push(format!(
                    "step {} is {} ahead of the current step {}",
                    i, step.status, self.current_step
                ));
            }
        }

        if self.updated_at < self.created_at {
            violations.push("updated_at precedes created_at".to_string());
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> WorkflowRecord {
        WorkflowRecord::new(
            WorkflowId::from_string("wf_test"),
            "srv-001",
            "Ubuntu 20.04",
            &StepCatalog::standard(),
        )
    }

    #[test]
    fn new_record_is_pending_with_one_result_per_step() {
        let rec = record();

        assert_eq!(rec.total_steps, 5);
        assert_eq!(rec.step_results.len(), 5);
        assert_eq!(rec.status, WorkflowStatus::Pending);
        assert_eq!(rec.current_step, 0);
        assert!(rec
            .step_results
            .iter()
            .all(|s| s.status == StepStatus::Pending));
        assert_eq!(rec.step_results[0].step_name, "Reinstall OS");
        assert!(rec.check_invariants().is_empty());
    }

    #[test]
    fn check_index_rejects_out_of_range() {
        let rec = record();
        assert_eq!(rec.check_index(0).unwrap(), 0);
        assert_eq!(rec.check_index(4).unwrap(), 4);
        assert!(matches!(
            rec.check_index(-1),
            Err(ProvflowError::InvalidIndex { index: -1, total: 5 })
        ));
        assert!(matches!(
            rec.check_index(5),
            Err(ProvflowError::InvalidIndex { index: 5, .. })
        ));
    }

    #[test]
    fn running_moves_record_onto_step() {
        let mut rec = record();
        rec.mark_step_running(0, Some(CorrelationId::new("c-1")))
            .unwrap();

        assert_eq!(rec.status, WorkflowStatus::Running);
        assert_eq!(rec.current_step, 0);
        let step = rec.step(0).unwrap();
        assert_eq!(step.status, StepStatus::Running);
        assert!(step.started_at.is_some());
        assert_eq!(step.attempts, 1);
        assert_eq!(step.correlation_id.as_ref().unwrap().as_str(), "c-1");
    }

    #[test]
    fn completing_last_step_completes_run() {
        let mut rec = record();
        for i in 0..5 {
            rec.mark_step_running(i, None).unwrap();
            rec.complete_step(i, Some(format!("step {} ok", i))).unwrap();
            if i < 4 {
                assert_eq!(rec.status, WorkflowStatus::Running);
                rec.advance_past(i).unwrap();
            }
        }

        assert_eq!(rec.status, WorkflowStatus::Completed);
        assert!(rec.completed_at.is_some());
        assert_eq!(rec.current_step, 4);
        assert!(rec.check_invariants().is_empty());
    }

    #[test]
    fn fail_step_sets_last_error() {
        let mut rec = record();
        rec.mark_step_running(0, None).unwrap();
        rec.fail_step(0, "disk missing").unwrap();

        assert_eq!(rec.status, WorkflowStatus::Failed);
        assert_eq!(rec.last_error.as_deref(), Some("disk missing"));
        assert_eq!(rec.step(0).unwrap().error.as_deref(), Some("disk missing"));
        assert!(rec.check_invariants().is_empty());
    }

    #[test]
    fn reset_from_keeps_earlier_history() {
        let mut rec = record();
        rec.mark_step_running(0, Some("c-0".into())).unwrap();
        rec.complete_step(0, Some("os reinstalled".into())).unwrap();
        rec.advance_past(0).unwrap();
        rec.mark_step_running(1, Some("c-1".into())).unwrap();
        rec.fail_step(1, "hardware fault").unwrap();
        let before = rec.step(0).cloned();

        rec.reset_from(1).unwrap();

        assert_eq!(rec.step(0).cloned(), before);
        assert_eq!(rec.current_step, 1);
        assert_eq!(rec.status, WorkflowStatus::Running);
        assert!(rec.last_error.is_none());
        for step in &rec.step_results[1..] {
            assert_eq!(step.status, StepStatus::Pending);
            assert!(step.correlation_id.is_none());
            assert!(step.error.is_none());
            assert!(step.started_at.is_none());
        }
        assert_eq!(rec.step(1).unwrap().attempts, 1);
        assert!(rec.check_invariants().is_empty());
    }

    #[test]
    fn reset_from_is_idempotent() {
        let mut rec = record();
        rec.mark_step_running(0, None).unwrap();
        rec.fail_step(0, "boom").unwrap();

        rec.reset_from(0).unwrap();
        let once = rec.clone();
        rec.reset_from(0).unwrap();

        assert_eq!(rec, once);
    }

    #[test]
    fn set_step_status_completed_on_last_step_completes_run() {
        let mut rec = record();
        rec.set_step_status(4, StepStatus::Completed, Some("c-4".into()))
            .unwrap();

        assert_eq!(rec.status, WorkflowStatus::Completed);
        assert!(rec.step(4).unwrap().completed_at.is_some());
    }

    #[test]
    fn set_step_status_rejects_bad_index() {
        let mut rec = record();
        let err = rec
            .set_step_status(9, StepStatus::Running, None)
            .unwrap_err();
        assert!(matches!(err, ProvflowError::InvalidIndex { index: 9, .. }));
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut rec = record();
        let future = Utc::now() + chrono::Duration::hours(1);
        rec.updated_at = future;
        rec.touch();
        assert_eq!(rec.updated_at, future);
    }

    #[test]
    fn invariant_check_flags_inconsistent_status() {
        let mut rec = record();
        rec.status = WorkflowStatus::Completed;
        assert!(!rec.check_invariants().is_empty());
    }

    #[test]
    fn invariant_check_flags_running_step_off_the_current_one() {
        let mut rec = record();
        rec.mark_step_running(0, Some("c-0".into())).unwrap();
        rec.step_results[1].status = StepStatus::Running;

        let violations = rec.check_invariants();
        assert!(violations.iter().any(|v| v.contains("step 1 is running")));
    }

    #[test]
    fn awaits_dispatch_only_for_untouched_current_step() {
        let mut rec = record();
        assert!(rec.awaits_dispatch(0));
        assert!(!rec.awaits_dispatch(1));

        rec.mark_step_running(0, Some("c-0".into())).unwrap();
        assert!(!rec.awaits_dispatch(0));

        rec.complete_step(0, None).unwrap();
        rec.advance_past(0).unwrap();
        assert!(rec.awaits_dispatch(1));

        rec.mark_step_running(1, Some("c-1".into())).unwrap();
        rec.fail_step(1, "hardware fault").unwrap();
        assert!(!rec.awaits_dispatch(1));

        rec.reset_from(1).unwrap();
        assert!(rec.awaits_dispatch(1));
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut rec = record();
        rec.mark_step_running(0, Some("c-0".into())).unwrap();

        let json = serde_json::to_string(&rec).unwrap();
        let parsed: WorkflowRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rec);
        assert!(json.contains("\"status\":\"running\""));
    }
}

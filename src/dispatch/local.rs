//! In-process thread-pool dispatcher.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{ProvflowError, Result};
use crate::handler::{HandlerRegistry, StepEvent};
use crate::workflow::CorrelationId;

use super::{run_with_budget, TaskDispatcher, TaskSubmission};

struct Job {
    correlation_id: CorrelationId,
    submission: TaskSubmission,
}

/// Runs step handlers on a fixed pool of worker threads.
///
/// Every finished job is published as a [`StepEvent`] on the channel
/// returned by [`LocalDispatcher::new`]. Dropping the dispatcher stops the
/// workers once queued jobs have drained.
pub struct LocalDispatcher {
    jobs: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    registry: Arc<HandlerRegistry>,
}

impl LocalDispatcher {
    /// Start `threads` workers (at least one).
    ///
    /// Returns the dispatcher and the receiving end of its event channel.
    pub fn new(
        registry: HandlerRegistry,
        threads: usize,
        retry_backoff: Duration,
    ) -> (Self, Receiver<StepEvent>) {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (event_tx, event_rx) = mpsc::channel();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let registry = Arc::new(registry);

        let workers = (0..threads.max(1))
            .map(|n| {
                let job_rx = Arc::clone(&job_rx);
                let events = event_tx.clone();
                let registry = Arc::clone(&registry);
                thread::Builder::new()
                    .name(format!("provflow-worker-{}", n))
                    .spawn(move || worker_loop(job_rx, events, registry, retry_backoff))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!("Failed to spawn worker thread: {}", e);
                    None
                }
            })
            .collect();

        let dispatcher = Self {
            jobs: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
            registry,
        };
        (dispatcher, event_rx)
    }

    /// Stop accepting work and wait for in-flight jobs to finish.
    pub fn shutdown(&self) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.take();
        }
        let handles = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => return,
        };
        for handle in handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    jobs: Arc<Mutex<Receiver<Job>>>,
    events: Sender<StepEvent>,
    registry: Arc<HandlerRegistry>,
    retry_backoff: Duration,
) {
    loop {
        let job = match jobs.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };
        let Ok(job) = job else {
            break;
        };

        let args = &job.submission.args;
        let outcome = match registry.get(&job.submission.task_name) {
            Some(handler) => run_with_budget(
                handler.as_ref(),
                args,
                job.submission.retry_budget,
                retry_backoff,
            ),
            None => crate::handler::StepOutcome::Failed {
                error: format!("no handler bound to task '{}'", job.submission.task_name),
            },
        };

        let event = StepEvent::new(args, job.correlation_id, outcome);
        if events.send(event).is_err() {
            tracing::debug!("Event receiver dropped; discarding step outcome");
        }
    }
}

impl TaskDispatcher for LocalDispatcher {
    fn submit(&self, task: &TaskSubmission) -> Result<CorrelationId> {
        let dispatch_error = |message: &str| ProvflowError::Dispatch {
            task: task.task_name.clone(),
            message: message.to_string(),
        };

        if !self.registry.contains(&task.task_name) {
            return Err(dispatch_error("no handler registered for task"));
        }

        let jobs = self
            .jobs
            .lock()
            .map_err(|_| dispatch_error("job queue lock poisoned"))?;
        let sender = jobs
            .as_ref()
            .ok_or_else(|| dispatch_error("dispatcher is shut down"))?;

        let correlation_id = CorrelationId::generate("local");
        sender
            .send(Job {
                correlation_id: correlation_id.clone(),
                submission: task.clone(),
            })
            .map_err(|_| dispatch_error("worker pool has stopped"))?;

        tracing::debug!(
            task = %task.task_name,
            correlation_id = %correlation_id,
            "Queued task on local worker pool"
        );
        Ok(correlation_id)
    }
}

impl Drop for LocalDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

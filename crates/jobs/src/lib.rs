use parking_lot::RwLock;
use sched_core::{AggregatorEngine, ClassEngine, ScheduleEngine};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;
use types::{AggregatorEnvelope, ClassEnvelope, JobId, JobOutcome, JobStatus, ScheduleEnvelope};
use uuid::Uuid;

/// What a caller hands the queue; one request, one job id, regardless of
/// which problem family it belongs to.
pub enum JobRequest {
    Schedule(ScheduleEnvelope),
    Aggregator(AggregatorEnvelope),
    Classes(ClassEnvelope),
}

/// Generalization of the teacher's `InMemJobs<S: Solver>`: one job map
/// shared across all three engines rather than one queue per solver type,
/// since `/v1/jobs/:id` is a single namespace regardless of which solve
/// kind produced the job.
#[derive(Clone)]
pub struct InMemJobs {
    inner: Arc<RwLock<HashMap<String, JobStatus>>>,
    schedule: Arc<dyn ScheduleEngine>,
    aggregator: Arc<dyn AggregatorEngine>,
    classes: Arc<dyn ClassEngine>,
}

impl InMemJobs {
    pub fn new(
        schedule: Arc<dyn ScheduleEngine>,
        aggregator: Arc<dyn AggregatorEngine>,
        classes: Arc<dyn ClassEngine>,
    ) -> Self {
        Self {
            inner: Default::default(),
            schedule,
            aggregator,
            classes,
        }
    }

    pub fn enqueue(&self, req: JobRequest) -> JobId {
        let id = Uuid::new_v4().to_string();
        self.inner
            .write()
            .insert(id.clone(), JobStatus::Queued);

        let map = self.inner.clone();
        let schedule = self.schedule.clone();
        let aggregator = self.aggregator.clone();
        let classes = self.classes.clone();
        let id_for_task = id.clone();

        tokio::spawn(async move {
            {
                let mut w = map.write();
                w.insert(id_for_task.clone(), JobStatus::Running);
            }
            let outcome = match req {
                JobRequest::Schedule(env) => schedule.solve(env).await.map(JobOutcome::Schedule),
                JobRequest::Aggregator(env) => aggregator.solve(env).await.map(JobOutcome::Schedule),
                JobRequest::Classes(env) => classes.solve(env).await.map(JobOutcome::Classes),
            };
            match outcome {
                Ok(result) => {
                    map.write()
                        .insert(id_for_task, JobStatus::Done { result });
                }
                Err(e) => {
                    error!(?e, "job failed");
                    map.write().insert(
                        id_for_task,
                        JobStatus::Failed {
                            message: e.to_string(),
                        },
                    );
                }
            }
        });

        JobId(id)
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.inner.read().get(id).cloned()
    }
}

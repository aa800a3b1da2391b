use std::sync::Arc;

use jobs::InMemJobs;
use solver_flow::{AggregatorSolver, FlowSolver};
use solver_heur::HeurSolver;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<InMemJobs>,
}

impl AppState {
    pub fn new_default() -> Self {
        let jobs = InMemJobs::new(
            Arc::new(FlowSolver),
            Arc::new(AggregatorSolver),
            Arc::new(HeurSolver::new()),
        );
        Self { jobs: Arc::new(jobs) }
    }
}

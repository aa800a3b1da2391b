pub mod cluster;
pub mod strategy;

use async_trait::async_trait;
use sched_core::ClassEngine;
use tracing::info;
use types::{ClassEnvelope, ClassResult};

/// Dispatches a class-assignment solve to the clustered-preprocessed or
/// full ILP formulation, per the density computed by [`strategy`].
pub struct HeurSolver;

impl HeurSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeurSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClassEngine for HeurSolver {
    async fn solve(&self, env: ClassEnvelope) -> anyhow::Result<ClassResult> {
        let threshold = env
            .constraints
            .cluster_threshold
            .unwrap_or_else(strategy::default_threshold);
        let density = strategy::reciprocal_density(&env.students);
        let classification = if density >= threshold {
            strategy::Classification::Clustered
        } else {
            strategy::Classification::Random
        };

        info!(
            density,
            threshold,
            classification = ?classification,
            "strategy selector classified preference data"
        );

        match classification {
            strategy::Classification::Clustered => {
                let clusters = cluster::cluster_students(&env.students);
                solver_ilp::solve_preprocessed(&env, &clusters).await
            }
            strategy::Classification::Random => solver_ilp::solve_full(&env).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ClassDef, Sex, Student};

    fn student(id: &str, prefs: &[&str], sex: Option<Sex>) -> Student {
        Student {
            id: id.into(),
            preferences: prefs.iter().map(|p| (*p).into()).collect(),
            sex,
            categorical: Default::default(),
        }
    }

    #[tokio::test]
    async fn mutual_triangles_take_clustered_path() {
        let students = vec![
            student("A1", &["A2", "A3"], None),
            student("A2", &["A1", "A3"], None),
            student("A3", &["A1", "A2"], None),
            student("B1", &["B2", "B3"], None),
            student("B2", &["B1", "B3"], None),
            student("B3", &["B1", "B2"], None),
        ];
        let env = ClassEnvelope {
            students,
            classes: vec![
                ClassDef { id: "C1".into(), capacity: 3 },
                ClassDef { id: "C2".into(), capacity: 3 },
            ],
            constraints: Default::default(),
        };

        let result = HeurSolver::new().solve(env).await.unwrap();
        assert_eq!(result.strategy, types::Strategy::Clustered);
        assert!(result.unassigned.is_empty());
    }

    #[tokio::test]
    async fn sparse_one_sided_preferences_take_random_path() {
        let students = vec![
            student("S1", &["S2"], None),
            student("S2", &[], None),
            student("S3", &[], None),
            student("S4", &[], None),
        ];
        let env = ClassEnvelope {
            students,
            classes: vec![ClassDef { id: "C1".into(), capacity: 4 }],
            constraints: Default::default(),
        };

        let result = HeurSolver::new().solve(env).await.unwrap();
        assert_eq!(result.strategy, types::Strategy::Random);
        assert!(result.unassigned.is_empty());
    }
}

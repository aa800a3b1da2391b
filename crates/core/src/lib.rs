pub mod reward;

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

pub use types::{
    AggregatorEnvelope, ClassEnvelope, ClassResult, GadgetParams, JobOutcome, ScheduleEnvelope,
    ScheduleResult,
};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid instance: {0}")]
    Msg(String),
}

/// Structural validation for the gadget scheduling form (§7 `InputShape`).
/// Unlike a fatal error, every problem found here is collected and reported
/// together; none of them prevents a solve attempt, since A1 silently skips
/// the malformed entries it can't use (preferred slots outside `time_slots`,
/// unknown teachers in a parent's wanted list).
pub fn validate_schedule(env: &ScheduleEnvelope) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    if env.time_slots.is_empty() {
        errors.push("time_slots is empty".into());
    }
    let known_teachers: HashSet<_> = env.teachers.iter().map(|t| &t.0).collect();
    let known_slots: HashSet<_> = env.time_slots.iter().map(|t| &t.0).collect();

    let mut seen_pairs = HashSet::new();
    for pref in &env.parent_preferences {
        if pref.teachers.is_empty() {
            errors.push(format!("parent {} names no teachers", pref.parent));
        }
        for t in &pref.teachers {
            if !known_teachers.contains(&t.0) {
                errors.push(format!(
                    "parent {} references unknown teacher {}",
                    pref.parent, t
                ));
            }
            let key = (pref.parent.0.clone(), t.0.clone());
            if !seen_pairs.insert(key) {
                errors.push(format!(
                    "parent {} requests teacher {} more than once",
                    pref.parent, t
                ));
            }
        }
        for s in &pref.preferred_slots {
            if !known_slots.contains(&s.0) {
                errors.push(format!(
                    "parent {} prefers unknown slot {} (ignored at build time)",
                    pref.parent, s
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Msg(errors.join("; ")))
    }
}

/// Structural validation for the class-assignment form.
pub fn validate_classes(env: &ClassEnvelope) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    if env.classes.is_empty() {
        errors.push("classes is empty".into());
    }
    for c in &env.classes {
        if c.capacity == 0 {
            errors.push(format!("class {} has non-positive capacity", c.id));
        }
    }

    let mut seen_students = HashSet::new();
    let known_students: HashSet<_> = env.students.iter().map(|s| &s.id.0).collect();
    for s in &env.students {
        if !seen_students.insert(s.id.0.clone()) {
            errors.push(format!("duplicate student id: {}", s.id));
        }
        for p in &s.preferences {
            if !known_students.contains(&p.0) {
                errors.push(format!(
                    "student {} lists unreachable preference {} (ignored in objective)",
                    s.id, p
                ));
            }
        }
    }

    let constraint_count = env.constraints.categorical.len();
    if constraint_count > 2 {
        errors.push(format!(
            "at most two categorical constraints are supported, got {constraint_count}"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Msg(errors.join("; ")))
    }
}

/// Generalization of the teacher's `Solver` trait: one engine per problem
/// family, dispatched by the job queue without either crate knowing about
/// the other's domain types.
#[async_trait]
pub trait ScheduleEngine: Send + Sync + 'static {
    async fn solve(&self, env: ScheduleEnvelope) -> anyhow::Result<ScheduleResult>;
}

#[async_trait]
pub trait AggregatorEngine: Send + Sync + 'static {
    async fn solve(&self, env: AggregatorEnvelope) -> anyhow::Result<ScheduleResult>;
}

#[async_trait]
pub trait ClassEngine: Send + Sync + 'static {
    async fn solve(&self, env: ClassEnvelope) -> anyhow::Result<ClassResult>;
}

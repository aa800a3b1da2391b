mod ilp_core;

use good_lp::{ProblemVariables, Solution, SolverModel};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use types::{ClassDef, ClassEnvelope, ClassResult, Strategy, Student, StudentId};

#[derive(Debug, Error)]
pub enum IlpError {
    #[error("no classes supplied")]
    NoClasses,
}

/// Three termination statuses matter (§4.7). `good_lp`'s `SolverModel`
/// trait only distinguishes `Ok`/`Err`, so a time-limited solve that
/// returns `Ok` is treated as feasible-but-unproven and re-checked against
/// capacity; an unlimited solve that returns `Ok` is optimal by
/// construction (CBC runs to completion).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Termination {
    Optimal,
    FeasibleUnproven,
    Infeasible,
}

struct SolveAttempt {
    termination: Termination,
    assignment: HashMap<String, Vec<String>>,
    objective: f64,
}

fn run_model(
    students: &[Student],
    classes: &[ClassDef],
    clusters: Option<&HashMap<String, u32>>,
    env: &ClassEnvelope,
    time_limit: Option<Duration>,
) -> SolveAttempt {
    let prep = ilp_core::build_prep(students, classes, clusters);
    let mut pvars = ProblemVariables::new();
    let v = ilp_core::declare_vars(&prep, &mut pvars);
    let objective = ilp_core::build_objective(&prep, &v);

    let mut model = pvars.maximise(objective.clone()).using(good_lp::default_solver);
    model = ilp_core::add_assignment_constraints(model, &prep, &v);
    model = ilp_core::add_capacity_constraints(model, &prep, &v);
    model = ilp_core::add_and_linearization(model, &prep, &v);
    if let Some(ratio) = &env.constraints.gender_ratio {
        model = ilp_core::add_gender_constraints(model, &prep, &v, ratio);
    }
    let (concentrate, spread) = ilp_core::categorical_constraints(&env.constraints.categorical);
    for attr in concentrate {
        model = ilp_core::add_concentrate_constraint(model, &prep, &v, attr);
    }
    for attr in spread {
        model = ilp_core::add_spread_constraint(model, &prep, &v, attr);
    }

    if let Some(limit) = time_limit {
        model.set_parameter("seconds", &limit.as_secs().to_string());
    }

    match model.solve() {
        Ok(sol) => {
            let assignment = ilp_core::extract_solution(&prep, &v, &sol);
            let objective_value = sol.eval(objective);
            let termination = if time_limit.is_some() {
                Termination::FeasibleUnproven
            } else {
                Termination::Optimal
            };
            SolveAttempt {
                termination,
                assignment,
                objective: objective_value,
            }
        }
        Err(_) => SolveAttempt {
            termination: Termination::Infeasible,
            assignment: HashMap::new(),
            objective: 0.0,
        },
    }
}

/// Greedy repair: any student absent from the decoded assignment is placed
/// into the class maximizing `|prefs(s) ∩ currently_in(c)|`, ties broken
/// by class enumeration order; left unassigned if no class has room.
fn repair(
    students: &[Student],
    classes: &[ClassDef],
    assignment: &mut HashMap<String, Vec<String>>,
) -> Vec<StudentId> {
    let assigned: HashSet<String> = assignment.values().flatten().cloned().collect();
    let mut unassigned = Vec::new();

    for s in students {
        if assigned.contains(&s.id.0) {
            continue;
        }
        let prefs: HashSet<&str> = s.preferences.iter().map(|p| p.0.as_str()).collect();

        let mut best: Option<(usize, i64)> = None;
        for (ci, class) in classes.iter().enumerate() {
            let members = assignment.entry(class.id.0.clone()).or_default();
            if members.len() as u32 >= class.capacity {
                continue;
            }
            let overlap = members
                .iter()
                .filter(|m| prefs.contains(m.as_str()))
                .count() as i64;
            if best.map_or(true, |(_, b)| overlap > b) {
                best = Some((ci, overlap));
            }
        }

        match best {
            Some((ci, _)) => {
                assignment
                    .get_mut(classes[ci].id.0.as_str())
                    .unwrap()
                    .push(s.id.0.clone());
            }
            None => {
                warn!(student = %s.id, "no class with remaining capacity; left unassigned");
                unassigned.push(s.id.clone());
            }
        }
    }
    unassigned
}

fn to_class_result(
    status: &str,
    strategy: Strategy,
    attempt: &SolveAttempt,
    unassigned: Vec<StudentId>,
    students: &[Student],
) -> ClassResult {
    let assignments: HashMap<String, Vec<StudentId>> = attempt
        .assignment
        .iter()
        .map(|(c, ids)| (c.clone(), ids.iter().map(|s| StudentId(s.clone())).collect()))
        .collect();
    let reward = sched_core::reward::compute_class_reward(
        students,
        &assignments
            .iter()
            .map(|(c, v)| (types::ClassId(c.clone()), v.clone()))
            .collect(),
    );
    ClassResult {
        status: status.to_string(),
        strategy,
        objective: attempt.objective,
        assignments,
        unassigned,
        stats: serde_json::json!({
            "pairs_satisfied": reward.pairs_satisfied,
            "total_pairs_satisfied": reward.total_pairs_satisfied,
        }),
    }
}

/// B2-preprocessed + B3, with a time limit and fallback to the full
/// formulation when the incumbent violates capacity or the solve is
/// infeasible.
pub async fn solve_preprocessed(
    env: &ClassEnvelope,
    clusters: &HashMap<String, u32>,
) -> anyhow::Result<ClassResult> {
    if env.classes.is_empty() {
        return Err(IlpError::NoClasses.into());
    }
    let time_limit = env.constraints.time_limit_secs.map(Duration::from_secs);

    info!(
        students = env.students.len(),
        classes = env.classes.len(),
        "solving preprocessed (clustered) ILP"
    );
    let mut attempt = run_model(&env.students, &env.classes, Some(clusters), env, time_limit);

    let accepted = match attempt.termination {
        Termination::Optimal => true,
        Termination::FeasibleUnproven => {
            ilp_core::respects_capacity(
                &ilp_core::build_prep(&env.students, &env.classes, Some(clusters)),
                &attempt.assignment,
            )
        }
        Termination::Infeasible => false,
    };

    if !accepted {
        warn!("preprocessed formulation rejected, falling back to full formulation");
        attempt = run_model(&env.students, &env.classes, None, env, None);
    }

    let mut assignment = attempt.assignment.clone();
    let unassigned = repair(&env.students, &env.classes, &mut assignment);
    attempt.assignment = assignment;

    let status = if unassigned.is_empty() {
        "solved"
    } else {
        "solved_with_unassigned"
    };
    Ok(to_class_result(
        status,
        Strategy::Clustered,
        &attempt,
        unassigned,
        &env.students,
    ))
}

/// B2-full + B3, no time limit — the dispatch path for non-clustered data.
pub async fn solve_full(env: &ClassEnvelope) -> anyhow::Result<ClassResult> {
    if env.classes.is_empty() {
        return Err(IlpError::NoClasses.into());
    }
    info!(
        students = env.students.len(),
        classes = env.classes.len(),
        "solving full ILP"
    );
    let mut attempt = run_model(&env.students, &env.classes, None, env, None);

    let mut assignment = attempt.assignment.clone();
    let unassigned = repair(&env.students, &env.classes, &mut assignment);
    attempt.assignment = assignment;

    let status = if unassigned.is_empty() {
        "solved"
    } else {
        "solved_with_unassigned"
    };
    Ok(to_class_result(
        status,
        Strategy::Random,
        &attempt,
        unassigned,
        &env.students,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ClassDef, ClassEnvelope, Sex, Student};

    fn student(id: &str, prefs: &[&str], sex: Option<Sex>) -> Student {
        Student {
            id: id.into(),
            preferences: prefs.iter().map(|p| (*p).into()).collect(),
            sex,
            categorical: Default::default(),
        }
    }

    // Scenario S5: two mutual-preference triangles, two classes of
    // capacity 3; each triangle ends up in its own class.
    #[tokio::test]
    async fn scenario_s5_clustered_triangles() {
        let students = vec![
            student("A1", &["A2", "A3"], None),
            student("A2", &["A1", "A3"], None),
            student("A3", &["A1", "A2"], None),
            student("B1", &["B2", "B3"], None),
            student("B2", &["B1", "B3"], None),
            student("B3", &["B1", "B2"], None),
        ];
        let classes = vec![
            ClassDef { id: "C1".into(), capacity: 3 },
            ClassDef { id: "C2".into(), capacity: 3 },
        ];
        let env = ClassEnvelope {
            students,
            classes,
            constraints: Default::default(),
        };
        let mut clusters = HashMap::new();
        for id in ["A1", "A2", "A3"] {
            clusters.insert(id.to_string(), 0u32);
        }
        for id in ["B1", "B2", "B3"] {
            clusters.insert(id.to_string(), 1u32);
        }

        let result = solve_preprocessed(&env, &clusters).await.unwrap();
        assert!(result.unassigned.is_empty());
        for members in result.assignments.values() {
            let from_a = members.iter().filter(|m| m.0.starts_with('A')).count();
            let from_b = members.iter().filter(|m| m.0.starts_with('B')).count();
            assert!(from_a == 0 || from_b == 0, "triangles should not mix: {members:?}");
        }
    }

    // Scenario S6: one student with no reciprocated preferences is placed
    // by repair into whichever class has residual capacity.
    #[tokio::test]
    async fn scenario_s6_repair_places_isolated_student() {
        let students = vec![
            student("S1", &["S2"], None),
            student("S2", &["S1"], None),
            student("S3", &["S4"], None),
            student("S4", &["S3"], None),
            student("S5", &[], None),
        ];
        let classes = vec![
            ClassDef { id: "C1".into(), capacity: 3 },
            ClassDef { id: "C2".into(), capacity: 3 },
        ];
        let env = ClassEnvelope {
            students,
            classes,
            constraints: Default::default(),
        };

        let result = solve_full(&env).await.unwrap();
        assert!(result.unassigned.is_empty());
        let placed: usize = result.assignments.values().map(|v| v.len()).sum();
        assert_eq!(placed, 5);
    }
}

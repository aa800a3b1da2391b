#![allow(clippy::needless_lifetimes)]

use good_lp::{Expression, ProblemVariables, Solution, SolverModel, Variable};
use std::collections::{HashMap, HashSet};
use types::{CategoricalConstraint, ClassDef, GenderRatio, Student};

pub(crate) struct Prep<'a> {
    pub students: &'a [Student],
    pub classes: &'a [ClassDef],
    pub idx_student: HashMap<&'a str, usize>,
    pub idx_class: HashMap<&'a str, usize>,
    pub prefs: Vec<HashSet<&'a str>>,
    /// ordered `(s1, s2)` pairs to build `y` variables for — either every
    /// within-cluster pair (preprocessed) or every distinct pair (full).
    pub pairs: Vec<(usize, usize)>,
}

pub(crate) struct Vars {
    pub x: Vec<Vec<Variable>>,
    pub y: HashMap<(usize, usize, usize), Variable>,
}

pub(crate) fn build_prep<'a>(
    students: &'a [Student],
    classes: &'a [ClassDef],
    clusters: Option<&HashMap<String, u32>>,
) -> Prep<'a> {
    let idx_student: HashMap<&str, usize> = students
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.0.as_str(), i))
        .collect();
    let idx_class: HashMap<&str, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.0.as_str(), i))
        .collect();

    let known: HashSet<&str> = idx_student.keys().copied().collect();
    let prefs: Vec<HashSet<&str>> = students
        .iter()
        .map(|s| {
            s.preferences
                .iter()
                .map(|p| p.0.as_str())
                .filter(|p| known.contains(p))
                .collect()
        })
        .collect();

    let pairs = match clusters {
        Some(clusters) => {
            let mut pairs = Vec::new();
            for i in 0..students.len() {
                for j in 0..students.len() {
                    if i == j {
                        continue;
                    }
                    let ci = clusters.get(students[i].id.0.as_str());
                    let cj = clusters.get(students[j].id.0.as_str());
                    if ci.is_some() && ci == cj {
                        pairs.push((i, j));
                    }
                }
            }
            pairs
        }
        None => {
            let mut pairs = Vec::new();
            for i in 0..students.len() {
                for j in 0..students.len() {
                    if i != j {
                        pairs.push((i, j));
                    }
                }
            }
            pairs
        }
    };

    Prep {
        students,
        classes,
        idx_student,
        idx_class,
        prefs,
        pairs,
    }
}

pub(crate) fn declare_vars(prep: &Prep, vars: &mut ProblemVariables) -> Vars {
    let mut x = Vec::with_capacity(prep.students.len());
    for _ in prep.students {
        let row: Vec<Variable> = prep
            .classes
            .iter()
            .map(|_| vars.add(good_lp::variable().binary()))
            .collect();
        x.push(row);
    }

    let mut y = HashMap::new();
    for &(s1, s2) in &prep.pairs {
        for c in 0..prep.classes.len() {
            y.insert((s1, s2, c), vars.add(good_lp::variable().binary()));
        }
    }

    Vars { x, y }
}

pub(crate) fn build_objective(prep: &Prep, v: &Vars) -> Expression {
    let mut objective = Expression::from(0.0);
    for &(s1, s2) in &prep.pairs {
        let weight = prep.prefs[s1].intersection(&prep.prefs[s2]).count() as f64;
        if weight == 0.0 {
            continue;
        }
        for c in 0..prep.classes.len() {
            if let Some(&var) = v.y.get(&(s1, s2, c)) {
                objective = objective + weight * var;
            }
        }
    }
    objective
}

pub(crate) fn add_assignment_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for s in 0..prep.students.len() {
        let mut sum = Expression::from(0.0);
        for c in 0..prep.classes.len() {
            sum = sum + v.x[s][c];
        }
        model = model.with(sum.leq(1.0));
    }
    model
}

pub(crate) fn add_capacity_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for (c, class) in prep.classes.iter().enumerate() {
        let mut sum = Expression::from(0.0);
        for s in 0..prep.students.len() {
            sum = sum + v.x[s][c];
        }
        model = model.with(sum.leq(class.capacity as f64));
    }
    model
}

pub(crate) fn add_and_linearization<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for &(s1, s2) in &prep.pairs {
        for c in 0..prep.classes.len() {
            let Some(&y) = v.y.get(&(s1, s2, c)) else {
                continue;
            };
            let x1 = v.x[s1][c];
            let x2 = v.x[s2][c];
            model = model.with((y - x1).leq(0.0));
            model = model.with((y - x2).leq(0.0));
            model = model.with((y - x1 - x2).geq(-1.0));
        }
    }
    model
}

pub(crate) fn add_gender_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    v: &Vars,
    ratio: &GenderRatio,
) -> M {
    for (c, class) in prep.classes.iter().enumerate() {
        for (sex, frac) in [
            (types::Sex::M, ratio.m),
            (types::Sex::F, ratio.f),
        ] {
            let mut sum = Expression::from(0.0);
            for (s, student) in prep.students.iter().enumerate() {
                if student.sex == Some(sex) {
                    sum = sum + v.x[s][c];
                }
            }
            let bound = (frac * class.capacity as f64).floor();
            model = model.with(sum.leq(bound));
        }
    }
    model
}

/// Concentrate: confines all `attr=yes` students, system-wide, to at most
/// one class's worth of seats — the redesigned bound is the maximum of all
/// class capacities, not "the first class" (source's ambiguous bug, see
/// DESIGN.md OQ-A).
pub(crate) fn add_concentrate_constraint<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    v: &Vars,
    attribute: &str,
) -> M {
    let max_capacity = prep
        .classes
        .iter()
        .map(|c| c.capacity)
        .max()
        .unwrap_or(0) as f64;
    let mut sum = Expression::from(0.0);
    for (s, student) in prep.students.iter().enumerate() {
        if *student.categorical.get(attribute).unwrap_or(&false) {
            for c in 0..prep.classes.len() {
                sum = sum + v.x[s][c];
            }
        }
    }
    model = model.with(sum.leq(max_capacity));
    model
}

/// Spread: balances `attr=yes` students evenly across classes.
pub(crate) fn add_spread_constraint<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    v: &Vars,
    attribute: &str,
) -> M {
    let class_count = prep.classes.len().max(1) as f64;
    for (c, class) in prep.classes.iter().enumerate() {
        let mut sum = Expression::from(0.0);
        for (s, student) in prep.students.iter().enumerate() {
            if *student.categorical.get(attribute).unwrap_or(&false) {
                sum = sum + v.x[s][c];
            }
        }
        model = model.with(sum.leq(class.capacity as f64 / class_count));
    }
    model
}

pub(crate) fn extract_solution(
    prep: &Prep,
    v: &Vars,
    sol: &impl Solution,
) -> HashMap<String, Vec<String>> {
    let mut assignment: HashMap<String, Vec<String>> = prep
        .classes
        .iter()
        .map(|c| (c.id.0.clone(), Vec::new()))
        .collect();
    for (s, student) in prep.students.iter().enumerate() {
        for (c, class) in prep.classes.iter().enumerate() {
            if sol.value(v.x[s][c]) > 0.5 {
                assignment
                    .get_mut(class.id.0.as_str())
                    .unwrap()
                    .push(student.id.0.clone());
                break;
            }
        }
    }
    assignment
}

/// Every capacity constraint respected by a (possibly suboptimal) incumbent
/// — used by the B3 driver to decide whether a time-limited "feasible but
/// not proven optimal" solution can be accepted as-is.
pub(crate) fn respects_capacity(
    prep: &Prep,
    assignment: &HashMap<String, Vec<String>>,
) -> bool {
    prep.classes.iter().all(|c| {
        assignment
            .get(c.id.0.as_str())
            .map(|members| members.len() as u32 <= c.capacity)
            .unwrap_or(true)
    })
}

pub(crate) fn categorical_constraints<'a>(
    constraints: &'a [CategoricalConstraint],
) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut concentrate = Vec::new();
    let mut spread = Vec::new();
    for c in constraints {
        match c {
            CategoricalConstraint::Concentrate { attribute } => concentrate.push(attribute.as_str()),
            CategoricalConstraint::Spread { attribute } => spread.push(attribute.as_str()),
        }
    }
    (concentrate, spread)
}

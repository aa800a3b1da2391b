//! Strategy selector (Core B4).
//!
//! Grounded on `average_similarity()` / `detect_preference_type()` in
//! `student_sorting_algorithm.py`, with the density computed over unordered
//! preference pairs directly (the source's version walks combinations of
//! each student's own preference list instead, which checks whether two of
//! a student's preferred peers prefer each other rather than whether
//! preferences are mutual — spec.md's plain "both students list each
//! other" reading is used here; see DESIGN.md).

use std::collections::HashSet;
use types::Student;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Classification {
    Clustered,
    Random,
}

pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// [`DEFAULT_THRESHOLD`], overridable via environment for deployments that
/// want a different clustered/random cutoff without a request body change.
pub fn default_threshold() -> f64 {
    std::env::var("SCHOOLOPS__PARAMS__CLUSTER_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_THRESHOLD)
}

/// Fraction of unordered preference pairs (any student lists the other)
/// that are reciprocated (both list each other). Zero pairs classifies as
/// `Random` — there's nothing to cluster on.
pub fn reciprocal_density(students: &[Student]) -> f64 {
    let prefs: std::collections::HashMap<&str, HashSet<&str>> = students
        .iter()
        .map(|s| {
            (
                s.id.0.as_str(),
                s.preferences.iter().map(|p| p.0.as_str()).collect(),
            )
        })
        .collect();

    let mut pairs: HashSet<(&str, &str)> = HashSet::new();
    for s in students {
        for p in &s.preferences {
            let a = s.id.0.as_str();
            let b = p.0.as_str();
            if a == b {
                continue;
            }
            let key = if a < b { (a, b) } else { (b, a) };
            pairs.insert(key);
        }
    }

    if pairs.is_empty() {
        return 0.0;
    }

    let reciprocated = pairs
        .iter()
        .filter(|(a, b)| {
            prefs.get(a).is_some_and(|p| p.contains(b)) && prefs.get(b).is_some_and(|p| p.contains(a))
        })
        .count();

    reciprocated as f64 / pairs.len() as f64
}

pub fn classify(students: &[Student], threshold: f64) -> Classification {
    if reciprocal_density(students) >= threshold {
        Classification::Clustered
    } else {
        Classification::Random
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, prefs: &[&str]) -> Student {
        Student {
            id: id.into(),
            preferences: prefs.iter().map(|p| (*p).into()).collect(),
            sex: None,
            categorical: Default::default(),
        }
    }

    #[test]
    fn all_mutual_pairs_classify_clustered() {
        let students = vec![student("A", &["B"]), student("B", &["A"])];
        assert_eq!(reciprocal_density(&students), 1.0);
        assert_eq!(classify(&students, DEFAULT_THRESHOLD), Classification::Clustered);
    }

    #[test]
    fn one_sided_pairs_classify_random() {
        let students = vec![student("A", &["B"]), student("B", &[]), student("C", &[])];
        assert_eq!(reciprocal_density(&students), 0.0);
        assert_eq!(classify(&students, DEFAULT_THRESHOLD), Classification::Random);
    }

    #[test]
    fn no_preferences_is_random() {
        let students = vec![student("A", &[]), student("B", &[])];
        assert_eq!(classify(&students, DEFAULT_THRESHOLD), Classification::Random);
    }
}

//! Candidate-versus-skill scoring for the skills matrix and job matching.

use std::collections::{HashMap, HashSet};

use axum::{Extension, extract::State};
use serde::Deserialize;

use skillmatrix_db::models::{CandidateProfileRow, CandidateSkillRow, JobSkillRow, SkillRow};
use skillmatrix_types::api::{Claims, JobMatch, MatrixRow, SkillMatrix};

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Query};
use crate::state::{AppState, run_blocking};

pub const MAX_LEVEL: u8 = 5;
const DEFAULT_REQUIRED_LEVEL: u8 = 3;
const OPTIONAL_WEIGHT: f64 = 0.5;

/// One scored column: the candidate's level, the level that counts as full
/// marks, and the column's weight.
#[derive(Debug, Clone, Copy)]
pub struct Criterion {
    pub level: u8,
    pub target: u8,
    pub weight: f64,
}

/// Weighted mean of `min(level, target) / target`, as a rounded percentage.
/// No criteria scores 0.
pub fn match_score(criteria: &[Criterion]) -> u8 {
    let total_weight: f64 = criteria.iter().map(|c| c.weight).sum();
    if total_weight <= 0.0 {
        return 0;
    }

    let earned: f64 = criteria
        .iter()
        .map(|c| {
            let target = c.target.max(1);
            c.weight * f64::from(c.level.min(target)) / f64::from(target)
        })
        .sum();

    (earned / total_weight * 100.0).round().clamp(0.0, 100.0) as u8
}

fn clamp_level(raw: i64) -> u8 {
    raw.clamp(0, i64::from(MAX_LEVEL)) as u8
}

/// candidate id -> skill id -> level
fn level_index(skills: &[CandidateSkillRow]) -> HashMap<&str, HashMap<&str, u8>> {
    let mut index: HashMap<&str, HashMap<&str, u8>> = HashMap::new();
    for s in skills {
        index
            .entry(s.candidate_id.as_str())
            .or_default()
            .insert(s.skill_id.as_str(), clamp_level(s.proficiency_level));
    }
    index
}

fn display_name(full_name: Option<&str>, email: &str) -> String {
    full_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(email)
        .to_string()
}

/// Builds the matrix. `search` narrows the columns by name or category;
/// `selected` (skill ids) narrows them further and keeps only candidates
/// holding at least one selected skill. Rows are sorted by score, best first.
pub fn build_matrix(
    catalog: Vec<SkillRow>,
    candidates: &[CandidateProfileRow],
    candidate_skills: &[CandidateSkillRow],
    selected: &[String],
    search: Option<&str>,
) -> SkillMatrix {
    let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();

    let columns: Vec<SkillRow> = catalog
        .into_iter()
        .filter(|s| {
            needle.as_ref().is_none_or(|n| {
                s.name.to_lowercase().contains(n.as_str()) || s.category.to_lowercase().contains(n.as_str())
            })
        })
        .filter(|s| selected.is_empty() || selected.contains(s.id.as_str()))
        .collect();

    let levels_by_candidate = level_index(candidate_skills);
    let empty = HashMap::new();

    let mut rows: Vec<MatrixRow> = candidates
        .iter()
        .filter_map(|c| {
            let held = levels_by_candidate.get(c.id.as_str()).unwrap_or(&empty);
            let levels: Vec<u8> = columns
                .iter()
                .map(|s| held.get(s.id.as_str()).copied().unwrap_or(0))
                .collect();

            if !selected.is_empty() && levels.iter().all(|&l| l == 0) {
                return None;
            }

            let criteria: Vec<Criterion> = levels
                .iter()
                .map(|&level| Criterion { level, target: MAX_LEVEL, weight: 1.0 })
                .collect();

            Some(MatrixRow {
                candidate_id: convert::id(&c.id),
                name: display_name(c.full_name.as_deref(), &c.email),
                title: c.experience_level.clone(),
                match_score: match_score(&criteria),
                levels,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });

    SkillMatrix {
        skills: columns.into_iter().map(convert::skill).collect(),
        candidates: rows,
    }
}

/// Ranks candidates against a job's skills. Each skill's target is its
/// `required_level` (3 when unset) and optional skills count half. A skill
/// is matched when the candidate meets the target. Candidates with no
/// relevant skill are left out.
pub fn rank_job_matches(
    job_skills: &[JobSkillRow],
    candidates: &[CandidateProfileRow],
    candidate_skills: &[CandidateSkillRow],
) -> Vec<JobMatch> {
    if job_skills.is_empty() {
        return vec![];
    }

    let levels_by_candidate = level_index(candidate_skills);

    let mut matches: Vec<JobMatch> = candidates
        .iter()
        .filter_map(|c| {
            let held = levels_by_candidate.get(c.id.as_str())?;

            let mut criteria = Vec::with_capacity(job_skills.len());
            let mut matched = Vec::new();
            let mut missing = Vec::new();
            for js in job_skills {
                let level = held.get(js.skill_id.as_str()).copied().unwrap_or(0);
                let target = js
                    .required_level
                    .map(|l| clamp_level(l).max(1))
                    .unwrap_or(DEFAULT_REQUIRED_LEVEL);
                let weight = if js.is_required { 1.0 } else { OPTIONAL_WEIGHT };
                criteria.push(Criterion { level, target, weight });

                if level >= target {
                    matched.push(js.name.clone());
                } else {
                    missing.push(js.name.clone());
                }
            }

            let score = match_score(&criteria);
            if score == 0 {
                return None;
            }

            Some(JobMatch {
                candidate_id: convert::id(&c.id),
                name: display_name(c.full_name.as_deref(), &c.email),
                email: c.email.clone(),
                match_score: score,
                matched_skills: matched,
                missing_skills: missing,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.match_score.cmp(&a.match_score).then_with(|| a.name.cmp(&b.name)));
    matches
}

#[derive(Debug, Deserialize)]
pub struct MatrixQuery {
    /// Comma-separated skill ids.
    pub skills: Option<String>,
    pub search: Option<String>,
}

pub async fn skill_matrix(
    State(state): State<AppState>,
    Query(query): Query<MatrixQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<SkillMatrix>, ApiError> {
    let selected: Vec<String> = query
        .skills
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let (catalog, candidates, candidate_skills) = run_blocking(&state, |db| {
        Ok((
            db.list_skills(None)?,
            db.list_candidate_profiles()?,
            db.list_all_candidate_skills()?,
        ))
    })
    .await?;

    Ok(Json(build_matrix(
        catalog,
        &candidates,
        &candidate_skills,
        &selected,
        query.search.as_deref(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(id: &str, name: &str, category: &str) -> SkillRow {
        SkillRow {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            description: None,
            parent_id: None,
        }
    }

    fn person(id: &str, name: Option<&str>) -> CandidateProfileRow {
        CandidateProfileRow {
            id: id.into(),
            full_name: name.map(str::to_string),
            email: format!("{id}@example.com"),
            experience_level: None,
        }
    }

    fn holds(candidate: &str, skill: &str, level: i64) -> CandidateSkillRow {
        CandidateSkillRow {
            candidate_id: candidate.into(),
            skill_id: skill.into(),
            name: skill.into(),
            category: "Test".into(),
            proficiency_level: level,
            years_experience: None,
            is_primary: false,
        }
    }

    fn needs(skill: &str, level: Option<i64>, required: bool) -> JobSkillRow {
        JobSkillRow {
            job_id: "j1".into(),
            skill_id: skill.into(),
            name: skill.into(),
            category: "Test".into(),
            is_required: required,
            required_level: level,
        }
    }

    #[test]
    fn score_is_mean_of_capped_ratios() {
        let full = Criterion { level: 5, target: 5, weight: 1.0 };
        let half = Criterion { level: 2, target: 4, weight: 1.0 };
        let over = Criterion { level: 5, target: 3, weight: 1.0 };
        assert_eq!(match_score(&[full, half]), 75);
        assert_eq!(match_score(&[over]), 100);
        assert_eq!(match_score(&[]), 0);

        let optional_miss = Criterion { level: 0, target: 3, weight: 0.5 };
        assert_eq!(match_score(&[full, optional_miss]), 67);
    }

    #[test]
    fn matrix_orders_by_score_then_name() {
        let catalog = vec![skill("react", "React", "Frontend"), skill("aws", "AWS", "Cloud")];
        let people = vec![person("c1", Some("Zoe")), person("c2", Some("Adam")), person("c3", None)];
        let held = vec![holds("c1", "react", 5), holds("c2", "react", 5), holds("c3", "aws", 1)];

        let matrix = build_matrix(catalog, &people, &held, &[], None);
        let names: Vec<&str> = matrix.candidates.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Adam", "Zoe", "c3@example.com"]);
        assert_eq!(matrix.candidates[0].match_score, 50);
        assert_eq!(matrix.candidates[0].levels, vec![5, 0]);
    }

    #[test]
    fn selection_filters_columns_and_candidates() {
        let catalog = || vec![skill("react", "React", "Frontend"), skill("aws", "AWS", "Cloud")];
        let people = vec![person("c1", Some("Zoe")), person("c2", Some("Adam"))];
        let held = vec![holds("c1", "react", 4), holds("c2", "aws", 3)];

        let matrix = build_matrix(catalog(), &people, &held, &["aws".to_string()], None);
        assert_eq!(matrix.skills.len(), 1);
        assert_eq!(matrix.candidates.len(), 1);
        assert_eq!(matrix.candidates[0].name, "Adam");
        assert_eq!(matrix.candidates[0].match_score, 60);

        let searched = build_matrix(catalog(), &people, &held, &[], Some("front"));
        assert_eq!(searched.skills.len(), 1);
        assert_eq!(searched.skills[0].name, "React");
        assert_eq!(searched.candidates.len(), 2);
    }

    #[test]
    fn job_matches_use_required_levels() {
        let job = vec![needs("react", None, true), needs("aws", Some(4), false)];
        let people = vec![person("c1", Some("Zoe")), person("c2", Some("Adam")), person("c3", Some("Nobody"))];
        let held = vec![holds("c1", "react", 3), holds("c2", "aws", 4)];

        let ranked = rank_job_matches(&job, &people, &held);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].name, "Zoe");
        assert_eq!(ranked[0].match_score, 67);
        assert_eq!(ranked[0].matched_skills, vec!["react"]);
        assert_eq!(ranked[0].missing_skills, vec!["aws"]);
        assert_eq!(ranked[1].match_score, 33);

        assert!(rank_job_matches(&[], &people, &held).is_empty());
    }
}

//! Pure execution planning.
//!
//! The classifier's output is advisory. `resolve_plan` re-derives the phase list
//! from it with fixed ordering and dependency rules, so the same decision and
//! session state always produce the same plan.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::lenient::{flag, optional_positive_int, optional_text, string_list};
use crate::models::{Phase, Session};

/// Raw flags as returned by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawControls {
    #[serde(default, deserialize_with = "string_list")]
    pub phase_sequence: Vec<String>,
    #[serde(default, deserialize_with = "flag")]
    pub allow_jd_incomplete: bool,
    #[serde(default, deserialize_with = "flag")]
    pub screen_again: bool,
    #[serde(default, deserialize_with = "flag")]
    pub new_job_search: bool,
    #[serde(default, deserialize_with = "flag")]
    pub update_jd: bool,
}

/// Classifier result: phase labels, flag hints and optional extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    #[serde(default)]
    pub query_controls: RawControls,
    #[serde(default, deserialize_with = "optional_positive_int")]
    pub top_k_hint: Option<i64>,
    #[serde(default, deserialize_with = "optional_text")]
    pub reasoning: Option<String>,
}

#[cfg(test)]
impl RoutingDecision {
    pub fn phases(labels: &[&str]) -> Self {
        Self {
            query_controls: RawControls {
                phase_sequence: labels.iter().map(|l| l.to_string()).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Session facts the planner depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanContext {
    pub has_job_snapshot: bool,
    pub job_snapshot_complete: bool,
    pub has_screening_result: bool,
}

impl PlanContext {
    pub fn from_session(session: &Session) -> Self {
        Self {
            has_job_snapshot: session.job_snapshot.is_some(),
            job_snapshot_complete: session
                .job_snapshot
                .as_ref()
                .is_some_and(|s| s.is_complete()),
            has_screening_result: session.screening_result.is_some(),
        }
    }
}

/// Tunable boundary for fuzzy classifier hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterPolicy {
    /// When false, `new_job_search` hints are ignored and context is never reset.
    pub honor_new_job_search: bool,
    /// When true, `discussion` is dropped unless a screening result exists or is planned.
    pub discussion_requires_results: bool,
}

impl Default for RouterPolicy {
    fn default() -> Self {
        Self {
            honor_new_job_search: true,
            discussion_requires_results: false,
        }
    }
}

/// Derived per-turn flags. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlFlags {
    pub phase_sequence: Vec<Phase>,
    pub allow_jd_incomplete: bool,
    pub screen_again: bool,
    pub new_job_search: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub flags: ControlFlags,
    pub top_k_hint: Option<i64>,
    /// Human-readable notes for every change made to the classifier's request.
    pub adjustments: Vec<String>,
}

impl ExecutionPlan {
    pub fn phases(&self) -> &[Phase] {
        &self.flags.phase_sequence
    }
}

pub fn resolve_plan(
    decision: &RoutingDecision,
    ctx: &PlanContext,
    policy: &RouterPolicy,
) -> ExecutionPlan {
    let raw = &decision.query_controls;
    let mut adjustments = Vec::new();

    let new_job_search = if raw.new_job_search && !policy.honor_new_job_search {
        adjustments.push("ignored new_job_search hint (disabled by policy)".to_string());
        false
    } else {
        raw.new_job_search
    };

    let mut requested: BTreeSet<Phase> = BTreeSet::new();
    for label in &raw.phase_sequence {
        match Phase::parse(label) {
            Some(phase) => {
                requested.insert(phase);
            }
            None => adjustments.push(format!("dropped unknown phase label '{label}'")),
        }
    }

    if requested.is_empty() {
        let phase = fallback_phase(raw, new_job_search, ctx);
        adjustments.push(format!(
            "no phases requested; fell back to {}",
            phase.as_str()
        ));
        requested.insert(phase);
    }

    if new_job_search && requested.insert(Phase::JobDescription) {
        adjustments.push("added job_description for new_job_search".to_string());
    }
    if raw.screen_again && requested.insert(Phase::Screening) {
        adjustments.push("added screening for screen_again".to_string());
    }

    // A reset snapshot counts as absent for the dependency rule.
    let has_snapshot = ctx.has_job_snapshot && !new_job_search;
    if requested.contains(&Phase::Screening)
        && !has_snapshot
        && !requested.contains(&Phase::JobDescription)
        && !raw.allow_jd_incomplete
    {
        requested.insert(Phase::JobDescription);
        adjustments.push("inserted job_description before screening (no job snapshot)".to_string());
    }

    if policy.discussion_requires_results
        && requested.contains(&Phase::Discussion)
        && !requested.contains(&Phase::Screening)
        && (!ctx.has_screening_result || new_job_search)
    {
        requested.remove(&Phase::Discussion);
        adjustments.push("dropped discussion (no screening results yet)".to_string());
        if requested.is_empty() {
            requested.insert(Phase::JobDescription);
        }
    }

    ExecutionPlan {
        flags: ControlFlags {
            // BTreeSet iterates in canonical phase order.
            phase_sequence: requested.into_iter().collect(),
            allow_jd_incomplete: raw.allow_jd_incomplete,
            screen_again: raw.screen_again,
            new_job_search,
        },
        top_k_hint: decision.top_k_hint,
        adjustments,
    }
}

fn fallback_phase(raw: &RawControls, new_job_search: bool, ctx: &PlanContext) -> Phase {
    if new_job_search || raw.update_jd || !ctx.has_job_snapshot {
        Phase::JobDescription
    } else if raw.screen_again || raw.allow_jd_incomplete || ctx.job_snapshot_complete {
        Phase::Screening
    } else if ctx.has_screening_result {
        Phase::Discussion
    } else {
        Phase::JobDescription
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(snapshot: bool, complete: bool, screening: bool) -> PlanContext {
        PlanContext {
            has_job_snapshot: snapshot,
            job_snapshot_complete: complete,
            has_screening_result: screening,
        }
    }

    fn plan(decision: &RoutingDecision, ctx: PlanContext) -> Vec<Phase> {
        resolve_plan(decision, &ctx, &RouterPolicy::default())
            .phases()
            .to_vec()
    }

    #[test]
    fn test_screening_without_snapshot_gets_job_description_first() {
        let decision = RoutingDecision::phases(&["screening"]);
        assert_eq!(
            plan(&decision, ctx(false, false, false)),
            vec![Phase::JobDescription, Phase::Screening]
        );
    }

    #[test]
    fn test_allow_jd_incomplete_skips_insertion() {
        let mut decision = RoutingDecision::phases(&["screening"]);
        decision.query_controls.allow_jd_incomplete = true;
        assert_eq!(plan(&decision, ctx(false, false, false)), vec![Phase::Screening]);
    }

    #[test]
    fn test_screening_with_snapshot_runs_alone() {
        let decision = RoutingDecision::phases(&["screening"]);
        assert_eq!(plan(&decision, ctx(true, true, false)), vec![Phase::Screening]);
    }

    #[test]
    fn test_new_job_search_treats_snapshot_as_absent() {
        let mut decision = RoutingDecision::phases(&["screening"]);
        decision.query_controls.new_job_search = true;
        let resolved = resolve_plan(&decision, &ctx(true, true, true), &RouterPolicy::default());
        assert_eq!(
            resolved.phases(),
            &[Phase::JobDescription, Phase::Screening]
        );
        assert!(resolved.flags.new_job_search);
    }

    #[test]
    fn test_new_job_search_ignored_by_policy() {
        let mut decision = RoutingDecision::phases(&["screening"]);
        decision.query_controls.new_job_search = true;
        let policy = RouterPolicy {
            honor_new_job_search: false,
            ..Default::default()
        };
        let resolved = resolve_plan(&decision, &ctx(true, true, true), &policy);
        assert_eq!(resolved.phases(), &[Phase::Screening]);
        assert!(!resolved.flags.new_job_search);
    }

    #[test]
    fn test_screen_again_adds_screening_only() {
        let mut decision = RoutingDecision::phases(&["discussion"]);
        decision.query_controls.screen_again = true;
        assert_eq!(
            plan(&decision, ctx(true, true, true)),
            vec![Phase::Screening, Phase::Discussion]
        );
    }

    #[test]
    fn test_order_is_canonical_and_deduplicated() {
        let decision =
            RoutingDecision::phases(&["discussion", "screening", "job_description", "screening"]);
        assert_eq!(
            plan(&decision, ctx(true, true, true)),
            vec![Phase::JobDescription, Phase::Screening, Phase::Discussion]
        );
    }

    #[test]
    fn test_unknown_labels_dropped_then_fallback() {
        let decision = RoutingDecision::phases(&["summarize"]);
        let resolved = resolve_plan(&decision, &ctx(false, false, false), &RouterPolicy::default());
        assert_eq!(resolved.phases(), &[Phase::JobDescription]);
        assert_eq!(resolved.adjustments.len(), 2);
    }

    #[test]
    fn test_fallback_ladder() {
        let empty = RoutingDecision::default();
        assert_eq!(plan(&empty, ctx(false, false, false)), vec![Phase::JobDescription]);
        assert_eq!(plan(&empty, ctx(true, true, false)), vec![Phase::Screening]);
        assert_eq!(plan(&empty, ctx(true, false, true)), vec![Phase::Discussion]);
        assert_eq!(plan(&empty, ctx(true, false, false)), vec![Phase::JobDescription]);

        let mut update = RoutingDecision::default();
        update.query_controls.update_jd = true;
        assert_eq!(plan(&update, ctx(true, true, true)), vec![Phase::JobDescription]);
    }

    #[test]
    fn test_discussion_requires_results_policy() {
        let decision = RoutingDecision::phases(&["discussion"]);
        let policy = RouterPolicy {
            discussion_requires_results: true,
            ..Default::default()
        };
        let resolved = resolve_plan(&decision, &ctx(true, false, false), &policy);
        assert_eq!(resolved.phases(), &[Phase::JobDescription]);

        let resolved = resolve_plan(&decision, &ctx(true, false, true), &policy);
        assert_eq!(resolved.phases(), &[Phase::Discussion]);
    }

    #[test]
    fn test_planning_is_deterministic() {
        let mut decision = RoutingDecision::phases(&["screening", "discussion"]);
        decision.query_controls.screen_again = true;
        decision.top_k_hint = Some(3);
        let c = ctx(true, false, true);
        let first = resolve_plan(&decision, &c, &RouterPolicy::default());
        let second = resolve_plan(&decision, &c, &RouterPolicy::default());
        assert_eq!(first, second);
        assert_eq!(first.top_k_hint, Some(3));
    }

    #[test]
    fn test_decision_parses_loose_llm_output() {
        let decision: RoutingDecision = serde_json::from_str(
            r#"{
                "query_controls": {"phase_sequence": "screening", "screen_again": "true"},
                "top_k_hint": "3",
                "reasoning": "user asked to rescreen"
            }"#,
        )
        .unwrap();
        assert_eq!(decision.query_controls.phase_sequence, vec!["screening"]);
        assert!(decision.query_controls.screen_again);
        assert_eq!(decision.top_k_hint, Some(3));
    }
}

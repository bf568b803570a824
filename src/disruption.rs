//! Route-scoped disruption alerts (the legacy risk path).
//!
//! Unlike a city-scoped [`crate::risk::RiskSignal`], an alert names the
//! exact route(s) it impacts. Alerts arrive as JSON records or are extracted
//! from free text; extraction that cannot identify a target route is an
//! explicit error, never a substituted default.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::cost::apply_multiplier;

/// `target_route_id` may be a single id or a list in the wire format.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RouteTargets {
    One(u32),
    Many(Vec<u32>),
}

impl RouteTargets {
    pub fn ids(&self) -> Vec<u32> {
        match self {
            RouteTargets::One(id) => vec![*id],
            RouteTargets::Many(ids) => ids.clone(),
        }
    }
}

/// A disruption alert targeting specific routes.
#[derive(Debug, Clone, Deserialize)]
pub struct DisruptionEvent {
    pub target_route_id: RouteTargets,
    pub impact_type: String,
    #[serde(default = "default_multiplier")]
    pub cost_multiplier: f64,
    #[serde(default)]
    pub severity_score: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no target route identified in input text")]
    NoTargetRoutes,
    #[error("alert record malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse a JSON list of alert records.
pub fn parse_alerts(json: &str) -> Result<Vec<DisruptionEvent>, ExtractError> {
    Ok(serde_json::from_str(json)?)
}

/// Apply each alert's multiplier to exactly its targeted routes.
pub fn apply_alerts(costs: &mut HashMap<u32, f64>, alerts: &[DisruptionEvent]) {
    for alert in alerts {
        apply_multiplier(costs, &alert.ids(), alert.cost_multiplier);
    }
}

impl DisruptionEvent {
    pub fn ids(&self) -> Vec<u32> {
        self.target_route_id.ids()
    }
}

/// Impact keywords recognized by text extraction, with their multipliers.
const IMPACT_KEYWORDS: &[(&str, f64)] = &[
    ("collapse", 20.0),
    ("closed", 20.0),
    ("blocked", 20.0),
    ("earthquake", 20.0),
    ("flood", 10.0),
    ("fire", 10.0),
    ("spill", 10.0),
    ("accident", 10.0),
    ("strike", 5.0),
    ("protest", 5.0),
    ("delay", 2.0),
    ("congestion", 2.0),
];

/// Extract disruption alerts from free text.
///
/// Looks for `route <N>` mentions and pairs them with the heaviest impact
/// keyword present. Text naming no route at all fails with
/// [`ExtractError::NoTargetRoutes`]; guessing a default route set here has
/// caused silent mis-planning before.
pub fn extract_from_text(text: &str) -> Result<Vec<DisruptionEvent>, ExtractError> {
    let lower = text.to_lowercase();
    let targets = route_mentions(&lower);
    if targets.is_empty() {
        return Err(ExtractError::NoTargetRoutes);
    }

    let (impact_type, multiplier) = IMPACT_KEYWORDS
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|&(keyword, weight)| (keyword.to_string(), weight))
        .unwrap_or_else(|| ("unspecified".to_string(), 2.0));

    Ok(vec![DisruptionEvent {
        target_route_id: RouteTargets::Many(targets),
        severity_score: (multiplier / 2.0).min(10.0),
        impact_type,
        cost_multiplier: multiplier,
    }])
}

/// Route ids named as `route <N>` in lowercased text, deduplicated in order
/// of first mention.
fn route_mentions(lower: &str) -> Vec<u32> {
    let mut ids = Vec::new();
    let tokens: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || c == ',' || c == '.' || c == ';')
        .filter(|t| !t.is_empty())
        .collect();

    for window in tokens.windows(2) {
        if window[0] == "route" {
            if let Ok(id) = window[1].parse::<u32>() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

//! Route selection and plan construction.

use std::collections::HashMap;

use tracing::info;

use crate::cost::CostModel;
use crate::disruption::DisruptionEvent;
use crate::registry::RouteGraphRegistry;

/// A plan assigns a quantity to every route serving the destination; unused
/// routes carry zero.
pub type Plan = HashMap<u32, u32>;

/// Outcome of mitigated route selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub route_id: u32,
    /// Set when a budget was supplied and no candidate satisfied it, forcing
    /// fall-back to the globally cheapest route.
    pub budget_exceeded: bool,
}

/// Baseline selection: always the city's primary route, ignoring risk.
pub fn select_baseline(registry: &RouteGraphRegistry, city: &str) -> Option<u32> {
    registry.primary_route_for_city(city)
}

/// Mitigated selection: the minimum-cost route among `candidates` under the
/// current cost map. A budget (total cost for `quantity` units) filters
/// candidates first; when nothing fits, selection falls back to the cheapest
/// route overall and flags the budget as exceeded.
pub fn select_mitigated(
    candidates: &[u32],
    costs: &HashMap<u32, f64>,
    quantity: u32,
    budget: Option<f64>,
) -> Option<Selection> {
    if candidates.is_empty() {
        return None;
    }

    let cheapest = |ids: &[u32]| -> Option<u32> {
        ids.iter()
            .copied()
            .min_by(|a, b| cost_of(costs, *a).total_cmp(&cost_of(costs, *b)))
    };

    if let Some(budget) = budget {
        let within: Vec<u32> = candidates
            .iter()
            .copied()
            .filter(|id| cost_of(costs, *id) * f64::from(quantity) <= budget)
            .collect();
        if let Some(route_id) = cheapest(&within) {
            return Some(Selection {
                route_id,
                budget_exceeded: false,
            });
        }
        let route_id = cheapest(candidates)?;
        info!(route_id, budget, "no route within budget, using cheapest");
        return Some(Selection {
            route_id,
            budget_exceeded: true,
        });
    }

    cheapest(candidates).map(|route_id| Selection {
        route_id,
        budget_exceeded: false,
    })
}

/// Assign the full quantity to the selected route in each plan and zero to
/// every other route serving the city.
pub fn build_plans(
    candidates: &[u32],
    quantity: u32,
    baseline_route: u32,
    mitigated_route: u32,
) -> (Plan, Plan) {
    let mut baseline = Plan::new();
    let mut mitigated = Plan::new();
    for &id in candidates {
        baseline.insert(id, if id == baseline_route { quantity } else { 0 });
        mitigated.insert(id, if id == mitigated_route { quantity } else { 0 });
    }
    (baseline, mitigated)
}

/// Legacy alert-driven solve over the whole predefined network: for every
/// predefined destination, the baseline winner is the cheapest route at base
/// cost and the mitigated winner the cheapest after alert multipliers.
pub fn solve_with_alerts(
    registry: &RouteGraphRegistry,
    cost_model: &CostModel,
    alerts: &[DisruptionEvent],
) -> (Plan, Plan) {
    let destinations = registry.predefined_cities();
    let mut catalog = Vec::new();
    for city in &destinations {
        catalog.extend(registry.city_catalog(city));
    }

    let base_costs = cost_model.cost_map(&catalog);
    let mut current_costs = base_costs.clone();
    crate::disruption::apply_alerts(&mut current_costs, alerts);

    let mut baseline = Plan::new();
    let mut mitigated = Plan::new();
    for city in &destinations {
        let options = registry.routes_for_city(city);
        if options.is_empty() {
            continue;
        }
        let quantity = registry.config().demand_for(city);
        let winner_base = options
            .iter()
            .copied()
            .min_by(|a, b| cost_of(&base_costs, *a).total_cmp(&cost_of(&base_costs, *b)));
        let winner_now = options
            .iter()
            .copied()
            .min_by(|a, b| cost_of(&current_costs, *a).total_cmp(&cost_of(&current_costs, *b)));
        let (Some(winner_base), Some(winner_now)) = (winner_base, winner_now) else {
            continue;
        };
        for id in options {
            baseline.insert(id, if id == winner_base { quantity } else { 0 });
            mitigated.insert(id, if id == winner_now { quantity } else { 0 });
        }
    }

    (baseline, mitigated)
}

/// Missing cost entries sort last so they are never selected over a priced
/// route.
fn cost_of(costs: &HashMap<u32, f64>, id: u32) -> f64 {
    costs.get(&id).copied().unwrap_or(f64::MAX)
}

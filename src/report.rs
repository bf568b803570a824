//! Impact report: per-route diff between the baseline and mitigated plans.

use crate::cost::{CostModel, Currency};
use crate::optimizer::Plan;
use crate::registry::{Route, RouteGraphRegistry};

/// How a route's assignment changed between the two plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    /// Was used, now carries nothing.
    Stopped,
    /// Was idle, now carries the shipment.
    Activated,
    /// Same nonzero assignment on both sides.
    Unchanged,
    /// Idle in both plans.
    Available,
    /// Nonzero on both sides but different.
    Adjusted,
}

impl RouteStatus {
    fn of(initial: u32, fin: u32) -> Self {
        match (initial, fin) {
            (0, 0) => RouteStatus::Available,
            (0, _) => RouteStatus::Activated,
            (_, 0) => RouteStatus::Stopped,
            (a, b) if a == b => RouteStatus::Unchanged,
            _ => RouteStatus::Adjusted,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RouteStatus::Stopped => "STOPPED",
            RouteStatus::Activated => "ACTIVATED",
            RouteStatus::Unchanged => "UNCHANGED",
            RouteStatus::Available => "AVAILABLE",
            RouteStatus::Adjusted => "ADJUSTED",
        }
    }
}

/// One row of the impact report.
#[derive(Debug, Clone)]
pub struct RouteImpact {
    pub route_id: u32,
    pub destination: String,
    pub route_type: &'static str,
    pub path: String,
    pub cost_per_unit: f64,
    /// Cost rendered in the destination's currency and digit grouping.
    pub cost_display: String,
    pub initial_qty: u32,
    pub final_qty: u32,
    pub status: RouteStatus,
}

/// Diff the two plans across every route the registry knows for the
/// destination(s), grouped by destination then ordered by route id.
///
/// With `filter_destination` set, only that city's routes are reported.
pub fn impact_report(
    registry: &RouteGraphRegistry,
    cost_model: &CostModel,
    baseline: &Plan,
    mitigated: &Plan,
    filter_destination: Option<&str>,
) -> Vec<RouteImpact> {
    let destinations: Vec<String> = match filter_destination {
        Some(city) => vec![city.to_string()],
        None => {
            let mut cities: Vec<String> = baseline
                .keys()
                .chain(mitigated.keys())
                .filter_map(|id| registry.route_details(*id))
                .map(|route| route.destination().to_string())
                .collect();
            cities.sort();
            cities.dedup();
            cities
        }
    };

    let mut rows = Vec::new();
    for city in &destinations {
        let currency = Currency::for_city(city);
        for route in registry.city_catalog(city) {
            rows.push(impact_row(&route, cost_model, baseline, mitigated, currency));
        }
    }
    rows
}

fn impact_row(
    route: &Route,
    cost_model: &CostModel,
    baseline: &Plan,
    mitigated: &Plan,
    currency: Currency,
) -> RouteImpact {
    let initial_qty = baseline.get(&route.id).copied().unwrap_or(0);
    let final_qty = mitigated.get(&route.id).copied().unwrap_or(0);
    let cost_per_unit = cost_model.unit_cost(route);

    RouteImpact {
        route_id: route.id,
        destination: route.destination().to_string(),
        route_type: if route.is_multihop() {
            "Multi-Hop"
        } else {
            "Direct"
        },
        path: route.path(),
        cost_per_unit,
        cost_display: currency.format(currency.from_usd(cost_per_unit)),
        initial_qty,
        final_qty,
        status: RouteStatus::of(initial_qty, final_qty),
    }
}

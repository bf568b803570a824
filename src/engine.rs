//! Shipment planning engine.
//!
//! Drives the full pipeline for one parsed shipment requirement: route
//! materialization, risk resolution, cost computation, baseline/mitigated
//! selection, and the impact report.

use thiserror::Error;
use tracing::info;

use crate::config::USD_TO_INR_RATE;
use crate::cost::{CostModel, Currency, apply_multiplier};
use crate::optimizer::{Plan, build_plans, select_baseline, select_mitigated};
use crate::registry::RouteGraphRegistry;
use crate::report::{RouteImpact, impact_report};
use crate::risk::{RiskError, RiskResolver, RiskSignal};

/// A budget constraint as parsed from the request, tagged with its currency.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub amount: f64,
    pub currency: Currency,
}

impl Budget {
    /// Amount in the base unit (USD) used by the cost maps.
    fn as_usd(&self) -> f64 {
        match self.currency {
            Currency::Usd => self.amount,
            Currency::Inr => self.amount / USD_TO_INR_RATE,
        }
    }
}

/// A parsed shipment requirement, produced by an external parser and
/// consumed read-only.
#[derive(Debug, Clone, Default)]
pub struct ShipmentRequirement {
    pub destination: Option<String>,
    pub quantity: Option<u32>,
    pub budget: Option<Budget>,
    pub date: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown destination in shipment requirement")]
    UnknownDestination,
    #[error(transparent)]
    Risk(#[from] RiskError),
}

/// Result of planning one shipment.
#[derive(Debug)]
pub struct ShipmentOutcome {
    pub destination: String,
    pub quantity: u32,
    /// Delivery target carried through from the requirement.
    pub date: Option<String>,
    /// Priority level carried through from the requirement.
    pub priority: Option<String>,
    pub baseline_route: u32,
    pub mitigated_route: u32,
    pub baseline_plan: Plan,
    pub mitigated_plan: Plan,
    pub risk: Option<RiskSignal>,
    pub risk_summary: String,
    pub budget_exceeded: bool,
    pub report: Vec<RouteImpact>,
}

impl ShipmentOutcome {
    /// Whether mitigation moved the shipment off the baseline route.
    pub fn rerouted(&self) -> bool {
        self.baseline_route != self.mitigated_route
    }
}

/// The disruption-aware planner. Owns the route registry and cost model;
/// risk resolution is injected as a strategy.
pub struct MitigationEngine<R> {
    registry: RouteGraphRegistry,
    cost_model: CostModel,
    resolver: R,
}

impl<R: RiskResolver> MitigationEngine<R> {
    pub fn new(registry: RouteGraphRegistry, cost_model: CostModel, resolver: R) -> Self {
        Self {
            registry,
            cost_model,
            resolver,
        }
    }

    pub fn registry(&self) -> &RouteGraphRegistry {
        &self.registry
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Plan one shipment end to end.
    pub fn plan_shipment(
        &self,
        requirement: &ShipmentRequirement,
    ) -> Result<ShipmentOutcome, EngineError> {
        let destination = requirement
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(EngineError::UnknownDestination)?;

        let candidates = self
            .registry
            .ensure_routes_for_city(destination, true);
        info!(
            destination,
            routes = candidates.len(),
            predefined = self.registry.is_predefined_city(destination),
            "routes materialized"
        );

        let risk = self.resolver.resolve_risk(destination)?;

        let catalog = self.registry.city_catalog(destination);
        let mut costs = self.cost_model.cost_map(&catalog);

        // Risk inflates only the primary route; backups keep base cost so
        // rerouting stays possible.
        if let Some(signal) = &risk {
            if let Some(primary) = self.registry.primary_route_for_city(destination) {
                apply_multiplier(&mut costs, &[primary], signal.multiplier);
                info!(
                    destination,
                    primary,
                    multiplier = signal.multiplier,
                    source = signal.source.label(),
                    "risk multiplier applied to primary route"
                );
            }
        }

        let quantity = requirement
            .quantity
            .unwrap_or_else(|| self.registry.config().demand_for(destination));
        if let Some(date) = &requirement.date {
            info!(destination, date, "delivery target requested");
        }
        if let Some(priority) = &requirement.priority {
            info!(destination, priority, "priority level requested");
        }

        let baseline_route = select_baseline(&self.registry, destination)
            .ok_or(EngineError::UnknownDestination)?;
        let selection = select_mitigated(
            &candidates,
            &costs,
            quantity,
            requirement.budget.map(|b| b.as_usd()),
        )
        .ok_or(EngineError::UnknownDestination)?;

        if selection.route_id != baseline_route {
            info!(
                destination,
                from = baseline_route,
                to = selection.route_id,
                "rerouted due to risk conditions"
            );
        }

        let (baseline_plan, mitigated_plan) =
            build_plans(&candidates, quantity, baseline_route, selection.route_id);

        let risk_summary = match &risk {
            Some(signal) => format!(
                "ALERT: {}. Costs spiked {}x. Source: {}.",
                signal.reason,
                signal.multiplier,
                signal.source.label().to_uppercase()
            ),
            None => "No Risks Detected. Standard Route Safe.".to_string(),
        };

        let report = impact_report(
            &self.registry,
            &self.cost_model,
            &baseline_plan,
            &mitigated_plan,
            Some(destination),
        );

        Ok(ShipmentOutcome {
            destination: destination.to_string(),
            quantity,
            date: requirement.date.clone(),
            priority: requirement.priority.clone(),
            baseline_route,
            mitigated_route: selection.route_id,
            baseline_plan,
            mitigated_plan,
            risk,
            risk_summary,
            budget_exceeded: selection.budget_exceeded,
            report,
        })
    }
}

//! Route graph registry: on-demand, thread-safe route creation per city.
//!
//! Routes are created exactly once per (city, warehouse[, hub]) combination
//! and are immutable afterwards. The registry is an explicit object owned by
//! the engine; construct it once and share it by reference across caller
//! threads.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::{DYNAMIC_DIRECT_START_ID, MULTIHOP_START_ID, NetworkConfig};

/// Shape of a route: single hop from a warehouse, or routed through a
/// distribution hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    Direct {
        warehouse: String,
        destination: String,
    },
    MultiHop {
        warehouse: String,
        hub: String,
        destination: String,
    },
}

/// An immutable route record. Distance and rate are nominal values used when
/// the cost dataset has no row for this id.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: u32,
    pub kind: RouteKind,
    pub distance_km: f64,
    pub cost_per_km: f64,
    pub is_primary: bool,
}

impl Route {
    pub fn destination(&self) -> &str {
        match &self.kind {
            RouteKind::Direct { destination, .. } => destination,
            RouteKind::MultiHop { destination, .. } => destination,
        }
    }

    pub fn is_multihop(&self) -> bool {
        matches!(self.kind, RouteKind::MultiHop { .. })
    }

    /// Human-readable path, e.g. `Warehouse_North -> Hub_Memphis -> Seattle`.
    pub fn path(&self) -> String {
        match &self.kind {
            RouteKind::Direct {
                warehouse,
                destination,
            } => format!("{warehouse} -> {destination}"),
            RouteKind::MultiHop {
                warehouse,
                hub,
                destination,
            } => format!("{warehouse} -> {hub} -> {destination}"),
        }
    }
}

/// Aggregate counts over the current route graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSummary {
    pub cities: usize,
    pub direct_routes: usize,
    pub multihop_routes: usize,
}

#[derive(Debug)]
struct CityRoutes {
    route_ids: Vec<u32>,
    has_multihop: bool,
}

#[derive(Debug)]
struct Inner {
    routes: HashMap<u32, Route>,
    cities: HashMap<String, CityRoutes>,
    next_direct_id: u32,
    next_multihop_id: u32,
}

/// Thread-safe registry over the global route graph.
///
/// Reads of already-created cities take the shared lock only; creation takes
/// the exclusive lock and re-checks, so concurrent first-time requests for
/// the same city observe a single consistent route set.
#[derive(Debug)]
pub struct RouteGraphRegistry {
    config: NetworkConfig,
    inner: RwLock<Inner>,
}

impl RouteGraphRegistry {
    /// Build a registry seeded with the predefined legacy routes.
    pub fn new(config: NetworkConfig) -> Self {
        let mut inner = Inner {
            routes: HashMap::new(),
            cities: HashMap::new(),
            next_direct_id: DYNAMIC_DIRECT_START_ID,
            next_multihop_id: MULTIHOP_START_ID,
        };

        for seed in &config.predefined {
            let route = Route {
                id: seed.id,
                kind: RouteKind::Direct {
                    warehouse: seed.warehouse.to_string(),
                    destination: seed.destination.to_string(),
                },
                distance_km: nominal_direct_distance(0),
                cost_per_km: BASE_COST_PER_KM,
                is_primary: seed.is_primary,
            };
            inner.routes.insert(seed.id, route);
            inner
                .cities
                .entry(seed.destination.to_string())
                .or_insert_with(|| CityRoutes {
                    route_ids: Vec::new(),
                    has_multihop: false,
                })
                .route_ids
                .push(seed.id);
        }

        Self {
            config,
            inner: RwLock::new(inner),
        }
    }

    /// Whether the city was seeded from the predefined table.
    pub fn is_predefined_city(&self, city: &str) -> bool {
        self.config
            .predefined
            .iter()
            .any(|seed| seed.destination == city)
    }

    /// Distinct destinations in the predefined table, sorted.
    pub fn predefined_cities(&self) -> Vec<String> {
        let mut cities: Vec<String> = self
            .config
            .predefined
            .iter()
            .map(|seed| seed.destination.to_string())
            .collect();
        cities.sort();
        cities.dedup();
        cities
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Idempotently create and return all route ids serving `city`.
    ///
    /// The first call for a city creates one direct route per warehouse and,
    /// when `include_multihop` is set, one multi-hop route per
    /// (warehouse, hub) pair. Every later call returns the same set.
    pub fn ensure_routes_for_city(&self, city: &str, include_multihop: bool) -> Vec<u32> {
        {
            let inner = self.inner.read();
            if let Some(existing) = inner.cities.get(city) {
                if existing.has_multihop || !include_multihop {
                    return sorted(existing.route_ids.clone());
                }
            }
        }

        let mut inner = self.inner.write();
        // Re-check under the exclusive lock: another caller may have created
        // the routes between our read and write acquisitions.
        let needs_direct = !inner.cities.contains_key(city);
        if needs_direct {
            self.create_direct_locked(&mut inner, city);
        }
        let needs_multihop = include_multihop
            && !inner
                .cities
                .get(city)
                .map(|c| c.has_multihop)
                .unwrap_or(false);
        if needs_multihop {
            self.create_multihop_locked(&mut inner, city);
        }

        sorted(
            inner
                .cities
                .get(city)
                .map(|c| c.route_ids.clone())
                .unwrap_or_default(),
        )
    }

    fn create_direct_locked(&self, inner: &mut Inner, city: &str) {
        let mut route_ids = Vec::with_capacity(self.config.warehouses.len());
        for (index, warehouse) in self.config.warehouses.iter().enumerate() {
            let id = inner.next_direct_id;
            inner.next_direct_id += 1;
            inner.routes.insert(
                id,
                Route {
                    id,
                    kind: RouteKind::Direct {
                        warehouse: warehouse.clone(),
                        destination: city.to_string(),
                    },
                    distance_km: nominal_direct_distance(index),
                    cost_per_km: BASE_COST_PER_KM,
                    // First warehouse is the primary by convention.
                    is_primary: index == 0,
                },
            );
            route_ids.push(id);
        }

        debug!(city, routes = route_ids.len(), "created direct routes");
        inner.cities.insert(
            city.to_string(),
            CityRoutes {
                route_ids,
                has_multihop: false,
            },
        );
    }

    fn create_multihop_locked(&self, inner: &mut Inner, city: &str) {
        let mut created = Vec::new();
        for (w_index, warehouse) in self.config.warehouses.iter().enumerate() {
            for (h_index, hub) in self.config.hubs.iter().enumerate() {
                let id = inner.next_multihop_id;
                inner.next_multihop_id += 1;
                inner.routes.insert(
                    id,
                    Route {
                        id,
                        kind: RouteKind::MultiHop {
                            warehouse: warehouse.clone(),
                            hub: hub.clone(),
                            destination: city.to_string(),
                        },
                        distance_km: nominal_direct_distance(w_index)
                            + hub_detour_distance(h_index),
                        cost_per_km: BASE_COST_PER_KM,
                        is_primary: false,
                    },
                );
                created.push(id);
            }
        }

        debug!(city, routes = created.len(), "created multi-hop routes");
        if let Some(entry) = inner.cities.get_mut(city) {
            entry.route_ids.extend(created);
            entry.has_multihop = true;
        }
    }

    /// The primary route for a city, if its routes exist.
    pub fn primary_route_for_city(&self, city: &str) -> Option<u32> {
        let inner = self.inner.read();
        let entry = inner.cities.get(city)?;
        entry
            .route_ids
            .iter()
            .copied()
            .find(|id| inner.routes.get(id).map(|r| r.is_primary).unwrap_or(false))
            .or_else(|| entry.route_ids.iter().copied().min())
    }

    /// All non-primary routes for a city.
    pub fn backup_routes_for_city(&self, city: &str) -> Vec<u32> {
        let primary = self.primary_route_for_city(city);
        let inner = self.inner.read();
        let Some(entry) = inner.cities.get(city) else {
            return Vec::new();
        };
        sorted(
            entry
                .route_ids
                .iter()
                .copied()
                .filter(|id| Some(*id) != primary)
                .collect(),
        )
    }

    /// Route ids already created for a city, without creating any.
    pub fn routes_for_city(&self, city: &str) -> Vec<u32> {
        let inner = self.inner.read();
        inner
            .cities
            .get(city)
            .map(|entry| sorted(entry.route_ids.clone()))
            .unwrap_or_default()
    }

    pub fn route_details(&self, route_id: u32) -> Option<Route> {
        self.inner.read().routes.get(&route_id).cloned()
    }

    /// Snapshot of (route id, route) pairs for every route serving `city`,
    /// ordered by id.
    pub fn city_catalog(&self, city: &str) -> Vec<Route> {
        let inner = self.inner.read();
        let Some(entry) = inner.cities.get(city) else {
            return Vec::new();
        };
        let mut routes: Vec<Route> = entry
            .route_ids
            .iter()
            .filter_map(|id| inner.routes.get(id).cloned())
            .collect();
        routes.sort_by_key(|route| route.id);
        routes
    }

    pub fn network_summary(&self) -> NetworkSummary {
        let inner = self.inner.read();
        let multihop = inner
            .routes
            .values()
            .filter(|route| route.is_multihop())
            .count();
        NetworkSummary {
            cities: inner.cities.len(),
            direct_routes: inner.routes.len() - multihop,
            multihop_routes: multihop,
        }
    }

    /// Drop all dynamically created routes, keeping the predefined seed.
    /// Intended for test harnesses only.
    pub fn reset(&self) {
        let fresh = Self::new(self.config.clone());
        let mut inner = self.inner.write();
        *inner = fresh.inner.into_inner();
    }
}

/// Nominal per-km rate used when the cost dataset has no row for a route.
const BASE_COST_PER_KM: f64 = 2.0;

/// Nominal direct distance for the warehouse at `index`. Deterministic so
/// repeated creation for equal configurations yields equal costs.
fn nominal_direct_distance(index: usize) -> f64 {
    150.0 + 25.0 * index as f64
}

/// Extra distance incurred by detouring through the hub at `index`.
fn hub_detour_distance(index: usize) -> f64 {
    30.0 + 20.0 * index as f64
}

fn sorted(mut ids: Vec<u32>) -> Vec<u32> {
    ids.sort_unstable();
    ids
}

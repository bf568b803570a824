//! Route registry tests
//!
//! Exactly-once creation per city, id namespace separation, and behavior
//! under concurrent callers.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use routeguard::config::{DYNAMIC_DIRECT_START_ID, MULTIHOP_START_ID, NetworkConfig};
use routeguard::registry::RouteGraphRegistry;

// ============================================================================
// Test Fixtures
// ============================================================================

/// Small network for concurrency tests: 3 warehouses, 2 hubs, no seed.
fn small_config() -> NetworkConfig {
    NetworkConfig {
        warehouses: ["W1", "W2", "W3"].map(String::from).to_vec(),
        hubs: ["H1", "H2"].map(String::from).to_vec(),
        predefined: Vec::new(),
        demand: Vec::new(),
    }
}

fn seeded_config() -> NetworkConfig {
    NetworkConfig::default()
}

// ============================================================================
// Predefined network
// ============================================================================

#[test]
fn predefined_boston_routes_are_seeded() {
    let registry = RouteGraphRegistry::new(seeded_config());

    assert!(registry.is_predefined_city("Boston"));
    assert_eq!(registry.routes_for_city("Boston"), vec![1, 4]);
    assert_eq!(registry.primary_route_for_city("Boston"), Some(1));
    assert_eq!(registry.backup_routes_for_city("Boston"), vec![4]);
}

#[test]
fn predefined_route_details_have_warehouse_paths() {
    let registry = RouteGraphRegistry::new(seeded_config());

    let route = registry.route_details(4).unwrap();
    assert_eq!(route.destination(), "Boston");
    assert!(!route.is_multihop());
    assert_eq!(route.path(), "Warehouse_South -> Boston");
    assert!(!route.is_primary);
}

#[test]
fn predefined_cities_are_listed_once() {
    let registry = RouteGraphRegistry::new(seeded_config());
    assert_eq!(
        registry.predefined_cities(),
        vec!["Boston", "Chicago", "New York", "Philadelphia"]
    );
}

// ============================================================================
// Dynamic creation
// ============================================================================

#[test]
fn new_city_gets_one_direct_route_per_warehouse() {
    let registry = RouteGraphRegistry::new(small_config());

    let routes = registry.ensure_routes_for_city("Seattle", false);
    assert_eq!(routes.len(), 3);
    assert!(routes.iter().all(|id| *id < MULTIHOP_START_ID));
    assert!(routes.iter().all(|id| *id >= DYNAMIC_DIRECT_START_ID));
}

#[test]
fn multihop_routes_occupy_disjoint_id_namespace() {
    let registry = RouteGraphRegistry::new(small_config());

    let routes = registry.ensure_routes_for_city("Seattle", true);
    let direct: Vec<u32> = routes
        .iter()
        .copied()
        .filter(|id| *id < MULTIHOP_START_ID)
        .collect();
    let multihop: Vec<u32> = routes
        .iter()
        .copied()
        .filter(|id| *id >= MULTIHOP_START_ID)
        .collect();

    assert_eq!(direct.len(), 3);
    assert_eq!(multihop.len(), 3 * 2);
}

#[test]
fn first_warehouse_route_is_primary() {
    let registry = RouteGraphRegistry::new(small_config());

    let routes = registry.ensure_routes_for_city("Austin", true);
    let primary = registry.primary_route_for_city("Austin").unwrap();
    let details = registry.route_details(primary).unwrap();

    assert_eq!(details.path(), "W1 -> Austin");
    assert_eq!(
        registry.backup_routes_for_city("Austin").len(),
        routes.len() - 1
    );
}

#[test]
fn repeated_calls_return_the_same_set() {
    let registry = RouteGraphRegistry::new(small_config());

    let first = registry.ensure_routes_for_city("Portland", true);
    let second = registry.ensure_routes_for_city("Portland", true);
    assert_eq!(first, second);

    let summary = registry.network_summary();
    assert_eq!(summary.cities, 1);
    assert_eq!(summary.direct_routes, 3);
    assert_eq!(summary.multihop_routes, 6);
}

#[test]
fn direct_only_city_can_be_upgraded_with_multihop() {
    let registry = RouteGraphRegistry::new(small_config());

    let direct_only = registry.ensure_routes_for_city("Denver", false);
    assert_eq!(direct_only.len(), 3);

    let upgraded = registry.ensure_routes_for_city("Denver", true);
    assert_eq!(upgraded.len(), 3 + 6);
    assert!(direct_only.iter().all(|id| upgraded.contains(id)));

    // Upgrade is itself idempotent.
    assert_eq!(registry.ensure_routes_for_city("Denver", true), upgraded);
}

#[test]
fn reset_drops_dynamic_routes_but_keeps_the_seed() {
    let registry = RouteGraphRegistry::new(seeded_config());
    registry.ensure_routes_for_city("Seattle", true);
    assert!(!registry.routes_for_city("Seattle").is_empty());

    registry.reset();
    assert!(registry.routes_for_city("Seattle").is_empty());
    assert_eq!(registry.routes_for_city("Boston"), vec![1, 4]);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_same_city_creates_routes_once() {
    let registry = Arc::new(RouteGraphRegistry::new(small_config()));
    let expected_total = 3 + 3 * 2;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.ensure_routes_for_city("RaceCity", true))
        })
        .collect();

    let results: Vec<Vec<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // All callers observe the same stable route set.
    let unique: HashSet<Vec<u32>> = results.iter().cloned().collect();
    assert_eq!(unique.len(), 1);
    let only = unique.into_iter().next().unwrap();
    assert_eq!(only.len(), expected_total);
    assert_eq!(only.iter().collect::<HashSet<_>>().len(), expected_total);

    // A later sequential call must not grow the set.
    let again = registry.ensure_routes_for_city("RaceCity", true);
    assert_eq!(again, only);
}

#[test]
fn concurrent_distinct_cities_get_disjoint_ids() {
    let registry = Arc::new(RouteGraphRegistry::new(small_config()));
    let cities = ["A", "B", "C", "D", "E"];
    let expected_per_city = 3 + 3 * 2;

    let handles: Vec<_> = cities
        .iter()
        .map(|city| {
            let registry = Arc::clone(&registry);
            let city = city.to_string();
            thread::spawn(move || (city.clone(), registry.ensure_routes_for_city(&city, true)))
        })
        .collect();

    let mut all_ids = Vec::new();
    for handle in handles {
        let (city, route_ids) = handle.join().unwrap();
        assert_eq!(route_ids.len(), expected_per_city, "route count for {city}");
        all_ids.extend(route_ids);
    }

    let unique: HashSet<u32> = all_ids.iter().copied().collect();
    assert_eq!(unique.len(), all_ids.len(), "route ids collided across cities");
}

//! Network and currency configuration.
//!
//! All route creation is driven by the warehouse and hub lists here; adding a
//! warehouse or hub changes the route fan-out for every city created after
//! the change. The predefined table seeds the legacy eight-route network.

/// Direct route ids for dynamically created cities start here, leaving room
/// below for the predefined legacy routes.
pub const DYNAMIC_DIRECT_START_ID: u32 = 101;

/// Multi-hop route ids occupy a disjoint namespace above all direct ids.
pub const MULTIHOP_START_ID: u32 = 1000;

/// Shipment quantity assumed when neither the request nor the demand table
/// names one.
pub const DEFAULT_CITY_DEMAND: u32 = 100;

/// A predefined (legacy) direct route seeded at registry construction.
#[derive(Debug, Clone)]
pub struct PredefinedRoute {
    pub id: u32,
    pub warehouse: &'static str,
    pub destination: &'static str,
    pub is_primary: bool,
}

/// Warehouse, hub, and demand configuration for the route network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub warehouses: Vec<String>,
    pub hubs: Vec<String>,
    pub predefined: Vec<PredefinedRoute>,
    /// Default shipment demand per predefined destination, in units.
    pub demand: Vec<(String, u32)>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            warehouses: [
                "Warehouse_North",
                "Warehouse_South",
                "Warehouse_East",
                "Warehouse_West",
                "Warehouse_Central",
            ]
            .map(String::from)
            .to_vec(),
            hubs: ["Hub_Memphis", "Hub_Louisville", "Hub_Dallas"]
                .map(String::from)
                .to_vec(),
            predefined: predefined_network(),
            demand: [
                ("Boston", 500),
                ("New York", 800),
                ("Chicago", 600),
                ("Philadelphia", 400),
            ]
            .map(|(city, qty)| (city.to_string(), qty))
            .to_vec(),
        }
    }
}

impl NetworkConfig {
    /// Default demand for a destination, falling back to the global default
    /// for cities outside the demand table.
    pub fn demand_for(&self, city: &str) -> u32 {
        self.demand
            .iter()
            .find(|(name, _)| name.as_str() == city)
            .map(|(_, qty)| *qty)
            .unwrap_or(DEFAULT_CITY_DEMAND)
    }
}

/// The legacy eight-route network: two warehouses serving four cities, with
/// the Warehouse_North route primary for each.
fn predefined_network() -> Vec<PredefinedRoute> {
    let rows: [(u32, &str, &str, bool); 8] = [
        (1, "Warehouse_North", "Boston", true),
        (2, "Warehouse_North", "New York", true),
        (3, "Warehouse_North", "Chicago", true),
        (4, "Warehouse_South", "Boston", false),
        (5, "Warehouse_North", "Philadelphia", true),
        (6, "Warehouse_South", "New York", false),
        (7, "Warehouse_South", "Chicago", false),
        (8, "Warehouse_South", "Philadelphia", false),
    ];

    rows.iter()
        .map(|&(id, warehouse, destination, is_primary)| PredefinedRoute {
            id,
            warehouse,
            destination,
            is_primary,
        })
        .collect()
}

/// Fixed USD to INR conversion applied when the destination is an Indian
/// city and the request budget arrived in USD.
pub const USD_TO_INR_RATE: f64 = 83.0;

/// Destinations whose amounts are rendered in INR with Indian digit
/// grouping.
pub const INDIAN_CITIES: &[&str] = &[
    "Mumbai",
    "Delhi",
    "Bangalore",
    "Chennai",
    "Kolkata",
    "Hyderabad",
    "Pune",
    "Ahmedabad",
];

/// Case-insensitive membership test against [`INDIAN_CITIES`].
pub fn is_indian_city(city: &str) -> bool {
    INDIAN_CITIES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(city))
}

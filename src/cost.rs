//! Per-route cost computation and currency rendering.
//!
//! Unit costs come from the static cost dataset when a row exists for the
//! route id, otherwise from the route's own nominal distance and rate.
//! Multi-hop routes carry a fixed handling premium on top.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::config::{USD_TO_INR_RATE, is_indian_city};
use crate::registry::Route;

/// Extra handling cost for routing through a distribution hub, as a fraction
/// of the base unit cost.
pub const MULTIHOP_PREMIUM: f64 = 0.15;

/// Embedded fallback for the static cost dataset; used when the CSV file is
/// missing or unreadable.
const BACKUP_COST_DATA: &str = "\
Route (ID),Route Distance (km),Cost per Kilometer ($)
1,157.75,2.0
2,159.62,2.0
3,157.27,2.0
4,159.25,2.0
5,159.88,2.0
6,159.61,2.0
7,159.00,2.0
8,158.00,2.0
";

static BACKUP_COSTS: Lazy<HashMap<u32, (f64, f64)>> = Lazy::new(|| {
    parse_cost_table(BACKUP_COST_DATA.as_bytes()).unwrap_or_default()
});

/// Cost model over a (possibly absent) static cost dataset.
#[derive(Debug, Clone, Default)]
pub struct CostModel {
    dataset: HashMap<u32, (f64, f64)>,
}

impl CostModel {
    /// Load the cost dataset from `path`. A missing or malformed file falls
    /// back to the embedded backup table rather than failing.
    pub fn from_dataset(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read(path).map_err(csv::Error::from).and_then(|bytes| parse_cost_table(&bytes)) {
            Ok(dataset) if !dataset.is_empty() => Self { dataset },
            Ok(_) => Self::default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cost dataset unreadable, using backup table");
                Self::default()
            }
        }
    }

    /// Build a model directly from (route id, distance, rate) rows.
    pub fn from_rows(rows: impl IntoIterator<Item = (u32, f64, f64)>) -> Self {
        Self {
            dataset: rows
                .into_iter()
                .map(|(id, distance, rate)| (id, (distance, rate)))
                .collect(),
        }
    }

    /// Cost to ship one unit over `route`: distance times per-km rate, with
    /// the multi-hop premium where applicable.
    pub fn unit_cost(&self, route: &Route) -> f64 {
        let (distance, rate) = self
            .dataset
            .get(&route.id)
            .or_else(|| BACKUP_COSTS.get(&route.id))
            .copied()
            .unwrap_or((route.distance_km, route.cost_per_km));

        let base = distance * rate;
        if route.is_multihop() {
            base * (1.0 + MULTIHOP_PREMIUM)
        } else {
            base
        }
    }

    /// Base cost map for a set of routes, keyed by route id.
    pub fn cost_map(&self, routes: &[Route]) -> HashMap<u32, f64> {
        routes
            .iter()
            .map(|route| (route.id, self.unit_cost(route)))
            .collect()
    }
}

/// Multiply the cost of exactly the targeted routes, leaving every other
/// entry untouched. Routes absent from the map are ignored.
pub fn apply_multiplier(costs: &mut HashMap<u32, f64>, targets: &[u32], multiplier: f64) {
    for id in targets {
        if let Some(cost) = costs.get_mut(id) {
            *cost *= multiplier;
        }
    }
}

fn parse_cost_table(bytes: &[u8]) -> Result<HashMap<u32, (f64, f64)>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let mut table = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let parsed = (
            record.get(0).and_then(|f| f.parse::<u32>().ok()),
            record.get(1).and_then(|f| f.parse::<f64>().ok()),
            record.get(2).and_then(|f| f.parse::<f64>().ok()),
        );
        match parsed {
            (Some(id), Some(distance), Some(rate)) => {
                table.insert(id, (distance, rate));
            }
            _ => warn!(row = ?record, "skipping malformed cost dataset row"),
        }
    }
    Ok(table)
}

/// Currency used when rendering amounts for a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Usd,
    Inr,
}

impl Currency {
    /// Currency implied by the destination city.
    pub fn for_city(city: &str) -> Self {
        if is_indian_city(city) {
            Currency::Inr
        } else {
            Currency::Usd
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Inr => "₹",
        }
    }

    /// Convert an amount held in base USD into this currency.
    pub fn from_usd(self, amount: f64) -> f64 {
        match self {
            Currency::Usd => amount,
            Currency::Inr => amount * USD_TO_INR_RATE,
        }
    }

    /// Render `amount` with this currency's digit grouping and two decimal
    /// places: Western thousands grouping for USD (`123,456.00`), Indian
    /// lakh/crore grouping for INR (`1,23,456.00`).
    pub fn format(self, amount: f64) -> String {
        let negative = amount < 0.0;
        let total_cents = (amount.abs() * 100.0).round() as u64;
        let whole = total_cents / 100;
        let cents = total_cents % 100;

        let grouped = match self {
            Currency::Usd => group_western(whole),
            Currency::Inr => group_indian(whole),
        };
        let sign = if negative { "-" } else { "" };
        format!("{sign}{}{grouped}.{cents:02}", self.symbol())
    }
}

fn group_western(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        let remaining = digits.len() - index;
        if index > 0 && remaining % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Indian grouping: rightmost three digits, then pairs (`1,23,456`).
fn group_indian(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let head_chars: Vec<char> = head.chars().collect();
    let mut index = head_chars.len();
    while index > 0 {
        let start = index.saturating_sub(2);
        groups.push(head_chars[start..index].iter().collect::<String>());
        index = start;
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

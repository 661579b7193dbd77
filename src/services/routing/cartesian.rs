use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{CartesianRoutingResult, CartesianTableReference, RoutingResult, TableUnit, TableUnits};

use super::RoutingEngine;

/// Combines per-table routing results: only data sources every table routed
/// to survive, and tables are crossed only within one data source
pub struct CartesianRoutingEngine {
    routing_results: Vec<TableUnits>,
}

impl CartesianRoutingEngine {
    pub fn new(routing_results: Vec<TableUnits>) -> Self {
        Self { routing_results }
    }

    fn data_source_logic_tables_map(&self) -> BTreeMap<String, Vec<String>> {
        let data_sources = self.intersect_data_sources();
        let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for units in &self.routing_results {
            for (data_source, logic_tables) in units.data_source_logic_tables_map(&data_sources) {
                let entry = result.entry(data_source).or_default();
                for table in logic_tables {
                    if !entry.iter().any(|t| t.eq_ignore_ascii_case(&table)) {
                        entry.push(table);
                    }
                }
            }
        }
        result
    }

    fn intersect_data_sources(&self) -> Vec<String> {
        let mut iter = self.routing_results.iter();
        let Some(first) = iter.next() else {
            return Vec::new();
        };
        let mut result = first.data_source_names();
        for units in iter {
            let names = units.data_source_names();
            result.retain(|ds| names.contains(ds));
        }
        result
    }

    fn table_unit_groups(&self, data_source: &str, logic_tables: &[String]) -> Vec<Vec<TableUnit>> {
        let mut result = Vec::new();
        for units in &self.routing_results {
            for actual_tables in units.actual_table_name_groups(data_source, logic_tables) {
                let group: Vec<TableUnit> = actual_tables
                    .iter()
                    .filter_map(|actual_table| self.find_table_unit(data_source, actual_table))
                    .collect();
                if !group.is_empty() {
                    result.push(group);
                }
            }
        }
        result
    }

    fn find_table_unit(&self, data_source: &str, actual_table: &str) -> Option<TableUnit> {
        self.routing_results
            .iter()
            .find_map(|units| units.find_table_unit(data_source, actual_table))
            .cloned()
    }
}

/// Every combination picking one unit from each group, in group order
fn cartesian_product(groups: &[Vec<TableUnit>]) -> Vec<CartesianTableReference> {
    let mut combinations: Vec<Vec<TableUnit>> = vec![Vec::new()];
    for group in groups {
        let mut next = Vec::with_capacity(combinations.len() * group.len());
        for combination in &combinations {
            for unit in group {
                let mut extended = combination.clone();
                extended.push(unit.clone());
                next.push(extended);
            }
        }
        combinations = next;
    }
    combinations
        .into_iter()
        .filter(|c| !c.is_empty())
        .map(|table_units| CartesianTableReference { table_units })
        .collect()
}

impl RoutingEngine for CartesianRoutingEngine {
    fn route(&self) -> Result<RoutingResult> {
        let mut result = CartesianRoutingResult::default();
        let data_source_logic_tables = self.data_source_logic_tables_map();
        if data_source_logic_tables.is_empty() {
            tracing::warn!("Cartesian routing found no data source shared by every table");
        }
        for (data_source, logic_tables) in data_source_logic_tables {
            let groups = self.table_unit_groups(&data_source, &logic_tables);
            result.merge(&data_source, cartesian_product(&groups));
        }
        Ok(RoutingResult::Cartesian(result))
    }
}

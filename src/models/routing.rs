use serde::Serialize;
use std::collections::BTreeMap;

/// One routed physical table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableUnit {
    pub data_source_name: String,
    pub logic_table_name: String,
    pub actual_table_name: String,
}

impl TableUnit {
    pub fn new(
        data_source_name: impl Into<String>,
        logic_table_name: impl Into<String>,
        actual_table_name: impl Into<String>,
    ) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            logic_table_name: logic_table_name.into(),
            actual_table_name: actual_table_name.into(),
        }
    }
}

/// Ordered set of table units
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TableUnits {
    units: Vec<TableUnit>,
}

impl TableUnits {
    /// Add a unit, ignoring exact duplicates
    pub fn add(&mut self, unit: TableUnit) {
        if !self.units.contains(&unit) {
            self.units.push(unit);
        }
    }

    pub fn units(&self) -> &[TableUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Data source names in first-seen order
    pub fn data_source_names(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for unit in &self.units {
            if !result.contains(&unit.data_source_name) {
                result.push(unit.data_source_name.clone());
            }
        }
        result
    }

    pub fn find_table_unit(&self, data_source_name: &str, actual_table_name: &str) -> Option<&TableUnit> {
        self.units.iter().find(|u| {
            u.data_source_name.eq_ignore_ascii_case(data_source_name)
                && u.actual_table_name.eq_ignore_ascii_case(actual_table_name)
        })
    }

    /// Logic tables routed to each of the given data sources
    pub fn data_source_logic_tables_map(&self, data_source_names: &[String]) -> BTreeMap<String, Vec<String>> {
        let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for unit in &self.units {
            if !data_source_names.contains(&unit.data_source_name) {
                continue;
            }
            let tables = result.entry(unit.data_source_name.clone()).or_default();
            if !tables.iter().any(|t| t.eq_ignore_ascii_case(&unit.logic_table_name)) {
                tables.push(unit.logic_table_name.clone());
            }
        }
        result
    }

    /// Actual table names per logic table within one data source
    pub fn actual_table_name_groups(&self, data_source_name: &str, logic_tables: &[String]) -> Vec<Vec<String>> {
        logic_tables
            .iter()
            .map(|logic_table| {
                self.units
                    .iter()
                    .filter(|u| {
                        u.data_source_name == data_source_name
                            && u.logic_table_name.eq_ignore_ascii_case(logic_table)
                    })
                    .map(|u| u.actual_table_name.clone())
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect()
    }
}

/// One combination of physical tables executed as a single statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartesianTableReference {
    pub table_units: Vec<TableUnit>,
}

/// Cartesian table references sharing one data source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartesianDataSource {
    pub data_source_name: String,
    pub table_references: Vec<CartesianTableReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartesianRoutingResult {
    pub table_units: TableUnits,
    pub data_sources: Vec<CartesianDataSource>,
}

impl CartesianRoutingResult {
    pub fn merge(&mut self, data_source_name: &str, references: Vec<CartesianTableReference>) {
        for reference in &references {
            for unit in &reference.table_units {
                self.table_units.add(unit.clone());
            }
        }
        match self
            .data_sources
            .iter_mut()
            .find(|ds| ds.data_source_name == data_source_name)
        {
            Some(existing) => existing.table_references.extend(references),
            None => self.data_sources.push(CartesianDataSource {
                data_source_name: data_source_name.to_string(),
                table_references: references,
            }),
        }
    }
}

/// Outcome of a routing engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum RoutingResult {
    Units(TableUnits),
    Cartesian(CartesianRoutingResult),
}

impl RoutingResult {
    pub fn table_units(&self) -> &TableUnits {
        match self {
            RoutingResult::Units(units) => units,
            RoutingResult::Cartesian(cartesian) => &cartesian.table_units,
        }
    }

    /// Exactly one physical statement will be issued
    pub fn is_single_routing(&self) -> bool {
        match self {
            RoutingResult::Units(units) => units.len() == 1,
            RoutingResult::Cartesian(cartesian) => {
                cartesian
                    .data_sources
                    .iter()
                    .map(|ds| ds.table_references.len())
                    .sum::<usize>()
                    == 1
            }
        }
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// Snapshot of the store's tables and their columns in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub tables: BTreeMap<String, Vec<ColumnInfo>>,
}

impl SchemaDescriptor {
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn column_names(&self, table: &str) -> Vec<&str> {
        self.tables
            .get(table)
            .map(|cols| cols.iter().map(|c| c.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Renders `Table: name` headers followed by `column (TYPE)` lists.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (table, columns) in &self.tables {
            let _ = writeln!(out, "Table: {}", table);
            let cols: Vec<String> = columns
                .iter()
                .map(|c| {
                    if c.data_type.is_empty() {
                        c.name.clone()
                    } else {
                        format!("{} ({})", c.name, c.data_type)
                    }
                })
                .collect();
            let _ = writeln!(out, "{}", cols.join(", "));
        }
        out
    }
}

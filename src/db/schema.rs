//! Database schema types.
//!
//! Represents the tables and columns of the store, as handed to the SQL
//! generator.

use serde::{Deserialize, Serialize};

/// Represents the complete schema of a database.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    /// All user tables, in name order.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower-cased table names.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.to_lowercase()).collect()
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    pub fn format_for_llm(&self) -> String {
        let tables_text = self
            .tables
            .iter()
            .map(format_table_for_llm)
            .collect::<Vec<_>>()
            .join("");

        format!("Database Schema:\n\n{}", tables_text)
    }
}

fn format_table_for_llm(table: &Table) -> String {
    let column_lines = table
        .columns
        .iter()
        .map(|column| {
            let annotations = [
                column.is_primary_key.then_some("PK"),
                (!column.is_nullable).then_some("NOT NULL"),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

            if annotations.is_empty() {
                format!("  - {}: {}\n", column.name, column.data_type)
            } else {
                format!(
                    "  - {}: {} ({})\n",
                    column.name,
                    column.data_type,
                    annotations.join(", ")
                )
            }
        })
        .collect::<Vec<_>>()
        .join("");

    format!("Table: {}\n{}\n", table.name, column_lines)
}

/// Represents a database table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Table {
    /// Table name, as declared.
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type (may be empty in SQLite).
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,

    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,
}

impl Column {
    /// Creates a new nullable column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            is_primary_key: false,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    /// Marks the column as part of the primary key.
    pub fn primary_key(self) -> Self {
        Self {
            is_primary_key: true,
            ..self
        }
    }
}

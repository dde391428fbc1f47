//! Role-based table policy.
//!
//! A fixed mapping from role to the tables that role may read. Built once at
//! startup and shared read-only by every request.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tables of the metering schema readable by every operational role.
const OPERATIONAL_TABLES: &[&str] = &["meter_table", "customer_table"];

/// The revenue ledger; restricted to administrators.
const REVENUE_TABLE: &str = "revenue_data";

/// Immutable `role -> allowed tables` mapping. Unknown roles get nothing.
///
/// Deserializes from a `role = [tables]` map through [`RolePolicy::from_entries`],
/// so configured names are normalized like built-in ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, BTreeSet<String>>"
)]
pub struct RolePolicy {
    roles: BTreeMap<String, BTreeSet<String>>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        let operational: Vec<&str> = OPERATIONAL_TABLES.to_vec();
        let mut admin = operational.clone();
        admin.push(REVENUE_TABLE);

        Self::from_entries([("admin", admin), ("planner", operational)])
    }
}

impl RolePolicy {
    /// Builds a policy from `(role, tables)` pairs. Names are lower-cased.
    pub fn from_entries<I, R, T, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (R, T)>,
        R: AsRef<str>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roles = entries
            .into_iter()
            .map(|(role, tables)| {
                let tables = tables
                    .into_iter()
                    .map(|t| t.as_ref().trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect();
                (normalize_role(role.as_ref()), tables)
            })
            .filter(|(role, _)| !role.is_empty())
            .collect();

        Self { roles }
    }

    /// Tables the role may read. Unknown or empty role yields an empty set.
    pub fn allowed_tables(&self, role: &str) -> BTreeSet<String> {
        self.roles
            .get(&normalize_role(role))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns true if the role may read `table`.
    pub fn permits(&self, role: &str, table: &str) -> bool {
        self.roles
            .get(&normalize_role(role))
            .is_some_and(|tables| table_permitted(tables, table))
    }

    /// Every table named by any role.
    pub fn known_tables(&self) -> BTreeSet<String> {
        self.roles.values().flatten().cloned().collect()
    }

    /// Configured role names.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Vec<String>>> for RolePolicy {
    fn from(entries: BTreeMap<String, Vec<String>>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<RolePolicy> for BTreeMap<String, BTreeSet<String>> {
    fn from(policy: RolePolicy) -> Self {
        policy.roles
    }
}

/// Case-insensitive membership test used by every authorization check.
pub fn table_permitted(allowed: &BTreeSet<String>, table: &str) -> bool {
    allowed.iter().any(|t| t.eq_ignore_ascii_case(table.trim()))
}

fn normalize_role(role: &str) -> String {
    role.trim().to_lowercase()
}

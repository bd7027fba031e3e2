//! Target field definitions per importable entity type.
//!
//! Field definitions are read-only reference data: the workflow uses them to
//! flag unmapped required fields, never to block a preview.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One target field an imported column can be mapped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub required: bool,
}

impl FieldDefinition {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, required: bool) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            required,
        }
    }
}

pub const ENTITY_EMPLOYEES: &str = "employees";
pub const ENTITY_DEPARTMENTS: &str = "departments";
pub const ENTITY_LEAVE_BALANCES: &str = "leave_balances";
pub const ENTITY_PAYROLL_ENTRIES: &str = "payroll_entries";

/// Field definitions keyed by entity type.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    entities: BTreeMap<String, Vec<FieldDefinition>>,
}

impl FieldCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of entity types the HRMS import endpoints accept.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(
            ENTITY_EMPLOYEES,
            vec![
                FieldDefinition::new("employee_number", "Employee Number", false),
                FieldDefinition::new("full_name", "Full Name", true),
                FieldDefinition::new("date_of_birth", "Date of Birth", true),
                FieldDefinition::new("email", "Email", false),
                FieldDefinition::new("department", "Department", false),
                FieldDefinition::new("job_title", "Job Title", false),
                FieldDefinition::new("hire_date", "Hire Date", false),
            ],
        );
        catalog.register(
            ENTITY_DEPARTMENTS,
            vec![
                FieldDefinition::new("name", "Department Name", true),
                FieldDefinition::new("code", "Department Code", false),
                FieldDefinition::new("manager_email", "Manager Email", false),
            ],
        );
        catalog.register(
            ENTITY_LEAVE_BALANCES,
            vec![
                FieldDefinition::new("employee_number", "Employee Number", true),
                FieldDefinition::new("leave_type", "Leave Type", true),
                FieldDefinition::new("balance_days", "Balance (days)", true),
                FieldDefinition::new("year", "Year", false),
            ],
        );
        catalog.register(
            ENTITY_PAYROLL_ENTRIES,
            vec![
                FieldDefinition::new("employee_number", "Employee Number", true),
                FieldDefinition::new("pay_period", "Pay Period", true),
                FieldDefinition::new("gross_pay", "Gross Pay", true),
                FieldDefinition::new("deductions", "Deductions", false),
                FieldDefinition::new("net_pay", "Net Pay", false),
            ],
        );
        catalog
    }

    /// Add or replace the definitions for an entity type.
    pub fn register(&mut self, entity_type: impl Into<String>, fields: Vec<FieldDefinition>) {
        self.entities.insert(entity_type.into(), fields);
    }

    /// Definitions for an entity type; empty for unknown types.
    pub fn fields_for(&self, entity_type: &str) -> &[FieldDefinition] {
        self.entities
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Look up a single field by key within an entity type.
    pub fn field(&self, entity_type: &str, key: &str) -> Option<&FieldDefinition> {
        self.fields_for(entity_type).iter().find(|f| f.key == key)
    }
}

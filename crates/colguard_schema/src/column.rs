//! Column specifications.

use colguard_protocol::DataType;

use crate::check::Check;

/// Declarative description of one column.
///
/// Defaults: not nullable, no coercion, required, not unique, no checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub coerce: bool,
    /// An absent non-required column is skipped instead of reported
    pub required: bool,
    /// Every value in the column must be distinct
    pub unique: bool,
    pub checks: Vec<Check>,
    pub description: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            coerce: false,
            required: true,
            unique: false,
            checks: Vec::new(),
            description: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn coerce(mut self, coerce: bool) -> Self {
        self.coerce = coerce;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_checks(mut self, checks: impl IntoIterator<Item = Check>) -> Self {
        self.checks.extend(checks);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Copy of this spec under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// Partial update applied by `Schema::update_column`.
///
/// `None` leaves the field as declared. `checks` replaces the whole list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnOverrides {
    pub data_type: Option<DataType>,
    pub nullable: Option<bool>,
    pub coerce: Option<bool>,
    pub required: Option<bool>,
    pub unique: Option<bool>,
    pub checks: Option<Vec<Check>>,
    pub description: Option<String>,
}

impl ColumnOverrides {
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn coerce(mut self, coerce: bool) -> Self {
        self.coerce = Some(coerce);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    pub fn checks(mut self, checks: Vec<Check>) -> Self {
        self.checks = Some(checks);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn apply(&self, spec: &ColumnSpec) -> ColumnSpec {
        ColumnSpec {
            name: spec.name.clone(),
            data_type: self.data_type.clone().unwrap_or_else(|| spec.data_type.clone()),
            nullable: self.nullable.unwrap_or(spec.nullable),
            coerce: self.coerce.unwrap_or(spec.coerce),
            required: self.required.unwrap_or(spec.required),
            unique: self.unique.unwrap_or(spec.unique),
            checks: self.checks.clone().unwrap_or_else(|| spec.checks.clone()),
            description: self
                .description
                .clone()
                .or_else(|| spec.description.clone()),
        }
    }
}

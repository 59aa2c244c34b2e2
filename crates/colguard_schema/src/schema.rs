//! Schemas and their composition.
//!
//! A [`Schema`] is an immutable, ordered collection of [`ColumnSpec`]s.
//! Composition never mutates: every operation returns a new value, so a
//! schema can be shared by reference across threads and validation calls.

use std::collections::{HashMap, HashSet};

use crate::column::{ColumnOverrides, ColumnSpec};
use crate::error::{SchemaError, SchemaResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    columns: Vec<ColumnSpec>,
    strict: bool,
    ordered: bool,
    coerce: bool,
    unique: Vec<String>,
    description: Option<String>,
}

impl Schema {
    /// Declare a schema. Column names must be unique.
    pub fn declare(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = ColumnSpec>,
    ) -> SchemaResult<Self> {
        let name = name.into();
        let columns: Vec<ColumnSpec> = columns.into_iter().collect();
        ensure_distinct(&name, &columns)?;
        Ok(Self {
            name,
            columns,
            strict: false,
            ordered: false,
            coerce: false,
            unique: Vec::new(),
            description: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn ordered(&self) -> bool {
        self.ordered
    }

    pub fn coerce(&self) -> bool {
        self.coerce
    }

    /// Column combination that must be unique across rows (empty when unset).
    pub fn unique(&self) -> &[String] {
        &self.unique
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Reject table columns that are not declared.
    pub fn with_strict(&self, strict: bool) -> Self {
        Self {
            strict,
            ..self.clone()
        }
    }

    /// Require declared columns to appear in declared relative order.
    pub fn with_ordered(&self, ordered: bool) -> Self {
        Self {
            ordered,
            ..self.clone()
        }
    }

    /// Coerce every column regardless of its own flag.
    pub fn with_coerce(&self, coerce: bool) -> Self {
        Self {
            coerce,
            ..self.clone()
        }
    }

    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..self.clone()
        }
    }

    /// Require the combination of `names` to be unique across rows.
    pub fn with_unique<S: AsRef<str>>(&self, names: &[S]) -> SchemaResult<Self> {
        for name in names {
            self.require(name.as_ref())?;
        }
        Ok(Self {
            unique: names.iter().map(|n| n.as_ref().to_string()).collect(),
            ..self.clone()
        })
    }

    /// New schema with `additional` columns layered on top of this one.
    ///
    /// A column whose name already exists replaces the base column in its
    /// original position; new names are appended in the order given.
    pub fn extend(&self, additional: impl IntoIterator<Item = ColumnSpec>) -> SchemaResult<Self> {
        let additional: Vec<ColumnSpec> = additional.into_iter().collect();
        ensure_distinct(&self.name, &additional)?;

        let mut columns = self.columns.clone();
        for spec in additional {
            match columns.iter_mut().find(|c| c.name == spec.name) {
                Some(existing) => *existing = spec,
                None => columns.push(spec),
            }
        }
        Ok(Self {
            columns,
            ..self.clone()
        })
    }

    /// Append new columns. Unlike [`Schema::extend`], existing names are an error.
    pub fn add_columns(&self, columns: impl IntoIterator<Item = ColumnSpec>) -> SchemaResult<Self> {
        let mut merged = self.columns.clone();
        merged.extend(columns);
        ensure_distinct(&self.name, &merged)?;
        Ok(Self {
            columns: merged,
            ..self.clone()
        })
    }

    pub fn remove_columns<S: AsRef<str>>(&self, names: &[S]) -> SchemaResult<Self> {
        for name in names {
            self.require(name.as_ref())?;
        }
        let removed: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
        Ok(Self {
            columns: self
                .columns
                .iter()
                .filter(|c| !removed.contains(c.name.as_str()))
                .cloned()
                .collect(),
            unique: self.unique_without(|n| removed.contains(n)),
            ..self.clone()
        })
    }

    pub fn update_column(&self, name: &str, overrides: &ColumnOverrides) -> SchemaResult<Self> {
        self.require(name)?;
        Ok(Self {
            columns: self
                .columns
                .iter()
                .map(|c| {
                    if c.name == name {
                        overrides.apply(c)
                    } else {
                        c.clone()
                    }
                })
                .collect(),
            ..self.clone()
        })
    }

    pub fn update_columns(&self, updates: &[(&str, ColumnOverrides)]) -> SchemaResult<Self> {
        updates
            .iter()
            .try_fold(self.clone(), |schema, (name, overrides)| {
                schema.update_column(name, overrides)
            })
    }

    /// Rename columns in place. Positions and the unique list follow the rename.
    pub fn rename_columns(&self, renames: &[(&str, &str)]) -> SchemaResult<Self> {
        for (from, _) in renames {
            self.require(from)?;
        }
        let mapping: HashMap<&str, &str> = renames.iter().copied().collect();
        let rename = |name: &str| -> String {
            mapping.get(name).copied().unwrap_or(name).to_string()
        };

        let columns: Vec<ColumnSpec> = self
            .columns
            .iter()
            .map(|c| c.renamed(rename(&c.name)))
            .collect();
        ensure_distinct(&self.name, &columns)?;

        Ok(Self {
            columns,
            unique: self.unique.iter().map(|n| rename(n)).collect(),
            ..self.clone()
        })
    }

    /// Keep only `names`, in the order given.
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> SchemaResult<Self> {
        let columns = names
            .iter()
            .map(|n| self.require(n.as_ref()).cloned())
            .collect::<SchemaResult<Vec<_>>>()?;
        ensure_distinct(&self.name, &columns)?;
        let kept: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let unique = self.unique_without(|n| !kept.contains(n));
        Ok(Self {
            columns,
            unique,
            ..self.clone()
        })
    }

    /// The unique-together list after dropping columns. Losing any member
    /// drops the whole constraint, since a subset would be stricter.
    fn unique_without(&self, dropped: impl Fn(&str) -> bool) -> Vec<String> {
        if self.unique.iter().any(|n| dropped(n.as_str())) {
            Vec::new()
        } else {
            self.unique.clone()
        }
    }

    fn require(&self, name: &str) -> SchemaResult<&ColumnSpec> {
        self.column(name).ok_or_else(|| SchemaError::UnknownColumn {
            schema: self.name.clone(),
            column: name.to_string(),
        })
    }
}

fn ensure_distinct(schema: &str, columns: &[ColumnSpec]) -> SchemaResult<()> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                schema: schema.to_string(),
                column: column.name.clone(),
            });
        }
    }
    Ok(())
}

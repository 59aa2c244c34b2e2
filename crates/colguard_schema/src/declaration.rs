//! Schema declarations in JSON or YAML.
//!
//! ```yaml
//! name: fruits
//! strict: true
//! columns:
//!   item:
//!     type: string
//!     checks:
//!       - isin: [apple, orange]
//!   price:
//!     type: float64
//!     coerce: true
//!     checks:
//!       - gt: 0
//!       - in_range: {min: 0, max: 100, include_max: false}
//! ```
//!
//! `columns` is either a mapping (declaration order is kept) or an array of
//! objects carrying a `name`. A column may be written as a bare type string.
//! Check parameters are cast to the column's declared type when possible, so
//! `gt: 0` on a `float64` column compares against `0.0`.

use std::path::Path;

use colguard_protocol::{cast_value, DataType, Value};
use serde_json::{json, Map, Value as Json};
use tracing::debug;

use crate::check::{Check, CheckKind};
use crate::column::ColumnSpec;
use crate::error::{SchemaError, SchemaResult};
use crate::registry::CheckRegistry;
use crate::schema::Schema;

const SCHEMA_KEYS: &[&str] = &[
    "name",
    "description",
    "strict",
    "ordered",
    "coerce",
    "unique",
    "columns",
];
const COLUMN_KEYS: &[&str] = &[
    "name",
    "type",
    "dtype",
    "data_type",
    "nullable",
    "coerce",
    "required",
    "unique",
    "checks",
    "description",
];
const CHECK_OPTION_KEYS: &[&str] = &["ignore_nulls", "description"];
const DEFAULT_SCHEMA_NAME: &str = "schema";

/// Parse a JSON declaration.
pub fn from_json_str(text: &str, registry: &CheckRegistry) -> SchemaResult<Schema> {
    let doc: Json = serde_json::from_str(text)?;
    from_declaration(&doc, registry)
}

/// Parse a YAML declaration.
pub fn from_yaml_str(text: &str, registry: &CheckRegistry) -> SchemaResult<Schema> {
    let doc: Json = serde_yaml::from_str(text)?;
    from_declaration(&doc, registry)
}

/// Load a declaration file. `.yaml`/`.yml` parse as YAML, everything else as
/// JSON. Without a `name` key the file stem names the schema.
pub fn from_path(path: &Path, registry: &CheckRegistry) -> SchemaResult<Schema> {
    let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    let mut doc: Json = if is_yaml {
        serde_yaml::from_str(&text)?
    } else {
        serde_json::from_str(&text)?
    };

    if let (Json::Object(map), Some(stem)) = (&mut doc, path.file_stem().and_then(|s| s.to_str())) {
        map.entry("name").or_insert_with(|| Json::String(stem.to_string()));
    }
    debug!(path = %path.display(), yaml = is_yaml, "Loading schema declaration");
    from_declaration(&doc, registry)
}

/// Build a schema from an already-parsed declaration document.
pub fn from_declaration(doc: &Json, registry: &CheckRegistry) -> SchemaResult<Schema> {
    let map = as_object(doc, "$")?;
    reject_unknown_keys(map, SCHEMA_KEYS, "$")?;

    let name = match map.get("name") {
        Some(v) => as_str(v, "$.name")?.to_string(),
        None => DEFAULT_SCHEMA_NAME.to_string(),
    };

    let columns = match map.get("columns") {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Object(cols)) => cols
            .iter()
            .map(|(col_name, decl)| {
                parse_column(Some(col_name), decl, &format!("$.columns.{}", col_name), registry)
            })
            .collect::<SchemaResult<Vec<_>>>()?,
        Some(Json::Array(cols)) => cols
            .iter()
            .enumerate()
            .map(|(i, decl)| parse_column(None, decl, &format!("$.columns[{}]", i), registry))
            .collect::<SchemaResult<Vec<_>>>()?,
        Some(_) => {
            return Err(SchemaError::declaration(
                "$.columns",
                "expected a mapping or an array of columns",
            ))
        }
    };

    let mut schema = Schema::declare(name, columns)?
        .with_strict(opt_bool(map, "strict", "$")?.unwrap_or(false))
        .with_ordered(opt_bool(map, "ordered", "$")?.unwrap_or(false))
        .with_coerce(opt_bool(map, "coerce", "$")?.unwrap_or(false));

    if let Some(description) = map.get("description") {
        schema = schema.with_description(as_str(description, "$.description")?);
    }
    if let Some(unique) = map.get("unique") {
        let names = match unique {
            Json::String(s) => vec![s.clone()],
            Json::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| as_str(v, &format!("$.unique[{}]", i)).map(str::to_string))
                .collect::<SchemaResult<Vec<_>>>()?,
            _ => {
                return Err(SchemaError::declaration(
                    "$.unique",
                    "expected a column name or a list of column names",
                ))
            }
        };
        schema = schema.with_unique(&names)?;
    }
    Ok(schema)
}

fn parse_column(
    key_name: Option<&str>,
    decl: &Json,
    path: &str,
    registry: &CheckRegistry,
) -> SchemaResult<ColumnSpec> {
    // Shorthand: `price: float64`
    if let Json::String(type_name) = decl {
        let name = key_name
            .ok_or_else(|| SchemaError::declaration(path, "array columns need a 'name'"))?;
        return Ok(ColumnSpec::new(name, parse_type(decl, path, type_name)?));
    }

    let map = as_object(decl, path)?;
    reject_unknown_keys(map, COLUMN_KEYS, path)?;

    let name = match (key_name, map.get("name")) {
        (Some(name), _) => name.to_string(),
        (None, Some(v)) => as_str(v, &format!("{}.name", path))?.to_string(),
        (None, None) => return Err(SchemaError::declaration(path, "missing column 'name'")),
    };

    let type_keys: Vec<&str> = ["type", "dtype", "data_type"]
        .into_iter()
        .filter(|k| map.contains_key(*k))
        .collect();
    let data_type = match type_keys.as_slice() {
        [key] => {
            let raw = &map[*key];
            parse_type(raw, &format!("{}.{}", path, key), &raw.to_string())?
        }
        [] => return Err(SchemaError::declaration(path, "missing column 'type'")),
        _ => {
            return Err(SchemaError::declaration(
                path,
                "give only one of 'type', 'dtype' or 'data_type'",
            ))
        }
    };

    let mut spec = ColumnSpec::new(name, data_type)
        .nullable(opt_bool(map, "nullable", path)?.unwrap_or(false))
        .coerce(opt_bool(map, "coerce", path)?.unwrap_or(false))
        .required(opt_bool(map, "required", path)?.unwrap_or(true))
        .unique(opt_bool(map, "unique", path)?.unwrap_or(false));

    if let Some(description) = map.get("description") {
        spec = spec.with_description(as_str(description, &format!("{}.description", path))?);
    }

    match map.get("checks") {
        None | Some(Json::Null) => {}
        Some(Json::Array(checks)) => {
            for (i, check) in checks.iter().enumerate() {
                let check_path = format!("{}.checks[{}]", path, i);
                spec.checks
                    .push(parse_check(check, &spec.data_type, &check_path, registry)?);
            }
        }
        Some(_) => {
            return Err(SchemaError::declaration(
                format!("{}.checks", path),
                "expected a list of checks",
            ))
        }
    }
    Ok(spec)
}

fn parse_type(raw: &Json, path: &str, display: &str) -> SchemaResult<DataType> {
    serde_json::from_value::<DataType>(raw.clone())
        .map_err(|e| SchemaError::declaration(path, format!("bad type {}: {}", display, e)))
}

fn parse_check(
    decl: &Json,
    data_type: &DataType,
    path: &str,
    registry: &CheckRegistry,
) -> SchemaResult<Check> {
    // Bare names: `- not_null`, `- unique`, or a registered custom check.
    if let Json::String(name) = decl {
        return match name.as_str() {
            "not_null" => Ok(Check::not_null()),
            "unique" => Ok(Check::unique()),
            other => Ok(Check::custom(registry.resolve(other)?)),
        };
    }

    let map = as_object(decl, path)?;
    let kind_keys: Vec<&String> = map
        .keys()
        .filter(|k| !CHECK_OPTION_KEYS.contains(&k.as_str()))
        .collect();
    let (kind, params) = match kind_keys.as_slice() {
        [key] => (key.as_str(), &map[key.as_str()]),
        [] => return Err(SchemaError::declaration(path, "check has no kind")),
        _ => {
            return Err(SchemaError::declaration(
                path,
                format!(
                    "check must have exactly one kind, found {}",
                    kind_keys
                        .iter()
                        .map(|k| k.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ))
        }
    };
    let params_path = format!("{}.{}", path, kind);
    let scalar = |v: &Json| typed_param(v, data_type);

    let mut check = match kind {
        "isin" | "notin" => {
            let items = params.as_array().ok_or_else(|| {
                SchemaError::declaration(&params_path, "expected a list of values")
            })?;
            let values: Vec<Value> = items.iter().map(scalar).collect();
            if kind == "isin" {
                Check::new(CheckKind::Isin(values))
            } else {
                Check::new(CheckKind::Notin(values))
            }
        }
        "eq" | "equal_to" => Check::new(CheckKind::Eq(scalar(params))),
        "ne" | "not_equal_to" => Check::new(CheckKind::Ne(scalar(params))),
        "gt" | "greater_than" => Check::new(CheckKind::Gt(scalar(params))),
        "ge" | "greater_than_or_equal_to" => Check::new(CheckKind::Ge(scalar(params))),
        "lt" | "less_than" => Check::new(CheckKind::Lt(scalar(params))),
        "le" | "less_than_or_equal_to" => Check::new(CheckKind::Le(scalar(params))),
        "in_range" | "between" => match params {
            Json::Array(bounds) if bounds.len() == 2 => {
                Check::in_range(scalar(&bounds[0]), scalar(&bounds[1]))
            }
            Json::Object(bounds) => {
                reject_unknown_keys(
                    bounds,
                    &["min", "max", "include_min", "include_max"],
                    &params_path,
                )?;
                let bound = |key: &str| {
                    bounds.get(key).map(scalar).ok_or_else(|| {
                        SchemaError::declaration(&params_path, format!("missing '{}'", key))
                    })
                };
                Check::in_range_with(
                    bound("min")?,
                    bound("max")?,
                    opt_bool(bounds, "include_min", &params_path)?.unwrap_or(true),
                    opt_bool(bounds, "include_max", &params_path)?.unwrap_or(true),
                )
            }
            _ => {
                return Err(SchemaError::declaration(
                    &params_path,
                    "expected [min, max] or {min, max, include_min, include_max}",
                ))
            }
        },
        "str_matches" => Check::str_matches(as_str(params, &params_path)?)?,
        "str_contains" => Check::str_contains(as_str(params, &params_path)?)?,
        "str_startswith" => Check::str_startswith(as_str(params, &params_path)?),
        "str_endswith" => Check::str_endswith(as_str(params, &params_path)?),
        "str_length" => {
            let (min, max) = match params {
                Json::Array(bounds) if bounds.len() == 2 => (
                    opt_usize(&bounds[0], &params_path)?,
                    opt_usize(&bounds[1], &params_path)?,
                ),
                Json::Object(bounds) => {
                    reject_unknown_keys(bounds, &["min", "max"], &params_path)?;
                    (
                        opt_usize(bounds.get("min").unwrap_or(&Json::Null), &params_path)?,
                        opt_usize(bounds.get("max").unwrap_or(&Json::Null), &params_path)?,
                    )
                }
                _ => {
                    return Err(SchemaError::declaration(
                        &params_path,
                        "expected [min, max] or {min, max}",
                    ))
                }
            };
            Check::str_length(min, max)
        }
        "not_null" => {
            expect_flag(params, &params_path)?;
            Check::not_null()
        }
        "unique" => {
            expect_flag(params, &params_path)?;
            Check::unique()
        }
        "custom" => Check::custom(registry.resolve(as_str(params, &params_path)?)?),
        other => {
            return Err(SchemaError::declaration(
                path,
                format!("unknown check kind '{}'", other),
            ))
        }
    };

    if let Some(ignore_nulls) = opt_bool(map, "ignore_nulls", path)? {
        check = check.with_ignore_nulls(ignore_nulls);
    }
    if let Some(description) = map.get("description") {
        check = check.with_description(as_str(description, &format!("{}.description", path))?);
    }
    Ok(check)
}

/// Cast a declared parameter to the column type, keeping it as written when
/// the cast fails.
fn typed_param(raw: &Json, data_type: &DataType) -> Value {
    let value = Value::from_json(raw);
    cast_value(&value, data_type).unwrap_or(value)
}

fn expect_flag(params: &Json, path: &str) -> SchemaResult<()> {
    match params {
        Json::Null | Json::Bool(true) => Ok(()),
        _ => Err(SchemaError::declaration(path, "takes no parameters")),
    }
}

fn as_object<'a>(value: &'a Json, path: &str) -> SchemaResult<&'a Map<String, Json>> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::declaration(path, "expected a mapping"))
}

fn as_str<'a>(value: &'a Json, path: &str) -> SchemaResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| SchemaError::declaration(path, "expected a string"))
}

fn opt_bool(map: &Map<String, Json>, key: &str, path: &str) -> SchemaResult<Option<bool>> {
    match map.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(SchemaError::declaration(
            format!("{}.{}", path, key),
            "expected true or false",
        )),
    }
}

fn opt_usize(value: &Json, path: &str) -> SchemaResult<Option<usize>> {
    match value {
        Json::Null => Ok(None),
        other => other
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| SchemaError::declaration(path, "expected a non-negative integer")),
    }
}

fn reject_unknown_keys(map: &Map<String, Json>, allowed: &[&str], path: &str) -> SchemaResult<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(SchemaError::declaration(
            path,
            format!("unknown key '{}' (expected one of: {})", key, allowed.join(", ")),
        )),
        None => Ok(()),
    }
}

impl Schema {
    /// Render back into the declaration shape accepted by [`from_declaration`].
    pub fn to_declaration(&self) -> Json {
        let mut columns = Map::new();
        for column in self.columns() {
            let mut decl = Map::new();
            decl.insert("type".into(), json!(column.data_type));
            decl.insert("nullable".into(), json!(column.nullable));
            decl.insert("coerce".into(), json!(column.coerce));
            decl.insert("required".into(), json!(column.required));
            decl.insert("unique".into(), json!(column.unique));
            if let Some(description) = &column.description {
                decl.insert("description".into(), json!(description));
            }
            decl.insert(
                "checks".into(),
                Json::Array(column.checks.iter().map(check_declaration).collect()),
            );
            columns.insert(column.name.clone(), Json::Object(decl));
        }

        let mut doc = Map::new();
        doc.insert("name".into(), json!(self.name()));
        if let Some(description) = self.description() {
            doc.insert("description".into(), json!(description));
        }
        doc.insert("strict".into(), json!(self.strict()));
        doc.insert("ordered".into(), json!(self.ordered()));
        doc.insert("coerce".into(), json!(self.coerce()));
        if !self.unique().is_empty() {
            doc.insert("unique".into(), json!(self.unique()));
        }
        doc.insert("columns".into(), Json::Object(columns));
        Json::Object(doc)
    }
}

fn check_declaration(check: &Check) -> Json {
    let params = match check.kind() {
        CheckKind::Isin(values) | CheckKind::Notin(values) => {
            Json::Array(values.iter().map(Value::to_json).collect())
        }
        CheckKind::Eq(v)
        | CheckKind::Ne(v)
        | CheckKind::Gt(v)
        | CheckKind::Ge(v)
        | CheckKind::Lt(v)
        | CheckKind::Le(v) => v.to_json(),
        CheckKind::InRange {
            min,
            max,
            include_min,
            include_max,
        } => json!({
            "min": min.to_json(),
            "max": max.to_json(),
            "include_min": include_min,
            "include_max": include_max,
        }),
        CheckKind::StrMatches(p) | CheckKind::StrContains(p) => json!(p.as_str()),
        CheckKind::StrStartswith(s) | CheckKind::StrEndswith(s) => json!(s),
        CheckKind::StrLength { min, max } => json!({ "min": min, "max": max }),
        CheckKind::NotNull | CheckKind::Unique => Json::Bool(true),
        CheckKind::Custom(custom) => json!(custom.name()),
    };
    let kind = match check.kind() {
        CheckKind::Custom(_) => "custom",
        other => other.name(),
    };

    let mut decl = Map::new();
    decl.insert(kind.to_string(), params);
    if check.ignore_nulls() != check.kind().default_ignore_nulls() {
        decl.insert("ignore_nulls".into(), json!(check.ignore_nulls()));
    }
    if let Some(description) = check.description() {
        decl.insert("description".into(), json!(description));
    }
    Json::Object(decl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CustomCheck;

    const FRUITS_YAML: &str = r#"
name: fruits
strict: true
unique: [item, price]
columns:
  item:
    type: string
    checks:
      - isin: [apple, orange]
  price:
    dtype: float
    coerce: true
    checks:
      - gt: 0
      - in_range: {min: 0, max: 100, include_max: false}
      - custom: is_cheap
        ignore_nulls: false
  note: string
"#;

    fn registry() -> CheckRegistry {
        CheckRegistry::new().with(CustomCheck::element_wise("is_cheap", |v: &Value| {
            v.as_f64().is_some_and(|f| f < 10.0)
        }))
    }

    #[test]
    fn test_yaml_declaration() {
        let schema = from_yaml_str(FRUITS_YAML, &registry()).unwrap();
        assert_eq!(schema.name(), "fruits");
        assert!(schema.strict());
        assert_eq!(schema.column_names(), vec!["item", "price", "note"]);
        assert_eq!(schema.unique(), ["item".to_string(), "price".to_string()]);

        let price = schema.column("price").unwrap();
        assert_eq!(price.data_type, DataType::Float64);
        assert!(price.coerce);
        assert_eq!(price.checks.len(), 3);
        // Parameter cast to the column type
        assert_eq!(price.checks[0].kind(), &CheckKind::Gt(Value::Float64(0.0)));
        assert_eq!(price.checks[1].check_value().as_deref(), Some("[0, 100)"));
        assert_eq!(price.checks[2].name(), "is_cheap");
        assert!(!price.checks[2].ignore_nulls());

        assert_eq!(schema.column("note").unwrap().data_type, DataType::String);
    }

    #[test]
    fn test_json_array_columns() {
        let schema = from_json_str(
            r#"{"columns": [{"name": "id", "type": "int64", "unique": true, "checks": ["not_null"]}]}"#,
            &CheckRegistry::new(),
        )
        .unwrap();
        assert_eq!(schema.name(), DEFAULT_SCHEMA_NAME);
        let id = schema.column("id").unwrap();
        assert!(id.unique);
        assert_eq!(id.checks[0].name(), "not_null");
    }

    #[test]
    fn test_unknown_custom_check() {
        let err = from_yaml_str(FRUITS_YAML, &CheckRegistry::new()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownCheck(name) if name == "is_cheap"));
    }

    #[test]
    fn test_invalid_declarations_name_the_path() {
        let err = from_json_str(
            r#"{"columns": {"a": {"type": "int64", "nulable": true}}}"#,
            &CheckRegistry::new(),
        )
        .unwrap_err();
        assert!(
            matches!(&err, SchemaError::InvalidDeclaration { path, .. } if path == "$.columns.a"),
            "{err}"
        );

        let err = from_json_str(
            r#"{"columns": {"a": {"type": "int64", "checks": [{"gt": 1, "lt": 5}]}}}"#,
            &CheckRegistry::new(),
        )
        .unwrap_err();
        assert!(
            matches!(&err, SchemaError::InvalidDeclaration { path, .. } if path == "$.columns.a.checks[0]")
        );

        let err = from_json_str(r#"{"columns": {"a": "decimal"}}"#, &CheckRegistry::new())
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDeclaration { .. }));
    }

    #[test]
    fn test_declaration_round_trip() {
        let registry = registry();
        let schema = from_yaml_str(FRUITS_YAML, &registry).unwrap();
        let reparsed = from_declaration(&schema.to_declaration(), &registry).unwrap();
        assert_eq!(reparsed.column_names(), schema.column_names());
        assert_eq!(reparsed.strict(), schema.strict());
        assert_eq!(reparsed.unique(), schema.unique());
        let price = reparsed.column("price").unwrap();
        assert_eq!(price.checks[1], schema.column("price").unwrap().checks[1]);
        assert!(!price.checks[2].ignore_nulls());
    }

    #[test]
    fn test_timestamp_tz_object_type() {
        let schema = from_json_str(
            r#"{"columns": {"ts": {"type": {"kind": "timestamp_tz", "tz": "Europe/Paris"}}}}"#,
            &CheckRegistry::new(),
        )
        .unwrap();
        assert_eq!(
            schema.column("ts").unwrap().data_type,
            DataType::TimestampTz {
                tz: "Europe/Paris".to_string()
            }
        );
    }
}

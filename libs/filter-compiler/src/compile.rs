//! Filter list → predicate compiler (criteria in, condition tree out).
//! Execution belongs to the query layer. This module only consumes
//! `filter-core` contracts plus the registered entity schemas.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use filter_core::{
    extract_filters, CompareOp, EntityExample, EntityRef, Filter, FoldOperator, Predicate,
    PropertyPath, StringMatch, Value,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{EntitySchema, PropertyKind, SchemaRegistry};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    #[error("type mismatch on {property}: expected {expected}, got {got}")]
    TypeMismatch {
        property: String,
        expected: String,
        got: String,
    },

    #[error("invalid range bounds for {property}: {reason}")]
    InvalidRange {
        property: String,
        reason: &'static str,
    },
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Lenient compilation drops unresolvable or mistyped criteria with a
/// diagnostic log entry; strict compilation surfaces them as errors.
/// Lenient is the default: UI-originated filter sets routinely contain keys
/// that map to computed or display-only fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileMode {
    #[default]
    Lenient,
    Strict,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub mode: CompileMode,
}

impl CompileOptions {
    pub fn strict() -> Self {
        Self {
            mode: CompileMode::Strict,
        }
    }
}

/// Compiles filter lists into [`Predicate`] trees against registered
/// entity schemas.
///
/// The compiler is a pure function over its inputs: the only state carried
/// across a single call is the set of range field names already paired, so
/// one instance may serve concurrent compilations.
pub struct Compiler<'a> {
    registry: &'a SchemaRegistry,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self::with_options(registry, CompileOptions::default())
    }

    pub fn with_options(registry: &'a SchemaRegistry, options: CompileOptions) -> Self {
        Self { registry, options }
    }

    /// Compile `filters` against the named entity.
    ///
    /// An empty list yields [`Predicate::All`]. Folding is literal and
    /// left-associative in list order: mixed AND/OR lists group exactly as
    /// a running accumulator would, with no precedence reordering. An OR
    /// filter folded onto the `All` root therefore produces a predicate
    /// that matches everything; callers control grouping through filter
    /// order.
    pub fn compile(&self, entity: &str, filters: &[Filter]) -> CompileResult<Predicate> {
        let schema = self.schema(entity)?;
        let mut composite = Predicate::All;
        let mut paired_ranges: HashSet<String> = HashSet::new();

        for filter in filters {
            let leaf = match schema.kind(filter.property()) {
                Some(kind) => {
                    let path = PropertyPath::root(filter.property());
                    self.leaf(schema, &path, kind, filter)?
                }
                None => self.unresolved_leaf(schema, filter, filters, &mut paired_ranges)?,
            };
            if let Some(leaf) = leaf {
                composite = fold(composite, leaf, filter);
            }
        }

        Ok(composite)
    }

    /// Compile the query an example object stands for: equality (and
    /// wildcard string matching) on every populated property.
    pub fn compile_example(&self, entity: &str, example: &EntityExample) -> CompileResult<Predicate> {
        self.compile(entity, &extract_filters(example))
    }

    fn schema(&self, entity: &str) -> CompileResult<&'a EntitySchema> {
        self.registry
            .get(entity)
            .ok_or_else(|| CompileError::UnknownEntity(entity.to_owned()))
    }

    /* ---------- strategy dispatch ---------- */

    fn leaf(
        &self,
        schema: &EntitySchema,
        path: &PropertyPath,
        kind: PropertyKind,
        filter: &Filter,
    ) -> CompileResult<Option<Predicate>> {
        match kind {
            PropertyKind::Collection(element) => {
                self.collection_leaf(schema, path, element, filter)
            }
            PropertyKind::String => self.string_leaf(schema, path, filter),
            PropertyKind::Reference(target) => self.entity_leaf(schema, path, target, filter),
            _ => self.scalar_leaf(schema, path, kind, filter),
        }
    }

    /// Collection strategy: the value is an example of the element entity;
    /// its extracted filters compile recursively against the element schema
    /// and the result becomes an existential membership test.
    fn collection_leaf(
        &self,
        schema: &EntitySchema,
        path: &PropertyPath,
        element: &'static str,
        filter: &Filter,
    ) -> CompileResult<Option<Predicate>> {
        match filter.value() {
            Value::Example(example) if example.entity().eq_ignore_ascii_case(element) => {
                let sub = self.compile(element, &extract_filters(example))?;
                Ok(Some(Predicate::AnyMatch(path.clone(), Box::new(sub))))
            }
            Value::Example(example) => self.reference_mismatch(
                schema,
                filter,
                format!("example of {element}"),
                format!("example of {}", example.entity()),
            ),
            other => self.reference_mismatch(
                schema,
                filter,
                format!("example of {element}"),
                other.shape().to_owned(),
            ),
        }
    }

    /// String strategy. Wildcards are edge markers only: a leading `%`
    /// means ends-with, a trailing `%` means starts-with, both mean
    /// contains, neither means exact. Embedded `%` is literal text. All
    /// four forms compare case-insensitively.
    fn string_leaf(
        &self,
        schema: &EntitySchema,
        path: &PropertyPath,
        filter: &Filter,
    ) -> CompileResult<Option<Predicate>> {
        let Value::String(raw) = filter.value() else {
            return self.coercion_mismatch(schema, filter, "string");
        };
        let (matching, needle) = parse_pattern(raw);
        Ok(Some(Predicate::Like(
            path.clone(),
            matching,
            needle.to_owned(),
        )))
    }

    /// Nested-entity strategy: an assigned identity filters by exact
    /// reference; a value-only example expands into "path is not null AND
    /// every extracted sub-filter holds", with sub-filters dispatched
    /// through the full strategy set at the nested path.
    fn entity_leaf(
        &self,
        schema: &EntitySchema,
        path: &PropertyPath,
        target: &'static str,
        filter: &Filter,
    ) -> CompileResult<Option<Predicate>> {
        match filter.value() {
            Value::Reference(reference) => {
                if !reference.entity.eq_ignore_ascii_case(target) {
                    return self.reference_mismatch(
                        schema,
                        filter,
                        format!("reference to {target}"),
                        format!("reference to {}", reference.entity),
                    );
                }
                Ok(Some(Predicate::Compare(
                    path.clone(),
                    CompareOp::Eq,
                    Value::Reference(reference.clone()),
                )))
            }
            Value::Example(example) => {
                if !example.entity().eq_ignore_ascii_case(target) {
                    return self.reference_mismatch(
                        schema,
                        filter,
                        format!("reference to {target}"),
                        format!("example of {}", example.entity()),
                    );
                }
                if let Some(id) = example.id().filter(|&id| id != 0) {
                    // assigned identity wins over any populated values
                    return Ok(Some(Predicate::Compare(
                        path.clone(),
                        CompareOp::Eq,
                        Value::Reference(EntityRef::new(example.entity(), id)),
                    )));
                }
                let nested = self.schema(target)?;
                let mut partial = Predicate::IsNotNull(path.clone());
                for sub in extract_filters(example) {
                    let sub_path = path.child(sub.property());
                    let leaf = match nested.kind(sub.property()) {
                        Some(kind) => self.leaf(nested, &sub_path, kind, &sub)?,
                        None => self.unknown_property(nested, &sub)?,
                    };
                    if let Some(leaf) = leaf {
                        partial = partial.and(leaf);
                    }
                }
                Ok(Some(partial))
            }
            other => self.reference_mismatch(
                schema,
                filter,
                format!("reference to {target}"),
                other.shape().to_owned(),
            ),
        }
    }

    /// Scalar strategy: equality on the literal value after a kind check.
    fn scalar_leaf(
        &self,
        schema: &EntitySchema,
        path: &PropertyPath,
        kind: PropertyKind,
        filter: &Filter,
    ) -> CompileResult<Option<Predicate>> {
        let value = match (kind, filter.value()) {
            (PropertyKind::Number, v @ Value::Number(_)) => v.clone(),
            (PropertyKind::Bool, v @ Value::Bool(_)) => v.clone(),
            (PropertyKind::Uuid, v @ Value::Uuid(_)) => v.clone(),
            (PropertyKind::Date, v @ Value::Date(_)) => v.clone(),
            (PropertyKind::DateTime, v @ Value::DateTime(_)) => v.clone(),
            // a bare date against a timestamp property widens to midnight UTC
            (PropertyKind::DateTime, Value::Date(d)) => Value::DateTime(start_of_day(*d)),
            (kind, _) => return self.coercion_mismatch(schema, filter, kind.shape()),
        };
        Ok(Some(Predicate::Compare(path.clone(), CompareOp::Eq, value)))
    }

    /* ---------- unresolved properties: ranges, paths, drops ---------- */

    fn unresolved_leaf(
        &self,
        schema: &EntitySchema,
        filter: &Filter,
        all: &[Filter],
        paired_ranges: &mut HashSet<String>,
    ) -> CompileResult<Option<Predicate>> {
        let name = filter.property();
        let lower = name.to_ascii_lowercase();
        if lower.ends_with("from") || lower.ends_with("to") {
            if paired_ranges.insert(range_base(name).to_ascii_lowercase()) {
                return self.range_leaf(filter, all);
            }
            // the sibling bound was already folded into a range condition
            return Ok(None);
        }
        if name.contains('.') && !name.ends_with('.') {
            return self.path_leaf(schema, filter);
        }
        self.unknown_property(schema, filter)
    }

    /// Range strategy: a `<field>From`/`<field>To` pair (either side may be
    /// absent) becomes one closed-interval condition on the base field.
    /// Date-family bounds coerce to UTC timestamps with the upper bound
    /// extended to the end of its calendar day.
    fn range_leaf(&self, filter: &Filter, all: &[Filter]) -> CompileResult<Option<Predicate>> {
        let name = filter.property();
        let base = range_base(name);
        let is_from = name.to_ascii_lowercase().ends_with("from");

        let sibling_name = if is_from {
            format!("{base}to")
        } else {
            format!("{base}from")
        };
        let sibling = all
            .iter()
            .find(|f| f.property().eq_ignore_ascii_case(&sibling_name))
            .map(Filter::value);

        let (from, to) = if is_from {
            (Some(filter.value()), sibling)
        } else {
            (sibling, Some(filter.value()))
        };

        // the present bound (from preferred) decides the comparison family
        let probe = match from.or(to) {
            Some(value) => value,
            None => {
                return Err(CompileError::InvalidRange {
                    property: name.to_owned(),
                    reason: "no bound value present",
                })
            }
        };

        let path = PropertyPath::root(base);
        let leaf = match probe {
            Value::Date(_) | Value::DateTime(_) => {
                let from = from.map(|v| range_timestamp(v, name, false)).transpose()?;
                let to = to.map(|v| range_timestamp(v, name, true)).transpose()?;
                bounded(path, from.map(Value::DateTime), to.map(Value::DateTime), name)?
            }
            Value::Number(_) | Value::String(_) => {
                let from = from.map(|v| ordinal_bound(v, probe, name)).transpose()?;
                let to = to.map(|v| ordinal_bound(v, probe, name)).transpose()?;
                bounded(path, from, to, name)?
            }
            _ => {
                return Err(CompileError::InvalidRange {
                    property: name.to_owned(),
                    reason: "bounds must be date, number, or string values",
                })
            }
        };
        Ok(Some(leaf))
    }

    /// Dotted-path strategy: walk reference properties segment by segment,
    /// then dispatch the final segment through the normal strategies at the
    /// accumulated path.
    fn path_leaf(
        &self,
        schema: &EntitySchema,
        filter: &Filter,
    ) -> CompileResult<Option<Predicate>> {
        let mut current = schema;
        let mut path: Option<PropertyPath> = None;
        let mut segments = filter.property().split('.').peekable();

        while let Some(segment) = segments.next() {
            let extended = match &path {
                Some(p) => p.child(segment),
                None => PropertyPath::root(segment),
            };
            if segments.peek().is_none() {
                return match current.kind(segment) {
                    Some(kind) => self.leaf(current, &extended, kind, filter),
                    None => self.unknown_property(current, filter),
                };
            }
            match current.kind(segment) {
                Some(PropertyKind::Reference(target)) => {
                    current = self.schema(target)?;
                    path = Some(extended);
                }
                _ => return self.unknown_property(current, filter),
            }
        }

        self.unknown_property(schema, filter)
    }

    /* ---------- drop-or-fail policies ---------- */

    fn unknown_property(
        &self,
        schema: &EntitySchema,
        filter: &Filter,
    ) -> CompileResult<Option<Predicate>> {
        if self.options.mode == CompileMode::Strict {
            return Err(CompileError::UnknownProperty(filter.property().to_owned()));
        }
        tracing::debug!(
            "property {} does not exist on {}; dropping filter (append custom conditions to the compiled predicate instead)",
            filter.property(),
            schema.name()
        );
        Ok(None)
    }

    fn coercion_mismatch(
        &self,
        schema: &EntitySchema,
        filter: &Filter,
        expected: &str,
    ) -> CompileResult<Option<Predicate>> {
        if self.options.mode == CompileMode::Strict {
            return Err(CompileError::TypeMismatch {
                property: filter.property().to_owned(),
                expected: expected.to_owned(),
                got: filter.value().shape().to_owned(),
            });
        }
        tracing::warn!(
            "cannot coerce {} value into {} property {}.{}; dropping filter",
            filter.value().shape(),
            expected,
            schema.name(),
            filter.property()
        );
        Ok(None)
    }

    fn reference_mismatch(
        &self,
        schema: &EntitySchema,
        filter: &Filter,
        expected: String,
        got: String,
    ) -> CompileResult<Option<Predicate>> {
        if self.options.mode == CompileMode::Strict {
            return Err(CompileError::TypeMismatch {
                property: filter.property().to_owned(),
                expected,
                got,
            });
        }
        tracing::error!(
            "invalid value for {}.{}: expected {}, got {}; dropping filter",
            schema.name(),
            filter.property(),
            expected,
            got
        );
        Ok(None)
    }
}

/* ---------- fold ---------- */

fn fold(composite: Predicate, leaf: Predicate, filter: &Filter) -> Predicate {
    let leaf = if filter.is_negative() {
        leaf.negate()
    } else {
        leaf
    };
    match filter.operator() {
        FoldOperator::And => composite.and(leaf),
        FoldOperator::Or => composite.or(leaf),
    }
}

/* ---------- string pattern helpers ---------- */

fn parse_pattern(raw: &str) -> (StringMatch, &str) {
    let mut text = raw;
    let suffix = text.starts_with('%');
    if suffix {
        text = &text[1..];
    }
    let prefix = text.ends_with('%');
    if prefix {
        text = &text[..text.len() - 1];
    }
    let matching = match (prefix, suffix) {
        (true, true) => StringMatch::Contains,
        (true, false) => StringMatch::Prefix,
        (false, true) => StringMatch::Suffix,
        (false, false) => StringMatch::Exact,
    };
    (matching, text)
}

/* ---------- range helpers ---------- */

fn range_base(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with("from") {
        &name[..name.len() - 4]
    } else if lower.ends_with("to") {
        &name[..name.len() - 2]
    } else {
        name
    }
}

fn range_timestamp(value: &Value, property: &str, upper: bool) -> CompileResult<DateTime<Utc>> {
    match value {
        Value::Date(d) if upper => Ok(end_of_day(*d)),
        Value::Date(d) => Ok(start_of_day(*d)),
        Value::DateTime(dt) if upper => Ok(end_of_day(dt.date_naive())),
        Value::DateTime(dt) => Ok(*dt),
        _ => Err(CompileError::InvalidRange {
            property: property.to_owned(),
            reason: "mixed date and non-date bounds",
        }),
    }
}

fn ordinal_bound(value: &Value, probe: &Value, property: &str) -> CompileResult<Value> {
    match (probe, value) {
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_)) => {
            Ok(value.clone())
        }
        _ => Err(CompileError::InvalidRange {
            property: property.to_owned(),
            reason: "bounds are not of one comparable family",
        }),
    }
}

fn bounded(
    path: PropertyPath,
    from: Option<Value>,
    to: Option<Value>,
    property: &str,
) -> CompileResult<Predicate> {
    match (from, to) {
        (Some(lo), Some(hi)) => Ok(Predicate::Between(path, lo, hi)),
        (Some(lo), None) => Ok(Predicate::Compare(path, CompareOp::Ge, lo)),
        (None, Some(hi)) => Ok(Predicate::Compare(path, CompareOp::Le, hi)),
        (None, None) => Err(CompileError::InvalidRange {
            property: property.to_owned(),
            reason: "no bound value present",
        }),
    }
}

/* ---------- day boundaries ---------- */

fn start_of_day(d: NaiveDate) -> DateTime<Utc> {
    d.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(d: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).expect("valid wall-clock time");
    d.and_time(last).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_markers_are_edge_only() {
        assert_eq!(parse_pattern("Luc%"), (StringMatch::Prefix, "Luc"));
        assert_eq!(parse_pattern("%Luc"), (StringMatch::Suffix, "Luc"));
        assert_eq!(parse_pattern("%Luc%"), (StringMatch::Contains, "Luc"));
        assert_eq!(parse_pattern("Luc"), (StringMatch::Exact, "Luc"));
        assert_eq!(parse_pattern("Lu%c"), (StringMatch::Exact, "Lu%c"));
        assert_eq!(parse_pattern("%"), (StringMatch::Suffix, ""));
    }

    #[test]
    fn options_deserialize_from_config_fragments() {
        let opts: CompileOptions = serde_json::from_str(r#"{"mode":"strict"}"#).unwrap();
        assert_eq!(opts.mode, CompileMode::Strict);
        let opts: CompileOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.mode, CompileMode::Lenient);
    }

    #[test]
    fn range_base_strips_suffix_case_insensitively() {
        assert_eq!(range_base("releaseFrom"), "release");
        assert_eq!(range_base("releaseTO"), "release");
        assert_eq!(range_base("releasefrom"), "release");
        assert_eq!(range_base("release"), "release");
    }

    #[test]
    fn end_of_day_extends_to_last_millisecond() {
        let d = NaiveDate::from_ymd_opt(2016, 5, 20).expect("valid date");
        let eod = end_of_day(d);
        assert_eq!(eod.to_rfc3339(), "2016-05-20T23:59:59.999+00:00");
        assert_eq!(start_of_day(d).to_rfc3339(), "2016-05-20T00:00:00+00:00");
    }
}

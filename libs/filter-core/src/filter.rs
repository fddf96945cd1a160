//! A `Filter` is one criterion handed to the compiler: which property,
//! which value, whether the resulting condition is negated, and how it folds
//! into the running composite (AND/OR). Filters are immutable once built and
//! compare by value, so callers may collect them into sets for
//! de-duplication.

use serde::{Deserialize, Serialize};

use crate::value::{EntityExample, Value};

/// How a filter's condition is folded into the composite predicate.
///
/// This is not the comparison operator: the comparison is inferred from the
/// declared property kind and the value shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldOperator {
    #[default]
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    property: String,
    value: Value,
    #[serde(default)]
    negative: bool,
    #[serde(default)]
    operator: FoldOperator,
}

impl Filter {
    /// A plain criterion: not negated, AND-folded.
    pub fn new(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            negative: false,
            operator: FoldOperator::And,
        }
    }

    /// The criterion produced by search widgets: a trailing `%` is appended
    /// so the text matches as a case-insensitive prefix.
    pub fn search(property: impl Into<String>, text: &str) -> Self {
        Self::new(property, format!("{text}%"))
    }

    pub fn negated(mut self) -> Self {
        self.negative = true;
        self
    }

    pub fn or(mut self) -> Self {
        self.operator = FoldOperator::Or;
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn operator(&self) -> FoldOperator {
        self.operator
    }
}

/// Derive the filter list an example object stands for: one AND-folded,
/// non-negated filter per populated property.
///
/// Collection-typed values are skipped; collections are filtered through
/// nested-value semantics, not example extraction. Identity never appears
/// here because [`EntityExample`] keeps it out of the property list.
pub fn extract_filters(example: &EntityExample) -> Vec<Filter> {
    example
        .values()
        .iter()
        .filter(|(_, value)| !matches!(value, Value::List(_)))
        .map(|(property, value)| Filter::new(property.clone(), value.clone()))
        .collect()
}

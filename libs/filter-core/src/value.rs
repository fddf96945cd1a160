//! Filter values form a closed union: every shape a criterion can carry is a
//! variant here, so the compiler's strategy dispatch is an exhaustive match
//! rather than a runtime type probe.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value carried by a [`Filter`](crate::Filter).
///
/// `Reference` points at a related entity by assigned identity;
/// `Example` is a partially populated instance of a related entity used for
/// query-by-example; `List` holds multiple values of the element shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Number(BigDecimal),
    Bool(bool),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Reference(EntityRef),
    Example(EntityExample),
    List(Vec<Value>),
}

impl Value {
    /// Short shape tag used in diagnostics and type-mismatch errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Reference(_) => "reference",
            Value::Example(_) => "example",
            Value::List(_) => "list",
        }
    }
}

/// A related entity identified by its assigned (nonzero) id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity: String,
    pub id: i64,
}

impl EntityRef {
    pub fn new(entity: impl Into<String>, id: i64) -> Self {
        Self {
            entity: entity.into(),
            id,
        }
    }
}

/// A partially populated example of an entity.
///
/// Only populated properties are recorded; identity sits in its own slot so
/// that extraction never emits it as a criterion. Version and bookkeeping
/// fields are excluded when the example is built. An example whose `id` is
/// assigned (nonzero) is treated as a plain reference by the compiler.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityExample {
    entity: String,
    id: Option<i64>,
    values: Vec<(String, Value)>,
}

impl EntityExample {
    pub fn of(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: None,
            values: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Record a populated property. Insertion order is preserved and governs
    /// the order of extracted filters.
    pub fn set(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((property.into(), value.into()));
        self
    }

    /// Record a property only when it is populated. Mirrors how examples are
    /// built from structs with optional fields.
    pub fn maybe(self, property: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.set(property, v),
            None => self,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }

    /// Whether this example carries an assigned identity and should be
    /// treated as an exact reference instead of a value-only example.
    pub fn is_reference(&self) -> bool {
        matches!(self.id, Some(id) if id != 0)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<BigDecimal> for Value {
    fn from(n: BigDecimal) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(BigDecimal::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(BigDecimal::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<EntityRef> for Value {
    fn from(r: EntityRef) -> Self {
        Value::Reference(r)
    }
}

impl From<EntityExample> for Value {
    fn from(e: EntityExample) -> Self {
        Value::Example(e)
    }
}

impl From<Vec<Value>> for Value {
    fn from(vs: Vec<Value>) -> Self {
        Value::List(vs)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Reference(r) => write!(f, "{}#{}", r.entity, r.id),
            Value::Example(e) => write!(f, "{}{{..}}", e.entity()),
            Value::List(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

//! Boolean scalar filters evaluated inside the vector scan.
//!
//! Filters are built structurally rather than by concatenating expression
//! strings; `Display` renders the equivalent expression for logging.

use std::collections::HashMap;
use std::fmt;

use crate::column::ScalarValue;
use crate::error::{Result, VectorDbError};
use crate::schema::CollectionSchema;

/// A filter condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: ScalarValue },
    In { field: String, values: Vec<ScalarValue> },
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Filter::Eq { field: field.into(), value: value.into() }
    }

    pub fn is_in<V: Into<ScalarValue>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In { field: field.into(), values: values.into_iter().map(Into::into).collect() }
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Check every referenced field exists, is scalar, and matches the literal types.
    pub fn validate(&self, schema: &CollectionSchema) -> Result<()> {
        let check = |field: &str, value: &ScalarValue| -> Result<()> {
            let def = schema
                .field(field)
                .ok_or_else(|| VectorDbError::InvalidFilter(format!("unknown field `{field}`")))?;
            if !value.fits(&def.data_type) {
                return Err(VectorDbError::InvalidFilter(format!(
                    "literal {value} does not match {} field `{field}`",
                    def.data_type.name()
                )));
            }
            Ok(())
        };
        match self {
            Filter::Eq { field, value } => check(field, value),
            Filter::In { field, values } => values.iter().try_for_each(|v| check(field, v)),
            Filter::Not(inner) => inner.validate(schema),
            Filter::And(filters) | Filter::Or(filters) => filters.iter().try_for_each(|f| f.validate(schema)),
        }
    }

    /// Evaluate the filter against a row's scalar fields.
    pub fn matches(&self, fields: &HashMap<String, ScalarValue>) -> bool {
        match self {
            Filter::Eq { field, value } => fields.get(field) == Some(value),
            Filter::In { field, values } => fields.get(field).is_some_and(|v| values.contains(v)),
            Filter::Not(inner) => !inner.matches(fields),
            Filter::And(filters) => filters.iter().all(|f| f.matches(fields)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(fields)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, filters: &[Filter], op: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, filter) in filters.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{filter}")?;
            }
            write!(f, ")")
        }
        match self {
            Filter::Eq { field, value } => write!(f, "{field} == {value}"),
            Filter::In { field, values } => {
                write!(f, "{field} in [")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Filter::Not(inner) => write!(f, "not ({inner})"),
            Filter::And(filters) => join(f, filters, "and"),
            Filter::Or(filters) => join(f, filters, "or"),
        }
    }
}

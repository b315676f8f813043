//! Column-oriented field data: one array per field, positions aligned across
//! columns. Inserts take columns and search/query results return them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::DataType;

/// A single scalar cell value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Int64(i64),
    VarChar(String),
}

impl ScalarValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::VarChar(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value can live in a field of the given type.
    pub fn fits(&self, data_type: &DataType) -> bool {
        matches!(
            (self, data_type),
            (Self::Int64(_), DataType::Int64) | (Self::VarChar(_), DataType::VarChar { .. })
        )
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64(v) => write!(f, "{v}"),
            Self::VarChar(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' | '\\' => write!(f, "\\{c}")?,
                        _ => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        Self::VarChar(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        Self::VarChar(v)
    }
}

/// Named column of field values.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64 { name: String, values: Vec<i64> },
    VarChar { name: String, values: Vec<String> },
    FloatVector { name: String, dim: usize, values: Vec<Vec<f32>> },
}

impl Column {
    pub fn int64(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::Int64 { name: name.into(), values }
    }

    pub fn varchar(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::VarChar { name: name.into(), values }
    }

    pub fn float_vector(name: impl Into<String>, dim: usize, values: Vec<Vec<f32>>) -> Self {
        Self::FloatVector { name: name.into(), dim, values }
    }

    /// Empty column shaped for a schema field.
    pub(crate) fn empty_for(name: &str, data_type: &DataType) -> Self {
        match *data_type {
            DataType::Int64 => Self::int64(name, Vec::new()),
            DataType::VarChar { .. } => Self::varchar(name, Vec::new()),
            DataType::FloatVector { dim } => Self::float_vector(name, dim, Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Int64 { name, .. } | Self::VarChar { name, .. } | Self::FloatVector { name, .. } => name,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int64 { values, .. } => values.len(),
            Self::VarChar { values, .. } => values.len(),
            Self::FloatVector { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int64 { .. } => "int64",
            Self::VarChar { .. } => "varchar",
            Self::FloatVector { .. } => "float_vector",
        }
    }

    pub fn as_int64(&self) -> Option<&[i64]> {
        match self {
            Self::Int64 { values, .. } => Some(values),
            _ => None,
        }
    }

    pub fn as_varchar(&self) -> Option<&[String]> {
        match self {
            Self::VarChar { values, .. } => Some(values),
            _ => None,
        }
    }

    pub fn as_float_vector(&self) -> Option<&[Vec<f32>]> {
        match self {
            Self::FloatVector { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Scalar value at a position; `None` for vector columns or out of range.
    pub fn scalar_at(&self, idx: usize) -> Option<ScalarValue> {
        match self {
            Self::Int64 { values, .. } => values.get(idx).copied().map(ScalarValue::Int64),
            Self::VarChar { values, .. } => values.get(idx).cloned().map(ScalarValue::VarChar),
            Self::FloatVector { .. } => None,
        }
    }

    /// Append a scalar to a scalar column of the matching type.
    pub(crate) fn push_scalar(&mut self, value: ScalarValue) -> bool {
        match (self, value) {
            (Self::Int64 { values, .. }, ScalarValue::Int64(v)) => {
                values.push(v);
                true
            }
            (Self::VarChar { values, .. }, ScalarValue::VarChar(v)) => {
                values.push(v);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn push_vector(&mut self, vector: Vec<f32>) -> bool {
        match self {
            Self::FloatVector { values, .. } => {
                values.push(vector);
                true
            }
            _ => false,
        }
    }
}

/// Find a column by field name.
pub fn find_column<'a>(columns: &'a [Column], name: &str) -> Option<&'a Column> {
    columns.iter().find(|c| c.name() == name)
}

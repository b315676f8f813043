//! Collection schema: ordered field list with one int64 primary key and one
//! dense float vector field.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorDbError};

/// Data type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DataType {
    Int64,
    VarChar { max_length: usize },
    FloatVector { dim: usize },
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::VarChar { .. } => "varchar",
            Self::FloatVector { .. } => "float_vector",
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::FloatVector { .. })
    }
}

/// A field definition in a collection schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub auto_id: bool,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self { name: name.into(), data_type, is_primary_key: false, auto_id: false }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }
}

/// Collection schema definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldSchema>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: String::new(), fields: Vec::new() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.is_primary_key)
    }

    pub fn vector_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.data_type.is_vector())
    }

    pub fn dimension(&self) -> usize {
        match self.vector_field().map(|f| f.data_type) {
            Some(DataType::FloatVector { dim }) => dim,
            _ => 0,
        }
    }

    /// Scalar (non-vector) fields, in declaration order.
    pub fn scalar_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| !f.data_type.is_vector())
    }

    /// Same fields in the same order; the description does not participate.
    pub fn is_compatible(&self, other: &CollectionSchema) -> bool {
        self.fields == other.fields
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(VectorDbError::InvalidSchema("collection name is empty".into()));
        }
        for (i, f) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|g| g.name == f.name) {
                return Err(VectorDbError::InvalidSchema(format!("duplicate field `{}`", f.name)));
            }
        }

        let pks: Vec<_> = self.fields.iter().filter(|f| f.is_primary_key).collect();
        match pks.as_slice() {
            [pk] if pk.data_type != DataType::Int64 => {
                return Err(VectorDbError::InvalidSchema(format!(
                    "primary key `{}` must be int64, got {}",
                    pk.name,
                    pk.data_type.name()
                )));
            }
            [pk] if pk.auto_id => {
                return Err(VectorDbError::InvalidSchema("auto_id primary keys are not supported".into()));
            }
            [_] => {}
            _ => {
                return Err(VectorDbError::InvalidSchema(format!(
                    "expected exactly one primary key, found {}",
                    pks.len()
                )));
            }
        }

        let vectors: Vec<_> = self.fields.iter().filter(|f| f.data_type.is_vector()).collect();
        match vectors.as_slice() {
            [v] => {
                if let DataType::FloatVector { dim: 0 } = v.data_type {
                    return Err(VectorDbError::InvalidSchema(format!("vector field `{}` has dim 0", v.name)));
                }
            }
            _ => {
                return Err(VectorDbError::InvalidSchema(format!(
                    "expected exactly one float_vector field, found {}",
                    vectors.len()
                )));
            }
        }

        for f in &self.fields {
            if let DataType::VarChar { max_length: 0 } = f.data_type {
                return Err(VectorDbError::InvalidSchema(format!("varchar field `{}` has max_length 0", f.name)));
            }
        }
        Ok(())
    }
}

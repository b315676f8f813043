//! Collection: column-oriented inserts, growing/sealed segments, an
//! optional partitioned index over sealed rows, and load-gated search.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::column::{Column, ScalarValue};
use crate::error::{Result, VectorDbError};
use crate::filter::Filter;
use crate::index::{self, FlatIndex, IndexParams, IvfFlatIndex, SearchParams, TopK, VectorIndex};
use crate::schema::{CollectionSchema, DataType};

/// Read consistency requested by a search or query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyLevel {
    /// Sees every row inserted before the read, flushed or not.
    Strong,
    /// Sees flushed rows only.
    #[default]
    Bounded,
    /// Sees flushed rows only.
    Eventually,
}

impl ConsistencyLevel {
    fn sees_growing(self) -> bool {
        self == Self::Strong
    }
}

/// Whether the collection is queryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Released,
    Loading,
    Loaded,
}

/// A vector search over one collection.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Vector field to search.
    pub anns_field: String,
    /// One or more query vectors; one result set is returned per vector.
    pub vectors: Vec<Vec<f32>>,
    pub top_k: usize,
    pub filter: Option<Filter>,
    /// Scalar fields to return alongside ids and distances.
    pub output_fields: Vec<String>,
    pub params: SearchParams,
    pub consistency: ConsistencyLevel,
}

/// Column-oriented hits for one query vector. Position `i` of `ids`, of every
/// column in `fields`, and of `scores` describe the same row.
#[derive(Debug, Clone)]
pub struct SearchResultSet {
    pub ids: Column,
    pub fields: Vec<Column>,
    pub scores: Vec<f32>,
}

impl SearchResultSet {
    pub fn result_count(&self) -> usize {
        self.scores.len()
    }

    pub fn field(&self, name: &str) -> Option<&Column> {
        self.fields.iter().find(|c| c.name() == name)
    }
}

#[derive(Debug, Clone)]
struct Row {
    scalars: HashMap<String, ScalarValue>,
    vector: Vec<f32>,
}

#[derive(Default)]
struct Segments {
    sealed: HashMap<i64, Row>,
    growing: HashMap<i64, Row>,
}

struct BuiltIndex {
    params: IndexParams,
    index: Box<dyn VectorIndex>,
}

/// A Collection manages rows of one schema with index-backed search.
///
/// Lock order is `data` before `index` everywhere.
pub struct Collection {
    schema: CollectionSchema,
    pk_field: String,
    vector_field: String,
    dimension: usize,
    data: RwLock<Segments>,
    index: RwLock<Option<BuiltIndex>>,
    load_state: RwLock<LoadState>,
}

impl Collection {
    pub fn new(schema: CollectionSchema) -> Result<Self> {
        schema.validate()?;
        let pk_field = schema.primary_key().map(|f| f.name.clone()).unwrap_or_default();
        let vector_field = schema.vector_field().map(|f| f.name.clone()).unwrap_or_default();
        let dimension = schema.dimension();
        Ok(Self {
            schema,
            pk_field,
            vector_field,
            dimension,
            data: RwLock::new(Segments::default()),
            index: RwLock::new(None),
            load_state: RwLock::new(LoadState::Released),
        })
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of flushed rows.
    pub fn num_entities(&self) -> usize {
        self.data.read().sealed.len()
    }

    /// Number of inserted rows not yet flushed.
    pub fn num_growing(&self) -> usize {
        self.data.read().growing.len()
    }

    pub fn load_state(&self) -> LoadState {
        *self.load_state.read()
    }

    pub fn index_params(&self) -> Option<IndexParams> {
        self.index.read().as_ref().map(|b| b.params)
    }

    pub fn has_index(&self) -> bool {
        self.index.read().is_some()
    }

    /// Insert one column per schema field. The whole batch is validated before
    /// any row is applied; rows land in the growing segment.
    pub fn insert(&self, columns: Vec<Column>) -> Result<Vec<i64>> {
        let rows = self.rows_from_columns(columns)?;

        let mut data = self.data.write();
        if let Some((pk, _)) = rows
            .iter()
            .find(|(pk, _)| data.sealed.contains_key(pk) || data.growing.contains_key(pk))
        {
            return Err(VectorDbError::DuplicateKey(*pk));
        }

        let mut ids = Vec::with_capacity(rows.len());
        for (pk, row) in rows {
            data.growing.insert(pk, row);
            ids.push(pk);
        }
        debug!(collection = %self.name(), rows = ids.len(), "inserted into growing segment");
        Ok(ids)
    }

    fn rows_from_columns(&self, columns: Vec<Column>) -> Result<Vec<(i64, Row)>> {
        let mut by_name: HashMap<String, Column> = HashMap::with_capacity(columns.len());
        for column in columns {
            let name = column.name().to_string();
            if self.schema.field(&name).is_none() {
                return Err(VectorDbError::InvalidColumns(format!("unknown field `{name}`")));
            }
            if by_name.insert(name.clone(), column).is_some() {
                return Err(VectorDbError::InvalidColumns(format!("field `{name}` given twice")));
            }
        }

        let mut num_rows = None;
        for field in &self.schema.fields {
            let column = by_name
                .get(&field.name)
                .ok_or_else(|| VectorDbError::InvalidColumns(format!("missing field `{}`", field.name)))?;
            if column.type_name() != field.data_type.name() {
                return Err(VectorDbError::InvalidColumns(format!(
                    "field `{}` expects {}, got {}",
                    field.name,
                    field.data_type.name(),
                    column.type_name()
                )));
            }
            let expected = *num_rows.get_or_insert(column.len());
            if column.len() != expected {
                return Err(VectorDbError::InvalidColumns(format!(
                    "column `{}` has {} rows, expected {expected}",
                    field.name,
                    column.len()
                )));
            }
            match (field.data_type, column) {
                (DataType::FloatVector { dim }, Column::FloatVector { dim: col_dim, values, .. }) => {
                    if *col_dim != dim {
                        return Err(VectorDbError::DimensionMismatch { expected: dim, got: *col_dim });
                    }
                    if let Some(v) = values.iter().find(|v| v.len() != dim) {
                        return Err(VectorDbError::DimensionMismatch { expected: dim, got: v.len() });
                    }
                }
                (DataType::VarChar { max_length }, Column::VarChar { values, .. }) => {
                    if let Some(v) = values.iter().find(|v| v.len() > max_length) {
                        return Err(VectorDbError::InvalidColumns(format!(
                            "field `{}` value of {} bytes exceeds max_length {max_length}",
                            field.name,
                            v.len()
                        )));
                    }
                }
                _ => {}
            }
        }
        let num_rows = num_rows.unwrap_or(0);
        if num_rows == 0 {
            return Err(VectorDbError::InvalidColumns("empty batch".into()));
        }

        let pks = by_name
            .get(&self.pk_field)
            .and_then(|c| c.as_int64())
            .map(<[i64]>::to_vec)
            .unwrap_or_default();
        let mut seen = HashSet::with_capacity(pks.len());
        if let Some(dup) = pks.iter().find(|pk| !seen.insert(**pk)) {
            return Err(VectorDbError::DuplicateKey(*dup));
        }

        let vectors = by_name
            .remove(&self.vector_field)
            .and_then(|c| match c {
                Column::FloatVector { values, .. } => Some(values),
                _ => None,
            })
            .unwrap_or_default();

        let mut rows: Vec<(i64, Row)> = pks
            .iter()
            .zip(vectors)
            .map(|(&pk, vector)| (pk, Row { scalars: HashMap::new(), vector }))
            .collect();
        for (name, column) in &by_name {
            for (i, (_, row)) in rows.iter_mut().enumerate() {
                if let Some(value) = column.scalar_at(i) {
                    row.scalars.insert(name.clone(), value);
                }
            }
        }
        Ok(rows)
    }

    /// Seal the growing segment. Sealed rows join the built index, if any.
    pub fn flush(&self) -> Result<usize> {
        let mut data = self.data.write();
        let index = self.index.read();
        let growing = std::mem::take(&mut data.growing);
        let count = growing.len();
        for (pk, row) in growing {
            if let Some(built) = index.as_ref() {
                built.index.insert(pk, &row.vector)?;
            }
            data.sealed.insert(pk, row);
        }
        debug!(collection = %self.name(), sealed = count, total = data.sealed.len(), "flushed");
        Ok(count)
    }

    /// Build (or rebuild) the index over sealed rows.
    ///
    /// Training runs on a snapshot without holding the data lock, so inserts
    /// and flushes proceed meanwhile; rows sealed or deleted during training
    /// are reconciled before the new index is swapped in.
    pub fn create_index(&self, field: &str, params: IndexParams) -> Result<()> {
        if field != self.vector_field {
            return Err(VectorDbError::IndexBuild(format!(
                "`{field}` is not the vector field of `{}`",
                self.name()
            )));
        }

        let snapshot: Vec<(i64, Vec<f32>)> = {
            let data = self.data.read();
            data.sealed.iter().map(|(pk, r)| (*pk, r.vector.clone())).collect()
        };
        if snapshot.is_empty() {
            return Err(VectorDbError::IndexBuild(format!(
                "collection `{}` has no flushed rows",
                self.name()
            )));
        }

        let built: Box<dyn VectorIndex> = match params {
            IndexParams::Flat { metric } => {
                let flat = FlatIndex::with_capacity(self.dimension, metric, snapshot.len());
                for (pk, v) in &snapshot {
                    flat.insert(*pk, v)?;
                }
                Box::new(flat)
            }
            IndexParams::IvfFlat { metric, nlist } => {
                Box::new(IvfFlatIndex::train(self.dimension, metric, nlist, &snapshot)?)
            }
        };

        let data = self.data.read();
        for label in built.labels() {
            if !data.sealed.contains_key(&label) {
                built.delete(label);
            }
        }
        for (pk, row) in &data.sealed {
            if !built.contains(*pk) {
                built.insert(*pk, &row.vector)?;
            }
        }
        *self.index.write() = Some(BuiltIndex { params, index: built });
        info!(collection = %self.name(), ?params, rows = data.sealed.len(), "index built");
        Ok(())
    }

    /// Make the collection queryable. Requires a built index.
    pub fn load(&self) -> Result<()> {
        {
            let mut state = self.load_state.write();
            if *state == LoadState::Loaded {
                return Ok(());
            }
            *state = LoadState::Loading;
        }
        if !self.has_index() {
            *self.load_state.write() = LoadState::Released;
            return Err(VectorDbError::IndexNotFound(self.name().to_string()));
        }
        *self.load_state.write() = LoadState::Loaded;
        info!(collection = %self.name(), "loaded");
        Ok(())
    }

    pub fn release(&self) {
        *self.load_state.write() = LoadState::Released;
        info!(collection = %self.name(), "released");
    }

    fn require_loaded(&self) -> Result<()> {
        match self.load_state() {
            LoadState::Loaded => Ok(()),
            _ => Err(VectorDbError::NotLoaded(self.name().to_string())),
        }
    }

    fn check_output_fields(&self, output_fields: &[String]) -> Result<()> {
        for name in output_fields {
            match self.schema.field(name) {
                Some(f) if !f.data_type.is_vector() => {}
                Some(_) => {
                    return Err(VectorDbError::InvalidSearch(format!("vector field `{name}` cannot be an output field")));
                }
                None => return Err(VectorDbError::FieldNotFound(name.clone())),
            }
        }
        Ok(())
    }

    fn project(&self, ids: &[i64], data: &Segments, output_fields: &[String]) -> Vec<Column> {
        let mut columns: Vec<Column> = output_fields
            .iter()
            .filter_map(|name| self.schema.field(name).map(|f| Column::empty_for(name, &f.data_type)))
            .collect();
        for id in ids {
            let row = data.sealed.get(id).or_else(|| data.growing.get(id));
            for column in columns.iter_mut() {
                let value = if column.name() == self.pk_field {
                    Some(ScalarValue::Int64(*id))
                } else {
                    row.and_then(|r| r.scalars.get(column.name()).cloned())
                };
                if let Some(v) = value {
                    column.push_scalar(v);
                }
            }
        }
        columns
    }

    /// Approximate nearest-neighbor search restricted by `request.filter`.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResultSet>> {
        self.require_loaded()?;
        if request.anns_field != self.vector_field {
            return Err(VectorDbError::FieldNotFound(request.anns_field.clone()));
        }
        if request.top_k == 0 {
            return Err(VectorDbError::InvalidSearch("top_k must be at least 1".into()));
        }
        if request.vectors.is_empty() {
            return Err(VectorDbError::InvalidSearch("no query vectors".into()));
        }
        if let Some(v) = request.vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(VectorDbError::DimensionMismatch { expected: self.dimension, got: v.len() });
        }
        if let Some(filter) = &request.filter {
            filter.validate(&self.schema)?;
        }
        self.check_output_fields(&request.output_fields)?;

        let data = self.data.read();
        let index = self.index.read();
        let built = index
            .as_ref()
            .ok_or_else(|| VectorDbError::IndexNotFound(self.name().to_string()))?;
        if request.params.nprobe == 0 || request.params.nprobe > built.params.nlist() {
            return Err(VectorDbError::InvalidSearch(format!(
                "nprobe must be in 1..={}, got {}",
                built.params.nlist(),
                request.params.nprobe
            )));
        }

        let metric = built.params.metric();
        let filter = request.filter.as_ref();
        let sealed_ok = |id: i64| {
            data.sealed
                .get(&id)
                .is_some_and(|r| filter.map_or(true, |f| f.matches(&r.scalars)))
        };
        let growing_ok = |id: i64| {
            data.growing
                .get(&id)
                .is_some_and(|r| filter.map_or(true, |f| f.matches(&r.scalars)))
        };

        let mut results = Vec::with_capacity(request.vectors.len());
        for query in &request.vectors {
            let mut parts = vec![built.index.search(query, request.top_k, &request.params, &sealed_ok)?];
            if request.consistency.sees_growing() {
                // Growing rows are not indexed yet; scan them exactly.
                let mut top = TopK::new(request.top_k);
                for (&id, row) in &data.growing {
                    if growing_ok(id) {
                        top.push(id, metric.distance(query, &row.vector));
                    }
                }
                parts.push(top.into_result());
            }
            let merged = index::merge_results(parts, request.top_k);
            results.push(SearchResultSet {
                fields: self.project(&merged.ids, &data, &request.output_fields),
                ids: Column::int64(self.pk_field.clone(), merged.ids),
                scores: merged.distances,
            });
        }
        Ok(results)
    }

    /// Fetch rows by primary key. Missing keys are skipped; the primary key
    /// column comes first, followed by `output_fields`.
    pub fn query_by_pks(
        &self,
        pks: &[i64],
        output_fields: &[String],
        consistency: ConsistencyLevel,
    ) -> Result<Vec<Column>> {
        self.require_loaded()?;
        self.check_output_fields(output_fields)?;
        let data = self.data.read();
        let found: Vec<i64> = pks
            .iter()
            .copied()
            .filter(|pk| data.sealed.contains_key(pk) || (consistency.sees_growing() && data.growing.contains_key(pk)))
            .collect();
        let fields: Vec<String> = output_fields.iter().filter(|f| **f != self.pk_field).cloned().collect();
        let mut columns = vec![Column::int64(self.pk_field.clone(), found.clone())];
        columns.extend(self.project(&found, &data, &fields));
        Ok(columns)
    }

    /// Delete rows by primary key. Unknown keys are ignored; returns how many
    /// rows were removed.
    pub fn delete_by_pks(&self, pks: &[i64]) -> usize {
        let mut data = self.data.write();
        let index = self.index.read();
        let mut removed = 0;
        for pk in pks {
            let sealed = data.sealed.remove(pk).is_some();
            let growing = data.growing.remove(pk).is_some();
            if sealed {
                if let Some(built) = index.as_ref() {
                    built.index.delete(*pk);
                }
            }
            if sealed || growing {
                removed += 1;
            }
        }
        debug!(collection = %self.name(), requested = pks.len(), removed, "deleted by pks");
        removed
    }
}

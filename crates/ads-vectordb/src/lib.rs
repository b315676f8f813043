//! In-process vector store.
//!
//! Schema-checked collections with column-oriented inserts, explicit flush,
//! IVF_FLAT and flat indexes over L2 distance, scalar pre-filtering, read
//! consistency levels, and load-gated search.

pub mod column;
pub mod collection;
pub mod database;
pub mod distance;
pub mod error;
pub mod filter;
pub mod index;
pub mod schema;

pub use collection::{Collection, ConsistencyLevel, LoadState, SearchRequest, SearchResultSet};
pub use column::{Column, ScalarValue};
pub use database::Database;
pub use distance::DistanceMetric;
pub use error::{Result, VectorDbError};
pub use filter::Filter;
pub use index::{FlatIndex, IndexParams, IvfFlatIndex, SearchParams, VectorIndex};
pub use schema::{CollectionSchema, DataType, FieldSchema};

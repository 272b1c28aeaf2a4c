//! Shared database-layer types

pub mod errors;

pub type DatabaseResult<T> = Result<T, errors::DatabaseError>;

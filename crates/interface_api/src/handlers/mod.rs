//! Request handlers

pub mod declarations;
pub mod health;
pub mod statements;
pub mod training;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path identifier, accepting the prefixed or bare form
pub(crate) fn parse_id<T: FromStr>(raw: &str, entity: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("'{raw}' is not a valid {entity} id")))
}

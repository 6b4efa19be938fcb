use thiserror::Error;

/// Rejections raised while turning a listing query into SQL or a row predicate
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("table '{0}' is not a plain identifier")]
    InvalidTableName(String),

    #[error("column '{0}' is not a plain identifier")]
    InvalidColumn(String),

    #[error("malformed conditions: {0}")]
    InvalidWhereClause(String),
}

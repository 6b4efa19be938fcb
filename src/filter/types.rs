use serde_json::Value;

/// Storage-neutral description of a listing query
#[derive(Debug, Clone, Default)]
pub struct FilterData {
    /// Object of `{ column: value }` equality conditions, AND-ed together
    pub where_clause: Option<Value>,
    pub order: Vec<FilterOrderInfo>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

/// One parsed `column = value` condition; a null value means `IS NULL`
#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Nulls always sort last, matching the in-memory comparator
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC NULLS LAST",
            SortDirection::Desc => "DESC NULLS LAST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

impl FilterOrderInfo {
    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), sort: SortDirection::Desc }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), sort: SortDirection::Asc }
    }
}

/// Parameterized statement: `$n` placeholders in `query`, bound from `params` in order
#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

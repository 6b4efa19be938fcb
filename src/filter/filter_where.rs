use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::error::FilterError;
use super::filter::Filter;
use super::types::FilterWhereInfo;

/// WHERE clause builder shared by the SQL and in-memory backends.
///
/// Accepts an object of `{ column: value }` equality entries, all AND-ed.
/// Values must be scalars; `null` selects rows where the column is unset.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.parse_where_data(where_data)?;
        Ok(filter_where.build())
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        Self::new(0).parse_where_data(where_data)
    }

    /// Evaluates the clause against a single record; absent columns read as null
    pub fn matches(where_data: &Value, record: &Map<String, Value>) -> Result<bool, FilterError> {
        let mut filter_where = Self::new(0);
        filter_where.parse_where_data(where_data)?;
        Ok(filter_where
            .conditions
            .iter()
            .all(|condition| values_equal(record.get(&condition.column).unwrap_or(&Value::Null), &condition.data)))
    }

    fn build(&mut self) -> (String, Vec<Value>) {
        let conditions = std::mem::take(&mut self.conditions);
        let sql_conditions: Vec<String> = conditions.iter().map(|c| self.build_sql_condition(c)).collect();
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        (where_clause, std::mem::take(&mut self.param_values))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (column, value) in obj {
                    Filter::validate_identifier(column)?;
                    if value.is_array() || value.is_object() {
                        return Err(FilterError::InvalidWhereClause(format!("'{}' must compare against a scalar", column)));
                    }
                    self.conditions.push(FilterWhereInfo { column: column.clone(), data: value.clone() });
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("expected an object of column conditions".to_string())),
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> String {
        let quoted_column = format!("\"{}\"", condition.column);
        if condition.data.is_null() {
            format!("{} IS NULL", quoted_column)
        } else {
            format!("{} = {}", quoted_column, self.param(&condition.data))
        }
    }

    fn param(&mut self, value: &Value) -> String {
        self.param_values.push(value.clone());
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Equality that treats `42` and `42.0` as the same number
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Ordering between two scalars of the same JSON kind; `None` for nulls and mixed kinds
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

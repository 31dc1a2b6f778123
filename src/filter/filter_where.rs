use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

/// Builds a parameterized WHERE clause from a JSON condition object.
///
/// Supported shapes: implicit equality `{ "name": "milk" }`, operator objects
/// `{ "price_cents": { "$lt": 500 } }`, and logical composition via
/// `$and` / `$or` / `$not`. Raw SQL predicates are deliberately not accepted.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_offset: usize,
}

impl FilterWhere {
    fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_offset: starting_param_index,
        }
    }

    /// Generate `(where_sql, params)`. Parameter placeholders continue from
    /// `starting_param_index`, so clauses can be composed with other
    /// parameterized fragments.
    pub fn generate(
        where_data: &Value,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut builder = Self::new(starting_param_index);
        let sql = builder.build(where_data)?;
        Ok((sql, builder.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        if where_data.is_null() {
            return Ok(());
        }
        match where_data {
            Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause(
                "WHERE must be a JSON object".to_string(),
            )),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Object(obj) => obj,
            Value::Null => return Ok("1=1".to_string()),
            _ => {
                return Err(FilterError::InvalidWhereClause(
                    "WHERE must be a JSON object".to_string(),
                ))
            }
        };

        let mut parts = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                parts.push(self.build_logical(key, value)?);
            } else {
                for condition in Self::parse_field_condition(key, value)? {
                    parts.push(self.build_condition(&condition)?);
                }
            }
        }

        if parts.is_empty() {
            Ok("1=1".to_string())
        } else {
            Ok(parts.join(" AND "))
        }
    }

    fn build_logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("{} requires an array", op))
                })?;
                let mut parts = Vec::new();
                for clause in arr {
                    let sub = self.build(clause)?;
                    parts.push(format!("({})", sub));
                }
                if parts.is_empty() {
                    return Ok("1=1".to_string());
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(parts.join(joiner))
            }
            "$not" => {
                let sub = self.build(value)?;
                Ok(format!("NOT ({})", sub))
            }
            other => Err(FilterError::UnsupportedOperator(other.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        Self::validate_column(field)?;
        if let Value::Object(obj) = value {
            let mut out = Vec::new();
            for (op_key, op_val) in obj {
                out.push(FilterWhereInfo {
                    column: field.to_string(),
                    operator: Self::map_operator(op_key)?,
                    data: op_val.clone(),
                });
            }
            Ok(out)
        } else {
            Ok(vec![FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            }])
        }
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$between" => FilterOp::Between,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let column = format!("\"{}\"", condition.column);
        let sql = match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    format!("{} IS NULL", column)
                } else {
                    format!("{} = {}", column, self.param(condition.data.clone()))
                }
            }
            FilterOp::Ne => {
                if condition.data.is_null() {
                    format!("{} IS NOT NULL", column)
                } else {
                    format!("{} <> {}", column, self.param(condition.data.clone()))
                }
            }
            FilterOp::Gt => format!("{} > {}", column, self.param(condition.data.clone())),
            FilterOp::Gte => format!("{} >= {}", column, self.param(condition.data.clone())),
            FilterOp::Lt => format!("{} < {}", column, self.param(condition.data.clone())),
            FilterOp::Lte => format!("{} <= {}", column, self.param(condition.data.clone())),
            FilterOp::Like => format!("{} LIKE {}", column, self.param(condition.data.clone())),
            FilterOp::ILike => format!("{} ILIKE {}", column, self.param(condition.data.clone())),
            FilterOp::In => match &condition.data {
                Value::Array(values) if values.is_empty() => "1=0".to_string(),
                Value::Array(values) => {
                    let params: Vec<String> =
                        values.iter().map(|v| self.param(v.clone())).collect();
                    format!("{} IN ({})", column, params.join(", "))
                }
                single => format!("{} = {}", column, self.param(single.clone())),
            },
            FilterOp::Between => match &condition.data {
                Value::Array(values) if values.len() == 2 => format!(
                    "{} BETWEEN {} AND {}",
                    column,
                    self.param(values[0].clone()),
                    self.param(values[1].clone())
                ),
                _ => {
                    return Err(FilterError::InvalidOperatorData(
                        "$between requires an array of exactly 2 values".to_string(),
                    ))
                }
            },
        };
        Ok(sql)
    }

    fn validate_column(column: &str) -> Result<(), FilterError> {
        let mut chars = column.chars();
        let valid = match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if valid {
            Ok(())
        } else {
            Err(FilterError::InvalidColumn(format!(
                "Invalid column name format: {}",
                column
            )))
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        format!("${}", self.param_offset + self.param_values.len())
    }
}

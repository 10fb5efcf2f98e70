//! Filter expression parsing and SQL rendering.
//!
//! # Responsibility
//! - Turn `field` / `field__operator` names plus a value into a validated
//!   predicate against one record schema.
//! - Render predicates as parameterised SQL fragments.
//!
//! # Invariants
//! - Only declared columns reach SQL text; values are always bound.
//! - Operator tokens are resolved once into `FilterOp`; nothing downstream
//!   inspects the raw name again.

use crate::db::CASEFOLD_FUNCTION;
use crate::model::record::FieldValue;
use crate::model::schema::{ColumnSpec, ColumnType, RecordSchema};
use crate::repo::error::{RepoError, RepoResult};
use log::error;
use rusqlite::types::Value;

const OPERATOR_SEPARATOR: &str = "__";

/// Supported comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// No operator suffix.
    Eq,
    In,
    Contains,
    IContains,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    /// Resolves an operator suffix token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "in" => Some(Self::In),
            "contains" => Some(Self::Contains),
            "icontains" => Some(Self::IContains),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    fn comparison_sql(self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::Gt => Some(">"),
            Self::Gte => Some(">="),
            Self::Lt => Some("<"),
            Self::Lte => Some("<="),
            Self::In | Self::Contains | Self::IContains => None,
        }
    }
}

/// One validated `(column, operator, value)` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr<'s> {
    entity: &'static str,
    column: &'s ColumnSpec,
    op: FilterOp,
    value: FieldValue,
}

impl<'s> FilterExpr<'s> {
    /// Parses a raw filter name against `schema`.
    ///
    /// Segments after the operator (`a__b__c`) are ignored.
    ///
    /// # Errors
    /// - `InvalidFilterField` when the field is not a declared column.
    /// - `InvalidFilterMethod` when the operator token is unknown.
    /// - `Data` when the value does not fit the column or operator.
    pub fn parse(schema: &'s RecordSchema, raw_name: &str, value: FieldValue) -> RepoResult<Self> {
        let entity = schema.entity();
        let mut segments = raw_name.split(OPERATOR_SEPARATOR);
        let field = segments.next().unwrap_or_default();
        let method = segments.next();

        let Some(column) = schema.column(field) else {
            let err = RepoError::InvalidFilterField {
                entity,
                field: field.to_string(),
            };
            error!("event=filter_parse module=repo status=error entity={entity} error={err}");
            return Err(err);
        };

        let op = match method {
            None => FilterOp::Eq,
            Some(token) => FilterOp::from_token(token).ok_or_else(|| {
                let err = RepoError::InvalidFilterMethod {
                    entity,
                    field: field.to_string(),
                    method: token.to_string(),
                };
                error!("event=filter_parse module=repo status=error entity={entity} error={err}");
                err
            })?,
        };

        check_operand(entity, column, op, &value)?;

        Ok(Self {
            entity,
            column,
            op,
            value,
        })
    }

    pub fn column(&self) -> &ColumnSpec {
        self.column
    }

    pub fn op(&self) -> FilterOp {
        self.op
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Renders this predicate, appending its bind values in placeholder order.
    pub fn to_sql(&self, binds: &mut Vec<Value>) -> String {
        let name = self.column.name.as_ref();
        match (self.op, &self.value) {
            (FilterOp::Eq, FieldValue::Null) => format!("{name} IS NULL"),
            (FilterOp::In, FieldValue::List(items)) if items.is_empty() => "0 = 1".to_string(),
            (FilterOp::In, FieldValue::List(items)) => {
                binds.extend(items.iter().map(to_sql_value));
                format!("{name} IN ({})", placeholders(items.len()))
            }
            (FilterOp::Contains, value) => {
                binds.push(to_sql_value(value));
                format!("instr({name}, ?) > 0")
            }
            (FilterOp::IContains, value) => {
                binds.push(to_sql_value(value));
                format!("instr({CASEFOLD_FUNCTION}({name}), {CASEFOLD_FUNCTION}(?)) > 0")
            }
            (op, value) => {
                binds.push(to_sql_value(value));
                format!("{name} {} ?", op.comparison_sql().unwrap_or("="))
            }
        }
    }
}

fn check_operand(
    entity: &'static str,
    column: &ColumnSpec,
    op: FilterOp,
    value: &FieldValue,
) -> RepoResult<()> {
    let mismatch = |message: String| {
        let err = RepoError::Data {
            entity,
            field: column.name.to_string(),
            message,
        };
        error!("event=filter_parse module=repo status=error entity={entity} error={err}");
        err
    };

    match (op, value) {
        (FilterOp::In, FieldValue::List(items)) => {
            match items
                .iter()
                .find(|item| item.is_null() || !item.fits(column.kind))
            {
                Some(item) => Err(mismatch(format!(
                    "`in` element of type {} does not fit {} column",
                    item.kind_name(),
                    column.kind.as_str()
                ))),
                None => Ok(()),
            }
        }
        (FilterOp::In, other) => Err(mismatch(format!(
            "`in` expects a list, got {}",
            other.kind_name()
        ))),
        (FilterOp::Contains | FilterOp::IContains, FieldValue::Text(_))
            if column.kind == ColumnType::Text =>
        {
            Ok(())
        }
        (FilterOp::Contains | FilterOp::IContains, other) => Err(mismatch(format!(
            "substring match needs text on a text column, got {} on {}",
            other.kind_name(),
            column.kind.as_str()
        ))),
        (FilterOp::Eq, FieldValue::Null) => Ok(()),
        (_, FieldValue::Null | FieldValue::List(_)) => Err(mismatch(format!(
            "comparison expects a scalar, got {}",
            value.kind_name()
        ))),
        (_, scalar) if scalar.fits(column.kind) => Ok(()),
        (_, scalar) => Err(mismatch(format!(
            "cannot compare {} column with {}",
            column.kind.as_str(),
            scalar.kind_name()
        ))),
    }
}

/// Converts a scalar to its SQLite representation.
///
/// Lists never bind directly; `in` expands them element by element.
pub(crate) fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null | FieldValue::List(_) => Value::Null,
        FieldValue::Text(text) => Value::Text(text.clone()),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Boolean(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Timestamp(at) => Value::Integer(at.timestamp_millis()),
    }
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::{FilterExpr, FilterOp};
    use crate::model::organization::Organizations;
    use crate::model::record::FieldValue;
    use crate::model::schema::EntitySchema;
    use crate::repo::error::RepoError;
    use rusqlite::types::Value;

    #[test]
    fn plain_field_parses_as_equality() {
        let expr =
            FilterExpr::parse(Organizations::schema(), "organization_name", "Acme".into()).unwrap();
        assert_eq!(expr.op(), FilterOp::Eq);
        assert_eq!(expr.column().name, "organization_name");

        let mut binds = Vec::new();
        assert_eq!(expr.to_sql(&mut binds), "organization_name = ?");
        assert_eq!(binds, vec![Value::Text("Acme".to_string())]);
    }

    #[test]
    fn every_operator_token_resolves() {
        for (token, op) in [
            ("in", FilterOp::In),
            ("contains", FilterOp::Contains),
            ("icontains", FilterOp::IContains),
            ("gt", FilterOp::Gt),
            ("gte", FilterOp::Gte),
            ("lt", FilterOp::Lt),
            ("lte", FilterOp::Lte),
        ] {
            assert_eq!(FilterOp::from_token(token), Some(op));
        }
        assert_eq!(FilterOp::from_token("ne"), None);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = FilterExpr::parse(Organizations::schema(), "nickname__icontains", "x".into())
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::InvalidFilterField { ref field, .. } if field == "nickname"
        ));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = FilterExpr::parse(
            Organizations::schema(),
            "organization_name__startswith",
            "A".into(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RepoError::InvalidFilterMethod { ref method, .. } if method == "startswith"
        ));
    }

    #[test]
    fn extra_segments_after_operator_are_ignored() {
        let expr = FilterExpr::parse(
            Organizations::schema(),
            "organization_name__icontains__whatever",
            "acm".into(),
        )
        .unwrap();
        assert_eq!(expr.op(), FilterOp::IContains);
    }

    #[test]
    fn in_renders_one_placeholder_per_element() {
        let expr = FilterExpr::parse(
            Organizations::schema(),
            "organizations_id__in",
            vec!["o1", "o2"].into(),
        )
        .unwrap();
        let mut binds = Vec::new();
        assert_eq!(expr.to_sql(&mut binds), "organizations_id IN (?, ?)");
        assert_eq!(binds.len(), 2);

        let empty = FilterExpr::parse(
            Organizations::schema(),
            "organizations_id__in",
            FieldValue::List(Vec::new()),
        )
        .unwrap();
        assert_eq!(empty.to_sql(&mut Vec::new()), "0 = 1");
    }

    #[test]
    fn icontains_casefolds_both_sides() {
        let expr = FilterExpr::parse(
            Organizations::schema(),
            "organization_name__icontains",
            "ACM".into(),
        )
        .unwrap();
        assert_eq!(
            expr.to_sql(&mut Vec::new()),
            "instr(oms_casefold(organization_name), oms_casefold(?)) > 0"
        );
    }

    #[test]
    fn mismatched_operand_types_are_data_errors() {
        let schema = Organizations::schema();
        let cases = [
            ("organization_name__in", FieldValue::from("Acme")),
            ("created_at__contains", FieldValue::from("2024")),
            ("created_at__gt", FieldValue::from("yesterday")),
            ("organization_name__lt", FieldValue::Null),
            ("organization_name__in", FieldValue::from(vec![1_i64])),
        ];
        for (name, value) in cases {
            let err = FilterExpr::parse(schema, name, value).unwrap_err();
            assert!(matches!(err, RepoError::Data { .. }), "{name} should fail: {err}");
        }
    }

    #[test]
    fn timestamps_bind_as_epoch_millis() {
        let at = chrono::DateTime::from_timestamp_millis(1_732_867_200_000).unwrap();
        let expr =
            FilterExpr::parse(Organizations::schema(), "created_at__gte", at.into()).unwrap();
        let mut binds = Vec::new();
        assert_eq!(expr.to_sql(&mut binds), "created_at >= ?");
        assert_eq!(binds, vec![Value::Integer(1_732_867_200_000)]);
    }
}

//! Generic record store over any entity schema.
//!
//! # Responsibility
//! - Provide get/create/update/soft-delete/list for every `EntitySchema`.
//! - Enforce nullability rules from the schema's static column table.
//! - Translate declarative filters into SQL through `FilterExpr`.
//!
//! # Invariants
//! - Each operation acquires its own session and commits at most once.
//! - Validation runs before any SQL mutation; failures leave rows untouched.
//! - Rows are never physically deleted; `soft_delete` sets `is_deleted`.
//! - `list` orders by the ordering spec, then by identifier ascending.

use crate::db::ConnectionProvider;
use crate::model::record::{FieldValue, Fields, Record};
use crate::model::schema::{
    ColumnType, EntitySchema, OrderingSpec, RecordSchema, CREATED_AT, CREATED_BY, IS_DELETED,
    UPDATED_AT, UPDATED_BY,
};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::filter::{placeholders, to_sql_value, FilterExpr};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::marker::PhantomData;
use std::time::Instant;

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Arguments of [`RecordStore::list`].
#[derive(Debug, Clone)]
pub struct ListQuery<O> {
    /// Zero-based page index.
    pub page: i64,
    /// Page size, `1..=100`.
    pub size: i64,
    pub order_by: O,
    /// When non-empty, restricts results to these identifiers.
    pub pk_ids: Vec<String>,
    pub include_deleted: bool,
    /// Raw `field` / `field__op` names with their values; nulls are skipped.
    pub filters: Vec<(String, FieldValue)>,
}

impl<O: OrderingSpec> Default for ListQuery<O> {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            order_by: O::default(),
            pk_ids: Vec::new(),
            include_deleted: false,
            filters: Vec::new(),
        }
    }
}

impl<O: OrderingSpec> ListQuery<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    pub fn order_by(mut self, order_by: O) -> Self {
        self.order_by = order_by;
        self
    }

    /// Selects the ordering by symbolic name, e.g. `CREATED_AT_ASC`.
    pub fn order_by_name(mut self, name: &str) -> RepoResult<Self> {
        self.order_by = O::from_name(name)
            .ok_or_else(|| RepoError::InvalidArgument(format!("unknown ordering `{name}`")))?;
        Ok(self)
    }

    pub fn pk_ids<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.pk_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    pub fn filter(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push((name.into(), value.into()));
        self
    }
}

/// One page of `list` results.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub items: Vec<Record>,
    /// Matches before pagination.
    pub total_count: u64,
}

/// Record store for entity `S`, borrowing its connection provider.
pub struct RecordStore<'p, S, P> {
    provider: &'p P,
    _entity: PhantomData<fn() -> S>,
}

impl<S, P> Clone for RecordStore<'_, S, P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider,
            _entity: PhantomData,
        }
    }
}

impl<'p, S: EntitySchema, P: ConnectionProvider> RecordStore<'p, S, P> {
    pub fn new(provider: &'p P) -> Self {
        Self {
            provider,
            _entity: PhantomData,
        }
    }

    pub fn schema(&self) -> &'static RecordSchema {
        S::schema()
    }

    /// Fetches one record by identifier, soft-deleted or not.
    pub fn get(&self, id: &str) -> RepoResult<Option<Record>> {
        let schema = S::schema();
        let session = self.provider.acquire_session()?;
        let conn = session.connection();
        let found = fetch_by_id(conn, schema, id)?;
        debug!(
            "event=record_get module=repo status=ok entity={} found={}",
            schema.entity(),
            found.is_some()
        );
        Ok(found)
    }

    /// Inserts one record.
    ///
    /// `updated_by`/`updated_at` mirror `created_by`/`created_at` when those
    /// are supplied. Uniqueness violations surface as `RepoError::Db`.
    ///
    /// # Errors
    /// - `UnknownColumn` for undeclared keys.
    /// - `NotNullable` for explicit nulls or missing required columns.
    /// - `Data` when a value does not fit its column type.
    pub fn create(&self, mut fields: Fields) -> RepoResult<()> {
        let schema = S::schema();
        let started_at = Instant::now();

        if let Some(created_by) = fields.get(CREATED_BY).cloned() {
            fields.insert(UPDATED_BY.to_string(), created_by);
        }
        if let Some(created_at) = fields.get(CREATED_AT).cloned() {
            fields.insert(UPDATED_AT.to_string(), created_at);
        }

        ensure_declared(schema, &fields)?;
        ensure_no_null_for_non_nullable(schema, &fields)?;
        ensure_required_present(schema, &fields)?;
        ensure_types(schema, &fields)?;

        let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            schema.table(),
            columns.join(", "),
            placeholders(columns.len())
        );

        let mut session = self.provider.acquire_session()?;
        let tx = session.unit_of_work()?;
        let inserted = tx
            .execute(&sql, params_from_iter(fields.values().map(to_sql_value)))
            .and_then(|_| tx.commit());

        match inserted {
            Ok(()) => {
                info!(
                    "event=record_create module=repo status=ok entity={} duration_ms={}",
                    schema.entity(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=record_create module=repo status=error entity={} duration_ms={} error={err}",
                    schema.entity(),
                    started_at.elapsed().as_millis()
                );
                Err(err.into())
            }
        }
    }

    /// Applies `fields` to the record `id` and stamps `updated_at` with now.
    ///
    /// Empty input is a logged no-op.
    pub fn update(&self, id: &str, mut fields: Fields) -> RepoResult<()> {
        let schema = S::schema();
        if fields.is_empty() {
            warn!(
                "event=record_update module=repo status=skipped entity={} reason=empty_fields",
                schema.entity()
            );
            return Ok(());
        }

        let mut session = self.provider.acquire_session()?;
        let tx = session.unit_of_work()?;

        if !exists(&tx, schema, id)? {
            return Err(not_found(schema, id));
        }

        ensure_declared(schema, &fields)?;
        ensure_no_null_for_non_nullable(schema, &fields)?;
        ensure_types(schema, &fields)?;

        fields.insert(UPDATED_AT.to_string(), FieldValue::Timestamp(Utc::now()));

        let assignments: Vec<String> = fields
            .keys()
            .map(|column| format!("{column} = ?"))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?;",
            schema.table(),
            assignments.join(", "),
            schema.id_field()
        );
        let mut binds: Vec<Value> = fields.values().map(to_sql_value).collect();
        binds.push(Value::Text(id.to_string()));

        tx.execute(&sql, params_from_iter(binds))?;
        tx.commit()?;

        info!(
            "event=record_update module=repo status=ok entity={} columns={}",
            schema.entity(),
            fields.len()
        );
        Ok(())
    }

    /// Tombstones the record `id`.
    ///
    /// # Errors
    /// - `InvalidArgument` when `id` or `updated_by` is empty or
    ///   `updated_at` is unset.
    /// - `NotFound` when no record matches.
    pub fn soft_delete(
        &self,
        id: &str,
        updated_by: &str,
        updated_at: impl Into<Option<DateTime<Utc>>>,
    ) -> RepoResult<()> {
        let schema = S::schema();
        if id.is_empty() {
            return Err(RepoError::InvalidArgument("id is undefined".to_string()));
        }
        if updated_by.is_empty() {
            return Err(RepoError::InvalidArgument(
                "updated_by is undefined".to_string(),
            ));
        }
        let Some(updated_at) = updated_at.into() else {
            return Err(RepoError::InvalidArgument(
                "updated_at is undefined".to_string(),
            ));
        };

        let mut session = self.provider.acquire_session()?;
        let tx = session.unit_of_work()?;
        let changed = tx.execute(
            &format!(
                "UPDATE {} SET {UPDATED_BY} = ?1, {UPDATED_AT} = ?2, {IS_DELETED} = 1 WHERE {} = ?3;",
                schema.table(),
                schema.id_field()
            ),
            rusqlite::params![updated_by, updated_at.timestamp_millis(), id],
        )?;

        if changed == 0 {
            return Err(not_found(schema, id));
        }
        tx.commit()?;

        info!(
            "event=record_soft_delete module=repo status=ok entity={}",
            schema.entity()
        );
        Ok(())
    }

    /// Lists one page of records plus the total match count.
    ///
    /// # Errors
    /// - `InvalidArgument` when `page < 0` or `size` is outside `1..=100`.
    /// - `InvalidFilterField` / `InvalidFilterMethod` for bad filter names.
    /// - `Data` when a filter value or stored value has the wrong type.
    pub fn list(&self, query: &ListQuery<S::Ordering>) -> RepoResult<ListPage> {
        let schema = S::schema();
        if query.page < 0 {
            return Err(RepoError::InvalidArgument("page must be >= 0".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&query.size) {
            return Err(RepoError::InvalidArgument(format!(
                "size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let offset = query.page.checked_mul(query.size).ok_or_else(|| {
            RepoError::InvalidArgument(format!("page {} is out of range", query.page))
        })?;

        let mut clauses = Vec::new();
        let mut binds = Vec::new();

        if !query.include_deleted {
            clauses.push(format!("{IS_DELETED} = 0"));
        }
        if !query.pk_ids.is_empty() {
            clauses.push(format!(
                "{} IN ({})",
                schema.id_field(),
                placeholders(query.pk_ids.len())
            ));
            binds.extend(query.pk_ids.iter().cloned().map(Value::Text));
        }
        for (name, value) in &query.filters {
            if value.is_null() {
                continue;
            }
            let expr = FilterExpr::parse(schema, name, value.clone())?;
            clauses.push(expr.to_sql(&mut binds));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let session = self.provider.acquire_session()?;
        let conn = session.connection();

        let total_count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}{where_sql};", schema.table()),
                params_from_iter(binds.iter()),
                |row| row.get(0),
            )
            .map_err(|err| classify_query_error(schema, err))?;

        let order = query.order_by;
        let select_sql = format!(
            "SELECT {} FROM {}{where_sql} ORDER BY {} {}, {} ASC LIMIT ? OFFSET ?;",
            schema.select_list(),
            schema.table(),
            order.column(),
            order.direction().as_sql(),
            schema.id_field()
        );
        binds.push(Value::Integer(query.size));
        binds.push(Value::Integer(offset));

        let items = query_records(conn, schema, &select_sql, binds)?;
        let page = ListPage {
            items,
            total_count: u64::try_from(total_count).unwrap_or_default(),
        };

        debug!(
            "event=record_list module=repo status=ok entity={} order_by={} page={} size={} returned={} total={}",
            schema.entity(),
            order.name(),
            query.page,
            query.size,
            page.items.len(),
            page.total_count
        );
        Ok(page)
    }
}

fn fetch_by_id(conn: &Connection, schema: &RecordSchema, id: &str) -> RepoResult<Option<Record>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1;",
        schema.select_list(),
        schema.table(),
        schema.id_field()
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_record(schema, row)?)),
        None => Ok(None),
    }
}

fn exists(conn: &Connection, schema: &RecordSchema, id: &str) -> RepoResult<bool> {
    let found = conn
        .query_row(
            &format!(
                "SELECT 1 FROM {} WHERE {} = ?1;",
                schema.table(),
                schema.id_field()
            ),
            [id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn query_records(
    conn: &Connection,
    schema: &RecordSchema,
    sql: &str,
    binds: Vec<Value>,
) -> RepoResult<Vec<Record>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|err| classify_query_error(schema, err))?;
    let mut rows = stmt
        .query(params_from_iter(binds))
        .map_err(|err| classify_query_error(schema, err))?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(|err| classify_query_error(schema, err))? {
        records.push(read_record(schema, row)?);
    }
    Ok(records)
}

fn read_record(schema: &RecordSchema, row: &Row<'_>) -> RepoResult<Record> {
    let mut values = std::collections::BTreeMap::new();
    for (index, column) in schema.columns().iter().enumerate() {
        let name = column.name.as_ref();
        let value = match column.kind {
            ColumnType::Text => row
                .get::<_, Option<String>>(index)
                .map(|value| value.map_or(FieldValue::Null, FieldValue::Text)),
            ColumnType::Integer => row
                .get::<_, Option<i64>>(index)
                .map(|value| value.map_or(FieldValue::Null, FieldValue::Integer)),
            ColumnType::Boolean => match row.get::<_, Option<i64>>(index) {
                Ok(None) => Ok(FieldValue::Null),
                Ok(Some(0)) => Ok(FieldValue::Boolean(false)),
                Ok(Some(1)) => Ok(FieldValue::Boolean(true)),
                Ok(Some(other)) => {
                    return Err(RepoError::InvalidData(format!(
                        "invalid boolean value `{other}` in {}.{name}",
                        schema.table()
                    )));
                }
                Err(err) => Err(err),
            },
            ColumnType::Timestamp => match row.get::<_, Option<i64>>(index) {
                Ok(None) => Ok(FieldValue::Null),
                Ok(Some(millis)) => match DateTime::from_timestamp_millis(millis) {
                    Some(at) => Ok(FieldValue::Timestamp(at)),
                    None => {
                        return Err(RepoError::InvalidData(format!(
                            "invalid timestamp `{millis}` in {}.{name}",
                            schema.table()
                        )));
                    }
                },
                Err(err) => Err(err),
            },
        }
        .map_err(|err| data_error(schema, name, &err))?;
        values.insert(name.to_string(), value);
    }
    Ok(Record::new(values))
}

fn ensure_declared(schema: &RecordSchema, fields: &Fields) -> RepoResult<()> {
    match fields.keys().find(|name| schema.column(name).is_none()) {
        Some(name) => Err(reject(RepoError::UnknownColumn {
            entity: schema.entity(),
            field: name.clone(),
        })),
        None => Ok(()),
    }
}

/// Rejects explicit nulls for every non-nullable column, defaulted ones included.
fn ensure_no_null_for_non_nullable(schema: &RecordSchema, fields: &Fields) -> RepoResult<()> {
    let offending = fields.iter().find(|(name, value)| {
        value.is_null() && schema.column(name).is_some_and(|column| !column.nullable)
    });
    match offending {
        Some((name, _)) => Err(reject(RepoError::NotNullable {
            entity: schema.entity(),
            field: name.clone(),
        })),
        None => Ok(()),
    }
}

fn ensure_required_present(schema: &RecordSchema, fields: &Fields) -> RepoResult<()> {
    match schema
        .required_on_create()
        .iter()
        .find(|name| !fields.contains_key(name.as_str()))
    {
        Some(name) => Err(reject(RepoError::NotNullable {
            entity: schema.entity(),
            field: name.clone(),
        })),
        None => Ok(()),
    }
}

fn ensure_types(schema: &RecordSchema, fields: &Fields) -> RepoResult<()> {
    for (name, value) in fields {
        let Some(column) = schema.column(name) else {
            continue;
        };
        if !value.fits(column.kind) {
            return Err(reject(RepoError::Data {
                entity: schema.entity(),
                field: name.clone(),
                message: format!(
                    "{} value does not fit {} column",
                    value.kind_name(),
                    column.kind.as_str()
                ),
            }));
        }
    }
    Ok(())
}

fn reject(err: RepoError) -> RepoError {
    error!("event=record_validate module=repo status=error error={err}");
    err
}

fn not_found(schema: &RecordSchema, id: &str) -> RepoError {
    reject(RepoError::NotFound {
        entity: schema.entity(),
        id: id.to_string(),
    })
}

fn data_error(schema: &RecordSchema, field: &str, err: &rusqlite::Error) -> RepoError {
    reject(RepoError::Data {
        entity: schema.entity(),
        field: field.to_string(),
        message: err.to_string(),
    })
}

fn classify_query_error(schema: &RecordSchema, err: rusqlite::Error) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::TypeMismatch => {
            data_error(schema, "<query>", &err)
        }
        rusqlite::Error::InvalidColumnType(_, name, _) => data_error(schema, name, &err),
        rusqlite::Error::FromSqlConversionFailure(_, _, _) => data_error(schema, "<row>", &err),
        _ => RepoError::from(err),
    }
}

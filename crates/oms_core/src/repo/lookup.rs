//! Column-equality lookups on top of `RecordStore::list`.
//!
//! The filter runs inside the store, so every match of a lookup lands on
//! the first page. Lookups therefore issue exactly one `list` call; absence
//! is an empty result, never an error.

use crate::db::ConnectionProvider;
use crate::model::record::{FieldValue, Record};
use crate::model::schema::EntitySchema;
use crate::repo::error::RepoResult;
use crate::repo::record_store::{ListQuery, RecordStore};
use log::{info, warn};

/// Symbolic ordering used by lookups: earliest-created match first.
pub const LOOKUP_ORDERING: &str = "CREATED_AT_ASC";

/// Returns the single active record whose `column` equals `value`.
///
/// When more than one row matches, the earliest-created one is returned
/// and a warning is logged.
pub fn find_unique_by<S, P>(
    store: &RecordStore<'_, S, P>,
    column: &str,
    value: impl Into<FieldValue>,
) -> RepoResult<Option<Record>>
where
    S: EntitySchema,
    P: ConnectionProvider,
{
    let value = value.into();
    // A null filter is dropped by `list` and would match every row.
    if value.is_null() {
        return Ok(None);
    }
    let query = ListQuery::<S::Ordering>::new()
        .order_by_name(LOOKUP_ORDERING)?
        .size(1)
        .filter(column, value);
    let page = store.list(&query)?;
    let entity = store.schema().entity();

    if page.total_count > 1 {
        warn!(
            "event=lookup_unique module=repo status=duplicate entity={entity} column={column} matches={}",
            page.total_count
        );
    }
    info!(
        "event=lookup_unique module=repo status=ok entity={entity} column={column} found={}",
        page.total_count > 0
    );

    Ok(page.items.into_iter().next())
}

/// Returns every active record whose `column` equals `value`, oldest first,
/// from one page of the default size.
pub fn fetch_rows_by_column<S, P>(
    store: &RecordStore<'_, S, P>,
    column: &str,
    value: impl Into<FieldValue>,
) -> RepoResult<Vec<Record>>
where
    S: EntitySchema,
    P: ConnectionProvider,
{
    let value = value.into();
    if value.is_null() {
        return Ok(Vec::new());
    }
    let query = ListQuery::<S::Ordering>::new()
        .order_by_name(LOOKUP_ORDERING)?
        .filter(column, value);
    let page = store.list(&query)?;
    info!(
        "event=lookup_rows module=repo status=ok entity={} column={column} count={}",
        store.schema().entity(),
        page.items.len()
    );
    Ok(page.items)
}

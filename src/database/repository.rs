use std::marker::PhantomData;

use serde_json::Value;
use sqlx::{postgres::PgRow, PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Resource;
use crate::database::query_builder::{bind_params, Changeset, QueryBuilder, SqlResult, SqlValue};

/// Typed persistence for one [`Resource`].
///
/// Writes touching more than one table (children, cascades) run in a single
/// transaction; the written row is read back with its relations expanded.
pub struct Repository<R> {
    pool: PgPool,
    _phantom: PhantomData<R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<R> Repository<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: PhantomData,
        }
    }
}

impl<R: Resource> Repository<R> {
    pub async fn select_any(
        &self,
        conditions: &[(&'static str, SqlValue)],
    ) -> Result<Vec<R>, DatabaseError> {
        let sql = QueryBuilder::select(&R::TABLE, conditions);
        fetch_all::<R, _>(&self.pool, &sql).await
    }

    pub async fn select_one(&self, id: Uuid) -> Result<Option<R>, DatabaseError> {
        let sql = QueryBuilder::select(&R::TABLE, &[("id", SqlValue::from(id))]);
        Ok(fetch_all::<R, _>(&self.pool, &sql).await?.into_iter().next())
    }

    pub async fn select_404(&self, id: Uuid) -> Result<R, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", R::TABLE.label)))
    }

    pub async fn insert(&self, changeset: &Changeset) -> Result<R, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = QueryBuilder::insert(R::TABLE.table, changeset);
        let id: Uuid = bind_params(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&mut *tx)
            .await?
            .try_get("id")?;

        replace_children(&mut tx, id, changeset).await?;

        let read = QueryBuilder::select(&R::TABLE, &[("id", SqlValue::from(id))]);
        let created = fetch_all::<R, _>(&mut *tx, &read)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", R::TABLE.label)))?;

        tx.commit().await?;
        tracing::debug!("Inserted {} {}", R::TABLE.table, id);
        Ok(created)
    }

    /// Applies a partial update. `Ok(None)` when no row has this id.
    pub async fn update(&self, id: Uuid, changeset: &Changeset) -> Result<Option<R>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = QueryBuilder::update(R::TABLE.table, id, changeset);
        let updated = bind_params(sqlx::query(&sql.query), &sql.params)
            .fetch_optional(&mut *tx)
            .await?;
        if updated.is_none() {
            return Ok(None);
        }

        replace_children(&mut tx, id, changeset).await?;

        let read = QueryBuilder::select(&R::TABLE, &[("id", SqlValue::from(id))]);
        let row = fetch_all::<R, _>(&mut *tx, &read).await?.into_iter().next();

        tx.commit().await?;
        tracing::debug!("Updated {} {}", R::TABLE.table, id);
        Ok(row)
    }

    /// Hard delete; owned children go first. `Ok(false)` when nothing matched.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        for child in R::TABLE.children {
            let sql = QueryBuilder::delete_children(child, id);
            bind_params(sqlx::query(&sql.query), &sql.params)
                .execute(&mut *tx)
                .await?;
        }

        let sql = QueryBuilder::delete(R::TABLE.table, id);
        let result = bind_params(sqlx::query(&sql.query), &sql.params)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        tracing::debug!("Deleted {} {}", R::TABLE.table, id);
        Ok(true)
    }
}

async fn replace_children(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    parent_id: Uuid,
    changeset: &Changeset,
) -> Result<(), DatabaseError> {
    for replacement in changeset.children() {
        let sql = QueryBuilder::delete_children(&replacement.child, parent_id);
        bind_params(sqlx::query(&sql.query), &sql.params)
            .execute(&mut **tx)
            .await?;

        for (position, value) in replacement.values.iter().enumerate() {
            let sql = QueryBuilder::insert_child(&replacement.child, parent_id, value, position as i32);
            bind_params(sqlx::query(&sql.query), &sql.params)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

async fn fetch_all<'e, R, E>(executor: E, sql: &SqlResult) -> Result<Vec<R>, DatabaseError>
where
    R: Resource,
    E: PgExecutor<'e>,
{
    let rows = bind_params(sqlx::query(&sql.query), &sql.params)
        .fetch_all(executor)
        .await?;
    rows.iter().map(decode_row::<R>).collect()
}

/// Decodes the `row` JSON column produced by [`QueryBuilder::select`].
pub(crate) fn decode_row<R: Resource>(row: &PgRow) -> Result<R, DatabaseError> {
    let value: Value = row.try_get("row")?;
    decode_value(value)
}

pub(crate) fn decode_value<R: Resource>(value: Value) -> Result<R, DatabaseError> {
    serde_json::from_value(value)
        .map_err(|e| DatabaseError::Decode(format!("{}: {}", R::TABLE.table, e)))
}

//! Paged readers over `gcd_story`

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use crate::repository::{validate_schema, RepositoryResult};

/// A row with the id the resume cursor is kept in
pub trait SourceRow: Send + Sync {
    fn id(&self) -> i64;
}

/// Source of rows in ascending id order
#[async_trait]
pub trait RowSource: Send + Sync {
    type Row: SourceRow;

    /// Number of rows with id greater than `after_id`
    async fn count_after(&self, after_id: i64) -> RepositoryResult<i64>;

    /// One page of rows with id greater than `after_id`, ordered by id
    async fn fetch_page(
        &self,
        after_id: i64,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<Self::Row>>;
}

/// SELECT and COUNT statements sharing one FROM/WHERE clause
///
/// `$1` is the resume watermark; the paged form adds `$2` (limit) and `$3`
/// (offset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub select: String,
    pub count: String,
}

impl SourceQuery {
    fn new(columns: &str, from_where: &str) -> Self {
        Self {
            select: format!("SELECT {columns} {from_where} ORDER BY s.id"),
            count: format!("SELECT COUNT(*) {from_where}"),
        }
    }

    /// Stories with a non-empty `characters` field, with their publisher
    pub fn characters(schema: &str) -> RepositoryResult<Self> {
        validate_schema(schema)?;
        Ok(Self::new(
            "s.id, s.characters, se.publisher_id",
            &format!(
                "FROM {schema}.gcd_story s \
                 LEFT JOIN {schema}.gcd_issue i ON i.id = s.issue_id \
                 LEFT JOIN {schema}.gcd_series se ON se.id = i.series_id \
                 WHERE s.id > $1 AND s.deleted = 0 AND s.characters <> ''"
            ),
        ))
    }

    /// Stories with their six creator role fields
    pub fn credits(schema: &str) -> RepositoryResult<Self> {
        validate_schema(schema)?;
        Ok(Self::new(
            "s.id, s.script, s.pencils, s.inks, s.colors, s.letters, s.editing",
            &format!("FROM {schema}.gcd_story s WHERE s.id > $1 AND s.deleted = 0"),
        ))
    }

    pub fn paged(&self) -> String {
        format!("{} LIMIT $2 OFFSET $3", self.select)
    }
}

/// [`RowSource`] reading from PostgreSQL
pub struct PgRowSource<R> {
    pool: PgPool,
    count_sql: String,
    page_sql: String,
    _row: PhantomData<fn() -> R>,
}

impl<R> PgRowSource<R> {
    pub fn new(pool: PgPool, query: &SourceQuery) -> Self {
        Self {
            pool,
            count_sql: query.count.clone(),
            page_sql: query.paged(),
            _row: PhantomData,
        }
    }
}

#[async_trait]
impl<R> RowSource for PgRowSource<R>
where
    R: SourceRow + for<'r> FromRow<'r, PgRow> + Unpin + 'static,
{
    type Row = R;

    async fn count_after(&self, after_id: i64) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&self.count_sql)
            .bind(after_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn fetch_page(
        &self,
        after_id: i64,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<R>> {
        let rows = sqlx::query_as::<_, R>(&self.page_sql)
            .bind(after_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// [`RowSource`] over rows held in memory
#[derive(Debug, Clone)]
pub struct MemoryRowSource<R> {
    rows: Vec<R>,
}

impl<R: SourceRow> MemoryRowSource<R> {
    pub fn new(mut rows: Vec<R>) -> Self {
        rows.sort_by_key(SourceRow::id);
        Self { rows }
    }
}

#[async_trait]
impl<R> RowSource for MemoryRowSource<R>
where
    R: SourceRow + Clone + 'static,
{
    type Row = R;

    async fn count_after(&self, after_id: i64) -> RepositoryResult<i64> {
        Ok(self.rows.iter().filter(|r| r.id() > after_id).count() as i64)
    }

    async fn fetch_page(
        &self,
        after_id: i64,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<R>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.id() > after_id)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

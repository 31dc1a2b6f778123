use std::marker::PhantomData;

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row};
use uuid::Uuid;

use crate::filter::{Filter, FilterData};
use crate::store::error::StoreError;
use crate::store::scope::QueryScope;
use crate::tenancy::TenantContext;

/// Columns managed by the database itself; stripped from serialized rows
/// before inserts and updates.
const SYSTEM_COLUMNS: &[&str] = &["created_at", "updated_at"];

/// A persisted, tenant-owned record.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Serialize + Send + Unpin {
    const TABLE: &'static str;

    fn id(&self) -> Uuid;
}

/// Generic CRUD facade. Every read is routed through the query scoping
/// layer: the ambient tenant predicate is conjoined before execution, so a
/// row owned by another tenant is indistinguishable from a row that does not
/// exist.
pub struct Repository<T> {
    pool: PgPool,
    scope: QueryScope,
    _phantom: PhantomData<T>,
}

impl<T> Repository<T>
where
    T: Entity,
{
    pub fn new(pool: PgPool, scope: QueryScope) -> Self {
        Self {
            pool,
            scope,
            _phantom: PhantomData,
        }
    }

    /// Repository scoped to the request's ambient tenant. Fails fast when
    /// the request resolved to no tenant.
    pub fn for_context(pool: PgPool, context: &TenantContext) -> Result<Self, StoreError> {
        Ok(Self::new(pool, QueryScope::try_from(context)?))
    }

    /// Explicitly unscoped repository for platform-admin paths.
    pub fn bypass(pool: PgPool) -> Self {
        Self::new(pool, QueryScope::unscoped())
    }

    pub fn scope(&self) -> &QueryScope {
        &self.scope
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        match self.scope.tenant_id() {
            Some(tenant) => {
                let sql = format!(
                    "SELECT * FROM \"{}\" WHERE \"id\" = $1 AND \"tenant_id\" = $2",
                    T::TABLE
                );
                let row = sqlx::query_as::<_, T>(&sql)
                    .bind(id)
                    .bind(tenant.as_str())
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(row)
            }
            None => {
                let sql = format!("SELECT * FROM \"{}\" WHERE \"id\" = $1", T::TABLE);
                let row = sqlx::query_as::<_, T>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(row)
            }
        }
    }

    pub async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        self.find(FilterData::default()).await
    }

    pub async fn find(&self, mut data: FilterData) -> Result<Vec<T>, StoreError> {
        data.where_clause = self.scope.apply_where(data.where_clause.take());
        let mut filter = Filter::new(T::TABLE)?;
        filter.assign(data)?;
        let sql = filter.to_sql()?;

        let mut query = sqlx::query_as::<_, T>(&sql.query);
        for param in sql.params.iter() {
            query = bind_json_as(query, param);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn find_one(&self, mut data: FilterData) -> Result<Option<T>, StoreError> {
        data.limit = Some(1);
        Ok(self.find(data).await?.into_iter().next())
    }

    pub async fn count(&self, mut data: FilterData) -> Result<i64, StoreError> {
        data.where_clause = self.scope.apply_where(data.where_clause.take());
        let mut filter = Filter::new(T::TABLE)?;
        filter.assign(data)?;
        let sql = filter.to_count_sql()?;

        let mut query = sqlx::query(&sql.query);
        for param in sql.params.iter() {
            query = bind_json(query, param);
        }
        let row = query.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    /// Start a unit of work sharing this repository's scope.
    pub fn unit_of_work(&self) -> UnitOfWork {
        UnitOfWork::new(self.scope.clone())
    }
}

/// Buffered mutations committed atomically in a single transaction.
///
/// `add` stamps the ambient tenant onto new rows; `update` and `delete`
/// carry the tenant predicate so a request cannot mutate another tenant's
/// row even by guessing its id. Nothing touches the pool until
/// `save_changes`, and a failure of any member rolls back the whole batch.
pub struct UnitOfWork {
    scope: QueryScope,
    pending: Vec<Pending>,
}

enum Pending {
    Insert {
        table: &'static str,
        row: Map<String, Value>,
    },
    Update {
        table: &'static str,
        id: Uuid,
        changes: Map<String, Value>,
    },
    Delete {
        table: &'static str,
        id: Uuid,
    },
}

impl UnitOfWork {
    pub fn new(scope: QueryScope) -> Self {
        Self {
            scope,
            pending: Vec::new(),
        }
    }

    pub fn for_context(context: &TenantContext) -> Result<Self, StoreError> {
        Ok(Self::new(QueryScope::try_from(context)?))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue an insert. The row is stamped with the ambient tenant here,
    /// before anything reaches the store.
    pub fn add<T: Entity>(&mut self, entity: &T) -> Result<(), StoreError> {
        let mut row = serialize_row(entity)?;
        for column in SYSTEM_COLUMNS {
            row.remove(*column);
        }
        self.scope.stamp_insert(T::TABLE, &mut row)?;
        self.pending.push(Pending::Insert {
            table: T::TABLE,
            row,
        });
        Ok(())
    }

    /// Queue an update of all non-system columns. The owning tenant is part
    /// of the WHERE clause, never of the SET clause: ownership is immutable.
    pub fn update<T: Entity>(&mut self, entity: &T) -> Result<(), StoreError> {
        let mut changes = serialize_row(entity)?;
        changes.remove("id");
        changes.remove("tenant_id");
        for column in SYSTEM_COLUMNS {
            changes.remove(*column);
        }
        self.pending.push(Pending::Update {
            table: T::TABLE,
            id: entity.id(),
            changes,
        });
        Ok(())
    }

    pub fn delete<T: Entity>(&mut self, id: Uuid) {
        self.pending.push(Pending::Delete {
            table: T::TABLE,
            id,
        });
    }

    /// Commit all pending mutations in one transaction. All-or-nothing: the
    /// first failure aborts the transaction and propagates unchanged.
    pub async fn save_changes(self, pool: &PgPool) -> Result<u64, StoreError> {
        let mut tx = pool.begin().await?;
        let mut affected = 0u64;
        for op in &self.pending {
            affected += execute(&mut tx, &self.scope, op).await?;
        }
        tx.commit().await?;
        Ok(affected)
    }
}

async fn execute(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    scope: &QueryScope,
    op: &Pending,
) -> Result<u64, StoreError> {
    match op {
        Pending::Insert { table, row } => {
            let (sql, binds) = build_insert(table, row)?;
            let mut query = sqlx::query(&sql);
            for bind in binds {
                query = match bind {
                    Bind::Uuid(v) => query.bind(v),
                    Bind::Json(v) => bind_json(query, v),
                };
            }
            let result = query.execute(&mut **tx).await?;
            Ok(result.rows_affected())
        }
        Pending::Update { table, id, changes } => {
            let (sql, binds) = build_update(scope, table, changes)?;
            let mut query = sqlx::query(&sql);
            for bind in binds {
                query = bind_json(query, bind);
            }
            query = query.bind(id);
            if let Some(tenant) = scope.tenant_id() {
                query = query.bind(tenant.as_str());
            }
            let result = query.execute(&mut **tx).await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("{} {} not found", table, id)));
            }
            Ok(result.rows_affected())
        }
        Pending::Delete { table, id } => {
            let sql = build_delete(scope, table);
            let mut query = sqlx::query(&sql).bind(id);
            if let Some(tenant) = scope.tenant_id() {
                query = query.bind(tenant.as_str());
            }
            let result = query.execute(&mut **tx).await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("{} {} not found", table, id)));
            }
            Ok(result.rows_affected())
        }
    }
}

enum Bind<'a> {
    Uuid(Uuid),
    Json(&'a Value),
}

fn build_insert<'a>(
    table: &str,
    row: &'a Map<String, Value>,
) -> Result<(String, Vec<Bind<'a>>), StoreError> {
    if row.is_empty() {
        return Err(StoreError::Query("insert row has no columns".to_string()));
    }

    let mut columns = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());
    let mut binds = Vec::with_capacity(row.len());

    for (i, (column, value)) in row.iter().enumerate() {
        validate_column(column)?;
        columns.push(format!("\"{}\"", column));
        placeholders.push(format!("${}", i + 1));
        binds.push(typed_bind(column, value)?);
    }

    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok((sql, binds))
}

fn build_update<'a>(
    scope: &QueryScope,
    table: &str,
    changes: &'a Map<String, Value>,
) -> Result<(String, Vec<&'a Value>), StoreError> {
    if changes.is_empty() {
        return Err(StoreError::Query("update has no columns to set".to_string()));
    }

    let mut assignments = Vec::with_capacity(changes.len() + 1);
    let mut binds = Vec::with_capacity(changes.len());
    for (i, (column, value)) in changes.iter().enumerate() {
        validate_column(column)?;
        assignments.push(format!("\"{}\" = ${}", column, i + 1));
        binds.push(value);
    }
    assignments.push("\"updated_at\" = now()".to_string());

    let id_param = changes.len() + 1;
    let mut sql = format!(
        "UPDATE \"{}\" SET {} WHERE \"id\" = ${}",
        table,
        assignments.join(", "),
        id_param
    );
    if scope.tenant_id().is_some() {
        sql.push_str(&format!(" AND \"tenant_id\" = ${}", id_param + 1));
    }
    Ok((sql, binds))
}

fn build_delete(scope: &QueryScope, table: &str) -> String {
    let mut sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", table);
    if scope.tenant_id().is_some() {
        sql.push_str(" AND \"tenant_id\" = $2");
    }
    sql
}

fn typed_bind<'a>(column: &str, value: &'a Value) -> Result<Bind<'a>, StoreError> {
    // Primary keys are uuid columns; everything else binds by JSON type.
    if column == "id" {
        let raw = value
            .as_str()
            .ok_or_else(|| StoreError::Query("id column must be a uuid string".to_string()))?;
        let id = Uuid::parse_str(raw)
            .map_err(|e| StoreError::Query(format!("invalid uuid for id column: {}", e)))?;
        return Ok(Bind::Uuid(id));
    }
    Ok(Bind::Json(value))
}

fn serialize_row<T: Serialize>(entity: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Query(
            "entity must serialize to a JSON object".to_string(),
        )),
        Err(e) => Err(StoreError::Query(e.to_string())),
    }
}

fn validate_column(column: &str) -> Result<(), StoreError> {
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
        Err(StoreError::Query(format!("invalid column name: {}", column)))
    }
}

fn bind_json<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres has no u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays are expanded into placeholders by FilterWhere before binding
        Value::Array(_) => q,
        Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}

fn bind_json_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) => q,
        Value::Object(_) => q.bind(v.clone()),
    }
}

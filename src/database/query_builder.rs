//! SQL generation for the resource tables.
//!
//! Every builder returns a [`SqlResult`] (query text plus positional
//! parameters) so the statements can be inspected without a database.
//! Identifiers always come from the static [`TableSpec`] declarations, never
//! from request input.

use sqlx::postgres::PgArguments;
use sqlx::Postgres;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;

/// A value bound to a positional parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Bool(bool),
    Int(i32),
    Uuid(Option<Uuid>),
    TextList(Vec<String>),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(Some(v))
    }
}

impl From<Option<Uuid>> for SqlValue {
    fn from(v: Option<Uuid>) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(v: Vec<String>) -> Self {
        SqlValue::TextList(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Related rows embedded into every read of a resource.
#[derive(Debug, Clone, Copy)]
pub enum Relation {
    /// `t.<foreign_key>` points at `<table>.id`; embedded as an object or null.
    BelongsTo {
        field: &'static str,
        table: &'static str,
        foreign_key: &'static str,
        columns: &'static [&'static str],
    },
    /// `<table>.<foreign_key>` points back at `t.id`; embedded as an array.
    HasMany {
        field: &'static str,
        table: &'static str,
        foreign_key: &'static str,
        columns: &'static [&'static str],
        order_by: &'static str,
    },
}

/// Child rows whose lifecycle is owned by the parent row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildTable {
    pub table: &'static str,
    pub foreign_key: &'static str,
    pub value_column: &'static str,
    pub position_column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    Uuid,
    Text,
    Bool,
}

/// A query-string parameter accepted by a resource's list operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListFilter {
    pub param: &'static str,
    pub column: &'static str,
    pub kind: FilterKind,
}

/// Static description of a resource table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub table: &'static str,
    pub label: &'static str,
    /// Own columns projected on reads (never includes secrets)
    pub columns: &'static [&'static str],
    pub relations: &'static [Relation],
    pub children: &'static [ChildTable],
    pub filters: &'static [ListFilter],
    pub order_by: (&'static str, SortDirection),
}

impl TableSpec {
    pub fn filter(&self, param: &str) -> Option<&'static ListFilter> {
        self.filters.iter().find(|f| f.param == param)
    }
}

/// Wholesale replacement of one child collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildReplacement {
    pub child: ChildTable,
    pub values: Vec<String>,
}

/// Columns to write for an insert or a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    values: Vec<(&'static str, SqlValue)>,
    children: Vec<ChildReplacement>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        self.values.retain(|(c, _)| *c != column);
        self.values.push((column, value.into()));
        self
    }

    /// Only writes the column when a value was supplied.
    pub fn set_some<T: Into<SqlValue>>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    pub fn replace_children(&mut self, child: ChildTable, values: Vec<String>) -> &mut Self {
        self.children.retain(|r| r.child != child);
        self.children.push(ChildReplacement { child, values });
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(c, _)| *c)
    }

    /// Writes the column when the field was present; `Some(None)` stores NULL.
    pub fn set_nullable<T>(&mut self, column: &'static str, value: Option<Option<T>>) -> &mut Self
    where
        Option<T>: Into<SqlValue>,
    {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn children(&self) -> &[ChildReplacement] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.children.is_empty()
    }
}

fn quote(name: &str) -> String {
    DatabaseManager::quote_identifier(name)
}

fn projection(alias: &str, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("{}.{}", alias, quote(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn relation_sql(relation: &Relation) -> String {
    match relation {
        Relation::BelongsTo { field, table, foreign_key, columns } => format!(
            "(SELECT row_to_json(r) FROM (SELECT {} FROM {} p WHERE p.\"id\" = t.{}) r) AS {}",
            projection("p", columns),
            quote(table),
            quote(foreign_key),
            quote(field)
        ),
        Relation::HasMany { field, table, foreign_key, columns, order_by } => format!(
            "(SELECT COALESCE(json_agg(r ORDER BY r.{}), '[]'::json) FROM (SELECT {} FROM {} c WHERE c.{} = t.\"id\") r) AS {}",
            quote(order_by),
            projection("c", columns),
            quote(table),
            quote(foreign_key),
            quote(field)
        ),
    }
}

pub struct QueryBuilder;

impl QueryBuilder {
    /// `SELECT` returning one JSON document per row in a `row` column.
    ///
    /// `conditions` are `(column, value)` equality tests joined with `AND`.
    pub fn select(spec: &TableSpec, conditions: &[(&'static str, SqlValue)]) -> SqlResult {
        let mut fields = vec![projection("t", spec.columns)];
        fields.extend(spec.relations.iter().map(relation_sql));

        let mut params = Vec::with_capacity(conditions.len());
        let mut query = format!("SELECT {} FROM {} t", fields.join(", "), quote(spec.table));

        if !conditions.is_empty() {
            let clauses: Vec<String> = conditions
                .iter()
                .enumerate()
                .map(|(i, (column, _))| format!("t.{} = ${}", quote(column), i + 1))
                .collect();
            query.push_str(" WHERE ");
            query.push_str(&clauses.join(" AND "));
            params.extend(conditions.iter().map(|(_, v)| v.clone()));
        }

        let (order_column, direction) = spec.order_by;
        SqlResult {
            query: format!(
                "SELECT row_to_json(x) AS row FROM ({}) x ORDER BY x.{} {}",
                query,
                quote(order_column),
                direction.to_sql()
            ),
            params,
        }
    }

    pub fn insert(table: &str, changeset: &Changeset) -> SqlResult {
        if changeset.values.is_empty() {
            return SqlResult {
                query: format!("INSERT INTO {} DEFAULT VALUES RETURNING \"id\"", quote(table)),
                params: vec![],
            };
        }

        let columns: Vec<String> = changeset.values.iter().map(|(c, _)| quote(c)).collect();
        let placeholders: Vec<String> = (1..=changeset.values.len()).map(|i| format!("${}", i)).collect();

        SqlResult {
            query: format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING \"id\"",
                quote(table),
                columns.join(", "),
                placeholders.join(", ")
            ),
            params: changeset.values.iter().map(|(_, v)| v.clone()).collect(),
        }
    }

    /// Writes only the supplied columns; `updated_at` always advances.
    pub fn update(table: &str, id: Uuid, changeset: &Changeset) -> SqlResult {
        let mut assignments: Vec<String> = changeset
            .values
            .iter()
            .enumerate()
            .map(|(i, (c, _))| format!("{} = ${}", quote(c), i + 1))
            .collect();
        assignments.push("\"updated_at\" = now()".to_string());

        let mut params: Vec<SqlValue> = changeset.values.iter().map(|(_, v)| v.clone()).collect();
        params.push(SqlValue::Uuid(Some(id)));

        SqlResult {
            query: format!(
                "UPDATE {} SET {} WHERE \"id\" = ${} RETURNING \"id\"",
                quote(table),
                assignments.join(", "),
                params.len()
            ),
            params,
        }
    }

    pub fn delete(table: &str, id: Uuid) -> SqlResult {
        SqlResult {
            query: format!("DELETE FROM {} WHERE \"id\" = $1", quote(table)),
            params: vec![SqlValue::Uuid(Some(id))],
        }
    }

    pub fn delete_children(child: &ChildTable, parent_id: Uuid) -> SqlResult {
        SqlResult {
            query: format!(
                "DELETE FROM {} WHERE {} = $1",
                quote(child.table),
                quote(child.foreign_key)
            ),
            params: vec![SqlValue::Uuid(Some(parent_id))],
        }
    }

    pub fn insert_child(child: &ChildTable, parent_id: Uuid, value: &str, position: i32) -> SqlResult {
        SqlResult {
            query: format!(
                "INSERT INTO {} ({}, {}, {}) VALUES ($1, $2, $3)",
                quote(child.table),
                quote(child.foreign_key),
                quote(child.value_column),
                quote(child.position_column)
            ),
            params: vec![
                SqlValue::Uuid(Some(parent_id)),
                SqlValue::Text(Some(value.to_string())),
                SqlValue::Int(position),
            ],
        }
    }
}

/// Attach `params` to a query in order.
pub fn bind_params<'q>(
    mut q: sqlx::query::Query<'q, Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    for p in params {
        q = match p {
            SqlValue::Text(v) => q.bind(v.as_deref()),
            SqlValue::Bool(b) => q.bind(*b),
            SqlValue::Int(i) => q.bind(*i),
            SqlValue::Uuid(u) => q.bind(*u),
            SqlValue::TextList(list) => q.bind(list.as_slice()),
        };
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOTS: ChildTable = ChildTable {
        table: "screenshots",
        foreign_key: "portfolio_id",
        value_column: "url",
        position_column: "position",
    };

    const TABLE: TableSpec = TableSpec {
        table: "widgets",
        label: "Widget",
        columns: &["id", "name", "category_id", "created_at"],
        relations: &[
            Relation::BelongsTo {
                field: "category",
                table: "categories",
                foreign_key: "category_id",
                columns: &["id", "name"],
            },
            Relation::HasMany {
                field: "screenshots",
                table: "screenshots",
                foreign_key: "portfolio_id",
                columns: &["id", "url", "position"],
                order_by: "position",
            },
        ],
        children: &[SHOTS],
        filters: &[ListFilter { param: "categoryId", column: "category_id", kind: FilterKind::Uuid }],
        order_by: ("created_at", SortDirection::Desc),
    };

    #[test]
    fn select_embeds_relations_and_orders() {
        let sql = QueryBuilder::select(&TABLE, &[]);
        assert!(sql.query.starts_with("SELECT row_to_json(x) AS row FROM (SELECT t.\"id\", t.\"name\""));
        assert!(sql.query.contains(
            "(SELECT row_to_json(r) FROM (SELECT p.\"id\", p.\"name\" FROM \"categories\" p WHERE p.\"id\" = t.\"category_id\") r) AS \"category\""
        ));
        assert!(sql.query.contains("json_agg(r ORDER BY r.\"position\")"));
        assert!(sql.query.contains("WHERE c.\"portfolio_id\" = t.\"id\""));
        assert!(sql.query.ends_with("ORDER BY x.\"created_at\" DESC"));
        assert!(!sql.query.contains(" WHERE t."));
        assert!(sql.params.is_empty());
    }

    #[test]
    fn select_with_conditions_numbers_params() {
        let category = Uuid::new_v4();
        let sql = QueryBuilder::select(
            &TABLE,
            &[("category_id", category.into()), ("published", true.into())],
        );
        assert!(sql.query.contains("WHERE t.\"category_id\" = $1 AND t.\"published\" = $2"));
        assert_eq!(sql.params, vec![SqlValue::Uuid(Some(category)), SqlValue::Bool(true)]);
    }

    #[test]
    fn insert_lists_supplied_columns() {
        let mut cs = Changeset::new();
        cs.set("name", "Dev".to_string()).set("category_for", "blog".to_string());

        let sql = QueryBuilder::insert("categories", &cs);
        assert_eq!(
            sql.query,
            "INSERT INTO \"categories\" (\"name\", \"category_for\") VALUES ($1, $2) RETURNING \"id\""
        );
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn update_touches_only_supplied_columns() {
        let id = Uuid::new_v4();
        let mut cs = Changeset::new();
        cs.set_some("title", Some("New".to_string()))
            .set_some::<String>("content", None)
            .set_some::<bool>("published", None);

        let sql = QueryBuilder::update("blogs", id, &cs);
        assert_eq!(
            sql.query,
            "UPDATE \"blogs\" SET \"title\" = $1, \"updated_at\" = now() WHERE \"id\" = $2 RETURNING \"id\""
        );
        assert_eq!(sql.params, vec![SqlValue::Text(Some("New".into())), SqlValue::Uuid(Some(id))]);
    }

    #[test]
    fn empty_update_still_advances_timestamp() {
        let id = Uuid::new_v4();
        let sql = QueryBuilder::update("teams", id, &Changeset::new());
        assert_eq!(
            sql.query,
            "UPDATE \"teams\" SET \"updated_at\" = now() WHERE \"id\" = $1 RETURNING \"id\""
        );
    }

    #[test]
    fn setting_a_column_twice_keeps_last_value() {
        let mut cs = Changeset::new();
        cs.set("name", "a".to_string()).set("name", "b".to_string());
        assert_eq!(cs.columns().count(), 1);
        assert_eq!(cs.get("name"), Some(&SqlValue::Text(Some("b".into()))));
    }

    #[test]
    fn child_statements() {
        let parent = Uuid::new_v4();
        let delete = QueryBuilder::delete_children(&SHOTS, parent);
        assert_eq!(delete.query, "DELETE FROM \"screenshots\" WHERE \"portfolio_id\" = $1");

        let insert = QueryBuilder::insert_child(&SHOTS, parent, "https://cdn/a.png", 0);
        assert_eq!(
            insert.query,
            "INSERT INTO \"screenshots\" (\"portfolio_id\", \"url\", \"position\") VALUES ($1, $2, $3)"
        );
        assert_eq!(insert.params[2], SqlValue::Int(0));
    }

    #[test]
    fn replacing_children_twice_keeps_latest_list() {
        let mut cs = Changeset::new();
        cs.replace_children(SHOTS, vec!["a".into()]);
        cs.replace_children(SHOTS, vec!["b".into(), "c".into()]);
        assert_eq!(cs.children().len(), 1);
        assert_eq!(cs.children()[0].values, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn filter_lookup_by_param() {
        assert_eq!(TABLE.filter("categoryId").map(|f| f.column), Some("category_id"));
        assert!(TABLE.filter("title").is_none());
    }
}

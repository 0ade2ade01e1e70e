//! Runs generated statements against an in-memory SQLite database.
//!
//! These tests check that what the builders emit is accepted by a real engine
//! and that bindings land on the right placeholders.

use sqlweave::prelude::*;
use sqlweave::{JoinKind, Operand, SqliteAdapter};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        logins INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        total INTEGER NOT NULL,
        status TEXT NOT NULL
    );
    CREATE TABLE archive (id INTEGER, name TEXT);
";

async fn connections() -> Connections {
    // RUST_LOG=sqlweave.sql=debug shows the statements
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let adapter = SqliteAdapter::open_in_memory().expect("in-memory database");
    adapter.execute_batch(SCHEMA).expect("schema");
    let connections = Connections::single(Arc::new(adapter));

    qb::insert("users")
        .fields(["name", "active", "email"])
        .positional_row([Operand::from("Alice"), true.into(), "alice@acme.io".into()])
        .positional_row([Operand::from("Bob"), true.into(), "bob@example.com".into()])
        .positional_row([Operand::from("Carol"), false.into(), "carol@acme.io".into()])
        .positional_row([Operand::from("Dave"), true.into()])
        .row_count(&connections)
        .await
        .expect("seed users");

    qb::insert("orders")
        .rows([
            vec![("user_id", Operand::from(1)), ("total", 120.into()), ("status", "paid".into())],
            vec![("user_id", Operand::from(1)), ("total", 80.into()), ("status", "paid".into())],
            vec![("user_id", Operand::from(2)), ("total", 15.into()), ("status", "open".into())],
            vec![("user_id", Operand::from(3)), ("total", 300.into()), ("status", "paid".into())],
        ])
        .row_count(&connections)
        .await
        .expect("seed orders");

    connections
}

#[tokio::test]
async fn test_select_where_order_limit() {
    let db = connections().await;
    let mut q = qb::select("users")
        .fields(["id", "name"])
        .and_where("active", true)
        .order_by_desc("name")
        .limit(1, 1);
    let rows: Vec<(i64, String)> = q.fetch_all_as(&db).await.unwrap();
    assert_eq!(rows, vec![(2, "Bob".to_string())]);
}

#[tokio::test]
async fn test_null_padding_and_null_checks() {
    let db = connections().await;
    let mut q = qb::select("users").field("name").where_null("email");
    let name: String = q.fetch_one(&db).await.unwrap().try_get("name").unwrap();
    assert_eq!(name, "Dave");

    let mut q = qb::select("users").field("COUNT(*)").and_where("email", Value::Null);
    assert_eq!(q.fetch_value(&db).await.unwrap(), Some(Value::Int(1)));
}

#[tokio::test]
async fn test_in_between_and_raw() {
    let db = connections().await;
    let mut q = qb::select("orders")
        .field("id")
        .where_in("status", ["paid", "refunded"])
        .where_between("total", 50, 200)
        .where_raw("user_id <> ?", [3])
        .order_by("id");
    let ids = q.fetch_column(&db).await.unwrap();
    assert_eq!(ids, vec![Value::Int(1), Value::Int(2)]);
}

#[tokio::test]
async fn test_join_group_having() {
    let db = connections().await;
    let mut q = qb::select("users u")
        .fields(["u.name", "SUM(o.total) AS spent"])
        .join_on(JoinKind::Inner, "orders o", "o.user_id", "=", "u.id")
        .and_where("o.status", "paid")
        .group_by(["u.name"])
        .having_op("SUM(o.total)", ">", 150)
        .order_by("u.name");
    let rows: Vec<(String, i64)> = q.fetch_all_as(&db).await.unwrap();
    assert_eq!(rows, vec![("Alice".to_string(), 200), ("Carol".to_string(), 300)]);
}

#[tokio::test]
async fn test_sub_selects() {
    let db = connections().await;
    let paid = qb::select("orders").field("user_id").and_where("status", "paid");
    let mut q = qb::select("users")
        .field("name")
        .where_in_select("id", paid)
        .and_where("active", true);
    let rows: Vec<(String,)> = q.fetch_all_as(&db).await.unwrap();
    assert_eq!(rows, vec![("Alice".to_string(),)]);

    let big = qb::select("orders").fields(["user_id", "total"]).and_where_op("total", ">=", 100);
    let mut q = Select::new()
        .from_select(big, "b")
        .field("COUNT(*)")
        .and_where_op("b.total", "<", 1000);
    assert_eq!(q.fetch_value(&db).await.unwrap(), Some(Value::Int(2)));

    let mut q = qb::select("users u").field("u.name").where_not_exists(
        qb::select("orders o").and_where("o.user_id", expr("u.id")),
    );
    let names = q.fetch_column(&db).await.unwrap();
    assert_eq!(names, vec![Value::from("Dave")]);
}

#[tokio::test]
async fn test_update_increment_and_row_count() {
    let db = connections().await;
    let mut q = qb::update("users")
        .increment("logins", 2)
        .set("email", "team@acme.io")
        .where_in("id", [1, 2]);
    assert_eq!(q.row_count(&db).await.unwrap(), 2);
    assert_eq!(q.row_count(&db).await.unwrap(), 2);

    let mut check = qb::select("users").fields(["logins", "email"]).and_where("id", 2);
    let (logins, email): (i64, String) = check.fetch_one_as(&db).await.unwrap();
    assert_eq!(logins, 2);
    assert_eq!(email, "team@acme.io");
}

#[tokio::test]
async fn test_delete_and_returning() {
    let db = connections().await;
    let mut q = qb::delete("orders").and_where("status", "open");
    assert_eq!(q.row_count(&db).await.unwrap(), 1);

    let mut q = qb::insert("orders")
        .row([("user_id", 4), ("total", 9)])
        .row([("user_id", 4), ("total", 11)])
        .fields(["user_id", "total", "status"])
        .returning(["id", "total"]);
    let err = q.row_count(&db).await.unwrap_err();
    assert!(err.execution().is_some(), "status is NOT NULL: {err}");

    let mut q = qb::insert("orders")
        .row([("user_id", Operand::from(4)), ("total", 9.into()), ("status", "new".into())])
        .returning(["id"]);
    let rows = q.fetch_returning(&db).await.unwrap();
    assert_eq!(rows[0].try_get::<i64>("id").unwrap(), 5);
}

#[tokio::test]
async fn test_insert_select() {
    let db = connections().await;
    let mut q = qb::insert("archive")
        .fields(["id", "name"])
        .select(qb::select("users").fields(["id", "name"]).and_where("active", false));
    assert_eq!(q.row_count(&db).await.unwrap(), 1);

    let mut q = qb::select("archive").field("name");
    assert_eq!(q.fetch_value(&db).await.unwrap(), Some(Value::from("Carol")));
}

#[tokio::test]
async fn test_search_count_and_paginate() {
    let db = connections().await;
    let mut listing = qb::searchable(qb::select("users").and_where("active", true).order_by("id"))
        .search("ACME");

    // no field list: the search runs over the table's columns
    assert_eq!(listing.count(&db).await.unwrap(), 1);

    let page = listing.paginate::<Row, _>(&db, 1, 10).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.items[0].try_get::<String>("name").unwrap(), "Alice");
}

#[tokio::test]
async fn test_search_escapes_wildcards_and_counts_distinct() {
    let db = connections().await;
    let mut listing = qb::searchable(qb::select("users").fields(["name", "email"])).search("_");
    assert_eq!(listing.count(&db).await.unwrap(), 0);

    let mut listing = qb::searchable(qb::select("users").distinct().field("active"));
    assert_eq!(listing.count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn test_grouped_count() {
    let db = connections().await;
    let mut listing = qb::searchable(
        qb::select("orders")
            .fields(["user_id", "SUM(total) AS spent"])
            .group_by(["user_id"]),
    );
    assert_eq!(listing.count(&db).await.unwrap(), 3);

    let mut listing = listing.strip_group_by_on_count(true);
    assert_eq!(listing.count(&db).await.unwrap(), 4);
}

#[tokio::test]
async fn test_driver_error_is_enriched() {
    let db = connections().await;
    let mut q = qb::select("missing_table").and_where("id", 1);
    let err = q.fetch_all(&db).await.unwrap_err();
    let execution = err.execution().expect("execution error");
    assert_eq!(execution.sql, "SELECT * FROM missing_table WHERE id = :id");
    assert_eq!(execution.bindings[0].value(), &Value::Int(1));
    assert!(!execution.prepared);
}

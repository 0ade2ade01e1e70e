use super::*;
use crate::binding::Binding;
use crate::expr::expr;
use crate::qb;

fn render(w: &Where) -> (String, Vec<(String, Value)>) {
    let mut bindings = Bindings::new();
    let sql = w.build(&mut bindings).expect("valid condition tree");
    let values = bindings
        .iter()
        .map(|b: &Binding| (b.name().to_string(), b.value().clone()))
        .collect();
    (sql, values)
}

#[test]
fn test_default_operator_and_links() {
    let w = Where::new()
        .and_where("status", "active")
        .and_where_op("age", ">", 18)
        .or_where("role", "admin");
    let (sql, values) = render(&w);
    assert_eq!(sql, "status = :status AND age > :age OR role = :role");
    assert_eq!(
        values,
        vec![
            ("status".to_string(), Value::from("active")),
            ("age".to_string(), Value::Int(18)),
            ("role".to_string(), Value::from("admin")),
        ]
    );
}

#[test]
fn test_first_link_is_never_emitted() {
    let (sql, _) = render(&Where::new().or_where("a", 1).and_where("b", 2));
    assert_eq!(sql, "a = :a AND b = :b");
}

#[test]
fn test_expr_is_not_bound() {
    let w = Where::new()
        .and_where_op("updated_at", "<", expr("NOW()"))
        .and_where("a.owner_id", expr("u.id"));
    let (sql, values) = render(&w);
    assert_eq!(sql, "updated_at < NOW() AND a.owner_id = u.id");
    assert!(values.is_empty());
}

#[test]
fn test_null_comparisons() {
    let w = Where::new()
        .and_where("deleted_at", Value::Null)
        .and_where_op("parent_id", "!=", Option::<i64>::None)
        .where_null("a")
        .or_where_not_null("b");
    let (sql, values) = render(&w);
    assert_eq!(
        sql,
        "deleted_at IS NULL AND parent_id IS NOT NULL AND a IS NULL OR b IS NOT NULL"
    );
    assert!(values.is_empty());
}

#[test]
fn test_operator_is_normalized() {
    let (sql, _) = render(&Where::new().and_where_op("name", "not   like", "%x%"));
    assert_eq!(sql, "name NOT LIKE :name");
}

#[test]
fn test_unknown_operator_fails() {
    let w = Where::new().and_where_op("id", "; DROP TABLE users", 1);
    let err = w.build(&mut Bindings::new()).unwrap_err();
    assert!(err.is_build());
}

#[test]
fn test_where_in_binds_each_element() {
    let w = Where::new().where_in("id", [1, 2, 3]).where_not_in("state", ["x"]);
    let (sql, values) = render(&w);
    assert_eq!(sql, "id IN (:id, :id_1, :id_2) AND state NOT IN (:state)");
    assert_eq!(values.len(), 4);
}

#[test]
fn test_where_in_empty_list_fails() {
    let w = Where::new().where_in("id", Vec::<i64>::new());
    let err = w.build(&mut Bindings::new()).unwrap_err();
    assert!(err.is_build());
    assert!(err.to_string().contains("IN"));
}

#[test]
fn test_between() {
    let w = Where::new()
        .where_between("age", 18, 65)
        .or_where_between("score", 1, 2)
        .where_not_between("price", 10, expr("max_price"));
    let (sql, values) = render(&w);
    assert_eq!(
        sql,
        "age BETWEEN :age AND :age_1 OR score BETWEEN :score AND :score_1 \
         AND price NOT BETWEEN :price AND max_price"
    );
    assert_eq!(values.len(), 5);
}

#[test]
fn test_raw_markers() {
    let w = Where::new()
        .where_raw("created_at > ? AND note <> '?'", [Value::from("2024-01-01")])
        .or_where_raw("tags ?| array['a']", Vec::<Value>::new());
    let (sql, values) = render(&w);
    assert_eq!(sql, "created_at > :raw AND note <> '?' OR tags ?| array['a']");
    assert_eq!(values, vec![("raw".to_string(), Value::from("2024-01-01"))]);
}

#[test]
fn test_raw_marker_count_mismatch_fails() {
    let w = Where::new().where_raw("a = ? AND b = ?", [1]);
    assert!(w.build(&mut Bindings::new()).unwrap_err().is_build());

    let w = Where::new().where_raw("a = ?", [1, 2]);
    assert!(w.build(&mut Bindings::new()).unwrap_err().is_build());
}

#[test]
fn test_nested_groups() {
    let w = Where::new()
        .and_where("active", true)
        .where_nested(|w| {
            w.and_where("role", "admin")
                .or_where_nested(|w| w.and_where("role", "user").and_where_op("karma", ">", 100))
        });
    let (sql, values) = render(&w);
    assert_eq!(
        sql,
        "active = :active AND (role = :role OR (role = :role_1 AND karma > :karma))"
    );
    let names: Vec<&str> = values.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["active", "role", "role_1", "karma"]);
}

#[test]
fn test_empty_group_is_skipped() {
    let w = Where::new().where_group(Where::new()).and_where("a", 1);
    assert!(w.has_where());
    let (sql, _) = render(&w);
    assert_eq!(sql, "a = :a");
    assert!(!Where::new().where_group(Where::new()).has_where());
}

#[test]
fn test_positional_names() {
    let w = Where::new()
        .and_where_op("total", ">", 10)
        .and_where_op("total", "<", 100);
    let mut bindings = Bindings::new();
    let sql = w.build_positional(&mut bindings, "having").unwrap();
    assert_eq!(sql, "total > :having_1_total AND total < :having_2_total");
}

#[test]
fn test_in_select_merges_scoped_bindings() {
    let sub = qb::select("orders").field("user_id").and_where("status", "paid");
    let w = Where::new().and_where("status", "active").where_in_select("id", sub);
    let (sql, values) = render(&w);
    assert_eq!(
        sql,
        "status = :status AND id IN (SELECT user_id FROM orders WHERE status = :s1_status)"
    );
    let names: Vec<&str> = values.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["status", "s1_status"]);
}

#[test]
fn test_exists() {
    let sub = qb::select("orders o").and_where("o.user_id", expr("u.id"));
    let w = Where::new().where_exists(sub.clone()).where_not_exists(sub);
    let (sql, values) = render(&w);
    assert_eq!(
        sql,
        "EXISTS (SELECT * FROM orders o WHERE o.user_id = u.id) \
         AND NOT EXISTS (SELECT * FROM orders o WHERE o.user_id = u.id)"
    );
    assert!(values.is_empty());
}

#[test]
fn test_expand_raw_without_values_is_verbatim() {
    let mut b = Bindings::new();
    assert_eq!(expand_raw("a ? b", &[], "raw", &mut b).unwrap(), "a ? b");
    assert!(b.is_empty());
}

#[test]
fn test_match_binds_under_column_name() {
    let w = Where::new()
        .and_where("active", true)
        .or_where_match("LOWER(CAST(u.email AS TEXT))".into(), "LIKE", "u.email", Value::from("%a!_b%"));
    let (sql, values) = render(&w);
    assert_eq!(
        sql,
        "active = :active OR LOWER(CAST(u.email AS TEXT)) LIKE :u_email ESCAPE '!'"
    );
    assert_eq!(values[1], ("u_email".to_string(), Value::from("%a!_b%")));
}

#[test]
fn test_escape_like() {
    assert_eq!(escape_like("50%_off!"), "50!%!_off!!");
    assert_eq!(escape_like("plain"), "plain");
}

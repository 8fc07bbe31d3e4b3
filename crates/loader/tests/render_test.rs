//! Reference SQL rendering of request descriptors and plans.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use tabledata::{
    ColumnSearch, Connector, KeywordType, Operator, PredicateRenderer, RenderError,
    RequestDescriptor, RequestPlan, SortDirection, SqlRenderer,
};
use tabledata_test_utils::assert;

fn inline_sql(request: &RequestDescriptor) -> String {
    SqlRenderer::new("masterId")
        .inline(true)
        .render(request)
        .unwrap()
        .sql
}

#[test]
fn nested_groups_render_with_precedence() {
    let mut request = RequestDescriptor::new();
    request
        .set_table("users")
        .open_group()
        .add_criterion_joined("id", "=", 1, Connector::Or)
        .open_group()
        .add_criterion("name", "test")
        .add_criterion("active", true)
        .close_group()
        .close_group();

    let sql = inline_sql(&request);
    assert::contains(&sql, "SELECT * FROM \"users\" WHERE");
    assert::contains(&sql, "\"id\" = 1 OR");
    assert::contains(&sql, "\"name\" = 'test' AND \"active\"");
}

#[test]
fn operators_render() {
    let mut request = RequestDescriptor::new();
    request
        .set_table("products")
        .add_criterion_with("name", "LIKE ", "test")
        .add_criterion_range("qty", "BETWEEN", 5, 15)
        .add_criterion("id", vec![1, 2, 3])
        .add_criterion_with("price", ">=", 10)
        .add_criterion_with("status", "<>", "gone")
        .add_order_by("name", SortDirection::Desc)
        .set_limit(10)
        .set_offset(20);

    let sql = inline_sql(&request);
    assert::contains(&sql, "\"name\" LIKE 'test%'");
    assert::contains(&sql, "\"qty\" BETWEEN 5 AND 15");
    assert::contains(&sql, "\"id\" IN (1, 2, 3)");
    assert::contains(&sql, "\"price\" >= 10");
    assert::contains(&sql, "\"status\" <> 'gone'");
    assert::contains(&sql, "ORDER BY \"name\" DESC");
    assert::contains(&sql, "LIMIT 10");
    assert::contains(&sql, "OFFSET 20");
}

#[test]
fn bound_values_are_returned_in_order() {
    let mut request = RequestDescriptor::new();
    request
        .set_table("users")
        .add_criterion("name", "john")
        .add_criterion_with("age", ">", 30);

    let rendered = SqlRenderer::new("masterId").render(&request).unwrap();
    assert::contains(&rendered.sql, "\"name\" = $1");
    assert::contains(&rendered.sql, "\"age\" > $2");
    assert_eq!(rendered.values, vec![json!("john"), json!(30)]);
}

#[test]
fn unbalanced_brackets_are_rejected() {
    let mut request = RequestDescriptor::new();
    request.set_table("users").open_group().add_criterion("a", 1);

    let err = SqlRenderer::new("masterId").render(&request).unwrap_err();
    assert_eq!(err, RenderError::UnbalancedBrackets);
}

#[test]
fn table_name_is_required_and_checked() {
    let request = RequestDescriptor::new();
    assert_eq!(
        SqlRenderer::new("masterId").render(&request).unwrap_err(),
        RenderError::MissingTable
    );

    let sql = SqlRenderer::new("masterId")
        .with_table("audit_log")
        .with_columns(["id", "message"])
        .inline(true)
        .render(&request)
        .unwrap()
        .sql;
    assert_eq!(sql, "SELECT \"id\", \"message\" FROM \"audit_log\"");

    let mut hostile = RequestDescriptor::new();
    hostile.set_table("users; DROP TABLE users");
    assert!(matches!(
        SqlRenderer::new("masterId").render(&hostile),
        Err(RenderError::UnsafeIdentifier(_))
    ));
}

#[test]
fn keyword_search_ors_eligible_columns() {
    let mut request = RequestDescriptor::new();
    request
        .set_table("items")
        .set_keyword("42")
        .add_search_column("title")
        .add_search_column(ColumnSearch::typed("qty", KeywordType::Integer))
        .add_search_column(ColumnSearch::typed("price", KeywordType::Double));

    let sql = inline_sql(&request);
    assert::contains(&sql, "\"title\" LIKE '%42%' OR \"qty\" = 42");
    assert::not_contains(&sql, "price");
}

#[test]
fn master_ids_are_unquoted_for_binding() {
    let mut request = RequestDescriptor::new();
    request
        .set_table("lines")
        .set_master_list_id(vec![json!("'a'"), json!("'o''k'")]);

    let rendered = SqlRenderer::new("masterId").render(&request).unwrap();
    assert::contains(&rendered.sql, "\"masterId\" IN ($1, $2)");
    assert_eq!(rendered.values, vec![json!("a"), json!("o'k")]);
}

#[test]
fn plan_renders_like_fluent_calls() {
    let plan: RequestPlan = serde_json::from_str(
        r#"{
            "table": "users",
            "steps": [
                {"op": "open"},
                {"op": "add", "field": "id", "value": 1, "connector": "OR"},
                {"op": "open"},
                {"op": "add", "field": "name", "value": "test"},
                {"op": "add", "field": "active", "value": true},
                {"op": "close"},
                {"op": "close"}
            ],
            "limit": 5,
            "order_by": [{"field": "id"}]
        }"#,
    )
    .unwrap();
    let from_plan = plan.into_descriptor();

    let mut fluent = RequestDescriptor::new();
    fluent
        .set_table("users")
        .open_group()
        .add_criterion_joined("id", Operator::Equals, 1, Connector::Or)
        .open_group()
        .add_criterion("name", "test")
        .add_criterion("active", true)
        .close_group()
        .close_group()
        .set_limit(5)
        .add_order_by("id", SortDirection::Asc);

    assert!(from_plan.validate().is_ok());
    assert_eq!(inline_sql(&from_plan), inline_sql(&fluent));
}

//! Master-detail assembly driven through the loader.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;

use serde_json::{Value, json};
use tabledata::{
    LoaderConfig, LoaderContext, MasterDetail, MergePolicy, RequestDescriptor, TableDataLoader,
};
use tabledata_test_utils::{assert, child_row, rows, test_row};

#[test]
fn children_attach_under_expanded_key() {
    let context = LoaderContext::default();
    let seen_ids = RefCell::new(None);

    let response = TableDataLoader::<Value>::with_context(&context)
        .use_to_get_data(|_| Ok(rows([test_row(100), test_row(200)])))
        .use_child_list(|request: &RequestDescriptor| {
            *seen_ids.borrow_mut() = request.master_list_id().map(<[Value]>::to_vec);
            Ok(rows([
                child_row(1, 100),
                child_row(2, 100),
                child_row(3, 200).without_master(),
            ]))
        })
        .build()
        .unwrap();

    assert_eq!(seen_ids.into_inner(), Some(vec![json!(100), json!(200)]));
    assert_eq!(response.total, 2);

    let first = &response.items[0];
    assert::has_key(first, "expandedKey");
    assert_eq!(first["expandedKey"].as_array().unwrap().len(), 2);
    assert_eq!(first["id"], 100);
    assert::json_eq(&response.items[1]["expandedKey"], &json!([]));
}

#[test]
fn string_ids_reach_the_child_fetch_quoted() {
    let context = LoaderContext::default();
    let seen_ids = RefCell::new(Vec::new());

    let masters = vec![
        json!({"masterId": "a1", "name": "first"}),
        json!({"masterId": "o'brien", "name": "second"}),
        json!({"name": "no key"}),
    ];
    let response = TableDataLoader::<Value>::with_context(&context)
        .use_to_get_data(move |_| Ok(masters))
        .use_child_list(|request: &RequestDescriptor| {
            seen_ids
                .borrow_mut()
                .extend(request.master_list_id().unwrap_or_default().iter().cloned());
            Ok(vec![child_row(9, "a1").into_value()])
        })
        .build()
        .unwrap();

    assert_eq!(
        seen_ids.into_inner(),
        vec![json!("'a1'"), json!("'o''brien'")]
    );
    assert_eq!(response.items[0]["expandedKey"][0]["id"], 9);
    assert::json_eq(&response.items[1]["expandedKey"], &json!([]));
    assert::json_eq(&response.items[2]["expandedKey"], &json!([]));
}

#[test]
fn single_child_replaces_master() {
    let context = LoaderContext::default();

    let response = TableDataLoader::<Value>::with_context(&context)
        .use_to_get_data(|_| {
            Ok(rows([
                test_row(100).with_field("title", "parent"),
                test_row(200).with_field("title", "lonely"),
            ]))
        })
        .use_child_list(|_| {
            Ok(rows([
                child_row(1, 100).with_field("detail", "only"),
                child_row(2, 200),
                child_row(3, 200),
            ]))
        })
        .replace_parent_by_child(["masterId"])
        .build()
        .unwrap();

    let flattened = &response.items[0];
    assert::json_eq(
        flattened,
        &json!({"id": 1, "masterId": 100, "detail": "only"}),
    );
    assert::lacks_key(flattened, "expandedKey");
    assert::lacks_key(flattened, "title");

    let kept = &response.items[1];
    assert_eq!(kept["title"], "lonely");
    assert::json_eq(&kept["expandedKey"], &json!([{"id": 2}, {"id": 3}]));
}

#[test]
fn empty_child_fetch_gives_empty_lists() {
    let context = LoaderContext::default();

    let response = TableDataLoader::<Value>::with_context(&context)
        .use_to_get_data(|_| Ok(rows([test_row(1), test_row(2)])))
        .use_child_list(|_| Ok(Vec::new()))
        .build()
        .unwrap();

    for item in &response.items {
        assert::json_eq(&item["expandedKey"], &json!([]));
    }
}

#[test]
fn non_row_items_pass_through() {
    let context = LoaderContext::default();
    let called = RefCell::new(false);

    let response = TableDataLoader::<Value>::with_context(&context)
        .use_to_get_data(|_| Ok(vec![json!(1), json!(2)]))
        .use_child_list(|_| {
            *called.borrow_mut() = true;
            Ok(Vec::new())
        })
        .build()
        .unwrap();

    assert!(!called.into_inner());
    assert_eq!(response.items, vec![json!(1), json!(2)]);
}

#[test]
fn child_fetch_errors_propagate() {
    let context = LoaderContext::default();

    let err = TableDataLoader::<Value>::with_context(&context)
        .use_to_get_data(|_| Ok(rows([test_row(1)])))
        .use_child_list(|_| Err(anyhow::anyhow!("detail source down")))
        .build()
        .unwrap_err();

    assert_eq!(err.to_string(), "detail source down");
}

#[test]
fn custom_keys_come_from_config() {
    let config = LoaderConfig {
        master_key: "orderId".to_string(),
        expanded_key: "lines".to_string(),
        ..LoaderConfig::default()
    };
    let assembler = MasterDetail::new(&config).with_policy(MergePolicy::Attach);

    let mut masters = vec![json!({"orderId": 5}), json!({"orderId": 6})];
    let mut request = RequestDescriptor::new();
    let assembled = assembler
        .assemble(&mut masters, &mut request, |_| {
            Ok(vec![json!({"orderId": 6, "sku": "x"})])
        })
        .unwrap();

    assert!(assembled);
    assert_eq!(request.master_list_id(), Some(&[json!(5), json!(6)][..]));
    assert::json_eq(&masters[0]["lines"], &json!([]));
    assert::json_eq(&masters[1]["lines"], &json!([{"orderId": 6, "sku": "x"}]));
}

mod support;

use serde_json::{Value as Json, json};
use support::*;
use vellum::{ExecError, Node, QueryError};

async fn eval(tree: Node) -> Json {
    run(tree, &FullScan::new(Vec::new())).await
}

async fn eval_err(tree: Node) -> QueryError {
    try_run(tree, &FullScan::new(Vec::new())).await.unwrap_err()
}

// ============================================================================
// Three-valued logic
// ============================================================================

#[tokio::test]
async fn test_decisive_side_wins() {
    assert_eq!(eval(or(boolean(true), string("x"))).await, json!(true));
    assert_eq!(eval(or(string("x"), boolean(true))).await, json!(true));
    assert_eq!(eval(and(boolean(false), string("x"))).await, json!(false));
    assert_eq!(eval(and(null(), boolean(false))).await, json!(false));
}

#[tokio::test]
async fn test_undecided_logic_is_null() {
    assert_eq!(eval(and(boolean(true), string("x"))).await, Json::Null);
    assert_eq!(eval(or(boolean(false), int(1))).await, Json::Null);
    assert_eq!(eval(and(null(), null())).await, Json::Null);
    assert_eq!(eval(not(string("x"))).await, Json::Null);
    assert_eq!(eval(not(boolean(true))).await, json!(false));
}

#[tokio::test]
async fn test_plain_booleans() {
    assert_eq!(eval(and(boolean(true), boolean(true))).await, json!(true));
    assert_eq!(eval(or(boolean(false), boolean(false))).await, json!(false));
}

// ============================================================================
// Comparison
// ============================================================================

#[tokio::test]
async fn test_loose_equality() {
    assert_eq!(eval(eq(int(1), float(1.0))).await, json!(true));
    assert_eq!(eval(eq(string("2"), int(2))).await, json!(true));
    assert_eq!(eval(eq(boolean(true), int(1))).await, json!(true));
    assert_eq!(eval(eq(string("a"), string("a"))).await, json!(true));
    assert_eq!(
        eval(eq(array(vec![int(1)]), array(vec![int(1)]))).await,
        json!(false)
    );
    assert_eq!(eval(neq(string("a"), int(1))).await, json!(true));
}

#[tokio::test]
async fn test_comparisons_with_null_are_unknown() {
    assert_eq!(eval(eq(null(), null())).await, Json::Null);
    assert_eq!(eval(neq(null(), null())).await, Json::Null);
    assert_eq!(eval(eq(attr("missing"), int(1))).await, Json::Null);
    assert_eq!(eval(not(eq(attr("missing"), int(1)))).await, Json::Null);
}

#[tokio::test]
async fn test_ordering_comparisons() {
    assert_eq!(eval(lt(int(1), float(1.5))).await, json!(true));
    assert_eq!(eval(gt(string("b"), string("a"))).await, json!(true));
    assert_eq!(eval(gt(null(), int(0))).await, Json::Null);
    assert_eq!(eval(lt(null(), int(0))).await, Json::Null);
    // a string that is not a number cannot be ordered against one
    assert_eq!(eval(lt(string("x"), int(1))).await, Json::Null);
    assert_eq!(eval(gt(array(vec![]), int(1))).await, Json::Null);
}

#[tokio::test]
async fn test_unknown_comparisons_drop_out_of_projections() {
    let documents = vec![json!({"_id": "a"}), json!({"_id": "b"})];
    let tree = project(
        filter(everything(), eq(attr("_id"), string("b"))),
        vec![
            assign("r", eq(attr("missing"), int(1))),
            assign("n", not(eq(attr("missing"), int(1)))),
        ],
    );
    assert_eq!(run(tree, &FullScan::new(documents)).await, json!([{}]));
}

#[tokio::test]
async fn test_membership() {
    assert_eq!(
        eval(is_in(int(2), array(vec![int(1), int(2)]))).await,
        json!(true)
    );
    assert_eq!(
        eval(is_in(string("c"), array(vec![string("a"), string("b")]))).await,
        json!(false)
    );
    assert_eq!(eval(is_in(null(), array(vec![int(1)]))).await, Json::Null);
    assert_eq!(
        eval(is_in(string("a.b"), call("path", vec![string("a.*")]))).await,
        json!(true)
    );
    assert_eq!(
        eval(is_in(string("a.b.c"), call("path", vec![string("a.*")]))).await,
        json!(false)
    );
    assert_eq!(
        eval(is_in(string("a.b.c"), call("path", vec![string("a.**")]))).await,
        json!(true)
    );
}

#[tokio::test]
async fn test_membership_type_errors() {
    assert!(matches!(
        eval_err(is_in(int(1), int(2))).await,
        QueryError::Exec(ExecError::InOperand("number"))
    ));
    assert!(matches!(
        eval_err(is_in(int(1), call("path", vec![string("a.*")]))).await,
        QueryError::Exec(ExecError::PathCandidate("number"))
    ));
}

// ============================================================================
// Match
// ============================================================================

#[tokio::test]
async fn test_match_wildcards_and_tokens() {
    assert_eq!(
        eval(matches(string("hello world"), array(vec![string("hel*")]))).await,
        json!(true)
    );
    assert_eq!(
        eval(matches(string("hello"), string("xyz"))).await,
        json!(false)
    );
    assert_eq!(
        eval(matches(string("World HELLO"), array(vec![string("hello"), string("world")]))).await,
        json!(true)
    );
    // both terms would need the single token
    assert_eq!(
        eval(matches(string("hello"), array(vec![string("he*"), string("hel*")]))).await,
        json!(false)
    );
}

#[tokio::test]
async fn test_match_on_non_strings_is_unknown() {
    assert_eq!(eval(matches(int(5), string("5"))).await, Json::Null);
    assert_eq!(
        eval(matches(array(vec![int(5), string("hello")]), string("hello"))).await,
        Json::Null
    );
    assert_eq!(
        eval(matches(array(vec![string("hello"), int(5)]), string("hello"))).await,
        json!(true)
    );
}

// ============================================================================
// Functions
// ============================================================================

#[tokio::test]
async fn test_functions() {
    assert_eq!(
        eval(call("count", vec![array(vec![int(1), int(2), int(3)])])).await,
        json!(3)
    );
    assert_eq!(eval(call("count", vec![null()])).await, json!(0));
    assert_eq!(eval(call("length", vec![string("héllo")])).await, json!(5));
    assert_eq!(eval(call("length", vec![null()])).await, Json::Null);
    assert_eq!(eval(call("defined", vec![attr("missing")])).await, json!(false));
    assert_eq!(eval(call("defined", vec![array(vec![])])).await, json!(false));
    assert_eq!(eval(call("defined", vec![int(0)])).await, json!(true));
    assert_eq!(
        eval(call("coalesce", vec![null(), attr("missing"), int(2), int(3)])).await,
        json!(2)
    );
    assert_eq!(
        eval(call("joinPaths", vec![string("drafts"), string("a.b")])).await,
        json!("drafts.a.b")
    );
}

// ============================================================================
// Objects and arrays
// ============================================================================

#[tokio::test]
async fn test_null_fields_are_dropped() {
    let tree = object(vec![
        assign("a", call("coalesce", vec![attr("missing"), null()])),
        assign("b", int(1)),
    ]);
    assert_eq!(eval(tree).await, json!({"b": 1}));
}

#[tokio::test]
async fn test_later_keys_override() {
    let tree = object(vec![assign("a", int(1)), assign("a", int(2))]);
    assert_eq!(eval(tree).await, json!({"a": 2}));
}

#[tokio::test]
async fn test_array_literal_keeps_nulls() {
    assert_eq!(
        eval(array(vec![int(1), null(), string("x")])).await,
        json!([1, null, "x"])
    );
}

#[tokio::test]
async fn test_subscript_on_attribute_value() {
    let documents = vec![json!({"_id": "x", "list": [10, 20, 30]})];
    let fetcher = FullScan::new(documents);
    let tree = project(
        all(everything()),
        vec![
            assign("last", index(attr("list"), -1)),
            assign("middle", slice(attr("list"), 1, 1, true)),
            assign("beyond", index(attr("list"), 7)),
        ],
    );
    assert_eq!(
        run(tree, &fetcher).await,
        json!([{"last": 30, "middle": [20]}])
    );
}

#[tokio::test]
async fn test_operations_outside_their_position_fail() {
    let tree = Node::Range {
        start: Box::new(int(0)),
        end: Box::new(int(1)),
        inclusive: false,
    };
    assert!(matches!(
        eval_err(tree).await,
        QueryError::Exec(ExecError::InvalidOperation("range"))
    ));
}

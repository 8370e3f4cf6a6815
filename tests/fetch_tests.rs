mod support;

use serde_json::{Value as Json, json};
use support::*;
use vellum::plan::{BinaryOp, Direction, Operation, PathStep, SortTerm};
use vellum::{FetchSpec, Node, Value};

/// Run `tree` against the dataset and return every fetch spec the fetcher saw.
async fn specs_of(tree: Node) -> Vec<FetchSpec> {
    let fetcher = Recording::new(collection(dataset()));
    run(tree, &fetcher).await;
    fetcher.specs()
}

fn compare(operator: BinaryOp, name: &str, value: impl Into<Value>) -> Operation {
    Operation::binary(operator, Operation::attribute(name), Operation::literal(value))
}

fn id_list(ids: &[&str]) -> Operation {
    Operation::literal(Value::Array(ids.iter().map(|id| Value::from(*id)).collect()))
}

// ============================================================================
// Folding pipelines into specs
// ============================================================================

#[tokio::test]
async fn test_window_after_filter_is_pushed() {
    let tree = slice(filter(everything(), eq(attr("rank"), int(1))), 1, 3, false);
    let specs = specs_of(tree).await;
    assert_eq!(
        specs,
        vec![FetchSpec {
            filter: Some(compare(BinaryOp::Eq, "rank", 1i64)),
            start: Some(1),
            end: Some(3),
            ordering: vec![],
        }]
    );
}

#[tokio::test]
async fn test_filter_after_window_is_not_pushed() {
    let tree = filter(slice(everything(), 1, 2, true), eq(attr("rank"), int(1)));
    let specs = specs_of(tree).await;
    assert_eq!(specs[0].filter, None);
    assert_eq!((specs[0].start, specs[0].end), (Some(1), Some(3)));
}

#[tokio::test]
async fn test_ordering_and_window_are_pushed_together() {
    let tree = project(
        slice(order(of_type("post"), vec![desc(attr("rank"))]), 0, 2, false),
        vec![attr("title")],
    );
    let specs = specs_of(tree).await;
    assert_eq!(
        specs[0],
        FetchSpec {
            filter: Some(compare(BinaryOp::Eq, "_type", "post")),
            start: Some(0),
            end: Some(2),
            ordering: vec![SortTerm {
                expression: Box::new(Operation::attribute("rank")),
                direction: Direction::Desc,
            }],
        }
    );
}

#[tokio::test]
async fn test_window_after_projection_is_pushed() {
    let tree = index(project(of_type("post"), vec![attr("title")]), 0);
    let specs = specs_of(tree).await;
    assert_eq!(specs[0].filter, Some(compare(BinaryOp::Eq, "_type", "post")));
    assert_eq!((specs[0].start, specs[0].end), (Some(0), Some(1)));
}

#[tokio::test]
async fn test_filter_after_projection_is_not_pushed() {
    let tree = filter(
        project(
            order(of_type("post"), vec![attr("rank")]),
            vec![attr("title")],
        ),
        eq(attr("title"), string("Draft")),
    );
    let specs = specs_of(tree).await;
    assert_eq!(specs[0].filter, Some(compare(BinaryOp::Eq, "_type", "post")));
    assert_eq!(specs[0].ordering.len(), 1);
    assert!(!specs[0].has_window());
}

#[tokio::test]
async fn test_window_from_the_end_keeps_only_the_filter() {
    let tree = slice(of_type("post"), -2, -1, false);
    let specs = specs_of(tree).await;
    assert_eq!(
        specs,
        vec![FetchSpec::filtered(compare(BinaryOp::Eq, "_type", "post"))]
    );
}

// ============================================================================
// Join generalization
// ============================================================================

fn posts_of_each_author(authors: Node) -> Node {
    let posts = project(
        filter(
            everything(),
            eq(dot(attr("author"), attr("_ref")), parent_attr("_id")),
        ),
        vec![attr("_id")],
    );
    project(authors, vec![attr("name"), assign("posts", posts)])
}

#[tokio::test]
async fn test_join_becomes_membership_over_every_parent() {
    let specs = specs_of(posts_of_each_author(of_type("author"))).await;
    assert_eq!(specs.len(), 2);
    assert_eq!(
        specs[1],
        FetchSpec::filtered(Operation::binary(
            BinaryOp::In,
            Operation::accessor(vec![
                PathStep::attribute("author"),
                PathStep::attribute("_ref"),
            ]),
            id_list(&["a1", "a2"]),
        ))
    );
}

#[tokio::test]
async fn test_join_with_single_parent_stays_equality() {
    let authors = filter(everything(), eq(attr("_id"), string("a1")));
    let specs = specs_of(posts_of_each_author(authors)).await;
    assert_eq!(
        specs[1].filter,
        Some(Operation::binary(
            BinaryOp::Eq,
            Operation::accessor(vec![
                PathStep::attribute("author"),
                PathStep::attribute("_ref"),
            ]),
            Operation::literal("a1"),
        ))
    );
}

#[tokio::test]
async fn test_join_inside_boolean_structure() {
    let posts = filter(
        everything(),
        and(
            eq(dot(attr("author"), attr("_ref")), parent_attr("_id")),
            not(eq(attr("published"), boolean(false))),
        ),
    );
    let tree = project(
        of_type("author"),
        vec![attr("name"), assign("n", call("count", vec![posts]))],
    );
    let fetcher = Recording::new(collection(dataset()));
    let result = run(tree, &fetcher).await;
    assert_eq!(
        result,
        // the unpublished draft has no flag, so its comparison is unknown
        json!([{"name": "Ada", "n": 2}, {"name": "Brian", "n": 0}])
    );

    let specs = fetcher.specs();
    let Some(Operation::Binary {
        operator: BinaryOp::And,
        lhs,
        ..
    }) = &specs[1].filter
    else {
        panic!("expected a conjunction, got {:?}", specs[1].filter);
    };
    assert!(matches!(
        lhs.as_ref(),
        Operation::Binary {
            operator: BinaryOp::In,
            ..
        }
    ));
}

#[tokio::test]
async fn test_references_join() {
    let referencing = filter(everything(), call("references", vec![parent_attr("_id")]));
    let tree = project(
        of_type("author"),
        vec![attr("_id"), assign("n", call("count", vec![referencing]))],
    );
    let fetcher = Recording::new(collection(dataset()));
    assert_eq!(
        run(tree, &fetcher).await,
        json!([{"_id": "a1", "n": 3}, {"_id": "a2", "n": 3}])
    );
    assert!(matches!(
        &fetcher.specs()[1].filter,
        Some(Operation::FunctionCall { arguments, .. })
            if arguments == &vec![Operation::literal("a1"), Operation::literal("a2")]
    ));
}

#[tokio::test]
async fn test_map_join_fetches_requested_ids() {
    let tree = project(
        of_type("book"),
        vec![assign("authors", dot(deref(all(attr("authors"))), attr("name")))],
    );
    let specs = specs_of(tree).await;
    assert_eq!(
        specs[1],
        FetchSpec::filtered(Operation::binary(
            BinaryOp::In,
            Operation::attribute("_id"),
            id_list(&["a2", "a1", "gone"]),
        ))
    );
}

#[tokio::test]
async fn test_join_on_full_scan_parent_sees_every_document() {
    let fetcher = Recording::new(FullScan::new(dataset()));
    run(posts_of_each_author(of_type("author")), &fetcher).await;
    assert_eq!(
        fetcher.specs()[1].filter,
        Some(Operation::binary(
            BinaryOp::In,
            Operation::accessor(vec![
                PathStep::attribute("author"),
                PathStep::attribute("_ref"),
            ]),
            id_list(&["p1", "p2", "p3", "drafts.p4", "a1", "a2", "b1"]),
        ))
    );
}

// ============================================================================
// Membership joins
// ============================================================================

/// Run `tree` against `documents`, returning the result and every fetch spec.
async fn run_recorded(tree: Node, documents: Vec<Json>) -> (Json, Vec<FetchSpec>) {
    let fetcher = Recording::new(collection(documents.clone()));
    let result = run(tree.clone(), &fetcher).await;
    assert_eq!(result, run(tree, &FullScan::new(documents)).await);
    (result, fetcher.specs())
}

fn topics_and_posts() -> Vec<Json> {
    vec![
        json!({"_id": "t1", "_type": "topic", "name": "rust"}),
        json!({"_id": "t2", "_type": "topic", "name": "go"}),
        json!({"_id": "t3", "_type": "tag"}),
        json!({"_id": "p1", "_type": "post", "tags": ["rust", "db"]}),
        json!({"_id": "p2", "_type": "post", "tags": ["go", "rust"]}),
        json!({"_id": "p3", "_type": "post", "tags": []}),
        json!({"_id": "r1", "_type": "reading", "wanted": ["p1", "p3"]}),
        json!({"_id": "r2", "_type": "reading", "wanted": ["p2"]}),
        json!({"_id": "r3", "_type": "reading", "wanted": []}),
    ]
}

fn tagged_posts(parents: Node) -> Node {
    let posts = project(
        filter(everything(), is_in(parent_attr("name"), attr("tags"))),
        vec![attr("_id")],
    );
    project(parents, vec![assign("posts", posts)])
}

#[tokio::test]
async fn test_parent_value_in_field_becomes_alternatives() {
    let tree = tagged_posts(of_type("topic"));
    let (result, specs) = run_recorded(tree, topics_and_posts()).await;
    assert_eq!(
        result,
        json!([
            {"posts": [{"_id": "p1"}, {"_id": "p2"}]},
            {"posts": [{"_id": "p2"}]},
        ])
    );
    let in_tags = |name: &str| {
        Operation::binary(BinaryOp::In, Operation::literal(name), Operation::attribute("tags"))
    };
    assert_eq!(
        specs[1],
        FetchSpec::filtered(Operation::binary(BinaryOp::Or, in_tags("rust"), in_tags("go")))
    );
}

#[tokio::test]
async fn test_missing_parent_value_in_field_matches_nothing() {
    let (result, specs) = run_recorded(tagged_posts(of_type("tag")), topics_and_posts()).await;
    assert_eq!(result, json!([{"posts": []}]));
    assert_eq!(specs[1], FetchSpec::filtered(Operation::literal(false)));
}

fn wanted_posts(parents: Node) -> Node {
    let posts = project(
        filter(everything(), is_in(attr("_id"), parent_attr("wanted"))),
        vec![attr("_id")],
    );
    project(parents, vec![attr("_id"), assign("posts", posts)])
}

#[tokio::test]
async fn test_field_in_parent_list_flattens_every_list() {
    let tree = wanted_posts(of_type("reading"));
    let (result, specs) = run_recorded(tree, topics_and_posts()).await;
    assert_eq!(
        result,
        json!([
            {"_id": "r1", "posts": [{"_id": "p1"}, {"_id": "p3"}]},
            {"_id": "r2", "posts": [{"_id": "p2"}]},
            {"_id": "r3", "posts": []},
        ])
    );
    assert_eq!(
        specs[1],
        FetchSpec::filtered(Operation::binary(
            BinaryOp::In,
            Operation::attribute("_id"),
            id_list(&["p1", "p3", "p2"]),
        ))
    );
}

#[tokio::test]
async fn test_field_in_empty_parent_list_matches_nothing() {
    let readings = filter(everything(), eq(attr("_id"), string("r3")));
    let (result, specs) = run_recorded(wanted_posts(readings), topics_and_posts()).await;
    assert_eq!(result, json!([{"_id": "r3", "posts": []}]));
    assert_eq!(specs[1], FetchSpec::filtered(Operation::literal(false)));
}

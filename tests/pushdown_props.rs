// Property tests: whatever a fetcher pushes down, a query must return what
// a plain full scan returns.

mod support;

use futures::executor::block_on;
use proptest::prelude::*;
use serde_json::{Map, Value as Json, json};
use support::*;
use vellum::Node;

fn document() -> impl Strategy<Value = (Option<i64>, Option<&'static str>, Option<bool>)> {
    (
        proptest::option::of(0i64..5),
        proptest::option::of(prop_oneof![Just("a"), Just("b"), Just("c")]),
        proptest::option::of(any::<bool>()),
    )
}

fn documents() -> impl Strategy<Value = Vec<Json>> {
    proptest::collection::vec(document(), 0..12).prop_map(|fields| {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, (n, s, flag))| {
                let mut document = Map::new();
                document.insert("_id".to_string(), json!(format!("d{i}")));
                if let Some(n) = n {
                    document.insert("n".to_string(), json!(n));
                }
                if let Some(s) = s {
                    document.insert("s".to_string(), json!(s));
                }
                if let Some(flag) = flag {
                    document.insert("flag".to_string(), json!(flag));
                }
                Json::Object(document)
            })
            .collect()
    })
}

fn constraint() -> impl Strategy<Value = Option<Node>> {
    prop_oneof![
        Just(None),
        (0i64..5).prop_map(|k| Some(eq(attr("n"), int(k)))),
        (0i64..5).prop_map(|k| Some(gt(attr("n"), int(k)))),
        Just(Some(eq(attr("s"), string("a")))),
        Just(Some(neq(attr("s"), string("a")))),
        Just(Some(not(eq(attr("s"), string("a"))))),
        Just(Some(eq(attr("s"), null()))),
        Just(Some(attr("flag"))),
        Just(Some(not(attr("flag")))),
        Just(Some(is_in(attr("n"), array(vec![int(1), int(3)])))),
        Just(Some(call("defined", vec![attr("s")]))),
        Just(Some(or(eq(attr("s"), string("b")), lt(attr("n"), int(2))))),
        Just(Some(and(attr("flag"), gt(attr("n"), int(1))))),
    ]
}

fn ordering() -> impl Strategy<Value = Vec<Node>> {
    prop_oneof![
        Just(vec![]),
        Just(vec![asc(attr("n"))]),
        Just(vec![desc(attr("n"))]),
        Just(vec![attr("s"), desc(attr("n"))]),
        Just(vec![desc(call("count", vec![attr("s")]))]),
    ]
}

#[derive(Debug, Clone)]
enum Window {
    None,
    Index(i64),
    Slice(i64, i64),
}

fn window() -> impl Strategy<Value = Window> {
    prop_oneof![
        Just(Window::None),
        (-2i64..8).prop_map(Window::Index),
        (0i64..6, 0i64..6).prop_map(|(a, b)| Window::Slice(a.min(b), a.max(b))),
    ]
}

fn build(constraint: Option<Node>, terms: Vec<Node>, window: Window, nested: bool) -> Node {
    let mut tree = match constraint {
        Some(expression) => filter(everything(), expression),
        None => all(everything()),
    };
    if !terms.is_empty() {
        tree = order(tree, terms);
    }
    if nested {
        tree = slice(tree, 1, 8, false);
    }
    tree = match window {
        Window::None => tree,
        Window::Index(i) => index(tree, i),
        Window::Slice(a, b) => slice(tree, a, b, false),
    };
    project(tree, vec![attr("_id")])
}

proptest! {
    #[test]
    fn pushdown_matches_full_scan(
        documents in documents(),
        constraint in constraint(),
        terms in ordering(),
        window in window(),
        nested in any::<bool>(),
    ) {
        let tree = build(constraint, terms, window, nested);
        let expected = block_on(run(tree.clone(), &FullScan::new(documents.clone())));
        let pushed = block_on(run(tree.clone(), &collection(documents.clone())));
        let unsorted = block_on(run(tree, &unsorted_collection(documents)));
        prop_assert_eq!(&pushed, &expected);
        prop_assert_eq!(&unsorted, &expected);
    }

    #[test]
    fn three_valued_logic_laws(a in 0usize..3, b in 0usize..3) {
        let operand = |i: usize| match i {
            0 => boolean(true),
            1 => boolean(false),
            _ => null(),
        };
        let scan = FullScan::new(Vec::new());
        let value = |tree: Node| block_on(run(tree, &scan));

        // negation swaps the operators
        prop_assert_eq!(
            value(not(and(operand(a), operand(b)))),
            value(or(not(operand(a)), not(operand(b))))
        );
        prop_assert_eq!(
            value(not(or(operand(a), operand(b)))),
            value(and(not(operand(a)), not(operand(b))))
        );
        prop_assert_eq!(value(and(operand(a), operand(b))), value(and(operand(b), operand(a))));
        prop_assert_eq!(value(or(operand(a), operand(b))), value(or(operand(b), operand(a))));
        prop_assert_eq!(value(not(not(operand(a)))), value(operand(a)));
    }

    #[test]
    fn joins_match_brute_force(
        authors in proptest::collection::vec(0usize..4, 0..6),
        posts in proptest::collection::vec(proptest::option::of(0usize..5), 0..8),
    ) {
        let mut documents = Vec::new();
        for (i, author) in authors.iter().enumerate() {
            documents.push(json!({"_id": format!("a{i}"), "_type": "author", "group": author}));
        }
        for (i, author) in posts.iter().enumerate() {
            let mut post = json!({"_id": format!("p{i}"), "_type": "post"});
            if let Some(author) = author {
                post["author"] = json!({"_ref": format!("a{author}")});
            }
            documents.push(post);
        }

        let tree = project(
            of_type("post"),
            vec![attr("_id"), assign("group", dot(deref(attr("author")), attr("group")))],
        );
        let expected: Vec<Json> = posts
            .iter()
            .enumerate()
            .map(|(i, author)| match author.and_then(|a| authors.get(a)) {
                Some(group) => json!({"_id": format!("p{i}"), "group": group}),
                None => json!({"_id": format!("p{i}")}),
            })
            .collect();

        let pushed = block_on(run(tree.clone(), &collection(documents.clone())));
        let scanned = block_on(run(tree, &FullScan::new(documents)));
        prop_assert_eq!(&pushed, &Json::Array(expected));
        prop_assert_eq!(&scanned, &pushed);
    }

    #[test]
    fn sort_is_stable_for_equal_keys(keys in proptest::collection::vec(0i64..3, 0..10)) {
        let documents: Vec<Json> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| json!({"_id": i, "k": k}))
            .collect();
        let tree = project(order(everything(), vec![desc(attr("k"))]), vec![attr("_id")]);
        let result = block_on(run(tree, &FullScan::new(documents)));

        let mut expected: Vec<(i64, usize)> = keys.iter().copied().zip(0..).collect();
        expected.sort_by(|a, b| b.0.cmp(&a.0));
        let expected: Vec<Json> = expected.into_iter().map(|(_, i)| json!({"_id": i})).collect();
        prop_assert_eq!(result, Json::Array(expected));
    }
}

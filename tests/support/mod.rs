// Shared helpers for the integration tests: syntax tree builders in the
// shape the parser produces, and fetchers with known behavior.
#![allow(dead_code)]

use std::collections::HashMap;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{Value as Json, json};
use vellum::ast::{BinaryOperator, PostfixOperator, PrefixOperator};
use vellum::native::CollectionConfig;
use vellum::{
    FetchError, FetchResponse, FetchSpec, Fetcher, MemoryCollection, Node, QueryError,
    QueryOptions, query,
};

// ============================================================================
// Syntax tree builders
// ============================================================================

pub fn everything() -> Node {
    Node::Everything
}

pub fn attr(name: &str) -> Node {
    Node::attribute(name)
}

pub fn string(value: &str) -> Node {
    Node::string(value)
}

pub fn int(value: i64) -> Node {
    Node::Integer { value }
}

pub fn float(value: f64) -> Node {
    Node::Float { value }
}

pub fn boolean(value: bool) -> Node {
    Node::Bool { value }
}

pub fn null() -> Node {
    Node::Null
}

pub fn param(name: &str) -> Node {
    Node::Param {
        name: name.to_string(),
    }
}

pub fn parent() -> Node {
    Node::Parent
}

/// `^.name`
pub fn parent_attr(name: &str) -> Node {
    dot(parent(), attr(name))
}

pub fn pipe(lhs: Node, rhs: Node) -> Node {
    Node::pipe(lhs, rhs)
}

pub fn dot(lhs: Node, rhs: Node) -> Node {
    Node::DotOperator {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// `lhs[expression]`
pub fn filter(lhs: Node, expression: Node) -> Node {
    pipe(lhs, Node::constraint(expression))
}

/// `lhs[]`
pub fn all(lhs: Node) -> Node {
    pipe(lhs, Node::Constraint { expression: None })
}

/// `lhs[index]`
pub fn index(lhs: Node, index: i64) -> Node {
    pipe(
        lhs,
        Node::Subscript {
            value: Box::new(int(index)),
        },
    )
}

/// `lhs[start..end]`, or `lhs[start...end]` when exclusive
pub fn slice(lhs: Node, start: i64, end: i64, inclusive: bool) -> Node {
    pipe(
        lhs,
        Node::Subscript {
            value: Box::new(Node::Range {
                start: Box::new(int(start)),
                end: Box::new(int(end)),
                inclusive,
            }),
        },
    )
}

pub fn binary(operator: BinaryOperator, lhs: Node, rhs: Node) -> Node {
    Node::binary(operator, lhs, rhs)
}

pub fn eq(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Equals, lhs, rhs)
}

pub fn neq(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Neq, lhs, rhs)
}

pub fn gt(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Gt, lhs, rhs)
}

pub fn lt(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Lt, lhs, rhs)
}

pub fn and(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::And, lhs, rhs)
}

pub fn or(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Or, lhs, rhs)
}

pub fn is_in(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::In, lhs, rhs)
}

pub fn matches(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Match, lhs, rhs)
}

pub fn not(rhs: Node) -> Node {
    Node::PrefixOperator {
        operator: PrefixOperator::Not,
        rhs: Box::new(rhs),
    }
}

/// `lhs->`
pub fn deref(lhs: Node) -> Node {
    postfix(PostfixOperator::Arrow, lhs)
}

pub fn asc(lhs: Node) -> Node {
    postfix(PostfixOperator::Asc, lhs)
}

pub fn desc(lhs: Node) -> Node {
    postfix(PostfixOperator::Desc, lhs)
}

fn postfix(operator: PostfixOperator, lhs: Node) -> Node {
    Node::PostfixOperator {
        operator,
        lhs: Box::new(lhs),
    }
}

pub fn call(name: &str, arguments: Vec<Node>) -> Node {
    Node::FunctionCall {
        name: name.to_string(),
        arguments,
    }
}

/// `lhs | order(terms...)`
pub fn order(lhs: Node, terms: Vec<Node>) -> Node {
    pipe(lhs, call("order", terms))
}

pub fn object(expressions: Vec<Node>) -> Node {
    Node::Object { expressions }
}

/// `"name": value` inside an object expression
pub fn assign(name: &str, value: Node) -> Node {
    binary(BinaryOperator::Colon, string(name), value)
}

pub fn splat() -> Node {
    Node::Ellipsis
}

pub fn array(expressions: Vec<Node>) -> Node {
    Node::Array { expressions }
}

/// `lhs{members...}`
pub fn project(lhs: Node, members: Vec<Node>) -> Node {
    pipe(lhs, object(members))
}

// ============================================================================
// Fetchers
// ============================================================================

/// Ignores the fetch spec and returns every document.
pub struct FullScan {
    documents: Vec<Json>,
}

impl FullScan {
    pub fn new(documents: Vec<Json>) -> Self {
        FullScan { documents }
    }
}

impl Fetcher for FullScan {
    fn fetch<'a>(&'a self, _spec: &'a FetchSpec) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        let response = FetchResponse::new(self.documents.clone());
        futures::future::ready(Ok(response)).boxed()
    }
}

/// Remembers every fetch spec before handing it to the wrapped fetcher.
pub struct Recording<F> {
    inner: F,
    specs: Mutex<Vec<FetchSpec>>,
}

impl<F: Fetcher> Recording<F> {
    pub fn new(inner: F) -> Self {
        Recording {
            inner,
            specs: Mutex::new(Vec::new()),
        }
    }

    pub fn specs(&self) -> Vec<FetchSpec> {
        self.specs.lock().clone()
    }
}

impl<F: Fetcher> Fetcher for Recording<F> {
    fn fetch<'a>(&'a self, spec: &'a FetchSpec) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        self.specs.lock().push(spec.clone());
        self.inner.fetch(spec)
    }
}

/// Fails every fetch.
pub struct Failing;

impl Fetcher for Failing {
    fn fetch<'a>(&'a self, _spec: &'a FetchSpec) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        futures::future::ready(Err(FetchError::message("store unavailable"))).boxed()
    }
}

pub fn collection(documents: Vec<Json>) -> MemoryCollection {
    MemoryCollection::with_documents(CollectionConfig::default(), documents).unwrap()
}

pub fn unsorted_collection(documents: Vec<Json>) -> MemoryCollection {
    MemoryCollection::with_documents(CollectionConfig { pushdown: false }, documents).unwrap()
}

// ============================================================================
// Running queries
// ============================================================================

pub async fn try_run(tree: Node, fetcher: &dyn Fetcher) -> Result<Json, QueryError> {
    query(&QueryOptions::new(tree), fetcher).await
}

pub async fn run(tree: Node, fetcher: &dyn Fetcher) -> Json {
    try_run(tree, fetcher).await.unwrap()
}

pub async fn run_with_params(tree: Node, params: Json, fetcher: &dyn Fetcher) -> Json {
    let params: HashMap<String, Json> = serde_json::from_value(params).unwrap();
    query(&QueryOptions::new(tree).with_params(params), fetcher)
        .await
        .unwrap()
}

/// Posts, authors and a book with an array of author references.
pub fn dataset() -> Vec<Json> {
    vec![
        json!({"_id": "p1", "_type": "post", "title": "Hello world", "rank": 2,
               "author": {"_ref": "a1"}, "published": true, "tags": ["rust", "db"]}),
        json!({"_id": "p2", "_type": "post", "title": "Second post", "rank": 1,
               "author": {"_ref": "a2"}, "published": false}),
        json!({"_id": "p3", "_type": "post", "title": "Later thoughts", "rank": 3,
               "author": {"_ref": "a1"}, "published": true}),
        json!({"_id": "drafts.p4", "_type": "post", "title": "Draft", "rank": 4,
               "author": {"_ref": "a2"}}),
        json!({"_id": "a1", "_type": "author", "name": "Ada"}),
        json!({"_id": "a2", "_type": "author", "name": "Brian"}),
        json!({"_id": "b1", "_type": "book", "title": "Collected",
               "authors": [{"_key": "k1", "_ref": "a2"}, {"_key": "k2", "_ref": "a1"},
                           {"_key": "k3", "_ref": "gone"}]}),
    ]
}

/// `*[_type == kind]`
pub fn of_type(kind: &str) -> Node {
    filter(everything(), eq(attr("_type"), string(kind)))
}

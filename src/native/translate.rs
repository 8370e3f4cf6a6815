use serde_json::{Map, json};
use tracing::debug;

use crate::error::TranslateError;
use crate::exec::{binary, match_value};
use crate::fetch::FetchSpec;
use crate::path::Path;
use crate::plan::{BinaryOp, Direction, Function, Operation, PathStep, SortTerm};
use crate::value::Value;

type Json = serde_json::Value;

/// A translated filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Decided without looking at any document
    Const(bool),
    /// A selector document. `exact` selectors match the same documents the
    /// executor keeps, others match a superset.
    Where { selector: Json, exact: bool },
    /// Not expressible: every document must be considered
    Unknown,
}

impl Clause {
    fn exact(selector: Json) -> Clause {
        Clause::Where {
            selector,
            exact: true,
        }
    }

    fn approximate(selector: Json) -> Clause {
        Clause::Where {
            selector,
            exact: false,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Clause::Const(_) | Clause::Where { exact: true, .. })
    }

    /// The selector to run, `None` when no document can match.
    pub fn into_selector(self) -> Option<Json> {
        match self {
            Clause::Const(false) => None,
            Clause::Const(true) | Clause::Unknown => Some(json!({})),
            Clause::Where { selector, .. } => Some(selector),
        }
    }

    fn and(self, other: Clause) -> Clause {
        match (self, other) {
            (Clause::Const(false), _) | (_, Clause::Const(false)) => Clause::Const(false),
            (Clause::Const(true), other) | (other, Clause::Const(true)) => other,
            (Clause::Unknown, Clause::Unknown) => Clause::Unknown,
            (Clause::Unknown, Clause::Where { selector, .. })
            | (Clause::Where { selector, .. }, Clause::Unknown) => Clause::approximate(selector),
            (
                Clause::Where {
                    selector: a,
                    exact: exact_a,
                },
                Clause::Where {
                    selector: b,
                    exact: exact_b,
                },
            ) => Clause::Where {
                selector: json!({ "$and": [a, b] }),
                exact: exact_a && exact_b,
            },
        }
    }

    fn or(self, other: Clause) -> Clause {
        match (self, other) {
            (Clause::Const(true), _) | (_, Clause::Const(true)) => Clause::Const(true),
            (Clause::Const(false), other) | (other, Clause::Const(false)) => other,
            (Clause::Unknown, _) | (_, Clause::Unknown) => Clause::Unknown,
            (
                Clause::Where {
                    selector: a,
                    exact: exact_a,
                },
                Clause::Where {
                    selector: b,
                    exact: exact_b,
                },
            ) => Clause::Where {
                selector: json!({ "$or": [a, b] }),
                exact: exact_a && exact_b,
            },
        }
    }

    // `not` of an unknown operand is unknown to the executor, but `$nor`
    // matches it, so a negated selector is never exact.
    fn not(self) -> Clause {
        match self {
            Clause::Const(b) => Clause::Const(!b),
            Clause::Where {
                selector,
                exact: true,
            } => Clause::approximate(json!({ "$nor": [selector] })),
            Clause::Where { exact: false, .. } | Clause::Unknown => Clause::Unknown,
        }
    }
}

/// What a query against the document store looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeQuery {
    /// `None` when the filter can never match
    pub selector: Option<Json>,
    pub exact: bool,
    /// `(field, 1)` ascending, `(field, -1)` descending
    pub sort: Vec<(String, i32)>,
    /// Every ordering term could be expressed as a sort pair
    pub sortable: bool,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Translate a fetch spec into a store query.
pub fn to_native_query(spec: &FetchSpec) -> Result<NativeQuery, TranslateError> {
    let clause = match &spec.filter {
        Some(filter) => to_selector(filter)?,
        None => Clause::Const(true),
    };
    let sort: Vec<Option<(String, i32)>> = spec.ordering.iter().map(sort_pair).collect();
    let sortable = sort.iter().all(Option::is_some);
    let offset = spec.start.unwrap_or(0).max(0);
    let limit = spec.end.map(|end| (end - offset).max(0) as usize);
    let query = NativeQuery {
        exact: clause.is_exact(),
        selector: clause.into_selector(),
        sort: sort.into_iter().flatten().collect(),
        sortable,
        offset: offset as usize,
        limit,
    };
    debug!(?query, "translated fetch spec");
    Ok(query)
}

fn sort_pair(term: &SortTerm) -> Option<(String, i32)> {
    let field = field_name(&term.expression)?;
    let direction = match term.direction {
        Direction::Asc => 1,
        Direction::Desc => -1,
    };
    Some((field, direction))
}

/// Translate a filter expression.
pub fn to_selector(filter: &Operation) -> Result<Clause, TranslateError> {
    match filter {
        Operation::Filter { filter } => to_selector(filter),
        Operation::Binary { operator, lhs, rhs } => match operator {
            BinaryOp::And => Ok(to_selector(lhs)?.and(to_selector(rhs)?)),
            BinaryOp::Or => Ok(to_selector(lhs)?.or(to_selector(rhs)?)),
            BinaryOp::In => Ok(membership(lhs, rhs)),
            BinaryOp::Match => Ok(full_text(lhs, rhs)),
            comparison => Ok(compare(*comparison, lhs, rhs)),
        },
        Operation::Not { rhs } => Ok(to_selector(rhs)?.not()),
        Operation::Accessor { .. } => Ok(match field_name(filter) {
            Some(field) => Clause::approximate(json!({ field: true })),
            None => Clause::Unknown,
        }),
        Operation::Literal { value } => Ok(known(value.clone())),
        Operation::Object { .. } | Operation::Array { .. } => Ok(Clause::Unknown),
        Operation::FunctionCall {
            function,
            arguments,
        } => Ok(function_call(*function, arguments)),
        Operation::Pipe(_) => Ok(Clause::Unknown),
        other => Err(TranslateError::Unsupported(other.kind())),
    }
}

enum Operand {
    Field(String),
    Value(Value),
    Other,
}

fn operand(operation: &Operation) -> Operand {
    if let Some(field) = field_name(operation) {
        return Operand::Field(field);
    }
    match literal_value(operation) {
        Some(value) => Operand::Value(value),
        None => Operand::Other,
    }
}

/// Dotted field name of an accessor made of attributes only.
fn field_name(operation: &Operation) -> Option<String> {
    let Operation::Accessor { path } = operation else {
        return None;
    };
    let names = path
        .iter()
        .map(|step| match step {
            PathStep::Attribute { name } => Some(name.as_str()),
            PathStep::Parent => None,
        })
        .collect::<Option<Vec<_>>>()?;
    (!names.is_empty()).then(|| names.join("."))
}

fn literal_value(operation: &Operation) -> Option<Value> {
    match operation {
        Operation::Literal { value } => Some(value.clone()),
        Operation::Array { operations } => operations
            .iter()
            .map(literal_value)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        _ => None,
    }
}

fn operator_name(operator: BinaryOp) -> &'static str {
    match operator {
        BinaryOp::Eq => "$eq",
        BinaryOp::Neq => "$ne",
        BinaryOp::Lt => "$lt",
        BinaryOp::Lte => "$lte",
        BinaryOp::Gt => "$gt",
        BinaryOp::Gte => "$gte",
        BinaryOp::In => "$in",
        BinaryOp::And | BinaryOp::Or | BinaryOp::Match => "",
    }
}

/// A constant truth value. Anything but a boolean stays unknown, since
/// negating it must not turn it into `true`.
fn known(value: Value) -> Clause {
    match value {
        Value::Boolean(b) => Clause::Const(b),
        _ => Clause::Unknown,
    }
}

fn decided(operator: BinaryOp, lhs: &Value, rhs: &Value) -> Clause {
    binary(operator, lhs, rhs).map_or(Clause::Unknown, known)
}

/// `field` holds a value of some type other than `kind`.
fn other_than(field: &str, kind: &str) -> Json {
    json!({ field: { "$exists": true, "$not": { "$type": kind } } })
}

fn compare(operator: BinaryOp, lhs: &Operation, rhs: &Operation) -> Clause {
    let (field, value, operator) = match (operand(lhs), operand(rhs)) {
        (Operand::Value(a), Operand::Value(b)) => return decided(operator, &a, &b),
        (Operand::Field(a), Operand::Field(b)) => {
            let mut expression = Map::new();
            expression.insert(
                operator_name(operator).to_string(),
                json!([format!("${a}"), format!("${b}")]),
            );
            return Clause::exact(json!({ "$expr": expression }));
        }
        (Operand::Field(field), Operand::Value(value)) => (field, value, operator),
        (Operand::Value(value), Operand::Field(field)) => (field, value, operator.mirrored()),
        _ => return Clause::Unknown,
    };
    let value = Json::from(value);
    let condition = match operator {
        BinaryOp::Eq if !value.is_object() => value,
        _ => {
            let mut condition = Map::new();
            condition.insert(operator_name(operator).to_string(), value);
            Json::Object(condition)
        }
    };
    Clause::exact(json!({ field: condition }))
}

fn membership(lhs: &Operation, rhs: &Operation) -> Clause {
    if let Operation::FunctionCall {
        function: Function::Path,
        arguments,
    } = rhs
        && let [Operation::Literal {
            value: Value::String(pattern),
        }] = arguments.as_slice()
    {
        return match operand(lhs) {
            // non-string fields are kept for the executor to reject
            Operand::Field(field) => Clause::approximate(match path_regex(pattern) {
                Some(regex) => json!({
                    "$or": [{ field.clone(): { "$regex": regex } }, other_than(&field, "string")]
                }),
                None => other_than(&field, "string"),
            }),
            Operand::Value(Value::String(candidate)) => {
                Clause::Const(Path::parse(pattern).contains(&Path::parse(&candidate)))
            }
            _ => Clause::Unknown,
        };
    }
    match (operand(lhs), operand(rhs)) {
        (Operand::Value(a), Operand::Value(b)) => decided(BinaryOp::In, &a, &b),
        (Operand::Field(field), Operand::Value(Value::Array(items))) => {
            let items: Vec<Json> = items.into_iter().map(Json::from).collect();
            Clause::exact(json!({ field: { "$in": items } }))
        }
        (Operand::Value(Value::Null), Operand::Field(_)) => Clause::Unknown,
        // a field holding anything but an array is an error for the executor
        (Operand::Value(value), Operand::Field(field)) => Clause::approximate(json!({
            "$or": [
                { field.clone(): { "$elemMatch": { "$eq": Json::from(value) } } },
                other_than(&field, "array"),
            ]
        })),
        (Operand::Field(a), Operand::Field(b)) => Clause::approximate(json!({
            "$or": [
                { "$expr": { "$in": [format!("${a}"), format!("${b}")] } },
                other_than(&b, "array"),
            ]
        })),
        _ => Clause::Unknown,
    }
}

/// Anchored regex matching the strings a path pattern contains, or `None`
/// when the pattern has no wildcard and so contains nothing.
fn path_regex(pattern: &str) -> Option<String> {
    let mut regex = String::from("^");
    for segment in pattern.split('.') {
        match segment {
            "**" => return Some(regex),
            "*" => {
                regex.push_str("[^.]*$");
                return Some(regex);
            }
            literal => {
                regex.push_str(&regex::escape(literal));
                regex.push_str(r"\.");
            }
        }
    }
    None
}

fn match_pattern(term: &str) -> String {
    let mut pattern = regex::escape(term.trim()).replace(r"\*", ".*?");
    while pattern.contains(".*?.*?") {
        pattern = pattern.replace(".*?.*?", ".*?");
    }
    pattern
}

// Token matching cannot be expressed as a regex, so these only narrow.
fn full_text(lhs: &Operation, rhs: &Operation) -> Clause {
    let terms = match literal_value(rhs) {
        Some(Value::String(term)) => vec![term],
        Some(Value::Array(items)) => match items
            .into_iter()
            .map(|item| match item {
                Value::String(term) => Some(term),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
        {
            Some(terms) if !terms.is_empty() => terms,
            _ => return Clause::Unknown,
        },
        _ => return Clause::Unknown,
    };
    let fields = match (lhs, operand(lhs)) {
        (_, Operand::Field(field)) => vec![field],
        (_, Operand::Value(candidate)) => {
            let terms: Vec<Value> = terms.into_iter().map(Value::String).collect();
            return known(match_value(&candidate, &terms));
        }
        (Operation::Array { operations }, Operand::Other) => {
            match operations.iter().map(field_name).collect::<Option<Vec<_>>>() {
                Some(fields) if !fields.is_empty() => fields,
                _ => return Clause::Unknown,
            }
        }
        _ => return Clause::Unknown,
    };
    let per_field: Vec<Json> = fields
        .iter()
        .map(|field| {
            let conditions: Vec<Json> = terms
                .iter()
                .map(|term| json!({ field: { "$regex": match_pattern(term), "$options": "i" } }))
                .collect();
            json!({ "$and": conditions })
        })
        .collect();
    match <[Json; 1]>::try_from(per_field) {
        Ok([single]) => Clause::approximate(single),
        Err(many) => Clause::approximate(json!({ "$or": many })),
    }
}

fn function_call(function: Function, arguments: &[Operation]) -> Clause {
    match function {
        Function::Defined => match arguments.first().and_then(field_name) {
            Some(field) => Clause::approximate(json!({
                field: { "$exists": true, "$not": { "$size": 0 } }
            })),
            None => Clause::Unknown,
        },
        Function::References => {
            let mut ids = Vec::new();
            for argument in arguments {
                match literal_value(argument) {
                    Some(Value::String(id)) => ids.push(id),
                    Some(Value::Array(items)) => {
                        ids.extend(items.into_iter().filter_map(|item| match item {
                            Value::String(id) => Some(id),
                            _ => None,
                        }))
                    }
                    Some(_) => {}
                    None => return Clause::Unknown,
                }
            }
            if ids.is_empty() {
                return Clause::Const(false);
            }
            let alternatives: Vec<Json> = ids
                .into_iter()
                .map(|id| json!({ "@refs": { "$elemMatch": { "id": id } } }))
                .collect();
            Clause::exact(json!({ "$or": alternatives }))
        }
        Function::Coalesce
        | Function::Path
        | Function::JoinPaths
        | Function::Count
        | Function::Length => Clause::Unknown,
    }
}

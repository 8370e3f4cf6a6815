//! Evaluation of selector documents against stored documents.
//!
//! Field paths are dotted and walk objects only. Comparisons are evaluated
//! by the executor's own operators and hold only when those yield `true`,
//! so a selector produced from an exact clause keeps exactly the documents
//! the executor would keep. `$regex` alone also looks inside arrays.

use regex::RegexBuilder;

use crate::error::TranslateError;
use crate::exec::binary;
use crate::plan::BinaryOp;
use crate::value::Value;

type Json = serde_json::Value;

/// Check whether `document` matches `selector`.
pub fn matches(selector: &Json, document: &Json) -> Result<bool, TranslateError> {
    let Json::Object(clauses) = selector else {
        return Err(TranslateError::InvalidSelector(format!(
            "selector must be an object, got {selector}"
        )));
    };
    for (key, condition) in clauses {
        let matched = match key.as_str() {
            "$and" => all(condition, document)?,
            "$or" => any(condition, document)?,
            "$nor" => !any(condition, document)?,
            "$expr" => expression(condition, document)?,
            field => field_matches(lookup(document, field), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn selectors(list: &Json) -> Result<&Vec<Json>, TranslateError> {
    list.as_array()
        .ok_or_else(|| TranslateError::InvalidSelector(format!("expected an array, got {list}")))
}

fn all(list: &Json, document: &Json) -> Result<bool, TranslateError> {
    for selector in selectors(list)? {
        if !matches(selector, document)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any(list: &Json, document: &Json) -> Result<bool, TranslateError> {
    for selector in selectors(list)? {
        if matches(selector, document)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Resolve a dotted path. `None` when a step is missing.
pub fn lookup<'a>(document: &'a Json, path: &str) -> Option<&'a Json> {
    path.split('.')
        .try_fold(document, |current, name| current.as_object()?.get(name))
}

fn is_operator_document(condition: &Json) -> bool {
    condition
        .as_object()
        .is_some_and(|fields| !fields.is_empty() && fields.keys().all(|k| k.starts_with('$')))
}

fn field_matches(value: Option<&Json>, condition: &Json) -> Result<bool, TranslateError> {
    if !is_operator_document(condition) {
        return Ok(holds(BinaryOp::Eq, value, condition));
    }
    let Json::Object(operators) = condition else {
        return Ok(false);
    };
    for (operator, operand) in operators {
        let matched = match operator.as_str() {
            "$eq" => holds(BinaryOp::Eq, value, operand),
            "$ne" => holds(BinaryOp::Neq, value, operand),
            "$gt" => holds(BinaryOp::Gt, value, operand),
            "$gte" => holds(BinaryOp::Gte, value, operand),
            "$lt" => holds(BinaryOp::Lt, value, operand),
            "$lte" => holds(BinaryOp::Lte, value, operand),
            "$in" => selectors(operand)?
                .iter()
                .any(|candidate| holds(BinaryOp::Eq, value, candidate)),
            "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
            "$size" => match (value, operand.as_u64()) {
                (Some(Json::Array(items)), Some(size)) => items.len() as u64 == size,
                _ => false,
            },
            "$type" => type_matches(value, operand)?,
            "$regex" => regex_matches(value, operand, operators.get("$options"))?,
            "$options" => true,
            "$not" => !field_matches(value, operand)?,
            "$elemMatch" => match value {
                Some(Json::Array(items)) => {
                    let mut found = false;
                    for item in items {
                        let matched = if is_operator_document(operand) {
                            field_matches(Some(item), operand)?
                        } else {
                            item.is_object() && matches(operand, item)?
                        };
                        if matched {
                            found = true;
                            break;
                        }
                    }
                    found
                }
                _ => false,
            },
            other => {
                return Err(TranslateError::InvalidSelector(format!(
                    "unknown operator {other}"
                )));
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn to_value(value: Option<&Json>) -> Value {
    value.cloned().map(Value::from).unwrap_or_default()
}

/// Whether the executor's `value <operator> operand` is exactly true.
fn holds(operator: BinaryOp, value: Option<&Json>, operand: &Json) -> bool {
    evaluates_true(operator, &to_value(value), &Value::from(operand.clone()))
}

fn evaluates_true(operator: BinaryOp, lhs: &Value, rhs: &Value) -> bool {
    matches!(binary(operator, lhs, rhs), Ok(Value::Boolean(true)))
}

fn type_matches(value: Option<&Json>, expected: &Json) -> Result<bool, TranslateError> {
    let Some(value) = value else {
        return Ok(false);
    };
    Ok(match expected.as_str() {
        Some("array") => value.is_array(),
        Some("object") => value.is_object(),
        Some("string") => value.is_string(),
        Some("number") => value.is_number(),
        Some("bool") => value.is_boolean(),
        Some("null") => value.is_null(),
        _ => {
            return Err(TranslateError::InvalidSelector(format!(
                "unknown $type {expected}"
            )));
        }
    })
}

fn regex_matches(
    value: Option<&Json>,
    pattern: &Json,
    options: Option<&Json>,
) -> Result<bool, TranslateError> {
    let Some(pattern) = pattern.as_str() else {
        return Err(TranslateError::InvalidSelector(format!(
            "$regex must be a string, got {pattern}"
        )));
    };
    let case_insensitive = options
        .and_then(Json::as_str)
        .is_some_and(|options| options.contains('i'));
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()?;
    // an array matches when any of its strings does
    Ok(match value {
        Some(Json::String(text)) => regex.is_match(text),
        Some(Json::Array(items)) => items
            .iter()
            .filter_map(Json::as_str)
            .any(|text| regex.is_match(text)),
        _ => false,
    })
}

fn expression(condition: &Json, document: &Json) -> Result<bool, TranslateError> {
    let invalid = || TranslateError::InvalidSelector(format!("unsupported $expr {condition}"));
    let Some((operator, operands)) = condition.as_object().and_then(|fields| {
        let mut iter = fields.iter();
        match (iter.next(), iter.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }) else {
        return Err(invalid());
    };
    let [lhs, rhs] = selectors(operands)?.as_slice() else {
        return Err(invalid());
    };
    let resolve = |operand: &Json| match operand.as_str().and_then(|s| s.strip_prefix('$')) {
        Some(field) => to_value(lookup(document, field)),
        None => Value::from(operand.clone()),
    };
    let operator = match operator.as_str() {
        "$eq" => BinaryOp::Eq,
        "$ne" => BinaryOp::Neq,
        "$gt" => BinaryOp::Gt,
        "$gte" => BinaryOp::Gte,
        "$lt" => BinaryOp::Lt,
        "$lte" => BinaryOp::Lte,
        "$in" => BinaryOp::In,
        _ => return Err(invalid()),
    };
    let (a, b) = (resolve(lhs), resolve(rhs));
    // a type error in the executor is a non-match here
    Ok(evaluates_true(operator, &a, &b))
}

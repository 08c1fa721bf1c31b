//! Rule-expression evaluator.
//!
//! Evaluates the JSON-shaped boolean expressions carried by event conditions:
//! operator objects like `{"==": [{"var": "flag"}, true]}` against a flat map
//! of named variable bindings. The operator set is closed; anything outside
//! it is rejected, at load time via [`validate`] and at runtime as a
//! [`RuleError`] the condition evaluator converts to a fail-closed false.

use serde_json::{Map, Value};

use crate::error::RuleError;

/// Operators understood by the evaluator.
const OPERATORS: &[&str] = &[
    "var", "==", "===", "!=", "!==", ">", ">=", "<", "<=", "and", "or", "!", "!!", "in",
];

/// Evaluate an expression against variable bindings. Literals evaluate to
/// themselves; arrays evaluate element-wise; a single-key object is an
/// operator application.
pub fn eval(expr: &Value, bindings: &Map<String, Value>) -> Result<Value, RuleError> {
    match expr {
        Value::Object(map) => {
            if map.len() != 1 {
                return Err(RuleError::NotAnOperator(map.len()));
            }
            let (op, args) = map.iter().next().expect("len checked above");
            apply(op, args, bindings)
        }
        Value::Array(items) => {
            let evaluated = items
                .iter()
                .map(|item| eval(item, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(evaluated))
        }
        literal => Ok(literal.clone()),
    }
}

/// Evaluate an expression to a boolean using JS truthiness.
pub fn eval_truthy(expr: &Value, bindings: &Map<String, Value>) -> Result<bool, RuleError> {
    Ok(truthy(&eval(expr, bindings)?))
}

/// Structurally validate an expression: every operator known, operand counts
/// plausible. Used at document load so malformed rules are rejected before a
/// session activates.
pub fn validate(expr: &Value) -> Result<(), RuleError> {
    match expr {
        Value::Object(map) => {
            if map.len() != 1 {
                return Err(RuleError::NotAnOperator(map.len()));
            }
            let (op, args) = map.iter().next().expect("len checked above");
            if !OPERATORS.contains(&op.as_str()) {
                return Err(RuleError::UnknownOperator(op.clone()));
            }
            match op.as_str() {
                "var" => match args {
                    Value::String(_) => Ok(()),
                    Value::Array(items) if matches!(items.len(), 1 | 2) => Ok(()),
                    other => Err(RuleError::Arity {
                        op: op.clone(),
                        expected: "a path string or [path, default]".into(),
                        got: operand_count(other),
                    }),
                },
                "!" | "!!" => {
                    validate_operands(op, args, 1)?;
                    validate_children(args)
                }
                "and" | "or" => {
                    let Value::Array(items) = args else {
                        return Err(RuleError::Arity {
                            op: op.clone(),
                            expected: "at least 1".into(),
                            got: operand_count(args),
                        });
                    };
                    if items.is_empty() {
                        return Err(RuleError::Arity {
                            op: op.clone(),
                            expected: "at least 1".into(),
                            got: 0,
                        });
                    }
                    validate_children(args)
                }
                _ => {
                    validate_operands(op, args, 2)?;
                    validate_children(args)
                }
            }
        }
        Value::Array(items) => items.iter().try_for_each(validate),
        _ => Ok(()),
    }
}

fn validate_operands(op: &str, args: &Value, expected: usize) -> Result<(), RuleError> {
    let got = operand_count(args);
    if got == expected {
        Ok(())
    } else {
        Err(RuleError::Arity {
            op: op.to_string(),
            expected: expected.to_string(),
            got,
        })
    }
}

fn validate_children(args: &Value) -> Result<(), RuleError> {
    match args {
        Value::Array(items) => items.iter().try_for_each(validate),
        other => validate(other),
    }
}

fn operand_count(args: &Value) -> usize {
    match args {
        Value::Array(items) => items.len(),
        _ => 1,
    }
}

fn apply(op: &str, args: &Value, bindings: &Map<String, Value>) -> Result<Value, RuleError> {
    match op {
        "var" => lookup_var(args, bindings),
        "!" => {
            let v = eval(unary_operand(args), bindings)?;
            Ok(Value::Bool(!truthy(&v)))
        }
        "!!" => {
            let v = eval(unary_operand(args), bindings)?;
            Ok(Value::Bool(truthy(&v)))
        }
        "and" => {
            let operands = operand_list(op, args)?;
            let mut last = Value::Bool(true);
            for operand in operands {
                last = eval(operand, bindings)?;
                if !truthy(&last) {
                    return Ok(last);
                }
            }
            Ok(last)
        }
        "or" => {
            let operands = operand_list(op, args)?;
            let mut last = Value::Bool(false);
            for operand in operands {
                last = eval(operand, bindings)?;
                if truthy(&last) {
                    return Ok(last);
                }
            }
            Ok(last)
        }
        "==" | "===" | "!=" | "!==" | ">" | ">=" | "<" | "<=" | "in" => {
            let operands = operand_list(op, args)?;
            if operands.len() != 2 {
                return Err(RuleError::Arity {
                    op: op.to_string(),
                    expected: "2".into(),
                    got: operands.len(),
                });
            }
            let left = eval(&operands[0], bindings)?;
            let right = eval(&operands[1], bindings)?;
            let result = match op {
                "==" => loose_eq(&left, &right),
                "===" => left == right,
                "!=" => !loose_eq(&left, &right),
                "!==" => left != right,
                ">" => compare(&left, &right).is_some_and(|o| o == std::cmp::Ordering::Greater),
                ">=" => compare(&left, &right).is_some_and(|o| o != std::cmp::Ordering::Less),
                "<" => compare(&left, &right).is_some_and(|o| o == std::cmp::Ordering::Less),
                "<=" => compare(&left, &right).is_some_and(|o| o != std::cmp::Ordering::Greater),
                "in" => contains(&right, &left),
                _ => unreachable!("op matched above"),
            };
            Ok(Value::Bool(result))
        }
        other => Err(RuleError::UnknownOperator(other.to_string())),
    }
}

fn unary_operand(args: &Value) -> &Value {
    match args {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

fn operand_list<'a>(op: &str, args: &'a Value) -> Result<&'a [Value], RuleError> {
    match args {
        Value::Array(items) if !items.is_empty() => Ok(items),
        other => Err(RuleError::Arity {
            op: op.to_string(),
            expected: "a non-empty operand array".into(),
            got: operand_count(other),
        }),
    }
}

fn lookup_var(args: &Value, bindings: &Map<String, Value>) -> Result<Value, RuleError> {
    let (path, default) = match args {
        Value::String(path) => (path.as_str(), None),
        Value::Array(items) => match items.as_slice() {
            [Value::String(path)] => (path.as_str(), None),
            [Value::String(path), default] => (path.as_str(), Some(default)),
            _ => {
                return Err(RuleError::Arity {
                    op: "var".into(),
                    expected: "a path string or [path, default]".into(),
                    got: items.len(),
                });
            }
        },
        other => {
            return Err(RuleError::Arity {
                op: "var".into(),
                expected: "a path string or [path, default]".into(),
                got: operand_count(other),
            });
        }
    };

    let mut segments = path.split('.');
    let mut current = segments
        .next()
        .and_then(|first| bindings.get(first));
    for segment in segments {
        current = current.and_then(|v| v.as_object()).and_then(|o| o.get(segment));
    }
    Ok(current
        .cloned()
        .or_else(|| default.cloned())
        .unwrap_or(Value::Null))
}

/// JS truthiness: false, null, 0, "" and [] are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Loose equality: strict first, then numeric coercion across
/// number/string/bool. null equals only null.
fn loose_eq(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => false,
        _ => match (as_number(left), as_number(right)) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        },
    }
}

fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return l.partial_cmp(&r);
    }
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.contains(needle),
        Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        _ => false,
    }
}

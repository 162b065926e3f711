//! Native builtins
//!
//! Handlers follow the call convention: at entry the receiver sits on
//! top of the stack (depth 0) and arguments below it in order, so the
//! first argument is at depth 1. A handler pushes its result and returns
//! how many results it produced (0 or 1); the call opcode rearranges the
//! stack afterwards.

use crate::machine::Machine;
use crate::ops::less_than;
use crate::value::{Array, Function, Object, RuntimeError, Value, ValueKind};
use std::cell::RefCell;
use std::rc::Rc;

/// Install the global builtins on a machine's global object.
pub(crate) fn install(global: &Rc<RefCell<Object>>) {
    let mut g = global.borrow_mut();
    g.insert("toString", Value::Function(Function::new("toString", to_string)));
    g.insert("toBoolean", Value::Function(Function::new("toBoolean", to_boolean)));
    g.insert("toNumber", Value::Function(Function::new("toNumber", to_number)));
    g.insert("toJSON", Value::Function(Function::new("toJSON", to_json)));
    g.insert("timeUTC", Value::Function(Function::new("timeUTC", time_utc)));
    g.insert(
        "matchRegexp",
        Value::Function(Function::new("matchRegexp", match_regexp)),
    );
    g.insert("select", Value::Function(Function::new("select", select)));
}

fn to_string(m: &mut Machine, _argc: usize) -> Result<usize, RuntimeError> {
    let arg = m.peek(1)?.clone();
    m.push(Value::Str(arg.to_string()));
    Ok(1)
}

fn to_boolean(m: &mut Machine, _argc: usize) -> Result<usize, RuntimeError> {
    let arg = m.peek(1)?.clone();
    m.push(Value::Boolean(arg.to_boolean()));
    Ok(1)
}

fn to_number(m: &mut Machine, _argc: usize) -> Result<usize, RuntimeError> {
    let arg = m.peek(1)?.clone();
    m.push(Value::Number(arg.to_number()));
    Ok(1)
}

fn to_json(m: &mut Machine, _argc: usize) -> Result<usize, RuntimeError> {
    let arg = m.peek(1)?.clone();
    m.push(Value::Str(arg.to_json()));
    Ok(1)
}

/// `timeUTC("now")` is the current UTC unix time; any other string is
/// parsed as RFC 3339 and converted to unix seconds.
fn time_utc(m: &mut Machine, _argc: usize) -> Result<usize, RuntimeError> {
    let arg = m.peek(1)?.clone();
    let Value::Str(ts) = arg else {
        return Err(RuntimeError::MissingTimeExpression);
    };
    if ts == "now" {
        let now = chrono::Utc::now().timestamp();
        m.push(Value::Number(now as f64));
        return Ok(1);
    }
    let parsed = chrono::DateTime::parse_from_rfc3339(&ts)
        .map_err(|e| RuntimeError::BadTimeFormat(e.to_string()))?;
    m.push(Value::Number(parsed.timestamp() as f64));
    Ok(1)
}

/// `matchRegexp(pattern, subject)`: subject is a string (does it match)
/// or an array of strings (does every string element match, early-exit
/// on the first non-match; non-string elements are skipped).
fn match_regexp(m: &mut Machine, _argc: usize) -> Result<usize, RuntimeError> {
    let pattern = m.peek(1)?.clone();
    let subject = m.peek(2)?.clone();

    let Value::Str(pattern) = pattern else {
        m.push(Value::Null);
        return Ok(1);
    };

    let re = regex::Regex::new(&pattern).map_err(|e| RuntimeError::BadRegex(e.to_string()))?;

    match subject {
        Value::Str(s) => {
            m.push(Value::Boolean(re.is_match(&s)));
        }
        Value::Array(array) => {
            let array = array.borrow();
            let mut matched = false;
            for i in 0..array.len() {
                if let Value::Str(s) = array.get_index(i) {
                    matched = re.is_match(&s);
                    if !matched {
                        break;
                    }
                }
            }
            m.push(Value::Boolean(matched));
        }
        _ => return Err(RuntimeError::BadRegexSubject),
    }
    Ok(1)
}

/// `select(key, rows)`: project one property out of an array of objects,
/// as strings, preserving position; unreadable entries contribute `""`.
fn select(m: &mut Machine, _argc: usize) -> Result<usize, RuntimeError> {
    let key = m.peek(1)?.clone();
    let subject = m.peek(2)?.clone();

    let (Value::Str(key), Value::Array(array)) = (&key, &subject) else {
        return Err(RuntimeError::BadSelectArguments {
            key: key.kind(),
            subject: subject.kind(),
        });
    };

    let result = Array::new();
    {
        let array = array.borrow();
        let mut result = result.borrow_mut();
        for i in 0..array.len() {
            match array.get_index(i).get_property(key) {
                Ok(v) => result.push(Value::Str(v.to_string())),
                Err(_) => result.push(Value::Str(String::new())),
            }
        }
    }
    m.push(Value::Array(result));
    Ok(1)
}

/// `array.min()`: smallest non-null element by the engine ordering rule,
/// or null for an empty or all-null array.
pub(crate) fn array_min(m: &mut Machine, _argc: usize) -> Result<usize, RuntimeError> {
    array_extremum(m, |candidate, best| less_than(candidate, best))
}

/// `array.max()`: mirror of `min`.
pub(crate) fn array_max(m: &mut Machine, _argc: usize) -> Result<usize, RuntimeError> {
    array_extremum(m, |candidate, best| !less_than(candidate, best))
}

fn array_extremum(
    m: &mut Machine,
    replaces: fn(&Value, &Value) -> bool,
) -> Result<usize, RuntimeError> {
    let receiver = m.peek(0)?.clone();
    let Value::Array(array) = receiver else {
        return Err(RuntimeError::ArrayMethodOnNonArray);
    };

    let mut best = Value::Null;
    {
        let array = array.borrow();
        for i in 0..array.len() {
            let candidate = array.get_index(i);
            if candidate.kind() == ValueKind::Null {
                continue;
            }
            if best.kind() == ValueKind::Null || replaces(&candidate, &best) {
                best = candidate;
            }
        }
    }
    m.push(best);
    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global_value(m: &Machine) -> Value {
        Value::Object(m.global())
    }

    #[test]
    fn time_utc_parses_rfc3339() {
        let mut m = Machine::new();
        m.push(Value::Str("1970-01-01T00:00:01Z".into()));
        m.push(global_value(&m));
        assert_eq!(time_utc(&mut m, 2).unwrap(), 1);
        assert_eq!(m.peek(0).unwrap().to_number(), 1.0);
    }

    #[test]
    fn time_utc_rejects_bad_input() {
        let mut m = Machine::new();
        m.push(Value::Str("yesterday".into()));
        m.push(global_value(&m));
        assert!(matches!(
            time_utc(&mut m, 2).unwrap_err(),
            RuntimeError::BadTimeFormat(_)
        ));

        let mut m = Machine::new();
        m.push(Value::Number(3.0));
        m.push(global_value(&m));
        assert!(matches!(
            time_utc(&mut m, 2).unwrap_err(),
            RuntimeError::MissingTimeExpression
        ));
    }

    #[test]
    fn match_regexp_with_non_string_pattern_yields_null() {
        let mut m = Machine::new();
        m.push(Value::Str("subject".into()));
        m.push(Value::Number(1.0));
        m.push(global_value(&m));
        assert_eq!(match_regexp(&mut m, 3).unwrap(), 1);
        assert!(matches!(m.peek(0).unwrap(), Value::Null));
    }

    #[test]
    fn match_regexp_bad_pattern_is_an_error() {
        let mut m = Machine::new();
        m.push(Value::Str("subject".into()));
        m.push(Value::Str("a(".into()));
        m.push(global_value(&m));
        assert!(matches!(
            match_regexp(&mut m, 3).unwrap_err(),
            RuntimeError::BadRegex(_)
        ));
    }

    #[test]
    fn match_regexp_rejects_numeric_subject() {
        let mut m = Machine::new();
        m.push(Value::Number(7.0));
        m.push(Value::Str("a".into()));
        m.push(global_value(&m));
        assert!(matches!(
            match_regexp(&mut m, 3).unwrap_err(),
            RuntimeError::BadRegexSubject
        ));
    }

    #[test]
    fn select_requires_key_and_array() {
        let mut m = Machine::new();
        m.push(Value::Number(1.0));
        m.push(Value::Str("key".into()));
        m.push(global_value(&m));
        let err = select(&mut m, 3).unwrap_err();
        assert!(matches!(err, RuntimeError::BadSelectArguments { .. }));
    }

    #[test]
    fn min_on_non_array_is_an_error() {
        let mut m = Machine::new();
        m.push(Value::Number(1.0));
        assert!(matches!(
            array_min(&mut m, 1).unwrap_err(),
            RuntimeError::ArrayMethodOnNonArray
        ));
    }

    #[test]
    fn min_of_all_null_array_is_null() {
        let mut m = Machine::new();
        let array = Array::from_values([Value::Null, Value::Null]);
        m.push(Value::Array(array));
        assert_eq!(array_min(&mut m, 1).unwrap(), 1);
        assert!(matches!(m.peek(0).unwrap(), Value::Null));
    }

    #[test]
    fn min_and_max_skip_null_elements() {
        let mut m = Machine::new();
        let array = Array::from_values([
            Value::Number(4.0),
            Value::Null,
            Value::Number(2.0),
            Value::Number(9.0),
        ]);
        m.push(Value::Array(array.clone()));
        array_min(&mut m, 1).unwrap();
        assert_eq!(m.peek(0).unwrap().to_number(), 2.0);

        let mut m = Machine::new();
        m.push(Value::Array(array));
        array_max(&mut m, 1).unwrap();
        assert_eq!(m.peek(0).unwrap().to_number(), 9.0);
    }
}

//! Runtime value model
//!
//! A value is one of seven tagged variants. Scalars are stored inline;
//! objects, arrays and functions are heap values shared by reference, so
//! the identity-equality rule for compound values falls out of `Rc`
//! pointer comparison. The null value is a plain variant and needs no
//! shared singleton.

use crate::builtins;
use crate::machine::Machine;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised while executing bytecode or native builtins.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("BadType: cannot read property {property} of {kind}")]
    BadPropertyRead { kind: ValueKind, property: String },

    #[error("BadType: cannot set property {property} of {kind}")]
    BadPropertyWrite { kind: ValueKind, property: String },

    #[error("TypeError: '{name}' is not a function")]
    NotAFunction { name: String },

    #[error("array_append called on something not an array")]
    AppendOnNonArray,

    #[error("array method called on non-array object")]
    ArrayMethodOnNonArray,

    #[error("matchRegexp failed, {0}")]
    BadRegex(String),

    #[error("matchRegexp expects a string or an array as parameters")]
    BadRegexSubject,

    #[error("select expects a string key and an array as parameters, got ({key}, {subject}) instead")]
    BadSelectArguments { key: ValueKind, subject: ValueKind },

    #[error("missing time expression in call to timeUTC()")]
    MissingTimeExpression,

    #[error("time format error in timeUTC(), {0}")]
    BadTimeFormat(String),

    #[error("cannot import host value: {0}")]
    Import(String),

    #[error("stack underflow at pc {pc}")]
    StackUnderflow { pc: usize },

    #[error("constant index {index} out of range at pc {pc}")]
    BadConstant { index: i32, pc: usize },

    #[error("undecodable opcode {opcode} at pc {pc}")]
    BadOpcode { opcode: u8, pc: usize },

    #[error("truncated instruction at pc {pc}")]
    TruncatedInstruction { pc: usize },

    #[error("invalid call arity at pc {pc}")]
    BadCallArity { pc: usize },
}

/// Type tag of a runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Object,
    Array,
    Function,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::Function => "function",
        };
        f.write_str(s)
    }
}

/// Native function signature: receives the machine and the parameter
/// count (arguments plus the receiver), and reports how many results it
/// pushed (0 or 1).
pub type NativeFn = fn(&mut Machine, usize) -> Result<usize, RuntimeError>;

/// A named native function.
pub struct Function {
    pub name: &'static str,
    pub call: NativeFn,
}

impl Function {
    pub fn new(name: &'static str, call: NativeFn) -> Rc<Function> {
        Rc::new(Function { name, call })
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

/// An object: a class tag, optional one-level prototype, and own
/// properties. Missing keys read as null rather than erroring; only the
/// import layer distinguishes "absent" from "null".
#[derive(Debug)]
pub struct Object {
    class: String,
    prototype: Option<Rc<RefCell<Object>>>,
    properties: HashMap<String, Value>,
}

impl Object {
    /// A plain object delegating to the shared object prototype.
    pub fn new() -> Rc<RefCell<Object>> {
        Rc::new(RefCell::new(Object {
            class: "Object".to_string(),
            prototype: Some(object_prototype()),
            properties: HashMap::new(),
        }))
    }

    /// An object with an explicit class tag and no prototype.
    pub fn with_class(class: &str) -> Rc<RefCell<Object>> {
        Rc::new(RefCell::new(Object {
            class: class.to_string(),
            prototype: None,
            properties: HashMap::new(),
        }))
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn get(&self, name: &str) -> Value {
        if let Some(v) = self.properties.get(name) {
            return v.clone();
        }
        if let Some(proto) = &self.prototype {
            return proto.borrow().get(name);
        }
        Value::Null
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.properties.insert(name.to_string(), value);
    }

    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }
}

/// An array: own properties keyed by decimal index, plus a length
/// counter. `min` and `max` are installed as own function properties so
/// the generic call opcode finds them by lookup.
#[derive(Debug)]
pub struct Array {
    object: Object,
    length: u32,
}

impl Array {
    pub fn new() -> Rc<RefCell<Array>> {
        let mut object = Object {
            class: "Array".to_string(),
            prototype: None,
            properties: HashMap::new(),
        };
        object.insert("min", Value::Function(Function::new("min", builtins::array_min)));
        object.insert("max", Value::Function(Function::new("max", builtins::array_max)));
        Rc::new(RefCell::new(Array { object, length: 0 }))
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Rc<RefCell<Array>> {
        let array = Array::new();
        for v in values {
            array.borrow_mut().push(v);
        }
        array
    }

    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn get(&self, name: &str) -> Value {
        if name == "length" {
            return Value::Number(f64::from(self.length));
        }
        self.object.get(name)
    }

    pub fn get_index(&self, index: u32) -> Value {
        self.object.get(&index.to_string())
    }

    /// Writing a decimal index extends `length` to cover it.
    pub fn insert(&mut self, name: &str, value: Value) {
        if let Ok(index) = name.parse::<u32>() {
            if index >= self.length {
                self.length = index + 1;
            }
        }
        self.object.insert(name, value);
    }

    pub fn push(&mut self, value: Value) {
        let key = self.length.to_string();
        self.length += 1;
        self.object.insert(&key, value);
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    Str(String),
    Object(Rc<RefCell<Object>>),
    Array(Rc<RefCell<Array>>),
    Function(Rc<Function>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::Str(_) => ValueKind::String,
            Value::Object(_) => ValueKind::Object,
            Value::Array(_) => ValueKind::Array,
            Value::Function(_) => ValueKind::Function,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Boolean(true) => 1.0,
            Value::Boolean(false) => 0.0,
            Value::Number(n) => *n,
            Value::Str(s) => s.parse::<f64>().unwrap_or(f64::NAN),
            Value::Object(_) | Value::Array(_) | Value::Function(_) => f64::NAN,
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Array(_) | Value::Function(_) => true,
        }
    }

    /// Canonical JSON form. NaN and infinities keep their display form
    /// and are not strict-JSON round-trippable.
    pub fn to_json(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => escape_json_string(s),
            Value::Object(o) => {
                let o = o.borrow();
                let mut s = String::from("{");
                let mut first = true;
                for (key, val) in o.properties() {
                    if !first {
                        s.push(',');
                    }
                    first = false;
                    s.push_str(&escape_json_string(key));
                    s.push(':');
                    s.push_str(&val.to_json());
                }
                s.push('}');
                s
            }
            Value::Array(a) => {
                let a = a.borrow();
                let mut s = String::from("[");
                for i in 0..a.len() {
                    if i > 0 {
                        s.push(',');
                    }
                    s.push_str(&a.get_index(i).to_json());
                }
                s.push(']');
                s
            }
            Value::Function(_) => "null".to_string(),
        }
    }

    pub fn get_property(&self, name: &str) -> Result<Value, RuntimeError> {
        match self {
            Value::Object(o) => Ok(o.borrow().get(name)),
            Value::Array(a) => Ok(a.borrow().get(name)),
            // Functions carry no own properties; reads fall through to null.
            Value::Function(_) => Ok(Value::Null),
            _ => Err(RuntimeError::BadPropertyRead {
                kind: self.kind(),
                property: name.to_string(),
            }),
        }
    }

    pub fn set_property(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        match self {
            Value::Object(o) => {
                o.borrow_mut().insert(name, value);
                Ok(())
            }
            Value::Array(a) => {
                a.borrow_mut().insert(name, value);
                Ok(())
            }
            _ => Err(RuntimeError::BadPropertyWrite {
                kind: self.kind(),
                property: name.to_string(),
            }),
        }
    }
}

/// Display is the engine's `toString`: null is empty, numbers use the
/// shortest-decimal form, arrays comma-join their elements.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Str(s) => f.write_str(s),
            Value::Object(o) => write!(f, "[Object {}]", o.borrow().class()),
            Value::Array(a) => {
                let a = a.borrow();
                for i in 0..a.len() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", a.get_index(i))?;
                }
                Ok(())
            }
            Value::Function(func) => {
                write!(f, "function {}(){{ [Native code] }}", func.name)
            }
        }
    }
}

thread_local! {
    static OBJECT_PROTOTYPE: Rc<RefCell<Object>> = Rc::new(RefCell::new(Object {
        class: "Object".to_string(),
        prototype: None,
        properties: HashMap::new(),
    }));
}

/// The shared default prototype all plain objects delegate to.
pub fn object_prototype() -> Rc<RefCell<Object>> {
    OBJECT_PROTOTYPE.with(Rc::clone)
}

/// Shortest-decimal number formatting. NaN prints `NaN`, infinities
/// `+Inf`/`-Inf`; magnitudes outside [1e-4, 1e21) switch to exponent
/// notation with a signed two-digit exponent.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-4 {
        let formatted = format!("{:e}", n);
        if let Some((mantissa, exponent)) = formatted.split_once('e') {
            if let Ok(exp) = exponent.parse::<i32>() {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exp.abs());
            }
        }
        return formatted;
    }
    format!("{}", n)
}

fn escape_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

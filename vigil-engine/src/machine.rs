//! The stack machine
//!
//! Execution is a fetch-decode-execute loop over a flat byte array,
//! starting at pc 0 and terminating when pc runs past the code. Every
//! failure path returns a typed error; the machine never panics.

use crate::builtins;
use crate::ops::{self, OpCode};
use crate::value::{Object, RuntimeError, Value, ValueKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A compiled expression plus the state needed to run it: constant pool,
/// operand stack and the per-machine global object.
///
/// Machines are single-use and single-threaded; one is built per
/// compile/execute cycle and never shared.
pub struct Machine {
    constants: Vec<Value>,
    string_table: HashMap<String, usize>,
    stack: Vec<Value>,
    code: Vec<u8>,
    pc: usize,
    global: Rc<RefCell<Object>>,
    debug: bool,
}

impl Machine {
    pub fn new() -> Self {
        let global = Object::with_class("GlobalObject");
        builtins::install(&global);
        Self {
            constants: Vec::new(),
            string_table: HashMap::new(),
            stack: Vec::new(),
            code: Vec::new(),
            pc: 0,
            global,
            debug: false,
        }
    }

    /// Per-step execution tracing via `tracing::debug!`.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// The machine's global object, the outermost lookup scope.
    pub fn global(&self) -> Rc<RefCell<Object>> {
        Rc::clone(&self.global)
    }

    /// Set a property on the global object.
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.global.borrow_mut().insert(name, value);
    }

    // ========================================================================
    // CONSTANT POOL
    // ========================================================================

    /// Add a constant, interning strings: an already-present string
    /// returns its existing index.
    pub fn add_const(&mut self, value: Value) -> usize {
        if let Value::Str(s) = &value {
            if let Some(&pos) = self.string_table.get(s) {
                return pos;
            }
            self.string_table.insert(s.clone(), self.constants.len());
        }
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn const_at(&self, index: i32) -> Result<Value, RuntimeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.constants.get(i))
            .cloned()
            .ok_or(RuntimeError::BadConstant {
                index,
                pc: self.pc,
            })
    }

    // ========================================================================
    // CODE EMISSION
    // ========================================================================

    pub fn emit(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    pub fn emit_with_param(&mut self, op: OpCode, param: i32) {
        self.code.push(op as u8);
        ops::encode_param(&mut self.code, param);
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    // ========================================================================
    // OPERAND STACK
    // ========================================================================

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { pc: self.pc })
    }

    pub fn popn(&mut self, count: usize) -> Result<(), RuntimeError> {
        if self.stack.len() < count {
            return Err(RuntimeError::StackUnderflow { pc: self.pc });
        }
        self.stack.truncate(self.stack.len() - count);
        Ok(())
    }

    /// Value `depth` slots below the top of stack (0 is the top).
    pub fn peek(&self, depth: usize) -> Result<&Value, RuntimeError> {
        if depth >= self.stack.len() {
            return Err(RuntimeError::StackUnderflow { pc: self.pc });
        }
        Ok(&self.stack[self.stack.len() - 1 - depth])
    }

    // ========================================================================
    // EXECUTION
    // ========================================================================

    /// Run the program. The result is the value left on top of the
    /// operand stack, or null if the stack ends empty.
    pub fn execute(&mut self) -> Result<Value, RuntimeError> {
        self.stack.clear();
        self.pc = 0;

        while self.pc < self.code.len() {
            let byte = self.code[self.pc];
            let op = OpCode::from_byte(byte).ok_or(RuntimeError::BadOpcode {
                opcode: byte,
                pc: self.pc,
            })?;

            if self.debug {
                tracing::debug!(
                    pc = self.pc,
                    depth = self.stack.len(),
                    opcode = op.name(),
                    "step"
                );
            }

            self.step(op)?;

            if self.debug {
                if let Some(top) = self.stack.last() {
                    tracing::debug!(kind = %top.kind(), value = %top, "stack top");
                }
            }

            self.pc += op.width();
        }

        Ok(self.stack.last().cloned().unwrap_or(Value::Null))
    }

    fn param(&self) -> Result<i32, RuntimeError> {
        ops::decode_param(&self.code, self.pc)
            .ok_or(RuntimeError::TruncatedInstruction { pc: self.pc })
    }

    fn step(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        match op {
            OpCode::LoadConst => {
                let value = self.const_at(self.param()?)?;
                self.push(value);
            }
            OpCode::GetGlobal => {
                let global = Value::Object(self.global());
                self.push(global);
            }
            OpCode::GetIndex => {
                let key = self.pop()?.to_string();
                let receiver = self.pop()?;
                let value = receiver.get_property(&key)?;
                self.push(value);
            }
            OpCode::SetIndex => {
                let value = self.pop()?;
                let key = self.pop()?.to_string();
                let receiver = self.peek(0)?.clone();
                receiver.set_property(&key, value)?;
            }
            OpCode::ArrayAppend => {
                let value = self.pop()?;
                match self.peek(0)? {
                    Value::Array(array) => {
                        let array = Rc::clone(array);
                        array.borrow_mut().push(value);
                    }
                    _ => return Err(RuntimeError::AppendOnNonArray),
                }
            }
            OpCode::Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                if a.kind() == ValueKind::String || b.kind() == ValueKind::String {
                    self.push(Value::Str(format!("{}{}", a, b)));
                } else {
                    self.push(Value::Number(a.to_number() + b.to_number()));
                }
            }
            OpCode::Sub => {
                let b = self.pop()?.to_number();
                let a = self.pop()?.to_number();
                self.push(Value::Number(a - b));
            }
            OpCode::Mul => {
                let b = self.pop()?.to_number();
                let a = self.pop()?.to_number();
                self.push(Value::Number(a * b));
            }
            OpCode::Div => {
                let b = self.pop()?.to_number();
                let a = self.pop()?.to_number();
                let quotient = if b == 0.0 {
                    if a == 0.0 {
                        f64::NAN
                    } else if a < 0.0 {
                        f64::NEG_INFINITY
                    } else {
                        f64::INFINITY
                    }
                } else {
                    a / b
                };
                self.push(Value::Number(quotient));
            }
            OpCode::Mod => {
                let b = self.pop()?.to_number();
                let a = self.pop()?.to_number();
                self.push(Value::Number(a % b));
            }
            OpCode::Equ => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Boolean(ops::equal(&a, &b)));
            }
            OpCode::Neq => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Boolean(!ops::equal(&a, &b)));
            }
            OpCode::Lt => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Boolean(ops::less_than(&a, &b)));
            }
            OpCode::Gt => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Boolean(
                    !ops::equal(&a, &b) && !ops::less_than(&a, &b),
                ));
            }
            OpCode::Lte => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Boolean(
                    ops::less_than(&a, &b) || ops::equal(&a, &b),
                ));
            }
            OpCode::Gte => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Boolean(!ops::less_than(&a, &b)));
            }
            OpCode::And => {
                let b = self.pop()?;
                let a = self.pop()?;
                if a.to_boolean() {
                    self.push(b);
                } else {
                    self.push(a);
                }
            }
            OpCode::Or => {
                let b = self.pop()?;
                let a = self.pop()?;
                if a.to_boolean() {
                    self.push(a);
                } else {
                    self.push(b);
                }
            }
            OpCode::Not => {
                let a = self.pop()?.to_boolean();
                self.push(Value::Boolean(!a));
            }
            OpCode::Neg => {
                let a = self.pop()?.to_number();
                self.push(Value::Number(-a));
            }
            OpCode::Call => {
                let argc = usize::try_from(self.param()?)
                    .map_err(|_| RuntimeError::BadCallArity { pc: self.pc })?;
                if argc == 0 {
                    return Err(RuntimeError::BadCallArity { pc: self.pc });
                }
                let key = self.pop()?.to_string();
                if self.stack.len() < argc {
                    return Err(RuntimeError::StackUnderflow { pc: self.pc });
                }
                let receiver = self.peek(0)?.clone();
                let callee = receiver.get_property(&key)?;
                let Value::Function(function) = callee else {
                    return Err(RuntimeError::NotAFunction { name: key });
                };
                // argc counts the receiver: the handler sees the receiver
                // at depth 0 and the first argument at depth 1.
                let results = (function.call)(self, argc)?;
                if results == 1 {
                    let result = self.pop()?;
                    self.popn(argc)?;
                    self.push(result);
                } else {
                    self.popn(argc)?;
                }
            }
            OpCode::NewArray => {
                self.push(Value::Array(crate::value::Array::new()));
            }
            OpCode::NewObject => {
                self.push(Value::Object(Object::new()));
            }
        }
        Ok(())
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_interning_reuses_indices() {
        let mut m = Machine::new();
        let a = m.add_const(Value::Str("score".into()));
        let b = m.add_const(Value::Number(1.0));
        let c = m.add_const(Value::Str("score".into()));
        let d = m.add_const(Value::Str("other".into()));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_ne!(a, d);
    }

    #[test]
    fn numbers_are_not_interned() {
        let mut m = Machine::new();
        let a = m.add_const(Value::Number(1.0));
        let b = m.add_const(Value::Number(1.0));
        assert_ne!(a, b);
    }

    #[test]
    fn empty_program_yields_null() {
        let mut m = Machine::new();
        assert!(matches!(m.execute().unwrap(), Value::Null));
    }

    #[test]
    fn undecodable_opcode_is_an_error() {
        let mut m = Machine::new();
        m.code.push(0xff);
        assert!(matches!(
            m.execute().unwrap_err(),
            RuntimeError::BadOpcode { opcode: 0xff, pc: 0 }
        ));
    }

    #[test]
    fn truncated_instruction_is_an_error() {
        let mut m = Machine::new();
        m.code.push(OpCode::LoadConst as u8);
        m.code.push(0);
        assert!(matches!(
            m.execute().unwrap_err(),
            RuntimeError::TruncatedInstruction { pc: 0 }
        ));
    }

    #[test]
    fn stack_underflow_is_an_error() {
        let mut m = Machine::new();
        m.emit(OpCode::Add);
        assert!(matches!(
            m.execute().unwrap_err(),
            RuntimeError::StackUnderflow { pc: 0 }
        ));
    }

    #[test]
    fn bad_constant_index_is_an_error() {
        let mut m = Machine::new();
        m.emit_with_param(OpCode::LoadConst, 9);
        assert!(matches!(
            m.execute().unwrap_err(),
            RuntimeError::BadConstant { index: 9, pc: 0 }
        ));
    }

    #[test]
    fn division_sign_rules() {
        let run = |a: f64, b: f64| {
            let mut m = Machine::new();
            let ka = m.add_const(Value::Number(a)) as i32;
            let kb = m.add_const(Value::Number(b)) as i32;
            m.emit_with_param(OpCode::LoadConst, ka);
            m.emit_with_param(OpCode::LoadConst, kb);
            m.emit(OpCode::Div);
            m.execute().unwrap().to_number()
        };
        assert!(run(0.0, 0.0).is_nan());
        assert_eq!(run(1.0, 0.0), f64::INFINITY);
        assert_eq!(run(-1.0, 0.0), f64::NEG_INFINITY);
        assert_eq!(run(1.0, 2.0), 0.5);
    }

    #[test]
    fn and_or_push_operands_not_booleans() {
        let mut m = Machine::new();
        let ka = m.add_const(Value::Number(3.0)) as i32;
        let kb = m.add_const(Value::Str("x".into())) as i32;
        m.emit_with_param(OpCode::LoadConst, ka);
        m.emit_with_param(OpCode::LoadConst, kb);
        m.emit(OpCode::And);
        let v = m.execute().unwrap();
        assert_eq!(v.to_string(), "x");
    }
}

//! Bytecode compiler
//!
//! Lowers the expression tree into a machine's code and constant pool.
//! Every subexpression leaves exactly one value on the operand stack.

use crate::machine::Machine;
use crate::ops::OpCode;
use crate::parser::{BinaryOp, Expr, UnaryOp};
use crate::value::Value;

/// Compile an expression into the machine.
pub fn compile_into(expr: &Expr, m: &mut Machine) {
    match expr {
        Expr::Number(n) => {
            let k = m.add_const(Value::Number(*n)) as i32;
            m.emit_with_param(OpCode::LoadConst, k);
        }
        Expr::Str(s) => {
            let k = m.add_const(Value::Str(s.clone())) as i32;
            m.emit_with_param(OpCode::LoadConst, k);
        }
        Expr::Boolean(b) => {
            let k = m.add_const(Value::Boolean(*b)) as i32;
            m.emit_with_param(OpCode::LoadConst, k);
        }
        Expr::Null => {
            let k = m.add_const(Value::Null) as i32;
            m.emit_with_param(OpCode::LoadConst, k);
        }
        Expr::Global => {
            m.emit(OpCode::GetGlobal);
        }
        Expr::Index { base, key } => {
            compile_into(base, m);
            compile_into(key, m);
            m.emit(OpCode::GetIndex);
        }
        Expr::Call { base, name, args } => {
            // Arguments are pushed in reverse so the handler finds the
            // first argument closest to the receiver.
            for arg in args.iter().rev() {
                compile_into(arg, m);
            }
            compile_into(base, m);
            compile_into(name, m);
            // The arity parameter counts the receiver as well.
            m.emit_with_param(OpCode::Call, args.len() as i32 + 1);
        }
        Expr::Binary { op, lhs, rhs } => {
            compile_into(lhs, m);
            compile_into(rhs, m);
            m.emit(binary_opcode(*op));
        }
        Expr::Unary { op, operand } => {
            compile_into(operand, m);
            m.emit(match op {
                UnaryOp::Not => OpCode::Not,
                UnaryOp::Neg => OpCode::Neg,
            });
        }
        Expr::Array(elements) => {
            m.emit(OpCode::NewArray);
            for element in elements {
                compile_into(element, m);
                m.emit(OpCode::ArrayAppend);
            }
        }
        Expr::Object(pairs) => {
            m.emit(OpCode::NewObject);
            for (key, value) in pairs {
                let k = m.add_const(Value::Str(key.clone())) as i32;
                m.emit_with_param(OpCode::LoadConst, k);
                compile_into(value, m);
                // set_index pops value and key, leaving the object on top.
                m.emit(OpCode::SetIndex);
            }
        }
    }
}

fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Mod => OpCode::Mod,
        BinaryOp::Eq => OpCode::Equ,
        BinaryOp::Ne => OpCode::Neq,
        BinaryOp::Lt => OpCode::Lt,
        BinaryOp::Gt => OpCode::Gt,
        BinaryOp::Le => OpCode::Lte,
        BinaryOp::Ge => OpCode::Gte,
        BinaryOp::And => OpCode::And,
        BinaryOp::Or => OpCode::Or,
    }
}

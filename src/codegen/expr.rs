//! Bajada de expresiones a instrucciones.

use std::io::Write;

use super::{constant_operand, CodegenError, Emitter};
use crate::{
    ast::{is_truth, BinaryOp, Expr, UnaryOp},
    ir::{symbol, Operand},
    scope::FunctionId,
    types::{Core, Type, TypeError},
};

impl<'a, W: Write> Emitter<'a, W> {
    /// Emite las dependencias de `expr` y retorna el operando que
    /// contiene su valor.
    pub(super) fn value(&mut self, expr: &Expr) -> Result<Operand, CodegenError> {
        match expr {
            Expr::Name { variable, ty } => {
                let slot = self.slot(*variable)?;
                let load = assign!(
                    self,
                    "load {0}, {0}* {1}, align {2}",
                    ty.ir_name(),
                    slot,
                    ty.align()
                )?;

                Ok(load)
            }

            Expr::Unary { op, operand, ty } => self.unary(*op, operand, ty),
            Expr::Binary { op, lhs, rhs, ty } => self.binary(*op, lhs, rhs, ty),

            Expr::Assign { target, value, ty } => {
                let value = self.value(value)?;
                let address = self.address(target)?;

                emit!(
                    self,
                    "store {0} {1}, {0}* {2}, align {3}",
                    ty.ir_name(),
                    value,
                    address,
                    ty.align()
                )?;

                Ok(value)
            }

            Expr::Cast { operand, ty } => match expr.constant() {
                Some(constant) => Ok(constant_operand(constant, ty)),
                None => self.cast(operand, ty),
            },

            Expr::Call {
                function,
                arguments,
                ..
            } => match self.call(*function, arguments)? {
                Some(result) => Ok(result),
                None => {
                    let name = &self.program.function(*function).prototype.name;
                    Err(CodegenError::VoidCall(name.to_string()))
                }
            },

            Expr::Integer { .. }
            | Expr::Float { .. }
            | Expr::Bool { .. }
            | Expr::Null { .. }
            | Expr::Str { .. } => {
                let ty = expr.result_type()?;
                let constant = expr.constant().ok_or(TypeError::NotConstant)?;
                Ok(constant_operand(constant, ty))
            }

            statement => Err(TypeError::Typeless(statement.describe()).into()),
        }
    }

    /// Dirección de almacenamiento de una expresión asignable.
    pub(super) fn address(&mut self, expr: &Expr) -> Result<Operand, CodegenError> {
        match expr {
            Expr::Name { variable, .. } => self.slot(*variable),

            Expr::Unary {
                op: UnaryOp::Deref,
                operand,
                ..
            } => self.value(operand),

            _ => Err(TypeError::NotAssignable.into()),
        }
    }

    /// Emite una llamada. Las funciones `void` no producen operando.
    pub(super) fn call(
        &mut self,
        function: FunctionId,
        arguments: &[Expr],
    ) -> Result<Option<Operand>, CodegenError> {
        let program = self.program;
        let callee = program.function(function);
        let returns = &callee.prototype.returns;
        let name = symbol(&program.mangled_name(callee.scope, &callee.prototype.name));

        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let ty = argument.result_type()?;
            values.push(format!("{} {}", ty.ir_name(), self.value(argument)?));
        }

        let values = values.join(", ");
        if returns.is_void() {
            emit!(self, "call void {}({})", name, values)?;
            Ok(None)
        } else {
            let result = assign!(self, "call {} {}({})", returns.ir_name(), name, values)?;
            Ok(Some(result))
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, ty: &Type) -> Result<Operand, CodegenError> {
        let ir = ty.ir_name();

        match op {
            UnaryOp::Plus => self.value(operand),
            UnaryOp::AddressOf => self.address(operand),

            UnaryOp::Negate => {
                let value = self.value(operand)?;
                let negated = if ty.is_float() {
                    assign!(self, "fneg {} {}", ir, value)?
                } else if ty.is_signed() {
                    assign!(self, "sub nsw {} 0, {}", ir, value)?
                } else {
                    assign!(self, "sub {} 0, {}", ir, value)?
                };

                Ok(negated)
            }

            UnaryOp::BitNot => {
                let value = self.value(operand)?;
                Ok(assign!(self, "xor {} {}, -1", ir, value)?)
            }

            UnaryOp::Not => {
                let value = self.value(operand)?;
                let condition = self.truth(value, operand.result_type()?, true)?;
                Ok(assign!(self, "zext i1 {} to {}", condition, ir)?)
            }

            UnaryOp::Deref => {
                let pointer = self.value(operand)?;
                let load = assign!(self, "load {0}, {0}* {1}, align {2}", ir, pointer, ty.align())?;
                Ok(load)
            }
        }
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        ty: &Type,
    ) -> Result<Operand, CodegenError> {
        use BinaryOp::*;

        let operands = lhs.result_type()?;
        let (signed, float) = (operands.is_signed(), operands.is_float());
        let operand_ir = operands.ir_name();

        let left = self.value(lhs)?;
        let right = self.value(rhs)?;

        if op.is_comparison() {
            let predicate = match (op, float, signed) {
                (Equal, true, _) => "fcmp oeq",
                (NotEqual, true, _) => "fcmp une",
                (Less, true, _) => "fcmp olt",
                (LessEqual, true, _) => "fcmp ole",
                (Greater, true, _) => "fcmp ogt",
                (GreaterEqual, true, _) => "fcmp oge",
                (Equal, false, _) => "icmp eq",
                (NotEqual, false, _) => "icmp ne",
                (Less, false, true) => "icmp slt",
                (Less, false, false) => "icmp ult",
                (LessEqual, false, true) => "icmp sle",
                (LessEqual, false, false) => "icmp ule",
                (Greater, false, true) => "icmp sgt",
                (Greater, false, false) => "icmp ugt",
                (GreaterEqual, false, true) => "icmp sge",
                (GreaterEqual, false, false) => "icmp uge",
                _ => unreachable!(),
            };

            let condition = assign!(self, "{} {} {}, {}", predicate, operand_ir, left, right)?;
            return Ok(assign!(self, "zext i1 {} to {}", condition, ty.ir_name())?);
        }

        let opcode = match (op, float, signed) {
            (Add, true, _) => "fadd",
            (Sub, true, _) => "fsub",
            (Mul, true, _) => "fmul",
            (Div, true, _) => "fdiv",
            (Rem, true, _) => "frem",
            (Add, false, true) => "add nsw",
            (Add, false, false) => "add",
            (Sub, false, true) => "sub nsw",
            (Sub, false, false) => "sub",
            (Mul, false, true) => "mul nsw",
            (Mul, false, false) => "mul",
            (Div, false, true) => "sdiv",
            (Div, false, false) => "udiv",
            (Rem, false, true) => "srem",
            (Rem, false, false) => "urem",
            (Shl, ..) => "shl",
            (Shr, _, true) => "ashr",
            (Shr, _, false) => "lshr",
            (BitAnd, ..) => "and",
            (BitOr, ..) => "or",
            (BitXor, ..) => "xor",
            _ => unreachable!(),
        };

        Ok(assign!(self, "{} {} {}, {}", opcode, ty.ir_name(), left, right)?)
    }

    /// Conversión explícita de un valor no constante.
    fn cast(&mut self, operand: &Expr, to: &Type) -> Result<Operand, CodegenError> {
        let from = operand.result_type()?;
        if from.is_void() || to.is_void() {
            return Err(TypeError::IncompatibleCast {
                from: from.name().to_owned(),
                to: to.name().to_owned(),
            }
            .into());
        }

        let value = self.value(operand)?;
        let (from_ir, to_ir) = (from.ir_name(), to.ir_name());

        if to.is_condition() {
            return if from.is_condition() {
                Ok(value)
            } else {
                self.truth(value, from, false)
            };
        }

        if is_truth(to) && !is_truth(from) {
            let condition = self.truth(value, from, false)?;
            return Ok(assign!(self, "zext i1 {} to {}", condition, to_ir)?);
        }

        if from_ir == to_ir {
            return Ok(value);
        }

        let opcode = if from.is_condition() {
            if to.is_float() {
                "uitofp"
            } else {
                "zext"
            }
        } else if from.is_pointer() && to.is_pointer() {
            "bitcast"
        } else if from.is_pointer() {
            "ptrtoint"
        } else if to.is_pointer() {
            "inttoptr"
        } else if from.is_float() && to.is_float() {
            if to.width() > from.width() {
                "fpext"
            } else {
                "fptrunc"
            }
        } else if from.is_float() {
            if to.is_signed() {
                "fptosi"
            } else {
                "fptoui"
            }
        } else if to.is_float() {
            if from.is_signed() {
                "sitofp"
            } else {
                "uitofp"
            }
        } else if to.width() > from.width() {
            if from.is_signed() {
                "sext"
            } else {
                "zext"
            }
        } else {
            "trunc"
        };

        Ok(assign!(self, "{} {} {} to {}", opcode, from_ir, value, to_ir)?)
    }

    /// Compara `value` contra cero y produce un `i1`. Con `equal` el
    /// resultado es verdadero cuando el valor es cero.
    fn truth(&mut self, value: Operand, ty: &Type, equal: bool) -> Result<Operand, CodegenError> {
        let ir = ty.ir_name();

        let result = if ty.is_condition() {
            if equal {
                assign!(self, "xor i1 {}, true", value)?
            } else {
                return Ok(value);
            }
        } else if ty.is_pointer() {
            let predicate = if equal { "eq" } else { "ne" };
            assign!(self, "icmp {} {} {}, null", predicate, ir, value)?
        } else if ty.is_float() {
            let predicate = if equal { "oeq" } else { "une" };
            let zero = Operand::Float {
                value: 0.0,
                extended: ty.core() == Core::LongDouble,
            };

            assign!(self, "fcmp {} {} {}, {}", predicate, ir, value, zero)?
        } else {
            let predicate = if equal { "eq" } else { "ne" };
            assign!(self, "icmp {} {} {}, 0", predicate, ir, value)?
        };

        Ok(result)
    }
}

//! Árbol sintáctico anotado.
//!
//! [`Expr`] es un conjunto cerrado de clases de nodo que cubre tanto
//! expresiones como sentencias. Cada nodo con valor lleva su tipo
//! resultante ya resuelto; los constructores de este módulo aplican las
//! conversiones implícitas necesarias (promoción entera, conversiones
//! aritméticas usuales, conversión al tipo del destino) antes de armar
//! el nodo, de modo que la generación de código nunca observa
//! operandos de tipos distintos.

use std::rc::Rc;

use crate::{
    lex::Op,
    program::Program,
    scope::{FunctionId, ScopeId, VariableId},
    types::{Core, Type, TypeError},
};

/// Operadores prefijos.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
    BitNot,
    Not,
    Deref,
    AddressOf,
}

impl UnaryOp {
    pub fn from_op(op: Op) -> Option<UnaryOp> {
        let unary = match op {
            Op::Plus => UnaryOp::Plus,
            Op::Minus => UnaryOp::Negate,
            Op::Tilde => UnaryOp::BitNot,
            Op::Not => UnaryOp::Not,
            Op::Star => UnaryOp::Deref,
            Op::Ampersand => UnaryOp::AddressOf,
            _ => return None,
        };

        Some(unary)
    }

    pub fn spelling(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
            UnaryOp::Deref => "*",
            UnaryOp::AddressOf => "&",
        }
    }
}

/// Operadores binarios con valor. La asignación se modela aparte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl BinaryOp {
    pub fn from_op(op: Op) -> Option<BinaryOp> {
        use BinaryOp::*;

        let binary = match op {
            Op::Plus => Add,
            Op::Minus => Sub,
            Op::Star => Mul,
            Op::Slash => Div,
            Op::Percent => Rem,
            Op::ShiftLeft => Shl,
            Op::ShiftRight => Shr,
            Op::Ampersand => BitAnd,
            Op::Pipe => BitOr,
            Op::Caret => BitXor,
            Op::Less => Less,
            Op::LessEqual => LessEqual,
            Op::Greater => Greater,
            Op::GreaterEqual => GreaterEqual,
            Op::Equal => Equal,
            Op::NotEqual => NotEqual,
            _ => return None,
        };

        Some(binary)
    }

    pub fn spelling(self) -> &'static str {
        use BinaryOp::*;

        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Shl => "<<",
            Shr => ">>",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Equal => "==",
            NotEqual => "!=",
        }
    }

    /// Comparaciones y pruebas de igualdad, con resultado `bool`.
    pub fn is_comparison(self) -> bool {
        use BinaryOp::*;
        matches!(self, Less | LessEqual | Greater | GreaterEqual | Equal | NotEqual)
    }

    fn is_bitwise(self) -> bool {
        use BinaryOp::*;
        matches!(self, Rem | Shl | Shr | BitAnd | BitOr | BitXor)
    }
}

/// Nodo de expresión o sentencia.
#[derive(Clone, Debug)]
pub enum Expr {
    Integer {
        value: i128,
        ty: Rc<Type>,
    },

    Float {
        value: f64,
        ty: Rc<Type>,
    },

    Bool {
        value: bool,
        ty: Rc<Type>,
    },

    Null {
        ty: Rc<Type>,
    },

    /// Literal de cadena; `bytes` no incluye el terminador nulo.
    Str {
        id: u32,
        bytes: Vec<u8>,
        ty: Rc<Type>,
    },

    Name {
        variable: VariableId,
        ty: Rc<Type>,
    },

    /// Declaración de variable local como sentencia.
    Declare {
        variable: VariableId,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        ty: Rc<Type>,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: Rc<Type>,
    },

    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        ty: Rc<Type>,
    },

    Cast {
        operand: Box<Expr>,
        ty: Rc<Type>,
    },

    Call {
        function: FunctionId,
        arguments: Vec<Expr>,
        ty: Rc<Type>,
    },

    Empty,
    Return(Option<Box<Expr>>),
    Block(ScopeId),

    If {
        condition: Box<Expr>,
        then: Option<ScopeId>,
        otherwise: Option<ScopeId>,
    },
}

/// Valor de una expresión constante.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int(i128),
    Float(f64),
    Null,
    Str { id: u32, length: usize },
}

impl Expr {
    /// Nombre de la clase de nodo, para diagnósticos.
    pub fn describe(&self) -> &'static str {
        match self {
            Expr::Integer { .. } | Expr::Float { .. } | Expr::Bool { .. } => "literal",
            Expr::Null { .. } => "null pointer literal",
            Expr::Str { .. } => "string literal",
            Expr::Name { .. } => "name reference",
            Expr::Declare { .. } => "variable declaration",
            Expr::Unary { .. } => "unary expression",
            Expr::Binary { .. } => "binary expression",
            Expr::Assign { .. } => "assignment",
            Expr::Cast { .. } => "cast",
            Expr::Call { .. } => "function call",
            Expr::Empty => "empty statement",
            Expr::Return(_) => "return statement",
            Expr::Block(_) => "block",
            Expr::If { .. } => "if statement",
        }
    }

    /// Tipo estático del nodo.
    pub fn result_type(&self) -> Result<&Rc<Type>, TypeError> {
        match self {
            Expr::Integer { ty, .. }
            | Expr::Float { ty, .. }
            | Expr::Bool { ty, .. }
            | Expr::Null { ty }
            | Expr::Str { ty, .. }
            | Expr::Name { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Assign { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::Call { ty, .. } => Ok(ty),

            other => Err(TypeError::Typeless(other.describe())),
        }
    }

    /// Solo referencias a nombres y desreferencias designan almacenamiento.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expr::Name { .. }
                | Expr::Unary {
                    op: UnaryOp::Deref,
                    ..
                }
        )
    }

    /// Construye un operador prefijo.
    pub fn unary(op: UnaryOp, operand: Expr, program: &mut Program) -> Result<Expr, TypeError> {
        let operand_ty = Rc::clone(value_type(&operand)?);
        let invalid = || TypeError::InvalidOperand {
            op: op.spelling(),
            operand: operand_ty.name().to_owned(),
        };

        let (operand, ty) = match op {
            UnaryOp::Plus | UnaryOp::Negate if operand_ty.is_arithmetic() => {
                let ty = program.promoted(&operand_ty);
                (operand.convert(&ty)?, ty)
            }

            UnaryOp::BitNot if operand_ty.is_arithmetic() && !operand_ty.is_float() => {
                let ty = program.promoted(&operand_ty);
                (operand.convert(&ty)?, ty)
            }

            UnaryOp::Not => (operand, program.fundamental(Core::Bool)),

            UnaryOp::Deref => match program.pointee(&operand_ty) {
                Some(ty) if !ty.is_void() => (operand, ty),
                _ => return Err(invalid()),
            },

            UnaryOp::AddressOf if operand.is_assignable() => {
                let ty = program.pointer_to(&operand_ty);
                (operand, ty)
            }

            UnaryOp::AddressOf => return Err(TypeError::NotAssignable),
            _ => return Err(invalid()),
        };

        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            ty,
        })
    }

    /// Construye un operador binario con las conversiones usuales.
    pub fn binary(
        op: BinaryOp,
        lhs: Expr,
        rhs: Expr,
        program: &mut Program,
    ) -> Result<Expr, TypeError> {
        let lhs_ty = Rc::clone(value_type(&lhs)?);
        let rhs_ty = Rc::clone(value_type(&rhs)?);

        let invalid = || TypeError::InvalidOperands {
            op: op.spelling(),
            lhs: lhs_ty.name().to_owned(),
            rhs: rhs_ty.name().to_owned(),
        };

        let operands = if lhs_ty.is_arithmetic() && rhs_ty.is_arithmetic() {
            if op.is_bitwise() && (lhs_ty.is_float() || rhs_ty.is_float()) {
                return Err(invalid());
            }

            match op {
                // El tipo de un corrimiento es el del operando izquierdo promovido
                BinaryOp::Shl | BinaryOp::Shr => program.promoted(&lhs_ty),
                _ => program.common_type(&lhs_ty, &rhs_ty).ok_or_else(invalid)?,
            }
        } else if op.is_comparison() && (lhs_ty.is_pointer() || rhs_ty.is_pointer()) {
            match (lhs_ty.is_pointer(), rhs_ty.is_pointer()) {
                (true, true) if lhs_ty.is_null() => program.unqualified(&rhs_ty),
                (true, true) => program.unqualified(&lhs_ty),
                (true, false) if rhs.is_null_constant() => program.unqualified(&lhs_ty),
                (false, true) if lhs.is_null_constant() => program.unqualified(&rhs_ty),
                _ => return Err(invalid()),
            }
        } else {
            return Err(invalid());
        };

        let lhs = lhs.cast(Rc::clone(&operands))?;
        let rhs = rhs.cast(Rc::clone(&operands))?;

        let ty = if op.is_comparison() {
            program.fundamental(Core::Bool)
        } else {
            operands
        };

        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        })
    }

    /// Construye una asignación, convirtiendo el valor al tipo del destino.
    pub fn assign(target: Expr, value: Expr, program: &mut Program) -> Result<Expr, TypeError> {
        if !target.is_assignable() {
            return Err(TypeError::NotAssignable);
        }

        let target_ty = Rc::clone(value_type(&target)?);
        if target_ty.is_const() {
            return Err(TypeError::ReadOnly(target_ty.name().to_owned()));
        }

        let ty = program.unqualified(&target_ty);
        let value = value.convert(&target_ty)?;

        Ok(Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
            ty,
        })
    }

    /// Conversión explícita. Se valida la compatibilidad de categorías.
    pub fn cast(self, to: Rc<Type>) -> Result<Expr, TypeError> {
        let from = value_type(&self)?;
        if from == &to {
            return Ok(self);
        }

        let valid = match () {
            _ if from.is_void() || to.is_void() => false,
            _ if to.is_condition() => true,
            _ if to.is_null() => from.is_null(),
            _ if to.is_pointer() => from.is_pointer() || from.is_integer(),
            _ if to.is_float() => !from.is_pointer(),
            _ => true,
        };

        if valid {
            Ok(Expr::Cast {
                operand: Box::new(self),
                ty: to,
            })
        } else {
            Err(TypeError::IncompatibleCast {
                from: from.name().to_owned(),
                to: to.name().to_owned(),
            })
        }
    }

    /// Conversión implícita: argumentos, inicializadores, asignaciones y
    /// retornos. Más estricta que [`Expr::cast`] entre punteros y enteros.
    pub fn convert(self, to: &Rc<Type>) -> Result<Expr, TypeError> {
        let from = value_type(&self)?;
        let incompatible = || TypeError::IncompatibleCast {
            from: from.name().to_owned(),
            to: to.name().to_owned(),
        };

        if to.is_pointer() && !from.is_pointer() && !self.is_null_constant() {
            return Err(incompatible());
        } else if !to.is_pointer() && from.is_pointer() && !is_truth(to) {
            return Err(incompatible());
        }

        self.cast(Rc::clone(to))
    }

    /// Determina si una conversión a `to` puede perder información.
    ///
    /// Las constantes que caben en el destino no se consideran.
    pub fn narrows_to(&self, to: &Type) -> bool {
        let from = match self.result_type() {
            Ok(from) => from,
            Err(_) => return false,
        };

        if let Some(Constant::Int(value)) = self.constant() {
            if to.is_integer() && !to.is_pointer() {
                return wrap(value, to) != value;
            }
        }

        match (from.is_float(), to.is_float()) {
            _ if from.is_pointer() || to.is_pointer() => false,
            _ if is_truth(to) => false,
            (true, false) => true,
            (true, true) | (false, false) => to.width() < from.width(),
            (false, true) => false,
        }
    }

    /// Literal entero cero, posiblemente a través de conversiones.
    fn is_null_constant(&self) -> bool {
        match self {
            Expr::Null { .. } => true,
            Expr::Integer { .. } | Expr::Cast { .. } => {
                self.constant() == Some(Constant::Int(0))
                    && self.result_type().map_or(false, |ty| ty.is_integer())
            }

            _ => false,
        }
    }

    /// Evaluación en tiempo de compilación.
    pub fn constant(&self) -> Option<Constant> {
        use BinaryOp::*;

        let constant = match self {
            Expr::Integer { value, ty } => Constant::Int(wrap(*value, ty)),
            Expr::Float { value, .. } => Constant::Float(*value),
            Expr::Bool { value, .. } => Constant::Int(*value as i128),
            Expr::Null { .. } => Constant::Null,
            Expr::Str { id, bytes, .. } => Constant::Str {
                id: *id,
                length: bytes.len() + 1,
            },

            Expr::Unary { op, operand, ty } => match (op, operand.constant()?) {
                (UnaryOp::Plus, value) => value,
                (UnaryOp::Negate, Constant::Int(value)) => Constant::Int(wrap(-value, ty)),
                (UnaryOp::Negate, Constant::Float(value)) => Constant::Float(-value),
                (UnaryOp::BitNot, Constant::Int(value)) => Constant::Int(wrap(!value, ty)),
                (UnaryOp::Not, value) => Constant::Int(!value.truthy()? as i128),
                _ => return None,
            },

            Expr::Binary { op, lhs, rhs, ty } => match (lhs.constant()?, rhs.constant()?) {
                (Constant::Int(a), Constant::Int(b)) => {
                    let width = lhs.result_type().ok()?.width();
                    let value = match op {
                        Add => a + b,
                        Sub => a - b,
                        Mul => a.wrapping_mul(b),
                        Div if b == 0 => return None,
                        Div => a / b,
                        Rem if b == 0 => return None,
                        Rem => a % b,
                        Shl | Shr if b < 0 || b >= width as i128 => return None,
                        Shl => a.wrapping_shl(b as u32),
                        Shr => a >> b,
                        BitAnd => a & b,
                        BitOr => a | b,
                        BitXor => a ^ b,
                        Less => (a < b) as i128,
                        LessEqual => (a <= b) as i128,
                        Greater => (a > b) as i128,
                        GreaterEqual => (a >= b) as i128,
                        Equal => (a == b) as i128,
                        NotEqual => (a != b) as i128,
                    };

                    Constant::Int(wrap(value, ty))
                }

                (Constant::Float(a), Constant::Float(b)) => match op {
                    Add => Constant::Float(a + b),
                    Sub => Constant::Float(a - b),
                    Mul => Constant::Float(a * b),
                    Div => Constant::Float(a / b),
                    Less => Constant::Int((a < b) as i128),
                    LessEqual => Constant::Int((a <= b) as i128),
                    Greater => Constant::Int((a > b) as i128),
                    GreaterEqual => Constant::Int((a >= b) as i128),
                    Equal => Constant::Int((a == b) as i128),
                    NotEqual => Constant::Int((a != b) as i128),
                    _ => return None,
                },

                _ => return None,
            },

            Expr::Cast { operand, ty } => {
                let value = operand.constant()?;
                if is_truth(ty) {
                    Constant::Int(value.truthy()? as i128)
                } else if ty.is_float() {
                    let value = match value {
                        Constant::Int(value) if operand.result_type().ok()?.is_signed() => {
                            value as f64
                        }

                        Constant::Int(value) => value as u128 as f64,
                        Constant::Float(value) => value,
                        _ => return None,
                    };

                    Constant::Float(round_to(value, ty))
                } else if ty.is_pointer() {
                    match value {
                        Constant::Null | Constant::Int(0) => Constant::Null,
                        Constant::Str { .. } if ty.ir_name() == "i8*" => value,
                        _ => return None,
                    }
                } else {
                    match value {
                        Constant::Int(value) => Constant::Int(wrap(value, ty)),
                        Constant::Float(value) => Constant::Int(wrap(value.trunc() as i128, ty)),
                        Constant::Null => Constant::Int(0),
                        Constant::Str { .. } => return None,
                    }
                }
            }

            _ => return None,
        };

        Some(constant)
    }
}

impl Constant {
    fn truthy(&self) -> Option<bool> {
        match self {
            Constant::Int(value) => Some(*value != 0),
            Constant::Float(value) => Some(*value != 0.0),
            Constant::Null => Some(false),
            Constant::Str { .. } => Some(true),
        }
    }
}

/// Trunca `value` al ancho de `ty`, extendiendo signo si corresponde.
pub fn wrap(value: i128, ty: &Type) -> i128 {
    let width = ty.width();
    if width == 0 || width >= 128 {
        return value;
    }

    let modulus = 1i128 << width;
    let truncated = value.rem_euclid(modulus);

    if ty.is_signed() && truncated >= modulus / 2 {
        truncated - modulus
    } else {
        truncated
    }
}

/// Redondea un flotante a la precisión de `ty`.
pub fn round_to(value: f64, ty: &Type) -> f64 {
    if ty.core() == Core::Float {
        value as f32 as f64
    } else {
        value
    }
}

/// `bool` y `_condition` se obtienen comparando contra cero.
pub fn is_truth(ty: &Type) -> bool {
    ty.is_condition() || ty.core() == Core::Bool && !ty.is_pointer()
}

/// Tipo de un nodo que debe producir un valor.
fn value_type(expr: &Expr) -> Result<&Rc<Type>, TypeError> {
    let ty = expr.result_type()?;
    if ty.is_void() {
        Err(TypeError::Typeless("expression of type `void`"))
    } else {
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;

    fn int(program: &mut Program, value: i128) -> Expr {
        Expr::Integer {
            value,
            ty: program.fundamental(Core::Int),
        }
    }

    #[test]
    fn precedence_independent_folding() {
        let mut program = Program::new(Target::default());

        let product = {
            let (two, three) = (int(&mut program, 2), int(&mut program, 3));
            Expr::binary(BinaryOp::Mul, two, three, &mut program).unwrap()
        };

        let one = int(&mut program, 1);
        let sum = Expr::binary(BinaryOp::Add, one, product, &mut program).unwrap();
        assert_eq!(sum.constant(), Some(Constant::Int(7)));
        assert_eq!(sum.result_type().unwrap().name(), "int");
    }

    #[test]
    fn usual_conversions_insert_casts() {
        let mut program = Program::new(Target::default());
        let long = program.fundamental(Core::Long);

        let lhs = int(&mut program, 1);
        let rhs = Expr::Integer {
            value: 2,
            ty: Rc::clone(&long),
        };

        match Expr::binary(BinaryOp::Less, lhs, rhs, &mut program).unwrap() {
            Expr::Binary { lhs, rhs, ty, .. } => {
                assert_eq!(ty.name(), "bool");
                assert!(matches!(*lhs, Expr::Cast { .. }));
                assert!(matches!(*rhs, Expr::Integer { .. }));
            }

            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn same_type_cast_is_identity() {
        let mut program = Program::new(Target::default());
        let ty = program.fundamental(Core::Int);

        let expr = int(&mut program, 5).cast(ty).unwrap();
        assert!(matches!(expr, Expr::Integer { value: 5, .. }));
    }

    #[test]
    fn incompatible_conversions() {
        let mut program = Program::new(Target::default());
        let global = program.global();
        let pointer = program.resolve_type(global, "int *").unwrap();
        let double = program.fundamental(Core::Double);
        let void = program.fundamental(Core::Void);

        let five = int(&mut program, 5);
        assert!(matches!(
            five.clone().convert(&pointer),
            Err(TypeError::IncompatibleCast { .. })
        ));

        assert!(five.clone().cast(Rc::clone(&pointer)).is_ok());
        assert!(int(&mut program, 0).convert(&pointer).is_ok());
        assert!(five.cast(void).is_err());

        let null = Expr::Null {
            ty: program.resolve_type(global, "std::nullptr_t").unwrap(),
        };

        assert!(null.cast(double).is_err());
    }

    #[test]
    fn assignment_requires_location() {
        let mut program = Program::new(Target::default());
        let (one, two) = (int(&mut program, 1), int(&mut program, 2));

        assert_eq!(
            Expr::assign(one, two, &mut program).unwrap_err(),
            TypeError::NotAssignable
        );
    }

    #[test]
    fn narrowing_detection() {
        let mut program = Program::new(Target::default());
        let char = program.fundamental(Core::Char);
        let long = program.fundamental(Core::Long);

        assert!(!int(&mut program, 65).narrows_to(&char));
        assert!(int(&mut program, 300).narrows_to(&char));

        let wide = Expr::Integer { value: 1, ty: long };
        let wide = Expr::unary(UnaryOp::Negate, wide, &mut program).unwrap();
        assert!(!wide.narrows_to(&char));
    }

    #[test]
    fn wrapping() {
        let program = Program::new(Target::default());
        let widths = program.widths();

        let uint = Type::resolve("unsigned int", widths).unwrap();
        let schar = Type::resolve("char", widths).unwrap();

        assert_eq!(wrap(-1, &uint), 4294967295);
        assert_eq!(wrap(200, &schar), -56);
        assert_eq!(wrap(5, &schar), 5);
    }
}

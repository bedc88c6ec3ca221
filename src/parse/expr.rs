//! Expresiones.
//!
//! Ascenso por precedencia sobre una producción unaria izquierda. Las
//! precedencias provienen de la tabla de operadores: un valor menor liga
//! más fuerte. Mientras el siguiente operador tenga precedencia igual o
//! más fuerte que el umbral vigente, se parsea el lado derecho con la
//! precedencia del operador (una más fuerte si asocia por la izquierda)
//! y se pliega el nodo binario.

use std::rc::Rc;

use super::{Failure, Parse, Parser, ParserError};
use crate::{
    ast::{wrap, BinaryOp, Expr, UnaryOp},
    lex::{Associativity, Literal, Op, Suffix, Token, TokenKind},
    scope::{FunctionId, Item, Prototype},
    source::{Located, Location},
    types::Core,
};

/// Precedencia de la asignación; excluye al operador coma.
const ASSIGNMENT: u32 = 16;

impl<'a> Parser<'a> {
    pub(super) fn expression(&mut self) -> Parse<Expr> {
        self.binary(ASSIGNMENT)
    }

    fn binary(&mut self, threshold: u32) -> Parse<Expr> {
        let mut lhs = self.unary()?;

        loop {
            let token = self.peek()?;
            let op = match token.op() {
                Some(op) if op.precedence() <= threshold => op,
                _ => break Ok(lhs),
            };

            let binary = BinaryOp::from_op(op);
            match op {
                Op::Scope | Op::Not | Op::Tilde => break Ok(lhs),
                Op::Assign => (),
                _ if binary.is_none() => break self.fail(ParserError::UnsupportedOperator(op)),
                _ => (),
            }

            let location = self.location();
            let tighter = match op.associativity() {
                Associativity::LeftToRight => op.precedence() - 1,
                Associativity::RightToLeft => op.precedence(),
            };

            self.next()?;
            let rhs = self.binary(tighter).map_err(Failure::strict)?;

            let folded = match binary {
                Some(binary) => Expr::binary(binary, lhs, rhs, self.program),
                None => {
                    if let Ok(target) = lhs.result_type() {
                        let target = Rc::clone(target);
                        if rhs.narrows_to(&target) {
                            if let Ok(from) = rhs.result_type() {
                                log::warn!(
                                    "{}: implicit conversion from `{}` to `{}` may change the value",
                                    location,
                                    from,
                                    target
                                );
                            }
                        }
                    }

                    Expr::assign(lhs, rhs, self.program)
                }
            };

            lhs = folded.map_err(|error| self.type_error(error, &location))?;
        }
    }

    /// Literales, conversiones explícitas, nombres, llamadas, operadores
    /// prefijos y expresiones entre paréntesis.
    fn unary(&mut self) -> Parse<Expr> {
        let token = self.peek()?;
        let location = self.location();

        match token.kind {
            TokenKind::Integer => {
                self.next()?;
                self.integer(&token, &location)
            }

            TokenKind::Character | TokenKind::Bool => {
                self.next()?;
                let value = match token.value {
                    Literal::Signed(value) => value,
                    _ => 0,
                };

                if token.kind == TokenKind::Bool {
                    let ty = self.program.fundamental(Core::Bool);
                    Ok(Expr::Bool {
                        value: value != 0,
                        ty,
                    })
                } else {
                    let ty = self.program.fundamental(Core::Char);
                    Ok(Expr::Integer {
                        value: value as i128,
                        ty,
                    })
                }
            }

            TokenKind::Float => {
                self.next()?;
                let value = match token.value {
                    Literal::Float(value) => value,
                    _ => 0.0,
                };

                let ty = self.program.fundamental(Core::Double);
                Ok(Expr::Float { value, ty })
            }

            TokenKind::Str => self.string(),
            TokenKind::Identifier => self.name(),
            TokenKind::Operator(Op::LeftParen) => self.parenthesized(),

            TokenKind::Operator(op) => match UnaryOp::from_op(op) {
                Some(unary) => {
                    self.next()?;
                    let operand = self.unary().map_err(Failure::strict)?;

                    Expr::unary(unary, operand, self.program)
                        .map_err(|error| self.type_error(error, &location))
                }

                None if matches!(op, Op::Increment | Op::Decrement) => {
                    self.fail(ParserError::UnsupportedOperator(op))
                }

                None => self.fail(ParserError::ExpectedExpression(token.to_string())),
            },

            TokenKind::Eof => self.fail(ParserError::ExpectedExpression(token.to_string())),
        }
    }

    /// Conversión explícita o expresión entre paréntesis.
    fn parenthesized(&mut self) -> Parse<Expr> {
        let location = self.location();

        let cast = self.optional(|parser| {
            parser.expect(Op::LeftParen)?;
            let ty = parser.type_name()?;
            parser.expect(Op::RightParen)?;

            Ok(ty)
        })?;

        if let Some(ty) = cast {
            let operand = self.unary().map_err(Failure::strict)?;
            return operand
                .cast(ty)
                .map_err(|error| self.type_error(error, &location));
        }

        self.expect(Op::LeftParen)?;
        let inner = self.expression().map_err(Failure::strict)?;
        self.expect(Op::RightParen).map_err(Failure::strict)?;

        Ok(inner)
    }

    /// Tipo de un literal entero: el primero de la lista de candidatos,
    /// según base y sufijos, en el que cabe el valor.
    fn integer(&mut self, token: &Token, location: &Location) -> Parse<Expr> {
        let value = match token.value {
            Literal::Signed(value) => value as i128,
            Literal::Unsigned(value) => value as i128,
            _ => 0,
        };

        let decimal = !(token.lexeme.len() > 1 && token.lexeme.starts_with('0'));
        let unsigned = token.suffix.contains(Suffix::UNSIGNED);
        let widths = self.program.widths();

        let candidates: &[&str] = if token.suffix.contains(Suffix::SIZE) {
            match (unsigned, widths.long == widths.pointer) {
                (true, true) => &["unsigned long"],
                (true, false) => &["unsigned long long"],
                (false, true) => &["long"],
                (false, false) => &["long long"],
            }
        } else if token.suffix.contains(Suffix::LONG_LONG) {
            if unsigned {
                &["unsigned long long"]
            } else {
                &["long long", "unsigned long long"]
            }
        } else if token.suffix.contains(Suffix::LONG) {
            match (unsigned, decimal) {
                (true, _) => &["unsigned long", "unsigned long long"],
                (false, true) => &["long", "long long", "unsigned long long"],
                (false, false) => &["long", "unsigned long", "long long", "unsigned long long"],
            }
        } else {
            match (unsigned, decimal) {
                (true, _) => &["unsigned int", "unsigned long", "unsigned long long"],
                (false, true) => &["int", "long", "long long", "unsigned long long"],
                (false, false) => &[
                    "int",
                    "unsigned int",
                    "long",
                    "unsigned long",
                    "long long",
                    "unsigned long long",
                ],
            }
        };

        let global = self.program.global();
        for name in candidates {
            let ty = self
                .program
                .resolve_type(global, name)
                .map_err(|error| self.type_error(error, location))?;

            if wrap(value, &ty) == value {
                return Ok(Expr::Integer { value, ty });
            }
        }

        let error = ParserError::Lexer(crate::lex::LexerError::IntOverflow);
        Err(Failure::Strict(Located::at(error, location.clone())))
    }

    /// Literales de cadena, concatenando los adyacentes.
    fn string(&mut self) -> Parse<Expr> {
        let mut bytes = Vec::new();
        while self.peek()?.kind == TokenKind::Str {
            if let Literal::Str(text) = self.next()?.value {
                bytes.extend_from_slice(text.as_bytes());
            }
        }

        let global = self.program.global();
        let location = self.location();
        let ty = self
            .program
            .resolve_type(global, "const char *")
            .map_err(|error| self.type_error(error, &location))?;

        Ok(Expr::Str {
            id: self.program.next_string(),
            bytes,
            ty,
        })
    }

    /// Referencia a variable, llamada o `nullptr`.
    fn name(&mut self) -> Parse<Expr> {
        let token = self.peek()?;
        if token.is_word("nullptr") {
            self.next()?;
            let ty = self.program.fundamental(Core::NullPtr);
            return Ok(Expr::Null { ty });
        }

        let (name, location) = match self.qualified_name()? {
            Some(name) => name,
            None => return self.fail(ParserError::ExpectedExpression(token.to_string())),
        };

        enum Found {
            Variable(crate::scope::VariableId),
            Function(FunctionId),
            Other(&'static str),
        }

        let scope = self.scope();
        let found = match self.program.lookup(scope, &name).map(|d| &d.item) {
            Some(Item::Variable(id)) => Found::Variable(*id),
            Some(Item::Function(id)) | Some(Item::Prototype(id)) => Found::Function(*id),
            Some(other) => Found::Other(other.describe()),
            None => return self.fail_at(ParserError::Undefined(name), &location),
        };

        match found {
            Found::Variable(variable) => {
                let ty = Rc::clone(&self.program.variable(variable).ty);
                Ok(Expr::Name { variable, ty })
            }

            Found::Function(function) => {
                if !self.peek()?.is(Op::LeftParen) {
                    return self.fail_at(ParserError::NotAVariable(name, "function"), &location);
                }

                self.next()?;
                self.call(function, &name).map_err(Failure::strict)
            }

            Found::Other(what) => self.fail_at(ParserError::NotAVariable(name, what), &location),
        }
    }

    /// Argumentos de una llamada, tras el `(`.
    fn call(&mut self, function: FunctionId, name: &str) -> Parse<Expr> {
        let prototype: Prototype = self.program.function(function).prototype.clone();
        let expected = prototype.arguments.len();

        let mut arguments = Vec::new();
        if !self.accept(Op::RightParen)? {
            loop {
                self.peek()?;
                let location = self.location();

                let argument = self.expression()?;
                let parameter = match prototype.arguments.get(arguments.len()) {
                    Some(parameter) => parameter,
                    None => {
                        let error = ParserError::TooManyArguments {
                            function: name.to_owned(),
                            expected,
                        };

                        return self.fail_at(error, &location);
                    }
                };

                let argument = self.convert(argument, &parameter.ty, &location).map_err(|error| {
                    let error = ParserError::ArgumentType {
                        index: arguments.len() + 1,
                        function: name.to_owned(),
                        error,
                    };

                    Failure::Strict(Located::at(error, location.clone()))
                })?;

                arguments.push(argument);
                if !self.accept(Op::Comma)? {
                    self.expect(Op::RightParen)?;
                    break;
                }
            }
        }

        if arguments.len() < expected {
            let error = ParserError::TooFewArguments {
                function: name.to_owned(),
                expected,
            };

            return self.fail(error);
        }

        Ok(Expr::Call {
            function,
            arguments,
            ty: prototype.returns,
        })
    }

    /// Nombre posiblemente calificado: `a`, `a::b` o `::a::b`.
    ///
    /// Se lee por medio de un escaneo virtual, de modo que el cursor solo
    /// avanza si el nombre está bien formado.
    pub(super) fn qualified_name(&mut self) -> Parse<Option<(String, Location)>> {
        let mut scan = self.scanner.virtual_scan();
        let (first, _) = scan.peek()?;

        let start = first.span.start;
        let mut end;
        let mut name = String::new();

        if first.is(Op::Scope) {
            scan.consume()?;
            name.push_str("::");
        }

        loop {
            let token = scan.consume()?;
            if token.kind != TokenKind::Identifier || super::is_reserved(&token.lexeme) {
                return Ok(None);
            }

            name.push_str(&token.lexeme);
            end = token.span.end;

            let (separator, after) = scan.peek()?;
            if !separator.is(Op::Scope) {
                break;
            }

            // `a::` solo continúa si le sigue otro identificador
            let (segment, _) = scan.peek_at(after)?;
            if segment.kind != TokenKind::Identifier {
                break;
            }

            scan.consume()?;
            name.push_str("::");
        }

        let location = scan.location(start..end);
        scan.keep();

        Ok(Some((name, location)))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{BinaryOp, Expr},
        parse::parse,
        program::Program,
        scope::Item,
        source::Source,
        target::{DataModel, Platform, Target},
    };

    fn returned(text: &str, model: DataModel) -> Expr {
        let mut program = Program::new(Target::new(model, Platform::Linux));
        parse(Source::new("test.c", text), &mut program).unwrap();

        let main = match program.lookup(program.global(), "main").map(|d| &d.item) {
            Some(Item::Function(id)) => *id,
            other => panic!("unexpected {:?}", other),
        };

        let body = program.function(main).body;
        match program.scope(body).statements().last() {
            Some(Expr::Return(Some(value))) => (**value).clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn multiplication_binds_tighter() {
        match returned("int main() { return 1 + 2 * 3; }", DataModel::Lp64) {
            Expr::Binary { op, rhs, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
            }

            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn subtraction_associates_left() {
        match returned("int main() { return 8 - 4 - 2; }", DataModel::Lp64) {
            Expr::Binary { op, lhs, .. } => {
                assert_eq!(op, BinaryOp::Sub);
                assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Sub, .. }));
            }

            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn assignment_associates_right() {
        let text = "int main() { int a; int b; return a = b = 3; }";
        match returned(text, DataModel::Lp64) {
            Expr::Assign { value, .. } => assert!(matches!(*value, Expr::Assign { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn literal_types_follow_suffixes_and_magnitude() {
        let ty = |text: &str, model| {
            let text = format!("int main() {{ {}; return 0; }}", text);
            let mut program = Program::new(Target::new(model, Platform::Linux));
            parse(Source::new("test.c", text), &mut program).unwrap();

            let main = match program.lookup(program.global(), "main").map(|d| &d.item) {
                Some(Item::Function(id)) => *id,
                other => panic!("unexpected {:?}", other),
            };

            let body = program.function(main).body;
            match &program.scope(body).statements()[0] {
                Expr::Integer { ty, .. } => ty.name().to_owned(),
                other => panic!("unexpected {:?}", other),
            }
        };

        assert_eq!(ty("1", DataModel::Lp64), "int");
        assert_eq!(ty("1u", DataModel::Lp64), "unsigned int");
        assert_eq!(ty("1ul", DataModel::Lp64), "unsigned long");
        assert_eq!(ty("1ll", DataModel::Lp64), "long long");
        assert_eq!(ty("3000000000", DataModel::Lp64), "long");
        assert_eq!(ty("3000000000", DataModel::Llp64), "long long");
        assert_eq!(ty("0xFFFFFFFF", DataModel::Lp64), "unsigned int");
        assert_eq!(ty("'a'", DataModel::Lp64), "char");
    }

    #[test]
    fn casts_and_parentheses() {
        match returned("int main() { return (int) (1 + 2) * 3; }", DataModel::Lp64) {
            Expr::Binary { op, lhs, .. } => {
                assert_eq!(op, BinaryOp::Mul);
                assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Add, .. }));
            }

            other => panic!("unexpected {:?}", other),
        }

        match returned("int main() { return (char) 300; }", DataModel::Lp64) {
            Expr::Cast { operand, .. } => assert!(matches!(*operand, Expr::Cast { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn qualified_calls() {
        let text = "namespace m { int one() { return 1; } }\n\
                    int one() { return 2; }\n\
                    int main() { return m::one() + ::one(); }";

        match returned(text, DataModel::Lp64) {
            Expr::Binary { lhs, rhs, .. } => {
                assert!(matches!(*lhs, Expr::Call { .. }));
                assert!(matches!(*rhs, Expr::Call { .. }));
            }

            other => panic!("unexpected {:?}", other),
        }
    }
}

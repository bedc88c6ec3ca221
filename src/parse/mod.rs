//! Análisis sintáctico.
//!
//! El parser es descendente recursivo para sentencias y declaraciones y
//! usa ascenso por precedencia para expresiones (ver [`expr`]). Consume
//! tokens del [`Scanner`] bajo demanda y puebla el árbol de ámbitos de
//! [`Program`] a medida que avanza: la resolución de nombres ocurre
//! durante el parsing, no en una fase posterior.
//!
//! # Producciones especulativas
//! Cada sentencia se reconoce probando alternativas en orden. Una
//! alternativa que falla con [`Failure::Weak`] se revierte por completo:
//! se restaura el cursor del scanner y se truncan las listas del ámbito
//! actual a sus longitudes previas. Al cruzar un punto de compromiso
//! (por ejemplo, el `=` de una declaración) los errores subsecuentes se
//! elevan a [`Failure::Strict`] y abortan el parsing.

mod decl;
mod expr;

use std::rc::Rc;

use log::trace;
use thiserror::Error;

use crate::{
    ast::Expr,
    lex::{LexerError, Literal, Op, Scanner, Suffix, Token, TokenKind},
    program::Program,
    scope::{FunctionId, Marks, ScopeId, ScopeKind},
    source::{Located, Location, Source},
    types::{Type, TypeError, TYPE_WORDS},
};

/// Palabras que no pueden usarse como identificadores.
const RESERVED: &[&str] = &[
    "return",
    "if",
    "else",
    "typedef",
    "using",
    "namespace",
    "static_assert",
    "export",
    "nullptr",
];

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Expected an expression, found {0}")]
    ExpectedExpression(String),

    #[error("Use of undeclared name `{0}`")]
    Undefined(String),

    #[error("`{0}` names a {1}, not a value")]
    NotAVariable(String, &'static str),

    #[error("Too many arguments in call to `{function}`, expected {expected}")]
    TooManyArguments { function: String, expected: usize },

    #[error("Too few arguments in call to `{function}`, expected {expected}")]
    TooFewArguments { function: String, expected: usize },

    #[error("Argument {index} of `{function}`: {error}")]
    ArgumentType {
        index: usize,
        function: String,
        error: TypeError,
    },

    #[error("Redefinition of `{0}`")]
    Redefinition(String),

    #[error("Static assertion failed{0}")]
    StaticAssertFailed(String),

    #[error("{0} is not allowed here")]
    NotAllowedHere(&'static str),

    #[error("Operator `{0}` is not supported")]
    UnsupportedOperator(Op),
}

impl ParserError {
    /// Etiqueta de la categoría del error, para [`crate::error::Diagnostics`].
    pub fn kind(&self) -> &'static str {
        use ParserError::*;

        match self {
            Lexer(_) => "Lexical error",
            Type(_) | ArgumentType { .. } | TooManyArguments { .. } | TooFewArguments { .. } => {
                "Type error"
            }

            Undefined(_) | NotAVariable(..) | Redefinition(_) => "Name resolution error",
            _ => "Syntax error",
        }
    }
}

/// Construye el árbol de ámbitos de `program` a partir de `source`.
pub fn parse(source: Rc<Source>, program: &mut Program) -> Result<(), Located<ParserError>> {
    let global = program.global();
    let mut parser = Parser {
        scanner: Scanner::new(source),
        token: Token {
            kind: TokenKind::Eof,
            lexeme: "".into(),
            span: 0..0,
            value: Literal::Empty,
            suffix: Suffix::empty(),
        },
        scopes: vec![global],
        functions: Vec::new(),
        program,
    };

    parser.statements(None).map_err(Failure::coerce)
}

struct Parser<'a> {
    scanner: Scanner,
    token: Token,
    scopes: Vec<ScopeId>,
    functions: Vec<FunctionId>,
    program: &'a mut Program,
}

enum Failure {
    Weak(Located<ParserError>),
    Strict(Located<ParserError>),
}

impl Failure {
    fn strict(self) -> Self {
        Failure::Strict(self.coerce())
    }

    fn coerce(self) -> Located<ParserError> {
        match self {
            Failure::Weak(error) => error,
            Failure::Strict(error) => error,
        }
    }
}

impl From<Located<LexerError>> for Failure {
    fn from(error: Located<LexerError>) -> Self {
        Failure::Strict(error.map(ParserError::Lexer))
    }
}

type Parse<T> = Result<T, Failure>;

type Rule<'a> = fn(&mut Parser<'a>) -> Parse<Vec<Expr>>;

/// Estado necesario para revertir una producción.
struct Checkpoint {
    cursor: usize,
    token: Token,
    scope: ScopeId,
    marks: Marks,
    depth: usize,
    functions: usize,
}

impl<'a> Parser<'a> {
    /// Sentencias hasta `closing`, o hasta el fin de la entrada si es `None`.
    fn statements(&mut self, closing: Option<Op>) -> Parse<()> {
        loop {
            let token = self.peek()?;
            match closing {
                Some(op) if token.is(op) => {
                    self.next()?;
                    break Ok(());
                }

                Some(op) if token.is_eof() => {
                    break self
                        .fail(ParserError::UnexpectedToken {
                            expected: format!("`{}`", op),
                            found: token.to_string(),
                        })
                        .map_err(Failure::strict);
                }

                None if token.is_eof() => break Ok(()),
                _ => (),
            }

            let scope = self.scope();
            for statement in self.statement()? {
                self.program.scope_mut(scope).add_statement(statement);
            }
        }
    }

    /// Prueba cada alternativa de sentencia en orden de prioridad.
    ///
    /// Si todas fallan débilmente se reporta el error de la alternativa
    /// que llegó más lejos en la entrada.
    fn statement(&mut self) -> Parse<Vec<Expr>> {
        let rules: [(&str, Rule<'a>); 10] = [
            ("empty statement", Parser::empty),
            ("block", Parser::block),
            ("static assertion", Parser::static_assertion),
            ("type alias", Parser::type_alias),
            ("namespace", Parser::namespace),
            ("declaration", Parser::declaration),
            ("function", Parser::function),
            ("return", Parser::return_statement),
            ("if", Parser::if_statement),
            ("expression statement", Parser::expression_statement),
        ];

        let mut furthest: Option<Located<ParserError>> = None;
        for &(name, rule) in rules.iter() {
            match self.attempt(rule) {
                Err(Failure::Weak(error)) => {
                    trace!("{} rejected: {}", name, error);

                    let start = error.location().bytes().start;
                    let further = furthest
                        .as_ref()
                        .map_or(true, |best| start >= best.location().bytes().start);

                    if further {
                        furthest = Some(error);
                    }
                }

                result => return result,
            }
        }

        match furthest {
            Some(error) => Err(Failure::Strict(error)),
            None => self.fail(ParserError::ExpectedExpression(self.token.to_string())),
        }
    }

    fn empty(&mut self) -> Parse<Vec<Expr>> {
        self.expect(Op::Semicolon)?;

        if self.at_file_scope() {
            Ok(Vec::new())
        } else {
            Ok(vec![Expr::Empty])
        }
    }

    fn block(&mut self) -> Parse<Vec<Expr>> {
        self.expect(Op::LeftBrace)?;
        if self.at_file_scope() {
            return self.fail(ParserError::NotAllowedHere("Block")).map_err(Failure::strict);
        }

        let scope = self.program.add_child_scope(self.scope(), "", ScopeKind::Block);
        self.scoped(scope, |parser| parser.statements(Some(Op::RightBrace)))?;

        Ok(vec![Expr::Block(scope)])
    }

    fn return_statement(&mut self) -> Parse<Vec<Expr>> {
        self.keyword("return")?;
        self.return_value().map_err(Failure::strict)
    }

    fn return_value(&mut self) -> Parse<Vec<Expr>> {
        let function = match self.functions.last() {
            Some(&function) => function,
            None => return self.fail(ParserError::NotAllowedHere("Return statement")),
        };

        let returns = Rc::clone(&self.program.function(function).prototype.returns);
        if self.accept(Op::Semicolon)? {
            if !returns.is_void() {
                let error = TypeError::IncompatibleCast {
                    from: String::from("void"),
                    to: returns.name().to_owned(),
                };

                return self.fail(error.into());
            }

            return Ok(vec![Expr::Return(None)]);
        }

        self.peek()?;
        let location = self.location();

        let value = self.expression()?;
        let void = returns.is_void() && value.result_type().map_or(false, |ty| ty.is_void());

        // `return g();` con `g` de tipo `void` es válido en una función `void`
        let value = if void {
            value
        } else {
            self.convert(value, &returns, &location)
                .map_err(|error| self.type_error(error, &location))?
        };

        self.expect(Op::Semicolon)?;
        Ok(vec![Expr::Return(Some(Box::new(value)))])
    }

    fn if_statement(&mut self) -> Parse<Vec<Expr>> {
        self.keyword("if")?;
        self.conditional().map_err(Failure::strict)
    }

    fn conditional(&mut self) -> Parse<Vec<Expr>> {
        if self.at_file_scope() {
            return self.fail(ParserError::NotAllowedHere("If statement"));
        }

        self.expect(Op::LeftParen)?;
        self.peek()?;
        let location = self.location();

        let condition = self.expression()?;
        let condition_type = self.program.fundamental(crate::types::Core::Condition);
        let condition = condition
            .cast(condition_type)
            .map_err(|error| self.type_error(error, &location))?;

        self.expect(Op::RightParen)?;

        let then = self.branch()?;
        let otherwise = if self.peek()?.is_word("else") {
            self.next()?;
            self.branch()?
        } else {
            None
        };

        Ok(vec![Expr::If {
            condition: Box::new(condition),
            then,
            otherwise,
        }])
    }

    /// Cuerpo de una rama. Un `;` solo produce una rama vacía.
    fn branch(&mut self) -> Parse<Option<ScopeId>> {
        if self.accept(Op::Semicolon)? {
            return Ok(None);
        }

        let scope = self.program.add_child_scope(self.scope(), "", ScopeKind::Block);
        self.scoped(scope, |parser| {
            if parser.accept(Op::LeftBrace)? {
                parser.statements(Some(Op::RightBrace))
            } else {
                for statement in parser.statement()? {
                    parser.program.scope_mut(scope).add_statement(statement);
                }

                Ok(())
            }
        })?;

        Ok(Some(scope))
    }

    fn expression_statement(&mut self) -> Parse<Vec<Expr>> {
        self.peek()?;
        if self.at_file_scope() {
            return self.fail(ParserError::NotAllowedHere("Expression statement"));
        }

        let expr = self.expression()?;
        self.expect(Op::Semicolon).map_err(Failure::strict)?;

        Ok(vec![expr])
    }

    /// Ejecuta `rule` con `scope` como ámbito actual.
    fn scoped<T, F>(&mut self, scope: ScopeId, rule: F) -> Parse<T>
    where
        F: FnOnce(&mut Self) -> Parse<T>,
    {
        self.scopes.push(scope);
        let result = rule(self);
        self.scopes.pop();

        result
    }

    fn scope(&self) -> ScopeId {
        match self.scopes.last() {
            Some(&scope) => scope,
            None => self.program.global(),
        }
    }

    fn at_file_scope(&self) -> bool {
        matches!(
            self.program.scope(self.scope()).kind(),
            ScopeKind::Global | ScopeKind::Namespace
        )
    }

    /// Conversión implícita con advertencia ante pérdida de información.
    fn convert(&self, expr: Expr, ty: &Rc<Type>, location: &Location) -> Result<Expr, TypeError> {
        if expr.narrows_to(ty) {
            if let Ok(from) = expr.result_type() {
                log::warn!(
                    "{}: implicit conversion from `{}` to `{}` may change the value",
                    location,
                    from,
                    ty
                );
            }
        }

        expr.convert(ty)
    }

    fn type_error(&self, error: TypeError, location: &Location) -> Failure {
        Failure::Strict(Located::at(ParserError::Type(error), location.clone()))
    }

    fn optional<T, F>(&mut self, rule: F) -> Parse<Option<T>>
    where
        F: FnOnce(&mut Self) -> Parse<T>,
    {
        match self.attempt(rule) {
            Err(Failure::Weak(_)) => Ok(None),
            result => Ok(Some(result?)),
        }
    }

    fn attempt<T, F>(&mut self, rule: F) -> Parse<T>
    where
        F: FnOnce(&mut Self) -> Parse<T>,
    {
        let checkpoint = self.checkpoint();

        let result = rule(self);
        if let Err(Failure::Weak(_)) = result {
            self.rollback(checkpoint);
        }

        result
    }

    fn checkpoint(&self) -> Checkpoint {
        let scope = self.scope();

        Checkpoint {
            cursor: self.scanner.cursor(),
            token: self.token.clone(),
            scope,
            marks: self.program.scope(scope).marks(),
            depth: self.scopes.len(),
            functions: self.functions.len(),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        trace!("rolling back to byte {}", checkpoint.cursor);

        self.scanner.seek(checkpoint.cursor);
        self.token = checkpoint.token;
        self.program.scope_mut(checkpoint.scope).truncate(checkpoint.marks);
        self.scopes.truncate(checkpoint.depth);
        self.functions.truncate(checkpoint.functions);
    }

    fn keyword(&mut self, word: &str) -> Parse<Token> {
        let token = self.next()?;
        if token.is_word(word) {
            Ok(token)
        } else {
            self.fail(ParserError::UnexpectedToken {
                expected: format!("`{}`", word),
                found: token.to_string(),
            })
        }
    }

    fn identifier(&mut self) -> Parse<(Rc<str>, Location)> {
        let token = self.next()?;
        if token.kind == TokenKind::Identifier && !is_reserved(&token.lexeme) {
            Ok((token.lexeme, self.location()))
        } else {
            self.fail(ParserError::UnexpectedToken {
                expected: String::from("identifier"),
                found: token.to_string(),
            })
        }
    }

    /// Consume el siguiente token solo si es `op`.
    fn accept(&mut self, op: Op) -> Parse<bool> {
        if self.peek()?.is(op) {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, op: Op) -> Parse<Token> {
        let token = self.next()?;
        if token.is(op) {
            Ok(token)
        } else {
            self.fail(ParserError::UnexpectedToken {
                expected: format!("`{}`", op),
                found: token.to_string(),
            })
        }
    }

    fn peek(&mut self) -> Parse<Token> {
        let (token, _) = self.scanner.peek()?;
        self.token = token.clone();

        Ok(token)
    }

    fn next(&mut self) -> Parse<Token> {
        let token = self.scanner.consume()?;
        self.token = token.clone();

        Ok(token)
    }

    /// Ubicación del último token observado.
    fn location(&self) -> Location {
        self.scanner.location(self.token.span.clone())
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Failure::Weak(Located::at(error, self.location())))
    }

    fn fail_at<T>(&self, error: ParserError, location: &Location) -> Parse<T> {
        Err(Failure::Weak(Located::at(error, location.clone())))
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word) || TYPE_WORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        scope::{Item, Storage},
        target::Target,
    };

    fn parse_str(text: &str) -> Result<Program, Located<ParserError>> {
        let mut program = Program::new(Target::default());
        parse(Source::new("test.c", text), &mut program)?;

        Ok(program)
    }

    fn function(program: &Program, name: &str) -> FunctionId {
        match program.lookup(program.global(), name).map(|d| &d.item) {
            Some(Item::Function(id)) => *id,
            other => panic!("`{}` is not a defined function: {:?}", name, other),
        }
    }

    #[test]
    fn declaration_or_expression() {
        let program = parse_str("int main() { int x = 1; x = 2; return x; }").unwrap();
        let main = program.function(function(&program, "main"));
        let body = program.scope(main.body);

        assert_eq!(body.statements().len(), 3);
        assert!(matches!(body.statements()[0], Expr::Declare { .. }));
        assert!(matches!(body.statements()[1], Expr::Assign { .. }));
        assert!(matches!(body.statements()[2], Expr::Return(Some(_))));
    }

    #[test]
    fn missing_initializer_is_fatal() {
        let error = parse_str("int x = ;").unwrap_err();

        assert!(matches!(error.val(), ParserError::ExpectedExpression(_)));
        assert_eq!(error.location().start().line(), 1);
        assert_eq!(error.location().start().column(), 9);
    }

    #[test]
    fn nesting_depth_matches_braces() {
        let program = parse_str("void f() { { { ; } } { } }").unwrap();
        let f = program.function(function(&program, "f"));

        let outer = program.scope(f.body).children();
        assert_eq!(outer.len(), 2);

        let inner = program.scope(outer[0]).children();
        assert_eq!(inner.len(), 1);
        assert!(program.scope(inner[0]).children().is_empty());
        assert_eq!(program.scope(inner[0]).kind(), ScopeKind::Block);
    }

    #[test]
    fn unterminated_block() {
        let error = parse_str("int main() { {").unwrap_err();
        assert!(matches!(error.val(), ParserError::UnexpectedToken { .. }));
    }

    #[test]
    fn shadowing_in_nested_blocks() {
        let program = parse_str("int x; void f() { long x; { char x; x = 1; } }").unwrap();
        let f = program.function(function(&program, "f"));

        let block = program.scope(f.body).children()[0];
        match &program.scope(block).statements()[1] {
            Expr::Assign { target, .. } => match &**target {
                Expr::Name { ty, variable } => {
                    assert_eq!(ty.name(), "char");
                    assert_eq!(program.variable(*variable).storage, Storage::Local);
                }

                other => panic!("unexpected {:?}", other),
            },

            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn prototypes_are_completed_once() {
        let program = parse_str("int f(int); int f(int a) { return a; }").unwrap();
        let f = program.function(function(&program, "f"));

        assert!(f.defined);
        assert_eq!(f.prototype.arguments[0].name.as_deref(), Some("a"));

        let error = parse_str("int f() { return 0; } int f() { return 1; }").unwrap_err();
        assert!(matches!(error.val(), ParserError::Redefinition(_)));

        let error = parse_str("int f(int); long f(int);").unwrap_err();
        assert!(matches!(error.val(), ParserError::Redefinition(_)));
    }

    #[test]
    fn intrinsics_cannot_be_defined() {
        let error = parse_str("void print(int x) { }").unwrap_err();
        assert!(matches!(error.val(), ParserError::Redefinition(name) if name == "print"));
    }

    #[test]
    fn argument_checking() {
        let error = parse_str("int main() { print(1, 2); }").unwrap_err();
        assert!(matches!(error.val(), ParserError::TooManyArguments { expected: 1, .. }));

        let error = parse_str("int main() { print(); }").unwrap_err();
        assert!(matches!(error.val(), ParserError::TooFewArguments { expected: 1, .. }));

        let error = parse_str("int main() { int x; free(x); }").unwrap_err();
        assert!(matches!(error.val(), ParserError::ArgumentType { index: 1, .. }));
    }

    #[test]
    fn names_must_resolve() {
        let error = parse_str("int main() { return y; }").unwrap_err();
        assert!(matches!(error.val(), ParserError::Undefined(name) if name == "y"));
        assert_eq!(error.val().kind(), "Name resolution error");
    }

    #[test]
    fn const_targets_are_read_only() {
        let error = parse_str("int main() { const int x = 1; x = 2; }").unwrap_err();
        assert!(matches!(error.val(), ParserError::Type(TypeError::ReadOnly(_))));
    }

    #[test]
    fn static_assertions() {
        assert!(parse_str("static_assert(1 + 1 == 2);").is_ok());

        let error = parse_str("static_assert(2 < 1, \"ordering\");").unwrap_err();
        assert_eq!(error.val().to_string(), "Static assertion failed: ordering");

        let error = parse_str("int x; static_assert(x);").unwrap_err();
        assert!(matches!(error.val(), ParserError::Type(TypeError::NotConstant)));
    }

    #[test]
    fn namespaces_and_aliases() {
        let program = parse_str(
            "namespace n { typedef unsigned long size; int f() { return 0; } }\n\
             namespace n { using word = const size *; }\n\
             n::word g() { return nullptr; }",
        )
        .unwrap();

        let g = program.function(function(&program, "g"));
        assert_eq!(g.prototype.returns.name(), "const unsigned long *");
        assert!(program.lookup(program.global(), "n::f").is_some());
    }

    #[test]
    fn statements_outside_functions() {
        let error = parse_str("return 0;").unwrap_err();
        assert!(matches!(error.val(), ParserError::NotAllowedHere(_)));

        let error = parse_str("int x; x = 1;").unwrap_err();
        assert!(matches!(error.val(), ParserError::NotAllowedHere(_)));
    }

    #[test]
    fn unsupported_operators() {
        let error = parse_str("int main() { int a; int b; return a && b; }").unwrap_err();
        assert!(matches!(error.val(), ParserError::UnsupportedOperator(Op::LogicalAnd)));
    }

    #[test]
    fn global_initializers_must_be_constant() {
        assert!(parse_str("int x = 2 * 21; const char *s = \"hi\";").is_ok());

        let error = parse_str("int f() { return 1; } int x = f();").unwrap_err();
        assert!(matches!(error.val(), ParserError::Type(TypeError::NotConstant)));
    }

    #[test]
    fn local_prototypes_bind_to_file_scope() {
        let program = parse_str("namespace n { int f() { int g(int); { int g(int); } return g(1); } }").unwrap();
        match program.lookup(program.global(), "n::g").map(|d| &d.item) {
            Some(Item::Prototype(id)) => assert_eq!(program.mangled_name(program.function(*id).scope, "g"), "n::g"),
            other => panic!("unexpected {:?}", other),
        }

        let program = parse_str("int f() { int g(int); return g(1); } int g(int a) { return a; }").unwrap();
        let f = program.function(function(&program, "f"));
        let g = function(&program, "g");

        assert_eq!(program.function(g).scope, program.global());
        match program.scope(f.body).find_local("g").map(|d| &d.item) {
            Some(Item::Prototype(id)) => assert_eq!(*id, g),
            other => panic!("unexpected {:?}", other),
        }

        let error = parse_str("int f() { int g; int g(int); return 0; }").unwrap_err();
        assert!(matches!(error.val(), ParserError::Redefinition(name) if name == "g"));

        let error = parse_str("int g(int a) { return a; } int f() { long g(int); return 0; }").unwrap_err();
        assert!(matches!(error.val(), ParserError::Redefinition(name) if name == "g"));
    }

    #[test]
    fn void_calls_can_be_returned() {
        let program = parse_str("void g() { } void f() { return g(); }").unwrap();
        let f = program.function(function(&program, "f"));

        match &program.scope(f.body).statements()[0] {
            Expr::Return(Some(value)) => assert!(matches!(**value, Expr::Call { .. })),
            other => panic!("unexpected {:?}", other),
        }

        let error = parse_str("void g() { } int f() { return g(); }").unwrap_err();
        assert!(matches!(error.val(), ParserError::Type(_)));
    }

    #[test]
    fn null_pointer_type_is_qualified() {
        let program = parse_str("::std::nullptr_t g; int main() { std::nullptr_t p = nullptr; return 0; }").unwrap();

        match program.lookup(program.global(), "g").map(|d| &d.item) {
            Some(Item::Variable(g)) => assert!(program.variable(*g).ty.is_null()),
            other => panic!("unexpected {:?}", other),
        }

        assert!(parse_str("int main() { nullptr_t p; return 0; }").is_err());
    }
}

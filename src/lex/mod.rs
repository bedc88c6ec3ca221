//! Análisis léxico.
//!
//! # Escaneo
//! Esta es la primera fase del compilador. El [`Scanner`] recorre un búfer
//! de código fuente con un cursor de bytes y produce tokens bajo demanda.
//! [`Scanner::peek`] construye el siguiente token sin avanzar y reporta
//! la posición que resultaría de aceptarlo; [`Scanner::consume`] confirma
//! el avance. Los espacios en blanco y los comentarios se descartan.
//!
//! # Orden de reconocimiento
//! Siempre gana la coincidencia más larga, en este orden:
//! 1. literales (ver [`literal`]),
//! 2. operadores: se extiende el lexema mientras algún operador de la
//!    tabla lo tenga como prefijo, retrocediendo luego al operador exacto
//!    más largo,
//! 3. identificadores.
//!
//! Las palabras clave no se distinguen aquí, con la excepción de `true`
//! y `false`, que son literales. El parser decide qué significa cada
//! identificador.
//!
//! # Escaneo virtual
//! [`Scanner::virtual_scan`] toma una instantánea del cursor. Al salir de
//! alcance, la instantánea restaura el cursor a menos que se haya marcado
//! con [`VirtualScan::keep`].

pub mod literal;
pub mod op;

pub use literal::{Literal, LiteralKind, Suffix};
pub use op::{Associativity, Op, OperatorTrait};

use crate::source::{Located, Location, Source};
use log::trace;
use std::{
    fmt::{self, Display},
    ops::{Deref, DerefMut, Range},
    rc::Rc,
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Literal numérico mal formado.
    #[error("Malformed numeric literal `{0}`")]
    BadNumber(String),

    /// Una constante entera no cabe en 64 bits.
    #[error("Integer literal overflow, valid range is [0, 18446744073709551615]")]
    IntOverflow,

    /// Secuencia de escape fuera de la tabla.
    #[error("Unknown escape sequence `\\{0}`")]
    BadEscape(char),

    #[error("Empty character literal")]
    EmptyChar,

    /// Literal de carácter o cadena sin cerrar.
    #[error("Missing terminating {0:?}")]
    Unterminated(char),

    #[error("Unterminated block comment")]
    UnterminatedComment,
}

/// Categoría léxica.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Integer,
    Character,
    Float,
    Bool,
    Str,
    Operator(Op),
    Eof,
}

/// Objeto resultante del análisis léxico.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Rc<str>,
    pub span: Range<usize>,
    pub value: Literal,
    pub suffix: Suffix,
}

impl Token {
    fn new(kind: TokenKind, text: &str, span: Range<usize>) -> Self {
        Token {
            kind,
            lexeme: text[span.clone()].into(),
            span,
            value: Literal::Empty,
            suffix: Suffix::empty(),
        }
    }

    /// Identidad de operador, si lo es.
    pub fn op(&self) -> Option<Op> {
        match self.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// Determina si el token es el operador `op`.
    pub fn is(&self, op: Op) -> bool {
        self.op() == Some(op)
    }

    /// Determina si el token es el identificador `word`.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && &*self.lexeme == word
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;

        match self.kind {
            Identifier => write!(fmt, "identifier `{}`", self.lexeme),
            Integer | Character | Float | Bool | Str => write!(fmt, "literal `{}`", self.lexeme),
            Operator(op) => write!(fmt, "`{}`", op),
            Eof => fmt.write_str("end of input"),
        }
    }
}

/// Cursor sobre un origen.
#[derive(Clone)]
pub struct Scanner {
    source: Rc<Source>,
    cursor: usize,
}

impl Scanner {
    /// Crea un scanner al inicio del origen.
    pub fn new(source: Rc<Source>) -> Self {
        Scanner { source, cursor: 0 }
    }

    pub fn source(&self) -> &Rc<Source> {
        &self.source
    }

    /// Posición actual del cursor, en bytes.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Restaura el cursor a una posición previamente observada.
    pub fn seek(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// Construye una ubicación dentro del origen de este scanner.
    pub fn location(&self, span: Range<usize>) -> Location {
        Location::new(Rc::clone(&self.source), span)
    }

    /// Produce el siguiente token sin avanzar, junto al cursor que
    /// resultaría de consumirlo.
    pub fn peek(&self) -> Result<(Token, usize), Located<LexerError>> {
        self.peek_at(self.cursor)
    }

    /// Igual que [`Scanner::peek`], a partir de una posición arbitraria.
    pub fn peek_at(&self, at: usize) -> Result<(Token, usize), Located<LexerError>> {
        let text = self.source.text();
        let start = self.skip(at)?;
        let rest = &text[start..];

        let fail = |error, length: usize| Err(Located::at(error, self.location(start..start + length)));

        let first = match rest.chars().next() {
            Some(c) => c,
            None => return Ok((Token::new(TokenKind::Eof, text, start..start), start)),
        };

        match literal::scan(rest) {
            Ok(Some(scanned)) => {
                let end = start + scanned.length;
                let kind = match scanned.kind {
                    LiteralKind::Integer => TokenKind::Integer,
                    LiteralKind::Character => TokenKind::Character,
                    LiteralKind::Float => TokenKind::Float,
                    LiteralKind::Str => TokenKind::Str,
                };

                let token = Token {
                    value: scanned.value,
                    suffix: scanned.suffix,
                    ..Token::new(kind, text, start..end)
                };

                return Ok((token, end));
            }

            Err(error) => return fail(error, first.len_utf8()),
            Ok(None) => (),
        }

        // Extensión voraz mientras algún operador tenga el lexema como prefijo
        let mut extent = 0;
        while rest.get(..extent + 1).map_or(false, Op::is_prefix) {
            extent += 1;
        }

        let op = (1..=extent)
            .rev()
            .find_map(|length| Op::from_spelling(&rest[..length]).map(|op| (op, length)));

        if let Some((op, length)) = op {
            let end = start + length;
            return Ok((Token::new(TokenKind::Operator(op), text, start..end), end));
        }

        if first.is_ascii_alphabetic() || first == '_' {
            let length = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or_else(|| rest.len());

            let end = start + length;
            let mut token = Token::new(TokenKind::Identifier, text, start..end);

            match &*token.lexeme {
                "true" | "false" => {
                    token.value = Literal::Signed((&*token.lexeme == "true") as i64);
                    token.kind = TokenKind::Bool;
                }

                _ => (),
            }

            return Ok((token, end));
        }

        fail(LexerError::BadChar(first), first.len_utf8())
    }

    /// Consume el siguiente token.
    pub fn consume(&mut self) -> Result<Token, Located<LexerError>> {
        let (token, next) = self.peek()?;
        trace!("token {:?} {:?} at byte {}", token.kind, &*token.lexeme, token.span.start);

        self.cursor = next;
        Ok(token)
    }

    /// Inicia un escaneo especulativo.
    pub fn virtual_scan(&mut self) -> VirtualScan<'_> {
        VirtualScan {
            origin: self.cursor,
            scanner: self,
            kept: false,
        }
    }

    /// Reduce la entrada a una secuencia de tokens o a una secuencia de
    /// errores.
    ///
    /// Tras un error el scanner descarta el resto de la línea y continúa,
    /// con lo cual es posible reportar más de un error léxico por ejecución.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            match self.consume() {
                Ok(token) if token.is_eof() => break,
                Ok(token) => {
                    let location = self.location(token.span.clone());
                    tokens.push(Located::at(token, location));
                }

                Err(error) => {
                    let text = self.source.text();
                    let from = error.location().bytes().end;
                    self.cursor = text[from..].find('\n').map_or(text.len(), |end| from + end);

                    errors.push(error);
                }
            }
        }

        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(errors)
        }
    }

    /// Descarta espacios en blanco y comentarios.
    fn skip(&self, mut at: usize) -> Result<usize, Located<LexerError>> {
        let text = self.source.text();

        loop {
            let rest = &text[at..];
            let trimmed = rest.trim_start_matches(is_whitespace);
            at += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                at += trimmed.find('\n').unwrap_or_else(|| trimmed.len());
            } else if trimmed.starts_with("/*") {
                match trimmed[2..].find("*/") {
                    Some(end) => at += end + 4,
                    None => {
                        let location = self.location(at..at + 2);
                        break Err(Located::at(LexerError::UnterminatedComment, location));
                    }
                }
            } else {
                break Ok(at);
            }
        }
    }
}

/// Instantánea de cursor que se revierte al salir de alcance.
pub struct VirtualScan<'a> {
    scanner: &'a mut Scanner,
    origin: usize,
    kept: bool,
}

impl VirtualScan<'_> {
    /// Confirma el avance realizado durante la instantánea.
    pub fn keep(mut self) {
        self.kept = true;
    }
}

impl Deref for VirtualScan<'_> {
    type Target = Scanner;

    fn deref(&self) -> &Scanner {
        self.scanner
    }
}

impl DerefMut for VirtualScan<'_> {
    fn deref_mut(&mut self) -> &mut Scanner {
        self.scanner
    }
}

impl Drop for VirtualScan<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.scanner.cursor = self.origin;
        }
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(text: &str) -> Scanner {
        Scanner::new(Source::new("test.c", text))
    }

    fn kinds(text: &str) -> Vec<TokenKind> {
        scanner(text)
            .try_exhaustive()
            .unwrap()
            .into_iter()
            .map(|token| token.into_inner().kind)
            .collect()
    }

    #[test]
    fn peek_does_not_commit() {
        let mut scanner = scanner("  foo bar");
        let (token, next) = scanner.peek().unwrap();

        assert_eq!(&*token.lexeme, "foo");
        assert_eq!(token.span, 2..5);
        assert_eq!(next, 5);
        assert_eq!(scanner.cursor(), 0);

        scanner.consume().unwrap();
        assert_eq!(&*scanner.consume().unwrap().lexeme, "bar");
        assert!(scanner.consume().unwrap().is_eof());
    }

    #[test]
    fn longest_operator_wins() {
        use TokenKind::Operator;

        assert_eq!(
            kinds("a<<=b<=c<d"),
            vec![
                TokenKind::Identifier,
                Operator(Op::ShlAssign),
                TokenKind::Identifier,
                Operator(Op::LessEqual),
                TokenKind::Identifier,
                Operator(Op::Less),
                TokenKind::Identifier,
            ]
        );

        assert_eq!(kinds(".."), vec![Operator(Op::Period), Operator(Op::Period)]);
        assert_eq!(kinds("std::x"), vec![
            TokenKind::Identifier,
            Operator(Op::Scope),
            TokenKind::Identifier,
        ]);
    }

    #[test]
    fn comments_and_literals() {
        let tokens = scanner("// line\nx = /* block */ 'a' + \"s\" + 1.5 + true;")
            .try_exhaustive()
            .unwrap();

        let kinds: Vec<_> = tokens.iter().map(|token| token.val().kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Operator(Op::Assign),
                TokenKind::Character,
                TokenKind::Operator(Op::Plus),
                TokenKind::Str,
                TokenKind::Operator(Op::Plus),
                TokenKind::Float,
                TokenKind::Operator(Op::Plus),
                TokenKind::Bool,
                TokenKind::Operator(Op::Semicolon),
            ]
        );

        assert_eq!(tokens[0].location().start().line(), 2);
        assert_eq!(tokens[8].val().value, Literal::Signed(1));
    }

    #[test]
    fn bad_characters_are_located() {
        let errors = scanner("int x;\nint @y;\nint $z;")
            .try_exhaustive()
            .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0].val(), LexerError::BadChar('@')));
        assert_eq!(errors[0].location().start().line(), 2);
        assert_eq!(errors[0].location().start().column(), 5);
        assert_eq!(errors[1].location().start().line(), 3);
    }

    #[test]
    fn unterminated_comment() {
        let error = scanner("x /* forever").peek_at(1).unwrap_err();
        assert!(matches!(error.val(), LexerError::UnterminatedComment));
    }

    #[test]
    fn virtual_scan_restores_unless_kept() {
        let mut scanner = scanner("a b c");

        {
            let mut scan = scanner.virtual_scan();
            scan.consume().unwrap();
            scan.consume().unwrap();
        }

        assert_eq!(scanner.cursor(), 0);

        let mut scan = scanner.virtual_scan();
        scan.consume().unwrap();
        scan.keep();

        assert_eq!(scanner.cursor(), 1);
    }
}

//! Tabla de operadores.
//!
//! Cada operador del lenguaje tiene una grafía, una precedencia y una
//! asociatividad fijas. Los números de precedencia siguen la tabla
//! usual de C++: un número menor liga más fuerte. Los tokens de control
//! (`)`, `;`, `{`, ...) llevan la precedencia centinela [`SENTINEL`],
//! con lo cual ningún ciclo de precedencias los trata como binarios.

use std::fmt::{self, Display};

/// Precedencia de tokens de control.
pub const SENTINEL: u32 = 999;

/// Identidad de un operador.
///
/// El orden de las variantes coincide con el de [`OPERATORS`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Scope,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Period,
    Arrow,
    Increment,
    Decrement,
    Not,
    Tilde,
    Star,
    Slash,
    Percent,
    Plus,
    Minus,
    ShiftLeft,
    ShiftRight,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Ampersand,
    Caret,
    Pipe,
    LogicalAnd,
    LogicalOr,
    Question,
    Colon,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,
    Comma,
    Semicolon,
    Ellipsis,
}

/// Dirección de agrupamiento.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Associativity {
    LeftToRight,
    RightToLeft,
}

/// Entrada inmutable de la tabla de operadores.
#[derive(Debug)]
pub struct OperatorTrait {
    pub op: Op,
    pub spelling: &'static str,
    pub precedence: u32,
    pub associativity: Associativity,
}

impl Op {
    /// Entrada de tabla correspondiente.
    pub fn traits(self) -> &'static OperatorTrait {
        &OPERATORS[self as usize]
    }

    pub fn spelling(self) -> &'static str {
        self.traits().spelling
    }

    pub fn precedence(self) -> u32 {
        self.traits().precedence
    }

    pub fn associativity(self) -> Associativity {
        self.traits().associativity
    }

    /// Busca un operador por su grafía exacta.
    pub fn from_spelling(spelling: &str) -> Option<Op> {
        OPERATORS
            .iter()
            .find(|entry| entry.spelling == spelling)
            .map(|entry| entry.op)
    }

    /// Determina si algún operador comienza con `prefix`.
    pub fn is_prefix(prefix: &str) -> bool {
        OPERATORS
            .iter()
            .any(|entry| entry.spelling.starts_with(prefix))
    }
}

impl Display for Op {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.spelling())
    }
}

macro_rules! operators {
    ($($op:ident $spelling:literal $precedence:tt $assoc:ident),* $(,)?) => {
        /// Tabla completa de operadores, en el orden de [`Op`].
        pub static OPERATORS: &[OperatorTrait] = &[
            $(OperatorTrait {
                op: Op::$op,
                spelling: $spelling,
                precedence: $precedence,
                associativity: Associativity::$assoc,
            }),*
        ];
    };
}

#[rustfmt::skip]
operators! {
    Scope        "::"  1        LeftToRight,
    LeftParen    "("   SENTINEL LeftToRight,
    RightParen   ")"   SENTINEL LeftToRight,
    LeftBracket  "["   SENTINEL LeftToRight,
    RightBracket "]"   SENTINEL LeftToRight,
    LeftBrace    "{"   SENTINEL LeftToRight,
    RightBrace   "}"   SENTINEL LeftToRight,
    Period       "."   2        LeftToRight,
    Arrow        "->"  2        LeftToRight,
    Increment    "++"  2        LeftToRight,
    Decrement    "--"  2        LeftToRight,
    Not          "!"   3        RightToLeft,
    Tilde        "~"   3        RightToLeft,
    Star         "*"   5        LeftToRight,
    Slash        "/"   5        LeftToRight,
    Percent      "%"   5        LeftToRight,
    Plus         "+"   6        LeftToRight,
    Minus        "-"   6        LeftToRight,
    ShiftLeft    "<<"  7        LeftToRight,
    ShiftRight   ">>"  7        LeftToRight,
    Less         "<"   9        LeftToRight,
    LessEqual    "<="  9        LeftToRight,
    Greater      ">"   9        LeftToRight,
    GreaterEqual ">="  9        LeftToRight,
    Equal        "=="  10       LeftToRight,
    NotEqual     "!="  10       LeftToRight,
    Ampersand    "&"   11       LeftToRight,
    Caret        "^"   12       LeftToRight,
    Pipe         "|"   13       LeftToRight,
    LogicalAnd   "&&"  14       LeftToRight,
    LogicalOr    "||"  15       LeftToRight,
    Question     "?"   16       RightToLeft,
    Colon        ":"   SENTINEL LeftToRight,
    Assign       "="   16       RightToLeft,
    AddAssign    "+="  16       RightToLeft,
    SubAssign    "-="  16       RightToLeft,
    MulAssign    "*="  16       RightToLeft,
    DivAssign    "/="  16       RightToLeft,
    RemAssign    "%="  16       RightToLeft,
    ShlAssign    "<<=" 16       RightToLeft,
    ShrAssign    ">>=" 16       RightToLeft,
    AndAssign    "&="  16       RightToLeft,
    XorAssign    "^="  16       RightToLeft,
    OrAssign     "|="  16       RightToLeft,
    Comma        ","   17       LeftToRight,
    Semicolon    ";"   SENTINEL LeftToRight,
    Ellipsis     "..." SENTINEL LeftToRight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_follows_enum_order() {
        for (index, entry) in OPERATORS.iter().enumerate() {
            assert_eq!(entry.op as usize, index, "misplaced {:?}", entry.op);
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert!(Op::Star.precedence() < Op::Plus.precedence());
        assert!(Op::Plus.precedence() < Op::Less.precedence());
        assert!(Op::Equal.precedence() < Op::Assign.precedence());
        assert_eq!(Op::Assign.associativity(), Associativity::RightToLeft);
        assert_eq!(Op::Semicolon.precedence(), SENTINEL);
    }

    #[test]
    fn prefixes() {
        assert!(Op::is_prefix("<"));
        assert!(Op::is_prefix("<<"));
        assert!(Op::is_prefix(".."));
        assert!(!Op::is_prefix("@"));
        assert_eq!(Op::from_spelling("<<="), Some(Op::ShlAssign));
        assert_eq!(Op::from_spelling(".."), None);
    }
}

//! Gramáticas de literales.
//!
//! Se reconocen enteros decimales, octales y hexadecimales (con sufijos
//! `u`, `l`, `ll` y `z`), flotantes de la forma `dígitos.dígitos`,
//! literales de carácter y literales de cadena. Los valores se
//! decodifican una única vez durante el escaneo.

use bitflags::bitflags;

use super::LexerError;

/// Valor decodificado de un token.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Empty,
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Str(String),
}

impl Default for Literal {
    fn default() -> Self {
        Literal::Empty
    }
}

bitflags! {
    /// Sufijos de literales enteros.
    #[derive(Default)]
    pub struct Suffix: u8 {
        const UNSIGNED  = 0b0001;
        const LONG      = 0b0010;
        const LONG_LONG = 0b0100;
        const SIZE      = 0b1000;
    }
}

/// Clase de literal reconocido.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LiteralKind {
    Integer,
    Character,
    Float,
    Str,
}

/// Resultado de un escaneo exitoso de literal.
#[derive(Clone, Debug, PartialEq)]
pub struct Scanned {
    pub kind: LiteralKind,
    pub value: Literal,
    pub suffix: Suffix,
    pub length: usize,
}

/// Tabla de secuencias de escape.
const ESCAPES: &[(char, u8)] = &[
    ('\'', b'\''),
    ('"', b'"'),
    ('?', b'?'),
    ('\\', b'\\'),
    ('a', 0x07),
    ('b', 0x08),
    ('f', 0x0c),
    ('n', b'\n'),
    ('r', b'\r'),
    ('t', b'\t'),
    ('v', 0x0b),
    ('0', 0x00),
];

/// Intenta reconocer un literal al inicio de `text`.
///
/// `Ok(None)` indica que `text` no comienza con ningún literal.
pub fn scan(text: &str) -> Result<Option<Scanned>, LexerError> {
    let bytes = text.as_bytes();
    match bytes.first() {
        Some(b'0'..=b'9') => number(text).map(Some),
        Some(b'\'') => character(text).map(Some),
        Some(b'"') => string(text).map(Some),
        _ => Ok(None),
    }
}

/// Decodifica un escape sin la barra inicial.
pub fn escape(c: char) -> Option<u8> {
    ESCAPES
        .iter()
        .find(|&&(escape, _)| escape == c)
        .map(|&(_, byte)| byte)
}

fn number(text: &str) -> Result<Scanned, LexerError> {
    let bytes = text.as_bytes();
    let digits = |from: usize, radix: u32| {
        text[from..]
            .chars()
            .take_while(|c| c.is_digit(radix))
            .count()
            + from
    };

    // Flotantes: dígitos, punto y al menos un dígito más
    let integral = digits(0, 10);
    if bytes.get(integral) == Some(&b'.') {
        let fraction = digits(integral + 1, 10);
        if fraction > integral + 1 {
            let value = text[..fraction]
                .parse::<f64>()
                .map_err(|_| LexerError::BadNumber(text[..fraction].to_owned()))?;

            return finish(text, fraction, || {
                Ok((LiteralKind::Float, Literal::Float(value), Suffix::empty()))
            });
        }
    }

    let (start, end, radix) = match (bytes[0], bytes.get(1)) {
        (b'0', Some(b'x')) | (b'0', Some(b'X')) => (2, digits(2, 16), 16),
        (b'0', _) => (1, digits(1, 8), 8),
        _ => (0, integral, 10),
    };

    if radix == 8 && integral > end {
        return Err(LexerError::BadNumber(text[..integral].to_owned()));
    } else if radix == 16 && end == start {
        return Err(LexerError::BadNumber(text[..2].to_owned()));
    }

    let magnitude = if end == start {
        // El literal `0` es octal y no lleva dígitos adicionales
        0
    } else {
        u64::from_str_radix(&text[start..end], radix).map_err(|_| LexerError::IntOverflow)?
    };

    let (suffix, length) = suffix(text, end);
    finish(text, length, || {
        let value = if suffix.contains(Suffix::UNSIGNED) || magnitude > i64::MAX as u64 {
            Literal::Unsigned(magnitude)
        } else {
            Literal::Signed(magnitude as i64)
        };

        Ok((LiteralKind::Integer, value, suffix))
    })
}

/// Reconoce sufijos en cualquier orden: `u`, `l`/`ll`, `z`.
fn suffix(text: &str, from: usize) -> (Suffix, usize) {
    let bytes = text.as_bytes();
    let mut suffix = Suffix::empty();
    let mut at = from;

    loop {
        match bytes.get(at) {
            Some(b'u') | Some(b'U') if !suffix.contains(Suffix::UNSIGNED) => {
                suffix |= Suffix::UNSIGNED;
                at += 1;
            }

            Some(&l)
                if (l == b'l' || l == b'L')
                    && !suffix.intersects(Suffix::LONG | Suffix::LONG_LONG | Suffix::SIZE) =>
            {
                if bytes.get(at + 1) == Some(&l) {
                    suffix |= Suffix::LONG_LONG;
                    at += 2;
                } else {
                    suffix |= Suffix::LONG;
                    at += 1;
                }
            }

            Some(b'z') | Some(b'Z')
                if !suffix.intersects(Suffix::LONG | Suffix::LONG_LONG | Suffix::SIZE) =>
            {
                suffix |= Suffix::SIZE;
                at += 1;
            }

            _ => break (suffix, at),
        }
    }
}

/// Rechaza literales numéricos pegados a identificadores, como `12abc`.
fn finish<F>(text: &str, length: usize, build: F) -> Result<Scanned, LexerError>
where
    F: FnOnce() -> Result<(LiteralKind, Literal, Suffix), LexerError>,
{
    match text[length..].chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' || c == '.' => {
            let end = text[length..]
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
                .map_or(text.len(), |end| end + length);

            Err(LexerError::BadNumber(text[..end].to_owned()))
        }

        _ => {
            let (kind, value, suffix) = build()?;
            Ok(Scanned {
                kind,
                value,
                suffix,
                length,
            })
        }
    }
}

fn character(text: &str) -> Result<Scanned, LexerError> {
    let mut chars = text.char_indices().skip(1);
    let value = match chars.next() {
        Some((_, '\\')) => match chars.next() {
            Some((_, c)) => escape(c).ok_or(LexerError::BadEscape(c))?,
            None => return Err(LexerError::Unterminated('\'')),
        },

        Some((_, '\'')) => return Err(LexerError::EmptyChar),
        Some((_, '\n')) | None => return Err(LexerError::Unterminated('\'')),
        Some((_, c)) if c.is_ascii() => c as u8,
        Some((_, c)) => return Err(LexerError::BadChar(c)),
    };

    match chars.next() {
        Some((end, '\'')) => Ok(Scanned {
            kind: LiteralKind::Character,
            value: Literal::Signed(value as i8 as i64),
            suffix: Suffix::empty(),
            length: end + 1,
        }),

        _ => Err(LexerError::Unterminated('\'')),
    }
}

fn string(text: &str) -> Result<Scanned, LexerError> {
    let mut value = String::new();
    let mut chars = text.char_indices().skip(1);

    loop {
        match chars.next() {
            Some((end, '"')) => {
                break Ok(Scanned {
                    kind: LiteralKind::Str,
                    value: Literal::Str(value),
                    suffix: Suffix::empty(),
                    length: end + 1,
                })
            }

            Some((_, '\\')) => match chars.next() {
                Some((_, c)) => value.push(escape(c).ok_or(LexerError::BadEscape(c))? as char),
                None => break Err(LexerError::Unterminated('"')),
            },

            Some((_, '\n')) | None => break Err(LexerError::Unterminated('"')),
            Some((_, c)) => value.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned(text: &str) -> Scanned {
        scan(text).unwrap().unwrap()
    }

    #[test]
    fn decimal_and_octal() {
        let decimal = scanned("1234;");
        assert_eq!(decimal.value, Literal::Signed(1234));
        assert_eq!(decimal.length, 4);

        assert_eq!(scanned("017").value, Literal::Signed(15));
        assert_eq!(scanned("0").value, Literal::Signed(0));
        assert_eq!(scanned("0x1F").value, Literal::Signed(31));
        assert!(matches!(scan("09"), Err(LexerError::BadNumber(_))));
    }

    #[test]
    fn suffixes_in_any_order() {
        let literal = scanned("10ul");
        assert_eq!(literal.value, Literal::Unsigned(10));
        assert_eq!(literal.suffix, Suffix::UNSIGNED | Suffix::LONG);
        assert_eq!(literal.length, 4);

        assert_eq!(scanned("7LLU").suffix, Suffix::UNSIGNED | Suffix::LONG_LONG);
        assert_eq!(scanned("3z").suffix, Suffix::SIZE);
        assert!(matches!(scan("3lz"), Err(LexerError::BadNumber(_))));
        assert!(matches!(scan("12abc"), Err(LexerError::BadNumber(_))));
    }

    #[test]
    fn floats_round_trip() {
        for text in &["0.5", "3.25", "10.0", "123.456"] {
            let literal = scanned(text);
            assert_eq!(literal.kind, LiteralKind::Float);

            match literal.value {
                Literal::Float(value) => assert_eq!(value, text.parse::<f64>().unwrap()),
                other => panic!("not a float: {:?}", other),
            }
        }

        // Un punto sin dígitos no forma un flotante
        assert!(matches!(scan("1."), Err(LexerError::BadNumber(_))));
    }

    #[test]
    fn overflow() {
        assert!(matches!(
            scan("99999999999999999999999"),
            Err(LexerError::IntOverflow)
        ));

        assert_eq!(
            scanned("18446744073709551615").value,
            Literal::Unsigned(u64::MAX)
        );
    }

    #[test]
    fn characters() {
        assert_eq!(scanned("'a'").value, Literal::Signed(97));
        assert_eq!(scanned("'\\n'").value, Literal::Signed(10));
        assert_eq!(scanned("'\\0'").length, 4);
        assert!(matches!(scan("'\\q'"), Err(LexerError::BadEscape('q'))));
        assert!(matches!(scan("''"), Err(LexerError::EmptyChar)));
        assert!(matches!(scan("'ab'"), Err(LexerError::Unterminated('\''))));
    }

    #[test]
    fn strings() {
        let literal = scanned("\"hi\\t\\\"there\\\"\" rest");
        assert_eq!(literal.value, Literal::Str("hi\t\"there\"".to_owned()));
        assert_eq!(literal.length, 15);

        assert!(matches!(scan("\"open"), Err(LexerError::Unterminated('"'))));
        assert!(matches!(scan("\"a\nb\""), Err(LexerError::Unterminated('"'))));
    }
}

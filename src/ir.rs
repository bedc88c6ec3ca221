//! Representación de operandos en IR textual.
//!
//! La generación de código produce texto directamente; este módulo
//! define únicamente cómo se escriben los operandos, los símbolos y las
//! constantes.

use std::fmt::{self, Display};

/// Referencia a un valor ya disponible.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// Registro virtual numerado, `%N`.
    Register(u32),

    /// Registro con nombre, `%x.addr`.
    Named(String),

    /// Símbolo global, `@x`.
    Global(String),

    Int(i128),
    Bool(bool),
    Float { value: f64, extended: bool },
    Null,

    /// Expresión constante arbitraria, ya formateada.
    Constant(String),
}

impl Operand {
    pub fn global(name: &str) -> Self {
        Operand::Global(name.to_owned())
    }
}

impl Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(register) => write!(fmt, "%{}", register),
            Operand::Named(name) => write!(fmt, "%{}", name),
            Operand::Global(name) => fmt.write_str(&symbol(name)),
            Operand::Int(value) => write!(fmt, "{}", value),
            Operand::Bool(value) => write!(fmt, "{}", value),
            Operand::Float { value, extended: false } => write!(fmt, "0x{:016X}", value.to_bits()),
            Operand::Float { value, extended: true } => write!(fmt, "0xK{}", extended_hex(*value)),
            Operand::Null => fmt.write_str("null"),
            Operand::Constant(constant) => fmt.write_str(constant),
        }
    }
}

/// Etiqueta de bloque básico.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label(pub String);

impl Display for Label {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "%{}", self.0)
    }
}

/// Nombre de símbolo global, entre comillas si contiene caracteres
/// fuera de `[A-Za-z0-9_.$]`.
pub fn symbol(name: &str) -> String {
    let plain = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'));

    if plain {
        format!("@{}", name)
    } else {
        format!("@\"{}\"", name)
    }
}

/// Contenido de un arreglo `c"..."`, con el terminador nulo.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut escaped = String::with_capacity(bytes.len() + 3);
    for &byte in bytes.iter().chain(std::iter::once(&0)) {
        match byte {
            b'"' | b'\\' => escaped.push_str(&format!("\\{:02X}", byte)),
            0x20..=0x7e => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\{:02X}", byte)),
        }
    }

    escaped
}

/// Codificación de un `f64` como flotante extendido x87 de 80 bits.
fn extended_hex(value: f64) -> String {
    let bits = value.to_bits();
    let sign = (bits >> 63) as u16;
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);

    let (exponent, mantissa) = match exponent {
        0 if fraction == 0 => (0, 0),

        // Subnormales de doble precisión son normales en 80 bits
        0 => {
            let shift = fraction.leading_zeros() - 11;
            let mantissa = fraction << (shift + 11);
            (16383 - 1022 - shift as i32, mantissa)
        }

        0x7ff => (0x7fff, (1 << 63) | (fraction << 11)),
        _ => (exponent - 1023 + 16383, (1 << 63) | (fraction << 11)),
    };

    let high = (sign << 15) | exponent as u16;
    format!("{:04X}{:016X}", high, mantissa)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_quoted_when_needed() {
        assert_eq!(symbol("main"), "@main");
        assert_eq!(symbol(".str.1"), "@.str.1");
        assert_eq!(symbol("n::f"), "@\"n::f\"");
    }

    #[test]
    fn float_operands() {
        let one = Operand::Float {
            value: 1.0,
            extended: false,
        };

        assert_eq!(one.to_string(), "0x3FF0000000000000");

        let one = Operand::Float {
            value: 1.0,
            extended: true,
        };

        assert_eq!(one.to_string(), "0xK3FFF8000000000000000");

        let zero = Operand::Float {
            value: 0.0,
            extended: true,
        };

        assert_eq!(zero.to_string(), "0xK00000000000000000000");
    }

    #[test]
    fn string_bytes() {
        assert_eq!(escape_bytes(b"hi\n"), "hi\\0A\\00");
        assert_eq!(escape_bytes(b"\"q\""), "\\22q\\22\\00");
    }

    #[test]
    fn operand_display() {
        assert_eq!(Operand::Register(3).to_string(), "%3");
        assert_eq!(Operand::Named("x.addr".into()).to_string(), "%x.addr");
        assert_eq!(Operand::global("n::x").to_string(), "@\"n::x\"");
        assert_eq!(Operand::Int(-1).to_string(), "-1");
        assert_eq!(Operand::Bool(true).to_string(), "true");
        assert_eq!(Operand::Null.to_string(), "null");
    }
}

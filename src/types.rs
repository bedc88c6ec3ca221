//! Modelo de tipos.
//!
//! Un [`Type`] se construye a partir de un nombre de tipo en texto, por
//! ejemplo `"const unsigned long *const *"`. La gramática admite
//! calificadores (`const`, `volatile`), un signo opcional, un nombre
//! central, capas de puntero (cada una con sus propios calificadores)
//! y una referencia final `&`. Los nombres centrales son los tipos
//! fundamentales de C más dos tipos sintéticos: `_condition`, de un bit,
//! para condiciones de salto, y el tipo de `nullptr`, que no tiene
//! palabra propia y solo se nombra como `std::nullptr_t`. Cualquier otro
//! nombre se resuelve como alias por medio de una función provista por
//! el llamador.
//!
//! Los campos derivados (ancho, signo, clasificación entera, nombre
//! visible y nombre en IR) se calculan una sola vez al construir el
//! descriptor. Dos descriptores son iguales si y solo si sus nombres
//! visibles coinciden.

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use bitflags::bitflags;
use thiserror::Error;

use crate::target::Widths;

bitflags! {
    /// Calificadores de un tipo o de una capa de puntero.
    #[derive(Default)]
    pub struct Qualifiers: u8 {
        const CONST    = 0b01;
        const VOLATILE = 0b10;
    }
}

/// Error de tipos.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("Unknown type `{0}`")]
    UnknownType(String),

    #[error("Malformed type name `{0}`: {1}")]
    MalformedType(String, &'static str),

    #[error("Cannot convert from `{from}` to `{to}`")]
    IncompatibleCast { from: String, to: String },

    #[error("Expression is not an assignable location")]
    NotAssignable,

    #[error("Cannot assign to read-only location of type `{0}`")]
    ReadOnly(String),

    #[error("Invalid operands to `{op}` (have `{lhs}` and `{rhs}`)")]
    InvalidOperands {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("Invalid operand to unary `{op}` (have `{operand}`)")]
    InvalidOperand { op: &'static str, operand: String },

    #[error("{0} does not produce a value")]
    Typeless(&'static str),

    #[error("Expression is not an integer constant")]
    NotConstant,

    #[error("{0} are not supported")]
    Unsupported(&'static str),
}

/// Nombre central de un tipo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Core {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    LongDouble,
    Condition,
    NullPtr,
}

impl Core {
    pub fn name(self) -> &'static str {
        use Core::*;

        match self {
            Void => "void",
            Bool => "bool",
            Char => "char",
            Short => "short",
            Int => "int",
            Long => "long",
            LongLong => "long long",
            Float => "float",
            Double => "double",
            LongDouble => "long double",
            Condition => "_condition",
            NullPtr => "std::nullptr_t",
        }
    }

    /// Tipos que admiten `signed`/`unsigned`.
    fn accepts_sign(self) -> bool {
        use Core::*;
        matches!(self, Char | Short | Int | Long | LongLong)
    }

    fn is_float(self) -> bool {
        matches!(self, Core::Float | Core::Double | Core::LongDouble)
    }

    /// Rango de conversión entre tipos aritméticos.
    fn rank(self) -> u32 {
        use Core::*;

        match self {
            Condition => 0,
            Bool => 1,
            Char => 2,
            Short => 3,
            Int => 4,
            Long => 5,
            LongLong => 6,
            Float => 7,
            Double => 8,
            LongDouble => 9,
            Void | NullPtr => 0,
        }
    }

    fn from_words(words: &[&str]) -> Option<Core> {
        use Core::*;

        let core = match words {
            ["void"] => Void,
            ["bool"] => Bool,
            ["char"] => Char,
            ["short"] | ["short", "int"] => Short,
            ["int"] => Int,
            ["long"] | ["long", "int"] => Long,
            ["long", "long"] | ["long", "long", "int"] => LongLong,
            ["float"] => Float,
            ["double"] => Double,
            ["long", "double"] => LongDouble,
            ["_condition"] => Condition,
            _ => return None,
        };

        Some(core)
    }
}

/// Palabras reservadas que pueden formar parte de un nombre de tipo.
pub const TYPE_WORDS: &[&str] = &[
    "const",
    "volatile",
    "signed",
    "unsigned",
    "void",
    "bool",
    "char",
    "short",
    "int",
    "long",
    "float",
    "double",
    "_condition",
];

/// Descriptor de tipo.
#[derive(Clone, Debug)]
pub struct Type {
    core: Core,
    core_signed: bool,
    qualifiers: Qualifiers,
    layers: Vec<Qualifiers>,
    reference: bool,
    width: u32,
    integer: bool,
    name: String,
    ir_name: String,
}

impl Type {
    /// Resuelve un nombre de tipo sin alias.
    pub fn resolve(name: &str, widths: Widths) -> Result<Type, TypeError> {
        Type::resolve_in(name, widths, |_| None)
    }

    /// Resuelve un nombre de tipo, consultando `alias` para nombres
    /// centrales que no son fundamentales.
    pub fn resolve_in<F>(name: &str, widths: Widths, mut alias: F) -> Result<Type, TypeError>
    where
        F: FnMut(&str) -> Option<Rc<Type>>,
    {
        let malformed = |reason| TypeError::MalformedType(name.to_owned(), reason);

        let spaced = name.replace('*', " * ").replace('&', " & ");
        let mut words = spaced.split_whitespace().peekable();

        let mut qualifiers = Qualifiers::empty();
        let mut sign = None;
        let mut cores = Vec::new();
        let mut base: Option<Rc<Type>> = None;

        // Especificadores previos a la primera capa
        while let Some(&word) = words.peek() {
            match word {
                "*" | "&" => break,

                "const" | "volatile" => {
                    let flag = qualifier(word);
                    if qualifiers.contains(flag) {
                        return Err(malformed("duplicate qualifier"));
                    }

                    qualifiers |= flag;
                }

                "signed" | "unsigned" if sign.is_some() => {
                    return Err(malformed("conflicting sign specifiers"))
                }

                "signed" | "unsigned" => sign = Some(word == "signed"),

                _ if TYPE_WORDS.contains(&word) => cores.push(word),

                _ if base.is_some() => return Err(malformed("more than one core type")),
                _ => {
                    let aliased = alias(word).ok_or_else(|| TypeError::UnknownType(word.to_owned()))?;
                    base = Some(aliased);
                }
            }

            words.next();
        }

        let (core, core_signed, mut layers, mut reference) = match base {
            Some(_) if !cores.is_empty() || sign.is_some() => {
                return Err(malformed("more than one core type"))
            }

            Some(base) => {
                // `const` sobre un alias de puntero califica al puntero mismo
                let mut layers = base.layers.clone();
                match layers.last_mut() {
                    Some(layer) => {
                        *layer |= qualifiers;
                        qualifiers = base.qualifiers;
                    }

                    None => qualifiers |= base.qualifiers,
                }

                (base.core, base.core_signed, layers, base.reference)
            }

            None if cores.is_empty() && sign.is_none() => {
                return Err(TypeError::UnknownType(name.trim().to_owned()))
            }

            None => {
                let core = match cores.as_slice() {
                    [] => Some(Core::Int),
                    words => Core::from_words(words),
                };

                let core = match core {
                    Some(core) if sign.is_none() || core.accepts_sign() => core,
                    Some(_) => return Err(malformed("sign specifier on a non-integer type")),
                    None => return Err(malformed("invalid combination of type specifiers")),
                };

                let signed = sign.unwrap_or(!matches!(
                    core,
                    Core::Bool | Core::Condition | Core::NullPtr | Core::Void
                ));

                (core, signed, Vec::new(), false)
            }
        };

        // Capas de puntero y referencia
        for word in words {
            match word {
                _ if reference => return Err(malformed("reference must be the outermost layer")),
                "*" => layers.push(Qualifiers::empty()),
                "&" => reference = true,

                "const" | "volatile" => {
                    let flag = qualifier(word);
                    let target = layers.last_mut().unwrap_or(&mut qualifiers);

                    if target.contains(flag) {
                        return Err(malformed("duplicate qualifier"));
                    }

                    *target |= flag;
                }

                _ => return Err(malformed("unexpected word after pointer declarator")),
            }
        }

        if core == Core::Void && layers.is_empty() && reference {
            return Err(malformed("reference to void"));
        }

        Ok(Type::build(core, core_signed, qualifiers, layers, reference, widths))
    }

    /// Tipo fundamental sin calificadores.
    pub fn fundamental(core: Core, widths: Widths) -> Type {
        let signed = !matches!(core, Core::Bool | Core::Condition | Core::NullPtr | Core::Void);
        Type::build(core, signed, Qualifiers::empty(), Vec::new(), false, widths)
    }

    fn build(
        core: Core,
        core_signed: bool,
        qualifiers: Qualifiers,
        layers: Vec<Qualifiers>,
        reference: bool,
        widths: Widths,
    ) -> Type {
        use Core::*;

        let core_width = match core {
            Void => 0,
            Bool | Char => widths.char * 8,
            Short => widths.short * 8,
            Int => widths.int * 8,
            Long => widths.long * 8,
            LongLong => widths.long_long * 8,
            Float => 32,
            Double => 64,
            LongDouble => widths.long_double * 8,
            Condition => 1,
            NullPtr => widths.pointer * 8,
        };

        let indirect = !layers.is_empty() || reference;
        let width = if indirect {
            widths.pointer * 8
        } else {
            core_width
        };

        let mut ir_name = match core {
            Void if indirect => String::from("i8"),
            Void => String::from("void"),
            Float => String::from("float"),
            Double => String::from("double"),
            LongDouble => String::from("x86_fp80"),
            NullPtr => String::from("i8*"),
            _ => format!("i{}", core_width),
        };

        ir_name.extend(layers.iter().map(|_| '*'));
        if reference {
            ir_name.push('*');
        }

        let mut name = String::new();
        if qualifiers.contains(Qualifiers::CONST) {
            name.push_str("const ");
        }

        if qualifiers.contains(Qualifiers::VOLATILE) {
            name.push_str("volatile ");
        }

        if !core_signed && core.accepts_sign() {
            name.push_str("unsigned ");
        }

        name.push_str(core.name());
        for layer in &layers {
            name.push_str(if name.ends_with('*') { "*" } else { " *" });
            if layer.contains(Qualifiers::CONST) {
                name.push_str("const");
            }

            if layer.contains(Qualifiers::VOLATILE) {
                name.push_str(if name.ends_with('*') { "volatile" } else { " volatile" });
            }
        }

        if reference {
            name.push_str(if name.ends_with('*') { "&" } else { " &" });
        }

        Type {
            core,
            core_signed,
            qualifiers,
            integer: indirect || !(core.is_float() || core == Void),
            layers,
            reference,
            width,
            name,
            ir_name,
        }
    }

    /// Puntero a este tipo.
    pub fn pointer_to(&self, widths: Widths) -> Type {
        let mut layers = self.layers.clone();
        layers.push(Qualifiers::empty());

        Type::build(self.core, self.core_signed, self.qualifiers, layers, false, widths)
    }

    /// Tipo apuntado, si este es un puntero.
    pub fn pointee(&self, widths: Widths) -> Option<Type> {
        let mut layers = self.layers.clone();
        layers.pop()?;

        Some(Type::build(self.core, self.core_signed, self.qualifiers, layers, false, widths))
    }

    /// Mismo tipo sin calificadores de nivel superior.
    pub fn unqualified(&self, widths: Widths) -> Type {
        let mut layers = self.layers.clone();
        let qualifiers = match layers.last_mut() {
            Some(layer) => {
                *layer = Qualifiers::empty();
                self.qualifiers
            }

            None => Qualifiers::empty(),
        };

        Type::build(self.core, self.core_signed, qualifiers, layers, false, widths)
    }

    /// Promoción entera: tipos más angostos que `int` se promueven a `int`.
    pub fn promoted(&self, widths: Widths) -> Type {
        use Core::*;

        match self.core {
            Bool | Char | Short | Condition if !self.is_indirect() => {
                Type::fundamental(Int, widths)
            }

            _ => self.unqualified(widths),
        }
    }

    /// Tipo común de dos operandos aritméticos (conversiones usuales).
    pub fn common(lhs: &Type, rhs: &Type, widths: Widths) -> Option<Type> {
        if !lhs.is_arithmetic() || !rhs.is_arithmetic() {
            return None;
        }

        let (lhs, rhs) = (lhs.promoted(widths), rhs.promoted(widths));
        if lhs.is_float() || rhs.is_float() {
            let wider = if lhs.core.rank() >= rhs.core.rank() { lhs } else { rhs };
            return Some(wider);
        }

        let common = if lhs.width != rhs.width {
            if lhs.width > rhs.width {
                lhs
            } else {
                rhs
            }
        } else {
            let core = lhs.core.max_by_rank(rhs.core);
            let signed = lhs.core_signed && rhs.core_signed;

            Type::build(core, signed, Qualifiers::empty(), Vec::new(), false, widths)
        };

        Some(common)
    }

    pub fn core(&self) -> Core {
        self.core
    }

    /// Nombre visible, usado en diagnósticos y en comparaciones.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nombre en IR.
    pub fn ir_name(&self) -> &str {
        &self.ir_name
    }

    /// Ancho en bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn qualifiers(&self) -> Qualifiers {
        match self.layers.last() {
            Some(&layer) => layer,
            None => self.qualifiers,
        }
    }

    pub fn is_const(&self) -> bool {
        self.qualifiers().contains(Qualifiers::CONST)
    }

    pub fn is_signed(&self) -> bool {
        !self.is_indirect() && self.core_signed
    }

    pub fn is_integer(&self) -> bool {
        self.integer
    }

    /// Punteros, referencias y `nullptr_t`.
    pub fn is_pointer(&self) -> bool {
        self.is_indirect() || self.core == Core::NullPtr
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn is_void(&self) -> bool {
        self.core == Core::Void && !self.is_indirect()
    }

    pub fn is_float(&self) -> bool {
        self.core.is_float() && !self.is_indirect()
    }

    pub fn is_condition(&self) -> bool {
        self.core == Core::Condition && !self.is_indirect()
    }

    pub fn is_null(&self) -> bool {
        self.core == Core::NullPtr && !self.is_indirect()
    }

    /// Tipos sobre los que se definen operaciones aritméticas.
    pub fn is_arithmetic(&self) -> bool {
        !self.is_pointer() && !self.is_void()
    }

    /// Cantidad de capas de puntero.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Alineamiento en bytes.
    pub fn align(&self) -> u32 {
        match self.core {
            _ if self.is_indirect() => self.width / 8,
            Core::LongDouble => 16,
            _ => (self.width / 8).max(1),
        }
    }

    fn is_indirect(&self) -> bool {
        !self.layers.is_empty() || self.reference
    }
}

impl Core {
    fn max_by_rank(self, other: Core) -> Core {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Type) -> bool {
        self.name == other.name
    }
}

impl Eq for Type {}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.name)
    }
}

fn qualifier(word: &str) -> Qualifiers {
    if word == "const" {
        Qualifiers::CONST
    } else {
        Qualifiers::VOLATILE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::DataModel;

    fn lp64(name: &str) -> Type {
        Type::resolve(name, DataModel::Lp64.widths()).unwrap()
    }

    #[test]
    fn fundamental_widths_follow_data_model() {
        assert_eq!(lp64("int").ir_name(), "i32");
        assert_eq!(lp64("long").ir_name(), "i64");
        assert_eq!(lp64("unsigned long long int").ir_name(), "i64");
        assert_eq!(lp64("bool").ir_name(), "i8");
        assert_eq!(lp64("_condition").ir_name(), "i1");
        assert_eq!(lp64("long double").ir_name(), "x86_fp80");

        let llp64 = DataModel::Llp64.widths();
        assert_eq!(Type::resolve("long", llp64).unwrap().width(), 32);

        let lp32 = DataModel::Lp32.widths();
        assert_eq!(Type::resolve("int", lp32).unwrap().ir_name(), "i16");
        assert_eq!(Type::resolve("char *", lp32).unwrap().width(), 32);
    }

    #[test]
    fn display_and_ir_names_are_independent() {
        let ty = lp64("const char *");
        assert_eq!(ty.name(), "const char *");
        assert_eq!(ty.ir_name(), "i8*");
        assert!(ty.is_pointer() && ty.is_integer() && !ty.is_signed());

        let ty = lp64("int*const*");
        assert_eq!(ty.name(), "int *const *");
        assert_eq!(ty.ir_name(), "i32**");

        assert_eq!(lp64("void *").ir_name(), "i8*");
        assert_eq!(lp64("int **").name(), "int **");
        assert_eq!(lp64("unsigned").name(), "unsigned int");
        assert_eq!(lp64("signed char").name(), "char");
        assert_eq!(lp64("int &").ir_name(), "i32*");
    }

    #[test]
    fn equality_is_nominal() {
        assert_eq!(lp64("long int"), lp64("long"));
        assert_ne!(lp64("const int"), lp64("int"));
        assert_ne!(lp64("int *"), lp64("int *const"));
    }

    #[test]
    fn malformed_and_unknown_names() {
        let widths = DataModel::Lp64.widths();
        let resolve = |name| Type::resolve(name, widths);

        assert_eq!(resolve("widget"), Err(TypeError::UnknownType("widget".into())));
        assert_eq!(resolve("nullptr_t"), Err(TypeError::UnknownType("nullptr_t".into())));
        assert!(matches!(resolve("const const int"), Err(TypeError::MalformedType(..))));
        assert!(matches!(resolve("signed unsigned int"), Err(TypeError::MalformedType(..))));
        assert!(matches!(resolve("unsigned float"), Err(TypeError::MalformedType(..))));
        assert!(matches!(resolve("int & *"), Err(TypeError::MalformedType(..))));
        assert!(matches!(resolve("int char"), Err(TypeError::MalformedType(..))));
    }

    #[test]
    fn aliases_compose_with_layers() {
        let widths = DataModel::Lp64.widths();
        let intptr = Rc::new(lp64("int *"));

        let alias = |name: &str| match name {
            "intptr" => Some(Rc::clone(&intptr)),
            _ => None,
        };

        let ty = Type::resolve_in("const intptr *", widths, alias).unwrap();
        assert_eq!(ty.name(), "int *const *");
    }

    #[test]
    fn usual_arithmetic_conversions() {
        let widths = DataModel::Lp64.widths();
        let common = |a, b| Type::common(&lp64(a), &lp64(b), widths).unwrap();

        assert_eq!(common("char", "short").name(), "int");
        assert_eq!(common("int", "long").name(), "long");
        assert_eq!(common("int", "unsigned int").name(), "unsigned int");
        assert_eq!(common("unsigned int", "long").name(), "long");
        assert_eq!(common("long", "double").name(), "double");
        assert_eq!(common("float", "int").name(), "float");
        assert!(Type::common(&lp64("int *"), &lp64("int"), widths).is_none());
    }

    #[test]
    fn pointers_and_pointees() {
        let widths = DataModel::Lp64.widths();
        let ty = lp64("const char");

        let pointer = ty.pointer_to(widths);
        assert_eq!(pointer.name(), "const char *");
        assert_eq!(pointer.pointee(widths).unwrap(), ty);
        assert!(ty.pointee(widths).is_none());
        assert_eq!(lp64("int *const").unqualified(widths).name(), "int *");
    }
}

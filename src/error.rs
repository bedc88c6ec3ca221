//! Presentación de errores al usuario.
//!
//! Todo error que alcanza al driver lleva una ubicación. [`Diagnostics`]
//! los presenta junto a la línea original y un subrayado de la región
//! ofensiva, al estilo de `rustc`.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Debug, Display},
};

mod sealed {
    pub trait Sealed {}
}

/// Error que puede señalarse en el código fuente.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Conjunto de errores listo para mostrarse.
pub struct Diagnostics {
    kind: &'static str,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    /// Etiqueta que precede a cada mensaje, por ejemplo `"Syntax error"`.
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Cantidad de errores acumulados.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + LocatedError> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let error: Box<dyn LocatedError> = Box::new(error);
                error
            })
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { kind, errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            let (start, end) = (location.start(), location.end());
            let last_line = if end.line() > start.line() && end.column() > 1 {
                end.line()
            } else {
                start.line()
            };

            let digits = last_line.to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line_number in start.line()..=last_line {
                location.source().with_line(line_number, |line| {
                    writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
                })?
            }

            // Rangos vacíos (fin de archivo) se subrayan con un solo carácter
            let from = start.column();
            let to = if end.line() == start.line() {
                end.column().saturating_sub(1).max(from)
            } else {
                from
            };

            let skip = (from - 1) as usize;
            let highlight = (to - from + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl Debug for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, fmt)
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("something is off")]
    struct Oops;

    #[test]
    fn renders_caret_under_offending_token() {
        let source = Source::new("test.c", "int x = ;\n");
        let error = Located::at(Oops, Location::new(source, 8..9));

        let rendered = Diagnostics::from(error).kind("Syntax error").to_string();
        let expected = "Syntax error: something is off\n \
                        --> test.c:1:9\n  \
                        |\n\
                        1 | int x = ;\n  \
                        |         ^\n\
                        \n\
                        Build failed with 1 error\n";

        assert_eq!(rendered, expected);
    }

    #[test]
    fn empty_diagnostics() {
        let diagnostics = Diagnostics::default();
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.to_string(), "No errors were reported\n");
    }
}

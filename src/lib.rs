//! Compilador de un subconjunto de C hacia IR textual de LLVM.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente. El
//! análisis léxico de [`lex`] produce tokens bajo demanda; el parser
//! de [`parse`] los consume en una sola pasada, con retroceso, y a
//! medida que reconoce cada producción la resuelve contra el árbol de
//! ámbitos de [`program`] y le asigna tipos según [`types`]. El
//! resultado es un árbol de nodos tipados descrito en [`ast`].
//!
//! # Back end
//! No hay representación intermedia propia. [`codegen`] recorre el
//! árbol tipado y escribe directamente IR textual, con los operandos
//! que define [`ir`]. El sistema objetivo se describe en [`target`] y
//! queda fijo antes de iniciar el parsing.

use std::{io::Write, rc::Rc};

use thiserror::Error;

#[macro_use]
mod macros;

pub mod ast;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod lex;
pub mod parse;
pub mod program;
pub mod scope;
pub mod source;
pub mod target;
pub mod types;

use crate::{
    codegen::CodegenError,
    error::Diagnostics,
    parse::ParserError,
    program::Program,
    source::{Located, Source},
    target::Target,
};

/// Falla de cualquiera de las fases.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] Located<ParserError>),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl CompileError {
    /// Presentación para el usuario, con contexto de código fuente
    /// cuando el error lo tiene.
    pub fn diagnostics(self) -> Result<Diagnostics, CodegenError> {
        match self {
            CompileError::Parse(error) => {
                let kind = error.val().kind();
                Ok(Diagnostics::from(error).kind(kind))
            }

            CompileError::Codegen(error) => Err(error),
        }
    }
}

/// Analiza `source` completo y retorna el programa resuelto.
pub fn analyze(source: &Rc<Source>, target: Target) -> Result<Program, Located<ParserError>> {
    let mut program = Program::new(target);
    parse::parse(Rc::clone(source), &mut program)?;

    Ok(program)
}

/// Compila `source` y escribe el módulo resultante en `output`.
pub fn compile_to<W: Write>(
    source: &Rc<Source>,
    target: Target,
    output: &mut W,
) -> Result<(), CompileError> {
    let program = analyze(source, target)?;
    codegen::write(&program, source.name(), output)?;

    Ok(())
}

/// Compila `source` a un módulo en memoria.
pub fn compile(source: &Rc<Source>, target: Target) -> Result<String, CompileError> {
    let mut output = Vec::new();
    compile_to(source, target, &mut output)?;

    // La salida se construye solo a partir de `str`
    Ok(String::from_utf8_lossy(&output).into_owned())
}

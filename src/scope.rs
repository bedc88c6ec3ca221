//! Ámbitos léxicos y declaraciones.
//!
//! Los ámbitos forman un árbol: global, espacios de nombres, cuerpos de
//! función y bloques. Cada ámbito lleva una lista ordenada de
//! declaraciones y otra de sentencias. Ambas crecen solo por el final
//! mientras se hace parsing, lo cual permite revertir una producción
//! especulativa fallida truncándolas a sus longitudes previas
//! ([`Marks`]).
//!
//! Los ámbitos, funciones y variables viven en las arenas de
//! [`Program`](crate::program::Program) y se refieren por índice.

use std::rc::Rc;

use crate::{ast::Expr, types::Type};

/// Índice de un ámbito.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) u32);

/// Índice de una función.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionId(pub(crate) u32);

/// Índice de una variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VariableId(pub(crate) u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Namespace,
    Function,
    Block,
}

/// Aquello a lo que un nombre puede referirse.
#[derive(Clone, Debug)]
pub enum Item {
    Function(FunctionId),
    Prototype(FunctionId),
    Scope(ScopeId),
    Type(Rc<Type>),
    Assertion(Expr),
    Variable(VariableId),
}

impl Item {
    /// Función referida, definida o no.
    pub fn function(&self) -> Option<FunctionId> {
        match self {
            Item::Function(id) | Item::Prototype(id) => Some(*id),
            _ => None,
        }
    }

    /// Describe la clase de ítem para diagnósticos.
    pub fn describe(&self) -> &'static str {
        match self {
            Item::Function(_) => "function",
            Item::Prototype(_) => "function prototype",
            Item::Scope(_) => "namespace",
            Item::Type(_) => "type",
            Item::Assertion(_) => "static assertion",
            Item::Variable(_) => "variable",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: Rc<str>,
    pub item: Item,
}

/// Longitudes de las listas de un ámbito en un instante dado.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Marks {
    declarations: usize,
    statements: usize,
    children: usize,
}

#[derive(Debug)]
pub struct Scope {
    name: Rc<str>,
    kind: ScopeKind,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    declarations: Vec<Declaration>,
    statements: Vec<Expr>,
}

impl Scope {
    pub(crate) fn new(name: Rc<str>, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Scope {
            name,
            kind,
            parent,
            children: Vec::new(),
            declarations: Vec::new(),
            statements: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn statements(&self) -> &[Expr] {
        &self.statements
    }

    pub fn add_declaration(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }

    pub fn add_function(&mut self, name: Rc<str>, function: FunctionId, defined: bool) {
        let item = if defined {
            Item::Function(function)
        } else {
            Item::Prototype(function)
        };

        self.add_declaration(Declaration { name, item });
    }

    pub fn add_type(&mut self, name: Rc<str>, ty: Rc<Type>) {
        self.add_declaration(Declaration {
            name,
            item: Item::Type(ty),
        });
    }

    pub fn add_child_scope(&mut self, child: ScopeId) {
        self.children.push(child);
    }

    pub fn add_statement(&mut self, statement: Expr) {
        self.statements.push(statement);
    }

    /// Búsqueda local, sin recorrer ancestros.
    pub fn find_local(&self, name: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .rev()
            .find(|declaration| &*declaration.name == name)
    }

    /// Marca un prototipo como definido.
    pub(crate) fn define(&mut self, function: FunctionId) {
        for declaration in &mut self.declarations {
            if let Item::Prototype(id) = declaration.item {
                if id == function {
                    declaration.item = Item::Function(id);
                }
            }
        }
    }

    pub fn marks(&self) -> Marks {
        Marks {
            declarations: self.declarations.len(),
            statements: self.statements.len(),
            children: self.children.len(),
        }
    }

    /// Descarta todo lo agregado después de `marks`.
    pub fn truncate(&mut self, marks: Marks) {
        self.declarations.truncate(marks.declarations);
        self.statements.truncate(marks.statements);
        self.children.truncate(marks.children);
    }
}

/// Lugar de almacenamiento de una variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Storage {
    Local,
    Argument(u32),
    Global,
}

#[derive(Debug)]
pub struct Variable {
    pub name: Rc<str>,
    pub ty: Rc<Type>,
    pub initializer: Option<Expr>,
    pub storage: Storage,
    pub scope: ScopeId,
}

/// Parámetro formal.
#[derive(Clone, Debug)]
pub struct Argument {
    pub name: Option<Rc<str>>,
    pub ty: Rc<Type>,
    pub variable: Option<VariableId>,
}

/// Nombre, parámetros y tipo de retorno.
#[derive(Clone, Debug)]
pub struct Prototype {
    pub name: Rc<str>,
    pub arguments: Vec<Argument>,
    pub returns: Rc<Type>,
}

impl Prototype {
    /// Firma visible, por ejemplo `int (int, char *)`.
    pub fn signature(&self) -> String {
        let arguments: Vec<_> = self
            .arguments
            .iter()
            .map(|argument| argument.ty.name())
            .collect();

        format!("{} ({})", self.returns, arguments.join(", "))
    }
}

/// Funciones con una implementación fija provista por el compilador.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Intrinsic {
    /// Imprime un entero seguido de un salto de línea.
    Print,
}

impl Intrinsic {
    /// Tabla completa de intrínsecas.
    pub const ALL: &'static [(&'static str, Intrinsic)] = &[("print", Intrinsic::Print)];

    pub fn lookup(name: &str) -> Option<Intrinsic> {
        Intrinsic::ALL
            .iter()
            .find(|&&(intrinsic, _)| intrinsic == name)
            .map(|&(_, intrinsic)| intrinsic)
    }
}

#[derive(Debug)]
pub struct Function {
    pub prototype: Prototype,
    pub scope: ScopeId,
    pub body: ScopeId,
    pub defined: bool,
    pub export: bool,
    pub intrinsic: Option<Intrinsic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_discards_later_entries() {
        let mut scope = Scope::new("".into(), ScopeKind::Global, None);
        scope.add_function("f".into(), FunctionId(0), false);

        let marks = scope.marks();
        scope.add_child_scope(ScopeId(1));
        scope.add_statement(Expr::Empty);
        scope.add_function("g".into(), FunctionId(1), true);
        assert!(scope.find_local("g").is_some());

        scope.truncate(marks);
        assert!(scope.find_local("g").is_none());
        assert!(scope.children().is_empty());
        assert!(scope.statements().is_empty());
        assert_eq!(scope.marks(), marks);
    }

    #[test]
    fn definitions_replace_prototypes() {
        let mut scope = Scope::new("".into(), ScopeKind::Global, None);
        scope.add_function("f".into(), FunctionId(3), false);
        scope.define(FunctionId(3));

        match scope.find_local("f").map(|declaration| &declaration.item) {
            Some(Item::Function(FunctionId(3))) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn intrinsic_table() {
        assert_eq!(Intrinsic::lookup("print"), Some(Intrinsic::Print));
        assert_eq!(Intrinsic::lookup("puts"), None);
    }
}

//! Contexto de compilación.
//!
//! Un [`Program`] es dueño de todas las arenas: ámbitos, funciones,
//! variables y la caché de tipos. El árbol de ámbitos comienza en un
//! ámbito global precargado con las declaraciones integradas del
//! lenguaje (`print`, `puts`, `malloc`, `free` y el espacio de nombres
//! `std` con `nullptr_t`).

use std::{collections::HashMap, fmt::Write, rc::Rc};

use log::debug;

use crate::{
    scope::{
        Argument, Declaration, Function, FunctionId, Intrinsic, Item, Prototype, Scope, ScopeId,
        ScopeKind, Storage, Variable, VariableId,
    },
    target::{Target, Widths},
    types::{Core, Type, TypeError},
};

#[derive(Debug)]
pub struct Program {
    target: Target,
    scopes: Vec<Scope>,
    functions: Vec<Function>,
    variables: Vec<Variable>,
    types: HashMap<String, Rc<Type>>,
    strings: u32,
}

impl Program {
    /// Crea un programa vacío con sus declaraciones integradas.
    pub fn new(target: Target) -> Self {
        let global = Scope::new("".into(), ScopeKind::Global, None);

        let mut program = Program {
            target,
            scopes: vec![global],
            functions: Vec::new(),
            variables: Vec::new(),
            types: HashMap::new(),
            strings: 0,
        };

        program.seed();
        program
    }

    fn seed(&mut self) {
        let global = self.global();

        let void = self.fundamental(Core::Void);
        let int = self.fundamental(Core::Int);
        let char = self.fundamental(Core::Char);
        let char_pointer = self.pointer_to(&char);
        let void_pointer = self.pointer_to(&void);

        let builtins = [
            ("print", Rc::clone(&void), vec![Rc::clone(&int)]),
            ("puts", Rc::clone(&int), vec![char_pointer]),
            ("malloc", Rc::clone(&void_pointer), vec![int]),
            ("free", void, vec![void_pointer]),
        ];

        for (name, returns, arguments) in builtins.iter().cloned() {
            let arguments = arguments
                .into_iter()
                .map(|ty| Argument {
                    name: None,
                    ty,
                    variable: None,
                })
                .collect();

            let prototype = Prototype {
                name: name.into(),
                arguments,
                returns,
            };

            self.add_function(global, prototype, false, Intrinsic::lookup(name));
        }

        let std = self.add_child_scope(global, "std", ScopeKind::Namespace);
        let nullptr = self.fundamental(Core::NullPtr);
        self.scope_mut(std).add_type("nullptr_t".into(), nullptr);
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn widths(&self) -> Widths {
        self.target.widths()
    }

    /// Ámbito raíz.
    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    pub fn variable_mut(&mut self, id: VariableId) -> &mut Variable {
        &mut self.variables[id.0 as usize]
    }

    /// Crea un ámbito en la arena sin enlazarlo a su padre.
    pub fn new_scope(&mut self, parent: ScopeId, name: &str, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(name.into(), kind, Some(parent)));

        debug!("new {:?} scope {:?} `{}` under {:?}", kind, id, name, parent);
        id
    }

    /// Crea un ámbito y lo enlaza como hijo de `parent`.
    pub fn add_child_scope(&mut self, parent: ScopeId, name: &str, kind: ScopeKind) -> ScopeId {
        let id = self.new_scope(parent, name, kind);
        self.scope_mut(parent).add_child_scope(id);

        if kind == ScopeKind::Namespace {
            self.scope_mut(parent).add_declaration(Declaration {
                name: name.into(),
                item: Item::Scope(id),
            });
        }

        id
    }

    /// Registra una función y su declaración en `scope`.
    ///
    /// El cuerpo se crea vacío y se enlaza al árbol solo si `defined`.
    pub fn add_function(
        &mut self,
        scope: ScopeId,
        prototype: Prototype,
        defined: bool,
        intrinsic: Option<Intrinsic>,
    ) -> FunctionId {
        let name = Rc::clone(&prototype.name);
        let body = if defined {
            self.add_child_scope(scope, &name, ScopeKind::Function)
        } else {
            self.new_scope(scope, &name, ScopeKind::Function)
        };

        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(Function {
            prototype,
            scope,
            body,
            defined,
            export: false,
            intrinsic,
        });

        self.scope_mut(scope).add_function(name, id, defined);
        id
    }

    /// Completa un prototipo previo con una definición.
    pub fn define_function(&mut self, id: FunctionId, arguments: Vec<Argument>) {
        let (scope, body) = {
            let function = self.function_mut(id);
            function.defined = true;
            function.prototype.arguments = arguments;

            (function.scope, function.body)
        };

        self.scope_mut(scope).add_child_scope(body);
        self.scope_mut(scope).define(id);
    }

    /// Registra una variable y su declaración en `scope`.
    pub fn add_variable(
        &mut self,
        scope: ScopeId,
        name: Rc<str>,
        ty: Rc<Type>,
        storage: Storage,
    ) -> VariableId {
        let id = VariableId(self.variables.len() as u32);
        self.variables.push(Variable {
            name: Rc::clone(&name),
            ty,
            initializer: None,
            storage,
            scope,
        });

        self.scope_mut(scope).add_declaration(Declaration {
            name,
            item: Item::Variable(id),
        });

        id
    }

    /// Búsqueda calificada o no calificada a partir de `from`.
    ///
    /// Un prefijo `::` reinicia la búsqueda en el ámbito global. Cada
    /// segmento adicional se busca localmente dentro del ámbito anidado
    /// que nombra el segmento anterior.
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<&Declaration> {
        let (mut declaration, rest) = match name.strip_prefix("::") {
            Some(rest) => {
                let (first, rest) = split_first(rest);
                (self.scope(self.global()).find_local(first)?, rest)
            }

            None => {
                let (first, rest) = split_first(name);
                (self.unqualified_lookup(from, first)?, rest)
            }
        };

        if let Some(rest) = rest {
            for segment in rest.split("::") {
                let scope = match declaration.item {
                    Item::Scope(scope) => scope,
                    _ => return None,
                };

                declaration = self.scope(scope).find_local(segment)?;
            }
        }

        Some(declaration)
    }

    /// Búsqueda local y luego en cada ancestro.
    pub fn unqualified_lookup(&self, from: ScopeId, name: &str) -> Option<&Declaration> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(declaration) = scope.find_local(name) {
                return Some(declaration);
            }

            current = scope.parent();
        }

        None
    }

    /// Nombre calificado de un ámbito, por ejemplo `a::b`.
    pub fn qualified_name(&self, scope: ScopeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(scope);

        while let Some(id) = current {
            let scope = self.scope(id);
            if !scope.name().is_empty() {
                names.push(scope.name());
            }

            current = scope.parent();
        }

        names.reverse();
        names.join("::")
    }

    /// Nombre desambiguado de un símbolo declarado en `scope`.
    pub fn mangled_name(&self, scope: ScopeId, name: &str) -> String {
        let prefix = self.qualified_name(scope);
        if prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{}::{}", prefix, name)
        }
    }

    /// Resuelve un nombre de tipo, con alias visibles desde `scope`.
    pub fn resolve_type(&mut self, scope: ScopeId, name: &str) -> Result<Rc<Type>, TypeError> {
        let widths = self.widths();
        let ty = Type::resolve_in(name, widths, |alias| {
            match self.lookup(scope, alias).map(|declaration| &declaration.item) {
                Some(Item::Type(ty)) => Some(Rc::clone(ty)),
                _ => None,
            }
        })?;

        Ok(self.intern(ty))
    }

    /// Obtiene la instancia compartida de un tipo.
    pub fn intern(&mut self, ty: Type) -> Rc<Type> {
        if let Some(interned) = self.types.get(ty.name()) {
            return Rc::clone(interned);
        }

        let ty = Rc::new(ty);
        self.types.insert(ty.name().to_owned(), Rc::clone(&ty));
        ty
    }

    pub fn fundamental(&mut self, core: Core) -> Rc<Type> {
        let widths = self.widths();
        self.intern(Type::fundamental(core, widths))
    }

    pub fn pointer_to(&mut self, ty: &Type) -> Rc<Type> {
        let widths = self.widths();
        self.intern(ty.pointer_to(widths))
    }

    pub fn pointee(&mut self, ty: &Type) -> Option<Rc<Type>> {
        let widths = self.widths();
        ty.pointee(widths).map(|ty| self.intern(ty))
    }

    pub fn promoted(&mut self, ty: &Type) -> Rc<Type> {
        let widths = self.widths();
        self.intern(ty.promoted(widths))
    }

    pub fn unqualified(&mut self, ty: &Type) -> Rc<Type> {
        let widths = self.widths();
        self.intern(ty.unqualified(widths))
    }

    pub fn common_type(&mut self, lhs: &Type, rhs: &Type) -> Option<Rc<Type>> {
        let widths = self.widths();
        Type::common(lhs, rhs, widths).map(|ty| self.intern(ty))
    }

    /// Siguiente identificador de constante de cadena.
    pub fn next_string(&mut self) -> u32 {
        let id = self.strings;
        self.strings += 1;
        id
    }

    /// Representación textual del árbol de ámbitos.
    pub fn dump_scopes(&self) -> String {
        let mut output = String::new();
        self.dump_scope(self.global(), 0, &mut output);
        output
    }

    fn dump_scope(&self, id: ScopeId, depth: usize, output: &mut String) {
        let scope = self.scope(id);
        let indent = "  ".repeat(depth);

        let name = if scope.name().is_empty() { "<anonymous>" } else { scope.name() };
        let _ = writeln!(output, "{}{:?} {}", indent, scope.kind(), name);

        for declaration in scope.declarations() {
            let detail = match &declaration.item {
                Item::Function(function) | Item::Prototype(function) => {
                    let function = self.function(*function);
                    let intrinsic = if function.intrinsic.is_some() { " [intrinsic]" } else { "" };
                    format!(": {}{}", function.prototype.signature(), intrinsic)
                }

                Item::Variable(variable) => format!(": {}", self.variable(*variable).ty),
                Item::Type(ty) => format!(" = {}", ty),
                Item::Scope(_) | Item::Assertion(_) => String::new(),
            };

            let _ = writeln!(
                output,
                "{}  {} {}{}",
                indent,
                declaration.item.describe(),
                declaration.name,
                detail
            );
        }

        for &child in scope.children() {
            self.dump_scope(child, depth + 1, output);
        }
    }
}

fn split_first(name: &str) -> (&str, Option<&str>) {
    match name.find("::") {
        Some(at) => (&name[..at], Some(&name[at + 2..])),
        None => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Program {
        Program::new(Target::default())
    }

    #[test]
    fn builtins_are_seeded() {
        let program = program();
        let global = program.global();

        let print = program.lookup(global, "print").and_then(|d| d.item.function());
        let print = program.function(print.unwrap());
        assert_eq!(print.intrinsic, Some(Intrinsic::Print));
        assert_eq!(print.prototype.signature(), "void (int)");

        let malloc = program.lookup(global, "malloc").and_then(|d| d.item.function());
        assert_eq!(program.function(malloc.unwrap()).prototype.signature(), "void * (int)");

        match program.lookup(global, "std::nullptr_t").map(|d| &d.item) {
            Some(Item::Type(ty)) => assert!(ty.is_null()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn shadowing_and_global_qualification() {
        let mut program = program();
        let global = program.global();
        let int = program.fundamental(Core::Int);
        let long = program.fundamental(Core::Long);

        let outer = program.add_variable(global, "x".into(), Rc::clone(&int), Storage::Global);
        let block = program.add_child_scope(global, "", ScopeKind::Block);
        let inner = program.add_variable(block, "x".into(), long, Storage::Local);

        let found = |program: &Program, from, name| match program.lookup(from, name) {
            Some(Declaration {
                item: Item::Variable(id),
                ..
            }) => Some(*id),
            _ => None,
        };

        assert_eq!(found(&program, block, "x"), Some(inner));
        assert_eq!(found(&program, block, "::x"), Some(outer));
        assert_eq!(found(&program, global, "x"), Some(outer));
        assert_eq!(found(&program, block, "y"), None);
    }

    #[test]
    fn qualified_names() {
        let mut program = program();
        let global = program.global();
        let outer = program.add_child_scope(global, "a", ScopeKind::Namespace);
        let inner = program.add_child_scope(outer, "b", ScopeKind::Namespace);

        assert_eq!(program.qualified_name(inner), "a::b");
        assert_eq!(program.mangled_name(inner, "f"), "a::b::f");
        assert_eq!(program.mangled_name(global, "main"), "main");
        assert!(program.lookup(global, "a::b").is_some());
        assert!(program.lookup(inner, "::a::b").is_some());
        assert!(program.lookup(global, "b").is_none());
    }

    #[test]
    fn types_are_interned() {
        let mut program = program();
        let global = program.global();

        let first = program.resolve_type(global, "const char *").unwrap();
        let second = program.resolve_type(global, "const  char*").unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        let null = program.resolve_type(global, "std::nullptr_t").unwrap();
        assert_eq!(null.ir_name(), "i8*");
    }

    #[test]
    fn scope_dump_lists_every_kind() {
        let mut program = program();
        let global = program.global();
        let int = program.fundamental(Core::Int);

        let prototype = Prototype {
            name: "f".into(),
            arguments: Vec::new(),
            returns: int,
        };

        let f = program.add_function(global, prototype, true, None);
        let body = program.function(f).body;
        program.add_child_scope(body, "", ScopeKind::Block);

        let dump = program.dump_scopes();
        assert!(dump.starts_with("Global <anonymous>\n"));
        assert!(dump.contains("\n  Namespace std\n"));
        assert!(dump.contains("\n  Function f\n"));
        assert!(dump.contains("\n    Block <anonymous>\n"));
    }
}

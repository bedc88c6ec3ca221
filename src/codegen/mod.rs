//! Emisión de IR textual.
//!
//! El módulo se escribe en un solo recorrido: preámbulo, constantes de
//! cadena, variables globales, funciones en orden de declaración y
//! epílogo. Cada definición de función se baja con su propio
//! [`Emitter`], cuyos contadores de registros y de saltos son locales a
//! la función.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    io::{self, Write},
};

use log::debug;
use thiserror::Error;

use crate::{
    ast::{round_to, Constant, Expr},
    ir::{escape_bytes, symbol, Label, Operand},
    program::Program,
    scope::{Declaration, Function, FunctionId, Item, ScopeId, Storage, VariableId},
    types::{Core, Type, TypeError},
};

mod expr;

/// Error de generación de código.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("I/O error while writing IR")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("Variable `{0}` has no storage in this function")]
    MissingSlot(String),

    #[error("Call to `{0}` does not produce a value")]
    VoidCall(String),
}

/// Escribe el módulo completo de `program`.
pub fn write<W: Write>(
    program: &Program,
    source_name: &str,
    output: &mut W,
) -> Result<(), CodegenError> {
    let items = module_items(program, program.global());

    preamble(program, source_name, output)?;

    let mut strings = BTreeMap::new();
    for declaration in &items {
        match &declaration.item {
            Item::Variable(variable) => {
                if let Some(initializer) = &program.variable(*variable).initializer {
                    collect_strings(program, initializer, &mut strings);
                }
            }

            Item::Function(function) => {
                collect_scope_strings(program, program.function(*function).body, &mut strings)
            }

            _ => (),
        }
    }

    for (id, bytes) in &strings {
        writeln!(
            output,
            "@.str.{} = private unnamed_addr constant [{} x i8] c\"{}\", align 1",
            id,
            bytes.len() + 1,
            escape_bytes(bytes)
        )?;
    }

    if !strings.is_empty() {
        writeln!(output)?;
    }

    let mut globals = 0;
    for declaration in &items {
        if let Item::Variable(variable) = declaration.item {
            global_variable(program, variable, output)?;
            globals += 1;
        }
    }

    if globals > 0 {
        writeln!(output)?;
    }

    for declaration in &items {
        let (id, function) = match declaration.item {
            Item::Function(id) | Item::Prototype(id) => (id, program.function(id)),
            _ => continue,
        };

        if function.intrinsic.is_some() {
            continue;
        }

        if function.defined {
            Emitter::new(program, id, output).function()?;
        } else {
            declare(program, function, output)?;
        }
    }

    postamble(output)?;
    Ok(())
}

/// Declaraciones de ámbito de archivo, incluyendo las de espacios de
/// nombres, en orden de aparición.
fn module_items(program: &Program, scope: ScopeId) -> Vec<&Declaration> {
    let mut items = Vec::new();
    for declaration in program.scope(scope).declarations() {
        match declaration.item {
            Item::Scope(namespace) => items.extend(module_items(program, namespace)),
            Item::Variable(variable) if program.variable(variable).storage != Storage::Global => (),
            _ => items.push(declaration),
        }
    }

    items
}

fn collect_scope_strings<'p>(
    program: &'p Program,
    scope: ScopeId,
    strings: &mut BTreeMap<u32, &'p [u8]>,
) {
    for statement in program.scope(scope).statements() {
        collect_strings(program, statement, strings);
    }
}

fn collect_strings<'p>(program: &'p Program, expr: &'p Expr, strings: &mut BTreeMap<u32, &'p [u8]>) {
    match expr {
        Expr::Str { id, bytes, .. } => {
            strings.insert(*id, bytes);
        }

        Expr::Declare { variable } => {
            if let Some(initializer) = &program.variable(*variable).initializer {
                collect_strings(program, initializer, strings);
            }
        }

        Expr::Unary { operand, .. } | Expr::Cast { operand, .. } => {
            collect_strings(program, operand, strings)
        }

        Expr::Binary { lhs, rhs, .. } => {
            collect_strings(program, lhs, strings);
            collect_strings(program, rhs, strings);
        }

        Expr::Assign { target, value, .. } => {
            collect_strings(program, target, strings);
            collect_strings(program, value, strings);
        }

        Expr::Call { arguments, .. } => {
            for argument in arguments {
                collect_strings(program, argument, strings);
            }
        }

        Expr::Return(Some(value)) => collect_strings(program, value, strings),
        Expr::Block(scope) => collect_scope_strings(program, *scope, strings),

        Expr::If {
            condition,
            then,
            otherwise,
        } => {
            collect_strings(program, condition, strings);
            for &scope in then.iter().chain(otherwise.iter()) {
                collect_scope_strings(program, scope, strings);
            }
        }

        Expr::Integer { .. }
        | Expr::Float { .. }
        | Expr::Bool { .. }
        | Expr::Null { .. }
        | Expr::Name { .. }
        | Expr::Empty
        | Expr::Return(None) => (),
    }
}

/// Expresión constante que apunta al primer byte de una cadena.
fn string_pointer(id: u32, length: usize) -> String {
    format!(
        "getelementptr inbounds ([{0} x i8], [{0} x i8]* @.str.{1}, i64 0, i64 0)",
        length, id
    )
}

/// Operando inmediato para un valor constante de tipo `ty`.
fn constant_operand(constant: Constant, ty: &Type) -> Operand {
    match constant {
        Constant::Int(value) if ty.is_condition() => Operand::Bool(value != 0),
        Constant::Int(0) if ty.is_pointer() => Operand::Null,
        Constant::Int(value) if ty.is_float() => float_operand(value as f64, ty),
        Constant::Int(value) => Operand::Int(value),
        Constant::Float(value) => float_operand(value, ty),
        Constant::Null => Operand::Null,
        Constant::Str { id, length } => Operand::Constant(string_pointer(id, length)),
    }
}

fn float_operand(value: f64, ty: &Type) -> Operand {
    Operand::Float {
        value: round_to(value, ty),
        extended: ty.core() == Core::LongDouble,
    }
}

fn preamble<W: Write>(program: &Program, source_name: &str, output: &mut W) -> io::Result<()> {
    let platform = program.target().platform;

    writeln!(output, "; ModuleID = '{}'", source_name)?;
    writeln!(output, "source_filename = \"{}\"", source_name)?;
    writeln!(output, "target datalayout = \"{}\"", platform.data_layout())?;
    writeln!(output, "target triple = \"{}\"", platform.triple())?;
    writeln!(output)?;

    let int = program.widths().int * 8;
    let (format, length, argument) = if int <= 32 {
        ("%d\\0A\\00", 4, 32)
    } else {
        ("%lld\\0A\\00", 6, 64)
    };

    writeln!(
        output,
        "@print_int_fstring = private unnamed_addr constant [{} x i8] c\"{}\", align 1",
        length, format
    )?;

    writeln!(output)?;

    let align = int / 8;
    writeln!(output, "; Function Attrs: noinline nounwind optnone uwtable")?;
    writeln!(
        output,
        "define {}void @print(i{} %0) #0 {{",
        platform.visibility(true, false),
        int
    )?;

    writeln!(output, "\t%2 = alloca i{}, align {}", int, align)?;
    writeln!(output, "\tstore i{0} %0, i{0}* %2, align {1}", int, align)?;
    writeln!(output, "\t%3 = load i{0}, i{0}* %2, align {1}", int, align)?;

    let value = if int == argument {
        3
    } else {
        let conversion = if int < argument { "sext" } else { "trunc" };
        writeln!(output, "\t%4 = {} i{} %3 to i{}", conversion, int, argument)?;
        4
    };

    writeln!(
        output,
        "\t%{} = call i32 (i8*, ...) @printf(i8* getelementptr inbounds \
         ([{length} x i8], [{length} x i8]* @print_int_fstring, i64 0, i64 0), i{argument} %{value})",
        value + 1,
        length = length,
        argument = argument,
        value = value
    )?;

    writeln!(output, "\tret void")?;
    writeln!(output, "}}")?;
    writeln!(output)
}

fn postamble<W: Write>(output: &mut W) -> io::Result<()> {
    writeln!(output, "declare i32 @printf(i8*, ...) #1")?;
    writeln!(output)?;

    writeln!(
        output,
        "attributes #0 = {{ noinline nounwind optnone uwtable \"frame-pointer\"=\"all\" \
         \"min-legal-vector-width\"=\"0\" \"no-trapping-math\"=\"true\" \
         \"stack-protector-buffer-size\"=\"8\" \"target-cpu\"=\"x86-64\" \
         \"target-features\"=\"+cx8,+fxsr,+mmx,+sse,+sse2,+x87\" \"tune-cpu\"=\"generic\" }}"
    )?;

    writeln!(
        output,
        "attributes #1 = {{ \"frame-pointer\"=\"all\" \"no-trapping-math\"=\"true\" \
         \"stack-protector-buffer-size\"=\"8\" \"target-cpu\"=\"x86-64\" \
         \"target-features\"=\"+cx8,+fxsr,+mmx,+sse,+sse2,+x87\" \"tune-cpu\"=\"generic\" }}"
    )?;

    writeln!(output)?;
    writeln!(output, "!llvm.module.flags = !{{!0, !1, !2}}")?;
    writeln!(output, "!llvm.ident = !{{!3}}")?;
    writeln!(output)?;
    writeln!(output, "!0 = !{{i32 1, !\"wchar_size\", i32 4}}")?;
    writeln!(output, "!1 = !{{i32 7, !\"uwtable\", i32 1}}")?;
    writeln!(output, "!2 = !{{i32 7, !\"frame-pointer\", i32 2}}")?;
    writeln!(output, "!3 = !{{!\"c1\"}}")
}

fn global_variable<W: Write>(
    program: &Program,
    id: VariableId,
    output: &mut W,
) -> io::Result<()> {
    let variable = program.variable(id);
    let ty = &variable.ty;
    let name = program.mangled_name(variable.scope, &variable.name);

    let initializer = match variable.initializer.as_ref().and_then(Expr::constant) {
        Some(constant) => constant_operand(constant, ty).to_string(),
        None => "zeroinitializer".to_owned(),
    };

    let kind = if ty.is_const() { "constant" } else { "global" };
    writeln!(
        output,
        "{} = {}{} {} {}, align {}",
        symbol(&name),
        program.target().platform.visibility(true, false),
        kind,
        ty.ir_name(),
        initializer,
        ty.align()
    )
}

fn declare<W: Write>(program: &Program, function: &Function, output: &mut W) -> io::Result<()> {
    let prototype = &function.prototype;
    let arguments: Vec<_> = prototype
        .arguments
        .iter()
        .map(|argument| argument.ty.ir_name())
        .collect();

    writeln!(
        output,
        "declare {}{} {}({}) #1",
        program.target().platform.visibility(false, function.export),
        prototype.returns.ir_name(),
        symbol(&program.mangled_name(function.scope, &prototype.name)),
        arguments.join(", ")
    )?;

    writeln!(output)
}

/// Estado de emisión de una definición de función.
struct Emitter<'a, W: Write> {
    program: &'a Program,
    function: FunctionId,
    output: &'a mut W,
    next_register: u32,
    next_branch: u32,
    indent: usize,
    terminated: bool,
    slots: HashMap<VariableId, Operand>,
    names: HashSet<String>,
}

impl<'a, W: Write> Emitter<'a, W> {
    fn new(program: &'a Program, function: FunctionId, output: &'a mut W) -> Self {
        let arguments = program.function(function).prototype.arguments.len() as u32;

        Emitter {
            program,
            function,
            output,
            // %0..%N-1 son los argumentos y %N el bloque de entrada
            next_register: arguments + 1,
            next_branch: 0,
            indent: 1,
            terminated: false,
            slots: HashMap::new(),
            names: HashSet::new(),
        }
    }

    fn function(mut self) -> Result<(), CodegenError> {
        let program = self.program;
        let function = program.function(self.function);
        let prototype = &function.prototype;
        let name = program.mangled_name(function.scope, &prototype.name);

        debug!("emitting function `{}`: {}", name, prototype.signature());

        let arguments: Vec<_> = prototype
            .arguments
            .iter()
            .enumerate()
            .map(|(i, argument)| format!("{} %{}", argument.ty.ir_name(), i))
            .collect();

        writeln!(self.output, "; Function Attrs: noinline nounwind optnone uwtable")?;

        writeln!(
            self.output,
            "define {}{} {}({}) #0 {{",
            program.target().platform.visibility(true, function.export),
            prototype.returns.ir_name(),
            symbol(&name),
            arguments.join(", ")
        )?;

        for (i, argument) in prototype.arguments.iter().enumerate() {
            let variable = match argument.variable {
                Some(variable) => variable,
                None => continue,
            };

            let ty = &argument.ty;
            let slot = self.slot_name(&format!("{}.addr", program.variable(variable).name));

            emit!(self, "{} = alloca {}, align {}", slot, ty.ir_name(), ty.align())?;
            emit!(
                self,
                "store {0} %{1}, {0}* {2}, align {3}",
                ty.ir_name(),
                i,
                slot,
                ty.align()
            )?;

            self.slots.insert(variable, slot);
        }

        self.block(function.body)?;

        if !self.terminated {
            let returns = &prototype.returns;
            if returns.is_void() {
                terminate!(self, "ret void")?;
            } else if name == "main" {
                terminate!(self, "ret {} 0", returns.ir_name())?;
            } else {
                terminate!(self, "unreachable")?;
            }
        }

        writeln!(self.output, "}}")?;
        writeln!(self.output)?;

        Ok(())
    }

    /// Emite cada sentencia de un ámbito, en orden.
    fn block(&mut self, scope: ScopeId) -> Result<(), CodegenError> {
        let program = self.program;
        for statement in program.scope(scope).statements() {
            self.statement(statement)?;
        }

        Ok(())
    }

    fn statement(&mut self, statement: &Expr) -> Result<(), CodegenError> {
        match statement {
            Expr::Empty => Ok(()),
            Expr::Block(scope) => self.block(*scope),
            Expr::Declare { variable } => self.declare(*variable),

            Expr::Return(None) => terminate!(self, "ret void").map_err(Into::into),
            Expr::Return(Some(value)) => {
                let ty = value.result_type()?;
                if ty.is_void() {
                    self.statement(value)?;
                    return terminate!(self, "ret void").map_err(Into::into);
                }

                let value = self.value(value)?;
                terminate!(self, "ret {} {}", ty.ir_name(), value)?;
                Ok(())
            }

            Expr::If {
                condition,
                then,
                otherwise,
            } => self.conditional(condition, *then, *otherwise),

            Expr::Call {
                function,
                arguments,
                ..
            } => self.call(*function, arguments).map(|_| ()),

            expr => self.value(expr).map(|_| ()),
        }
    }

    fn declare(&mut self, variable: VariableId) -> Result<(), CodegenError> {
        let program = self.program;
        let declared = program.variable(variable);
        let ty = &declared.ty;

        let slot = self.slot_name(&declared.name);
        emit!(self, "{} = alloca {}, align {}", slot, ty.ir_name(), ty.align())?;
        self.slots.insert(variable, slot.clone());

        if let Some(initializer) = &declared.initializer {
            let value = self.value(initializer)?;
            emit!(
                self,
                "store {0} {1}, {0}* {2}, align {3}",
                ty.ir_name(),
                value,
                slot,
                ty.align()
            )?;
        }

        Ok(())
    }

    fn conditional(
        &mut self,
        condition: &Expr,
        then: Option<ScopeId>,
        otherwise: Option<ScopeId>,
    ) -> Result<(), CodegenError> {
        let branch = self.next_branch;
        self.next_branch += 1;

        let on_true = Label(format!("if.{}.true", branch));
        let on_false = Label(format!("if.{}.false", branch));
        let end = Label(format!("if.{}.end", branch));

        let condition = self.value(condition)?;
        terminate!(
            self,
            "br i1 {}, label {}, label {}",
            condition,
            if then.is_some() { &on_true } else { &end },
            if otherwise.is_some() { &on_false } else { &end }
        )?;

        for (label, body) in [(&on_true, then), (&on_false, otherwise)].iter() {
            if let Some(body) = body {
                self.label(label)?;

                self.indent += 1;
                self.block(*body)?;
                terminate!(self, "br label {}", end)?;
                self.indent -= 1;
            }
        }

        self.label(&end)?;
        Ok(())
    }

    /// Reserva un nombre de registro único dentro de la función.
    fn slot_name(&mut self, base: &str) -> Operand {
        let mut name = base.to_owned();
        let mut suffix = 0;

        while self.names.contains(&name) {
            suffix += 1;
            name = format!("{}.{}", base, suffix);
        }

        self.names.insert(name.clone());
        Operand::Named(name)
    }

    /// Almacenamiento de una variable: ranura local o símbolo global.
    fn slot(&self, variable: VariableId) -> Result<Operand, CodegenError> {
        let declared = self.program.variable(variable);
        if declared.storage == Storage::Global {
            let name = self.program.mangled_name(declared.scope, &declared.name);
            return Ok(Operand::global(&name));
        }

        self.slots
            .get(&variable)
            .cloned()
            .ok_or_else(|| CodegenError::MissingSlot(declared.name.to_string()))
    }

    fn begin_line(&mut self) -> io::Result<()> {
        if self.terminated {
            // Todo bloque básico posterior a un terminador necesita etiqueta
            let label = self.next_register;
            self.next_register += 1;
            self.terminated = false;

            writeln!(self.output, "{}{}:", tabs(self.indent - 1), label)?;
        }

        write!(self.output, "{}", tabs(self.indent))
    }

    fn label(&mut self, Label(label): &Label) -> io::Result<()> {
        self.terminated = false;
        writeln!(self.output, "{}{}:", tabs(self.indent - 1), label)
    }

    fn line(&mut self, instruction: fmt::Arguments) -> io::Result<()> {
        self.begin_line()?;
        writeln!(self.output, "{}", instruction)
    }

    fn register(&mut self, instruction: fmt::Arguments) -> io::Result<Operand> {
        self.begin_line()?;

        let register = self.next_register;
        self.next_register += 1;

        writeln!(self.output, "%{} = {}", register, instruction)?;
        Ok(Operand::Register(register))
    }

    fn terminator(&mut self, instruction: fmt::Arguments) -> io::Result<()> {
        self.line(instruction)?;
        self.terminated = true;
        Ok(())
    }
}

fn tabs(count: usize) -> String {
    "\t".repeat(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse::parse, source::Source, target::Target};

    fn emit(code: &str) -> String {
        let mut program = Program::new(Target::default());
        parse(Source::new("test.c", code), &mut program).unwrap();

        let mut output = Vec::new();
        write(&program, "test.c", &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn body<'a>(ir: &'a str, header: &str) -> &'a str {
        let start = ir.find(header).unwrap();
        let body = &ir[start..];
        let open = body.find("{\n").unwrap() + 2;
        let close = body.find("\n}").unwrap() + 1;
        &body[open..close]
    }

    #[test]
    fn module_layout() {
        let ir = emit("int main() { return 0; }");

        assert!(ir.starts_with("; ModuleID = 'test.c'\nsource_filename = \"test.c\"\n"));
        assert!(ir.contains("target triple = \"x86_64-pc-linux-gnu\""));
        assert!(ir.contains("@print_int_fstring = private unnamed_addr constant [4 x i8]"));
        assert!(ir.contains("define dso_local void @print(i32 %0) #0 {"));
        assert!(ir.contains("declare i32 @printf(i8*, ...) #1"));
        assert!(ir.contains("!llvm.module.flags"));

        assert_eq!(body(&ir, "define dso_local i32 @main()"), "\tret i32 0\n");
    }

    #[test]
    fn intrinsics_and_builtin_prototypes() {
        let ir = emit("int main() { print(7); return 0; }");

        assert_eq!(ir.matches("@print(").count(), 2);
        assert!(ir.contains("\tcall void @print(i32 7)\n"));
        assert!(ir.contains("declare dso_local i32 @puts(i8*) #1"));
        assert!(ir.contains("declare dso_local i8* @malloc(i32) #1"));
        assert!(ir.contains("declare dso_local void @free(i8*) #1"));
    }

    #[test]
    fn prototypes_are_declared() {
        let ir = emit("int twice(int x); int main() { return twice(2); }");

        assert!(ir.contains("declare dso_local i32 @twice(i32) #1"));
        assert!(ir.contains("\t%1 = call i32 @twice(i32 2)\n\tret i32 %1\n"));
    }

    #[test]
    fn strings_and_globals() {
        let ir = emit(
            "const int limit = 3; double ratio = 1; char *name; \
             namespace n { int counter = -2; } \
             int main() { puts(\"hi\"); return limit; }",
        );

        assert!(ir.contains("@.str.0 = private unnamed_addr constant [3 x i8] c\"hi\\00\", align 1"));
        assert!(ir.contains("@limit = dso_local constant i32 3, align 4"));
        assert!(ir.contains("@ratio = dso_local global double 0x3FF0000000000000, align 8"));
        assert!(ir.contains("@name = dso_local global i8* zeroinitializer, align 8"));
        assert!(ir.contains("@\"n::counter\" = dso_local global i32 -2, align 4"));
        assert!(ir.contains(
            "call i32 @puts(i8* getelementptr inbounds ([3 x i8], [3 x i8]* @.str.0, i64 0, i64 0))"
        ));
        assert!(ir.contains("load i32, i32* @limit, align 4"));
    }

    #[test]
    fn namespaced_functions_are_quoted() {
        let ir = emit("namespace m { int one() { return 1; } } int main() { return m::one(); }");

        assert!(ir.contains("define dso_local i32 @\"m::one\"() #0 {"));
        assert!(ir.contains("call i32 @\"m::one\"()"));
    }

    #[test]
    fn implicit_returns() {
        let ir = emit("void f() { } int g() { } int main() { }");

        assert_eq!(body(&ir, "@f()"), "\tret void\n");
        assert_eq!(body(&ir, "@g()"), "\tunreachable\n");
        assert_eq!(body(&ir, "@main()"), "\tret i32 0\n");
    }

    #[test]
    fn arguments_get_slots() {
        let ir = emit("int id(int a, long b) { return a; }");

        assert_eq!(
            body(&ir, "@id(i32 %0, i64 %1)"),
            "\t%a.addr = alloca i32, align 4\n\
             \tstore i32 %0, i32* %a.addr, align 4\n\
             \t%b.addr = alloca i64, align 8\n\
             \tstore i64 %1, i64* %b.addr, align 8\n\
             \t%3 = load i32, i32* %a.addr, align 4\n\
             \tret i32 %3\n"
        );
    }

    #[test]
    fn shadowed_locals_get_distinct_slots() {
        let ir = emit("int main() { int x = 1; { int x = 2; } return x; }");

        assert!(ir.contains("\t%x = alloca i32, align 4\n\tstore i32 1, i32* %x, align 4\n"));
        assert!(ir.contains("\t%x.1 = alloca i32, align 4\n\tstore i32 2, i32* %x.1, align 4\n"));
        assert!(ir.contains("load i32, i32* %x, align 4"));
    }

    #[test]
    fn statements_after_return_get_a_block() {
        let ir = emit("int main() { return 1; return 2; }");
        assert_eq!(body(&ir, "@main()"), "\tret i32 1\n1:\n\tret i32 2\n");
    }

    #[test]
    fn if_else_labels() {
        let ir = emit("void f(int a) { if (a) print(1); else print(2); }");

        assert_eq!(
            body(&ir, "@f(i32 %0)"),
            "\t%a.addr = alloca i32, align 4\n\
             \tstore i32 %0, i32* %a.addr, align 4\n\
             \t%2 = load i32, i32* %a.addr, align 4\n\
             \t%3 = icmp ne i32 %2, 0\n\
             \tbr i1 %3, label %if.0.true, label %if.0.false\n\
             if.0.true:\n\
             \t\tcall void @print(i32 1)\n\
             \t\tbr label %if.0.end\n\
             if.0.false:\n\
             \t\tcall void @print(i32 2)\n\
             \t\tbr label %if.0.end\n\
             if.0.end:\n\
             \tret void\n"
        );
    }

    #[test]
    fn other_platforms() {
        use crate::target::{DataModel, Platform};

        let mut program = Program::new(Target::new(DataModel::Ilp64, Platform::Windows));
        parse(
            Source::new("w.c", "export int f() { return 1; }"),
            &mut program,
        )
        .unwrap();

        let mut output = Vec::new();
        write(&program, "w.c", &mut output).unwrap();
        let ir = String::from_utf8(output).unwrap();

        assert!(ir.contains("target triple = \"x86_64-pc-windows-msvc\""));
        assert!(ir.contains("define dso_local dllexport i64 @f() #0 {"));
        assert!(ir.contains("@print_int_fstring = private unnamed_addr constant [6 x i8]"));
        assert!(ir.contains("define dso_local void @print(i64 %0) #0 {"));
    }
}

//! Declaraciones: variables, funciones, alias de tipo, espacios de
//! nombres y aserciones estáticas.

use std::rc::Rc;

use log::debug;

use super::{is_reserved, Failure, Parse, Parser, ParserError};
use crate::{
    ast::{Constant, Expr},
    lex::{Op, TokenKind},
    scope::{Argument, Declaration, Item, Prototype, ScopeKind, Storage},
    source::{Located, Location},
    types::{Type, TypeError, TYPE_WORDS},
};

impl<'a> Parser<'a> {
    pub(super) fn declaration(&mut self) -> Parse<Vec<Expr>> {
        let (specifiers, _) = self.specifiers()?;
        let mut statements = Vec::new();

        loop {
            let ty = self.pointers(specifiers.clone())?;
            let (name, location) = self.identifier()?;

            let next = self.peek()?;
            if !(next.is(Op::Assign) || next.is(Op::Comma) || next.is(Op::Semicolon)) {
                return self.fail(ParserError::UnexpectedToken {
                    expected: String::from("`=`, `,` or `;`"),
                    found: next.to_string(),
                });
            }

            let declared = self
                .declarator(&ty, name, &location)
                .map_err(Failure::strict)?;

            statements.extend(declared);
            if !self.accept(Op::Comma)? {
                self.expect(Op::Semicolon).map_err(Failure::strict)?;
                break Ok(statements);
            }
        }
    }

    /// Registra una variable y, si lo hay, su inicializador.
    fn declarator(&mut self, ty: &str, name: Rc<str>, location: &Location) -> Parse<Option<Expr>> {
        let ty = self.resolve(ty, location)?;
        if ty.is_void() {
            return Err(self.type_error(TypeError::Unsupported("Variables of type `void`"), location));
        } else if ty.is_reference() {
            return Err(self.type_error(TypeError::Unsupported("Reference variables"), location));
        }

        let scope = self.scope();
        if self.program.scope(scope).find_local(&name).is_some() {
            return self.fail_at(ParserError::Redefinition(name.to_string()), location);
        }

        let storage = if self.at_file_scope() {
            Storage::Global
        } else {
            Storage::Local
        };

        let variable = self
            .program
            .add_variable(scope, Rc::clone(&name), Rc::clone(&ty), storage);

        let initializer = if self.accept(Op::Assign)? {
            self.peek()?;
            let at = self.location();

            let value = self.expression()?;
            let value = self
                .convert(value, &ty, &at)
                .map_err(|error| self.type_error(error, &at))?;

            if storage == Storage::Global && value.constant().is_none() {
                return Err(self.type_error(TypeError::NotConstant, &at));
            }

            Some(value)
        } else {
            None
        };

        debug!("variable `{}: {}` ({:?}) in {:?}", name, ty, storage, scope);
        self.program.variable_mut(variable).initializer = initializer;

        match storage {
            Storage::Global => Ok(None),
            _ => Ok(Some(Expr::Declare { variable })),
        }
    }

    pub(super) fn function(&mut self) -> Parse<Vec<Expr>> {
        let export = self.peek()?.is_word("export");
        if export {
            self.next()?;
        }

        let (specifiers, _) = self.specifiers()?;
        let returns = self.pointers(specifiers)?;
        let (name, location) = self.identifier()?;
        self.expect(Op::LeftParen)?;

        self.function_rest(export, &returns, name, &location)
            .map_err(Failure::strict)?;

        Ok(Vec::new())
    }

    /// Parámetros y cuerpo, una vez reconocido `nombre(`.
    fn function_rest(
        &mut self,
        export: bool,
        returns: &str,
        name: Rc<str>,
        location: &Location,
    ) -> Parse<()> {
        let returns = self.resolve(returns, location)?;
        if returns.is_reference() {
            return Err(self.type_error(TypeError::Unsupported("Reference return types"), location));
        }

        let mut arguments = self.parameters()?;

        let terminator = self.next()?;
        let defined = if terminator.is(Op::LeftBrace) {
            true
        } else if terminator.is(Op::Semicolon) {
            false
        } else {
            return self.fail(ParserError::UnexpectedToken {
                expected: String::from("`;` or `{`"),
                found: terminator.to_string(),
            });
        };

        if defined && !self.at_file_scope() {
            return self.fail(ParserError::NotAllowedHere("Function definition"));
        }

        let prototype = Prototype {
            name: Rc::clone(&name),
            arguments: arguments.clone(),
            returns,
        };

        // Un prototipo dentro de un cuerpo declara la función del ámbito
        // de archivo que contiene a ese cuerpo
        let scope = self.scope();
        let home = match self.functions.last() {
            Some(&function) => self.program.function(function).scope,
            None => scope,
        };

        let shadowed = self
            .program
            .scope(scope)
            .find_local(&name)
            .map(|declaration| declaration.item.function().is_some());

        if home != scope && shadowed == Some(false) {
            return self.fail_at(ParserError::Redefinition(name.to_string()), location);
        }

        let existing = self
            .program
            .scope(home)
            .find_local(&name)
            .map(|declaration| declaration.item.function().ok_or(()));

        let id = match existing {
            None => self.program.add_function(home, prototype, false, None),

            Some(Ok(id)) => {
                let function = self.program.function(id);
                let mismatch = function.prototype.signature() != prototype.signature();
                let redefined = defined && (function.defined || function.intrinsic.is_some());

                if mismatch || redefined {
                    return self.fail_at(ParserError::Redefinition(name.to_string()), location);
                }

                id
            }

            Some(Err(())) => {
                return self.fail_at(ParserError::Redefinition(name.to_string()), location);
            }
        };

        if export {
            self.program.function_mut(id).export = true;
        }

        if home != scope && shadowed.is_none() {
            debug!("local prototype `{}` in {:?}", self.program.mangled_name(home, &name), scope);
            self.program.scope_mut(scope).add_function(Rc::clone(&name), id, false);
        }

        if !defined {
            return Ok(());
        }

        let body = self.program.function(id).body;
        for (index, argument) in arguments.iter_mut().enumerate() {
            if let Some(name) = &argument.name {
                if self.program.scope(body).find_local(name).is_some() {
                    return self.fail_at(ParserError::Redefinition(name.to_string()), location);
                }

                let storage = Storage::Argument(index as u32);
                let variable = self.program.add_variable(
                    body,
                    Rc::clone(name),
                    Rc::clone(&argument.ty),
                    storage,
                );

                argument.variable = Some(variable);
            }
        }

        self.program.define_function(id, arguments);
        debug!(
            "function `{}`: {}",
            self.program.mangled_name(scope, &name),
            self.program.function(id).prototype.signature()
        );

        self.functions.push(id);
        let result = self.scoped(body, |parser| parser.statements(Some(Op::RightBrace)));
        self.functions.pop();

        result
    }

    /// Lista de parámetros hasta el `)` inclusive.
    fn parameters(&mut self) -> Parse<Vec<Argument>> {
        let mut arguments = Vec::new();
        if self.accept(Op::RightParen)? {
            return Ok(arguments);
        }

        let cursor = self.scanner.cursor();
        if self.next()?.is_word("void") && self.accept(Op::RightParen)? {
            return Ok(arguments);
        }

        self.scanner.seek(cursor);
        loop {
            let (specifiers, location) = self.specifiers()?;
            let ty = self.pointers(specifiers)?;
            let ty = self.resolve(&ty, &location)?;

            if ty.is_void() {
                return Err(self.type_error(TypeError::Unsupported("Parameters of type `void`"), &location));
            } else if ty.is_reference() {
                return Err(self.type_error(TypeError::Unsupported("Reference parameters"), &location));
            }

            let token = self.peek()?;
            let name = if token.kind == TokenKind::Identifier && !is_reserved(&token.lexeme) {
                self.next()?;
                Some(token.lexeme)
            } else {
                None
            };

            arguments.push(Argument {
                name,
                ty,
                variable: None,
            });

            if !self.accept(Op::Comma)? {
                self.expect(Op::RightParen)?;
                break Ok(arguments);
            }
        }
    }

    pub(super) fn namespace(&mut self) -> Parse<Vec<Expr>> {
        self.keyword("namespace")?;
        self.namespace_body().map_err(Failure::strict)
    }

    fn namespace_body(&mut self) -> Parse<Vec<Expr>> {
        if !self.at_file_scope() {
            return self.fail(ParserError::NotAllowedHere("Namespace definition"));
        }

        let (name, location) = self.identifier()?;
        self.expect(Op::LeftBrace)?;

        let parent = self.scope();
        let existing = self
            .program
            .scope(parent)
            .find_local(&name)
            .map(|declaration| match declaration.item {
                Item::Scope(scope) => Ok(scope),
                _ => Err(()),
            });

        // Un espacio de nombres existente se reabre
        let scope = match existing {
            Some(Ok(scope)) => scope,
            Some(Err(())) => {
                return self.fail_at(ParserError::Redefinition(name.to_string()), &location)
            }

            None => self.program.add_child_scope(parent, &name, ScopeKind::Namespace),
        };

        self.scoped(scope, |parser| parser.statements(Some(Op::RightBrace)))?;
        Ok(Vec::new())
    }

    /// `typedef T nombre;` o `using nombre = T;`.
    pub(super) fn type_alias(&mut self) -> Parse<Vec<Expr>> {
        let token = self.next()?;
        let (name, location, ty) = if token.is_word("typedef") {
            self.typedef().map_err(Failure::strict)?
        } else if token.is_word("using") {
            self.using().map_err(Failure::strict)?
        } else {
            return self.fail(ParserError::UnexpectedToken {
                expected: String::from("`typedef` or `using`"),
                found: token.to_string(),
            });
        };

        let scope = self.scope();
        if self.program.scope(scope).find_local(&name).is_some() {
            let error = ParserError::Redefinition(name.to_string());
            return Err(Failure::Strict(Located::at(error, location)));
        }

        debug!("type alias `{}` = `{}`", name, ty);
        self.program.scope_mut(scope).add_type(name, ty);

        Ok(Vec::new())
    }

    fn typedef(&mut self) -> Parse<(Rc<str>, Location, Rc<Type>)> {
        let (specifiers, location) = self.specifiers()?;
        let ty = self.pointers(specifiers)?;
        let ty = self.resolve(&ty, &location)?;

        let (name, location) = self.identifier()?;
        self.expect(Op::Semicolon)?;

        Ok((name, location, ty))
    }

    fn using(&mut self) -> Parse<(Rc<str>, Location, Rc<Type>)> {
        let (name, location) = self.identifier()?;
        self.expect(Op::Assign)?;

        let ty = self.type_name()?;
        self.expect(Op::Semicolon)?;

        Ok((name, location, ty))
    }

    /// `static_assert(expr);` o `static_assert(expr, "mensaje");`
    pub(super) fn static_assertion(&mut self) -> Parse<Vec<Expr>> {
        self.keyword("static_assert")?;
        self.assertion().map_err(Failure::strict)
    }

    fn assertion(&mut self) -> Parse<Vec<Expr>> {
        self.expect(Op::LeftParen)?;
        self.peek()?;
        let location = self.location();

        let condition = self.expression()?;
        let message = if self.accept(Op::Comma)? {
            let token = self.next()?;
            match (token.kind, token.value) {
                (TokenKind::Str, crate::lex::Literal::Str(message)) => format!(": {}", message),
                (_, _) => {
                    return self.fail(ParserError::UnexpectedToken {
                        expected: String::from("string literal"),
                        found: self.token.to_string(),
                    })
                }
            }
        } else {
            String::new()
        };

        self.expect(Op::RightParen)?;
        self.expect(Op::Semicolon)?;

        match condition.constant() {
            Some(Constant::Int(0)) => {
                let error = ParserError::StaticAssertFailed(message);
                return Err(Failure::Strict(Located::at(error, location)));
            }

            Some(Constant::Int(_)) => (),
            _ => return Err(self.type_error(TypeError::NotConstant, &location)),
        }

        let scope = self.scope();
        self.program.scope_mut(scope).add_declaration(Declaration {
            name: "static_assert".into(),
            item: Item::Assertion(condition),
        });

        Ok(Vec::new())
    }

    /// Nombre de tipo completo, con capas de puntero.
    pub(super) fn type_name(&mut self) -> Parse<Rc<Type>> {
        let (specifiers, location) = self.specifiers()?;
        let ty = self.pointers(specifiers)?;

        self.resolve(&ty, &location)
    }

    /// Especificadores de tipo: calificadores, signo y un nombre central
    /// o alias. Falla débilmente si no hay nombre central ni signo.
    fn specifiers(&mut self) -> Parse<(String, Location)> {
        let start = self.peek()?;
        let location = self.location();

        let mut words = Vec::new();
        let mut core = false;

        loop {
            let token = self.peek()?;
            let word = &*token.lexeme;

            if token.kind == TokenKind::Identifier && TYPE_WORDS.contains(&word) {
                core |= !matches!(word, "const" | "volatile");
                words.push(word.to_owned());
                self.next()?;
            } else if !core && (token.kind == TokenKind::Identifier || token.is(Op::Scope)) {
                match self.alias()? {
                    Some(alias) => {
                        core = true;
                        words.push(alias);
                    }

                    None => break,
                }
            } else {
                break;
            }
        }

        if core {
            Ok((words.join(" "), location))
        } else {
            self.fail_at(
                ParserError::UnexpectedToken {
                    expected: String::from("type name"),
                    found: start.to_string(),
                },
                &location,
            )
        }
    }

    /// Consume un nombre calificado solo si nombra un tipo.
    fn alias(&mut self) -> Parse<Option<String>> {
        let cursor = self.scanner.cursor();
        if let Some((name, _)) = self.qualified_name()? {
            let scope = self.scope();
            if let Some(Item::Type(_)) = self.program.lookup(scope, &name).map(|d| &d.item) {
                return Ok(Some(name));
            }

            self.scanner.seek(cursor);
        }

        Ok(None)
    }

    /// Capas de puntero y referencia que siguen a los especificadores.
    fn pointers(&mut self, mut ty: String) -> Parse<String> {
        loop {
            let token = self.peek()?;
            let layer = token.is(Op::Star) || token.is(Op::Ampersand);
            if !(layer || token.is_word("const") || token.is_word("volatile")) {
                break Ok(ty);
            }

            ty.push(' ');
            ty.push_str(&token.lexeme);
            self.next()?;
        }
    }

    fn resolve(&mut self, ty: &str, location: &Location) -> Parse<Rc<Type>> {
        let scope = self.scope();
        self.program
            .resolve_type(scope, ty)
            .map_err(|error| self.type_error(error, location))
    }
}

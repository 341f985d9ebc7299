/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Symbol table of a MiniJava program: classes with their fields and
//! methods, in declaration order.

use crate::ast::{ClassDecl, MainClassDecl, MethodDecl, Program, Type, VarDecl};
use crate::errors::CompileError;
use crate::ordered_map::OrderedMap;

/// One entry for a method in the symbol table.
#[derive(Debug)]
pub struct MethodSymbol {
    method_name: String,
    parameters: OrderedMap<String, Type>,
    locals: OrderedMap<String, Type>,
    return_type: Type,
    throws_io_exception: bool,
    is_static: bool,
}

impl MethodSymbol {
    fn build(
        method_name: String,
        parameters: &[VarDecl],
        locals: &[VarDecl],
        return_type: Type,
        throws_io_exception: bool,
        is_static: bool,
    ) -> Result<Self, CompileError> {
        let mut symbol = MethodSymbol {
            method_name,
            parameters: OrderedMap::new(),
            locals: OrderedMap::new(),
            return_type,
            throws_io_exception,
            is_static,
        };
        for p in parameters {
            if symbol.parameters.contains(&p.var_name) {
                return Err(CompileError::at("Duplicate parameter name.", p.location));
            }
            symbol.parameters.insert(p.var_name.clone(), p.var_type.clone());
        }
        for l in locals {
            if symbol.parameters.contains(&l.var_name) {
                return Err(CompileError::at(
                    "Local variable shadows parameter.",
                    l.location,
                ));
            }
            if symbol.locals.contains(&l.var_name) {
                return Err(CompileError::at("Duplicate local.", l.location));
            }
            symbol.locals.insert(l.var_name.clone(), l.var_type.clone());
        }
        Ok(symbol)
    }

    fn from_method(md: &MethodDecl) -> Result<Self, CompileError> {
        Self::build(
            md.method_name.clone(),
            &md.parameters,
            &md.locals,
            md.return_type.clone(),
            md.throws_io_exception,
            false,
        )
    }

    fn from_main(mcd: &MainClassDecl) -> Result<Self, CompileError> {
        Self::build(
            "main".to_string(),
            &[],
            &[],
            Type::Void,
            mcd.main_throws_io_exception,
            true,
        )
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn name(&self) -> &str {
        &self.method_name
    }

    pub fn parameters(&self) -> &OrderedMap<String, Type> {
        &self.parameters
    }

    pub fn locals(&self) -> &OrderedMap<String, Type> {
        &self.locals
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    pub fn throws_io_exception(&self) -> bool {
        self.throws_io_exception
    }
}

/// Entry for a class in the symbol table.
#[derive(Debug)]
pub struct ClassSymbol {
    class_name: String,
    fields: OrderedMap<String, Type>,
    methods: OrderedMap<String, MethodSymbol>,
}

impl ClassSymbol {
    fn from_class(cd: &ClassDecl) -> Result<Self, CompileError> {
        let mut symbol = ClassSymbol {
            class_name: cd.class_name.clone(),
            fields: OrderedMap::new(),
            methods: OrderedMap::new(),
        };
        for f in &cd.fields {
            if symbol.fields.contains(&f.var_name) {
                return Err(CompileError::at(
                    "Duplicate instance variable name.",
                    f.location,
                ));
            }
            symbol.fields.insert(f.var_name.clone(), f.var_type.clone());
        }
        for md in &cd.methods {
            if symbol.methods.contains(&md.method_name) {
                return Err(CompileError::at("Duplicate method name.", md.location));
            }
            symbol
                .methods
                .insert(md.method_name.clone(), MethodSymbol::from_method(md)?);
        }
        Ok(symbol)
    }

    fn from_main(mcd: &MainClassDecl) -> Result<Self, CompileError> {
        let mut symbol = ClassSymbol {
            class_name: mcd.class_name.clone(),
            fields: OrderedMap::new(),
            methods: OrderedMap::new(),
        };
        symbol
            .methods
            .insert("main".to_string(), MethodSymbol::from_main(mcd)?);
        Ok(symbol)
    }

    pub fn name(&self) -> &str {
        &self.class_name
    }

    pub fn fields(&self) -> &OrderedMap<String, Type> {
        &self.fields
    }

    pub fn methods(&self) -> &OrderedMap<String, MethodSymbol> {
        &self.methods
    }
}

/// The symbol table for a whole MiniJava program.
#[derive(Debug)]
pub struct SymbolTable {
    main_class: String,
    classes: OrderedMap<String, ClassSymbol>,
}

impl SymbolTable {
    pub fn new(prg: &Program) -> Result<Self, CompileError> {
        let mut classes = OrderedMap::new();
        classes.insert(
            prg.main_class.class_name.clone(),
            ClassSymbol::from_main(&prg.main_class)?,
        );
        for cd in &prg.classes {
            if classes.contains(&cd.class_name) {
                return Err(CompileError::at("Duplicate class name.", cd.location));
            }
            classes.insert(cd.class_name.clone(), ClassSymbol::from_class(cd)?);
        }
        Ok(SymbolTable {
            main_class: prg.main_class.class_name.clone(),
            classes,
        })
    }

    pub fn main_class(&self) -> &str {
        &self.main_class
    }

    pub fn classes(&self) -> &OrderedMap<String, ClassSymbol> {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn symbols_of(source: &str) -> Result<SymbolTable, CompileError> {
        SymbolTable::new(&parse_source(source).expect("source must parse"))
    }

    const MAIN: &str = "class Main { public static void main(String[] a) { } }\n";

    #[test]
    fn test_fields_keep_declaration_order() {
        let symbols = symbols_of(&format!(
            "{}class P {{ int z; int a; int m; public int get() {{ return z; }} }}",
            MAIN
        ))
        .unwrap();
        let cs = symbols.classes().get(&"P".to_string()).unwrap();
        assert_eq!(cs.fields().keys(), ["z", "a", "m"]);
    }

    #[test]
    fn test_parameters_keep_declaration_order() {
        let symbols = symbols_of(&format!(
            "{}class P {{ public int f(int y, int x) {{ return x; }} }}",
            MAIN
        ))
        .unwrap();
        let cs = symbols.classes().get(&"P".to_string()).unwrap();
        let ms = cs.methods().get(&"f".to_string()).unwrap();
        assert_eq!(ms.parameters().keys(), ["y", "x"]);
        assert!(!ms.is_static());
        assert_eq!(*ms.return_type(), crate::ast::Type::Int);
    }

    #[test]
    fn test_main_is_static_void() {
        let symbols = symbols_of(MAIN).unwrap();
        let cs = symbols.classes().get(&"Main".to_string()).unwrap();
        let ms = cs.methods().get(&"main".to_string()).unwrap();
        assert!(ms.is_static());
        assert_eq!(*ms.return_type(), crate::ast::Type::Void);
    }

    #[test]
    fn test_duplicate_class_is_rejected() {
        let err = symbols_of(&format!("{}class A {{ }}\nclass A {{ }}", MAIN)).unwrap_err();
        assert_eq!(err.message, "Duplicate class name.");
        assert!(err.location.is_some());
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let err = symbols_of(&format!("{}class A {{ int x; int x; }}", MAIN)).unwrap_err();
        assert_eq!(err.message, "Duplicate instance variable name.");
    }

    #[test]
    fn test_local_shadowing_parameter_is_rejected() {
        let err = symbols_of(&format!(
            "{}class A {{ public int f(int x) {{ int x; return x; }} }}",
            MAIN
        ))
        .unwrap_err();
        assert_eq!(err.message, "Local variable shadows parameter.");
    }
}

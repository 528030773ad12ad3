// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Class and trait definition: trait composition, abstract-method checks,
//! and metaclasses.

use std::sync::Arc;

use indexmap::IndexMap;
use loxpp_ast::expr::Expr;
use loxpp_ast::stmt::{ClassDecl, FnDecl, TraitDecl};
use parking_lot::Mutex;

use crate::value::{Class, Closure, Trait, Value};

use super::{Interpreter, RuntimeDiagnostic, RuntimeError};

impl Interpreter {
    pub(crate) fn define_class(&mut self, decl: &ClassDecl) -> Result<(), RuntimeDiagnostic> {
        self.env.define(decl.name.clone(), Value::Null);

        let superclass = match &decl.superclass {
            Some(expr) => match self.eval_forced(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeDiagnostic::new(
                        RuntimeError::type_error("Superclass must be a class."),
                        expr.span,
                    ))
                }
            },
            None => None,
        };

        let class_env = match &superclass {
            Some(superclass) => {
                let env = self.env.child();
                env.define("super", Value::Class(superclass.clone()));
                env
            }
            None => self.env.clone(),
        };

        let class = self.with_env(class_env, |interp| interp.build_class(decl, superclass))?;
        tracing::debug!(
            class = %class.name,
            methods = class.methods.len(),
            traits = class.traits.len(),
            "defined class"
        );
        self.env.define(decl.name.clone(), Value::Class(class));
        Ok(())
    }

    /// Runs with the class frame (the `super` frame, when there is one)
    /// as the current environment.
    fn build_class(
        &mut self,
        decl: &ClassDecl,
        superclass: Option<Arc<Class>>,
    ) -> Result<Arc<Class>, RuntimeDiagnostic> {
        let class_env = self.env.clone();
        let traits = self.eval_traits(&decl.traits)?;

        let mut methods: IndexMap<String, Arc<Closure>> = decl
            .methods
            .iter()
            .map(|m| {
                let name = m.display_name();
                let closure = Closure::new(m.clone(), class_env.clone(), name == "init");
                (name.to_string(), closure)
            })
            .collect();

        let mut from_traits: IndexMap<String, Arc<Closure>> = IndexMap::new();
        for tr in &traits {
            for (name, method) in &tr.methods {
                if let Some(existing) = from_traits.get(name) {
                    if !Arc::ptr_eq(existing, method) {
                        return Err(RuntimeError::ConflictingTraitMethod(name.clone()).into());
                    }
                    continue;
                }
                from_traits.insert(name.clone(), method.clone());

                if let Some(own) = methods.get(name) {
                    if name != "init" {
                        verify_signature(&own.decl, &method.decl).map_err(|e| {
                            RuntimeDiagnostic::new(e, own.decl.span)
                        })?;
                    }
                    continue;
                }
                if method.is_abstract() {
                    let inherited = superclass
                        .as_ref()
                        .is_some_and(|s| s.find_method(name).is_some());
                    if !inherited {
                        return Err(RuntimeError::MissingAbstractMethod {
                            class: decl.name.clone(),
                            method: name.clone(),
                            tr: tr.name.clone(),
                        }
                        .into());
                    }
                }
            }
        }
        for (name, method) in from_traits {
            if !method.is_abstract() && !methods.contains_key(&name) {
                methods.insert(name, method);
            }
        }

        let self_env = class_env.child();
        let statics: IndexMap<String, Arc<Closure>> = decl
            .static_methods
            .iter()
            .map(|m| {
                let closure = Closure::new(m.clone(), self_env.clone(), false);
                (m.display_name().to_string(), closure)
            })
            .collect();
        let meta = Arc::new(Class {
            name: format!("{}_meta", decl.name),
            superclass: None,
            methods: statics,
            traits: Vec::new(),
            meta: None,
            statics: Mutex::new(IndexMap::new()),
        });

        let class = Arc::new(Class {
            name: decl.name.clone(),
            superclass,
            methods,
            traits,
            meta: Some(meta),
            statics: Mutex::new(IndexMap::new()),
        });
        self_env.define("Self", Value::Class(class.clone()));
        Ok(class)
    }

    pub(crate) fn define_trait(&mut self, decl: &TraitDecl) -> Result<(), RuntimeDiagnostic> {
        self.env.define(decl.name.clone(), Value::Null);
        let composed = self.eval_traits(&decl.traits)?;

        let mut methods: IndexMap<String, Arc<Closure>> = IndexMap::new();
        for tr in &composed {
            for (name, method) in &tr.methods {
                match methods.get(name) {
                    Some(existing) if Arc::ptr_eq(existing, method) => {}
                    Some(_) => {
                        return Err(RuntimeError::ConflictingTraitMethod(name.clone()).into())
                    }
                    None => {
                        methods.insert(name.clone(), method.clone());
                    }
                }
            }
        }
        for m in &decl.methods {
            let name = m.display_name();
            if methods.contains_key(name) {
                return Err(RuntimeDiagnostic::new(
                    RuntimeError::ConflictingTraitMethod(name.to_string()),
                    m.span,
                ));
            }
            methods.insert(
                name.to_string(),
                Closure::new(m.clone(), self.env.clone(), false),
            );
        }

        tracing::debug!(name = %decl.name, methods = methods.len(), "defined trait");
        let value = Trait {
            name: decl.name.clone(),
            methods,
            traits: composed,
        };
        self.env
            .define(decl.name.clone(), Value::Trait(Arc::new(value)));
        Ok(())
    }

    fn eval_traits(&mut self, exprs: &[Expr]) -> Result<Vec<Arc<Trait>>, RuntimeDiagnostic> {
        let mut traits = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match self.eval_forced(expr)? {
                Value::Trait(tr) => traits.push(tr),
                other => {
                    let shown = self.stringify(&other)?;
                    return Err(RuntimeDiagnostic::new(
                        RuntimeError::type_error(format!("'{shown}' is not a trait.")),
                        expr.span,
                    ));
                }
            }
        }
        Ok(traits)
    }
}

/// A class method implementing a trait method must match it in
/// asyncness, parameter count, and parameter names.
fn verify_signature(own: &FnDecl, required: &FnDecl) -> Result<(), RuntimeError> {
    let name = own.display_name();
    if own.is_async != required.is_async {
        let (message, hint) = if required.is_async {
            (
                format!("Method '{name}' must be async."),
                "Add the 'async' keyword to the method declaration.".to_string(),
            )
        } else {
            (
                format!("Method '{name}' must not be async."),
                "Remove the 'async' keyword from the method declaration.".to_string(),
            )
        };
        return Err(RuntimeError::SignatureMismatch { message, hint });
    }
    if own.arity() != required.arity() {
        return Err(RuntimeError::SignatureMismatch {
            message: format!("Method '{name}' has a mismatched parameter count."),
            hint: format!(
                "The method should have {} parameters, but it has {} instead.",
                required.arity(),
                own.arity()
            ),
        });
    }
    for (expected, actual) in required.params.iter().zip(&own.params) {
        if expected.name != actual.name {
            return Err(RuntimeError::SignatureMismatch {
                message: format!("Parameter name mismatch in method '{name}'."),
                hint: format!(
                    "The name of the parameter should be '{}', but it is '{}' instead.",
                    expected.name, actual.name
                ),
            });
        }
    }
    Ok(())
}

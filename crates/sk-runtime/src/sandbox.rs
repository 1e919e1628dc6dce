use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, FnPtr, Scope, AST};
use sk_core::{
    ScriptletError, DEFINE_INVALID, DEFINE_MISSING, FACTORY_CALL, SCRIPTLET_COMPILE,
    SCRIPTLET_EVAL,
};
use tracing::{debug, trace};

use crate::cache::CompiledArtifact;
use crate::helpers::rhai_bridge::{into_eval_error, map_eval_error};

/// What a scriptlet registered through `define`.
#[derive(Debug, Clone)]
pub struct Definition {
    pub dependencies: Vec<String>,
    pub factory: Dynamic,
}

impl Definition {
    pub fn is_invocable(&self) -> bool {
        self.factory.is::<FnPtr>()
    }
}

/// Long-lived Rhai engine whose only loader-facing capability is `define`.
pub struct Sandbox {
    engine: Engine,
    captured: Rc<RefCell<Option<Definition>>>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_extensions(|_| {})
    }

    /// Builds the sandbox, letting the caller register host-only functions.
    pub fn with_extensions(extend: impl FnOnce(&mut Engine)) -> Self {
        let captured: Rc<RefCell<Option<Definition>>> = Rc::new(RefCell::new(None));
        let mut engine = Engine::new();
        engine.set_strict_variables(true);
        engine.on_print(|text| debug!(target: "scriptlet", "{}", text));
        engine.on_debug(|text, source, _| {
            debug!(target: "scriptlet", source = source.unwrap_or_default(), "{}", text)
        });

        let slot = Rc::clone(&captured);
        engine.register_fn("define", move |factory: Dynamic| {
            *slot.borrow_mut() = Some(Definition {
                dependencies: Vec::new(),
                factory,
            });
        });

        let slot = Rc::clone(&captured);
        engine.register_fn(
            "define",
            move |dependencies: Dynamic, factory: Dynamic| -> Result<(), Box<EvalAltResult>> {
                let names = dependency_names(dependencies).map_err(into_eval_error)?;
                *slot.borrow_mut() = Some(Definition {
                    dependencies: names,
                    factory,
                });
                Ok(())
            },
        );
        engine.register_fn(
            "define",
            |_: Dynamic, _: Dynamic, _: Dynamic| -> Result<(), Box<EvalAltResult>> {
                Err(into_eval_error(ScriptletError::new(
                    DEFINE_INVALID,
                    "define takes a factory, optionally preceded by a dependency list.",
                )))
            },
        );

        extend(&mut engine);
        Self { engine, captured }
    }

    pub fn compile(&self, path: &Path, source: &str) -> Result<AST, ScriptletError> {
        let mut ast = self.engine.compile(source).map_err(|error| {
            ScriptletError::new(
                SCRIPTLET_COMPILE,
                format!("{}: {}", path.display(), error),
            )
        })?;
        ast.set_source(path.display().to_string());
        Ok(ast)
    }

    /// Runs the scriptlet body and reads out its last `define` call.
    pub fn evaluate(&self, artifact: &CompiledArtifact) -> Result<Definition, ScriptletError> {
        self.captured.borrow_mut().take();
        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &artifact.compiled)
            .map_err(|error| map_eval_error(SCRIPTLET_EVAL, &artifact.path, &error))?;

        let definition = self.captured.borrow_mut().take().ok_or_else(|| {
            ScriptletError::new(
                DEFINE_MISSING,
                format!("{} never called define.", artifact.path.display()),
            )
        })?;
        trace!(
            path = %artifact.path.display(),
            dependencies = ?definition.dependencies,
            invocable = definition.is_invocable(),
            "scriptlet evaluated"
        );
        Ok(definition)
    }

    /// Calls an invocable factory with `args`; plain values are returned unchanged.
    ///
    /// The factory runs against its own scriptlet's AST. A function pointer it
    /// returns is later called against the caller's AST, so exported functions
    /// must be closures: `Fn("named")` only resolves inside its own scriptlet.
    pub fn invoke(
        &self,
        artifact: &CompiledArtifact,
        factory: Dynamic,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, ScriptletError> {
        if !factory.is::<FnPtr>() {
            return Ok(factory);
        }
        let fn_ptr = factory.cast::<FnPtr>();
        fn_ptr
            .call::<Dynamic>(&self.engine, &artifact.compiled, args)
            .map_err(|error| map_eval_error(FACTORY_CALL, &artifact.path, &error))
    }
}

fn dependency_names(dependencies: Dynamic) -> Result<Vec<String>, ScriptletError> {
    let type_name = dependencies.type_name();
    let Some(dependencies) = dependencies.try_cast::<Array>() else {
        return Err(ScriptletError::new(
            DEFINE_INVALID,
            format!("Dependency list must be an array, got {}.", type_name),
        ));
    };
    let mut names = Vec::with_capacity(dependencies.len());
    for (index, entry) in dependencies.into_iter().enumerate() {
        let name = entry.into_immutable_string().map_err(|type_name| {
            ScriptletError::new(
                DEFINE_INVALID,
                format!("Dependency #{} must be a string, got {}.", index, type_name),
            )
        })?;
        names.push(name.to_string());
    }
    Ok(names)
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod sandbox_tests {
    use super::*;
    use rhai::Position;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn artifact(sandbox: &Sandbox, source: &str) -> CompiledArtifact {
        let path = PathBuf::from("/sandbox/test.rhai");
        CompiledArtifact {
            compiled: sandbox.compile(&path, source).expect("compile"),
            path,
            last_modified: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn define_with_value_only_has_no_dependencies() {
        let sandbox = Sandbox::new();
        let definition = sandbox
            .evaluate(&artifact(&sandbox, "define(42);"))
            .expect("evaluate");
        assert!(definition.dependencies.is_empty());
        assert!(!definition.is_invocable());
        assert_eq!(definition.factory.as_int(), Ok(42));
    }

    #[test]
    fn define_with_list_keeps_declaration_order() {
        let sandbox = Sandbox::new();
        let definition = sandbox
            .evaluate(&artifact(
                &sandbox,
                r#"define(["./b", "$load", "os"], |b, load, os| b);"#,
            ))
            .expect("evaluate");
        assert_eq!(definition.dependencies, vec!["./b", "$load", "os"]);
        assert!(definition.is_invocable());
    }

    #[test]
    fn last_define_call_wins() {
        let sandbox = Sandbox::new();
        let definition = sandbox
            .evaluate(&artifact(&sandbox, r#"define(["x"], |x| x); define(7);"#))
            .expect("evaluate");
        assert!(definition.dependencies.is_empty());
        assert_eq!(definition.factory.as_int(), Ok(7));
    }

    #[test]
    fn captured_state_does_not_leak_between_evaluations() {
        let sandbox = Sandbox::new();
        sandbox
            .evaluate(&artifact(&sandbox, "define(1);"))
            .expect("first");
        let error = sandbox
            .evaluate(&artifact(&sandbox, "let unused = 2;"))
            .expect_err("no define");
        assert_eq!(error.code, DEFINE_MISSING);
    }

    #[test]
    fn undeclared_variables_fail_to_compile() {
        let sandbox = Sandbox::new();
        sandbox
            .evaluate(&artifact(&sandbox, "let leaked = 1; define(leaked);"))
            .expect("first");
        let error = sandbox.compile(Path::new("/sandbox/next.rhai"), "define(leaked);");
        assert_eq!(error.expect_err("strict variables").code, SCRIPTLET_COMPILE);
    }

    #[test]
    fn non_string_dependency_is_rejected() {
        let sandbox = Sandbox::new();
        let error = sandbox
            .evaluate(&artifact(&sandbox, "define([1], || 1);"))
            .expect_err("invalid");
        assert_eq!(error.code, DEFINE_INVALID);
    }

    #[test]
    fn malformed_define_arguments_are_rejected() {
        let sandbox = Sandbox::new();
        for source in [r#"define("x", || 1);"#, "define(#{}, 2);", "define(1, 2, 3);"] {
            let error = sandbox
                .evaluate(&artifact(&sandbox, source))
                .expect_err("invalid define");
            assert_eq!(error.code, DEFINE_INVALID, "source: {}", source);
        }
    }

    #[test]
    fn runtime_failures_in_body_and_factory_are_classified() {
        let sandbox = Sandbox::new();
        let error = sandbox
            .evaluate(&artifact(&sandbox, r#"throw "body";"#))
            .expect_err("body throws");
        assert_eq!(error.code, SCRIPTLET_EVAL);

        let broken = artifact(&sandbox, r#"define(|| { throw "factory"; });"#);
        let definition = sandbox.evaluate(&broken).expect("evaluate");
        let error = sandbox
            .invoke(&broken, definition.factory, Vec::new())
            .expect_err("factory throws");
        assert_eq!(error.code, FACTORY_CALL);
        assert!(error.message.contains("factory"));
    }

    #[test]
    fn invoke_passes_positional_arguments() {
        let sandbox = Sandbox::new();
        let adder = artifact(&sandbox, r#"let base = 100; define(["a", "b"], |a, b| base + a * 10 + b);"#);
        let definition = sandbox.evaluate(&adder).expect("evaluate");
        let value = sandbox
            .invoke(
                &adder,
                definition.factory,
                vec![Dynamic::from_int(4), Dynamic::from_int(2)],
            )
            .expect("invoke");
        assert_eq!(value.as_int(), Ok(142));
    }

    #[test]
    fn extensions_are_registered_on_the_engine() {
        let sandbox = Sandbox::with_extensions(|engine| {
            engine.register_fn("host_only", || -> Result<i64, Box<EvalAltResult>> {
                Err(Box::new(EvalAltResult::ErrorRuntime(
                    Dynamic::from("denied".to_string()),
                    Position::NONE,
                )))
            });
        });
        let error = sandbox
            .evaluate(&artifact(&sandbox, "define(host_only());"))
            .expect_err("extension throws");
        assert_eq!(error.code, SCRIPTLET_EVAL);
        assert!(error.message.contains("denied"));
    }
}

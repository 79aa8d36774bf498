use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info_span};

use crate::annotations::AnnotationMap;
use crate::ast::Module;
use crate::builtins::Builtins;
use crate::diagnostics::Diagnostics;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::source::SourceFile;
use crate::typechecker::TypeChecker;
use crate::types::Type;

#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// 0 is silent; 1 logs escapes and the final bindings; 2 adds function
    /// entry and exit; 3 traces every inferred type.
    pub verbosity: u8,
    pub dump_tokens: bool,
    pub comment_annotations: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            verbosity: 0,
            dump_tokens: false,
            comment_annotations: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Binding {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug)]
pub struct CheckReport {
    pub module: Module,
    pub diagnostics: Diagnostics,
    /// Module-level names and their final types, sorted by name.
    pub bindings: Vec<(String, Type)>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn rendered_bindings(&self) -> Vec<Binding> {
        self.bindings
            .iter()
            .map(|(name, ty)| Binding {
                name: name.clone(),
                ty: ty.to_string(),
            })
            .collect()
    }
}

pub struct Inquisitor {
    options: CheckOptions,
    builtins: Builtins,
}

impl Inquisitor {
    pub fn new(options: CheckOptions) -> Self {
        Self {
            options,
            builtins: Builtins::standard(),
        }
    }

    pub fn with_builtins(mut self, builtins: Builtins) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Lexes, parses and type-checks one file. Front-end failures are errors;
    /// type violations are reported through the returned diagnostics.
    pub fn check(&self, source: &SourceFile) -> Result<CheckReport> {
        let _span = info_span!("check", file = %source.display_name()).entered();

        let tokens = Lexer::new(source)
            .tokenize()
            .with_context(|| format!("failed to lex {}", source.display_name()))?;

        if self.options.dump_tokens {
            for token in &tokens {
                println!("{token:?}");
            }
        }

        let module = Parser::new(tokens)
            .parse()
            .with_context(|| format!("failed to parse {}", source.display_name()))?;

        let annotations = if self.options.comment_annotations {
            AnnotationMap::from_source(&source.contents)
        } else {
            AnnotationMap::new()
        };
        debug!(
            statements = module.statements.len(),
            annotations = annotations.len(),
            "parsed module"
        );

        let mut checker = TypeChecker::with_builtins(self.builtins.clone(), self.options.verbosity)
            .with_annotations(annotations);
        checker.check_module(&module);
        let bindings = checker.bindings();
        let diagnostics = checker.into_diagnostics();
        debug!(violations = diagnostics.len(), "check finished");

        Ok(CheckReport {
            module,
            diagnostics,
            bindings,
        })
    }
}

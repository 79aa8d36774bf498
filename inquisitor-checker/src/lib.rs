mod annotations;
mod ast;
mod builtins;
mod diagnostics;
mod error;
mod harness;
mod inquisitor;
mod lexer;
mod parser;
mod scope;
mod source;
mod typechecker;
mod types;

pub use crate::annotations::{scan_comment_annotations, AnnotationMap};
pub use crate::ast::{
    AssignmentStatement, BinaryExpression, BinaryOperator, Block, CallArgument, CallExpression,
    ConditionalKind, ConditionalStatement, DictEntry, DictLiteral, Expression, ExpressionKind,
    ExpressionStatement, FunctionParameter, FunctionStatement, Identifier, IndexExpression,
    ListLiteral, Literal, MemberExpression, Module, ParameterKind, ReturnStatement, SourceSpan,
    Statement, UnaryExpression, UnaryOperator, UnsupportedExpression, UnsupportedStatement,
};
pub use crate::builtins::Builtins;
pub use crate::diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics};
pub use crate::error::{CheckError, CheckResult};
pub use crate::harness::{compare, expected_errors, run_sample, HarnessOutcome, HarnessEntry};
pub use crate::inquisitor::{Binding, CheckOptions, CheckReport, Inquisitor};
pub use crate::lexer::{Keyword, Lexer, Token, TokenKind};
pub use crate::parser::Parser;
pub use crate::scope::{ScopeId, Scopes};
pub use crate::source::{SourceFile, SourceId};
pub use crate::typechecker::TypeChecker;
pub use crate::types::{call_result, fits, merge, resolve, FuncType, Type, TypeModelError};

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::annotations::AnnotationMap;
use crate::ast::{
    AssignmentStatement, BinaryExpression, BinaryOperator, CallExpression, ConditionalStatement,
    Expression, ExpressionKind, FunctionStatement, Literal, Module, ParameterKind,
    ReturnStatement, SourceSpan, Statement, UnaryExpression, UnaryOperator,
};
use crate::builtins::Builtins;
use crate::diagnostics::Diagnostics;
use crate::error::{CheckError, CheckResult};
use crate::scope::{ScopeId, Scopes};
use crate::types::{call_result, fits, format_list, merge, FuncType, Type, TypeModelError};

/// Names that always resolve to a fixed type and may never be rebound.
const RESERVED_CONSTANTS: &[(&str, &str)] = &[("None", "None"), ("True", "bool"), ("False", "bool")];

fn reserved_constant(name: &str) -> Option<Type> {
    RESERVED_CONSTANTS
        .iter()
        .find(|(constant, _)| *constant == name)
        .map(|(_, ty)| Type::primitive(*ty))
}

fn binary_method(operator: BinaryOperator) -> Option<&'static str> {
    match operator {
        BinaryOperator::Add => Some("__add__"),
        BinaryOperator::Multiply => Some("__mul__"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Record violations per statement and keep walking.
    Accumulate,
    /// Abort the walk on the first violation.
    FailFast,
}

#[derive(Debug, Clone)]
struct ReturnContext {
    function: String,
    expected: Type,
}

#[derive(Debug, Default)]
struct BlockOutcome {
    returns: Option<Type>,
    always_returns: bool,
    /// Some statement was skipped as unsupported, so the returns are incomplete.
    escaped: bool,
}

impl BlockOutcome {
    fn record_return(&mut self, ty: Type) {
        self.returns = Some(match self.returns.take() {
            Some(previous) => merge(previous, ty),
            None => ty,
        });
    }
}

pub struct TypeChecker {
    scopes: Scopes,
    module_scope: ScopeId,
    builtins: Builtins,
    annotations: AnnotationMap,
    diagnostics: Diagnostics,
    verbosity: u8,
}

impl TypeChecker {
    pub fn new(verbosity: u8) -> Self {
        Self::with_builtins(Builtins::standard(), verbosity)
    }

    /// Builds a checker whose outermost scope holds the globals of `builtins`.
    pub fn with_builtins(builtins: Builtins, verbosity: u8) -> Self {
        let mut scopes = Scopes::new();
        let globals = scopes.root();
        for (name, ty) in builtins.globals() {
            scopes.add(globals, name.clone(), ty.clone());
        }
        let module_scope = scopes.extend(globals);

        Self {
            scopes,
            module_scope,
            builtins,
            annotations: AnnotationMap::new(),
            diagnostics: Diagnostics::new(),
            verbosity,
        }
    }

    pub fn with_annotations(mut self, annotations: AnnotationMap) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn check_module(&mut self, module: &Module) {
        let scope = self.module_scope;
        if let Err(error) = self.run_through(&module.statements, scope, Mode::Accumulate, None) {
            self.record(error);
        }

        if self.verbosity > 0 {
            for (name, ty) in self.scopes.bindings(scope) {
                debug!(target: "inquisitor::bindings", "{} :: {}", name, ty);
            }
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Type bound to `name` at module level, including builtin globals.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.lookup(self.module_scope, name)
    }

    /// Module-level bindings sorted by name.
    pub fn bindings(&self) -> Vec<(String, Type)> {
        self.scopes
            .bindings(self.module_scope)
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect()
    }

    fn record(&mut self, error: CheckError) {
        if let Some(diagnostic) = error.into_diagnostic() {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Handles an error raised by one statement according to `mode`.
    fn absorb(&mut self, error: CheckError, mode: Mode) -> CheckResult<()> {
        if let CheckError::Unsupported { construct, span } = &error {
            if self.verbosity > 0 {
                debug!(line = span.line, "unsupported {}", construct);
            }
            return Ok(());
        }
        match mode {
            Mode::Accumulate => {
                self.record(error);
                Ok(())
            }
            Mode::FailFast => Err(error),
        }
    }

    fn run_through(
        &mut self,
        statements: &[Statement],
        scope: ScopeId,
        mode: Mode,
        context: Option<&ReturnContext>,
    ) -> CheckResult<BlockOutcome> {
        for statement in statements {
            if let Statement::Function(function) = statement {
                match self.declared_signature(function) {
                    Ok(signature) => {
                        self.scopes
                            .add(scope, function.name.clone(), Type::Func(signature));
                    }
                    Err(error) => self.absorb(error, mode)?,
                }
            }
        }

        let mut outcome = BlockOutcome::default();
        let mut checked_functions = BTreeSet::new();
        for statement in statements {
            let result = self.check_statement(
                statement,
                scope,
                context,
                &mut outcome,
                &mut checked_functions,
            );
            if let Err(error) = result {
                outcome.escaped |= error.is_unsupported();
                self.absorb(error, mode)?;
            }
        }
        Ok(outcome)
    }

    fn check_statement(
        &mut self,
        statement: &Statement,
        scope: ScopeId,
        context: Option<&ReturnContext>,
        outcome: &mut BlockOutcome,
        checked_functions: &mut BTreeSet<String>,
    ) -> CheckResult<()> {
        match statement {
            Statement::Function(function) => {
                checked_functions.insert(function.name.clone());
                self.check_function(function, scope)
            }
            Statement::Assignment(assignment) => {
                self.check_assignment(assignment, scope, checked_functions)
            }
            Statement::Return(ret) => {
                let ty = self.check_return(ret, scope, context)?;
                outcome.record_return(ty);
                outcome.always_returns = true;
                Ok(())
            }
            Statement::Conditional(conditional) => {
                let branch = self.check_conditional(conditional, scope, context)?;
                if let Some(ty) = branch.returns {
                    outcome.record_return(ty);
                }
                outcome.always_returns |= branch.always_returns;
                outcome.escaped |= branch.escaped;
                Ok(())
            }
            Statement::Expression(statement) => {
                self.infer(&statement.expression, scope)?;
                Ok(())
            }
            Statement::Pass(_) => Ok(()),
            Statement::Unsupported(unsupported) => Err(CheckError::unsupported(
                unsupported.construct.clone(),
                unsupported.span,
            )),
        }
    }

    /// Signature of a function from its annotations alone; unannotated
    /// parameters and returns are `Unknown`.
    fn declared_signature(&mut self, function: &FunctionStatement) -> CheckResult<FuncType> {
        let mut params = Vec::new();
        let mut names = Vec::new();
        let mut kwargs = Vec::new();

        for parameter in &function.parameters {
            if parameter.kind != ParameterKind::Positional {
                return Err(CheckError::unsupported(
                    "variadic parameters",
                    parameter.span,
                ));
            }
            let declared = match &parameter.annotation {
                Some(annotation) => self.translate_annotation(annotation)?,
                None => Type::Unknown,
            };
            if parameter.default_value.is_some() {
                kwargs.push((parameter.name.clone(), declared));
            } else {
                params.push(declared);
                names.push(parameter.name.clone());
            }
        }

        let ret = match &function.return_annotation {
            Some(annotation) => self.translate_annotation(annotation)?,
            None => Type::Unknown,
        };

        Ok(FuncType::with_kwargs(params, kwargs, ret).named(names))
    }

    /// Declared signature plus a check that every default value fits its
    /// parameter. Defaults are evaluated where the `def` statement stands.
    fn signature(&mut self, function: &FunctionStatement, scope: ScopeId) -> CheckResult<FuncType> {
        let declared = self.declared_signature(function)?;

        let defaults = function
            .parameters
            .iter()
            .filter_map(|parameter| Some((parameter, parameter.default_value.as_ref()?)));
        for ((parameter, default), (_, expected)) in defaults.zip(&declared.kwargs) {
            let actual = self.infer(default, scope)?;
            if !fits(&actual, expected) {
                return Err(CheckError::heresy(
                    format!(
                        "default value of parameter '{}' of '{}' is '{}' but should be '{}'",
                        parameter.name, function.name, actual, expected
                    ),
                    default.span,
                ));
            }
        }

        Ok(declared)
    }

    fn check_function(&mut self, function: &FunctionStatement, scope: ScopeId) -> CheckResult<()> {
        let declared = self.signature(function, scope)?;
        if self.verbosity > 1 {
            debug!(line = function.span.line, "entering function '{}'", function.name);
        }

        let body_scope = self.scopes.extend(scope);
        for (name, ty) in declared.param_names.iter().zip(&declared.params) {
            self.scopes.add(body_scope, name.clone(), ty.clone());
        }
        for (name, ty) in &declared.kwargs {
            self.scopes.add(body_scope, name.clone(), ty.clone());
        }

        let context = ReturnContext {
            function: function.name.clone(),
            expected: (*declared.ret).clone(),
        };
        let outcome = self.run_through(
            &function.body.statements,
            body_scope,
            Mode::FailFast,
            Some(&context),
        );
        self.scopes.discard(body_scope);
        let outcome = outcome?;

        let apparent = match outcome.returns {
            // Trust the annotation when part of the body could not be checked.
            _ if outcome.escaped && !outcome.always_returns => (*declared.ret).clone(),
            None => Type::none(),
            Some(ty) if outcome.always_returns => ty,
            Some(ty) => merge(ty, Type::none()),
        };
        if self.verbosity > 1 {
            debug!(
                line = function.span.line,
                "leaving function '{}' with apparent return '{}'", function.name, apparent
            );
        }

        if !fits(&apparent, &declared.ret) {
            return Err(CheckError::heresy(
                format!(
                    "return type of '{}' declared as '{}' but appears to be '{}'",
                    function.name, declared.ret, apparent
                ),
                function.span,
            ));
        }

        self.scopes.add(
            scope,
            function.name.clone(),
            Type::Func(declared.with_return(apparent)),
        );
        Ok(())
    }

    /// `checked_functions` holds the names of the `def` statements already
    /// walked in this block; a pass-1 signature of a later `def` is simply
    /// shadowed.
    fn check_assignment(
        &mut self,
        assignment: &AssignmentStatement,
        scope: ScopeId,
        checked_functions: &BTreeSet<String>,
    ) -> CheckResult<()> {
        if assignment.targets.len() != 1 {
            return Err(CheckError::unsupported(
                "multiple assignment targets",
                assignment.span,
            ));
        }
        let target = &assignment.targets[0];
        let ExpressionKind::Identifier(identifier) = &target.kind else {
            return Err(CheckError::unsupported(
                format!("assignment to {}", target.kind.describe()),
                target.span,
            ));
        };
        if reserved_constant(&identifier.name).is_some() {
            return Err(CheckError::heresy(
                format!("cannot redefine built-in constant '{}'", identifier.name),
                assignment.span,
            ));
        }

        let declared = match &assignment.annotation {
            Some(annotation) => Some(self.translate_annotation(annotation)?),
            None => self.comment_annotation(assignment.span.line)?,
        };
        let value = match &assignment.value {
            Some(value) => Some(self.infer(value, scope)?),
            None => None,
        };

        let bound = match (declared, value) {
            (Some(declared), Some(value)) => {
                if !fits(&value, &declared) {
                    return Err(CheckError::heresy(
                        format!(
                            "'{}' declared as '{}' but assigned '{}'",
                            identifier.name, declared, value
                        ),
                        assignment.span,
                    ));
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(value)) => value,
            (None, None) => return Ok(()),
        };

        let previous = checked_functions.contains(&identifier.name)
            && self
                .scopes
                .lookup_local(scope, &identifier.name)
                .map(Type::is_callable)
                .unwrap_or(false);
        let rebinds_function = previous && !bound.is_callable();
        if rebinds_function {
            let message = format!(
                "'{}' was bound to a function and is rebound to '{}'",
                identifier.name, bound
            );
            self.scopes.add(scope, identifier.name.clone(), bound);
            return Err(CheckError::suspicion(message, assignment.span));
        }

        self.scopes.add(scope, identifier.name.clone(), bound);
        Ok(())
    }

    /// Declared type from a `#::` comment on `line`, if any.
    fn comment_annotation(&mut self, line: usize) -> CheckResult<Option<Type>> {
        let Some(expression) = self.annotations.get(line).cloned() else {
            return Ok(None);
        };
        match self.translate_annotation(&expression) {
            Ok(ty) => Ok(Some(ty)),
            Err(CheckError::Unsupported { construct, .. }) => {
                debug!(line, "ignoring comment annotation: unsupported {}", construct);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn check_return(
        &mut self,
        ret: &ReturnStatement,
        scope: ScopeId,
        context: Option<&ReturnContext>,
    ) -> CheckResult<Type> {
        let Some(context) = context else {
            return Err(CheckError::heresy("'return' outside of function", ret.span));
        };

        let ty = match &ret.expression {
            Some(expression) => self.infer(expression, scope)?,
            None => Type::none(),
        };
        if self.verbosity > 2 {
            trace!(
                line = ret.span.line,
                "checking if '{}' fits expected return '{}'", ty, context.expected
            );
        }
        if !fits(&ty, &context.expected) {
            return Err(CheckError::heresy(
                format!(
                    "function '{}' returns '{}' but should return '{}'",
                    context.function, ty, context.expected
                ),
                ret.span,
            ));
        }
        Ok(ty)
    }

    fn check_conditional(
        &mut self,
        conditional: &ConditionalStatement,
        scope: ScopeId,
        context: Option<&ReturnContext>,
    ) -> CheckResult<BlockOutcome> {
        if conditional.has_elif() {
            return Err(CheckError::unsupported("elif chain", conditional.span));
        }
        if self.verbosity > 2 {
            trace!(
                line = conditional.span.line,
                "exploring conditional expecting to return '{}'",
                context
                    .map(|context| context.expected.to_string())
                    .unwrap_or_else(|| "nothing".to_string())
            );
        }

        let consequent = self.check_branch(&conditional.consequent.statements, scope, context)?;
        let alternative = match &conditional.alternative {
            Some(block) => Some(self.check_branch(&block.statements, scope, context)?),
            None => None,
        };

        let alternative_escaped = alternative
            .as_ref()
            .map(|branch| branch.escaped)
            .unwrap_or(false);
        let always_returns = consequent.always_returns
            && alternative
                .as_ref()
                .map(|branch| branch.always_returns)
                .unwrap_or(false);
        let returns = [
            consequent.returns,
            alternative.and_then(|branch| branch.returns),
        ]
        .into_iter()
        .flatten()
        .reduce(merge);

        Ok(BlockOutcome {
            returns,
            always_returns,
            escaped: consequent.escaped || alternative_escaped,
        })
    }

    fn check_branch(
        &mut self,
        statements: &[Statement],
        scope: ScopeId,
        context: Option<&ReturnContext>,
    ) -> CheckResult<BlockOutcome> {
        let branch_scope = self.scopes.extend(scope);
        let outcome = self.run_through(statements, branch_scope, Mode::FailFast, context);
        self.scopes.discard(branch_scope);
        outcome
    }

    fn translate_annotation(&mut self, annotation: &Expression) -> CheckResult<Type> {
        match &annotation.kind {
            ExpressionKind::Identifier(identifier) => Ok(match identifier.name.as_str() {
                "Any" => Type::Unknown,
                "None" => Type::none(),
                name => Type::primitive(name),
            }),
            ExpressionKind::List(list) => match list.elements.as_slice() {
                [] => Err(CheckError::heresy(
                    "cannot type an empty list; try [Any] instead",
                    annotation.span,
                )),
                [element] => Ok(Type::list(self.translate_annotation(element)?)),
                _ => Err(CheckError::heresy(
                    "cannot have multiple types in a list annotation",
                    annotation.span,
                )),
            },
            ExpressionKind::Dict(dict) => match dict.entries.as_slice() {
                [] => Err(CheckError::heresy(
                    "cannot type an empty dict; try {Any: Any} instead",
                    annotation.span,
                )),
                [entry] => {
                    let key = self.translate_annotation(&entry.key)?;
                    let value = self.translate_annotation(&entry.value)?;
                    Ok(Type::dict(key, value))
                }
                _ => Err(CheckError::heresy(
                    "cannot have multiple key/value types in a dict annotation",
                    annotation.span,
                )),
            },
            ExpressionKind::Index(index) => match &index.object.kind {
                ExpressionKind::Identifier(wrapper)
                    if wrapper.name == "Maybe" || wrapper.name == "Optional" =>
                {
                    let concrete = self.translate_annotation(&index.index)?;
                    Type::maybe(concrete)
                        .map_err(|error| CheckError::heresy(error.to_string(), annotation.span))
                }
                _ => Err(CheckError::unsupported(
                    "generic annotation",
                    annotation.span,
                )),
            },
            other => Err(CheckError::unsupported(
                format!("annotation {}", other.describe()),
                annotation.span,
            )),
        }
    }

    fn infer(&mut self, expression: &Expression, scope: ScopeId) -> CheckResult<Type> {
        let ty = self.infer_kind(expression, scope)?;
        if self.verbosity > 2 {
            trace!(
                line = expression.span.line,
                "type of {} is '{}'",
                expression.kind.describe(),
                ty
            );
        }
        Ok(ty)
    }

    fn infer_kind(&mut self, expression: &Expression, scope: ScopeId) -> CheckResult<Type> {
        match &expression.kind {
            ExpressionKind::Literal(literal) => Ok(match literal {
                Literal::Integer(_) => Type::int(),
                Literal::Float(_) => Type::float(),
                Literal::Imaginary(_) => Type::complex(),
                Literal::String(_) => Type::str(),
                Literal::Bytes(_) => Type::bytes(),
            }),
            ExpressionKind::Identifier(identifier) => {
                if let Some(ty) = reserved_constant(&identifier.name) {
                    return Ok(ty);
                }
                self.scopes
                    .lookup(scope, &identifier.name)
                    .cloned()
                    .ok_or_else(|| {
                        CheckError::heresy(
                            format!("name '{}' is used but not defined", identifier.name),
                            identifier.span,
                        )
                    })
            }
            ExpressionKind::List(list) => match list.elements.first() {
                Some(first) => Ok(Type::list(self.infer(first, scope)?)),
                None => Ok(Type::empty_list()),
            },
            ExpressionKind::Dict(dict) => match dict.entries.first() {
                Some(entry) => {
                    let key = self.infer(&entry.key, scope)?;
                    let value = self.infer(&entry.value, scope)?;
                    Ok(Type::dict(key, value))
                }
                None => Ok(Type::empty_dict()),
            },
            ExpressionKind::Unary(unary) => self.infer_unary(unary, expression.span, scope),
            ExpressionKind::Binary(binary) => self.infer_binary(binary, expression.span, scope),
            ExpressionKind::Call(call) => self.infer_call(call, expression.span, scope),
            ExpressionKind::Tuple(_)
            | ExpressionKind::Member(_)
            | ExpressionKind::Index(_)
            | ExpressionKind::Unsupported(_) => Err(CheckError::unsupported(
                expression.kind.describe(),
                expression.span,
            )),
        }
    }

    fn infer_unary(
        &mut self,
        unary: &UnaryExpression,
        span: SourceSpan,
        scope: ScopeId,
    ) -> CheckResult<Type> {
        let operand = self.infer(&unary.operand, scope)?;
        let numeric = matches!(
            operand.primitive_name(),
            Some("int") | Some("float") | Some("complex")
        );
        match unary.operator {
            UnaryOperator::Not => Ok(Type::bool()),
            UnaryOperator::Negative | UnaryOperator::Positive if numeric => Ok(operand),
            UnaryOperator::Invert if operand == Type::int() => Ok(operand),
            _ => Err(CheckError::unsupported(
                format!("unary operator on '{}'", operand),
                span,
            )),
        }
    }

    fn infer_binary(
        &mut self,
        binary: &BinaryExpression,
        span: SourceSpan,
        scope: ScopeId,
    ) -> CheckResult<Type> {
        let left = self.infer(&binary.left, scope)?;
        let right = self.infer(&binary.right, scope)?;

        let Some(method) = binary_method(binary.operator) else {
            return Err(CheckError::unsupported(
                format!("'{}' operator", binary.operator.symbol()),
                span,
            ));
        };

        let known = left
            .primitive_name()
            .filter(|name| self.builtins.knows_type(name));
        let Some(type_name) = known else {
            if self.verbosity > 0 {
                debug!(
                    line = span.line,
                    "type '{}' is not recognized; cannot check this '{}'",
                    left,
                    binary.operator.symbol()
                );
            }
            return Ok(Type::Unknown);
        };

        let symbol = binary.operator.symbol();
        let Some(signature) = self.builtins.operator(type_name, method) else {
            return Err(CheckError::heresy(
                format!(
                    "unsupported operand types for {}: '{}' and '{}'",
                    symbol, left, right
                ),
                span,
            ));
        };

        call_result(signature, &[left.clone(), right.clone()]).map_err(|_| {
            CheckError::heresy(
                format!(
                    "unsupported operand types for {}: '{}' and '{}' (expected {})",
                    symbol, left, right, signature
                ),
                span,
            )
        })
    }

    fn infer_call(
        &mut self,
        call: &CallExpression,
        span: SourceSpan,
        scope: ScopeId,
    ) -> CheckResult<Type> {
        if matches!(call.callee.kind, ExpressionKind::Member(_)) {
            return Err(CheckError::unsupported("method call", span));
        }

        let callee = self.infer(&call.callee, scope)?;
        let name = match &call.callee.kind {
            ExpressionKind::Identifier(identifier) => identifier.name.clone(),
            _ => callee.to_string(),
        };

        let mut positional = Vec::new();
        let mut keywords = Vec::new();
        for argument in &call.arguments {
            let ty = self.infer(&argument.expression, scope)?;
            match &argument.name {
                Some(keyword) => keywords.push((keyword.clone(), ty)),
                None => positional.push(ty),
            }
        }

        match &callee {
            Type::Func(func) => self.check_call_arguments(&name, func, positional, keywords, span),
            Type::Overload(_) => {
                if !keywords.is_empty() {
                    return Err(CheckError::unsupported(
                        "keyword arguments to an overloaded function",
                        span,
                    ));
                }
                call_result(&callee, &positional).map_err(|error| match error {
                    TypeModelError::NoMatchingOverload { arguments } => CheckError::heresy(
                        format!(
                            "no overload of '{}' matches ({})",
                            name,
                            format_list(&arguments)
                        ),
                        span,
                    ),
                    other => CheckError::heresy(other.to_string(), span),
                })
            }
            other => Err(CheckError::heresy(
                format!("'{}' is not callable", other),
                span,
            )),
        }
    }

    fn check_call_arguments(
        &self,
        name: &str,
        func: &FuncType,
        positional: Vec<Type>,
        keywords: Vec<(String, Type)>,
        span: SourceSpan,
    ) -> CheckResult<Type> {
        let provided = positional.len() + keywords.len();
        let arity_error = || {
            let expected = if func.kwargs.is_empty() {
                func.params.len().to_string()
            } else {
                format!("{} to {}", func.params.len(), func.max_positional())
            };
            CheckError::heresy(
                format!(
                    "function '{}' expects {} arguments, {} provided",
                    name, expected, provided
                ),
                span,
            )
        };

        if positional.len() > func.max_positional() {
            return Err(arity_error());
        }

        let mut slots: Vec<Option<(String, Type)>> = vec![None; func.max_positional()];
        for (index, ty) in positional.into_iter().enumerate() {
            slots[index] = Some(((index + 1).to_string(), ty));
        }
        for (keyword, ty) in keywords {
            let Some(index) = func.keyword_slot(&keyword) else {
                return Err(CheckError::heresy(
                    format!("'{}' got an unexpected keyword argument '{}'", name, keyword),
                    span,
                ));
            };
            if slots[index].is_some() {
                return Err(CheckError::heresy(
                    format!("'{}' got multiple values for argument '{}'", name, keyword),
                    span,
                ));
            }
            slots[index] = Some((format!("'{}'", keyword), ty));
        }

        if slots[..func.params.len()].iter().any(Option::is_none) {
            return Err(arity_error());
        }

        for (index, slot) in slots.iter().enumerate() {
            let (Some((label, actual)), Some(expected)) = (slot, func.positional(index)) else {
                continue;
            };
            if !fits(actual, expected) {
                return Err(CheckError::heresy(
                    format!(
                        "argument {} of call to '{}' should be '{}', not '{}'",
                        label, name, expected, actual
                    ),
                    span,
                ));
            }
        }

        Ok((*func.ret).clone())
    }
}

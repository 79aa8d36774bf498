use inquisitor_checker::{
    BinaryOperator, ConditionalKind, ExpressionKind, Lexer, Literal, Module, ParameterKind,
    Parser, Statement,
};

fn parse(source: &str) -> Module {
    let tokens = Lexer::from_str(source).tokenize().expect("tokenize");
    Parser::new(tokens).parse().expect("parse")
}

#[test]
fn parses_function_signature() {
    let module = parse("def f(a: int, b=1, *rest, **extra) -> [str]:\n    return a\n");
    let Statement::Function(function) = &module.statements[0] else {
        panic!("expected function, found {:?}", module.statements[0]);
    };
    assert_eq!(function.name, "f");
    assert_eq!(function.span.line, 1);
    let kinds: Vec<ParameterKind> = function.parameters.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ParameterKind::Positional,
            ParameterKind::Positional,
            ParameterKind::VarPositional,
            ParameterKind::VarKeyword,
        ]
    );
    assert!(function.parameters[0].annotation.is_some());
    assert!(function.parameters[1].default_value.is_some());
    assert!(matches!(
        function.return_annotation.as_ref().map(|a| &a.kind),
        Some(ExpressionKind::List(_))
    ));
    assert!(matches!(function.body.statements[0], Statement::Return(_)));
}

#[test]
fn tags_elif_continuations() {
    let module = parse("if a:\n    pass\nelif b:\n    pass\nelse:\n    x = 1\n");
    let Statement::Conditional(conditional) = &module.statements[0] else {
        panic!("expected conditional");
    };
    assert_eq!(conditional.kind, ConditionalKind::If);
    assert!(conditional.has_elif());
    let alternative = conditional.alternative.as_ref().expect("alternative");
    let Statement::Conditional(nested) = &alternative.statements[0] else {
        panic!("expected nested conditional");
    };
    assert_eq!(nested.kind, ConditionalKind::Elif);
    assert_eq!(nested.span.line, 3);
    assert!(nested.alternative.is_some());
}

#[test]
fn plain_else_is_not_an_elif() {
    let module = parse("if a: return 1\nelse: return 2\n");
    let Statement::Conditional(conditional) = &module.statements[0] else {
        panic!("expected conditional");
    };
    assert!(!conditional.has_elif());
    assert_eq!(conditional.consequent.statements.len(), 1);
}

#[test]
fn skips_unmodelled_statements_with_their_blocks() {
    let source = "import os\nfor x in y:\n    if x:\n        z = 1\nwhile True: pass\nw = 2\n";
    let module = parse(source);
    let constructs: Vec<String> = module
        .statements
        .iter()
        .filter_map(|statement| match statement {
            Statement::Unsupported(unsupported) => Some(unsupported.construct.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        constructs,
        vec![
            "'import' statement".to_string(),
            "'for' statement".to_string(),
            "'while' statement".to_string(),
        ]
    );
    assert!(matches!(module.statements.last(), Some(Statement::Assignment(_))));
    assert_eq!(module.statements.last().map(|s| s.span().line), Some(6));
}

#[test]
fn records_assignment_shapes() {
    let module = parse("a = b = 1\nc, d = 1, 2\ne: int\nf += 1\ng = 1; h = 2\n");
    let Statement::Assignment(chain) = &module.statements[0] else {
        panic!("expected assignment");
    };
    assert_eq!(chain.targets.len(), 2);

    let Statement::Assignment(tuple) = &module.statements[1] else {
        panic!("expected assignment");
    };
    assert!(matches!(tuple.targets[0].kind, ExpressionKind::Tuple(_)));

    let Statement::Assignment(declaration) = &module.statements[2] else {
        panic!("expected annotated declaration");
    };
    assert!(declaration.annotation.is_some());
    assert!(declaration.value.is_none());

    assert!(matches!(module.statements[3], Statement::Unsupported(_)));
    assert_eq!(module.statements.len(), 6);
}

#[test]
fn respects_operator_precedence() {
    let module = parse("x = 1 + 2 * 3 ** 2\n");
    let Statement::Assignment(assignment) = &module.statements[0] else {
        panic!("expected assignment");
    };
    let value = assignment.value.as_ref().expect("value");
    let ExpressionKind::Binary(add) = &value.kind else {
        panic!("expected binary expression");
    };
    assert_eq!(add.operator, BinaryOperator::Add);
    let ExpressionKind::Binary(multiply) = &add.right.kind else {
        panic!("expected nested multiplication");
    };
    assert_eq!(multiply.operator, BinaryOperator::Multiply);
    let ExpressionKind::Binary(power) = &multiply.right.kind else {
        panic!("expected nested power");
    };
    assert_eq!(power.operator, BinaryOperator::Power);
}

#[test]
fn parses_comparisons_and_boolean_operators() {
    let module = parse("ok = a not in b and not c is not d\n");
    let Statement::Assignment(assignment) = &module.statements[0] else {
        panic!("expected assignment");
    };
    let value = assignment.value.as_ref().expect("value");
    let ExpressionKind::Binary(and) = &value.kind else {
        panic!("expected binary expression");
    };
    assert_eq!(and.operator, BinaryOperator::And);
    let ExpressionKind::Binary(not_in) = &and.left.kind else {
        panic!("expected membership test");
    };
    assert_eq!(not_in.operator, BinaryOperator::NotIn);
    assert!(matches!(and.right.kind, ExpressionKind::Unary(_)));
}

#[test]
fn marks_unsupported_expressions() {
    let cases = [
        ("x = [i for i in y]\n", "list comprehension"),
        ("x = lambda a: a\n", "lambda"),
        ("x = a if b else c\n", "conditional expression"),
        ("x = {1, 2}\n", "set literal"),
        ("x = (i for i in y)\n", "generator expression"),
    ];
    for (source, construct) in cases {
        let module = parse(source);
        let Statement::Assignment(assignment) = &module.statements[0] else {
            panic!("expected assignment for {:?}", source);
        };
        let value = assignment.value.as_ref().expect("value");
        assert_eq!(value.kind.describe(), construct, "source {:?}", source);
    }

    let module = parse("y = items[1:2]\n");
    let Statement::Assignment(assignment) = &module.statements[0] else {
        panic!("expected assignment");
    };
    let ExpressionKind::Index(index) = &assignment.value.as_ref().expect("value").kind else {
        panic!("expected subscript");
    };
    assert_eq!(index.index.kind.describe(), "slice");
}

#[test]
fn parses_calls_with_keyword_arguments_and_literals() {
    let module = parse("f(1, 'a' 'b', key={\"k\": [1.5]}, *rest)\n");
    let Statement::Expression(statement) = &module.statements[0] else {
        panic!("expected expression statement");
    };
    let ExpressionKind::Call(call) = &statement.expression.kind else {
        panic!("expected call");
    };
    assert_eq!(call.arguments.len(), 4);
    assert!(matches!(
        &call.arguments[1].expression.kind,
        ExpressionKind::Literal(Literal::String(text)) if text == "ab"
    ));
    assert_eq!(call.arguments[2].name.as_deref(), Some("key"));
    assert!(matches!(call.arguments[2].expression.kind, ExpressionKind::Dict(_)));
    assert_eq!(call.arguments[3].expression.kind.describe(), "starred expression");
}

#[test]
fn reports_syntax_errors_with_location() {
    let tokens = Lexer::from_str("x = (1,\n").tokenize().expect("tokenize");
    let error = Parser::new(tokens).parse().expect_err("expected failure");
    assert!(error.to_string().contains("line"), "unexpected error: {}", error);

    let tokens = Lexer::from_str("  x = 1\n").tokenize().expect("tokenize");
    let error = Parser::new(tokens).parse().expect_err("expected failure");
    assert!(error.to_string().contains("unexpected indent"));
}

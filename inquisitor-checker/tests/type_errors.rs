use std::path::PathBuf;

use inquisitor_checker::{
    Builtins, CheckOptions, CheckReport, DiagnosticLevel, Inquisitor, SourceFile, SourceId,
};

fn check_with(source: &str, options: CheckOptions) -> CheckReport {
    let source_file = SourceFile::new(SourceId(0), PathBuf::from("test.py"), source.to_string());
    Inquisitor::new(options)
        .check(&source_file)
        .expect("source should parse")
}

fn check(source: &str) -> CheckReport {
    check_with(source, CheckOptions::default())
}

fn messages(report: &CheckReport) -> Vec<String> {
    report
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.to_string())
        .collect()
}

#[test]
fn rejects_wrong_return_type() {
    let report = check("def f() -> int:\n    return \"nope\"\n");
    assert_eq!(
        messages(&report),
        vec!["2: function 'f' returns 'str' but should return 'int'".to_string()]
    );
}

#[test]
fn undefined_call_does_not_affect_other_statements() {
    let report = check("x = 1\ny = missing(2)\nz = x + 1.5\n");
    assert_eq!(
        messages(&report),
        vec!["2: name 'missing' is used but not defined".to_string()]
    );
    let z = report
        .bindings
        .iter()
        .find(|(name, _)| name == "z")
        .map(|(_, ty)| ty.to_string());
    assert_eq!(z.as_deref(), Some("float"));
}

#[test]
fn rejects_int_plus_str_but_accepts_int_plus_float() {
    let report = check("a = 1 + \"s\"\nb = 1 + 2.0\n");
    let messages = messages(&report);
    assert_eq!(messages.len(), 1, "unexpected diagnostics: {:?}", messages);
    assert!(
        messages[0].starts_with("1: unsupported operand types for +: 'int' and 'str'"),
        "unexpected message: {}",
        messages[0]
    );
    assert!(report
        .bindings
        .iter()
        .any(|(name, ty)| name == "b" && ty.to_string() == "float"));
}

#[test]
fn rejects_rebinding_reserved_constants() {
    let report = check("None = 1\nTrue = 0\n");
    assert_eq!(
        messages(&report),
        vec![
            "1: cannot redefine built-in constant 'None'".to_string(),
            "2: cannot redefine built-in constant 'True'".to_string(),
        ]
    );
}

#[test]
fn rejects_return_outside_function() {
    let report = check("x = 1\nreturn x\n");
    assert_eq!(
        messages(&report),
        vec!["2: 'return' outside of function".to_string()]
    );
}

#[test]
fn only_plus_and_times_are_checked_against_operator_methods() {
    let builtins = Builtins::standard();
    assert!(builtins.operator("int", "__add__").is_some());
    assert!(builtins.operator("int", "__sub__").is_none());
    assert!(builtins.operator("float", "__sub__").is_none());

    let report = check("x = 1 - \"a\"\n");
    assert!(messages(&report).is_empty(), "{:?}", messages(&report));
}

#[test]
fn rejects_arity_mismatch() {
    let source = "def add(a: int, b: int) -> int:\n    return a + b\nadd(1)\n";
    let report = check(source);
    assert_eq!(
        messages(&report),
        vec!["3: function 'add' expects 2 arguments, 1 provided".to_string()]
    );
}

#[test]
fn rejects_wrong_argument_type() {
    let source = "def add(a: int, b: int) -> int:\n    return a + b\nadd(1, \"x\")\n";
    let report = check(source);
    assert_eq!(
        messages(&report),
        vec!["3: argument 2 of call to 'add' should be 'int', not 'str'".to_string()]
    );
}

#[test]
fn rejects_calling_non_callable() {
    let report = check("n = 5\nn()\n");
    assert_eq!(messages(&report), vec!["2: 'int' is not callable".to_string()]);
}

#[test]
fn rejects_call_without_matching_overload() {
    let report = check("size = len(5)\nok = len(\"abc\")\n");
    assert_eq!(
        messages(&report),
        vec!["1: no overload of 'len' matches (int)".to_string()]
    );
}

#[test]
fn rejects_value_that_does_not_fit_declared_type() {
    let report = check("x: int = \"s\"\ny: float = 1.0\n");
    assert_eq!(
        messages(&report),
        vec!["1: 'x' declared as 'int' but assigned 'str'".to_string()]
    );
}

#[test]
fn rejects_malformed_annotation_shapes() {
    let report = check("a: [] = []\nb: [int, str] = []\nc: {str: int, int: str} = {}\n");
    assert_eq!(
        messages(&report),
        vec![
            "1: cannot type an empty list; try [Any] instead".to_string(),
            "2: cannot have multiple types in a list annotation".to_string(),
            "3: cannot have multiple key/value types in a dict annotation".to_string(),
        ]
    );
}

#[test]
fn rebinding_a_function_is_suspicious() {
    let report = check("def f():\n    pass\nf = 3\n");
    let diagnostics = report.diagnostics.to_vec();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].level, DiagnosticLevel::Suspicion);
    assert_eq!(
        diagnostics[0].to_string(),
        "3: suspicious: 'f' was bound to a function and is rebound to 'int'"
    );
    assert!(!report.diagnostics.has_heresies());
}

#[test]
fn assignment_before_a_def_of_the_same_name_is_not_suspicious() {
    let report = check("x = 1\ndef x():\n    return 1\n");
    assert!(messages(&report).is_empty(), "{:?}", messages(&report));
    let x = report
        .bindings
        .iter()
        .find(|(name, _)| name == "x")
        .map(|(_, ty)| ty.to_string());
    assert_eq!(x.as_deref(), Some("() -> int"));
}

#[test]
fn calling_an_unannotated_parameter_is_rejected() {
    let report = check("def apply(g):\n    return g(1)\n");
    assert_eq!(messages(&report), vec!["2: '?' is not callable".to_string()]);
}

#[test]
fn reports_errors_sorted_by_line() {
    let source = "x = 1\ny = 2\na = undefined_a\n\n\n\nb = undefined_b\n\n\ndef f(p=undefined_c):\n    pass\n";
    let report = check(source);
    let lines: Vec<usize> = report.diagnostics.iter().map(|d| d.line()).collect();
    assert_eq!(lines, vec![3, 7, 10]);
}

#[test]
fn missing_return_is_reported_against_declaration() {
    let report = check("def f() -> int:\n    x = 1\n");
    assert_eq!(
        messages(&report),
        vec!["1: return type of 'f' declared as 'int' but appears to be 'None'".to_string()]
    );
}

#[test]
fn partial_returns_include_none() {
    let strict = check("def f(flag) -> int:\n    if flag:\n        return 1\n");
    assert_eq!(
        messages(&strict),
        vec!["1: return type of 'f' declared as 'int' but appears to be 'None | int'".to_string()]
    );

    let optional = check("def f(flag) -> Maybe[int]:\n    if flag:\n        return 1\n");
    assert!(optional.is_clean(), "{:?}", messages(&optional));
}

#[test]
fn rejects_unknown_and_duplicate_keyword_arguments() {
    let source = "def f(a, b=1):\n    return a\nf(1, c=2)\nf(1, a=2)\nf(1, b=2)\n";
    let report = check(source);
    assert_eq!(
        messages(&report),
        vec![
            "3: 'f' got an unexpected keyword argument 'c'".to_string(),
            "4: 'f' got multiple values for argument 'a'".to_string(),
        ]
    );
}

#[test]
fn default_value_must_fit_annotation_and_is_reported_once() {
    let report = check("def f(a: int = \"x\"):\n    pass\n");
    assert_eq!(
        messages(&report),
        vec!["1: default value of parameter 'a' of 'f' is 'str' but should be 'int'".to_string()]
    );
}

#[test]
fn default_value_may_name_a_binding_made_before_the_def() {
    let report = check("DEFAULT = 10\ndef f(n=DEFAULT):\n    return n\nresult = f()\n");
    assert!(messages(&report).is_empty(), "{:?}", messages(&report));
    let f = report
        .bindings
        .iter()
        .find(|(name, _)| name == "f")
        .map(|(_, ty)| ty.to_string());
    assert_eq!(f.as_deref(), Some("(n=?) -> ?"));
}

#[test]
fn nested_default_value_does_not_hide_errors_of_the_enclosing_function() {
    let source = "def outer() -> str:\n    n = 1\n    def inner(a=n):\n        pass\n    return 5\n";
    let report = check(source);
    assert_eq!(
        messages(&report),
        vec!["5: function 'outer' returns 'int' but should return 'str'".to_string()]
    );
}

#[test]
fn comment_annotations_declare_types() {
    let source = "xs = []  #:: [int]\ny = \"s\"  #:: int\n";
    let report = check(source);
    assert_eq!(
        messages(&report),
        vec!["2: 'y' declared as 'int' but assigned 'str'".to_string()]
    );
    assert!(report
        .bindings
        .iter()
        .any(|(name, ty)| name == "xs" && ty.to_string() == "[int]"));

    let options = CheckOptions {
        comment_annotations: false,
        ..CheckOptions::default()
    };
    let report = check_with(source, options);
    assert!(report.is_clean());
}

#[test]
fn maybe_of_none_annotation_is_rejected() {
    let report = check("x: Maybe[None] = None\n");
    assert_eq!(
        messages(&report),
        vec!["1: 'Maybe' cannot wrap the None type".to_string()]
    );
}

#[test]
fn syntax_errors_fail_the_check() {
    let source_file = SourceFile::new(
        SourceId(0),
        PathBuf::from("broken.py"),
        "def f(:\n    pass\n".to_string(),
    );
    let result = Inquisitor::new(CheckOptions::default()).check(&source_file);
    let error = result.expect_err("expected parse failure");
    assert!(
        format!("{:#}", error).contains("failed to parse broken.py"),
        "unexpected error: {:#}",
        error
    );
}

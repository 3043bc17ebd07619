use stackmap::analyzer::python::PythonParser;
use stackmap::metrics;
use stackmap::model::{ComplexityMetrics, Language, SourceFile};

fn score(source: &str, name: &str) -> ComplexityMetrics {
    let file = SourceFile::new("mod.py", Language::Python, source);
    let mut parser = PythonParser::new().unwrap();
    let module = parser.parse(&file).unwrap();
    let symbol = module.symbols.iter().find(|s| s.name == name).unwrap();
    let node = module.definition(symbol).unwrap();
    metrics::score_function(node, symbol.positional_params())
}

#[test]
fn python_complexity_counts() {
    let source = r#"
def func(x, y):
    if x and y:
        return 1
    elif x:
        return 2
    return 3
"#;
    let func = score(source, "func");
    assert_eq!(func.cyclomatic, 4);
    assert_eq!(func.statements, 3);
    assert_eq!(func.parameters, 2);
    assert_eq!(func.nesting, 2);
}

#[test]
fn straight_line_function_scores_one() {
    let source = r#"
def plain(a):
    b = a + 1
    print(b)
    return b
"#;
    let func = score(source, "plain");
    assert_eq!(func.cyclomatic, 1);
    assert_eq!(func.cognitive, 0);
    assert_eq!(func.nesting, 0);
}

#[test]
fn independent_branches_add_one_each() {
    let source = r#"
def checks(a, b, c):
    if a:
        print(a)
    if b:
        print(b)
    if c:
        print(c)
    return None
"#;
    let func = score(source, "checks");
    assert_eq!(func.cyclomatic, 4);
    assert_eq!(func.nesting, 1);
}

#[test]
fn nested_blocks_raise_nesting() {
    let source = r#"
def walk(rows):
    for row in rows:
        if row:
            while row.pending():
                row.step()
"#;
    let func = score(source, "walk");
    assert!(func.nesting >= 3);
    assert_eq!(func.cyclomatic, 4);
    assert!(func.cognitive >= 5);
}

#[test]
fn blocks_inside_elif_chains_nest_deeper() {
    let source = r#"
def pick(a, b):
    if a:
        pass
    elif b:
        if a:
            pass
"#;
    assert_eq!(score(source, "pick").nesting, 3);

    let chain = r#"
def grade(n):
    if n > 90:
        return "a"
    elif n > 80:
        return "b"
    elif n > 70:
        return "c"
    else:
        for _ in range(n):
            pass
"#;
    assert_eq!(score(chain, "grade").nesting, 4);
}

#[test]
fn only_positional_parameters_are_counted() {
    let source = r#"
def handler(self, request, *args, flag=False, **kwargs):
    return request
"#;
    assert_eq!(score(source, "handler").parameters, 2);
}

#[test]
fn nested_functions_count_toward_their_parent() {
    let source = r#"
def outer(flag):
    def inner():
        if flag:
            return 1
        return 0
    return inner()
"#;
    let func = score(source, "outer");
    assert_eq!(func.cyclomatic, 2);
}

#[test]
fn keyword_complexity_for_frontend_text() {
    let source = "function f(x, y) {\n  if (x && y) { return 1; }\n  if (x || y) { return 2; }\n}\n";
    assert_eq!(metrics::keyword_complexity(Language::Javascript, source), 5);
    let optional = "const a = user?.name ?? 'anon';";
    assert_eq!(metrics::keyword_complexity(Language::Typescript, optional), 1);
}

#[test]
fn line_metrics_split_code_comments_and_blanks() {
    let source = "# header\nimport os\n\ndef f():\n    return os.sep\n";
    let lines = metrics::compute_file_metrics(source, Language::Python);
    assert_eq!(lines.total, 5);
    assert_eq!(lines.comment, 1);
    assert_eq!(lines.blank, 1);
    assert_eq!(lines.code, 3);
}

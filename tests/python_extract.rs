use stackmap::analyzer::python::{
    PythonParser, extract_models, extract_tests, module_name_from_rel_path,
};
use stackmap::model::{Language, ParamKind, SourceFile, SymbolKind};
use stackmap::vocab::Vocabulary;

#[test]
fn module_name_from_path() {
    assert_eq!(module_name_from_rel_path("foo.py"), "foo");
    assert_eq!(module_name_from_rel_path("pkg/__init__.py"), "pkg");
    assert_eq!(module_name_from_rel_path("server/app/api/pods.py"), "server.app.api.pods");
}

#[test]
fn extract_symbols_markers_and_params() {
    let source = r#"
"""Pod endpoints."""
from fastapi import APIRouter, Depends

router = APIRouter()

class PodService:
    """Talks to the cluster."""
    def list(self, namespace: str = "default", *names, limit: int, **extra) -> list:
        "List pods."
        return self.client.list_pods(namespace)

@router.get("/pods/{name}", response_model=Pod)
async def get_pod(name: str, user=Depends(get_current_user)):
    def helper():
        return 1
    return helper()
"#;
    let file = SourceFile::new("server/app/api/pods.py", Language::Python, source);
    let mut parser = PythonParser::new().unwrap();
    let module = parser.parse(&file).unwrap();

    let names: Vec<_> = module
        .symbols
        .iter()
        .map(|s| (s.kind, s.qualname.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![
            (SymbolKind::Class, "server.app.api.pods.PodService"),
            (SymbolKind::Function, "server.app.api.pods.PodService.list"),
            (SymbolKind::Function, "server.app.api.pods.get_pod"),
        ]
    );

    let service = &module.symbols[0];
    assert_eq!(service.summary().as_deref(), Some("Talks to the cluster."));

    let list = &module.symbols[1];
    assert_eq!(
        list.enclosing_class.as_deref(),
        Some("server.app.api.pods.PodService")
    );
    assert_eq!(list.returns.as_deref(), Some("list"));
    assert_eq!(list.docstring.as_deref(), Some("List pods."));
    let kinds: Vec<_> = list.params.iter().map(|p| (p.name.as_str(), p.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("self", ParamKind::Positional),
            ("namespace", ParamKind::Positional),
            ("names", ParamKind::VarPositional),
            ("limit", ParamKind::KeywordOnly),
            ("extra", ParamKind::VarKeyword),
        ]
    );
    assert!(!list.params[1].required);
    assert_eq!(list.params[1].default.as_deref(), Some("\"default\""));
    assert!(list.params[3].required);
    assert!(list.calls.iter().any(|c| c == "self.client.list_pods"));

    let get_pod = &module.symbols[2];
    assert!(get_pod.is_async);
    assert_eq!(get_pod.markers.len(), 1);
    let marker = &get_pod.markers[0];
    assert_eq!(marker.name, "router.get");
    assert_eq!(marker.key(), "get");
    assert_eq!(marker.args, vec!["\"/pods/{name}\""]);
    assert_eq!(marker.kwarg("response_model"), Some("Pod"));
    assert_eq!(get_pod.params[1].default.as_deref(), Some("Depends(get_current_user)"));
}

#[test]
fn syntax_errors_are_reported_with_a_line() {
    let file = SourceFile::new(
        "server/app/broken.py",
        Language::Python,
        "def ok():\n    return 1\n\ndef broken(:\n    pass\n",
    );
    let mut parser = PythonParser::new().unwrap();
    let err = parser.parse(&file).err().unwrap();
    let issue = err.to_issue();
    assert_eq!(issue.path, "server/app/broken.py");
    assert!(issue.line.is_some());
    assert!(!err.is_fatal());
}

#[test]
fn models_and_tests_are_extracted() {
    let source = r#"
class Pod(BaseModel):
    name: str
    replicas: int = 1
    labels = {}

class Helper:
    value: int

class TestPods:
    def test_list(self):
        assert self.client.get("/pods").status_code == 200
        self.assertEqual(1, 1)

def test_create():
    with pytest.raises(ValueError):
        create(None)
"#;
    let file = SourceFile::new("server/tests/test_pods.py", Language::Python, source);
    let mut parser = PythonParser::new().unwrap();
    let module = parser.parse(&file).unwrap();
    let vocab = Vocabulary::default();

    let models = extract_models(&module, &vocab);
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "Pod");
    let fields: Vec<_> = models[0]
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.annotation.as_str(), f.default.as_deref()))
        .collect();
    assert_eq!(fields, vec![("name", "str", None), ("replicas", "int", Some("1"))]);

    let tests = extract_tests(&module);
    let counts: Vec<_> = tests.iter().map(|t| (t.name.as_str(), t.assertions)).collect();
    assert_eq!(counts, vec![("test_list", 2), ("test_create", 1)]);
    assert_eq!(
        tests[0].enclosing_class.as_deref(),
        Some("server.tests.test_pods.TestPods")
    );
}

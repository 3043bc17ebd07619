use crate::error::Issue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Typescript,
    Tsx,
    Vue,
    Yaml,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Tsx => "tsx",
            Language::Vue => "vue",
            Language::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file read from disk. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub language: Language,
    pub text: String,
    pub hash: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, language: Language, text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = crate::util::content_hash(text.as_bytes());
        Self {
            path: path.into(),
            language,
            text,
            hash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Positional,
    KeywordOnly,
    VarPositional,
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordArg {
    pub name: String,
    pub value: String,
}

/// A decorator attached to a declaration, with its arguments kept as source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Full dotted expression of the decorator target, e.g. `app.get`.
    pub name: String,
    /// Trailing attribute for `obj.attr` shapes, e.g. `get`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub is_call: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kwargs: Vec<KeywordArg>,
    pub line: usize,
}

impl Marker {
    /// Name used for vocabulary lookups: the attribute when present, else the last path segment.
    pub fn key(&self) -> &str {
        match &self.attribute {
            Some(attr) => attr.as_str(),
            None => self.name.rsplit('.').next().unwrap_or(&self.name),
        }
    }

    pub fn kwarg(&self, name: &str) -> Option<&str> {
        self.kwargs
            .iter()
            .find(|kw| kw.name == name)
            .map(|kw| kw.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip)]
    pub start_byte: usize,
    #[serde(skip)]
    pub end_byte: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub qualname: String,
    pub kind: SymbolKind,
    /// Qualified name of the enclosing class. A lookup key, not an owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosing_class: Option<String>,
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<String>,
    pub file: String,
    pub span: Span,
}

impl Symbol {
    pub fn line(&self) -> usize {
        self.span.start_line
    }

    pub fn is_function(&self) -> bool {
        self.kind == SymbolKind::Function
    }

    /// Plain positional parameters; `*args`, `**kwargs` and keyword-only ones are left out.
    pub fn positional_params(&self) -> usize {
        self.params
            .iter()
            .filter(|param| param.kind == ParamKind::Positional)
            .count()
    }

    pub fn summary(&self) -> Option<String> {
        let doc = self.docstring.as_deref()?;
        doc.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub cyclomatic: u32,
    pub cognitive: u32,
    pub nesting: u32,
    pub statements: u32,
    pub parameters: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolReport {
    #[serde(flatten)]
    pub symbol: Symbol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Case-insensitive lookup; surrounding quotes are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw
            .trim()
            .trim_matches(|ch| ch == '"' || ch == '\'')
            .to_ascii_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == upper)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub status: u16,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResponseDescriptor {
    pub fn fallback() -> Self {
        Self {
            status: 200,
            type_name: "Any".to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSource {
    Path,
    Query,
    Body,
    Dependency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointParam {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    pub source: ParamSource,
    /// Data model named by the annotation, linked after every file was analyzed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    pub handler: String,
    pub qualname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosing_class: Option<String>,
    pub file: String,
    pub line: usize,
    pub auth_required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<EndpointParam>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_params: Vec<String>,
    pub responses: Vec<ResponseDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsocketHandlers {
    pub on_connect: bool,
    pub on_message: bool,
    pub on_disconnect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsocketEndpoint {
    pub path: String,
    pub handler: String,
    pub qualname: String,
    pub file: String,
    pub line: usize,
    pub auth_required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    pub handlers: WebsocketHandlers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    pub name: String,
    pub annotation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataModel {
    pub name: String,
    pub qualname: String,
    pub bases: Vec<String>,
    pub fields: Vec<ModelField>,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub qualname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosing_class: Option<String>,
    pub assertions: usize,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Function,
    Arrow,
    Class,
    Vue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBinding {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setter: Option<String>,
    pub hook: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    Injection,
    Effect,
    Memo,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookUse {
    pub hook: String,
    pub kind: HookKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCall {
    pub method: HttpMethod,
    pub url: String,
    pub client: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteShape {
    Markup,
    Object,
}

/// A literal route declaration as found in the text, before any resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDeclaration {
    pub shape: RouteShape,
    /// `None` for pathless markup tags that only wrap nested routes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Attribute or key/value pairs exactly as written.
    pub attrs: Vec<(String, String)>,
    /// Index of the enclosing declaration in the same file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    pub line: usize,
}

impl RouteDeclaration {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LazyBinding {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Everything the pattern battery recovered from one frontend file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendExtraction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state: Vec<StateBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookUse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_calls: Vec<ApiCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lazy_bindings: Vec<LazyBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_declarations: Vec<RouteDeclaration>,
    pub has_children: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendRoute {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_source: Option<String>,
    pub layout: String,
    pub nested: bool,
    /// Sorted, deduplicated guard names.
    pub guards: Vec<String>,
    pub lazy: bool,
    pub auth_required: bool,
    #[serde(default)]
    pub meta: RouteMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    pub shape: RouteShape,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Resource,
    Auth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    pub frontend: FrontendRoute,
    pub backend: Endpoint,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteReconciliationResult {
    pub matches: Vec<RouteMatch>,
    pub unmatched_frontend: Vec<FrontendRoute>,
    pub unmatched_backend: Vec<Endpoint>,
    /// Percentage in `[0, 100]`.
    pub score: f64,
    /// Frontend routes that fell into the resource or auth bucket.
    pub considered_frontend: usize,
    pub excluded_frontend: usize,
    pub excluded_backend: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_maps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInventory {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub python: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_dev: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMetrics {
    pub total: usize,
    pub code: usize,
    pub comment: usize,
    pub blank: usize,
}

/// Immutable per-file result. The aggregator only appends these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: String,
    pub language: Language,
    pub hash: String,
    pub lines: LineMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<SymbolReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub websockets: Vec<WebsocketEndpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<DataModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend: Option<FrontendExtraction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<FrontendRoute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<Manifest>,
    /// Keyword-count complexity for files without a syntax tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_complexity: Option<u32>,
}

impl FileAnalysis {
    pub fn new(file: &SourceFile, lines: LineMetrics) -> Self {
        Self {
            path: file.path.clone(),
            language: file.language,
            hash: file.hash.clone(),
            lines,
            symbols: Vec::new(),
            endpoints: Vec::new(),
            websockets: Vec::new(),
            models: Vec::new(),
            tests: Vec::new(),
            frontend: None,
            routes: Vec::new(),
            manifests: Vec::new(),
            keyword_complexity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexFunction {
    pub qualname: String,
    pub file: String,
    pub line: usize,
    pub cyclomatic: u32,
    pub cognitive: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub files_scanned: usize,
    pub files_analyzed: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub functions: usize,
    pub classes: usize,
    pub endpoints: usize,
    pub websockets: usize,
    pub frontend_routes: usize,
    pub api_calls: usize,
    pub models: usize,
    pub tests: usize,
    pub average_cyclomatic: f64,
    pub complex_functions: Vec<ComplexFunction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub root: String,
    pub summary: Summary,
    pub files: Vec<FileAnalysis>,
    pub endpoints: Vec<Endpoint>,
    pub websockets: Vec<WebsocketEndpoint>,
    pub frontend_routes: Vec<FrontendRoute>,
    pub reconciliation: RouteReconciliationResult,
    pub manifests: Vec<Manifest>,
    pub dependencies: DependencyInventory,
    pub issues: Vec<Issue>,
}

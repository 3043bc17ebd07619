//! Marker and keyword vocabularies.
//!
//! Framework knowledge lives here as data. A YAML document can replace any
//! field; fields it leaves out keep their built-in values.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerRole {
    /// Exposes the decorated function as an HTTP endpoint.
    Route,
    /// Requires an authenticated caller.
    Auth,
    /// Injects a dependency (`Depends`, `Security`); inspected for auth schemes.
    Dependency,
    /// Exposes the decorated function as a websocket endpoint.
    Websocket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub markers: BTreeMap<String, MarkerRole>,
    pub auth_schemes: Vec<String>,
    pub error_types: Vec<String>,
    pub model_bases: Vec<String>,
    pub resource_keywords: Vec<String>,
    pub auth_path_keywords: Vec<String>,
    pub state_hooks: Vec<String>,
    pub reactive_hooks: Vec<String>,
    pub composition_hooks: Vec<String>,
    pub effect_hooks: Vec<String>,
    pub http_clients: Vec<String>,
    pub guard_keys: Vec<String>,
    pub auth_wrappers: Vec<String>,
    /// Substrings (case-insensitive) that make a route guard an auth guard.
    pub auth_guard_keywords: Vec<String>,
    pub lazy_wrappers: Vec<String>,
}

const ROUTE_MARKERS: &[&str] = &[
    "get",
    "post",
    "put",
    "delete",
    "patch",
    "head",
    "options",
    "route",
    "api_route",
    "endpoint",
    "api_view",
    "action",
];

const AUTH_MARKERS: &[&str] = &[
    "login_required",
    "auth_required",
    "authenticated",
    "requires_auth",
    "jwt_required",
    "token_required",
    "permission_required",
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        let mut markers = BTreeMap::new();
        for name in ROUTE_MARKERS {
            markers.insert(name.to_string(), MarkerRole::Route);
        }
        for name in AUTH_MARKERS {
            markers.insert(name.to_string(), MarkerRole::Auth);
        }
        markers.insert("Depends".to_string(), MarkerRole::Dependency);
        markers.insert("Security".to_string(), MarkerRole::Dependency);
        markers.insert("websocket".to_string(), MarkerRole::Websocket);
        markers.insert("websocket_route".to_string(), MarkerRole::Websocket);

        Self {
            markers,
            auth_schemes: strings(&[
                "oauth2_scheme",
                "OAuth2PasswordBearer",
                "HTTPBearer",
                "HTTPBasic",
                "APIKeyHeader",
                "get_current_user",
                "get_current_active_user",
            ]),
            error_types: strings(&["HTTPException", "WebSocketException"]),
            model_bases: strings(&["BaseModel", "SQLModel", "Base", "Model", "Document"]),
            resource_keywords: strings(&["pod", "deployment", "service", "configmap", "secret"]),
            auth_path_keywords: strings(&["login", "logout", "auth", "signin", "register"]),
            state_hooks: strings(&["useState", "useReducer"]),
            reactive_hooks: strings(&["ref", "reactive", "shallowRef", "shallowReactive"]),
            composition_hooks: strings(&[
                "useContext",
                "inject",
                "provide",
                "useStore",
                "useSelector",
                "useDispatch",
                "useRouter",
                "useRoute",
                "useNavigate",
                "useParams",
            ]),
            effect_hooks: strings(&[
                "useEffect",
                "useLayoutEffect",
                "watch",
                "watchEffect",
                "onMounted",
                "onUnmounted",
            ]),
            http_clients: strings(&["axios", "api", "http", "client", "$http", "request"]),
            guard_keys: strings(&["beforeEnter", "guard", "canActivate"]),
            auth_wrappers: strings(&[
                "RequireAuth",
                "PrivateRoute",
                "ProtectedRoute",
                "AuthGuard",
                "Authenticated",
            ]),
            auth_guard_keywords: strings(&["auth", "login", "signin", "session", "token"]),
            lazy_wrappers: strings(&["lazy", "React.lazy", "defineAsyncComponent", "loadable"]),
        }
    }
}

impl Vocabulary {
    pub fn from_yaml_str(raw: &str) -> Result<Self, AnalysisError> {
        let vocab: Vocabulary = serde_yaml_ng::from_str(raw)
            .map_err(|err| AnalysisError::config(format!("invalid vocabulary: {err}")))?;
        vocab.validate()?;
        Ok(vocab)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, AnalysisError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AnalysisError::config(format!("read vocabulary {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Startup gate: every downstream component relies on these being usable.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.markers.values().any(|role| *role == MarkerRole::Route) {
            return Err(AnalysisError::config(
                "vocabulary declares no marker with the `route` role",
            ));
        }
        if self.markers.keys().any(|name| name.trim().is_empty()) {
            return Err(AnalysisError::config("vocabulary contains an empty marker name"));
        }
        let required: [(&str, &[String]); 4] = [
            ("resource_keywords", &self.resource_keywords),
            ("auth_path_keywords", &self.auth_path_keywords),
            ("state_hooks", &self.state_hooks),
            ("http_clients", &self.http_clients),
        ];
        for (field, values) in required {
            if values.is_empty() {
                return Err(AnalysisError::config(format!("vocabulary `{field}` is empty")));
            }
            if values.iter().any(|value| value.trim().is_empty()) {
                return Err(AnalysisError::config(format!(
                    "vocabulary `{field}` contains an empty entry"
                )));
            }
        }
        Ok(())
    }

    pub fn role_of(&self, name: &str) -> Option<MarkerRole> {
        self.markers.get(name).copied()
    }

    /// Role of a decorator: its attribute key first, then its full dotted name.
    pub fn marker_role(&self, marker: &crate::model::Marker) -> Option<MarkerRole> {
        self.role_of(marker.key())
            .or_else(|| self.role_of(&marker.name))
    }

    pub fn is_auth_scheme(&self, name: &str) -> bool {
        self.auth_schemes.iter().any(|scheme| scheme == name)
    }

    pub fn is_error_type(&self, name: &str) -> bool {
        let last = name.rsplit('.').next().unwrap_or(name);
        self.error_types.iter().any(|value| value == last)
    }

    pub fn is_model_base(&self, name: &str) -> bool {
        let last = name.rsplit('.').next().unwrap_or(name);
        self.model_bases.iter().any(|value| value == last)
    }

    pub fn is_http_client(&self, name: &str) -> bool {
        self.http_clients.iter().any(|value| value == name)
    }

    pub fn is_auth_wrapper(&self, name: &str) -> bool {
        self.auth_wrappers.iter().any(|value| value == name)
    }

    /// Auth wrapper components, or guard functions named after an auth concern.
    pub fn is_auth_guard(&self, name: &str) -> bool {
        if self.is_auth_wrapper(name) {
            return true;
        }
        let lower = name.to_ascii_lowercase();
        self.auth_guard_keywords
            .iter()
            .any(|keyword| lower.contains(&keyword.to_ascii_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let vocab = Vocabulary::default();
        vocab.validate().unwrap();
        assert_eq!(vocab.role_of("get"), Some(MarkerRole::Route));
        assert_eq!(vocab.role_of("jwt_required"), Some(MarkerRole::Auth));
        assert_eq!(vocab.role_of("Depends"), Some(MarkerRole::Dependency));
        assert_eq!(vocab.role_of("cache"), None);
    }

    #[test]
    fn yaml_overrides_single_field_and_keeps_rest() {
        let vocab = Vocabulary::from_yaml_str(
            "resource_keywords: [widget, gadget]\nmarkers:\n  handler: route\n  guarded: auth\n",
        )
        .unwrap();
        assert_eq!(vocab.resource_keywords, vec!["widget", "gadget"]);
        assert_eq!(vocab.role_of("handler"), Some(MarkerRole::Route));
        assert_eq!(vocab.role_of("get"), None);
        assert_eq!(vocab.state_hooks, Vocabulary::default().state_hooks);
    }

    #[test]
    fn vocabulary_without_route_marker_is_rejected() {
        let err = Vocabulary::from_yaml_str("markers:\n  login_required: auth\n").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("route"));
    }

    #[test]
    fn empty_keyword_list_is_rejected() {
        let err = Vocabulary::from_yaml_str("auth_path_keywords: []\n").unwrap_err();
        assert!(err.to_string().contains("auth_path_keywords"));
    }

    #[test]
    fn malformed_yaml_is_a_configuration_error() {
        let err = Vocabulary::from_yaml_str("markers: [unterminated").unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn yaml_roundtrips_through_default() {
        let vocab = Vocabulary::default();
        let yaml = vocab.to_yaml().unwrap();
        assert_eq!(Vocabulary::from_yaml_str(&yaml).unwrap(), vocab);
    }
}

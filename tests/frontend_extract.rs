use stackmap::analyzer::heuristic::HeuristicExtractor;
use stackmap::model::{ComponentKind, FrontendExtraction, HookKind, HttpMethod, Language, SourceFile};
use stackmap::vocab::Vocabulary;

fn extract(path: &str, language: Language, text: &str) -> FrontendExtraction {
    let vocab = Vocabulary::default();
    let file = SourceFile::new(path, language, text);
    HeuristicExtractor::new(&vocab).extract(&file)
}

#[test]
fn react_component_hooks_and_calls() {
    let source = r#"
import React, { useState, useEffect } from 'react';
import axios from 'axios';

export default function PodTable({ namespace, onSelect }) {
  const [pods, setPods] = useState([]);
  const store = useStore();
  const filtered = useMemo(() => pods.filter(Boolean), [pods]);
  const data = usePods(namespace);
  useEffect(() => {
    axios.get(`/api/namespaces/${namespace}/pods`).then((r) => setPods(r.data));
  }, [namespace]);
  const remove = (name) => fetch(`/api/pods/${name}`, { method: 'DELETE' });
  return <table />;
}
"#;
    let result = extract("client/src/components/PodTable.jsx", Language::Javascript, source);

    assert_eq!(result.components.len(), 1);
    let component = &result.components[0];
    assert_eq!(component.name, "PodTable");
    assert_eq!(component.kind, ComponentKind::Function);
    assert_eq!(component.props, vec!["namespace", "onSelect"]);

    assert_eq!(result.state.len(), 1);
    assert_eq!(result.state[0].name, "pods");
    assert_eq!(result.state[0].setter.as_deref(), Some("setPods"));

    let hooks: Vec<_> = result
        .hooks
        .iter()
        .map(|h| (h.hook.as_str(), h.kind))
        .collect();
    assert_eq!(
        hooks,
        vec![
            ("useStore", HookKind::Injection),
            ("useMemo", HookKind::Memo),
            ("usePods", HookKind::Custom),
            ("useEffect", HookKind::Effect),
        ]
    );
    assert_eq!(result.hooks[2].argument.as_deref(), Some("namespace"));

    let calls: Vec<_> = result
        .api_calls
        .iter()
        .map(|c| (c.client.as_str(), c.method, c.url.as_str()))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("axios", HttpMethod::Get, "/api/namespaces/${namespace}/pods"),
            ("fetch", HttpMethod::Delete, "/api/pods/${name}"),
        ]
    );

    assert_eq!(result.imports.len(), 2);
    assert_eq!(result.imports[0].names, vec!["React", "useState", "useEffect"]);
    assert_eq!(result.imports[1].source, "axios");
    assert!(result.route_declarations.is_empty());
}

#[test]
fn vue_single_file_component() {
    let source = r#"<template>
  <div>{{ pods.length }}</div>
</template>
<script setup>
import { ref, onMounted } from 'vue'
import api from '@/api'
const props = defineProps({ namespace: String, limit: Number })
const pods = ref([])
onMounted(async () => {
  const res = await api.get('/api/pods')
  pods.value = res.data
})
</script>
"#;
    let result = extract("client/src/views/PodList.vue", Language::Vue, source);

    assert_eq!(result.components.len(), 1);
    let component = &result.components[0];
    assert_eq!(component.name, "PodList");
    assert_eq!(component.kind, ComponentKind::Vue);
    assert_eq!(component.props, vec!["namespace", "limit"]);

    assert_eq!(result.state.len(), 1);
    assert_eq!(result.state[0].hook, "ref");
    assert_eq!(result.state[0].setter, None);
    assert_eq!(result.state[0].line, 8);

    assert_eq!(result.hooks.len(), 1);
    assert_eq!(result.hooks[0].hook, "onMounted");
    assert_eq!(result.hooks[0].kind, HookKind::Effect);

    assert_eq!(result.api_calls.len(), 1);
    assert_eq!(result.api_calls[0].client, "api");
    assert_eq!(result.api_calls[0].url, "/api/pods");
    assert_eq!(result.api_calls[0].line, 10);
}

#[test]
fn options_api_component_uses_declared_name() {
    let source = r#"
import { defineComponent } from 'vue'
export default defineComponent({
  name: 'PodDetail',
  props: ['name', 'namespace'],
  setup(props) {
    const pod = reactive({})
    return { pod }
  },
})
"#;
    let result = extract("client/src/components/detail.ts", Language::Typescript, source);
    assert_eq!(result.components.len(), 1);
    assert_eq!(result.components[0].name, "PodDetail");
    assert_eq!(result.components[0].props, vec!["name", "namespace"]);
    assert_eq!(result.state[0].name, "pod");
}

#[test]
fn unknown_clients_and_lowercase_functions_are_ignored() {
    let source = r#"
function helper() { return cache.get('/x'); }
const value = compute(1);
"#;
    let result = extract("client/src/util.js", Language::Javascript, source);
    assert!(result.components.is_empty());
    assert!(result.state.is_empty());
    assert!(result.hooks.is_empty());
    assert!(result.api_calls.is_empty());
}

#[test]
fn bare_fetch_defaults_to_get() {
    let source = r#"
export async function loadPods() {
  const res = await fetch('/api/pods');
  return res.json();
}

export const loadNodes = () =>
  fetch("/api/nodes", { headers: { Accept: "application/json" } });
"#;
    let result = extract("client/src/api/cluster.js", Language::Javascript, source);
    let calls: Vec<_> = result
        .api_calls
        .iter()
        .map(|c| (c.client.as_str(), c.method, c.url.as_str(), c.line))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("fetch", HttpMethod::Get, "/api/pods", 3),
            ("fetch", HttpMethod::Get, "/api/nodes", 8),
        ]
    );
}

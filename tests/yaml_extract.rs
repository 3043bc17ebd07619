use stackmap::analyzer::manifest::read_manifests;
use stackmap::error::AnalysisError;
use stackmap::model::{Language, Manifest, SourceFile};

fn manifests(path: &str, source: &str) -> Vec<Manifest> {
    read_manifests(&SourceFile::new(path, Language::Yaml, source)).unwrap()
}

#[test]
fn extract_single_deployment() {
    let source = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: api-server
  namespace: production
spec:
  template:
    spec:
      initContainers:
        - name: migrate
          image: myregistry/api:v1.2.3
      containers:
        - name: api
          image: myregistry/api:v1.2.3
          env:
            - name: DB_PASSWORD
              valueFrom:
                secretKeyRef:
                  name: db-credentials
                  key: password
        - name: sidecar
          image: envoyproxy/envoy:v1.28
      volumes:
        - name: config
          configMap:
            name: envoy-config
        - name: certs
          secret:
            secretName: tls-certs
"#;
    let found = manifests("k8s/deploy.yaml", source);
    assert_eq!(found.len(), 1);
    let deployment = &found[0];
    assert_eq!(deployment.api_version, "apps/v1");
    assert_eq!(deployment.name, "api-server");
    assert_eq!(deployment.namespace, "production");
    let containers: Vec<_> = deployment.containers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(containers, vec!["migrate", "api", "sidecar"]);
    assert_eq!(deployment.secrets, vec!["db-credentials", "tls-certs"]);
    assert_eq!(deployment.config_maps, vec!["envoy-config"]);
    assert_eq!(deployment.file, "k8s/deploy.yaml");
    assert_eq!(deployment.line, 1);
}

#[test]
fn multi_document_file_with_cronjob_and_ingress() {
    let source = r#"---
apiVersion: batch/v1
kind: CronJob
metadata:
  name: cleanup
spec:
  jobTemplate:
    spec:
      template:
        spec:
          containers:
            - name: cleanup
              image: busybox
---
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web
spec:
  rules:
    - http:
        paths:
          - path: /api
            backend:
              service:
                name: api-server
                port:
                  number: 80
---
"#;
    let found = manifests("k8s/all.yml", source);
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].kind, "CronJob");
    assert_eq!(found[0].containers[0].image.as_deref(), Some("busybox"));
    assert_eq!(found[0].line, 2);
    assert_eq!(found[1].kind, "Ingress");
    assert!(found[1].containers.is_empty());
    assert_eq!(found[1].services, vec!["api-server"]);
    assert_eq!(found[1].line, 15);
}

#[test]
fn non_manifest_yaml_is_ignored() {
    let source = "services:\n  web:\n    image: nginx\n";
    assert!(manifests("docker-compose.yml", source).is_empty());
}

#[test]
fn one_bad_document_fails_the_file() {
    let source = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: ok\n---\nkind: [broken\n";
    let err = read_manifests(&SourceFile::new("k8s/bad.yaml", Language::Yaml, source)).unwrap_err();
    match err {
        AnalysisError::Parse { path, line, .. } => {
            assert_eq!(path, "k8s/bad.yaml");
            assert!(line.is_some_and(|line| line >= 6));
        }
        other => panic!("unexpected error: {other}"),
    }
}

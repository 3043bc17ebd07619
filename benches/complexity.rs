use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stackmap::analyzer::heuristic::HeuristicExtractor;
use stackmap::analyzer::python::PythonParser;
use stackmap::metrics;
use stackmap::model::{Language, SourceFile};
use stackmap::vocab::Vocabulary;
use stackmap::{AnalyzerConfig, analyze};
use std::path::PathBuf;

fn python_module(functions: usize) -> String {
    let mut out = String::from("from fastapi import APIRouter, Depends\n\nrouter = APIRouter()\n\n");
    for idx in 0..functions {
        out.push_str(&format!(
            r#"@router.get("/pods/{{name}}/items/{idx}")
def handler_{idx}(name: str, limit: int = 10, user=Depends(get_current_user)):
    for item in range(limit):
        if item % 2 and name:
            while item > 0:
                item -= 1
        elif item > 5 or not name:
            raise HTTPException(status_code=404, detail="missing")
    return {{"name": name}}

"#
        ));
    }
    out
}

fn router_module(routes: usize) -> String {
    let mut out = String::from("import { requireAuth } from './guards'\n\nexport default [\n");
    for idx in 0..routes {
        out.push_str(&format!(
            "  {{ path: '/pods/{idx}/:name', component: () => import('@/views/Pod{idx}.vue'), beforeEnter: requireAuth, meta: {{ title: 'Pod {idx}' }} }},\n"
        ));
    }
    out.push_str("]\n");
    out
}

/// Parse plus per-function scoring
fn bench_score_functions(c: &mut Criterion) {
    let file = SourceFile::new("server/app/api/pods.py", Language::Python, python_module(200));
    let mut parser = PythonParser::new().unwrap();

    c.bench_function("score_200_functions", |b| {
        b.iter(|| {
            let module = parser.parse(black_box(&file)).unwrap();
            let total: u32 = module
                .functions()
                .filter_map(|symbol| module.definition(symbol))
                .map(|node| metrics::score_function(node, 3).cyclomatic)
                .sum();
            black_box(total)
        })
    });
}

/// Regex battery over a large router file
fn bench_heuristic_extract(c: &mut Criterion) {
    let vocab = Vocabulary::default();
    let extractor = HeuristicExtractor::new(&vocab);
    let mut group = c.benchmark_group("heuristic_extract");

    for routes in [10, 100, 500] {
        let file = SourceFile::new(
            "client/src/router/index.js",
            Language::Javascript,
            router_module(routes),
        );
        group.bench_function(format!("routes_{routes}"), |b| {
            b.iter(|| black_box(extractor.extract(black_box(&file))))
        });
    }

    group.finish();
}

/// Whole pipeline, sequential vs parallel
fn bench_full_run(c: &mut Criterion) {
    let repo = tempfile::tempdir().unwrap();
    let root: PathBuf = repo.path().to_path_buf();
    for idx in 0..20 {
        let path = root.join(format!("server/app/api/pods_{idx}.py"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, python_module(20)).unwrap();
    }
    let router = root.join("client/src/router/index.js");
    std::fs::create_dir_all(router.parent().unwrap()).unwrap();
    std::fs::write(router, router_module(50)).unwrap();

    let mut group = c.benchmark_group("full_run");
    group.sample_size(10);
    for parallel in [false, true] {
        let name = if parallel { "parallel" } else { "sequential" };
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut config = AnalyzerConfig::new(&root);
                config.parallel = parallel;
                black_box(analyze(config).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_score_functions,
    bench_heuristic_extract,
    bench_full_run
);
criterion_main!(benches);

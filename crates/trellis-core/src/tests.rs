//! Unit tests for trellis-core

use std::path::Path;

use crate::model::*;

#[test]
fn test_symbol_id_derivation() {
    let id = SymbolId::derive("src/app.py", SymbolKind::Function, "src/app.py::main");

    // Ids are deterministic across calls
    let same = SymbolId::derive("src/app.py", SymbolKind::Function, "src/app.py::main");
    assert_eq!(id, same);

    // Different names produce different ids
    let other = SymbolId::derive("src/app.py", SymbolKind::Function, "src/app.py::helper");
    assert_ne!(id, other);

    // Same name, different kind, different id
    let class = SymbolId::derive("src/app.py", SymbolKind::Class, "src/app.py::main");
    assert_ne!(id, class);
}

#[test]
fn test_language_detection() {
    let cases = vec![
        ("test.rs", Language::Rust),
        ("main.ts", Language::TypeScript),
        ("app.jsx", Language::JavaScript),
        ("lib.py", Language::Python),
        ("main.go", Language::Go),
        ("Main.java", Language::Java),
        ("main.c", Language::C),
        ("main.cpp", Language::Cpp),
        ("Program.cs", Language::CSharp),
        ("app.rb", Language::Ruby),
        ("index.php", Language::Php),
        ("Main.kt", Language::Kotlin),
        ("config.yml", Language::Yaml),
        ("config.toml", Language::Toml),
        ("package.json", Language::Json),
        ("schema.sql", Language::Sql),
        ("README.md", Language::Markdown),
        ("Dockerfile", Language::Dockerfile),
        ("unknown.xyz", Language::Other),
    ];

    for (filename, expected) in cases {
        let detected = Language::from_path(Path::new(filename));
        assert_eq!(detected, expected, "failed for {}", filename);
    }
}

#[test]
fn test_language_tag_roundtrip() {
    for lang in [
        Language::Rust,
        Language::TypeScript,
        Language::Python,
        Language::Dockerfile,
        Language::Other,
    ] {
        assert_eq!(Language::parse_tag(lang.as_str()), lang);
    }
}

#[test]
fn test_file_role_classification() {
    assert_eq!(FileRole::classify(Path::new("src/main.rs")), FileRole::Source);
    assert_eq!(FileRole::classify(Path::new("tests/test_app.py")), FileRole::Test);
    assert_eq!(FileRole::classify(Path::new("src/api.test.ts")), FileRole::Test);
    assert_eq!(FileRole::classify(Path::new("config/app.yaml")), FileRole::Config);
    assert_eq!(FileRole::classify(Path::new(".env")), FileRole::Config);
    assert_eq!(FileRole::classify(Path::new("docs/guide.md")), FileRole::Docs);
    assert_eq!(FileRole::classify(Path::new("Dockerfile")), FileRole::Build);
    assert_eq!(FileRole::classify(Path::new("Makefile")), FileRole::Build);
}

#[test]
fn test_symbol_kind_tags() {
    for kind in [
        SymbolKind::Function,
        SymbolKind::Method,
        SymbolKind::Route,
        SymbolKind::ConfigKey,
        SymbolKind::EnvVariable,
        SymbolKind::TemplateBlock,
    ] {
        assert_eq!(SymbolKind::parse_tag(kind.as_str()), kind);
    }
    assert_eq!(SymbolKind::parse_tag("not-a-kind"), SymbolKind::Unknown);
    assert!(SymbolKind::Function.is_callable());
    assert!(SymbolKind::Method.is_callable());
    assert!(!SymbolKind::Class.is_callable());
}

#[test]
fn test_edge_kind_tags() {
    for kind in [
        EdgeKind::Calls,
        EdgeKind::Imports,
        EdgeKind::RestRoute,
        EdgeKind::TemplateBinding,
        EdgeKind::ConfigBinding,
    ] {
        assert_eq!(EdgeKind::parse_tag(kind.as_str()), kind);
    }
    assert_eq!(EdgeKind::parse_tag("???"), EdgeKind::Reference);
}

#[test]
fn test_index_report_noop() {
    let report = IndexReport::default();
    assert!(report.is_noop());

    let report = IndexReport {
        edges_added: 1,
        ..Default::default()
    };
    assert!(!report.is_noop());
}

#[test]
fn test_default_config_values() {
    let config = crate::config::IndexConfig::default();
    assert_eq!(config.resolver.max_ambiguous_candidates, 8);
    assert!(!config.resolver.fuzzy_enabled);
    assert_eq!(config.change_detector.retry_budget, 2);
    assert_eq!(config.algorithms.size_guard_nodes, 500);
    assert_eq!(config.algorithms.pagerank_max_iterations, 100);
    assert!(config.algorithms.pagerank_damping.is_none());
    assert_eq!(config.store.chunk_size, 500);
    assert_eq!(config.indexer.batch_files, 256);
}

#[test]
fn test_partial_config_parse() {
    let config: crate::config::IndexConfig = toml::from_str(
        r#"
        [resolver]
        fuzzy_enabled = true

        [algorithms]
        size_guard_nodes = 100
        "#,
    )
    .unwrap();
    assert!(config.resolver.fuzzy_enabled);
    assert_eq!(config.resolver.max_ambiguous_candidates, 8);
    assert_eq!(config.algorithms.size_guard_nodes, 100);
    assert_eq!(config.store.chunk_size, 500);
}

#[test]
fn test_edge_serialization() {
    let edge = Edge {
        id: 3,
        provenance: FileId(1),
        source_file: FileId(1),
        source_symbol: Some(SymbolId(10)),
        target_symbol: None,
        kind: EdgeKind::Calls,
        origin: EdgeOrigin::Structural,
        confidence: 1.0,
        candidate_count: 2,
        line: Some(14),
    };

    let json = serde_json::to_string(&edge).unwrap();
    let back: Edge = serde_json::from_str(&json).unwrap();
    assert_eq!(edge, back);
}

//! Core data structures for the code graph

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Row id of a file in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct FileId(pub i64);

/// Stable identifier for a symbol.
///
/// Derived from the defining file's path, the symbol kind, and the qualified
/// name, so re-indexing a file reproduces identical ids for unchanged
/// definitions. That is what lets edges from *other* files survive a per-file
/// symbol replacement untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct SymbolId(pub i64);

impl SymbolId {
    pub fn derive(file_path: &str, kind: SymbolKind, qualified_name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(file_path.as_bytes());
        hasher.update([0u8]);
        hasher.update(kind.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(qualified_name.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        SymbolId(i64::from_be_bytes(bytes))
    }
}

/// Supported languages for syntax-aware parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Yaml,
    Toml,
    Json,
    Sql,
    Dockerfile,
    Markdown,
    Other,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("rs") => Language::Rust,
            Some("ts") | Some("tsx") => Language::TypeScript,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Language::JavaScript,
            Some("py") | Some("pyi") => Language::Python,
            Some("go") => Language::Go,
            Some("java") => Language::Java,
            Some("c") | Some("h") => Language::C,
            Some("cpp") | Some("cc") | Some("cxx") | Some("hpp") | Some("hh") => Language::Cpp,
            Some("cs") => Language::CSharp,
            Some("rb") => Language::Ruby,
            Some("php") => Language::Php,
            Some("swift") => Language::Swift,
            Some("kt") | Some("kts") => Language::Kotlin,
            Some("yml") | Some("yaml") => Language::Yaml,
            Some("toml") => Language::Toml,
            Some("json") | Some("jsonc") => Language::Json,
            Some("sql") => Language::Sql,
            Some("md") | Some("mdx") => Language::Markdown,
            Some("env") => Language::Other,
            _ => {
                if path.file_name().is_some_and(|n| {
                    let s = n.to_string_lossy();
                    s == "Dockerfile" || s.starts_with("Dockerfile.")
                }) {
                    Language::Dockerfile
                } else {
                    Language::Other
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Json => "json",
            Language::Sql => "sql",
            Language::Dockerfile => "dockerfile",
            Language::Markdown => "markdown",
            Language::Other => "other",
        }
    }

    pub fn parse_tag(tag: &str) -> Self {
        match tag {
            "rust" => Language::Rust,
            "typescript" => Language::TypeScript,
            "javascript" => Language::JavaScript,
            "python" => Language::Python,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" => Language::C,
            "cpp" => Language::Cpp,
            "csharp" => Language::CSharp,
            "ruby" => Language::Ruby,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "kotlin" => Language::Kotlin,
            "yaml" => Language::Yaml,
            "toml" => Language::Toml,
            "json" => Language::Json,
            "sql" => Language::Sql,
            "dockerfile" => Language::Dockerfile,
            "markdown" => Language::Markdown,
            _ => Language::Other,
        }
    }
}

/// Coarse role classification for a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileRole {
    Source,
    Test,
    Config,
    Docs,
    Build,
    Other,
}

impl FileRole {
    /// Classify a file from its path.
    pub fn classify(path: &Path) -> Self {
        let lossy = path.to_string_lossy().replace('\\', "/");
        let lower = lossy.to_lowercase();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name == "dockerfile"
            || name.starts_with("dockerfile.")
            || name == "makefile"
            || name == "cargo.toml"
            || name == "package.json"
            || name == "build.gradle"
            || name == "pom.xml"
        {
            return FileRole::Build;
        }
        if lower.contains("/tests/")
            || lower.contains("/test/")
            || lower.starts_with("tests/")
            || name.starts_with("test_")
            || name.ends_with("_test.go")
            || name.ends_with(".test.ts")
            || name.ends_with(".test.js")
            || name.ends_with(".spec.ts")
            || name.ends_with(".spec.js")
        {
            return FileRole::Test;
        }
        match Language::from_path(path) {
            Language::Yaml | Language::Toml | Language::Json => FileRole::Config,
            Language::Markdown => FileRole::Docs,
            Language::Dockerfile => FileRole::Build,
            Language::Other => {
                if name == ".env" || name.starts_with(".env.") || name.ends_with(".env") {
                    FileRole::Config
                } else {
                    FileRole::Other
                }
            }
            _ => FileRole::Source,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Source => "source",
            FileRole::Test => "test",
            FileRole::Config => "config",
            FileRole::Docs => "docs",
            FileRole::Build => "build",
            FileRole::Other => "other",
        }
    }

    pub fn parse_tag(tag: &str) -> Self {
        match tag {
            "source" => FileRole::Source,
            "test" => FileRole::Test,
            "config" => FileRole::Config,
            "docs" => FileRole::Docs,
            "build" => FileRole::Build,
            _ => FileRole::Other,
        }
    }
}

/// Stored state of a tracked file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub id: FileId,
    /// Repository-relative path with `/` separators. Unique key.
    pub path: String,
    pub language: Language,
    /// Hex sha256 of the file content.
    pub hash: String,
    /// Modification time in milliseconds since the epoch.
    pub mtime_ms: i64,
    pub line_count: u32,
    pub role: FileRole,
}

/// Discriminates what kind of definition a symbol represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    // ── Code entities (tree-sitter extracted) ───────────────
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Interface,
    Trait,
    Module,
    Constant,
    Variable,
    TypeAlias,

    // ── Bridge-facing entities ──────────────────────────────
    Route,
    ConfigKey,
    EnvVariable,
    TemplateBlock,

    // ── Fallback ────────────────────────────────────────────
    Unknown,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Interface => "interface",
            SymbolKind::Trait => "trait",
            SymbolKind::Module => "module",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Route => "route",
            SymbolKind::ConfigKey => "config_key",
            SymbolKind::EnvVariable => "env_variable",
            SymbolKind::TemplateBlock => "template_block",
            SymbolKind::Unknown => "unknown",
        }
    }

    pub fn parse_tag(tag: &str) -> Self {
        match tag {
            "function" => SymbolKind::Function,
            "method" => SymbolKind::Method,
            "class" => SymbolKind::Class,
            "struct" => SymbolKind::Struct,
            "enum" => SymbolKind::Enum,
            "interface" => SymbolKind::Interface,
            "trait" => SymbolKind::Trait,
            "module" => SymbolKind::Module,
            "constant" => SymbolKind::Constant,
            "variable" => SymbolKind::Variable,
            "type_alias" => SymbolKind::TypeAlias,
            "route" => SymbolKind::Route,
            "config_key" => SymbolKind::ConfigKey,
            "env_variable" => SymbolKind::EnvVariable,
            "template_block" => SymbolKind::TemplateBlock,
            _ => SymbolKind::Unknown,
        }
    }

    /// Kinds that carry a cognitive-complexity score.
    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }
}

/// A named definition at a specific file location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Symbol {
    pub id: SymbolId,
    pub file: FileId,
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub signature: Option<String>,
    pub line_start: u32,
    pub line_end: u32,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn parse_tag(tag: &str) -> Self {
        match tag {
            "private" => Visibility::Private,
            _ => Visibility::Public,
        }
    }
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    // ── Structural (from AST) ───────────────────────────────
    Calls,
    Imports,
    Inherits,
    Implements,
    TypeReference,
    Instantiates,

    // ── Cross-language bridges ──────────────────────────────
    RestRoute,
    TemplateBinding,
    ConfigBinding,

    // ── Fallback ────────────────────────────────────────────
    Reference,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Calls => "calls",
            EdgeKind::Imports => "imports",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Implements => "implements",
            EdgeKind::TypeReference => "type_reference",
            EdgeKind::Instantiates => "instantiates",
            EdgeKind::RestRoute => "rest_route",
            EdgeKind::TemplateBinding => "template_binding",
            EdgeKind::ConfigBinding => "config_binding",
            EdgeKind::Reference => "reference",
        }
    }

    pub fn parse_tag(tag: &str) -> Self {
        match tag {
            "calls" => EdgeKind::Calls,
            "imports" => EdgeKind::Imports,
            "inherits" => EdgeKind::Inherits,
            "implements" => EdgeKind::Implements,
            "type_reference" => EdgeKind::TypeReference,
            "instantiates" => EdgeKind::Instantiates,
            "rest_route" => EdgeKind::RestRoute,
            "template_binding" => EdgeKind::TemplateBinding,
            "config_binding" => EdgeKind::ConfigBinding,
            _ => EdgeKind::Reference,
        }
    }
}

/// How an edge was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeOrigin {
    /// Determined by AST/structural analysis.
    Structural,
    /// Determined by pattern-matching heuristics.
    Heuristic,
    /// Determined by a cross-language bridge.
    Bridge,
}

impl EdgeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeOrigin::Structural => "structural",
            EdgeOrigin::Heuristic => "heuristic",
            EdgeOrigin::Bridge => "bridge",
        }
    }

    pub fn parse_tag(tag: &str) -> Self {
        match tag {
            "structural" => EdgeOrigin::Structural,
            "bridge" => EdgeOrigin::Bridge,
            _ => EdgeOrigin::Heuristic,
        }
    }
}

/// A directed edge in the code graph.
///
/// `provenance` records which file's (re-)indexing produced the edge;
/// re-indexing that file deletes and regenerates exactly the edges whose
/// provenance matches, leaving all other edges untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    /// Store-assigned row id; 0 before the first insert.
    pub id: i64,
    pub provenance: FileId,
    pub source_file: FileId,
    pub source_symbol: Option<SymbolId>,
    /// `None` means the reference is unresolved.
    pub target_symbol: Option<SymbolId>,
    pub kind: EdgeKind,
    pub origin: EdgeOrigin,
    /// 1.0 for Structural, 0.5-0.9 for Heuristic and Bridge.
    pub confidence: f32,
    /// How many equally valid candidates were seen (0 = none, >=2 = ambiguous).
    pub candidate_count: u32,
    pub line: Option<u32>,
}

/// Kinds of metric records attached to a symbol or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Complexity,
    Churn,
    CoChange,
    BlameAge,
    Entropy,
    PageRank,
    Layer,
    Cluster,
    Hotspot,
    Health,
    Debt,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Complexity => "complexity",
            MetricKind::Churn => "churn",
            MetricKind::CoChange => "co_change",
            MetricKind::BlameAge => "blame_age",
            MetricKind::Entropy => "entropy",
            MetricKind::PageRank => "pagerank",
            MetricKind::Layer => "layer",
            MetricKind::Cluster => "cluster",
            MetricKind::Hotspot => "hotspot",
            MetricKind::Health => "health",
            MetricKind::Debt => "debt",
        }
    }

    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag {
            "complexity" => Some(MetricKind::Complexity),
            "churn" => Some(MetricKind::Churn),
            "co_change" => Some(MetricKind::CoChange),
            "blame_age" => Some(MetricKind::BlameAge),
            "entropy" => Some(MetricKind::Entropy),
            "pagerank" => Some(MetricKind::PageRank),
            "layer" => Some(MetricKind::Layer),
            "cluster" => Some(MetricKind::Cluster),
            "hotspot" => Some(MetricKind::Hotspot),
            "health" => Some(MetricKind::Health),
            "debt" => Some(MetricKind::Debt),
            _ => None,
        }
    }
}

/// Owner of a metric record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricOwner {
    Symbol(SymbolId),
    File(FileId),
}

/// Per-file version-control statistics, supplied by an external provider
/// and merged verbatim into the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VcsStats {
    pub commit_count: u32,
    pub total_churn: u64,
    pub distinct_authors: u32,
    pub blame_age_days: f64,
    pub entropy: f64,
}

/// Per-file problem recorded during indexing. Never aborts the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub path: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Malformed source; partial symbols were kept.
    ParseError,
    /// Unreadable after the retry budget; treated as deleted.
    Unreadable,
    /// No grammar for the language; generic extraction was used.
    NoGrammar,
}

/// Summary of one indexing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub files_added: usize,
    pub files_modified: usize,
    pub files_deleted: usize,
    pub symbols_added: usize,
    pub symbols_removed: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
    pub unresolved: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl IndexReport {
    /// True when the run changed nothing in the store.
    pub fn is_noop(&self) -> bool {
        self.files_added == 0
            && self.files_modified == 0
            && self.files_deleted == 0
            && self.symbols_added == 0
            && self.symbols_removed == 0
            && self.edges_added == 0
            && self.edges_removed == 0
    }
}

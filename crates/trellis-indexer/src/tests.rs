use std::fs;

use trellis_core::{
    ChangeDetectorConfig, EdgeKind, EdgeOrigin, FileRecord, FileRole, Language, ResolverConfig,
    SymbolId, SymbolKind, Visibility,
};

use crate::bridges::BridgeRegistry;
use crate::changes::{detect_changes, hash_bytes};
use crate::discovery::{FileDiscovery, WalkDiscovery};
use crate::extractor::{RawReference, RawReferenceKind, extract_file};
use crate::resolver::{Resolution, SymbolTable, TableEntry, resolve};

fn extract(path: &str, content: &str) -> crate::extractor::Extraction {
    let lang = Language::from_path(std::path::Path::new(path));
    extract_file(path, lang, FileRole::classify(std::path::Path::new(path)), content)
}

fn symbol_names(extraction: &crate::extractor::Extraction) -> Vec<&str> {
    extraction.symbols.iter().map(|s| s.name.as_str()).collect()
}

fn find_symbol<'a>(
    extraction: &'a crate::extractor::Extraction,
    name: &str,
) -> &'a crate::extractor::SymbolDraft {
    extraction
        .symbols
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("missing symbol {name}"))
}

// ── Rust extraction ─────────────────────────────────────

#[test]
fn rust_functions_structs_and_methods() {
    let source = r#"
pub struct Server {
    port: u16,
}

impl Server {
    pub fn start(&self) {
        listen(self.port);
    }
}

fn listen(port: u16) {
    let _ = std::env::var("BIND_ADDR");
}
"#;
    let out = extract("src/server.rs", source);

    let server = find_symbol(&out, "Server");
    assert_eq!(server.kind, SymbolKind::Struct);
    assert_eq!(server.visibility, Visibility::Public);

    let start = find_symbol(&out, "start");
    assert_eq!(start.kind, SymbolKind::Method);
    assert_eq!(start.qualified_name, "Server::start");

    let listen = find_symbol(&out, "listen");
    assert_eq!(listen.kind, SymbolKind::Function);
    assert_eq!(listen.visibility, Visibility::Private);

    let call = out
        .references
        .iter()
        .find(|r| r.kind == RawReferenceKind::Call && r.name == "listen")
        .expect("call reference");
    assert!(call.enclosing.is_some());

    let env = out
        .references
        .iter()
        .find(|r| r.kind == RawReferenceKind::EnvRead)
        .expect("env reference");
    assert_eq!(env.name, "BIND_ADDR");
}

#[test]
fn rust_impl_trait_records_inherit() {
    let source = r#"
trait Runner {
    fn run(&self);
}

struct Job;

impl Runner for Job {
    fn run(&self) {}
}
"#;
    let out = extract("src/job.rs", source);
    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::Inherit && r.name == "Runner")
    );
    let run = find_symbol(&out, "run");
    assert_eq!(run.kind, SymbolKind::Method);
    assert_eq!(run.qualified_name, "Job::run");
}

#[test]
fn rust_complexity_counts_nesting() {
    let source = r#"
fn triage(x: i32) -> i32 {
    if x > 0 {
        for i in 0..x {
            if i % 2 == 0 {
                return i;
            }
        }
    }
    x
}
"#;
    let out = extract("src/triage.rs", source);
    // base 1, outer if 1, for at depth 1 = 2, inner if at depth 2 = 3.
    assert_eq!(find_symbol(&out, "triage").complexity, Some(7.0));
}

#[test]
fn rust_parse_error_degrades_to_diagnostic() {
    let out = extract("src/broken.rs", "fn incomplete( {");
    assert!(!out.diagnostics.is_empty());
}

// ── Python extraction ───────────────────────────────────

#[test]
fn python_classes_methods_and_constants() {
    let source = r#"
import os
from app.models import User

API_VERSION = "v1"

class UserService:
    def list_users(self):
        return fetch_all()

    def _internal(self):
        pass
"#;
    let out = extract("services/users.py", source);

    assert_eq!(find_symbol(&out, "API_VERSION").kind, SymbolKind::Constant);
    assert_eq!(find_symbol(&out, "UserService").kind, SymbolKind::Class);

    let method = find_symbol(&out, "list_users");
    assert_eq!(method.kind, SymbolKind::Method);
    assert_eq!(method.qualified_name, "UserService.list_users");

    assert_eq!(find_symbol(&out, "_internal").visibility, Visibility::Private);

    let imports: Vec<&str> = out
        .references
        .iter()
        .filter(|r| r.kind == RawReferenceKind::Import)
        .map(|r| r.name.as_str())
        .collect();
    assert!(imports.contains(&"os"));
    assert!(imports.contains(&"models"));
}

#[test]
fn python_route_decorator_creates_route_symbol() {
    let source = r#"
@app.route("/users")
def list_users():
    return []

@router.get("/users/{user_id}")
def get_user(user_id):
    return None
"#;
    let out = extract("api/routes.py", source);

    let any_route = find_symbol(&out, "/users");
    assert_eq!(any_route.kind, SymbolKind::Route);
    assert_eq!(any_route.qualified_name, "ANY /users");

    let get_route = find_symbol(&out, "/users/{user_id}");
    assert_eq!(get_route.qualified_name, "GET /users/{user_id}");

    // The route is wired to its handler through a call reference.
    let route_index = out
        .symbols
        .iter()
        .position(|s| s.name == "/users")
        .expect("route symbol");
    assert!(
        out.references
            .iter()
            .any(|r| r.name == "list_users" && r.enclosing == Some(route_index))
    );
}

#[test]
fn python_environ_reads() {
    let source = r#"
import os

def configure():
    url = os.environ["DATABASE_URL"]
    port = os.getenv("PORT")
    return url, port
"#;
    let out = extract("config.py", source);
    let keys: Vec<&str> = out
        .references
        .iter()
        .filter(|r| r.kind == RawReferenceKind::EnvRead)
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(keys, vec!["DATABASE_URL", "PORT"]);
}

// ── JavaScript / TypeScript extraction ──────────────────

#[test]
fn javascript_functions_classes_and_http_calls() {
    let source = r#"
import { getUser } from "./api/client";

const loadUser = async (id) => {
  const res = await fetch("/api/users");
  return res.json();
};

class AdminPanel extends Panel {
  refresh() {
    loadUser(1);
  }
}
"#;
    let out = extract("web/admin.js", source);

    assert_eq!(find_symbol(&out, "loadUser").kind, SymbolKind::Function);
    assert_eq!(find_symbol(&out, "AdminPanel").kind, SymbolKind::Class);
    assert_eq!(
        find_symbol(&out, "refresh").qualified_name,
        "AdminPanel.refresh"
    );

    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::Inherit && r.name == "Panel")
    );
    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::Import && r.name == "client")
    );

    let http = out
        .references
        .iter()
        .find(|r| r.kind == RawReferenceKind::HttpCall)
        .expect("http call");
    assert_eq!(http.name, "/api/users");
    assert!(http.enclosing.is_some());
}

#[test]
fn javascript_route_registration() {
    let source = r#"
app.get("/api/users/:id", getUser);
app.post("/api/users", createUser);
"#;
    let out = extract("web/server.js", source);

    let get_route = find_symbol(&out, "/api/users/:id");
    assert_eq!(get_route.kind, SymbolKind::Route);
    assert_eq!(get_route.qualified_name, "GET /api/users/:id");
    assert_eq!(
        find_symbol(&out, "/api/users").qualified_name,
        "POST /api/users"
    );

    let route_index = out
        .symbols
        .iter()
        .position(|s| s.qualified_name == "GET /api/users/:id")
        .expect("route");
    assert!(
        out.references
            .iter()
            .any(|r| r.name == "getUser" && r.enclosing == Some(route_index))
    );
}

#[test]
fn javascript_process_env() {
    let out = extract("web/env.js", "const port = process.env.PORT;\n");
    let env = out
        .references
        .iter()
        .find(|r| r.kind == RawReferenceKind::EnvRead)
        .expect("env read");
    assert_eq!(env.name, "PORT");
}

#[test]
fn typescript_interfaces_and_type_aliases() {
    let source = r#"
export interface User {
  id: number;
}

export type UserId = number;

export function findUser(id: UserId): User | null {
  return null;
}
"#;
    let out = extract("web/types.ts", source);
    assert_eq!(find_symbol(&out, "User").kind, SymbolKind::Interface);
    assert_eq!(find_symbol(&out, "UserId").kind, SymbolKind::TypeAlias);
    assert_eq!(find_symbol(&out, "findUser").kind, SymbolKind::Function);
}

// ── Go extraction ───────────────────────────────────────

#[test]
fn go_functions_methods_and_types() {
    let source = r#"
package main

import "os"

type Server struct {
	port int
}

func (s *Server) Start() {
	addr := os.Getenv("BIND_ADDR")
	listen(addr)
}

func listen(addr string) {
}
"#;
    let out = extract("cmd/server.go", source);

    assert_eq!(find_symbol(&out, "Server").kind, SymbolKind::Struct);

    let start = find_symbol(&out, "Start");
    assert_eq!(start.kind, SymbolKind::Method);
    assert_eq!(start.qualified_name, "Server.Start");
    assert_eq!(start.visibility, Visibility::Public);

    assert_eq!(find_symbol(&out, "listen").visibility, Visibility::Private);

    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::EnvRead && r.name == "BIND_ADDR")
    );
    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::Call && r.name == "listen")
    );
}

#[test]
fn go_route_registration() {
    let source = r#"
package main

import "net/http"

func main() {
	http.HandleFunc("/health", healthHandler)
}
"#;
    let out = extract("cmd/main.go", source);
    let route = find_symbol(&out, "/health");
    assert_eq!(route.kind, SymbolKind::Route);
    assert_eq!(route.qualified_name, "ANY /health");
}

// ── Java extraction ─────────────────────────────────────

#[test]
fn java_classes_methods_and_mappings() {
    let source = r#"
import org.springframework.web.bind.annotation.GetMapping;

public class UserController extends BaseController {
    @GetMapping("/users")
    public String listUsers() {
        return service.findAll();
    }
}
"#;
    let out = extract("src/UserController.java", source);

    let class = find_symbol(&out, "UserController");
    assert_eq!(class.kind, SymbolKind::Class);
    assert_eq!(class.visibility, Visibility::Public);

    assert_eq!(
        find_symbol(&out, "listUsers").qualified_name,
        "UserController.listUsers"
    );
    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::Inherit && r.name == "BaseController")
    );

    let route = find_symbol(&out, "/users");
    assert_eq!(route.qualified_name, "GET /users");

    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::Call
                && r.name == "findAll"
                && r.qualifier.as_deref() == Some("service"))
    );
}

// ── C / C++ extraction ──────────────────────────────────

#[test]
fn c_functions_structs_and_defines() {
    let source = r#"
#include <stdlib.h>
#include "pool.h"

#define MAX_CONNS 64

struct conn_pool {
    int size;
};

typedef struct conn_pool pool_t;

int pool_init(int size) {
    char *limit = getenv("POOL_LIMIT");
    return acquire(size);
}
"#;
    let out = extract("src/pool.c", source);

    assert_eq!(find_symbol(&out, "MAX_CONNS").kind, SymbolKind::Constant);
    assert_eq!(find_symbol(&out, "conn_pool").kind, SymbolKind::Struct);
    assert_eq!(find_symbol(&out, "pool_t").kind, SymbolKind::TypeAlias);
    assert_eq!(find_symbol(&out, "pool_init").kind, SymbolKind::Function);

    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::Import && r.name == "pool")
    );
    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::EnvRead && r.name == "POOL_LIMIT")
    );
    assert!(
        out.references
            .iter()
            .any(|r| r.kind == RawReferenceKind::Call && r.name == "acquire")
    );
}

#[test]
fn cpp_classes_and_namespaces() {
    let source = r#"
namespace net {

class Socket {
public:
    void open();
};

void Socket::open() {
    bind_port();
}

}
"#;
    let out = extract("src/socket.cpp", source);

    let class = find_symbol(&out, "Socket");
    assert_eq!(class.kind, SymbolKind::Class);
    assert_eq!(class.qualified_name, "net::Socket");

    let open = out
        .symbols
        .iter()
        .find(|s| s.name == "open" && s.kind == SymbolKind::Method)
        .expect("method definition");
    assert_eq!(open.qualified_name, "Socket::open");
}

// ── Generic fallback ────────────────────────────────────

#[test]
fn generic_extractor_finds_definitions_and_imports() {
    let source = "require \"json\"\n\ndef parse(input)\n  return input\nend\n\nclass Loader\nend\n";
    let out = extract("lib/loader.rb", source);

    assert!(symbol_names(&out).contains(&"parse"));
    assert!(symbol_names(&out).contains(&"Loader"));
    assert!(find_symbol(&out, "parse").complexity.is_some());

    let import = out
        .references
        .iter()
        .find(|r| r.kind == RawReferenceKind::Import)
        .expect("import");
    assert_eq!(import.name, "json");
    assert_eq!(import.origin, EdgeOrigin::Heuristic);
}

// ── Config and template scanning ────────────────────────

#[test]
fn env_file_keys_become_symbols() {
    let source = "# comment\nDATABASE_URL=postgres://localhost/app\nexport PORT=8080\n";
    let out = extract(".env", source);

    let url = find_symbol(&out, "DATABASE_URL");
    assert_eq!(url.kind, SymbolKind::EnvVariable);
    assert_eq!(url.line_start, 2);
    assert_eq!(find_symbol(&out, "PORT").line_start, 3);
}

#[test]
fn yaml_keys_become_dotted_config_symbols() {
    let source = "database:\n  url: localhost\n  pool: 5\nserver:\n  port: 8080\n";
    let out = extract("config/app.yaml", source);

    let url = find_symbol(&out, "url");
    assert_eq!(url.kind, SymbolKind::ConfigKey);
    assert_eq!(url.qualified_name, "database.url");
    assert_eq!(url.line_start, 2);

    let port = find_symbol(&out, "port");
    assert_eq!(port.qualified_name, "server.port");
    assert_eq!(port.line_start, 5);
}

#[test]
fn template_blocks_and_references() {
    let source = "{% extends \"base.html\" %}\n{% block content %}\n<p>{{ user.name }}</p>\n{% endblock %}\n";
    let out = extract("templates/home.html", source);

    assert_eq!(find_symbol(&out, "home").kind, SymbolKind::TemplateBlock);
    assert_eq!(find_symbol(&out, "content").qualified_name, "home.content");

    let extends = out
        .references
        .iter()
        .find(|r| r.name == "base")
        .expect("extends target");
    assert_eq!(extends.kind, RawReferenceKind::TemplateVar);

    let var = out
        .references
        .iter()
        .find(|r| r.name == "user")
        .expect("interpolation");
    assert_eq!(var.detail.as_deref(), Some("user.name"));
}

// ── Change detection ────────────────────────────────────

#[test]
fn change_detection_partitions_added_modified_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    fs::create_dir_all(root.join("src")).expect("mkdir");
    fs::write(root.join("src/kept.rs"), "fn kept() {}\n").expect("write");
    fs::write(root.join("src/new.rs"), "fn fresh() {}\n").expect("write");
    fs::write(root.join("src/edited.rs"), "fn edited() { changed(); }\n").expect("write");

    let tracked = WalkDiscovery::new().tracked_files(root).expect("walk");
    let kept_mtime = tracked
        .iter()
        .find(|t| t.rel_path == "src/kept.rs")
        .expect("kept tracked")
        .mtime_ms;

    let stored = vec![
        record("src/kept.rs", &hash_bytes(b"fn kept() {}\n"), kept_mtime),
        record("src/edited.rs", &hash_bytes(b"fn edited() {}\n"), 1),
        record("src/gone.rs", "0000", 1),
    ];

    let cfg = ChangeDetectorConfig::default();
    let set = detect_changes(&tracked, &stored, &cfg);

    let added: Vec<&str> = set.added.iter().map(|f| f.tracked.rel_path.as_str()).collect();
    let modified: Vec<&str> = set.modified.iter().map(|f| f.tracked.rel_path.as_str()).collect();
    assert_eq!(added, vec!["src/new.rs"]);
    assert_eq!(modified, vec!["src/edited.rs"]);
    assert_eq!(set.deleted, vec!["src/gone.rs".to_string()]);
    assert_eq!(set.unchanged, 1);
}

#[test]
fn same_mtime_skips_hashing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    fs::write(root.join("a.rs"), "fn a() {}\n").expect("write");

    let tracked = WalkDiscovery::new().tracked_files(root).expect("walk");
    // Stored hash is wrong on purpose; the matching mtime short-circuits.
    let stored = vec![record("a.rs", "not-the-real-hash", tracked[0].mtime_ms)];
    let set = detect_changes(&tracked, &stored, &ChangeDetectorConfig::default());
    assert!(set.is_empty());
    assert_eq!(set.unchanged, 1);
}

#[test]
fn discovery_skips_index_and_git_dirs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    fs::create_dir_all(root.join(".trellis")).expect("mkdir");
    fs::create_dir_all(root.join(".git")).expect("mkdir");
    fs::write(root.join(".trellis/index.db"), "x").expect("write");
    fs::write(root.join(".git/HEAD"), "ref").expect("write");
    fs::write(root.join("main.rs"), "fn main() {}\n").expect("write");

    let tracked = WalkDiscovery::new().tracked_files(root).expect("walk");
    let paths: Vec<&str> = tracked.iter().map(|t| t.rel_path.as_str()).collect();
    assert_eq!(paths, vec!["main.rs"]);
}

fn record(path: &str, hash: &str, mtime_ms: i64) -> FileRecord {
    FileRecord {
        id: trellis_core::FileId(0),
        path: path.to_string(),
        language: Language::Rust,
        hash: hash.to_string(),
        mtime_ms,
        line_count: 1,
        role: FileRole::Source,
    }
}

// ── Resolution ──────────────────────────────────────────

fn entry(name: &str, qualified: &str, path: &str, kind: SymbolKind) -> TableEntry {
    TableEntry {
        id: SymbolId::derive(path, kind, qualified),
        kind,
        name: name.to_string(),
        qualified_name: qualified.to_string(),
        path: path.to_string(),
    }
}

fn call(name: &str) -> RawReference {
    RawReference::new(RawReferenceKind::Call, name, 10)
}

#[test]
fn same_file_match_wins_over_global() {
    let table = SymbolTable::new();
    let local = entry("init", "init", "src/a.rs", SymbolKind::Function);
    let local_id = local.id;
    table.insert(local);
    table.insert(entry("init", "init", "src/b.rs", SymbolKind::Function));

    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    match resolve(&call("init"), "src/a.rs", &table, &bridges, &cfg) {
        Resolution::Resolved { target, confidence, .. } => {
            assert_eq!(target, local_id);
            assert_eq!(confidence, 1.0);
        }
        other => panic!("expected same-file resolution, got {other:?}"),
    }
}

#[test]
fn sibling_module_match_beats_distant_candidates() {
    let table = SymbolTable::new();
    let sibling = entry("verify", "verify", "src/auth/token.rs", SymbolKind::Function);
    let sibling_id = sibling.id;
    table.insert(sibling);
    table.insert(entry("verify", "verify", "src/db/check.rs", SymbolKind::Function));

    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    match resolve(&call("verify"), "src/auth/login.rs", &table, &bridges, &cfg) {
        Resolution::Resolved { target, confidence, .. } => {
            assert_eq!(target, sibling_id);
            assert_eq!(confidence, 0.9);
        }
        other => panic!("expected sibling resolution, got {other:?}"),
    }
}

#[test]
fn unique_global_match_resolves() {
    let table = SymbolTable::new();
    let only = entry("parse_config", "parse_config", "src/config.rs", SymbolKind::Function);
    let only_id = only.id;
    table.insert(only);

    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    match resolve(&call("parse_config"), "src/main.rs", &table, &bridges, &cfg) {
        Resolution::Resolved { target, kind, confidence, .. } => {
            assert_eq!(target, only_id);
            assert_eq!(kind, EdgeKind::Calls);
            assert_eq!(confidence, 0.8);
        }
        other => panic!("expected global resolution, got {other:?}"),
    }
}

#[test]
fn ambiguous_candidates_are_never_guessed() {
    let table = SymbolTable::new();
    table.insert(entry("handle", "handle", "src/a/x.rs", SymbolKind::Function));
    table.insert(entry("handle", "handle", "src/b/y.rs", SymbolKind::Function));

    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    let resolution = resolve(&call("handle"), "src/main.rs", &table, &bridges, &cfg);
    assert_eq!(resolution, Resolution::Unresolved { candidates: 2 });
}

#[test]
fn qualified_reference_matches_method() {
    let table = SymbolTable::new();
    let method = entry("start", "Server::start", "src/server.rs", SymbolKind::Method);
    let method_id = method.id;
    table.insert(method);
    table.insert(entry("start", "Worker::start", "src/worker.rs", SymbolKind::Method));

    let mut raw = call("start");
    raw.qualifier = Some("Server".to_string());
    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    match resolve(&raw, "src/main.rs", &table, &bridges, &cfg) {
        Resolution::Resolved { target, .. } => assert_eq!(target, method_id),
        other => panic!("expected qualified resolution, got {other:?}"),
    }
}

#[test]
fn resolution_is_insertion_order_independent() {
    let forward = SymbolTable::new();
    let backward = SymbolTable::new();
    let entries = [
        entry("alpha", "alpha", "src/a.rs", SymbolKind::Function),
        entry("alpha", "alpha", "src/b.rs", SymbolKind::Function),
        entry("beta", "beta", "src/c.rs", SymbolKind::Function),
    ];
    for e in &entries {
        forward.insert(e.clone());
    }
    for e in entries.iter().rev() {
        backward.insert(e.clone());
    }

    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    for name in ["alpha", "beta", "gamma"] {
        assert_eq!(
            resolve(&call(name), "src/main.rs", &forward, &bridges, &cfg),
            resolve(&call(name), "src/main.rs", &backward, &bridges, &cfg),
        );
    }
}

#[test]
fn fuzzy_is_off_by_default() {
    let table = SymbolTable::new();
    table.insert(entry("initialize", "initialize", "src/a.rs", SymbolKind::Function));

    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    let resolution = resolve(&call("initalize"), "src/main.rs", &table, &bridges, &cfg);
    assert_eq!(resolution, Resolution::Unresolved { candidates: 0 });
}

// ── Bridges ─────────────────────────────────────────────

#[test]
fn rest_bridge_matches_parameterized_route() {
    let table = SymbolTable::new();
    let route = entry("/api/users/:id", "GET /api/users/:id", "web/server.js", SymbolKind::Route);
    let route_id = route.id;
    table.insert(route);
    table.insert(entry("/api/users", "POST /api/users", "web/server.js", SymbolKind::Route));

    let mut raw = RawReference::new(RawReferenceKind::HttpCall, "/api/users/42", 5);
    raw.detail = Some("/api/users/42".to_string());

    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    match resolve(&raw, "web/admin.js", &table, &bridges, &cfg) {
        Resolution::Resolved { target, kind, origin, .. } => {
            assert_eq!(target, route_id);
            assert_eq!(kind, EdgeKind::RestRoute);
            assert_eq!(origin, EdgeOrigin::Bridge);
        }
        other => panic!("expected rest bridge edge, got {other:?}"),
    }
}

#[test]
fn rest_bridge_prefers_literal_segments() {
    let table = SymbolTable::new();
    let literal = entry("/api/users/me", "GET /api/users/me", "api/a.py", SymbolKind::Route);
    let literal_id = literal.id;
    table.insert(literal);
    table.insert(entry("/api/users/:id", "GET /api/users/:id", "api/b.py", SymbolKind::Route));

    let raw = RawReference::new(RawReferenceKind::HttpCall, "/api/users/me", 5);
    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    match resolve(&raw, "web/client.js", &table, &bridges, &cfg) {
        Resolution::Resolved { target, .. } => assert_eq!(target, literal_id),
        other => panic!("expected literal route to win, got {other:?}"),
    }
}

#[test]
fn config_bridge_falls_through_to_yaml_keys() {
    let table = SymbolTable::new();
    let key = entry("url", "database.url", "config/app.yaml", SymbolKind::ConfigKey);
    let key_id = key.id;
    table.insert(key);

    let raw = RawReference::new(RawReferenceKind::EnvRead, "DATABASE_URL", 3);
    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    match resolve(&raw, "src/config.rs", &table, &bridges, &cfg) {
        Resolution::Resolved { target, kind, .. } => {
            assert_eq!(target, key_id);
            assert_eq!(kind, EdgeKind::ConfigBinding);
        }
        other => panic!("expected config bridge edge, got {other:?}"),
    }
}

#[test]
fn env_read_binds_to_dotenv_key() {
    let table = SymbolTable::new();
    let var = entry("PORT", "PORT", ".env", SymbolKind::EnvVariable);
    let var_id = var.id;
    table.insert(var);

    let raw = RawReference::new(RawReferenceKind::EnvRead, "PORT", 3);
    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    match resolve(&raw, "src/main.rs", &table, &bridges, &cfg) {
        Resolution::Resolved { target, kind, origin, .. } => {
            assert_eq!(target, var_id);
            assert_eq!(kind, EdgeKind::ConfigBinding);
            assert_eq!(origin, EdgeOrigin::Bridge);
        }
        other => panic!("expected env binding, got {other:?}"),
    }
}

#[test]
fn template_include_binds_to_block_symbol() {
    let table = SymbolTable::new();
    let block = entry("footer", "footer", "templates/footer.html", SymbolKind::TemplateBlock);
    let block_id = block.id;
    table.insert(block);

    let mut raw = RawReference::heuristic(RawReferenceKind::TemplateVar, "footer", 1);
    raw.detail = Some("footer.html".to_string());
    let cfg = ResolverConfig::default();
    let bridges = BridgeRegistry::default();
    match resolve(&raw, "templates/home.html", &table, &bridges, &cfg) {
        Resolution::Resolved { target, kind, .. } => {
            assert_eq!(target, block_id);
            assert_eq!(kind, EdgeKind::TemplateBinding);
        }
        other => panic!("expected template binding, got {other:?}"),
    }
}

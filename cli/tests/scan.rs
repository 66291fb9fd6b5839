use pretty_assertions::assert_eq;
use sqlsift::discovery::discover;
use sqlsift::output::{OutputFormat, write_records};
use sqlsift::run::{ScanInput, ScanOptions, scan};
use sqlsift_core::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// A scratch directory unique to this test process.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sqlsift-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn project(name: &str) -> PathBuf {
    let root = scratch(name);
    write(
        &root,
        "app/db.py",
        "def find(cur, uid):\n    cur.execute(\"SELECT * FROM users WHERE id = \" + uid)\n    print('Hello, world!')\n",
    );
    write(
        &root,
        "src/repo.rs",
        "fn purge(t: &str) -> String {\n    format!(\"DELETE FROM {t} WHERE expired\")\n}\n",
    );
    write(&root, "README.md", "SELECT * FROM nothing");
    write(&root, "target/debug/build.rs", "const Q: &str = \"SELECT 1\";");
    write(&root, "node_modules/pkg/x.py", "q = 'SELECT 1'");
    write(&root, "fixtures/skip.py", "q = 'SELECT 1'");
    root
}

fn options(root: &Path) -> ScanOptions {
    ScanOptions {
        input: ScanInput::Paths(vec![root.to_path_buf()]),
        exclude_dirs: vec!["fixtures".to_string()],
        jobs: 2,
        include_rejected: false,
        validator: ValidatorConfig::default(),
        extract: ExtractOptions::default(),
    }
}

#[test]
fn test_discovery_skips_build_dirs() {
    let root = project("discovery");
    let found = discover(&[root.clone()], &["fixtures".to_string()]).unwrap();
    let rel: Vec<String> = found
        .iter()
        .map(|s| {
            s.path
                .strip_prefix(&root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    assert_eq!(rel, vec!["app/db.py", "src/repo.rs"]);
    assert_eq!(found[0].language, Language::Python);
    assert_eq!(found[1].language, Language::Rust);
}

#[tokio::test]
async fn test_scan_accepts_sql_only() {
    let root = project("scan");
    let outcome = scan(options(&root), CancelToken::new()).await.unwrap();

    assert_eq!(outcome.files, 2);
    assert_eq!(outcome.candidates, 3);
    assert_eq!(outcome.accepted, 2);
    assert!(!outcome.cancelled);

    let displays: Vec<&str> = outcome.records.iter().map(|r| r.display.as_str()).collect();
    assert_eq!(
        displays,
        vec![
            "SELECT * FROM users WHERE id = {uid}",
            "DELETE FROM {t} WHERE expired",
        ]
    );
    assert_eq!(
        outcome.records[1].verdict.statement_kind(),
        Some(StatementKind::Delete)
    );
}

#[tokio::test]
async fn test_scan_include_rejected_and_csv() {
    let root = project("csv");
    let mut opts = options(&root);
    opts.include_rejected = true;
    opts.input = ScanInput::Paths(vec![root.join("app/db.py")]);
    let outcome = scan(opts, CancelToken::new()).await.unwrap();
    assert_eq!(outcome.records.len(), 2);

    let mut buf = Vec::new();
    write_records(&mut buf, &outcome.records, OutputFormat::Csv).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with(",2,17,python,SELECT * FROM users WHERE id = {uid},true,SELECT"));
    assert!(lines[2].ends_with(",3,11,python,\"Hello, world!\",false,"));
}

#[tokio::test]
async fn test_cancelled_scan_is_partial() {
    let root = project("cancel");
    let cancel = CancelToken::new();
    cancel.cancel();
    let outcome = scan(options(&root), cancel).await.unwrap();
    assert!(outcome.cancelled);
    assert!(outcome.records.is_empty());
}

fn write_dump(path: &Path, lines: &[&str]) {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut encoder = GzEncoder::new(fs::File::create(path).unwrap(), Compression::fast());
    for line in lines {
        writeln!(encoder, "{line}").unwrap();
    }
    encoder.finish().unwrap();
}

#[tokio::test]
async fn test_scan_dump_tags_repos() {
    let root = scratch("dump");
    let dump = root.join("corpus-000.jsonl.gz");
    write_dump(
        &dump,
        &[
            r#"{"repo_name": "acme/shop", "path": "app/db.py", "content": "cur.execute('''\n  SELECT * FROM orders WHERE id = %s\n''')\nlabel = 'Select a file'\n"}"#,
            r#"{"repo_name": "acme/api", "path": "src/db.rs", "content": "const Q: &str = \"DELETE FROM sessions WHERE expired\";"}"#,
            r#"{"repo_name": "acme/api", "path": "docs/index.md", "content": "SELECT * FROM t"}"#,
            r#"{"repo_name": "acme/api", "path": "src/lib.rs"}"#,
            "{broken",
        ],
    );

    let mut opts = options(&root);
    opts.input = ScanInput::Dump(dump);
    let outcome = scan(opts, CancelToken::new()).await.unwrap();

    assert_eq!(outcome.files, 2);
    assert_eq!(outcome.candidates, 3);
    assert_eq!(outcome.accepted, 2);
    assert_eq!(outcome.malformed_entries, 1);
    assert_eq!(outcome.io_failures, 0);

    let mut buf = Vec::new();
    write_records(&mut buf, &outcome.records, OutputFormat::Csv).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(
        text,
        "repo,file,line,column,language,query,accepted,statement_kind\n\
         acme/api,src/db.rs,1,17,rust,DELETE FROM sessions WHERE expired,true,DELETE\n\
         acme/shop,app/db.py,1,13,python,SELECT * FROM orders WHERE id = %s,true,SELECT\n"
    );
}

#[tokio::test]
async fn test_missing_dump_is_an_error() {
    let root = scratch("nodump");
    let mut opts = options(&root);
    opts.input = ScanInput::Dump(root.join("absent.jsonl.gz"));
    let err = scan(opts, CancelToken::new()).await.unwrap_err();
    assert!(err.to_string().contains("cannot open dump"));
}

//! Fixture-based rewrite/restore coverage, grounded on the upstream
//! project's own before/after test fixtures: a function whose body
//! mixes `if`/`for`/closures around marker calls, rewritten and then
//! restored.

use std::io::Write;

fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

const FIXTURE: &str = r#"
use failpoint::{Inject, InjectContext, Label};

fn process(items: &[i32]) -> i32 {
    let mut total = 0;

    Label("scan");
    for item in items {
        if *item < 0 {
            Inject("marker/negative", |val| {
                if let Some(v) = val {
                    println!("negative override: {:?}", v);
                }
            });
            failpoint::r#continue("scan");
        }

        InjectContext("marker/ctx", None, |_| {
            total += 1;
        });

        total += item;
    }

    total
}
"#;

#[test]
fn fixture_rewrites_and_restores_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "process.rs", FIXTURE);

    assert!(failpoint_rewriter::rewrite_file(&path).unwrap());
    let rewritten = std::fs::read_to_string(&path).unwrap();

    assert!(rewritten.contains("'scan_FP"));
    assert!(rewritten.contains("continue 'scan_FP"));
    assert!(rewritten.contains("failpoint::eval(&crate::_curpkg_(\"marker/negative\"))"));
    assert!(rewritten.contains("failpoint::eval_context(&crate::_curpkg_(\"marker/ctx\"))"));
    assert!(!rewritten.contains("with_hook"));

    let restored = failpoint_rewriter::restore_dir(dir.path()).unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), FIXTURE);
}

#[test]
fn unrewritten_file_has_nothing_to_restore() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir, "plain.rs", "fn f() -> i32 { 1 }\n");
    assert!(failpoint_rewriter::restore_dir(dir.path()).unwrap().is_empty());
}

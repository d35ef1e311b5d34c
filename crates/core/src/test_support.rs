//! Test doubles shared by the unit tests in this crate.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Stand-in for the extraction tool. Behaviour is picked by the file name
/// of the dataset argument.
const FAKE_TOOL: &str = r#"#!/bin/sh
mode=$(basename "$2")
case "$1" in
query)
  [ "$3" = timestamp ] || exit 9
  echo x >> "$2.queries"
  case "$mode" in
    broken) exit 1 ;;
    garbage) echo yesterday ;;
    stale) echo 2001-01-01T00:00:00Z ;;
    fixed) echo 2026-10-19T08:30:00Z ;;
    flaky) [ -e "$2.down" ] && exit 1; echo 2026-10-19T08:30:00Z ;;
    *) date -u +%Y-%m-%dT%H:%M:%SZ ;;
  esac
  ;;
extract)
  [ "$4" = --jsonOutput ] && [ "$5" = --region ] || exit 9
  case "$mode" in
    fail) echo '{"CellsTotal":2,"CellsProg":1}'; exit 3 ;;
    garbage) echo 'working...'; sleep 5; exit 0 ;;
  esac
  echo '{"CellsTotal":2,"CellsProg":1}'
  echo ''
  echo '{"CellsTotal":2,"CellsProg":2}'
  cat "$6" > "$3"
  ;;
*) exit 9 ;;
esac
"#;

/// Path to the fake tool, written once per test binary so no test thread
/// can fork while the script is still open for writing.
pub fn fake_tool() -> &'static Path {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("sliceosm-core-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create fake tool dir");
        let path = dir.join("osmx");
        std::fs::write(&path, FAKE_TOOL).expect("write fake tool");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("make fake tool executable");
        path
    })
}

/// Number of `query` invocations the fake tool has seen for `dataset`.
pub fn query_count(dataset: &Path) -> usize {
    let mut log = dataset.as_os_str().to_owned();
    log.push(".queries");
    std::fs::read_to_string(PathBuf::from(log))
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

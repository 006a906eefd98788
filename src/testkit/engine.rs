//! Fake execution engines.
//!
//! Each fake is a `/bin/sh` script speaking the engine line protocol,
//! written into a caller-owned directory (usually a `tempfile::TempDir`).

use std::path::{Path, PathBuf};

use super::domain::SIGNATURE;

/// Answers every submission with `pending` then `confirmed`.
pub fn confirming() -> String {
    format!(
        r#"echo '{{"type":"status","status":"ready"}}'
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
  [ -z "$id" ] && continue
  echo "{{\"type\":\"transaction_update\",\"id\":\"$id\",\"status\":\"pending\"}}"
  echo "{{\"type\":\"transaction_update\",\"id\":\"$id\",\"status\":\"confirmed\",\"signature\":\"{SIGNATURE}\"}}"
  echo "{{\"type\":\"transaction_update\",\"id\":\"$id\",\"status\":\"failed\",\"error\":\"late duplicate\"}}"
done
"#
    )
}

/// Rejects every submission with an `error` message.
pub fn rejecting(reason: &str) -> String {
    format!(
        r#"while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
  echo "{{\"type\":\"error\",\"id\":\"$id\",\"error\":\"{reason}\"}}"
done
"#
    )
}

/// Emits garbage and unknown messages, then confirms.
pub fn noisy() -> String {
    format!(
        r#"echo 'not json at all'
echo '{{"type":"mystery"}}'
echo 'engine warming up' >&2
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
  echo '{{"type":"transaction_update"'
  echo "{{\"type\":\"transaction_update\",\"id\":\"$id\",\"status\":\"finalized\",\"signature\":\"{SIGNATURE}\"}}"
done
"#
    )
}

/// Reads submissions and never answers.
pub fn silent() -> String {
    "while IFS= read -r line; do :; done\n".to_string()
}

/// Exits as soon as the first submission arrives.
pub fn crashing() -> String {
    "IFS= read -r line\nexit 3\n".to_string()
}

/// Ignores SIGTERM, so only a forced kill stops it.
pub fn stubborn() -> String {
    "trap '' TERM\nwhile :; do sleep 1; done\n".to_string()
}

/// Write `body` as an executable script named `engine` under `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("engine");
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write engine script");
    let mut perms = std::fs::metadata(&path).expect("stat engine").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod engine");
    path
}

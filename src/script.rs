//! Shell script generation for in-chroot execution.
//!
//! User commands are wrapped twice: an inner run script with environment
//! guards and fail-fast tracing, and an outer privilege wrapper that
//! synthesizes a matching user, drops privileges, and restores workspace
//! ownership afterwards.

use crate::error::{BurrowError, BurrowResult};
use crate::launch::HostUser;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

/// Shebang for every generated wrapper script.
pub const SHEBANG: &str = "#!/usr/bin/env bash\n";

/// Fail-fast and verbose-trace preamble shared by all generated scripts.
pub const STRICT_MODE: &str = "set -e\nset -x verbose\n";

/// Build the inner run script for user commands.
///
/// Environment guards come first, one conditional export per variable so a
/// value already set inside the chroot wins over the propagated host value.
/// Then strict mode, a `cd` into the workspace, and the commands verbatim.
pub fn run_script(workspace: &Path, commands: &str, env: &HashMap<String, String>) -> String {
    let mut script = String::new();
    // BTreeMap for a stable guard order; the guards are independent and
    // idempotent, so order only matters for readability.
    let sorted: BTreeMap<&String, &String> = env.iter().collect();
    for (key, value) in sorted {
        script.push_str(&format!(
            "if [ -z ${{{key}}} ]; then export {key}=\"{value}\"; fi;\n"
        ));
    }
    script.push_str(STRICT_MODE);
    script.push_str(&format!("cd {}\n", workspace.display()));
    script.push_str(commands);
    script.push('\n');
    script
}

/// Build the outer privilege wrapper around an already-written inner script.
///
/// Creates a group and user mirroring the invoking host user's numeric ids
/// (already-exists failures are tolerated), marks the inner script
/// executable, runs it via `sudo -i -u` as either the synthesized user or
/// root, then unconditionally chowns the workspace back and exits with the
/// inner script's status. The inner exit code is captured from `$?` before
/// any other command can overwrite it.
pub fn privilege_wrapper(
    inner: &Path,
    workspace: &Path,
    user: &HostUser,
    run_as_root: bool,
) -> String {
    let sudo_user = if run_as_root { "root" } else { &user.name };
    let create_group = format!("groupadd -g {} {} | :\n", user.gid, user.group);
    let create_user = format!("useradd {} -u {} -g {} -m | : \n", user.name, user.uid, user.gid);
    let run = format!(
        "chmod u+x {inner}\n ret=1; sudo -i -u {sudo_user} bash -- {inner}; \
         if [ $? -eq 0 ]; then ret=0; fi;cd {workspace}; chown {owner}:{group} ./ -R; exit $ret\n",
        inner = inner.display(),
        workspace = workspace.display(),
        owner = user.name,
        group = user.group,
    );
    format!("{SHEBANG}{create_group}{create_user}{run}")
}

/// A single-use generated script on disk.
///
/// The file carries a unique name so concurrent executions never collide,
/// and is removed when the value is dropped, covering success, failure and
/// error-propagation paths alike. A failed removal is logged and never
/// masks the primary result.
pub struct ScriptFile {
    path: PathBuf,
}

impl ScriptFile {
    /// Write `contents` to a fresh `chroot-<uuid>.sh` inside `dir`.
    pub async fn create(dir: &Path, contents: &str) -> BurrowResult<Self> {
        let path = dir.join(format!("chroot-{}.sh", Uuid::new_v4()));
        fs::write(&path, contents)
            .await
            .map_err(|e| BurrowError::io(format!("writing script {}", path.display()), e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScriptFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove script {}: {}", self.path.display(), e);
            }
        }
    }
}

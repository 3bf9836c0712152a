//! Build script synthesis
//!
//! Turns a validated [`Manifest`] into a two-stage build script: a `build`
//! stage that installs every dependency into `/root/.local`, and a runtime
//! stage that copies the installed tree onto a minimal base and runs the
//! project as an unprivileged user.
//!
//! Synthesis is a pure function of the manifest and the target architecture.
//! Every map is a `BTreeMap`, so the same input always yields byte-identical
//! text.

mod base;
mod build_stage;
mod runtime_stage;

pub use base::RuntimeBase;
pub use build_stage::{install_plan, InstallStep};

use crate::manifest::Manifest;
use std::collections::BTreeMap;
use tracing::debug;

pub const BUILD_STAGE: &str = "build";

pub const PIP_CACHE_MOUNT: &str = "--mount=type=cache,target=/root/.cache,sharing=locked";
pub const APT_CACHE_MOUNTS: &str = "--mount=type=cache,target=/var/cache/apt,sharing=locked --mount=type=cache,target=/var/lib/apt,sharing=locked";
pub const SSH_MOUNT: &str = "--mount=type=ssh";
pub const GIT_SSH_COMMAND: &str = r#"GIT_SSH_COMMAND="ssh -o StrictHostKeyChecking=no""#;
pub const GIT_LFS_PACKAGE: &str = "git-lfs";

pub const DEFAULT_BUILD_ENV: &[(&str, &str)] = &[
    ("PIP_DISABLE_PIP_VERSION_CHECK", "1"),
    ("PIP_NO_WARN_SCRIPT_LOCATION", "0"),
    ("PIP_USER", "1"),
    ("PYTHONPYCACHEPREFIX", "$HOME/.pycache"),
];

pub const DEFAULT_RUNTIME_ENV: &[(&str, &str)] = &[("PYTHONUNBUFFERED", "1")];

pub const RUNTIME_USER: &str = "nonroot";
pub const RUNTIME_UID: u32 = 65532;
pub const RUNTIME_HOME: &str = "/home/nonroot";

/// Where copied local dependencies are staged before `pip install`
pub const LOCAL_STAGING_DIR: &str = "/tmp/local-deps";
pub const REQUIREMENTS_MOUNT_TARGET: &str = "/tmp/requirements.txt";

/// Synthesizes the complete build script for one target architecture
pub fn synthesize(manifest: &Manifest, arch: &str) -> String {
    let mut writer = ScriptWriter::default();
    build_stage::write(&mut writer, manifest);
    writer.blank();
    let base = RuntimeBase::select(&manifest.python_version, arch);
    runtime_stage::write(&mut writer, manifest, &base);

    let script = writer.finish();
    debug!(
        arch,
        base = %base.image(&manifest.python_version),
        lines = script.lines().count(),
        "Synthesized build script"
    );
    script
}

/// Line-oriented script buffer
#[derive(Debug, Default)]
pub(crate) struct ScriptWriter {
    lines: Vec<String>,
}

impl ScriptWriter {
    pub fn instruction(&mut self, keyword: &str, args: impl AsRef<str>) {
        self.lines.push(format!("{} {}", keyword, args.as_ref()));
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn finish(self) -> String {
        let mut script = self.lines.join("\n");
        script.push('\n');
        script
    }
}

/// Overlays `overrides` onto `defaults` into a fresh map; overrides win
pub(crate) fn merge_env(
    defaults: &[(&str, &str)],
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    defaults
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .chain(overrides.iter().map(|(k, v)| (k.clone(), v.clone())))
        .collect()
}

/// `KEY=VALUE` pairs for ENV and LABEL, quoting values only where needed
pub(crate) fn key_value_args(pairs: &BTreeMap<String, String>, always_quote: bool) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            let value = if always_quote || needs_quoting(value) {
                quote(value)
            } else {
                value.clone()
            };
            format!("{}={}", quote_key(key), value)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == '\\')
}

fn quote_key(key: &str) -> String {
    if needs_quoting(key) || key.contains('=') {
        quote(key)
    } else {
        key.to_string()
    }
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Single-quotes a shell-form RUN argument unless it is made only of
/// characters the shell passes through untouched
pub(crate) fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+=,".contains(c));
    if safe {
        return token.to_string();
    }
    format!("'{}'", token.replace('\'', r"'\''"))
}

/// Exec-form JSON array, e.g. `["python3", "-u"]`
pub(crate) fn exec_form(args: &[&str]) -> String {
    let quoted: Vec<String> = args.iter().map(|arg| quote(arg)).collect();
    format!("[{}]", quoted.join(", "))
}

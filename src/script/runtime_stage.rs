use super::{
    exec_form, key_value_args, merge_env, RuntimeBase, ScriptWriter, BUILD_STAGE,
    DEFAULT_RUNTIME_ENV, RUNTIME_HOME, RUNTIME_UID, RUNTIME_USER,
};
use crate::manifest::Manifest;
use std::collections::BTreeMap;

pub const LABEL_VENDOR: &str = "org.opencontainers.image.vendor";
pub const LABEL_GENERATOR: &str = "io.pyfront.generator";
pub const LABEL_PYTHON_VERSION: &str = "io.pyfront.python.version";

const VENDOR: &str = "pyfront";
const GENERATOR: &str = concat!("pyfront/", env!("CARGO_PKG_VERSION"));

/// Name used under the runtime home when the project path has no usable basename
const FALLBACK_PROJECT_NAME: &str = "app";

pub(super) fn write(writer: &mut ScriptWriter, manifest: &Manifest, base: &RuntimeBase) {
    let owner = format!("{}:{}", RUNTIME_UID, RUNTIME_UID);

    writer.instruction("FROM", base.image(&manifest.python_version));
    if base.creates_user() {
        writer.instruction(
            "RUN",
            format!(
                "groupadd --gid {uid} {user} && useradd --uid {uid} --gid {uid} --home-dir {home} --create-home --shell /usr/sbin/nologin {user}",
                uid = RUNTIME_UID,
                user = RUNTIME_USER,
                home = RUNTIME_HOME
            ),
        );
        writer.instruction("USER", &owner);
    }

    writer.instruction("LABEL", key_value_args(&labels(manifest), true));
    writer.instruction(
        "ENV",
        key_value_args(&merge_env(DEFAULT_RUNTIME_ENV, &manifest.envs), false),
    );

    if manifest.has_pip_dependencies() {
        writer.instruction(
            "COPY",
            format!(
                "--from={} --chown={} /root/.local/ {}/.local/",
                BUILD_STAGE, owner, RUNTIME_HOME
            ),
        );
    }

    if let Some(project) = manifest.project.as_deref() {
        let name = project_name(project);
        let destination = format!("{}/{}", RUNTIME_HOME, name);

        writer.instruction(
            "COPY",
            format!("--chown={} {} {}", owner, project, destination),
        );
        writer.instruction("ENTRYPOINT", exec_form(&[base.interpreter(), "-u"]));

        if project.ends_with(".py") {
            writer.instruction("WORKDIR", RUNTIME_HOME);
            writer.instruction("CMD", exec_form(&[name.as_str()]));
        } else {
            writer.instruction("WORKDIR", &destination);
            writer.instruction("CMD", exec_form(&["main.py"]));
        }
    }
}

/// User labels overlaid with the provenance labels
fn labels(manifest: &Manifest) -> BTreeMap<String, String> {
    let mut labels = manifest.labels.clone();
    labels.insert(LABEL_VENDOR.to_string(), VENDOR.to_string());
    labels.insert(LABEL_GENERATOR.to_string(), GENERATOR.to_string());
    labels.insert(
        LABEL_PYTHON_VERSION.to_string(),
        manifest.python_version.clone(),
    );
    labels
}

fn project_name(project: &str) -> String {
    let trimmed = project.trim_end_matches('/');
    match trimmed.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name.to_string(),
        _ => FALLBACK_PROJECT_NAME.to_string(),
    }
}

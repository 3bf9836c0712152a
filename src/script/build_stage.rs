use super::{
    key_value_args, merge_env, shell_quote, ScriptWriter, APT_CACHE_MOUNTS, BUILD_STAGE,
    DEFAULT_BUILD_ENV, GIT_LFS_PACKAGE, GIT_SSH_COMMAND, LOCAL_STAGING_DIR, PIP_CACHE_MOUNT,
    REQUIREMENTS_MOUNT_TARGET, SSH_MOUNT,
};
use crate::dependency::{ClassifiedDependencies, DependencyKind};
use crate::manifest::Manifest;
use serde::Serialize;

const SBOM_SCAN_ARG: &str = "BUILDKIT_SBOM_SCAN_STAGE=true";

const APT_INSTALL: &str = "rm -f /etc/apt/apt.conf.d/docker-clean && apt-get update && apt-get install -y --no-install-recommends";

const CLEANUP: &[&str] = &[
    "find /root/.local/lib/python*/ -type d -name 'tests' -prune -exec rm -rf '{}' +",
    r#"find /root/.local/lib/python*/site-packages/ -name '*.so' -exec sh -c 'file "{}" | grep -q "not stripped" && strip -s "{}"' \;"#,
    "find /root/.local -type f -name '*.pyc' -delete",
    "find /root/.local -type d -name '__pycache__' -prune -exec rm -rf '{}' +",
];

/// One `pip install` invocation of the build stage, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "deps", rename_all = "kebab-case")]
pub enum InstallStep<'a> {
    /// All `git+ssh://` sources, with the SSH agent forwarded
    SshGit(Vec<&'a str>),
    /// PyPI entries followed by http(s) git sources
    External(Vec<&'a str>),
    LocalRequirements(&'a str),
    LocalDirectory(&'a str),
}

/// Orders the classified dependencies into install steps: ssh, external, then
/// each local path in manifest order
pub fn install_plan(deps: &ClassifiedDependencies) -> Vec<InstallStep<'_>> {
    let mut steps = Vec::new();

    if !deps.ssh_git.is_empty() {
        steps.push(InstallStep::SshGit(
            deps.ssh_git.iter().map(String::as_str).collect(),
        ));
    }

    let external = deps.external();
    if !external.is_empty() {
        steps.push(InstallStep::External(external));
    }

    for local in &deps.local {
        match DependencyKind::of(local) {
            DependencyKind::LocalRequirements => steps.push(InstallStep::LocalRequirements(local)),
            _ => steps.push(InstallStep::LocalDirectory(local)),
        }
    }

    steps
}

pub(super) fn write(writer: &mut ScriptWriter, manifest: &Manifest) {
    let deps = manifest.dependencies();

    writer.instruction(
        "FROM",
        format!("python:{} AS {}", manifest.python_version, BUILD_STAGE),
    );

    if manifest.sbom {
        writer.instruction("ARG", SBOM_SCAN_ARG);
    }

    let mut packages: Vec<String> = Vec::new();
    if deps.has_git() {
        packages.push(GIT_LFS_PACKAGE.to_string());
    }
    packages.extend(manifest.build_deps.iter().map(|dep| shell_quote(dep)));
    if !packages.is_empty() {
        writer.instruction(
            "RUN",
            format!("{} {} {}", APT_CACHE_MOUNTS, APT_INSTALL, packages.join(" ")),
        );
    }

    writer.instruction(
        "ENV",
        key_value_args(&merge_env(DEFAULT_BUILD_ENV, &manifest.envs), false),
    );

    let index_args = index_args(manifest);
    for step in install_plan(&deps) {
        write_step(writer, &step, &index_args);
    }

    if manifest.has_pip_dependencies() {
        writer.instruction("RUN", CLEANUP.join(" && "));
    }
}

fn write_step(writer: &mut ScriptWriter, step: &InstallStep<'_>, index_args: &str) {
    match step {
        InstallStep::SshGit(deps) => writer.instruction(
            "RUN",
            format!(
                "{} {} {} pip install{} {}",
                PIP_CACHE_MOUNT,
                SSH_MOUNT,
                GIT_SSH_COMMAND,
                index_args,
                quoted(deps)
            ),
        ),
        InstallStep::External(deps) => writer.instruction(
            "RUN",
            format!("{} pip install{} {}", PIP_CACHE_MOUNT, index_args, quoted(deps)),
        ),
        InstallStep::LocalRequirements(path) => writer.instruction(
            "RUN",
            format!(
                "{} --mount=type=bind,source={},target={} pip install{} -r {}",
                PIP_CACHE_MOUNT, path, REQUIREMENTS_MOUNT_TARGET, index_args, REQUIREMENTS_MOUNT_TARGET
            ),
        ),
        InstallStep::LocalDirectory(path) => {
            let source = path.trim_end_matches('/');
            let name = source.rsplit('/').next().unwrap_or(source);
            let target = format!("{}/{}/", LOCAL_STAGING_DIR, name);

            writer.instruction("COPY", format!("{}/ {}", source, target));
            writer.instruction(
                "RUN",
                format!(
                    "{} pip install{} {}",
                    PIP_CACHE_MOUNT,
                    index_args,
                    shell_quote(&target)
                ),
            );
        }
    }
}

fn quoted(deps: &[&str]) -> String {
    deps.iter()
        .map(|dep| shell_quote(dep))
        .collect::<Vec<_>>()
        .join(" ")
}

/// pip index flags with a leading space, empty without indices
fn index_args(manifest: &Manifest) -> String {
    let mut args = String::new();

    for (i, index) in manifest.indices.iter().enumerate() {
        let flag = if i == 0 {
            "--index-url"
        } else {
            "--extra-index-url"
        };
        args.push_str(&format!(" {} {}", flag, shell_quote(&index.authenticated_url())));
    }

    for index in manifest.indices.iter().filter(|index| index.trust) {
        if let Some(host) = index.host() {
            args.push_str(&format!(" --trusted-host {}", shell_quote(&host)));
        }
    }

    args
}

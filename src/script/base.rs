use serde::Serialize;

pub const DISTROLESS_IMAGE: &str = "gcr.io/distroless/python3:nonroot@sha256:a5d8ca63eee13112d706645099d875c9ac8c7829c78ba2b2afca9045ca761f1c";

/// Python release shipped inside the distroless image
pub const DISTROLESS_PYTHON: &str = "3.9";

/// Architectures the pinned distroless digest is published for
pub const DISTROLESS_ARCHITECTURES: &[&str] = &["amd64", "arm64"];

/// Base image of the runtime stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuntimeBase {
    /// Pinned distroless image; ships its own `nonroot` user
    Distroless,
    /// `python:<version>-slim` with a user created at build time
    Slim,
}

impl RuntimeBase {
    pub fn select(python_version: &str, arch: &str) -> Self {
        if major_minor(python_version) == DISTROLESS_PYTHON
            && DISTROLESS_ARCHITECTURES.contains(&arch)
        {
            RuntimeBase::Distroless
        } else {
            RuntimeBase::Slim
        }
    }

    pub fn image(&self, python_version: &str) -> String {
        match self {
            RuntimeBase::Distroless => DISTROLESS_IMAGE.to_string(),
            RuntimeBase::Slim => format!("python:{}-slim", python_version),
        }
    }

    pub fn interpreter(&self) -> &'static str {
        match self {
            RuntimeBase::Distroless => "python3",
            RuntimeBase::Slim => "python",
        }
    }

    /// Whether the runtime user has to be created in the script
    pub fn creates_user(&self) -> bool {
        matches!(self, RuntimeBase::Slim)
    }
}

fn major_minor(version: &str) -> String {
    version.splitn(3, '.').take(2).collect::<Vec<_>>().join(".")
}

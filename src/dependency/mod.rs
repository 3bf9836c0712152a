//! Dependency classification
//!
//! Every pip entry falls into exactly one install strategy, decided by prefix
//! with priority ssh > http(s) > local > PyPI. The classification is derived
//! from the manifest each time it is asked for and never stored.

mod mask;

pub use mask::masked;

use serde::Serialize;

pub const SSH_GIT_PREFIX: &str = "git+ssh://";
pub const HTTP_GIT_PREFIXES: [&str; 2] = ["git+http://", "git+https://"];
pub const LOCAL_PREFIX: &str = "./";
pub const REQUIREMENTS_SUFFIX: &str = "/requirements.txt";

/// Install strategy for a single pip entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// Resolved from a package index
    PyPi,
    /// `git+http://` or `git+https://` source
    HttpGit,
    /// `git+ssh://` source, needs the forwarded SSH agent
    SshGit,
    /// `./path/requirements.txt`, installed from a bind mount
    LocalRequirements,
    /// Any other `./path`, copied into the build stage first
    LocalDirectory,
}

impl DependencyKind {
    pub fn of(entry: &str) -> Self {
        if entry.starts_with(SSH_GIT_PREFIX) {
            DependencyKind::SshGit
        } else if HTTP_GIT_PREFIXES.iter().any(|p| entry.starts_with(p)) {
            DependencyKind::HttpGit
        } else if entry.starts_with(LOCAL_PREFIX) {
            if entry.ends_with(REQUIREMENTS_SUFFIX) {
                DependencyKind::LocalRequirements
            } else {
                DependencyKind::LocalDirectory
            }
        } else {
            DependencyKind::PyPi
        }
    }

    pub fn is_git(self) -> bool {
        matches!(self, DependencyKind::HttpGit | DependencyKind::SshGit)
    }

    pub fn is_local(self) -> bool {
        matches!(
            self,
            DependencyKind::LocalRequirements | DependencyKind::LocalDirectory
        )
    }
}

/// pip entries partitioned by install strategy, each list in manifest order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedDependencies {
    pub pypi: Vec<String>,
    /// Deduplicated, first occurrence wins
    pub http_git: Vec<String>,
    pub ssh_git: Vec<String>,
    pub local: Vec<String>,
}

impl ClassifiedDependencies {
    pub fn classify(entries: &[String]) -> Self {
        let mut classified = Self::default();

        for entry in entries {
            match DependencyKind::of(entry) {
                DependencyKind::SshGit => classified.ssh_git.push(entry.clone()),
                DependencyKind::HttpGit => {
                    if !classified.http_git.contains(entry) {
                        classified.http_git.push(entry.clone());
                    }
                }
                DependencyKind::LocalRequirements | DependencyKind::LocalDirectory => {
                    classified.local.push(entry.clone())
                }
                DependencyKind::PyPi => classified.pypi.push(entry.clone()),
            }
        }

        classified
    }

    /// True when git sources are present and the build stage needs git-lfs
    pub fn has_git(&self) -> bool {
        !self.http_git.is_empty() || !self.ssh_git.is_empty()
    }

    /// Dependencies fetched from indices or over http(s), PyPI entries first
    pub fn external(&self) -> Vec<&str> {
        self.pypi
            .iter()
            .chain(self.http_git.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pypi.is_empty()
            && self.http_git.is_empty()
            && self.ssh_git.is_empty()
            && self.local.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pypi.len() + self.http_git.len() + self.ssh_git.len() + self.local.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kind_priority() {
        assert_eq!(DependencyKind::of("git+ssh://git@host/repo.git"), DependencyKind::SshGit);
        assert_eq!(DependencyKind::of("git+http://host/repo.git"), DependencyKind::HttpGit);
        assert_eq!(DependencyKind::of("git+https://host/repo.git"), DependencyKind::HttpGit);
        assert_eq!(DependencyKind::of("./libs/core"), DependencyKind::LocalDirectory);
        assert_eq!(
            DependencyKind::of("./requirements/requirements.txt"),
            DependencyKind::LocalRequirements
        );
        assert_eq!(DependencyKind::of("requests==2.31.0"), DependencyKind::PyPi);
        assert_eq!(DependencyKind::of("https://host/pkg.whl"), DependencyKind::PyPi);
    }

    #[test]
    fn test_requirements_suffix_needs_directory() {
        // the "./" prefix supplies the separator for a file at the context root
        assert_eq!(DependencyKind::of("./requirements.txt"), DependencyKind::LocalRequirements);
        assert_eq!(
            DependencyKind::of("./my-requirements.txt"),
            DependencyKind::LocalDirectory
        );
    }

    #[test]
    fn test_classify_example() {
        let classified =
            ClassifiedDependencies::classify(&deps(&["requests", "git+ssh://x/y.git", "./localpkg"]));

        assert_eq!(classified.pypi, vec!["requests"]);
        assert_eq!(classified.ssh_git, vec!["git+ssh://x/y.git"]);
        assert_eq!(classified.local, vec!["./localpkg"]);
        assert!(classified.http_git.is_empty());
        assert!(classified.has_git());
    }

    #[test]
    fn test_http_git_is_deduplicated_in_first_seen_order() {
        let classified = ClassifiedDependencies::classify(&deps(&[
            "git+https://host/b.git",
            "git+http://host/a.git",
            "git+https://host/b.git",
            "flask",
        ]));

        assert_eq!(
            classified.http_git,
            vec!["git+https://host/b.git", "git+http://host/a.git"]
        );
        assert_eq!(classified.external(), vec!["flask", "git+https://host/b.git", "git+http://host/a.git"]);
    }

    #[test]
    fn test_partition_covers_every_entry() {
        let input = deps(&[
            "numpy",
            "./vendor/a",
            "git+ssh://git@host/s.git",
            "git+https://host/h.git",
            "./reqs/requirements.txt",
            "pandas>=2",
            "git+https://host/h.git",
        ]);
        let classified = ClassifiedDependencies::classify(&input);

        let mut union: Vec<&String> = classified
            .pypi
            .iter()
            .chain(&classified.http_git)
            .chain(&classified.ssh_git)
            .chain(&classified.local)
            .collect();
        union.sort();
        union.dedup();

        let mut expected: Vec<&String> = input.iter().collect();
        expected.sort();
        expected.dedup();

        assert_eq!(union, expected);
        assert_eq!(classified.len(), input.len() - 1);
    }

    #[test]
    fn test_empty_input() {
        let classified = ClassifiedDependencies::classify(&[]);
        assert!(classified.is_empty());
        assert!(!classified.has_git());
        assert!(classified.external().is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        // small name pools so duplicates show up often
        fn arb_entry() -> impl Strategy<Value = String> {
            prop_oneof![
                (0..4u8).prop_map(|i| format!("pkg{}>=1.{}", i, i)),
                (0..3u8).prop_map(|i| format!("git+https://host/h{}.git", i)),
                (0..3u8).prop_map(|i| format!("git+http://host/p{}.git", i)),
                (0..3u8).prop_map(|i| format!("git+ssh://git@host/s{}.git", i)),
                (0..3u8).prop_map(|i| format!("./vendor/lib{}", i)),
                (0..3u8).prop_map(|i| format!("./reqs{}/requirements.txt", i)),
            ]
        }

        fn of_kind(entries: &[String], keep: impl Fn(DependencyKind) -> bool) -> Vec<String> {
            entries
                .iter()
                .filter(|e| keep(DependencyKind::of(e)))
                .cloned()
                .collect()
        }

        proptest! {
            #[test]
            fn classify_partitions_exactly(entries in prop::collection::vec(arb_entry(), 0..24)) {
                let classified = ClassifiedDependencies::classify(&entries);

                prop_assert_eq!(&classified.pypi, &of_kind(&entries, |k| k == DependencyKind::PyPi));
                prop_assert_eq!(&classified.ssh_git, &of_kind(&entries, |k| k == DependencyKind::SshGit));
                prop_assert_eq!(&classified.local, &of_kind(&entries, DependencyKind::is_local));

                let mut seen = HashSet::new();
                let http: Vec<String> = of_kind(&entries, |k| k == DependencyKind::HttpGit)
                    .into_iter()
                    .filter(|e| seen.insert(e.clone()))
                    .collect();
                prop_assert_eq!(&classified.http_git, &http);

                let duplicates = entries.iter().filter(|e| DependencyKind::of(e) == DependencyKind::HttpGit).count() - http.len();
                prop_assert_eq!(classified.len(), entries.len() - duplicates);
                prop_assert_eq!(classified.is_empty(), entries.is_empty());
            }

            #[test]
            fn external_keeps_pypi_order_before_http_git(entries in prop::collection::vec(arb_entry(), 0..24)) {
                let classified = ClassifiedDependencies::classify(&entries);
                let external = classified.external();

                prop_assert_eq!(external.len(), classified.pypi.len() + classified.http_git.len());
                let (pypi, http) = external.split_at(classified.pypi.len());
                prop_assert!(pypi.iter().zip(&classified.pypi).all(|(a, b)| *a == b.as_str()));
                prop_assert!(http.iter().all(|e| DependencyKind::of(e) == DependencyKind::HttpGit));
                prop_assert_eq!(classified.has_git(), entries.iter().any(|e| DependencyKind::of(e).is_git()));
            }
        }
    }
}

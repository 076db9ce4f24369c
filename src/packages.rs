//! Workspace package discovery, used to find snapshot versions.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use log::debug;
use serde::Deserialize;

/// Marker that the bump tool puts in snapshot versions.
pub const SNAPSHOT_VERSION_MARKER: &str = "snapshot-release";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
}

impl Package {
    pub fn is_snapshot(&self) -> bool {
        self.version.contains(SNAPSHOT_VERSION_MARKER)
    }

    pub fn versioned_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
    workspaces: Option<Workspaces>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Workspaces {
    Globs(Vec<String>),
    Config { packages: Vec<String> },
}

impl Workspaces {
    fn globs(&self) -> &[String] {
        match self {
            Self::Globs(globs) => globs,
            Self::Config { packages } => packages,
        }
    }
}

fn read_package_json(path: &Path) -> Result<PackageJson> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// All packages of the workspace rooted at `root`.
///
/// With `workspaces` globs in the root manifest, those packages (sorted by
/// directory); without, the root package alone. A glob starting with `!`
/// excludes the directories it matches. Manifests without a name or version
/// are skipped.
pub fn find_packages(root: &Path) -> Result<Vec<Package>> {
    let root_manifest = read_package_json(&root.join("package.json"))?;

    let Some(workspaces) = &root_manifest.workspaces else {
        return Ok(into_package(root_manifest).into_iter().collect());
    };

    let (negated, globs): (Vec<_>, Vec<_>) = workspaces
        .globs()
        .iter()
        .partition(|pattern| pattern.starts_with('!'));
    let excluded = negated
        .iter()
        .map(|pattern| {
            let full_pattern = root.join(&pattern[1..]);
            glob::Pattern::new(&full_pattern.to_string_lossy())
                .with_context(|| format!("Invalid workspace glob: {}", pattern))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut dirs: Vec<PathBuf> = Vec::new();
    for pattern in globs {
        let full_pattern = root.join(pattern).join("package.json");
        let full_pattern = full_pattern.to_string_lossy();
        for entry in glob::glob(&full_pattern)
            .with_context(|| format!("Invalid workspace glob: {}", pattern))?
        {
            let manifest = entry.context("Failed to read workspace directory")?;
            if let Some(dir) = manifest.parent() {
                dirs.push(dir.to_path_buf());
            }
        }
    }
    dirs.retain(|dir| !excluded.iter().any(|pattern| pattern.matches_path(dir)));
    dirs.sort();
    dirs.dedup();

    let mut packages = Vec::new();
    for dir in dirs {
        let manifest = read_package_json(&dir.join("package.json"))?;
        match into_package(manifest) {
            Some(package) => packages.push(package),
            None => debug!("skipping {}: no name or version", dir.display()),
        }
    }
    Ok(packages)
}

fn into_package(manifest: PackageJson) -> Option<Package> {
    Some(Package {
        name: manifest.name?,
        version: manifest.version?,
    })
}

/// `name@version` of every package whose version is a snapshot.
pub fn snapshot_releases(root: &Path) -> Result<Vec<String>> {
    Ok(find_packages(root)?
        .iter()
        .filter(|package| package.is_snapshot())
        .map(Package::versioned_name)
        .collect())
}

//! cargo test --test workspace -- --nocapture

mod utils;

use snapit::App;
use snapit::Config;
use snapit::classify::PathFilter;
use snapit::classify::classify;
use snapit::clients::git::GitClient;
use snapit::clients::git::GitOps as _;
use snapit::clients::github::GithubClient;
use snapit::workspace::ChangeKind;
use snapit::workspace::read_changes;
use tracing::instrument;

#[ctor::ctor]
fn init() {
    // Disable colors for all integration tests to get clean output
    colored::control::set_override(false);
    utils::setup_logging().unwrap();
}

/// A released workspace, then the edits `changeset version` makes.
#[instrument(skip_all)]
async fn setup(dir: &std::path::Path) -> anyhow::Result<()> {
    utils::create_git_repo(dir).await?;
    utils::commit_files(
        dir,
        "Initial commit",
        &[
            ("package.json", r#"{"private":true,"workspaces":["packages/*"]}"#),
            ("packages/widgets/package.json", r#"{"name":"@acme/widgets","version":"1.0.0"}"#),
            ("packages/widgets/CHANGELOG.md", "# @acme/widgets\n\n## 1.0.0\n\n- Initial release\n"),
            ("packages/widgets/src/index.ts", "export {}\n"),
            (".changeset/brave-dogs-sing.md", "---\n\"@acme/widgets\": minor\n---\n\nCompact\n"),
        ],
    )
    .await?;

    utils::write_file(
        dir,
        "packages/widgets/package.json",
        r#"{"name":"@acme/widgets","version":"0.0.0-snapshot-release-20240101"}"#,
    )
    .await?;
    utils::write_file(
        dir,
        "packages/widgets/CHANGELOG.md",
        "# @acme/widgets\n\n## 0.0.0-snapshot-release-20240101\n\n- Compact\n\n## 1.0.0\n\n- Initial release\n",
    )
    .await?;
    utils::write_file(dir, "packages/widgets/src/index.ts", "export const x = 1\n").await?;
    utils::write_file(dir, ".changeset/pre/mode.json", "{}\n").await?;
    tokio::fs::remove_file(dir.join(".changeset/brave-dogs-sing.md")).await?;
    Ok(())
}

#[tokio::test]
async fn test_real_worktree_is_classified() -> anyhow::Result<()> {
    let test_dir = utils::TestDir::new()?;
    let dir = test_dir.path();
    setup(dir).await?;

    let git = GitClient::open(dir).await?;
    let records = read_changes(&git).await?;
    let changes = classify(&records, &PathFilter::default())?;

    let mut upserts: Vec<_> = changes.to_upsert.iter().map(|r| r.path.as_str()).collect();
    upserts.sort();
    assert_eq!(
        upserts,
        vec![
            ".changeset/pre/mode.json",
            "packages/widgets/CHANGELOG.md",
            "packages/widgets/package.json",
        ]
    );
    assert_eq!(changes.to_delete.len(), 1);
    assert_eq!(changes.to_delete[0].path, ".changeset/brave-dogs-sing.md");
    assert_eq!(changes.to_delete[0].kind, ChangeKind::Deleted);

    let untracked = records
        .iter()
        .find(|r| r.path == ".changeset/pre/mode.json")
        .map(|r| r.kind);
    assert_eq!(untracked, Some(ChangeKind::Untracked));

    let contents = git.read_worktree_file("packages/widgets/package.json").await?;
    assert!(String::from_utf8(contents)?.contains("snapshot-release"));
    Ok(())
}

#[tokio::test]
async fn test_subdirectory_path_reads_from_repository_root() -> anyhow::Result<()> {
    let test_dir = utils::TestDir::new()?;
    let dir = test_dir.path();
    setup(dir).await?;

    let git = GitClient::open(&dir.join("packages/widgets")).await?;
    assert_eq!(git.root().canonicalize()?, dir.canonicalize()?);

    let records = read_changes(&git).await?;
    assert!(records.iter().any(|r| r.path == ".changeset/brave-dogs-sing.md"));

    let contents = git.read_worktree_file("packages/widgets/package.json").await?;
    assert!(String::from_utf8(contents)?.contains("snapshot-release"));

    let config = Config::default_for_tests();
    let github = GithubClient::new(
        None,
        config.api_url.clone(),
        config.owner.clone(),
        config.repo.clone(),
    );
    let app = App::new(config, git, github.clone(), github);
    let changes = app.collect_changes(&PathFilter::default()).await?;
    let upserts = app.read_contents(&changes).await?;
    assert!(
        upserts
            .iter()
            .any(|c| c.path == "packages/widgets/CHANGELOG.md" && c.contents.contains("- Compact"))
    );
    Ok(())
}

#[tokio::test]
async fn test_status_and_check_snapshots() -> anyhow::Result<()> {
    let test_dir = utils::TestDir::new()?;
    let dir = test_dir.path();
    setup(dir).await?;

    // No remote calls are made, so no token is needed
    let config = Config::default_for_tests();
    let github = GithubClient::new(
        None,
        config.api_url.clone(),
        config.owner.clone(),
        config.repo.clone(),
    );
    let app = App::new(config, GitClient::open(dir).await?, github.clone(), github);

    let mut stdout = Vec::new();
    app.cmd_status(&mut stdout).await?;
    let status = String::from_utf8(stdout)?;
    assert!(status.contains("+ packages/widgets/package.json\n"));
    assert!(status.contains("- .changeset/brave-dogs-sing.md\n"));
    assert!(!status.contains("src/index.ts"));

    let mut stdout = Vec::new();
    app.cmd_check_snapshots(dir, &mut stdout)?;
    assert!(
        String::from_utf8(stdout)?
            .starts_with("SNAPSHOT_RELEASES=[\"@acme/widgets@0.0.0-snapshot-release-20240101\"]\n")
    );
    Ok(())
}

#[tokio::test]
async fn test_config_from_git_config() -> anyhow::Result<()> {
    let test_dir = utils::TestDir::new()?;
    let dir = test_dir.path();
    utils::create_git_repo(dir).await?;
    utils::git(dir, &["remote", "add", "origin", "git@github.com:acme/widgets.git"]).await?;
    utils::git(dir, &["config", "--add", "snapit.pattern", r"Cargo\.toml$"]).await?;
    utils::git(dir, &["config", "--add", "snapit.pattern", r"CHANGELOG\.md$"]).await?;
    utils::git(dir, &["config", "snapit.blobConcurrency", "4"]).await?;

    let config = Config::load(dir)?;
    assert_eq!(
        config.version_file_patterns,
        vec![r"Cargo\.toml$".to_string(), r"CHANGELOG\.md$".to_string()]
    );
    assert_eq!(config.blob_concurrency, 4);
    assert_eq!(config.blob_retries, 3);

    let filter = config.path_filter()?;
    assert!(filter.matches("crates/core/Cargo.toml"));
    assert!(!filter.matches("package.json"));
    Ok(())
}

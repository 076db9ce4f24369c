use anyhow::Result;

use crate::App;
use crate::clients::github::PullRequestOps;

impl<G, S, P: PullRequestOps> App<G, S, P> {
    pub async fn cmd_comment(
        &self,
        pr_number: u64,
        message: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        self.prs.create_comment(pr_number, message).await?;
        writeln!(stdout, "Commented on PR #{}", pr_number)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::App;
    use crate::Config;
    use crate::clients::git::MockGitOps;
    use crate::clients::github::MockPullRequestOps;
    use crate::clients::memory::MemoryStore;

    #[tokio::test]
    async fn test_cmd_comment() {
        let mut mock_prs = MockPullRequestOps::new();
        mock_prs
            .expect_create_comment()
            .withf(|number, body| *number == 12 && body.starts_with("Snapshot published"))
            .times(1)
            .returning(|_, _| Ok(()));

        let app = App::new(
            Config::default_for_tests(),
            MockGitOps::new(),
            MemoryStore::new(),
            mock_prs,
        );

        let mut stdout = Vec::new();
        app.cmd_comment(12, "Snapshot published: `@acme/widgets@0.0.0-snapshot-release`", &mut stdout)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(stdout).unwrap(), "Commented on PR #12\n");
    }

    #[tokio::test]
    async fn test_cmd_comment_failure_is_reported() {
        let mut mock_prs = MockPullRequestOps::new();
        mock_prs
            .expect_create_comment()
            .returning(|_, _| Err(anyhow::anyhow!("GitHub API error: 403 - Resource not accessible")));

        let app = App::new(
            Config::default_for_tests(),
            MockGitOps::new(),
            MemoryStore::new(),
            mock_prs,
        );

        let mut stdout = Vec::new();
        let err = app.cmd_comment(12, "hi", &mut stdout).await.unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(stdout.is_empty());
    }
}

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;

/// Step outputs for the calling workflow.
///
/// Every output is echoed as `NAME=value` and, when the runner provides an
/// output file, appended to it.
pub struct StepOutputs {
    file: Option<PathBuf>,
}

impl StepOutputs {
    /// Outputs going to the file named by `GITHUB_OUTPUT`, if set.
    pub fn from_env() -> Self {
        Self {
            file: std::env::var_os("GITHUB_OUTPUT")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    pub fn set(&self, name: &str, value: &str, stdout: &mut impl std::io::Write) -> Result<()> {
        // A newline in the value would start a new output
        let value = value.replace('\n', " ");
        writeln!(stdout, "{}={}", name, value)?;

        if let Some(path) = &self.file {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open output file {}", path.display()))?;
            writeln!(file, "{}={}", name, value)?;
        }

        Ok(())
    }
}

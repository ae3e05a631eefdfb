use clap::Parser;
use std::path::PathBuf;

use labhost_core::{HostError, HostResult, DEFAULT_TEST_SUITE};

use super::Console;

/// Destination token that resolves to the test-suite install directory.
const SUITE_DIR_TOKEN: &str = "{suite_dir}";

/// Copy a file.
#[derive(Parser, Debug)]
#[command(name = "copy", disable_help_flag = true)]
pub struct CopyArgs {
    pub src: PathBuf,

    /// Destination path; `{suite_dir}` resolves to the directory of the
    /// fetched test suite.
    pub dst: String,
}

pub async fn run(console: &Console, args: CopyArgs) -> HostResult<()> {
    let dst = if args.dst == SUITE_DIR_TOKEN {
        let suite = console.state.test_suite(DEFAULT_TEST_SUITE).ok_or_else(|| {
            HostError::NotFound(format!(
                "test suite {} has not been fetched",
                DEFAULT_TEST_SUITE
            ))
        })?;
        suite
            .parent()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| HostError::Internal("suite path has no parent".to_string()))?
    } else if args.dst.contains('{') {
        return Err(HostError::Argument(format!("unknown destination {}", args.dst)));
    } else {
        PathBuf::from(&args.dst)
    };

    // copying into a directory keeps the source file name
    let dst = if dst.is_dir() {
        match args.src.file_name() {
            Some(name) => dst.join(name),
            None => dst,
        }
    } else {
        dst
    };

    tokio::fs::copy(&args.src, &dst).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::commands::parse;

    #[test]
    fn test_parse_copy() {
        let args: CopyArgs = parse("copy", &["/tmp/a.txt", "/srv/b.txt"]).unwrap();
        assert_eq!(args.src, PathBuf::from("/tmp/a.txt"));
        assert_eq!(args.dst, "/srv/b.txt");
    }

    #[test]
    fn test_both_paths_required() {
        assert!(parse::<CopyArgs>("copy", &["/tmp/a.txt"]).is_err());
    }
}

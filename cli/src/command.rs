use clap::Args;
use fb2merge::errors::MergeError;
use fb2merge::{MergeOptions, Merger, ValidationOutcome};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

pub type CommandResult<T> = Result<T, CommandError>;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("Invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

#[derive(Debug, Args)]
pub struct MergeCommand {
    /// Output path; `.fb2` (or `.fb2.zip`) is appended when missing
    #[arg(short, long)]
    pub output: PathBuf,

    /// Title of the merged book
    #[arg(short, long)]
    pub title: String,

    /// Save the book as a zip archive
    #[arg(short, long)]
    pub zip: bool,

    /// Save the book even if it fails validation
    #[arg(long)]
    pub force: bool,

    /// Skip source books that fail validation
    #[arg(long)]
    pub validate_sources: bool,

    /// Nickname recorded in the document info (defaults to $USER or $USERNAME)
    #[arg(long)]
    pub user: Option<String>,

    /// Source books (`.fb2`, `.fbz`, `.fb2.zip`) or glob patterns, merged in order
    #[arg(required = true)]
    pub inputs: Vec<String>,
}

impl MergeCommand {
    pub fn merge(&self) -> CommandResult<ExitCode> {
        let options = self.options();
        let mut merger = Merger::new(self.title.as_str(), options.clone());

        for path in self.expand_inputs()? {
            merger.add_file(path)?;
        }

        let (book, outcome) = merger.finish();

        if let ValidationOutcome::Invalid(issues) = &outcome {
            for issue in issues {
                error!("{issue}");
            }
            if !self.force {
                error!("The merged book is invalid; nothing was saved (use --force to save anyway)");
                return Ok(ExitCode::FAILURE);
            }
            warn!("Saving an invalid book");
        }

        let path = book.save(&self.output, &options)?;
        info!("Saved {}", path.display());
        Ok(ExitCode::SUCCESS)
    }

    pub fn options(&self) -> MergeOptions {
        let mut options = MergeOptions::default();

        if let Some(user) = self.resolve_user() {
            options.user(user);
        }
        options
            .zip(self.zip)
            .validate_sources(self.validate_sources);
        options
    }

    fn resolve_user(&self) -> Option<String> {
        self.user.clone().or_else(|| {
            ["USER", "USERNAME"]
                .into_iter()
                .find_map(|name| std::env::var(name).ok().filter(|user| !user.is_empty()))
        })
    }

    /// Expands each input pattern, keeping the order of the patterns.
    ///
    /// Matches that are not files are skipped.
    pub fn expand_inputs(&self) -> CommandResult<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for pattern in &self.inputs {
            let mut matched = false;

            for entry in glob::glob(pattern)? {
                match entry {
                    Ok(path) if path.is_file() => {
                        matched = true;
                        paths.push(path);
                    }
                    Ok(path) => info!("Skipping {}: not a file", path.display()),
                    Err(error) => warn!("Skipping {}: {}", error.path().display(), error.error()),
                }
            }
            if !matched {
                info!("No files match {pattern}");
            }
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_args() {
        let cli = Cli::parse_from([
            "fb2merge", "-o", "out", "-t", "Omnibus", "-z", "-v", "--user", "reader", "a.fb2", "b/*.fbz",
        ]);

        assert!(cli.verbose);
        assert!(cli.merge.zip);
        assert!(!cli.merge.force);
        assert_eq!(PathBuf::from("out"), cli.merge.output);
        assert_eq!("Omnibus", cli.merge.title);
        assert_eq!(vec!["a.fb2", "b/*.fbz"], cli.merge.inputs);
        assert!(!cli.merge.validate_sources);
        assert!(cli.merge.options().is_zip());
        assert!(!cli.merge.options().is_validating_sources());
    }

    #[test]
    fn test_parse_validate_sources() {
        let cli = Cli::parse_from(["fb2merge", "-o", "out", "-t", "Omnibus", "--validate-sources", "a.fb2"]);

        assert!(cli.merge.validate_sources);
        assert!(cli.merge.options().is_validating_sources());
        assert!(!cli.merge.options().is_zip());
    }

    #[test]
    fn test_missing_required_args() {
        #[rustfmt::skip]
        let args: [&[&str]; 3] = [
            &["fb2merge", "-t", "Omnibus", "a.fb2"],
            &["fb2merge", "-o", "out", "a.fb2"],
            &["fb2merge", "-o", "out", "-t", "Omnibus"],
        ];

        for args in args {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn test_expand_inputs_keeps_pattern_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["b.fb2", "a.fb2", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let dir_str = dir.path().display().to_string();
        let cli = Cli::parse_from([
            "fb2merge".to_owned(),
            "-o".to_owned(),
            "out".to_owned(),
            "-t".to_owned(),
            "T".to_owned(),
            format!("{dir_str}/b.fb2"),
            format!("{dir_str}/*"),
        ]);
        let names: Vec<_> = cli
            .merge
            .expand_inputs()
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        // The nested directory is skipped
        assert_eq!(vec!["b.fb2", "a.fb2", "b.fb2", "c.txt"], names);
    }
}

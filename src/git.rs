// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Read-only git queries against the local project clone.
///
/// Provides the release commit log and the version declared on a branch.
use std::{path::Path, process::Command, sync::LazyLock};

use regex::Regex;
use tracing::debug;

use crate::error::Error;

static VERSION_CONSTANT: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^(MAJOR|MINOR|PATCH)_VERSION\s*(?::\s*[\w\[\]]+\s*)?=\s*["']?([0-9A-Za-z.]+)["']?"#,
    )
    .expect("static version constant pattern",)
},);

static VERSION_LITERAL: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r#"(?m)^__version__\s*(?::\s*[\w\[\]]+\s*)?=\s*["']([^"']+)["']"#,)
        .expect("static version literal pattern",)
},);

/// Commit log of `branch` relative to `base_ref`, oldest first, one
/// `- <subject> (<email>)` line per commit.
///
/// # Errors
///
/// Returns [`Error::Git`] naming the clone and branch when git fails.
pub fn commit_log(clone: &Path, base_ref: &str, branch: &str,) -> Result<String, Error,>
{
    run_git(
        clone,
        &["log", &format!("{base_ref}...{branch}"), "--pretty=format:- %s (%ae)", "--reverse"],
        || {
            format!(
                "failed getting the log: does the repository exist at {}? does branch {} exist?",
                clone.display(),
                branch
            )
        },
    )
}

/// Version declared in `version_file` on `branch`.
///
/// # Errors
///
/// Returns [`Error::Git`] when the file cannot be read from the branch and
/// [`Error::Validation`] when it declares no recognizable version.
pub fn project_version(clone: &Path, branch: &str, version_file: &str,) -> Result<String, Error,>
{
    let source = run_git(clone, &["show", &format!("{branch}:{version_file}")], || {
        format!(
            "failed getting the version of branch {}: does the repository exist at {}? does the \
             branch exist?",
            branch,
            clone.display()
        )
    },)?;

    parse_version_constants(&source,).ok_or_else(|| {
        Error::validation(format!("no version declared in {version_file} on branch {branch}"),)
    },)
}

/// Extracts the version from a Python constants module.
///
/// `MAJOR_VERSION`, `MINOR_VERSION` and `PATCH_VERSION` win when all three
/// are present; otherwise a literal `__version__` string is used.
///
/// # Examples
///
/// ```
/// use relnotes::parse_version_constants;
///
/// let source = "MAJOR_VERSION = 0\nMINOR_VERSION = 41\nPATCH_VERSION = '0b1'\n";
/// assert_eq!(parse_version_constants(source).as_deref(), Some("0.41.0b1"));
/// ```
pub fn parse_version_constants(source: &str,) -> Option<String,>
{
    let mut major = None;
    let mut minor = None;
    let mut patch = None;

    for captures in VERSION_CONSTANT.captures_iter(source,) {
        let value = captures[2].to_owned();
        match &captures[1] {
            "MAJOR" => major = Some(value,),
            "MINOR" => minor = Some(value,),
            _ => patch = Some(value,),
        }
    }

    if let (Some(major,), Some(minor,), Some(patch,),) = (major, minor, patch,) {
        return Some(format!("{major}.{minor}.{patch}"),);
    }

    VERSION_LITERAL.captures(source,).map(|captures| captures[1].to_owned(),)
}

fn run_git(clone: &Path, args: &[&str], failure: impl Fn() -> String,) -> Result<String, Error,>
{
    debug!("git {} (in {})", args.join(" "), clone.display());
    let output = Command::new("git",)
        .args(args,)
        .current_dir(clone,)
        .output()
        .map_err(|e| Error::git(format!("{}: {e}", failure()),),)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr,);
        return Err(Error::git(format!("{}: {}", failure(), stderr.trim()),),);
    }

    Ok(String::from_utf8_lossy(&output.stdout,).into_owned(),)
}

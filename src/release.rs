// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Release versions and the identifiers derived from them.
//!
//! Versions follow the project's `major.minor[.patch][a|bN]` convention
//! (`0.41`, `0.41.2`, `0.42.0b1`). Identifiers are stable slugs such as
//! `release-0-41` that name output documents and branches.

use std::{cmp::Ordering, fmt, sync::LazyLock};

use regex::Regex;

use crate::error::Error;

static VERSION_PATTERN: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?(?:([ab])(\d+))?$",).expect("static version pattern",)
},);

/// Pre-release marker such as the `b1` in `0.42.0b1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,)]
pub struct PreRelease
{
    /// `a` for alpha, `b` for beta.
    pub tag:    char,
    /// Pre-release sequence number.
    pub number: u64,
}

/// Parsed project version.
///
/// Ordering treats a pre-release as older than the final version with the
/// same release components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash,)]
pub struct Version
{
    pub major:       u64,
    pub minor:       u64,
    pub patch:       u64,
    pub pre_release: Option<PreRelease,>,
}

impl Version
{
    /// Parses a version string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the string does not follow the
    /// `major.minor[.patch][a|bN]` layout.
    ///
    /// # Examples
    ///
    /// ```
    /// use relnotes::Version;
    ///
    /// let version = Version::parse("0.42.0b1",).expect("valid version",);
    /// assert_eq!(version.release_components(), (0, 42, 0));
    /// assert!(version.pre_release.is_some());
    /// ```
    pub fn parse(input: &str,) -> Result<Self, Error,>
    {
        let trimmed = input.trim();
        let captures = VERSION_PATTERN
            .captures(trimmed,)
            .ok_or_else(|| Error::validation(format!("invalid version '{trimmed}'"),),)?;

        let number = |index: usize| -> Result<u64, Error,> {
            captures
                .get(index,)
                .map_or(Ok(0,), |value| value.as_str().parse::<u64>(),)
                .map_err(|_| Error::validation(format!("version component too large in '{trimmed}'"),),)
        };

        let pre_release = match captures.get(4,) {
            Some(tag,) => Some(PreRelease {
                tag:    tag.as_str().chars().next().unwrap_or('b',),
                number: number(5,)?,
            },),
            None => None,
        };

        Ok(Self {
            major: number(1,)?,
            minor: number(2,)?,
            patch: number(3,)?,
            pre_release,
        },)
    }

    /// Returns the `(major, minor, patch)` tuple, ignoring any pre-release.
    pub fn release_components(&self,) -> (u64, u64, u64,)
    {
        (self.major, self.minor, self.patch,)
    }
}

impl Ord for Version
{
    fn cmp(&self, other: &Self,) -> Ordering
    {
        self.release_components()
            .cmp(&other.release_components(),)
            .then_with(|| match (self.pre_release, other.pre_release,) {
                (None, None,) => Ordering::Equal,
                (None, Some(_,),) => Ordering::Greater,
                (Some(_,), None,) => Ordering::Less,
                (Some(left,), Some(right,),) => left.cmp(&right,),
            },)
    }
}

impl PartialOrd for Version
{
    fn partial_cmp(&self, other: &Self,) -> Option<Ordering,>
    {
        Some(self.cmp(other,),)
    }
}

impl fmt::Display for Version
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre,) = self.pre_release {
            write!(f, "{}{}", pre.tag, pre.number)?;
        }
        Ok((),)
    }
}

/// A release under preparation: its version and the branch it is cut from.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Release
{
    version:    Version,
    branch:     String,
    identifier: String,
}

impl Release
{
    /// Creates a release for `version` built from `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the version cannot be parsed or the
    /// branch name is blank.
    ///
    /// # Examples
    ///
    /// ```
    /// use relnotes::Release;
    ///
    /// let release = Release::new("0.41.0", "rc",).expect("valid release",);
    /// assert_eq!(release.identifier(), "release-0-41");
    /// ```
    pub fn new(version: &str, branch: impl Into<String,>,) -> Result<Self, Error,>
    {
        let version = Version::parse(version,)?;
        let branch = branch.into();
        if branch.trim().is_empty() {
            return Err(Error::validation("release branch cannot be empty",),);
        }

        Ok(Self {
            identifier: release_identifier(&version,),
            version,
            branch,
        },)
    }

    pub fn version(&self,) -> &Version
    {
        &self.version
    }

    pub fn branch(&self,) -> &str
    {
        &self.branch
    }

    /// Canonical slug used for output file names.
    pub fn identifier(&self,) -> &str
    {
        &self.identifier
    }

    /// A patch release carries a non-zero patch component.
    pub fn is_patch_release(&self,) -> bool
    {
        self.version.patch != 0
    }

    /// Cherry-picked fixes are only tracked for `x.y.0` releases.
    pub fn tracks_cherry_picks(&self,) -> bool
    {
        self.version.patch == 0
    }
}

fn release_identifier(version: &Version,) -> String
{
    let mut identifier = if version.patch == 0 && version.pre_release.is_none() {
        format!("release-{}-{}", version.major, version.minor)
    } else {
        format!("release-{}-{}-{}", version.major, version.minor, version.patch)
    };

    if let Some(pre,) = version.pre_release {
        identifier.push(pre.tag,);
        identifier.push_str(&pre.number.to_string(),);
    }

    identifier
}

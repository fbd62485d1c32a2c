// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Settings document describing the project conventions the tool encodes.
//!
//! The types mirror the optional YAML file passed with `--config`. Every field
//! carries a default matching the Home Assistant release process, so the tool
//! runs without a file and a document only needs the values it overrides.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{self, Error};

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_ORGANIZATION: &str = "home-assistant";
const DEFAULT_ORGANIZATION_NAME: &str = "Home Assistant";
const DEFAULT_REPOSITORY: &str = "core";
const DEFAULT_DOCS_REPOSITORY: &str = "home-assistant.io";
const DEFAULT_PROJECT_OWNER: &str = "balloob";
const DEFAULT_CLONE_PATH: &str = "../core";
const DEFAULT_BASE_REF: &str = "origin/master";
const DEFAULT_VERSION_FILE: &str = "homeassistant/const.py";
const DEFAULT_SITE_URL: &str = "https://www.home-assistant.io";
const DEFAULT_COMPONENT_PATH: &str = "/components/{}/";
const DEFAULT_AUTOMATION_PATH: &str = "/docs/automation/trigger/#{}-trigger";
const DEFAULT_CLOUD_URL: &str = "https://www.nabucasa.com/config/";
const DEFAULT_CHERRY_PICK_LABEL: &str = "cherry-picked";
const DEFAULT_BREAKING_LABEL: &str = "breaking change";
const DEFAULT_CONCURRENCY: usize = 63;
const DEFAULT_PER_PAGE: u32 = 100;

const DEFAULT_WEBSITE_DIVIDER: &str = "## If you need help...

...don't hesitate to use our very active [forums](https://community.home-assistant.io/) or join us for a little [chat](https://discord.gg/c5DvZ4e).

## Reporting Issues

Experiencing issues introduced by this release? Please report them in our [issue tracker](https://github.com/home-assistant/home-assistant/issues). Make sure to fill in all fields of the issue template.

<!--more-->
";

/// Root settings document.
///
/// # Examples
///
/// ```
/// use relnotes::Settings;
///
/// let settings = Settings::parse("github:\n  repository: frontend\n",).expect("valid settings",);
/// assert_eq!(settings.github.repository, "frontend");
/// assert_eq!(settings.github.organization, "home-assistant");
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize,)]
#[serde(default)]
pub struct Settings
{
    pub github:    GithubSettings,
    pub git:       GitSettings,
    pub changelog: ChangelogSettings,
    pub paths:     PathSettings,
    pub credits:   CreditSettings,
}

/// Remote repository coordinates.
#[derive(Debug, Clone, Deserialize, Serialize,)]
#[serde(default)]
pub struct GithubSettings
{
    /// Base URL of the REST API.
    pub api_url:       String,
    /// Organization owning the repositories.
    pub organization:      String,
    /// Display name of the organization used on the credits page.
    pub organization_name: String,
    /// Repository whose pull requests back the changelog.
    pub repository:        String,
    /// Documentation repository referenced from pull request bodies.
    pub docs_repository:   String,
    /// Login presented separately on the credits page.
    pub project_owner:     String,
}

impl Default for GithubSettings
{
    fn default() -> Self
    {
        Self {
            api_url:           DEFAULT_API_URL.to_owned(),
            organization:      DEFAULT_ORGANIZATION.to_owned(),
            organization_name: DEFAULT_ORGANIZATION_NAME.to_owned(),
            repository:        DEFAULT_REPOSITORY.to_owned(),
            docs_repository:   DEFAULT_DOCS_REPOSITORY.to_owned(),
            project_owner:     DEFAULT_PROJECT_OWNER.to_owned(),
        }
    }
}

/// Local clone used for log and version lookups.
#[derive(Debug, Clone, Deserialize, Serialize,)]
#[serde(default)]
pub struct GitSettings
{
    pub clone_path:   PathBuf,
    /// Ref the release branch is compared against.
    pub base_ref:     String,
    /// File holding the version constants, relative to the clone.
    pub version_file: String,
}

impl Default for GitSettings
{
    fn default() -> Self
    {
        Self {
            clone_path:   PathBuf::from(DEFAULT_CLONE_PATH,),
            base_ref:     DEFAULT_BASE_REF.to_owned(),
            version_file: DEFAULT_VERSION_FILE.to_owned(),
        }
    }
}

/// Label taxonomy and link templates used by the changelog builder.
#[derive(Debug, Clone, Deserialize, Serialize,)]
#[serde(default)]
pub struct ChangelogSettings
{
    /// Pull requests carrying any of these labels are left out entirely.
    pub ignore_labels:      Vec<String,>,
    /// Category sections in output order.
    pub categories:         Vec<CategorySettings,>,
    /// Category that is only tracked for `x.y.0` releases.
    pub cherry_pick_label:  String,
    /// Label prefixes naming a documentation subject.
    pub doc_label_prefixes: Vec<String,>,
    /// Per-subject-family overrides, matched by prefix in order.
    pub doc_overrides:      Vec<DocOverride,>,
    /// Documentation site root, prepended to paths in the plain dialect.
    pub site_url:           String,
    /// Documentation path for a subject; `{}` is replaced by the subject.
    pub component_path:     String,
    /// Documentation path for an automation trigger anchor.
    pub automation_path:    String,
    /// Boilerplate emitted by the website dialect at marked categories.
    pub website_divider:    String,
    /// Heading template for the website dialect.
    pub website_heading:    String,
    /// Heading template for the plain dialect.
    pub plain_heading:      String,
}

impl Default for ChangelogSettings
{
    fn default() -> Self
    {
        Self {
            ignore_labels:      vec!["reverted".to_owned()],
            categories:         vec![
                CategorySettings::new("new-integration", "New Integrations",),
                CategorySettings::new("new-platform", "New Platforms",),
                CategorySettings {
                    divider_before: true,
                    ..CategorySettings::new(DEFAULT_BREAKING_LABEL, "Breaking Changes",)
                },
                CategorySettings {
                    annotation: Some("beta fix".to_owned(),),
                    ..CategorySettings::new(DEFAULT_CHERRY_PICK_LABEL, "Beta Fixes",)
                },
            ],
            cherry_pick_label:  DEFAULT_CHERRY_PICK_LABEL.to_owned(),
            doc_label_prefixes: vec![
                "integration: ".to_owned(),
                "platform: ".to_owned(),
                "component: ".to_owned(),
            ],
            doc_overrides:      vec![
                DocOverride::suppress("discovery.",),
                DocOverride::suppress("recorder.",),
                DocOverride {
                    prefix: "automation.".to_owned(), action: DocAction::Automation,
                },
                DocOverride::suppress("emulated_hue.",),
                DocOverride::suppress("homeassistant.",),
                DocOverride {
                    prefix: "cloud.".to_owned(),
                    action: DocAction::Fixed {
                        url: DEFAULT_CLOUD_URL.to_owned(),
                    },
                },
            ],
            site_url:           DEFAULT_SITE_URL.to_owned(),
            component_path:     DEFAULT_COMPONENT_PATH.to_owned(),
            automation_path:    DEFAULT_AUTOMATION_PATH.to_owned(),
            website_divider:    DEFAULT_WEBSITE_DIVIDER.to_owned(),
            website_heading:    "## {}".to_owned(),
            plain_heading:      "## {}".to_owned(),
        }
    }
}

/// One category section of the changelog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
pub struct CategorySettings
{
    /// Label that routes a pull request into this section.
    pub label:          String,
    /// Human readable section header.
    pub header:         String,
    /// Annotation appended to entries; defaults to the label itself.
    #[serde(default)]
    pub annotation:     Option<String,>,
    /// Emit the website divider right before this section.
    #[serde(default)]
    pub divider_before: bool,
}

impl CategorySettings
{
    pub fn new(label: &str, header: &str,) -> Self
    {
        Self {
            label:          label.to_owned(),
            header:         header.to_owned(),
            annotation:     None,
            divider_before: false,
        }
    }

    /// Text appended in parentheses to every entry of this category.
    pub fn annotation(&self,) -> &str
    {
        self.annotation.as_deref().unwrap_or(&self.label,)
    }
}

/// Override applied to documentation subjects starting with `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
pub struct DocOverride
{
    pub prefix: String,
    #[serde(flatten)]
    pub action: DocAction,
}

impl DocOverride
{
    fn suppress(prefix: &str,) -> Self
    {
        Self {
            prefix: prefix.to_owned(), action: DocAction::Suppress,
        }
    }
}

/// What to do with a matching documentation subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DocAction
{
    /// Emit no documentation link at all.
    Suppress,
    /// Link to the automation trigger anchor derived from the subject.
    Automation,
    /// Link every subject of the family to one fixed URL.
    Fixed
    {
        url: String,
    },
}

/// Local files read and written by the commands.
#[derive(Debug, Clone, Deserialize, Serialize,)]
#[serde(default)]
pub struct PathSettings
{
    /// Directory receiving the generated release notes.
    pub data_dir:         PathBuf,
    /// `email,login` identity cache.
    pub login_by_email:   PathBuf,
    /// `login,name` display name cache.
    pub name_by_login:    PathBuf,
    /// Credits page template; the built-in template is used when absent.
    pub credits_template: Option<PathBuf,>,
    /// Destination of the rendered credits page.
    pub credits_output:   PathBuf,
    /// File holding the API token on its first line.
    pub token_file:       PathBuf,
}

impl Default for PathSettings
{
    fn default() -> Self
    {
        Self {
            data_dir:         PathBuf::from("data",),
            login_by_email:   PathBuf::from("data/login_by_email.csv",),
            name_by_login:    PathBuf::from("data/name_by_login.csv",),
            credits_template: None,
            credits_output:   PathBuf::from("../home-assistant.io/source/developers/credits.markdown",),
            token_file:       PathBuf::from(".token",),
        }
    }
}

/// Crawl parameters for the credits aggregation.
#[derive(Debug, Clone, Deserialize, Serialize,)]
#[serde(default)]
pub struct CreditSettings
{
    /// Number of concurrent request workers.
    pub concurrency: usize,
    /// Page size requested from list endpoints.
    pub per_page:    u32,
}

impl Default for CreditSettings
{
    fn default() -> Self
    {
        Self {
            concurrency: DEFAULT_CONCURRENCY, per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Settings
{
    /// Loads settings from `path`, or returns the defaults when no path is
    /// given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read, [`Error::Parse`]
    /// when it is not valid YAML, and [`Error::Validation`] when the values
    /// violate invariants.
    pub fn load(path: Option<&Path,>,) -> Result<Self, Error,>
    {
        match path {
            Some(path,) => {
                let contents =
                    fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
                Self::parse(&contents,)
            }
            None => {
                let settings = Self::default();
                settings.validate()?;
                Ok(settings,)
            }
        }
    }

    /// Parses and validates a settings document.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn parse(contents: &str,) -> Result<Self, Error,>
    {
        let settings: Self = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents,)?
        };
        settings.validate()?;
        Ok(settings,)
    }

    /// Checks the invariants the commands rely on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first violation.
    pub fn validate(&self,) -> Result<(), Error,>
    {
        normalize_identifier(&self.github.organization, "github.organization",)?;
        normalize_identifier(&self.github.repository, "github.repository",)?;
        normalize_identifier(&self.github.docs_repository, "github.docs_repository",)?;
        if self.github.organization_name.trim().is_empty() {
            return Err(Error::validation("github.organization_name cannot be empty",),);
        }
        normalize_identifier(&self.git.base_ref, "git.base_ref",)?;

        if url::Url::parse(&self.github.api_url,).is_err() {
            return Err(Error::validation(format!(
                "github.api_url '{}' is not an absolute URL",
                self.github.api_url
            ),),);
        }

        if self.credits.concurrency == 0 {
            return Err(Error::validation("credits.concurrency must be at least 1",),);
        }
        if self.credits.per_page == 0 || self.credits.per_page > 100 {
            return Err(Error::validation("credits.per_page must be between 1 and 100",),);
        }

        let mut seen = HashSet::with_capacity(self.changelog.categories.len(),);
        for category in &self.changelog.categories {
            if category.label.trim().is_empty() || category.header.trim().is_empty() {
                return Err(Error::validation("category label and header cannot be empty",),);
            }
            if !seen.insert(category.label.as_str(),) {
                return Err(Error::validation(format!(
                    "duplicate category label '{}'",
                    category.label
                ),),);
            }
        }

        for prefix in &self.changelog.doc_label_prefixes {
            if prefix.is_empty() {
                return Err(Error::validation("doc_label_prefixes cannot contain empty entries",),);
            }
        }

        for template in [
            &self.changelog.component_path,
            &self.changelog.automation_path,
            &self.changelog.website_heading,
            &self.changelog.plain_heading,
        ] {
            if !template.contains("{}",) {
                return Err(Error::validation(format!(
                    "template '{template}' must contain a '{{}}' placeholder"
                ),),);
            }
        }

        Ok((),)
    }
}

/// Validates identifier-like fields such as owners or repositories.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the value is empty or contains
/// whitespace.
fn normalize_identifier(input: &str, field: &str,) -> Result<(), Error,>
{
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty"),),);
    }
    if trimmed.chars().any(char::is_whitespace,) {
        return Err(Error::validation(format!("{field} cannot contain whitespace"),),);
    }
    Ok((),)
}

#[cfg(test)]
mod tests
{
    use std::io::Write;

    use super::{DocAction, Settings};
    use crate::error::Error;

    #[test]
    fn defaults_encode_project_conventions()
    {
        let settings = Settings::default();
        settings.validate().expect("defaults are valid",);

        let labels: Vec<&str,> =
            settings.changelog.categories.iter().map(|category| category.label.as_str(),).collect();
        assert_eq!(labels, vec!["new-integration", "new-platform", "breaking change", "cherry-picked"]);
        assert_eq!(settings.changelog.categories[3].annotation(), "beta fix");
        assert_eq!(settings.changelog.categories[2].annotation(), "breaking change");
        assert!(settings.changelog.categories[2].divider_before);
        assert_eq!(settings.changelog.ignore_labels, vec!["reverted"]);
        assert_eq!(settings.credits.concurrency, 63);
        assert_eq!(settings.github.organization_name, "Home Assistant");
        assert_eq!(settings.github.docs_repository, "home-assistant.io");
    }

    #[test]
    fn partial_document_keeps_remaining_defaults()
    {
        let yaml = r"
changelog:
  ignore_labels: [reverted, wontfix]
credits:
  concurrency: 8
";
        let settings = Settings::parse(yaml,).expect("valid settings",);
        assert_eq!(settings.changelog.ignore_labels, vec!["reverted", "wontfix"]);
        assert_eq!(settings.changelog.categories.len(), 4);
        assert_eq!(settings.credits.concurrency, 8);
        assert_eq!(settings.credits.per_page, 100);
        assert_eq!(settings.github.repository, "core");
    }

    #[test]
    fn doc_overrides_deserialize_tagged_actions()
    {
        let yaml = r"
changelog:
  doc_overrides:
    - prefix: 'discovery.'
      action: suppress
    - prefix: 'automation.'
      action: automation
    - prefix: 'cloud.'
      action: fixed
      url: https://example.com/cloud/
";
        let settings = Settings::parse(yaml,).expect("valid settings",);
        let actions: Vec<&DocAction,> =
            settings.changelog.doc_overrides.iter().map(|entry| &entry.action,).collect();
        assert_eq!(actions, vec![
            &DocAction::Suppress,
            &DocAction::Automation,
            &DocAction::Fixed {
                url: "https://example.com/cloud/".to_owned(),
            },
        ]);
    }

    #[test]
    fn rejects_duplicate_category_labels()
    {
        let yaml = r"
changelog:
  categories:
    - label: breaking change
      header: Breaking Changes
    - label: breaking change
      header: Again
";
        let error = Settings::parse(yaml,).expect_err("duplicate labels",);
        match error {
            Error::Validation {
                message,
            } => assert!(message.contains("duplicate category label")),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_concurrency_and_whitespace_repository()
    {
        assert!(Settings::parse("credits:\n  concurrency: 0\n").is_err());
        assert!(Settings::parse("github:\n  repository: 'my repo'\n").is_err());
        assert!(Settings::parse("github:\n  organization_name: '  '\n").is_err());
        assert!(Settings::parse("github:\n  docs_repository: ''\n").is_err());
    }

    #[test]
    fn rejects_templates_without_placeholder()
    {
        assert!(Settings::parse("changelog:\n  component_path: /components/\n").is_err());
    }

    #[test]
    fn empty_document_yields_defaults()
    {
        let settings = Settings::parse("",).expect("empty document is valid",);
        assert_eq!(settings.git.base_ref, "origin/master");
    }

    #[test]
    fn load_reads_file_from_disk()
    {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file",);
        writeln!(file, "github:\n  organization: example").expect("failed to write settings",);

        let settings = Settings::load(Some(file.path(),),).expect("settings should load",);
        assert_eq!(settings.github.organization, "example");
    }

    #[test]
    fn load_reports_missing_file()
    {
        let error = Settings::load(Some(std::path::Path::new("/nonexistent/relnotes.yaml",),),)
            .expect_err("missing file",);
        assert!(matches!(error, Error::Io { .. }));
    }
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Release notes assembled from the commit log and pull request labels.
//!
//! A single pass over the log produces a [`ChangelogDocument`]; the document
//! renders into either dialect. Entries are dialect independent, only
//! headings, the website divider and link targets differ.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::{
    client::Transport,
    config::{ChangelogSettings, DocAction},
    error::Error,
    log_line::LogLine,
    pull_request::{PrCache, PullRequestRef},
    release::{Release, Version},
};

/// Output flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum Dialect
{
    /// Published on the project website: site-relative doc links and the
    /// help/issue divider.
    Website,
    /// GitHub release body: fully-qualified links.
    Plain,
}

/// Where a documentation reference points.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord,)]
pub enum DocTarget
{
    /// Path on the documentation site, qualified in the plain dialect.
    SitePath(String,),
    /// Absolute URL used verbatim in both dialects.
    External(String,),
}

/// A reference-style link definition emitted at the end of the document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord,)]
pub enum Link
{
    User
    {
        login: String, url: String,
    },
    PullRequest
    {
        number: u64, url: String,
    },
    Doc
    {
        subject: String, target: DocTarget,
    },
}

impl Link
{
    fn render(&self, dialect: Dialect, site_url: &str,) -> String
    {
        match self {
            Self::User {
                login,
                url,
            } => format!("[@{login}]: {url}"),
            Self::PullRequest {
                number,
                url,
            } => format!("[#{number}]: {url}"),
            Self::Doc {
                subject,
                target,
            } => {
                let target = match (target, dialect,) {
                    (DocTarget::SitePath(path,), Dialect::Website,) => path.clone(),
                    (DocTarget::SitePath(path,), Dialect::Plain,) => {
                        format!("{}{}", site_url.trim_end_matches('/',), path)
                    }
                    (DocTarget::External(url,), _,) => url.clone(),
                };
                format!("[{subject} docs]: {target}")
            }
        }
    }
}

/// One category section.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Section
{
    pub label:          String,
    pub header:         String,
    pub divider_before: bool,
    pub entries:        Vec<String,>,
}

/// Everything needed to render the release notes in any dialect.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ChangelogDocument
{
    pub sections:    Vec<Section,>,
    /// Every surviving entry in log order.
    pub changes:     Vec<String,>,
    pub links:       BTreeSet<Link,>,
    /// Dated heading text for patch releases.
    pub heading:     Option<String,>,
    divider:         String,
    website_heading: String,
    plain_heading:   String,
    site_url:        String,
}

impl ChangelogDocument
{
    /// Renders the document.
    ///
    /// Empty category sections are omitted; the website divider is still
    /// emitted at its position. "All changes" is always present.
    pub fn render(&self, dialect: Dialect,) -> String
    {
        let heading = |text: &str| match dialect {
            Dialect::Website => self.website_heading.replacen("{}", text, 1,),
            Dialect::Plain => self.plain_heading.replacen("{}", text, 1,),
        };

        let mut output: Vec<String,> = Vec::new();

        if dialect == Dialect::Website
            && let Some(text,) = &self.heading
        {
            output.push(heading(text,),);
            output.push(String::new(),);
        }

        for section in &self.sections {
            if section.divider_before && dialect == Dialect::Website {
                output.push(self.divider.clone(),);
            }
            if section.entries.is_empty() {
                continue;
            }
            output.push(heading(&section.header,),);
            output.push(String::new(),);
            output.extend(section.entries.iter().cloned(),);
            output.push(String::new(),);
        }

        output.push(heading("All changes",),);
        output.push(String::new(),);
        output.extend(self.changes.iter().cloned(),);
        output.push(String::new(),);

        let links: BTreeSet<String,> =
            self.links.iter().map(|link| link.render(dialect, &self.site_url,),).collect();
        output.extend(links,);

        output.join("\n",)
    }
}

/// Maps an automation subject to its trigger documentation anchor.
///
/// # Examples
///
/// ```
/// use relnotes::automation_anchor;
///
/// assert_eq!(automation_anchor("automation.numeric_state"), "numeric-state");
/// assert_eq!(automation_anchor("automation.time_pattern"), "time_pattern");
/// ```
pub fn automation_anchor(subject: &str,) -> &str
{
    let trigger = subject.split_once('.',).map_or(subject, |(_, trigger,)| trigger,);
    match trigger {
        "homeassistant" => "home-assistant",
        "numeric_state" => "numeric-state",
        other => other,
    }
}

/// Builds changelog documents from a release log.
#[derive(Debug, Clone,)]
pub struct ChangelogBuilder<'s,>
{
    settings:    &'s ChangelogSettings,
    released_on: NaiveDate,
}

impl<'s,> ChangelogBuilder<'s,>
{
    pub fn new(settings: &'s ChangelogSettings,) -> Self
    {
        Self {
            settings,
            released_on: chrono::Local::now().date_naive(),
        }
    }

    /// Date used in the patch release heading.
    #[must_use]
    pub fn released_on(mut self, date: NaiveDate,) -> Self
    {
        self.released_on = date;
        self
    }

    /// Runs the filtering and annotation pass over `lines`.
    ///
    /// # Errors
    ///
    /// Any pull request fetch failure aborts the build.
    pub async fn build<T: Transport,>(
        &self,
        release: &Release,
        lines: &[LogLine],
        pull_requests: &mut PrCache<'_, T,>,
    ) -> Result<ChangelogDocument, Error,>
    {
        let mut sections: Vec<Section,> = self
            .settings
            .categories
            .iter()
            .filter(|category| {
                release.tracks_cherry_picks() || category.label != self.settings.cherry_pick_label
            },)
            .map(|category| Section {
                label:          category.label.clone(),
                header:         category.header.clone(),
                divider_before: category.divider_before,
                entries:        Vec::new(),
            },)
            .collect();
        let mut changes = Vec::new();
        let mut links = BTreeSet::new();

        for line in lines {
            let Some(number,) = line.pull_request else {
                debug!("dropping commit without pull request: {}", line.raw);
                continue;
            };

            let pull_request = pull_requests.get(number,).await?;
            if !self.belongs_to(release, pull_request,) {
                debug!("#{} belongs to another release", number);
                continue;
            }
            if let Some(label,) =
                self.settings.ignore_labels.iter().find(|label| pull_request.has_label(label,),)
            {
                debug!("#{} skipped because of label {}", number, label);
                continue;
            }

            let mut parts = vec!["-".to_owned()];
            if !line.message.is_empty() {
                parts.push(line.message.clone(),);
            }
            parts.push(format!("([@{}] - [#{}])", pull_request.author.login, pull_request.number),);
            links.insert(Link::User {
                login: pull_request.author.login.clone(),
                url:   pull_request.author.html_url.clone(),
            },);
            links.insert(Link::PullRequest {
                number: pull_request.number,
                url:    pull_request.html_url.clone(),
            },);

            for label in &pull_request.labels {
                if let Some((part, link,),) = self.doc_reference(label,) {
                    parts.push(part,);
                    links.insert(link,);
                }
            }

            let mut member_of = Vec::new();
            for label in &pull_request.labels {
                if let Some(index,) = sections.iter().position(|section| &section.label == label,) {
                    let annotation = self
                        .settings
                        .categories
                        .iter()
                        .find(|category| &category.label == label,)
                        .map_or(label.as_str(), |category| category.annotation(),);
                    parts.push(format!("({annotation})"),);
                    member_of.push(index,);
                }
            }

            let entry = parts.join(" ",);
            for index in member_of {
                sections[index].entries.push(entry.clone(),);
            }
            changes.push(entry,);
        }

        let heading = release.is_patch_release().then(|| {
            format!(
                "Release {} - {}",
                release.version(),
                self.released_on.format("%B %-d")
            )
        },);

        Ok(ChangelogDocument {
            sections,
            changes,
            links,
            heading,
            divider: self.settings.website_divider.clone(),
            website_heading: self.settings.website_heading.clone(),
            plain_heading: self.settings.plain_heading.clone(),
            site_url: self.settings.site_url.clone(),
        },)
    }

    /// A milestone that parses as a different release excludes the pull
    /// request; unparseable milestone titles do not.
    fn belongs_to(&self, release: &Release, pull_request: &PullRequestRef,) -> bool
    {
        match &pull_request.milestone {
            Some(milestone,) => match Version::parse(&milestone.title,) {
                Ok(version,) => {
                    version.release_components() == release.version().release_components()
                }
                Err(_,) => true,
            },
            None => true,
        }
    }

    fn doc_reference(&self, label: &str,) -> Option<(String, Link,),>
    {
        let subject = self
            .settings
            .doc_label_prefixes
            .iter()
            .find_map(|prefix| label.strip_prefix(prefix.as_str(),),)
            .map(str::trim,)
            .filter(|subject| !subject.is_empty(),)?;

        let target = match self
            .settings
            .doc_overrides
            .iter()
            .find(|entry| subject.starts_with(&entry.prefix,),)
            .map(|entry| &entry.action,)
        {
            Some(DocAction::Suppress,) => return None,
            Some(DocAction::Automation,) => DocTarget::SitePath(
                self.settings.automation_path.replacen("{}", automation_anchor(subject,), 1,),
            ),
            Some(DocAction::Fixed {
                url,
            },) => DocTarget::External(url.clone(),),
            None => DocTarget::SitePath(self.settings.component_path.replacen("{}", subject, 1,),),
        };

        Some((
            format!("([{subject} docs])"),
            Link::Doc {
                subject: subject.to_owned(),
                target,
            },
        ),)
    }
}

#[cfg(test)]
mod tests
{
    use chrono::NaiveDate;

    use super::{ChangelogBuilder, ChangelogDocument, Dialect, automation_anchor};
    use crate::{
        client::RateLimitedClient,
        config::ChangelogSettings,
        github::RepoRef,
        log_line::parse_log,
        pull_request::{PrCache, fixtures},
        release::Release,
        testing::FakeTransport,
    };

    const ISSUES: &str = "https://api.test/repos/o/r/issues";

    async fn build(
        version: &str,
        log: &str,
        issues: Vec<(u64, serde_json::Value,),>,
    ) -> ChangelogDocument
    {
        let mut transport = FakeTransport::new();
        for (number, payload,) in issues {
            transport = transport.json(&format!("{ISSUES}/{number}"), payload,);
        }
        let client = RateLimitedClient::new(transport,);
        let mut prs = PrCache::new(&client, RepoRef::new("https://api.test", "o", "r",),);
        let settings = ChangelogSettings::default();
        let release = Release::new(version, "rc",).expect("valid release",);
        let lines = parse_log(log,).expect("valid log",);

        ChangelogBuilder::new(&settings,)
            .released_on(NaiveDate::from_ymd_opt(2019, 10, 23,).expect("valid date",),)
            .build(&release, &lines, &mut prs,)
            .await
            .expect("changelog builds",)
    }

    #[tokio::test]
    async fn end_to_end_plain_dialect()
    {
        let document = build(
            "0.41.0",
            "- Fix bug (#10) (a@x.com)\n- Tweak docs (b@x.com)\n",
            vec![(10, fixtures::issue(10, "alice", &["breaking change"], None,),)],
        )
        .await;
        let output = document.render(Dialect::Plain,);

        assert!(output.contains("## Breaking Changes\n\n- Fix bug ([@alice] - [#10]) (breaking change)\n"));
        assert!(!output.contains("Tweak docs"));
        assert_eq!(output.matches("\n[#10]: ").count(), 1);
        assert_eq!(output.matches("\n[@alice]: ").count(), 1);
        assert!(!output.contains("If you need help"));
        assert!(!output.contains("## New Integrations"));
        assert!(output.contains("## All changes\n\n- Fix bug"));
    }

    #[tokio::test]
    async fn website_dialect_emits_divider_even_without_breaking_changes()
    {
        let document = build(
            "0.41.0",
            "- Add thing (#1) (a@x.com)\n",
            vec![(1, fixtures::issue(1, "alice", &["new-integration"], None,),)],
        )
        .await;
        let output = document.render(Dialect::Website,);

        let integrations = output.find("## New Integrations",).expect("section present",);
        let divider = output.find("## If you need help",).expect("divider present",);
        let all_changes = output.find("## All changes",).expect("all changes present",);
        assert!(integrations < divider && divider < all_changes);
    }

    #[tokio::test]
    async fn ignored_label_excludes_commit_everywhere()
    {
        let document = build(
            "0.41.0",
            "- Broken (#3) (a@x.com)\n- Fine (#4) (b@x.com)\n",
            vec![
                (3, fixtures::issue(3, "alice", &["reverted", "breaking change"], None,),),
                (4, fixtures::issue(4, "bob", &[], None,),),
            ],
        )
        .await;

        for dialect in [Dialect::Plain, Dialect::Website] {
            let output = document.render(dialect,);
            assert!(!output.contains("Broken"));
            assert!(!output.contains("[#3]"));
            assert!(!output.contains("@alice"));
            assert!(output.contains("- Fine ([@bob] - [#4])"));
        }
    }

    #[tokio::test]
    async fn milestone_of_another_release_is_excluded()
    {
        let document = build(
            "0.41.0",
            "- Old (#1) (a@x.com)\n- Beta (#2) (b@x.com)\n- Backlog (#3) (c@x.com)\n",
            vec![
                (1, fixtures::issue(1, "a", &[], Some("0.40",),),),
                (2, fixtures::issue(2, "b", &[], Some("0.41.0b2",),),),
                (3, fixtures::issue(3, "c", &[], Some("Future",),),),
            ],
        )
        .await;

        let messages: Vec<&str,> =
            document.changes.iter().map(|entry| entry.split(" (",).next().unwrap_or_default(),).collect();
        assert_eq!(messages, vec!["- Beta", "- Backlog"]);
    }

    #[tokio::test]
    async fn integration_label_produces_one_doc_reference()
    {
        let document = build(
            "0.41.0",
            "- Hue fix (#5) (a@x.com)\n- Hue again (#6) (a@x.com)\n",
            vec![
                (5, fixtures::issue(5, "alice", &["integration: hue"], None,),),
                (6, fixtures::issue(6, "alice", &["integration: hue"], None,),),
            ],
        )
        .await;

        assert!(document.changes[0].ends_with("([hue docs])"));
        let plain = document.render(Dialect::Plain,);
        let doc_links: Vec<&str,> = plain.lines().filter(|line| line.starts_with("[hue docs]"),).collect();
        assert_eq!(doc_links, vec!["[hue docs]: https://www.home-assistant.io/components/hue/"]);
        assert!(document.render(Dialect::Website).contains("\n[hue docs]: /components/hue/"));
        assert_eq!(plain.matches("[@alice]: ").count(), 1);
    }

    #[tokio::test]
    async fn doc_overrides_apply_by_subject_family()
    {
        let document = build(
            "0.41.0",
            "- A (#1) (a@x.com)\n- B (#2) (a@x.com)\n- C (#3) (a@x.com)\n",
            vec![
                (1, fixtures::issue(1, "a", &["integration: automation.numeric_state"], None,),),
                (2, fixtures::issue(2, "a", &["integration: recorder.purge"], None,),),
                (3, fixtures::issue(3, "a", &["component: cloud.alexa"], None,),),
            ],
        )
        .await;

        let plain = document.render(Dialect::Plain,);
        assert!(plain.contains(
            "[automation.numeric_state docs]: https://www.home-assistant.io/docs/automation/trigger/#numeric-state-trigger"
        ));
        assert!(!plain.contains("recorder.purge docs"));
        assert!(plain.contains("[cloud.alexa docs]: https://www.nabucasa.com/config/"));
        assert!(
            document
                .render(Dialect::Website)
                .contains("[automation.numeric_state docs]: /docs/automation/trigger/#numeric-state-trigger")
        );
    }

    #[test]
    fn automation_anchors_translate_irregular_names()
    {
        assert_eq!(automation_anchor("automation.homeassistant"), "home-assistant");
        assert_eq!(automation_anchor("automation.numeric_state"), "numeric-state");
        assert_eq!(automation_anchor("automation.mqtt"), "mqtt");
        assert_eq!(automation_anchor("automation.time_pattern"), "time_pattern");
    }

    #[tokio::test]
    async fn cherry_picks_are_tracked_only_for_zero_patch()
    {
        let issue = || fixtures::issue(8, "alice", &["cherry-picked"], None,);

        let minor = build("0.41.0", "- Fix (#8) (a@x.com)\n", vec![(8, issue(),)],).await;
        assert!(minor.render(Dialect::Plain).contains("## Beta Fixes\n\n- Fix ([@alice] - [#8]) (beta fix)"));

        let patch = build("0.41.1", "- Fix (#8) (a@x.com)\n", vec![(8, issue(),)],).await;
        let output = patch.render(Dialect::Plain,);
        assert!(!output.contains("Beta Fixes"));
        assert!(!output.contains("(beta fix)"));
    }

    #[tokio::test]
    async fn patch_release_gets_dated_heading_on_website()
    {
        let document = build(
            "0.41.2",
            "- Fix (#9) (a@x.com)\n",
            vec![(9, fixtures::issue(9, "alice", &[], None,),)],
        )
        .await;

        assert!(document.render(Dialect::Website).starts_with("## Release 0.41.2 - October 23\n"));
        assert!(document.render(Dialect::Plain).starts_with("## All changes\n"));
    }

    #[tokio::test]
    async fn entry_in_several_categories_is_listed_in_each()
    {
        let document = build(
            "0.41.0",
            "- New and breaking (#2) (a@x.com)\n",
            vec![(2, fixtures::issue(2, "a", &["breaking change", "new-platform"], None,),)],
        )
        .await;

        let expected = "- New and breaking ([@a] - [#2]) (breaking change) (new-platform)";
        assert_eq!(document.changes, vec![expected]);
        for section in document.sections.iter().filter(|section| !section.entries.is_empty(),) {
            assert_eq!(section.entries, vec![expected]);
        }
        assert_eq!(document.sections.iter().filter(|section| !section.entries.is_empty()).count(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_the_build()
    {
        let client = RateLimitedClient::new(FakeTransport::new(),);
        let mut prs = PrCache::new(&client, RepoRef::new("https://api.test", "o", "r",),);
        let settings = ChangelogSettings::default();
        let release = Release::new("0.41.0", "rc",).expect("valid release",);
        let lines = parse_log("- Missing (#77) (a@x.com)\n",).expect("valid log",);

        let result = ChangelogBuilder::new(&settings,).build(&release, &lines, &mut prs,).await;
        assert!(result.is_err());
    }
}

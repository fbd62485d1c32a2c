// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Organization-wide contributor credits.
//!
//! The crawl walks every public repository of an organization, tallies the
//! contributor list of each one, resolves display names once per login, and
//! attributes anonymous (email only) entries through the commit search. All
//! requests are queued as [`CrawlTask`]s and handled by a fixed pool of tokio
//! workers sharing one [`RateLimitedClient`].

use std::{
    collections::{BTreeMap, HashSet},
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    client::{RateLimitedClient, Transport},
    error::Error,
    queue::WorkQueue,
};

/// Template used when no credits template file is configured.
pub const DEFAULT_CREDITS_TEMPLATE: &str = r#"---
title: "Credits"
description: "Credits for the developers who contributed to {{ organization }}."
date: {{ header_date }}
---

This page contains a list of people who have contributed in one way or another to the {{ organization }} organization. Hover over a name to see the contributions.

### Author
{% if project_owner %}
- [{{ project_owner.name }} (@{{ project_owner.login }})](https://github.com/{{ project_owner.login }} "{{ project_owner.count_summary }}")
{% endif %}
### Contributors

{% for user in all_users -%}
- [{{ user.name }} (@{{ user.login }})](https://github.com/{{ user.login }} "{{ user.count_summary }}")
{% endfor %}
This page is irregularly updated. As a result, some contributors may be missing. Last update: {{ footer_date }}.
"#;

/// Unit of work for the crawl.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum CrawlTask
{
    /// One page of the organization's repository list.
    RepositoryPage
    {
        url: String,
    },
    /// One page of a repository's contributor list, anonymous entries
    /// included.
    ContributorPage
    {
        url: String, repository: Arc<RepositoryInfo,>,
    },
    /// Profile lookup for a login's display name.
    ResolveName
    {
        url: String, login: String,
    },
    /// Commit search attributing an email-only contributor entry.
    ResolveAnonymous
    {
        url:           String,
        email:         String,
        contributions: u64,
        repository:    String,
    },
}

impl CrawlTask
{
    fn url(&self,) -> &str
    {
        match self {
            Self::RepositoryPage {
                url,
            }
            | Self::ContributorPage {
                url, ..
            }
            | Self::ResolveName {
                url, ..
            }
            | Self::ResolveAnonymous {
                url, ..
            } => url,
        }
    }
}

/// Repository details carried by its contributor page tasks.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct RepositoryInfo
{
    pub name:        String,
    /// Commit list URL without the `{/sha}` template suffix.
    pub commits_url: String,
}

#[derive(Debug, Deserialize,)]
struct RepositoryPayload
{
    name:             String,
    contributors_url: String,
    commits_url:      String,
}

#[derive(Debug, Deserialize,)]
#[serde(tag = "type")]
enum ContributorPayload
{
    User
    {
        login: String, url: String, contributions: u64,
    },
    Anonymous
    {
        email: String, contributions: u64,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize,)]
struct ProfilePayload
{
    login: String,
    name:  Option<String,>,
}

#[derive(Debug, Deserialize,)]
struct CommitPayload
{
    author: Option<CommitAccount,>,
    commit: CommitDetails,
}

#[derive(Debug, Deserialize,)]
struct CommitAccount
{
    login: String,
}

#[derive(Debug, Deserialize,)]
struct CommitDetails
{
    author: Option<CommitSignature,>,
}

#[derive(Debug, Deserialize,)]
struct CommitSignature
{
    name: Option<String,>,
}

/// Contribution counts per login and repository, plus the identity caches
/// used and extended during the crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize,)]
pub struct ContributionTally
{
    pub contributions:  BTreeMap<String, BTreeMap<String, u64,>,>,
    pub name_by_login:  BTreeMap<String, String,>,
    pub login_by_email: BTreeMap<String, String,>,
}

impl ContributionTally
{
    /// Starts a tally seeded with cached identities.
    pub fn with_caches(
        name_by_login: BTreeMap<String, String,>,
        login_by_email: BTreeMap<String, String,>,
    ) -> Self
    {
        Self {
            contributions: BTreeMap::new(),
            name_by_login,
            login_by_email,
        }
    }

    /// Adds contributions, summing with any earlier count for the pair.
    pub fn add(&mut self, login: &str, repository: &str, count: u64,)
    {
        *self
            .contributions
            .entry(login.to_owned(),)
            .or_default()
            .entry(repository.to_owned(),)
            .or_default() += count;
    }

    pub fn total(&self, login: &str,) -> u64
    {
        self.contributions.get(login,).map_or(0, |repositories| repositories.values().sum(),)
    }

    /// Display name, falling back to the login.
    pub fn name<'a,>(&'a self, login: &'a str,) -> &'a str
    {
        self.name_by_login
            .get(login,)
            .map(String::as_str,)
            .filter(|name| !name.trim().is_empty(),)
            .unwrap_or(login,)
    }
}

/// Appends query parameters to an absolute URL.
fn with_query(url: &str, query: &[(&str, &str,)],) -> Result<String, Error,>
{
    let mut parsed = Url::parse(url,)
        .map_err(|error| Error::validation(format!("invalid URL '{url}': {error}"),),)?;
    parsed.query_pairs_mut().extend_pairs(query,);
    Ok(parsed.into(),)
}

fn lock<V,>(mutex: &Mutex<V,>,) -> MutexGuard<'_, V,>
{
    mutex.lock().unwrap_or_else(PoisonError::into_inner,)
}

struct CrawlState<T,>
{
    client:    Arc<RateLimitedClient<T,>,>,
    queue:     WorkQueue<CrawlTask,>,
    tally:     Mutex<ContributionTally,>,
    requested: Mutex<HashSet<String,>,>,
    failure:   Mutex<Option<Error,>,>,
    per_page:  String,
}

impl<T: Transport,> CrawlState<T,>
{
    async fn work(&self, progress: &ProgressBar,)
    {
        while let Some(task,) = self.queue.next().await {
            if lock(&self.failure,).is_none() {
                let fatal = matches!(task, CrawlTask::RepositoryPage { .. });
                let url = task.url().to_owned();
                if let Err(error,) = self.handle(task,).await {
                    if fatal {
                        lock(&self.failure,).get_or_insert(error,);
                    } else {
                        warn!("skipping {}: {}", url, error);
                    }
                }
            }
            self.queue.task_done();

            progress.inc(1,);
            let (logins, names,) = {
                let tally = lock(&self.tally,);
                (tally.contributions.len(), tally.name_by_login.len(),)
            };
            progress.set_message(format!(
                "{} contributors, {} names, {} queued",
                logins,
                names,
                self.queue.pending()
            ),);
        }
    }

    async fn handle(&self, task: CrawlTask,) -> Result<(), Error,>
    {
        match task {
            CrawlTask::RepositoryPage {
                url,
            } => {
                let response = self.client.get(&url, &[],).await?.ensure_success()?;
                if let Some(next,) = response.next_link() {
                    self.queue.push(CrawlTask::RepositoryPage {
                        url: next,
                    },);
                }

                let repositories: Vec<RepositoryPayload,> = response.json()?;
                debug!("{} repositories on {}", repositories.len(), url);
                for repository in repositories {
                    let url = with_query(&repository.contributors_url, &[
                        ("anon", "true",),
                        ("per_page", &self.per_page,),
                    ],)?;
                    let repository = Arc::new(RepositoryInfo {
                        name:        repository.name,
                        commits_url: repository.commits_url.trim_end_matches("{/sha}",).to_owned(),
                    },);
                    self.queue.push(CrawlTask::ContributorPage {
                        url,
                        repository,
                    },);
                }
            }
            CrawlTask::ContributorPage {
                url,
                repository,
            } => {
                let response = self.client.get(&url, &[],).await?.ensure_success()?;
                if let Some(next,) = response.next_link() {
                    self.queue.push(CrawlTask::ContributorPage {
                        url:        next,
                        repository: Arc::clone(&repository,),
                    },);
                }

                let contributors: Vec<ContributorPayload,> = response.json()?;
                for contributor in contributors {
                    self.record_contributor(contributor, &repository,)?;
                }
            }
            CrawlTask::ResolveName {
                url,
                login,
            } => {
                let profile: ProfilePayload =
                    self.client.get(&url, &[],).await?.ensure_success()?.json()?;
                let name = profile.name.filter(|name| !name.trim().is_empty(),).unwrap_or(profile.login,);
                lock(&self.tally,).name_by_login.insert(login, name,);
            }
            CrawlTask::ResolveAnonymous {
                url,
                email,
                contributions,
                repository,
            } => {
                let commits: Vec<CommitPayload,> =
                    self.client.get(&url, &[],).await?.ensure_success()?.json()?;
                let Some(commit,) = commits.into_iter().next() else {
                    debug!("no commits by {} in {}, dropping", email, repository);
                    return Ok((),);
                };
                let Some(account,) = commit.author else {
                    debug!("{} is not linked to an account, dropping", email);
                    return Ok((),);
                };

                let mut tally = lock(&self.tally,);
                tally.add(&account.login, &repository, contributions,);
                tally.login_by_email.insert(email, account.login.clone(),);
                if let Some(name,) = commit.commit.author.and_then(|signature| signature.name,) {
                    tally.name_by_login.entry(account.login,).or_insert(name,);
                }
            }
        }

        Ok((),)
    }

    fn record_contributor(
        &self,
        contributor: ContributorPayload,
        repository: &RepositoryInfo,
    ) -> Result<(), Error,>
    {
        match contributor {
            ContributorPayload::User {
                login,
                url,
                contributions,
            } => {
                let known = {
                    let mut tally = lock(&self.tally,);
                    tally.add(&login, &repository.name, contributions,);
                    tally.name_by_login.contains_key(&login,)
                };
                if !known && lock(&self.requested,).insert(login.clone(),) {
                    self.queue.push(CrawlTask::ResolveName {
                        url,
                        login,
                    },);
                }
            }
            ContributorPayload::Anonymous {
                email,
                contributions,
            } => {
                let mut tally = lock(&self.tally,);
                let cached =
                    tally.login_by_email.get(&email,).filter(|login| !login.is_empty(),).cloned();
                match cached {
                    Some(login,) => tally.add(&login, &repository.name, contributions,),
                    None => {
                        drop(tally,);
                        let url = with_query(&repository.commits_url, &[
                            ("author", &email,),
                            ("per_page", "1",),
                        ],)?;
                        self.queue.push(CrawlTask::ResolveAnonymous {
                            url,
                            email,
                            contributions,
                            repository: repository.name.clone(),
                        },);
                    }
                }
            }
            ContributorPayload::Other => debug!("ignoring non-user contributor in {}", repository.name),
        }
        Ok((),)
    }
}

/// Crawls an organization with a pool of concurrent workers.
pub struct CreditAggregator<T,>
{
    client:      Arc<RateLimitedClient<T,>,>,
    api_url:     String,
    concurrency: usize,
    per_page:    u32,
    quiet:       bool,
}

impl<T: Transport + 'static,> CreditAggregator<T,>
{
    pub fn new(client: Arc<RateLimitedClient<T,>,>, api_url: &str,) -> Self
    {
        Self {
            client,
            api_url: api_url.trim_end_matches('/',).to_owned(),
            concurrency: 63,
            per_page: 100,
            quiet: false,
        }
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: usize,) -> Self
    {
        self.concurrency = concurrency.max(1,);
        self
    }

    #[must_use]
    pub fn per_page(mut self, per_page: u32,) -> Self
    {
        self.per_page = per_page;
        self
    }

    /// Hides the progress spinner.
    #[must_use]
    pub fn quiet(mut self, quiet: bool,) -> Self
    {
        self.quiet = quiet;
        self
    }

    /// Tallies every contribution to the organization's public repositories.
    ///
    /// `known` seeds the identity caches; the returned tally carries them
    /// extended with everything resolved during the crawl.
    ///
    /// # Errors
    ///
    /// A failed repository list page aborts the crawl. Failures of individual
    /// contributor, profile or commit lookups are logged and skipped.
    pub async fn aggregate(
        &self,
        organization: &str,
        known: ContributionTally,
    ) -> Result<ContributionTally, Error,>
    {
        let per_page = self.per_page.to_string();
        let url = with_query(&format!("{}/orgs/{}/repos", self.api_url, organization), &[
            ("type", "public",),
            ("per_page", &per_page,),
        ],)?;

        let state = Arc::new(CrawlState {
            client: Arc::clone(&self.client,),
            queue: WorkQueue::new(),
            tally: Mutex::new(known,),
            requested: Mutex::new(HashSet::new(),),
            failure: Mutex::new(None,),
            per_page,
        },);
        state.queue.push(CrawlTask::RepositoryPage {
            url,
        },);

        let progress = if self.quiet { ProgressBar::hidden() } else { ProgressBar::new_spinner() };
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.yellow} [{elapsed_precise}] {pos} requests, {msg}",)
                .unwrap_or_else(|_| ProgressStyle::default_spinner(),),
        );
        progress.enable_steady_tick(Duration::from_millis(120,),);

        info!("crawling {} with {} workers", organization, self.concurrency);
        let mut workers = Vec::with_capacity(self.concurrency,);
        for _ in 0..self.concurrency {
            let state = Arc::clone(&state,);
            let progress = progress.clone();
            workers.push(tokio::spawn(async move { state.work(&progress,).await },),);
        }
        for worker in workers {
            worker.await.map_err(|error| Error::Service {
                message: format!("credits worker failed: {error}"),
            },)?;
        }
        progress.finish_and_clear();

        if let Some(error,) = lock(&state.failure,).take() {
            return Err(error,);
        }

        let tally = mem::take(&mut *lock(&state.tally,),);
        info!("{} contributors found", tally.contributions.len());
        Ok(tally,)
    }
}

/// One contributor on the credits page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct CreditEntry
{
    pub login:         String,
    /// Markdown-escaped display name.
    pub name:          String,
    pub count_summary: String,
    pub total:         u64,
}

/// Data handed to the credits template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct CreditsContext
{
    pub organization:  String,
    pub all_users:     Vec<CreditEntry,>,
    pub project_owner: Option<CreditEntry,>,
    pub header_date:   String,
    pub footer_date:   String,
}

/// Strips a leading `@` and backslash-escapes markdown-special characters.
///
/// # Examples
///
/// ```
/// use relnotes::escape_markdown;
///
/// assert_eq!(escape_markdown("@jane_doe [bot]"), r"jane\_doe \[bot\]");
/// ```
pub fn escape_markdown(name: &str,) -> String
{
    const SPECIAL: &str = "\\`*_{}[]()#+,-.!~|";

    let name = name.strip_prefix('@',).unwrap_or(name,);
    let mut escaped = String::with_capacity(name.len(),);
    for character in name.chars() {
        if SPECIAL.contains(character,) {
            escaped.push('\\',);
        }
        escaped.push(character,);
    }
    escaped
}

/// Builds the "N total commits" summary, repositories by descending count.
fn count_summary(organization: &str, repositories: &BTreeMap<String, u64,>,) -> String
{
    let mut ordered: Vec<(&String, &u64,),> = repositories.iter().collect();
    ordered.sort_by(|left, right| right.1.cmp(left.1,),);

    let total: u64 = repositories.values().sum();
    let mut summary = format!("{total} total commits to the {organization} organization:\n");
    for (repository, count,) in ordered {
        let noun = if *count > 1 { "commits" } else { "commit" };
        summary.push_str(&format!("{count} {noun} to {repository}\n"),);
    }
    summary
}

/// Arranges a tally for the credits template.
///
/// `organization` is the display name used in the page text, not the
/// organization's login.
pub fn credits_context(
    tally: &ContributionTally,
    organization: &str,
    project_owner: &str,
    generated_at: DateTime<Utc,>,
) -> CreditsContext
{
    let mut owner = None;
    let mut all_users = Vec::with_capacity(tally.contributions.len(),);

    for (login, repositories,) in &tally.contributions {
        let entry = CreditEntry {
            login:         login.clone(),
            name:          escape_markdown(tally.name(login,),),
            count_summary: count_summary(organization, repositories,),
            total:         repositories.values().sum(),
        };
        if login == project_owner {
            owner = Some(entry,);
        } else {
            all_users.push(entry,);
        }
    }
    all_users.sort_by_cached_key(|entry| entry.name.to_lowercase(),);

    CreditsContext {
        organization: organization.to_owned(),
        all_users,
        project_owner: owner,
        header_date: generated_at.format("%Y-%m-%d, %H:%M:%S +0000",).to_string(),
        footer_date: generated_at.format("%A, %B %d %Y, %H:%M:%S UTC",).to_string(),
    }
}

/// Renders the credits page with a tera template.
///
/// # Errors
///
/// Returns [`Error::Template`] when the template is invalid or references
/// missing values.
pub fn render_credits(context: &CreditsContext, template: &str,) -> Result<String, Error,>
{
    let context = Context::from_serialize(context,)?;
    Ok(Tera::one_off(template, &context, false,)?,)
}

#[cfg(test)]
mod tests
{
    use std::{collections::BTreeMap, sync::Arc};

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{
        ContributionTally, CreditAggregator, DEFAULT_CREDITS_TEMPLATE, credits_context,
        escape_markdown, render_credits,
    };
    use crate::{client::RateLimitedClient, config::Settings, testing::FakeTransport};

    const REPOS: &str = "https://api.test/orgs/org/repos?type=public&per_page=100";
    const CORE: &str = "https://api.test/repos/org/core/contributors?anon=true&per_page=100";
    const FRONTEND: &str = "https://api.test/repos/org/frontend/contributors?anon=true&per_page=100";

    fn repository(name: &str,) -> serde_json::Value
    {
        json!({
            "name": name,
            "contributors_url": format!("https://api.test/repos/org/{name}/contributors"),
            "commits_url": format!("https://api.test/repos/org/{name}/commits{{/sha}}"),
        })
    }

    fn transport() -> FakeTransport
    {
        FakeTransport::new()
            .json(REPOS, json!([repository("core"), repository("frontend")]),)
            .json(
                CORE,
                json!([
                    {"type": "User", "login": "alice", "url": "https://api.test/users/alice", "contributions": 10},
                    {"type": "Anonymous", "email": "a2@x.com", "contributions": 3},
                    {"type": "Anonymous", "email": "ghost@x.com", "contributions": 2},
                    {"type": "Bot", "login": "bot", "url": "https://api.test/users/bot", "contributions": 50},
                ]),
            )
            .json(
                FRONTEND,
                json!([
                    {"type": "User", "login": "alice", "url": "https://api.test/users/alice", "contributions": 5},
                    {"type": "User", "login": "bob", "url": "https://api.test/users/bob", "contributions": 1},
                ]),
            )
            .json("https://api.test/users/alice", json!({"login": "alice", "name": "Alice A"}),)
            .json("https://api.test/users/bob", json!({"login": "bob", "name": null}),)
            .json(
                "https://api.test/repos/org/core/commits?author=a2%40x.com&per_page=1",
                json!([{"author": {"login": "alice"}, "commit": {"author": {"name": "Alice"}}}]),
            )
            .json(
                "https://api.test/repos/org/core/commits?author=ghost%40x.com&per_page=1",
                json!([{"author": null, "commit": {"author": {"name": "Ghost"}}}]),
            )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn aggregates_contributions_across_repositories_and_emails()
    {
        let client = Arc::new(RateLimitedClient::new(transport(),),);
        let aggregator =
            CreditAggregator::new(Arc::clone(&client,), "https://api.test",).concurrency(4,).quiet(true,);

        let tally = aggregator
            .aggregate("org", ContributionTally::default(),)
            .await
            .expect("crawl succeeds",);

        assert_eq!(tally.contributions["alice"]["core"], 13);
        assert_eq!(tally.contributions["alice"]["frontend"], 5);
        assert_eq!(tally.total("alice"), 18);
        assert_eq!(tally.total("bob"), 1);
        assert!(!tally.contributions.contains_key("bot"));
        assert_eq!(tally.contributions.len(), 2);
        assert_eq!(tally.name("alice"), "Alice A");
        assert_eq!(tally.name("bob"), "bob");
        assert_eq!(tally.login_by_email.get("a2@x.com").map(String::as_str), Some("alice"));
        assert!(!tally.login_by_email.contains_key("ghost@x.com"));

        let profile_lookups = client
            .transport()
            .requests()
            .iter()
            .filter(|url| url.as_str() == "https://api.test/users/alice",)
            .count();
        assert_eq!(profile_lookups, 1);
    }

    #[tokio::test]
    async fn cached_identities_skip_lookups()
    {
        let client = Arc::new(RateLimitedClient::new(transport(),),);
        let known = ContributionTally::with_caches(
            BTreeMap::from([("alice".to_owned(), "Cached Alice".to_owned(),), ("bob".to_owned(), "Bob".to_owned(),)],),
            BTreeMap::from([("a2@x.com".to_owned(), "alice".to_owned(),)],),
        );

        let tally = CreditAggregator::new(Arc::clone(&client,), "https://api.test",)
            .concurrency(2,)
            .quiet(true,)
            .aggregate("org", known,)
            .await
            .expect("crawl succeeds",);

        assert_eq!(tally.contributions["alice"]["core"], 13);
        assert_eq!(tally.name("alice"), "Cached Alice");
        let requests = client.transport().requests();
        assert!(!requests.iter().any(|url| url.contains("/users/")));
        assert!(!requests.iter().any(|url| url.contains("author=a2")));
    }

    #[tokio::test]
    async fn failed_repository_listing_aborts()
    {
        let client = Arc::new(RateLimitedClient::new(FakeTransport::new(),),);
        let result = CreditAggregator::new(client, "https://api.test",)
            .concurrency(3,)
            .quiet(true,)
            .aggregate("org", ContributionTally::default(),)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failed_contributor_page_is_skipped()
    {
        let transport = FakeTransport::new()
            .json(REPOS, json!([repository("core"), repository("frontend")]),)
            .json(
                FRONTEND,
                json!([{"type": "User", "login": "bob", "url": "https://api.test/users/bob", "contributions": 4}]),
            )
            .json("https://api.test/users/bob", json!({"login": "bob", "name": "Bob"}),);
        let client = Arc::new(RateLimitedClient::new(transport,),);

        let tally = CreditAggregator::new(client, "https://api.test",)
            .quiet(true,)
            .aggregate("org", ContributionTally::default(),)
            .await
            .expect("contributor failures are not fatal",);
        assert_eq!(tally.total("bob"), 4);
    }

    #[test]
    fn escapes_markdown_and_strips_leading_at()
    {
        assert_eq!(escape_markdown("@someone"), "someone");
        assert_eq!(escape_markdown("a*b_c"), r"a\*b\_c");
        assert_eq!(escape_markdown("Jean-Luc P. (JL)"), r"Jean\-Luc P\. \(JL\)");
        assert_eq!(escape_markdown("x, y!"), r"x\, y\!");
    }

    #[test]
    fn context_separates_owner_and_sorts_case_insensitively()
    {
        let mut tally = ContributionTally::default();
        tally.add("balloob", "core", 500,);
        tally.add("zed", "core", 2,);
        tally.add("amy", "frontend", 1,);
        tally.add("amy", "core", 7,);
        tally.name_by_login.insert("zed".to_owned(), "alpha".to_owned(),);
        tally.name_by_login.insert("amy".to_owned(), "Beta".to_owned(),);

        let generated_at = Utc.with_ymd_and_hms(2019, 10, 23, 12, 0, 0,).single().expect("valid timestamp",);
        let settings = Settings::default();
        let context =
            credits_context(&tally, &settings.github.organization_name, "balloob", generated_at,);

        let names: Vec<&str,> = context.all_users.iter().map(|user| user.name.as_str(),).collect();
        assert_eq!(names, vec!["alpha", "Beta"]);
        assert_eq!(context.project_owner.as_ref().map(|owner| owner.login.as_str()), Some("balloob"));
        assert_eq!(
            context.all_users[1].count_summary,
            "8 total commits to the Home Assistant organization:\n7 commits to core\n1 commit to frontend\n"
        );
        assert_eq!(context.header_date, "2019-10-23, 12:00:00 +0000");
        assert_eq!(context.footer_date, "Wednesday, October 23 2019, 12:00:00 UTC");
    }

    #[test]
    fn default_template_renders_all_users()
    {
        let mut tally = ContributionTally::default();
        tally.add("balloob", "core", 3,);
        tally.add("alice", "core", 1,);
        let context = credits_context(&tally, "org", "balloob", Utc::now(),);

        let page = render_credits(&context, DEFAULT_CREDITS_TEMPLATE,).expect("template renders",);
        assert!(page.contains("- [alice (@alice)](https://github.com/alice \"1 total commits"));
        assert!(page.contains("- [balloob (@balloob)]"));
        assert_eq!(page.matches("(@balloob)").count(), 1);
    }

    #[test]
    fn invalid_template_is_reported()
    {
        let context = credits_context(&ContributionTally::default(), "org", "owner", Utc::now(),);
        assert!(render_credits(&context, "{% for user in %}").is_err());
    }
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Pull request metadata and the run-scoped cache that fetches it.
use std::collections::{BTreeSet, HashMap, hash_map::Entry};

use serde::{Deserialize, Serialize};

use crate::{
    client::{RateLimitedClient, Transport},
    error::Error,
    github::{self, RepoRef},
};

/// Milestone attached to an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Milestone
{
    pub number: u64,
    pub title:  String,
    #[serde(default)]
    pub state:  String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Author
{
    pub login:    String,
    pub html_url: String,
}

/// Merge outcome, only available from the pulls endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct MergeState
{
    pub merged:           bool,
    pub merge_commit_sha: Option<String,>,
}

/// Pull request as used by the changelog and identity resolution.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct PullRequestRef
{
    pub number:    u64,
    pub title:     String,
    pub labels:    BTreeSet<String,>,
    pub milestone: Option<Milestone,>,
    pub author:    Author,
    pub html_url:  String,
    pub state:     String,
    pub body:      Option<String,>,
    /// Filled lazily by [`PrCache::merge_state`].
    pub merge:     Option<MergeState,>,
}

impl PullRequestRef
{
    pub fn has_label(&self, label: &str,) -> bool
    {
        self.labels.contains(label,)
    }
}

#[derive(Debug, Deserialize,)]
struct LabelPayload
{
    name: String,
}

/// Shape of the issues endpoint payload.
#[derive(Debug, Deserialize,)]
pub(crate) struct IssuePayload
{
    number:                  u64,
    #[serde(default)]
    title:                   String,
    #[serde(default)]
    labels:                  Vec<LabelPayload,>,
    milestone:               Option<Milestone,>,
    user:                    Author,
    html_url:                String,
    #[serde(default)]
    state:                   String,
    body:                    Option<String,>,
    /// Present only when the issue is a pull request.
    pub(crate) pull_request: Option<serde_json::Value,>,
}

impl From<IssuePayload,> for PullRequestRef
{
    fn from(payload: IssuePayload,) -> Self
    {
        Self {
            number:    payload.number,
            title:     payload.title,
            labels:    payload.labels.into_iter().map(|label| label.name,).collect(),
            milestone: payload.milestone,
            author:    payload.user,
            html_url:  payload.html_url,
            state:     payload.state,
            body:      payload.body,
            merge:     None,
        }
    }
}

/// In-memory cache of pull requests for one run, keyed by number.
///
/// Each pull request is fetched at most once; merge state costs a second
/// request and is only fetched when asked for.
pub struct PrCache<'c, T,>
{
    client:  &'c RateLimitedClient<T,>,
    repo:    RepoRef,
    entries: HashMap<u64, PullRequestRef,>,
}

impl<'c, T: Transport,> PrCache<'c, T,>
{
    pub fn new(client: &'c RateLimitedClient<T,>, repo: RepoRef,) -> Self
    {
        Self {
            client,
            repo,
            entries: HashMap::new(),
        }
    }

    pub fn repo(&self,) -> &RepoRef
    {
        &self.repo
    }

    /// Returns the pull request, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding failures.
    pub async fn get(&mut self, number: u64,) -> Result<&PullRequestRef, Error,>
    {
        match self.entries.entry(number,) {
            Entry::Occupied(entry,) => Ok(entry.into_mut(),),
            Entry::Vacant(entry,) => {
                let pull_request = github::issue(self.client, &self.repo, number,).await?;
                Ok(entry.insert(pull_request,),)
            }
        }
    }

    /// Seeds the cache with a pull request fetched through another listing.
    pub fn insert(&mut self, pull_request: PullRequestRef,)
    {
        self.entries.insert(pull_request.number, pull_request,);
    }

    /// Returns the merge state, fetching the pulls endpoint on first use.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding failures.
    pub async fn merge_state(&mut self, number: u64,) -> Result<MergeState, Error,>
    {
        if let Some(merge,) = &self.get(number,).await?.merge {
            return Ok(merge.clone(),);
        }

        let merge = github::pull_merge_state(self.client, &self.repo, number,).await?;
        if let Some(entry,) = self.entries.get_mut(&number,) {
            entry.merge = Some(merge.clone(),);
        }
        Ok(merge,)
    }

    pub fn len(&self,) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self,) -> bool
    {
        self.entries.is_empty()
    }
}


#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::{IssuePayload, PrCache, PullRequestRef, fixtures};
    use crate::{client::RateLimitedClient, github::RepoRef, testing::FakeTransport};

    fn repo() -> RepoRef
    {
        RepoRef::new("https://api.test", "o", "r",)
    }

    #[tokio::test]
    async fn fetches_each_pull_request_once()
    {
        let transport = FakeTransport::new().json(
            "https://api.test/repos/o/r/issues/10",
            fixtures::issue(10, "alice", &["breaking change"], Some("0.41",),),
        );
        let client = RateLimitedClient::new(transport,);
        let mut cache = PrCache::new(&client, repo(),);

        let first = cache.get(10,).await.expect("pull request fetched",).clone();
        let second = cache.get(10,).await.expect("pull request cached",).clone();

        assert_eq!(first, second);
        assert_eq!(first.author.login, "alice");
        assert!(first.has_label("breaking change"));
        assert_eq!(first.milestone.map(|milestone| milestone.title).as_deref(), Some("0.41"));
        assert_eq!(client.transport().requests().len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn merge_state_is_fetched_lazily_and_cached()
    {
        let transport = FakeTransport::new()
            .json("https://api.test/repos/o/r/issues/7", fixtures::issue(7, "bob", &[], None,),)
            .json(
                "https://api.test/repos/o/r/pulls/7",
                json!({"number": 7, "merged": true, "merge_commit_sha": "abc123"}),
            );
        let client = RateLimitedClient::new(transport,);
        let mut cache = PrCache::new(&client, repo(),);

        cache.get(7,).await.expect("pull request fetched",);
        assert_eq!(client.transport().requests().len(), 1);

        let merge = cache.merge_state(7,).await.expect("merge state fetched",);
        assert!(merge.merged);
        assert_eq!(merge.merge_commit_sha.as_deref(), Some("abc123"));

        cache.merge_state(7,).await.expect("merge state cached",);
        assert_eq!(client.transport().requests().len(), 2);
    }

    #[tokio::test]
    async fn seeded_pull_requests_skip_the_issue_lookup()
    {
        let transport = FakeTransport::new().json(
            "https://api.test/repos/o/r/pulls/5",
            json!({"number": 5, "merged": false, "merge_commit_sha": null}),
        );
        let client = RateLimitedClient::new(transport,);
        let mut cache = PrCache::new(&client, repo(),);
        let payload: IssuePayload =
            serde_json::from_value(fixtures::issue(5, "carol", &[], None,),).expect("payload decodes",);
        cache.insert(PullRequestRef::from(payload,),);

        let merge = cache.merge_state(5,).await.expect("merge state fetched",);

        assert!(!merge.merged);
        assert_eq!(client.transport().requests(), vec!["https://api.test/repos/o/r/pulls/5".to_string()]);
    }

    #[tokio::test]
    async fn missing_pull_request_is_an_error()
    {
        let client = RateLimitedClient::new(FakeTransport::new(),);
        let mut cache = PrCache::new(&client, repo(),);

        assert!(cache.get(404).await.is_err());
        assert!(cache.is_empty());
    }
}

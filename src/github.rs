// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Typed wrappers over the REST endpoints the tool reads.
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, info};

use crate::{
    client::{RateLimitedClient, Transport},
    config::GithubSettings,
    error::Error,
    pull_request::{IssuePayload, MergeState, Milestone, PullRequestRef},
    release::Version,
};

/// Coordinates of one repository on one API host.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct RepoRef
{
    api_url: String,
    owner:   String,
    name:    String,
}

impl RepoRef
{
    pub fn new(api_url: &str, owner: &str, name: &str,) -> Self
    {
        Self {
            api_url: api_url.trim_end_matches('/',).to_owned(),
            owner:   owner.to_owned(),
            name:    name.to_owned(),
        }
    }

    /// The configured main repository.
    pub fn from_settings(settings: &GithubSettings,) -> Self
    {
        Self::new(&settings.api_url, &settings.organization, &settings.repository,)
    }

    /// Sibling repository under the same owner.
    pub fn with_name(&self, name: &str,) -> Self
    {
        Self::new(&self.api_url, &self.owner, name,)
    }

    pub fn owner(&self,) -> &str
    {
        &self.owner
    }

    pub fn name(&self,) -> &str
    {
        &self.name
    }

    /// `owner/name`.
    pub fn full_name(&self,) -> String
    {
        format!("{}/{}", self.owner, self.name)
    }

    /// Absolute URL of a repository-scoped endpoint.
    pub fn endpoint(&self, path: &str,) -> String
    {
        format!("{}/repos/{}/{}/{}", self.api_url, self.owner, self.name, path)
    }
}

/// Fetches a single JSON document.
///
/// # Errors
///
/// Returns [`Error::Remote`] for non-2xx statuses and [`Error::Decode`] when
/// the body does not match `D`.
pub async fn fetch_json<T: Transport, D: DeserializeOwned,>(
    client: &RateLimitedClient<T,>,
    url: &str,
    query: &[(&str, &str,)],
) -> Result<D, Error,>
{
    client.get(url, query,).await?.ensure_success()?.json()
}

/// Fetches every page of a list endpoint by following `rel="next"` links.
///
/// # Errors
///
/// See [`fetch_json`].
pub async fn fetch_all_pages<T: Transport, D: DeserializeOwned,>(
    client: &RateLimitedClient<T,>,
    url: &str,
    query: &[(&str, &str,)],
) -> Result<Vec<D,>, Error,>
{
    let mut items = Vec::new();
    let mut response = client.get(url, query,).await?.ensure_success()?;

    loop {
        let mut page: Vec<D,> = response.json()?;
        items.append(&mut page,);

        match response.next_link() {
            Some(next,) => {
                debug!("following next page {}", next);
                response = client.get(&next, &[],).await?.ensure_success()?;
            }
            None => return Ok(items,),
        }
    }
}

/// Fetches an issue (pull requests are issues) by number.
///
/// # Errors
///
/// See [`fetch_json`].
pub async fn issue<T: Transport,>(
    client: &RateLimitedClient<T,>,
    repo: &RepoRef,
    number: u64,
) -> Result<PullRequestRef, Error,>
{
    let payload: IssuePayload =
        fetch_json(client, &repo.endpoint(&format!("issues/{number}"),), &[],).await?;
    Ok(payload.into(),)
}

/// Fetches the merge state of a pull request.
///
/// # Errors
///
/// See [`fetch_json`].
pub async fn pull_merge_state<T: Transport,>(
    client: &RateLimitedClient<T,>,
    repo: &RepoRef,
    number: u64,
) -> Result<MergeState, Error,>
{
    #[derive(Deserialize,)]
    struct PullPayload
    {
        #[serde(default)]
        merged:           bool,
        merge_commit_sha: Option<String,>,
    }

    let payload: PullPayload =
        fetch_json(client, &repo.endpoint(&format!("pulls/{number}"),), &[],).await?;
    Ok(MergeState {
        merged:           payload.merged,
        merge_commit_sha: payload.merge_commit_sha,
    },)
}

/// Lists the open milestones of a repository.
///
/// # Errors
///
/// See [`fetch_json`].
pub async fn open_milestones<T: Transport,>(
    client: &RateLimitedClient<T,>,
    repo: &RepoRef,
) -> Result<Vec<Milestone,>, Error,>
{
    fetch_all_pages(client, &repo.endpoint("milestones",), &[("state", "open",)],).await
}

/// Finds an open milestone by exact title.
///
/// # Errors
///
/// Returns [`Error::MilestoneNotFound`] listing the open titles when none
/// matches.
pub async fn milestone_by_title<T: Transport,>(
    client: &RateLimitedClient<T,>,
    repo: &RepoRef,
    title: &str,
) -> Result<Milestone, Error,>
{
    let milestones = open_milestones(client, repo,).await?;
    let available = milestones
        .iter()
        .map(|milestone| milestone.title.as_str(),)
        .collect::<Vec<_,>>()
        .join(", ",);

    milestones.iter().find(|milestone| milestone.title == title,).cloned().ok_or_else(|| {
        Error::MilestoneNotFound {
            title: title.to_owned(),
            available,
        }
    },)
}

/// Returns the open milestone with the highest version title.
///
/// # Errors
///
/// Returns [`Error::NoOpenMilestones`] when no open milestone title parses as
/// a version.
pub async fn latest_version_milestone<T: Transport,>(
    client: &RateLimitedClient<T,>,
    repo: &RepoRef,
) -> Result<(Milestone, Version,), Error,>
{
    open_milestones(client, repo,)
        .await?
        .into_iter()
        .filter_map(|milestone| {
            Version::parse(&milestone.title,).ok().map(|version| (milestone, version,),)
        },)
        .max_by(|(_, left,), (_, right,)| left.cmp(right,),)
        .ok_or_else(|| Error::NoOpenMilestones {
            repository: repo.full_name(),
        },)
}

/// Lists the closed pull requests assigned to a milestone.
///
/// # Errors
///
/// See [`fetch_json`].
pub async fn milestone_pull_requests<T: Transport,>(
    client: &RateLimitedClient<T,>,
    repo: &RepoRef,
    milestone: &Milestone,
) -> Result<Vec<PullRequestRef,>, Error,>
{
    let number = milestone.number.to_string();
    let issues: Vec<IssuePayload,> = fetch_all_pages(
        client,
        &repo.endpoint("issues",),
        &[("milestone", number.as_str(),), ("state", "closed",)],
    )
    .await?;

    Ok(issues
        .into_iter()
        .filter(|issue| issue.pull_request.is_some(),)
        .map(PullRequestRef::from,)
        .collect(),)
}

/// Confirms the configured credentials before any other network work.
///
/// Returns the authenticated login.
///
/// # Errors
///
/// Returns [`Error::Authentication`] when the API rejects the token.
pub async fn verify_credentials<T: Transport,>(
    client: &RateLimitedClient<T,>,
    api_url: &str,
) -> Result<String, Error,>
{
    #[derive(Deserialize,)]
    struct UserPayload
    {
        login: String,
    }

    let url = format!("{}/user", api_url.trim_end_matches('/',));
    let response = client.get(&url, &[],).await?;
    if response.status == 401 {
        return Err(Error::authentication("the API rejected the configured token",),);
    }

    let response = response.ensure_success()?;
    if let Some(remaining,) = response.rate_limit_remaining() {
        info!("API quota remaining: {}", remaining);
    }
    let user: UserPayload = response.json()?;
    Ok(user.login,)
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Finds documentation pull requests that a release still waits on.
use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, warn};

use crate::{
    client::{RateLimitedClient, Transport},
    error::Error,
    github::RepoRef,
    log_line::LogLine,
    pull_request::PrCache,
};

/// Release pull request paired with its still-open documentation pull request.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct UnmergedDoc
{
    pub title:    String,
    pub docs_url: String,
}

/// Matches `owner/docs_repository#123` references in pull request bodies.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the escaped pattern fails to compile.
pub fn docs_reference_pattern(owner: &str, docs_repository: &str,) -> Result<Regex, Error,>
{
    let pattern = format!("{}/{}#(\\d+)", regex::escape(owner,), regex::escape(docs_repository,));
    Regex::new(&pattern,).map_err(|error| Error::validation(format!("invalid docs pattern: {error}"),),)
}

/// Collects referenced documentation pull requests that are not closed yet.
///
/// Each release pull request is inspected once, in log order. Only the first
/// documentation reference in a body is followed.
///
/// # Errors
///
/// Propagates request and decoding failures.
pub async fn unmerged_docs<T: Transport,>(
    client: &RateLimitedClient<T,>,
    repo: &RepoRef,
    docs_repository: &str,
    lines: &[LogLine],
) -> Result<Vec<UnmergedDoc,>, Error,>
{
    let pattern = docs_reference_pattern(repo.owner(), docs_repository,)?;
    let mut release_prs = PrCache::new(client, repo.clone(),);
    let mut docs_prs = PrCache::new(client, repo.with_name(docs_repository,),);
    let mut seen = HashSet::new();
    let mut pending = Vec::new();

    for line in lines {
        let Some(number,) = line.pull_request else {
            continue;
        };
        if !seen.insert(number,) {
            continue;
        }

        let release_pr = release_prs.get(number,).await?;
        let Some(docs_number,) = release_pr
            .body
            .as_deref()
            .and_then(|body| pattern.captures(body,),)
            .and_then(|captures| captures[1].parse::<u64,>().ok(),)
        else {
            continue;
        };
        let title = release_pr.title.clone();

        let docs_pr = match docs_prs.get(docs_number,).await {
            Ok(docs_pr,) => docs_pr,
            Err(error,) => {
                warn!(pull_request = number, docs = docs_number, %error, "docs pull request lookup failed");
                continue;
            }
        };
        if docs_pr.state == "closed" {
            debug!(pull_request = number, docs = docs_number, "docs already merged");
            continue;
        }

        pending.push(UnmergedDoc {
            title,
            docs_url: docs_pr.html_url.clone(),
        },);
    }

    Ok(pending,)
}

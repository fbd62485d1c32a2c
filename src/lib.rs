// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Release tooling for a project hosted on GitHub.
//!
//! The library turns the commit log of a release branch into release notes,
//! maps commit author emails to GitHub logins, and tallies contributions
//! across an organization for the credits page. Every request goes through a
//! shared rate-limit aware client, so long runs pause on quota exhaustion
//! instead of failing.

mod changelog;
mod client;
mod config;
mod credits;
mod docs;
mod error;
mod git;
mod github;
mod identity;
mod log_line;
mod pull_request;
mod queue;
mod release;
#[cfg(test)]
mod testing;

pub use changelog::{
    ChangelogBuilder, ChangelogDocument, Dialect, DocTarget, Link, Section, automation_anchor,
};
pub use client::{ApiResponse, OctocrabTransport, RateLimitedClient, RetryConfig, Transport};
pub use config::{
    CategorySettings, ChangelogSettings, CreditSettings, DocAction, DocOverride, GitSettings,
    GithubSettings, PathSettings, Settings,
};
pub use credits::{
    ContributionTally, CrawlTask, CreditAggregator, CreditEntry, CreditsContext,
    DEFAULT_CREDITS_TEMPLATE, RepositoryInfo, credits_context, escape_markdown, render_credits,
};
pub use docs::{UnmergedDoc, docs_reference_pattern, unmerged_docs};
pub use error::{Error, io_error};
pub use git::{commit_log, parse_version_constants, project_version};
pub use github::{
    RepoRef, fetch_all_pages, fetch_json, issue, latest_version_milestone, milestone_by_title,
    milestone_pull_requests, open_milestones, pull_merge_state, verify_credentials,
};
pub use identity::{
    IdentityCache, IdentityQuery, IdentityResolver, InteractionMode, InterruptSignal,
    NOREPLY_DOMAIN, Prompt, PromptOutcome, TerminalPrompt, load_pairs, merge_pairs, noreply_login,
    pairs_to_csv, parse_pairs, save_pairs,
};
pub use log_line::{LogLine, parse_log};
pub use pull_request::{Author, MergeState, Milestone, PrCache, PullRequestRef};
pub use queue::WorkQueue;
pub use release::{PreRelease, Release, Version};

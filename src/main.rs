// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface for the relnotes binary.
//!
//! The CLI exposes subcommands for writing release notes, maintaining the
//! email to login cache, generating the credits page and inspecting release
//! milestones.

use std::{
    fs,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use relnotes::{
    ChangelogBuilder, ContributionTally, CreditAggregator, DEFAULT_CREDITS_TEMPLATE, Dialect,
    Error, IdentityCache, IdentityQuery, IdentityResolver, InteractionMode, InterruptSignal,
    OctocrabTransport, PrCache, RateLimitedClient, Release, RepoRef, Settings, TerminalPrompt,
    commit_log, credits_context, io_error, latest_version_milestone, load_pairs, merge_pairs,
    milestone_by_title, milestone_pull_requests, parse_log, project_version, render_credits,
    unmerged_docs, verify_credentials,
};
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

type Client = RateLimitedClient<OctocrabTransport,>;

/// Release tooling driven by git history and GitHub metadata.
#[derive(Debug, Parser,)]
#[command(name = "relnotes", version, about = "Generate release notes and contributor credits")]
struct Cli
{
    #[command(subcommand)]
    command: Command,

    /// Path to the YAML settings file; built-in defaults apply without it.
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf,>,

    /// GitHub API token; falls back to the configured token file.
    #[arg(long = "token", env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String,>,

    /// Only log warnings and hide progress output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand,)]
enum Command
{
    /// Write the website and GitHub release notes for a release.
    ReleaseNotes(ReleaseNotesArgs,),
    /// Resolve commit author emails of a release into GitHub logins.
    UpdateUsers(UpdateUsersArgs,),
    /// Generate the contributor credits page.
    Credits(CreditsArgs,),
    /// Print the merge commits of a milestone's merged pull requests.
    MilestoneCommits(MilestoneCommitsArgs,),
    /// Print the newest open version milestone.
    LatestMilestone,
    /// List release pull requests whose documentation is not merged yet.
    UnmergedDocs(UnmergedDocsArgs,),
}

#[derive(Debug, Args,)]
struct ReleaseNotesArgs
{
    /// Release branch compared against the base ref.
    #[arg(long = "branch", default_value = "rc")]
    branch: String,

    /// Release version; detected from the branch when omitted.
    #[arg(long = "release", value_name = "VERSION")]
    release: Option<String,>,

    /// Regenerate the notes even when the files already exist.
    #[arg(long = "force-update", action = ArgAction::SetTrue)]
    force_update: bool,
}

#[derive(Debug, Args,)]
struct UpdateUsersArgs
{
    /// Release branch whose log is scanned for emails.
    #[arg(long = "branch", default_value = "rc")]
    branch: String,

    /// Never prompt; unresolved emails are only reported.
    #[arg(long = "no-input", action = ArgAction::SetTrue)]
    no_input: bool,
}

#[derive(Debug, Args,)]
struct CreditsArgs
{
    /// Number of simultaneous API requests.
    #[arg(short = 'r', long = "simul-requests", value_name = "N",
          value_parser = clap::value_parser!(u16).range(1..))]
    simul_requests: Option<u16,>,

    /// Ignore the cached name and login files.
    #[arg(short = 'c', long = "no-cache", action = ArgAction::SetTrue)]
    no_cache: bool,
}

#[derive(Debug, Args,)]
struct MilestoneCommitsArgs
{
    /// Exact milestone title.
    title: String,

    /// Repository of the organization holding the milestone.
    #[arg(long = "repository", value_name = "NAME")]
    repository: Option<String,>,
}

#[derive(Debug, Args,)]
struct UnmergedDocsArgs
{
    /// Release version, validated before any git or network work.
    release: String,

    /// Release branch whose log is scanned.
    #[arg(long = "branch", default_value = "rc")]
    branch: String,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    let cli = Cli::parse();
    init_tracing(cli.quiet,);

    if let Err(error,) = run(cli,).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing(quiet: bool,)
{
    let filter = if quiet {
        EnvFilter::new("warn",)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),)
    };
    tracing_subscriber::fmt().with_env_filter(filter,).with_writer(std::io::stderr,).init();
}

/// Executes the parsed command.
///
/// # Errors
///
/// Propagates configuration, git, remote and file errors.
async fn run(cli: Cli,) -> Result<(), Error,>
{
    let settings = Settings::load(cli.config.as_deref(),)?;

    match cli.command {
        Command::ReleaseNotes(args,) => run_release_notes(&settings, cli.token, args,).await,
        Command::UpdateUsers(args,) => run_update_users(&settings, cli.token, args,).await,
        Command::Credits(args,) => run_credits(&settings, cli.token, cli.quiet, args,).await,
        Command::MilestoneCommits(args,) => {
            run_milestone_commits(&settings, cli.token, args,).await
        }
        Command::LatestMilestone => run_latest_milestone(&settings, cli.token,).await,
        Command::UnmergedDocs(args,) => run_unmerged_docs(&settings, cli.token, args,).await,
    }
}

/// Returns the token given on the command line, or the first line of the
/// token file.
fn resolve_token(explicit: Option<String,>, token_file: &Path,) -> Result<String, Error,>
{
    if let Some(token,) = explicit.map(|token| token.trim().to_owned(),)
        && !token.is_empty()
    {
        return Ok(token,);
    }

    let contents = match fs::read_to_string(token_file,) {
        Ok(contents,) => contents,
        Err(error,) if error.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::authentication(format!(
                "no token given: pass --token, set GITHUB_TOKEN or create {}",
                token_file.display()
            ),),);
        }
        Err(error,) => return Err(io_error(token_file, error,),),
    };

    contents
        .lines()
        .next()
        .map(str::trim,)
        .filter(|token| !token.is_empty(),)
        .map(str::to_owned,)
        .ok_or_else(|| {
            Error::authentication(format!("token file {} is empty", token_file.display()),)
        },)
}

/// Builds the API client and checks its credentials.
async fn connect(settings: &Settings, token: Option<String,>,) -> Result<Client, Error,>
{
    let token = resolve_token(token, &settings.paths.token_file,)?;
    let transport = OctocrabTransport::new(&settings.github.api_url, Some(&token,),)?;
    let client = RateLimitedClient::new(transport,);
    let login = verify_credentials(&client, &settings.github.api_url,).await?;
    info!("authenticated as {}", login);
    Ok(client,)
}

async fn run_release_notes(
    settings: &Settings,
    token: Option<String,>,
    args: ReleaseNotesArgs,
) -> Result<(), Error,>
{
    let version = match args.release {
        Some(version,) => version,
        None => {
            let version = project_version(
                &settings.git.clone_path,
                &args.branch,
                &settings.git.version_file,
            )?;
            info!("auto detected version {}", version);
            version
        }
    };

    let release = Release::new(&version, args.branch.as_str(),)?;
    let data_dir = &settings.paths.data_dir;
    let website_file = data_dir.join(format!("{}.md", release.identifier()),);
    let github_file = data_dir.join(format!("{}-github.md", release.identifier()),);

    if !args.force_update && website_file.is_file() {
        info!("found existing files {} and {}", website_file.display(), github_file.display());
        return Ok((),);
    }

    let client = connect(settings, token,).await?;
    let log = commit_log(&settings.git.clone_path, &settings.git.base_ref, release.branch(),)?;
    let lines = parse_log(&log,)?;
    let mut pull_requests = PrCache::new(&client, RepoRef::from_settings(&settings.github,),);
    let document =
        ChangelogBuilder::new(&settings.changelog,).build(&release, &lines, &mut pull_requests,).await?;

    fs::create_dir_all(data_dir,).map_err(|error| io_error(data_dir, error,),)?;
    for (file, dialect,) in [(&website_file, Dialect::Website,), (&github_file, Dialect::Plain,)] {
        info!("writing {}", file.display());
        fs::write(file, document.render(dialect,),).map_err(|error| io_error(file, error,),)?;
    }

    Ok((),)
}

async fn run_update_users(
    settings: &Settings,
    token: Option<String,>,
    args: UpdateUsersArgs,
) -> Result<(), Error,>
{
    let log = commit_log(&settings.git.clone_path, &settings.git.base_ref, &args.branch,)?;
    let queries: Vec<IdentityQuery,> = parse_log(&log,)?.iter().map(IdentityQuery::from,).collect();

    let cache_path = &settings.paths.login_by_email;
    let mut cache = IdentityCache::load(cache_path,)?;
    let unresolved = cache.unresolved().len();
    if unresolved > 0 {
        info!("{} cached emails still require a login", unresolved);
    }

    let client = connect(settings, token,).await?;
    let mut pull_requests = PrCache::new(&client, RepoRef::from_settings(&settings.github,),);
    let mode = if args.no_input { InteractionMode::Suppressed } else { InteractionMode::Interactive };
    let interrupts = Arc::new(InterruptSignal::new(),);
    let watcher = watch_interrupts(Arc::clone(&interrupts,),);
    let mut resolver = IdentityResolver::new(TerminalPrompt::new(interrupts,), mode,);

    let changed = resolver.resolve_all(&queries, &mut cache, &mut pull_requests,).await;
    watcher.abort();
    if changed > 0 {
        cache.save(cache_path,)?;
        info!("saved {} identities to {}", cache.len(), cache_path.display());
    }

    Ok((),)
}

/// Routes ctrl-c to the active prompt for the lifetime of the run.
///
/// Outside a prompt the process exits with status 130.
fn watch_interrupts(interrupts: Arc<InterruptSignal,>,) -> JoinHandle<(),>
{
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !interrupts.interrupt() {
                eprintln!("interrupted");
                process::exit(130,);
            }
        }
    },)
}

async fn run_credits(
    settings: &Settings,
    token: Option<String,>,
    quiet: bool,
    args: CreditsArgs,
) -> Result<(), Error,>
{
    let paths = &settings.paths;
    let known = if args.no_cache {
        ContributionTally::default()
    } else {
        ContributionTally::with_caches(
            load_pairs(&paths.name_by_login,)?,
            load_pairs(&paths.login_by_email,)?,
        )
    };

    let template = match &paths.credits_template {
        Some(path,) => fs::read_to_string(path,).map_err(|error| io_error(path, error,),)?,
        None => DEFAULT_CREDITS_TEMPLATE.to_owned(),
    };

    let concurrency =
        args.simul_requests.map_or(settings.credits.concurrency, |requests| usize::from(requests,),);
    let client = Arc::new(connect(settings, token,).await?,);
    let tally = CreditAggregator::new(client, &settings.github.api_url,)
        .concurrency(concurrency,)
        .per_page(settings.credits.per_page,)
        .quiet(quiet,)
        .aggregate(&settings.github.organization, known,)
        .await?;

    let names = merge_pairs(&paths.name_by_login, &tally.name_by_login,)?;
    let logins = merge_pairs(&paths.login_by_email, &tally.login_by_email,)?;
    info!("updated {} cached names and {} cached logins", names, logins);

    let context = credits_context(
        &tally,
        &settings.github.organization_name,
        &settings.github.project_owner,
        Utc::now(),
    );
    let page = render_credits(&context, &template,)?;

    let output = &paths.credits_output;
    if let Some(parent,) = output.parent().filter(|parent| !parent.as_os_str().is_empty(),) {
        fs::create_dir_all(parent,).map_err(|error| io_error(parent, error,),)?;
    }
    fs::write(output, page,).map_err(|error| io_error(output, error,),)?;
    info!("credits written to {}", output.display());

    Ok((),)
}

async fn run_milestone_commits(
    settings: &Settings,
    token: Option<String,>,
    args: MilestoneCommitsArgs,
) -> Result<(), Error,>
{
    let client = connect(settings, token,).await?;
    let mut repo = RepoRef::from_settings(&settings.github,);
    if let Some(name,) = &args.repository {
        repo = repo.with_name(name,);
    }

    let milestone = milestone_by_title(&client, &repo, &args.title,).await?;
    let pull_requests = milestone_pull_requests(&client, &repo, &milestone,).await?;
    let mut numbers = Vec::new();
    let mut cache = PrCache::new(&client, repo,);
    for pull_request in pull_requests {
        numbers.push(pull_request.number,);
        cache.insert(pull_request,);
    }
    numbers.sort_unstable();

    let mut commits = Vec::new();
    for number in numbers {
        let state = cache.merge_state(number,).await?;
        if state.merged
            && let Some(sha,) = state.merge_commit_sha
        {
            commits.push(sha,);
        }
    }

    println!("{}", commits.join(" "));
    Ok((),)
}

async fn run_latest_milestone(settings: &Settings, token: Option<String,>,) -> Result<(), Error,>
{
    let client = connect(settings, token,).await?;
    let repo = RepoRef::from_settings(&settings.github,);
    let (milestone, version,) = latest_version_milestone(&client, &repo,).await?;
    info!("latest milestone #{} parses as {}", milestone.number, version);
    println!("{}", milestone.title);
    Ok((),)
}

async fn run_unmerged_docs(
    settings: &Settings,
    token: Option<String,>,
    args: UnmergedDocsArgs,
) -> Result<(), Error,>
{
    let release = Release::new(&args.release, args.branch.as_str(),)?;
    let log = commit_log(&settings.git.clone_path, &settings.git.base_ref, release.branch(),)?;
    let lines = parse_log(&log,)?;

    let client = connect(settings, token,).await?;
    let repo = RepoRef::from_settings(&settings.github,);
    for pending in unmerged_docs(&client, &repo, &settings.github.docs_repository, &lines,).await? {
        println!("{}\n{}\n", pending.title, pending.docs_url);
    }
    Ok((),)
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use clap::Parser;
    use relnotes::Error;
    use tempfile::tempdir;

    use super::{Cli, Command, resolve_token};

    #[test]
    fn release_notes_defaults_to_rc_branch()
    {
        let cli = Cli::try_parse_from([env!("CARGO_PKG_NAME"), "release-notes"],)
            .expect("parse release-notes",);
        match cli.command {
            Command::ReleaseNotes(args,) => {
                assert_eq!(args.branch, "rc");
                assert_eq!(args.release, None);
                assert!(!args.force_update);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_options_follow_the_subcommand()
    {
        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "release-notes",
            "--release",
            "0.41.0b1",
            "--force-update",
            "--config",
            "relnotes.yaml",
            "--quiet",
        ],)
        .expect("parse release-notes with globals",);

        assert!(cli.quiet);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("relnotes.yaml")));
        match cli.command {
            Command::ReleaseNotes(args,) => {
                assert_eq!(args.release.as_deref(), Some("0.41.0b1"));
                assert!(args.force_update);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn credits_rejects_zero_simultaneous_requests()
    {
        assert!(Cli::try_parse_from([env!("CARGO_PKG_NAME"), "credits", "-r", "0"]).is_err());

        let cli = Cli::try_parse_from([env!("CARGO_PKG_NAME"), "credits", "-r", "8", "-c"],)
            .expect("parse credits",);
        match cli.command {
            Command::Credits(args,) => {
                assert_eq!(args.simul_requests, Some(8));
                assert!(args.no_cache);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn milestone_commits_requires_title()
    {
        assert!(Cli::try_parse_from([env!("CARGO_PKG_NAME"), "milestone-commits"]).is_err());

        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "milestone-commits",
            "0.41",
            "--repository",
            "frontend",
        ],)
        .expect("parse milestone-commits",);
        match cli.command {
            Command::MilestoneCommits(args,) => {
                assert_eq!(args.title, "0.41");
                assert_eq!(args.repository.as_deref(), Some("frontend"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unmerged_docs_requires_release()
    {
        assert!(Cli::try_parse_from([env!("CARGO_PKG_NAME"), "unmerged-docs"]).is_err());

        let cli = Cli::try_parse_from([env!("CARGO_PKG_NAME"), "unmerged-docs", "0.41"],)
            .expect("parse unmerged-docs",);
        match cli.command {
            Command::UnmergedDocs(args,) => {
                assert_eq!(args.release, "0.41");
                assert_eq!(args.branch, "rc");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn explicit_token_wins_over_token_file()
    {
        let dir = tempdir().expect("tempdir",);
        let file = dir.path().join(".token",);
        fs::write(&file, "from-file\n",).expect("write token",);

        let token = resolve_token(Some(" explicit ".to_owned(),), &file,).expect("token",);
        assert_eq!(token, "explicit");
    }

    #[test]
    fn token_file_first_line_is_used()
    {
        let dir = tempdir().expect("tempdir",);
        let file = dir.path().join(".token",);
        fs::write(&file, "abc123\nignored\n",).expect("write token",);

        assert_eq!(resolve_token(None, &file).expect("token"), "abc123");
    }

    #[test]
    fn missing_token_is_an_authentication_error()
    {
        let dir = tempdir().expect("tempdir",);
        let missing = dir.path().join(".token",);
        assert!(matches!(resolve_token(None, &missing), Err(Error::Authentication { .. })));

        let empty = dir.path().join("empty",);
        fs::write(&empty, "\n",).expect("write empty token",);
        assert!(matches!(resolve_token(Some(String::new()), &empty), Err(Error::Authentication { .. })));
    }
}

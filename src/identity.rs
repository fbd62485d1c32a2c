// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Mapping commit author emails to GitHub logins.
///
/// Resolution order for an email: the persistent cache, the GitHub noreply
/// address convention, the author of the referenced pull request, and finally
/// an interactive prompt. Answers are stored in a two-column CSV cache that
/// is rewritten in full, sorted by email.
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    future::Future,
    io::{self, Write},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::{Notify, oneshot};
use tracing::{debug, info, warn};

use crate::{
    client::Transport,
    error::{self, Error},
    log_line::LogLine,
    pull_request::PrCache,
};

/// Domain of the privacy-preserving commit addresses GitHub hands out.
pub const NOREPLY_DOMAIN: &str = "@users.noreply.github.com";

/// Extracts the login from a GitHub noreply address.
///
/// Both the `<id>+<login>@` and the older `<login>@` layouts are recognized.
///
/// # Examples
///
/// ```
/// use relnotes::noreply_login;
///
/// assert_eq!(noreply_login("123+octocat@users.noreply.github.com"), Some("octocat"));
/// assert_eq!(noreply_login("octocat@example.com"), None);
/// ```
pub fn noreply_login(email: &str,) -> Option<&str,>
{
    let local = email.strip_suffix(NOREPLY_DOMAIN,)?;
    let login = local.split_once('+',).map_or(local, |(_, login,)| login,);
    (!login.is_empty()).then_some(login,)
}

/// Reads a `key,value` file into a sorted map. A missing file is empty.
///
/// # Errors
///
/// Returns [`Error::Io`] for any read failure other than a missing file.
pub fn load_pairs(path: &Path,) -> Result<BTreeMap<String, String,>, Error,>
{
    match fs::read_to_string(path,) {
        Ok(contents,) => Ok(parse_pairs(&contents,),),
        Err(source,) if source.kind() == io::ErrorKind::NotFound => {
            debug!("{} does not exist yet, starting empty", path.display());
            Ok(BTreeMap::new(),)
        }
        Err(source,) => Err(error::io_error(path, source,),),
    }
}

/// Splits every non-blank line on its first comma.
pub fn parse_pairs(contents: &str,) -> BTreeMap<String, String,>
{
    contents
        .lines()
        .map(str::trim_end,)
        .filter(|line| !line.is_empty(),)
        .map(|line| match line.split_once(',',) {
            Some((key, value,),) => (key.to_owned(), value.to_owned(),),
            None => (line.to_owned(), String::new(),),
        },)
        .collect()
}

/// Serializes a map as `key,value` lines in key order.
pub fn pairs_to_csv(pairs: &BTreeMap<String, String,>,) -> String
{
    pairs.iter().map(|(key, value,)| format!("{key},{value}\n"),).collect()
}

/// Rewrites `path` with the sorted pairs, replacing the file atomically.
///
/// # Errors
///
/// Returns [`Error::Io`] when the directory or file cannot be written.
pub fn save_pairs(path: &Path, pairs: &BTreeMap<String, String,>,) -> Result<(), Error,>
{
    if let Some(parent,) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent,).map_err(|source| error::io_error(parent, source,),)?;
    }

    let staging = path.with_extension("tmp",);
    fs::write(&staging, pairs_to_csv(pairs,),).map_err(|source| error::io_error(&staging, source,),)?;
    fs::rename(&staging, path,).map_err(|source| error::io_error(path, source,),)
}

/// Folds `updates` into the pairs stored at `path`.
///
/// Blank values never overwrite what is on disk. The file is rewritten only
/// when an entry was added or changed; the number of such entries is
/// returned.
///
/// # Errors
///
/// See [`load_pairs`] and [`save_pairs`].
pub fn merge_pairs(path: &Path, updates: &BTreeMap<String, String,>,) -> Result<usize, Error,>
{
    let mut pairs = load_pairs(path,)?;
    let mut changed = 0;
    for (key, value,) in updates {
        let current = pairs.get(key,);
        if current == Some(value,) || (value.is_empty() && current.is_some()) {
            continue;
        }
        pairs.insert(key.clone(), value.clone(),);
        changed += 1;
    }

    if changed > 0 {
        save_pairs(path, &pairs,)?;
    }
    Ok(changed,)
}

/// Persistent `email -> login` map.
///
/// A blank login records an email that was seen but could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct IdentityCache
{
    entries: BTreeMap<String, String,>,
    dirty:   usize,
}

impl IdentityCache
{
    /// Loads the cache from disk; a missing file yields an empty cache.
    ///
    /// # Errors
    ///
    /// See [`load_pairs`].
    pub fn load(path: &Path,) -> Result<Self, Error,>
    {
        Ok(Self {
            entries: load_pairs(path,)?,
            dirty:   0,
        },)
    }

    pub fn parse(contents: &str,) -> Self
    {
        Self {
            entries: parse_pairs(contents,),
            dirty:   0,
        }
    }

    pub fn get(&self, email: &str,) -> Option<&str,>
    {
        self.entries.get(email,).map(String::as_str,)
    }

    pub fn contains(&self, email: &str,) -> bool
    {
        self.entries.contains_key(email,)
    }

    /// Records a login; returns whether the cache changed.
    pub fn insert(&mut self, email: &str, login: &str,) -> bool
    {
        if self.get(email,) == Some(login,) {
            return false;
        }
        self.entries.insert(email.to_owned(), login.to_owned(),);
        self.dirty += 1;
        true
    }

    /// Emails recorded with a blank login.
    pub fn unresolved(&self,) -> Vec<String,>
    {
        self.entries
            .iter()
            .filter(|(_, login,)| login.is_empty(),)
            .map(|(email, _,)| email.clone(),)
            .collect()
    }

    /// Number of entries added or changed since loading.
    pub fn dirty(&self,) -> usize
    {
        self.dirty
    }

    pub fn len(&self,) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self,) -> bool
    {
        self.entries.is_empty()
    }

    pub fn entries(&self,) -> &BTreeMap<String, String,>
    {
        &self.entries
    }

    pub fn to_csv(&self,) -> String
    {
        pairs_to_csv(&self.entries,)
    }

    /// Writes the whole cache, sorted by email.
    ///
    /// # Errors
    ///
    /// See [`save_pairs`].
    pub fn save(&self, path: &Path,) -> Result<(), Error,>
    {
        save_pairs(path, &self.entries,)
    }
}

/// Whether the resolver may ask the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum InteractionMode
{
    Interactive,
    Suppressed,
}

#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum PromptOutcome
{
    /// The typed login; blank when the user does not know it.
    Answer(String,),
    /// The user interrupted or input ended.
    Interrupted,
}

/// An email to resolve plus the log line it came from.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct IdentityQuery
{
    pub email:        String,
    pub pull_request: Option<u64,>,
    pub context:      String,
}

impl From<&LogLine,> for IdentityQuery
{
    fn from(line: &LogLine,) -> Self
    {
        Self {
            email:        line.author_email.clone(),
            pull_request: line.pull_request,
            context:      line.raw.clone(),
        }
    }
}

/// Source of answers for emails nothing else could resolve.
pub trait Prompt
{
    fn ask(&mut self, query: &IdentityQuery,) -> impl Future<Output = PromptOutcome,>;
}

/// Routes Ctrl-C to the prompt that is waiting for input, if any.
///
/// A single process-wide watcher owns the signal and calls
/// [`InterruptSignal::interrupt`]; when no prompt is active it terminates the
/// run instead.
#[derive(Debug, Default,)]
pub struct InterruptSignal
{
    prompting: AtomicBool,
    notify:    Notify,
}

impl InterruptSignal
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Whether a prompt is currently waiting for input.
    pub fn is_prompting(&self,) -> bool
    {
        self.prompting.load(Ordering::SeqCst,)
    }

    /// Delivers an interrupt to the active prompt.
    ///
    /// Returns `false` when no prompt is waiting; the caller then owns the
    /// interrupt and should stop the run.
    pub fn interrupt(&self,) -> bool
    {
        if !self.is_prompting() {
            return false;
        }
        self.notify.notify_waiters();
        true
    }

    /// Drives `input` while marked as prompting; `None` when interrupted.
    pub async fn during<F: Future,>(&self, input: F,) -> Option<F::Output,>
    {
        let interrupted = self.notify.notified();
        tokio::pin!(interrupted);
        interrupted.as_mut().enable();
        self.prompting.store(true, Ordering::SeqCst,);

        let outcome = tokio::select! {
            output = input => Some(output,),
            () = &mut interrupted => None,
        };

        self.prompting.store(false, Ordering::SeqCst,);
        outcome
    }
}

/// Asks on the terminal. An interrupt or end of input ends prompting.
#[derive(Debug, Clone,)]
pub struct TerminalPrompt
{
    interrupts: Arc<InterruptSignal,>,
}

impl TerminalPrompt
{
    pub fn new(interrupts: Arc<InterruptSignal,>,) -> Self
    {
        Self {
            interrupts,
        }
    }
}

impl Prompt for TerminalPrompt
{
    async fn ask(&mut self, query: &IdentityQuery,) -> PromptOutcome
    {
        print!("{}\nGitHub login for {} (blank if unknown): ", query.context, query.email);
        if io::stdout().flush().is_err() {
            return PromptOutcome::Interrupted;
        }

        let (sender, receiver,) = oneshot::channel();
        std::thread::spawn(move || {
            let mut line = String::new();
            let read = io::stdin().read_line(&mut line,).map(|bytes| (bytes, line,),);
            let _ = sender.send(read,);
        },);

        match self.interrupts.during(receiver,).await {
            None => {
                println!();
                PromptOutcome::Interrupted
            }
            Some(Ok(Ok((0, _,),),) | Ok(Err(_,),) | Err(_,),) => PromptOutcome::Interrupted,
            Some(Ok(Ok((_, line,),),),) => PromptOutcome::Answer(line.trim().to_owned(),),
        }
    }
}

/// Resolves emails into logins, updating an [`IdentityCache`].
pub struct IdentityResolver<P,>
{
    prompt:   P,
    mode:     InteractionMode,
    prompted: HashSet<String,>,
}

impl<P: Prompt,> IdentityResolver<P,>
{
    pub fn new(prompt: P, mode: InteractionMode,) -> Self
    {
        Self {
            prompt,
            mode,
            prompted: HashSet::new(),
        }
    }

    pub fn mode(&self,) -> InteractionMode
    {
        self.mode
    }

    /// Resolves every uncached email, then retries the blank entries.
    ///
    /// Returns the number of cache entries added or changed; the caller saves
    /// the cache only when it is positive. Pull request lookup failures are
    /// logged and fall through to the next resolution step.
    pub async fn resolve_all<T: Transport,>(
        &mut self,
        queries: &[IdentityQuery],
        cache: &mut IdentityCache,
        pull_requests: &mut PrCache<'_, T,>,
    ) -> usize
    {
        let before = cache.dirty();

        for query in queries {
            if cache.contains(&query.email,) {
                continue;
            }
            self.resolve_one(query, cache, pull_requests,).await;
        }

        for email in cache.unresolved() {
            if self.prompted.contains(&email,) {
                continue;
            }
            let query = queries
                .iter()
                .filter(|query| query.email == email,)
                .max_by_key(|query| query.pull_request.is_some(),)
                .cloned()
                .unwrap_or_else(|| IdentityQuery {
                    context: format!("(previously unresolved) {email}"),
                    email,
                    pull_request: None,
                },);
            self.resolve_one(&query, cache, pull_requests,).await;
        }

        let changed = cache.dirty() - before;
        info!("{} identities added or updated", changed);
        changed
    }

    async fn resolve_one<T: Transport,>(
        &mut self,
        query: &IdentityQuery,
        cache: &mut IdentityCache,
        pull_requests: &mut PrCache<'_, T,>,
    )
    {
        if let Some(login,) = noreply_login(&query.email,) {
            debug!("{} resolved from noreply address", query.email);
            cache.insert(&query.email, login,);
            return;
        }

        if let Some(number,) = query.pull_request {
            match pull_requests.get(number,).await {
                Ok(pull_request,) => {
                    debug!("{} resolved as author of #{}", query.email, number);
                    let login = pull_request.author.login.clone();
                    cache.insert(&query.email, &login,);
                    return;
                }
                Err(error,) => warn!("could not fetch #{} for {}: {}", number, query.email, error),
            }
        }

        if self.mode == InteractionMode::Interactive {
            self.prompted.insert(query.email.clone(),);
            match self.prompt.ask(query,).await {
                PromptOutcome::Answer(login,) => {
                    cache.insert(&query.email, &login,);
                }
                PromptOutcome::Interrupted => {
                    warn!("prompting interrupted, remaining emails will not be asked about");
                    self.mode = InteractionMode::Suppressed;
                }
            }
            return;
        }

        warn!("unable to resolve a login for {}", query.email);
    }
}

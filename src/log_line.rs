// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Parsing of `git log --pretty=format:'- %s (%ae)'` output.
///
/// Each commit line ends with the author email in parentheses; merged pull
/// requests additionally carry a `(#NNNN)` marker right before it.
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

static PR_MARKER: LazyLock<Regex,> =
    LazyLock::new(|| Regex::new(r"^\(#(\d+)\)",).expect("static pull request pattern",),);

/// One commit in the replay range.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct LogLine
{
    /// The line exactly as it appeared in the log.
    pub raw:          String,
    /// Subject text without the trailing annotations.
    pub message:      String,
    /// Pull request number, when the subject ends with `(#NNNN)`.
    pub pull_request: Option<u64,>,
    /// Commit author email.
    pub author_email: String,
}

impl LogLine
{
    /// Parses a single log line.
    ///
    /// Only the token immediately preceding the email is inspected for a pull
    /// request marker, so parenthesized references elsewhere in the subject
    /// stay part of the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedLogLine`] when the line does not end with a
    /// parenthesized email token.
    ///
    /// # Examples
    ///
    /// ```
    /// use relnotes::LogLine;
    ///
    /// let line = LogLine::parse("- Fix bug (#10) (a@x.com)",).expect("well-formed line",);
    /// assert_eq!(line.message, "Fix bug");
    /// assert_eq!(line.pull_request, Some(10));
    /// assert_eq!(line.author_email, "a@x.com");
    /// ```
    pub fn parse(raw: &str,) -> Result<Self, Error,>
    {
        let malformed = || Error::MalformedLogLine {
            line: raw.trim_end().to_owned(),
        };

        let mut tokens: Vec<&str,> = raw.split_whitespace().collect();
        if tokens.first() == Some(&"-",) {
            tokens.remove(0,);
        }

        let email_token = tokens.pop().ok_or_else(malformed,)?;
        let author_email = email_token
            .strip_prefix('(',)
            .and_then(|rest| rest.strip_suffix(')',),)
            .filter(|email| !email.is_empty(),)
            .ok_or_else(malformed,)?;

        let pull_request = tokens.last().and_then(|candidate| {
            PR_MARKER
                .captures(candidate,)
                .and_then(|captures| captures.get(1,),)
                .and_then(|digits| digits.as_str().parse::<u64>().ok(),)
        },);
        if pull_request.is_some() {
            tokens.pop();
        }

        Ok(Self {
            raw: raw.trim_end().to_owned(),
            message: tokens.join(" ",),
            pull_request,
            author_email: author_email.to_owned(),
        },)
    }

    /// Renders a line in the same layout `git log` produces for this tool.
    pub fn format(message: &str, pull_request: Option<u64,>, author_email: &str,) -> String
    {
        let mut tokens = vec!["-".to_owned()];
        if !message.is_empty() {
            tokens.push(message.to_owned(),);
        }
        if let Some(number,) = pull_request {
            tokens.push(format!("(#{number})"),);
        }
        tokens.push(format!("({author_email})"),);
        tokens.join(" ",)
    }
}

/// Parses a full log, skipping blank lines and consecutive duplicates.
///
/// # Errors
///
/// Fails on the first malformed line: an unexpected layout means the upstream
/// log format changed and the whole run is unreliable.
pub fn parse_log(text: &str,) -> Result<Vec<LogLine,>, Error,>
{
    let mut lines = Vec::new();
    let mut previous: Option<&str,> = None;

    for raw in text.lines() {
        if raw.trim().is_empty() || previous == Some(raw,) {
            continue;
        }
        previous = Some(raw,);
        lines.push(LogLine::parse(raw,)?,);
    }

    Ok(lines,)
}

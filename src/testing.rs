// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! In-process stand-in for the GitHub API used by unit tests.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::Mutex,
};

use masterror::AppError;
use url::Url;

use crate::client::{ApiResponse, Transport};

#[derive(Debug, Clone,)]
enum Reply
{
    Response(ApiResponse,),
    Failure(String,),
}

/// Transport answering from a table of canned replies keyed by full URL.
///
/// Replies registered for the same URL are served in order; the last one
/// keeps being served once the queue is drained. Unknown URLs answer `404`.
#[derive(Debug, Default,)]
pub struct FakeTransport
{
    routes:   Mutex<HashMap<String, VecDeque<Reply,>,>,>,
    requests: Mutex<Vec<String,>,>,
}

impl FakeTransport
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn route(self, url: &str, response: ApiResponse,) -> Self
    {
        self.push(url, Reply::Response(response,),);
        self
    }

    pub fn json(self, url: &str, body: serde_json::Value,) -> Self
    {
        self.route(url, ApiResponse::new(url, 200, body.to_string(),),)
    }

    pub fn fail(self, url: &str, message: &str,) -> Self
    {
        self.push(url, Reply::Failure(message.to_owned(),),);
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self,) -> Vec<String,>
    {
        self.requests.lock().expect("requests lock poisoned",).clone()
    }

    fn push(&self, url: &str, reply: Reply,)
    {
        self.routes
            .lock()
            .expect("routes lock poisoned",)
            .entry(url.to_owned(),)
            .or_default()
            .push_back(reply,);
    }

    fn reply(&self, url: &str,) -> Reply
    {
        self.requests.lock().expect("requests lock poisoned",).push(url.to_owned(),);

        let mut routes = self.routes.lock().expect("routes lock poisoned",);
        match routes.get_mut(url,) {
            Some(queue,) if queue.len() > 1 => queue.pop_front().expect("queue is not empty",),
            Some(queue,) if !queue.is_empty() => queue[0].clone(),
            _ => Reply::Response(ApiResponse::new(url, 404, r#"{"message":"Not Found"}"#,),),
        }
    }
}

impl Transport for FakeTransport
{
    fn get(&self, url: &Url,) -> impl Future<Output = Result<ApiResponse, AppError,>,> + Send
    {
        let reply = self.reply(url.as_str(),);
        async move {
            match reply {
                Reply::Response(response,) => Ok(response,),
                Reply::Failure(message,) => Err(AppError::service(message,),),
            }
        }
    }
}

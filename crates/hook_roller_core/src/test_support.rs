//! In-memory Bitbucket fake shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bitbucket_client::{Error, Repository, RepositoryClient, RepositoryPage, WebhookPayload};

pub fn repository(n: usize) -> Repository {
    Repository {
        scm: "git".to_string(),
        uuid: format!("{{{n}}}"),
        description: String::new(),
        full_name: format!("acme/repo-{n}"),
        is_private: n % 2 == 0,
        name: format!("repo-{n}"),
    }
}

pub fn repositories(count: usize) -> Vec<Repository> {
    (1..=count).map(repository).collect()
}

fn status(operation: &str, status: u16) -> Error {
    Error::UnexpectedStatus {
        operation: operation.to_string(),
        status,
    }
}

/// Serves a fixed repository list in pages and records webhook traffic.
#[derive(Default)]
pub struct FakeBitbucket {
    repositories: Vec<Repository>,
    page_length: u32,
    omit_size: bool,
    declared_size: Option<u64>,
    always_next: bool,
    failing_pages: HashMap<u32, u16>,
    failing_creates: HashMap<String, u16>,
    failing_hook_listings: HashSet<String>,
    hooks: Mutex<HashMap<String, Vec<String>>>,
    pages_requested: Mutex<Vec<u32>>,
    created: Mutex<Vec<(String, WebhookPayload)>>,
}

impl FakeBitbucket {
    pub fn with_repositories(repositories: Vec<Repository>) -> Self {
        Self {
            repositories,
            page_length: 100,
            ..Default::default()
        }
    }

    /// Leaves `size` out of every page so the caller has to follow `next`.
    pub fn without_size(mut self) -> Self {
        self.omit_size = true;
        self
    }

    /// Reports `size` instead of the real repository count.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Puts a `next` link on every page, including those past the end.
    pub fn always_next(mut self) -> Self {
        self.always_next = true;
        self
    }

    pub fn with_page_length(mut self, page_length: u32) -> Self {
        self.page_length = page_length;
        self
    }

    pub fn fail_page(mut self, page: u32, status: u16) -> Self {
        self.failing_pages.insert(page, status);
        self
    }

    pub fn fail_create(mut self, full_name: &str, status: u16) -> Self {
        self.failing_creates.insert(full_name.to_string(), status);
        self
    }

    pub fn fail_hook_listing(mut self, full_name: &str) -> Self {
        self.failing_hook_listings.insert(full_name.to_string());
        self
    }

    pub fn with_existing_hook(self, full_name: &str, url: &str) -> Self {
        self.hooks
            .lock()
            .unwrap()
            .entry(full_name.to_string())
            .or_default()
            .push(url.to_string());
        self
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.pages_requested.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(String, WebhookPayload)> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_for(&self) -> Vec<String> {
        self.created().into_iter().map(|(name, _)| name).collect()
    }
}

#[async_trait]
impl RepositoryClient for FakeBitbucket {
    async fn list_repositories_page(
        &self,
        _username: &str,
        page: u32,
    ) -> Result<RepositoryPage, Error> {
        self.pages_requested.lock().unwrap().push(page);

        if let Some(code) = self.failing_pages.get(&page) {
            return Err(status("List repositories", *code));
        }

        let page_length = self.page_length as usize;
        let start = (page as usize - 1) * page_length;
        let values: Vec<Repository> = self
            .repositories
            .iter()
            .skip(start)
            .take(page_length)
            .cloned()
            .collect();
        let has_more = self.always_next || start + page_length < self.repositories.len();
        let size = self
            .declared_size
            .unwrap_or(self.repositories.len() as u64);

        Ok(RepositoryPage {
            values,
            size: (!self.omit_size).then_some(size),
            pagelen: Some(self.page_length),
            page: Some(page),
            next: has_more.then(|| format!("page={}", page + 1)),
            previous: None,
        })
    }

    async fn list_webhook_urls(&self, full_name: &str) -> Result<Vec<String>, Error> {
        if self.failing_hook_listings.contains(full_name) {
            return Err(status("List webhooks", 403));
        }

        Ok(self
            .hooks
            .lock()
            .unwrap()
            .get(full_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_webhook(&self, full_name: &str, payload: &WebhookPayload) -> Result<(), Error> {
        if let Some(code) = self.failing_creates.get(full_name) {
            return Err(status("Create webhook", *code));
        }

        self.hooks
            .lock()
            .unwrap()
            .entry(full_name.to_string())
            .or_default()
            .push(payload.url.clone());
        self.created
            .lock()
            .unwrap()
            .push((full_name.to_string(), payload.clone()));
        Ok(())
    }
}

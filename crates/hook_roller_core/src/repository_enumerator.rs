//! Repository enumeration.
//!
//! Walks the paginated repository listing of an account to the end and returns
//! every repository in listing order.

use bitbucket_client::{Repository, RepositoryClient, RepositoryPage, REPOSITORY_PAGE_LENGTH};
use tracing::{debug, info, warn};

use crate::{HookRollerError, HookRollerResult};

#[cfg(test)]
#[path = "repository_enumerator_tests.rs"]
mod tests;

/// Lists all repositories of an account.
///
/// The total page count is derived from the `size` reported on the first
/// page. When the server leaves `size` out, the `next` links are followed
/// instead. The walk also ends at the first page without entries, whatever
/// `size` or `next` claim. Any page failure aborts the enumeration, so callers
/// never work from a silently truncated list.
pub struct RepositoryEnumerator<'a, C: RepositoryClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: RepositoryClient + ?Sized> RepositoryEnumerator<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Returns every repository owned by `username`.
    ///
    /// # Errors
    ///
    /// - `HookRollerError::RepositoryFetch` if any page returns a non-200 status
    /// - `HookRollerError::Transport` if a page request fails outright
    /// - `HookRollerError::InvalidResponse` if a page body cannot be parsed
    pub async fn list_all(&self, username: &str) -> HookRollerResult<Vec<Repository>> {
        info!(username = username, "Enumerating repositories");

        let first = self.fetch_page(username, 1).await?;
        let declared_size = first.size;
        let page_length = first
            .pagelen
            .filter(|len| *len > 0)
            .unwrap_or(REPOSITORY_PAGE_LENGTH);
        let mut next = first.next;
        let mut exhausted = first.values.is_empty();
        let mut repositories = first.values;

        match declared_size {
            Some(size) => {
                let pages = page_count(size, page_length);
                debug!(size, pages, "Listing spans multiple pages");

                let mut page = 2;
                while page <= pages && !exhausted {
                    let current = self.fetch_page(username, page).await?;
                    exhausted = current.values.is_empty();
                    repositories.extend(current.values);
                    page += 1;
                }
            }
            None => {
                let mut page = 1;
                while next.is_some() && !exhausted {
                    page += 1;
                    let current = self.fetch_page(username, page).await?;
                    next = current.next;
                    exhausted = current.values.is_empty();
                    repositories.extend(current.values);
                }
            }
        }

        if let Some(size) = declared_size {
            if repositories.len() as u64 != size {
                warn!(
                    declared = size,
                    received = repositories.len(),
                    "Repository count differs from the size reported by the listing"
                );
            }
        }

        info!(
            username = username,
            count = repositories.len(),
            "Repository enumeration complete"
        );
        Ok(repositories)
    }

    async fn fetch_page(&self, username: &str, page: u32) -> HookRollerResult<RepositoryPage> {
        debug!(page, "Fetching repository page");

        self.client
            .list_repositories_page(username, page)
            .await
            .map_err(|e| match e {
                bitbucket_client::Error::UnexpectedStatus { status, .. } => {
                    HookRollerError::RepositoryFetch {
                        page,
                        status_code: status,
                    }
                }
                e if e.is_transport() => HookRollerError::Transport(e),
                e => HookRollerError::InvalidResponse(e),
            })
    }
}

/// Number of pages needed to hold `size` entries, `page_length` per page.
///
/// An exact multiple needs no extra page; zero entries need no page beyond
/// the first, which is always fetched.
pub fn page_count(size: u64, page_length: u32) -> u32 {
    let page_length = u64::from(page_length.max(1));
    u32::try_from(size.div_ceil(page_length)).unwrap_or(u32::MAX)
}

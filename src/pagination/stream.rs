//! Lazy page and item streams over a resource collection

use super::types::PaginationState;
use crate::error::{Error, Result};
use crate::resource::{GenericCollection, GenericResource, QueryOptions, ResourceClient};
use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, warn};

impl ResourceClient {
    /// Stream whole pages of a collection, in server order
    ///
    /// Starts at `options.offset` (0 when unset) and steps by the effective
    /// page size. A response that is not a collection ends the stream with
    /// [`Error::UnexpectedDocument`].
    pub fn paginate_pages<'a>(
        &'a self,
        product: &'a str,
        endpoint: &'a str,
        options: &QueryOptions,
    ) -> impl Stream<Item = Result<GenericCollection>> + 'a {
        let per_page = self.effective_per_page(options.per_page);
        let state = PaginationState::new(options.offset.unwrap_or(0), per_page);
        let options = options.clone();

        stream::try_unfold(state, move |mut state| {
            let query = options.clone().per_page(state.per_page).offset(state.offset);
            async move {
                if state.done {
                    return Ok(None);
                }

                let page = self
                    .get(product, endpoint, None, &query)
                    .await?
                    .into_collection()?;

                if page.is_empty() {
                    debug!(
                        "{product}/{endpoint}: empty page at offset {}, {} records in {} pages",
                        state.offset, state.total_fetched, state.pages
                    );
                    return Ok(None);
                }

                state.add_page(page.len());
                debug!(
                    "{product}/{endpoint}: page {} at offset {} with {} records",
                    state.pages,
                    state.offset,
                    page.len()
                );

                if !page.has_next() {
                    state.mark_done();
                } else if !state.advance() {
                    warn!(
                        "{product}/{endpoint}: next page offset overflows after offset {}, stopping",
                        state.offset
                    );
                    state.mark_done();
                }

                Ok(Some((page, state)))
            }
        })
    }

    /// Stream every resource of a collection, fetching pages on demand
    pub fn paginate_all<'a>(
        &'a self,
        product: &'a str,
        endpoint: &'a str,
        options: &QueryOptions,
    ) -> impl Stream<Item = Result<GenericResource>> + 'a {
        self.paginate_pages(product, endpoint, options)
            .map_ok(|page| stream::iter(page.data.into_iter().map(Ok::<_, Error>)))
            .try_flatten()
    }

    /// Fetch every resource of a collection
    pub async fn collect_all(
        &self,
        product: &str,
        endpoint: &str,
        options: &QueryOptions,
    ) -> Result<Vec<GenericResource>> {
        self.paginate_all(product, endpoint, options)
            .try_collect()
            .await
    }
}

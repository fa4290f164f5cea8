//! Pagination module
//!
//! Exhaustive offset traversal of JSON:API collections as lazy streams.
//!
//! # Overview
//!
//! Pages are requested one at a time through [`ResourceClient::get`], so every
//! page goes through the same admission control, retry and error handling as
//! any other request. A page is only fetched when the consumer polls for more
//! items than the previous pages produced.
//!
//! Traversal stops at the first empty page or at the first page without a
//! `next` link.
//!
//! [`ResourceClient::get`]: crate::resource::ResourceClient::get

mod stream;
mod types;

pub use types::PaginationState;

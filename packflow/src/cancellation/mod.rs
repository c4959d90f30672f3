//! Cooperative cancellation.
//!
//! A [`CancellationToken`] travels inside the
//! [`PipelineContext`](crate::context::PipelineContext) into every stage and
//! tool invocation. Work that may block on an external process races the
//! token's [`cancelled`](CancellationToken::cancelled) future.

mod token;

pub use token::CancellationToken;

//! Coroutine-based responder dispatch.
//!
//! Every registered route owns one pre-spawned `may` coroutine consuming a
//! channel of jobs. Dispatching a request sends the in-flight context to the
//! route's coroutine and blocks the calling coroutine on a per-request reply
//! channel until the responder answers.
//!
//! Responder panics are caught inside the coroutine and surface as an error
//! from [`Dispatcher::dispatch`], which the pipeline converts into a single
//! 500 reply; one failing responder never takes the server down.

mod core;

pub use core::{Dispatcher, HandlerRequest, HandlerResponse, ResponderSender};

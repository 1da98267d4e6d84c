//! Batch writes of arbitrary size.
//!
//! Providers accept at most [`MAX_BATCH_SIZE`](crate::MAX_BATCH_SIZE)
//! entities per call. [`BatchDispatcher`] splits larger writes into chunks,
//! runs the chunks concurrently and returns per-entity results in input
//! order.
//!
//! Chunks are independent provider calls. A failing chunk does not roll
//! back chunks that already committed; see [`BatchFailure`](crate::BatchFailure).

mod batch_result;
mod dispatcher;
mod insert_method;

pub use batch_result::BatchResult;
pub use dispatcher::BatchDispatcher;
pub use insert_method::InsertMethod;

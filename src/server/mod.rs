//! Listening socket and worker lifecycle.
//!
//! A fixed number of workers share one listener. Each worker handles a whole
//! connection (accept, keep-alive loop, close) before accepting the next;
//! spreading connections across workers is left to the accept queue.

pub mod listener;
pub mod worker;

//! Request and response types shared by every layer.

mod request;
mod response;

pub use request::{Request, RequestKey};
pub use response::{Body, Response, StoredResponse};

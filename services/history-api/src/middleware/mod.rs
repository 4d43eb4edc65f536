// Request correlation middleware
pub mod request_id;

pub use request_id::{make_span, request_id_middleware, RequestId, X_REQUEST_ID};

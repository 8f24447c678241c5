mod dispatcher;
mod params;

pub use dispatcher::{ApiRequest, RequestDispatcher, DEFAULT_API_BASE};
pub use params::FormParams;

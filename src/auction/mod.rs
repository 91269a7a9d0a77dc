pub mod merge;
pub mod stored_request_processor;

pub mod adunit;
pub mod context;
pub mod prebid;
pub mod result;
pub mod stored;

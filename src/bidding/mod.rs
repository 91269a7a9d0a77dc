pub mod adapter;
pub mod catalog;
pub mod dispatcher;
pub mod engine;
pub mod http_connector;
pub mod index_exchange;

#[cfg(test)]
pub(crate) mod testutils;

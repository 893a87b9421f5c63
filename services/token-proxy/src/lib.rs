//! Reverse proxy that injects an OAuth2 client-credentials bearer token into
//! every forwarded request and relays backend responses verbatim.

pub mod config;
pub mod oauth;
pub mod proxy;
pub mod server;

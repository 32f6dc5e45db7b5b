//! Helpdesk Fabric - real-time customer-support message fabric
//!
//! Multiplexes websocket clients and external chat platforms onto a single
//! knowledge-query pipeline that prefers a remote knowledge service, guards
//! it with a circuit breaker, and degrades to a local index.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

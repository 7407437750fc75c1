//! bellwire: a notification bell that stays in sync with a remote service.
//!
//! The [`sync::NotificationCenter`] keeps a local mirror of the server's
//! unread count and recent notifications, polls the count while mounted,
//! and applies mark-read actions optimistically. It talks to the server
//! through the [`gateway::NotificationGateway`] trait.

pub mod config;
pub mod gateway;
pub mod model;
pub mod sync;
pub mod ui;
pub mod util;

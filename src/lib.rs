// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trademark renewal notices: deadline tracking for a trademark portfolio.
//!
//! This crate provides the backend API that evaluates registration expiry
//! dates against the 6/3/1-month renewal thresholds, dispatches notices by
//! email and messaging bot, and records operator renewal decisions.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::RegistrationStore;
use services::{
    EmailChannel, NotificationChannel, NotificationDispatcher, RegistrationLocks, RenewalCheck,
    StatusMutator, TelegramChannel,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RegistrationStore>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub status_mutator: StatusMutator,
    pub renewal_check: RenewalCheck,
}

impl AppState {
    /// Wire services around a store and a set of channels.
    ///
    /// The dispatcher and status mutator share one lock map so that a
    /// status change and a notice for the same registration never overlap.
    pub fn new(
        config: Config,
        store: Arc<dyn RegistrationStore>,
        channels: Vec<Arc<dyn NotificationChannel>>,
    ) -> Self {
        let locks: RegistrationLocks = Arc::new(dashmap::DashMap::new());

        let dispatcher = Arc::new(NotificationDispatcher::new(
            store.clone(),
            channels,
            locks.clone(),
            config.channel_timeout,
        ));
        let status_mutator = StatusMutator::new(store.clone(), locks);
        let renewal_check = RenewalCheck::new(store.clone(), dispatcher.clone());

        Self {
            config,
            store,
            dispatcher,
            status_mutator,
            renewal_check,
        }
    }
}

/// Build the channels enabled by configuration.
pub fn channels_from_config(config: &Config) -> Vec<Arc<dyn NotificationChannel>> {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

    if let Some(email) = EmailChannel::from_config(config) {
        channels.push(Arc::new(email));
    }
    if let Some(bot) = TelegramChannel::from_config(config) {
        channels.push(Arc::new(bot));
    }

    channels
}

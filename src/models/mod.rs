// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod notification;
pub mod registration;
pub mod renewal_action;

pub use notification::{Channel, NotificationEvent};
pub use registration::{Registration, RenewalStatus, Threshold};
pub use renewal_action::{RenewalAction, RenewalActionType};

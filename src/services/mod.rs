// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod channels;
pub mod dispatcher;
pub mod email;
pub mod evaluator;
pub mod renewal_check;
pub mod reports;
pub mod status;
pub mod telegram;

pub use channels::{ChannelError, ExpirySummary, Notice, NotificationChannel};
pub use dispatcher::{DispatchOutcome, NotificationDispatcher, RegistrationLocks};
pub use email::EmailChannel;
pub use evaluator::{evaluate, Evaluation, OverdueReason};
pub use renewal_check::{PassReport, RenewalCheck};
pub use status::{RenewalActionRequest, StatusMutator};
pub use telegram::TelegramChannel;

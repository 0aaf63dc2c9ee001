// Copyright (C) 2025 Agostinho Junior
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client-side request dispatcher for the collectibles marketplace JSON API.
//!
//! Every call goes through a [api::Dispatcher]: the descriptor is sent to the configured origin,
//! the reply is parsed as JSON and a payload carrying an `error` member is returned as
//! [api::DispatchError::Application] instead of reaching the success continuation.

pub mod api;

#[cfg(feature = "live")]
pub mod live;

pub mod logging;
pub mod manager;
pub mod simulated;

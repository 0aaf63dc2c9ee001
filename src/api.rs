// Copyright (C) 2025 Agostinho Junior
// SPDX-License-Identifier: GPL-3.0-or-later

pub use dispatcher::{Dispatcher, DispatcherExt};
mod dispatcher;

pub use request::{Method, RequestDescriptor};
pub mod request;

pub use response::DispatchError;
pub mod response;

pub use config::DispatcherConfig;
pub mod config;

pub mod provider;

// Copyright (C) 2025 Agostinho Junior
// SPDX-License-Identifier: GPL-3.0-or-later

pub use dispatcher::{HttpDispatcher, HttpDispatcherBuilder, HttpProvider};
mod dispatcher;

mod converters;

// Copyright (C) 2025 Agostinho Junior
// SPDX-License-Identifier: GPL-3.0-or-later

pub use backend::{RecordedRequest, SimulatedBackend, SimulatedBackendBuilder};
mod backend;

// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Splitpot Poker core types shared by the engine, the workers, and the
//! transport processes.
#![warn(clippy::all, rust_2018_idioms, missing_docs)]

pub mod message;
pub mod poker;

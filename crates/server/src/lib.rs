// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Splitpot Poker engine server.
#![warn(clippy::all, rust_2018_idioms, missing_docs)]

pub mod broker;
pub mod db;
pub mod game;
pub mod server;
pub use server::{Config, Server};
pub mod worker;

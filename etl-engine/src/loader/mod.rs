// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Loader (C11, C12, spec §4.9)
//!
//! `remote_connection` is the scripted-call port (spec §6: "an ordered
//! stream of scripted calls through a single connection") with a sqlite
//! test double standing in for the concrete remote-store driver (spec §1
//! external collaborator). `columnar_loader` is the concrete `Loader`
//! implementation: external-sort, grouped bulk insert, staging-to-target
//! append.

pub mod columnar_loader;
pub mod remote_connection;

pub use columnar_loader::ColumnarLoader;
pub use remote_connection::{RemoteConnection, ScriptExecutor, SqliteRemoteConnection};

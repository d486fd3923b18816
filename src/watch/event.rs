// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Decoded watch notifications.
//!
//! Events are decoded exactly once, at the API boundary; everything
//! downstream matches on the [`Change`] variant instead of inspecting raw
//! payloads. An undecodable payload never reaches a consumer.

use anyhow::Result;
use futures::stream::BoxStream;

/// A single change notification from a watch subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    Added(T),
    Modified(T),
    Deleted(T),
    /// The server ended the subscription; terminal for this stream.
    Closed,
}

impl<T> Change<T> {
    /// The payload carried by the change, if any.
    pub fn item(&self) -> Option<&T> {
        match self {
            Change::Added(item) | Change::Modified(item) | Change::Deleted(item) => Some(item),
            Change::Closed => None,
        }
    }
}

/// Stream of decoded changes produced by one watch subscription.
pub type ChangeStream<T> = BoxStream<'static, Result<Change<T>>>;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cancellation checks for reconcile passes.
//!
//! The outer control loop hands every operation a [`CancellationToken`]. Each
//! reconciler checks it before issuing an external call, so a cancelled pass
//! stops before its next mutation. Calls already issued are not rolled back.

use crate::errors::{LbError, Result};
use tokio_util::sync::CancellationToken;

/// Fail with [`LbError::Cancelled`] if the token has fired.
///
/// # Errors
///
/// Returns `LbError::Cancelled` naming `operation` when cancellation was requested.
pub fn ensure_active(cancel: &CancellationToken, operation: &str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(LbError::Cancelled {
            operation: operation.to_string(),
        });
    }
    Ok(())
}

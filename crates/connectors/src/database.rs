// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database connector: runs one parameterless SQL statement against a
//! Postgres target. Runbook authors never get raw query-builder access —
//! the `command` field for a database step is the literal statement text,
//! already realized by `incident-runbook::template` before this connector
//! ever sees it (placeholders are shell-escaped the same as for shell
//! targets, a documented simplification).

use crate::redact::redact;
use crate::traits::{ChunkKind, Connector, ExecutionRequest, OutputSink};
use incident_core::{ExecutionResult, FailureKind};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Column, Row};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caps how many result rows get rendered into `stdout_excerpt`; queries
/// that return more are truncated rather than flooding the event log.
const MAX_RESULT_ROWS: usize = 200;

pub struct DatabaseConnector {
    pool: sqlx::PgPool,
}

impl DatabaseConnector {
    pub async fn connect(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        Ok(Self { pool })
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn from_pool(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Connector for DatabaseConnector {
    fn kind(&self) -> &'static str {
        "database"
    }

    async fn execute(
        &self,
        req: ExecutionRequest<'_>,
        sink: &mut dyn OutputSink,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let started = Instant::now();

        if req.dry_run {
            return ExecutionResult::ok(0, "(dry run)", started.elapsed().as_millis() as u64);
        }

        let query = sqlx::query(req.command);
        let run = tokio::time::timeout(req.timeout, query.fetch_all(&self.pool));

        let rows = tokio::select! {
            result = run => result,
            _ = cancel.cancelled() => {
                return ExecutionResult::failed(FailureKind::Cancelled, "cancelled", started.elapsed().as_millis() as u64);
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match rows {
            Err(_elapsed) => ExecutionResult::failed(
                FailureKind::Timeout,
                "step exceeded timeout_seconds",
                duration_ms,
            ),
            Ok(Err(e)) => ExecutionResult::failed(
                FailureKind::CommandFailed,
                redact(&e.to_string()),
                duration_ms,
            ),
            Ok(Ok(rows)) => {
                let truncated = rows.len() > MAX_RESULT_ROWS;
                let mut rendered = String::new();
                for row in rows.iter().take(MAX_RESULT_ROWS) {
                    let line = render_row(row);
                    rendered.push_str(&line);
                    rendered.push('\n');
                }
                if truncated {
                    rendered.push_str(&format!(
                        "... truncated, {} rows returned, showing first {}\n",
                        rows.len(),
                        MAX_RESULT_ROWS
                    ));
                }
                let sanitized = redact(&rendered);
                sink.emit(ChunkKind::Stdout, &sanitized);
                ExecutionResult::ok(0, sanitized, duration_ms)
            }
        }
    }
}

fn render_row(row: &sqlx::postgres::PgRow) -> String {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let value: String = row
                .try_get::<Option<String>, _>(i)
                .ok()
                .flatten()
                .unwrap_or_else(|| "<non-text>".to_string());
            format!("{}={}", col.name(), value)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_result_rows_is_bounded() {
        assert!(MAX_RESULT_ROWS > 0);
        assert!(MAX_RESULT_ROWS <= 1000);
    }
}

use sqlx::{Connection, PgConnection};
use std::io::{BufRead, Write};
use std::time::Instant;
use thiserror::Error;

use crate::{
    confirm::{ask_for_confirmation, Decision},
    models::kickpoints::KickpointModel,
    telemetry::{error, info, LogKey, StatsD},
};

#[derive(Debug, Error)]
pub enum FillError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),
    #[error("could not talk to the operator: {0}")]
    Console(#[from] std::io::Error),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Committed(u64),
    RolledBack(u64),
    Failed(String),
}

/// Brings every kickpoint's `expires_at` in line with its clan settings,
/// committing only after the operator agrees on `input`. Prompt and status
/// lines go to `output`. The connection is closed on every path.
pub async fn fill_expires_at<R, W>(
    mut conn: PgConnection,
    input: R,
    mut output: W,
    statsd: &StatsD,
) -> Outcome
where
    R: BufRead,
    W: Write,
{
    let started = Instant::now();
    let outcome = match update_in_transaction(&mut conn, input, &mut output).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error(
                &LogKey::FillExpiresAtFailed,
                "Error updating expires_at",
                Some(&e),
            );
            Outcome::Failed(e.to_string())
        }
    };
    statsd.time(&LogKey::FillExpiresAt, "duration", started.elapsed());

    let status = match &outcome {
        Outcome::Committed(rows) => {
            statsd.incr(&LogKey::FillExpiresAt, "committed");
            format!("Committed changes to {} rows.", rows)
        }
        Outcome::RolledBack(_) => {
            statsd.incr(&LogKey::FillExpiresAt, "rolled-back");
            "Rolled back; no changes were committed.".to_string()
        }
        Outcome::Failed(message) => {
            statsd.incr(&LogKey::FillExpiresAt, "failed");
            format!("Error updating expires_at: {}", message)
        }
    };
    if let Err(e) = writeln!(output, "{}", status).and_then(|_| output.flush()) {
        error(
            &LogKey::FillExpiresAt,
            "Could not print status line",
            Some(&e),
        );
    }

    if let Err(e) = conn.close().await {
        error(
            &LogKey::ConnectionClose,
            "Could not close database connection",
            Some(&e),
        );
    }
    outcome
}

async fn update_in_transaction<R, W>(
    conn: &mut PgConnection,
    input: R,
    output: &mut W,
) -> Result<Outcome, FillError>
where
    R: BufRead,
    W: Write,
{
    let mut tx = conn.begin().await?;
    match update_and_confirm(&mut tx, input, output).await {
        Ok((rows, Decision::Commit)) => {
            tx.commit().await?;
            info(
                &LogKey::FillExpiresAtCommitted,
                &format!("Committed expires_at for {} kickpoints", rows),
            );
            Ok(Outcome::Committed(rows))
        }
        Ok((rows, Decision::Rollback)) => {
            tx.rollback().await?;
            info(
                &LogKey::FillExpiresAtRolledBack,
                &format!("Operator declined, rolled back {} kickpoints", rows),
            );
            Ok(Outcome::RolledBack(rows))
        }
        Err(e) => {
            if let Err(rollback_error) = tx.rollback().await {
                error(
                    &LogKey::FillExpiresAtFailed,
                    "Could not roll back after failed update",
                    Some(&rollback_error),
                );
            }
            Err(e)
        }
    }
}

async fn update_and_confirm<R, W>(
    conn: &mut PgConnection,
    input: R,
    output: &mut W,
) -> Result<(u64, Decision), FillError>
where
    R: BufRead,
    W: Write,
{
    let mut kickpoints = KickpointModel { conn };
    let excluded = kickpoints.count_without_settings().await?;
    if excluded > 0 {
        info(
            &LogKey::FillExpiresAtExcluded,
            &format!(
                "Skipping {} kickpoints whose clan has no settings",
                excluded
            ),
        );
    }
    let rows = kickpoints.recalculate_expires_at().await?;
    info(
        &LogKey::FillExpiresAt,
        &format!("Update touched {} kickpoints, awaiting confirmation", rows),
    );
    let decision = ask_for_confirmation(rows, input, output)?;
    Ok((rows, decision))
}

use lib::jobs::fill_expires_at::Outcome;
use lib::models::kickpoints::expiration_for;
use pretty_assertions::assert_eq;
use sqlx::query;

use crate::utils::{
    create_clan_settings, create_kickpoint, fetch_expires_at, get_test_db, midnight_utc,
    run_fill_expires_at, run_fill_expires_at_with_input, ClosedStdin,
};

#[tokio::test]
async fn fills_missing_expiration_and_second_run_is_a_noop() {
    let db = get_test_db().await;
    create_clan_settings(&db.pool, "ABC", 30).await;
    let id = create_kickpoint(&db.pool, "ABC", midnight_utc(2024, 1, 1), None).await;

    let (outcome, output) = run_fill_expires_at(&db, "y\n").await;
    assert_eq!(Outcome::Committed(1), outcome);
    assert_eq!(
        "This will affect 1 rows. Commit changes? (y/n): Committed changes to 1 rows.\n",
        output
    );
    assert_eq!(
        Some(midnight_utc(2024, 1, 31)),
        fetch_expires_at(&db.pool, id).await
    );

    let (outcome, output) = run_fill_expires_at(&db, "y\n").await;
    assert_eq!(Outcome::Committed(0), outcome);
    assert!(output.starts_with("This will affect 0 rows."), "{}", output);
    assert_eq!(
        Some(midnight_utc(2024, 1, 31)),
        fetch_expires_at(&db.pool, id).await
    );
}

#[tokio::test]
async fn only_missing_or_stale_expirations_are_selected() {
    let db = get_test_db().await;
    create_clan_settings(&db.pool, "ABC", 45).await;
    let date = midnight_utc(2024, 6, 1);
    let correct = expiration_for(date, 45);
    let missing = create_kickpoint(&db.pool, "ABC", date, None).await;
    let stale = create_kickpoint(&db.pool, "ABC", date, Some(midnight_utc(2024, 6, 20))).await;
    let up_to_date = create_kickpoint(&db.pool, "ABC", date, Some(correct)).await;

    let (outcome, _) = run_fill_expires_at(&db, "yes\n").await;
    assert_eq!(Outcome::Committed(2), outcome);
    for id in [missing, stale, up_to_date] {
        assert_eq!(Some(correct), fetch_expires_at(&db.pool, id).await);
    }
}

#[tokio::test]
async fn kickpoints_of_clans_without_settings_are_never_updated() {
    let db = get_test_db().await;
    create_clan_settings(&db.pool, "ABC", 30).await;
    let date = midnight_utc(2024, 5, 1);
    let orphan_missing = create_kickpoint(&db.pool, "NOSETTINGS", date, None).await;
    let orphan_stale =
        create_kickpoint(&db.pool, "NOSETTINGS", date, Some(midnight_utc(2020, 1, 1))).await;
    let covered = create_kickpoint(&db.pool, "ABC", date, None).await;

    let (outcome, _) = run_fill_expires_at(&db, "y\n").await;
    assert_eq!(Outcome::Committed(1), outcome);
    assert_eq!(None, fetch_expires_at(&db.pool, orphan_missing).await);
    assert_eq!(
        Some(midnight_utc(2020, 1, 1)),
        fetch_expires_at(&db.pool, orphan_stale).await
    );
    assert_eq!(
        Some(expiration_for(date, 30)),
        fetch_expires_at(&db.pool, covered).await
    );
}

#[tokio::test]
async fn declining_leaves_expirations_unchanged() {
    let db = get_test_db().await;
    create_clan_settings(&db.pool, "ABC", 30).await;
    let date = midnight_utc(2024, 1, 1);
    let missing = create_kickpoint(&db.pool, "ABC", date, None).await;
    let stale = create_kickpoint(&db.pool, "ABC", date, Some(midnight_utc(2024, 1, 2))).await;

    for answer in ["n\n", "no\n", "\n", "", "sure\n"] {
        let (outcome, output) = run_fill_expires_at(&db, answer).await;
        assert_eq!(Outcome::RolledBack(2), outcome, "answer: {:?}", answer);
        assert_eq!(
            "This will affect 2 rows. Commit changes? (y/n): Rolled back; no changes were committed.\n",
            output
        );
        assert_eq!(None, fetch_expires_at(&db.pool, missing).await);
        assert_eq!(
            Some(midnight_utc(2024, 1, 2)),
            fetch_expires_at(&db.pool, stale).await
        );
    }

    let (outcome, _) = run_fill_expires_at(&db, "YES\n").await;
    assert_eq!(Outcome::Committed(2), outcome);
    assert_eq!(
        Some(midnight_utc(2024, 1, 31)),
        fetch_expires_at(&db.pool, missing).await
    );
    assert_eq!(
        Some(midnight_utc(2024, 1, 31)),
        fetch_expires_at(&db.pool, stale).await
    );
}

#[tokio::test]
async fn failed_update_changes_nothing() {
    let db = get_test_db().await;
    query(
        r#"ALTER TABLE kickpoints
        ADD CONSTRAINT expires_before_2100 CHECK (expires_at < '2100-01-01')"#,
    )
    .execute(&db.pool)
    .await
    .expect("Could not add constraint");
    create_clan_settings(&db.pool, "ABC", 30).await;
    create_clan_settings(&db.pool, "FOREVER", 100_000).await;
    let date = midnight_utc(2024, 1, 1);
    let fine = create_kickpoint(&db.pool, "ABC", date, None).await;
    let too_far = create_kickpoint(&db.pool, "FOREVER", date, None).await;

    // The prompt is never reached, so the answer is never read
    let (outcome, output) = run_fill_expires_at(&db, "y\n").await;
    assert!(matches!(outcome, Outcome::Failed(_)), "{:?}", outcome);
    assert!(
        output.starts_with("Error updating expires_at: "),
        "{}",
        output
    );
    assert!(output.contains("expires_before_2100"), "{}", output);
    assert_eq!(None, fetch_expires_at(&db.pool, fine).await);
    assert_eq!(None, fetch_expires_at(&db.pool, too_far).await);

    // The database is usable afterwards, nothing was left locked
    query("ALTER TABLE kickpoints DROP CONSTRAINT expires_before_2100")
        .execute(&db.pool)
        .await
        .expect("Could not drop constraint");
    let (outcome, _) = run_fill_expires_at(&db, "y\n").await;
    assert_eq!(Outcome::Committed(2), outcome);
}

#[tokio::test]
async fn missing_schema_is_reported_as_failure() {
    let db = get_test_db().await;
    query("DROP TABLE clan_settings")
        .execute(&db.pool)
        .await
        .expect("Could not drop table");

    let (outcome, output) = run_fill_expires_at(&db, "y\n").await;
    assert!(matches!(outcome, Outcome::Failed(_)), "{:?}", outcome);
    assert!(output.contains("clan_settings"), "{}", output);
}

#[tokio::test]
async fn failed_operator_read_rolls_back() {
    let db = get_test_db().await;
    create_clan_settings(&db.pool, "ABC", 30).await;
    let id = create_kickpoint(&db.pool, "ABC", midnight_utc(2024, 1, 1), None).await;

    let (outcome, output) = run_fill_expires_at_with_input(&db, ClosedStdin).await;
    assert_eq!(
        Outcome::Failed("could not talk to the operator: stdin gone".to_string()),
        outcome
    );
    assert_eq!(
        "This will affect 1 rows. Commit changes? (y/n): Error updating expires_at: could not talk to the operator: stdin gone\n",
        output
    );
    assert_eq!(None, fetch_expires_at(&db.pool, id).await);

    let (outcome, _) = run_fill_expires_at(&db, "y\n").await;
    assert_eq!(Outcome::Committed(1), outcome);
}

use super::*;

#[tokio::test]
async fn test_join_missing_game() {
    let ctx = setup();
    let err = ctx.engine.join("missing", "p1").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_join_fills_capacity_then_waitlists() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 2)).await.unwrap();

    assert_eq!(
        ctx.engine.join(&game.id, "a").await.unwrap(),
        RegistrationStatus::Confirmed
    );
    assert_eq!(
        ctx.engine.join(&game.id, "b").await.unwrap(),
        RegistrationStatus::Confirmed
    );
    assert_eq!(
        ctx.engine.join(&game.id, "c").await.unwrap(),
        RegistrationStatus::Waitlisted
    );

    assert_eq!(confirmed_count(&ctx, &game.id), 2);

    // PlayerJoined carries the resulting status
    let joined = ctx.recorder.of_type(GameEventType::PlayerJoined);
    assert_eq!(joined.len(), 3);
    let statuses: Vec<String> = joined
        .iter()
        .map(|e| serde_json::to_value(&e.payload).unwrap()["status"]
            .as_str()
            .unwrap()
            .to_string())
        .collect();
    assert_eq!(statuses, ["confirmed", "confirmed", "waitlisted"]);
}

#[tokio::test]
async fn test_join_is_idempotent_per_pair() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 1)).await.unwrap();

    let first = ctx.engine.join(&game.id, "a").await.unwrap();
    let second = ctx.engine.join(&game.id, "a").await.unwrap();
    assert_eq!(first, second);

    // One row, one event - the repeat wrote and published nothing
    assert_eq!(ctx.repo.registrations_for_game(&game.id).unwrap().len(), 1);
    assert_eq!(ctx.recorder.of_type(GameEventType::PlayerJoined).len(), 1);

    // Same for an already-waitlisted player
    ctx.engine.join(&game.id, "b").await.unwrap();
    assert_eq!(
        ctx.engine.join(&game.id, "b").await.unwrap(),
        RegistrationStatus::Waitlisted
    );
    assert_eq!(ctx.repo.registrations_for_game(&game.id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_join_refused_when_not_open() {
    let ctx = setup();
    let closed = seed_game(&ctx, 24, 2, GameStatus::Closed);

    // Confirmed path and waitlist path both refuse a non-open game
    assert!(matches!(
        ctx.engine.join(&closed.id, "a").await.unwrap_err(),
        EngineError::Rule(RuleViolation::GameNotOpen)
    ));

    let canceled = seed_game(&ctx, 24, 1, GameStatus::Canceled);
    assert!(matches!(
        ctx.engine.join(&canceled.id, "a").await.unwrap_err(),
        EngineError::Rule(RuleViolation::GameNotOpen)
    ));

    assert!(ctx.recorder.types().is_empty());
}

#[tokio::test]
async fn test_join_refused_after_start() {
    let ctx = setup();
    let started = seed_game(&ctx, -1, 4, GameStatus::Open);

    let err = ctx.engine.join(&started.id, "a").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Rule(RuleViolation::GameAlreadyStarted)
    ));
    assert_eq!(err.code(), "game_already_started");
    assert!(ctx.repo.registrations_for_game(&started.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_rejoin_after_leave_creates_fresh_row() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 1)).await.unwrap();

    ctx.engine.join(&game.id, "a").await.unwrap();
    ctx.engine.leave(&game.id, "a").await.unwrap();
    assert_eq!(
        ctx.engine.join(&game.id, "a").await.unwrap(),
        RegistrationStatus::Confirmed
    );

    // The canceled row survives as audit trail next to the fresh one
    let rows = ctx.repo.registrations_for_game(&game.id).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status, RegistrationStatus::Canceled);
    assert_eq!(rows[1].status, RegistrationStatus::Confirmed);
    assert!(rows[0].joined_seq < rows[1].joined_seq);
}

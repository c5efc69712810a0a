use super::*;

#[tokio::test]
async fn test_leave_without_registration_is_noop() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 2)).await.unwrap();

    // Unknown player and unknown game both succeed silently
    ctx.engine.leave(&game.id, "nobody").await.unwrap();
    ctx.engine.leave("missing", "nobody").await.unwrap();

    assert!(ctx
        .recorder
        .of_type(GameEventType::RegistrationCanceled)
        .is_empty());
}

#[tokio::test]
async fn test_leave_twice_is_noop() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 2)).await.unwrap();
    ctx.engine.join(&game.id, "a").await.unwrap();

    ctx.engine.leave(&game.id, "a").await.unwrap();
    ctx.engine.leave(&game.id, "a").await.unwrap();

    // Exactly one cancellation happened
    assert_eq!(
        ctx.recorder.of_type(GameEventType::RegistrationCanceled).len(),
        1
    );
}

#[tokio::test]
async fn test_leave_promotes_fifo_head() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 2)).await.unwrap();

    // a, b confirmed; c then d waitlisted
    for p in ["a", "b", "c", "d"] {
        ctx.engine.join(&game.id, p).await.unwrap();
    }

    ctx.engine.leave(&game.id, "a").await.unwrap();

    // Exactly the earliest-created waitlisted registration was promoted
    assert_eq!(
        registration_of(&ctx, &game.id, "c").unwrap().status,
        RegistrationStatus::Confirmed
    );
    assert_eq!(
        registration_of(&ctx, &game.id, "d").unwrap().status,
        RegistrationStatus::Waitlisted
    );
    assert_eq!(
        registration_of(&ctx, &game.id, "b").unwrap().status,
        RegistrationStatus::Confirmed
    );
    assert_eq!(confirmed_count(&ctx, &game.id), 2);

    let promoted = ctx.recorder.of_type(GameEventType::WaitlistedPromoted);
    assert_eq!(promoted.len(), 1);
    let payload = serde_json::to_value(&promoted[0].payload).unwrap();
    assert_eq!(payload["participantId"], "c");
}

#[tokio::test]
async fn test_capacity_two_scenario() {
    // capacity=2: A,B join -> both confirmed; C joins -> waitlisted;
    // A leaves -> C confirmed, B remains confirmed
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 2)).await.unwrap();

    assert_eq!(
        ctx.engine.join(&game.id, "A").await.unwrap(),
        RegistrationStatus::Confirmed
    );
    assert_eq!(
        ctx.engine.join(&game.id, "B").await.unwrap(),
        RegistrationStatus::Confirmed
    );
    assert_eq!(
        ctx.engine.join(&game.id, "C").await.unwrap(),
        RegistrationStatus::Waitlisted
    );

    ctx.engine.leave(&game.id, "A").await.unwrap();

    assert_eq!(
        registration_of(&ctx, &game.id, "C").unwrap().status,
        RegistrationStatus::Confirmed
    );
    assert_eq!(
        registration_of(&ctx, &game.id, "B").unwrap().status,
        RegistrationStatus::Confirmed
    );
    assert!(registration_of(&ctx, &game.id, "A").is_none());
}

#[tokio::test]
async fn test_waitlisted_leaver_promotes_nobody() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 1)).await.unwrap();

    ctx.engine.join(&game.id, "a").await.unwrap();
    ctx.engine.join(&game.id, "b").await.unwrap();
    ctx.engine.join(&game.id, "c").await.unwrap();

    // b was waitlisted; its departure frees no confirmed slot
    ctx.engine.leave(&game.id, "b").await.unwrap();

    assert_eq!(
        registration_of(&ctx, &game.id, "c").unwrap().status,
        RegistrationStatus::Waitlisted
    );
    assert!(ctx
        .recorder
        .of_type(GameEventType::WaitlistedPromoted)
        .is_empty());
}

#[tokio::test]
async fn test_leave_with_empty_waitlist() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 2)).await.unwrap();
    ctx.engine.join(&game.id, "a").await.unwrap();

    ctx.engine.leave(&game.id, "a").await.unwrap();

    assert_eq!(confirmed_count(&ctx, &game.id), 0);
    assert_eq!(
        ctx.recorder.of_type(GameEventType::RegistrationCanceled).len(),
        1
    );
    assert!(ctx
        .recorder
        .of_type(GameEventType::WaitlistedPromoted)
        .is_empty());
}

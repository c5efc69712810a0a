use super::*;

/// Capacity is never overrun: the confirmed-count read and the
/// registration write share one write transaction, so concurrent joiners
/// are linearized by the storage layer.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_overrun_capacity() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 2)).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = ctx.engine.clone();
        let game_id = game.id.clone();
        handles.push(tokio::spawn(async move {
            engine.join(&game_id, &format!("p{i}")).await
        }));
    }

    let mut confirmed = 0;
    let mut waitlisted = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            RegistrationStatus::Confirmed => confirmed += 1,
            RegistrationStatus::Waitlisted => waitlisted += 1,
            RegistrationStatus::Canceled => unreachable!(),
        }
    }

    assert_eq!(confirmed, 2);
    assert_eq!(waitlisted, 6);
    assert_eq!(confirmed_count(&ctx, &game.id), 2);
}

/// Concurrent leaves against one freed slot promote exactly one
/// registration - no double promotion, no skipped head.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_leaves_promote_exactly_once_per_slot() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 2)).await.unwrap();

    for p in ["a", "b", "c", "d"] {
        ctx.engine.join(&game.id, p).await.unwrap();
    }

    // Both confirmed players leave at once
    let mut handles = Vec::new();
    for p in ["a", "b"] {
        let engine = ctx.engine.clone();
        let game_id = game.id.clone();
        handles.push(tokio::spawn(
            async move { engine.leave(&game_id, p).await },
        ));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Two slots freed, two waitlisted promoted, capacity still respected
    assert_eq!(confirmed_count(&ctx, &game.id), 2);
    assert_eq!(
        registration_of(&ctx, &game.id, "c").unwrap().status,
        RegistrationStatus::Confirmed
    );
    assert_eq!(
        registration_of(&ctx, &game.id, "d").unwrap().status,
        RegistrationStatus::Confirmed
    );
    assert_eq!(
        ctx.recorder.of_type(GameEventType::WaitlistedPromoted).len(),
        2
    );
}

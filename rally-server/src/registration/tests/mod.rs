use super::*;
use crate::bus::EventHandler;
use crate::db::{GameStore, RedbRepository};
use async_trait::async_trait;
use shared::util::MILLIS_PER_HOUR;
use shared::{GameEventType, PaymentStatus};
use std::sync::Mutex;

const ALL_EVENT_TYPES: [GameEventType; 13] = [
    GameEventType::PlayerJoined,
    GameEventType::RegistrationCanceled,
    GameEventType::WaitlistedPromoted,
    GameEventType::PaymentMarked,
    GameEventType::PaymentAttemptRejectedEarly,
    GameEventType::EventCreated,
    GameEventType::EventClosed,
    GameEventType::EventCanceled,
    GameEventType::EventFinished,
    GameEventType::GameReminder24h,
    GameEventType::GameReminder2h,
    GameEventType::PaymentReminder12h,
    GameEventType::PaymentReminder24h,
];

/// Records every published event for assertions
struct Recorder {
    events: Mutex<Vec<GameEvent>>,
}

#[async_trait]
impl EventHandler for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn handle(&self, event: &GameEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

impl Recorder {
    fn of_type(&self, event_type: GameEventType) -> Vec<GameEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    fn types(&self) -> Vec<GameEventType> {
        self.events.lock().unwrap().iter().map(|e| e.event_type).collect()
    }
}

struct TestCtx {
    engine: Arc<RegistrationEngine<RedbRepository>>,
    repo: Arc<RedbRepository>,
    recorder: Arc<Recorder>,
}

fn setup() -> TestCtx {
    let store = GameStore::open_in_memory().unwrap();
    let repo = Arc::new(RedbRepository::new(store));
    let bus = Arc::new(EventBus::new());
    let recorder = Arc::new(Recorder {
        events: Mutex::new(Vec::new()),
    });
    bus.subscribe_many(&ALL_EVENT_TYPES, recorder.clone());
    TestCtx {
        engine: Arc::new(RegistrationEngine::new(repo.clone(), bus)),
        repo,
        recorder,
    }
}

fn new_game_input(starts_in_hours: i64, capacity: u32) -> NewGame {
    NewGame {
        organizer_id: "org-1".to_string(),
        venue_id: "venue-1".to_string(),
        starts_at: now_millis() + starts_in_hours * MILLIS_PER_HOUR,
        capacity,
        level_tag: Some("B".to_string()),
        price_text: Some("$5".to_string()),
    }
}

/// Insert a game directly, bypassing the engine - for started/closed
/// setups the create operation would not produce
fn seed_game(ctx: &TestCtx, starts_in_hours: i64, capacity: u32, status: GameStatus) -> Game {
    let mut game = Game::new(new_game_input(starts_in_hours, capacity));
    game.status = status;
    ctx.repo
        .transaction::<_, EngineError, _>(|txn| {
            txn.insert_game(&game)?;
            Ok(())
        })
        .unwrap();
    game
}

fn registration_of(ctx: &TestCtx, game_id: &str, player_id: &str) -> Option<Registration> {
    ctx.repo
        .registrations_for_game(game_id)
        .unwrap()
        .into_iter()
        .find(|r| r.player_id == player_id && r.is_active())
}

fn confirmed_count(ctx: &TestCtx, game_id: &str) -> usize {
    ctx.repo
        .registrations_for_game(game_id)
        .unwrap()
        .iter()
        .filter(|r| r.status == RegistrationStatus::Confirmed)
        .count()
}

// ========================================================================
// Core: create and read side
// ========================================================================

#[tokio::test]
async fn test_create_rejects_zero_capacity() {
    let ctx = setup();
    let err = ctx
        .engine
        .create(new_game_input(24, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(err.code(), "invalid_input");
    // Nothing was persisted or published
    assert!(ctx.engine.list_games().unwrap().is_empty());
    assert!(ctx.recorder.types().is_empty());
}

#[tokio::test]
async fn test_create_persists_and_publishes() {
    let ctx = setup();
    let game = ctx.engine.create(new_game_input(24, 6)).await.unwrap();

    assert_eq!(game.status, GameStatus::Open);
    assert_eq!(ctx.engine.get_game(&game.id).unwrap(), game);

    let created = ctx.recorder.of_type(GameEventType::EventCreated);
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].payload.game_id(), game.id);
}

#[tokio::test]
async fn test_get_game_not_found() {
    let ctx = setup();
    let err = ctx.engine.get_game("missing").unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_registrations_requires_existing_game() {
    let ctx = setup();
    assert!(matches!(
        ctx.engine.registrations("missing").unwrap_err(),
        EngineError::NotFound(_)
    ));

    let game = ctx.engine.create(new_game_input(24, 2)).await.unwrap();
    assert!(ctx.engine.registrations(&game.id).unwrap().is_empty());
}

mod test_concurrency;
mod test_join;
mod test_leave;

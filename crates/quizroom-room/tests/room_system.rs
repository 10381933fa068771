//! Integration tests for the room system: store, actors, timers and the
//! cleanup reaper running together on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use quizroom_protocol::{ConnectionId, RoomCode, ServerEvent};
use quizroom_room::{
    CleanupScheduler, EventSender, GameConfig, Question, QuestionBank, RoomError, RoomHandle,
    RoomServices, RoomStore, SharedRoomStore, run_reaper,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

const ALICE: ConnectionId = ConnectionId::new(1);
const BOB: ConnectionId = ConnectionId::new(2);

fn bank(count: u32) -> Arc<QuestionBank> {
    let questions = (1..=count)
        .map(|id| Question {
            id,
            question: format!("Question {id}?"),
            options: vec!["wrong".into(), "right".into(), "wrong too".into()],
            correct_answer: 1,
            explanation: None,
        })
        .collect();
    let mut bank = QuestionBank::new();
    bank.insert("general", questions).unwrap();
    Arc::new(bank)
}

fn config() -> GameConfig {
    GameConfig {
        questions_per_game: 2,
        time_limit_secs: 30,
        base_points: 100,
        time_bonus_max: 50,
        start_delay_ms: 3_000,
        results_delay_ms: 5_000,
        ..GameConfig::default()
    }
}

/// A store with a running reaper.
fn setup(grace: Duration) -> SharedRoomStore {
    let (cleanup, expired) = CleanupScheduler::new(grace);
    let store = RoomStore::new(RoomServices {
        bank: bank(5),
        config: config(),
        cleanup,
    })
    .shared();
    tokio::spawn(run_reaper(Arc::clone(&store), expired));
    store
}

fn client() -> (EventSender, mpsc::UnboundedReceiver<ServerEvent>) {
    mpsc::unbounded_channel()
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
    rx.recv().await.expect("channel closed")
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

struct Lobby {
    handle: RoomHandle,
    alice: mpsc::UnboundedReceiver<ServerEvent>,
    bob: mpsc::UnboundedReceiver<ServerEvent>,
}

/// Room `Z1` with Alice (host) and Bob seated.
async fn lobby(store: &SharedRoomStore) -> Lobby {
    let handle = store
        .lock()
        .await
        .create_with_code(RoomCode::new("Z1"), Some("Alice".into()))
        .unwrap();
    let (alice_tx, mut alice) = client();
    let (bob_tx, mut bob) = client();
    handle.join(ALICE, "Alice", alice_tx).await.unwrap();
    handle.join(BOB, "Bob", bob_tx).await.unwrap();
    drain(&mut alice);
    drain(&mut bob);
    Lobby { handle, alice, bob }
}

/// Starts the match and waits for the first question.
async fn start_match(lobby: &mut Lobby) -> Instant {
    lobby.handle.start(ALICE).await.unwrap();
    assert_eq!(recv(&mut lobby.alice).await, ServerEvent::GameStarted);
    assert_eq!(recv(&mut lobby.bob).await, ServerEvent::GameStarted);
    let ServerEvent::NewQuestion(prompt) = recv(&mut lobby.alice).await else {
        panic!("expected newQuestion");
    };
    assert_eq!(prompt.question_number, 1);
    drain(&mut lobby.bob);
    Instant::now()
}

#[tokio::test(start_paused = true)]
async fn test_start_by_non_host_rejected() {
    let store = setup(Duration::from_secs(10));
    let mut lobby = lobby(&store).await;

    assert_eq!(lobby.handle.start(BOB).await, Err(RoomError::NotHost));
    assert!(!lobby.handle.get_info().await.unwrap().has_started);
    assert!(drain(&mut lobby.alice).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_first_question_waits_for_start_delay() {
    let store = setup(Duration::from_secs(10));
    let mut lobby = lobby(&store).await;
    let started = Instant::now();

    start_match(&mut lobby).await;

    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_question_closes_on_timeout_when_someone_is_silent() {
    let store = setup(Duration::from_secs(10));
    let mut lobby = lobby(&store).await;
    let opened = start_match(&mut lobby).await;

    lobby.handle.submit_answer(ALICE, 1, 25.0).await.unwrap();
    assert_eq!(
        recv(&mut lobby.alice).await,
        ServerEvent::AnswerSubmitted {
            is_correct: true,
            answer_index: 1
        }
    );
    // Bob never hears about Alice's answer.
    assert!(drain(&mut lobby.bob).is_empty());

    let ServerEvent::QuestionResult {
        correct_answer,
        results,
        scores,
        ..
    } = recv(&mut lobby.bob).await
    else {
        panic!("expected questionResult");
    };
    let waited = opened.elapsed();
    assert!(waited >= Duration::from_secs(30) && waited < Duration::from_secs(31));
    assert_eq!(correct_answer, 1);
    assert_eq!(results[0].points, 141);
    assert_eq!(results[1].points, 0);
    assert!(!results[1].answered);
    assert_eq!(scores[0].score, 141);
    assert_eq!(scores[1].score, 0);
}

#[tokio::test(start_paused = true)]
async fn test_question_closes_early_when_everyone_answered() {
    let store = setup(Duration::from_secs(10));
    let mut lobby = lobby(&store).await;
    let opened = start_match(&mut lobby).await;

    lobby.handle.submit_answer(ALICE, 1, 29.0).await.unwrap();
    lobby.handle.submit_answer(BOB, 0, 28.0).await.unwrap();

    let events = drain(&mut lobby.bob);
    assert!(matches!(
        events.as_slice(),
        [
            ServerEvent::AnswerSubmitted { is_correct: false, .. },
            ServerEvent::QuestionResult { .. }
        ]
    ));
    assert!(opened.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_answer_rejected() {
    let store = setup(Duration::from_secs(10));
    let mut lobby = lobby(&store).await;
    start_match(&mut lobby).await;

    lobby.handle.submit_answer(ALICE, 0, 20.0).await.unwrap();
    assert_eq!(
        lobby.handle.submit_answer(ALICE, 1, 19.0).await,
        Err(RoomError::DuplicateAnswer)
    );
}

#[tokio::test(start_paused = true)]
async fn test_match_runs_to_end_and_room_is_reusable() {
    let store = setup(Duration::from_secs(10));
    let mut lobby = lobby(&store).await;
    start_match(&mut lobby).await;

    // Q1: Bob right, Alice wrong.
    lobby.handle.submit_answer(ALICE, 0, 20.0).await.unwrap();
    lobby.handle.submit_answer(BOB, 1, 15.0).await.unwrap();
    drain(&mut lobby.alice);

    // Q2 after the results pause; only Alice answers.
    let ServerEvent::NewQuestion(prompt) = recv(&mut lobby.alice).await else {
        panic!("expected newQuestion");
    };
    assert_eq!(prompt.question_number, 2);
    lobby.handle.submit_answer(ALICE, 1, 3.0).await.unwrap();

    let ended = loop {
        if let ServerEvent::GameEnded { final_scores, winner } = recv(&mut lobby.alice).await {
            break (final_scores, winner);
        }
    };
    let (final_scores, winner) = ended;
    // Bob 125, Alice 105.
    assert_eq!(final_scores[0].id, BOB);
    assert_eq!(final_scores[0].score, 125);
    assert_eq!(final_scores[1].score, 105);
    assert!(final_scores.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(winner.as_ref(), final_scores.first());

    let ServerEvent::RoomUpdate { players, .. } = recv(&mut lobby.alice).await else {
        panic!("expected roomUpdate");
    };
    assert!(players.iter().all(|p| p.score == 0));
    assert!(!lobby.handle.get_info().await.unwrap().has_started);
    assert!(lobby.handle.start(ALICE).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_mid_match_redirects_and_keeps_score() {
    let store = setup(Duration::from_secs(10));
    let mut lobby = lobby(&store).await;
    start_match(&mut lobby).await;
    lobby.handle.submit_answer(BOB, 1, 30.0).await.unwrap();
    lobby.handle.disconnect(BOB).await.unwrap();

    let (tx, mut bob_again) = client();
    let new_bob = ConnectionId::new(3);
    lobby.handle.join(new_bob, "BOB", tx).await.unwrap();

    let events = drain(&mut bob_again);
    assert!(matches!(events[0], ServerEvent::RoomUpdate { .. }));
    assert_eq!(events[1], ServerEvent::GameStarted);
    assert!(matches!(events[2], ServerEvent::NewQuestion(_)));
    assert_eq!(
        lobby.handle.submit_answer(new_bob, 1, 10.0).await,
        Err(RoomError::DuplicateAnswer)
    );

    // Strangers stay out while the match runs.
    let (tx, _rx) = client();
    assert_eq!(
        lobby.handle.join(ConnectionId::new(4), "Mallory", tx).await,
        Err(RoomError::MatchAlreadyStarted)
    );
    assert!(!lobby.handle.can_join("mallory").await.unwrap());
    assert!(lobby.handle.can_join("alice").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_empty_room_deleted_after_grace() {
    let store = setup(Duration::from_secs(10));
    let code = store.lock().await.create(None).room_id().clone();

    tokio::time::sleep(Duration::from_secs(11)).await;

    assert!(matches!(
        store.lock().await.get(&code),
        Err(RoomError::RoomNotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_join_just_before_grace_keeps_room() {
    let store = setup(Duration::from_secs(10));
    let handle = store.lock().await.create(None);
    let code = handle.room_id().clone();

    tokio::time::sleep(Duration::from_secs(9)).await;
    let (tx, _rx) = client();
    handle.join(ALICE, "Alice", tx).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    let store = store.lock().await;
    assert!(store.get(&code).is_ok());
    assert!(!store.services().cleanup.is_pending(&code));
}

#[tokio::test(start_paused = true)]
async fn test_last_leave_schedules_cleanup() {
    let store = setup(Duration::from_secs(10));
    let handle = store.lock().await.create(None);
    let code = handle.room_id().clone();
    let (tx, _rx) = client();
    handle.join(ALICE, "Alice", tx).await.unwrap();

    handle.leave(ALICE).await.unwrap();
    assert!(store.lock().await.services().cleanup.is_pending(&code));

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(!store.lock().await.contains(&code));
    assert!(matches!(
        handle.start(ALICE).await,
        Err(RoomError::Unavailable(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_does_not_schedule_cleanup() {
    let store = setup(Duration::from_secs(10));
    let handle = store.lock().await.create(None);
    let code = handle.room_id().clone();
    let (tx, _rx) = client();
    handle.join(ALICE, "Alice", tx).await.unwrap();

    handle.disconnect(ALICE).await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    let info = handle.get_info().await.unwrap();
    assert_eq!(info.player_count, 1);
    assert_eq!(info.online_count, 0);
    assert!(store.lock().await.contains(&code));
}

#[tokio::test(start_paused = true)]
async fn test_deleted_room_ignores_pending_timers() {
    let store = setup(Duration::from_secs(10));
    let mut lobby = lobby(&store).await;
    lobby.handle.start(ALICE).await.unwrap();

    assert!(store.lock().await.delete(&RoomCode::new("Z1")).await);
    // The start-delay alarm would have fired by now.
    tokio::time::sleep(Duration::from_secs(5)).await;

    let events = drain(&mut lobby.alice);
    assert_eq!(events, vec![ServerEvent::GameStarted]);
    assert!(lobby.handle.get_info().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_all_clears_timers_and_rooms() {
    let store = setup(Duration::from_secs(10));
    let code = store.lock().await.create(None).room_id().clone();

    let mut guard = store.lock().await;
    guard.shutdown_all().await;

    assert!(guard.is_empty());
    assert!(!guard.services().cleanup.is_pending(&code));
}

//! Worker thread hand-off, cancellation and event forwarding.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use gomoku_mcts::{
    spawn_search, BoardState, ChannelObserver, Decision, HeuristicMethod, MctsConfig, MctsEngine,
    SearchBudget, SearchEvent, SearchObserver, Stone,
};

fn opened_board() -> BoardState {
    let mut board = BoardState::new(9, 5, Stone::Black).unwrap();
    board.play(40).unwrap();
    board
}

#[test]
fn cancel_stops_long_search() {
    let engine = MctsEngine::new(MctsConfig::default().with_seed(1)).unwrap();
    let budget = SearchBudget::new(60_000, 0).unwrap();
    let handle = spawn_search(engine, opened_board(), budget, HeuristicMethod::Pattern, None).unwrap();

    thread::sleep(Duration::from_millis(50));
    let start = Instant::now();
    handle.cancel();
    let outcome = handle.wait().unwrap();

    assert!(outcome.cancelled);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(outcome.stats.total_visits, outcome.iterations);
    assert!(matches!(outcome.decision, Decision::Search | Decision::Fallback));
    assert_eq!(opened_board().get(outcome.mv), Stone::Empty);
}

#[test]
fn events_arrive_in_order_through_channel() {
    let engine = MctsEngine::new(MctsConfig::default().with_seed(2)).unwrap();
    let (observer, receiver) = ChannelObserver::bounded(10_000);
    let dropped = observer.dropped_counter();
    let observer: Box<dyn SearchObserver + Send> = Box::new(observer);

    let budget = SearchBudget::iterations(20).unwrap();
    let handle = spawn_search(engine, opened_board(), budget, HeuristicMethod::Pattern, Some(observer)).unwrap();
    let outcome = handle.wait().unwrap();
    let events: Vec<SearchEvent> = receiver.try_iter().collect();

    assert_eq!(dropped.load(Ordering::Relaxed), 0);
    assert!(matches!(events.first(), Some(SearchEvent::SearchStart { .. })));
    assert!(matches!(
        events.last(),
        Some(SearchEvent::SearchComplete { total_iterations: 20, .. })
    ));
    let iterations = events
        .iter()
        .filter(|e| matches!(e, SearchEvent::IterationStart { .. }))
        .count();
    assert_eq!(iterations, 20);
    assert_eq!(outcome.iterations, 20);

    for line in events.iter().map(|e| serde_json::to_string(e).unwrap()) {
        assert!(line.starts_with("{\"type\":"), "{line}");
    }
}

#[test]
fn small_queue_drops_instead_of_blocking() {
    let engine = MctsEngine::new(MctsConfig::default().with_seed(3)).unwrap();
    let (observer, receiver) = ChannelObserver::bounded(4);
    let dropped = observer.dropped_counter();
    let observer: Box<dyn SearchObserver + Send> = Box::new(observer);

    // Nobody reads until the search is done
    let budget = SearchBudget::iterations(50).unwrap();
    let handle = spawn_search(engine, opened_board(), budget, HeuristicMethod::Random, Some(observer)).unwrap();
    let outcome = handle.wait().unwrap();

    assert_eq!(outcome.iterations, 50);
    assert_eq!(receiver.try_iter().count(), 4);
    assert!(dropped.load(Ordering::Relaxed) > 0);
}

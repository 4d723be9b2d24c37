//! Self-play driver for the MCTS move engine
//!
//! Plays games between two engine configurations on an N×N board, printing
//! each position, the chosen move and the best root children.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use flexi_logger::Logger;
use log::info;

use gomoku_mcts::{
    spawn_search, BoardState, ChannelObserver, Decision, HeuristicMethod, MctsConfig, MctsEngine,
    Outcome, PatternWeights, Pos, SearchBudget, SearchObserver, SearchOutcome, Stone,
};

#[derive(Parser, Debug)]
#[command(name = "gomoku-mcts", about = "Self-play between two MCTS engine configurations")]
struct Args {
    /// Board side length
    #[arg(long, default_value_t = 9)]
    size: usize,

    /// Stones in a row needed to win
    #[arg(long, default_value_t = 5)]
    win_len: usize,

    /// Number of games to play
    #[arg(short = 'g', long, default_value_t = 1)]
    games: u32,

    /// Time budget per move in milliseconds
    #[arg(short = 't', long, default_value_t = 1000)]
    time_ms: u64,

    /// Minimum iterations per move, even past the time budget
    #[arg(short = 'n', long, default_value_t = 100)]
    min_iterations: u32,

    /// Hard cap on iterations per move
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Heuristic for Black ("pattern" or "random")
    #[arg(long, default_value = "pattern")]
    black: HeuristicMethod,

    /// Heuristic for White ("pattern" or "random")
    #[arg(long, default_value = "random")]
    white: HeuristicMethod,

    /// UCB1 exploration constant
    #[arg(long, default_value_t = 1.41)]
    exploration: f64,

    /// RNG seed for reproducible games
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with a full weight table
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Stream search events as JSON lines
    #[arg(long, default_value_t = false)]
    events: bool,

    /// Root children to print per move
    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[derive(Debug, Default)]
struct Tally {
    black: u32,
    white: u32,
    draws: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    Logger::try_with_env_or_str("info")?
        .format(flexi_logger::colored_default_format)
        .start()?;

    let weights = match &args.weights {
        Some(path) => PatternWeights::from_json(&fs::read_to_string(path)?)?,
        None => PatternWeights::default(),
    };
    let mut config = MctsConfig::default()
        .with_exploration(args.exploration)
        .with_weights(weights);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let engine = MctsEngine::new(config)?;

    let mut budget = SearchBudget::new(args.time_ms, args.min_iterations)?;
    if let Some(max) = args.max_iterations {
        budget = budget.with_max_iterations(max);
    }

    info!(
        "playing {} game(s) on {}x{} ({} in a row): Black={} White={}",
        args.games, args.size, args.size, args.win_len, args.black, args.white
    );

    let mut tally = Tally::default();
    for game in 1..=args.games {
        let outcome = play_game(&args, &engine, &budget)?;
        match outcome {
            Outcome::Winner(Stone::Black) => tally.black += 1,
            Outcome::Winner(_) => tally.white += 1,
            Outcome::Draw => tally.draws += 1,
        }
        info!("game {} finished: {:?}", game, outcome);
    }

    println!(
        "Black ({}) {} - White ({}) {} - draws {}",
        args.black, tally.black, args.white, tally.white, tally.draws
    );
    Ok(())
}

fn play_game(args: &Args, engine: &MctsEngine, budget: &SearchBudget) -> Result<Outcome, Box<dyn Error>> {
    let mut board = BoardState::new(args.size, args.win_len, Stone::Black)?;
    loop {
        let player = board.current_player();
        let heuristic = if player == Stone::Black { args.black } else { args.white };

        let result = run_search(engine, &board, budget, heuristic, args.events)?;
        report_move(&board, player, &result, args.top);

        board.play(result.mv)?;
        println!("{board}");
        if let Some(outcome) = board.check_winner(false) {
            return Ok(outcome);
        }
    }
}

/// Run one search on a worker thread, forwarding events when requested.
fn run_search(
    engine: &MctsEngine,
    board: &BoardState,
    budget: &SearchBudget,
    heuristic: HeuristicMethod,
    events: bool,
) -> Result<SearchOutcome, Box<dyn Error>> {
    if !events {
        return Ok(spawn_search(engine.clone(), board.clone(), *budget, heuristic, None)?.wait()?);
    }

    let (observer, receiver) = ChannelObserver::bounded(4096);
    let dropped = observer.dropped_counter();
    let observer: Box<dyn SearchObserver + Send> = Box::new(observer);
    let mut handle = spawn_search(engine.clone(), board.clone(), *budget, heuristic, Some(observer))?;

    let result = loop {
        for event in receiver.try_iter() {
            println!("{}", serde_json::to_string(&event)?);
        }
        if let Some(result) = handle.try_result() {
            break result?;
        }
        thread::sleep(Duration::from_millis(5));
    };
    for event in receiver.try_iter() {
        println!("{}", serde_json::to_string(&event)?);
    }

    let dropped = dropped.load(std::sync::atomic::Ordering::Relaxed);
    if dropped > 0 {
        info!("{} events dropped (queue full)", dropped);
    }
    Ok(result)
}

fn report_move(board: &BoardState, player: Stone, result: &SearchOutcome, top: usize) {
    let pos = Pos::from_index(result.mv, board.size());
    println!(
        "{:?} plays ({}, {}) [{:?}, {} iterations, {}ms]",
        player, pos.row, pos.col, result.decision, result.iterations, result.elapsed_ms
    );
    if result.decision != Decision::Search {
        return;
    }
    for child in result.stats.top(top) {
        let p = Pos::from_index(child.mv, board.size());
        println!(
            "  ({}, {})  win rate {:5.1}%  visits {}",
            p.row,
            p.col,
            child.win_rate(),
            child.visits
        );
    }
}

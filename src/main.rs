//! HeyBet command line
//!
//! Plays rounds against a local ledger and prints outcomes, balance and stats.

use clap::{Parser, Subcommand};
use heybet::{
    config::ConfigLoader,
    games::{crash_table, next_event, CrashEvent, RevealOutcome},
    Casino, Color, GameStats, HeyBetConfig, HeyBetResult, Ledger, SeededRng, SettlementReceipt,
    SimulationScenario, Simulator,
};
use std::path::PathBuf;
use tracing::info;

/// HeyBet casino engine
#[derive(Parser)]
#[command(name = "heybet")]
#[command(about = "Play HeyBet casino rounds against a local ledger")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for reproducible outcomes
    #[arg(short, long)]
    seed: Option<u64>,

    /// Starting balance, overrides the configuration
    #[arg(short, long)]
    balance: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick red or black
    Double {
        #[arg(long, default_value = "10")]
        stake: f64,

        #[arg(long, default_value = "red")]
        color: Color,

        #[arg(short, long, default_value = "1")]
        rounds: usize,
    },

    /// Spin the tigrinho reels
    Slots {
        #[arg(long, default_value = "1")]
        stake: f64,

        #[arg(short, long, default_value = "1")]
        spins: usize,
    },

    /// Reveal cells on the mines grid, then cash out
    Mines {
        #[arg(long, default_value = "10")]
        stake: f64,

        #[arg(short, long)]
        mines: Option<usize>,

        /// Cells to reveal, in order (0-24)
        #[arg(short, long, value_delimiter = ',', default_value = "0,1,2")]
        reveal: Vec<usize>,
    },

    /// Ride one crash round with an automatic cash out
    Crash {
        #[arg(long, default_value = "10")]
        stake: f64,

        /// Cash out once the multiplier reaches this value
        #[arg(short, long, default_value = "2.0")]
        target: f64,
    },

    /// Estimate return-to-player over many rounds
    Simulate {
        #[command(subcommand)]
        game: SimulateGame,
    },
}

#[derive(Subcommand)]
enum SimulateGame {
    Double {
        #[arg(short, long, default_value = "10000")]
        rounds: usize,
        #[arg(long, default_value = "1")]
        stake: f64,
        #[arg(long, default_value = "red")]
        color: Color,
    },
    Slots {
        #[arg(short, long, default_value = "10000")]
        rounds: usize,
        #[arg(long, default_value = "1")]
        stake: f64,
    },
    Mines {
        #[arg(short, long, default_value = "10000")]
        rounds: usize,
        #[arg(long, default_value = "1")]
        stake: f64,
        #[arg(short, long, default_value = "3")]
        mines: usize,
        #[arg(long, default_value = "1")]
        reveals: usize,
    },
    Crash {
        #[arg(short, long, default_value = "1000")]
        rounds: usize,
        #[arg(long, default_value = "1")]
        stake: f64,
        #[arg(short, long, default_value = "2.0")]
        target: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heybet=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ConfigLoader::new(cli.config.clone()).load()?;
    if let Some(balance) = cli.balance {
        config.ledger.initial_balance = balance;
        config.validate()?;
    }
    info!(balance = config.ledger.initial_balance, seed = ?cli.seed, "Starting HeyBet");

    match cli.command {
        Commands::Double { stake, color, rounds } => {
            let mut casino = Casino::with_seed(config, cli.seed);
            for _ in 0..rounds {
                let receipt = casino.play_double(stake, color)?;
                print_receipt(&receipt);
            }
            print_summary(casino.ledger());
        }
        Commands::Slots { stake, spins } => {
            let mut casino = Casino::with_seed(config, cli.seed);
            for _ in 0..spins {
                let result = casino.spin_slots(stake)?;
                let reels = result.spin.reels;
                println!("{} {} {}", reels[0], reels[1], reels[2]);
                print_receipt(&result.receipt);
            }
            print_summary(casino.ledger());
        }
        Commands::Mines { stake, mines, reveal } => {
            let mut casino = Casino::with_seed(config, cli.seed);
            run_mines(&mut casino, stake, mines, &reveal)?;
            print_summary(casino.ledger());
        }
        Commands::Crash { stake, target } => {
            let mut ledger = Ledger::from_config(&config.ledger);
            let rng = match cli.seed {
                Some(seed) => SeededRng::from_seed(seed),
                None => SeededRng::from_entropy(),
            };
            run_crash(config, &mut ledger, rng, stake, target).await;
            print_summary(&ledger);
        }
        Commands::Simulate { game } => {
            let scenario = match game {
                SimulateGame::Double { rounds, stake, color } => SimulationScenario::Double {
                    rounds,
                    stake,
                    choice: color,
                },
                SimulateGame::Slots { rounds, stake } => SimulationScenario::Slots { rounds, stake },
                SimulateGame::Mines {
                    rounds,
                    stake,
                    mines,
                    reveals,
                } => SimulationScenario::Mines {
                    rounds,
                    stake,
                    mines,
                    reveals,
                },
                SimulateGame::Crash { rounds, stake, target } => {
                    SimulationScenario::Crash { rounds, stake, target }
                }
            };

            let mut simulator = Simulator::new(config);
            if let Some(seed) = cli.seed {
                simulator = simulator.with_seed(seed);
            }
            let report = simulator.run(&scenario)?;

            println!("game:        {}", report.game);
            println!("rounds:      {}", report.rounds);
            println!("wins:        {}", report.wins);
            println!("staked:      {:.2}", report.total_staked);
            println!("paid:        {:.2}", report.total_paid);
            println!("win rate:    {:.2}%", report.win_rate * 100.0);
            println!("rtp:         {:.2}%", report.rtp * 100.0);
            println!("house edge:  {:.2}%", report.house_edge * 100.0);
            println!("time:        {:.2?}", report.execution_time);
        }
    }

    Ok(())
}

fn run_mines(casino: &mut Casino, stake: f64, mines: Option<usize>, cells: &[usize]) -> HeyBetResult<()> {
    let mines = mines.unwrap_or(casino.config().mines.default_mines);
    casino.start_mines(stake, mines)?;
    println!("Mines round: {} mines, stake {:.2}", mines, stake);

    for &cell in cells {
        let reveal = casino.reveal_mine_cell(cell)?;
        match reveal.outcome {
            RevealOutcome::Diamond { multiplier, .. } => {
                let next = casino.mines().round().map_or(multiplier, |round| round.next_multiplier());
                println!("cell {:>2}: 💎  x{:.2} (next x{:.2})", cell, multiplier, next);
            }
            RevealOutcome::Mine(_) => {
                println!("cell {:>2}: 💣", cell);
                if let Some(receipt) = reveal.receipt {
                    print_receipt(&receipt);
                }
                return Ok(());
            }
        }
    }

    let receipt = casino.cash_out_mines()?;
    print_receipt(&receipt);
    Ok(())
}

async fn run_crash(config: HeyBetConfig, ledger: &mut Ledger, rng: SeededRng, stake: f64, target: f64) {
    let (runner, handle) = crash_table(config.crash, ledger, rng);
    let mut events = handle.subscribe();

    let player = async {
        let mut round = None;
        let mut cashed_out = false;

        while let Some(event) = next_event(&mut events).await {
            match event {
                CrashEvent::BettingOpened { round: r, countdown } if round.is_none() => {
                    match handle.place_bet(stake).await {
                        Ok(()) => {
                            println!("Bet {:.2} placed, take off in {:.1}s", stake, countdown.as_secs_f64());
                            round = Some(r);
                        }
                        Err(e) => {
                            println!("Bet rejected: {}", e);
                            break;
                        }
                    }
                }
                CrashEvent::MultiplierUpdated { round: r, multiplier }
                    if Some(r) == round && !cashed_out && multiplier >= target =>
                {
                    match handle.cash_out().await {
                        Ok(receipt) => {
                            cashed_out = true;
                            print_receipt(&receipt);
                        }
                        Err(e) => println!("Cash out failed: {}", e),
                    }
                }
                CrashEvent::Crashed { round: r, multiplier, .. } if Some(r) == round => {
                    println!("Crashed at {:.2}x", multiplier);
                    if !cashed_out {
                        println!("LOST {:.2}", stake);
                    }
                    break;
                }
                _ => {}
            }
        }

        handle.shutdown().await;
    };

    tokio::join!(runner.run(), player);
}

fn print_receipt(receipt: &SettlementReceipt) {
    let record = &receipt.record;
    if record.won {
        println!(
            "[{}] WON {:.2} (stake {:.2}) balance {:.2}",
            record.game(),
            record.payout,
            record.stake,
            receipt.balance_after
        );
    } else {
        println!(
            "[{}] LOST {:.2} balance {:.2}",
            record.game(),
            record.stake,
            receipt.balance_after
        );
    }
}

fn print_summary(ledger: &Ledger) {
    let GameStats {
        total_rounds,
        total_staked,
        total_paid_out,
        win_rate,
    } = ledger.stats();
    println!(
        "Balance {:.2} | rounds {} | staked {:.2} | paid {:.2} | win rate {}%",
        ledger.balance(),
        total_rounds,
        total_staked,
        total_paid_out,
        win_rate
    );
}

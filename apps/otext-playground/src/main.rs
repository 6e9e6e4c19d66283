//! # otext Playground
//!
//! A standalone CLI that walks through operational transformation on a
//! simulated cluster: one authoritative server, several clients, and
//! ordered queues in between that only move when told to.
//!
//! ## Protocol in one picture
//!
//! ```text
//! client ──submit(rev, ops)──▶ server   (stale rev: transform against
//!                                        compose(log[rev..]) first)
//! client ◀──broadcast(v, ops)── server  (own echo = acknowledgement)
//! ```

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use colored::*;
use otext_core::transform;
use otext_sync::{ClientState, Cluster, OperationList, SyncError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "otext-playground")]
#[command(about = "Operational transformation playground (otext)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Basic demo: two clients edit "hello world" concurrently and converge
    Demo,
    /// Conflicts: inserts at the same point, overlapping deletes
    Conflict,
    /// A stale client is caught up over two log entries
    CatchUp,
    /// Random edits and deliveries with a convergence check
    Random {
        /// Number of clients
        #[arg(short, long, default_value_t = 3)]
        clients: usize,
        /// Number of random actions
        #[arg(short, long, default_value_t = 200)]
        steps: usize,
        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run the demo quietly and print the server log
    Log {
        /// Print the log as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive REPL for manual experimentation
    Interactive {
        /// Initial document text
        #[arg(short, long, default_value = "hello world")]
        text: String,
    },
}

// ─── Pretty printing ──────────────────────────────────────────────────────

fn header(text: &str) {
    let bar = "═".repeat(60);
    println!("\n{}", bar.bright_cyan());
    println!("  {}", text.bold().bright_white());
    println!("{}", bar.bright_cyan());
}

fn section(text: &str) {
    println!("\n{} {}", "▸".bright_yellow(), text.bold());
}

fn step(text: &str) {
    println!("  {} {}", "•".bright_green(), text);
}

fn arrow(from: &str, label: &str, to: &str) {
    println!(
        "  {} {} {}",
        from.bright_magenta(),
        format!("──{}──▶", label).bright_cyan(),
        to.bright_magenta(),
    );
}

fn state_label(state: ClientState) -> ColoredString {
    match state {
        ClientState::Synchronized => format!("{:<15}", "synchronized").bright_green(),
        ClientState::Awaiting => format!("{:<15}", "awaiting").bright_yellow(),
        ClientState::AwaitingWithBuffer => format!("{:<15}", "awaiting+buffer").bright_red(),
    }
}

fn show_cluster(cluster: &Cluster) {
    let border = "─".repeat(56);
    println!("  ┌{}┐", border);
    println!(
        "  │ {:<54} │",
        format!("server  v{:<3} {:?}", cluster.server().version(), cluster.server().text())
    );
    println!("  ├{}┤", border);
    for (idx, client) in cluster.clients().iter().enumerate() {
        println!(
            "  │ {:<8} v{:<3} {:<40} │",
            client.id().as_str(),
            client.version(),
            format!("{:?}", client.text())
        );
        let queues = format!(
            "up:{} down:{}",
            cluster.pending_to_server(idx),
            cluster.pending_to_client(idx)
        );
        println!("  │   {} {:<36} │", state_label(client.state()), queues);
    }
    println!("  └{}┘", border);
}

fn convergence_result(converged: bool) {
    if converged {
        println!(
            "\n  {} {}",
            "✓".bright_green().bold(),
            "ALL CLIENTS CONVERGED: texts match the server!"
                .bright_green()
                .bold()
        );
    } else {
        println!(
            "\n  {} {}",
            "✗".bright_red().bold(),
            "DIVERGENCE DETECTED: clients differ from the server!"
                .bright_red()
                .bold()
        );
    }
}

fn submit(cluster: &mut Cluster, idx: usize) -> Result<(), SyncError> {
    let name = cluster.client(idx).id().to_string();
    if cluster.deliver_to_server(idx)? {
        let entry = cluster.server().log().last().map(|m| m.operations.to_string());
        arrow(&name, "submit", "server");
        step(&format!(
            "server v{} applied {}",
            cluster.server().version(),
            entry.unwrap_or_default()
        ));
    }
    Ok(())
}

// ─── Demo ──────────────────────────────────────────────────────────────────

fn run_demo() -> Result<(), SyncError> {
    header("DEMO: Concurrent Edits on \"hello world\"");

    let mut cluster = Cluster::with_names(["alice", "bob"], "hello world");

    section("Phase 1: Both clients edit revision 0");
    cluster.apply_local(0, OperationList::new().retain(5).insert(",").retain(6))?;
    step("alice: [retain(5), insert(\",\"), retain(6)]  →  \"hello, world\"");
    cluster.apply_local(1, OperationList::new().retain(11).insert("!"))?;
    step("bob:   [retain(11), insert(\"!\")]            →  \"hello world!\"");
    show_cluster(&cluster);

    section("Phase 2: Submissions reach the server");
    submit(&mut cluster, 0)?;
    submit(&mut cluster, 1)?;
    step("bob's edit was made at revision 0 and transformed past alice's");

    section("Phase 3: Broadcasts reach the clients");
    cluster.settle()?;
    show_cluster(&cluster);
    convergence_result(cluster.is_converged());
    Ok(())
}

// ─── Conflict ──────────────────────────────────────────────────────────────

fn run_conflict() -> Result<(), SyncError> {
    header("CONFLICT: Same-Point Inserts and Overlapping Deletes");

    section("Case 1: X and Y inserted between \"a\" and \"b\"");
    let ops1 = OperationList::new().retain(1).insert("X").retain(1);
    let ops2 = OperationList::new().retain(1).insert("Y").retain(1);
    let (ops2_t, ops1_t) = transform(&ops1, &ops2);
    step(&format!("transform({}, {})", ops1, ops2));
    step(&format!("  ops2' = {}", ops2_t));
    step(&format!("  ops1' = {}", ops1_t));

    let mut cluster = Cluster::with_names(["alice", "bob"], "ab");
    cluster.apply_local(0, ops1)?;
    cluster.apply_local(1, ops2)?;
    submit(&mut cluster, 0)?;
    submit(&mut cluster, 1)?;
    cluster.settle()?;
    show_cluster(&cluster);
    step("the edit that reaches the server first goes first: \"aXYb\"");
    convergence_result(cluster.is_converged());

    section("Case 2: \"bcd\" and \"cde\" deleted from \"abcdef\"");
    let ops1 = OperationList::new().retain(1).delete(3).retain(2);
    let ops2 = OperationList::new().retain(2).delete(3).retain(1);
    let (ops2_t, ops1_t) = transform(&ops1, &ops2);
    step(&format!("transform({}, {})", ops1, ops2));
    step(&format!("  ops2' = {}", ops2_t));
    step(&format!("  ops1' = {}", ops1_t));

    let mut cluster = Cluster::with_names(["alice", "bob"], "abcdef");
    cluster.apply_local(0, ops1)?;
    cluster.apply_local(1, ops2)?;
    submit(&mut cluster, 1)?;
    submit(&mut cluster, 0)?;
    cluster.settle()?;
    show_cluster(&cluster);
    step("the overlap \"cd\" is deleted once: \"af\"");
    convergence_result(cluster.is_converged());
    Ok(())
}

// ─── Catch-up ──────────────────────────────────────────────────────────────

fn run_catch_up() -> Result<(), SyncError> {
    header("CATCH-UP: A Stale Client Two Revisions Behind");

    let mut cluster = Cluster::with_names(["alice", "carol"], "the quick fox");

    section("Phase 1: carol edits at revision 0 and goes quiet");
    cluster.edit(1, "the quick red fox!")?;
    step("carol: \"the quick fox\" → \"the quick red fox!\"");

    section("Phase 2: alice lands two edits");
    cluster.edit(0, "the slow fox")?;
    submit(&mut cluster, 0)?;
    cluster.deliver_to_client(0)?;
    cluster.edit(0, "the slow brown fox")?;
    submit(&mut cluster, 0)?;
    show_cluster(&cluster);

    section("Phase 3: carol's revision-0 edit arrives");
    let catch_up = cluster.server().catch_up(0)?;
    step(&format!("compose(log[0..2]) = {}", catch_up));
    submit(&mut cluster, 1)?;

    section("Phase 4: settle");
    cluster.settle()?;
    show_cluster(&cluster);
    convergence_result(cluster.is_converged());
    Ok(())
}

// ─── Random ────────────────────────────────────────────────────────────────

fn random_edit(rng: &mut StdRng, text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let at = rng.gen_range(0..=chars.len());
    let end = (at + rng.gen_range(0..3)).min(chars.len());
    let insert: String = (0..rng.gen_range(0..3))
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect();
    chars.splice(at..end, insert.chars());
    chars.into_iter().collect()
}

fn run_random(clients: usize, steps: usize, seed: u64) -> Result<(), SyncError> {
    header(&format!(
        "RANDOM: {} clients, {} steps, seed {}",
        clients, steps, seed
    ));

    let clients = clients.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cluster = Cluster::new(clients, "the quick brown fox");
    let (mut edits, mut uploads, mut downloads) = (0, 0, 0);

    section("Phase 1: interleaving edits and deliveries");
    for i in 0..steps {
        let idx = rng.gen_range(0..clients);
        match rng.gen_range(0..4) {
            0 | 1 => {
                let next = random_edit(&mut rng, cluster.client(idx).text());
                cluster.edit(idx, &next)?;
                edits += 1;
            }
            2 => uploads += usize::from(cluster.deliver_to_server(idx)?),
            _ => downloads += usize::from(cluster.deliver_to_client(idx)?),
        }
        if (i + 1) % 50 == 0 {
            step(&format!(
                "step {:>4}: server v{}, {} edits, {} up, {} down",
                i + 1,
                cluster.server().version(),
                edits,
                uploads,
                downloads
            ));
        }
    }

    section("Phase 2: settle");
    cluster.settle()?;
    show_cluster(&cluster);
    convergence_result(cluster.is_converged());
    Ok(())
}

// ─── Log ───────────────────────────────────────────────────────────────────

fn run_log(json: bool) -> Result<(), SyncError> {
    let mut cluster = Cluster::with_names(["alice", "bob"], "hello world");
    cluster.apply_local(0, OperationList::new().retain(5).insert(",").retain(6))?;
    cluster.apply_local(1, OperationList::new().retain(11).insert("!"))?;
    cluster.settle()?;
    cluster.edit(1, "hello, brave world!")?;
    cluster.settle()?;

    if json {
        match serde_json::to_string_pretty(cluster.server().log()) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("{} {}", "✗".bright_red(), e),
        }
    } else {
        header("SERVER LOG");
        for entry in cluster.server().log() {
            println!(
                "  {} {:<6} {}",
                format!("v{}", entry.revision).bright_yellow(),
                entry.author.as_str().bright_magenta(),
                entry.operations
            );
        }
        step(&format!("final text: {:?}", cluster.server().text()));
    }
    Ok(())
}

// ─── Interactive REPL ──────────────────────────────────────────────────────

fn parse_client(cluster: &Cluster, arg: Option<&str>) -> Option<usize> {
    let arg = arg?;
    arg.parse::<usize>()
        .ok()
        .filter(|idx| *idx < cluster.clients().len())
        .or_else(|| {
            cluster
                .clients()
                .iter()
                .position(|client| client.id().as_str() == arg)
        })
}

fn run_interactive(text: &str) -> Result<(), SyncError> {
    header("INTERACTIVE REPL: otext cluster");

    let mut cluster = Cluster::with_names(["alice", "bob", "carol"], text);

    println!();
    println!("  {}", "Commands:".bold().underline());
    println!("    {} <client> <text...>   Replace the client's text", "edit".bright_cyan());
    println!("    {} <client>               Deliver one submission", "up".bright_cyan());
    println!("    {} <client>             Deliver one broadcast", "down".bright_cyan());
    println!("    {}                    Deliver everything", "settle".bright_cyan());
    println!("    {}                      Show the cluster", "show".bright_cyan());
    println!("    {}                       Show the server log", "log".bright_cyan());
    println!("    {}                      Exit", "quit".bright_cyan());
    println!();

    loop {
        print!("{}", "otext> ".bright_cyan().bold());
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() || input.is_empty() {
            break;
        }
        let input = input.trim();
        let mut parts = input.splitn(3, ' ');
        let command = parts.next().unwrap_or_default();
        let target = parts.next();
        let rest = parts.next().unwrap_or_default();

        let result = match command {
            "" => Ok(()),
            "edit" | "e" => match parse_client(&cluster, target) {
                Some(idx) => cluster.edit(idx, rest),
                None => {
                    println!("  {} Usage: edit <client> <text>", "!".bright_red());
                    Ok(())
                }
            },
            "up" | "u" => match parse_client(&cluster, target) {
                Some(idx) => submit(&mut cluster, idx),
                None => {
                    println!("  {} Usage: up <client>", "!".bright_red());
                    Ok(())
                }
            },
            "down" | "d" => match parse_client(&cluster, target) {
                Some(idx) => cluster.deliver_to_client(idx).map(|delivered| {
                    if !delivered {
                        step("nothing queued");
                    }
                }),
                None => {
                    println!("  {} Usage: down <client>", "!".bright_red());
                    Ok(())
                }
            },
            "settle" | "s" => cluster.settle().map(|_| convergence_result(cluster.is_converged())),
            "show" | "l" => {
                show_cluster(&cluster);
                Ok(())
            }
            "log" => {
                for entry in cluster.server().log() {
                    step(&format!("v{} {} {}", entry.revision, entry.author, entry.operations));
                }
                Ok(())
            }
            "quit" | "exit" | "q" => {
                println!("  {}", "Goodbye!".dimmed());
                break;
            }
            other => {
                println!(
                    "  {} Unknown command '{}', try show, edit, up, down, settle",
                    "?".bright_yellow(),
                    other
                );
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("  {} {}", "✗".bright_red(), e);
        }
    }
    Ok(())
}

// ─── Entry point ───────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Demo => run_demo(),
        Commands::Conflict => run_conflict(),
        Commands::CatchUp => run_catch_up(),
        Commands::Random {
            clients,
            steps,
            seed,
        } => run_random(clients, steps, seed),
        Commands::Log { json } => run_log(json),
        Commands::Interactive { text } => run_interactive(&text),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "✗".bright_red().bold(), e);
        std::process::exit(1);
    }
}

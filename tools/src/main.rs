//! flow-runner: headless driver for the cancellation wizard.
//!
//! Usage:
//!   flow-runner --simulate 500 --seed 12345 --db run.db
//!   flow-runner --ipc-mode --user <uuid> --subscription <uuid>

use anyhow::Result;
use cancelflow_core::{
    record::{SubscriptionRecord, SubscriptionStatus},
    variant::variant_for_user,
    walker::{random_walk, FlowRng},
    CancellationFlow, FlowConfig, FlowEvent, FlowStore,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

const MAX_EVENTS_PER_WALK: u32 = 60;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let simulate = parse_arg(&args, "--simulate", 100u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let config_path = str_arg(&args, "--config").unwrap_or("./data/flow_config.json");

    let config = load_config(config_path)?;
    let store = FlowStore::open(db)?;
    store.migrate()?;

    if ipc_mode {
        let user = str_arg(&args, "--user").unwrap_or_default();
        let subscription = str_arg(&args, "--subscription").unwrap_or_default();
        run_ipc_loop(&store, config, user, subscription)?;
    } else {
        println!("cancelflow: flow-runner");
        println!("  seed:      {seed}");
        println!("  users:     {simulate}");
        println!("  db:        {db}");
        println!("  config:    {config_path}");
        println!();
        run_simulation(&store, &config, seed, simulate)?;
        print_summary(&store, simulate)?;
    }

    Ok(())
}

fn load_config(path: &str) -> Result<FlowConfig> {
    if Path::new(path).exists() {
        FlowConfig::load(path)
    } else {
        log::warn!("config {path} not found, using built-in defaults");
        Ok(FlowConfig::default())
    }
}

/// One JSON `FlowEvent` per line in, one JSON screen (or error) per line out.
fn run_ipc_loop(store: &FlowStore, config: FlowConfig, user: &str, subscription: &str) -> Result<()> {
    ensure_subscription(store, &config, user, subscription)?;

    let mut flow = CancellationFlow::open(store, config, user, subscription);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    writeln!(stdout, "{}", serde_json::to_string(&flow.screen())?)?;
    stdout.flush()?;

    while !flow.is_closed() {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<FlowEvent>(&buffer) {
            Ok(event) => match flow.handle(event) {
                Ok(outcome) if outcome.is_closed() => {
                    serde_json::json!({ "closed": true, "outcome": outcome })
                }
                Ok(_) => serde_json::to_value(flow.screen())?,
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            },
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Give the wizard a subscription row to move when the host has not seeded one.
fn ensure_subscription(
    store: &FlowStore,
    config: &FlowConfig,
    user: &str,
    subscription: &str,
) -> Result<()> {
    if subscription.is_empty() || store.subscription(subscription)?.is_some() {
        return Ok(());
    }
    let price = config.offer_for(variant_for_user(user)).original_price_cents;
    store.insert_subscription(&SubscriptionRecord {
        id: subscription.to_string(),
        user_id: user.to_string(),
        monthly_price_cents: price,
        status: SubscriptionStatus::Active,
    })?;
    log::info!("seeded subscription {subscription} for user {user}");
    Ok(())
}

fn run_simulation(store: &FlowStore, config: &FlowConfig, seed: u64, users: u32) -> Result<()> {
    let mut rng = FlowRng::new(seed);
    let mut rejected = 0u32;
    let mut unfinished = 0u32;

    for _ in 0..users {
        let user = rng.next_uuid().to_string();
        let subscription = rng.next_uuid().to_string();
        ensure_subscription(store, config, &user, &subscription)?;

        let mut flow = CancellationFlow::open(store, config.clone(), &user, &subscription);
        let summary = random_walk(&mut flow, &mut rng, MAX_EVENTS_PER_WALK)?;
        rejected += summary.rejected;
        if !summary.closed {
            unfinished += 1;
        }
        log::debug!(
            "walk user={user} events={} final={:?} path={:?}",
            summary.events_sent,
            summary.final_step,
            summary.path
        );
    }

    println!("  guard rejections: {rejected}");
    println!("  unfinished walks: {unfinished}");
    println!();
    Ok(())
}

fn print_summary(store: &FlowStore, users: u32) -> Result<()> {
    let records = store.cancellation_count()?;
    let completed = store.completed_cancellation_count()?;
    let accepted = store.accepted_downsell_count()?;
    let (variant_a, variant_b) = store.variant_split()?;
    let active = store.subscription_count_by_status(SubscriptionStatus::Active)?;
    let pending = store.subscription_count_by_status(SubscriptionStatus::PendingCancellation)?;
    let cancelled = store.subscription_count_by_status(SubscriptionStatus::Cancelled)?;

    println!("=== RUN SUMMARY ===");
    println!("  users:              {users}");
    println!("  records:            {records}");
    println!("  variant A / B:      {variant_a} / {variant_b}");
    println!("  completed:          {completed}");
    println!("  downsells accepted: {accepted}");
    println!();
    println!("=== SUBSCRIPTIONS ===");
    println!("  active:               {active}");
    println!("  pending_cancellation: {pending}");
    println!("  cancelled:            {cancelled}");
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

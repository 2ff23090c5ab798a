//! corridor: two cooperating couriers on a small map.
//!
//! Runs the full agent stack against an in-process world: parcels spawn on
//! the four corner `S` tiles, decay one point per second, and score when
//! dropped on the central `D` tile.  Alice and Bob share sensing, bid for
//! parcels through the assignment round, and hand cargo over when one of
//! them is cut off from the delivery tile.
//!
//! Set `RUST_LOG=debug` to watch individual decisions.

mod bus;
mod world;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use pd_core::{AgentConfig, AgentId, Clock, ManualClock, Position, Timestamp};
use pd_player::{Action, Decision, Player, PlayerBuilder, PlayerObserver, SharedSecret};
use pd_spatial::{DistanceEngine, GridMap};

use bus::Bus;
use world::World;

// ── Constants ─────────────────────────────────────────────────────────────────

const MAP: &str = "
    S.........S
    .####.####.
    .....D.....
    .####.####.
    S.........S
";

const SEED:          u64   = 7;
const TICKS:         u64   = 240;
const PARCEL_REWARD: f64   = 30.0;
const TEAM_SECRET:   &str  = "corridor";
const TEAM:          [(&str, Position); 2] = [
    ("alice", Position::new(0, 0)),
    ("bob",   Position::new(4, 10)),
];

// ── Telemetry ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Telemetry {
    moves:      usize,
    blocked:    usize,
    pickups:    usize,
    putdowns:   usize,
    explores:   usize,
    follows:    usize,
    iterations: usize,
}

impl PlayerObserver for Telemetry {
    fn on_decision(&mut self, agent: &AgentId, now: Timestamp, decision: &Decision) {
        log::debug!("{now} {agent}: {decision:?}");
        match decision {
            Decision::Explore(_) => self.explores += 1,
            Decision::Follow(_) => self.follows += 1,
            Decision::Intention(_) | Decision::Idle => {}
        }
    }

    fn on_action(&mut self, _agent: &AgentId, _now: Timestamp, action: &Action) {
        match action {
            Action::Moved(_) => self.moves += 1,
            Action::Blocked(_) => self.blocked += 1,
            Action::PickedUp(n) => self.pickups += n,
            Action::PutDown(n) => self.putdowns += n,
            Action::Wait => {}
        }
    }

    fn on_tick_end(&mut self, _agent: &AgentId, _now: Timestamp, iterations: usize) {
        self.iterations += iterations;
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== corridor: cooperative parcel delivery ===");
    println!("Agents: {}  |  Ticks: {TICKS}  |  Seed: {SEED}", TEAM.len());
    println!();

    // 1. Configuration shared by the world and every agent.
    let config = AgentConfig {
        team_size: TEAM.len(),
        parcel_reward_avg: PARCEL_REWARD,
        seed: SEED,
        ..AgentConfig::default()
    };
    config.validate()?;

    // 2. Map and distance tables.
    let engine = Arc::new(DistanceEngine::build(GridMap::from_ascii(MAP)?, &config)?);
    println!(
        "Map: {} crossable tiles, {} delivery, {} spawn",
        engine.node_count(),
        engine.delivery_positions().len(),
        engine.spawn_positions().len()
    );

    // 3. World and players.
    let mut world = World::new(Arc::clone(&engine), config.parcel_decay(), SEED);
    let mut players: Vec<Player> = Vec::with_capacity(TEAM.len());
    for (name, start) in TEAM {
        world.add_agent(AgentId::new(name), start);
        let player = PlayerBuilder::new(name, Arc::clone(&engine), config.clone())
            .verifier(SharedSecret::new(TEAM_SECRET))
            .position(start)
            .build()?;
        players.push(player);
    }

    // 4. Handshake.
    let clock = ManualClock::new(Timestamp(0));
    let mut bus = Bus::new();
    for player in &players {
        player.announce(clock.now(), &mut bus);
    }
    bus.deliver(&mut players, clock.now())?;
    println!("Handshake done: {} messages exchanged", bus.sent());
    println!();

    // 5. Run.
    let mut telemetry = Telemetry::default();
    let mut last_spawn = Timestamp(0);
    let t0 = Instant::now();
    for _ in 0..TICKS {
        let now = clock.now();
        world.decay(now);
        if now.since(last_spawn) >= config.parcel_spawn_interval_ms || world.parcel_count() == 0 {
            world.spawn(PARCEL_REWARD, now);
            last_spawn = now;
        }

        for (i, player) in players.iter_mut().enumerate() {
            player.on_position_update(world.bodies[i].pos, now, &mut bus)?;
            let parcels = world.sense_parcels(i, config.parcel_sensing_distance, now);
            player.on_parcel_sensing(&parcels, now, &mut bus);
            let agents = world.sense_agents(i, config.agent_sensing_distance);
            player.on_agent_sensing(&agents, now, &mut bus);

            player.tick(now, &mut world.avatar(i, now), &mut bus, &mut telemetry)?;
        }
        bus.deliver(&mut players, now)?;
        clock.advance(config.movement_duration_ms);
    }
    let elapsed = t0.elapsed();

    // 6. Summary.
    println!("Simulation complete in {:.3} s", elapsed.as_secs_f64());
    println!("  moves      : {}", telemetry.moves);
    println!("  blocked    : {}", telemetry.blocked);
    println!("  picked up  : {}", telemetry.pickups);
    println!("  put down   : {}", telemetry.putdowns);
    println!("  explore    : {} ticks", telemetry.explores);
    println!("  follow     : {} ticks", telemetry.follows);
    println!("  rollouts   : {}", telemetry.iterations);
    println!("  team msgs  : {}", bus.sent());
    println!();

    // 7. Per-agent scores.
    println!("{:<8} {:<10} {:<10} {:>8}", "Agent", "Position", "Delivered", "Score");
    println!("{}", "-".repeat(39));
    for body in &world.bodies {
        println!(
            "{:<8} {:<10} {:<10} {:>8.1}",
            body.id.to_string(),
            body.pos.to_string(),
            body.delivered,
            body.score
        );
    }
    let total: f64 = world.bodies.iter().map(|b| b.score).sum();
    println!("{}", "-".repeat(39));
    println!("{:<30} {:>8.1}", "Team", total);

    for player in &players {
        player.stop();
    }
    Ok(())
}

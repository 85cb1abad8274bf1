use clap::Parser;
use client::abilities::{AbilityState, Avatar};
use client::network::Client;
use client::teleport::TeleportSpots;
use log::{debug, info, warn};
use rand::Rng;
use shared::{
    AbilityKind, Encoding, PlayerId, Team, Vec3, MAX_SPECIAL_MOVES, SPAWN_POSITION, TAG_DISTANCE,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};

const STEP: Duration = Duration::from_millis(100);
const ARENA_HALF_SIZE: f32 = 40.0;
const GRAVITY: f32 = 30.0;
const HOME_DIGIT: u8 = 1;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless tag bot", long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:3000")]
    server: String,

    /// Display name
    #[arg(short, long, default_value = "Bot")]
    name: String,

    /// Cosmetic skin
    #[arg(long, default_value = "green")]
    skin: String,

    /// Ability ids to bring, e.g. `1,5`
    #[arg(short, long, value_delimiter = ',', value_parser = parse_ability)]
    moves: Vec<AbilityKind>,

    /// How long to play before leaving
    #[arg(long, default_value = "60")]
    seconds: u64,

    /// Speak bincode instead of JSON
    #[arg(short, long)]
    binary: bool,
}

fn parse_ability(id: &str) -> Result<AbilityKind, String> {
    AbilityKind::from_id(id).ok_or_else(|| format!("unknown ability id {:?}, expected 1-6", id))
}

/// Local movement state of the bot's avatar
struct Body {
    position: Vec3,
    heading: f32,
}

impl Body {
    fn step(&mut self, avatar: &mut Avatar, rng: &mut impl Rng, dt: f32) {
        self.heading += rng.gen_range(-0.6..0.6);
        self.position.x += self.heading.cos() * avatar.speed * dt;
        self.position.z += self.heading.sin() * avatar.speed * dt;

        if self.position.x.abs() > ARENA_HALF_SIZE || self.position.z.abs() > ARENA_HALF_SIZE {
            self.position.x = self.position.x.clamp(-ARENA_HALF_SIZE, ARENA_HALF_SIZE);
            self.position.z = self.position.z.clamp(-ARENA_HALF_SIZE, ARENA_HALF_SIZE);
            self.heading += std::f32::consts::PI;
        }

        self.position.y += avatar.vertical_velocity * dt;
        avatar.vertical_velocity -= GRAVITY * dt;
        if self.position.y <= SPAWN_POSITION.y {
            self.position.y = SPAWN_POSITION.y;
            avatar.vertical_velocity = 0.0;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let mut args = Args::parse();
    if args.moves.len() > MAX_SPECIAL_MOVES {
        warn!("Only the first {} moves are kept", MAX_SPECIAL_MOVES);
        args.moves.truncate(MAX_SPECIAL_MOVES);
    }

    let encoding = if args.binary {
        Encoding::Binary
    } else {
        Encoding::Json
    };
    let mut client = Client::connect(&args.server, encoding).await?;

    let remote_abilities: Arc<Mutex<HashMap<PlayerId, AbilityState<Avatar>>>> =
        Arc::new(Mutex::new(HashMap::new()));
    register_handlers(&mut client, Arc::clone(&remote_abilities));

    client.mirror().join(&args.name, &args.skin, &args.moves);
    info!("Joined as {} with moves {:?}", args.name, args.moves);

    let mut rng = rand::thread_rng();
    let mut abilities = AbilityState::new(Avatar::default());
    let mut spots = TeleportSpots::new();
    spots.save(HOME_DIGIT, SPAWN_POSITION);
    let mut body = Body {
        position: SPAWN_POSITION,
        heading: rng.gen_range(0.0..std::f32::consts::TAU),
    };
    let mut was_running = false;

    let mut step_interval = interval(STEP);
    step_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline = sleep(Duration::from_secs(args.seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            alive = client.recv() => {
                if !alive? {
                    info!("Server closed the connection");
                    return Ok(());
                }
            },

            _ = step_interval.tick() => {
                let dt = STEP.as_secs_f32();
                let mirror = client.mirror_mut();
                let running = mirror.roster().game_started();

                if was_running && !running {
                    if let Some(home) = spots.recall(HOME_DIGIT) {
                        body.position = home;
                        mirror.teleport(home);
                    }
                }
                was_running = running;

                body.step(abilities.target_mut(), &mut rng, dt);
                mirror.update_position(body.position, Vec3::new(0.0, body.heading, 0.0));

                if running {
                    for &kind in &args.moves {
                        if abilities.activate(kind).is_ok() {
                            mirror.use_ability(kind);
                        }
                    }
                    if let Some(target) = nearest_runner(mirror.roster(), body.position) {
                        mirror.tag(target);
                    }
                }

                abilities.advance(dt);
                mirror.advance_clock(dt);
                if let Ok(mut remote) = remote_abilities.lock() {
                    for state in remote.values_mut() {
                        state.advance(dt);
                    }
                }
            },

            _ = &mut deadline => {
                info!("Time is up, leaving");
                break;
            },
        }
    }

    client.close().await;
    Ok(())
}

/// Closest runner in tagging range, if the local player is a tagger
fn nearest_runner(roster: &client::mirror::Roster, position: Vec3) -> Option<PlayerId> {
    let me = roster.local_player()?;
    if me.team != Team::Tagger {
        return None;
    }

    roster
        .players()
        .filter(|p| p.id != me.id && p.team == Team::Runner)
        .map(|p| (p.id, p.position.distance(&position)))
        .filter(|&(_, distance)| distance < TAG_DISTANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

fn register_handlers(
    client: &mut Client,
    remote_abilities: Arc<Mutex<HashMap<PlayerId, AbilityState<Avatar>>>>,
) {
    let mirror = client.mirror_mut();

    mirror.on_player_joined(|player, roster| {
        info!("{} joined ({} players)", player.name, roster.player_count());
    });
    mirror.on_player_left(|player, roster| {
        info!("{} left ({} players)", player.name, roster.player_count());
    });
    mirror.on_player_moved(|event, _| {
        debug!("Player {} moved to {:?}", event.id, event.position);
    });
    mirror.on_player_teleported(|event, _| {
        info!("Player {} teleported to {:?}", event.id, event.position);
    });
    mirror.on_player_tagged(|event, roster| {
        let name = |id: PlayerId| roster.player(&id).map(|p| p.name.as_str()).unwrap_or("?");
        info!(
            "{} tagged {}, {} runners left",
            name(event.tagger_id),
            name(event.tagged_id),
            roster.runner_count()
        );
    });
    mirror.on_game_started(|event, roster| {
        let tagger = roster
            .player(&event.tagger_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        info!("Game started, {} is it, {}s on the clock", tagger, event.game_time);
    });
    mirror.on_game_ended(|event, roster| {
        info!(
            "Game over: {} ({} players, {} taggers, {} runners, top tagger {})",
            event.result,
            event.stats.total_players,
            event.stats.taggers,
            event.stats.runners,
            event.stats.top_tagger
        );
        for player in roster.players() {
            info!("  {:<16} tags {:>3} escapes {:>3}", player.name, player.tags, player.escapes);
        }
    });

    let abilities = remote_abilities;
    mirror.on_ability_used(move |event, roster| {
        if roster.local_id() == Some(event.id) {
            return;
        }
        let Ok(mut remote) = abilities.lock() else {
            return;
        };
        let state = remote
            .entry(event.id)
            .or_insert_with(|| AbilityState::new(Avatar::default()));
        if let Err(e) = state.activate(event.kind) {
            debug!("Remote player {}: {}", event.id, e);
        }
        info!("Player {} used {}", event.id, event.kind.display_name());
    });
}

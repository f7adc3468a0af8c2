//! Quantum City entry point
//!
//! On wasm32 the page mounts the city through the library bindings, so this
//! binary only matters natively: it runs a headless city with an autopilot
//! and prints a JSON snapshot for every completed loop.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use quantum_city::consts::FRAME_DT_MS;
    use quantum_city::demo::Autopilot;
    use quantum_city::platform::{HeadlessHost, Viewport};
    use quantum_city::{AssetKey, MountOptions, mount};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let target_loops: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(3);
    let seed = std::env::var("CITY_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(rand::random::<u64>);

    log::info!("Quantum City (headless) starting, seed {seed}, {target_loops} loops");

    let host = HeadlessHost::new(seed);
    let sounds = host.log();
    let options = MountOptions {
        mute: false,
        seed: Some(seed),
        ..MountOptions::default()
    }
    .with_status(|message| log::info!("status: {message}"));

    let handle = match mount(host, Some(Viewport::new(960.0, 540.0)), options) {
        Ok(handle) => handle,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };

    for key in AssetKey::ALL {
        let size = (key == AssetKey::Backdrop).then(HeadlessHost::backdrop_size);
        handle.asset_loaded(key, size);
    }

    // Generous cap: one loop takes well under a minute of simulated time
    let max_frames = 60 * 60 * u64::from(target_loops.max(1));
    let mut pilot = Autopilot::new();
    let mut reported = 0;

    for _ in 0..max_frames {
        let changes = handle.with_world(|w| pilot.steer(w)).unwrap_or_default();
        for change in changes {
            if change.pressed {
                handle.key_down(change.key.code());
            } else {
                handle.key_up(change.key.code());
            }
        }
        handle.frame(FRAME_DT_MS);

        let Some((loops, snapshot)) = handle.with_world(|w| (w.completed_loops(), w.snapshot()))
        else {
            continue;
        };
        if loops > reported {
            reported = loops;
            match serde_json::to_string(&snapshot) {
                Ok(json) => println!("{json}"),
                Err(err) => log::warn!("snapshot not serializable: {err}"),
            }
        }
        if reported >= target_loops {
            break;
        }
    }

    handle.destroy();
    log::info!(
        "done: {reported} loops, {} crash sounds, {} tasks left",
        sounds.borrow().sounds.len(),
        handle.pending_tasks()
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry points live in the library (`platform::web`)
}

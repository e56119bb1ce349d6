use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use image::RgbaImage;
use log::info;
use once_cell::sync::Lazy;

use glimpse::cli::Args;
use glimpse::core::wire;
use glimpse::events::{self, BusEvent, StreamAnnounce};
use glimpse::widgets::NullInput;
use glimpse::{EventBus, PreviewPlayer, PreviewSettings, StreamPath, Workspace};

/// Frame tint cycle for the synthetic producer.
static PALETTE: Lazy<Vec<[u8; 3]>> = Lazy::new(|| {
    vec![
        [230, 80, 60],
        [240, 170, 50],
        [90, 200, 90],
        [60, 160, 230],
        [150, 90, 220],
        [220, 90, 180],
    ]
});

/// Horizontal gradient in the palette color of `index`.
fn synth_frame(index: usize, size: u32) -> Vec<u8> {
    let tint = PALETTE[index % PALETTE.len()];
    let img = RgbaImage::from_fn(size, size, |x, _y| {
        let shade = 64 + (x * 191 / size.max(1)) as u32;
        image::Rgba([
            (tint[0] as u32 * shade / 255) as u8,
            (tint[1] as u32 * shade / 255) as u8,
            (tint[2] as u32 * shade / 255) as u8,
            255,
        ])
    });
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("png encode");
    out
}

/// Build the announced path in the workspace: every segment but the last
/// becomes a subgraph node, the last a plain node.
fn build_graph(workspace: &Workspace, path: &StreamPath) {
    let mut ctx = workspace.current();
    let segments = path.segments();
    for segment in &segments[..segments.len() - 1] {
        ctx = ctx.add_subgraph(segment);
    }
    ctx.add_node(path.leaf());
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = match args.verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let path = StreamPath::parse(&args.stream)
        .ok_or_else(|| anyhow::anyhow!("--stream must not be empty"))?;

    let workspace = Arc::new(Workspace::new());
    build_graph(&workspace, &path);

    let bus = EventBus::new();
    let settings = PreviewSettings {
        enabled: true,
        rate_override: args.rate_override,
    };
    let player = PreviewPlayer::attach(
        Arc::clone(&workspace),
        &bus,
        settings,
        Arc::new(NullInput),
    );

    // What the host would attach to an outgoing sampling request.
    let mut extra = serde_json::Map::new();
    player.annotate_request(&mut extra);
    info!("Request metadata: {}", serde_json::Value::Object(extra));

    bus.emit(
        events::STREAM_ANNOUNCE,
        &BusEvent::Announce(StreamAnnounce {
            id: args.stream.clone(),
            length: args.frames,
            rate: args.rate,
        }),
    );
    info!(
        "Announced '{}': {} frames, {} targets",
        args.stream,
        args.frames,
        player.active_targets()
    );

    // Producer: frames pushed in reverse order, spaced out so slots fill
    // while playback is already running and holding on empty ones.
    let producer = {
        let bus = bus.clone();
        let stream = args.stream.clone();
        let frames = args.frames;
        let size = args.size;
        thread::spawn(move || {
            for i in 0..frames {
                let index = frames - 1 - i;
                let payload =
                    wire::encode_frame_message(&stream, index as u32, &synth_frame(index, size));
                bus.emit(events::FRAME_DATA, &BusEvent::binary(payload));
                thread::sleep(Duration::from_millis(40));
            }
        })
    };

    let registry = player.registry();
    let started = Instant::now();
    while started.elapsed().as_secs_f32() < args.duration {
        thread::sleep(Duration::from_millis(250));
        let filled = registry.buffer(&args.stream).map(|b| b.filled()).unwrap_or(0);
        let drawn = workspace
            .resolve(&path)
            .ok()
            .and_then(|node| {
                node.with_preview(|w| w.surface().map(|s| (s.width(), s.height())))
            })
            .flatten();
        info!(
            "t={:.2}s targets={} filled={}/{} surface={:?}",
            started.elapsed().as_secs_f32(),
            player.active_targets(),
            filled,
            args.frames,
            drawn
        );
    }
    let _ = producer.join();

    // Producer done: clearing progress lets every target stop on its next
    // tick, same as execution completing in the host.
    for prefix in path.prefixes() {
        if let Ok(node) = workspace.resolve(&prefix) {
            node.clear_progress();
        }
    }
    while player.active_targets() > 0 {
        thread::sleep(Duration::from_millis(20));
    }
    info!(
        "Playback wound down, {} stale frames ignored",
        registry.ignored_frames()
    );

    player.detach();
    Ok(())
}

use clap::Parser;

/// Preview stream player demo: feeds a synthetic sampling stream through
/// the player and logs what the playback targets draw.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Composite node path to announce (colon-separated segments)
    #[arg(long = "stream", value_name = "PATH", default_value = "grp:sampler")]
    pub stream: String,

    /// Declared frame count of the stream
    #[arg(short = 'n', long = "frames", value_name = "N", default_value_t = 12)]
    pub frames: usize,

    /// Announced playback rate in fps (0 = built-in default)
    #[arg(short = 'r', long = "rate", value_name = "FPS", default_value_t = 0.0)]
    pub rate: f32,

    /// Rate override setting, 0..60 (0 = no override)
    #[arg(long = "rate-override", value_name = "FPS", default_value_t = 0.0)]
    pub rate_override: f32,

    /// Synthetic frame edge length in pixels
    #[arg(long = "size", value_name = "PX", default_value_t = 64)]
    pub size: u32,

    /// How long to let playback run, in seconds
    #[arg(short = 'd', long = "duration", value_name = "SECS", default_value_t = 3.0)]
    pub duration: f32,

    /// Increase logging verbosity (default: info, -v: debug, -vv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

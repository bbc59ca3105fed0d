use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "meshpaper",
    author,
    version,
    about = "Animated mesh-gradient preview",
    arg_required_else_help = false
)]
pub struct Cli {
    /// JSON file with gradient options (points, radius, warp, grain, ...).
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Window size as WIDTHxHEIGHT.
    #[arg(long, value_name = "WxH", default_value = "1280x720", value_parser = parse_size)]
    pub size: (u32, u32),

    /// Cap the frame rate; rendering is vsync-paced otherwise.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Animation speed multiplier.
    #[arg(long, value_name = "FACTOR")]
    pub speed: Option<f32>,

    /// Deterministic noise seed in [0, 1); random when omitted.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<f32>,

    /// Warp mode 0-6 (0 = none, 1 = wave, 2 = simplex, 3 = fractal,
    /// 4 = ridged, 5 = swirl, 6 = radial).
    #[arg(long, value_name = "MODE")]
    pub warp_mode: Option<u32>,

    /// Warp displacement strength.
    #[arg(long, value_name = "AMOUNT")]
    pub warp_amount: Option<f32>,

    /// Warp feature size; larger values stretch the distortion.
    #[arg(long, value_name = "SIZE")]
    pub warp_size: Option<f32>,

    /// Film-grain strength.
    #[arg(long, value_name = "AMOUNT")]
    pub grain: Option<f32>,

    /// Number of scattered demo points when no options file is given.
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub points: usize,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{value}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{value}'"))?;
    if width == 0 || height == 0 {
        return Err("window size must be non-zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_pairs() {
        assert_eq!(parse_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_size("640X480"), Ok((640, 480)));
    }

    #[test]
    fn rejects_malformed_sizes() {
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn defaults_apply_without_arguments() {
        let cli = Cli::parse_from(["meshpaper"]);
        assert_eq!(cli.size, (1280, 720));
        assert_eq!(cli.points, 5);
        assert!(cli.options.is_none());
    }

    #[test]
    fn warp_flags_parse() {
        let cli = Cli::parse_from([
            "meshpaper",
            "--warp-mode",
            "5",
            "--warp-amount",
            "0.4",
            "--seed",
            "0.25",
        ]);
        assert_eq!(cli.warp_mode, Some(5));
        assert_eq!(cli.warp_amount, Some(0.4));
        assert_eq!(cli.seed, Some(0.25));
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate SRT subtitles for one or more video files
    Generate {
        /// Input video files
        #[arg(short, long = "input", num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Directory to scan for video files
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Output directory for subtitle files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Seconds to keep generated subtitle files before deleting them
        #[arg(long)]
        retention_secs: Option<u64>,

        /// Stay running until every generated file has expired
        #[arg(long)]
        hold: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Repair a raw timestamped transcript into SRT
    Normalize {
        /// Raw transcript file
        #[arg(short, long)]
        input: PathBuf,

        /// Output SRT file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract transcription-ready audio from a video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_accepts_several_inputs() {
        let args = Args::try_parse_from([
            "subgen", "generate", "-i", "a.mp4", "b.mkv", "--retention-secs", "60", "--json",
        ])
        .unwrap();

        match args.command {
            Commands::Generate { inputs, retention_secs, json, hold, .. } => {
                assert_eq!(inputs, vec![PathBuf::from("a.mp4"), PathBuf::from("b.mkv")]);
                assert_eq!(retention_secs, Some(60));
                assert!(json);
                assert!(!hold);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_init_config_default_path() {
        let args = Args::try_parse_from(["subgen", "-v", "init-config"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::InitConfig { output } if output == PathBuf::from("config.toml")));
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::DEFAULT_SCAN_HISTORY_LIMIT;

#[derive(Parser, Debug)]
#[command(name = "cannon")]
#[command(version = "0.1.0")]
#[command(about = "Command-line client for the Cannon face-scan and coaching app", long_about = None)]
pub struct Cli {
    /// Path to configuration file (replaces the global and local files)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API base URL override
    #[arg(long, env = "CANNON_API_URL")]
    pub api_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// Show the session and which screens are reachable
    Status,
    /// Sign in to an existing account
    Login {
        email: String,
        #[arg(long, env = "CANNON_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Signup {
        email: String,
        #[arg(long, env = "CANNON_PASSWORD", hide_env_values = true)]
        password: String,
        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },
    /// Sign out and forget stored credentials
    Logout,
    /// Answer the onboarding questions
    Onboard {
        /// Goal to work on (repeatable): jawline, fat_loss, skin, posture, symmetry, hair
        #[arg(short, long = "goal", required = true)]
        goals: Vec<String>,
        /// beginner, intermediate or advanced
        #[arg(short, long)]
        experience: String,
    },
    /// Upload front, left and right photos and analyze them
    Scan {
        front: PathBuf,
        left: PathBuf,
        right: PathBuf,
    },
    /// Show the latest scan result
    Result,
    /// List courses and your progress
    Courses,
    /// Enroll in a course
    StartCourse { course_id: String },
    /// Mark a course task as done
    CompleteTask {
        course_id: String,
        task_id: String,
        #[arg(long)]
        stage: u32,
    },
    /// List upcoming and live events
    Events,
    /// Talk to the coach; without a message, show the conversation
    Chat { message: Option<String> },
    /// List forum channels
    Forums,
    /// Show a channel's messages
    Channel {
        channel_id: String,
        /// Keep polling for new messages until interrupted
        #[arg(short, long)]
        watch: bool,
    },
    /// Post to a channel
    Post { channel_id: String, message: String },
    /// Show the top of the leaderboard
    Leaderboard,
    /// Show your rank and scan history
    Profile {
        #[arg(long, default_value_t = DEFAULT_SCAN_HISTORY_LIMIT)]
        limit: u32,
    },
    /// Start a subscription checkout
    Subscribe,
    /// Re-fetch your account after paying or scanning elsewhere
    Refresh,
    /// Activate a subscription without paying (development servers only)
    ActivateTest,
}

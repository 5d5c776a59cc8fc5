use clap::{Parser, Subcommand};

use crate::rate_limit::{LimiterSettings, WindowScheme};

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "call-decorators")]
#[command(about = "Memoization, rate limiting and call guards, with demo drivers")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    // Default log level, RUST_LOG overrides it
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    // Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run every demo once. The ticker runs on a simulated clock.
    Demo {
        #[command(flatten)]
        ticker: TickerArgs,
    },
    /// Run the ticker on the system clock and serve /health and /metrics.
    Serve {
        // Port to run the server on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        #[command(flatten)]
        ticker: TickerArgs,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct TickerArgs {
    // Rate limit max calls per window
    #[arg(long, default_value_t = 10)]
    pub rate_limit: u32,

    // How windows are identified
    #[arg(long, value_enum, default_value_t = WindowScheme::EpochMinute)]
    pub window_scheme: WindowScheme,

    // Number of ticks, 0 runs forever (serve only)
    #[arg(long, default_value_t = 75)]
    pub iterations: u64,

    // Time between ticks in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,
}

impl TickerArgs {
    pub fn limiter_settings(&self) -> LimiterSettings {
        LimiterSettings {
            limit_per_window: self.rate_limit,
            window_scheme: self.window_scheme,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_defaults() {
        let args = Args::parse_from(["call-decorators", "demo"]);
        let Command::Demo { ticker } = args.command else {
            panic!("expected demo command");
        };
        assert_eq!(ticker.rate_limit, 10);
        assert_eq!(ticker.window_scheme, WindowScheme::EpochMinute);
        assert_eq!(args.log_level, "info");
        assert!(!args.json_logs);
    }

    #[test]
    fn test_serve_options() {
        let args = Args::parse_from([
            "call-decorators",
            "serve",
            "--port",
            "9000",
            "--rate-limit",
            "3",
            "--window-scheme",
            "minute-of-hour",
            "--json-logs",
        ]);
        assert!(args.json_logs);
        let Command::Serve { port, ticker } = args.command else {
            panic!("expected serve command");
        };
        assert_eq!(port, 9000);
        assert_eq!(
            ticker.limiter_settings(),
            LimiterSettings {
                limit_per_window: 3,
                window_scheme: WindowScheme::MinuteOfHour
            }
        );
    }
}

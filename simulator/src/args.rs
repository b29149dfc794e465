use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Deterministic jobagent-db pool simulator")]
pub(crate) struct Args {
    #[arg(long, value_parser = humantime::parse_duration)]
    pub(crate) duration: Option<Duration>,
    #[arg(long)]
    pub(crate) iterations: Option<u64>,
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    #[arg(long, default_value_t = 16)]
    pub(crate) tasks: usize,
    #[arg(long, default_value_t = 3)]
    pub(crate) databases: usize,
    #[arg(long, default_value_t = 0.05)]
    pub(crate) fail_rate: f64,
    #[arg(long, default_value_t = 0.01)]
    pub(crate) disconnect_rate: f64,
    #[arg(long, default_value_t = 0.01)]
    pub(crate) clear_rate: f64,
    #[arg(long, default_value_t = 0.002)]
    pub(crate) restart_rate: f64,
    #[arg(long, default_value_t = 0.05)]
    pub(crate) sleep_rate: f64,
    /// Run real threads against one pool instead of the seeded interleaving.
    #[arg(long)]
    pub(crate) threads: Option<usize>,
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
    #[arg(long)]
    pub(crate) quick: bool,
    #[arg(long)]
    pub(crate) stress: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimConfig {
    pub(crate) duration_ms: Option<u64>,
    pub(crate) iterations: Option<u64>,
    pub(crate) seed: u64,
    pub(crate) tasks: usize,
    pub(crate) databases: usize,
    pub(crate) fail_rate: f64,
    pub(crate) disconnect_rate: f64,
    pub(crate) clear_rate: f64,
    pub(crate) restart_rate: f64,
    pub(crate) sleep_rate: f64,
    pub(crate) threads: Option<usize>,
    pub(crate) log: Option<PathBuf>,
    pub(crate) preset: Option<String>,
    pub(crate) first_steps: usize,
    pub(crate) tail_steps: usize,
}

impl SimConfig {
    pub(crate) fn from_args(args: Args) -> Self {
        let mut config = SimConfig {
            duration_ms: args.duration.map(|d| d.as_millis() as u64),
            iterations: args.iterations,
            seed: args.seed.unwrap_or_else(random_seed),
            tasks: args.tasks.max(1),
            databases: args.databases.max(1),
            fail_rate: clamp_rate(args.fail_rate),
            disconnect_rate: clamp_rate(args.disconnect_rate),
            clear_rate: clamp_rate(args.clear_rate),
            restart_rate: clamp_rate(args.restart_rate),
            sleep_rate: clamp_rate(args.sleep_rate),
            threads: args.threads.filter(|n| *n > 0),
            log: args.log,
            preset: None,
            first_steps: 30,
            tail_steps: 80,
        };

        if args.quick {
            config.apply_quick();
        }
        if args.stress {
            config.apply_stress();
        }
        if config.iterations.is_none() && config.duration_ms.is_none() {
            config.iterations = Some(10_000);
        }

        config
    }

    fn apply_quick(&mut self) {
        self.preset = Some("quick".to_string());
        self.iterations = Some(5_000);
        self.duration_ms = None;
        self.tasks = 4;
        self.databases = 2;
        self.fail_rate = 0.05;
        self.disconnect_rate = 0.01;
        self.clear_rate = 0.01;
        self.restart_rate = 0.001;
    }

    fn apply_stress(&mut self) {
        self.preset = Some("stress".to_string());
        self.iterations = Some(250_000);
        self.duration_ms = None;
        self.tasks = 64;
        self.databases = 8;
        self.fail_rate = 0.1;
        self.disconnect_rate = 0.03;
        self.clear_rate = 0.02;
        self.restart_rate = 0.005;
    }
}

fn clamp_rate(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    now.as_secs() ^ u64::from(now.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_rate_limits_bounds() {
        assert_eq!(clamp_rate(-1.0), 0.0);
        assert_eq!(clamp_rate(2.0), 1.0);
        assert_eq!(clamp_rate(0.5), 0.5);
        assert_eq!(clamp_rate(f64::NAN), 0.0);
    }

    #[test]
    fn quick_preset_overrides_counts() {
        let args = Args::try_parse_from(["simulator", "--quick", "--tasks", "99", "--seed", "7"])
            .unwrap();
        let config = SimConfig::from_args(args);
        assert_eq!(config.seed, 7);
        assert_eq!(config.tasks, 4);
        assert_eq!(config.preset.as_deref(), Some("quick"));
    }
}

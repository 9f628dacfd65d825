use anyhow::Context;
use clap::Parser;
use clipflow::{
    archiver::local_clip_archiver,
    config::{default_config_path, ArchiverConfig},
    dataflow::{DataMap, PortSettings, Processor},
    logging, ArchiveItem,
};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the clip archiver
#[derive(Parser, Debug)]
#[command(name = "clipflow")]
#[command(about = "Archives detector clips of monitoring stations")]
#[command(version)]
struct Args {
    /// Config file. Defaults to $CLIPFLOW_CONFIG, then archiver.toml in the
    /// user config directory.
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path().context("Could not determine a config file location")?,
    };
    let config = ArchiverConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    config.validate().context("Invalid archiver configuration")?;

    // Held until exit so buffered log lines reach the file
    let _log_guard = logging::init(&config.logging)?;

    tracing::info!("Starting clip archiver with config {:?}", config_path);
    tracing::info!(
        "Archiving clips of detectors {:?} at stations {:?}",
        config.detectors,
        config.stations
    );

    let mut archiver = local_clip_archiver("Clip Archiver", &config)?;
    archiver.connect(PortSettings::new())?;
    archiver.start()?;

    run(&mut archiver, config.timing.poll_interval())?;

    tracing::info!("Clip archiver finished");
    Ok(())
}

/// Process a started archiver once per poll interval until it finishes.
fn run(archiver: &mut dyn Processor<ArchiveItem>, poll_interval: Duration) -> anyhow::Result<()> {
    loop {
        tracing::info!("Looking for new clips to archive...");
        archiver.process(DataMap::new())?;
        if archiver.is_finished() {
            return Ok(());
        }
        std::thread::sleep(poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clipflow::dataflow::{DataflowResult, ProcessorCore};
    use std::time::Instant;

    /// Finishes on its `calls`-th call.
    struct Countdown {
        core: ProcessorCore,
        calls: usize,
    }

    impl Processor<ArchiveItem> for Countdown {
        fn core(&self) -> &ProcessorCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ProcessorCore {
            &mut self.core
        }

        fn process_data(&mut self, _: DataMap<ArchiveItem>) -> DataflowResult<DataMap<ArchiveItem>> {
            self.calls -= 1;
            if self.calls == 0 {
                self.core.finish();
            }
            Ok(DataMap::new())
        }
    }

    fn countdown(calls: usize) -> Countdown {
        let mut p = Countdown {
            core: ProcessorCore::new("Countdown", vec![], vec![]),
            calls,
        };
        p.connect(PortSettings::new()).unwrap();
        p.start().unwrap();
        p
    }

    #[test]
    fn test_run_does_not_sleep_after_finishing() {
        let mut archiver = countdown(1);
        let started = Instant::now();
        run(&mut archiver, Duration::from_secs(5)).unwrap();
        assert!(archiver.is_finished());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_sleeps_between_calls() {
        let mut archiver = countdown(3);
        let started = Instant::now();
        run(&mut archiver, Duration::from_millis(20)).unwrap();
        assert!(archiver.is_finished());
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_config_argument() {
        let args = Args::try_parse_from(["clipflow"]).unwrap();
        assert_eq!(args.config, None);

        let args = Args::try_parse_from(["clipflow", "/etc/clipflow.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/clipflow.toml")));

        assert!(Args::try_parse_from(["clipflow", "a.toml", "b.toml"]).is_err());
    }
}

use anyhow::{Result, anyhow};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zcra::config::{Config, default_config_dir, trigger_addr};

#[derive(Parser, Debug)]
#[command(
    name = "zcra",
    about = "Relay a terminal program and drive it with remotely triggered scripts",
    version
)]
struct Args {
    /// Id of the instance; enables remote triggers on UDP port 40000+id
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(0..=25535))]
    id: Option<u16>,

    /// Append everything the program prints to this file
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Address the trigger socket binds to
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Directory holding scripts/ and passwords/ [default: ~/.config/zcra]
    #[arg(long, env = "ZCRA_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Program to run in the PTY, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let config_dir = match self.config_dir {
            Some(dir) => dir,
            None => default_config_dir()?,
        };
        let trigger = match self.id {
            Some(id) => Some(
                trigger_addr(self.bind, id).ok_or_else(|| anyhow!("id {id} is out of range"))?,
            ),
            None => None,
        };
        let mut command = self.command.into_iter();
        let program = command
            .next()
            .ok_or_else(|| anyhow!("no program given"))?;

        Ok(Config {
            program,
            args: command.collect(),
            config_dir,
            log: self.log,
            trigger,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Usage errors and help both exit with status 1.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zcra=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    zcra::run(args.into_config()?).await
}

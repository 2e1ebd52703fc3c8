/*
 *  main.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Command line front end - one-shot panel commands and the HTTP server
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use tokio::signal::unix::{signal, SignalKind};

use lyscreen::config::{self, Config, Overrides};
use lyscreen::display::{self, BoxedTransport, DisplaySession, MimeType, MockTransport, Orientation, SerialTransport};
use lyscreen::server;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

#[derive(Debug, Parser)]
#[command(name = env!("CARGO_PKG_NAME"), version, author, about)]
struct Cli {
    /// Config file, otherwise the usual locations are searched
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug log level
    #[arg(short = 'v', long = "debug", visible_alias = "verbose", global = true)]
    debug: bool,

    /// Log filter, e.g. info or lyscreen=trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Serial device path of the panel (e.g. /dev/ttyACM0)
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// [Internal] Record writes in memory instead of opening a serial port
    #[arg(long, hide = true, global = true)]
    emulated: bool,

    /// Print the effective configuration as YAML
    #[arg(long)]
    dump_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decode an image and draw it at (x, y)
    DisplayImage {
        /// Path of image to display (.png, .jpg or .jpeg)
        #[arg(value_parser = image_path)]
        image: PathBuf,

        /// Starting x position
        #[arg(short = 'x', default_value_t = 0)]
        x: u16,

        /// Starting y position
        #[arg(short = 'y', default_value_t = 0)]
        y: u16,

        /// Orientation set while initialising
        #[arg(short = 'o', value_enum)]
        orientation: Option<Orientation>,

        /// Rotate by 180 degrees
        #[arg(long)]
        reverse: bool,
    },
    /// Serve the HTTP command API
    Serve {
        /// Port to serve the api on
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Clear the panel
    Clear,
    /// Paint the panel black
    Black,
    /// Turn the backlight on
    On,
    /// Turn the backlight off
    Off,
    /// Re-orient the panel
    Orientation {
        #[arg(value_enum)]
        orientation: Orientation,

        /// Rotate by 180 degrees
        #[arg(long)]
        reverse: bool,
    },
    /// Set backlight brightness in percent
    Brightness {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
}

/// Image argument must name a readable .png/.jpg/.jpeg file
fn image_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if MimeType::from_path(&path).is_none() {
        return Err("Image must have extension .jpg, .jpeg or .png".into());
    }
    let meta = std::fs::metadata(&path).map_err(|_| "Image cannot be read.".to_string())?;
    if !meta.is_file() {
        return Err("Image path must be to a file.".into());
    }
    Ok(path)
}

fn overrides(cli: &Cli) -> Overrides {
    let mut o = Overrides {
        log_level: cli.log_level.clone(),
        device: cli.device.clone(),
        ..Default::default()
    };
    if cli.debug {
        o.log_level = Some("debug".into());
    }
    match &cli.command {
        Some(Commands::DisplayImage { orientation, reverse, .. }) => {
            o.orientation = *orientation;
            o.reverse = reverse.then_some(true);
        }
        Some(Commands::Serve { port, bind }) => {
            o.port = *port;
            o.bind = bind.clone();
        }
        _ => {}
    }
    o
}

async fn shutdown_signal() {
    let (mut sigint, mut sigterm, mut sighup) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(i), Ok(t), Ok(h)) => (i, t, h),
        _ => {
            error!("Unable to install signal handlers, waiting on ctrl-c only");
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("ctrl-c handler failed: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
}

/// Open the transport and bring the panel to Ready with the configured geometry
async fn open_session(cfg: &Config, emulated: bool) -> Result<(DisplaySession<BoxedTransport>, Option<MockTransport>)> {
    let (transport, mock) = if emulated {
        info!("Emulation mode - writes are recorded, nothing is sent");
        let mock = MockTransport::new();
        (Box::new(mock.clone()) as BoxedTransport, Some(mock))
    } else {
        let device = cfg.device()?;
        let serial = SerialTransport::open(device, &cfg.serial())
            .with_context(|| format!("opening serial device {}", device))?;
        (Box::new(serial) as BoxedTransport, None)
    };

    let mut session = DisplaySession::new(transport);
    let orientation = cfg.orientation();
    session.init(orientation).await.context("initialising display")?;
    if cfg.reverse() {
        session.set_orientation(orientation, true).await?;
    }
    if let Some(percent) = cfg.brightness() {
        session.set_brightness(percent).await?;
    }
    Ok((session, mock))
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = config::load(cli.config.as_deref(), &overrides(&cli))?;

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".into());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("This {} worth the Squeeze", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if cli.dump_config {
        print!("{}", config::dump(&cfg)?);
    }

    let Some(command) = cli.command else {
        if cli.dump_config {
            return Ok(());
        }
        bail!("no command given, see --help");
    };

    let (mut session, mock) = open_session(&cfg, cli.emulated).await?;
    info!("{} ready, {}", session.transport().describe(), session.display_state().orientation);

    match command {
        Commands::DisplayImage { image, x, y, .. } => {
            let mime = MimeType::from_path(&image)
                .with_context(|| format!("unsupported image {}", image.display()))?;
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("reading {}", image.display()))?;
            let rect = session.display_bitmap(x, y, mime, &bytes).await?;
            info!("{} drawn at {}", image.display(), rect);
        }
        Commands::Serve { .. } => {
            let server_cfg = cfg.server();
            let ip: IpAddr = server_cfg
                .bind
                .parse()
                .with_context(|| format!("invalid bind address {}", server_cfg.bind))?;
            let addr = SocketAddr::new(ip, server_cfg.port);
            server::serve(display::share(session), addr, shutdown_signal()).await?;
            info!("Server stopped");
            return Ok(());
        }
        Commands::Clear => session.clear().await?,
        Commands::Black => session.to_black().await?,
        Commands::On => session.screen_on().await?,
        Commands::Off => session.screen_off().await?,
        Commands::Orientation { orientation, reverse } => {
            session.set_orientation(orientation, reverse).await?;
        }
        Commands::Brightness { percent } => session.set_brightness(percent).await?,
    }

    if let Some(mock) = mock {
        info!("emulated: {} writes, {} bytes", mock.writes().len(), mock.bytes_written());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_image_path_checks() {
        assert!(image_path("picture.gif").unwrap_err().contains("extension"));
        assert!(image_path("/nonexistent/picture.png").unwrap_err().contains("cannot be read"));

        let dir = tempfile::tempdir().unwrap();
        let as_dir = dir.path().join("folder.PNG");
        std::fs::create_dir(&as_dir).unwrap();
        assert!(image_path(as_dir.to_str().unwrap()).unwrap_err().contains("must be to a file"));

        let file = dir.path().join("ok.jpeg");
        std::fs::write(&file, b"not checked here").unwrap();
        assert_eq!(image_path(file.to_str().unwrap()).unwrap(), file);
    }

    #[test]
    fn test_subcommand_args() {
        let cli = Cli::try_parse_from(["lyscreen", "-d", "/dev/ttyACM0", "brightness", "40"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Brightness { percent: 40 })));
        assert!(Cli::try_parse_from(["lyscreen", "brightness", "101"]).is_err());
        assert!(Cli::try_parse_from(["lyscreen", "serve", "--port", "0"]).is_err());
        assert!(Cli::try_parse_from(["lyscreen", "orientation", "sideways"]).is_err());
    }

    #[test]
    fn test_overrides_from_command() {
        let cli = Cli::try_parse_from(["lyscreen", "-v", "serve", "-p", "8080", "--bind", "127.0.0.1"]).unwrap();
        let o = overrides(&cli);
        assert_eq!(o.log_level.as_deref(), Some("debug"));
        assert_eq!(o.port, Some(8080));
        assert_eq!(o.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(o.reverse, None);
    }

    #[test]
    fn test_debug_beats_log_level() {
        let cli = Cli::try_parse_from(["lyscreen", "--log-level", "warn", "-v", "clear"]).unwrap();
        assert_eq!(overrides(&cli).log_level.as_deref(), Some("debug"));

        let cli = Cli::try_parse_from(["lyscreen", "--log-level", "warn", "clear"]).unwrap();
        assert_eq!(overrides(&cli).log_level.as_deref(), Some("warn"));
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use cube_turns::domain::settings::SettingsService;
use cube_turns::infrastructure::logging::init_logger;
use cube_turns::infrastructure::turn_pipe::TurnPipe;
use cube_turns::{
    CubeEvent, CubeSession, DeviceIdentity, PlaintextCipher, ProtocolGeneration, SessionConfig,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Replay hex-encoded cube notifications from stdin
#[derive(Parser, Debug)]
#[command(name = "cube_turns")]
#[command(about = "Decode smart cube notifications into turns")]
struct Args {
    /// Protocol generation of the capture (gen2, gen3 or gen4)
    generation: ProtocolGeneration,

    /// Forward moves to the turn pipe instead of printing JSON events
    #[arg(long)]
    pipe: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();
    let _log_guard = init_logger(&settings.log_settings)?;
    info!(
        "Replaying {} notifications (settings: {})",
        args.generation,
        settings_service.path().display()
    );

    let mut session = CubeSession::new(
        args.generation,
        DeviceIdentity([0; 6]),
        Box::new(PlaintextCipher),
        SessionConfig::from(&settings),
    );
    for command in session.connect_commands()? {
        debug!("Connect command: {}", hex::encode(&command));
    }

    let pipe = if args.pipe {
        Some(TurnPipe::spawn(&settings.pipe_name)?)
    } else {
        None
    };

    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match hex::decode(line.replace(' ', "")) {
                Ok(bytes) => {
                    if tx.send(bytes).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Skipping line that is not hex ({}): {}", e, line),
            }
        }
    });

    let mut notifications = 0usize;
    let stdout = std::io::stdout();
    while let Some(payload) = rx.recv().await {
        notifications += 1;
        for event in session.handle_notification(&payload) {
            if matches!(event, CubeEvent::OrientationSample { .. }) && !settings.emit_orientation {
                continue;
            }
            match &pipe {
                Some(pipe) => pipe.send(event.moves())?,
                None => {
                    let json = serde_json::to_string(&event)?;
                    let mut out = stdout.lock();
                    writeln!(out, "{}", json)?;
                }
            }
        }
    }

    reader.await.context("stdin reader task failed")?;
    if let Some(pipe) = pipe {
        pipe.shutdown();
    }
    info!("Processed {} notifications", notifications);
    Ok(())
}

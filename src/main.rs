use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use lorawan_phy::config::{Config, InputFormat};
use lorawan_phy::lorawan::{self, mac, FrameIdentifiers, Message, Payload};
use lorawan_phy::{MacCommand, MacVersion};

#[derive(Parser)]
#[command(name = "lorawan-phy")]
#[command(about = "Inspect and build LoRaWAN PHYPayloads")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "lorawan-phy.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a PHYPayload and print it as JSON
    Decode {
        /// Raw frame, hex or base64
        frame: String,
        /// Frame encoding (defaults to the configured one)
        #[arg(short, long, value_enum)]
        format: Option<InputFormat>,
        /// MAC version of the device, decides whether FOpts are plaintext
        #[arg(long)]
        mac_version: Option<MacVersion>,
        /// FRMPayload was already decrypted; decode FPort 0 MAC commands
        #[arg(long)]
        plaintext_frm: bool,
    },
    /// Decode a MAC command stream
    #[command(group(ArgGroup::new("direction").required(true).args(["uplink", "downlink"])))]
    Mac {
        /// Command stream in hex
        commands: String,
        #[arg(long)]
        uplink: bool,
        #[arg(long)]
        downlink: bool,
    },
    /// Encode a JSON message (file path or `-` for stdin)
    Encode {
        input: PathBuf,
        /// Output encoding (defaults to the configured one)
        #[arg(short, long, value_enum)]
        format: Option<InputFormat>,
    },
}

/// JSON view of a decoded frame
#[derive(Serialize)]
struct Decoded<'a> {
    message: &'a Message,
    identifiers: FrameIdentifiers,
    #[serde(skip_serializing_if = "Option::is_none")]
    f_opts: Option<Vec<MacCommand>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frm_mac_commands: Option<Vec<MacCommand>>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    // Initialize tracing/logging; stdout is reserved for output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!("lorawan-phy v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Decode {
            frame,
            format,
            mac_version,
            plaintext_frm,
        } => {
            let format = format.unwrap_or(config.codec.default_format);
            let mac_version = mac_version.unwrap_or(config.codec.mac_version);
            let phy_payload = format.decode(&frame)?;
            decode(&phy_payload, mac_version, plaintext_frm)
        }
        Command::Mac {
            commands, uplink, ..
        } => {
            let b = hex::decode(commands.trim())
                .map_err(|e| anyhow::anyhow!("Invalid hex command stream: {}", e))?;
            let cmds = mac::unmarshal_mac(&b, uplink)?;
            println!("{}", serde_json::to_string_pretty(&cmds)?);
            Ok(())
        }
        Command::Encode { input, format } => {
            let format = format.unwrap_or(config.codec.default_format);
            encode(&input, format)
        }
    }
}

fn decode(phy_payload: &[u8], mac_version: MacVersion, plaintext_frm: bool) -> anyhow::Result<()> {
    let msg = lorawan::unmarshal(phy_payload)?;
    info!("LoRaWAN: {}", msg);

    let mut decoded = Decoded {
        message: &msg,
        identifiers: msg.identifiers(),
        f_opts: None,
        frm_mac_commands: None,
    };

    if let Payload::Mac(pld) = &msg.payload {
        let is_uplink = msg.m_hdr.m_type.is_uplink();
        if !pld.f_hdr.f_opts.is_empty() {
            if mac_version.encrypt_fopts() {
                info!("FOpts are encrypted in LoRaWAN {}, not decoding", mac_version);
            } else {
                match pld.f_hdr.mac_commands(is_uplink) {
                    Ok(cmds) => decoded.f_opts = Some(cmds),
                    Err(e) => warn!("Failed to decode FOpts: {}", e),
                }
            }
        }

        if plaintext_frm {
            match pld.frm_mac_commands(is_uplink) {
                Ok(cmds) => decoded.frm_mac_commands = cmds,
                Err(e) => warn!("Failed to decode FRMPayload MAC commands: {}", e),
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

fn encode(input: &Path, format: InputFormat) -> anyhow::Result<()> {
    let json = if input.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        s
    } else {
        std::fs::read_to_string(input)
            .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {}", input, e))?
    };
    let msg: Message = serde_json::from_str(&json)
        .map_err(|e| anyhow::anyhow!("Failed to parse message JSON: {}", e))?;
    let b = lorawan_phy::marshal(&msg)?;
    info!("Encoded {} ({} bytes)", msg, b.len());
    println!("{}", format.encode(&b));
    Ok(())
}

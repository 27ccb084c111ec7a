use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::error;
use vc_ticket::share::label::{code_qr, compose_share_a, extract_check_in_code};
use vc_ticket::ticket::generate_check_in_code;
use vc_ticket::utils::imaging::{base64_to_bytes, encode_png, load_gray};
use vc_ticket::{
    AlignmentEngine, Config, Error, MemoryTicketStore, PayloadSigner, QrDecoder, Result,
    ShareGenerator, SigningSecret, TicketFields, TicketService,
};

#[derive(Parser)]
#[command(name = "vcticket", version, about = "Visual-cryptography ticket tools")]
struct Cli {
    /// Signing secret (overrides SIGNING_SECRET)
    #[arg(long, global = true)]
    secret: Option<String>,
    /// Ticket lifetime in seconds (overrides TICKET_TTL_SECONDS)
    #[arg(long, global = true)]
    ttl_seconds: Option<u64>,
    /// Generate and align shares without the fiducial marker border
    #[arg(long, global = true)]
    no_border: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Issue a ticket and write share A, share B and the payload to a directory
    Issue {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Align two share images, decode the stacked result and verify it
    Stack {
        #[arg(long)]
        share_a: PathBuf,
        #[arg(long)]
        share_b: PathBuf,
        /// Directory for stacked.png and aligned.png
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the QR decode cascade on one image
    Decode {
        #[arg(long)]
        image: PathBuf,
    },
    /// Issue and redeem a ticket in memory
    Demo {
        #[arg(long, default_value = "Test User")]
        name: String,
        #[arg(long, default_value = "user@example.com")]
        email: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vc_ticket=info,vcticket=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(kind = ?err.kind(), "{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(secret) = &cli.secret {
        config.signing_secret = SigningSecret::new(secret);
    }
    if let Some(ttl) = cli.ttl_seconds {
        config = config.with_ticket_ttl(Duration::from_secs(ttl));
    }
    if cli.no_border {
        config = config.with_marker_border(None);
    }

    match cli.command {
        Command::Issue { name, email, out } => issue_cmd(&config, &name, &email, &out),
        Command::Stack {
            share_a,
            share_b,
            out,
        } => stack_cmd(&config, &share_a, &share_b, out.as_deref()),
        Command::Decode { image } => decode_cmd(&image),
        Command::Demo { name, email } => demo_cmd(config, &name, &email),
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::InvalidImage(format!("{}: {e}", path.display())))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|e| Error::ImageEncode(format!("{}: {e}", path.display())))
}

fn issue_cmd(config: &Config, name: &str, email: &str, out: &Path) -> Result<()> {
    let signer = PayloadSigner::new(&config.signing_secret)?;
    let user_uuid = uuid::Uuid::new_v4().to_string();
    let check_in_code = generate_check_in_code(&mut rand::rngs::OsRng);
    let expires_at = chrono::Utc::now().timestamp() + config.ticket_ttl.as_secs() as i64;

    let payload = signer.build(&TicketFields {
        name: name.to_string(),
        email: email.to_string(),
        user_uuid: user_uuid.clone(),
        check_in_code: check_in_code.clone(),
        expires_at,
    })?;
    let shares = ShareGenerator::default()
        .with_border(config.marker_border)
        .generate(&payload)?;
    let labeled = compose_share_a(&shares.share_a, &check_in_code, &user_uuid)?;

    fs::create_dir_all(out).map_err(|e| Error::ImageEncode(format!("{}: {e}", out.display())))?;
    write(&out.join("share_a.png"), &encode_png(&labeled)?)?;
    write(&out.join("share_b.png"), &encode_png(&shares.share_b)?)?;
    write(&out.join("code_qr.png"), &encode_png(&code_qr(&check_in_code)?)?)?;
    write(&out.join("payload.txt"), payload.as_bytes())?;

    println!("UUID:          {user_uuid}");
    println!("Check-in code: {check_in_code}");
    println!("Expires at:    {expires_at}");
    println!("Wrote share_a.png, share_b.png, code_qr.png, payload.txt to {}", out.display());
    Ok(())
}

fn stack_cmd(config: &Config, share_a: &Path, share_b: &Path, out: Option<&Path>) -> Result<()> {
    let a = read(share_a)?;
    let b = read(share_b)?;

    let start = Instant::now();
    let alignment = AlignmentEngine::new(config.marker_border).align(&a, &b)?;
    println!(
        "Strategy: {} ({:.1} ms)",
        alignment.strategy,
        start.elapsed().as_secs_f64() * 1000.0
    );
    if let Some(code) = extract_check_in_code(&a) {
        println!("Check-in code (label): {code}");
    }

    if let Some(dir) = out {
        write(&dir.join("stacked.png"), &encode_png(&alignment.stacked)?)?;
        write(&dir.join("aligned.png"), &encode_png(&alignment.aligned_share_a)?)?;
    }

    let Some(payload) = alignment.decoded else {
        return Err(Error::AlignmentExhausted);
    };
    println!("Decoded: {payload}");
    let fields = PayloadSigner::new(&config.signing_secret)?.verify(&payload)?;
    println!("Valid: {} <{}>, code {}", fields.name, fields.email, fields.check_in_code);
    Ok(())
}

fn decode_cmd(image: &Path) -> Result<()> {
    let gray = load_gray(&read(image)?)?;
    let found = QrDecoder::new().decode_all(&gray);
    println!("Found {} QR payload(s)", found.len());
    for (i, text) in found.iter().enumerate() {
        println!("  {i}: {text}");
    }
    Ok(())
}

fn demo_cmd(config: Config, name: &str, email: &str) -> Result<()> {
    let config = config.with_rate_limit_window(Duration::ZERO);
    let service = TicketService::new(&config, MemoryTicketStore::new())?;
    let issued = service.issue(name, email)?;
    println!("Issued: {}", serde_json::json!({
        "ticket_id": issued.ticket_id,
        "user_uuid": issued.user_uuid,
        "check_in_code": issued.check_in_code,
        "expires_at": issued.expires_at,
    }));

    let share_a = base64_to_bytes(&issued.share_a_base64)?;
    let start = Instant::now();
    let report = match service.redeem(&share_a, None) {
        Ok(redemption) => serde_json::json!({
            "valid": true,
            "strategy": redemption.strategy,
            "fields": redemption.fields,
        }),
        Err(rejection) => rejection.to_json(),
    };
    println!("Redeemed in {:.1} ms: {report}", start.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use qrpay::application::controller::PaymentSessionController;
use qrpay::config::PaymentConfig;
use qrpay::domain::ports::{GatewayBox, VerifierBox};
use qrpay::error::GatewayError;
use qrpay::infrastructure::http::HttpSettlementVerifier;
use qrpay::infrastructure::in_memory::{InMemoryGateway, InMemoryVerifier};
use qrpay::interfaces::scanner::{IntervalScanner, ScriptedFrames};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Payment code to feed the scanner (what the QR code would contain)
    code: String,

    /// Fixed purchase amount
    #[arg(long)]
    amount: Option<Decimal>,

    /// Purchase currency code
    #[arg(long)]
    currency: Option<String>,

    /// Verify captures against this backend endpoint instead of the
    /// built-in verifier
    #[arg(long)]
    capture_url: Option<String>,

    /// Make the built-in verifier reject the settlement
    #[arg(long)]
    deny_settlement: bool,

    /// Make the built-in gateway fail order creation
    #[arg(long)]
    fail_order: bool,

    /// Make the built-in gateway fail the capture step
    #[arg(long)]
    fail_capture: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = PaymentConfig::default();
    if let Some(amount) = cli.amount {
        config.amount = amount;
    }
    if let Some(currency) = cli.currency {
        config.currency = currency;
    }

    let mut gateway = InMemoryGateway::new();
    if cli.fail_order {
        gateway = gateway.with_create_failure(GatewayError::Transport(
            "simulated create-order outage".to_string(),
        ));
    }
    if cli.fail_capture {
        gateway = gateway.with_capture_failure(GatewayError::Declined {
            operation: "capture",
            message: "simulated capture decline".to_string(),
        });
    }
    let gateway: GatewayBox = Box::new(gateway);

    let verifier: VerifierBox = match cli.capture_url {
        Some(url) => Box::new(
            HttpSettlementVerifier::new(url, config.request_timeout()).into_diagnostic()?,
        ),
        None if cli.deny_settlement => Box::new(InMemoryVerifier::rejecting()),
        None => Box::new(InMemoryVerifier::accepting()),
    };

    let mut controller = PaymentSessionController::new(gateway, verifier, config.clone());
    println!("{}", controller.view().status_line());

    // A scripted frame source stands in for the camera: one miss, then
    // the given code.
    let frames = ScriptedFrames::new([None, Some(cli.code.as_str())]);
    let mut scanner = IntervalScanner::start(frames, config.scan_interval()).into_diagnostic()?;

    let outcome = drive(&mut controller, &mut scanner).await;
    drop(scanner);

    println!("{}", controller.view().status_line());
    outcome.into_diagnostic()?;
    Ok(())
}

async fn drive(
    controller: &mut PaymentSessionController,
    scanner: &mut IntervalScanner<ScriptedFrames>,
) -> qrpay::error::Result<()> {
    controller.scan(scanner).await?;
    println!("{}", controller.view().status_line());

    controller.place_order().await?;
    println!("{}", controller.view().status_line());

    controller.open_authorization()?;
    println!("{}", controller.view().status_line());

    controller.approve().await
}

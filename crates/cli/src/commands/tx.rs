//! Transaction commands.

use super::{Session, DEFAULT_DATA_DIR};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use settlechain_core::{Payload, Transaction, TransactionKind};
use std::path::PathBuf;

#[derive(Args)]
pub struct TxArgs {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand)]
enum TxCommand {
    /// Submit a new transaction to the pending pool
    Submit {
        /// Directory to store ledger data
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Transaction kind (transfer or registration)
        #[arg(short, long, default_value = "transfer")]
        kind: TransactionKind,

        /// Sender address
        #[arg(short, long)]
        from: Option<String>,

        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Amount to move
        #[arg(short, long)]
        amount: f64,

        /// JSON payload, e.g. '{"orderId":"ord-42"}'
        #[arg(long, default_value = "{}")]
        data: String,
    },
    /// List pending transactions
    Pending {
        /// Directory to store ledger data
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },
    /// Show a transaction
    Show {
        /// Directory to store ledger data
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Transaction identifier
        identifier: String,
    },
}

pub fn run(args: TxArgs) -> Result<()> {
    match args.command {
        TxCommand::Submit {
            data_dir,
            kind,
            from,
            to,
            amount,
            data,
        } => submit(data_dir, kind, from, to, amount, data),
        TxCommand::Pending { data_dir } => list_pending(data_dir),
        TxCommand::Show {
            data_dir,
            identifier,
        } => show(data_dir, identifier),
    }
}

fn submit(
    data_dir: PathBuf,
    kind: TransactionKind,
    from: Option<String>,
    to: String,
    amount: f64,
    data: String,
) -> Result<()> {
    let payload = Payload::from_json_str(&data).with_context(|| "Payload must be valid JSON")?;
    if payload.order_id().is_none() {
        println!(
            "{}  payload has no orderId; the validator will reject it",
            "!".yellow().bold()
        );
    }

    let session = Session::open(&data_dir)?;
    let identifier = session
        .ledger
        .submit_transaction(kind, from, to, amount, payload)
        .with_context(|| "Failed to submit transaction")?;
    session.close()?;

    println!("{}  Transaction submitted", "✓".green().bold());
    println!("    Identifier: {}", identifier.bright_yellow());
    Ok(())
}

fn list_pending(data_dir: PathBuf) -> Result<()> {
    let session = Session::open(&data_dir)?;
    let pending = session.ledger.pending_transactions();

    println!();
    println!(
        "{}",
        format!("Pending Transactions ({}):", pending.len()).bold().cyan()
    );
    println!();
    for tx in &pending {
        print_line(tx);
    }
    println!();
    Ok(())
}

fn show(data_dir: PathBuf, identifier: String) -> Result<()> {
    let session = Session::open(&data_dir)?;
    let stored = session
        .ledger
        .transaction(&identifier)?
        .with_context(|| format!("Transaction not found: {}", identifier))?;
    let tx = &stored.transaction;

    println!();
    println!("{}", "Transaction Information:".bold().cyan());
    println!();
    println!("  Identifier: {}", tx.identifier.bright_yellow());
    println!("  Kind:       {}", tx.kind);
    println!("  From:       {}", tx.sender.as_deref().unwrap_or("-"));
    println!("  To:         {}", tx.recipient);
    println!("  Amount:     {}", tx.amount.to_string().bright_cyan());
    println!("  Payload:    {}", tx.payload.as_str().bright_black());
    match stored.block_index {
        Some(index) => println!("  Status:     {} in block #{}", "mined".green(), index),
        None => println!("  Status:     {}", "pending".yellow()),
    }
    println!();
    Ok(())
}

fn print_line(tx: &Transaction) {
    println!(
        "  {} {} {} → {} {}",
        tx.identifier.bright_yellow(),
        tx.kind.to_string().bright_black(),
        tx.sender.as_deref().unwrap_or("-"),
        tx.recipient,
        tx.amount.to_string().bright_cyan()
    );
}

//! Block operations command.

use super::{format_timestamp, short_hex, Session, DEFAULT_DATA_DIR};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use settlechain_core::{Block, Hash};
use std::path::PathBuf;

#[derive(Args)]
pub struct BlockArgs {
    #[command(subcommand)]
    command: BlockCommand,
}

#[derive(Subcommand)]
enum BlockCommand {
    /// List recent blocks
    List {
        /// Directory to store ledger data
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
    /// Show detailed block information
    Info {
        /// Directory to store ledger data
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Block index or hash (hex format)
        block_id: String,
    },
}

pub fn run(args: BlockArgs) -> Result<()> {
    match args.command {
        BlockCommand::List { data_dir, count } => list_blocks(data_dir, count),
        BlockCommand::Info { data_dir, block_id } => show_block_info(data_dir, block_id),
    }
}

fn list_blocks(data_dir: PathBuf, count: usize) -> Result<()> {
    let session = Session::open(&data_dir)?;
    let blocks = session.ledger.blocks();

    println!();
    println!("{}", "Recent Blocks:".bold().cyan());
    println!();

    for block in blocks.iter().rev().take(count) {
        println!(
            "  {} {} {} {}",
            format!("#{}", block.index).bright_black(),
            short_hex(&block.hash.to_hex()).bright_yellow(),
            block.miner,
            format!("({} txs)", block.tx_count()).bright_black()
        );
    }

    println!();
    Ok(())
}

fn find_block(blocks: &[Block], block_id: &str) -> Result<Block> {
    if let Ok(index) = block_id.parse::<u64>() {
        return blocks
            .iter()
            .find(|b| b.index == index)
            .cloned()
            .context("Block not found");
    }
    let hash = Hash::from_hex(block_id)
        .with_context(|| format!("Invalid block hash: {}", block_id))?;
    blocks
        .iter()
        .find(|b| b.hash == hash)
        .cloned()
        .context("Block not found")
}

fn show_block_info(data_dir: PathBuf, block_id: String) -> Result<()> {
    let session = Session::open(&data_dir)?;
    let block = find_block(&session.ledger.blocks(), &block_id)?;

    println!();
    println!("{}", "Block Information:".bold().cyan());
    println!();
    println!("  Index:         {}", block.index.to_string().bright_cyan());
    println!("  Hash:          {}", block.hash.to_hex().bright_yellow());
    println!("  Previous Hash: {}", block.previous_hash.to_hex().bright_black());
    println!("  Timestamp:     {}", format_timestamp(&block.timestamp));
    println!("  Miner:         {}", block.miner);
    println!("  Difficulty:    {}", block.difficulty);
    println!("  Nonce:         {}", block.nonce);
    println!("  Reward:        {}", block.reward);
    println!();

    if !block.transactions.is_empty() {
        println!("{}", "Transactions:".bold());
        println!();
        for (i, tx) in block.transactions.iter().enumerate() {
            println!(
                "  {} {} {} {} → {} {}",
                format!("{}.", i + 1).bright_black(),
                tx.identifier.bright_yellow(),
                tx.kind.to_string().bright_black(),
                tx.sender.as_deref().unwrap_or("-"),
                tx.recipient,
                tx.amount.to_string().bright_cyan()
            );
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_block_by_index_or_hash() {
        let genesis = Block::genesis(3.125, 0);
        let child = Block::new(1, genesis.hash, "miner-a", vec![], 3.125, 0);
        let blocks = vec![genesis.clone(), child.clone()];

        assert_eq!(find_block(&blocks, "1").unwrap(), child);
        assert_eq!(find_block(&blocks, &genesis.hash.to_hex()).unwrap(), genesis);
        assert!(find_block(&blocks, "7").is_err());
        assert!(find_block(&blocks, "zz").is_err());
    }
}

// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! ReedFlow server binary.

use anyhow::Context;
use clap::Parser;
use reedflow::config::load_datastore;
use reedflow::Server;
use std::path::PathBuf;

/// Reactive database server with derived tables.
#[derive(Parser, Debug)]
#[command(name = "reedflow", version, about)]
struct Args {
    /// Table configuration document (TOML).
    #[arg(long)]
    config: PathBuf,

    /// Directory for table files.
    #[arg(long, default_value = ".flow")]
    data_dir: PathBuf,

    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:1108")]
    addr: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let datastore = load_datastore(&args.config, &args.data_dir)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    println!(
        "reedflow: serving {} tables from {} on {}",
        datastore.table_names().len(),
        args.data_dir.display(),
        args.addr
    );

    let server = Server::bind(&args.addr, datastore)
        .with_context(|| format!("binding {}", args.addr))?;
    server.serve()?;
    Ok(())
}

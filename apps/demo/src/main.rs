//! Creates a 4x6 integer dataset through the connector, writes it, reads a row back and reports
//! what the buffering subsystem staged.

use anyhow::{Context, ensure};
use clap::Parser;
use std::path::PathBuf;
use stratum::kernel::config::load_stratum_config;
use stratum::logger::Logger;
use stratum::native::SpaceStatus;
use stratum::prelude::*;
use tracing::info;

const ROWS: u64 = 4;
const COLS: u64 = 6;

#[derive(Debug, Parser)]
#[command(name = "stratum-demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Writes and reads a dataset through the Stratum connector")]
struct Cli {
    /// File created (truncating) through the connector
    #[arg(long, default_value = "dset.h5")]
    file: String,

    /// Dataset created inside the file
    #[arg(long, default_value = "/dset")]
    dataset: String,

    /// Configuration file; `stratum.*` in the working directory is used when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Row read back after the write
    #[arg(long, default_value_t = 1)]
    row: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    ensure!(cli.row < ROWS, "row {} outside 0..{ROWS}", cli.row);

    let cfg = load_stratum_config(cli.config.as_ref())
        .context("Critical: Configuration is malformed")?;
    let _log = Logger::from_config(env!("CARGO_PKG_NAME"), &cfg.logging)?;

    let native = MemoryNative::new();
    let staging = MemoryBuffer::new();
    let connector = Connector::builder()
        .native(native.clone())
        .buffering(staging.clone())
        .config(&cfg)
        .register()?;

    let fapl = native.create_fapl();
    let mut access = connector.set_fapl(fapl)?;
    native.plist_close(fapl)?;
    connector.file_create(&mut access, &cli.file, AccessFlags::TRUNCATE, PlistId::DEFAULT)?;

    let space = native.create_simple_space(&[ROWS, COLS], None)?;
    let dcpl = native.create_dcpl(ElementType::Int32, space)?;
    native.space_close(space)?;
    let dataset = connector.dataset_create(&access, &cli.dataset, dcpl, PlistId::DEFAULT)?;
    native.plist_close(dcpl)?;

    let values = (0..ROWS * COLS).map(i32::try_from).collect::<Result<Vec<_>, _>>()?;
    let data: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    connector.dataset_write(
        &dataset,
        ElementType::Int32,
        Selection::All,
        Selection::All,
        PlistId::DEFAULT,
        &data,
    )?;

    let row = read_row(&native, &connector, &dataset, cli.row)?;
    info!(row = cli.row, values = ?row, "Row read back");

    if let DatasetInfo::SpaceStatus(status) =
        connector.dataset_get(&dataset, DatasetQuery::SpaceStatus)?
    {
        info!(allocated = status == SpaceStatus::Allocated, "Native space status");
    }

    connector.dataset_close(dataset)?;
    connector.file_close(&mut access)?;
    connector.release_access(access)?;

    let stats = serde_json::to_string(&staging.stats())?;
    info!(%stats, open_handles = native.open_handles(), "Done");
    Ok(())
}

/// Reads one row through an explicit file selection.
fn read_row(
    native: &MemoryNative,
    connector: &Connector,
    dataset: &Dataset,
    row: u64,
) -> anyhow::Result<Vec<i32>> {
    let selection = native.create_simple_space(&[ROWS, COLS], None)?;
    native.select_hyperslab(selection, &[row, 0], &[1, COLS])?;

    let mut out = vec![0u8; COLS as usize * ElementType::Int32.size()];
    let read = connector.dataset_read(
        dataset,
        ElementType::Int32,
        Selection::All,
        Selection::Explicit(selection),
        PlistId::DEFAULT,
        &mut out,
    );
    native.space_close(selection)?;
    read?;

    Ok(out.chunks_exact(4).map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]])).collect())
}

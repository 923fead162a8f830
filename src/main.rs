use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};
use serde::Serialize;

#[macro_use]
extern crate lazy_static;

use efiloadopt::devpath::{self, DevicePathRecord};
use efiloadopt::loadopt::{BootTarget, LoadOption};
use efiloadopt::varstore::{self, BootEntry, VariableStore, Volume};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long)]
    verbose: bool,

    /// Produce debugging output
    #[arg(short, long)]
    debug: bool,

    /// Print JSON instead of text
    #[arg(short, long)]
    json: bool,

    /// Select the boot entry (hex) for the next boot
    #[arg(short, long, value_name = "ID", value_parser = parse_slot)]
    bootnext: Option<u16>,

    /// List available boot options
    #[arg(short, long)]
    list: bool,

    /// Show only boot options whose name or description contains <SUBSTR>
    #[arg(short, long, value_name = "SUBSTR")]
    filter: Option<String>,

    /// The input is a single load option rather than a variable store
    #[arg(short, long)]
    raw: bool,

    /// The input is a load option read from efivarfs, which starts with a
    /// four byte attribute word
    #[arg(long)]
    efivarfs: bool,

    /// A UEFI variable firmware volume, or a load option with --raw
    #[arg(value_name = "INPUT")]
    file: PathBuf,
}

fn parse_slot(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("Boot").trim_start_matches("0x");
    u16::from_str_radix(digits, 16)
        .map_err(|e| format!("invalid boot entry {:?}: {}", s, e))
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(args: &Args) {
    let level = if args.debug {
        LevelFilter::Debug
    } else if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

lazy_static! {
    static ref HEXDUMPER: rhexdump::Rhexdump = {
        let mut rhx = rhexdump::Rhexdump::default();
        rhx.display_duplicate_lines(false);
        rhx
    };
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);

    match (&args.bootnext, &args.output) {
        (Some(_), None) => bail!("An output file name must also be provided."),
        (None, Some(_)) => bail!("Nothing to write without --bootnext."),
        _ => {}
    }
    if args.list && args.output.is_some() {
        bail!("List mode does not create an output file.");
    }

    let path = &args.file;
    let data = fs::read(path)
        .with_context(|| format!("Could not open {}", path.display()))?;

    if args.raw || args.efivarfs {
        if args.output.is_some() {
            bail!("--bootnext needs a variable store, not a load option.");
        }
        let blob = if args.efivarfs {
            data.get(4..).context("efivarfs file is shorter than its header")?
        } else {
            &data[..]
        };
        return show_raw(&args, blob);
    }

    let mut fv = Volume::parse(&data)
        .with_context(|| format!("Could not parse {}", path.display()))?;
    log::debug!("{}: {} variable records", path.display(),
        fv.variables().len());

    if let (Some(id), Some(opath)) = (args.bootnext, &args.output) {
        varstore::set_boot_next(&mut fv, id)?;
        let out = fv.to_bytes()?;
        fs::write(opath, out).with_context(|| {
            format!("Could not write output file {}", opath.display())
        })?;
        log::info!("BootNext set to {:04X} in {}", id, opath.display());
        return Ok(());
    }

    if fv.variable_names().is_empty() {
        println!("{} is an empty variables file", path.display());
        return Ok(());
    }
    list_entries(&args, &fv)
}

#[derive(Serialize)]
struct Listing<'a> {
    boot_order: Vec<u16>,
    boot_next:  Option<u16>,
    entries:    Vec<&'a BootEntry>,
}

fn list_entries(args: &Args, store: &dyn VariableStore) -> anyhow::Result<()> {
    let order = varstore::boot_order(store).unwrap_or_default();
    let next = varstore::boot_next(store);
    let entries = varstore::boot_entries(store);
    let shown: Vec<&BootEntry> = entries
        .iter()
        .filter(|be| match &args.filter {
            Some(f) => be.name.contains(f) || be.option.name().contains(f),
            None => true,
        })
        .collect();

    if args.json {
        let listing = Listing {
            boot_order: order,
            boot_next:  next,
            entries:    shown,
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("BOOT OPTIONS");
    println!("------------");
    if !order.is_empty() {
        let order: Vec<String> = order.iter().map(|s| format!("{:04X}", s))
            .collect();
        println!("Bootorder: {}", order.join(","));
    }

    let current = order.first().copied();
    for be in shown {
        let opt = &be.option;
        let mut tag = String::new();
        tag.push(if Some(be.slot) == current { 'C' } else { ' ' });
        tag.push(if Some(be.slot) == next { 'N' } else { ' ' });
        tag.push(if opt.is_hidden() { 'H' } else { ' ' });

        println!("{} [{:04X}] {}{}{}", tag, be.slot, opt.name(),
            target_suffix(opt), if opt.uses_uri() { " [HTTP]" } else { "" });

        if args.verbose {
            dump_option(opt)?;
            println!();
        }
    }
    println!("C    - Current (first in boot order)");
    println!(" N   - Next Boot");
    println!("  H  - Hidden");
    Ok(())
}

fn target_suffix(opt: &LoadOption) -> String {
    match opt.boot_target() {
        BootTarget::Unknown => String::new(),
        t => format!(" - [{}]", t),
    }
}

fn show_raw(args: &Args, blob: &[u8]) -> anyhow::Result<()> {
    let opt = LoadOption::parse(blob).context("Not a valid load option")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&opt)?);
        return Ok(());
    }

    println!("Description: {}", opt.name());
    println!("Attributes:  {:#010x}{}{}", opt.attributes,
        if opt.is_visible() { " active" } else { "" },
        if opt.is_hidden() { " hidden" } else { "" });
    println!("Path:        {}",
        devpath::device_path_to_text(opt.device_path_list()));
    let target = opt.boot_target();
    if target != BootTarget::Unknown {
        println!("Target:      {}", target);
    }
    if args.verbose {
        dump_option(&opt)?;
    }
    Ok(())
}

fn dump_option(opt: &LoadOption) -> anyhow::Result<()> {
    for (i, r) in opt.device_path_list().iter().enumerate() {
        dump_record(i, r)?;
    }
    if !opt.optional_data.is_empty() {
        println!("    Optional Data:");
        println!("{}", HEXDUMPER.hexdump(&opt.optional_data));
    }
    Ok(())
}

fn dump_record(i: usize, r: &DevicePathRecord) -> anyhow::Result<()> {
    let raw = r.to_bytes()?;
    let name = r.kind().map(|k| k.name).unwrap_or("?");
    println!("    File path {:2x} Type: {:#x}/{:#x} ({}) Length: {:#x}",
        i, r.device_type(), r.subtype(), name, raw.len());
    if raw.len() > devpath::HEADER_LEN {
        println!("{}", HEXDUMPER.hexdump(&raw[devpath::HEADER_LEN..]));
    }
    Ok(())
}

use clap::{ArgAction, Parser};
use log::LevelFilter;
use mp4scope::{
    AttrValue, BoxNode, DecodeError, DecodeOptions, KnownBox, Tree, decode_with, hex_range,
};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "MP4/ISOBMFF box tree dumper")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// Only print subtree(s) matching a dotted path (e.g. moov.trak[0].mdia.minf.stbl)
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Dump the raw body of every box of this 4CC (e.g. --raw stsd)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Bytes to show per raw dump (0 means the entire body)
    #[arg(long, default_value_t = 0)]
    bytes: usize,

    /// Limit container recursion depth
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Print decoded fields under each box
    #[arg(long, action = ArgAction::SetTrue)]
    decode: bool,

    /// Emit JSON instead of the human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Error,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let data = std::fs::read(&args.path)?;
    let opts = DecodeOptions {
        max_depth: args.max_depth,
        // JSON always carries the fields
        decode_fields: args.decode || args.json,
    };

    let tree = match decode_with(&data, &opts) {
        Ok(tree) => tree,
        Err(DecodeError::MalformedTopLevel { offset, reason }) => {
            eprintln!("{}: no MP4 boxes found ({reason} at {offset:#x})", args.path);
            return Ok(ExitCode::FAILURE);
        }
    };

    let targets: Vec<&BoxNode> = match &args.filter {
        Some(path) => tree.select(path),
        None => tree.boxes.iter().collect(),
    };

    if args.json {
        if args.filter.is_some() {
            println!("{}", serde_json::to_string_pretty(&targets)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        return Ok(ExitCode::SUCCESS);
    }

    for b in &targets {
        print_box(b, 0, args.decode);
    }

    if let Some(sel) = &args.raw {
        dump_raw(&data, &tree, sel, args.bytes);
    }

    print_diagnostics(&tree);
    Ok(ExitCode::SUCCESS)
}

// ---------- Human-readable tree ----------

fn print_box(b: &BoxNode, depth: usize, decode: bool) {
    let indent = "  ".repeat(depth);
    let kind = KnownBox::from(b.fourcc);
    let suffix = if kind.is_container() { " (container)" } else { "" };
    println!(
        "{indent}{:>8} {:>10} {}{suffix}",
        format!("{:#x}", b.offset),
        format!("{:#x}", b.size),
        b.typ,
    );

    if decode && !b.attributes.is_empty() {
        println!("{indent}  [{}]", kind.full_name());
        for (name, value) in &b.attributes {
            println!("{indent}    {name}: {}", render(value));
        }
    }

    for c in &b.children {
        print_box(c, depth + 1, decode);
    }
}

fn render(v: &AttrValue) -> String {
    match v {
        AttrValue::UInt(n) => n.to_string(),
        AttrValue::Int(n) => n.to_string(),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Text(s) => s.clone(),
        // nested values read best as compact JSON
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn print_diagnostics(tree: &Tree) {
    if tree.diagnostics.is_empty() {
        return;
    }
    println!("\n== {} diagnostic(s) ==", tree.diagnostics.len());
    for d in &tree.diagnostics {
        println!("  {d}");
    }
    if !tree.is_complete() {
        println!(
            "  decoding stopped at {:#x} of {:#x} bytes",
            tree.consumed, tree.len
        );
    }
}

// ---------- Raw dump ----------

fn dump_raw(data: &[u8], tree: &Tree, sel: &str, limit: usize) {
    let matches = tree.iter().map(|(_, b)| b).filter(|b| b.typ == sel);
    for (i, b) in matches.enumerate() {
        let body = b.body_range();
        let len = body.end - body.start;
        let to_read = if limit == 0 { len } else { len.min(limit as u64) };
        let dump = hex_range(data, body.start, to_read);
        println!(
            "\n== Dump {} ({}) payload: offset={:#x}, len={} ==",
            i, b.typ, dump.offset, dump.length
        );
        print!("{}", dump.hex);
    }
}

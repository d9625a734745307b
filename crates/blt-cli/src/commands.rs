use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context};
use blt_binary::{BinaryError, WriterConfig};
use blt_diff::{first_mismatch, render_report};
use blt_text::{outline, TextCodec, TextFormat, XmlCodec, XmlConfig};
use blt_tree::Tree;
use colored::Colorize;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cli::*;

/// Settings file accepted by `convert --config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConvertConfig {
    binary: WriterConfig,
    xml: XmlConfig,
}

/// On-disk encodings the tool understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Binary,
    Text(TextFormat),
}

impl LogFormat {
    /// The format implied by a file extension, if any.
    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "bltb" | "binlog" => Some(Self::Binary),
            other => TextFormat::from_extension(other).map(Self::Text),
        }
    }

    /// Output format; must come from the extension.
    fn for_output(path: &Path) -> anyhow::Result<Self> {
        Self::from_extension(path).with_context(|| {
            format!(
                "cannot tell the output format of {} from its extension",
                path.display()
            )
        })
    }
}

/// A loaded tree, plus whether it came from a truncated binary log.
struct Loaded {
    tree: Tree,
    truncated: bool,
}

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let format = cli.format;
    match cli.command {
        Command::Convert(args) => cmd_convert(args).map(|()| ExitCode::SUCCESS),
        Command::Diff(args) => cmd_diff(args, format).map(exit_code),
        Command::Dump(args) => cmd_dump(args).map(|()| ExitCode::SUCCESS),
        Command::Stats(args) => cmd_stats(args, format).map(|()| ExitCode::SUCCESS),
        Command::Verify(args) => cmd_verify(args).map(exit_code),
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load(path: &Path, allow_partial: bool) -> anyhow::Result<Loaded> {
    let format = LogFormat::from_extension(path);
    if format == Some(LogFormat::Binary) || (format.is_none() && has_binary_magic(path)) {
        return load_binary(path, allow_partial);
    }

    let source = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let format = match format {
        Some(LogFormat::Text(format)) => format,
        _ => TextFormat::detect(&source)
            .with_context(|| format!("cannot tell the log format of {}", path.display()))?,
    };
    debug!(path = %path.display(), %format, "loading text log");
    let tree = format
        .codec()
        .read(&source)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Loaded {
        tree,
        truncated: false,
    })
}

fn has_binary_magic(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    fs::File::open(path)
        .and_then(|mut file| file.read_exact(&mut magic))
        .is_ok_and(|()| &magic == blt_binary::MAGIC)
}

fn load_binary(path: &Path, allow_partial: bool) -> anyhow::Result<Loaded> {
    match blt_binary::read_file(path) {
        Ok(tree) => Ok(Loaded {
            tree,
            truncated: false,
        }),
        Err(BinaryError::Truncated { offset, partial }) if allow_partial => {
            let tree = partial
                .map(|tree| *tree)
                .with_context(|| format!("{} ends before its first node", path.display()))?;
            warn!(
                path = %path.display(),
                offset,
                nodes = tree.len(),
                "using partial tree from truncated log"
            );
            Ok(Loaded {
                tree,
                truncated: true,
            })
        }
        Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
    }
}

fn save(tree: &Tree, path: &Path, config: &ConvertConfig) -> anyhow::Result<()> {
    let written = match LogFormat::for_output(path)? {
        LogFormat::Binary => {
            blt_binary::write_file(tree, path, &config.binary).map_err(anyhow::Error::from)
        }
        LogFormat::Text(TextFormat::Xml) => {
            let codec = XmlCodec::new(config.xml.clone());
            blt_text::write_file_with(tree, path, &codec).map_err(anyhow::Error::from)
        }
        LogFormat::Text(format) => {
            blt_text::write_file_as(tree, path, format).map_err(anyhow::Error::from)
        }
    };
    written.with_context(|| format!("writing {}", path.display()))
}

fn load_config(args: &ConvertArgs) -> anyhow::Result<ConvertConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ConvertConfig::default(),
    };
    if let Some(framing) = args.framing {
        config.binary.framing = framing.into();
    }
    debug!(?config, "convert settings");
    Ok(config)
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let loaded = load(&args.input, args.allow_partial)?;
    save(&loaded.tree, &args.output, &config)?;

    let note = if loaded.truncated { " (partial)" } else { "" };
    println!(
        "{} {} → {}: {} nodes{}",
        "✓".green().bold(),
        args.input.display(),
        args.output.display().to_string().bold(),
        loaded.tree.len(),
        note.yellow()
    );
    Ok(())
}

/// Returns `true` when the logs are equivalent.
fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<bool> {
    let left = load(&args.left, false)?.tree;
    let right = load(&args.right, false)?.tree;
    let mismatch = first_mismatch(&left, &right);

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "different": mismatch.is_some(),
                "path": mismatch.as_ref().map(|m| m.path.clone()),
                "reason": mismatch.as_ref().map(|m| m.reason.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => match &mismatch {
            None => println!("{} equivalent", "✓".green().bold()),
            Some(m) => {
                println!("{} different", "✗".red().bold());
                println!("  first mismatch at {}", m.to_string().yellow());
            }
        },
    }

    if args.report && mismatch.is_some() {
        let report = render_report(&left, &right);
        for line in report.to_string().lines() {
            let line = match line.chars().next() {
                Some('+') => line.green(),
                Some('-') => line.red(),
                Some('@') => line.cyan(),
                _ => line.normal(),
            };
            println!("{line}");
        }
    }

    Ok(mismatch.is_none())
}

fn cmd_dump(args: DumpArgs) -> anyhow::Result<()> {
    let loaded = load(&args.input, true)?;
    print!("{}", outline::render(&loaded.tree));
    if loaded.truncated {
        eprintln!("{} log is truncated; showing the nodes read so far", "!".yellow().bold());
    }
    Ok(())
}

fn cmd_stats(args: StatsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let loaded = load(&args.input, true)?;
    let tree = &loaded.tree;
    let counts = tree.kind_counts();
    let max_depth = tree.iter().map(|n| n.depth()).max().unwrap_or(0);

    match format {
        OutputFormat::Json => {
            let kinds: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(kind, count)| (kind.to_string(), (*count).into()))
                .collect();
            let out = serde_json::json!({
                "nodes": tree.len(),
                "max_depth": max_depth,
                "truncated": loaded.truncated,
                "kinds": kinds,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{}", args.input.display().to_string().bold());
            if loaded.truncated {
                println!("  {}", "truncated: partial tree".yellow());
            }
            println!("  nodes: {}", tree.len());
            println!("  max depth: {max_depth}");
            for (kind, count) in &counts {
                println!("  {:<12} {count}", kind.to_string().cyan());
            }
        }
    }
    Ok(())
}

/// Returns `true` when every codec reproduces the tree.
fn cmd_verify(args: VerifyArgs) -> anyhow::Result<bool> {
    let tree = load(&args.input, false)?.tree;
    let mut failures = 0;

    for format in TextFormat::ALL {
        let codec = format.codec();
        let outcome = codec
            .render(&tree)
            .and_then(|text| codec.read(&text))
            .map_err(anyhow::Error::from);
        failures += report_check(format.name(), &tree, outcome);
    }
    for framing in [blt_binary::Framing::EndMarker, blt_binary::Framing::ChildCount] {
        let config = WriterConfig {
            framing,
            ..WriterConfig::default()
        };
        let outcome = blt_binary::to_bytes(&tree, &config)
            .and_then(|bytes| blt_binary::read_bytes(&bytes))
            .map_err(anyhow::Error::from);
        let label = format!("binary major {}", framing.major());
        failures += report_check(&label, &tree, outcome);
    }

    if failures == 0 {
        println!("{} {} nodes survive every codec", "✓".green().bold(), tree.len());
    } else {
        println!("{} {failures} codec(s) changed the tree", "✗".red().bold());
    }
    Ok(failures == 0)
}

/// Print one verify line; returns 1 on failure.
fn report_check(label: &str, original: &Tree, outcome: anyhow::Result<Tree>) -> usize {
    match outcome {
        Ok(back) => match first_mismatch(original, &back) {
            None => {
                println!("  {} {label}", "✓".green());
                0
            }
            Some(m) => {
                println!("  {} {label}: {}", "✗".red(), m.to_string().yellow());
                1
            }
        },
        Err(err) => {
            println!("  {} {label}: {err:#}", "✗".red());
            1
        }
    }
}

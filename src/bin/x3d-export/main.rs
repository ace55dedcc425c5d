//! x3d-export CLI - convert JSON scene documents and inspect binary output.

use std::env;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use x3d_export::core::{CompressionMethod, Encoding, ExportOptions, SpecVersion};
use x3d_export::export::sink::{InfosetEvent, InfosetReader, InfosetValue};
use x3d_export::export::{export_to_path, export_to_writer};
use x3d_export::scene::load_scene;
use x3d_export::{Error, Result};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_tracing(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "convert" | "c" => cmd_convert(&filtered_args[1..]),
        "info" | "i" => match filtered_args.get(1) {
            Some(path) => cmd_info(path),
            None => usage_error("x3d-export info <scene.json>"),
        },
        "dump" | "d" => match filtered_args.get(1) {
            Some(path) => cmd_dump(path),
            None => usage_error("x3d-export dump <file.x3db>"),
        },
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if e.is_sink_failure() {
            eprintln!("Output is incomplete");
        }
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the verbosity flags.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn usage_error(usage: &str) -> Result<()> {
    Err(Error::other(format!("missing argument\nUsage: {usage}")))
}

fn print_help() {
    println!("x3d-export - scene graph export tool");
    println!();
    println!("USAGE:");
    println!("    x3d-export [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    c, convert <scene.json> <output>   Export a scene document");
    println!("    i, info    <scene.json>            Show node, prototype and route counts");
    println!("    d, dump    <file.x3db>             Print decoded binary events");
    println!("    h, help                            Show this help");
    println!();
    println!("CONVERT OPTIONS:");
    println!("    --encoding xml|binary|classic    Output encoding (default: from extension)");
    println!("    --method strings|fastest|smallest|lossy");
    println!("    --quantize <F>                   Max error for lossy floats (default 0.001)");
    println!("    --digits <N>                     Significant digits in text numbers");
    println!("    --min-float <N>                  Shortest float array to compress (default 7)");
    println!("    --strip                          No indentation in XML");
    println!("    --no-doctype                     Omit <!DOCTYPE>");
    println!("    --no-xml-decl                    Omit <?xml ...?>");
    println!("    --keep-defaults                  Write fields equal to their default");
    println!("    --version <X.Y>                  Target version (default 3.2)");
    println!("    --base-url <U>                   Strip this prefix from URL fields");
    println!("    --upgrade-urls                   Rewrite .wrl references to the output extension");
    println!("    --options <file.json>            Load options first, flags override");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Errors only");
    println!("    RUST_LOG overrides the level flags.");
    println!();
    println!("EXAMPLES:");
    println!("    x3d-export convert scene.json scene.x3d");
    println!("    x3d-export convert scene.json scene.x3db --method lossy --quantize 0.01");
    println!("    x3d-export convert scene.json scene.wrl --version 2.0");
    println!("    x3d-export dump scene.x3db");
}

/// Value following `flag`.
fn flag_value<'a>(args: &[&'a str], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .copied()
        .ok_or_else(|| Error::other(format!("{flag} needs a value")))
}

fn parse_num<T: std::str::FromStr>(text: &str, flag: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::other(format!("bad value for {flag}: {text}")))
}

fn cmd_convert(args: &[&str]) -> Result<()> {
    // Option files load first so flags can override them.
    let mut options = match args.iter().position(|a| *a == "--options") {
        Some(i) => {
            let path = args
                .get(i + 1)
                .ok_or_else(|| Error::other("--options needs a value"))?;
            debug!("Loading options from {}", path);
            ExportOptions::from_json(&fs::read_to_string(path).map_err(|e| Error::read(path, e))?)?
        }
        None => ExportOptions::default(),
    };

    let mut encoding: Option<Encoding> = None;
    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i];
        match arg {
            "--encoding" => encoding = Some(flag_value(args, &mut i, arg)?.parse()?),
            "--method" => options.compression = flag_value(args, &mut i, arg)?.parse::<CompressionMethod>()?,
            "--quantize" => options.quantize_param = parse_num(flag_value(args, &mut i, arg)?, arg)?,
            "--digits" => options.significant_digits = Some(parse_num(flag_value(args, &mut i, arg)?, arg)?),
            "--min-float" => {
                options.min_float_array_size_to_compress = parse_num(flag_value(args, &mut i, arg)?, arg)?
            }
            "--version" => options.version = SpecVersion::parse(flag_value(args, &mut i, arg)?)?,
            "--base-url" => options.base_url = Some(flag_value(args, &mut i, arg)?.to_string()),
            "--options" => i += 1,
            "--strip" => options.strip_whitespace = true,
            "--no-doctype" => options.print_doctype = false,
            "--no-xml-decl" => options.print_xml_declaration = false,
            "--keep-defaults" => options.remove_defaults = false,
            "--upgrade-urls" => options.upgrade_legacy_urls = true,
            flag if flag.starts_with("--") => return Err(Error::other(format!("unknown option: {flag}"))),
            _ => positional.push(arg),
        }
        i += 1;
    }

    let &[input, output] = &positional[..] else {
        return usage_error("x3d-export convert <scene.json> <output> [options]");
    };

    info!("Loading {}", input);
    let scene = load_scene(input)?;
    let report = match encoding {
        Some(encoding) if Encoding::from_path(output) != Some(encoding) => {
            encoding.check_version(options.version)?;
            let file = fs::File::create(output)?;
            export_to_writer(&scene, encoding, &options, std::io::BufWriter::new(file))?
        }
        _ => export_to_path(&scene, output, &options)?,
    };

    if report.has_diagnostics() {
        warn!("{} problems recovered during export:", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            warn!("  {}", diagnostic);
        }
    }
    let size = fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    info!(
        "Wrote {} ({} bytes): {} nodes, {} USE, {} fields, {} defaults elided, {} protos, {} routes",
        output, size, report.nodes, report.uses, report.fields, report.elided, report.protos, report.routes
    );
    Ok(())
}

fn cmd_info(path: &str) -> Result<()> {
    info!("Loading {}", path);
    let scene = load_scene(path)?;

    println!("Scene: {}", path);
    println!("  Profile:     {}", scene.profile());
    for c in scene.components() {
        println!("  Component:   {} level {}", c.name, c.level);
    }
    println!("  Nodes:       {}", scene.node_count() - 1);
    println!("  Top-level:   {}", scene.root_nodes().len());
    println!("  DEF labels:  {}", scene.labels().len());

    let (mut local, mut external) = (0, 0);
    for (_, proto) in scene.prototypes() {
        if proto.is_extern() {
            external += 1;
        } else {
            local += 1;
        }
    }
    println!("  Prototypes:  {} local, {} extern", local, external);
    for (_, proto) in scene.prototypes() {
        println!("    {} ({} interface fields)", proto.name, proto.interface.len());
    }
    println!("  Routes:      {}", scene.routes().len());
    println!("  Imports:     {}", scene.imports().len());
    println!("  Exports:     {}", scene.exports().len());
    Ok(())
}

fn cmd_dump(path: &str) -> Result<()> {
    if !Path::new(path).exists() {
        return Err(Error::other(format!("no such file: {path}")));
    }
    let data = fs::read(path).map_err(|e| Error::read(path, e))?;
    let doc = InfosetReader::read_document(&data)?;

    println!("Format version {}", doc.format_version);
    for (id, uri) in &doc.algorithms {
        println!("Algorithm {:>3}: {}", id, uri);
    }

    let mut depth = 0usize;
    for event in &doc.events {
        let indent = "  ".repeat(depth);
        match event {
            InfosetEvent::Start(name) => {
                println!("{}<{}>", indent, name);
                depth += 1;
            }
            InfosetEvent::End => depth = depth.saturating_sub(1),
            InfosetEvent::Comment(text) => println!("{}<!-- {} -->", indent, text),
            InfosetEvent::Attribute { name, value } => match value {
                InfosetValue::Text(text) => println!("{}{} = {:?}", indent, name, text),
                InfosetValue::Encoded { algorithm, payload } => {
                    let decoded = value.decode()?.map(|v| v.len()).unwrap_or(0);
                    println!(
                        "{}{} = [{}: {} bytes, {} values]",
                        indent,
                        name,
                        algorithm,
                        payload.len(),
                        decoded
                    );
                }
            },
        }
    }
    Ok(())
}

use clap::{Parser, ValueEnum};
use pcb_gerber::{
    load_with, BoundingBox, FileSettings, GerberFile, InterpreterOptions, Primitive, Statement,
    SubtractSemantics, Units,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pcb-gerber", about = "Dump Gerber geometry as JSON")]
struct Cli {
    /// Input Gerber file
    input: PathBuf,

    /// Output JSON file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Convert to these units before dumping
    #[arg(long, value_enum)]
    units: Option<UnitsArg>,

    /// Move the image by X,Y in the output units
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    offset: Option<(f64, f64)>,

    /// Include the parsed statements in the output
    #[arg(long)]
    statements: bool,

    /// Evaluate macro subtraction the way older tools did (always zero)
    #[arg(long)]
    legacy_subtract: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitsArg {
    Inch,
    Metric,
}

impl From<UnitsArg> for Units {
    fn from(u: UnitsArg) -> Self {
        match u {
            UnitsArg::Inch => Units::Inch,
            UnitsArg::Metric => Units::Metric,
        }
    }
}

#[derive(Serialize)]
struct Dump<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
    settings: FileSettings,
    bounds: BoundingBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    statements: Option<&'a [Statement]>,
    primitives: &'a [Primitive],
}

fn parse_offset(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got: {s}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("bad offset value '{v}': {e}"))
    };
    Ok((parse(x)?, parse(y)?))
}

fn load(cli: &Cli) -> Result<GerberFile, pcb_gerber::error::GerberError> {
    let subtract_semantics = if cli.legacy_subtract {
        SubtractSemantics::Legacy
    } else {
        SubtractSemantics::Conventional
    };
    let text = std::fs::read_to_string(&cli.input)?;
    let file = load_with(&text, InterpreterOptions { subtract_semantics })?;
    Ok(file.with_filename(cli.input.display().to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut file = match load(&cli) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(units) = cli.units {
        file.convert_units(units.into());
    }
    if let Some((dx, dy)) = cli.offset {
        file.offset(dx, dy);
    }

    let dump = Dump {
        filename: file.filename(),
        settings: file.settings(),
        bounds: file.bounds(),
        statements: cli.statements.then(|| file.statements()),
        primitives: file.primitives(),
    };
    let json = if cli.pretty {
        serde_json::to_string_pretty(&dump)
    } else {
        serde_json::to_string(&dump)
    };
    let json = match json {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error: JSON serialization failed: {e}");
            std::process::exit(1);
        }
    };

    if let Some(output_path) = cli.output {
        if let Err(e) = std::fs::write(&output_path, &json) {
            eprintln!("Error writing {}: {e}", output_path.display());
            std::process::exit(1);
        }
        eprintln!("Written to {}", output_path.display());
    } else {
        println!("{json}");
    }
}

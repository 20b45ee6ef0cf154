use clap::{Parser, Subcommand};
use excel_plugin::cli::{self, LoadFormat};
use excel_plugin::error::PluginResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "excel-plugin")]
#[command(about = "Load Excel sheets as tables and store tables as Excel sheets.")]
#[command(long_about = "excel-plugin - Excel source/sink for SQL data tools

COMMANDS:
  load     - Read one sheet of a workbook (local path or s3:// URI)
  sheets   - List the sheets of a workbook
  store    - Write JSON record files as sheets of one output workbook

EXAMPLES:
  excel-plugin load 'data/{month}.xlsx' --field month=jan
  excel-plugin load s3://bucket/report.xlsx --sheet Summary --config plugin.yaml
  excel-plugin store --config plugin.yaml orders.json customers.json

LOGGING:
  Set RUST_LOG (e.g. RUST_LOG=excel_plugin=debug) for detailed logs on stderr.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Read one sheet of a workbook and print it.

The location is a template: {field} placeholders are filled from --field
values (and from the location itself). Locations containing 's3' are read
from object storage using credentials from --config (s3_access_key_id,
s3_secret_access_key, s3_region) or the AWS_* environment variables.

EXAMPLES:
  excel-plugin load 'data/{month}.xlsx' --field month=jan
  excel-plugin load report.xlsx --sheet 2 --format table")]
    /// Read one sheet of a workbook
    Load {
        /// Workbook path or URI template
        location: String,

        /// Sheet name or 0-based index (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Template field as key=value (repeatable)
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// Plugin configuration file (YAML)
        #[arg(short, long, env = "EXCEL_PLUGIN_CONFIG")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: LoadFormat,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Workbook path or URI template
        location: String,

        /// Template field as key=value (repeatable)
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },

    #[command(long_about = "Write JSON record files as sheets of one output workbook.

Each input must contain a JSON array of objects. Each input becomes one
sheet, named after the file stem unless --relation or a sheet_name override
is given. The output file and its options come from the 'output' section of
the configuration file:

  output:
    file: results.xlsx
    na_rep: \"\"
    index: false
    header_styling: false
    engine_kwargs:
      options:
        use_zip64: true

engine_kwargs follows the xlsxwriter shape {options: {...}}. Only use_zip64,
in_memory, tmpdir and strings_to_* set to false are accepted.

EXAMPLES:
  excel-plugin store --config plugin.yaml orders.json customers.json
  excel-plugin store --config plugin.yaml totals.json --override sheet_name=Summary")]
    /// Write JSON record files as sheets of an Excel workbook
    Store {
        /// Plugin configuration file (YAML) with an 'output' section
        #[arg(short, long, env = "EXCEL_PLUGIN_CONFIG")]
        config: PathBuf,

        /// JSON input files (array of records)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Relation identifier (single input only)
        #[arg(short, long)]
        relation: Option<String>,

        /// Sheet option override as key=value (repeatable)
        #[arg(short, long = "override")]
        overrides: Vec<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> PluginResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "excel_plugin=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load {
            location,
            sheet,
            fields,
            config,
            format,
        } => cli::load(location, sheet, fields, config, format),

        Commands::Sheets { location, fields } => cli::sheets(location, fields),

        Commands::Store {
            config,
            inputs,
            relation,
            overrides,
            verbose,
        } => cli::store(config, inputs, relation, overrides, verbose),
    }
}

//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};

use wifiqr::credential::Encryption;
use wifiqr::sheet::ColumnRef;

#[derive(Parser)]
#[command(
    name = "wifiqr",
    version,
    about = "Generate printable WiFi QR codes",
    long_about = "Generate printable WiFi QR codes.\n\n\
                  Codes carry an optional property logo and a caption with the network\n\
                  name and password. Credentials come from flags or from a CSV sheet."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Include passwords in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Settings file (default: platform config dir).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for generated images (overrides `output_dir` in settings).
    #[arg(long = "output-dir", value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate one code from credentials given on the command line.
    Generate(GenerateArgs),

    /// Generate codes for every row of a CSV sheet, or for one room.
    Batch(BatchArgs),

    /// List recent sheets or show the stored settings of one sheet.
    Sources(SourcesArgs),

    /// Manage the settings file.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Network name.
    #[arg(long)]
    pub ssid: String,

    /// Network password (ignored for open networks).
    #[arg(long, default_value = "")]
    pub password: String,

    /// Encryption: WPA2, WPA, WEP or OPEN.
    #[arg(long, value_name = "TYPE")]
    pub encryption: Option<String>,

    /// Property label selecting the logo (VLEV, VG or a known alias).
    #[arg(long)]
    pub property: Option<String>,

    /// Mark the network as hidden.
    #[arg(long)]
    pub hidden: bool,

    /// Room used in the output filename.
    #[arg(long)]
    pub room: Option<String>,

    #[command(flatten)]
    pub caption: CaptionArgs,
}

#[derive(Args)]
pub struct CaptionArgs {
    /// Caption text instead of the default "SSID / Password" lines.
    #[arg(long, conflicts_with = "no_caption")]
    pub caption: Option<String>,

    /// Do not draw a caption.
    #[arg(long = "no-caption")]
    pub no_caption: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// CSV export of the sheet.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Sheet name used as settings key (default: last used, else the file stem).
    #[arg(long)]
    pub sheet: Option<String>,

    /// Only generate the code for this room.
    #[arg(long)]
    pub room: Option<String>,

    #[command(flatten)]
    pub columns: ColumnArgs,

    /// Read encryption from the sheet instead of the default.
    #[arg(long = "use-sheet-security", value_name = "BOOL")]
    pub use_sheet_security: Option<bool>,

    /// Read property from the sheet instead of the default.
    #[arg(long = "use-sheet-property", value_name = "BOOL")]
    pub use_sheet_property: Option<bool>,

    /// Encryption used when the sheet's value is not used or blank.
    #[arg(long = "default-encryption", value_name = "TYPE")]
    pub default_encryption: Option<Encryption>,

    /// Property used when the sheet's value is not used or blank ("none" clears it).
    #[arg(long = "default-property", value_name = "TAG")]
    pub default_property: Option<String>,

    #[command(flatten)]
    pub caption: CaptionArgs,
}

/// Column letters (`C`) or 1-based numbers (`3`).
#[derive(Args)]
pub struct ColumnArgs {
    #[arg(id = "room_col", long = "room-col", value_name = "COL")]
    pub room: Option<ColumnRef>,

    #[arg(long = "ssid-col", value_name = "COL")]
    pub ssid: Option<ColumnRef>,

    #[arg(long = "password-col", value_name = "COL")]
    pub password: Option<ColumnRef>,

    #[arg(long = "encryption-col", value_name = "COL")]
    pub encryption: Option<ColumnRef>,

    #[arg(long = "property-col", value_name = "COL")]
    pub property: Option<ColumnRef>,
}

#[derive(Args)]
pub struct SourcesArgs {
    /// Show the stored settings of this file instead of the recent list.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    #[arg(long, requires = "file")]
    pub sheet: Option<String>,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Write a settings file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the effective settings.
    Show,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

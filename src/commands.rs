//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use wifiqr::batch::{run_batch, BatchContext, BatchReport};
use wifiqr::caption::load_first_font;
use wifiqr::credential::{CredentialInput, WifiCredential};
use wifiqr::error::StoreError;
use wifiqr::pipeline::{CaptionChoice, CompositionRequest, QrPipeline, RenderedQr};
use wifiqr::property::PropertyTable;
use wifiqr::settings::Settings;
use wifiqr::sheet::{find_room, ColumnRole, CsvSheet, SheetSource};
use wifiqr::store::{RecentFile, SourceConfigEntry, SourceConfigStore};

use crate::cli::{BatchArgs, CaptionArgs, ColumnArgs, GenerateArgs, SettingsAction, SourcesArgs};

/// Settings and paths shared by every subcommand.
pub struct AppContext {
    pub settings: Settings,
    pub settings_path: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl AppContext {
    pub fn load(config: Option<&Path>, output_dir: Option<&Path>) -> Self {
        let settings_path = config.map(Path::to_path_buf).or_else(Settings::default_path);
        let settings = settings_path
            .as_deref()
            .map(Settings::load)
            .unwrap_or_default();
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| settings.output_dir.clone());
        Self {
            settings,
            settings_path,
            output_dir,
        }
    }

    fn store(&self) -> SourceConfigStore {
        SourceConfigStore::open(self.settings.store_path(self.settings_path.as_deref()))
    }

    fn pipeline(&self) -> Result<QrPipeline> {
        let settings = self.settings.pipeline().context("invalid settings")?;
        let font = if self.settings.caption.enabled {
            load_first_font(&self.settings.caption.font_paths)
        } else {
            None
        };
        if self.settings.caption.enabled && font.is_none() {
            tracing::warn!("no caption font found; captions will be left blank");
        }
        Ok(QrPipeline::new(settings).with_font(font))
    }

    fn caption_choice(&self, args: &CaptionArgs) -> CaptionChoice {
        if args.no_caption || !self.settings.caption.enabled {
            CaptionChoice::None
        } else if let Some(text) = &args.caption {
            CaptionChoice::Custom(text.clone())
        } else {
            CaptionChoice::Default
        }
    }
}

pub fn run_generate(ctx: &AppContext, args: &GenerateArgs) -> Result<RenderedQr> {
    let properties = ctx.settings.property_table()?;
    let input = CredentialInput {
        ssid: args.ssid.clone(),
        password: args.password.clone(),
        encryption: args.encryption.clone(),
        property: args.property.clone(),
        hidden: args.hidden,
    };
    let credential = WifiCredential::new(&input, &properties, ctx.settings.policy())?;
    let mut request = CompositionRequest::new(credential, &ctx.output_dir)
        .with_caption(ctx.caption_choice(&args.caption));
    if let Some(room) = &args.room {
        request = request.with_room(room.clone());
    }
    let rendered = ctx.pipeline()?.render(&request)?;
    Ok(rendered)
}

/// Result of a batch command, for the summary printer.
pub struct BatchResult {
    pub file: PathBuf,
    pub sheet: String,
    pub output_dir: PathBuf,
    pub report: BatchReport,
    /// Store writes that failed; the run used the merged preferences anyway.
    pub unsaved: Vec<StoreError>,
}

/// Runs a batch until done or until `cancel` is set.
pub fn run_batch_command(
    ctx: &AppContext,
    args: &BatchArgs,
    cancel: &AtomicBool,
) -> Result<BatchResult> {
    let store = ctx.store();
    let sheet_name = args
        .sheet
        .clone()
        .or_else(|| store.last_sheet(&canonical(&args.file)));
    let sheet = CsvSheet::open(&args.file, sheet_name.as_deref())?;
    let properties = ctx.settings.property_table()?;

    let stored = store.get(sheet.file_identity(), sheet.sheet_name());
    let entry = merge_entry(stored.clone(), sheet.header(), args, &properties)?;
    let mut unsaved = Vec::new();
    if entry != stored {
        if let Err(err) = store.put(sheet.file_identity(), sheet.sheet_name(), entry.clone()) {
            tracing::warn!(error = %err, "sheet preferences were not saved");
            unsaved.push(err);
        }
    }
    if let Err(err) = store.remember_file(&sheet.path(), sheet.sheet_name()) {
        tracing::warn!(error = %err, "recent file list was not saved");
        unsaved.push(err);
    }

    let pipeline = ctx.pipeline()?;
    let batch = BatchContext {
        pipeline: &pipeline,
        properties: &properties,
        policy: ctx.settings.policy(),
        output_dir: &ctx.output_dir,
        caption: ctx.caption_choice(&args.caption),
    };

    let report = match &args.room {
        Some(room) => {
            let column = entry
                .column_map
                .get(&ColumnRole::Room)
                .copied()
                .ok_or_else(|| anyhow!("no room column is mapped; use --room-col"))?;
            let Some(row) = find_room(sheet.rows(), column, room) else {
                bail!("room '{room}' not found in sheet '{}'", sheet.sheet_name());
            };
            run_batch(&batch, &entry, [row], cancel)
        }
        None => run_batch(&batch, &entry, sheet.rows(), cancel),
    };

    Ok(BatchResult {
        file: args.file.clone(),
        sheet: sheet.sheet_name().to_string(),
        output_dir: ctx.output_dir.clone(),
        report,
        unsaved,
    })
}

/// Sets `cancel` on the first Ctrl-C so the batch stops before its next row. A second
/// Ctrl-C exits right away.
pub fn cancel_on_ctrl_c(cancel: Arc<AtomicBool>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::warn!(error = %err, "Ctrl-C handler not installed");
            return;
        }
    };
    std::thread::spawn(move || {
        runtime.block_on(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "Ctrl-C handler not installed");
                return;
            }
            tracing::warn!("Ctrl-C received, stopping after the current row");
            cancel.store(true, Ordering::SeqCst);
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    });
}

/// Stored entry with detected columns filled in and command-line overrides applied.
fn merge_entry(
    mut entry: SourceConfigEntry,
    header: &[String],
    args: &BatchArgs,
    properties: &PropertyTable,
) -> Result<SourceConfigEntry> {
    if entry.column_map.is_empty() {
        entry.column_map = wifiqr::sheet::detect_columns(header);
    }
    for (role, column) in column_overrides(&args.columns) {
        entry.column_map.insert(role, column);
    }
    if let Some(flag) = args.use_sheet_security {
        entry.use_excel_security = flag;
    }
    if let Some(flag) = args.use_sheet_property {
        entry.use_excel_property = flag;
    }
    if let Some(encryption) = args.default_encryption {
        entry.default_encryption = encryption;
    }
    if let Some(label) = &args.default_property {
        entry.default_property = properties.lookup(label).ok_or_else(|| {
            anyhow!("unknown property '{label}' for --default-property; use a known tag or \"none\"")
        })?;
    }
    Ok(entry)
}

fn column_overrides(columns: &ColumnArgs) -> Vec<(ColumnRole, usize)> {
    [
        (ColumnRole::Room, columns.room),
        (ColumnRole::Ssid, columns.ssid),
        (ColumnRole::Password, columns.password),
        (ColumnRole::Encryption, columns.encryption),
        (ColumnRole::Property, columns.property),
    ]
    .into_iter()
    .filter_map(|(role, column)| column.map(|c| (role, c.0)))
    .collect()
}

/// What `sources` prints.
pub enum SourcesView {
    Recent(Vec<RecentFile>),
    Entry {
        file: PathBuf,
        sheet: String,
        entry: SourceConfigEntry,
    },
}

pub fn run_sources(ctx: &AppContext, args: &SourcesArgs) -> Result<SourcesView> {
    let store = ctx.store();
    match &args.file {
        None => Ok(SourcesView::Recent(store.recent_files()?)),
        Some(file) => {
            let identity = canonical(file);
            let sheet = args
                .sheet
                .clone()
                .or_else(|| store.last_sheet(&identity))
                .or_else(|| file.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_default();
            let entry = store.get(&wifiqr::sheet::file_identity(file), &sheet);
            Ok(SourcesView::Entry {
                file: identity,
                sheet,
                entry,
            })
        }
    }
}

pub fn run_settings(ctx: &AppContext, action: &SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Init { force } => {
            let path = ctx
                .settings_path
                .as_deref()
                .ok_or_else(|| anyhow!("no config directory; pass --config"))?;
            if path.exists() && !force {
                bail!("{} already exists; use --force to overwrite", path.display());
            }
            Settings::default().save(path)?;
            println!("Wrote {}", path.display());
        }
        SettingsAction::Show => {
            if let Some(path) = &ctx.settings_path {
                println!("# {}", path.display());
            }
            print!("{}", toml::to_string_pretty(&ctx.settings)?);
        }
    }
    Ok(())
}

fn canonical(path: &Path) -> PathBuf {
    PathBuf::from(wifiqr::sheet::file_identity(path))
}

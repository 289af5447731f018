use crate::{emit_success, OutputMode};
use macsync::config::{ensure_parent_dir, MacsyncConfig};
use macsync::record::parse_timestamp;
use macsync::source::{modified_time, SourceReader};
use macsync::ui::{self, files_table, stats_table, Icons, Spinner};
use macsync::{ChangeSummary, Outcome, PersistentMapping, SchemaManager, SyncEngine};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Instant;

pub fn run_init(
    output_mode: OutputMode,
    database: &Path,
    config_path: Option<&Path>,
    force: bool,
) -> anyhow::Result<()> {
    ensure_parent_dir(database)?;
    SchemaManager::default().create(database)?;

    if let Some(config_path) = config_path {
        let config = MacsyncConfig {
            database: Some(database.display().to_string()),
            ..Default::default()
        };
        config.save(config_path, force)?;
    }

    if output_mode.is_human() {
        ui::success(&format!("Created store at {}", database.display()));
        if let Some(config_path) = config_path {
            ui::info("Config", &config_path.display().to_string());
        }
    } else {
        let data = serde_json::json!({
            "database": database.display().to_string(),
            "config": config_path.map(|p| p.display().to_string()),
        });
        emit_success(output_mode, "init", data)?;
    }
    Ok(())
}

pub fn run_sync(
    output_mode: OutputMode,
    database: &Path,
    source: &Path,
    member: &str,
    modified: Option<&str>,
) -> anyhow::Result<()> {
    let manager = SchemaManager::default();

    if !database.exists() {
        ensure_parent_dir(database)?;
        tracing::info!("Creating store at {}", database.display());
        manager.create(database)?;
    }
    let mut session = manager.open_session(database)?;

    let reader = SourceReader::open(source)?;
    let modified = match modified {
        Some(text) => parse_timestamp(text)?,
        None => modified_time(source)?,
    };
    let file = reader.file_record(modified);

    if output_mode.is_human() {
        ui::header(&format!("Syncing {}", member));
        ui::status(Icons::DATABASE, "Database", &database.display().to_string());
        ui::status(Icons::FILE, "Source", &source.display().to_string());
    }

    let started = Instant::now();
    let spinner = output_mode
        .is_human()
        .then(|| Spinner::new(&format!("Reconciling {}...", member)));
    let outcome = SyncEngine::new(&mut session).sync(member, &file, reader);
    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }
    let outcome = outcome?;
    session.close()?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "sync", serde_json::to_value(&outcome)?);
    }

    match &outcome {
        Outcome::UpToDate => ui::success("No need to update, data are current!"),
        Outcome::Reconciled(summary) => {
            print_summary(summary);
            ui::timing(&format!("{:.2?}", started.elapsed()));
        }
    }
    Ok(())
}

/// Counts always; per-code lines only for changes and removals, which are rare.
fn print_summary(summary: &ChangeSummary) {
    if !console::Term::stdout().is_term() {
        print!("{}", summary);
        return;
    }

    ui::section("Summary");
    ui::summary_row("Codes Added:  ", &summary.added.len().to_string());
    ui::summary_row("Codes Changed:", &summary.changed.len().to_string());
    for (code, change) in &summary.changed {
        ui::code_changed(code, &change.old.subtype, &change.new.subtype);
    }
    ui::summary_row("Codes Deleted:", &summary.removed.len().to_string());
    for (code, old) in &summary.removed {
        ui::code_removed(code, &old.subtype);
    }
    println!();
    ui::success("Store updated");
}

pub fn run_stats(output_mode: OutputMode, database: &Path) -> anyhow::Result<()> {
    let session = SchemaManager::default().open_session(database)?;
    let stats = session.stats()?;

    let members = {
        let files = session.files();
        let mut members = Vec::new();
        for member in files.keys() {
            let member = member?;
            let record = files.get(&member)?;
            members.push((member, record));
        }
        members
    };

    if output_mode.is_human() {
        println!(
            "{} {} ({})",
            Icons::STATS,
            "Macsync Statistics".style(ui::theme().header.clone()),
            database.display()
        );
        println!(
            "{}",
            stats_table(&[
                ("Files", stats.files.to_string()),
                ("Codes", stats.codes.to_string()),
            ])
        );
        if !members.is_empty() {
            println!("{}", files_table(&members));
        }
    } else {
        let data = serde_json::json!({
            "stats": stats,
            "files": members
                .iter()
                .map(|(member, record)| serde_json::json!({
                    "member": member,
                    "modified": record.modified_text(),
                    "comment": record.comment,
                }))
                .collect::<Vec<_>>(),
        });
        emit_success(output_mode, "stats", data)?;
    }

    session.close()?;
    Ok(())
}

pub fn run_lookup(output_mode: OutputMode, database: &Path, code: &str) -> anyhow::Result<()> {
    let session = SchemaManager::default().open_session(database)?;
    let record = session.codes().fetch(code)?;
    session.close()?;

    let Some(record) = record else {
        anyhow::bail!("code {} is not in the store", code);
    };

    if output_mode.is_human() {
        println!(
            "{} {}: {}",
            Icons::SEARCH,
            code.style(ui::theme().code.clone()),
            record.subtype
        );
    } else {
        let data = serde_json::json!({
            "code": code,
            "subtype": record.subtype,
        });
        emit_success(output_mode, "lookup", data)?;
    }
    Ok(())
}

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        println!(
            "{} {}",
            "Macsync".bold().style(ui::theme().info.clone()),
            format!("Version {}", env!("CARGO_PKG_VERSION")).bold()
        );
        ui::info(
            "Store identity",
            &format!(
                "application_id {}, schema version {}",
                macsync::storage::APPLICATION_ID,
                macsync::storage::SCHEMA_VERSION
            ),
        );
    } else {
        let data = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "application_id": macsync::storage::APPLICATION_ID,
            "schema_version": macsync::storage::SCHEMA_VERSION,
        });
        emit_success(output_mode, "version", data)?;
    }
    Ok(())
}

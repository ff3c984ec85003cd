mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{FileSettings, SettingsStore};
use crate::io::fs_vault::FsVault;
use crate::io::periodic::{DatedNotes, PeriodicNotes};
use crate::io::probe::TasksPluginProbe;
use crate::io::state::{SyncState, read_sync_state, write_sync_state};
use crate::io::vault::VaultFile;
use crate::io::watcher::VaultWatcher;
use crate::model::board::ARCHIVE;
use crate::model::config::Periodicity;
use crate::ops::provider::KanbanProvider;
use crate::ops::watcher::Watcher;
use crate::parse::factory::{FixedProbe, FormatProbe, TaskFactory};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> CmdResult {
    let root = vault_root(cli.vault_dir.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::Init(args) => cmd_init(&root, args).await,
        Commands::Sync(args) => cmd_sync(&root, args, json).await,
        Commands::Reverse => cmd_reverse(&root, json).await,
        Commands::Migrate => cmd_migrate(&root, json).await,
        Commands::Watch => cmd_watch(&root).await,
        Commands::CarryOver(args) => cmd_carry_over(&root, args, json).await,
        Commands::Status => cmd_status(&root, json).await,
    }
}

fn vault_root(dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = match dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let abs = std::fs::canonicalize(&dir)
        .map_err(|e| format!("cannot resolve vault path '{}': {}", dir.display(), e))?;
    Ok(abs)
}

// ---------------------------------------------------------------------------
// Session setup
// ---------------------------------------------------------------------------

struct Session {
    vault: Arc<FsVault>,
    settings: Arc<FileSettings>,
    provider: Arc<KanbanProvider>,
}

async fn open_session(
    root: &Path,
    notes: Option<Arc<dyn PeriodicNotes>>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let vault = Arc::new(FsVault::new(root));
    let settings = Arc::new(FileSettings::load(root)?);
    let current = settings.settings();

    let probe: Arc<dyn FormatProbe> = match current.tasks.format.fixed() {
        Some(format) => Arc::new(FixedProbe(format)),
        None => Arc::new(TasksPluginProbe::new(root)),
    };
    let factory = Arc::new(TaskFactory::new(probe, current.tasks.carry_over_prefix.clone()));

    let mut provider = KanbanProvider::new(vault.clone(), vault.clone(), settings.clone(), factory);
    if let Some(notes) = notes {
        provider = provider.with_periodic_notes(notes);
    }
    if !provider.initialize().await {
        return Err("could not open the board (run with AUTOTASKS_LOG=debug for details)".into());
    }

    Ok(Session {
        vault,
        settings,
        provider: Arc::new(provider),
    })
}

fn require_sync(session: &Session) -> CmdResult {
    if !session.settings.settings().kanban.sync {
        return Err(
            "kanban sync is disabled (set `sync = true` under [kanban] in autotasks.toml)".into(),
        );
    }
    Ok(())
}

async fn save_state(root: &Path, provider: &KanbanProvider) -> CmdResult {
    let state = SyncState {
        board_path: provider.resolve_board_path().await.ok(),
        snapshot: provider.previous_snapshot().await,
    };
    write_sync_state(root, &state)?;
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_sync(root: &Path, args: SyncArgs, json: bool) -> CmdResult {
    let session = open_session(root, None).await?;
    require_sync(&session)?;
    let files: Vec<VaultFile> = args
        .files
        .iter()
        .map(|f| VaultFile::new(f.replace('\\', "/").trim_start_matches("./")))
        .collect();
    let files = (!files.is_empty()).then_some(files);

    let report = session
        .provider
        .synchronise_tasks(files)
        .await
        .ok_or("sync did not complete (run with AUTOTASKS_LOG=debug for details)")?;
    save_state(root, &session.provider).await?;

    let board = session.provider.resolve_board_path().await?;
    if json {
        print_json(&SyncReportJson::new(&board, &report))
    } else {
        println!("{}", format_sync_report(&board, &report));
        Ok(())
    }
}

async fn cmd_reverse(root: &Path, json: bool) -> CmdResult {
    let session = open_session(root, None).await?;
    require_sync(&session)?;
    let Some(saved) = read_sync_state(root) else {
        save_state(root, &session.provider).await?;
        return Err("no saved board snapshot; run `autotasks sync` first".into());
    };
    session.provider.set_previous_snapshot(saved.snapshot).await;

    let report = session
        .provider
        .reverse_synchronise_tasks()
        .await
        .ok_or("reverse sync did not complete (run with AUTOTASKS_LOG=debug for details)")?;
    save_state(root, &session.provider).await?;

    if json {
        print_json(&ReverseReportJson::from(&report))
    } else {
        println!("{}", format_reverse_report(&report));
        Ok(())
    }
}

async fn cmd_migrate(root: &Path, json: bool) -> CmdResult {
    let session = open_session(root, None).await?;
    require_sync(&session)?;
    let added = session
        .provider
        .migrate_origins()
        .await
        .ok_or("origin migration failed (run with AUTOTASKS_LOG=debug for details)")?;
    save_state(root, &session.provider).await?;

    if json {
        print_json(&serde_json::json!({ "origins_added": added }))
    } else {
        println!("recorded {} origin{}", added, if added == 1 { "" } else { "s" });
        Ok(())
    }
}

async fn cmd_watch(root: &Path) -> CmdResult {
    let vault = Arc::new(FsVault::new(root));
    let (settings, _) = crate::io::config_io::read_settings(root)?;
    let notes: Arc<dyn PeriodicNotes> = Arc::new(DatedNotes::new(vault, settings));
    let session = open_session(root, Some(notes)).await?;
    require_sync(&session)?;
    let provider = session.provider.clone();

    provider.migrate_origins().await;
    provider.synchronise_tasks(None).await;
    save_state(root, &provider).await?;

    let board = provider.resolve_board_path().await?;
    let delay = Duration::from_millis(session.settings.settings().kanban.debounce_ms);
    let watcher = Arc::new(Watcher::new(provider.clone(), provider.forward_sync_flag(), delay));
    let _fs_watcher = VaultWatcher::start(&session.vault, board.clone(), watcher)?;

    eprintln!("watching {} (board: {}), press Ctrl-C to stop", root.display(), board);
    tokio::signal::ctrl_c().await?;

    save_state(root, &provider).await
}

async fn cmd_carry_over(root: &Path, args: CarryOverArgs, json: bool) -> CmdResult {
    let vault = Arc::new(FsVault::new(root));
    let (settings, _) = crate::io::config_io::read_settings(root)?;
    let mut dated = DatedNotes::new(vault, settings.clone());
    if let Some(date) = args.date {
        dated = dated.on(date);
    }
    let notes: Arc<dyn PeriodicNotes> = Arc::new(dated);
    let session = open_session(root, Some(notes.clone())).await?;

    let mut targets: Vec<VaultFile> = Vec::new();
    for periodicity in [Periodicity::Weekly, Periodicity::Daily] {
        if !settings.periodic(periodicity).carry_over {
            continue;
        }
        match notes.current(periodicity).await {
            Some(file) if !targets.contains(&file) => targets.push(file),
            Some(_) => {}
            None => eprintln!("no {} note for {}", periodicity, notes.today()),
        }
    }

    let mut copied = 0;
    for file in &targets {
        copied += session
            .provider
            .carry_over(file)
            .await
            .ok_or_else(|| format!("carry-over into {} failed", file.path))?;
    }

    if json {
        print_json(&serde_json::json!({ "tasks_copied": copied }))
    } else {
        println!("carried over {} task{}", copied, if copied == 1 { "" } else { "s" });
        Ok(())
    }
}

async fn cmd_status(root: &Path, json: bool) -> CmdResult {
    let session = open_session(root, None).await?;
    require_sync(&session)?;
    let mut board = session.provider.board().await?;

    let lists = board
        .task_collection()
        .list_names()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let lists = lists
        .into_iter()
        .map(|name| {
            let tasks = board.task_collection().tasks_in(&name).len();
            ListJson { name, tasks }
        })
        .collect();
    let status = StatusJson {
        board: board.path().to_string(),
        lists,
        archived: board.archive_collection().tasks_in(ARCHIVE).len(),
        tasks_with_origins: session.provider.origin_index().await.size(),
    };

    if json {
        print_json(&status)
    } else {
        println!("{}", format_status(&status));
        Ok(())
    }
}

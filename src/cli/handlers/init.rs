use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{CONFIG_FILE, default_settings_text};
use crate::io::state::STATE_DIR;

use super::{open_session, save_state};

pub async fn cmd_init(root: &Path, args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }
    fs::write(&config_path, default_settings_text())?;
    fs::create_dir_all(root.join(STATE_DIR))?;

    // Opening a session finds the board, or creates one
    let session = open_session(root, None).await?;
    let board = session.provider.resolve_board_path().await?;
    save_state(root, &session.provider).await?;

    println!("initialized {} (board: {})", root.display(), board);
    Ok(())
}

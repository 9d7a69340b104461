use nodeping_core::config::{expand_path, Config, StoreMode};
use nodeping_core::session::FileSessionStore;

use crate::cli::SessionCommands;

pub fn run(config: &Config, command: SessionCommands) -> anyhow::Result<()> {
    if config.sessions.store != StoreMode::File {
        println!("Note: sessions.store is not \"file\"; runs do not save session info.");
    }
    
    let store = FileSessionStore::new(expand_path(&config.sessions.directory));
    
    match command {
        SessionCommands::List => list(&store)?,
        SessionCommands::Clear => {
            let removed = store.clear_all()?;
            println!("Removed {} saved session(s) from {:?}", removed, store.directory());
        }
    }
    Ok(())
}

fn list(store: &FileSessionStore) -> anyhow::Result<()> {
    let sessions = store.list()?;
    
    if sessions.is_empty() {
        println!("No saved sessions.");
        println!("Sessions directory: {:?}", store.directory());
        return Ok(());
    }
    
    println!("{:<18} {:<24} {:<38} {:<20}", "ID", "UID", "BROWSER ID", "REGISTERED");
    println!("{}", "-".repeat(100));
    
    for (id, info) in sessions {
        let uid = info.account.uid().unwrap_or_else(|| "-".to_string());
        let registered = chrono::DateTime::from_timestamp(info.registered_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<18} {:<24} {:<38} {:<20}", id, uid, info.browser_id, registered);
    }
    
    Ok(())
}

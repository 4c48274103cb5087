use std::path::PathBuf;

pub mod pose;

/// Root directory for config and database files (`~/.civic_data`)
pub fn data_directory() -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| "Could not determine home directory")?;

    let mut path = PathBuf::from(home);
    path.push(".civic_data");

    Ok(path)
}

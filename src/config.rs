use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Convosift";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Conversations written per review batch file.
pub const BATCH_SIZE: usize = 500;

/// Default number of top-quality conversations kept by a corpus scan.
pub const DEFAULT_TOP_COUNT: usize = 5000;

/// Filename of the quality report artifact inside the organized directory.
pub const QUALITY_REPORT_FILENAME: &str = "quality_analysis_report.json";

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    format!("warn,{}=info", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory
/// ~/Convosift/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Get the default directory of raw transcript files
pub fn chats_dir() -> PathBuf {
    app_data_dir().join("chats")
}

/// Get the default directory of organized output (report + batch files)
pub fn organized_dir() -> PathBuf {
    app_data_dir().join("organized")
}

/// Get the default review store path
pub fn db_path() -> PathBuf {
    app_data_dir().join("conversations.db")
}

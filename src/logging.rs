use std::fs::File;
use std::path::{Path, PathBuf};

/// Names a directory receiving the log files instead of standard output
pub const LOG_FOLDER_VARIABLE: &str = "NDN_TRAFFIC_LOGFOLDER";

/// Where the log records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File(PathBuf),
}

impl LogTarget {
    pub fn is_file(&self) -> bool {
        matches!(self, LogTarget::File(_))
    }
}

/// Log file of one instance: `<folder>/<module>_<instance_id>.log`
pub fn log_file_path(folder: &Path, module: &str, instance_id: &str) -> PathBuf {
    folder.join(format!("{module}_{instance_id}.log"))
}

/// Why the log goes to standard output, given the folder named by the variable if any
fn stdout_notice(folder: Option<&Path>) -> String {
    match folder {
        Some(folder) => format!(
            "Log folder {} does not exist, logging to standard output",
            folder.display()
        ),
        None => format!("{LOG_FOLDER_VARIABLE} is not set, logging to standard output"),
    }
}

/// Initialize the global logger. The filter comes from `RUST_LOG`, `info` by default.
///
/// If the log folder variable names an existing directory, records are written to the instance's
/// log file there. Otherwise they go to standard output.
pub fn init(module: &str, instance_id: &str) -> LogTarget {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let mut notice = None;
    let target = match std::env::var_os(LOG_FOLDER_VARIABLE).map(PathBuf::from) {
        Some(folder) if folder.is_dir() => {
            let path = log_file_path(&folder, module, instance_id);
            match File::create(&path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                    LogTarget::File(path)
                }
                Err(e) => {
                    notice = Some(format!("Cannot create log file {}: {e}", path.display()));
                    LogTarget::Stdout
                }
            }
        }
        folder => {
            notice = Some(stdout_notice(folder.as_deref()));
            LogTarget::Stdout
        }
    };
    if target == LogTarget::Stdout {
        builder.target(env_logger::Target::Stdout);
    }
    if let Err(e) = builder.try_init() {
        log::debug!("Logger already initialized: {e}");
    }
    if let Some(notice) = notice {
        log::warn!("{notice}");
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_follows_module_and_instance() {
        assert_eq!(
            log_file_path(Path::new("/var/log"), "NdnTrafficClient", "42"),
            PathBuf::from("/var/log/NdnTrafficClient_42.log")
        );
    }

    #[test]
    fn standard_output_is_announced() {
        assert_eq!(
            stdout_notice(None),
            "NDN_TRAFFIC_LOGFOLDER is not set, logging to standard output"
        );
        assert_eq!(
            stdout_notice(Some(Path::new("/nowhere"))),
            "Log folder /nowhere does not exist, logging to standard output"
        );
    }

    #[test]
    fn second_initialization_is_harmless() {
        assert_eq!(init("NdnTrafficClient", "1"), init("NdnTrafficClient", "1"));
    }
}

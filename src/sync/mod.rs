//! Remote sync for resolved artifacts
//!
//! Pushes an output root to a remote target over rsync/ssh. The argument
//! vector always excludes raw `.env*` sources, so only resolved artifacts
//! travel even when a whole directory tree is synced. Argument
//! construction is a pure function so it can be tested without spawning.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::inventory::TargetEntry;

/// Exclusion patterns for raw source files. Applied on every push.
pub const SOURCE_EXCLUDES: &[&str] = &[".env", ".env.*"];

/// Errors raised while pushing to a remote target.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("local root not found: {0}")]
    MissingLocalRoot(PathBuf),

    #[error("failed to spawn rsync: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("rsync exited with status {status}")]
    Failed { status: i32 },
}

/// One push invocation: a local output root (optionally scoped to a single
/// service subtree) and a remote target.
#[derive(Debug, Clone)]
pub struct SyncRequest<'a> {
    pub target: &'a TargetEntry,
    pub local_root: &'a Path,
    pub service: Option<&'a str>,
}

impl SyncRequest<'_> {
    /// The local directory that gets synced, with rsync's trailing slash
    /// so contents land directly under the remote path.
    fn local_source(&self) -> String {
        let dir = match self.service {
            Some(service) => self.local_root.join(service),
            None => self.local_root.to_path_buf(),
        };
        format!("{}/", dir.display())
    }

    /// The `user@host:path` remote destination.
    fn remote_dest(&self) -> String {
        let mut path = self.target.path.trim_end_matches('/').to_string();
        if let Some(service) = self.service {
            path.push('/');
            path.push_str(service);
        }
        format!("{}:{}/", self.target.ssh_destination(), path)
    }
}

/// Build the full rsync argument vector for a push.
pub fn build_rsync_args(request: &SyncRequest<'_>) -> Vec<String> {
    let mut args = vec!["-az".to_string()];

    for pattern in SOURCE_EXCLUDES {
        args.push(format!("--exclude={pattern}"));
    }

    let mut ssh_cmd = "ssh".to_string();
    if request.target.port != 22 {
        ssh_cmd.push_str(&format!(" -p {}", request.target.port));
    }
    if let Some(key) = request.target.expanded_ssh_key_path() {
        ssh_cmd.push_str(&format!(" -i {}", key.display()));
    }
    args.push("-e".to_string());
    args.push(ssh_cmd);

    args.push(request.local_source());
    args.push(request.remote_dest());
    args
}

/// Render an argument vector as a copy-pasteable command line.
pub fn render_command(args: &[String]) -> String {
    let mut out = String::from("rsync");
    for arg in args {
        out.push(' ');
        if arg.contains(' ') {
            out.push('\'');
            out.push_str(arg);
            out.push('\'');
        } else {
            out.push_str(arg);
        }
    }
    out
}

/// Execute a push. The remote transport is trusted for a single
/// invocation; a nonzero rsync exit is surfaced as an error.
pub fn push(request: &SyncRequest<'_>) -> Result<(), SyncError> {
    let local = match request.service {
        Some(service) => request.local_root.join(service),
        None => request.local_root.to_path_buf(),
    };
    if !local.is_dir() {
        return Err(SyncError::MissingLocalRoot(local));
    }

    let args = build_rsync_args(request);
    let status = Command::new("rsync").args(&args).status()?;
    if !status.success() {
        return Err(SyncError::Failed {
            status: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetEntry {
        TargetEntry {
            name: "prod-1".to_string(),
            host: "deploy.example.com".to_string(),
            port: 22,
            user: "deploy".to_string(),
            path: "/srv/config".to_string(),
            ssh_key_path: None,
        }
    }

    #[test]
    fn args_always_exclude_raw_sources() {
        let target = target();
        let request = SyncRequest {
            target: &target,
            local_root: Path::new("dist"),
            service: None,
        };

        let args = build_rsync_args(&request);
        assert!(args.contains(&"--exclude=.env".to_string()));
        assert!(args.contains(&"--exclude=.env.*".to_string()));
    }

    #[test]
    fn whole_root_sync_shape() {
        let target = target();
        let request = SyncRequest {
            target: &target,
            local_root: Path::new("dist"),
            service: None,
        };

        let args = build_rsync_args(&request);
        assert_eq!(args.first().unwrap(), "-az");
        assert_eq!(args[args.len() - 2], "dist/");
        assert_eq!(
            args.last().unwrap(),
            "deploy@deploy.example.com:/srv/config/"
        );
    }

    #[test]
    fn service_scoped_sync_shape() {
        let target = target();
        let request = SyncRequest {
            target: &target,
            local_root: Path::new("dist"),
            service: Some("bor-db"),
        };

        let args = build_rsync_args(&request);
        assert_eq!(args[args.len() - 2], "dist/bor-db/");
        assert_eq!(
            args.last().unwrap(),
            "deploy@deploy.example.com:/srv/config/bor-db/"
        );
    }

    #[test]
    fn nondefault_port_and_key_reach_ssh_command() {
        let mut target = target();
        target.port = 2222;
        target.ssh_key_path = Some("/keys/deploy".to_string());

        let request = SyncRequest {
            target: &target,
            local_root: Path::new("dist"),
            service: None,
        };

        let args = build_rsync_args(&request);
        let e_pos = args.iter().position(|a| a == "-e").unwrap();
        assert_eq!(args[e_pos + 1], "ssh -p 2222 -i /keys/deploy");
    }

    #[test]
    fn default_port_omitted_from_ssh_command() {
        let target = target();
        let request = SyncRequest {
            target: &target,
            local_root: Path::new("dist"),
            service: None,
        };

        let args = build_rsync_args(&request);
        let e_pos = args.iter().position(|a| a == "-e").unwrap();
        assert_eq!(args[e_pos + 1], "ssh");
    }

    #[test]
    fn render_quotes_args_with_spaces() {
        let rendered = render_command(&[
            "-az".to_string(),
            "-e".to_string(),
            "ssh -p 2222".to_string(),
        ]);
        assert_eq!(rendered, "rsync -az -e 'ssh -p 2222'");
    }
}

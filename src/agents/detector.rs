// Agent binary detection and capability probing

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::agents::catalog::{known_agents, CliPattern};
use crate::agents::parsers::parser_for;
use crate::agents::Agent;

/// Finds and validates installed agent CLIs.
///
/// Detection walks a search-path list (the process PATH by default), probes
/// each found binary for its version, and treats a clean exit of the
/// authentication probe as "authenticated". Probe failures never abort
/// detection; they downgrade the agent to unauthenticated.
pub struct Detector {
    search_paths: Vec<PathBuf>,
}

impl Detector {
    /// Creates a detector using the system PATH.
    pub fn new() -> Self {
        let path = env::var_os("PATH").unwrap_or_default();
        Self {
            search_paths: env::split_paths(&path)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        }
    }

    /// Creates a detector with a custom PATH-style search path.
    pub fn with_search_path(path: &str) -> Self {
        Self {
            search_paths: env::split_paths(path)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        }
    }

    /// Returns all available agents on the system.
    ///
    /// Enumeration order follows the catalog; callers that need a different
    /// determinism sort the result themselves.
    pub fn detect_all(&self) -> Vec<Agent> {
        let mut agents = Vec::new();

        for pattern in known_agents() {
            let Some(path) = self.find_binary(pattern.binary) else {
                continue;
            };

            let version = probe_version(&path, pattern);
            let authenticated = probe_auth(&path, pattern);
            log::info!(
                "[Detector] Found {} at {:?} (version: {}, authenticated: {})",
                pattern.binary,
                path,
                if version.is_empty() { "?" } else { &version },
                authenticated
            );

            agents.push(Agent {
                name: pattern.binary.to_string(),
                path,
                authenticated,
                version,
                pattern: pattern.clone(),
                parser: parser_for(pattern.binary),
            });
        }

        agents
    }

    /// Checks whether a specific agent binary is installed.
    pub fn is_installed(&self, name: &str) -> bool {
        self.find_binary(name).is_some()
    }

    /// Returns the full path for an agent binary, if installed.
    pub fn agent_path(&self, name: &str) -> Option<PathBuf> {
        self.find_binary(name)
    }

    /// Checks whether an agent is authenticated by running its auth probe.
    pub fn is_authenticated(&self, agent: &Agent) -> bool {
        probe_auth(&agent.path, &agent.pattern)
    }

    /// Finds a binary in the search paths, first hit wins.
    fn find_binary(&self, name: &str) -> Option<PathBuf> {
        for dir in &self.search_paths {
            let candidate = dir.join(name);
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the version probe and returns the first line of stdout, or empty
/// when the probe fails.
fn probe_version(path: &Path, pattern: &CliPattern) -> String {
    let output = match Command::new(path).args(pattern.version_args).output() {
        Ok(o) => o,
        Err(e) => {
            log::debug!("[Detector] Version probe failed for {:?}: {}", path, e);
            return String::new();
        }
    };

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Runs the authentication probe; exit code zero means authenticated.
/// Agents without a dedicated probe fall back to the version args.
fn probe_auth(path: &Path, pattern: &CliPattern) -> bool {
    let args = if pattern.auth_check_args.is_empty() {
        pattern.version_args
    } else {
        pattern.auth_check_args
    };

    match Command::new(path).args(args).output() {
        Ok(output) => output.status.success(),
        Err(e) => {
            log::debug!("[Detector] Auth probe failed for {:?}: {}", path, e);
            false
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

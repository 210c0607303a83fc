//! Module selection, option validation and the run itself.
//!
//! Validation happens entirely before any connection is opened, so a bad
//! option combination never touches the database.
use std::path::PathBuf;
use std::str::FromStr;

use colored::Colorize;
use log::{info, warn};

use crate::dump::{DumpError, MalformedPolicy, load_dump_file};
use crate::graph::{EdgeStore, EntityKind};
use crate::grouping::{group_hashes, group_identifiers};
use crate::identifiers::load_identifier_files;
use crate::io::DEFAULT_MMAP_THRESHOLD_BYTES;
use crate::report::empty_password_notice;
use crate::stats::RunStats;
use crate::writer::{CountMode, WriteReport, write_groups};

pub const KNOWN_MODULES: [&str; 2] = ["samepass", "samelocaladmin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    SamePass,
    SameLocalAdmin,
}

impl FromStr for Module {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "samepass" => Ok(Module::SamePass),
            "samelocaladmin" => Ok(Module::SameLocalAdmin),
            _ => Err(ValidationError::UnknownModule),
        }
    }
}

/// Every validation failure maps to exit status 1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown module.")]
    UnknownModule,
    #[error("You must specify the Neo4j host.")]
    MissingHost,
    #[error("You must specify a domain.")]
    MissingDomain,
    #[error("You must specify a user list or a dump file to parse.")]
    MissingUserSource,
    #[error("You cannot specify both user list(s) and a dump file. Choose one.")]
    ConflictingUserSources,
    #[error("You must specify a computer list.")]
    MissingComputerList,
}

/// Raw options as the operator gave them.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub module: Option<String>,
    pub domain: Option<String>,
    pub user_files: Vec<PathBuf>,
    pub nt_file: Option<PathBuf>,
    pub computer_files: Vec<PathBuf>,
    pub neo4j_host: Option<String>,
    pub dry_run: bool,
}

/// A validated unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    SamePassUsers { domain: String, files: Vec<PathBuf> },
    SamePassDump { domain: String, file: PathBuf },
    SameLocalAdmin { domain: String, files: Vec<PathBuf> },
}

impl Plan {
    pub fn module(&self) -> Module {
        match self {
            Plan::SamePassUsers { .. } | Plan::SamePassDump { .. } => Module::SamePass,
            Plan::SameLocalAdmin { .. } => Module::SameLocalAdmin,
        }
    }
}

impl Options {
    pub fn validate(&self) -> Result<Plan, ValidationError> {
        let module: Module = self
            .module
            .as_deref()
            .ok_or(ValidationError::UnknownModule)?
            .parse()?;
        if self.neo4j_host.is_none() && !self.dry_run {
            return Err(ValidationError::MissingHost);
        }
        let domain = match self.domain.as_deref() {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => return Err(ValidationError::MissingDomain),
        };
        match module {
            Module::SamePass => match (self.user_files.is_empty(), &self.nt_file) {
                (true, None) => Err(ValidationError::MissingUserSource),
                (false, Some(_)) => Err(ValidationError::ConflictingUserSources),
                (false, None) => Ok(Plan::SamePassUsers {
                    domain,
                    files: self.user_files.clone(),
                }),
                (true, Some(file)) => Ok(Plan::SamePassDump {
                    domain,
                    file: file.clone(),
                }),
            },
            Module::SameLocalAdmin => {
                if self.computer_files.is_empty() {
                    return Err(ValidationError::MissingComputerList);
                }
                Ok(Plan::SameLocalAdmin {
                    domain,
                    files: self.computer_files.clone(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub mmap_threshold: u64,
    pub count_mode: CountMode,
    pub malformed: MalformedPolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            mmap_threshold: DEFAULT_MMAP_THRESHOLD_BYTES,
            count_mode: CountMode::default(),
            malformed: MalformedPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RunOutcome {
    pub stats: RunStats,
    pub report: WriteReport,
}

/// Parse the inputs of `plan`, group them and write every pair to `store`.
/// Only an unusable dump file is an error; everything else is recorded in
/// the outcome. Empty-password users are printed before the first write.
pub async fn execute<S: EdgeStore + ?Sized>(
    plan: &Plan,
    store: &S,
    settings: &RunSettings,
) -> Result<RunOutcome, DumpError> {
    let mut stats = RunStats::default();
    let (groups, domain, kind) = match plan {
        Plan::SamePassUsers { domain, files } | Plan::SameLocalAdmin { domain, files } => {
            let load = load_identifier_files(files, settings.mmap_threshold);
            info!("{} distinct identifiers", load.identifiers.len());
            stats.files_skipped = load.failures;
            let kind = match plan.module() {
                Module::SamePass => EntityKind::User,
                Module::SameLocalAdmin => EntityKind::Computer,
            };
            (group_identifiers(load.identifiers), domain, kind)
        }
        Plan::SamePassDump { domain, file } => {
            let load = load_dump_file(file, settings.mmap_threshold, settings.malformed)?;
            stats.malformed_lines = load.malformed;
            if load.groups.is_empty() {
                warn!("{}: no usable entries", file.display());
            }
            let grouping = group_hashes(&load.groups);
            for users in &grouping.empty_password {
                println!("{}", empty_password_notice(users).yellow());
            }
            info!("{} shared-hash groups", grouping.groups.len());
            stats.empty_password = grouping.empty_password;
            (grouping.groups, domain, EntityKind::User)
        }
    };
    info!(
        "{} pairs to write",
        groups.iter().map(|g| g.pair_count()).sum::<usize>()
    );
    let report = write_groups(store, &groups, domain, kind, settings.count_mode).await;
    stats.record_writes(&report);
    Ok(RunOutcome { stats, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DryRunStore;
    use std::fs;
    use tempfile::tempdir;

    fn samepass() -> Options {
        Options {
            module: Some("samepass".into()),
            domain: Some("corp.local".into()),
            neo4j_host: Some("localhost".into()),
            ..Default::default()
        }
    }

    #[test]
    fn unknown_or_missing_module() {
        let mut o = samepass();
        o.module = Some("samehash".into());
        assert_eq!(o.validate(), Err(ValidationError::UnknownModule));
        o.module = None;
        assert_eq!(o.validate(), Err(ValidationError::UnknownModule));
    }

    #[test]
    fn host_required_unless_dry_run() {
        let mut o = samepass();
        o.user_files = vec!["users.txt".into()];
        o.neo4j_host = None;
        assert_eq!(o.validate(), Err(ValidationError::MissingHost));
        o.dry_run = true;
        assert!(o.validate().is_ok());
    }

    #[test]
    fn samepass_requires_exactly_one_source() {
        let mut o = samepass();
        assert_eq!(o.validate(), Err(ValidationError::MissingUserSource));
        o.user_files = vec!["users.txt".into()];
        o.nt_file = Some("ntds.txt".into());
        assert_eq!(o.validate(), Err(ValidationError::ConflictingUserSources));
        o.user_files.clear();
        assert_eq!(
            o.validate(),
            Ok(Plan::SamePassDump {
                domain: "corp.local".into(),
                file: "ntds.txt".into()
            })
        );
    }

    #[test]
    fn empty_domain_is_rejected() {
        let mut o = samepass();
        o.user_files = vec!["users.txt".into()];
        o.domain = Some(String::new());
        assert_eq!(o.validate(), Err(ValidationError::MissingDomain));
        o.domain = None;
        assert_eq!(o.validate(), Err(ValidationError::MissingDomain));
    }

    #[test]
    fn samelocaladmin_requires_computer_list() {
        let mut o = samepass();
        o.module = Some("samelocaladmin".into());
        o.user_files = vec!["users.txt".into()];
        assert_eq!(o.validate(), Err(ValidationError::MissingComputerList));
        o.computer_files = vec!["a.txt".into(), "b.txt".into()];
        assert_eq!(o.validate().unwrap().module(), Module::SameLocalAdmin);
    }

    #[tokio::test]
    async fn user_list_scenario_writes_two_pairs() {
        let dir = tempdir().unwrap();
        let users = dir.path().join("users.txt");
        fs::write(&users, "alice\nbob\nbob\n").unwrap();
        let plan = Plan::SamePassUsers {
            domain: "corp.local".into(),
            files: vec![users],
        };
        let out = execute(&plan, &DryRunStore, &RunSettings::default())
            .await
            .unwrap();
        assert_eq!(out.stats.pairs_attempted, 2);
        assert_eq!(out.stats.updated, 2);
        let targets: Vec<_> = out.report.outcomes.iter().map(|o| o.target.as_str()).collect();
        assert_eq!(targets, vec!["bob@corp.local", "alice@corp.local"]);
    }

    #[tokio::test]
    async fn dump_scenario_excludes_empty_password() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("ntds.txt");
        fs::write(
            &dump,
            "CORP\\carol:1:x:aad3b435b51404eeaad3b435b51404ee\n\
             CORP\\dave:2:x:aad3b435b51404eeaad3b435b51404ee\n\
             CORP\\eve:3:x:31d6cfe0d16ae931b73c59d7e0c089c0\n",
        )
        .unwrap();
        let plan = Plan::SamePassDump {
            domain: "corp.local".into(),
            file: dump,
        };
        let out = execute(&plan, &DryRunStore, &RunSettings::default())
            .await
            .unwrap();
        assert_eq!(out.stats.empty_password, vec![vec!["eve".to_string()]]);
        assert_eq!(out.stats.pairs_attempted, 2);
        assert!(out.report.outcomes.iter().all(|o| !o.source.starts_with("eve")));
    }

    #[tokio::test]
    async fn computer_lists_use_dotted_names() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, "WS01\nWS02\n").unwrap();
        let plan = Plan::SameLocalAdmin {
            domain: "corp.local".into(),
            files: vec![a, dir.path().join("missing.txt")],
        };
        let out = execute(&plan, &DryRunStore, &RunSettings::default())
            .await
            .unwrap();
        assert_eq!(out.report.outcomes[0].source, "WS01.corp.local");
        assert_eq!(out.report.outcomes[0].kind, EntityKind::Computer);
        assert_eq!(out.stats.files_skipped.len(), 1);
    }

    #[tokio::test]
    async fn strict_dump_fails_before_writing() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("ntds.txt");
        fs::write(&dump, "a:1:x:h\nbroken\nb:2:x:h\n").unwrap();
        let plan = Plan::SamePassDump {
            domain: "corp".into(),
            file: dump,
        };
        let settings = RunSettings {
            malformed: MalformedPolicy::Fail,
            ..Default::default()
        };
        let err = execute(&plan, &DryRunStore, &settings).await.unwrap_err();
        assert!(matches!(err, DumpError::MalformedLine { line_no: 2, .. }));
    }
}

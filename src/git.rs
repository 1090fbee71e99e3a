// ABOUTME: Commits the export directory and pushes it to a named remote
// ABOUTME: git2 for staging and committing, the git CLI for pushing

use crate::{Error, Result};
use chrono::NaiveDate;
use git2::{IndexAddOption, Repository, Signature};
use std::path::Path;
use std::process::Command;
use tracing::{info, info_span};

pub fn commit_message(date: NaiveDate) -> String {
    format!("{}: Auto updates from yuque.", date.format("%Y%m%d"))
}

/// Stages everything under `dir` and commits it on `HEAD`. Returns the new
/// commit id, or `None` when the tree is unchanged.
pub fn commit_all(dir: &Path, message: &str) -> Result<Option<String>> {
    let span = info_span!("git_commit", message = %message);
    let _enter = span.enter();

    let repo = Repository::open(dir)?;
    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    // add_all skips removed files
    index.update_all(["*"].iter(), None)?;
    index.write()?;

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let parent_commit = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(_) => None,
    };

    if let Some(parent) = &parent_commit {
        if parent.tree_id() == tree_id {
            info!("nothing to commit");
            return Ok(None);
        }
    }

    let sig = repo
        .signature()
        .or_else(|_| Signature::now("yuque-exporter", "yuque-exporter@localhost"))?;

    let parents = match &parent_commit {
        Some(c) => vec![c],
        None => vec![],
    };

    let commit_id = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
    info!(commit = %commit_id, "committed export");
    Ok(Some(commit_id.to_string()))
}

/// Pushes the active branch through the `git` CLI so the user's credential
/// helpers and SSH agent apply.
pub fn push(dir: &Path, remote: &str) -> Result<()> {
    let branch = active_branch(dir)?;

    let output = Command::new("git")
        .args(["push", remote, branch.as_str()])
        .current_dir(dir)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Git(format!(
            "git push {} {} failed: {}",
            remote,
            branch,
            stderr.trim()
        )));
    }

    info!(remote, branch = %branch, "pushed export");
    Ok(())
}

pub fn active_branch(dir: &Path) -> Result<String> {
    let repo = Repository::open(dir)?;
    let head = repo.head()?;
    if !head.is_branch() {
        return Err(Error::Git("HEAD is detached, nothing to push".into()));
    }
    head.shorthand()
        .map(str::to_string)
        .ok_or_else(|| Error::Git("branch name is not valid UTF-8".into()))
}

pub fn commit_and_push(dir: &Path, message: &str, remote: &str) -> Result<()> {
    // push even without a new commit; an earlier push may have failed
    commit_all(dir, message)?;
    push(dir, remote)
}
